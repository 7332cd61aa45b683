//! Mock MI front-end binary for integration testing
//!
//! This binary implements a minimal line-oriented MI interpreter that can
//! be used for testing without requiring a real debugger. It models the
//! canonical stepping fixture: `main` starting at line 28 calls `printf`
//! (no debug info), `g_MyFunction`, and `s_MyFunction`, and the latter
//! calls `g_MyFunction` itself.

use std::io::{BufRead, BufReader, Write};

fn main() {
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let reader = BufReader::new(stdin.lock());
    let mut writer = stdout.lock();

    let mut state = MockState::default();

    emit(&mut writer, "(gdb)");

    for line in reader.lines() {
        let Ok(line) = line else { break };
        let command = line.trim();
        if command.is_empty() {
            continue;
        }

        let records = state.process_command(command);
        for record in &records {
            emit(&mut writer, record);
            emit(&mut writer, "(gdb)");
        }

        if state.exiting {
            break;
        }
    }
}

fn emit<W: Write>(writer: &mut W, line: &str) {
    writer.write_all(line.as_bytes()).ok();
    writer.write_all(b"\n").ok();
    writer.flush().ok();
}

/// One source line of a modeled function: line number plus the callee
/// invoked on that line, if any.
type SourceLine = (u32, Option<&'static str>);

/// Debug-info line table for the fixture program. `printf` is absent:
/// it has no debug information.
fn func_lines(func: &str) -> &'static [SourceLine] {
    match func {
        "main" => &[
            (28, Some("printf")),
            (29, Some("g_MyFunction")),
            (30, Some("s_MyFunction")),
            (31, Some("printf")),
            (32, None),
        ],
        "g_MyFunction" => &[(11, Some("printf")), (12, None)],
        "s_MyFunction" => &[(19, Some("g_MyFunction")), (20, None)],
        _ => &[],
    }
}

fn has_debug_info(func: &str) -> bool {
    !func_lines(func).is_empty()
}

/// Instructions per source line; line 28 carries the call setup for the
/// first printf and is one instruction longer.
fn instr_count(func: &str, line: u32) -> usize {
    if func == "main" && line == 28 {
        3
    } else {
        2
    }
}

fn display_name(func: &str) -> String {
    if func == "main" {
        "main".to_string()
    } else {
        format!("{func}()")
    }
}

#[derive(Debug, Clone)]
struct Frame {
    func: String,
    /// Index into the function's line table
    idx: usize,
    /// Instruction position within the current line
    phase: usize,
}

impl Frame {
    fn entry(func: &str) -> Self {
        Self {
            func: func.to_string(),
            idx: 0,
            phase: 0,
        }
    }

    fn line(&self) -> Option<u32> {
        func_lines(&self.func).get(self.idx).map(|(line, _)| *line)
    }

    fn callee(&self) -> Option<&'static str> {
        func_lines(&self.func).get(self.idx).and_then(|(_, c)| *c)
    }
}

#[derive(Default)]
struct MockState {
    loaded: bool,
    args: Vec<String>,
    /// Function-name breakpoints in insertion order; position + 1 is the
    /// breakpoint number
    breakpoints: Vec<String>,
    /// Call stack of the inferior; empty means no live inferior
    stack: Vec<Frame>,
    print_counter: u32,
    exiting: bool,
}

impl MockState {
    fn process_command(&mut self, command: &str) -> Vec<String> {
        let (name, rest) = match command.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (command, ""),
        };

        match name {
            "-file-exec-and-symbols" => {
                self.loaded = true;
                vec!["^done".to_string()]
            }
            "-exec-arguments" => {
                self.args = tokenize(rest);
                vec!["^done".to_string()]
            }
            "-break-insert" => {
                let func = rest.trim_start_matches("-f").trim();
                self.breakpoints.push(func.to_string());
                vec![format!(
                    "^done,bkpt={{number=\"{}\",type=\"breakpoint\",disp=\"keep\",enabled=\"y\",func=\"{}\"}}",
                    self.breakpoints.len(),
                    func
                )]
            }
            "-exec-run" => {
                if !self.loaded {
                    return vec![invalid_process("exec-run")];
                }
                self.stack = vec![Frame::entry("main")];
                let stop = if self.armed("main") {
                    self.breakpoint_hit("main")
                } else {
                    self.continue_scan()
                };
                vec!["^running".to_string(), stop]
            }
            "-exec-continue" => {
                if self.stack.is_empty() {
                    return vec![invalid_process("exec-continue")];
                }
                let stop = self.continue_scan();
                vec!["^running".to_string(), stop]
            }
            "-exec-abort" => {
                if self.stack.is_empty() {
                    return vec![invalid_process("exec-abort")];
                }
                self.stack.clear();
                vec![
                    "^done".to_string(),
                    "*stopped,reason=\"exited-normally\"".to_string(),
                ]
            }
            "-exec-next" => self.stepping(rest, "exec-next", |s| s.step_over()),
            "-exec-step" => self.stepping(rest, "exec-step", |s| s.step_into()),
            "-exec-next-instruction" => {
                self.stepping(rest, "exec-next-instruction", |s| s.step_instruction(false))
            }
            "-exec-step-instruction" => {
                self.stepping(rest, "exec-step-instruction", |s| s.step_instruction(true))
            }
            "-exec-finish" => self.stepping(rest, "exec-finish", |s| s.finish()),
            "-data-evaluate-expression" => self.evaluate(rest),
            "-interpreter-exec" => self.interpreter_exec(rest),
            "-gdb-exit" => {
                self.exiting = true;
                vec!["^exit".to_string()]
            }
            _ => vec![format!(
                "^error,msg=\"Driver. Received command '{command}'. It was not handled.\""
            )],
        }
    }

    fn armed(&self, func: &str) -> bool {
        self.breakpoints.iter().any(|b| b == func)
    }

    fn bkptno(&self, func: &str) -> usize {
        self.breakpoints
            .iter()
            .position(|b| b == func)
            .map(|p| p + 1)
            .unwrap_or(0)
    }

    /// Shared selector validation + execution for the stepping commands.
    fn stepping(
        &mut self,
        rest: &str,
        name: &str,
        action: impl FnOnce(&mut Self) -> String,
    ) -> Vec<String> {
        // --thread and --frame both default to "current" when omitted
        if let Some(index) = parse_option(rest, "--thread") {
            // the only thread is index 1; index 0 is reserved
            if index != 1 {
                return vec![format!(
                    "^error,message=\"error: Thread index {index} is out of range (valid values are from 1 to 1).\""
                )];
            }
        }
        // an out-of-range --frame is tolerated without an error
        let _ = parse_option(rest, "--frame");

        if self.stack.is_empty() {
            return vec![invalid_process(name)];
        }

        let stop = action(self);
        vec!["^running".to_string(), stop]
    }

    /// Advance past the current line without entering callees.
    fn step_over(&mut self) -> String {
        let frame = self.stack.last_mut().expect("live inferior");
        frame.phase = 0;
        if frame.idx + 1 < func_lines(&frame.func).len() {
            frame.idx += 1;
            self.stopped_at_top()
        } else {
            self.return_to_caller()
        }
    }

    /// Advance, descending into callees that have debug information.
    fn step_into(&mut self) -> String {
        let frame = self.stack.last().expect("live inferior");
        match frame.callee() {
            Some(callee) if has_debug_info(callee) => {
                self.stack.push(Frame::entry(callee));
                self.stopped_at_top()
            }
            // functions without debug info are stepped over transparently
            _ => self.step_over(),
        }
    }

    /// One machine instruction; the line's last instruction either enters
    /// the callee (step-into flavor) or completes the line.
    fn step_instruction(&mut self, into: bool) -> String {
        let frame = self.stack.last_mut().expect("live inferior");
        let Some(line) = frame.line() else {
            return self.return_to_caller();
        };
        let instrs = instr_count(&frame.func, line);

        if frame.phase + 1 < instrs {
            frame.phase += 1;
            return self.stopped_at_top();
        }

        match frame.callee() {
            Some(callee) if into && has_debug_info(callee) => {
                self.stack.push(Frame::entry(callee));
                self.stopped_at_top()
            }
            _ => self.step_over(),
        }
    }

    /// Run until the current function returns, or an intervening
    /// breakpoint is hit first.
    fn finish(&mut self) -> String {
        let (func, start) = {
            let frame = self.stack.last().expect("live inferior");
            (frame.func.clone(), frame.idx)
        };

        for idx in start..func_lines(&func).len() {
            let (_, callee) = func_lines(&func)[idx];
            if let Some(callee) = callee {
                if self.armed(callee) {
                    // execution reaches the breakpoint before the return
                    if let Some(frame) = self.stack.last_mut() {
                        frame.idx = idx;
                    }
                    self.stack.push(Frame::entry(callee));
                    return self.breakpoint_hit(callee);
                }
            }
        }

        self.return_to_caller()
    }

    /// Resume until a breakpoint hits or the inferior runs to completion.
    fn continue_scan(&mut self) -> String {
        loop {
            let Some(frame) = self.stack.last_mut() else {
                return "*stopped,reason=\"exited-normally\"".to_string();
            };

            let lines = func_lines(&frame.func);
            let mut hit = None;
            while frame.idx < lines.len() {
                if let Some(callee) = lines[frame.idx].1 {
                    if self.breakpoints.iter().any(|b| b == callee) {
                        hit = Some(callee);
                        break;
                    }
                }
                frame.idx += 1;
            }

            match hit {
                Some(callee) => {
                    self.stack.push(Frame::entry(callee));
                    return self.breakpoint_hit(callee);
                }
                None => {
                    self.stack.pop();
                    if let Some(caller) = self.stack.last_mut() {
                        caller.idx += 1;
                        caller.phase = 0;
                    }
                }
            }
        }
    }

    /// Pop the current frame and stop in the caller.
    fn return_to_caller(&mut self) -> String {
        self.stack.pop();
        match self.stack.last_mut() {
            None => "*stopped,reason=\"exited-normally\"".to_string(),
            Some(caller) => {
                caller.idx += 1;
                caller.phase = 0;
                self.stopped_at_top()
            }
        }
    }

    fn stopped_at_top(&self) -> String {
        let frame = self.stack.last().expect("live inferior");
        format!(
            "*stopped,reason=\"end-stepping-range\",{},thread-id=\"1\",stopped-threads=\"all\"",
            frame_field(frame)
        )
    }

    fn breakpoint_hit(&self, func: &str) -> String {
        let frame = self.stack.last().expect("live inferior");
        format!(
            "*stopped,reason=\"breakpoint-hit\",disp=\"del\",bkptno=\"{}\",{},thread-id=\"1\",stopped-threads=\"all\"",
            self.bkptno(func),
            frame_field(frame)
        )
    }

    fn evaluate(&mut self, expression: &str) -> Vec<String> {
        if self.stack.is_empty() {
            return vec![invalid_process("data-evaluate-expression")];
        }
        match expression {
            "argc" => vec![format!("^done,value=\"{}\"", self.args.len() + 1)],
            _ => vec![format!(
                "^error,msg=\"Could not evaluate expression '{expression}'\""
            )],
        }
    }

    fn interpreter_exec(&mut self, rest: &str) -> Vec<String> {
        let Some(inner) = quoted_payload(rest) else {
            return vec!["^error,msg=\"Empty command passed to -interpreter-exec\"".to_string()];
        };

        if let Some(index) = inner
            .strip_prefix("print argv[")
            .and_then(|s| s.strip_suffix(']'))
            .and_then(|s| s.parse::<usize>().ok())
        {
            let value = if index == 0 {
                Some("a.out")
            } else {
                self.args.get(index - 1).map(String::as_str)
            };
            return match value {
                Some(value) => {
                    self.print_counter += 1;
                    vec![
                        format!(
                            "(const char *) ${} = 0x0000000100000f{:02x} \"{}\"",
                            self.print_counter,
                            0x70 + self.print_counter,
                            escape_value(value)
                        ),
                        "^done".to_string(),
                    ]
                }
                None => vec!["^error,msg=\"Invalid argv index\"".to_string()],
            };
        }

        if let Some(func) = inner.strip_prefix("breakpoint set --name ") {
            self.breakpoints.push(func.trim().to_string());
            return vec!["^done".to_string()];
        }

        vec!["^done".to_string()]
    }
}

fn invalid_process(command: &str) -> String {
    format!("^error,msg=\"Command '{command}'. Invalid process during debug session\"")
}

fn frame_field(frame: &Frame) -> String {
    match frame.line() {
        Some(line) => format!(
            "frame={{addr=\"0x0000000100000f80\",func=\"{}\",args=[],file=\"main.cpp\",fullname=\"/work/main.cpp\",line=\"{}\"}}",
            display_name(&frame.func),
            line
        ),
        // no debug info, no source position
        None => format!(
            "frame={{addr=\"0x00007fff5fc01030\",func=\"{}\",args=[]}}",
            frame.func
        ),
    }
}

/// Extract the quoted payload of `-interpreter-exec command "..."`.
fn quoted_payload(rest: &str) -> Option<&str> {
    let start = rest.find('"')?;
    let end = rest.rfind('"')?;
    (end > start).then(|| &rest[start + 1..end])
}

/// Parse `--name N` out of a command tail.
fn parse_option(rest: &str, name: &str) -> Option<i64> {
    let tokens: Vec<&str> = rest.split_whitespace().collect();
    tokens
        .iter()
        .position(|t| *t == name)
        .and_then(|i| tokens.get(i + 1))
        .and_then(|v| v.parse().ok())
}

/// Split an argument string the way the front-end does: whitespace
/// separates tokens, double quotes group spaces, and quotes are stripped
/// only when they open at the start of a token (`"2nd arg"` → `2nd arg`,
/// `fourth="4th arg"` keeps its quotes).
fn tokenize(rest: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut cur = String::new();
    let mut in_quotes = false;
    let mut strip = false;

    for c in rest.chars() {
        match c {
            '"' if in_quotes => {
                in_quotes = false;
                if !strip {
                    cur.push('"');
                }
            }
            '"' => {
                in_quotes = true;
                strip = cur.is_empty();
                if !strip {
                    cur.push('"');
                }
            }
            c if c.is_whitespace() && !in_quotes => {
                if !cur.is_empty() {
                    out.push(std::mem::take(&mut cur));
                }
                strip = false;
            }
            c => cur.push(c),
        }
    }
    if !cur.is_empty() {
        out.push(cur);
    }
    out
}

/// Escape a value the way the front-end displays C strings.
fn escape_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_preserves_embedded_quotes() {
        let args = tokenize(r#"--arg1 "2nd arg" third_arg fourth="4th arg""#);
        assert_eq!(
            args,
            vec!["--arg1", "2nd arg", "third_arg", "fourth=\"4th arg\""]
        );
    }

    #[test]
    fn tokenize_of_empty_rest_is_empty() {
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn escape_value_matches_display_convention() {
        assert_eq!(escape_value("fourth=\"4th arg\""), "fourth=\\\"4th arg\\\"");
    }

    #[test]
    fn step_over_walks_straight_line_code() {
        let mut state = MockState::default();
        state.loaded = true;
        state.breakpoints.push("main".to_string());
        state.process_command("-exec-run");

        for expected in ["line=\"29\"", "line=\"30\"", "line=\"31\"", "line=\"32\""] {
            let records = state.process_command("-exec-next");
            assert!(records[1].contains(expected), "{records:?}");
        }
    }

    #[test]
    fn invalid_thread_index_does_not_advance() {
        let mut state = MockState::default();
        state.loaded = true;
        state.breakpoints.push("main".to_string());
        state.process_command("-exec-run");

        let records = state.process_command("-exec-next --thread 0");
        assert!(records[0].starts_with("^error,message=\"error: Thread index 0"));

        let records = state.process_command("-exec-next");
        assert!(records[1].contains("line=\"29\""));
    }

    #[test]
    fn finish_stops_at_intervening_breakpoint() {
        let mut state = MockState::default();
        state.loaded = true;
        state.breakpoints.push("g_MyFunction".to_string());
        state.breakpoints.push("s_MyFunction".to_string());
        state.process_command("-exec-run");
        // stopped in g_MyFunction called from main line 29
        state.process_command("-exec-finish");
        // back in main; continue runs into s_MyFunction
        let records = state.process_command("-exec-continue");
        assert!(records[1].contains("breakpoint-hit"));
        // finishing s_MyFunction reaches the g_MyFunction breakpoint first
        let records = state.process_command("-exec-finish");
        assert!(records[1].contains("breakpoint-hit"));
        assert!(records[1].contains("g_MyFunction"));
    }
}
