//! Incremental output matching
//!
//! Output from the front-end accumulates in an append-only buffer with a
//! monotonic cursor marking the end of already-consumed text. An
//! expectation is a regex searched over the region at-or-after the cursor
//! (substring search, not anchored); a successful match advances the
//! cursor to the match end, so two expectations awaited in sequence can
//! never match overlapping or out-of-order text. Matching is re-attempted
//! against the full accumulated buffer after every new chunk, so a pattern
//! whose text arrives split across reads still matches.
//!
//! Synchronous result records (`^done`, `^running`, `^error`) and
//! asynchronous notifications (`*stopped`) are matched uniformly as raw
//! text; the order the scenario author awaits them in is itself the
//! behavioral assertion.

use std::ops::Range;
use std::time::Duration;

use regex::Regex;
use tokio::time::Instant;

use crate::common::{Error, Result};
use crate::session::Session;

/// Append-only output text plus the monotonic consumed-text cursor.
#[derive(Debug, Default)]
pub struct OutputBuffer {
    text: String,
    cursor: usize,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a newly read chunk.
    pub fn append(&mut self, chunk: &str) {
        self.text.push_str(chunk);
    }

    /// Search the unconsumed region for `re`; offsets are absolute.
    pub fn find_unconsumed(&self, re: &Regex) -> Option<Range<usize>> {
        re.find(&self.text[self.cursor..])
            .map(|m| self.cursor + m.start()..self.cursor + m.end())
    }

    /// Advance the cursor to `end`. The cursor never moves backward; text
    /// before it is never matched again.
    pub fn consume_to(&mut self, end: usize) {
        debug_assert!(end >= self.cursor && end <= self.text.len());
        if end > self.cursor {
            self.cursor = end;
        }
    }

    /// The unconsumed tail, used verbatim in failure diagnostics.
    pub fn tail(&self) -> &str {
        &self.text[self.cursor..]
    }

    /// Full accumulated text (consumed and not).
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

/// One pattern to await: a regex, an optional per-expectation timeout
/// (falling back to the configured default), and a negation flag.
#[derive(Debug, Clone)]
pub struct Expectation {
    pub pattern: String,
    pub timeout: Option<Duration>,
    pub negated: bool,
}

impl Expectation {
    /// Expect `pattern` to appear.
    pub fn matches(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            timeout: None,
            negated: false,
        }
    }

    /// Expect `pattern` NOT to appear before the timeout elapses.
    pub fn absent(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            timeout: None,
            negated: true,
        }
    }

    /// Override the default timeout for this expectation.
    pub fn within(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Successful match details.
#[derive(Debug)]
pub struct MatchInfo {
    /// The matched text
    pub matched: String,
    /// Absolute end offset the cursor advanced to (cursor position for a
    /// negated expectation, which consumes nothing)
    pub end: usize,
}

/// Drives [`OutputBuffer`] matching against a live session.
pub struct ExpectationEngine {
    buffer: OutputBuffer,
    default_timeout: Duration,
}

impl ExpectationEngine {
    pub fn new(default_timeout: Duration) -> Self {
        Self {
            buffer: OutputBuffer::new(),
            default_timeout,
        }
    }

    pub fn buffer(&self) -> &OutputBuffer {
        &self.buffer
    }

    /// Suspend until the expectation matches, its timeout elapses, or the
    /// session's stream closes.
    ///
    /// For a negated expectation the polarity flips: reaching the deadline
    /// (or a closed stream) with no match is success and the cursor stays
    /// put; a match is a [`Error::ForbiddenMatch`] failure.
    pub async fn expect(&mut self, session: &mut Session, exp: &Expectation) -> Result<MatchInfo> {
        let re = Regex::new(&exp.pattern).map_err(|e| Error::InvalidPattern {
            pattern: exp.pattern.clone(),
            reason: e.to_string(),
        })?;

        let timeout = exp.timeout.unwrap_or(self.default_timeout);
        let deadline = Instant::now() + timeout;

        // Drain anything already buffered by the session before waiting.
        while let Some(chunk) = session.try_recv_output() {
            self.buffer.append(&chunk);
        }

        loop {
            if let Some(range) = self.buffer.find_unconsumed(&re) {
                let matched = self.buffer.text()[range.clone()].to_string();
                if exp.negated {
                    return Err(Error::ForbiddenMatch {
                        pattern: exp.pattern.clone(),
                        matched,
                    });
                }
                tracing::debug!(pattern = %exp.pattern, %matched, "expectation matched");
                self.buffer.consume_to(range.end);
                return Ok(MatchInfo {
                    matched,
                    end: range.end,
                });
            }

            match tokio::time::timeout_at(deadline, session.recv_output()).await {
                Ok(Some(chunk)) => self.buffer.append(&chunk),
                Ok(None) => {
                    // Closed stream: absence was the assertion, so a
                    // negated expectation still succeeds here.
                    if exp.negated {
                        return Ok(MatchInfo {
                            matched: String::new(),
                            end: self.buffer.cursor(),
                        });
                    }
                    return Err(Error::SessionClosed {
                        pattern: exp.pattern.clone(),
                        tail: self.buffer.tail().to_string(),
                    });
                }
                Err(_) => {
                    if exp.negated {
                        return Ok(MatchInfo {
                            matched: String::new(),
                            end: self.buffer.cursor(),
                        });
                    }
                    return Err(self.timeout_failure(exp, timeout));
                }
            }
        }
    }

    /// Build the failure for an expired wait, upgrading to
    /// [`Error::ProtocolError`] when the unread tail shows the wrong
    /// record class answered instead.
    fn timeout_failure(&self, exp: &Expectation, timeout: Duration) -> Error {
        let tail = self.buffer.tail();

        if let Some(message) = wrong_class_record(&exp.pattern, tail) {
            return Error::protocol(&exp.pattern, &message);
        }

        Error::ExpectationTimeout {
            pattern: exp.pattern.clone(),
            seconds: timeout.as_secs(),
            tail: tail.to_string(),
        }
    }
}

/// If `tail` holds a result record of the opposite class from what
/// `pattern` was looking for, return its literal text for diagnosis.
fn wrong_class_record(pattern: &str, tail: &str) -> Option<String> {
    let expects_error = pattern.contains("\\^error");
    let expects_success = pattern.contains("\\^done") || pattern.contains("\\^running");

    // Compiled on the failure path only.
    let error_record = Regex::new(r#"\^error,(?:msg|message)="([^"]*)""#).ok()?;
    let success_record = Regex::new(r"\^(done|running)").ok()?;

    if expects_success {
        if let Some(caps) = error_record.captures(tail) {
            return Some(format!("^error,msg=\"{}\"", &caps[1]));
        }
    }
    if expects_error {
        if let Some(m) = success_record.find(tail) {
            return Some(m.as_str().to_string());
        }
    }
    None
}
