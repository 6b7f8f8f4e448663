//! Compile-once, match-many pattern matcher
//!
//! [`PatternMatcher`] owns a compiled pattern plus the scratch buffer the
//! engine writes match positions into. Compilation never fails loudly: a bad
//! pattern leaves the matcher permanently unready, every match returns
//! `false`, and the diagnostic is available from [`PatternMatcher::error_message`].
//!
//! Matching semantics are fixed:
//! - case-insensitive, Unicode codepoint matching over UTF-8 text
//! - ASCII-only `\d`, `\w`, `\s` (see [`crate::dialect`])
//! - unanchored search from offset 0 (leftmost match)
//!
//! Patterns the standard `regex` engine cannot express (backreferences,
//! look-around, possessive quantifiers) are compiled with `fancy-regex`
//! instead. Its back-references compare text exactly, so patterns that use
//! them are matched against a case-folded copy of the subject.

use fancy_regex::Regex as BacktrackingRegex;
use regex::{CaptureLocations, Regex, RegexBuilder};
use std::borrow::Cow;
use std::fmt;

use crate::dialect;

/// Which engine ended up compiling the pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    /// Finite-automata engine from the `regex` crate
    Standard,
    /// Backtracking engine from the `fancy-regex` crate
    Backtracking,
}

/// Compiled pattern and its scratch state, present only after a successful compile
enum Engine {
    Standard {
        regex: Regex,
        scratch: CaptureLocations,
    },
    Backtracking {
        regex: BacktrackingRegex,
        fold_subject: bool,
    },
}

impl Engine {
    fn kind(&self) -> EngineKind {
        match self {
            Engine::Standard { .. } => EngineKind::Standard,
            Engine::Backtracking { .. } => EngineKind::Backtracking,
        }
    }
}

/// Matches subjects against one pattern compiled at construction time
///
/// `matches` takes `&mut self` because it reuses the scratch buffer, so a
/// single instance cannot be shared across threads without a lock. Clone it
/// to get an independent matcher per thread.
pub struct PatternMatcher {
    pattern: String,
    engine: Option<Engine>,
    error: String,
    match_failures: u64,
}

impl PatternMatcher {
    /// Compile `pattern`. Never fails; check [`is_ready`](Self::is_ready).
    pub fn new(pattern: &str) -> Self {
        match compile(pattern) {
            Ok(engine) => {
                log::debug!("Compiled pattern {:?} with {:?} engine", pattern, engine.kind());
                Self {
                    pattern: pattern.to_string(),
                    engine: Some(engine),
                    error: String::new(),
                    match_failures: 0,
                }
            }
            Err(message) => {
                log::debug!("Pattern {:?} failed to compile: {}", pattern, message);
                Self {
                    pattern: pattern.to_string(),
                    engine: None,
                    error: message,
                    match_failures: 0,
                }
            }
        }
    }

    /// True if the pattern compiled
    pub fn is_ready(&self) -> bool {
        self.engine.is_some()
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn engine_kind(&self) -> Option<EngineKind> {
        self.engine.as_ref().map(Engine::kind)
    }

    /// Test whether the pattern matches anywhere in `subject`
    ///
    /// Returns `false` without evaluating if the matcher is unready. An engine
    /// failure during matching records a diagnostic and also returns `false`.
    pub fn matches(&mut self, subject: &str) -> bool {
        let Some(engine) = self.engine.as_mut() else {
            return false;
        };

        match engine {
            Engine::Standard { regex, scratch } => regex.captures_read(scratch, subject).is_some(),
            Engine::Backtracking {
                regex,
                fold_subject,
            } => {
                let result = if *fold_subject {
                    regex.is_match(&fold_case(subject))
                } else {
                    regex.is_match(subject)
                };

                match result {
                    Ok(found) => found,
                    Err(e) => {
                        self.error = e.to_string();
                        self.match_failures += 1;
                        false
                    }
                }
            }
        }
    }

    /// Like [`matches`](Self::matches), for subjects that may not be valid UTF-8
    ///
    /// Invalid UTF-8 is a match failure: the diagnostic is recorded and the
    /// result is `false`.
    pub fn matches_bytes(&mut self, subject: &[u8]) -> bool {
        if !self.is_ready() {
            return false;
        }

        match std::str::from_utf8(subject) {
            Ok(text) => self.matches(text),
            Err(e) => {
                self.error = format!("UTF-8 error: {}", e);
                self.match_failures += 1;
                false
            }
        }
    }

    /// Most recent compile or match diagnostic; empty if nothing has failed
    pub fn error_message(&self) -> &str {
        &self.error
    }

    /// Number of match attempts that failed with an error rather than a plain miss
    pub fn match_failures(&self) -> u64 {
        self.match_failures
    }
}

impl Clone for PatternMatcher {
    /// Recompiles the pattern so the clone owns a fresh scratch buffer
    fn clone(&self) -> Self {
        Self::new(&self.pattern)
    }
}

impl fmt::Debug for PatternMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternMatcher")
            .field("pattern", &self.pattern)
            .field("engine", &self.engine_kind())
            .field("error", &self.error)
            .finish()
    }
}

fn compile(pattern: &str) -> Result<Engine, String> {
    let normalized = dialect::normalize(pattern).map_err(|e| e.message)?;

    let standard_err = if normalized.requires_backtracking() {
        None
    } else {
        match RegexBuilder::new(&normalized.pattern)
            .case_insensitive(true)
            .unicode(true)
            .build()
        {
            Ok(regex) => {
                let scratch = regex.capture_locations();
                return Ok(Engine::Standard { regex, scratch });
            }
            Err(e) => Some(e),
        }
    };

    match BacktrackingRegex::new(&format!("(?i){}", normalized.pattern)) {
        Ok(regex) => {
            if let Some(err) = &standard_err {
                log::debug!(
                    "Standard engine rejected {:?} ({}), using backtracking engine",
                    pattern,
                    err
                );
            }
            Ok(Engine::Backtracking {
                regex,
                fold_subject: normalized.folds_subject(),
            })
        }
        Err(e) => match standard_err {
            // The standard engine's message points at the offending position
            Some(err) => Err(err.to_string()),
            None => Err(e.to_string()),
        },
    }
}

/// Lowercase the subject one char at a time for exact back-reference
/// comparison. Chars whose lowercase is not a single char, and non-ASCII
/// chars that lowercase to ASCII (KELVIN SIGN), are left alone.
fn fold_case(subject: &str) -> Cow<'_, str> {
    if subject.chars().all(|c| fold_char(c) == c) {
        return Cow::Borrowed(subject);
    }
    Cow::Owned(subject.chars().map(fold_char).collect())
}

fn fold_char(c: char) -> char {
    let mut lower = c.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(l), None) if c.is_ascii() || !l.is_ascii() => l,
        _ => c,
    }
}
