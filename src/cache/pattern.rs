//! Key Pattern Module
//!
//! Glob and regex key matching used by pattern invalidation and rules.
//!
//! Patterns are globs by default (`*`, `?`, `[abc]`, `[!abc]`, `[a-z]`).
//! A `re:` prefix switches to a raw regular expression.

use regex::Regex;

use crate::error::{CacheError, Result};

const REGEX_PREFIX: &str = "re:";

// == Key Pattern ==
#[derive(Debug, Clone)]
pub struct KeyPattern {
    source: String,
    regex: Regex,
}

impl KeyPattern {
    /// Compiles a glob or `re:`-prefixed regex.
    pub fn parse(pattern: &str) -> Result<Self> {
        let expr = match pattern.strip_prefix(REGEX_PREFIX) {
            Some(raw) => raw.to_string(),
            None => glob_to_regex(pattern)?,
        };

        let regex = Regex::new(&expr)
            .map_err(|e| CacheError::InvalidPattern(format!("{}: {}", pattern, e)))?;

        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    pub fn matches(&self, key: &str) -> bool {
        self.regex.is_match(key)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

/// Translates a glob into an anchored regular expression.
fn glob_to_regex(glob: &str) -> Result<String> {
    let mut out = String::with_capacity(glob.len() * 2 + 2);
    out.push('^');

    let mut chars = glob.chars();
    while let Some(c) = chars.next() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '[' => {
                // A `]` before any member is a literal, also after `!`
                let mut class = String::new();
                let mut closed = false;
                let mut negated = false;
                let mut first = true;
                for c in chars.by_ref() {
                    match c {
                        '!' if first && !negated => {
                            negated = true;
                            continue;
                        }
                        ']' if !first => {
                            closed = true;
                            break;
                        }
                        '\\' | '[' | ']' | '&' | '~' | '^' => {
                            class.push('\\');
                            class.push(c);
                        }
                        _ => class.push(c),
                    }
                    first = false;
                }
                if !closed {
                    return Err(CacheError::InvalidPattern(format!(
                        "{}: unterminated character class",
                        glob
                    )));
                }
                out.push('[');
                if negated {
                    out.push('^');
                }
                out.push_str(&class);
                out.push(']');
            }
            _ => out.push_str(&regex::escape(c.encode_utf8(&mut [0u8; 4]))),
        }
    }

    out.push('$');
    Ok(out)
}
