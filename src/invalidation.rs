//! Invalidation Rules
//!
//! Named predicates evaluated by the invalidator against every entry.
//! Matching entries are deleted. A predicate may fail; the failure is
//! logged and only that rule is skipped for the pass.

use std::fmt;
use std::sync::Arc;

use crate::cache::{KeyPattern, Metadata};
use crate::error::Result;

type Predicate = dyn Fn(&str, &Metadata) -> anyhow::Result<bool> + Send + Sync;

#[derive(Clone)]
pub struct InvalidationRule {
    name: String,
    predicate: Arc<Predicate>,
}

impl fmt::Debug for InvalidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvalidationRule")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl InvalidationRule {
    /// Rule backed by an arbitrary fallible predicate.
    pub fn custom<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&str, &Metadata) -> anyhow::Result<bool> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            predicate: Arc::new(predicate),
        }
    }

    /// Matches entries carrying any of `tags`.
    pub fn tags<I, S>(name: impl Into<String>, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tags: Vec<String> = tags.into_iter().map(Into::into).collect();
        Self::custom(name, move |_, meta| Ok(meta.has_any_tag(&tags)))
    }

    /// Matches keys against a glob or `re:` pattern.
    pub fn pattern(name: impl Into<String>, pattern: &str) -> Result<Self> {
        let pattern = KeyPattern::parse(pattern)?;
        Ok(Self::custom(name, move |key, _| Ok(pattern.matches(key))))
    }

    /// Matches entries not read for at least `idle_ms` milliseconds.
    pub fn idle_for(name: impl Into<String>, idle_ms: u64) -> Self {
        Self::custom(name, move |_, meta| {
            let now = crate::cache::current_timestamp_ms();
            Ok(now.saturating_sub(meta.last_accessed) >= idle_ms)
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn matches(&self, key: &str, metadata: &Metadata) -> anyhow::Result<bool> {
        (self.predicate)(key, metadata)
    }
}
