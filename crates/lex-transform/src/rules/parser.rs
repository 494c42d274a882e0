//! Recommendation text to transform matching.

use tracing::debug;

use super::{Rule, Transform, TransformRegistry};

/// Matches free-text recommendations against a [`TransformRegistry`].
#[derive(Debug, Clone, Copy)]
pub struct RecommendationParser {
    registry: &'static TransformRegistry,
}

impl Default for RecommendationParser {
    fn default() -> Self {
        Self::new(TransformRegistry::builtin())
    }
}

impl RecommendationParser {
    pub fn new(registry: &'static TransformRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &'static TransformRegistry {
        self.registry
    }

    /// Find the first rule matching the trimmed `text`.
    ///
    /// Returns `None` when no rule matches; the caller treats that as a skip.
    pub fn match_recommendation(&self, text: &str) -> Option<(&'static Rule, Transform)> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }

        let found = self.registry.find(trimmed);
        match &found {
            Some((rule, transform)) => {
                debug!("Matched '{}' to rule {} {:?}", trimmed, rule.id(), transform.params())
            }
            None => debug!("No rule matches '{}'", trimmed),
        }
        found
    }

    /// Shorthand for [`Self::match_recommendation`] without the rule.
    pub fn parse(&self, text: &str) -> Option<Transform> {
        self.match_recommendation(text).map(|(_, transform)| transform)
    }
}
