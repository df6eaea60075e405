//! Path rules for the tracking middleware.
//!
//! Public page and indication URLs are matched against compiled regexes; a
//! hit names the event kind and the slug captured from the path.

use regex::Regex;

use crate::enums::EventKind;

/// A matched tracking rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedHit {
    pub kind: EventKind,
    pub slug: String,
}

#[derive(Debug, Clone)]
struct TrackingRule {
    pattern: Regex,
    kind: EventKind,
}

/// Compiled set of tracking rules.
#[derive(Debug, Clone)]
pub struct TrackingRules {
    rules: Vec<TrackingRule>,
}

impl TrackingRules {
    /// Rules for `/p/{slug}` (page view) and `/i/{slug}` (indication click).
    ///
    /// # Errors
    ///
    /// Returns the regex error if a pattern fails to compile.
    pub fn standard() -> Result<Self, regex::Error> {
        let rule = |pattern: &str, kind| -> Result<TrackingRule, regex::Error> {
            Ok(TrackingRule {
                pattern: Regex::new(pattern)?,
                kind,
            })
        };
        Ok(Self {
            rules: vec![
                rule(r"^/p/(?P<slug>[a-z0-9-]+)/?$", EventKind::PageView)?,
                rule(r"^/i/(?P<slug>[a-z0-9-]+)/?$", EventKind::IndicationClick)?,
            ],
        })
    }

    /// First rule matching `path` (query string excluded).
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<TrackedHit> {
        let path = path.split('?').next().unwrap_or(path);
        self.rules.iter().find_map(|rule| {
            let caps = rule.pattern.captures(path)?;
            Some(TrackedHit {
                kind: rule.kind,
                slug: caps.name("slug")?.as_str().to_string(),
            })
        })
    }
}
