//! Compiled data source URI patterns
//!
//! A pattern such as `user://{user_id}/info` is split once, at registration, into a scheme
//! and an ordered list of literal and placeholder segments. Resolution walks that list
//! against the path segments of the requested URI.

use std::{cmp::Ordering, sync::LazyLock};

use regex::Regex;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\{([A-Za-z_][A-Za-z0-9_]*)\}$").expect("placeholder regex compiles")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Placeholder(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriPattern {
    raw: String,
    scheme: String,
    segments: Vec<Segment>,
}

impl UriPattern {
    pub fn parse(raw: &str) -> Result<Self, &'static str> {
        let (scheme, path) = raw
            .split_once("://")
            .ok_or("pattern must have the form scheme://path")?;

        if scheme.is_empty()
            || !scheme
                .chars()
                .all(|character| character.is_ascii_alphanumeric() || "+-.".contains(character))
        {
            return Err("scheme must be non-empty and alphanumeric");
        }

        if path.is_empty() {
            return Err("pattern path must not be empty");
        }

        let mut segments = Vec::new();
        for part in path.split('/') {
            if part.is_empty() {
                return Err("pattern segments must not be empty");
            }

            if let Some(captures) = PLACEHOLDER.captures(part) {
                let name = captures[1].to_string();
                if segments
                    .iter()
                    .any(|segment| matches!(segment, Segment::Placeholder(existing) if *existing == name))
                {
                    return Err("placeholder names must be unique within a pattern");
                }
                segments.push(Segment::Placeholder(name));
            } else if part.contains(['{', '}']) {
                return Err("placeholders must span a whole segment, e.g. {name}");
            } else {
                segments.push(Segment::Literal(part.to_string()));
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            scheme: scheme.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Placeholder(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    pub fn is_literal(&self) -> bool {
        self.placeholders().next().is_none()
    }

    /// Two patterns share a shape when they would match exactly the same set of URIs.
    pub fn same_shape(&self, other: &Self) -> bool {
        self.scheme == other.scheme
            && self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|pair| match pair {
                    (Segment::Literal(left), Segment::Literal(right)) => left == right,
                    (Segment::Placeholder(_), Segment::Placeholder(_)) => true,
                    _ => false,
                })
    }

    /// Orders patterns from most to least specific: fewer placeholders first, then literal
    /// segments before placeholders at the first position where the two differ.
    pub fn specificity_cmp(&self, other: &Self) -> Ordering {
        let placeholder_count = |pattern: &Self| pattern.placeholders().count();
        placeholder_count(self)
            .cmp(&placeholder_count(other))
            .then_with(|| {
                let kinds = |pattern: &Self| {
                    pattern
                        .segments
                        .iter()
                        .map(|segment| matches!(segment, Segment::Placeholder(_)))
                        .collect::<Vec<_>>()
                };
                kinds(self).cmp(&kinds(other))
            })
    }

    /// Matches a concrete URI, returning `(placeholder, value)` pairs in pattern order.
    pub fn match_uri(&self, uri: &str) -> Option<Vec<(String, String)>> {
        let (scheme, path) = uri.split_once("://")?;
        if scheme != self.scheme {
            return None;
        }

        let parts: Vec<&str> = path.split('/').collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut extracted = Vec::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(literal) if literal == part => {}
                Segment::Literal(_) => return None,
                Segment::Placeholder(_) if part.is_empty() => return None,
                Segment::Placeholder(name) => extracted.push((name.clone(), part.to_string())),
            }
        }

        Some(extracted)
    }
}
