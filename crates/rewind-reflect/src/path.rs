//! Field paths and selector parsing.
//!
//! A [`FieldPath`] names one field of an entity type, possibly through one or
//! more nested value objects (`address.city`). Paths are validated once, when
//! they are parsed, so every later lookup can assume well-formed segments.
//!
//! Selectors may be written either as a bare path (`price`, `inner.count`) or
//! with a parameter binding in front (`x => x.inner.count`, `|x| x.price`).
//! Anything that is not a chain of plain field projections -- a comparison, a
//! method call, an index expression -- is rejected with
//! [`ReflectError::InvalidPath`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ReflectError;

// ---------------------------------------------------------------------------
// FieldPath
// ---------------------------------------------------------------------------

/// A validated, dot-separated chain of field names.
///
/// Always holds at least one segment. Serialized as its dotted text and
/// re-validated through [`FieldPath::parse`] when deserialized.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// Parse a selector into a path.
    ///
    /// ```
    /// use rewind_reflect::path::FieldPath;
    ///
    /// let path = FieldPath::parse("x => x.inner.count").unwrap();
    /// assert_eq!(path.to_string(), "inner.count");
    /// assert!(FieldPath::parse("x => x.count == 2").is_err());
    /// ```
    pub fn parse(selector: &str) -> Result<Self, ReflectError> {
        let trimmed = selector.trim();
        if trimmed.is_empty() {
            return Err(invalid(selector, "selector is empty"));
        }

        let body = strip_binding(selector, trimmed)?;

        let mut segments = Vec::new();
        for raw in body.split('.') {
            if raw.is_empty() {
                return Err(invalid(selector, "selector contains an empty segment"));
            }
            if let Some(reason) = segment_defect(raw) {
                return Err(invalid(selector, &reason));
            }
            segments.push(raw.to_owned());
        }

        Ok(Self { segments })
    }

    /// Build a path from identifier segments produced by the
    /// [`selector!`](crate::selector) macro. Use [`FieldPath::parse`]
    /// everywhere else.
    ///
    /// # Panics
    ///
    /// Panics if `segments` is empty or a segment is not a field name.
    #[doc(hidden)]
    pub fn from_segments(segments: &[&str]) -> Self {
        assert!(!segments.is_empty(), "a field path needs at least one segment");
        if let Some(reason) = segments.iter().find_map(|s| segment_defect(s)) {
            panic!("{reason}");
        }
        Self {
            segments: segments.iter().map(|s| (*s).to_owned()).collect(),
        }
    }

    /// A single-segment path.
    pub fn single(name: &str) -> Self {
        Self {
            segments: vec![name.to_owned()],
        }
    }

    /// Iterate over the segments from the outermost field inwards.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().map(String::as_str)
    }

    /// The innermost field name.
    pub fn terminal(&self) -> &str {
        // Non-empty by construction.
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// Number of hops (1 for a plain field).
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Append `inner` below this path.
    pub fn join(&self, inner: &FieldPath) -> FieldPath {
        let mut segments = self.segments.clone();
        segments.extend(inner.segments.iter().cloned());
        FieldPath { segments }
    }

    pub(crate) fn raw_segments(&self) -> &[String] {
        &self.segments
    }
}

impl fmt::Debug for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldPath({})", self)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

impl TryFrom<String> for FieldPath {
    type Error = ReflectError;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        FieldPath::parse(&text)
    }
}

impl From<FieldPath> for String {
    fn from(path: FieldPath) -> Self {
        path.to_string()
    }
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

fn invalid(selector: &str, reason: &str) -> ReflectError {
    ReflectError::InvalidPath {
        selector: selector.to_owned(),
        reason: reason.to_owned(),
    }
}

/// Remove a leading `x =>` or `|x|` binding and the matching `x.` prefix.
fn strip_binding<'a>(selector: &str, trimmed: &'a str) -> Result<&'a str, ReflectError> {
    let (param, body) = if let Some((param, body)) = trimmed.split_once("=>") {
        (param.trim(), body.trim())
    } else if let Some(rest) = trimmed.strip_prefix('|') {
        match rest.split_once('|') {
            Some((param, body)) => (param.trim(), body.trim()),
            None => return Err(invalid(selector, "unterminated closure parameter")),
        }
    } else {
        return Ok(trimmed);
    };

    if !is_identifier(param) {
        return Err(invalid(selector, "selector parameter is not a plain name"));
    }
    if body == param {
        return Err(invalid(selector, "selector returns the entity itself, not a field"));
    }
    body.strip_prefix(param)
        .and_then(|rest| rest.strip_prefix('.'))
        .ok_or_else(|| invalid(selector, "selector body does not project from its parameter"))
}

fn segment_defect(segment: &str) -> Option<String> {
    if is_identifier(segment) || segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let reason = if ["==", "!=", "<", ">", "&&", "||"]
        .iter()
        .any(|op| segment.contains(op))
    {
        format!("'{segment}' is a comparison, not a field projection")
    } else if segment.contains('(') {
        format!("'{segment}' is a method call, not a field projection")
    } else if segment.contains('[') {
        format!("'{segment}' is an index expression, not a field projection")
    } else {
        format!("'{segment}' is not a field name")
    };
    Some(reason)
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    s != "_" && chars.all(|c| c.is_alphanumeric() || c == '_')
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
