//! Dotted / indexed path lookups into JSON values.
//!
//! Accepted forms: `instrument`, `instrument.symbol`, `expiry_list[0]`,
//! `expiry_list.0`, `chain.strikes[2].ltp`.

use crate::core::error::DomainError;
use serde_json::{Map, Value};

/// One step of a parsed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// A parsed context path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextPath {
    raw: String,
    segments: Vec<PathSegment>,
}

impl ContextPath {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DomainError::InvalidPath("empty path".to_string()));
        }

        let mut segments = Vec::new();
        for part in trimmed.split('.') {
            if part.is_empty() {
                return Err(DomainError::InvalidPath(format!("empty segment in '{}'", raw)));
            }
            parse_part(part, raw, &mut segments)?;
        }

        Ok(Self {
            raw: trimmed.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Top-level key the path starts from.
    pub fn root(&self) -> Option<&str> {
        match self.segments.first() {
            Some(PathSegment::Key(k)) => Some(k),
            _ => None,
        }
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Resolve against a top-level map. `null` leaves count as missing.
    pub fn resolve<'a>(&self, root: &'a Map<String, Value>) -> Option<&'a Value> {
        let mut iter = self.segments.iter();
        let mut current = match iter.next()? {
            PathSegment::Key(k) => root.get(k)?,
            PathSegment::Index(_) => return None,
        };

        for segment in iter {
            current = match (segment, current) {
                (PathSegment::Key(k), Value::Object(map)) => map.get(k)?,
                // `list.0` reads as an index when the value is an array
                (PathSegment::Key(k), Value::Array(items)) => items.get(k.parse::<usize>().ok()?)?,
                (PathSegment::Index(i), Value::Array(items)) => items.get(*i)?,
                _ => return None,
            };
        }

        if current.is_null() { None } else { Some(current) }
    }
}

impl std::fmt::Display for ContextPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}

fn parse_part(part: &str, raw: &str, out: &mut Vec<PathSegment>) -> Result<(), DomainError> {
    let (key, mut rest) = match part.find('[') {
        Some(pos) => (&part[..pos], &part[pos..]),
        None => (part, ""),
    };

    if !key.is_empty() {
        out.push(PathSegment::Key(key.to_string()));
    } else if out.is_empty() {
        return Err(DomainError::InvalidPath(format!(
            "path '{}' must start with a key",
            raw
        )));
    }

    while !rest.is_empty() {
        let close = rest
            .find(']')
            .ok_or_else(|| DomainError::InvalidPath(format!("unclosed '[' in '{}'", raw)))?;
        let index = rest[1..close]
            .trim()
            .parse::<usize>()
            .map_err(|_| DomainError::InvalidPath(format!("bad index in '{}'", raw)))?;
        out.push(PathSegment::Index(index));
        rest = &rest[close + 1..];
        if !rest.is_empty() && !rest.starts_with('[') {
            return Err(DomainError::InvalidPath(format!(
                "unexpected '{}' in '{}'",
                rest, raw
            )));
        }
    }

    Ok(())
}
