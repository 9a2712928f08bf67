//! Route pattern compilation.
//!
//! A pattern is a `/`-separated path where a segment is either a literal,
//! a parameter `{name}`, a constrained parameter `{name:regex}`, or a
//! trailing wildcard `{*name}`. The constraint is a raw regex anchored to
//! the whole segment, or one of a few named shorthands.

use regex::Regex;

use crate::router::RouterError;

/// Named constraint shorthands usable as `{name:int}` and friends.
const NAMED_PATTERNS: &[(&str, &str)] = &[
    ("int", "[0-9]+"),
    ("word", r"\w+"),
    ("alpha", "[a-zA-Z]+"),
    ("string", "[^/]+"),
];

#[derive(Debug)]
pub(crate) enum Segment {
    Literal(String),
    Param { name: String, regex: Option<Regex> },
    Wildcard { name: String },
}

/// Splits and compiles a route pattern. The wildcard, when present, must
/// be the final segment.
pub(crate) fn parse_pattern(pattern: &str) -> Result<Vec<Segment>, RouterError> {
    let invalid = |reason: &str| RouterError::invalid_pattern(pattern, reason);

    let Some(rest) = pattern.strip_prefix('/') else {
        return Err(invalid("pattern must start with '/'"));
    };

    let mut segments = Vec::new();
    if rest.is_empty() {
        return Ok(segments);
    }

    let raw: Vec<&str> = rest.split('/').collect();
    for (i, piece) in raw.iter().enumerate() {
        let segment = parse_segment(pattern, piece)?;
        if matches!(segment, Segment::Wildcard { .. }) && i + 1 != raw.len() {
            return Err(invalid("wildcard segment must be last"));
        }
        segments.push(segment);
    }
    Ok(segments)
}

fn parse_segment(pattern: &str, piece: &str) -> Result<Segment, RouterError> {
    let invalid = |reason: &str| RouterError::invalid_pattern(pattern, reason);

    let Some(inner) = piece.strip_prefix('{').and_then(|p| p.strip_suffix('}')) else {
        if piece.contains(['{', '}']) {
            return Err(invalid("braces are only valid as a whole parameter segment"));
        }
        return Ok(Segment::Literal(piece.to_string()));
    };

    if let Some(name) = inner.strip_prefix('*') {
        check_name(pattern, name)?;
        return Ok(Segment::Wildcard { name: name.to_string() });
    }

    match inner.split_once(':') {
        None => {
            check_name(pattern, inner)?;
            Ok(Segment::Param { name: inner.to_string(), regex: None })
        }
        Some((name, constraint)) => {
            check_name(pattern, name)?;
            let expr = NAMED_PATTERNS
                .iter()
                .find(|(named, _)| *named == constraint)
                .map_or(constraint, |(_, expr)| *expr);
            // anchored so the constraint covers the whole segment
            let regex = Regex::new(&format!("^(?:{expr})$"))
                .map_err(|e| invalid(&format!("bad constraint regex: {e}")))?;
            Ok(Segment::Param { name: name.to_string(), regex: Some(regex) })
        }
    }
}

fn check_name(pattern: &str, name: &str) -> Result<(), RouterError> {
    let mut chars = name.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(RouterError::invalid_pattern(pattern, "parameter name must be an identifier"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_segments() {
        let segments = parse_pattern("/users/{id:int}/files/{*path}").unwrap();
        assert_eq!(segments.len(), 4);
        assert!(matches!(&segments[0], Segment::Literal(s) if s == "users"));
        match &segments[1] {
            Segment::Param { name, regex: Some(regex) } => {
                assert_eq!(name, "id");
                assert!(regex.is_match("42"));
                assert!(!regex.is_match("42x"));
            }
            other => panic!("unexpected segment: {other:?}"),
        }
        assert!(matches!(&segments[3], Segment::Wildcard { name } if name == "path"));
    }

    #[test]
    fn root_pattern_is_empty() {
        assert!(parse_pattern("/").unwrap().is_empty());
    }

    #[test]
    fn raw_regex_constraint() {
        let segments = parse_pattern("/{version:[0-9]+\\.[0-9]+}").unwrap();
        match &segments[0] {
            Segment::Param { regex: Some(regex), .. } => {
                assert!(regex.is_match("1.2"));
                assert!(!regex.is_match("1"));
            }
            other => panic!("unexpected segment: {other:?}"),
        }
        // a brace parameter never mixes with literal text in one segment
        assert!(parse_pattern("/v{version:[0-9]+\\.[0-9]+}").is_err());
    }

    #[test]
    fn rejects_non_trailing_wildcard() {
        assert!(parse_pattern("/{*rest}/x").is_err());
    }

    #[test]
    fn rejects_missing_leading_slash() {
        assert!(parse_pattern("users").is_err());
    }

    #[test]
    fn rejects_bad_names_and_regexes() {
        assert!(parse_pattern("/{1abc}").is_err());
        assert!(parse_pattern("/{id:[}").is_err());
        assert!(parse_pattern("/a{b}c").is_err());
    }
}
