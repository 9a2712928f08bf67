//! The route matching tree.

use std::collections::HashMap;

use http::Method;
use regex::Regex;
use thiserror::Error;
use tracing::debug;

use crate::router::params::PathParams;
use crate::router::pattern::{parse_pattern, Segment};

/// Errors reported at registration time. A failed registration leaves the
/// tree unchanged.
#[derive(Error, Debug)]
pub enum RouterError {
    #[error("invalid route pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("duplicate route: {method} {pattern}")]
    DuplicateRoute { method: Method, pattern: String },

    #[error("conflicting parameter names in '{pattern}': '{existing}' vs '{new}'")]
    ConflictingParam { pattern: String, existing: String, new: String },
}

impl RouterError {
    pub(crate) fn invalid_pattern<S: ToString>(pattern: &str, reason: S) -> Self {
        Self::InvalidPattern { pattern: pattern.to_string(), reason: reason.to_string() }
    }
}

/// Result of routing one request path.
#[derive(Debug)]
pub enum RouteOutcome<'r, T> {
    /// A route matched the path and the method.
    Matched { value: &'r T, params: PathParams },
    /// Some route matched the path, none with this method.
    MethodNotAllowed { allowed: Vec<Method> },
    NotFound,
}

struct MethodSet<T> {
    entries: Vec<(Method, T)>,
}

impl<T> MethodSet<T> {
    fn get(&self, method: &Method) -> Option<&T> {
        self.entries.iter().find(|(m, _)| m == method).map(|(_, v)| v)
    }

    fn collect_methods(&self, out: &mut Vec<Method>) {
        for (method, _) in &self.entries {
            if !out.contains(method) {
                out.push(method.clone());
            }
        }
    }
}

/// A parameter edge with a segment-anchored constraint. Edges are tried in
/// registration order, so the first registered constraint wins when several
/// accept the same segment.
struct ConstrainedEdge<T> {
    name: String,
    source: String,
    regex: Regex,
    node: Node<T>,
}

struct Node<T> {
    literals: HashMap<String, Node<T>>,
    constrained: Vec<ConstrainedEdge<T>>,
    param: Option<(String, Box<Node<T>>)>,
    wildcard: Option<(String, MethodSet<T>)>,
    leaf: Option<MethodSet<T>>,
}

impl<T> Default for Node<T> {
    fn default() -> Self {
        Self { literals: HashMap::new(), constrained: Vec::new(), param: None, wildcard: None, leaf: None }
    }
}

/// Method-aware route tree. Built up-front with [`register`](Self::register)
/// and shared immutably while serving; updates are a rebuild-and-swap.
///
/// Matching precedence at each node: literal child, constrained parameters
/// in registration order, the unconstrained parameter, then the wildcard.
/// Matching backtracks, so a literal dead end still lets a parameter edge
/// claim the same segment.
pub struct Router<T> {
    root: Node<T>,
}

impl<T> Default for Router<T> {
    fn default() -> Self {
        Self { root: Node::default() }
    }
}

impl<T> Router<T> {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn register(&mut self, method: Method, pattern: &str, value: T) -> Result<(), RouterError> {
        let segments = parse_pattern(pattern)?;

        let mut node = &mut self.root;
        let mut wildcard_name = None;
        for segment in segments {
            match segment {
                Segment::Literal(text) => {
                    node = node.literals.entry(text).or_default();
                }
                Segment::Param { name, regex: Some(regex) } => {
                    let source = regex.as_str().to_string();
                    // an edge is shared only when both the constraint and
                    // the name agree; otherwise it is a new edge tried in
                    // registration order
                    match node.constrained.iter().position(|e| e.source == source && e.name == name) {
                        Some(i) => {
                            node = &mut node.constrained[i].node;
                        }
                        None => {
                            node.constrained.push(ConstrainedEdge {
                                name,
                                source,
                                regex,
                                node: Node::default(),
                            });
                            let last = node.constrained.len() - 1;
                            node = &mut node.constrained[last].node;
                        }
                    }
                }
                Segment::Param { name, regex: None } => {
                    match &mut node.param {
                        Some((existing, _)) if *existing != name => {
                            return Err(RouterError::ConflictingParam {
                                pattern: pattern.to_string(),
                                existing: existing.clone(),
                                new: name,
                            });
                        }
                        Some((_, child)) => node = child,
                        slot @ None => {
                            let (_, child) = slot.insert((name, Box::default()));
                            node = child.as_mut();
                        }
                    }
                }
                Segment::Wildcard { name } => {
                    // pattern parsing guarantees this is the last segment
                    wildcard_name = Some(name);
                }
            }
        }

        let leaf = match wildcard_name {
            Some(name) => {
                match &mut node.wildcard {
                    Some((existing, _)) if *existing != name => {
                        return Err(RouterError::ConflictingParam {
                            pattern: pattern.to_string(),
                            existing: existing.clone(),
                            new: name,
                        });
                    }
                    Some((_, leaf)) => leaf,
                    slot @ None => {
                        let (_, leaf) = slot.insert((name, MethodSet { entries: Vec::new() }));
                        leaf
                    }
                }
            }
            None => node.leaf.get_or_insert_with(|| MethodSet { entries: Vec::new() }),
        };

        if leaf.get(&method).is_some() {
            return Err(RouterError::DuplicateRoute { method, pattern: pattern.to_string() });
        }
        debug!(%method, pattern, "route registered");
        leaf.entries.push((method, value));
        Ok(())
    }

    /// Resolves a request path, distinguishing an unknown path from a known
    /// path with the wrong method.
    pub fn route<'r>(&'r self, method: &Method, path: &str) -> RouteOutcome<'r, T> {
        let segments: Vec<&str> = split_path(path);

        let mut params = Vec::new();
        if let Some(value) = Self::find(&self.root, &segments, method, &mut params) {
            return RouteOutcome::Matched { value, params: PathParams::new(params) };
        }

        let mut allowed = Vec::new();
        Self::collect_allowed(&self.root, &segments, &mut allowed);
        if allowed.is_empty() {
            RouteOutcome::NotFound
        } else {
            RouteOutcome::MethodNotAllowed { allowed }
        }
    }

    fn find<'r>(
        node: &'r Node<T>,
        segments: &[&str],
        method: &Method,
        params: &mut Vec<(String, String)>,
    ) -> Option<&'r T> {
        let Some((&head, rest)) = segments.split_first() else {
            if let Some(value) = node.leaf.as_ref().and_then(|leaf| leaf.get(method)) {
                return Some(value);
            }
            // a trailing wildcard accepts an empty remainder
            if let Some((name, leaf)) = &node.wildcard {
                if let Some(value) = leaf.get(method) {
                    params.push((name.clone(), String::new()));
                    return Some(value);
                }
            }
            return None;
        };

        if let Some(child) = node.literals.get(head) {
            if let Some(value) = Self::find(child, rest, method, params) {
                return Some(value);
            }
        }

        for edge in &node.constrained {
            if edge.regex.is_match(head) {
                params.push((edge.name.clone(), head.to_string()));
                if let Some(value) = Self::find(&edge.node, rest, method, params) {
                    return Some(value);
                }
                params.pop();
            }
        }

        if let Some((name, child)) = &node.param {
            params.push((name.clone(), head.to_string()));
            if let Some(value) = Self::find(child, rest, method, params) {
                return Some(value);
            }
            params.pop();
        }

        if let Some((name, leaf)) = &node.wildcard {
            if let Some(value) = leaf.get(method) {
                params.push((name.clone(), segments.join("/")));
                return Some(value);
            }
        }

        None
    }

    /// Union of methods over every route whose path shape matches, for the
    /// `Allow` header of a 405.
    fn collect_allowed(node: &Node<T>, segments: &[&str], allowed: &mut Vec<Method>) {
        if let Some((_, leaf)) = &node.wildcard {
            leaf.collect_methods(allowed);
        }

        let Some((&head, rest)) = segments.split_first() else {
            if let Some(leaf) = &node.leaf {
                leaf.collect_methods(allowed);
            }
            return;
        };

        if let Some(child) = node.literals.get(head) {
            Self::collect_allowed(child, rest, allowed);
        }
        for edge in &node.constrained {
            if edge.regex.is_match(head) {
                Self::collect_allowed(&edge.node, rest, allowed);
            }
        }
        if let Some((_, child)) = &node.param {
            Self::collect_allowed(child, rest, allowed);
        }
    }
}

fn split_path(path: &str) -> Vec<&str> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    if trimmed.is_empty() {
        Vec::new()
    } else {
        trimmed.split('/').collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matched<'r>(outcome: RouteOutcome<'r, &'static str>) -> (&'r &'static str, PathParams) {
        match outcome {
            RouteOutcome::Matched { value, params } => (value, params),
            other => panic!("expected a match, got {other:?}"),
        }
    }

    #[test]
    fn literal_wins_over_param() {
        let mut router = Router::new();
        router.register(Method::GET, "/users/{id}", "param").unwrap();
        router.register(Method::GET, "/users/admin", "literal").unwrap();

        let (value, params) = matched(router.route(&Method::GET, "/users/admin"));
        assert_eq!(*value, "literal");
        assert!(params.is_empty());

        let (value, params) = matched(router.route(&Method::GET, "/users/42"));
        assert_eq!(*value, "param");
        assert_eq!(params.get("id"), Some("42"));
    }

    #[test]
    fn constrained_param_wins_over_unconstrained() {
        let mut router = Router::new();
        router.register(Method::GET, "/items/{name}", "any").unwrap();
        router.register(Method::GET, "/items/{id:int}", "numeric").unwrap();

        assert_eq!(*matched(router.route(&Method::GET, "/items/42")).0, "numeric");
        assert_eq!(*matched(router.route(&Method::GET, "/items/abc")).0, "any");
    }

    #[test]
    fn first_registered_constraint_wins() {
        let mut router = Router::new();
        router.register(Method::GET, "/x/{a:int}", "first").unwrap();
        router.register(Method::GET, "/x/{b:[0-9]+}", "second").unwrap();

        let (value, params) = matched(router.route(&Method::GET, "/x/7"));
        assert_eq!(*value, "first");
        assert_eq!(params.get("a"), Some("7"));
    }

    #[test]
    fn same_constraint_and_name_share_an_edge() {
        let mut router = Router::new();
        router.register(Method::GET, "/x/{id:int}", "get").unwrap();
        router.register(Method::PUT, "/x/{id:int}", "put").unwrap();

        assert_eq!(*matched(router.route(&Method::PUT, "/x/7")).0, "put");
        let err = router.register(Method::GET, "/x/{id:int}", "again").unwrap_err();
        assert!(matches!(err, RouterError::DuplicateRoute { .. }));
    }

    #[test]
    fn backtracks_out_of_a_literal_dead_end() {
        let mut router = Router::new();
        router.register(Method::GET, "/files/special", "special").unwrap();
        router.register(Method::GET, "/files/{name}/raw", "raw").unwrap();

        let (value, params) = matched(router.route(&Method::GET, "/files/special/raw"));
        assert_eq!(*value, "raw");
        assert_eq!(params.get("name"), Some("special"));
    }

    #[test]
    fn wildcard_captures_the_remainder() {
        let mut router = Router::new();
        router.register(Method::GET, "/static/{*path}", "static").unwrap();

        let (value, params) = matched(router.route(&Method::GET, "/static/css/site.css"));
        assert_eq!(*value, "static");
        assert_eq!(params.get("path"), Some("css/site.css"));

        let (_, params) = matched(router.route(&Method::GET, "/static/"));
        assert_eq!(params.get("path"), Some(""));
    }

    #[test]
    fn distinguishes_405_from_404() {
        let mut router = Router::new();
        router.register(Method::GET, "/users/{id}", "get").unwrap();
        router.register(Method::DELETE, "/users/{id}", "delete").unwrap();

        match router.route(&Method::POST, "/users/42") {
            RouteOutcome::MethodNotAllowed { allowed } => {
                assert!(allowed.contains(&Method::GET));
                assert!(allowed.contains(&Method::DELETE));
                assert_eq!(allowed.len(), 2);
            }
            other => panic!("expected method-not-allowed, got {other:?}"),
        }

        assert!(matches!(router.route(&Method::GET, "/nope"), RouteOutcome::NotFound));
    }

    #[test]
    fn method_match_searches_past_the_first_path_match() {
        let mut router = Router::new();
        router.register(Method::POST, "/users/admin", "post-admin").unwrap();
        router.register(Method::GET, "/users/{id}", "get-any").unwrap();

        // the literal branch only has POST, the param branch carries GET
        let (value, params) = matched(router.route(&Method::GET, "/users/admin"));
        assert_eq!(*value, "get-any");
        assert_eq!(params.get("id"), Some("admin"));
    }

    #[test]
    fn root_route() {
        let mut router = Router::new();
        router.register(Method::GET, "/", "root").unwrap();
        assert_eq!(*matched(router.route(&Method::GET, "/")).0, "root");
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut router = Router::new();
        router.register(Method::GET, "/a/{id}", "one").unwrap();
        let err = router.register(Method::GET, "/a/{id}", "two").unwrap_err();
        assert!(matches!(err, RouterError::DuplicateRoute { .. }));
        // same pattern, different method is fine
        router.register(Method::PUT, "/a/{id}", "three").unwrap();
    }

    #[test]
    fn conflicting_param_names_are_rejected() {
        let mut router = Router::new();
        router.register(Method::GET, "/a/{id}", "one").unwrap();
        let err = router.register(Method::POST, "/a/{name}", "two").unwrap_err();
        assert!(matches!(err, RouterError::ConflictingParam { .. }));
    }
}
