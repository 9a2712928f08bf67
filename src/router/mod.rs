//! Method-aware path routing.
//!
//! Routes are registered as patterns like `/users/{id:int}/files/{*path}`
//! and compiled into a tree that matches one segment at a time with
//! backtracking. The tree is immutable while serving; share it behind an
//! `Arc` and rebuild to change the route set.

mod params;
mod pattern;
mod tree;

pub use params::PathParams;
pub use tree::{RouteOutcome, Router, RouterError};
