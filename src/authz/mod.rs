//! Authorization module - route policies and the navigation guard
//!
//! This module implements role-based route gating with support for:
//! - Per-route policies inherited by child routes
//! - Admin-only sections checked ahead of role allow-lists
//! - Menu visibility derived from the same route table

mod guard;
mod policy;

pub use guard::{
    evaluate, Decision, DefaultNavigationEvaluator, Guard, NavigationEvaluator, NavigationPaths,
    ADMIN_REQUIRED_MESSAGE,
};
pub use policy::{MenuEntry, NavigationTarget, Route, RoutePolicy, RouteTable};
