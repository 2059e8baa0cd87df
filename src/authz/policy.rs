use std::collections::BTreeSet;

use crate::models::Role;
use crate::utils::normalize_path;

const MAX_REDIRECTS: usize = 8;

/// Access-control metadata attached to a navigable route.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutePolicy {
    pub requires_auth: bool,
    pub requires_admin_only: bool,
    pub allowed_roles: Option<BTreeSet<Role>>,
}

impl RoutePolicy {
    pub fn public() -> Self {
        Self::default()
    }

    pub fn authenticated() -> Self {
        Self {
            requires_auth: true,
            ..Self::default()
        }
    }

    pub fn admin_only() -> Self {
        Self {
            requires_auth: true,
            requires_admin_only: true,
            allowed_roles: None,
        }
    }

    pub fn roles(roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            requires_auth: true,
            requires_admin_only: false,
            allowed_roles: Some(roles.into_iter().collect()),
        }
    }

    /// A policy with no restriction at all.
    pub fn is_public(&self) -> bool {
        !self.requires_auth && !self.requires_admin_only && self.allowed_roles.is_none()
    }

    /// Whether a user holding `role` passes the role part of this policy.
    /// Routes without a role restriction return `None`.
    pub fn permits(&self, role: Role) -> Option<bool> {
        if self.requires_admin_only {
            return Some(role.is_admin());
        }
        self.allowed_roles
            .as_ref()
            .map(|allowed| allowed.contains(&role))
    }
}

/// A navigable route. Child paths are relative to the parent.
#[derive(Debug, Clone)]
pub struct Route {
    pub path: String,
    pub title: Option<String>,
    pub policy: RoutePolicy,
    pub redirect: Option<String>,
    pub children: Vec<Route>,
}

impl Route {
    pub fn new(path: impl Into<String>, policy: RoutePolicy) -> Self {
        Self {
            path: path.into(),
            title: None,
            policy,
            redirect: None,
            children: Vec::new(),
        }
    }

    pub fn redirect(path: impl Into<String>, to: impl Into<String>) -> Self {
        Self::new(path, RoutePolicy::public()).redirect_to(to)
    }

    /// Show the route as a section in the navigation menu.
    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn redirect_to(mut self, to: impl Into<String>) -> Self {
        self.redirect = Some(to.into());
        self
    }

    pub fn with_children(mut self, children: Vec<Route>) -> Self {
        self.children = children;
        self
    }
}

/// A resolved navigation target with the policy chain of every matched
/// route, parent first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationTarget {
    pub path: String,
    pub chain: Vec<RoutePolicy>,
}

impl NavigationTarget {
    pub fn new(path: impl Into<String>, chain: Vec<RoutePolicy>) -> Self {
        Self {
            path: normalize_path(&path.into()),
            chain,
        }
    }

    pub fn single(path: impl Into<String>, policy: RoutePolicy) -> Self {
        Self::new(path, vec![policy])
    }

    pub fn is(&self, path: &str) -> bool {
        self.path == normalize_path(path)
    }

    pub fn requires_auth(&self) -> bool {
        self.chain.iter().any(|policy| policy.requires_auth)
    }

    pub fn requires_admin_only(&self) -> bool {
        self.chain.iter().any(|policy| policy.requires_admin_only)
    }

    /// The first `allowed_roles` set found walking the chain from the parent.
    pub fn allowed_roles(&self) -> Option<&BTreeSet<Role>> {
        self.chain
            .iter()
            .find_map(|policy| policy.allowed_roles.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuEntry {
    pub title: String,
    pub path: String,
}

/// The single source of route policy. Menu visibility is derived from it.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    /// The application's navigation.
    pub fn standard() -> Self {
        use Role::*;

        let everyone = Role::ALL;

        Self::new(vec![
            Route::redirect("/", "/login"),
            Route::new("/login", RoutePolicy::public()),
            Route::new("/dashboard", RoutePolicy::authenticated()),
            Route::new("/ppic", RoutePolicy::roles([Admin, Ppic])).titled("PPIC"),
            Route::new("/toolpather", RoutePolicy::roles([Admin, Toolpather])).titled("Toolpather"),
            Route::new(
                "/pem",
                RoutePolicy::roles([Admin, Toolpather, Pem, Qc, Engineering]),
            )
            .titled("PEM"),
            Route::new("/qc", RoutePolicy::roles([Admin, Qc])).titled("QC"),
            Route::new("/admin", RoutePolicy::admin_only())
                .titled("Admin")
                .redirect_to("/admin/users")
                .with_children(vec![
                    Route::new("users", RoutePolicy::public()),
                    Route::new("machines", RoutePolicy::public()),
                    Route::new("schedule", RoutePolicy::public()),
                ]),
            Route::new("/database", RoutePolicy::roles(everyone)).titled("Database"),
            Route::new("/timetrack", RoutePolicy::roles(everyone)).titled("Time Track"),
            Route::new("/reporttrack", RoutePolicy::roles(everyone)).titled("Report Track"),
            Route::new("/ganttchart", RoutePolicy::public()),
        ])
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Resolve a path to its target, following static redirects.
    ///
    /// Unknown paths resolve to an empty policy chain.
    pub fn resolve(&self, path: &str) -> NavigationTarget {
        let mut current = normalize_path(path);

        for _ in 0..MAX_REDIRECTS {
            match self.match_path(&current) {
                Some((_, Some(redirect))) => {
                    tracing::trace!(from = %current, to = %redirect, "following route redirect");
                    current = normalize_path(redirect);
                }
                Some((chain, None)) => return NavigationTarget::new(current, chain),
                None => return NavigationTarget::new(current, Vec::new()),
            }
        }

        tracing::warn!(path = %current, "route redirect limit reached");
        let chain = self
            .match_path(&current)
            .map(|(chain, _)| chain)
            .unwrap_or_default();
        NavigationTarget::new(current, chain)
    }

    /// Menu sections a role may open, in table order.
    pub fn menu_for(&self, role: Role) -> Vec<MenuEntry> {
        self.routes
            .iter()
            .filter_map(|route| {
                let title = route.title.as_ref()?;
                match route.policy.permits(role) {
                    Some(true) => Some(MenuEntry {
                        title: title.clone(),
                        path: route.path.clone(),
                    }),
                    _ => None,
                }
            })
            .collect()
    }

    fn match_path<'a>(&'a self, path: &str) -> Option<(Vec<RoutePolicy>, Option<&'a str>)> {
        for route in &self.routes {
            let base = normalize_path(&route.path);
            if path == base {
                return Some((vec![route.policy.clone()], route.redirect.as_deref()));
            }

            let prefix = if base == "/" { base.clone() } else { format!("{}/", base) };
            let Some(rest) = path.strip_prefix(&prefix) else {
                continue;
            };

            for child in &route.children {
                if rest == child.path.trim_matches('/') {
                    return Some((
                        vec![route.policy.clone(), child.policy.clone()],
                        child.redirect.as_deref(),
                    ));
                }
            }
        }

        None
    }
}
