use super::policy::{NavigationTarget, RouteTable};
use crate::models::Role;
use crate::session::Session;

pub const ADMIN_REQUIRED_MESSAGE: &str = "admin access required";

/// Outcome of a navigation check. The navigation host carries it out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Proceed,
    RedirectTo(String),
    /// Show `message` to the user, then redirect.
    Deny { message: String, redirect_to: String },
}

impl Decision {
    pub fn is_proceed(&self) -> bool {
        matches!(self, Decision::Proceed)
    }

    pub fn redirect_target(&self) -> Option<&str> {
        match self {
            Decision::Proceed => None,
            Decision::RedirectTo(path) => Some(path.as_str()),
            Decision::Deny { redirect_to, .. } => Some(redirect_to.as_str()),
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Decision::Deny { message, .. } => Some(message.as_str()),
            _ => None,
        }
    }
}

/// Where the guard sends users it turns away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationPaths {
    pub login: String,
    pub default_authenticated: String,
}

impl Default for NavigationPaths {
    fn default() -> Self {
        Self {
            login: "/login".to_string(),
            default_authenticated: "/dashboard".to_string(),
        }
    }
}

/// Navigation evaluator trait for pluggable guard logic
pub trait NavigationEvaluator: Send + Sync {
    fn evaluate(&self, target: &NavigationTarget, session: &Session) -> Decision;
}

/// Default navigation evaluator
///
/// Evaluation order (first match wins):
/// 1. auth required, no token -> login
/// 2. admin-only anywhere in the chain -> admin passes, everyone else is denied
/// 3. allowed roles on the chain -> no user goes to login, other roles are denied
/// 4. login page while holding a token -> default page
/// 5. proceed
///
/// Admin-only routes never reach the allowed-roles check.
#[derive(Debug, Clone, Default)]
pub struct DefaultNavigationEvaluator {
    paths: NavigationPaths,
}

impl DefaultNavigationEvaluator {
    pub fn new(paths: NavigationPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &NavigationPaths {
        &self.paths
    }

    fn deny(&self, message: String) -> Decision {
        Decision::Deny {
            message,
            redirect_to: self.paths.default_authenticated.clone(),
        }
    }
}

impl NavigationEvaluator for DefaultNavigationEvaluator {
    fn evaluate(&self, target: &NavigationTarget, session: &Session) -> Decision {
        let role = session.role();

        // 1. Authentication
        if target.requires_auth() && session.token().is_none() {
            tracing::debug!(path = %target.path, "no session token, redirecting to login");
            return Decision::RedirectTo(self.paths.login.clone());
        }

        // 2. Admin-only sections
        if target.requires_admin_only() {
            return match role {
                Some(Role::Admin) => {
                    tracing::debug!(path = %target.path, "admin access granted");
                    Decision::Proceed
                }
                _ => {
                    tracing::debug!(path = %target.path, role = ?role, "admin access denied");
                    self.deny(ADMIN_REQUIRED_MESSAGE.to_string())
                }
            };
        }

        // 3. Role allow-list
        if let Some(allowed) = target.allowed_roles() {
            let Some(role) = role else {
                tracing::debug!(path = %target.path, "no session user, redirecting to login");
                return Decision::RedirectTo(self.paths.login.clone());
            };

            if !allowed.contains(&role) {
                tracing::debug!(path = %target.path, role = %role, "role not allowed");
                return self.deny(format!("role {} lacks permission", role));
            }

            tracing::debug!(path = %target.path, role = %role, "role allowed");
            return Decision::Proceed;
        }

        // 4. Already signed in
        if target.is(&self.paths.login) && session.token().is_some() {
            return Decision::RedirectTo(self.paths.default_authenticated.clone());
        }

        // 5. Public
        Decision::Proceed
    }
}

/// Evaluate `target` against `session` with the default evaluator.
pub fn evaluate(target: &NavigationTarget, session: &Session, paths: &NavigationPaths) -> Decision {
    DefaultNavigationEvaluator::new(paths.clone()).evaluate(target, session)
}

/// Route table plus evaluator; what a navigation host holds on to.
pub struct Guard<E = DefaultNavigationEvaluator> {
    table: RouteTable,
    evaluator: E,
}

impl Guard<DefaultNavigationEvaluator> {
    pub fn new(table: RouteTable, paths: NavigationPaths) -> Self {
        Self {
            table,
            evaluator: DefaultNavigationEvaluator::new(paths),
        }
    }

    pub fn standard() -> Self {
        Self::new(RouteTable::standard(), NavigationPaths::default())
    }

    pub fn paths(&self) -> &NavigationPaths {
        self.evaluator.paths()
    }
}

impl<E: NavigationEvaluator> Guard<E> {
    pub fn with_evaluator(table: RouteTable, evaluator: E) -> Self {
        Self { table, evaluator }
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Resolve `path` and decide whether the navigation may complete.
    pub fn navigate(&self, path: &str, session: &Session) -> Decision {
        let target = self.table.resolve(path);
        self.evaluator.evaluate(&target, session)
    }

    pub fn evaluate(&self, target: &NavigationTarget, session: &Session) -> Decision {
        self.evaluator.evaluate(target, session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::RoutePolicy;
    use crate::models::User;

    fn session_as(role: Role) -> Session {
        Session::authenticated("t", User::new("PI0824.0001", role))
    }

    fn check(target: &NavigationTarget, session: &Session) -> Decision {
        evaluate(target, session, &NavigationPaths::default())
    }

    #[test]
    fn missing_token_redirects_to_login_whatever_else_is_set() {
        let policies = [
            RoutePolicy::authenticated(),
            RoutePolicy::admin_only(),
            RoutePolicy::roles([Role::Guest]),
            RoutePolicy {
                requires_auth: true,
                requires_admin_only: true,
                allowed_roles: Some(Role::ALL.into_iter().collect()),
            },
        ];

        for policy in policies {
            let target = NavigationTarget::single("/anything", policy);
            assert_eq!(
                check(&target, &Session::anonymous()),
                Decision::RedirectTo("/login".to_string())
            );
        }
    }

    #[test]
    fn admin_passes_every_admin_only_chain() {
        let chains = [
            vec![RoutePolicy::admin_only()],
            vec![RoutePolicy::admin_only(), RoutePolicy::public()],
            vec![RoutePolicy::admin_only(), RoutePolicy::roles([Role::Qc])],
        ];

        for chain in chains {
            let target = NavigationTarget::new("/admin/users", chain);
            assert_eq!(check(&target, &session_as(Role::Admin)), Decision::Proceed);
        }
    }

    #[test]
    fn admin_only_skips_the_role_allow_list() {
        // QC is allowed by the child, but the admin-only parent decides first.
        let target = NavigationTarget::new(
            "/admin/qc",
            vec![RoutePolicy::admin_only(), RoutePolicy::roles([Role::Qc])],
        );

        assert_eq!(
            check(&target, &session_as(Role::Qc)),
            Decision::Deny {
                message: ADMIN_REQUIRED_MESSAGE.to_string(),
                redirect_to: "/dashboard".to_string(),
            }
        );
    }

    #[test]
    fn roles_outside_the_allow_list_are_never_let_through() {
        let allowed = [Role::Admin, Role::Ppic];
        let target = NavigationTarget::single("/ppic", RoutePolicy::roles(allowed));

        for role in Role::ALL {
            let decision = check(&target, &session_as(role));
            if allowed.contains(&role) {
                assert_eq!(decision, Decision::Proceed);
            } else {
                assert_eq!(
                    decision,
                    Decision::Deny {
                        message: format!("role {} lacks permission", role),
                        redirect_to: "/dashboard".to_string(),
                    }
                );
            }
        }
    }

    #[test]
    fn guest_is_denied_planning_pages() {
        let target = NavigationTarget::single(
            "/ppic",
            RoutePolicy {
                requires_auth: false,
                requires_admin_only: false,
                allowed_roles: Some([Role::Admin, Role::Ppic].into_iter().collect()),
            },
        );

        let decision = check(&target, &session_as(Role::Guest));
        assert_eq!(decision.message(), Some("role Guest lacks permission"));
        assert_eq!(decision.redirect_target(), Some("/dashboard"));
    }

    #[test]
    fn role_list_without_auth_flag_sends_anonymous_users_to_login() {
        let target = NavigationTarget::single(
            "/reports",
            RoutePolicy {
                requires_auth: false,
                requires_admin_only: false,
                allowed_roles: Some([Role::Qc].into_iter().collect()),
            },
        );

        assert_eq!(
            check(&target, &Session::anonymous()),
            Decision::RedirectTo("/login".to_string())
        );
    }

    #[test]
    fn login_page_bounces_signed_in_users() {
        let target = NavigationTarget::single("/login", RoutePolicy::public());

        assert_eq!(
            check(&target, &session_as(Role::Pem)),
            Decision::RedirectTo("/dashboard".to_string())
        );
        assert_eq!(check(&target, &Session::anonymous()), Decision::Proceed);
    }

    #[test]
    fn routes_without_policy_are_public() {
        let empty = NavigationTarget::new("/landing", Vec::new());
        let public = NavigationTarget::single("/ganttchart", RoutePolicy::public());

        for session in [Session::anonymous(), session_as(Role::Guest)] {
            assert_eq!(check(&empty, &session), Decision::Proceed);
            assert_eq!(check(&public, &session), Decision::Proceed);
        }
    }

    #[test]
    fn guard_resolves_before_evaluating() {
        let guard = Guard::standard();

        assert_eq!(
            guard.navigate("/", &session_as(Role::Ppic)),
            Decision::RedirectTo("/dashboard".to_string())
        );
        assert_eq!(guard.navigate("/admin", &session_as(Role::Admin)), Decision::Proceed);
        assert_eq!(
            guard.navigate("/admin/schedule", &session_as(Role::Ppic)).message(),
            Some(ADMIN_REQUIRED_MESSAGE)
        );
        assert_eq!(guard.navigate("/pem", &session_as(Role::Engineering)), Decision::Proceed);
    }
}
