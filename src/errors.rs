use crate::authz::{Decision, NavigationPaths};

pub type AppResult<T> = Result<T, AppError>;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),
    #[error("forbidden: {0}")]
    ForbiddenRole(String),
    #[error("unauthorized approver: {0}")]
    UnauthorizedRole(String),
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("token error: {0}")]
    Token(String),
    #[error("backend error ({status}): {message}")]
    Backend { status: u16, message: String },
    #[error("failed to decode response: {0}")]
    Decode(String),
    #[error("database error")]
    Database(#[from] sqlx::Error),
    #[error("migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated(message.into())
    }

    pub fn forbidden_role(message: impl Into<String>) -> Self {
        Self::ForbiddenRole(message.into())
    }

    pub fn unauthorized_role(message: impl Into<String>) -> Self {
        Self::UnauthorizedRole(message.into())
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn token(err: impl Into<String>) -> Self {
        Self::Token(err.into())
    }

    pub fn backend(status: u16, message: impl Into<String>) -> Self {
        Self::Backend {
            status,
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    /// Whether recovering from this error means sending the user back to the login page.
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            AppError::Unauthenticated(_) | AppError::Token(_) | AppError::Backend { status: 401, .. }
        )
    }

    /// Map the error to what the navigation host should do with it.
    ///
    /// Every error is recoverable at the UI boundary: the message is shown to the
    /// user and the host lands on the login page (authentication failures) or on
    /// the default authenticated page (everything else).
    pub fn recovery(&self, paths: &NavigationPaths) -> Decision {
        let redirect_to = if self.requires_login() {
            paths.login.clone()
        } else {
            paths.default_authenticated.clone()
        };

        Decision::Deny {
            message: self.to_string(),
            redirect_to,
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Decode(value.to_string())
    }
}
