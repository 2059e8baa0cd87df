use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{DecodingKey, Validation};

use crate::errors::AppError;

/// Claims the backend puts into its bearer tokens.
///
/// Only the timestamps are read. Every other claim is ignored and the token
/// is otherwise treated as opaque.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(default)]
    pub iat: Option<i64>,
}

impl Claims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| Utc.timestamp_opt(exp, 0).single())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().map(|exp| exp <= now).unwrap_or(false)
    }
}

/// Read the claims of a JWT without verifying its signature.
///
/// The signing secret lives on the backend; the client only uses the claims
/// to drop sessions that have already expired.
pub fn peek_claims(token: &str) -> Result<Claims, AppError> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    jsonwebtoken::decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(|err| AppError::token(err.to_string()))
}
