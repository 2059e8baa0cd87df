use reqwest::Method;
use serde_json::Value;

use super::{ApiClient, MessageResponse};
use crate::errors::AppResult;
use crate::models::user::{LoginRequest, LoginResponse, RegisterRequest, User, UserUpdateRequest};

impl ApiClient {
    /// Authenticate and start a session with the returned token and profile.
    pub async fn login(&self, user_id: &str, password: &str) -> AppResult<User> {
        let payload = LoginRequest {
            user_id: user_id.to_string(),
            password: password.to_string(),
        };

        let builder = self
            .request(Method::POST, "/auth/login", false)?
            .json(&payload);
        let response: LoginResponse = self.data(builder).await?;

        self.session
            .login(response.token, response.user.clone())
            .await?;
        Ok(response.user)
    }

    pub async fn register(&self, payload: &RegisterRequest) -> AppResult<User> {
        let builder = self
            .request(Method::POST, "/auth/register", false)?
            .json(payload);
        self.data(builder).await
    }

    pub async fn profile(&self) -> AppResult<User> {
        self.get_data("/auth/profile").await
    }

    /// Revoke the token on the backend, then clear the local session.
    ///
    /// The local session is cleared even when the backend call fails.
    pub async fn logout(&self) -> AppResult<()> {
        if self.session.is_authenticated() {
            let result = self
                .send_ack::<()>(Method::POST, "/auth/logout", None)
                .await;
            if let Err(err) = result {
                tracing::warn!(error = %err, "backend logout failed, clearing local session anyway");
            }
        }

        self.session.logout().await
    }

    // Users

    /// Users selectable as approvers; open to every authenticated user.
    pub async fn list_users(&self) -> AppResult<Value> {
        self.get_data("/users").await
    }

    pub async fn admin_list_users(&self) -> AppResult<Value> {
        self.get_data("/admin/users").await
    }

    pub async fn admin_update_user(
        &self,
        id: i64,
        payload: &UserUpdateRequest,
    ) -> AppResult<MessageResponse> {
        self.send_ack(Method::PUT, &format!("/admin/users/{}", id), Some(payload))
            .await
    }

    pub async fn admin_delete_user(&self, id: i64) -> AppResult<MessageResponse> {
        self.delete(&format!("/admin/users/{}", id)).await
    }
}
