use reqwest::Method;

use super::{ApiClient, MessageResponse};
use crate::errors::AppResult;
use crate::models::plan::{
    ApprovalActionRequest, AssignApproversRequest, CreatePlanRequest, CreateStepRequest,
    OperationPlanStep, PemOperationPlan, PlanFilters, UpdatePlanRequest, UpdateStepRequest,
};
use crate::models::Role;

const PLANS: &str = "/pem-operation-plans";

impl ApiClient {
    // =========================================================================
    // PLANS
    // =========================================================================

    pub async fn create_plan(&self, payload: &CreatePlanRequest) -> AppResult<PemOperationPlan> {
        self.send_data(Method::POST, PLANS, payload).await
    }

    pub async fn list_plans(&self, filters: &PlanFilters) -> AppResult<Vec<PemOperationPlan>> {
        self.get_data_with_query(PLANS, &filters.to_query()).await
    }

    pub async fn get_plan(&self, plan_id: i64) -> AppResult<PemOperationPlan> {
        self.get_data(&format!("{}/{}", PLANS, plan_id)).await
    }

    /// Only draft plans can be edited; the backend enforces it.
    pub async fn update_plan(
        &self,
        plan_id: i64,
        payload: &UpdatePlanRequest,
    ) -> AppResult<MessageResponse> {
        self.send_ack(Method::PUT, &format!("{}/{}", PLANS, plan_id), Some(payload))
            .await
    }

    pub async fn delete_plan(&self, plan_id: i64) -> AppResult<MessageResponse> {
        self.delete(&format!("{}/{}", PLANS, plan_id)).await
    }

    pub async fn plans_by_ppic_schedule(
        &self,
        schedule_id: i64,
    ) -> AppResult<Vec<PemOperationPlan>> {
        self.get_data(&format!("{}/ppic-schedule/{}", PLANS, schedule_id))
            .await
    }

    /// Plans waiting on the signed-in user's approval.
    pub async fn pending_approvals(&self) -> AppResult<Vec<PemOperationPlan>> {
        self.get_data(&format!("{}/pending-approvals", PLANS)).await
    }

    // =========================================================================
    // STEPS
    // =========================================================================

    pub async fn add_step(
        &self,
        plan_id: i64,
        payload: &CreateStepRequest,
    ) -> AppResult<OperationPlanStep> {
        self.send_data(Method::POST, &format!("{}/{}/steps", PLANS, plan_id), payload)
            .await
    }

    pub async fn update_step(
        &self,
        step_id: i64,
        payload: &UpdateStepRequest,
    ) -> AppResult<MessageResponse> {
        self.send_ack(
            Method::PUT,
            &format!("{}/steps/{}", PLANS, step_id),
            Some(payload),
        )
        .await
    }

    pub async fn delete_step(&self, step_id: i64) -> AppResult<MessageResponse> {
        self.delete(&format!("{}/steps/{}", PLANS, step_id)).await
    }

    pub async fn delete_step_image(&self, step_id: i64) -> AppResult<MessageResponse> {
        self.delete(&format!("{}/steps/{}/image", PLANS, step_id))
            .await
    }

    // =========================================================================
    // APPROVAL
    // =========================================================================

    pub async fn assign_approvers(
        &self,
        plan_id: i64,
        payload: &AssignApproversRequest,
    ) -> AppResult<MessageResponse> {
        self.send_ack(
            Method::POST,
            &format!("{}/{}/assign-approvers", PLANS, plan_id),
            Some(payload),
        )
        .await
    }

    pub async fn submit_plan(&self, plan_id: i64) -> AppResult<MessageResponse> {
        self.send_ack::<()>(Method::POST, &format!("{}/{}/submit", PLANS, plan_id), None)
            .await
    }

    pub async fn approve_plan(
        &self,
        plan_id: i64,
        role: Role,
        comments: &str,
    ) -> AppResult<MessageResponse> {
        self.decide(plan_id, "approve", role, comments).await
    }

    pub async fn reject_plan(
        &self,
        plan_id: i64,
        role: Role,
        comments: &str,
    ) -> AppResult<MessageResponse> {
        self.decide(plan_id, "reject", role, comments).await
    }

    async fn decide(
        &self,
        plan_id: i64,
        action: &str,
        role: Role,
        comments: &str,
    ) -> AppResult<MessageResponse> {
        let payload = ApprovalActionRequest {
            comments: comments.to_string(),
        };
        let builder = self
            .request(Method::POST, &format!("{}/{}/{}", PLANS, plan_id, action), true)?
            .query(&[("role", role.as_str())])
            .json(&payload);
        self.acknowledge(builder).await
    }
}
