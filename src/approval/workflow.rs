use chrono::{DateTime, Utc};

use super::{ApprovalDecision, ApprovalOutcome, OperationPlan, PlanStatus};
use crate::client::ApiClient;
use crate::errors::{AppError, AppResult};
use crate::models::plan::{ApprovalStatus, PemApproval, PemOperationPlan};
use crate::models::Role;

/// A plan as last fetched from the backend.
///
/// The backend-reported status is authoritative. The tracker rebuilt from the
/// approval records only covers slots that name a known role; slots such as
/// `Custom1` are left out of it.
#[derive(Debug, Clone)]
pub struct PlanSnapshot {
    pub record: PemOperationPlan,
    plan: OperationPlan,
    assigned_roles: Vec<Role>,
}

impl PlanSnapshot {
    pub fn from_record(record: PemOperationPlan) -> Self {
        let mut assigned_roles = Vec::new();
        let mut decisions = Vec::new();

        for approval in &record.approvals {
            let role = match approval.approver_role.parse::<Role>() {
                Ok(role) => role,
                Err(err) => {
                    tracing::warn!(
                        plan_id = record.id,
                        slot = %approval.approver_role,
                        error = %err,
                        "approver slot has no matching role, leaving it out of the tracker"
                    );
                    continue;
                }
            };

            if !assigned_roles.contains(&role) {
                assigned_roles.push(role);
            }
            if let Some(decision) = decision_from(role, approval) {
                decisions.push(decision);
            }
        }

        let required = match record.status {
            PlanStatus::Draft => None,
            _ => Some(assigned_roles.clone()),
        };
        let plan = OperationPlan::restore(record.id, required, decisions);

        Self {
            record,
            plan,
            assigned_roles,
        }
    }

    pub fn id(&self) -> i64 {
        self.record.id
    }

    pub fn plan(&self) -> &OperationPlan {
        &self.plan
    }

    /// Roles holding an approver slot, in slot order.
    pub fn assigned_roles(&self) -> &[Role] {
        &self.assigned_roles
    }

    pub fn status(&self) -> PlanStatus {
        self.record.status
    }

    pub fn derived_status(&self) -> PlanStatus {
        self.plan.status()
    }

    pub fn is_consistent(&self) -> bool {
        self.status() == self.derived_status()
    }

    pub fn check_submit(&self) -> AppResult<()> {
        if self.status() != PlanStatus::Draft {
            return Err(AppError::invalid_state(format!(
                "plan {} is {}, only draft plans can be submitted",
                self.id(),
                self.status()
            )));
        }

        OperationPlan::new(self.id()).submit(self.assigned_roles.iter().copied())
    }

    pub fn check_decision(&self, role: Role) -> AppResult<()> {
        if self.status() == PlanStatus::Draft {
            return Err(AppError::invalid_state(format!(
                "plan {} is a draft and has not been submitted",
                self.id()
            )));
        }

        if !self.plan.required_approvers().contains(&role) {
            return Err(AppError::unauthorized_role(format!(
                "{} is not a required approver for plan {}",
                role,
                self.id()
            )));
        }

        match self.status() {
            PlanStatus::PendingApproval => Ok(()),
            status => Err(AppError::invalid_state(format!(
                "plan {} is {}",
                self.id(),
                status
            ))),
        }
    }
}

fn decision_from(role: Role, approval: &PemApproval) -> Option<ApprovalDecision> {
    let outcome = match approval.status {
        ApprovalStatus::Pending => return None,
        ApprovalStatus::Approved => ApprovalOutcome::Approved,
        ApprovalStatus::Rejected => ApprovalOutcome::Rejected,
    };
    let decided_at: DateTime<Utc> = approval.approved_at.unwrap_or(approval.updated_at);

    Some(ApprovalDecision {
        role,
        outcome,
        comment: approval.comments.clone(),
        decided_at,
    })
}

/// Drives plan transitions against the backend, checking each one locally
/// first so an impossible transition fails without a round trip.
#[derive(Clone)]
pub struct PlanWorkflow {
    client: ApiClient,
}

impl PlanWorkflow {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub async fn fetch(&self, plan_id: i64) -> AppResult<PlanSnapshot> {
        let record = self.client.get_plan(plan_id).await?;
        Ok(snapshot(record))
    }

    pub async fn submit(&self, plan_id: i64) -> AppResult<PlanSnapshot> {
        self.fetch(plan_id).await?.check_submit()?;
        self.client.submit_plan(plan_id).await?;
        tracing::info!(plan_id, "plan submitted for approval");
        self.fetch(plan_id).await
    }

    pub async fn approve(&self, plan_id: i64, role: Role, comment: &str) -> AppResult<PlanSnapshot> {
        self.fetch(plan_id).await?.check_decision(role)?;
        self.client.approve_plan(plan_id, role, comment).await?;
        tracing::info!(plan_id, role = %role, "plan approved");
        self.fetch(plan_id).await
    }

    pub async fn reject(&self, plan_id: i64, role: Role, comment: &str) -> AppResult<PlanSnapshot> {
        self.fetch(plan_id).await?.check_decision(role)?;
        self.client.reject_plan(plan_id, role, comment).await?;
        tracing::info!(plan_id, role = %role, "plan rejected");
        self.fetch(plan_id).await
    }

    pub async fn pending_for_me(&self) -> AppResult<Vec<PlanSnapshot>> {
        let records = self.client.pending_approvals().await?;
        Ok(records.into_iter().map(snapshot).collect())
    }
}

fn snapshot(record: PemOperationPlan) -> PlanSnapshot {
    let snapshot = PlanSnapshot::from_record(record);
    if !snapshot.is_consistent() {
        tracing::warn!(
            plan_id = snapshot.id(),
            reported = %snapshot.status(),
            derived = %snapshot.derived_status(),
            "plan status differs from its approval records, using the reported status"
        );
    }
    snapshot
}
