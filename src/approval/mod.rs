//! Approval workflow for PEM operation plans
//!
//! A plan keeps the frozen list of required approver roles and a decision log
//! with at most one entry per role. Status is never stored; it is derived from
//! the log on every call to [`OperationPlan::status`].

mod workflow;

pub use workflow::{PlanSnapshot, PlanWorkflow};

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};
use crate::models::Role;
use crate::utils::utc_now;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Draft,
    PendingApproval,
    Approved,
    Rejected,
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanStatus::Draft => "draft",
            PlanStatus::PendingApproval => "pending_approval",
            PlanStatus::Approved => "approved",
            PlanStatus::Rejected => "rejected",
        }
    }

    /// No decision may be recorded once a plan is approved or rejected.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PlanStatus::Approved | PlanStatus::Rejected)
    }
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PlanStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(PlanStatus::Draft),
            "pending_approval" | "pending" => Ok(PlanStatus::PendingApproval),
            "approved" => Ok(PlanStatus::Approved),
            "rejected" => Ok(PlanStatus::Rejected),
            other => Err(AppError::bad_request(format!("unknown plan status: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalOutcome {
    Approved,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalDecision {
    pub role: Role,
    pub outcome: ApprovalOutcome,
    pub comment: String,
    pub decided_at: DateTime<Utc>,
}

/// Client-side mirror of an operation plan's approval state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationPlan {
    id: i64,
    /// `None` while the plan is still a draft.
    required_approvers: Option<Vec<Role>>,
    decisions: Vec<ApprovalDecision>,
}

impl OperationPlan {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            required_approvers: None,
            decisions: Vec::new(),
        }
    }

    /// Rebuild a plan from a decision log fetched elsewhere. No transition
    /// checks are applied; the source is trusted.
    pub fn restore(
        id: i64,
        required_approvers: Option<Vec<Role>>,
        decisions: impl IntoIterator<Item = ApprovalDecision>,
    ) -> Self {
        let mut plan = Self {
            id,
            required_approvers: required_approvers.map(dedup_roles),
            decisions: Vec::new(),
        };
        for decision in decisions {
            plan.write_decision(decision);
        }
        plan
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn required_approvers(&self) -> &[Role] {
        self.required_approvers.as_deref().unwrap_or(&[])
    }

    pub fn decisions(&self) -> &[ApprovalDecision] {
        &self.decisions
    }

    pub fn decision_for(&self, role: Role) -> Option<&ApprovalDecision> {
        self.decisions.iter().find(|decision| decision.role == role)
    }

    /// Required roles that have not approved yet, in approver order.
    pub fn pending_roles(&self) -> Vec<Role> {
        self.required_approvers()
            .iter()
            .copied()
            .filter(|role| {
                !matches!(
                    self.decision_for(*role),
                    Some(ApprovalDecision {
                        outcome: ApprovalOutcome::Approved,
                        ..
                    })
                )
            })
            .collect()
    }

    pub fn status(&self) -> PlanStatus {
        let Some(required) = self.required_approvers.as_ref() else {
            return PlanStatus::Draft;
        };

        if self
            .decisions
            .iter()
            .any(|decision| decision.outcome == ApprovalOutcome::Rejected)
        {
            return PlanStatus::Rejected;
        }

        let all_approved = required.iter().all(|role| {
            self.decision_for(*role)
                .map(|decision| decision.outcome == ApprovalOutcome::Approved)
                .unwrap_or(false)
        });

        if all_approved {
            PlanStatus::Approved
        } else {
            PlanStatus::PendingApproval
        }
    }

    /// Freeze the approver list and leave Draft.
    pub fn submit(&mut self, required_approvers: impl IntoIterator<Item = Role>) -> AppResult<()> {
        if self.required_approvers.is_some() {
            return Err(AppError::invalid_state(format!(
                "plan {} is {}, only draft plans can be submitted",
                self.id,
                self.status()
            )));
        }

        let approvers = dedup_roles(required_approvers);
        if approvers.is_empty() {
            return Err(AppError::invalid_state(format!(
                "plan {} has no required approvers",
                self.id
            )));
        }

        tracing::debug!(plan_id = self.id, approvers = ?approvers, "plan submitted for approval");
        self.required_approvers = Some(approvers);
        Ok(())
    }

    /// Record `role`'s decision, replacing any earlier one from the same role.
    pub fn record_decision(
        &mut self,
        role: Role,
        outcome: ApprovalOutcome,
        comment: impl Into<String>,
    ) -> AppResult<PlanStatus> {
        self.check_decision(role)?;

        self.write_decision(ApprovalDecision {
            role,
            outcome,
            comment: comment.into(),
            decided_at: utc_now(),
        });

        let status = self.status();
        tracing::debug!(plan_id = self.id, role = %role, outcome = ?outcome, status = %status, "approval decision recorded");
        Ok(status)
    }

    pub fn approve(&mut self, role: Role, comment: impl Into<String>) -> AppResult<PlanStatus> {
        self.record_decision(role, ApprovalOutcome::Approved, comment)
    }

    pub fn reject(&mut self, role: Role, comment: impl Into<String>) -> AppResult<PlanStatus> {
        self.record_decision(role, ApprovalOutcome::Rejected, comment)
    }

    /// Whether `role` could record a decision right now.
    pub fn check_decision(&self, role: Role) -> AppResult<()> {
        if self.required_approvers.is_none() {
            return Err(AppError::invalid_state(format!(
                "plan {} is a draft and has not been submitted",
                self.id
            )));
        }

        if !self.required_approvers().contains(&role) {
            return Err(AppError::unauthorized_role(format!(
                "{} is not a required approver for plan {}",
                role, self.id
            )));
        }

        let status = self.status();
        if status.is_terminal() {
            return Err(AppError::invalid_state(format!(
                "plan {} is already {}",
                self.id, status
            )));
        }

        Ok(())
    }

    fn write_decision(&mut self, decision: ApprovalDecision) {
        match self
            .decisions
            .iter_mut()
            .find(|existing| existing.role == decision.role)
        {
            Some(existing) => *existing = decision,
            None => self.decisions.push(decision),
        }
    }
}

fn dedup_roles(roles: impl IntoIterator<Item = Role>) -> Vec<Role> {
    let mut unique = Vec::new();
    for role in roles {
        if !unique.contains(&role) {
            unique.push(role);
        }
    }
    unique
}
