use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::approval::PlanStatus;

// =============================================================================
// PEM OPERATION PLAN (backend representation)
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PemOperationPlan {
    pub id: i64,
    pub form_number: String,
    #[serde(default)]
    pub ppic_schedule_id: Option<i64>,
    pub part_name: String,
    #[serde(default)]
    pub material: String,
    #[serde(default)]
    pub dial_size: String,
    #[serde(default)]
    pub quantity: i32,
    #[serde(default)]
    pub revision: String,
    #[serde(default)]
    pub no_wp: String,
    #[serde(default)]
    pub page: String,
    pub status: PlanStatus,
    pub created_by: i64,
    #[serde(default)]
    pub steps: Vec<OperationPlanStep>,
    #[serde(default)]
    pub approvals: Vec<PemApproval>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationPlanStep {
    pub id: i64,
    pub operation_plan_id: i64,
    pub step_number: i32,
    #[serde(default)]
    pub picture_url: Option<String>,
    #[serde(default)]
    pub picture_filename: Option<String>,
    #[serde(default)]
    pub clamping_system: String,
    #[serde(default)]
    pub raw_material: String,
    #[serde(default)]
    pub setting: String,
    #[serde(default)]
    pub process: String,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub checking_method: String,
}

/// Per-role approval record. The backend creates one per approver slot and
/// flips `status` when that slot decides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PemApproval {
    pub id: i64,
    pub operation_plan_id: i64,
    pub approver_role: String,
    #[serde(default)]
    pub approver_id: Option<i64>,
    pub status: ApprovalStatus,
    #[serde(default)]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub comments: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
        }
    }
}

// =============================================================================
// REQUESTS
// =============================================================================

#[derive(Debug, Default, Serialize)]
pub struct CreatePlanRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ppic_schedule_id: Option<i64>,
    pub part_name: String,
    pub material: String,
    pub dial_size: String,
    pub quantity: i32,
    pub revision: String,
    pub no_wp: String,
    pub page: String,
    pub steps: Vec<CreateStepRequest>,
}

#[derive(Debug, Default, Serialize)]
pub struct UpdatePlanRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub part_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dial_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_wp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct CreateStepRequest {
    pub step_number: i32,
    pub clamping_system: String,
    pub raw_material: String,
    pub setting: String,
    pub process: String,
    pub note: String,
    pub checking_method: String,
}

#[derive(Debug, Default, Serialize)]
pub struct UpdateStepRequest {
    pub step_number: i32,
    pub clamping_system: String,
    pub raw_material: String,
    pub setting: String,
    pub process: String,
    pub note: String,
    pub checking_method: String,
}

/// Approver slot name (e.g. `"QC"`, `"Custom1"`) to backend user row id.
#[derive(Debug, Default, Serialize)]
pub struct AssignApproversRequest {
    pub approvers: BTreeMap<String, i64>,
}

#[derive(Debug, Default, Serialize)]
pub struct ApprovalActionRequest {
    pub comments: String,
}

#[derive(Debug, Default, Clone)]
pub struct PlanFilters {
    pub status: Option<PlanStatus>,
    pub ppic_schedule_id: Option<i64>,
}

impl PlanFilters {
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(status) = self.status {
            query.push(("status", status.as_str().to_string()));
        }
        if let Some(schedule_id) = self.ppic_schedule_id {
            query.push(("ppic_schedule_id", schedule_id.to_string()));
        }
        query
    }
}
