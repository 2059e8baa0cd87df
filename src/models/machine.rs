use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Machine {
    pub id: i64,
    pub machine_code: String,
    pub machine_name: String,
    #[serde(default)]
    pub machine_type: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize)]
pub struct MachineCreateRequest {
    pub machine_code: String,
    pub machine_name: String,
    pub machine_type: String,
    pub location: String,
    pub status: String,
}

#[derive(Debug, Default, Serialize)]
pub struct MachineUpdateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub machine_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub machine_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}
