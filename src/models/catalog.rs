//! Reference data managed by admins: medicines, lab tests and specializations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::user::Role;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Medicine {
    pub id: Uuid,
    pub name: String,
    pub generic_name: Option<String>,
    pub form: String, // tablet, syrup, injection
    pub strength: String,
    pub stock: u32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MedicineInput {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    pub generic_name: Option<String>,
    #[validate(length(min = 1))]
    pub form: String,
    #[validate(length(min = 1))]
    pub strength: String,
    #[serde(default)]
    pub stock: u32,
    #[serde(default = "enabled")]
    pub active: bool,
}

/// A lab test that can be ordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub sample_type: String,
    pub unit: Option<String>,
    pub reference_range: Option<String>,
    pub price: f64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticInput {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(length(min = 1, max = 32))]
    pub code: String,
    #[validate(length(min = 1))]
    pub sample_type: String,
    pub unit: Option<String>,
    pub reference_range: Option<String>,
    #[validate(range(min = 0.0))]
    #[serde(default)]
    pub price: f64,
    #[serde(default = "enabled")]
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Specialization {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SpecializationInput {
    #[validate(length(min = 1, max = 80))]
    pub name: String,
    pub description: Option<String>,
}

/// What the roles endpoint reports for each role.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleInfo {
    pub role: Role,
    pub route_prefix: &'static str,
    pub dashboard: String,
    pub requires_approval: bool,
}

fn enabled() -> bool {
    true
}
