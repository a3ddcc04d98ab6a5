use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Vitals {
    pub blood_pressure: Option<String>, // e.g. "120/80"
    #[validate(range(min = 20.0, max = 250.0))]
    pub heart_rate: Option<f32>,
    #[validate(range(min = 30.0, max = 45.0))]
    pub temperature: Option<f32>,
    #[validate(range(min = 4.0, max = 60.0))]
    pub respiratory_rate: Option<f32>,
    #[validate(range(min = 50.0, max = 100.0))]
    pub oxygen_saturation: Option<f32>,
    pub weight: Option<f32>,
    pub height: Option<f32>,
}

/// A single doctor-patient consultation. Never edited after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Encounter {
    pub id: Uuid,
    pub appointment_id: Option<Uuid>,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub vitals: Vitals,
    pub chief_complaint: String,
    pub notes: Option<String>,
    pub diagnosis: String,
    pub treatment_plan: Option<String>,
    pub follow_up: Option<NaiveDate>,
    pub prescription_id: Option<Uuid>,
    pub lab_request_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}
