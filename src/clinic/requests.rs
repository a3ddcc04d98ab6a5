//! Request bodies and query filters accepted by the service.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::models::{
    AppointmentStatus, AppointmentType, DispenseUpdate, DoctorStatus, EmailStatus, LabPriority,
    LabResult, LabStatus, PrescriptionItem, PrescriptionStatus, Role, ScheduleEntry, UserStatus,
    Vitals,
};

// ===== Accounts =====

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 2, max = 100, message = "name must be 2-100 characters"))]
    pub name: String,
    #[validate(email(message = "email is not valid"))]
    pub email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
    pub phone: Option<String>,
    #[serde(default = "default_role")]
    pub role: Role,
    pub department: Option<String>,
    pub specialty: Option<String>,
    pub license_number: Option<String>,
    pub qualification: Option<String>,
    pub experience_years: Option<u32>,
    #[validate(range(min = 0.0))]
    pub consultation_fee: Option<f64>,
}

fn default_role() -> Role {
    Role::Patient
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "email is not valid"))]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[validate(length(min = 2, max = 100))]
    pub name: Option<String>,
    pub phone: Option<String>,
    pub department: Option<String>,
    pub specialty: Option<String>,
    pub license_number: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct UserStatusRequest {
    pub status: UserStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserFilter {
    pub role: Option<Role>,
    pub status: Option<UserStatus>,
    pub q: Option<String>,
}

// ===== Doctors =====

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDoctorRequest {
    #[validate(length(min = 1))]
    pub department: Option<String>,
    #[validate(length(min = 1))]
    pub specialization: Option<String>,
    pub qualification: Option<String>,
    pub experience_years: Option<u32>,
    #[validate(range(min = 0.0))]
    pub consultation_fee: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleRequest {
    pub schedule: Vec<ScheduleEntry>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DoctorStatusRequest {
    pub status: DoctorStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DoctorFilter {
    pub specialization: Option<String>,
    pub department: Option<String>,
    pub status: Option<DoctorStatus>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SlotQuery {
    pub date: NaiveDate,
}

// ===== Appointments =====

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BookAppointmentRequest {
    /// Required when staff books on a patient's behalf.
    pub patient_id: Option<Uuid>,
    pub doctor_id: Uuid,
    pub date_time: DateTime<Utc>,
    #[serde(default, rename = "type")]
    pub appointment_type: AppointmentType,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CancelAppointmentRequest {
    #[validate(length(min = 1, max = 500, message = "a cancellation reason is required"))]
    pub reason: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentFilter {
    pub status: Option<AppointmentStatus>,
    pub doctor_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Validate)]
pub struct UpcomingQuery {
    /// Look-ahead window, 24 hours when absent.
    #[validate(range(min = 1, max = 168, message = "hours must be between 1 and 168"))]
    pub hours: Option<i64>,
}

// ===== Encounters =====

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateEncounterRequest {
    pub appointment_id: Option<Uuid>,
    /// Required when there is no appointment to take it from.
    pub patient_id: Option<Uuid>,
    #[serde(default)]
    pub vitals: Vitals,
    #[validate(length(min = 1, message = "chief complaint is required"))]
    pub chief_complaint: String,
    pub notes: Option<String>,
    #[validate(length(min = 1, message = "diagnosis is required"))]
    pub diagnosis: String,
    pub treatment_plan: Option<String>,
    pub follow_up: Option<NaiveDate>,
    #[serde(default)]
    pub prescription_items: Vec<PrescriptionItem>,
    pub prescription_notes: Option<String>,
    #[serde(default)]
    pub lab_tests: Vec<String>,
    #[serde(default)]
    pub lab_priority: LabPriority,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncounterFilter {
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
}

// ===== Prescriptions =====

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePrescriptionRequest {
    pub patient_id: Uuid,
    pub encounter_id: Option<Uuid>,
    #[validate(length(min = 1, message = "at least one item is required"))]
    pub items: Vec<PrescriptionItem>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct DispenseRequest {
    #[validate(length(min = 1, message = "no dispense changes given"))]
    pub updates: Vec<DispenseUpdate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionFilter {
    pub status: Option<PrescriptionStatus>,
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
}

// ===== Lab requests =====

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateLabRequest {
    pub patient_id: Uuid,
    pub encounter_id: Option<Uuid>,
    #[validate(length(min = 1, message = "at least one test is required"))]
    pub tests: Vec<String>,
    #[serde(default)]
    pub priority: LabPriority,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RecordResultsRequest {
    pub results: Vec<LabResult>,
    pub notes: Option<String>,
    #[serde(default)]
    pub finalize: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabFilter {
    pub status: Option<LabStatus>,
    pub priority: Option<LabPriority>,
    pub patient_id: Option<Uuid>,
}

// ===== Outbox =====

#[derive(Debug, Clone, Deserialize)]
pub struct EmailStatusRequest {
    pub status: EmailStatus,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct EmailFilter {
    pub status: Option<EmailStatus>,
}
