use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TransitionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AppointmentStatus {
    Booked,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, AppointmentStatus::Booked)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Booked => "booked",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::NoShow => "no-show",
        }
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum AppointmentType {
    #[default]
    Consultation,
    FollowUp,
    CheckUp,
    Emergency,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub patient_name: String,
    pub doctor_id: Uuid,
    pub doctor_name: String,
    pub department: String,
    pub date_time: DateTime<Utc>,
    pub duration_minutes: u32,
    #[serde(rename = "type")]
    pub appointment_type: AppointmentType,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn end_time(&self) -> DateTime<Utc> {
        self.date_time + Duration::minutes(i64::from(self.duration_minutes))
    }

    /// Half-open interval overlap against `[start, end)`.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.date_time < end && self.end_time() > start
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Cancelled appointments free their slot; every other status holds it.
    pub fn holds_slot(&self) -> bool {
        self.status != AppointmentStatus::Cancelled
    }

    pub fn can_open_encounter(&self) -> bool {
        self.status == AppointmentStatus::Booked
    }

    fn ensure_booked(&self) -> Result<(), TransitionError> {
        if self.is_terminal() {
            return Err(TransitionError::Terminal {
                entity: "appointment",
                status: self.status.to_string(),
            });
        }
        Ok(())
    }

    fn with_status(&self, status: AppointmentStatus, now: DateTime<Utc>) -> Self {
        Appointment {
            status,
            updated_at: now,
            ..self.clone()
        }
    }

    pub fn complete(&self, now: DateTime<Utc>) -> Result<Self, TransitionError> {
        self.ensure_booked()?;
        Ok(self.with_status(AppointmentStatus::Completed, now))
    }

    /// Cancellation needs a reason and must happen before the appointment starts.
    pub fn cancel(&self, reason: &str, now: DateTime<Utc>) -> Result<Self, TransitionError> {
        self.ensure_booked()?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(TransitionError::MissingReason);
        }
        if now >= self.date_time {
            return Err(TransitionError::AppointmentInPast);
        }
        let mut cancelled = self.with_status(AppointmentStatus::Cancelled, now);
        cancelled.cancellation_reason = Some(reason.to_string());
        Ok(cancelled)
    }

    pub fn mark_no_show(&self, now: DateTime<Utc>) -> Result<Self, TransitionError> {
        self.ensure_booked()?;
        if now < self.date_time {
            return Err(TransitionError::AppointmentNotStarted);
        }
        Ok(self.with_status(AppointmentStatus::NoShow, now))
    }
}
