use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::TransitionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LabPriority {
    #[default]
    Routine,
    Urgent,
    Stat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LabStatus {
    Requested,
    InProgress,
    Completed,
    Cancelled,
}

impl LabStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LabStatus::Requested => "requested",
            LabStatus::InProgress => "in-progress",
            LabStatus::Completed => "completed",
            LabStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_open(self) -> bool {
        matches!(self, LabStatus::Requested | LabStatus::InProgress)
    }
}

impl std::fmt::Display for LabStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Picked by the technician; never computed from the reference range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResultFlag {
    #[default]
    Normal,
    Low,
    High,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LabResult {
    /// Free-text test name, not checked against the ordered tests.
    #[validate(length(min = 1, message = "test name is required"))]
    pub test_id: String,
    #[validate(length(min = 1, message = "value is required"))]
    pub value: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub reference_range: String,
    #[serde(default)]
    pub flag: ResultFlag,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabRequest {
    pub id: Uuid,
    pub encounter_id: Option<Uuid>,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub tests: Vec<String>,
    pub priority: LabPriority,
    pub status: LabStatus,
    pub results: Vec<LabResult>,
    pub result_notes: Option<String>,
    pub processed_by: Option<Uuid>,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LabRequest {
    fn terminal_error(&self) -> TransitionError {
        TransitionError::Terminal {
            entity: "lab request",
            status: self.status.to_string(),
        }
    }

    pub fn has_critical_result(&self) -> bool {
        self.results.iter().any(|r| r.flag == ResultFlag::Critical)
    }

    pub fn start_processing(&self, technician_id: Uuid, now: DateTime<Utc>) -> Result<Self, TransitionError> {
        match self.status {
            LabStatus::Requested => Ok(LabRequest {
                status: LabStatus::InProgress,
                processed_by: Some(technician_id),
                updated_at: now,
                ..self.clone()
            }),
            LabStatus::InProgress => Err(TransitionError::InvalidState {
                entity: "lab request",
                action: "start",
                status: self.status.to_string(),
            }),
            LabStatus::Completed | LabStatus::Cancelled => Err(self.terminal_error()),
        }
    }

    /// Save result rows as a draft, or finalize them into a completed request.
    pub fn record_results(
        &self,
        results: Vec<LabResult>,
        notes: Option<String>,
        technician_id: Uuid,
        now: DateTime<Utc>,
        finalize: bool,
    ) -> Result<Self, TransitionError> {
        if !self.status.is_open() {
            return Err(self.terminal_error());
        }
        if let Some(bad) = results
            .iter()
            .find(|r| r.test_id.trim().is_empty() || r.value.trim().is_empty())
        {
            return Err(TransitionError::InvalidResult(format!(
                "test '{}' needs a name and a value",
                bad.test_id
            )));
        }
        if finalize && results.is_empty() {
            return Err(TransitionError::NoResults);
        }

        let mut next = self.clone();
        next.results = results;
        next.result_notes = notes.or(next.result_notes);
        next.processed_by = Some(technician_id);
        next.updated_at = now;
        if finalize {
            next.status = LabStatus::Completed;
            next.processed_at = Some(now);
        } else {
            next.status = LabStatus::InProgress;
        }
        Ok(next)
    }

    pub fn cancel(&self, now: DateTime<Utc>) -> Result<Self, TransitionError> {
        if !self.status.is_open() {
            return Err(self.terminal_error());
        }
        Ok(LabRequest {
            status: LabStatus::Cancelled,
            updated_at: now,
            ..self.clone()
        })
    }
}
