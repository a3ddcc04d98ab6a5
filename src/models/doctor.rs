use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DoctorStatus {
    #[default]
    Available,
    Busy,
    Offline,
}

/// One recurring block of bookable time, e.g. Mondays 09:00-13:00 in 30 minute slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub day: Weekday,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub slot_duration: u32,
}

impl ScheduleEntry {
    pub fn is_valid(&self) -> bool {
        self.slot_duration > 0 && self.start_time < self.end_time
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    /// Same id as the doctor's user account.
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub department: String,
    pub specialization: String,
    pub qualification: Option<String>,
    pub experience_years: u32,
    pub schedule: Vec<ScheduleEntry>,
    pub consultation_fee: f64,
    pub rating: f32,
    pub status: DoctorStatus,
}

impl Doctor {
    pub fn schedule_for(&self, day: Weekday) -> impl Iterator<Item = &ScheduleEntry> {
        self.schedule.iter().filter(move |entry| entry.day == day)
    }
}
