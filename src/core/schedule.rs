//! Timeslot generation from a doctor's recurring weekly schedule.
//!
//! Schedule times are clinic wall-clock times and the clinic runs on UTC.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use serde::Serialize;

use crate::models::{Appointment, Doctor, ScheduleEntry};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_minutes: u32,
    pub available: bool,
}

/// Expand the schedule for `date` into slots, marking past and taken ones.
pub fn generate_slots(
    doctor: &Doctor,
    date: NaiveDate,
    appointments: &[Appointment],
    now: DateTime<Utc>,
) -> Vec<TimeSlot> {
    let taken: Vec<&Appointment> = appointments
        .iter()
        .filter(|a| a.doctor_id == doctor.id && a.holds_slot())
        .collect();

    let mut entries: Vec<&ScheduleEntry> = doctor
        .schedule_for(date.weekday())
        .filter(|entry| entry.is_valid())
        .collect();
    entries.sort_by_key(|entry| entry.start_time);

    let mut slots = Vec::new();
    for entry in entries {
        let step = Duration::minutes(i64::from(entry.slot_duration));
        let block_end = Utc.from_utc_datetime(&date.and_time(entry.end_time));
        let mut start = Utc.from_utc_datetime(&date.and_time(entry.start_time));

        while start + step <= block_end {
            let end = start + step;
            let clash = taken.iter().any(|a| a.overlaps(start, end));
            slots.push(TimeSlot {
                start,
                end,
                duration_minutes: entry.slot_duration,
                available: start > now && !clash,
            });
            start = end;
        }
    }
    slots
}

/// The slot starting exactly at `start`, if the schedule has one.
pub fn find_slot(slots: &[TimeSlot], start: DateTime<Utc>) -> Option<&TimeSlot> {
    slots.iter().find(|slot| slot.start == start)
}

/// Entries must have positive slot lengths and must not overlap on the same day.
pub fn validate_schedule(entries: &[ScheduleEntry]) -> Result<(), String> {
    for (i, entry) in entries.iter().enumerate() {
        if !entry.is_valid() {
            return Err(format!(
                "{} {}-{}: start must precede end and slot duration must be positive",
                entry.day, entry.start_time, entry.end_time
            ));
        }
        let clash = entries[i + 1..].iter().find(|other| {
            other.day == entry.day
                && other.start_time < entry.end_time
                && entry.start_time < other.end_time
        });
        if let Some(other) = clash {
            return Err(format!(
                "{} {}-{} overlaps {}-{}",
                entry.day, entry.start_time, entry.end_time, other.start_time, other.end_time
            ));
        }
    }
    Ok(())
}
