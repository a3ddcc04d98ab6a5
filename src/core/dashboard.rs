//! Per-role landing page summaries.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::auth::Actor;
use crate::core::clock::Clock;
use crate::db::Database;
use crate::models::{
    Appointment, AppointmentStatus, LabPriority, LabStatus, Prescription, PrescriptionStatus, Role,
    UserStatus,
};

const UPCOMING_LIMIT: usize = 5;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Dashboard {
    Patient(PatientDashboard),
    Doctor(DoctorDashboard),
    Lab(LabDashboard),
    Pharmacist(PharmacistDashboard),
    Admin(AdminDashboard),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientDashboard {
    pub upcoming_appointments: Vec<Appointment>,
    pub active_prescriptions: Vec<Prescription>,
    pub pending_lab_results: usize,
    pub completed_lab_results: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorDashboard {
    pub todays_appointments: Vec<Appointment>,
    pub upcoming_appointments: usize,
    pub open_lab_requests: usize,
    pub encounters_today: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabDashboard {
    pub requested: usize,
    pub in_progress: usize,
    pub completed_today: usize,
    pub urgent_open: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PharmacistDashboard {
    pub awaiting_dispense: usize,
    pub partially_dispensed: usize,
    pub dispensed_today: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminDashboard {
    pub users_by_role: BTreeMap<Role, usize>,
    pub users_by_status: BTreeMap<&'static str, usize>,
    pub pending_approvals: usize,
    pub appointments_by_status: BTreeMap<&'static str, usize>,
    pub queued_emails: usize,
}

fn same_day(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    a.date_naive() == b.date_naive()
}

pub fn summarize(db: &Database, actor: &Actor, clock: &dyn Clock) -> Dashboard {
    let now = clock.now();
    match actor.role {
        Role::Patient => {
            let mut upcoming = db.appointments.filter(|a| {
                a.patient_id == actor.id
                    && a.status == AppointmentStatus::Booked
                    && a.date_time > now
            });
            upcoming.sort_by_key(|a| a.date_time);
            upcoming.truncate(UPCOMING_LIMIT);

            let mut active = db
                .prescriptions
                .filter(|p| p.patient_id == actor.id && p.status.is_open());
            active.sort_by(|a, b| b.created_at.cmp(&a.created_at));

            Dashboard::Patient(PatientDashboard {
                upcoming_appointments: upcoming,
                active_prescriptions: active,
                pending_lab_results: db
                    .lab_requests
                    .count(|l| l.patient_id == actor.id && l.status.is_open()),
                completed_lab_results: db
                    .lab_requests
                    .count(|l| l.patient_id == actor.id && l.status == LabStatus::Completed),
            })
        }
        Role::Doctor => {
            let mut today = db.appointments.filter(|a| {
                a.doctor_id == actor.id
                    && a.status != AppointmentStatus::Cancelled
                    && same_day(a.date_time, now)
            });
            today.sort_by_key(|a| a.date_time);
            Dashboard::Doctor(DoctorDashboard {
                todays_appointments: today,
                upcoming_appointments: db.appointments.count(|a| {
                    a.doctor_id == actor.id
                        && a.status == AppointmentStatus::Booked
                        && a.date_time > now
                }),
                open_lab_requests: db
                    .lab_requests
                    .count(|l| l.doctor_id == actor.id && l.status.is_open()),
                encounters_today: db
                    .encounters
                    .count(|e| e.doctor_id == actor.id && same_day(e.created_at, now)),
            })
        }
        Role::Lab => {
            let mut summary = LabDashboard::default();
            for request in db.lab_requests.all() {
                match request.status {
                    LabStatus::Requested => summary.requested += 1,
                    LabStatus::InProgress => summary.in_progress += 1,
                    LabStatus::Completed => {
                        if request.processed_at.map_or(false, |at| same_day(at, now)) {
                            summary.completed_today += 1;
                        }
                    }
                    LabStatus::Cancelled => {}
                }
                if request.status.is_open() && request.priority != LabPriority::Routine {
                    summary.urgent_open += 1;
                }
            }
            Dashboard::Lab(summary)
        }
        Role::Pharmacist => {
            let mut summary = PharmacistDashboard::default();
            for prescription in db.prescriptions.all() {
                match prescription.status {
                    PrescriptionStatus::Created | PrescriptionStatus::Pending => {
                        summary.awaiting_dispense += 1
                    }
                    PrescriptionStatus::PartiallyDispensed => summary.partially_dispensed += 1,
                    PrescriptionStatus::Dispensed => {
                        if prescription.dispensed_at.map_or(false, |at| same_day(at, now)) {
                            summary.dispensed_today += 1;
                        }
                    }
                    PrescriptionStatus::Cancelled => {}
                }
            }
            Dashboard::Pharmacist(summary)
        }
        Role::Admin => {
            let mut summary = AdminDashboard::default();
            for user in db.users.all() {
                *summary.users_by_role.entry(user.role).or_default() += 1;
                *summary.users_by_status.entry(user.status.as_str()).or_default() += 1;
                if user.status == UserStatus::Pending {
                    summary.pending_approvals += 1;
                }
            }
            for appointment in db.appointments.all() {
                *summary
                    .appointments_by_status
                    .entry(appointment.status.as_str())
                    .or_default() += 1;
            }
            summary.queued_emails = db
                .email_outbox
                .count(|m| m.status == crate::models::EmailStatus::Queued);
            Dashboard::Admin(summary)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::MockClock;
    use crate::models::appointment::tests::booked_at;
    use crate::models::lab::tests::requested;
    use crate::models::prescription::tests::{item, prescription};
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn clock_at(now: DateTime<Utc>) -> MockClock {
        let mut clock = MockClock::new();
        clock.expect_now().return_const(now);
        clock
    }

    fn actor(role: Role) -> Actor {
        Actor { id: Uuid::new_v4(), role, name: "Test".into() }
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 20, 12, 0, 0).unwrap()
    }

    #[test]
    fn patient_sees_only_own_future_bookings() {
        let db = Database::new();
        let patient = actor(Role::Patient);

        let mut mine = booked_at(noon() + Duration::days(1));
        mine.patient_id = patient.id;
        let mut past = booked_at(noon() - Duration::days(1));
        past.patient_id = patient.id;
        let theirs = booked_at(noon() + Duration::days(2));
        for appt in [mine.clone(), past, theirs] {
            db.appointments.insert(appt.id, appt);
        }
        let mut rx = prescription(vec![item("Amoxicillin")]);
        rx.patient_id = patient.id;
        db.prescriptions.insert(rx.id, rx);

        match summarize(&db, &patient, &clock_at(noon())) {
            Dashboard::Patient(summary) => {
                assert_eq!(summary.upcoming_appointments, vec![mine]);
                assert_eq!(summary.active_prescriptions.len(), 1);
                assert_eq!(summary.pending_lab_results, 0);
            }
            other => panic!("unexpected dashboard {:?}", other),
        }
    }

    #[test]
    fn lab_counts_queue_and_urgency() {
        let db = Database::new();
        let mut stat = requested(&["Troponin"]);
        stat.priority = LabPriority::Stat;
        let mut done = requested(&["CBC"]);
        done.status = LabStatus::Completed;
        done.processed_at = Some(noon() - Duration::hours(2));
        let mut old = requested(&["CBC"]);
        old.status = LabStatus::Completed;
        old.processed_at = Some(noon() - Duration::days(3));
        for request in [stat, done, old, requested(&["Lipids"])] {
            db.lab_requests.insert(request.id, request);
        }

        match summarize(&db, &actor(Role::Lab), &clock_at(noon())) {
            Dashboard::Lab(summary) => assert_eq!(
                summary,
                LabDashboard { requested: 2, in_progress: 0, completed_today: 1, urgent_open: 1 }
            ),
            other => panic!("unexpected dashboard {:?}", other),
        }
    }

    #[test]
    fn pharmacist_counts_by_status() {
        let db = Database::new();
        let mut partial = prescription(vec![item("A"), item("B")]);
        partial.items[0].dispensed = true;
        partial.status = PrescriptionStatus::PartiallyDispensed;
        let mut cancelled = prescription(vec![item("C")]);
        cancelled.status = PrescriptionStatus::Cancelled;
        for rx in [prescription(vec![item("D")]), partial, cancelled] {
            db.prescriptions.insert(rx.id, rx);
        }
        match summarize(&db, &actor(Role::Pharmacist), &clock_at(noon())) {
            Dashboard::Pharmacist(summary) => {
                assert_eq!(summary.awaiting_dispense, 1);
                assert_eq!(summary.partially_dispensed, 1);
            }
            other => panic!("unexpected dashboard {:?}", other),
        }
    }

    #[test]
    fn dashboard_tagged_by_role() {
        let db = Database::new();
        let json = serde_json::to_value(summarize(&db, &actor(Role::Admin), &clock_at(noon()))).unwrap();
        assert_eq!(json["role"], "admin");
        assert_eq!(json["queuedEmails"], 0);
    }
}
