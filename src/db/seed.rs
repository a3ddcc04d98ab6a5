//! Demo clinic loaded at startup when `portal.seed_demo_data` is on.
//!
//! Every demo account uses the password `password123`.

use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Utc, Weekday};
use tracing::debug;
use uuid::Uuid;

use super::Database;
use crate::auth::Credentials;
use crate::error::{PortalError, PortalResult};
use crate::models::{
    Appointment, AppointmentStatus, AppointmentType, Diagnostic, Doctor, DoctorStatus, Medicine,
    Role, ScheduleEntry, Specialization, User, UserStatus,
};

pub const DEMO_PASSWORD: &str = "password123";

#[derive(Debug, Clone, Copy, Default)]
pub struct SeedSummary {
    pub users: usize,
    pub appointments: usize,
}

struct DemoUser {
    name: &'static str,
    email: &'static str,
    role: Role,
    department: Option<&'static str>,
}

const USERS: &[DemoUser] = &[
    DemoUser { name: "Ada Admin", email: "admin@careportal.local", role: Role::Admin, department: None },
    DemoUser { name: "Dr. Musa Bello", email: "musa.bello@careportal.local", role: Role::Doctor, department: Some("Cardiology") },
    DemoUser { name: "Dr. Ifeoma Adeyemi", email: "ifeoma.adeyemi@careportal.local", role: Role::Doctor, department: Some("Pediatrics") },
    DemoUser { name: "Grace Lab", email: "lab@careportal.local", role: Role::Lab, department: Some("Laboratory") },
    DemoUser { name: "Femi Pharm", email: "pharmacy@careportal.local", role: Role::Pharmacist, department: Some("Pharmacy") },
    DemoUser { name: "Chidi Okafor", email: "chidi.okafor@careportal.local", role: Role::Patient, department: None },
    DemoUser { name: "Amina Yusuf", email: "amina.yusuf@careportal.local", role: Role::Patient, department: None },
];

const WEEKDAYS: [Weekday; 5] = [Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri];

fn at(hour: u32, minute: u32) -> PortalResult<NaiveTime> {
    NaiveTime::from_hms_opt(hour, minute, 0)
        .ok_or_else(|| PortalError::Internal(format!("bad seed time {}:{}", hour, minute)))
}

fn block(days: &[Weekday], from: NaiveTime, to: NaiveTime, slot: u32) -> Vec<ScheduleEntry> {
    days.iter()
        .map(|&day| ScheduleEntry { day, start_time: from, end_time: to, slot_duration: slot })
        .collect()
}

/// Next weekday strictly after `now`, at `time`.
fn next_clinic_day(now: DateTime<Utc>, time: NaiveTime) -> DateTime<Utc> {
    let mut date = now.date_naive() + Duration::days(1);
    while !WEEKDAYS.contains(&date.weekday()) {
        date += Duration::days(1);
    }
    Utc.from_utc_datetime(&date.and_time(time))
}

pub fn load_demo(db: &Database, credentials: &Credentials, now: DateTime<Utc>) -> PortalResult<SeedSummary> {
    let password_hash = credentials.hash(DEMO_PASSWORD)?;
    let mut users = Vec::with_capacity(USERS.len());
    for demo in USERS {
        let user = db.insert_user(User {
            id: Uuid::new_v4(),
            name: demo.name.to_string(),
            email: demo.email.to_string(),
            phone: None,
            role: demo.role,
            status: UserStatus::Active,
            department: demo.department.map(str::to_string),
            specialty: demo.department.filter(|_| demo.role == Role::Doctor).map(str::to_string),
            license_number: None,
            password_hash: password_hash.clone(),
            created_at: now,
        })?;
        users.push(user);
    }

    let doctors: Vec<&User> = users.iter().filter(|u| u.role == Role::Doctor).collect();
    let patients: Vec<&User> = users.iter().filter(|u| u.role == Role::Patient).collect();
    let schedules = [
        block(&WEEKDAYS, at(9, 0)?, at(13, 0)?, 30),
        block(&[Weekday::Mon, Weekday::Wed, Weekday::Fri], at(14, 0)?, at(17, 0)?, 20),
    ];
    for ((user, schedule), (qualification, years, fee)) in doctors
        .iter()
        .zip(schedules)
        .zip([("MBBS, FWACP", 12, 60.0), ("MBBS, FMCPaed", 7, 45.0)])
    {
        let department = user.department.clone().unwrap_or_default();
        db.doctors.insert(
            user.id,
            Doctor {
                id: user.id,
                name: user.name.clone(),
                email: user.email.clone(),
                specialization: department.clone(),
                department,
                qualification: Some(qualification.to_string()),
                experience_years: years,
                schedule,
                consultation_fee: fee,
                rating: 4.6,
                status: DoctorStatus::Available,
            },
        );
    }

    for (name, description) in [
        ("Cardiology", "Heart and blood vessels"),
        ("Pediatrics", "Care of infants and children"),
        ("General Medicine", "Adult primary care"),
        ("Dermatology", "Skin, hair and nails"),
    ] {
        let id = Uuid::new_v4();
        db.specializations.insert(
            id,
            Specialization { id, name: name.into(), description: Some(description.into()), created_at: now },
        );
    }

    for (name, generic, form, strength, stock) in [
        ("Paracetamol", "Acetaminophen", "tablet", "500mg", 500),
        ("Amoxil", "Amoxicillin", "capsule", "250mg", 300),
        ("Glucophage", "Metformin", "tablet", "500mg", 240),
        ("Zestril", "Lisinopril", "tablet", "10mg", 180),
    ] {
        let id = Uuid::new_v4();
        db.medicines.insert(
            id,
            Medicine {
                id,
                name: name.into(),
                generic_name: Some(generic.into()),
                form: form.into(),
                strength: strength.into(),
                stock,
                active: true,
                created_at: now,
            },
        );
    }

    for (name, code, sample, unit, range, price) in [
        ("Full blood count", "CBC", "blood", None, None, 15.0),
        ("Lipid panel", "LIPID", "blood", Some("mmol/L"), Some("< 5.2"), 30.0),
        ("Fasting blood sugar", "FBS", "blood", Some("mmol/L"), Some("3.9-5.5"), 8.0),
        ("Thyroid stimulating hormone", "TSH", "blood", Some("mIU/L"), Some("0.4-4.0"), 25.0),
        ("Urinalysis", "UA", "urine", None, None, 6.0),
    ] {
        let id = Uuid::new_v4();
        db.diagnostics.insert(
            id,
            Diagnostic {
                id,
                name: name.into(),
                code: code.into(),
                sample_type: sample.into(),
                unit: unit.map(str::to_string),
                reference_range: range.map(str::to_string),
                price,
                active: true,
                created_at: now,
            },
        );
    }

    let mut appointments = 0;
    if let (Some(doctor), Some(patient)) = (doctors.first(), patients.first()) {
        let upcoming = next_clinic_day(now, at(10, 0)?);
        let visits = [
            (upcoming, AppointmentStatus::Booked, AppointmentType::FollowUp),
            (upcoming - Duration::days(7), AppointmentStatus::Completed, AppointmentType::Consultation),
        ];
        for (date_time, status, appointment_type) in visits {
            let id = Uuid::new_v4();
            db.appointments.insert(
                id,
                Appointment {
                    id,
                    patient_id: patient.id,
                    patient_name: patient.name.clone(),
                    doctor_id: doctor.id,
                    doctor_name: doctor.name.clone(),
                    department: doctor.department.clone().unwrap_or_default(),
                    date_time,
                    duration_minutes: 30,
                    appointment_type,
                    status,
                    notes: None,
                    cancellation_reason: None,
                    created_at: now,
                    updated_at: now,
                },
            );
            appointments += 1;
        }
    }

    debug!(users = users.len(), appointments, "seed records inserted");
    Ok(SeedSummary { users: users.len(), appointments })
}
