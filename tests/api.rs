use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use careportal::api;
use careportal::config::Config;
use careportal::core::clock::FixedClock;
use careportal::ClinicService;
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};

const PATIENT: &str = "chidi.okafor@careportal.local";
const OTHER_PATIENT: &str = "amina.yusuf@careportal.local";
const DOCTOR: &str = "musa.bello@careportal.local";
const LAB: &str = "lab@careportal.local";
const PHARMACIST: &str = "pharmacy@careportal.local";
const ADMIN: &str = "admin@careportal.local";

/// Demo clinic frozen at Friday 2026-10-16 15:00 UTC.
fn clinic() -> web::Data<ClinicService> {
    let mut config = Config::default();
    config.auth.argon2_memory_kib = 8;
    config.auth.argon2_iterations = 1;
    config.portal.seed_demo_data = true;
    config.portal.simulated_latency_ms = 0;
    let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2026, 10, 16, 15, 0, 0).unwrap()));
    web::Data::new(ClinicService::bootstrap(&config, clock).unwrap())
}

macro_rules! app {
    () => {
        test::init_service(App::new().app_data(clinic()).configure(api::configure)).await
    };
}

/// Send a request and return the status with the JSON body.
macro_rules! send {
    ($app:expr, $req:expr) => {{
        let resp = test::call_service(&$app, $req.to_request()).await;
        let status = resp.status();
        let body: Value = test::read_body_json(resp).await;
        (status, body)
    }};
}

macro_rules! login {
    ($app:expr, $email:expr) => {{
        let (status, body) = send!(
            $app,
            test::TestRequest::post()
                .uri("/api/v1/auth/login")
                .set_json(json!({ "email": $email, "password": "password123" }))
        );
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        body["token"].as_str().unwrap().to_string()
    }};
}

fn get(uri: &str, token: &str) -> test::TestRequest {
    test::TestRequest::get()
        .uri(uri)
        .insert_header(("Authorization", format!("Bearer {}", token)))
}

fn post(uri: &str, token: &str, body: Value) -> test::TestRequest {
    test::TestRequest::post()
        .uri(uri)
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .set_json(body)
}

fn patch(uri: &str, token: &str, body: Value) -> test::TestRequest {
    test::TestRequest::patch()
        .uri(uri)
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .set_json(body)
}

fn find<'a>(items: &'a Value, key: &str, value: &str) -> &'a Value {
    items
        .as_array()
        .unwrap()
        .iter()
        .find(|item| item[key] == value)
        .unwrap_or_else(|| panic!("no item with {} = {}", key, value))
}

#[actix_web::test]
async fn health_is_public() {
    let app = app!();
    let (status, body) = send!(app, test::TestRequest::get().uri("/health"));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[actix_web::test]
async fn login_returns_token_and_dashboard() {
    let app = app!();
    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/v1/auth/login")
            .set_json(json!({ "email": DOCTOR, "password": "password123" }))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tokenType"], "Bearer");
    assert_eq!(body["redirectTo"], "/doctor/dashboard");
    assert_eq!(body["user"]["role"], "doctor");
    assert!(body["user"].get("passwordHash").is_none());

    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/v1/auth/login")
            .set_json(json!({ "email": DOCTOR, "password": "wrong-password" }))
    );
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
}

#[actix_web::test]
async fn requests_without_token_rejected() {
    let app = app!();
    let (status, body) = send!(app, test::TestRequest::get().uri("/api/v1/appointments"));
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let (status, _) = send!(app, get("/api/v1/auth/me", "not-a-token"));
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn registration_validates_fields() {
    let app = app!();
    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/v1/auth/register")
            .set_json(json!({ "name": "X", "email": "not-an-email", "password": "short" }))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_failed");
    assert!(body["fields"]["email"].is_array());
    assert!(body["fields"]["password"].is_array());

    let (status, body) = send!(
        app,
        test::TestRequest::post().uri("/api/v1/auth/register").set_json(json!({
            "name": "Kemi Lab",
            "email": "kemi@careportal.local",
            "password": "long-enough",
            "role": "lab"
        }))
    );
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "pending");
}

#[actix_web::test]
async fn booking_takes_slot_and_second_booking_conflicts() {
    let app = app!();
    let patient = login!(app, PATIENT);
    let other = login!(app, OTHER_PATIENT);

    let (_, doctors) = send!(app, get("/api/v1/doctors/list", &patient));
    let doctor_id = find(&doctors, "email", DOCTOR)["id"].as_str().unwrap().to_string();

    let booking = json!({ "doctorId": doctor_id, "dateTime": "2026-10-19T09:00:00Z", "type": "check-up" });
    let (status, appt) = send!(app, post("/api/v1/appointments", &patient, booking.clone()));
    assert_eq!(status, StatusCode::CREATED, "{}", appt);
    assert_eq!(appt["status"], "booked");
    assert_eq!(appt["type"], "check-up");

    let (status, body) = send!(app, post("/api/v1/appointments", &other, booking));
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    let uri = format!("/api/v1/doctors/{}/slots?date=2026-10-19", doctor_id);
    let (_, slots) = send!(app, get(&uri, &other));
    let nine = find(&slots, "start", "2026-10-19T09:00:00Z");
    assert_eq!(nine["available"], false);
    // seeded follow-up holds 10:00
    assert_eq!(find(&slots, "start", "2026-10-19T10:00:00Z")["available"], false);
    assert_eq!(find(&slots, "start", "2026-10-19T09:30:00Z")["available"], true);

    let (status, _) = send!(
        app,
        post(
            "/api/v1/appointments",
            &patient,
            json!({ "doctorId": doctor_id, "dateTime": "2026-10-19T09:10:00Z" })
        )
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn cancellation_needs_reason() {
    let app = app!();
    let patient = login!(app, PATIENT);
    let (_, mine) = send!(app, get("/api/v1/appointments/list?status=booked", &patient));
    let id = mine[0]["id"].as_str().unwrap().to_string();
    let uri = format!("/api/v1/appointments/{}/cancel", id);

    let (status, body) = send!(app, patch(&uri, &patient, json!({ "reason": "" })));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["reason"].is_array());

    let (status, body) = send!(app, patch(&uri, &patient, json!({ "reason": "Travelling" })));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cancelled");
    assert_eq!(body["cancellationReason"], "Travelling");

    let (status, body) = send!(app, patch(&uri, &patient, json!({ "reason": "again" })));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_transition");
}

#[actix_web::test]
async fn encounter_to_prescription_to_dispense() {
    let app = app!();
    let doctor = login!(app, DOCTOR);
    let pharmacist = login!(app, PHARMACIST);

    let (_, booked) = send!(app, get("/api/v1/appointments/list?status=booked", &doctor));
    let appointment_id = booked[0]["id"].as_str().unwrap().to_string();

    let (status, encounter) = send!(
        app,
        post(
            "/api/v1/encounters",
            &doctor,
            json!({
                "appointmentId": appointment_id,
                "vitals": { "bloodPressure": "128/82", "heartRate": 76 },
                "chiefComplaint": "Headache",
                "diagnosis": "Tension headache",
                "prescriptionItems": [
                    { "medicineName": "Paracetamol", "dosage": "1g", "frequency": "three times daily", "duration": "5 days", "quantity": 15 },
                    { "medicineName": "Zestril", "dosage": "10mg", "frequency": "daily", "duration": "30 days", "quantity": 30 }
                ],
                "labTests": ["CBC"]
            })
        )
    );
    assert_eq!(status, StatusCode::CREATED, "{}", encounter);

    let (_, appointment) = send!(app, get(&format!("/api/v1/appointments/{}", appointment_id), &doctor));
    assert_eq!(appointment["status"], "completed");

    let rx = encounter["prescriptionId"].as_str().unwrap();
    let uri = format!("/api/v1/prescriptions/{}/dispense", rx);
    let (status, body) = send!(
        app,
        patch(&uri, &doctor, json!({ "updates": [{ "itemIndex": 0, "dispensed": true }] }))
    );
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (_, body) = send!(
        app,
        patch(&uri, &pharmacist, json!({ "updates": [{ "itemIndex": 0, "dispensed": true }] }))
    );
    assert_eq!(body["status"], "partially-dispensed");
    let (_, body) = send!(
        app,
        patch(&uri, &pharmacist, json!({ "updates": [{ "itemIndex": 1, "dispensed": true }] }))
    );
    assert_eq!(body["status"], "dispensed");
    assert!(body["dispensedAt"].is_string());
}

#[actix_web::test]
async fn lab_results_reach_the_outbox() {
    let app = app!();
    let doctor = login!(app, DOCTOR);
    let lab = login!(app, LAB);
    let admin = login!(app, ADMIN);
    let patient = login!(app, PATIENT);

    let (_, me) = send!(app, get("/api/v1/auth/me", &patient));
    let (status, request) = send!(
        app,
        post(
            "/api/v1/lab-requests",
            &doctor,
            json!({ "patientId": me["id"], "tests": ["FBS", "LIPID"], "priority": "urgent" })
        )
    );
    assert_eq!(status, StatusCode::CREATED);
    let id = request["id"].as_str().unwrap();

    let (status, body) = send!(
        app,
        patch(
            &format!("/api/v1/lab-requests/{}/results", id),
            &lab,
            json!({
                "results": [
                    { "testId": "FBS", "value": "5.1", "unit": "mmol/L", "flag": "normal" },
                    { "testId": "LIPID", "value": "6.3", "unit": "mmol/L", "flag": "high" }
                ],
                "finalize": true
            })
        )
    );
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["status"], "completed");

    let (_, outbox) = send!(app, get("/api/v1/email-outbox/list", &admin));
    find(&outbox, "subject", "Your lab results are ready");
    let (status, _) = send!(app, get("/api/v1/email-outbox/list", &lab));
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, verified) = send!(app, get("/api/v1/audit/verify", &admin));
    assert_eq!(verified["intact"], true);
}

#[actix_web::test]
async fn route_checks_redirect_to_own_dashboard() {
    let app = app!();
    let patient = login!(app, PATIENT);
    let (_, decision) = send!(app, get("/api/v1/access/check?path=/doctor/appointments", &patient));
    assert_eq!(decision["decision"], "redirect");
    assert_eq!(decision["location"], "/patient/dashboard");

    let (_, decision) = send!(app, get("/api/v1/access/check?path=/patient/prescriptions", &patient));
    assert_eq!(decision["decision"], "allow");

    let (_, nav) = send!(app, get("/api/v1/navigation", &patient));
    assert_eq!(nav["role"], "patient");
    assert_eq!(nav["items"][0]["path"], "/patient/dashboard");

    let (status, _) = send!(app, get("/api/v1/users", &patient));
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn suspended_user_token_stops_working() {
    let app = app!();
    let patient = login!(app, OTHER_PATIENT);
    let admin = login!(app, ADMIN);

    let (_, me) = send!(app, get("/api/v1/auth/me", &patient));
    let uri = format!("/api/v1/users/{}/status", me["id"].as_str().unwrap());
    let (status, _) = send!(app, patch(&uri, &admin, json!({ "status": "suspended" })));
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send!(app, get("/api/v1/auth/me", &patient));
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn collections_are_paginated() {
    let app = app!();
    let pharmacist = login!(app, PHARMACIST);
    let (status, page) = send!(app, get("/api/v1/medicines?page=2&size=3", &pharmacist));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["page"], 2);
    assert_eq!(page["size"], 3);
    assert_eq!(page["total"], 4);
    assert_eq!(page["items"].as_array().unwrap().len(), 1);

    let (_, all) = send!(app, get("/api/v1/diagnostics/list", &pharmacist));
    assert_eq!(all.as_array().unwrap().len(), 5);
}

#[actix_web::test]
async fn page_past_the_end_is_empty() {
    let app = app!();
    let admin = login!(app, ADMIN);
    let (status, page) = send!(app, get("/api/v1/users?page=18446744073709551615", &admin));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 7);
    assert!(page["items"].as_array().unwrap().is_empty());
}

#[actix_web::test]
async fn upcoming_window_for_reminders() {
    let app = app!();
    let patient = login!(app, PATIENT);
    // the seeded follow-up is Monday 10:00, 67 hours out
    let (status, soon) = send!(app, get("/api/v1/appointments/upcoming", &patient));
    assert_eq!(status, StatusCode::OK);
    assert!(soon.as_array().unwrap().is_empty());

    let (_, week) = send!(app, get("/api/v1/appointments/upcoming?hours=72", &patient));
    assert_eq!(week.as_array().unwrap().len(), 1);

    let other = login!(app, OTHER_PATIENT);
    let (_, theirs) = send!(app, get("/api/v1/appointments/upcoming?hours=72", &other));
    assert!(theirs.as_array().unwrap().is_empty());

    let (status, _) = send!(app, get("/api/v1/appointments/upcoming?hours=0", &patient));
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn dashboards_follow_role() {
    let app = app!();
    let lab = login!(app, LAB);
    let (_, dashboard) = send!(app, get("/api/v1/dashboard", &lab));
    assert_eq!(dashboard["role"], "lab");
    assert_eq!(dashboard["requested"], 0);

    let patient = login!(app, PATIENT);
    let (_, dashboard) = send!(app, get("/api/v1/dashboard", &patient));
    assert_eq!(dashboard["upcomingAppointments"].as_array().unwrap().len(), 1);
}
