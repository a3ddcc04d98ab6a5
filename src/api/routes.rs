//! URL table for the portal API.

use actix_web::web;

use super::handlers::{admin, appointments, catalog, clinical, directory, session};
use super::middleware::{json_config, path_config, query_config};

pub const API_PREFIX: &str = "/api/v1";

/// Register every route. `/health` stays outside the versioned scope.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(query_config())
        .app_data(path_config())
        .route("/health", web::get().to(session::health))
        .service(
            web::scope(API_PREFIX)
                .service(
                    web::scope("/auth")
                        .route("/register", web::post().to(session::register))
                        .route("/login", web::post().to(session::login))
                        .route("/me", web::get().to(session::me)),
                )
                .route("/navigation", web::get().to(session::navigation_for))
                .route("/access/check", web::get().to(session::access_check))
                .route("/dashboard", web::get().to(session::dashboard))
                .service(
                    web::scope("/appointments")
                        .route("", web::get().to(appointments::page))
                        .route("", web::post().to(appointments::book))
                        .route("/list", web::get().to(appointments::list))
                        .route("/upcoming", web::get().to(appointments::upcoming))
                        .route("/{id}", web::get().to(appointments::get))
                        .route("/{id}/cancel", web::patch().to(appointments::cancel))
                        .route("/{id}/complete", web::patch().to(appointments::complete))
                        .route("/{id}/no-show", web::patch().to(appointments::no_show))
                        .route("/{id}/encounter", web::get().to(appointments::encounter)),
                )
                .service(
                    web::scope("/encounters")
                        .route("", web::get().to(clinical::encounter_page))
                        .route("", web::post().to(clinical::encounter_create))
                        .route("/list", web::get().to(clinical::encounter_list))
                        .route("/{id}", web::get().to(clinical::encounter_get)),
                )
                .service(
                    web::scope("/prescriptions")
                        .route("", web::get().to(clinical::prescription_page))
                        .route("", web::post().to(clinical::prescription_create))
                        .route("/list", web::get().to(clinical::prescription_list))
                        .route("/{id}", web::get().to(clinical::prescription_get))
                        .route("/{id}/dispense", web::patch().to(clinical::prescription_dispense))
                        .route("/{id}/cancel", web::patch().to(clinical::prescription_cancel)),
                )
                .service(
                    web::scope("/lab-requests")
                        .route("", web::get().to(clinical::lab_page))
                        .route("", web::post().to(clinical::lab_create))
                        .route("/list", web::get().to(clinical::lab_list))
                        .route("/{id}", web::get().to(clinical::lab_get))
                        .route("/{id}/start", web::patch().to(clinical::lab_start))
                        .route("/{id}/results", web::patch().to(clinical::lab_results))
                        .route("/{id}/cancel", web::patch().to(clinical::lab_cancel)),
                )
                .service(
                    web::scope("/doctors")
                        .route("", web::get().to(directory::doctor_page))
                        .route("/list", web::get().to(directory::doctor_list))
                        .route("/{id}", web::get().to(directory::doctor_get))
                        .route("/{id}", web::put().to(directory::doctor_update))
                        .route("/{id}/schedule", web::put().to(directory::doctor_schedule))
                        .route("/{id}/status", web::patch().to(directory::doctor_status))
                        .route("/{id}/slots", web::get().to(directory::doctor_slots)),
                )
                .service(
                    web::scope("/users")
                        .route("", web::get().to(directory::user_page))
                        .route("", web::post().to(directory::user_create))
                        .route("/list", web::get().to(directory::user_list))
                        .route("/{id}", web::get().to(directory::user_get))
                        .route("/{id}", web::put().to(directory::user_update))
                        .route("/{id}/status", web::patch().to(directory::user_status)),
                )
                .service(
                    web::scope("/roles")
                        .route("", web::get().to(directory::roles))
                        .route("/list", web::get().to(directory::roles)),
                )
                .service(
                    web::scope("/medicines")
                        .route("", web::get().to(catalog::medicine_page))
                        .route("", web::post().to(catalog::medicine_create))
                        .route("/list", web::get().to(catalog::medicine_list))
                        .route("/{id}", web::get().to(catalog::medicine_get))
                        .route("/{id}", web::put().to(catalog::medicine_update)),
                )
                .service(
                    web::scope("/diagnostics")
                        .route("", web::get().to(catalog::diagnostic_page))
                        .route("", web::post().to(catalog::diagnostic_create))
                        .route("/list", web::get().to(catalog::diagnostic_list))
                        .route("/{id}", web::get().to(catalog::diagnostic_get))
                        .route("/{id}", web::put().to(catalog::diagnostic_update)),
                )
                .service(
                    web::scope("/specializations")
                        .route("", web::get().to(catalog::specialization_page))
                        .route("", web::post().to(catalog::specialization_create))
                        .route("/list", web::get().to(catalog::specialization_list))
                        .route("/{id}", web::get().to(catalog::specialization_get))
                        .route("/{id}", web::put().to(catalog::specialization_update)),
                )
                .service(
                    web::scope("/email-outbox")
                        .route("", web::get().to(admin::outbox_page))
                        .route("/list", web::get().to(admin::outbox_list))
                        .route("/{id}", web::get().to(admin::outbox_get))
                        .route("/{id}/status", web::patch().to(admin::outbox_status)),
                )
                .service(
                    web::scope("/login-logs")
                        .route("", web::get().to(admin::login_log_page))
                        .route("/list", web::get().to(admin::login_log_list)),
                )
                .service(
                    web::scope("/audit")
                        .route("", web::get().to(admin::audit_page))
                        .route("/list", web::get().to(admin::audit_list))
                        .route("/verify", web::get().to(admin::audit_verify)),
                ),
        );
}
