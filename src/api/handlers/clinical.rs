//! Encounters, prescriptions and lab requests.

use actix_web::{web, HttpResponse};
use uuid::Uuid;

use super::{created, paged};
use crate::api::middleware::AuthUser;
use crate::clinic::requests::{
    CreateEncounterRequest, CreateLabRequest, CreatePrescriptionRequest, DispenseRequest,
    EncounterFilter, LabFilter, PrescriptionFilter, RecordResultsRequest,
};
use crate::clinic::ClinicService;
use crate::error::PortalResult;
use crate::models::PageQuery;

// ===== Encounters =====

pub async fn encounter_page(
    service: web::Data<ClinicService>,
    user: AuthUser,
    filter: web::Query<EncounterFilter>,
    query: web::Query<PageQuery>,
) -> PortalResult<HttpResponse> {
    Ok(paged(service.list_encounters(&user, &filter)?, query.into_inner()))
}

pub async fn encounter_list(
    service: web::Data<ClinicService>,
    user: AuthUser,
    filter: web::Query<EncounterFilter>,
) -> PortalResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(service.list_encounters(&user, &filter)?))
}

pub async fn encounter_get(
    service: web::Data<ClinicService>,
    user: AuthUser,
    id: web::Path<Uuid>,
) -> PortalResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(service.get_encounter(&user, *id)?))
}

pub async fn encounter_create(
    service: web::Data<ClinicService>,
    user: AuthUser,
    body: web::Json<CreateEncounterRequest>,
) -> PortalResult<HttpResponse> {
    Ok(created(service.create_encounter(&user, body.into_inner()).await?))
}

// ===== Prescriptions =====

pub async fn prescription_page(
    service: web::Data<ClinicService>,
    user: AuthUser,
    filter: web::Query<PrescriptionFilter>,
    query: web::Query<PageQuery>,
) -> PortalResult<HttpResponse> {
    Ok(paged(service.list_prescriptions(&user, &filter)?, query.into_inner()))
}

pub async fn prescription_list(
    service: web::Data<ClinicService>,
    user: AuthUser,
    filter: web::Query<PrescriptionFilter>,
) -> PortalResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(service.list_prescriptions(&user, &filter)?))
}

pub async fn prescription_get(
    service: web::Data<ClinicService>,
    user: AuthUser,
    id: web::Path<Uuid>,
) -> PortalResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(service.get_prescription(&user, *id)?))
}

pub async fn prescription_create(
    service: web::Data<ClinicService>,
    user: AuthUser,
    body: web::Json<CreatePrescriptionRequest>,
) -> PortalResult<HttpResponse> {
    Ok(created(service.create_prescription(&user, body.into_inner()).await?))
}

pub async fn prescription_dispense(
    service: web::Data<ClinicService>,
    user: AuthUser,
    id: web::Path<Uuid>,
    body: web::Json<DispenseRequest>,
) -> PortalResult<HttpResponse> {
    let prescription = service.dispense(&user, id.into_inner(), body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(prescription))
}

pub async fn prescription_cancel(
    service: web::Data<ClinicService>,
    user: AuthUser,
    id: web::Path<Uuid>,
) -> PortalResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(service.cancel_prescription(&user, id.into_inner()).await?))
}

// ===== Lab requests =====

pub async fn lab_page(
    service: web::Data<ClinicService>,
    user: AuthUser,
    filter: web::Query<LabFilter>,
    query: web::Query<PageQuery>,
) -> PortalResult<HttpResponse> {
    Ok(paged(service.list_lab_requests(&user, &filter)?, query.into_inner()))
}

pub async fn lab_list(
    service: web::Data<ClinicService>,
    user: AuthUser,
    filter: web::Query<LabFilter>,
) -> PortalResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(service.list_lab_requests(&user, &filter)?))
}

pub async fn lab_get(
    service: web::Data<ClinicService>,
    user: AuthUser,
    id: web::Path<Uuid>,
) -> PortalResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(service.get_lab_request(&user, *id)?))
}

pub async fn lab_create(
    service: web::Data<ClinicService>,
    user: AuthUser,
    body: web::Json<CreateLabRequest>,
) -> PortalResult<HttpResponse> {
    Ok(created(service.create_lab_request(&user, body.into_inner()).await?))
}

pub async fn lab_start(
    service: web::Data<ClinicService>,
    user: AuthUser,
    id: web::Path<Uuid>,
) -> PortalResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(service.start_lab_processing(&user, id.into_inner()).await?))
}

pub async fn lab_results(
    service: web::Data<ClinicService>,
    user: AuthUser,
    id: web::Path<Uuid>,
    body: web::Json<RecordResultsRequest>,
) -> PortalResult<HttpResponse> {
    let request = service
        .record_lab_results(&user, id.into_inner(), body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(request))
}

pub async fn lab_cancel(
    service: web::Data<ClinicService>,
    user: AuthUser,
    id: web::Path<Uuid>,
) -> PortalResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(service.cancel_lab_request(&user, id.into_inner()).await?))
}
