//! Medicines, diagnostics and specializations.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use super::{created, paged};
use crate::api::middleware::AuthUser;
use crate::clinic::ClinicService;
use crate::error::PortalResult;
use crate::models::catalog::{DiagnosticInput, MedicineInput, SpecializationInput};
use crate::models::PageQuery;

#[derive(Debug, Default, Deserialize)]
pub struct CatalogFilter {
    #[serde(default)]
    active: bool,
}

// ===== Medicines =====

pub async fn medicine_page(
    service: web::Data<ClinicService>,
    _user: AuthUser,
    filter: web::Query<CatalogFilter>,
    query: web::Query<PageQuery>,
) -> HttpResponse {
    paged(service.list_medicines(filter.active), query.into_inner())
}

pub async fn medicine_list(
    service: web::Data<ClinicService>,
    _user: AuthUser,
    filter: web::Query<CatalogFilter>,
) -> HttpResponse {
    HttpResponse::Ok().json(service.list_medicines(filter.active))
}

pub async fn medicine_get(
    service: web::Data<ClinicService>,
    _user: AuthUser,
    id: web::Path<Uuid>,
) -> PortalResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(service.get_medicine(*id)?))
}

pub async fn medicine_create(
    service: web::Data<ClinicService>,
    user: AuthUser,
    body: web::Json<MedicineInput>,
) -> PortalResult<HttpResponse> {
    Ok(created(service.create_medicine(&user, body.into_inner()).await?))
}

pub async fn medicine_update(
    service: web::Data<ClinicService>,
    user: AuthUser,
    id: web::Path<Uuid>,
    body: web::Json<MedicineInput>,
) -> PortalResult<HttpResponse> {
    let medicine = service.update_medicine(&user, id.into_inner(), body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(medicine))
}

// ===== Diagnostics =====

pub async fn diagnostic_page(
    service: web::Data<ClinicService>,
    _user: AuthUser,
    filter: web::Query<CatalogFilter>,
    query: web::Query<PageQuery>,
) -> HttpResponse {
    paged(service.list_diagnostics(filter.active), query.into_inner())
}

pub async fn diagnostic_list(
    service: web::Data<ClinicService>,
    _user: AuthUser,
    filter: web::Query<CatalogFilter>,
) -> HttpResponse {
    HttpResponse::Ok().json(service.list_diagnostics(filter.active))
}

pub async fn diagnostic_get(
    service: web::Data<ClinicService>,
    _user: AuthUser,
    id: web::Path<Uuid>,
) -> PortalResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(service.get_diagnostic(*id)?))
}

pub async fn diagnostic_create(
    service: web::Data<ClinicService>,
    user: AuthUser,
    body: web::Json<DiagnosticInput>,
) -> PortalResult<HttpResponse> {
    Ok(created(service.create_diagnostic(&user, body.into_inner()).await?))
}

pub async fn diagnostic_update(
    service: web::Data<ClinicService>,
    user: AuthUser,
    id: web::Path<Uuid>,
    body: web::Json<DiagnosticInput>,
) -> PortalResult<HttpResponse> {
    let diagnostic = service.update_diagnostic(&user, id.into_inner(), body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(diagnostic))
}

// ===== Specializations =====

pub async fn specialization_page(
    service: web::Data<ClinicService>,
    _user: AuthUser,
    query: web::Query<PageQuery>,
) -> HttpResponse {
    paged(service.list_specializations(), query.into_inner())
}

pub async fn specialization_list(service: web::Data<ClinicService>, _user: AuthUser) -> HttpResponse {
    HttpResponse::Ok().json(service.list_specializations())
}

pub async fn specialization_get(
    service: web::Data<ClinicService>,
    _user: AuthUser,
    id: web::Path<Uuid>,
) -> PortalResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(service.get_specialization(*id)?))
}

pub async fn specialization_create(
    service: web::Data<ClinicService>,
    user: AuthUser,
    body: web::Json<SpecializationInput>,
) -> PortalResult<HttpResponse> {
    Ok(created(service.create_specialization(&user, body.into_inner()).await?))
}

pub async fn specialization_update(
    service: web::Data<ClinicService>,
    user: AuthUser,
    id: web::Path<Uuid>,
    body: web::Json<SpecializationInput>,
) -> PortalResult<HttpResponse> {
    let specialization = service
        .update_specialization(&user, id.into_inner(), body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(specialization))
}
