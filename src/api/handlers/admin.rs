//! Email outbox, login logs and the audit trail. Admin only.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use super::paged;
use crate::api::middleware::AuthUser;
use crate::clinic::requests::{EmailFilter, EmailStatusRequest};
use crate::clinic::ClinicService;
use crate::error::PortalResult;
use crate::models::PageQuery;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditFilter {
    entity_id: Option<Uuid>,
}

// ===== Email outbox =====

pub async fn outbox_page(
    service: web::Data<ClinicService>,
    user: AuthUser,
    filter: web::Query<EmailFilter>,
    query: web::Query<PageQuery>,
) -> PortalResult<HttpResponse> {
    Ok(paged(service.list_outbox(&user, filter.into_inner())?, query.into_inner()))
}

pub async fn outbox_list(
    service: web::Data<ClinicService>,
    user: AuthUser,
    filter: web::Query<EmailFilter>,
) -> PortalResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(service.list_outbox(&user, filter.into_inner())?))
}

pub async fn outbox_get(
    service: web::Data<ClinicService>,
    user: AuthUser,
    id: web::Path<Uuid>,
) -> PortalResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(service.get_email(&user, *id)?))
}

pub async fn outbox_status(
    service: web::Data<ClinicService>,
    user: AuthUser,
    id: web::Path<Uuid>,
    body: web::Json<EmailStatusRequest>,
) -> PortalResult<HttpResponse> {
    let message = service.set_email_status(&user, id.into_inner(), body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(message))
}

// ===== Login logs =====

pub async fn login_log_page(
    service: web::Data<ClinicService>,
    user: AuthUser,
    query: web::Query<PageQuery>,
) -> PortalResult<HttpResponse> {
    Ok(paged(service.login_logs(&user)?, query.into_inner()))
}

pub async fn login_log_list(service: web::Data<ClinicService>, user: AuthUser) -> PortalResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(service.login_logs(&user)?))
}

// ===== Audit =====

pub async fn audit_page(
    service: web::Data<ClinicService>,
    user: AuthUser,
    filter: web::Query<AuditFilter>,
    query: web::Query<PageQuery>,
) -> PortalResult<HttpResponse> {
    Ok(paged(service.audit_entries(&user, filter.entity_id)?, query.into_inner()))
}

pub async fn audit_list(
    service: web::Data<ClinicService>,
    user: AuthUser,
    filter: web::Query<AuditFilter>,
) -> PortalResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(service.audit_entries(&user, filter.entity_id)?))
}

pub async fn audit_verify(service: web::Data<ClinicService>, user: AuthUser) -> PortalResult<HttpResponse> {
    let intact = service.verify_audit(&user)?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "intact": intact })))
}
