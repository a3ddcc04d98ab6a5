//! Users, doctors and roles.

use actix_web::{web, HttpResponse};
use uuid::Uuid;

use super::{created, paged};
use crate::api::middleware::AuthUser;
use crate::clinic::requests::{
    DoctorFilter, DoctorStatusRequest, RegisterRequest, ScheduleRequest, SlotQuery,
    UpdateDoctorRequest, UpdateUserRequest, UserFilter, UserStatusRequest,
};
use crate::clinic::ClinicService;
use crate::error::PortalResult;
use crate::models::PageQuery;

// ===== Users =====

pub async fn user_page(
    service: web::Data<ClinicService>,
    user: AuthUser,
    filter: web::Query<UserFilter>,
    query: web::Query<PageQuery>,
) -> PortalResult<HttpResponse> {
    Ok(paged(service.list_users(&user, &filter)?, query.into_inner()))
}

pub async fn user_list(
    service: web::Data<ClinicService>,
    user: AuthUser,
    filter: web::Query<UserFilter>,
) -> PortalResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(service.list_users(&user, &filter)?))
}

pub async fn user_get(
    service: web::Data<ClinicService>,
    user: AuthUser,
    id: web::Path<Uuid>,
) -> PortalResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(service.get_user(&user, *id)?))
}

pub async fn user_create(
    service: web::Data<ClinicService>,
    user: AuthUser,
    body: web::Json<RegisterRequest>,
) -> PortalResult<HttpResponse> {
    Ok(created(service.create_user(&user, body.into_inner()).await?))
}

pub async fn user_update(
    service: web::Data<ClinicService>,
    user: AuthUser,
    id: web::Path<Uuid>,
    body: web::Json<UpdateUserRequest>,
) -> PortalResult<HttpResponse> {
    let updated = service.update_user(&user, id.into_inner(), body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(updated))
}

pub async fn user_status(
    service: web::Data<ClinicService>,
    user: AuthUser,
    id: web::Path<Uuid>,
    body: web::Json<UserStatusRequest>,
) -> PortalResult<HttpResponse> {
    let updated = service.set_user_status(&user, id.into_inner(), body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(updated))
}

// ===== Doctors =====

pub async fn doctor_page(
    service: web::Data<ClinicService>,
    _user: AuthUser,
    filter: web::Query<DoctorFilter>,
    query: web::Query<PageQuery>,
) -> HttpResponse {
    paged(service.list_doctors(&filter), query.into_inner())
}

pub async fn doctor_list(
    service: web::Data<ClinicService>,
    _user: AuthUser,
    filter: web::Query<DoctorFilter>,
) -> HttpResponse {
    HttpResponse::Ok().json(service.list_doctors(&filter))
}

pub async fn doctor_get(
    service: web::Data<ClinicService>,
    _user: AuthUser,
    id: web::Path<Uuid>,
) -> PortalResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(service.get_doctor(*id)?))
}

pub async fn doctor_update(
    service: web::Data<ClinicService>,
    user: AuthUser,
    id: web::Path<Uuid>,
    body: web::Json<UpdateDoctorRequest>,
) -> PortalResult<HttpResponse> {
    let doctor = service.update_doctor(&user, id.into_inner(), body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(doctor))
}

pub async fn doctor_schedule(
    service: web::Data<ClinicService>,
    user: AuthUser,
    id: web::Path<Uuid>,
    body: web::Json<ScheduleRequest>,
) -> PortalResult<HttpResponse> {
    let doctor = service.update_schedule(&user, id.into_inner(), body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(doctor))
}

pub async fn doctor_status(
    service: web::Data<ClinicService>,
    user: AuthUser,
    id: web::Path<Uuid>,
    body: web::Json<DoctorStatusRequest>,
) -> PortalResult<HttpResponse> {
    let doctor = service.set_doctor_status(&user, id.into_inner(), body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(doctor))
}

pub async fn doctor_slots(
    service: web::Data<ClinicService>,
    _user: AuthUser,
    id: web::Path<Uuid>,
    query: web::Query<SlotQuery>,
) -> PortalResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(service.doctor_slots(*id, query.into_inner())?))
}

// ===== Roles =====

pub async fn roles(service: web::Data<ClinicService>, _user: AuthUser) -> HttpResponse {
    HttpResponse::Ok().json(service.roles())
}
