use actix_web::{web, HttpResponse};
use uuid::Uuid;

use super::{created, paged};
use crate::api::middleware::AuthUser;
use crate::clinic::requests::{
    AppointmentFilter, BookAppointmentRequest, CancelAppointmentRequest, UpcomingQuery,
};
use crate::clinic::ClinicService;
use crate::error::PortalResult;
use crate::models::PageQuery;

pub async fn page(
    service: web::Data<ClinicService>,
    user: AuthUser,
    filter: web::Query<AppointmentFilter>,
    query: web::Query<PageQuery>,
) -> PortalResult<HttpResponse> {
    let items = service.list_appointments(&user, &filter)?;
    Ok(paged(items, query.into_inner()))
}

pub async fn list(
    service: web::Data<ClinicService>,
    user: AuthUser,
    filter: web::Query<AppointmentFilter>,
) -> PortalResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(service.list_appointments(&user, &filter)?))
}

pub async fn upcoming(
    service: web::Data<ClinicService>,
    user: AuthUser,
    query: web::Query<UpcomingQuery>,
) -> PortalResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(service.upcoming_appointments(&user, query.into_inner())?))
}

pub async fn get(
    service: web::Data<ClinicService>,
    user: AuthUser,
    id: web::Path<Uuid>,
) -> PortalResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(service.get_appointment(&user, *id)?))
}

pub async fn book(
    service: web::Data<ClinicService>,
    user: AuthUser,
    body: web::Json<BookAppointmentRequest>,
) -> PortalResult<HttpResponse> {
    let appointment = service.book_appointment(&user, body.into_inner()).await?;
    Ok(created(appointment))
}

pub async fn cancel(
    service: web::Data<ClinicService>,
    user: AuthUser,
    id: web::Path<Uuid>,
    body: web::Json<CancelAppointmentRequest>,
) -> PortalResult<HttpResponse> {
    let appointment = service
        .cancel_appointment(&user, id.into_inner(), body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(appointment))
}

pub async fn complete(
    service: web::Data<ClinicService>,
    user: AuthUser,
    id: web::Path<Uuid>,
) -> PortalResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(service.complete_appointment(&user, id.into_inner()).await?))
}

pub async fn no_show(
    service: web::Data<ClinicService>,
    user: AuthUser,
    id: web::Path<Uuid>,
) -> PortalResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(service.mark_no_show(&user, id.into_inner()).await?))
}

pub async fn encounter(
    service: web::Data<ClinicService>,
    user: AuthUser,
    id: web::Path<Uuid>,
) -> PortalResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(service.encounter_for_appointment(&user, id.into_inner())?))
}
