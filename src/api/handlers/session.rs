use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::created;
use crate::api::middleware::AuthUser;
use crate::auth::SessionToken;
use crate::clinic::requests::{LoginRequest, RegisterRequest};
use crate::clinic::ClinicService;
use crate::core::access::{check_route, dashboard_path, navigation, NavItem, RouteDecision};
use crate::error::PortalResult;
use crate::models::{Role, User};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    #[serde(flatten)]
    session: SessionToken,
    user: User,
    redirect_to: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NavigationResponse {
    role: Role,
    dashboard: String,
    items: &'static [NavItem],
}

#[derive(Deserialize)]
pub struct AccessQuery {
    path: String,
}

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

pub async fn register(
    service: web::Data<ClinicService>,
    body: web::Json<RegisterRequest>,
) -> PortalResult<HttpResponse> {
    let user = service.register(body.into_inner()).await?;
    Ok(created(user))
}

pub async fn login(
    service: web::Data<ClinicService>,
    body: web::Json<LoginRequest>,
) -> PortalResult<HttpResponse> {
    let request = body.into_inner();
    request.validate()?;
    let (user, session) = service.login(&request.email, &request.password).await?;
    Ok(HttpResponse::Ok().json(LoginResponse {
        redirect_to: dashboard_path(user.role),
        session,
        user,
    }))
}

pub async fn me(service: web::Data<ClinicService>, user: AuthUser) -> PortalResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(service.me(&user)?))
}

pub async fn navigation_for(user: AuthUser) -> HttpResponse {
    HttpResponse::Ok().json(NavigationResponse {
        role: user.role,
        dashboard: dashboard_path(user.role),
        items: navigation(user.role),
    })
}

pub async fn access_check(user: AuthUser, query: web::Query<AccessQuery>) -> HttpResponse {
    let decision: RouteDecision = check_route(user.role, &query.path);
    HttpResponse::Ok().json(decision)
}

pub async fn dashboard(service: web::Data<ClinicService>, user: AuthUser) -> HttpResponse {
    HttpResponse::Ok().json(service.dashboard(&user))
}
