//! Request authentication.

use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{web, FromRequest, HttpRequest};
use tracing::debug;

use crate::auth::Actor;
use crate::clinic::ClinicService;
use crate::error::{PortalError, PortalResult};

/// The authenticated caller of a request.
///
/// Extraction verifies the bearer token and re-reads the account, so a user
/// suspended after login is turned away on their next request.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Actor);

impl std::ops::Deref for AuthUser {
    type Target = Actor;

    fn deref(&self) -> &Actor {
        &self.0
    }
}

fn bearer_token(req: &HttpRequest) -> PortalResult<&str> {
    let value = req
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or_else(|| PortalError::Unauthorized("missing Authorization header".into()))?
        .to_str()
        .map_err(|_| PortalError::Unauthorized("malformed Authorization header".into()))?;
    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => {
            Ok(token.trim())
        }
        _ => Err(PortalError::Unauthorized("expected a Bearer token".into())),
    }
}

fn authenticate(req: &HttpRequest) -> PortalResult<AuthUser> {
    let service = req
        .app_data::<web::Data<ClinicService>>()
        .ok_or_else(|| PortalError::Internal("clinic service is not registered".into()))?;
    let claims = service.tokens().verify(bearer_token(req)?)?;
    let actor = service.actor_for(claims.sub)?;
    if actor.role != claims.role {
        return Err(PortalError::Unauthorized("token role is out of date".into()));
    }
    debug!(user_id = %actor.id, role = %actor.role, "request authenticated");
    Ok(AuthUser(actor))
}

impl FromRequest for AuthUser {
    type Error = PortalError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

/// JSON and query extractor errors rendered in the portal's error shape.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(256 * 1024)
        .error_handler(|err, _| PortalError::BadRequest(err.to_string()).into())
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _| PortalError::BadRequest(err.to_string()).into())
}

pub fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|err, _| PortalError::BadRequest(err.to_string()).into())
}
