//! HTTP handlers, one module per resource group.

use actix_web::HttpResponse;
use serde::Serialize;

use crate::models::{Page, PageQuery};

pub mod admin;
pub mod appointments;
pub mod catalog;
pub mod clinical;
pub mod directory;
pub mod session;

pub(crate) fn paged<T: Serialize>(items: Vec<T>, query: PageQuery) -> HttpResponse {
    HttpResponse::Ok().json(Page::from_items(items, query))
}

pub(crate) fn created<T: Serialize>(body: T) -> HttpResponse {
    HttpResponse::Created().json(body)
}
