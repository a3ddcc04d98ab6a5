//! Role to route mapping.
//!
//! Every role owns one route prefix. The same table drives the sidebar a role
//! sees and where a mismatched page visit gets sent back to.

use serde::Serialize;

use crate::error::{PortalError, PortalResult};
use crate::models::{Role, RoleInfo};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NavItem {
    pub label: &'static str,
    pub path: &'static str,
}

const fn nav(label: &'static str, path: &'static str) -> NavItem {
    NavItem { label, path }
}

const PATIENT_NAV: &[NavItem] = &[
    nav("Dashboard", "/patient/dashboard"),
    nav("Book Appointment", "/patient/book-appointment"),
    nav("My Appointments", "/patient/appointments"),
    nav("Prescriptions", "/patient/prescriptions"),
    nav("Lab Results", "/patient/lab-results"),
    nav("Profile", "/patient/profile"),
];

const DOCTOR_NAV: &[NavItem] = &[
    nav("Dashboard", "/doctor/dashboard"),
    nav("Appointments", "/doctor/appointments"),
    nav("Schedule", "/doctor/schedule"),
    nav("Encounters", "/doctor/encounters"),
    nav("Prescriptions", "/doctor/prescriptions"),
    nav("Lab Requests", "/doctor/lab-requests"),
    nav("Profile", "/doctor/profile"),
];

const LAB_NAV: &[NavItem] = &[
    nav("Dashboard", "/lab/dashboard"),
    nav("Test Requests", "/lab/requests"),
    nav("Enter Results", "/lab/results"),
    nav("Test Catalog", "/lab/diagnostics"),
];

const PHARMACIST_NAV: &[NavItem] = &[
    nav("Dashboard", "/pharmacist/dashboard"),
    nav("Prescriptions", "/pharmacist/prescriptions"),
    nav("Dispense", "/pharmacist/dispense"),
    nav("Medicines", "/pharmacist/medicines"),
];

const ADMIN_NAV: &[NavItem] = &[
    nav("Dashboard", "/admin/dashboard"),
    nav("Users", "/admin/users"),
    nav("Doctors", "/admin/doctors"),
    nav("Appointments", "/admin/appointments"),
    nav("Medicines", "/admin/medicines"),
    nav("Diagnostics", "/admin/diagnostics"),
    nav("Specializations", "/admin/specializations"),
    nav("Email Outbox", "/admin/email-outbox"),
    nav("Login Logs", "/admin/login-logs"),
];

pub fn route_prefix(role: Role) -> &'static str {
    match role {
        Role::Patient => "/patient",
        Role::Doctor => "/doctor",
        Role::Lab => "/lab",
        Role::Pharmacist => "/pharmacist",
        Role::Admin => "/admin",
    }
}

pub fn dashboard_path(role: Role) -> String {
    format!("{}/dashboard", route_prefix(role))
}

pub fn navigation(role: Role) -> &'static [NavItem] {
    match role {
        Role::Patient => PATIENT_NAV,
        Role::Doctor => DOCTOR_NAV,
        Role::Lab => LAB_NAV,
        Role::Pharmacist => PHARMACIST_NAV,
        Role::Admin => ADMIN_NAV,
    }
}

pub fn role_info(role: Role) -> RoleInfo {
    RoleInfo {
        role,
        route_prefix: route_prefix(role),
        dashboard: dashboard_path(role),
        requires_approval: role.requires_approval(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "location", rename_all = "lowercase")]
pub enum RouteDecision {
    Allow,
    Redirect(String),
}

fn under_prefix(path: &str, prefix: &str) -> bool {
    path == prefix
        || path
            .strip_prefix(prefix)
            .map_or(false, |rest| rest.starts_with('/'))
}

/// Drop query and fragment, then resolve `.`, `..` and empty segments.
fn normalize(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            segment => segments.push(segment),
        }
    }
    format!("/{}", segments.join("/"))
}

/// Decide whether `role` may open `path`.
///
/// Pages outside every role prefix are public. A page owned by another role
/// redirects to the caller's own dashboard.
pub fn check_route(role: Role, path: &str) -> RouteDecision {
    let path = normalize(path);
    let owner = Role::ALL
        .into_iter()
        .find(|candidate| under_prefix(&path, route_prefix(*candidate)));
    match owner {
        Some(owner) if owner != role => RouteDecision::Redirect(dashboard_path(role)),
        _ => RouteDecision::Allow,
    }
}

/// API-level allow-list check.
pub fn require_role(role: Role, allowed: &[Role]) -> PortalResult<()> {
    if allowed.contains(&role) {
        Ok(())
    } else {
        Err(PortalError::Forbidden(format!(
            "role '{}' may not perform this action",
            role
        )))
    }
}
