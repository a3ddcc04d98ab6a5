//! Clinical records and the reference data around them.

pub mod appointment;
pub mod catalog;
pub mod doctor;
pub mod encounter;
pub mod lab;
pub mod notification;
pub mod prescription;
pub mod user;

use serde::{Deserialize, Serialize};

pub use appointment::{Appointment, AppointmentStatus, AppointmentType};
pub use catalog::{Diagnostic, Medicine, RoleInfo, Specialization};
pub use doctor::{Doctor, DoctorStatus, ScheduleEntry};
pub use encounter::{Encounter, Vitals};
pub use lab::{LabPriority, LabRequest, LabResult, LabStatus, ResultFlag};
pub use notification::{EmailMessage, EmailStatus, LoginLog};
pub use prescription::{DispenseUpdate, Prescription, PrescriptionItem, PrescriptionStatus};
pub use user::{Role, User, UserStatus};

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageQuery {
    pub page: Option<usize>,
    pub size: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub size: usize,
    pub total: usize,
}

impl<T> Page<T> {
    /// Slice an already ordered list. Pages are 1-based.
    pub fn from_items(items: Vec<T>, query: PageQuery) -> Self {
        let page = query.page.unwrap_or(1).max(1);
        let size = query.size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let total = items.len();
        let offset = (page - 1).saturating_mul(size);
        let items = items.into_iter().skip(offset).take(size).collect();
        Page { items, page, size, total }
    }
}
