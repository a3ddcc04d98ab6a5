//! Core rules that do not touch storage: access control, time and scheduling.

pub mod access;
pub mod clock;
pub mod dashboard;
pub mod schedule;
