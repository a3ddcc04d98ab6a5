//! Database module for CarePortal
//!
//! Records live in memory only. Each table is a `DashMap` keyed by record id
//! so concurrent handlers lock per shard, never the whole store.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::{PortalError, PortalResult};
use crate::models::{
    Appointment, Diagnostic, Doctor, EmailMessage, Encounter, LabRequest, LoginLog, Medicine,
    Prescription, Specialization, User,
};

pub mod seed;

/// One keyed collection of records.
pub struct Table<T> {
    entity: &'static str,
    rows: DashMap<Uuid, T>,
}

impl<T: Clone> Table<T> {
    pub fn new(entity: &'static str) -> Self {
        Self {
            entity,
            rows: DashMap::new(),
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<T> {
        self.rows.get(id).map(|row| row.value().clone())
    }

    /// Like `get`, but a missing row is a `NotFound` error.
    pub fn fetch(&self, id: &Uuid) -> PortalResult<T> {
        self.get(id)
            .ok_or_else(|| PortalError::not_found(self.entity, id))
    }

    pub fn insert(&self, id: Uuid, row: T) {
        self.rows.insert(id, row);
    }

    /// Replace a row with the result of `f`, holding the row lock while `f` runs.
    pub fn update<F>(&self, id: &Uuid, f: F) -> PortalResult<T>
    where
        F: FnOnce(&T) -> PortalResult<T>,
    {
        let mut row = self
            .rows
            .get_mut(id)
            .ok_or_else(|| PortalError::not_found(self.entity, id))?;
        let next = f(row.value())?;
        *row.value_mut() = next.clone();
        Ok(next)
    }

    pub fn find<P>(&self, predicate: P) -> Option<T>
    where
        P: Fn(&T) -> bool,
    {
        self.rows
            .iter()
            .find(|row| predicate(row.value()))
            .map(|row| row.value().clone())
    }

    pub fn filter<P>(&self, predicate: P) -> Vec<T>
    where
        P: Fn(&T) -> bool,
    {
        self.rows
            .iter()
            .filter(|row| predicate(row.value()))
            .map(|row| row.value().clone())
            .collect()
    }

    pub fn count<P>(&self, predicate: P) -> usize
    where
        P: Fn(&T) -> bool,
    {
        self.rows.iter().filter(|row| predicate(row.value())).count()
    }

    pub fn all(&self) -> Vec<T> {
        self.filter(|_| true)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// All tables of the portal.
pub struct Database {
    pub users: Table<User>,
    pub doctors: Table<Doctor>,
    pub appointments: Table<Appointment>,
    pub encounters: Table<Encounter>,
    pub prescriptions: Table<Prescription>,
    pub lab_requests: Table<LabRequest>,
    pub medicines: Table<Medicine>,
    pub diagnostics: Table<Diagnostic>,
    pub specializations: Table<Specialization>,
    pub email_outbox: Table<EmailMessage>,
    pub login_logs: Table<LoginLog>,
    // lowercase email -> user id
    emails: DashMap<String, Uuid>,
    // appointment id -> encounter id
    appointment_encounters: DashMap<Uuid, Uuid>,
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}

impl Database {
    pub fn new() -> Self {
        Self {
            users: Table::new("user"),
            doctors: Table::new("doctor"),
            appointments: Table::new("appointment"),
            encounters: Table::new("encounter"),
            prescriptions: Table::new("prescription"),
            lab_requests: Table::new("lab request"),
            medicines: Table::new("medicine"),
            diagnostics: Table::new("diagnostic"),
            specializations: Table::new("specialization"),
            email_outbox: Table::new("email"),
            login_logs: Table::new("login log"),
            emails: DashMap::new(),
            appointment_encounters: DashMap::new(),
        }
    }

    /// Insert a user, failing if the email is already registered.
    pub fn insert_user(&self, user: User) -> PortalResult<User> {
        match self.emails.entry(user.email.to_lowercase()) {
            Entry::Occupied(_) => Err(PortalError::Conflict(format!(
                "email {} is already registered",
                user.email
            ))),
            Entry::Vacant(slot) => {
                slot.insert(user.id);
                self.users.insert(user.id, user.clone());
                Ok(user)
            }
        }
    }

    pub fn user_by_email(&self, email: &str) -> Option<User> {
        let id = *self.emails.get(&email.trim().to_lowercase())?;
        self.users.get(&id)
    }

    /// Claim the single encounter slot of an appointment.
    pub fn reserve_encounter(&self, appointment_id: Uuid, encounter_id: Uuid) -> PortalResult<()> {
        match self.appointment_encounters.entry(appointment_id) {
            Entry::Occupied(existing) => Err(PortalError::Conflict(format!(
                "appointment {} already has encounter {}",
                appointment_id,
                existing.get()
            ))),
            Entry::Vacant(slot) => {
                slot.insert(encounter_id);
                Ok(())
            }
        }
    }

    pub fn release_encounter(&self, appointment_id: &Uuid) {
        self.appointment_encounters.remove(appointment_id);
    }

    pub fn encounter_for_appointment(&self, appointment_id: &Uuid) -> Option<Encounter> {
        let id = *self.appointment_encounters.get(appointment_id)?;
        self.encounters.get(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, UserStatus};
    use chrono::Utc;
    use fake::faker::internet::en::SafeEmail;
    use fake::faker::name::en::Name;
    use fake::Fake;

    fn fake_user() -> User {
        User {
            id: Uuid::new_v4(),
            name: Name().fake(),
            email: SafeEmail().fake(),
            phone: None,
            role: Role::Patient,
            status: UserStatus::Active,
            department: None,
            specialty: None,
            license_number: None,
            password_hash: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn emails_are_unique_ignoring_case() {
        let db = Database::new();
        let user = fake_user();
        db.insert_user(user.clone()).unwrap();

        let twin = User {
            id: Uuid::new_v4(),
            email: user.email.to_uppercase(),
            ..fake_user()
        };
        assert!(matches!(db.insert_user(twin), Err(PortalError::Conflict(_))));
        assert_eq!(db.user_by_email(&user.email.to_uppercase()).map(|u| u.id), Some(user.id));
        assert_eq!(db.users.len(), 1);
    }

    #[test]
    fn update_keeps_row_when_closure_fails() {
        let db = Database::new();
        let user = db.insert_user(fake_user()).unwrap();
        let err = db
            .users
            .update(&user.id, |_| Err(PortalError::BadRequest("nope".into())))
            .unwrap_err();
        assert!(matches!(err, PortalError::BadRequest(_)));
        assert_eq!(db.users.get(&user.id), Some(user));
        assert!(matches!(
            db.users.update(&Uuid::new_v4(), |u| Ok(u.clone())),
            Err(PortalError::NotFound { .. })
        ));
    }

    #[test]
    fn encounter_slot_claimed_once() {
        let db = Database::new();
        let appointment = Uuid::new_v4();
        db.reserve_encounter(appointment, Uuid::new_v4()).unwrap();
        assert!(db.reserve_encounter(appointment, Uuid::new_v4()).is_err());
        db.release_encounter(&appointment);
        assert!(db.reserve_encounter(appointment, Uuid::new_v4()).is_ok());
    }
}
