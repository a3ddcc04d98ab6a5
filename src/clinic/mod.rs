//! Clinic service: every read and write the API performs goes through here.
//!
//! Mutations follow one shape: authorize the caller, run the pure transition
//! on the record, wait out the configured save latency, store the result, then
//! append an audit entry and queue any outgoing email.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::audit::AuditTrail;
use crate::auth::{Actor, Credentials, TokenIssuer};
use crate::config::Config;
use crate::core::clock::Clock;
use crate::core::dashboard::{self, Dashboard};
use crate::db::{seed, Database};
use crate::error::{PortalError, PortalResult, TransitionError};
use crate::models::{EmailMessage, EmailStatus, Role, User};

mod accounts;
mod appointments;
mod catalog;
mod encounters;
mod lab;
mod outbox;
mod pharmacy;
pub mod requests;

pub struct ClinicService {
    db: Arc<Database>,
    audit: AuditTrail,
    credentials: Credentials,
    tokens: TokenIssuer,
    clock: Arc<dyn Clock>,
    save_latency: std::time::Duration,
    email_sender: String,
    // serializes slot checks with the insert that takes the slot
    booking_lock: Mutex<()>,
    // same for catalog name and code uniqueness
    catalog_lock: Mutex<()>,
}

impl ClinicService {
    pub fn new(config: &Config, clock: Arc<dyn Clock>) -> PortalResult<Self> {
        let credentials = Credentials::new(
            config.auth.argon2_memory_kib,
            config.auth.argon2_iterations,
        )?;
        Ok(Self {
            db: Arc::new(Database::new()),
            audit: AuditTrail::new(),
            credentials,
            tokens: TokenIssuer::from_config(&config.auth),
            clock,
            save_latency: std::time::Duration::from_millis(config.portal.simulated_latency_ms),
            email_sender: config.portal.email_sender.clone(),
            booking_lock: Mutex::new(()),
            catalog_lock: Mutex::new(()),
        })
    }

    /// Build the service and load the demo clinic when configured to.
    pub fn bootstrap(config: &Config, clock: Arc<dyn Clock>) -> PortalResult<Self> {
        let service = Self::new(config, clock)?;
        if config.portal.seed_demo_data {
            let summary = seed::load_demo(&service.db, &service.credentials, service.now())?;
            info!(
                users = summary.users,
                appointments = summary.appointments,
                "demo data loaded"
            );
        }
        Ok(service)
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn audit(&self) -> &AuditTrail {
        &self.audit
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Resolve a verified token subject into an actor, refusing inactive accounts.
    pub fn actor_for(&self, user_id: Uuid) -> PortalResult<Actor> {
        let user = self
            .db
            .users
            .get(&user_id)
            .ok_or_else(|| PortalError::Unauthorized("account no longer exists".into()))?;
        if !user.is_active() {
            return Err(PortalError::Forbidden(format!("account is {}", user.status)));
        }
        Ok(Actor::from(&user))
    }

    pub fn dashboard(&self, actor: &Actor) -> Dashboard {
        dashboard::summarize(&self.db, actor, self.clock.as_ref())
    }

    async fn simulate_save(&self) {
        if !self.save_latency.is_zero() {
            debug!(latency_ms = self.save_latency.as_millis() as u64, "simulated save");
            tokio::time::sleep(self.save_latency).await;
        }
    }

    fn record<T: Serialize>(&self, actor: Option<&Actor>, action: &str, entity: &str, id: Uuid, data: &T) {
        let data = serde_json::to_string(data).unwrap_or_else(|e| format!("{{\"error\":\"{}\"}}", e));
        self.audit
            .record(self.now(), actor.map(|a| a.id), action, entity, id, data);
    }

    fn queue_email(&self, recipient: &str, subject: &str, body: String) {
        let now = self.now();
        let message = EmailMessage {
            id: Uuid::new_v4(),
            sender: self.email_sender.clone(),
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            body,
            status: EmailStatus::Queued,
            error: None,
            created_at: now,
            updated_at: now,
        };
        debug!(recipient, subject, "email queued");
        self.db.email_outbox.insert(message.id, message);
    }

    fn email_user(&self, user_id: &Uuid, subject: &str, body: String) {
        if let Some(user) = self.db.users.get(user_id) {
            self.queue_email(&user.email, subject, body);
        }
    }

    fn rejected(error: TransitionError) -> PortalError {
        warn!(%error, "transition rejected");
        PortalError::Transition(error)
    }

    fn active_user_with_role(&self, id: &Uuid, role: Role) -> PortalResult<User> {
        let user = self.db.users.fetch(id)?;
        if user.role != role {
            return Err(PortalError::BadRequest(format!("user {} is not a {}", id, role)));
        }
        if !user.is_active() {
            return Err(PortalError::BadRequest(format!("{} account {} is not active", role, id)));
        }
        Ok(user)
    }
}
