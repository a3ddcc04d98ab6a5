use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::requests::{EmailFilter, EmailStatusRequest};
use super::ClinicService;
use crate::audit::AuditEntry;
use crate::auth::Actor;
use crate::core::access::require_role;
use crate::error::{PortalError, PortalResult};
use crate::models::{EmailMessage, EmailStatus, Role};

impl ClinicService {
    /// Newest first.
    pub fn list_outbox(&self, actor: &Actor, filter: EmailFilter) -> PortalResult<Vec<EmailMessage>> {
        require_role(actor.role, &[Role::Admin])?;
        let mut items = self
            .db
            .email_outbox
            .filter(|m| filter.status.map_or(true, |s| m.status == s));
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    pub fn get_email(&self, actor: &Actor, id: Uuid) -> PortalResult<EmailMessage> {
        require_role(actor.role, &[Role::Admin])?;
        self.db.email_outbox.fetch(&id)
    }

    /// Mark a queued message sent or failed. A failed message may be
    /// re-queued; a sent one is final.
    #[instrument(skip(self, actor, request), fields(email_id = %id, status = ?request.status))]
    pub async fn set_email_status(
        &self,
        actor: &Actor,
        id: Uuid,
        request: EmailStatusRequest,
    ) -> PortalResult<EmailMessage> {
        require_role(actor.role, &[Role::Admin])?;
        if request.status == EmailStatus::Failed && request.error.as_deref().map_or(true, |e| e.trim().is_empty()) {
            return Err(PortalError::BadRequest("a failed email needs an error message".into()));
        }
        self.simulate_save().await;
        let now = self.now();
        let message = self.db.email_outbox.update(&id, |message| {
            if message.status == EmailStatus::Sent {
                return Err(PortalError::Conflict("email was already sent".into()));
            }
            Ok(EmailMessage {
                status: request.status,
                error: match request.status {
                    EmailStatus::Failed => request.error.clone(),
                    _ => None,
                },
                updated_at: now,
                ..message.clone()
            })
        })?;
        if message.status == EmailStatus::Failed {
            warn!(recipient = %message.recipient, "email delivery failed");
        }
        self.record(Some(actor), "set-status", "email", id, &request.status);
        info!("email status updated");
        Ok(message)
    }

    pub fn audit_entries(&self, actor: &Actor, entity_id: Option<Uuid>) -> PortalResult<Vec<AuditEntry>> {
        require_role(actor.role, &[Role::Admin])?;
        Ok(match entity_id {
            Some(id) => self.audit.for_entity(id),
            None => self.audit.entries(),
        })
    }

    pub fn verify_audit(&self, actor: &Actor) -> PortalResult<bool> {
        require_role(actor.role, &[Role::Admin])?;
        let intact = self.audit.verify();
        if !intact {
            warn!("audit chain verification failed");
        }
        Ok(intact)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::fixture;
    use super::*;

    fn queued(fx: &super::super::test_support::Fixture) -> Uuid {
        fx.service.queue_email("someone@test.local", "Hello", "Body".into());
        fx.service.db().email_outbox.all()[0].id
    }

    #[tokio::test]
    async fn sent_is_final_and_failed_needs_reason() {
        let fx = fixture();
        let id = queued(&fx);

        let missing = EmailStatusRequest { status: EmailStatus::Failed, error: None };
        assert!(fx.service.set_email_status(&fx.admin, id, missing).await.is_err());

        let failed = EmailStatusRequest { status: EmailStatus::Failed, error: Some("mailbox full".into()) };
        let message = fx.service.set_email_status(&fx.admin, id, failed).await.unwrap();
        assert_eq!(message.error.as_deref(), Some("mailbox full"));

        let sent = EmailStatusRequest { status: EmailStatus::Sent, error: None };
        let message = fx.service.set_email_status(&fx.admin, id, sent.clone()).await.unwrap();
        assert_eq!(message.status, EmailStatus::Sent);
        assert!(message.error.is_none());
        let err = fx.service.set_email_status(&fx.admin, id, sent).await.unwrap_err();
        assert!(matches!(err, PortalError::Conflict(_)));
    }

    #[tokio::test]
    async fn outbox_and_audit_are_admin_only() {
        let fx = fixture();
        let id = queued(&fx);
        assert!(fx.service.list_outbox(&fx.patient, EmailFilter::default()).is_err());
        let queued_only = EmailFilter { status: Some(EmailStatus::Queued) };
        assert_eq!(fx.service.list_outbox(&fx.admin, queued_only).unwrap().len(), 1);

        fx.service
            .set_email_status(&fx.admin, id, EmailStatusRequest { status: EmailStatus::Sent, error: None })
            .await
            .unwrap();
        assert_eq!(fx.service.audit_entries(&fx.admin, Some(id)).unwrap().len(), 1);
        assert!(fx.service.audit_entries(&fx.doctor, None).is_err());
        assert!(fx.service.verify_audit(&fx.admin).unwrap());
    }
}
