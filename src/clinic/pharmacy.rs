use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use super::requests::{CreatePrescriptionRequest, DispenseRequest, PrescriptionFilter};
use super::ClinicService;
use crate::auth::Actor;
use crate::core::access::require_role;
use crate::error::{PortalError, PortalResult};
use crate::models::{Prescription, PrescriptionStatus, Role};

impl ClinicService {
    #[instrument(skip(self, actor, request), fields(patient_id = %request.patient_id))]
    pub async fn create_prescription(
        &self,
        actor: &Actor,
        request: CreatePrescriptionRequest,
    ) -> PortalResult<Prescription> {
        require_role(actor.role, &[Role::Doctor])?;
        request.validate()?;
        for item in &request.items {
            item.validate()?;
        }
        let patient = self.active_user_with_role(&request.patient_id, Role::Patient)?;
        if let Some(encounter_id) = request.encounter_id {
            let encounter = self.db.encounters.fetch(&encounter_id)?;
            if encounter.patient_id != patient.id {
                return Err(PortalError::BadRequest(
                    "encounter belongs to a different patient".into(),
                ));
            }
        }

        let now = self.now();
        let prescription = Prescription {
            id: Uuid::new_v4(),
            encounter_id: request.encounter_id,
            patient_id: patient.id,
            doctor_id: actor.id,
            items: request
                .items
                .into_iter()
                .map(|mut item| {
                    item.dispensed = false;
                    item
                })
                .collect(),
            status: PrescriptionStatus::Created,
            notes: request.notes,
            dispensed_by: None,
            dispensed_at: None,
            created_at: now,
            updated_at: now,
        };
        self.simulate_save().await;
        self.db.prescriptions.insert(prescription.id, prescription.clone());
        self.record(Some(actor), "create", "prescription", prescription.id, &prescription);
        info!(prescription_id = %prescription.id, items = prescription.items.len(), "prescription issued");
        Ok(prescription)
    }

    /// Apply a pharmacist's batch of item toggles. The status is recomputed
    /// from the items in the same write.
    #[instrument(skip(self, actor, request), fields(prescription_id = %id, updates = request.updates.len()))]
    pub async fn dispense(
        &self,
        actor: &Actor,
        id: Uuid,
        request: DispenseRequest,
    ) -> PortalResult<Prescription> {
        require_role(actor.role, &[Role::Pharmacist])?;
        request.validate()?;
        self.simulate_save().await;
        let now = self.now();
        let updated = self.db.prescriptions.update(&id, |rx| {
            rx.apply_dispense(&request.updates, actor.id, now)
                .map_err(Self::rejected)
        })?;
        self.record(Some(actor), "dispense", "prescription", id, &request.updates);

        if updated.status == PrescriptionStatus::Dispensed {
            self.email_user(
                &updated.patient_id,
                "Your prescription is ready",
                format!(
                    "All {} item(s) on your prescription have been dispensed.",
                    updated.items.len()
                ),
            );
        }
        info!(status = %updated.status, dispensed = updated.dispensed_count(), "dispense recorded");
        Ok(updated)
    }

    #[instrument(skip(self, actor), fields(prescription_id = %id))]
    pub async fn cancel_prescription(&self, actor: &Actor, id: Uuid) -> PortalResult<Prescription> {
        let current = self.db.prescriptions.fetch(&id)?;
        if !(actor.is_admin() || (actor.is(Role::Doctor) && current.doctor_id == actor.id)) {
            return Err(PortalError::Forbidden(
                "only the prescribing doctor or an admin can cancel".into(),
            ));
        }
        self.simulate_save().await;
        let now = self.now();
        let cancelled = self
            .db
            .prescriptions
            .update(&id, |rx| rx.cancel(now).map_err(Self::rejected))?;
        self.record(Some(actor), "cancel", "prescription", id, &cancelled.status);
        info!("prescription cancelled");
        Ok(cancelled)
    }

    fn can_see_prescription(actor: &Actor, prescription: &Prescription) -> bool {
        match actor.role {
            Role::Patient => prescription.patient_id == actor.id,
            Role::Doctor | Role::Pharmacist | Role::Admin => true,
            Role::Lab => false,
        }
    }

    pub fn get_prescription(&self, actor: &Actor, id: Uuid) -> PortalResult<Prescription> {
        let prescription = self.db.prescriptions.fetch(&id)?;
        if !Self::can_see_prescription(actor, &prescription) {
            return Err(PortalError::Forbidden("prescription is not visible to you".into()));
        }
        Ok(prescription)
    }

    /// Oldest first, so the pharmacy queue reads top-down.
    pub fn list_prescriptions(
        &self,
        actor: &Actor,
        filter: &PrescriptionFilter,
    ) -> PortalResult<Vec<Prescription>> {
        if actor.is(Role::Lab) {
            return Err(PortalError::Forbidden("prescriptions are not available to this role".into()));
        }
        let mut items = self.db.prescriptions.filter(|rx| {
            Self::can_see_prescription(actor, rx)
                && filter.status.map_or(true, |s| rx.status == s)
                && filter.patient_id.map_or(true, |p| rx.patient_id == p)
                && filter.doctor_id.map_or(true, |d| rx.doctor_id == d)
        });
        items.sort_by_key(|rx| rx.created_at);
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{fixture, Fixture};
    use super::*;
    use crate::error::TransitionError;
    use crate::models::prescription::tests::item;
    use crate::models::DispenseUpdate;
    use chrono::Duration;

    async fn issued(fx: &Fixture, lines: usize) -> Prescription {
        let request = CreatePrescriptionRequest {
            patient_id: fx.patient.id,
            encounter_id: None,
            items: (0..lines).map(|i| item(&format!("Medicine {}", i))).collect(),
            notes: None,
        };
        fx.service.create_prescription(&fx.doctor, request).await.unwrap()
    }

    fn toggles(pairs: &[(usize, bool)]) -> DispenseRequest {
        DispenseRequest {
            updates: pairs
                .iter()
                .map(|&(item_index, dispensed)| DispenseUpdate { item_index, dispensed })
                .collect(),
        }
    }

    #[tokio::test]
    async fn partial_then_full_dispense() {
        let fx = fixture();
        let rx = issued(&fx, 3).await;

        let partial = fx.service.dispense(&fx.pharmacist, rx.id, toggles(&[(0, true)])).await.unwrap();
        assert_eq!(partial.status, PrescriptionStatus::PartiallyDispensed);
        assert!(partial.is_consistent());

        fx.clock.advance(Duration::minutes(5));
        let done = fx
            .service
            .dispense(&fx.pharmacist, rx.id, toggles(&[(1, true), (2, true)]))
            .await
            .unwrap();
        assert_eq!(done.status, PrescriptionStatus::Dispensed);
        assert_eq!(done.dispensed_by, Some(fx.pharmacist.id));
        assert_eq!(done.dispensed_at, Some(fx.service.now()));
        assert_eq!(fx.service.db().email_outbox.len(), 1);

        let err = fx.service.dispense(&fx.pharmacist, rx.id, toggles(&[(0, false)])).await.unwrap_err();
        assert!(matches!(err, PortalError::Transition(TransitionError::Terminal { .. })));
    }

    #[tokio::test]
    async fn untoggling_returns_to_pending() {
        let fx = fixture();
        let rx = issued(&fx, 2).await;
        fx.service.dispense(&fx.pharmacist, rx.id, toggles(&[(0, true)])).await.unwrap();
        let back = fx.service.dispense(&fx.pharmacist, rx.id, toggles(&[(0, false)])).await.unwrap();
        assert_eq!(back.status, PrescriptionStatus::Pending);
    }

    #[tokio::test]
    async fn bad_index_leaves_record_unchanged() {
        let fx = fixture();
        let rx = issued(&fx, 1).await;
        let err = fx
            .service
            .dispense(&fx.pharmacist, rx.id, toggles(&[(0, true), (7, true)]))
            .await
            .unwrap_err();
        assert!(matches!(err, PortalError::Transition(TransitionError::UnknownItem(7))));
        assert_eq!(fx.service.get_prescription(&fx.admin, rx.id).unwrap(), rx);
    }

    #[tokio::test]
    async fn only_pharmacists_dispense() {
        let fx = fixture();
        let rx = issued(&fx, 1).await;
        let err = fx.service.dispense(&fx.doctor, rx.id, toggles(&[(0, true)])).await.unwrap_err();
        assert!(matches!(err, PortalError::Forbidden(_)));
    }

    #[tokio::test]
    async fn cancel_only_before_dispensing() {
        let fx = fixture();
        let open = issued(&fx, 1).await;
        let cancelled = fx.service.cancel_prescription(&fx.doctor, open.id).await.unwrap();
        assert_eq!(cancelled.status, PrescriptionStatus::Cancelled);

        let started = issued(&fx, 2).await;
        fx.service.dispense(&fx.pharmacist, started.id, toggles(&[(1, true)])).await.unwrap();
        assert!(fx.service.cancel_prescription(&fx.admin, started.id).await.is_err());
        assert!(fx.service.cancel_prescription(&fx.pharmacist, started.id).await.is_err());
    }

    #[tokio::test]
    async fn empty_prescription_rejected() {
        let fx = fixture();
        let request = CreatePrescriptionRequest {
            patient_id: fx.patient.id,
            encounter_id: None,
            items: Vec::new(),
            notes: None,
        };
        let err = fx.service.create_prescription(&fx.doctor, request).await.unwrap_err();
        assert!(matches!(err, PortalError::Validation(_)));
    }

    #[tokio::test]
    async fn visibility_by_role() {
        let fx = fixture();
        issued(&fx, 1).await;
        let all = PrescriptionFilter::default();
        assert_eq!(fx.service.list_prescriptions(&fx.patient, &all).unwrap().len(), 1);
        assert_eq!(fx.service.list_prescriptions(&fx.pharmacist, &all).unwrap().len(), 1);
        assert!(fx.service.list_prescriptions(&fx.lab, &all).is_err());
    }
}
