use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use super::requests::{CreateEncounterRequest, EncounterFilter};
use super::ClinicService;
use crate::auth::Actor;
use crate::core::access::require_role;
use crate::error::{PortalError, PortalResult, TransitionError};
use crate::models::{
    Encounter, LabRequest, LabStatus, Prescription, PrescriptionStatus, Role,
};

impl ClinicService {
    /// Record a consultation. An encounter tied to an appointment completes it,
    /// and each appointment gets at most one encounter.
    ///
    /// Prescription lines and lab tests given in the request are issued as a
    /// linked prescription and lab request.
    #[instrument(skip(self, actor, request), fields(appointment_id = ?request.appointment_id))]
    pub async fn create_encounter(
        &self,
        actor: &Actor,
        request: CreateEncounterRequest,
    ) -> PortalResult<Encounter> {
        require_role(actor.role, &[Role::Doctor])?;
        request.validate()?;
        request.vitals.validate()?;
        for item in &request.prescription_items {
            item.validate()?;
        }
        if request.lab_tests.iter().any(|t| t.trim().is_empty()) {
            return Err(PortalError::BadRequest("lab test names cannot be blank".into()));
        }

        let encounter_id = Uuid::new_v4();
        let patient_id = match request.appointment_id {
            Some(appointment_id) => {
                let appointment = self.db.appointments.fetch(&appointment_id)?;
                if appointment.doctor_id != actor.id {
                    return Err(PortalError::Forbidden(
                        "only the appointment's doctor can record its encounter".into(),
                    ));
                }
                if !appointment.can_open_encounter() {
                    return Err(Self::rejected(TransitionError::InvalidState {
                        entity: "appointment",
                        action: "record an encounter for",
                        status: appointment.status.to_string(),
                    }));
                }
                if request.patient_id.map_or(false, |p| p != appointment.patient_id) {
                    return Err(PortalError::BadRequest(
                        "patientId does not match the appointment".into(),
                    ));
                }
                self.db.reserve_encounter(appointment_id, encounter_id)?;
                appointment.patient_id
            }
            None => {
                let id = request.patient_id.ok_or_else(|| {
                    PortalError::BadRequest("patientId is required without an appointment".into())
                })?;
                self.active_user_with_role(&id, Role::Patient)?.id
            }
        };

        self.simulate_save().await;
        let now = self.now();

        if let Some(appointment_id) = request.appointment_id {
            let completed = self
                .db
                .appointments
                .update(&appointment_id, |appt| appt.complete(now).map_err(Self::rejected));
            if let Err(err) = completed {
                self.db.release_encounter(&appointment_id);
                return Err(err);
            }
            self.record(Some(actor), "complete", "appointment", appointment_id, &encounter_id);
        }

        let prescription = (!request.prescription_items.is_empty()).then(|| Prescription {
            id: Uuid::new_v4(),
            encounter_id: Some(encounter_id),
            patient_id,
            doctor_id: actor.id,
            items: request
                .prescription_items
                .iter()
                .cloned()
                .map(|mut item| {
                    item.dispensed = false;
                    item
                })
                .collect(),
            status: PrescriptionStatus::Created,
            notes: request.prescription_notes.clone(),
            dispensed_by: None,
            dispensed_at: None,
            created_at: now,
            updated_at: now,
        });
        let lab_request = (!request.lab_tests.is_empty()).then(|| LabRequest {
            id: Uuid::new_v4(),
            encounter_id: Some(encounter_id),
            patient_id,
            doctor_id: actor.id,
            tests: request.lab_tests.iter().map(|t| t.trim().to_string()).collect(),
            priority: request.lab_priority,
            status: LabStatus::Requested,
            results: Vec::new(),
            result_notes: None,
            processed_by: None,
            processed_at: None,
            created_at: now,
            updated_at: now,
        });

        let encounter = Encounter {
            id: encounter_id,
            appointment_id: request.appointment_id,
            patient_id,
            doctor_id: actor.id,
            vitals: request.vitals,
            chief_complaint: request.chief_complaint,
            notes: request.notes,
            diagnosis: request.diagnosis,
            treatment_plan: request.treatment_plan,
            follow_up: request.follow_up,
            prescription_id: prescription.as_ref().map(|p| p.id),
            lab_request_id: lab_request.as_ref().map(|l| l.id),
            created_at: now,
        };

        if let Some(prescription) = prescription {
            self.db.prescriptions.insert(prescription.id, prescription.clone());
            self.record(Some(actor), "create", "prescription", prescription.id, &prescription);
        }
        if let Some(lab_request) = lab_request {
            self.db.lab_requests.insert(lab_request.id, lab_request.clone());
            self.record(Some(actor), "create", "lab request", lab_request.id, &lab_request);
        }
        self.db.encounters.insert(encounter.id, encounter.clone());
        self.record(Some(actor), "create", "encounter", encounter.id, &encounter);

        info!(
            encounter_id = %encounter.id,
            prescription = encounter.prescription_id.is_some(),
            lab_request = encounter.lab_request_id.is_some(),
            "encounter recorded"
        );
        Ok(encounter)
    }

    fn can_see_clinical_record(actor: &Actor, patient_id: Uuid) -> bool {
        match actor.role {
            Role::Patient => patient_id == actor.id,
            Role::Doctor | Role::Admin => true,
            Role::Lab | Role::Pharmacist => false,
        }
    }

    pub fn get_encounter(&self, actor: &Actor, id: Uuid) -> PortalResult<Encounter> {
        let encounter = self.db.encounters.fetch(&id)?;
        if !Self::can_see_clinical_record(actor, encounter.patient_id) {
            return Err(PortalError::Forbidden("encounter is not visible to you".into()));
        }
        Ok(encounter)
    }

    pub fn encounter_for_appointment(&self, actor: &Actor, appointment_id: Uuid) -> PortalResult<Encounter> {
        let encounter = self
            .db
            .encounter_for_appointment(&appointment_id)
            .ok_or_else(|| PortalError::not_found("encounter", appointment_id))?;
        self.get_encounter(actor, encounter.id)
    }

    /// Newest first.
    pub fn list_encounters(&self, actor: &Actor, filter: &EncounterFilter) -> PortalResult<Vec<Encounter>> {
        require_role(actor.role, &[Role::Patient, Role::Doctor, Role::Admin])?;
        let mut items = self.db.encounters.filter(|e| {
            Self::can_see_clinical_record(actor, e.patient_id)
                && filter.patient_id.map_or(true, |p| e.patient_id == p)
                && filter.doctor_id.map_or(true, |d| e.doctor_id == d)
        });
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::super::requests::BookAppointmentRequest;
    use super::super::test_support::{fixture, monday_morning, Fixture};
    use super::*;
    use crate::models::prescription::tests::item;
    use crate::models::{Appointment, AppointmentStatus, AppointmentType, LabPriority, Vitals};
    use chrono::Duration;

    async fn booked(fx: &Fixture) -> Appointment {
        let request = BookAppointmentRequest {
            patient_id: None,
            doctor_id: fx.doctor.id,
            date_time: monday_morning() + Duration::hours(1),
            appointment_type: AppointmentType::Consultation,
            notes: None,
        };
        fx.service.book_appointment(&fx.patient, request).await.unwrap()
    }

    fn consultation(appointment_id: Option<Uuid>) -> CreateEncounterRequest {
        CreateEncounterRequest {
            appointment_id,
            patient_id: None,
            vitals: Vitals {
                blood_pressure: Some("130/85".into()),
                heart_rate: Some(88.0),
                temperature: Some(37.1),
                ..Vitals::default()
            },
            chief_complaint: "Palpitations".into(),
            notes: None,
            diagnosis: "Sinus tachycardia".into(),
            treatment_plan: Some("Beta blocker, review in two weeks".into()),
            follow_up: None,
            prescription_items: Vec::new(),
            prescription_notes: None,
            lab_tests: Vec::new(),
            lab_priority: LabPriority::Routine,
        }
    }

    #[tokio::test]
    async fn encounter_completes_appointment_and_spawns_orders() {
        let fx = fixture();
        let appt = booked(&fx).await;
        let mut request = consultation(Some(appt.id));
        request.prescription_items = vec![item("Propranolol"), item("Aspirin")];
        request.lab_tests = vec!["ECG".into(), " Thyroid panel ".into()];
        request.lab_priority = LabPriority::Urgent;

        let encounter = fx.service.create_encounter(&fx.doctor, request).await.unwrap();
        assert_eq!(encounter.patient_id, fx.patient.id);

        let appt = fx.service.get_appointment(&fx.doctor, appt.id).unwrap();
        assert_eq!(appt.status, AppointmentStatus::Completed);

        let rx = fx.service.db().prescriptions.fetch(&encounter.prescription_id.unwrap()).unwrap();
        assert_eq!(rx.status, PrescriptionStatus::Created);
        assert_eq!(rx.items.len(), 2);
        let lab = fx.service.db().lab_requests.fetch(&encounter.lab_request_id.unwrap()).unwrap();
        assert_eq!(lab.tests, vec!["ECG".to_string(), "Thyroid panel".to_string()]);
        assert_eq!(lab.priority, LabPriority::Urgent);

        let found = fx.service.encounter_for_appointment(&fx.patient, appt.id).unwrap();
        assert_eq!(found.id, encounter.id);
    }

    #[tokio::test]
    async fn second_encounter_for_same_appointment_rejected() {
        let fx = fixture();
        let appt = booked(&fx).await;
        fx.service.create_encounter(&fx.doctor, consultation(Some(appt.id))).await.unwrap();
        let err = fx
            .service
            .create_encounter(&fx.doctor, consultation(Some(appt.id)))
            .await
            .unwrap_err();
        // the appointment is completed by then, so the state check fires first
        assert!(matches!(err, PortalError::Transition(_)));
        assert_eq!(fx.service.db().encounters.len(), 1);
    }

    #[tokio::test]
    async fn cancelled_appointment_cannot_get_encounter() {
        let fx = fixture();
        let appt = booked(&fx).await;
        fx.service
            .cancel_appointment(
                &fx.patient,
                appt.id,
                super::super::requests::CancelAppointmentRequest { reason: "sick".into() },
            )
            .await
            .unwrap();
        let err = fx
            .service
            .create_encounter(&fx.doctor, consultation(Some(appt.id)))
            .await
            .unwrap_err();
        assert!(matches!(err, PortalError::Transition(TransitionError::InvalidState { .. })));
    }

    #[tokio::test]
    async fn walk_in_needs_patient_and_doctor_role() {
        let fx = fixture();
        let err = fx.service.create_encounter(&fx.doctor, consultation(None)).await.unwrap_err();
        assert!(matches!(err, PortalError::BadRequest(_)));

        let mut walk_in = consultation(None);
        walk_in.patient_id = Some(fx.patient.id);
        assert!(fx.service.create_encounter(&fx.lab, walk_in.clone()).await.is_err());
        let encounter = fx.service.create_encounter(&fx.doctor, walk_in).await.unwrap();
        assert!(encounter.appointment_id.is_none());
        assert!(encounter.prescription_id.is_none());
    }

    #[tokio::test]
    async fn implausible_vitals_rejected() {
        let fx = fixture();
        let mut request = consultation(None);
        request.patient_id = Some(fx.patient.id);
        request.vitals.oxygen_saturation = Some(140.0);
        let err = fx.service.create_encounter(&fx.doctor, request).await.unwrap_err();
        assert!(matches!(err, PortalError::Validation(_)));
    }

    #[tokio::test]
    async fn patients_only_see_their_own_encounters() {
        let fx = fixture();
        let mut request = consultation(None);
        request.patient_id = Some(fx.patient.id);
        let encounter = fx.service.create_encounter(&fx.doctor, request).await.unwrap();

        let filter = EncounterFilter::default();
        assert_eq!(fx.service.list_encounters(&fx.patient, &filter).unwrap().len(), 1);
        assert!(fx.service.list_encounters(&fx.pharmacist, &filter).is_err());
        let stranger = Actor { id: Uuid::new_v4(), role: Role::Patient, name: "x".into() };
        assert!(fx.service.get_encounter(&stranger, encounter.id).is_err());
    }
}
