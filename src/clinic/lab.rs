use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use super::requests::{CreateLabRequest, LabFilter, RecordResultsRequest};
use super::ClinicService;
use crate::auth::Actor;
use crate::core::access::require_role;
use crate::error::{PortalError, PortalResult};
use crate::models::{LabPriority, LabRequest, LabStatus, Role};

impl ClinicService {
    #[instrument(skip(self, actor, request), fields(patient_id = %request.patient_id, tests = request.tests.len()))]
    pub async fn create_lab_request(&self, actor: &Actor, request: CreateLabRequest) -> PortalResult<LabRequest> {
        require_role(actor.role, &[Role::Doctor])?;
        request.validate()?;
        let tests: Vec<String> = request.tests.iter().map(|t| t.trim().to_string()).collect();
        if tests.iter().any(String::is_empty) {
            return Err(PortalError::BadRequest("lab test names cannot be blank".into()));
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
        let lab_request = LabRequest {
            id: Uuid::new_v4(),
            encounter_id: request.encounter_id,
            patient_id: patient.id,
            doctor_id: actor.id,
            tests,
            priority: request.priority,
            status: LabStatus::Requested,
            results: Vec::new(),
            result_notes: None,
            processed_by: None,
            processed_at: None,
            created_at: now,
            updated_at: now,
        };
        self.simulate_save().await;
        self.db.lab_requests.insert(lab_request.id, lab_request.clone());
        self.record(Some(actor), "create", "lab request", lab_request.id, &lab_request);
        info!(lab_request_id = %lab_request.id, priority = ?lab_request.priority, "lab request created");
        Ok(lab_request)
    }

    #[instrument(skip(self, actor), fields(lab_request_id = %id))]
    pub async fn start_lab_processing(&self, actor: &Actor, id: Uuid) -> PortalResult<LabRequest> {
        require_role(actor.role, &[Role::Lab])?;
        self.simulate_save().await;
        let now = self.now();
        let started = self.db.lab_requests.update(&id, |req| {
            req.start_processing(actor.id, now).map_err(Self::rejected)
        })?;
        self.record(Some(actor), "start", "lab request", id, &started.status);
        info!("lab processing started");
        Ok(started)
    }

    /// Save result rows. With `finalize` the request completes and the
    /// patient and ordering doctor are told the results are ready.
    #[instrument(skip(self, actor, request), fields(lab_request_id = %id, finalize = request.finalize))]
    pub async fn record_lab_results(
        &self,
        actor: &Actor,
        id: Uuid,
        request: RecordResultsRequest,
    ) -> PortalResult<LabRequest> {
        require_role(actor.role, &[Role::Lab])?;
        request.validate()?;
        for result in &request.results {
            result.validate()?;
        }
        self.simulate_save().await;
        let now = self.now();
        let RecordResultsRequest { results, notes, finalize } = request;
        let updated = self.db.lab_requests.update(&id, |req| {
            req.record_results(results, notes, actor.id, now, finalize)
                .map_err(Self::rejected)
        })?;
        self.record(Some(actor), "record-results", "lab request", id, &updated.results);

        if updated.status == LabStatus::Completed {
            if updated.has_critical_result() {
                warn!("critical lab result recorded");
            }
            let tests = updated.tests.join(", ");
            self.email_user(
                &updated.patient_id,
                "Your lab results are ready",
                format!("Results for {} are now available in your portal.", tests),
            );
            self.email_user(
                &updated.doctor_id,
                "Lab results ready",
                format!(
                    "Results for {} are complete{}.",
                    tests,
                    if updated.has_critical_result() { " and include a critical value" } else { "" }
                ),
            );
            info!("lab request completed");
        }
        Ok(updated)
    }

    #[instrument(skip(self, actor), fields(lab_request_id = %id))]
    pub async fn cancel_lab_request(&self, actor: &Actor, id: Uuid) -> PortalResult<LabRequest> {
        let current = self.db.lab_requests.fetch(&id)?;
        if !(actor.is_admin() || (actor.is(Role::Doctor) && current.doctor_id == actor.id)) {
            return Err(PortalError::Forbidden(
                "only the ordering doctor or an admin can cancel".into(),
            ));
        }
        self.simulate_save().await;
        let now = self.now();
        let cancelled = self
            .db
            .lab_requests
            .update(&id, |req| req.cancel(now).map_err(Self::rejected))?;
        self.record(Some(actor), "cancel", "lab request", id, &cancelled.status);
        info!("lab request cancelled");
        Ok(cancelled)
    }

    // Patients only get results once the request is completed.
    fn lab_view(actor: &Actor, mut request: LabRequest) -> Option<LabRequest> {
        match actor.role {
            Role::Patient if request.patient_id != actor.id => None,
            Role::Patient => {
                if request.status != LabStatus::Completed {
                    request.results.clear();
                    request.result_notes = None;
                }
                Some(request)
            }
            Role::Doctor | Role::Lab | Role::Admin => Some(request),
            Role::Pharmacist => None,
        }
    }

    pub fn get_lab_request(&self, actor: &Actor, id: Uuid) -> PortalResult<LabRequest> {
        let request = self.db.lab_requests.fetch(&id)?;
        Self::lab_view(actor, request)
            .ok_or_else(|| PortalError::Forbidden("lab request is not visible to you".into()))
    }

    /// Work queue order: stat, urgent, routine, then oldest first.
    pub fn list_lab_requests(&self, actor: &Actor, filter: &LabFilter) -> PortalResult<Vec<LabRequest>> {
        if actor.is(Role::Pharmacist) {
            return Err(PortalError::Forbidden("lab requests are not available to this role".into()));
        }
        let mut items: Vec<LabRequest> = self
            .db
            .lab_requests
            .filter(|req| {
                filter.status.map_or(true, |s| req.status == s)
                    && filter.priority.map_or(true, |p| req.priority == p)
                    && filter.patient_id.map_or(true, |p| req.patient_id == p)
            })
            .into_iter()
            .filter_map(|req| Self::lab_view(actor, req))
            .collect();
        items.sort_by_key(|req| (priority_rank(req.priority), req.created_at));
        Ok(items)
    }
}

fn priority_rank(priority: LabPriority) -> u8 {
    match priority {
        LabPriority::Stat => 0,
        LabPriority::Urgent => 1,
        LabPriority::Routine => 2,
    }
}
