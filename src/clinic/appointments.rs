use chrono::Duration;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use super::requests::{
    AppointmentFilter, BookAppointmentRequest, CancelAppointmentRequest, UpcomingQuery,
};
use super::ClinicService;
use crate::auth::Actor;
use crate::core::schedule;
use crate::error::{PortalError, PortalResult};
use crate::models::{Appointment, AppointmentStatus, DoctorStatus, Role};

const DEFAULT_REMINDER_HOURS: i64 = 24;

impl ClinicService {
    // ===== Booking =====

    /// Book the slot starting at `request.date_time` with a doctor.
    ///
    /// Patients book for themselves; an admin books on behalf of a patient.
    /// The slot check and the insert run under one lock so two callers can
    /// never take the same slot.
    #[instrument(skip(self, actor, request), fields(doctor_id = %request.doctor_id, at = %request.date_time))]
    pub async fn book_appointment(
        &self,
        actor: &Actor,
        request: BookAppointmentRequest,
    ) -> PortalResult<Appointment> {
        request.validate()?;
        let patient_id = match actor.role {
            Role::Patient => match request.patient_id {
                Some(id) if id != actor.id => {
                    return Err(PortalError::Forbidden(
                        "patients can only book for themselves".into(),
                    ))
                }
                _ => actor.id,
            },
            Role::Admin => request.patient_id.ok_or_else(|| {
                PortalError::BadRequest("patientId is required when booking for a patient".into())
            })?,
            _ => {
                return Err(PortalError::Forbidden(
                    "only patients and admins can book appointments".into(),
                ))
            }
        };

        let patient = self.active_user_with_role(&patient_id, Role::Patient)?;
        let doctor_user = self.active_user_with_role(&request.doctor_id, Role::Doctor)?;
        let doctor = self.db.doctors.fetch(&request.doctor_id)?;
        if doctor.status == DoctorStatus::Offline {
            return Err(PortalError::Conflict(format!(
                "{} is not taking appointments",
                doctor.name
            )));
        }

        let guard = self.booking_lock.lock().await;
        let now = self.now();
        let date = request.date_time.date_naive();
        let taken = self
            .db
            .appointments
            .filter(|a| a.doctor_id == doctor.id && a.date_time.date_naive() == date);
        let slots = schedule::generate_slots(&doctor, date, &taken, now);
        let slot = schedule::find_slot(&slots, request.date_time)
            .ok_or_else(|| {
                PortalError::BadRequest(format!(
                    "{} is not a slot in the doctor's schedule",
                    request.date_time
                ))
            })?
            .clone();
        if !slot.available {
            warn!("slot unavailable");
            return Err(PortalError::Conflict("that slot is no longer available".into()));
        }

        let clash = self.db.appointments.find(|a| {
            a.patient_id == patient.id
                && a.status == AppointmentStatus::Booked
                && a.overlaps(slot.start, slot.end)
        });
        if let Some(existing) = clash {
            return Err(PortalError::Conflict(format!(
                "patient already has an appointment at {}",
                existing.date_time
            )));
        }

        let appointment = Appointment {
            id: Uuid::new_v4(),
            patient_id: patient.id,
            patient_name: patient.name.clone(),
            doctor_id: doctor.id,
            doctor_name: doctor.name.clone(),
            department: doctor.department.clone(),
            date_time: slot.start,
            duration_minutes: slot.duration_minutes,
            appointment_type: request.appointment_type,
            status: AppointmentStatus::Booked,
            notes: request.notes,
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
        };
        self.simulate_save().await;
        self.db.appointments.insert(appointment.id, appointment.clone());
        drop(guard);

        self.record(Some(actor), "book", "appointment", appointment.id, &appointment);
        self.queue_email(
            &patient.email,
            "Appointment confirmed",
            format!(
                "Hello {}, your appointment with {} ({}) is booked for {}.",
                patient.name,
                doctor.name,
                doctor.department,
                appointment.date_time.format("%A %d %B %Y at %H:%M UTC")
            ),
        );
        info!(appointment_id = %appointment.id, doctor = %doctor_user.email, "appointment booked");
        Ok(appointment)
    }

    // ===== Transitions =====

    #[instrument(skip(self, actor, request), fields(appointment_id = %id))]
    pub async fn cancel_appointment(
        &self,
        actor: &Actor,
        id: Uuid,
        request: CancelAppointmentRequest,
    ) -> PortalResult<Appointment> {
        request.validate()?;
        let current = self.db.appointments.fetch(&id)?;
        let allowed = actor.is_admin()
            || (actor.is(Role::Patient) && current.patient_id == actor.id)
            || (actor.is(Role::Doctor) && current.doctor_id == actor.id);
        if !allowed {
            return Err(PortalError::Forbidden("not your appointment".into()));
        }

        self.simulate_save().await;
        let now = self.now();
        let cancelled = self.db.appointments.update(&id, |appt| {
            appt.cancel(&request.reason, now).map_err(Self::rejected)
        })?;

        self.record(Some(actor), "cancel", "appointment", id, &cancelled);
        let when = cancelled.date_time.format("%d %B %Y %H:%M UTC");
        let reason = cancelled.cancellation_reason.clone().unwrap_or_default();
        self.email_user(
            &cancelled.patient_id,
            "Appointment cancelled",
            format!(
                "Your appointment with {} on {} was cancelled by {}. Reason: {}",
                cancelled.doctor_name, when, actor.name, reason
            ),
        );
        self.email_user(
            &cancelled.doctor_id,
            "Appointment cancelled",
            format!(
                "The appointment with {} on {} was cancelled. Reason: {}",
                cancelled.patient_name, when, reason
            ),
        );
        info!(by = %actor.role, "appointment cancelled");
        Ok(cancelled)
    }

    #[instrument(skip(self, actor), fields(appointment_id = %id))]
    pub async fn complete_appointment(&self, actor: &Actor, id: Uuid) -> PortalResult<Appointment> {
        self.ensure_treating_doctor(actor, id)?;
        self.simulate_save().await;
        let now = self.now();
        let completed = self
            .db
            .appointments
            .update(&id, |appt| appt.complete(now).map_err(Self::rejected))?;
        self.record(Some(actor), "complete", "appointment", id, &completed.status);
        info!("appointment completed");
        Ok(completed)
    }

    #[instrument(skip(self, actor), fields(appointment_id = %id))]
    pub async fn mark_no_show(&self, actor: &Actor, id: Uuid) -> PortalResult<Appointment> {
        self.ensure_treating_doctor(actor, id)?;
        self.simulate_save().await;
        let now = self.now();
        let missed = self
            .db
            .appointments
            .update(&id, |appt| appt.mark_no_show(now).map_err(Self::rejected))?;
        self.record(Some(actor), "no-show", "appointment", id, &missed.status);
        info!("appointment marked no-show");
        Ok(missed)
    }

    fn ensure_treating_doctor(&self, actor: &Actor, id: Uuid) -> PortalResult<Appointment> {
        let appointment = self.db.appointments.fetch(&id)?;
        if actor.is_admin() || (actor.is(Role::Doctor) && appointment.doctor_id == actor.id) {
            Ok(appointment)
        } else {
            Err(PortalError::Forbidden(
                "only the appointment's doctor or an admin can do that".into(),
            ))
        }
    }

    // ===== Queries =====

    fn can_see_appointment(actor: &Actor, appointment: &Appointment) -> bool {
        match actor.role {
            Role::Admin => true,
            Role::Patient => appointment.patient_id == actor.id,
            Role::Doctor => appointment.doctor_id == actor.id,
            Role::Lab | Role::Pharmacist => false,
        }
    }

    pub fn get_appointment(&self, actor: &Actor, id: Uuid) -> PortalResult<Appointment> {
        let appointment = self.db.appointments.fetch(&id)?;
        if !Self::can_see_appointment(actor, &appointment) {
            return Err(PortalError::Forbidden("not your appointment".into()));
        }
        Ok(appointment)
    }

    /// Appointments visible to the caller, soonest first.
    pub fn list_appointments(
        &self,
        actor: &Actor,
        filter: &AppointmentFilter,
    ) -> PortalResult<Vec<Appointment>> {
        if matches!(actor.role, Role::Lab | Role::Pharmacist) {
            return Err(PortalError::Forbidden("appointments are not available to this role".into()));
        }
        let mut items = self.db.appointments.filter(|a| {
            Self::can_see_appointment(actor, a)
                && filter.status.map_or(true, |s| a.status == s)
                && filter.doctor_id.map_or(true, |d| a.doctor_id == d)
                && filter.patient_id.map_or(true, |p| a.patient_id == p)
                && filter.from.map_or(true, |from| a.date_time >= from)
                && filter.to.map_or(true, |to| a.date_time < to)
        });
        items.sort_by_key(|a| a.date_time);
        Ok(items)
    }

    /// The caller's booked appointments starting inside the reminder window.
    pub fn upcoming_appointments(
        &self,
        actor: &Actor,
        query: UpcomingQuery,
    ) -> PortalResult<Vec<Appointment>> {
        query.validate()?;
        if matches!(actor.role, Role::Lab | Role::Pharmacist) {
            return Err(PortalError::Forbidden("appointments are not available to this role".into()));
        }
        let now = self.now();
        let horizon = now + Duration::hours(query.hours.unwrap_or(DEFAULT_REMINDER_HOURS));
        let mut items = self.db.appointments.filter(|a| {
            Self::can_see_appointment(actor, a)
                && a.status == AppointmentStatus::Booked
                && a.date_time > now
                && a.date_time <= horizon
        });
        items.sort_by_key(|a| a.date_time);
        Ok(items)
    }
}
