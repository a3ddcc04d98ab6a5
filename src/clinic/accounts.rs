use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use super::requests::{
    DoctorFilter, DoctorStatusRequest, RegisterRequest, ScheduleRequest, SlotQuery,
    UpdateDoctorRequest, UpdateUserRequest, UserFilter, UserStatusRequest,
};
use super::ClinicService;
use crate::auth::{Actor, SessionToken};
use crate::core::access::require_role;
use crate::core::schedule::{self, TimeSlot};
use crate::error::{PortalError, PortalResult};
use crate::models::{Doctor, DoctorStatus, LoginLog, Role, User, UserStatus};

/// Why a login attempt was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoginRefusal {
    InvalidCredentials,
    AwaitingApproval,
    Suspended,
}

impl LoginRefusal {
    fn as_str(self) -> &'static str {
        match self {
            LoginRefusal::InvalidCredentials => "invalid credentials",
            LoginRefusal::AwaitingApproval => "account awaiting approval",
            LoginRefusal::Suspended => "account suspended",
        }
    }

    /// Bad credentials are 401; a known account that may not sign in is 403.
    fn into_error(self) -> PortalError {
        match self {
            LoginRefusal::InvalidCredentials => PortalError::Unauthorized(self.as_str().into()),
            LoginRefusal::AwaitingApproval | LoginRefusal::Suspended => {
                PortalError::Forbidden(self.as_str().into())
            }
        }
    }
}

impl ClinicService {
    // ===== Registration and sessions =====

    /// Public sign-up. Patients are active at once; staff wait for approval.
    #[instrument(skip(self, request), fields(email = %request.email, role = %request.role))]
    pub async fn register(&self, request: RegisterRequest) -> PortalResult<User> {
        request.validate()?;
        if request.role == Role::Admin {
            return Err(PortalError::Forbidden("admin accounts cannot self-register".into()));
        }
        let status = if request.role.requires_approval() {
            UserStatus::Pending
        } else {
            UserStatus::Active
        };
        self.simulate_save().await;
        let user = self.create_account(request, status)?;
        self.record(None, "register", "user", user.id, &user);
        info!(user_id = %user.id, status = %user.status, "account registered");
        Ok(user)
    }

    /// Admin-created accounts skip the approval step.
    #[instrument(skip(self, actor, request), fields(email = %request.email, role = %request.role))]
    pub async fn create_user(&self, actor: &Actor, request: RegisterRequest) -> PortalResult<User> {
        require_role(actor.role, &[Role::Admin])?;
        request.validate()?;
        self.simulate_save().await;
        let user = self.create_account(request, UserStatus::Active)?;
        self.record(Some(actor), "create", "user", user.id, &user);
        info!(user_id = %user.id, "account created by admin");
        Ok(user)
    }

    fn create_account(&self, request: RegisterRequest, status: UserStatus) -> PortalResult<User> {
        if request.role == Role::Doctor && request.department.is_none() {
            return Err(PortalError::BadRequest("doctors need a department".into()));
        }
        let user = User {
            id: Uuid::new_v4(),
            name: request.name.trim().to_string(),
            email: request.email.trim().to_lowercase(),
            phone: request.phone,
            role: request.role,
            status,
            department: request.department,
            specialty: request.specialty,
            license_number: request.license_number,
            password_hash: self.credentials.hash(&request.password)?,
            created_at: self.now(),
        };
        let user = self.db.insert_user(user)?;

        if user.role == Role::Doctor {
            let department = user.department.clone().unwrap_or_default();
            let doctor = Doctor {
                id: user.id,
                name: user.name.clone(),
                email: user.email.clone(),
                specialization: user.specialty.clone().unwrap_or_else(|| department.clone()),
                department,
                qualification: request.qualification,
                experience_years: request.experience_years.unwrap_or(0),
                schedule: Vec::new(),
                consultation_fee: request.consultation_fee.unwrap_or(0.0),
                rating: 0.0,
                status: DoctorStatus::Offline,
            };
            self.db.doctors.insert(doctor.id, doctor);
        }
        Ok(user)
    }

    /// Check credentials and issue a bearer token. Every attempt is logged.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login(&self, email: &str, password: &str) -> PortalResult<(User, SessionToken)> {
        let user = self.db.user_by_email(email);
        let outcome = match &user {
            Some(user) if self.credentials.verify(password, &user.password_hash) => {
                match user.status {
                    UserStatus::Active => Ok(user.clone()),
                    UserStatus::Pending => Err(LoginRefusal::AwaitingApproval),
                    UserStatus::Suspended => Err(LoginRefusal::Suspended),
                }
            }
            _ => Err(LoginRefusal::InvalidCredentials),
        };

        let log = LoginLog {
            id: Uuid::new_v4(),
            email: email.trim().to_lowercase(),
            user_id: user.as_ref().map(|u| u.id),
            success: outcome.is_ok(),
            reason: outcome.as_ref().err().map(|refusal| refusal.as_str().to_string()),
            at: self.now(),
        };
        self.db.login_logs.insert(log.id, log);

        match outcome {
            Ok(user) => {
                let token = self.tokens.issue(&user, self.now())?;
                info!(user_id = %user.id, role = %user.role, "login succeeded");
                Ok((user, token))
            }
            Err(refusal) => {
                warn!(reason = refusal.as_str(), "login refused");
                Err(refusal.into_error())
            }
        }
    }

    pub fn me(&self, actor: &Actor) -> PortalResult<User> {
        self.db.users.fetch(&actor.id)
    }

    // ===== User administration =====

    pub fn list_users(&self, actor: &Actor, filter: &UserFilter) -> PortalResult<Vec<User>> {
        require_role(actor.role, &[Role::Admin])?;
        let needle = filter.q.as_deref().map(str::to_lowercase);
        let mut users = self.db.users.filter(|u| {
            filter.role.map_or(true, |r| u.role == r)
                && filter.status.map_or(true, |s| u.status == s)
                && needle.as_deref().map_or(true, |q| {
                    u.name.to_lowercase().contains(q) || u.email.contains(q)
                })
        });
        users.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(users)
    }

    pub fn get_user(&self, actor: &Actor, id: Uuid) -> PortalResult<User> {
        if !actor.is_admin() && actor.id != id {
            return Err(PortalError::Forbidden("users can only view their own account".into()));
        }
        self.db.users.fetch(&id)
    }

    #[instrument(skip(self, actor, request), fields(user_id = %id))]
    pub async fn update_user(&self, actor: &Actor, id: Uuid, request: UpdateUserRequest) -> PortalResult<User> {
        if !actor.is_admin() && actor.id != id {
            return Err(PortalError::Forbidden("users can only edit their own account".into()));
        }
        request.validate()?;
        self.simulate_save().await;
        let user = self.db.users.update(&id, |user| {
            let mut next = user.clone();
            if let Some(name) = &request.name {
                next.name = name.trim().to_string();
            }
            next.phone = request.phone.clone().or(next.phone);
            next.department = request.department.clone().or(next.department);
            next.specialty = request.specialty.clone().or(next.specialty);
            next.license_number = request.license_number.clone().or(next.license_number);
            Ok(next)
        })?;
        if user.role == Role::Doctor {
            // keep the doctor card's display name in step
            let synced = self.db.doctors.update(&id, |doctor| {
                Ok(Doctor {
                    name: user.name.clone(),
                    ..doctor.clone()
                })
            });
            if let Err(error) = synced {
                warn!(user_id = %id, %error, "doctor card name not updated");
            }
        }
        self.record(Some(actor), "update", "user", id, &user);
        Ok(user)
    }

    /// Approve, suspend or reinstate an account.
    #[instrument(skip(self, actor), fields(user_id = %id, status = %request.status))]
    pub async fn set_user_status(&self, actor: &Actor, id: Uuid, request: UserStatusRequest) -> PortalResult<User> {
        require_role(actor.role, &[Role::Admin])?;
        if actor.id == id {
            return Err(PortalError::BadRequest("admins cannot change their own status".into()));
        }
        self.simulate_save().await;
        let mut previous = UserStatus::Pending;
        let user = self.db.users.update(&id, |user| {
            previous = user.status;
            Ok(User {
                status: request.status,
                ..user.clone()
            })
        })?;
        self.record(Some(actor), "set-status", "user", id, &request.status);

        if previous == UserStatus::Pending && user.status == UserStatus::Active {
            self.queue_email(
                &user.email,
                "Your CarePortal account is approved",
                format!("Hello {}, your {} account is now active. You can sign in.", user.name, user.role),
            );
        }
        info!(from = %previous, to = %user.status, "user status changed");
        Ok(user)
    }

    pub fn login_logs(&self, actor: &Actor) -> PortalResult<Vec<LoginLog>> {
        require_role(actor.role, &[Role::Admin])?;
        let mut logs = self.db.login_logs.all();
        logs.sort_by(|a, b| b.at.cmp(&a.at));
        Ok(logs)
    }

    // ===== Doctors =====

    pub fn list_doctors(&self, filter: &DoctorFilter) -> Vec<Doctor> {
        let matches = |value: &str, wanted: &Option<String>| {
            wanted.as_deref().map_or(true, |w| value.eq_ignore_ascii_case(w))
        };
        let mut doctors = self.db.doctors.filter(|d| {
            matches(&d.specialization, &filter.specialization)
                && matches(&d.department, &filter.department)
                && filter.status.map_or(true, |s| d.status == s)
                && self.db.users.get(&d.id).map_or(false, |u| u.is_active())
        });
        doctors.sort_by(|a, b| a.name.cmp(&b.name));
        doctors
    }

    pub fn get_doctor(&self, id: Uuid) -> PortalResult<Doctor> {
        self.db.doctors.fetch(&id)
    }

    fn ensure_doctor_or_admin(&self, actor: &Actor, doctor_id: Uuid) -> PortalResult<()> {
        if actor.is_admin() || (actor.is(Role::Doctor) && actor.id == doctor_id) {
            Ok(())
        } else {
            Err(PortalError::Forbidden("only the doctor or an admin may change this profile".into()))
        }
    }

    #[instrument(skip(self, actor, request), fields(doctor_id = %id))]
    pub async fn update_doctor(&self, actor: &Actor, id: Uuid, request: UpdateDoctorRequest) -> PortalResult<Doctor> {
        self.ensure_doctor_or_admin(actor, id)?;
        request.validate()?;
        self.simulate_save().await;
        let doctor = self.db.doctors.update(&id, |doctor| {
            let mut next = doctor.clone();
            if let Some(department) = &request.department {
                next.department = department.clone();
            }
            if let Some(specialization) = &request.specialization {
                next.specialization = specialization.clone();
            }
            next.qualification = request.qualification.clone().or(next.qualification);
            next.experience_years = request.experience_years.unwrap_or(next.experience_years);
            next.consultation_fee = request.consultation_fee.unwrap_or(next.consultation_fee);
            Ok(next)
        })?;
        self.record(Some(actor), "update", "doctor", id, &doctor);
        Ok(doctor)
    }

    #[instrument(skip(self, actor, request), fields(doctor_id = %id, entries = request.schedule.len()))]
    pub async fn update_schedule(&self, actor: &Actor, id: Uuid, request: ScheduleRequest) -> PortalResult<Doctor> {
        self.ensure_doctor_or_admin(actor, id)?;
        schedule::validate_schedule(&request.schedule).map_err(PortalError::BadRequest)?;
        self.simulate_save().await;
        let doctor = self.db.doctors.update(&id, |doctor| {
            Ok(Doctor {
                schedule: request.schedule.clone(),
                ..doctor.clone()
            })
        })?;
        self.record(Some(actor), "update-schedule", "doctor", id, &doctor.schedule);
        info!("schedule updated");
        Ok(doctor)
    }

    #[instrument(skip(self, actor), fields(doctor_id = %id))]
    pub async fn set_doctor_status(&self, actor: &Actor, id: Uuid, request: DoctorStatusRequest) -> PortalResult<Doctor> {
        self.ensure_doctor_or_admin(actor, id)?;
        self.simulate_save().await;
        let doctor = self.db.doctors.update(&id, |doctor| {
            Ok(Doctor {
                status: request.status,
                ..doctor.clone()
            })
        })?;
        self.record(Some(actor), "set-status", "doctor", id, &request.status);
        Ok(doctor)
    }

    /// Bookable slots of a doctor on one day.
    pub fn doctor_slots(&self, doctor_id: Uuid, query: SlotQuery) -> PortalResult<Vec<TimeSlot>> {
        let doctor = self.db.doctors.fetch(&doctor_id)?;
        let appointments = self
            .db
            .appointments
            .filter(|a| a.doctor_id == doctor_id && a.date_time.date_naive() == query.date);
        Ok(schedule::generate_slots(&doctor, query.date, &appointments, self.now()))
    }
}
