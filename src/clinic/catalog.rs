use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use super::ClinicService;
use crate::auth::Actor;
use crate::core::access::{require_role, role_info};
use crate::error::{PortalError, PortalResult};
use crate::models::catalog::{DiagnosticInput, MedicineInput, SpecializationInput};
use crate::models::{Diagnostic, Medicine, Role, RoleInfo, Specialization};

const MEDICINE_EDITORS: &[Role] = &[Role::Admin, Role::Pharmacist];
const DIAGNOSTIC_EDITORS: &[Role] = &[Role::Admin, Role::Lab];

impl ClinicService {
    pub fn roles(&self) -> Vec<RoleInfo> {
        Role::ALL.into_iter().map(role_info).collect()
    }

    // ===== Medicines =====

    pub fn list_medicines(&self, active_only: bool) -> Vec<Medicine> {
        let mut items = self.db.medicines.filter(|m| !active_only || m.active);
        items.sort_by(|a, b| a.name.cmp(&b.name));
        items
    }

    pub fn get_medicine(&self, id: Uuid) -> PortalResult<Medicine> {
        self.db.medicines.fetch(&id)
    }

    #[instrument(skip(self, actor, input), fields(name = %input.name))]
    pub async fn create_medicine(&self, actor: &Actor, input: MedicineInput) -> PortalResult<Medicine> {
        require_role(actor.role, MEDICINE_EDITORS)?;
        input.validate()?;
        let guard = self.catalog_lock.lock().await;
        self.ensure_unique_medicine(&input.name, None)?;
        let medicine = Medicine {
            id: Uuid::new_v4(),
            name: input.name.trim().to_string(),
            generic_name: input.generic_name,
            form: input.form,
            strength: input.strength,
            stock: input.stock,
            active: input.active,
            created_at: self.now(),
        };
        self.simulate_save().await;
        self.db.medicines.insert(medicine.id, medicine.clone());
        drop(guard);
        self.record(Some(actor), "create", "medicine", medicine.id, &medicine);
        info!(medicine_id = %medicine.id, "medicine added");
        Ok(medicine)
    }

    #[instrument(skip(self, actor, input), fields(medicine_id = %id))]
    pub async fn update_medicine(&self, actor: &Actor, id: Uuid, input: MedicineInput) -> PortalResult<Medicine> {
        require_role(actor.role, MEDICINE_EDITORS)?;
        input.validate()?;
        let guard = self.catalog_lock.lock().await;
        self.ensure_unique_medicine(&input.name, Some(id))?;
        self.simulate_save().await;
        let medicine = self.db.medicines.update(&id, |current| {
            Ok(Medicine {
                name: input.name.trim().to_string(),
                generic_name: input.generic_name.clone(),
                form: input.form.clone(),
                strength: input.strength.clone(),
                stock: input.stock,
                active: input.active,
                ..current.clone()
            })
        })?;
        drop(guard);
        self.record(Some(actor), "update", "medicine", id, &medicine);
        Ok(medicine)
    }

    fn ensure_unique_medicine(&self, name: &str, except: Option<Uuid>) -> PortalResult<()> {
        let name = name.trim();
        match self
            .db
            .medicines
            .find(|m| m.name.eq_ignore_ascii_case(name) && Some(m.id) != except)
        {
            Some(_) => Err(PortalError::Conflict(format!("medicine '{}' already exists", name))),
            None => Ok(()),
        }
    }

    // ===== Diagnostics =====

    pub fn list_diagnostics(&self, active_only: bool) -> Vec<Diagnostic> {
        let mut items = self.db.diagnostics.filter(|d| !active_only || d.active);
        items.sort_by(|a, b| a.code.cmp(&b.code));
        items
    }

    pub fn get_diagnostic(&self, id: Uuid) -> PortalResult<Diagnostic> {
        self.db.diagnostics.fetch(&id)
    }

    #[instrument(skip(self, actor, input), fields(code = %input.code))]
    pub async fn create_diagnostic(&self, actor: &Actor, input: DiagnosticInput) -> PortalResult<Diagnostic> {
        require_role(actor.role, DIAGNOSTIC_EDITORS)?;
        input.validate()?;
        let code = input.code.trim().to_uppercase();
        let guard = self.catalog_lock.lock().await;
        self.ensure_unique_code(&code, None)?;
        let diagnostic = Diagnostic {
            id: Uuid::new_v4(),
            name: input.name.trim().to_string(),
            code,
            sample_type: input.sample_type,
            unit: input.unit,
            reference_range: input.reference_range,
            price: input.price,
            active: input.active,
            created_at: self.now(),
        };
        self.simulate_save().await;
        self.db.diagnostics.insert(diagnostic.id, diagnostic.clone());
        drop(guard);
        self.record(Some(actor), "create", "diagnostic", diagnostic.id, &diagnostic);
        info!(diagnostic_id = %diagnostic.id, "diagnostic added");
        Ok(diagnostic)
    }

    #[instrument(skip(self, actor, input), fields(diagnostic_id = %id))]
    pub async fn update_diagnostic(&self, actor: &Actor, id: Uuid, input: DiagnosticInput) -> PortalResult<Diagnostic> {
        require_role(actor.role, DIAGNOSTIC_EDITORS)?;
        input.validate()?;
        let code = input.code.trim().to_uppercase();
        let guard = self.catalog_lock.lock().await;
        self.ensure_unique_code(&code, Some(id))?;
        self.simulate_save().await;
        let diagnostic = self.db.diagnostics.update(&id, |current| {
            Ok(Diagnostic {
                name: input.name.trim().to_string(),
                code: code.clone(),
                sample_type: input.sample_type.clone(),
                unit: input.unit.clone(),
                reference_range: input.reference_range.clone(),
                price: input.price,
                active: input.active,
                ..current.clone()
            })
        })?;
        drop(guard);
        self.record(Some(actor), "update", "diagnostic", id, &diagnostic);
        Ok(diagnostic)
    }

    fn ensure_unique_code(&self, code: &str, except: Option<Uuid>) -> PortalResult<()> {
        match self.db.diagnostics.find(|d| d.code == code && Some(d.id) != except) {
            Some(existing) => Err(PortalError::Conflict(format!(
                "code {} is already used by {}",
                code, existing.name
            ))),
            None => Ok(()),
        }
    }

    // ===== Specializations =====

    pub fn list_specializations(&self) -> Vec<Specialization> {
        let mut items = self.db.specializations.all();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        items
    }

    pub fn get_specialization(&self, id: Uuid) -> PortalResult<Specialization> {
        self.db.specializations.fetch(&id)
    }

    #[instrument(skip(self, actor, input), fields(name = %input.name))]
    pub async fn create_specialization(
        &self,
        actor: &Actor,
        input: SpecializationInput,
    ) -> PortalResult<Specialization> {
        require_role(actor.role, &[Role::Admin])?;
        input.validate()?;
        let name = input.name.trim().to_string();
        let guard = self.catalog_lock.lock().await;
        self.ensure_unique_specialization(&name, None)?;
        let specialization = Specialization {
            id: Uuid::new_v4(),
            name,
            description: input.description,
            created_at: self.now(),
        };
        self.simulate_save().await;
        self.db.specializations.insert(specialization.id, specialization.clone());
        drop(guard);
        self.record(Some(actor), "create", "specialization", specialization.id, &specialization);
        Ok(specialization)
    }

    #[instrument(skip(self, actor, input), fields(specialization_id = %id))]
    pub async fn update_specialization(
        &self,
        actor: &Actor,
        id: Uuid,
        input: SpecializationInput,
    ) -> PortalResult<Specialization> {
        require_role(actor.role, &[Role::Admin])?;
        input.validate()?;
        let name = input.name.trim().to_string();
        let guard = self.catalog_lock.lock().await;
        self.ensure_unique_specialization(&name, Some(id))?;
        self.simulate_save().await;
        let specialization = self.db.specializations.update(&id, |current| {
            Ok(Specialization {
                name: name.clone(),
                description: input.description.clone(),
                ..current.clone()
            })
        })?;
        drop(guard);
        self.record(Some(actor), "update", "specialization", id, &specialization);
        Ok(specialization)
    }

    fn ensure_unique_specialization(&self, name: &str, except: Option<Uuid>) -> PortalResult<()> {
        match self
            .db
            .specializations
            .find(|s| s.name.eq_ignore_ascii_case(name) && Some(s.id) != except)
        {
            Some(_) => Err(PortalError::Conflict(format!("specialization '{}' already exists", name))),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{fixture, slow_fixture};
    use super::*;

    fn paracetamol() -> MedicineInput {
        MedicineInput {
            name: "Paracetamol".into(),
            generic_name: Some("Acetaminophen".into()),
            form: "tablet".into(),
            strength: "500mg".into(),
            stock: 200,
            active: true,
        }
    }

    fn lipid_panel(code: &str) -> DiagnosticInput {
        DiagnosticInput {
            name: "Lipid panel".into(),
            code: code.into(),
            sample_type: "blood".into(),
            unit: None,
            reference_range: None,
            price: 35.0,
            active: true,
        }
    }

    #[tokio::test]
    async fn medicine_editors_and_uniqueness() {
        let fx = fixture();
        assert!(fx.service.create_medicine(&fx.doctor, paracetamol()).await.is_err());
        let med = fx.service.create_medicine(&fx.pharmacist, paracetamol()).await.unwrap();

        let mut twin = paracetamol();
        twin.name = "PARACETAMOL".into();
        let err = fx.service.create_medicine(&fx.admin, twin).await.unwrap_err();
        assert!(matches!(err, PortalError::Conflict(_)));

        let mut restock = paracetamol();
        restock.stock = 20;
        restock.active = false;
        let updated = fx.service.update_medicine(&fx.admin, med.id, restock).await.unwrap();
        assert_eq!(updated.stock, 20);
        assert!(fx.service.list_medicines(true).is_empty());
        assert_eq!(fx.service.list_medicines(false).len(), 1);
    }

    #[tokio::test]
    async fn diagnostic_codes_are_normalized_and_unique() {
        let fx = fixture();
        assert!(fx.service.create_diagnostic(&fx.pharmacist, lipid_panel("lp1")).await.is_err());
        let diag = fx.service.create_diagnostic(&fx.lab, lipid_panel(" lp1 ")).await.unwrap();
        assert_eq!(diag.code, "LP1");
        assert!(fx.service.create_diagnostic(&fx.admin, lipid_panel("LP1")).await.is_err());
        // re-saving under its own code is fine
        assert!(fx.service.update_diagnostic(&fx.lab, diag.id, lipid_panel("LP1")).await.is_ok());
    }

    #[tokio::test]
    async fn specializations_admin_only() {
        let fx = fixture();
        let input = SpecializationInput { name: "Dermatology".into(), description: None };
        assert!(fx.service.create_specialization(&fx.doctor, input.clone()).await.is_err());
        fx.service.create_specialization(&fx.admin, input.clone()).await.unwrap();
        assert!(fx.service.create_specialization(&fx.admin, input).await.is_err());
        assert_eq!(fx.service.list_specializations().len(), 1);
    }

    #[tokio::test]
    async fn specialization_rename_cannot_collide() {
        let fx = fixture();
        let named = |name: &str| SpecializationInput { name: name.into(), description: None };
        fx.service.create_specialization(&fx.admin, named("Dermatology")).await.unwrap();
        let neuro = fx.service.create_specialization(&fx.admin, named("Neurology")).await.unwrap();

        let err = fx
            .service
            .update_specialization(&fx.admin, neuro.id, named("dermatology"))
            .await
            .unwrap_err();
        assert!(matches!(err, PortalError::Conflict(_)));
        assert_eq!(fx.service.get_specialization(neuro.id).unwrap().name, "Neurology");

        // a case-only rename of itself is fine
        let renamed = fx
            .service
            .update_specialization(&fx.admin, neuro.id, named("NEUROLOGY"))
            .await
            .unwrap();
        assert_eq!(renamed.name, "NEUROLOGY");
    }

    #[tokio::test]
    async fn concurrent_creates_keep_catalog_unique() {
        let fx = slow_fixture(20);
        let (a, b) = tokio::join!(
            fx.service.create_medicine(&fx.admin, paracetamol()),
            fx.service.create_medicine(&fx.pharmacist, paracetamol()),
        );
        assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
        assert_eq!(fx.service.list_medicines(false).len(), 1);

        let (a, b) = tokio::join!(
            fx.service.create_diagnostic(&fx.admin, lipid_panel("LP1")),
            fx.service.create_diagnostic(&fx.lab, lipid_panel("lp1")),
        );
        assert!(a.is_ok() != b.is_ok());
        assert_eq!(fx.service.list_diagnostics(false).len(), 1);
    }

    #[test]
    fn every_role_listed() {
        let fx = fixture();
        let roles = fx.service.roles();
        assert_eq!(roles.len(), 5);
        assert!(roles.iter().any(|r| r.role == Role::Admin && !r.requires_approval));
    }
}
