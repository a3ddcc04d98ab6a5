use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::TransitionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PrescriptionStatus {
    Created,
    Pending,
    PartiallyDispensed,
    Dispensed,
    Cancelled,
}

impl PrescriptionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PrescriptionStatus::Created => "created",
            PrescriptionStatus::Pending => "pending",
            PrescriptionStatus::PartiallyDispensed => "partially-dispensed",
            PrescriptionStatus::Dispensed => "dispensed",
            PrescriptionStatus::Cancelled => "cancelled",
        }
    }

    /// Still waiting on the pharmacy.
    pub fn is_open(self) -> bool {
        matches!(
            self,
            PrescriptionStatus::Created
                | PrescriptionStatus::Pending
                | PrescriptionStatus::PartiallyDispensed
        )
    }
}

impl std::fmt::Display for PrescriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionItem {
    #[validate(length(min = 1, message = "medicine name is required"))]
    pub medicine_name: String,
    #[validate(length(min = 1, message = "dosage is required"))]
    pub dosage: String,
    #[validate(length(min = 1, message = "frequency is required"))]
    pub frequency: String,
    pub duration: String,
    #[validate(range(min = 1, message = "quantity must be at least 1"))]
    pub quantity: u32,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub dispensed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    pub id: Uuid,
    pub encounter_id: Option<Uuid>,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub items: Vec<PrescriptionItem>,
    pub status: PrescriptionStatus,
    pub notes: Option<String>,
    pub dispensed_by: Option<Uuid>,
    pub dispensed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One pharmacist toggle on a prescription line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispenseUpdate {
    pub item_index: usize,
    pub dispensed: bool,
}

/// Status implied by the item flags alone.
pub fn derive_status(items: &[PrescriptionItem]) -> PrescriptionStatus {
    let dispensed = items.iter().filter(|item| item.dispensed).count();
    match dispensed {
        0 => PrescriptionStatus::Pending,
        n if n == items.len() => PrescriptionStatus::Dispensed,
        _ => PrescriptionStatus::PartiallyDispensed,
    }
}

impl Prescription {
    pub fn dispensed_count(&self) -> usize {
        self.items.iter().filter(|item| item.dispensed).count()
    }

    /// Whether `status` agrees with the item flags.
    pub fn is_consistent(&self) -> bool {
        match self.status {
            PrescriptionStatus::Created | PrescriptionStatus::Cancelled => {
                self.dispensed_count() == 0
            }
            status => status == derive_status(&self.items),
        }
    }

    /// Apply a batch of toggles and recompute the status in the same step.
    pub fn apply_dispense(
        &self,
        updates: &[DispenseUpdate],
        pharmacist_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Self, TransitionError> {
        match self.status {
            PrescriptionStatus::Cancelled | PrescriptionStatus::Dispensed => {
                return Err(TransitionError::Terminal {
                    entity: "prescription",
                    status: self.status.to_string(),
                })
            }
            _ => {}
        }

        let mut next = self.clone();
        for update in updates {
            let item = next
                .items
                .get_mut(update.item_index)
                .ok_or(TransitionError::UnknownItem(update.item_index))?;
            item.dispensed = update.dispensed;
        }

        next.status = derive_status(&next.items);
        next.updated_at = now;
        if next.status == PrescriptionStatus::Dispensed {
            next.dispensed_by = Some(pharmacist_id);
            next.dispensed_at = Some(now);
        }
        Ok(next)
    }

    pub fn cancel(&self, now: DateTime<Utc>) -> Result<Self, TransitionError> {
        match self.status {
            PrescriptionStatus::Created | PrescriptionStatus::Pending => Ok(Prescription {
                status: PrescriptionStatus::Cancelled,
                updated_at: now,
                ..self.clone()
            }),
            PrescriptionStatus::Cancelled | PrescriptionStatus::Dispensed => {
                Err(TransitionError::Terminal {
                    entity: "prescription",
                    status: self.status.to_string(),
                })
            }
            PrescriptionStatus::PartiallyDispensed => Err(TransitionError::InvalidState {
                entity: "prescription",
                action: "cancel",
                status: self.status.to_string(),
            }),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use test_case::test_case;

    pub(crate) fn item(name: &str) -> PrescriptionItem {
        PrescriptionItem {
            medicine_name: name.into(),
            dosage: "500mg".into(),
            frequency: "twice daily".into(),
            duration: "7 days".into(),
            quantity: 14,
            instructions: "after meals".into(),
            dispensed: false,
        }
    }

    pub(crate) fn prescription(items: Vec<PrescriptionItem>) -> Prescription {
        let now = Utc::now();
        Prescription {
            id: Uuid::new_v4(),
            encounter_id: None,
            patient_id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            items,
            status: PrescriptionStatus::Created,
            notes: None,
            dispensed_by: None,
            dispensed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn toggle(item_index: usize, dispensed: bool) -> DispenseUpdate {
        DispenseUpdate { item_index, dispensed }
    }

    #[test_case(&[false, false], PrescriptionStatus::Pending)]
    #[test_case(&[true, false], PrescriptionStatus::PartiallyDispensed)]
    #[test_case(&[false, true, false], PrescriptionStatus::PartiallyDispensed)]
    #[test_case(&[true, true], PrescriptionStatus::Dispensed)]
    #[test_case(&[true], PrescriptionStatus::Dispensed)]
    fn status_follows_flags(flags: &[bool], expected: PrescriptionStatus) {
        let items: Vec<_> = flags
            .iter()
            .map(|&dispensed| PrescriptionItem { dispensed, ..item("amoxicillin") })
            .collect();
        assert_eq!(derive_status(&items), expected);
    }

    #[test]
    fn two_items_dispensed_one_at_a_time() {
        let pharmacist = Uuid::new_v4();
        let now = Utc::now();
        let rx = prescription(vec![item("amoxicillin"), item("paracetamol")]);

        let partial = rx.apply_dispense(&[toggle(0, true)], pharmacist, now).unwrap();
        assert_eq!(partial.status, PrescriptionStatus::PartiallyDispensed);
        assert!(partial.dispensed_by.is_none());
        assert!(partial.is_consistent());

        let done = partial.apply_dispense(&[toggle(1, true)], pharmacist, now).unwrap();
        assert_eq!(done.status, PrescriptionStatus::Dispensed);
        assert_eq!(done.dispensed_by, Some(pharmacist));
        assert!(done.is_consistent());
    }

    #[test]
    fn untoggling_goes_back_to_pending() {
        let rx = prescription(vec![item("amoxicillin"), item("paracetamol")]);
        let now = Utc::now();
        let partial = rx.apply_dispense(&[toggle(0, true)], Uuid::new_v4(), now).unwrap();
        let back = partial.apply_dispense(&[toggle(0, false)], Uuid::new_v4(), now).unwrap();
        assert_eq!(back.status, PrescriptionStatus::Pending);
    }

    #[test]
    fn batch_is_applied_as_a_whole() {
        let rx = prescription(vec![item("a"), item("b")]);
        let err = rx
            .apply_dispense(&[toggle(0, true), toggle(5, true)], Uuid::new_v4(), Utc::now())
            .unwrap_err();
        assert_eq!(err, TransitionError::UnknownItem(5));
        assert_eq!(rx.dispensed_count(), 0);
    }

    #[test]
    fn dispensed_and_cancelled_are_final() {
        let now = Utc::now();
        let rx = prescription(vec![item("a")]);
        let done = rx.apply_dispense(&[toggle(0, true)], Uuid::new_v4(), now).unwrap();
        assert!(done.apply_dispense(&[toggle(0, false)], Uuid::new_v4(), now).is_err());
        assert!(done.cancel(now).is_err());

        let cancelled = rx.cancel(now).unwrap();
        assert_eq!(cancelled.status, PrescriptionStatus::Cancelled);
        assert!(cancelled.apply_dispense(&[toggle(0, true)], Uuid::new_v4(), now).is_err());
    }

    #[test]
    fn partially_dispensed_cannot_be_cancelled() {
        let now = Utc::now();
        let rx = prescription(vec![item("a"), item("b")]);
        let partial = rx.apply_dispense(&[toggle(1, true)], Uuid::new_v4(), now).unwrap();
        assert!(matches!(partial.cancel(now), Err(TransitionError::InvalidState { .. })));
    }
}
