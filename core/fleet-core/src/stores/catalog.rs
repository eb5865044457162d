//! Question bank held in memory, filled by the client from the backend.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::checklist::applies_to;
use crate::error::StoreError;
use crate::types::{EnergySource, QuestionBankItem, VehicleProfile};

use super::QuestionBankRepository;

#[derive(Default)]
pub struct QuestionBankCatalog {
    banks: RwLock<HashMap<String, Vec<QuestionBankItem>>>,
}

impl QuestionBankCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the bank for a business. Returns the number of items loaded.
    pub fn load(&self, business_id: &str, items: Vec<QuestionBankItem>) -> u32 {
        let count = items.len() as u32;
        self.banks
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(business_id.to_string(), items);
        count
    }

    pub fn has_business(&self, business_id: &str) -> bool {
        self.banks
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains_key(business_id)
    }
}

impl QuestionBankRepository for QuestionBankCatalog {
    fn get_items(
        &self,
        business_id: &str,
        vehicle_type: &str,
        energy_source: EnergySource,
    ) -> Result<Vec<QuestionBankItem>, StoreError> {
        let banks = self
            .banks
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let bank = banks.get(business_id).ok_or_else(|| {
            StoreError::Unavailable(format!(
                "no question bank loaded for business {}",
                business_id
            ))
        })?;

        let vehicle = VehicleProfile {
            vehicle_id: String::new(),
            vehicle_type: vehicle_type.to_string(),
            energy_source,
        };
        Ok(bank
            .iter()
            .filter(|item| applies_to(item, &vehicle))
            .cloned()
            .collect())
    }
}
