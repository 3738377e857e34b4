//! # Inventory Module
//!
//! Storage collaborator receiving confirmed ingredients.

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::confirmation::{ConfirmedIngredientItem, Unit};

/// A stocked ingredient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryEntry {
    pub name: String,
    pub quantity: f64,
    pub unit: Unit,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Destination of confirmed ingredients
pub trait InventoryStore {
    /// Add confirmed items, returning how many entries were created or updated
    fn store(&mut self, items: &[ConfirmedIngredientItem]) -> Result<usize>;

    /// Current entries in insertion order
    fn entries(&self) -> Vec<InventoryEntry>;
}

/// In-process inventory keyed by `(lowercase name, unit)`
#[derive(Debug, Default)]
pub struct MemoryInventory {
    entries: Vec<InventoryEntry>,
    index: HashMap<(String, Unit), usize>,
}

impl MemoryInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stocked quantity of an ingredient in a unit
    pub fn quantity_of(&self, name: &str, unit: Unit) -> Option<f64> {
        self.index
            .get(&(name.trim().to_lowercase(), unit))
            .map(|&i| self.entries[i].quantity)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl InventoryStore for MemoryInventory {
    fn store(&mut self, items: &[ConfirmedIngredientItem]) -> Result<usize> {
        if let Some(item) = items.iter().find(|item| !(item.quantity > 0.0)) {
            bail!("Cannot store {} with quantity {}", item.name, item.quantity);
        }

        let now = Utc::now();
        for item in items {
            let key = (item.name.trim().to_lowercase(), item.unit);
            match self.index.get(&key) {
                Some(&i) => {
                    let entry = &mut self.entries[i];
                    entry.quantity += item.quantity;
                    entry.updated_at = now;
                    debug!("Restocked {}: {} {}", entry.name, entry.quantity, entry.unit);
                }
                None => {
                    self.index.insert(key, self.entries.len());
                    self.entries.push(InventoryEntry {
                        name: item.name.trim().to_string(),
                        quantity: item.quantity,
                        unit: item.unit,
                        created_at: now,
                        updated_at: now,
                    });
                    debug!("Stocked new item {}: {} {}", item.name, item.quantity, item.unit);
                }
            }
        }

        info!("Stored {} items, inventory holds {} entries", items.len(), self.entries.len());
        Ok(items.len())
    }

    fn entries(&self) -> Vec<InventoryEntry> {
        self.entries.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confirmation::ItemSource;

    fn confirmed(name: &str, quantity: f64, unit: Unit) -> ConfirmedIngredientItem {
        ConfirmedIngredientItem {
            id: name.to_string(),
            name: name.to_string(),
            quantity,
            unit,
            selected: true,
            source: ItemSource::Manual,
            confidence: None,
        }
    }

    #[test]
    fn test_store_accumulates() {
        let mut inventory = MemoryInventory::new();
        inventory.store(&[confirmed("Milk", 1.0, Unit::Gallon)]).unwrap();
        inventory
            .store(&[confirmed("milk", 0.5, Unit::Gallon), confirmed("milk", 2.0, Unit::Liter)])
            .unwrap();

        assert_eq!(inventory.len(), 2);
        assert_eq!(inventory.quantity_of("MILK", Unit::Gallon), Some(1.5));
        assert_eq!(inventory.quantity_of("milk", Unit::Liter), Some(2.0));

        let entries = inventory.entries();
        assert_eq!(entries[0].name, "Milk");
        assert!(entries[0].updated_at >= entries[0].created_at);
    }

    #[test]
    fn test_store_rejects_invalid_quantity() {
        let mut inventory = MemoryInventory::new();
        let result = inventory.store(&[confirmed("eggs", 12.0, Unit::Each), confirmed("rice", 0.0, Unit::Pound)]);

        assert!(result.is_err());
        assert!(inventory.is_empty());
    }
}
