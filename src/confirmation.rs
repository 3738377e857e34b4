//! # Confirmation Module
//!
//! Reconciles the user-edited ingredient list into the final set handed to
//! storage.
//!
//! Detected matches are projected into [`EditableItem`]s; the user may edit
//! names, quantities and units, deselect items and add manual items. The
//! selected items are then validated, unit-normalized and merged so that each
//! `(lowercase name, unit)` pair appears once with the summed quantity.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use crate::receipt_aggregator::ReceiptAnalysis;
use crate::receipt_matcher::IngredientMatch;

/// Normalized measurement unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    #[serde(rename = "ea")]
    Each,
    #[serde(rename = "lb")]
    Pound,
    #[serde(rename = "oz")]
    Ounce,
    #[serde(rename = "g")]
    Gram,
    #[serde(rename = "kg")]
    Kilogram,
    #[serde(rename = "ml")]
    Milliliter,
    #[serde(rename = "L")]
    Liter,
    #[serde(rename = "gallon")]
    Gallon,
}

static UNIT_SYNONYMS: LazyLock<HashMap<&'static str, Unit>> = LazyLock::new(|| {
    let groups: &[(Unit, &[&str])] = &[
        (Unit::Each, &["ea", "each", "piece", "pieces", "pc", "pcs", "ct", "count", "unit", "units"]),
        (Unit::Pound, &["lb", "lbs", "pound", "pounds"]),
        (Unit::Ounce, &["oz", "ounce", "ounces"]),
        (Unit::Gram, &["g", "gr", "gram", "grams"]),
        (Unit::Kilogram, &["kg", "kgs", "kilo", "kilos", "kilogram", "kilograms"]),
        (Unit::Milliliter, &["ml", "milliliter", "milliliters", "millilitre", "millilitres"]),
        (Unit::Liter, &["l", "liter", "liters", "litre", "litres"]),
        (Unit::Gallon, &["gal", "gallon", "gallons"]),
    ];

    groups
        .iter()
        .flat_map(|(unit, synonyms)| synonyms.iter().map(move |synonym| (*synonym, *unit)))
        .collect()
});

impl Unit {
    /// Normalize a free-form unit; unknown and empty units become [`Unit::Each`]
    ///
    /// # Examples
    ///
    /// ```rust
    /// use receipt_ingredients::confirmation::Unit;
    ///
    /// assert_eq!(Unit::normalize("Pounds"), Unit::Pound);
    /// assert_eq!(Unit::normalize(" L "), Unit::Liter);
    /// assert_eq!(Unit::normalize(""), Unit::Each);
    /// assert_eq!(Unit::normalize("handful"), Unit::Each);
    /// ```
    pub fn normalize(raw: &str) -> Unit {
        let key = raw.trim().trim_end_matches('.').to_lowercase();
        UNIT_SYNONYMS.get(key.as_str()).copied().unwrap_or(Unit::Each)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Each => "ea",
            Unit::Pound => "lb",
            Unit::Ounce => "oz",
            Unit::Gram => "g",
            Unit::Kilogram => "kg",
            Unit::Milliliter => "ml",
            Unit::Liter => "L",
            Unit::Gallon => "gallon",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where a confirmed item came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemSource {
    Detected,
    Manual,
}

/// An ingredient as the user edits it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditableItem {
    pub id: String,
    pub name: String,
    pub quantity: f64,
    /// Free-form unit as typed
    pub unit: String,
    pub selected: bool,
    pub source: ItemSource,
    pub confidence: Option<f32>,
}

impl EditableItem {
    /// Editable item for a detected match: one each, selected
    pub fn detected(index: usize, ingredient: &IngredientMatch) -> Self {
        Self {
            id: format!("detected-{index}"),
            name: ingredient.name.clone(),
            quantity: 1.0,
            unit: Unit::Each.as_str().to_string(),
            selected: true,
            source: ItemSource::Detected,
            confidence: Some(ingredient.confidence),
        }
    }

    /// Selected item typed in by the user
    pub fn manual(
        id: impl Into<String>,
        name: impl Into<String>,
        quantity: f64,
        unit: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            quantity,
            unit: unit.into(),
            selected: true,
            source: ItemSource::Manual,
            confidence: None,
        }
    }
}

/// A validated, unit-normalized ingredient ready for storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmedIngredientItem {
    pub id: String,
    pub name: String,
    pub quantity: f64,
    pub unit: Unit,
    pub selected: bool,
    pub source: ItemSource,
    pub confidence: Option<f32>,
}

/// A single reason the selection cannot be confirmed
#[derive(Debug, Clone, PartialEq)]
pub enum Violation {
    NothingSelected,
    EmptyName { id: String },
    NonPositiveQuantity { id: String, quantity: f64 },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::NothingSelected => write!(f, "no ingredient selected"),
            Violation::EmptyName { id } => write!(f, "item {id} has an empty name"),
            Violation::NonPositiveQuantity { id, quantity } => {
                write!(f, "item {id} has quantity {quantity}, must be greater than 0")
            }
        }
    }
}

/// Itemized list of everything wrong with the selection
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let details: Vec<String> = self.violations.iter().map(|v| v.to_string()).collect();
        write!(f, "Validation error: {}", details.join("; "))
    }
}

impl std::error::Error for ValidationError {}

/// Project an analysis into editable items, one per detected ingredient
pub fn project_analysis(analysis: &ReceiptAnalysis) -> Vec<EditableItem> {
    analysis
        .ingredients
        .iter()
        .enumerate()
        .map(|(index, ingredient)| EditableItem::detected(index, ingredient))
        .collect()
}

/// Validate and merge the selected candidates and manual additions
///
/// Deselected items are ignored. Items sharing `(lowercase trimmed name,
/// normalized unit)` are merged: quantities are summed, the higher confidence
/// is kept, and the first item's id and name survive. Output keeps
/// first-seen order.
///
/// # Examples
///
/// ```rust
/// use receipt_ingredients::confirmation::{reconcile, EditableItem, Unit};
///
/// let items = reconcile(
///     &[EditableItem::manual("a", "milk", 1.0, "gallon")],
///     &[EditableItem::manual("b", "Milk", 0.5, "gallon")],
/// )
/// .unwrap();
///
/// assert_eq!(items.len(), 1);
/// assert_eq!(items[0].name, "milk");
/// assert_eq!(items[0].unit, Unit::Gallon);
/// assert_eq!(items[0].quantity, 1.5);
/// ```
pub fn reconcile(
    candidates: &[EditableItem],
    manual_additions: &[EditableItem],
) -> Result<Vec<ConfirmedIngredientItem>, ValidationError> {
    let selected: Vec<&EditableItem> = candidates
        .iter()
        .chain(manual_additions)
        .filter(|item| item.selected)
        .collect();

    if selected.is_empty() {
        return Err(ValidationError {
            violations: vec![Violation::NothingSelected],
        });
    }

    let violations: Vec<Violation> = selected.iter().flat_map(|item| validate_item(item)).collect();
    if !violations.is_empty() {
        debug!("Rejected confirmation with {} violations", violations.len());
        return Err(ValidationError { violations });
    }

    let mut positions: HashMap<(String, Unit), usize> = HashMap::new();
    let mut merged: Vec<ConfirmedIngredientItem> = Vec::new();

    for item in selected {
        let name = item.name.trim();
        let unit = Unit::normalize(&item.unit);
        let key = (name.to_lowercase(), unit);

        match positions.get(&key) {
            Some(&index) => {
                let existing = &mut merged[index];
                existing.quantity += item.quantity;
                existing.confidence = match (existing.confidence, item.confidence) {
                    (Some(a), Some(b)) => Some(a.max(b)),
                    (a, b) => a.or(b),
                };
                debug!("Merged {} into {} ({} {})", item.id, existing.id, existing.quantity, unit);
            }
            None => {
                positions.insert(key, merged.len());
                merged.push(ConfirmedIngredientItem {
                    id: item.id.clone(),
                    name: name.to_string(),
                    quantity: item.quantity,
                    unit,
                    selected: true,
                    source: item.source,
                    confidence: item.confidence,
                });
            }
        }
    }

    info!("Confirmed {} ingredients", merged.len());
    Ok(merged)
}

fn validate_item(item: &EditableItem) -> Vec<Violation> {
    let mut violations = Vec::new();
    if item.name.trim().is_empty() {
        violations.push(Violation::EmptyName {
            id: item.id.clone(),
        });
    }
    if !(item.quantity > 0.0 && item.quantity.is_finite()) {
        violations.push(Violation::NonPositiveQuantity {
            id: item.id.clone(),
            quantity: item.quantity,
        });
    }
    violations
}
