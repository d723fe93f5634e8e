// Crop Catalog - Label-to-Category Mapping
//
// Translates open-vocabulary classifier labels into the closed set of
// supported crop categories. Matching is lowercase substring containment
// against mapping keys in declaration order; the first matching key wins.

use crate::classifier::ClassifierObservation;
use agro_common::config::CropConfig;
use agro_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Generic name used for crop ids outside the catalog
pub const UNKNOWN_CROP_NAME: &str = "Cultura";

/// Supported crop category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CropCategory {
    /// Stable slug (e.g. "tomate")
    pub id: String,
    /// Display name (e.g. "Tomate")
    pub display_name: String,
}

impl CropCategory {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

/// Lexical key → category entry (category stored as index into the catalog)
#[derive(Debug, Clone, PartialEq, Eq)]
struct LabelMapping {
    key: String,
    category: usize,
}

/// Immutable crop catalog: ordered categories plus ordered label mappings
///
/// The first declared category is the fallback identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CropCatalog {
    categories: Vec<CropCategory>,
    mappings: Vec<LabelMapping>,
}

impl CropCatalog {
    /// Build a catalog from categories and `(key, category_id)` mappings
    ///
    /// Keys are trimmed and lowercased. Fails if there are no categories,
    /// duplicate category ids, empty keys, or keys referencing unknown
    /// categories.
    pub fn new(categories: Vec<CropCategory>, mappings: Vec<(String, String)>) -> Result<Self> {
        if categories.is_empty() {
            return Err(Error::Config(
                "Crop catalog must declare at least one category".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for category in &categories {
            if category.id.trim().is_empty() {
                return Err(Error::Config("Crop category id must not be empty".to_string()));
            }
            if !seen.insert(category.id.as_str()) {
                return Err(Error::Config(format!("Duplicate crop category id: {}", category.id)));
            }
        }

        let mappings = mappings
            .into_iter()
            .map(|(key, category_id)| {
                let key = key.trim().to_lowercase();
                if key.is_empty() {
                    return Err(Error::Config(format!(
                        "Empty label key for crop category {}",
                        category_id
                    )));
                }
                let category = categories
                    .iter()
                    .position(|c| c.id == category_id)
                    .ok_or_else(|| {
                        Error::Config(format!(
                            "Label '{}' maps to unknown crop category {}",
                            key, category_id
                        ))
                    })?;
                Ok(LabelMapping { key, category })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { categories, mappings })
    }

    /// Build a catalog from `[[crops]]` configuration entries
    ///
    /// Categories keep their configured order; each crop's aliases become
    /// mapping keys in the order listed.
    pub fn from_crop_configs(crops: &[CropConfig]) -> Result<Self> {
        let categories = crops
            .iter()
            .map(|crop| CropCategory::new(crop.id.clone(), crop.name.clone()))
            .collect();

        let mappings = crops
            .iter()
            .flat_map(|crop| {
                crop.aliases
                    .iter()
                    .map(move |alias| (alias.clone(), crop.id.clone()))
            })
            .collect();

        Self::new(categories, mappings)
    }

    /// Categories in declaration order
    pub fn categories(&self) -> &[CropCategory] {
        &self.categories
    }

    /// Mapping keys with their categories, in declaration order
    pub fn mappings(&self) -> impl Iterator<Item = (&str, &CropCategory)> + '_ {
        self.mappings
            .iter()
            .map(|m| (m.key.as_str(), &self.categories[m.category]))
    }

    /// Fallback identity (first declared category)
    pub fn fallback_category(&self) -> &CropCategory {
        &self.categories[0]
    }

    /// Look up a category by id
    pub fn get(&self, id: &str) -> Option<&CropCategory> {
        self.categories.iter().find(|c| c.id == id)
    }

    /// Display name for a crop id, or the generic crop name if unknown
    pub fn display_name_or_default(&self, id: &str) -> &str {
        self.get(id)
            .map(|c| c.display_name.as_str())
            .unwrap_or(UNKNOWN_CROP_NAME)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }
}

impl Default for CropCatalog {
    /// Reference catalog: lettuce, cassava, tomato, carrot, corn
    fn default() -> Self {
        const CATEGORIES: [(&str, &str, &[&str]); 5] = [
            ("alface", "Alface", &["lettuce", "cabbage", "leafy green"]),
            ("mandioca", "Mandioca", &["cassava", "sweet potato"]),
            ("tomate", "Tomate", &["tomato", "red pepper"]),
            ("cenoura", "Cenoura", &["carrot", "orange vegetable"]),
            ("milho", "Milho", &["corn", "maize", "ear"]),
        ];

        let categories = CATEGORIES
            .iter()
            .map(|(id, name, _)| CropCategory::new(*id, *name))
            .collect();

        let mappings = CATEGORIES
            .iter()
            .enumerate()
            .flat_map(|(category, (_, _, keys))| {
                keys.iter().map(move |key| LabelMapping {
                    key: key.to_string(),
                    category,
                })
            })
            .collect();

        Self { categories, mappings }
    }
}

/// Score one classifier observation against the catalog
///
/// The label is lowercased and tested against every key with substring
/// containment; the first key (in declaration order) contained in the label
/// selects the category. Returns `None` when no key matches.
pub fn score_observation<'a>(
    observation: &ClassifierObservation,
    catalog: &'a CropCatalog,
) -> Option<(&'a CropCategory, f64)> {
    let label = observation.label.to_lowercase();

    catalog
        .mappings()
        .find(|(key, _)| label.contains(key))
        .map(|(_, category)| (category, observation.score))
}
