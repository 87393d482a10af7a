//! Emission factor tables loaded from config.toml
//!
//! The tables map `category -> subtype -> kg CO2e per unit`, with a declared
//! default per category for subtypes the table does not list. A `version`
//! string travels with the table so stored footprints can be traced back to
//! the factors that produced them.

use crate::core::estimator::Category;
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Factors for a single activity category
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryFactors {
    /// Factor used when the subtype is not listed
    pub default: f64,
    /// Per-subtype factors, keyed by lowercase subtype
    #[serde(default)]
    pub factors: BTreeMap<String, f64>,
    /// Converts a currency quantity to the reference currency before the
    /// factor applies
    #[serde(default)]
    pub exchange_rate: Option<f64>,
}

impl CategoryFactors {
    /// Looks up the factor for a subtype, falling back to the category default.
    ///
    /// Matching ignores case and surrounding whitespace.
    #[must_use]
    pub fn factor(&self, subtype: &str) -> f64 {
        let key = subtype.trim().to_lowercase();
        self.factors.get(&key).copied().unwrap_or(self.default)
    }

    /// Whether `subtype` has its own entry in the table.
    #[must_use]
    pub fn knows(&self, subtype: &str) -> bool {
        self.factors.contains_key(&subtype.trim().to_lowercase())
    }

    fn validate(&self, category: Category) -> Result<()> {
        if !is_valid_factor(self.default) {
            return Err(Error::Config {
                message: format!("{category} default factor must be finite and >= 0"),
            });
        }
        if let Some((subtype, _)) = self.factors.iter().find(|(_, f)| !is_valid_factor(**f)) {
            return Err(Error::Config {
                message: format!("{category} factor for {subtype} must be finite and >= 0"),
            });
        }
        if let Some(rate) = self.exchange_rate {
            if !rate.is_finite() || rate <= 0.0 {
                return Err(Error::Config {
                    message: format!("{category} exchange rate must be finite and > 0"),
                });
            }
        }
        Ok(())
    }
}

const fn is_valid_factor(factor: f64) -> bool {
    factor.is_finite() && factor >= 0.0
}

/// The complete, versioned factor table
#[derive(Debug, Clone, Deserialize)]
pub struct EmissionFactors {
    /// Identifies this revision of the table
    pub version: String,
    /// Road, rail and air travel, per km
    pub transport: CategoryFactors,
    /// Household energy, per kWh or kg of fuel
    pub energy: CategoryFactors,
    /// Food, per kg
    pub food: CategoryFactors,
    /// Purchases, per unit of reference currency
    pub consumption: CategoryFactors,
}

impl EmissionFactors {
    /// Returns the table for one category.
    #[must_use]
    pub const fn category(&self, category: Category) -> &CategoryFactors {
        match category {
            Category::Transport => &self.transport,
            Category::Energy => &self.energy,
            Category::Food => &self.food,
            Category::Consumption => &self.consumption,
        }
    }

    /// Checks that every factor is usable.
    ///
    /// # Errors
    /// Returns `Error::Config` naming the first offending entry.
    pub fn validate(&self) -> Result<()> {
        if self.version.trim().is_empty() {
            return Err(Error::Config {
                message: "Factor table version cannot be empty".to_string(),
            });
        }
        for category in Category::ALL {
            self.category(category).validate(category)?;
        }
        Ok(())
    }
}
