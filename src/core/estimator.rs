//! Emission estimation.
//!
//! Turns a logged quantity into kilograms of CO2e by multiplying it with the
//! factor configured for its category and subtype. Categories with an
//! exchange rate (purchases logged in local currency) convert the quantity to
//! the reference currency first. Nothing here touches the database; the
//! activity module persists the result.

use crate::config::EmissionFactors;
use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The fixed set of activity categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Travel by any mode
    Transport,
    /// Household electricity and fuels
    Energy,
    /// Food consumption
    Food,
    /// Purchases of goods and services
    Consumption,
}

impl Category {
    /// Every category, in display order.
    pub const ALL: [Self; 4] = [Self::Transport, Self::Energy, Self::Food, Self::Consumption];

    /// Storage form of the category.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Transport => "transport",
            Self::Energy => "energy",
            Self::Food => "food",
            Self::Consumption => "consumption",
        }
    }

    /// Human-readable label, capitalized.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Transport => "Transport",
            Self::Energy => "Energy",
            Self::Food => "Food",
            Self::Consumption => "Consumption",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "transport" => Ok(Self::Transport),
            "energy" => Ok(Self::Energy),
            "food" => Ok(Self::Food),
            // Older clients submit purchases under this name
            "consumption" | "purchases" => Ok(Self::Consumption),
            other => Err(Error::validation(
                "category",
                format!("unknown category '{other}'"),
            )),
        }
    }
}

/// The outcome of one estimate, kept together so callers can show how the
/// number was produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Estimate {
    /// Category the factor came from
    pub category: Category,
    /// Normalised subtype used for the lookup
    pub subtype: String,
    /// Quantity as logged
    pub quantity: f64,
    /// kg CO2e per logged unit, exchange rate included
    pub factor: f64,
    /// Whether the category default was used
    pub used_default: bool,
    /// Resulting footprint in kg CO2e
    pub co2_kg: f64,
}

/// Parses a raw numeric form value.
///
/// # Errors
/// Returns a validation error when the value is blank or not a number.
pub fn parse_quantity(raw: &str) -> Result<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("quantity", "a quantity is required"));
    }
    trimmed
        .parse::<f64>()
        .map_err(|_| Error::validation("quantity", format!("'{trimmed}' is not a number")))
}

/// Effective factor for `(category, subtype)`: the table factor, scaled by the
/// category's exchange rate when it has one.
#[must_use]
pub fn factor(factors: &EmissionFactors, category: Category, subtype: &str) -> f64 {
    let table = factors.category(category);
    let base = table.factor(subtype);
    table.exchange_rate.map_or(base, |rate| base * rate)
}

/// Estimates the footprint of a logged quantity.
///
/// # Errors
/// Returns `Error::InvalidQuantity` when the quantity is negative, NaN or
/// infinite.
pub fn estimate(
    factors: &EmissionFactors,
    category: Category,
    subtype: &str,
    quantity: f64,
) -> Result<Estimate> {
    if !quantity.is_finite() || quantity < 0.0 {
        return Err(Error::InvalidQuantity { quantity });
    }

    let subtype = subtype.trim().to_lowercase();
    let table = factors.category(category);
    let factor = factor(factors, category, &subtype);

    Ok(Estimate {
        category,
        used_default: !table.knows(&subtype),
        subtype,
        quantity,
        factor,
        co2_kg: quantity * factor,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::test_factors;

    #[test]
    fn test_estimate_known_subtype() {
        let factors = test_factors();
        let estimate = estimate(&factors, Category::Transport, "car_petrol", 10.0).unwrap();
        assert_eq!(estimate.factor, 0.2);
        assert_eq!(estimate.co2_kg, 2.0);
        assert!(!estimate.used_default);
    }

    #[test]
    fn test_estimate_unknown_subtype_uses_default() {
        let factors = test_factors();
        let estimate = estimate(&factors, Category::Food, "jackfruit", 2.0).unwrap();
        assert_eq!(estimate.factor, factors.food.default);
        assert_eq!(estimate.co2_kg, 2.0 * factors.food.default);
        assert!(estimate.used_default);
    }

    #[test]
    fn test_estimate_equals_quantity_times_factor_everywhere() {
        let factors = test_factors();
        let subtypes = ["car_petrol", "bus", "electricity", "beef", "clothing", "mystery", ""];
        let quantities = [0.0, 0.5, 1.0, 12.25, 1000.0];

        for category in Category::ALL {
            for subtype in subtypes {
                for quantity in quantities {
                    let estimate = estimate(&factors, category, subtype, quantity).unwrap();
                    assert_eq!(estimate.co2_kg, quantity * factor(&factors, category, subtype));
                    assert!(estimate.co2_kg >= 0.0);
                }
            }
        }
    }

    #[test]
    fn test_consumption_applies_exchange_rate() {
        let factors = test_factors();
        // 1000 INR * 0.01 USD/INR * 0.5 kg/USD
        let estimate = estimate(&factors, Category::Consumption, "clothing", 1000.0).unwrap();
        assert_eq!(estimate.factor, 0.5 * 0.01);
        assert!((estimate.co2_kg - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_estimate_rejects_bad_quantities() {
        let factors = test_factors();
        for quantity in [-1.0, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let result = estimate(&factors, Category::Energy, "electricity", quantity);
            assert!(matches!(result, Err(Error::InvalidQuantity { .. })));
        }
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity(" 12.5 ").unwrap(), 12.5);
        assert!(matches!(
            parse_quantity(""),
            Err(Error::Validation { field, .. }) if field == "quantity"
        ));
        assert!(parse_quantity("ten").is_err());
    }

    #[test]
    fn test_category_parsing() {
        assert_eq!("Transport".parse::<Category>().unwrap(), Category::Transport);
        assert_eq!("purchases".parse::<Category>().unwrap(), Category::Consumption);
        assert!("leisure".parse::<Category>().is_err());
        assert_eq!(Category::Food.label(), "Food");
    }
}
