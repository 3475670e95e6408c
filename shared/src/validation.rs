//! Validation utilities for the Inventory Ledger
//!
//! Field-level rules that `validator` derives cannot express: identifier
//! shape and quantity signs on cargo maps.

use rust_decimal::Decimal;

use crate::models::CargoMap;
use crate::types::Quantity;

/// Longest identifier accepted for companies, sites, items and entities
pub const MAX_IDENTIFIER_LEN: usize = 64;

// ============================================================================
// Identifier Validations
// ============================================================================

/// Validate an identifier: non-empty, bounded, no whitespace or '/'
pub fn validate_identifier(value: &str) -> Result<(), &'static str> {
    if value.is_empty() {
        return Err("Identifier must not be empty");
    }
    if value.len() > MAX_IDENTIFIER_LEN {
        return Err("Identifier must be at most 64 characters");
    }
    if value.chars().any(|c| c.is_whitespace() || c == '/') {
        return Err("Identifier must not contain whitespace or '/'");
    }
    Ok(())
}

/// Validate an optional route discriminator; empty is allowed
pub fn validate_route(route: &str) -> Result<(), &'static str> {
    if route.is_empty() {
        return Ok(());
    }
    validate_identifier(route)
}

// ============================================================================
// Quantity Validations
// ============================================================================

/// Validate that a quantity is strictly positive
pub fn validate_positive_quantity(quantity: Quantity) -> Result<(), &'static str> {
    if quantity <= Decimal::ZERO {
        return Err("Quantity must be greater than zero");
    }
    Ok(())
}

/// Validate that a quantity is zero or positive
pub fn validate_non_negative_quantity(quantity: Quantity) -> Result<(), &'static str> {
    if quantity < Decimal::ZERO {
        return Err("Quantity must be zero or positive");
    }
    Ok(())
}

/// Validate a cargo map and return the offending item id on failure
pub fn validate_cargo(cargo: &CargoMap) -> Result<(), (String, &'static str)> {
    for (item, line) in cargo {
        validate_identifier(item).map_err(|e| (item.clone(), e))?;
        validate_non_negative_quantity(line.quantity).map_err(|e| (item.clone(), e))?;
    }
    Ok(())
}

/// Validate a full cargo map supplied at creation: every line needs a product
pub fn validate_new_cargo(cargo: &CargoMap) -> Result<(), (String, &'static str)> {
    validate_cargo(cargo)?;
    for (item, line) in cargo {
        if line.product.is_empty() {
            return Err((item.clone(), "Product is missing"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProductQuantity;

    // ========================================================================
    // Identifier Tests
    // ========================================================================

    #[test]
    fn test_validate_identifier_valid() {
        assert!(validate_identifier("widget-1").is_ok());
        assert!(validate_identifier("S1").is_ok());
    }

    #[test]
    fn test_validate_identifier_empty() {
        assert!(validate_identifier("").is_err());
    }

    #[test]
    fn test_validate_identifier_with_separator() {
        assert!(validate_identifier("a/b").is_err());
        assert!(validate_identifier("a b").is_err());
    }

    #[test]
    fn test_validate_identifier_too_long() {
        let long = "x".repeat(MAX_IDENTIFIER_LEN + 1);
        assert!(validate_identifier(&long).is_err());
    }

    #[test]
    fn test_validate_route_allows_empty() {
        assert!(validate_route("").is_ok());
        assert!(validate_route("R1").is_ok());
        assert!(validate_route("R 1").is_err());
    }

    // ========================================================================
    // Quantity Tests
    // ========================================================================

    #[test]
    fn test_validate_positive_quantity() {
        assert!(validate_positive_quantity(Decimal::ONE).is_ok());
        assert!(validate_positive_quantity(Decimal::ZERO).is_err());
        assert!(validate_positive_quantity(Decimal::NEGATIVE_ONE).is_err());
    }

    #[test]
    fn test_validate_cargo_negative_line() {
        let mut cargo = CargoMap::new();
        cargo.insert("A".to_string(), ProductQuantity::new("widget", Decimal::from(2)));
        cargo.insert("B".to_string(), ProductQuantity::new("widget", Decimal::from(-1)));

        let err = validate_cargo(&cargo).unwrap_err();
        assert_eq!(err.0, "B");
    }

    #[test]
    fn test_validate_new_cargo_requires_product() {
        let mut cargo = CargoMap::new();
        cargo.insert("A".to_string(), ProductQuantity::new("", Decimal::from(2)));

        assert!(validate_cargo(&cargo).is_ok());
        assert!(validate_new_cargo(&cargo).is_err());
    }
}
