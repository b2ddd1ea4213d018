//! Validation utilities for the Hotel Operations Platform

use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Validate a stock quantity used for consumption, issuance, or adjustment
pub fn validate_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity <= Decimal::ZERO {
        return Err("Quantity must be greater than zero");
    }
    Ok(())
}

/// Validate a unit or selling price
pub fn validate_price(price: Decimal) -> Result<(), &'static str> {
    if price < Decimal::ZERO {
        return Err("Price cannot be negative");
    }
    Ok(())
}

/// Validate an item or destination display name
pub fn validate_name(name: &str) -> Result<(), &'static str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("Name cannot be empty");
    }
    if trimmed.len() > 120 {
        return Err("Name must be at most 120 characters");
    }
    Ok(())
}

/// Validate a unit of measure (e.g. "bottle", "kg", "pcs")
pub fn validate_unit(unit: &str) -> Result<(), &'static str> {
    let trimmed = unit.trim();
    if trimmed.is_empty() {
        return Err("Unit of measure cannot be empty");
    }
    if trimmed.len() > 30 {
        return Err("Unit of measure must be at most 30 characters");
    }
    Ok(())
}

/// Validate the mandatory reason on a stock adjustment
pub fn validate_adjustment_reason(reason: &str) -> Result<(), &'static str> {
    if reason.trim().is_empty() {
        return Err("Adjustment reason is required");
    }
    if reason.len() > 500 {
        return Err("Adjustment reason must be at most 500 characters");
    }
    Ok(())
}

/// Validate that a date range runs forward
pub fn validate_date_range(start: NaiveDate, end: NaiveDate) -> Result<(), &'static str> {
    if end < start {
        return Err("End date must not be before start date");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(dec("0.5")).is_ok());
        assert!(validate_quantity(dec("100")).is_ok());
        assert!(validate_quantity(Decimal::ZERO).is_err());
        assert!(validate_quantity(dec("-1")).is_err());
    }

    #[test]
    fn test_validate_price() {
        assert!(validate_price(Decimal::ZERO).is_ok());
        assert!(validate_price(dec("19.50")).is_ok());
        assert!(validate_price(dec("-0.01")).is_err());
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("House Red Wine").is_ok());
        assert!(validate_name("  ").is_err());
        assert!(validate_name(&"x".repeat(121)).is_err());
    }

    #[test]
    fn test_validate_unit() {
        assert!(validate_unit("bottle").is_ok());
        assert!(validate_unit("kg").is_ok());
        assert!(validate_unit("").is_err());
    }

    #[test]
    fn test_validate_adjustment_reason() {
        assert!(validate_adjustment_reason("Breakage during transport").is_ok());
        assert!(validate_adjustment_reason("   ").is_err());
        assert!(validate_adjustment_reason(&"r".repeat(501)).is_err());
    }

    #[test]
    fn test_validate_date_range() {
        let start: NaiveDate = "2024-01-01".parse().unwrap();
        let end: NaiveDate = "2024-01-31".parse().unwrap();
        assert!(validate_date_range(start, end).is_ok());
        assert!(validate_date_range(start, start).is_ok());
        assert!(validate_date_range(end, start).is_err());
    }
}
