//! Validation utilities for the Stock Ledger platform

use rust_decimal::Decimal;

use crate::types::Location;

/// Longest SKU or batch identifier accepted
pub const MAX_CODE_LEN: usize = 64;

/// Largest quantity accepted on any single count, movement or target
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(3_567_587_328, 232, 0, false, 0); // 10^12

/// Most decimal places accepted on a quantity
pub const MAX_AMOUNT_SCALE: u32 = 6;

// ============================================================================
// Identifier Validations
// ============================================================================

/// Validate SKU format: 1-64 characters of letters, digits, `-`, `_`, `.`
pub fn validate_sku(sku: &str) -> Result<(), &'static str> {
    validate_code(sku).map_err(|_| "SKU must be 1-64 characters of letters, digits, '-', '_' or '.'")
}

/// Validate batch identifier, same alphabet as SKUs
pub fn validate_batch_id(batch_id: &str) -> Result<(), &'static str> {
    validate_code(batch_id)
        .map_err(|_| "Batch ID must be 1-64 characters of letters, digits, '-', '_' or '.'")
}

fn validate_code(code: &str) -> Result<(), ()> {
    if code.is_empty() || code.len() > MAX_CODE_LEN {
        return Err(());
    }
    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(());
    }
    Ok(())
}

/// Validate a location string. Logistics and numbered production zones are
/// always accepted; other names must be lowercase snake_case.
pub fn validate_location(location: &str) -> Result<(), &'static str> {
    match Location::parse(location) {
        Location::Logistics | Location::ProductionZone(_) => Ok(()),
        Location::Other(name) => {
            if name.is_empty() {
                return Err("Location is required");
            }
            if name.starts_with(crate::types::ZONE_PREFIX) {
                return Err("Production zone must be numbered, e.g. production_zone_3");
            }
            if !name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
            {
                return Err("Location must be lowercase letters, digits and '_'");
            }
            Ok(())
        }
    }
}

// ============================================================================
// Quantity Validations
// ============================================================================

/// Keeps every derived total, ratio and percentage far inside Decimal range
fn validate_amount_bounds(amount: Decimal) -> Result<(), &'static str> {
    if amount.abs() > MAX_AMOUNT {
        return Err("Amount cannot exceed 1000000000000");
    }
    if amount.normalize().scale() > MAX_AMOUNT_SCALE {
        return Err("Amount cannot have more than 6 decimal places");
    }
    Ok(())
}

/// Movement quantities must be strictly positive
pub fn validate_positive_amount(amount: Decimal) -> Result<(), &'static str> {
    if amount <= Decimal::ZERO {
        return Err("Amount must be greater than zero");
    }
    validate_amount_bounds(amount)
}

/// Counted quantities may be zero but never negative
pub fn validate_count_amount(amount: Decimal) -> Result<(), &'static str> {
    if amount < Decimal::ZERO {
        return Err("Counted amount cannot be negative");
    }
    validate_amount_bounds(amount)
}

/// Validate a six digit one-time passcode
pub fn validate_otp_format(otp: &str) -> Result<(), &'static str> {
    if otp.len() == 6 && otp.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err("OTP must be 6 digits")
    }
}
