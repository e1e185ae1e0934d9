//! Input checks shared by the HTTP handlers and the `create-admin` binary.

use rust_decimal::Decimal;

use crate::error::{AppError, AppResult};

pub const MIN_PASSWORD_LEN: usize = 8;

/// Trimmed, non-empty text or a validation error naming `field`.
pub fn required_text(value: &str, field: &str) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

pub fn positive_price(price: Decimal) -> AppResult<Decimal> {
    if price <= Decimal::ZERO {
        return Err(AppError::Validation("Price must be greater than 0".to_string()));
    }
    Ok(price)
}

pub fn non_negative_limit(limit: Decimal) -> AppResult<Decimal> {
    if limit < Decimal::ZERO {
        return Err(AppError::Validation("Budget limit cannot be negative".to_string()));
    }
    Ok(limit)
}

/// Lowercased, trimmed address with a single `@` and both halves present.
pub fn normalize_email(email: &str) -> AppResult<String> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    };
    if !valid {
        return Err(AppError::Validation("Please provide a valid email".to_string()));
    }
    Ok(email)
}

pub fn check_new_password(password: &str, confirm: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if password != confirm {
        return Err(AppError::Validation("Passwords are not the same".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_required_text_trims() {
        assert_eq!(required_text("  Rent ", "Title").unwrap(), "Rent");
        assert!(matches!(required_text("   ", "Title"), Err(AppError::Validation(m)) if m == "Title is required"));
        assert!(matches!(required_text("", "Name"), Err(AppError::Validation(m)) if m == "Name is required"));
    }

    #[test]
    fn test_money_checks() {
        assert!(positive_price(dec!(0.01)).is_ok());
        assert!(positive_price(dec!(0)).is_err());
        assert!(positive_price(dec!(-3)).is_err());
        assert!(non_negative_limit(dec!(0)).is_ok());
        assert!(non_negative_limit(dec!(-1)).is_err());
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Ada@Example.COM ").unwrap(), "ada@example.com");
        assert!(normalize_email("no-at-sign").is_err());
        assert!(normalize_email("@example.com").is_err());
        assert!(normalize_email("ops@").is_err());
        assert!(normalize_email("a@b@c").is_err());
    }

    #[test]
    fn test_check_new_password() {
        assert!(check_new_password("longenough", "longenough").is_ok());
        assert!(check_new_password("short", "short").is_err());
        assert!(check_new_password("longenough", "different1").is_err());
    }
}
