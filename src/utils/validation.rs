// Normalization helpers for user-supplied string fields

/// Trim a field, rejecting it when required and blank.
pub fn trim_and_validate_field(field: &str, name: &str, required: bool) -> Result<String, String> {
    let trimmed = field.trim().to_string();
    if trimmed.is_empty() && required {
        return Err(format!("{} cannot be empty", name));
    }
    Ok(trimmed)
}

/// Emails are stored and matched trimmed and lowercased
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Coupon codes are case-insensitive on input and stored uppercased
pub fn normalize_coupon_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Currency codes must be three ASCII letters; stored uppercased
pub fn normalize_currency(currency: &str) -> Result<String, String> {
    let trimmed = currency.trim();
    if trimmed.len() != 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err("currency must be a three-letter code".to_string());
    }
    Ok(trimmed.to_uppercase())
}
