use impactline_core::{DomainError, DomainResult};

/// Trim and require a non-blank string.
pub(crate) fn required_text(field: &'static str, value: &str) -> DomainResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(field, "must not be blank"));
    }
    Ok(trimmed.to_string())
}

/// Blank optional strings collapse to `None`.
pub(crate) fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Any finite number is accepted: zero, negative and fractional weights are
/// legitimate inputs. NaN and infinities cannot round-trip through JSON.
pub(crate) fn finite(field: &'static str, value: f64) -> DomainResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(DomainError::validation(field, "must be a finite number"))
    }
}

pub(crate) fn finite_opt(field: &'static str, value: Option<f64>) -> DomainResult<Option<f64>> {
    value.map(|v| finite(field, v)).transpose()
}
