use validator::ValidationError;

pub fn validate_pagination(page: Option<u64>, limit: Option<u64>) -> (u64, u64) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(20).clamp(1, 100);
    (page, limit)
}

/// Custom validator for Vietnamese license plates (e.g. "51F-123.45", "29A-99999").
/// Accepts alphanumerics plus `-` and `.`, 6 to 12 characters.
pub fn validate_license_plate(plate: &str) -> Result<(), ValidationError> {
    let len_ok = (6..=12).contains(&plate.len());
    let chars_ok = plate
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.');
    if len_ok && chars_ok {
        Ok(())
    } else {
        Err(ValidationError::new("license_plate"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults_and_clamps() {
        assert_eq!(validate_pagination(None, None), (1, 20));
        assert_eq!(validate_pagination(Some(0), Some(0)), (1, 1));
        assert_eq!(validate_pagination(Some(3), Some(500)), (3, 100));
    }

    #[test]
    fn license_plate_accepts_common_formats() {
        assert!(validate_license_plate("51F-123.45").is_ok());
        assert!(validate_license_plate("29A-99999").is_ok());
    }

    #[test]
    fn license_plate_rejects_garbage() {
        assert!(validate_license_plate("x").is_err());
        assert!(validate_license_plate("51F 123 45").is_err());
    }
}
