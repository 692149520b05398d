use crate::utils::error::{Result, TransferError};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.trim().is_empty() {
        return Err(TransferError::validation(field_name, "URL cannot be empty"));
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(TransferError::validation(
                field_name,
                format!("Unsupported URL scheme: {}", scheme),
            )),
        },
        Err(e) => Err(TransferError::validation(
            field_name,
            format!("Invalid URL format: {}", e),
        )),
    }
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(TransferError::validation(
            field_name,
            "Value cannot be empty or whitespace-only",
        ));
    }
    Ok(())
}

/// 可選字串欄位：`None` 或空白都視為缺少
pub fn validate_present(field_name: &str, value: Option<&str>) -> Result<()> {
    match value {
        Some(v) => validate_non_empty_string(field_name, v),
        None => Err(TransferError::validation(field_name, "Value is required")),
    }
}

pub fn validate_http_method(field_name: &str, method: &str) -> Result<()> {
    match method.to_ascii_uppercase().as_str() {
        "POST" | "PUT" | "PATCH" => Ok(()),
        other => Err(TransferError::validation(
            field_name,
            format!("Unsupported upload method: {}. Allowed: POST, PUT, PATCH", other),
        )),
    }
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(TransferError::validation(
            field_name,
            format!("Value {} must be between {} and {}", value, min, max),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("base_url", "https://example.com").is_ok());
        assert!(validate_url("base_url", "http://example.com/api").is_ok());
        assert!(validate_url("base_url", "").is_err());
        assert!(validate_url("base_url", "invalid-url").is_err());
        assert!(validate_url("base_url", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_present() {
        assert!(validate_present("username", Some("admin")).is_ok());
        assert!(validate_present("username", Some("  ")).is_err());
        assert!(validate_present("username", None).is_err());
    }

    #[test]
    fn test_validate_http_method() {
        assert!(validate_http_method("upload_method", "post").is_ok());
        assert!(validate_http_method("upload_method", "PUT").is_ok());
        assert!(validate_http_method("upload_method", "GET").is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("timeout_seconds", 30u64, 1, 3600).is_ok());
        assert!(validate_range("timeout_seconds", 0u64, 1, 3600).is_err());
    }
}
