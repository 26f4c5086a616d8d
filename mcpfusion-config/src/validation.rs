//! Configuration validation traits and utilities.

use crate::error::{ConfigError, ConfigResult};

/// Trait for validatable configuration domains.
pub trait Validatable {
    fn validate(&self) -> ConfigResult<()>;

    fn domain_name(&self) -> &'static str;

    fn validation_error(&self, message: impl Into<String>) -> ConfigError {
        ConfigError::DomainError {
            domain: self.domain_name().to_string(),
            message: message.into(),
        }
    }
}

pub fn validate_required_string(value: &str, field_name: &str, domain: &str) -> ConfigResult<()> {
    if value.is_empty() {
        return Err(ConfigError::DomainError {
            domain: domain.to_string(),
            message: format!("{field_name} cannot be empty"),
        });
    }
    Ok(())
}

pub fn validate_url(url: &str, field_name: &str, domain: &str) -> ConfigResult<()> {
    if url.is_empty() {
        return Err(ConfigError::DomainError {
            domain: domain.to_string(),
            message: format!("{field_name} cannot be empty"),
        });
    }
    url::Url::parse(url).map_err(|e| ConfigError::DomainError {
        domain: domain.to_string(),
        message: format!("{field_name} has invalid URL format: {e}"),
    })?;
    Ok(())
}

pub fn validate_enum_choice<T>(value: &str, valid_choices: &[T], field_name: &str, domain: &str) -> ConfigResult<()>
where
    T: AsRef<str>,
{
    let valid: Vec<&str> = valid_choices.iter().map(|c| c.as_ref()).collect();
    if !valid.iter().any(|&v| v.eq_ignore_ascii_case(value)) {
        return Err(ConfigError::DomainError {
            domain: domain.to_string(),
            message: format!("{field_name} has invalid value '{value}'. Valid choices: {}", valid.join(", ")),
        });
    }
    Ok(())
}

pub fn validate_port_range(port: u16, field_name: &str, domain: &str) -> ConfigResult<()> {
    if port == 0 {
        return Err(ConfigError::DomainError {
            domain: domain.to_string(),
            message: format!("{field_name} cannot be 0"),
        });
    }
    if port <= 1023 {
        tracing::warn!("{field_name} port {port} is in the reserved range (1-1023)");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_url_rejects_empty_and_malformed() {
        assert!(validate_url("", "base_url", "service").is_err());
        assert!(validate_url("not a url", "base_url", "service").is_err());
        assert!(validate_url("https://example.com", "base_url", "service").is_ok());
    }

    #[test]
    fn validate_port_range_rejects_zero() {
        assert!(validate_port_range(0, "port", "server").is_err());
        assert!(validate_port_range(8080, "port", "server").is_ok());
    }
}
