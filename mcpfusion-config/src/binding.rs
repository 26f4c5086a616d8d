//! Parameter binding: translates an invocation's MCP-named
//! arguments into the upstream parameter shape an endpoint or command
//! expects, applying defaults, type coercion, validation and time-token
//! substitution in that order.

use crate::domains::service::{ParameterConfig, ParameterLocation, ParameterType};
use crate::timetoken;
use chrono::{DateTime, Utc};
use mcpfusion_core::CoreError;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct BoundParameter {
    pub upstream_name: String,
    pub location: ParameterLocation,
    pub prefix: Option<String>,
    pub quoted: bool,
    pub value: serde_json::Value,
}

/// Binds one endpoint's or command's declared parameters against a caller
/// invocation keyed by MCP alias.
pub fn bind(
    params: &[ParameterConfig],
    invocation: &HashMap<String, serde_json::Value>,
    now: DateTime<Utc>,
) -> Result<Vec<BoundParameter>, CoreError> {
    let mut bound = Vec::with_capacity(params.len());

    for param in params {
        let value = if param.r#static {
            param.default.clone()
        } else {
            let alias = param
                .resolved_alias()
                .ok_or_else(|| CoreError::Configuration(format!("parameter '{}' has no usable alias", param.name)))?;
            invocation.get(&alias).cloned().or_else(|| param.default.clone())
        };

        let Some(mut value) = value else {
            if param.required {
                return Err(CoreError::Validation(format!(
                    "missing required parameter '{}'",
                    param.name
                )));
            }
            continue;
        };

        coerce_type(&mut value, param)?;
        validate_value(&value, param)?;
        value = substitute_time_tokens(value, now)?;

        bound.push(BoundParameter {
            upstream_name: param.name.clone(),
            location: param.location,
            prefix: param.prefix.clone(),
            quoted: param.quoted,
            value,
        });
    }

    Ok(bound)
}

fn coerce_type(value: &mut serde_json::Value, param: &ParameterConfig) -> Result<(), CoreError> {
    use serde_json::Value;
    let coerced = match (&param.r#type, &value) {
        (ParameterType::String, Value::String(_)) => None,
        (ParameterType::String, other) => Some(Value::String(json_scalar_to_string(other))),
        (ParameterType::Number, Value::Number(_)) => None,
        (ParameterType::Number, Value::String(s)) => Some(
            s.parse::<f64>()
                .map(|n| serde_json::Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null))
                .map_err(|_| invalid_type(param, "number"))?,
        ),
        (ParameterType::Integer, Value::Number(n)) if n.is_i64() || n.is_u64() => None,
        (ParameterType::Integer, Value::String(s)) => {
            Some(s.parse::<i64>().map(Value::from).map_err(|_| invalid_type(param, "integer"))?)
        }
        (ParameterType::Boolean, Value::Bool(_)) => None,
        (ParameterType::Boolean, Value::String(s)) => {
            Some(s.parse::<bool>().map(Value::Bool).map_err(|_| invalid_type(param, "boolean"))?)
        }
        (ParameterType::Array, Value::Array(_)) => None,
        (ParameterType::Object, Value::Object(_)) => None,
        (ParameterType::Integer, Value::Number(_)) => return Err(invalid_type(param, "integer")),
        _ => return Err(invalid_type(param, type_name(&param.r#type))),
    };
    if let Some(c) = coerced {
        *value = c;
    }
    Ok(())
}

fn invalid_type(param: &ParameterConfig, expected: &str) -> CoreError {
    CoreError::Validation(format!("parameter '{}' must be a {expected}", param.name))
}

fn type_name(t: &ParameterType) -> &'static str {
    match t {
        ParameterType::String => "string",
        ParameterType::Number => "number",
        ParameterType::Integer => "integer",
        ParameterType::Boolean => "boolean",
        ParameterType::Array => "array",
        ParameterType::Object => "object",
    }
}

fn json_scalar_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

fn validate_value(value: &serde_json::Value, param: &ParameterConfig) -> Result<(), CoreError> {
    let v = &param.validation;

    if let Some(s) = value.as_str() {
        if let Some(min) = v.min_length {
            if s.len() < min {
                return Err(CoreError::Validation(format!(
                    "parameter '{}' must be at least {min} characters",
                    param.name
                )));
            }
        }
        if let Some(max) = v.max_length {
            if s.len() > max {
                return Err(CoreError::Validation(format!(
                    "parameter '{}' must be at most {max} characters",
                    param.name
                )));
            }
        }
        if let Some(pattern) = &v.pattern {
            let re = regex::Regex::new(pattern)
                .map_err(|e| CoreError::Configuration(format!("invalid pattern for '{}': {e}", param.name)))?;
            if !re.is_match(s) {
                return Err(CoreError::Validation(format!(
                    "parameter '{}' does not match the required pattern",
                    param.name
                )));
            }
        }
        if !v.r#enum.is_empty() && !v.r#enum.iter().any(|e| e == s) {
            return Err(CoreError::Validation(format!(
                "parameter '{}' must be one of: {}",
                param.name,
                v.r#enum.join(", ")
            )));
        }
    }

    if let Some(n) = value.as_f64() {
        if let Some(min) = v.min_value {
            if n < min {
                return Err(CoreError::Validation(format!("parameter '{}' must be >= {min}", param.name)));
            }
        }
        if let Some(max) = v.max_value {
            if n > max {
                return Err(CoreError::Validation(format!("parameter '{}' must be <= {max}", param.name)));
            }
        }
    }

    Ok(())
}

fn substitute_time_tokens(value: serde_json::Value, now: DateTime<Utc>) -> Result<serde_json::Value, CoreError> {
    match value {
        serde_json::Value::String(s) => Ok(serde_json::Value::String(timetoken::substitute(&s, now)?)),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::service::ParameterValidation;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn string_param(name: &str, required: bool) -> ParameterConfig {
        ParameterConfig {
            name: name.to_string(),
            alias: None,
            prefix: None,
            description: String::new(),
            r#type: ParameterType::String,
            required,
            location: ParameterLocation::Query,
            default: None,
            validation: ParameterValidation::default(),
            examples: vec![],
            transform: None,
            quoted: false,
            r#static: false,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 27, 12, 0, 0).unwrap()
    }

    #[test]
    fn missing_required_parameter_errors() {
        let params = vec![string_param("q", true)];
        let invocation = HashMap::new();
        assert!(bind(&params, &invocation, now()).is_err());
    }

    #[test]
    fn static_parameter_ignores_caller_value() {
        let mut param = string_param("region", false);
        param.r#static = true;
        param.default = Some(serde_json::json!("us-east-1"));
        let mut invocation = HashMap::new();
        invocation.insert("region".to_string(), serde_json::json!("eu-west-1"));
        let bound = bind(&[param], &invocation, now()).unwrap();
        assert_eq!(bound[0].value, serde_json::json!("us-east-1"));
    }

    #[test]
    fn time_token_substitution_applies_to_string_values() {
        let param = string_param("since", false);
        let mut invocation = HashMap::new();
        invocation.insert("since".to_string(), serde_json::json!("#DAYS-1"));
        let bound = bind(&[param], &invocation, now()).unwrap();
        assert!(bound[0].value.as_str().unwrap().starts_with("2026-07-26T00:00:00"));
    }

    #[test]
    fn boolean_coercion_from_string() {
        let mut param = string_param("verbose", false);
        param.r#type = ParameterType::Boolean;
        let mut invocation = HashMap::new();
        invocation.insert("verbose".to_string(), serde_json::json!("true"));
        let bound = bind(&[param], &invocation, now()).unwrap();
        assert_eq!(bound[0].value, serde_json::json!(true));
    }

    #[test]
    fn enum_validation_rejects_out_of_set_value() {
        let mut param = string_param("mode", false);
        param.validation.r#enum = vec!["fast".to_string(), "slow".to_string()];
        let mut invocation = HashMap::new();
        invocation.insert("mode".to_string(), serde_json::json!("medium"));
        assert!(bind(&[param], &invocation, now()).is_err());
    }

    proptest::proptest! {
        /// Binding never panics and, for a string param with no validation
        /// and no time tokens in play, returns the input value unchanged.
        #[test]
        fn unconstrained_string_param_binds_verbatim(value in "[a-zA-Z0-9 ]{0,64}") {
            let param = string_param("q", false);
            let mut invocation = HashMap::new();
            invocation.insert("q".to_string(), serde_json::json!(value));
            let bound = bind(&[param], &invocation, now()).unwrap();
            prop_assert_eq!(bound[0].value, serde_json::json!(value));
        }

        /// A `max_length` constraint rejects every string longer than the
        /// limit and accepts every string at or under it.
        #[test]
        fn max_length_validation_matches_string_len(len in 0usize..20, max in 0usize..20) {
            let mut param = string_param("q", false);
            param.validation.max_length = Some(max);
            let value = "a".repeat(len);
            let mut invocation = HashMap::new();
            invocation.insert("q".to_string(), serde_json::json!(value));
            let result = bind(&[param], &invocation, now());
            prop_assert_eq!(result.is_ok(), len <= max);
        }
    }
}
