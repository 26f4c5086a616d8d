//! Argv/env/stdin composition.

use mcpfusion_config::binding::BoundParameter;
use mcpfusion_config::domains::service::ParameterLocation;
use std::collections::HashMap;

/// The fully composed shape a [`crate::execute::run`] call needs, independent
/// of the control fields (`executable`, `use_shell`, ...) which come straight
/// from `CommandGroupConfig`.
#[derive(Debug, Clone, Default)]
pub struct ComposedInvocation {
    pub argv: Vec<String>,
    pub env: HashMap<String, String>,
    pub stdin: Option<String>,
}

/// Turns bound parameters into argv/env/stdin. `bound` parameters of
/// location `Path`, `Query`, `Header`, `Body` belong to the request pipeline,
/// not here — callers pass only the command-relevant subset (in practice all
/// of a `CommandGroupConfig`'s parameters, since its location set excludes
/// those).
pub fn compose(bound: &[BoundParameter]) -> ComposedInvocation {
    let mut argv = Vec::new();
    let mut env = HashMap::new();
    let mut stdin_parts = Vec::new();

    for param in bound {
        match param.location {
            ParameterLocation::Argument => {
                if let Some(true) = param.value.as_bool() {
                    argv.push(param.prefix.clone().unwrap_or_else(|| param.upstream_name.clone()));
                } else if !param.value.is_boolean() {
                    push_value_arg(&mut argv, param);
                }
            }
            ParameterLocation::Arglist => {
                if let Some(elements) = param.value.as_array() {
                    for element in elements {
                        argv.push(scalar_to_string(element));
                    }
                }
            }
            ParameterLocation::Environment => {
                env.insert(param.upstream_name.clone(), scalar_to_string(&param.value));
            }
            ParameterLocation::Stdin => {
                stdin_parts.push(scalar_to_string(&param.value));
            }
            // Control-location parameters are config-driven overrides handled
            // by the caller before composition; path/query/header/body belong
            // to the request pipeline and never appear in a command's params.
            ParameterLocation::Control
            | ParameterLocation::Path
            | ParameterLocation::Query
            | ParameterLocation::Header
            | ParameterLocation::Body => {}
        }
    }

    ComposedInvocation {
        argv,
        env,
        stdin: if stdin_parts.is_empty() { None } else { Some(stdin_parts.concat()) },
    }
}

fn push_value_arg(argv: &mut Vec<String>, param: &BoundParameter) {
    let rendered = scalar_to_string(&param.value);
    let rendered = if param.quoted { format!("\"{rendered}\"") } else { rendered };
    match &param.prefix {
        Some(prefix) => {
            argv.push(prefix.clone());
            argv.push(rendered);
        }
        None => argv.push(rendered),
    }
}

fn scalar_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn param(location: ParameterLocation, name: &str, prefix: Option<&str>, value: serde_json::Value) -> BoundParameter {
        BoundParameter {
            upstream_name: name.to_string(),
            location,
            prefix: prefix.map(str::to_string),
            quoted: false,
            value,
        }
    }

    #[test]
    fn boolean_true_emits_bare_flag() {
        let bound = vec![param(ParameterLocation::Argument, "verbose", Some("--verbose"), json!(true))];
        let composed = compose(&bound);
        assert_eq!(composed.argv, vec!["--verbose".to_string()]);
    }

    #[test]
    fn boolean_false_emits_nothing() {
        let bound = vec![param(ParameterLocation::Argument, "verbose", Some("--verbose"), json!(false))];
        let composed = compose(&bound);
        assert!(composed.argv.is_empty());
    }

    #[test]
    fn prefixed_value_emits_prefix_then_value() {
        let bound = vec![param(ParameterLocation::Argument, "ports", Some("-p"), json!("80,443"))];
        let composed = compose(&bound);
        assert_eq!(composed.argv, vec!["-p".to_string(), "80,443".to_string()]);
    }

    #[test]
    fn unprefixed_value_emits_bare_value() {
        let bound = vec![param(ParameterLocation::Argument, "target", None, json!("example.com"))];
        let composed = compose(&bound);
        assert_eq!(composed.argv, vec!["example.com".to_string()]);
    }

    #[test]
    fn arglist_emits_each_element_separately() {
        let bound = vec![param(ParameterLocation::Arglist, "files", None, json!(["a.txt", "b.txt"]))];
        let composed = compose(&bound);
        assert_eq!(composed.argv, vec!["a.txt".to_string(), "b.txt".to_string()]);
    }

    #[test]
    fn environment_parameters_populate_env_map() {
        let bound = vec![param(ParameterLocation::Environment, "API_KEY", None, json!("s3cr3t"))];
        let composed = compose(&bound);
        assert_eq!(composed.env.get("API_KEY"), Some(&"s3cr3t".to_string()));
    }

    #[test]
    fn stdin_parameters_concatenate() {
        let bound = vec![
            param(ParameterLocation::Stdin, "line1", None, json!("hello ")),
            param(ParameterLocation::Stdin, "line2", None, json!("world")),
        ];
        let composed = compose(&bound);
        assert_eq!(composed.stdin.as_deref(), Some("hello world"));
    }
}
