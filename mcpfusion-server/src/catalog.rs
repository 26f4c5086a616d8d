//! Tool Catalog: synthesizes one tool definition per endpoint and
//! per command group, plus the built-in knowledge tools, from the currently
//! installed config graph. Names follow the fixed rule
//! `{service_key}_{endpoint_id}` / `command_{command_id}`; parameters marked
//! `static` or located at `control` never appear in the exposed schema since
//! callers can't (and shouldn't) supply them.

use mcpfusion_config::{
    CommandGroupConfig, EndpointConfig, McpFusionConfig, ParameterConfig, ParameterLocation,
    ParameterType, ServiceConfig,
};
use std::collections::HashMap;

/// What a synthesized tool dispatches to.
#[derive(Debug, Clone)]
pub enum ToolKind {
    Endpoint { service_key: String, endpoint_id: String },
    Command { command_id: String },
    Knowledge(KnowledgeOp),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnowledgeOp {
    Set,
    Get,
    Delete,
}

/// One catalog entry: everything a tool provider needs to describe and
/// dispatch a tool, independent of any particular wire protocol.
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
    pub requires_auth: bool,
    pub kind: ToolKind,
}

/// The full set of tools synthesized from one config graph.
#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    tools: HashMap<String, ToolDefinition>,
}

impl ToolCatalog {
    pub fn build(config: &McpFusionConfig) -> Self {
        let mut tools = HashMap::new();

        for (service_key, service) in &config.services {
            for endpoint in &service.endpoints {
                let name = format!("{service_key}_{}", endpoint.id);
                let definition = build_endpoint_tool(&name, service_key, service, endpoint);
                tools.insert(name, definition);
            }
        }

        for (command_key, command) in &config.commands {
            let name = format!("command_{command_key}");
            let definition = build_command_tool(&name, command);
            tools.insert(name, definition);
        }

        for definition in knowledge_tools() {
            tools.insert(definition.name.clone(), definition);
        }

        Self { tools }
    }

    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.get(name)
    }

    pub fn list(&self) -> Vec<&ToolDefinition> {
        let mut tools: Vec<_> = self.tools.values().collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

fn build_endpoint_tool(name: &str, service_key: &str, service: &ServiceConfig, endpoint: &EndpointConfig) -> ToolDefinition {
    let description = if endpoint.description.is_empty() {
        format!("{} ({})", endpoint.name, service.name)
    } else {
        format!("{} ({}): {}", endpoint.name, service.name, endpoint.description)
    };
    let requires_auth = endpoint.auth.is_some() || service.auth.is_some();
    ToolDefinition {
        name: name.to_string(),
        description,
        input_schema: build_input_schema(&endpoint.parameters),
        requires_auth,
        kind: ToolKind::Endpoint {
            service_key: service_key.to_string(),
            endpoint_id: endpoint.id.clone(),
        },
    }
}

fn build_command_tool(name: &str, command: &CommandGroupConfig) -> ToolDefinition {
    let description = if command.description.is_empty() {
        command.name.clone()
    } else {
        format!("{}: {}", command.name, command.description)
    };
    ToolDefinition {
        name: name.to_string(),
        description,
        input_schema: build_input_schema(&command.parameters),
        requires_auth: false,
        kind: ToolKind::Command {
            command_id: command.id.clone(),
        },
    }
}

/// Builds a JSON Schema object from a parameter list, skipping `static` and
/// `control`-location parameters and folding each parameter's validation
/// constraints and examples into its description so a caller without access
/// to the config file can still discover valid values from the tool schema
/// alone.
fn build_input_schema(params: &[ParameterConfig]) -> serde_json::Value {
    let mut properties = serde_json::Map::new();
    let mut required = Vec::new();

    for param in params {
        if param.r#static || param.location == ParameterLocation::Control {
            continue;
        }
        let Some(alias) = param.resolved_alias() else {
            continue;
        };

        let mut property = serde_json::Map::new();
        property.insert("type".to_string(), serde_json::Value::String(json_schema_type(param.r#type).to_string()));
        property.insert("description".to_string(), serde_json::Value::String(describe(param)));

        if !param.validation.r#enum.is_empty() {
            property.insert(
                "enum".to_string(),
                serde_json::Value::Array(param.validation.r#enum.iter().cloned().map(serde_json::Value::String).collect()),
            );
        }
        if let Some(pattern) = &param.validation.pattern {
            property.insert("pattern".to_string(), serde_json::Value::String(pattern.clone()));
        }
        if !param.examples.is_empty() {
            property.insert("examples".to_string(), serde_json::Value::Array(param.examples.clone()));
        }
        if let Some(default) = &param.default {
            property.insert("default".to_string(), default.clone());
        }

        properties.insert(alias.clone(), serde_json::Value::Object(property));
        if param.required {
            required.push(serde_json::Value::String(alias));
        }
    }

    serde_json::json!({
        "type": "object",
        "properties": serde_json::Value::Object(properties),
        "required": required,
    })
}

/// Appends constraint/example prose to a parameter's declared description so
/// callers see bounds even though JSON Schema carries most of them structurally too.
fn describe(param: &ParameterConfig) -> String {
    let mut text = param.description.clone();
    let mut notes = Vec::new();

    if let Some(min) = param.validation.min_length {
        notes.push(format!("min length {min}"));
    }
    if let Some(max) = param.validation.max_length {
        notes.push(format!("max length {max}"));
    }
    if let Some(min) = param.validation.min_value {
        notes.push(format!("minimum {min}"));
    }
    if let Some(max) = param.validation.max_value {
        notes.push(format!("maximum {max}"));
    }
    if let Some(format) = &param.validation.format {
        notes.push(format!("format: {format}"));
    }

    if !notes.is_empty() {
        if !text.is_empty() {
            text.push(' ');
        }
        text.push('(');
        text.push_str(&notes.join(", "));
        text.push(')');
    }
    text
}

fn json_schema_type(t: ParameterType) -> &'static str {
    match t {
        ParameterType::String => "string",
        ParameterType::Number => "number",
        ParameterType::Integer => "integer",
        ParameterType::Boolean => "boolean",
        ParameterType::Array => "array",
        ParameterType::Object => "object",
    }
}

fn knowledge_tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "knowledge_set".to_string(),
            description: "Stores a value under a domain/key in the caller's knowledge store.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "domain": {"type": "string", "description": "Namespace the entry belongs to"},
                    "key": {"type": "string", "description": "Entry key, unique within domain"},
                    "content": {"type": "string", "description": "Value to store"},
                },
                "required": ["domain", "key", "content"],
            }),
            requires_auth: true,
            kind: ToolKind::Knowledge(KnowledgeOp::Set),
        },
        ToolDefinition {
            name: "knowledge_get".to_string(),
            description: "Reads one entry, lists a domain, or lists everything, depending on which of domain/key are given.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "domain": {"type": "string", "description": "Omit to list every domain"},
                    "key": {"type": "string", "description": "Omit to list every entry in the domain"},
                },
                "required": [],
            }),
            requires_auth: true,
            kind: ToolKind::Knowledge(KnowledgeOp::Get),
        },
        ToolDefinition {
            name: "knowledge_delete".to_string(),
            description: "Deletes one entry from the caller's knowledge store.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "domain": {"type": "string"},
                    "key": {"type": "string"},
                },
                "required": ["domain", "key"],
            }),
            requires_auth: true,
            kind: ToolKind::Knowledge(KnowledgeOp::Delete),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcpfusion_core::HttpMethod;

    fn sample_config() -> McpFusionConfig {
        let mut config = McpFusionConfig::default();
        config.services.insert(
            "github".to_string(),
            ServiceConfig {
                name: "GitHub".to_string(),
                base_url: "https://api.github.com".to_string(),
                auth: None,
                default_headers: Default::default(),
                endpoints: vec![EndpointConfig {
                    id: "get_repo".to_string(),
                    name: "Get repository".to_string(),
                    description: "Fetch one repository".to_string(),
                    method: HttpMethod::Get,
                    path: "/repos/{owner}/{repo}".to_string(),
                    base_url: None,
                    parameters: vec![],
                    auth: None,
                    body_template: None,
                    response: None,
                    pagination: None,
                    caching: None,
                    connection: Default::default(),
                }],
                response_defaults: None,
            },
        );
        config
    }

    #[test]
    fn synthesizes_endpoint_tool_with_naming_rule() {
        let catalog = ToolCatalog::build(&sample_config());
        assert!(catalog.get("github_get_repo").is_some());
    }

    #[test]
    fn registers_built_in_knowledge_tools() {
        let catalog = ToolCatalog::build(&McpFusionConfig::default());
        assert!(catalog.get("knowledge_set").is_some());
        assert!(catalog.get("knowledge_get").is_some());
        assert!(catalog.get("knowledge_delete").is_some());
    }

    #[test]
    fn static_and_control_parameters_are_excluded_from_schema() {
        let params = vec![
            ParameterConfig {
                name: "region".to_string(),
                alias: None,
                prefix: None,
                description: String::new(),
                r#type: ParameterType::String,
                required: false,
                location: ParameterLocation::Query,
                default: Some(serde_json::json!("us-east-1")),
                validation: Default::default(),
                examples: vec![],
                transform: None,
                quoted: false,
                r#static: true,
            },
            ParameterConfig {
                name: "owner".to_string(),
                alias: None,
                prefix: None,
                description: "Repo owner".to_string(),
                r#type: ParameterType::String,
                required: true,
                location: ParameterLocation::Path,
                default: None,
                validation: Default::default(),
                examples: vec![],
                transform: None,
                quoted: false,
                r#static: false,
            },
        ];
        let schema = build_input_schema(&params);
        let properties = schema["properties"].as_object().unwrap();
        assert!(!properties.contains_key("region"));
        assert!(properties.contains_key("owner"));
    }
}
