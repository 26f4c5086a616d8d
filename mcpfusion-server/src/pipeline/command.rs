//! Command pipeline dispatch: binds a command group's declared
//! parameters against a tool invocation, composes the subprocess argv/env/
//! stdin, launches it and formats the result for the caller.

use chrono::Utc;
use mcpfusion_command::{compose, format_outcome, run};
use mcpfusion_config::binding::bind;
use mcpfusion_config::CommandGroupConfig;
use mcpfusion_core::CoreError;
use serde_json::Value as JsonValue;
use std::collections::HashMap;

pub async fn dispatch_command(command: &CommandGroupConfig, invocation: &JsonValue) -> Result<JsonValue, CoreError> {
    let args = invocation_map(invocation);
    let bound = bind(&command.parameters, &args, Utc::now())?;
    let composed = compose(&bound);

    let outcome = run(command, &composed).await.map_err(CoreError::from)?;
    Ok(JsonValue::String(format_outcome(&outcome)))
}

fn invocation_map(invocation: &JsonValue) -> HashMap<String, JsonValue> {
    invocation
        .as_object()
        .map(|obj| obj.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo_command() -> CommandGroupConfig {
        serde_json::from_value(serde_json::json!({
            "id": "echo",
            "name": "Echo",
            "executable": "/bin/echo",
            "parameters": [
                {"name": "message", "type": "string", "required": true, "location": "arglist"}
            ]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn dispatches_and_formats_output() {
        let command = echo_command();
        let invocation = serde_json::json!({"message": "hi there"});
        let result = dispatch_command(&command, &invocation).await.unwrap();
        let text = result.as_str().unwrap();
        assert!(text.contains("Status: Success"));
        assert!(text.contains("hi there"));
    }

    #[tokio::test]
    async fn missing_required_parameter_is_rejected() {
        let command = echo_command();
        let result = dispatch_command(&command, &serde_json::json!({})).await;
        assert!(matches!(result, Err(CoreError::Validation(_))));
    }
}
