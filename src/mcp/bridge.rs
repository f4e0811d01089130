// Translation from MCP tool descriptors to the function-calling schema
// understood by OpenAI-compatible completion endpoints. Pure functions only.

use super::types::ToolDescriptor;
use crate::gateway::types::{FunctionDefinition, ToolDefinition};
use serde_json::{json, Value};

/// Schema used when a tool advertises no `inputSchema`
pub fn empty_parameters() -> Value {
    json!({
        "type": "object",
        "properties": {}
    })
}

/// Convert descriptors to function schemas, preserving order
pub fn to_function_schemas(tools: &[ToolDescriptor]) -> Vec<ToolDefinition> {
    tools
        .iter()
        .map(|tool| ToolDefinition {
            r#type: "function".to_string(),
            function: FunctionDefinition {
                name: tool.name.clone(),
                description: tool.description.clone().unwrap_or_default(),
                parameters: tool.input_schema.clone().unwrap_or_else(empty_parameters),
            },
        })
        .collect()
}

/// One line per tool for the system prompt:
/// `- name: description (Parameters: a, b)`
pub fn describe_tools(tools: &[ToolDescriptor]) -> String {
    if tools.is_empty() {
        return "No tools available".to_string();
    }

    tools
        .iter()
        .map(|tool| {
            let description = tool
                .description
                .as_deref()
                .filter(|d| !d.is_empty())
                .unwrap_or("No description available");
            let mut line = format!("- {}: {}", tool.name, description);

            let params: Vec<&str> = tool
                .input_schema
                .as_ref()
                .and_then(|schema| schema.get("properties"))
                .and_then(Value::as_object)
                .map(|props| props.keys().map(String::as_str).collect())
                .unwrap_or_default();
            if !params.is_empty() {
                line.push_str(&format!(" (Parameters: {})", params.join(", ")));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo_tool() -> ToolDescriptor {
        ToolDescriptor {
            name: "echo".to_string(),
            description: Some("Echoes input".to_string()),
            input_schema: Some(json!({"properties": {"text": {"type": "string"}}})),
        }
    }

    #[test]
    fn test_schema_is_passed_through_verbatim() {
        let schemas = to_function_schemas(&[echo_tool()]);

        assert_eq!(schemas.len(), 1);
        assert_eq!(schemas[0].r#type, "function");
        assert_eq!(schemas[0].function.name, "echo");
        assert_eq!(schemas[0].function.description, "Echoes input");
        assert_eq!(
            schemas[0].function.parameters,
            json!({"properties": {"text": {"type": "string"}}})
        );
    }

    #[test]
    fn test_missing_fields_get_empty_defaults() {
        let bare = ToolDescriptor {
            name: "ping".to_string(),
            description: None,
            input_schema: None,
        };

        let schemas = to_function_schemas(&[bare]);
        assert_eq!(schemas[0].function.description, "");
        assert_eq!(schemas[0].function.parameters, empty_parameters());

        // parameters must be present on the wire
        let wire = serde_json::to_value(&schemas[0]).unwrap();
        assert_eq!(wire["function"]["parameters"]["properties"], json!({}));
    }

    #[test]
    fn test_order_is_preserved() {
        let tools: Vec<ToolDescriptor> = ["zeta", "alpha", "mid"]
            .iter()
            .map(|name| ToolDescriptor {
                name: name.to_string(),
                description: None,
                input_schema: None,
            })
            .collect();

        let names: Vec<String> = to_function_schemas(&tools)
            .into_iter()
            .map(|t| t.function.name)
            .collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_describe_tools() {
        let bare = ToolDescriptor {
            name: "ping".to_string(),
            description: Some(String::new()),
            input_schema: None,
        };

        assert_eq!(
            describe_tools(&[echo_tool(), bare]),
            "- echo: Echoes input (Parameters: text)\n- ping: No description available"
        );
        assert_eq!(describe_tools(&[]), "No tools available");
    }
}
