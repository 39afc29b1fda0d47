//! `tools/list` and `tools/call` over the registry's actions

use rust_mcp_sdk::schema::{CallToolRequestParams, CallToolResult, ContentBlock, TextContent};
use serde_json::{json, Map, Value};

use crate::errors::AppError;
use crate::mcp::rpc::{app_error_to_json_rpc, json_rpc_error, json_rpc_result, INVALID_PARAMS};
use crate::registry::signature::ParamSpec;
use crate::AppState;

/// JSON Schema object describing a capability signature.
pub fn input_schema(params: &[ParamSpec]) -> Value {
    let properties: Map<String, Value> = params
        .iter()
        .map(|param| {
            let mut property = json!({ "type": param.ty.schema_type() });
            if let Some(description) = &param.description {
                property["description"] = json!(description);
            }
            if let Some(default) = &param.default {
                property["default"] = default.clone();
            }
            (param.name.clone(), property)
        })
        .collect();
    let required: Vec<&str> = params
        .iter()
        .filter(|param| param.is_required())
        .map(|param| param.name.as_str())
        .collect();

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

pub fn build_tools_list(state: &AppState) -> Value {
    let tools: Vec<Value> = state
        .registry
        .actions()
        .iter()
        .map(|action| {
            json!({
                "name": action.name,
                "description": action.description,
                "inputSchema": input_schema(&action.params),
            })
        })
        .collect();

    json!({ "tools": tools })
}

pub fn handle_tools_call(state: &AppState, id: Option<Value>, params: Option<Value>) -> Value {
    let Some(raw_params) = params else {
        return json_rpc_error(id, INVALID_PARAMS, "Invalid params");
    };

    let tool_call: CallToolRequestParams = match serde_json::from_value(raw_params) {
        Ok(value) => value,
        Err(_) => return json_rpc_error(id, INVALID_PARAMS, "Invalid params"),
    };

    let arguments: Map<String, Value> =
        match serde_json::from_value(json!(tool_call.arguments.unwrap_or_default())) {
            Ok(value) => value,
            Err(_) => return json_rpc_error(id, INVALID_PARAMS, "Invalid params"),
        };

    let result = match state.registry.invoke_action(&tool_call.name, &arguments) {
        Ok(value) => CallToolResult {
            content: vec![ContentBlock::from(TextContent::new(
                content_text(&value),
                None,
                None,
            ))],
            is_error: None,
            meta: None,
            structured_content: Some(structured_content(value)),
        },
        Err(AppError::ActionFailed { message, .. }) => CallToolResult {
            content: vec![ContentBlock::from(TextContent::new(
                format!("Error: {message}"),
                None,
                None,
            ))],
            is_error: Some(true),
            meta: None,
            structured_content: None,
        },
        Err(err) => return app_error_to_json_rpc(id, err),
    };

    json_rpc_result(
        id,
        serde_json::to_value(result).expect("tool call result serialization"),
    )
}

fn content_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn structured_content(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => Map::from_iter([("result".to_string(), other)]),
    }
}
