//! The central Model Context Protocol engine
//!
//! Decodes JSON-RPC payloads (single messages and batches), negotiates the protocol
//! version on `initialize`, and routes tool, resource and prompt methods to the registry.
//! Every transport funnels its raw payloads through [`handle_json_rpc_payload`].

use rust_mcp_sdk::schema::{
    CallToolRequest, Implementation, InitializeRequest, InitializeResult, JsonrpcMessage,
    JsonrpcRequest, ListPromptsRequest, ListResourceTemplatesRequest, ListResourcesRequest,
    ListResourcesResult, ListToolsRequest, PingRequest, ReadResourceRequest, ServerCapabilities,
    ServerCapabilitiesPrompts, ServerCapabilitiesResources, ServerCapabilitiesTools,
};
use serde_json::{json, Value};
use tracing::info;

use crate::domain::utils::{SERVER_DISPLAY_NAME, SERVER_INSTRUCTIONS};
use crate::mcp::{
    prompts::{build_prompts_list, handle_prompts_get},
    resources::{build_resource_templates_list, build_resources_list, handle_resources_read},
    rpc::{
        app_error_to_json_rpc, is_json_rpc_error, json_rpc_error, json_rpc_result,
        request_id_to_value, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR,
    },
    tools::{build_tools_list, handle_tools_call},
};
use crate::{errors::AppError, AppState};

pub const SUPPORTED_PROTOCOL_VERSIONS: [&str; 3] = ["2025-06-18", "2025-03-26", "2024-11-05"];

/// Handles one raw transport payload. `None` means there is nothing to send back, which
/// happens when the payload only carried notifications.
pub fn handle_json_rpc_payload(state: &AppState, body: &[u8]) -> Option<Value> {
    let payload: Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(_) => return Some(json_rpc_error(None, PARSE_ERROR, "Parse error")),
    };

    let Some(batch) = payload.as_array() else {
        return handle_json_rpc_value(state, payload);
    };

    if batch.is_empty() {
        return Some(Value::Array(vec![json_rpc_error(
            None,
            INVALID_REQUEST,
            "Invalid Request",
        )]));
    }

    let responses: Vec<Value> = batch
        .iter()
        .filter_map(|item| handle_json_rpc_value(state, item.clone()))
        .collect();

    if responses.is_empty() {
        None
    } else {
        Some(Value::Array(responses))
    }
}

pub fn handle_json_rpc_value(state: &AppState, payload: Value) -> Option<Value> {
    if !payload.is_object() {
        return Some(json_rpc_error(None, INVALID_REQUEST, "Invalid Request"));
    }

    let request_id = payload.get("id").cloned();
    let parsed: JsonrpcMessage = match serde_json::from_value(payload) {
        Ok(message) => message,
        Err(_) => return Some(json_rpc_error(request_id, INVALID_REQUEST, "Invalid Request")),
    };

    match parsed {
        JsonrpcMessage::Request(request) => {
            if let Err(error_response) = validate_request_shape(&request) {
                return Some(error_response);
            }

            let request_id = request_id_to_value(request.id);
            if request.method.trim().is_empty() {
                return Some(json_rpc_error(
                    Some(request_id),
                    INVALID_REQUEST,
                    "Invalid Request",
                ));
            }

            Some(handle_json_rpc_request(
                state,
                Some(request_id),
                request.method,
                request.params.map(Value::Object),
            ))
        }
        JsonrpcMessage::Notification(notification) => {
            if notification.method.trim().is_empty() {
                return None;
            }

            let _ = handle_json_rpc_request(
                state,
                None,
                notification.method,
                notification.params.map(Value::Object),
            );
            None
        }
        JsonrpcMessage::ResultResponse(_) | JsonrpcMessage::ErrorResponse(_) => {
            Some(json_rpc_error(request_id, INVALID_REQUEST, "Invalid Request"))
        }
    }
}

pub fn validate_request_shape(request: &JsonrpcRequest) -> Result<(), Value> {
    let payload = serde_json::to_value(request).expect("jsonrpc request serialization");
    let request_id = Some(request_id_to_value(request.id.clone()));

    let valid = match request.method.as_str() {
        "tools/call" => serde_json::from_value::<CallToolRequest>(payload).is_ok(),
        "resources/read" => serde_json::from_value::<ReadResourceRequest>(payload).is_ok(),
        "tools/list" => serde_json::from_value::<ListToolsRequest>(payload).is_ok(),
        "resources/list" => serde_json::from_value::<ListResourcesRequest>(payload).is_ok(),
        "resources/templates/list" => {
            serde_json::from_value::<ListResourceTemplatesRequest>(payload).is_ok()
        }
        "prompts/list" => serde_json::from_value::<ListPromptsRequest>(payload).is_ok(),
        "ping" => serde_json::from_value::<PingRequest>(payload).is_ok(),
        "initialize" => serde_json::from_value::<InitializeRequest>(payload).is_ok(),
        _ => true,
    };

    if valid {
        Ok(())
    } else {
        Err(json_rpc_error(request_id, INVALID_PARAMS, "Invalid params"))
    }
}

pub fn handle_json_rpc_request(
    state: &AppState,
    id: Option<Value>,
    method: String,
    params: Option<Value>,
) -> Value {
    let audit_params = redact_audit_params(params.as_ref());

    let response = match method.as_str() {
        "initialize" => {
            let protocol_version = match negotiate_protocol_version(params.as_ref()) {
                Ok(version) => version,
                Err(err) => return app_error_to_json_rpc(id, err),
            };

            let initialize_result = InitializeResult {
                server_info: Implementation {
                    name: env!("CARGO_PKG_NAME").to_string(),
                    version: env!("CARGO_PKG_VERSION").to_string(),
                    title: Some(SERVER_DISPLAY_NAME.to_string()),
                    description: None,
                    icons: vec![],
                    website_url: None,
                },
                capabilities: ServerCapabilities {
                    tools: Some(ServerCapabilitiesTools {
                        list_changed: Some(false),
                    }),
                    resources: Some(ServerCapabilitiesResources {
                        subscribe: Some(false),
                        list_changed: Some(false),
                    }),
                    prompts: Some(ServerCapabilitiesPrompts {
                        list_changed: Some(false),
                    }),
                    ..Default::default()
                },
                protocol_version: protocol_version.to_string(),
                instructions: Some(SERVER_INSTRUCTIONS.to_string()),
                meta: None,
            };

            json_rpc_result(
                id,
                serde_json::to_value(initialize_result).expect("initialize result serialization"),
            )
        }
        "ping" => json_rpc_result(id, json!({})),
        "tools/list" => json_rpc_result(id, build_tools_list(state)),
        "tools/call" => handle_tools_call(state, id, params),
        "resources/list" => json_rpc_result(
            id,
            serde_json::to_value(ListResourcesResult {
                meta: None,
                next_cursor: None,
                resources: build_resources_list(state),
            })
            .expect("resources list result serialization"),
        ),
        "resources/templates/list" => json_rpc_result(id, build_resource_templates_list(state)),
        "resources/read" => handle_resources_read(state, id, params),
        "prompts/list" => json_rpc_result(id, build_prompts_list(state)),
        "prompts/get" => handle_prompts_get(state, id, params),
        notification if notification.starts_with("notifications/") => {
            json_rpc_result(id, json!({}))
        }
        _ => json_rpc_error(id, METHOD_NOT_FOUND, "Method not found"),
    };

    info!(
        method = %method,
        params = %audit_params,
        outcome = if is_json_rpc_error(&response) { "failure" } else { "success" },
        "mcp action audited"
    );

    response
}

/// Echoes the client's protocol version when it is one this server speaks.
pub fn negotiate_protocol_version(params: Option<&Value>) -> Result<&'static str, AppError> {
    let offered_version = params
        .and_then(Value::as_object)
        .and_then(|object| object.get("protocolVersion"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|version| !version.is_empty())
        .ok_or_else(|| {
            AppError::bad_request(
                "invalid_protocol_version",
                "initialize params.protocolVersion is required",
            )
        })?;

    SUPPORTED_PROTOCOL_VERSIONS
        .into_iter()
        .find(|version| *version == offered_version)
        .ok_or_else(|| {
            AppError::bad_request(
                "unsupported_protocol_version",
                "unsupported initialize protocolVersion",
            )
        })
}

pub fn redact_audit_params(params: Option<&Value>) -> Value {
    params.map(redact_audit_value).unwrap_or(Value::Null)
}

pub fn redact_audit_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, item)| {
                    if is_sensitive_key(key) {
                        (key.clone(), Value::String("[REDACTED]".to_string()))
                    } else {
                        (key.clone(), redact_audit_value(item))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact_audit_value).collect()),
        _ => value.clone(),
    }
}

pub fn is_sensitive_key(key: &str) -> bool {
    let normalized = key.trim().to_ascii_lowercase();
    matches!(
        normalized.as_str(),
        "authorization" | "bearer" | "credentials" | "credential" | "api_key" | "apikey"
    ) || normalized.contains("token")
        || normalized.contains("secret")
        || normalized.contains("password")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::domain::build_registry;
    use crate::registry::DuplicatePolicy;

    fn state() -> AppState {
        AppState::new(Arc::new(
            build_registry(DuplicatePolicy::Reject).expect("catalog registers"),
        ))
    }

    fn call(payload: Value) -> Value {
        handle_json_rpc_payload(&state(), payload.to_string().as_bytes()).expect("response")
    }

    #[test]
    fn redacts_sensitive_fields_in_audit_params() {
        let params = json!({
            "name": "format_json",
            "arguments": {
                "data": "{}",
                "token": "should-not-appear",
                "api_key": "should-not-appear",
                "nested": {
                    "secret": "should-not-appear"
                }
            }
        });

        let redacted = redact_audit_params(Some(&params));

        assert_eq!(redacted["name"], json!("format_json"));
        assert_eq!(redacted["arguments"]["data"], json!("{}"));
        assert_eq!(redacted["arguments"]["token"], json!("[REDACTED]"));
        assert_eq!(redacted["arguments"]["api_key"], json!("[REDACTED]"));
        assert_eq!(
            redacted["arguments"]["nested"]["secret"],
            json!("[REDACTED]")
        );
    }

    #[test]
    fn negotiate_protocol_version_accepts_supported_versions() {
        for supported in SUPPORTED_PROTOCOL_VERSIONS {
            let params = json!({ "protocolVersion": supported });
            let version = negotiate_protocol_version(Some(&params)).expect("supported version");
            assert_eq!(version, supported);
        }
    }

    #[test]
    fn negotiate_protocol_version_rejects_unsupported_version() {
        let params = json!({
            "protocolVersion": "2026-01-01"
        });

        let error =
            negotiate_protocol_version(Some(&params)).expect_err("unsupported version must fail");
        assert!(error.to_string().contains("bad request"));
    }

    #[test]
    fn tools_call_add_returns_sum() {
        let response = call(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "tools/call",
            "params": {"name": "add", "arguments": {"a": 2, "b": 3}}
        }));

        assert_eq!(response["result"]["content"][0]["text"], "5");
        assert_eq!(response["result"]["structuredContent"]["result"], 5);
    }

    #[test]
    fn tools_call_word_count_returns_object_as_structured_content() {
        let response = call(json!({
            "jsonrpc": "2.0",
            "id": 2,
            "method": "tools/call",
            "params": {"name": "word_count", "arguments": {"text": "a b\nc"}}
        }));

        assert_eq!(
            response["result"]["structuredContent"],
            json!({"characters": 5, "words": 2, "lines": 2})
        );
    }

    #[test]
    fn tools_call_hard_failure_sets_is_error() {
        let response = call(json!({
            "jsonrpc": "2.0",
            "id": 3,
            "method": "tools/call",
            "params": {"name": "calculate", "arguments": {"expression": "1 / 0"}}
        }));

        assert_eq!(response["result"]["isError"], true);
        let text = response["result"]["content"][0]["text"]
            .as_str()
            .expect("text content");
        assert!(text.contains("division by zero"));
    }

    #[test]
    fn tools_call_soft_failure_is_a_normal_result() {
        let response = call(json!({
            "jsonrpc": "2.0",
            "id": 4,
            "method": "tools/call",
            "params": {"name": "format_json", "arguments": {"data": "not json"}}
        }));

        assert!(response.get("error").is_none());
        assert!(response["result"].get("isError").map_or(true, |flag| flag != true));
        let text = response["result"]["content"][0]["text"]
            .as_str()
            .expect("text content");
        assert!(text.starts_with("Error: Invalid JSON"));
    }

    #[test]
    fn tools_call_missing_argument_names_parameter() {
        let response = call(json!({
            "jsonrpc": "2.0",
            "id": 5,
            "method": "tools/call",
            "params": {"name": "reverse_string", "arguments": {}}
        }));

        assert_eq!(response["error"]["code"], INVALID_PARAMS);
        assert_eq!(response["error"]["data"]["code"], "missing_argument");
        assert_eq!(response["error"]["data"]["details"]["parameter"], "text");
    }

    #[test]
    fn prompts_get_renders_with_string_arguments() {
        let response = call(json!({
            "jsonrpc": "2.0",
            "id": 6,
            "method": "prompts/get",
            "params": {
                "name": "summarize_text_prompt",
                "arguments": {"text": "hello", "max_sentences": "2"}
            }
        }));

        assert_eq!(response["result"]["messages"][0]["role"], "user");
        let text = response["result"]["messages"][0]["content"]["text"]
            .as_str()
            .expect("prompt text");
        assert!(text.contains("no more than 2 sentences"));
    }

    #[test]
    fn prompts_get_unknown_prompt_is_not_found() {
        let response = call(json!({
            "jsonrpc": "2.0",
            "id": 7,
            "method": "prompts/get",
            "params": {"name": "missing_prompt"}
        }));

        assert_eq!(response["error"]["code"], METHOD_NOT_FOUND);
        assert_eq!(response["error"]["data"]["code"], "prompt_not_found");
    }

    #[test]
    fn prompts_list_marks_required_arguments() {
        let response = call(json!({
            "jsonrpc": "2.0",
            "id": 8,
            "method": "prompts/list",
            "params": {}
        }));

        let prompts = response["result"]["prompts"]
            .as_array()
            .expect("prompt list");
        assert_eq!(prompts.len(), 3);
        assert_eq!(prompts[0]["name"], "code_review_prompt");
        assert_eq!(prompts[0]["arguments"][0]["name"], "code");
        assert_eq!(prompts[0]["arguments"][0]["required"], true);
        assert_eq!(prompts[0]["arguments"][1]["required"], false);
    }

    #[test]
    fn resources_read_user_template_extracts_id() {
        let response = call(json!({
            "jsonrpc": "2.0",
            "id": 9,
            "method": "resources/read",
            "params": {"uri": "user://42/info"}
        }));

        assert_eq!(response["result"]["contents"][0]["uri"], "user://42/info");
        let text = response["result"]["contents"][0]["text"]
            .as_str()
            .expect("text content");
        let content: Value = serde_json::from_str(text).expect("json resource");
        assert_eq!(content["user_id"], "42");
    }

    #[test]
    fn resources_templates_list_contains_user_pattern() {
        let response = call(json!({
            "jsonrpc": "2.0",
            "id": 10,
            "method": "resources/templates/list",
            "params": {}
        }));

        assert_eq!(
            response["result"]["resourceTemplates"][0]["uriTemplate"],
            "user://{user_id}/info"
        );
        assert_eq!(
            response["result"]["resourceTemplates"]
                .as_array()
                .map(Vec::len),
            Some(1)
        );
    }

    #[test]
    fn initialized_notification_produces_no_response() {
        let response = handle_json_rpc_payload(
            &state(),
            br#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
        );
        assert!(response.is_none());
    }

    #[test]
    fn empty_batch_is_invalid_request() {
        let response = handle_json_rpc_payload(&state(), b"[]").expect("error response");
        assert_eq!(response[0]["error"]["code"], INVALID_REQUEST);
    }
}
