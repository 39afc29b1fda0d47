//! `resources/*` methods over the registry's data sources
//!
//! Literal data sources are listed as resources, parameterized ones as resource templates.
//! Both are read through the same URI resolution.

use rust_mcp_sdk::schema::{
    ReadResourceContent, ReadResourceRequestParams, ReadResourceResult, Resource,
    TextResourceContents,
};
use serde_json::{json, Value};

use crate::mcp::rpc::{app_error_to_json_rpc, json_rpc_error, json_rpc_result, INVALID_PARAMS};
use crate::AppState;

pub fn build_resources_list(state: &AppState) -> Vec<Resource> {
    state
        .registry
        .data_sources()
        .iter()
        .filter(|entry| entry.pattern.is_literal())
        .map(|entry| Resource {
            annotations: None,
            description: Some(entry.source.description.clone()),
            icons: vec![],
            meta: None,
            mime_type: Some(entry.source.mime_type.clone()),
            name: entry.source.name.clone(),
            size: None,
            title: None,
            uri: entry.pattern.as_str().to_string(),
        })
        .collect()
}

pub fn build_resource_templates_list(state: &AppState) -> Value {
    let templates: Vec<Value> = state
        .registry
        .data_sources()
        .iter()
        .filter(|entry| !entry.pattern.is_literal())
        .map(|entry| {
            json!({
                "uriTemplate": entry.pattern.as_str(),
                "name": entry.source.name,
                "description": entry.source.description,
                "mimeType": entry.source.mime_type,
            })
        })
        .collect();

    json!({ "resourceTemplates": templates })
}

pub fn handle_resources_read(state: &AppState, id: Option<Value>, params: Option<Value>) -> Value {
    let Some(raw_params) = params else {
        return json_rpc_error(id, INVALID_PARAMS, "Invalid params");
    };

    let resource_read: ReadResourceRequestParams = match serde_json::from_value(raw_params) {
        Ok(value) => value,
        Err(_) => return json_rpc_error(id, INVALID_PARAMS, "Invalid params"),
    };

    match state.registry.resolve_data_source(&resource_read.uri) {
        Ok(resolved) => {
            let result = serde_json::to_value(ReadResourceResult {
                contents: vec![ReadResourceContent::from(TextResourceContents {
                    meta: None,
                    mime_type: Some(resolved.mime_type.clone()),
                    text: resolved.text(),
                    uri: resolved.uri.clone(),
                })],
                meta: None,
            })
            .expect("read resource result serialization");

            json_rpc_result(id, result)
        }
        Err(err) => app_error_to_json_rpc(id, err),
    }
}
