//! `prompts/list` and `prompts/get` over the registry's templates

use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::mcp::rpc::{app_error_to_json_rpc, json_rpc_error, json_rpc_result, INVALID_PARAMS};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct GetPromptParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Option<Map<String, Value>>,
}

pub fn build_prompts_list(state: &AppState) -> Value {
    let prompts: Vec<Value> = state
        .registry
        .templates()
        .iter()
        .map(|template| {
            let arguments: Vec<Value> = template
                .params
                .iter()
                .map(|param| {
                    let mut argument = json!({
                        "name": param.name,
                        "required": param.is_required(),
                    });
                    if let Some(description) = &param.description {
                        argument["description"] = json!(description);
                    }
                    argument
                })
                .collect();

            json!({
                "name": template.name,
                "description": template.description,
                "arguments": arguments,
            })
        })
        .collect();

    json!({ "prompts": prompts })
}

pub fn handle_prompts_get(state: &AppState, id: Option<Value>, params: Option<Value>) -> Value {
    let Some(raw_params) = params else {
        return json_rpc_error(id, INVALID_PARAMS, "Invalid params");
    };

    let prompt_get: GetPromptParams = match serde_json::from_value(raw_params) {
        Ok(value) => value,
        Err(_) => return json_rpc_error(id, INVALID_PARAMS, "Invalid params"),
    };

    let arguments = prompt_get.arguments.unwrap_or_default();
    match state.registry.render_template(&prompt_get.name, &arguments) {
        Ok(text) => {
            let description = state
                .registry
                .template(&prompt_get.name)
                .map(|template| template.description.clone());

            json_rpc_result(
                id,
                json!({
                    "description": description,
                    "messages": [{
                        "role": "user",
                        "content": {
                            "type": "text",
                            "text": text,
                        }
                    }]
                }),
            )
        }
        Err(err) => app_error_to_json_rpc(id, err),
    }
}
