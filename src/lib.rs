use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

pub mod config;
pub mod domain;
pub mod errors;
pub mod http;
pub mod logging;
pub mod mcp;
pub mod registry;
pub mod stdio;

use registry::CapabilityRegistry;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<CapabilityRegistry>,
}

impl AppState {
    pub fn new(registry: Arc<CapabilityRegistry>) -> Self {
        Self { registry }
    }
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(http::handlers::health))
        .route("/.well-known/mcp", get(http::handlers::discovery))
        .route("/mcp", post(http::handlers::mcp_endpoint))
        .layer(middleware::from_fn(logging::request_logging_middleware))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::domain::build_registry;
    use crate::registry::DuplicatePolicy;

    use super::*;

    fn app() -> Router {
        let registry = build_registry(DuplicatePolicy::Reject).expect("catalog registers");
        build_app(AppState::new(Arc::new(registry)))
    }

    async fn post_mcp(body: &'static str) -> (StatusCode, Vec<u8>) {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/mcp")
                    .method("POST")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body))
                    .expect("request build"),
            )
            .await
            .expect("request execution");

        let status = response.status();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("collect body")
            .to_bytes();
        (status, body.to_vec())
    }

    async fn post_mcp_json(body: &'static str) -> serde_json::Value {
        let (status, body) = post_mcp(body).await;
        assert_eq!(status, StatusCode::OK);
        serde_json::from_slice(&body).expect("valid json response")
    }

    #[tokio::test]
    async fn health_is_public() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .method("GET")
                    .body(Body::empty())
                    .expect("request build"),
            )
            .await
            .expect("request execution");

        assert_eq!(response.status(), StatusCode::OK);
        let body = response
            .into_body()
            .collect()
            .await
            .expect("collect body")
            .to_bytes();
        assert_eq!(body, "{\"status\":\"ok\"}");
    }

    #[tokio::test]
    async fn discovery_reports_capability_counts() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/.well-known/mcp")
                    .method("GET")
                    .body(Body::empty())
                    .expect("request build"),
            )
            .await
            .expect("request execution");

        assert_eq!(response.status(), StatusCode::OK);
        let body = response
            .into_body()
            .collect()
            .await
            .expect("collect body")
            .to_bytes();
        let body_json: serde_json::Value =
            serde_json::from_slice(&body).expect("valid json response");
        assert_eq!(body_json["mcp_endpoint"], "/mcp");
        assert_eq!(body_json["tools"], 7);
        assert_eq!(body_json["resources"], 4);
        assert_eq!(body_json["prompts"], 3);
    }

    #[tokio::test]
    async fn root_get_is_not_found() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/")
                    .method("GET")
                    .body(Body::empty())
                    .expect("request build"),
            )
            .await
            .expect("request execution");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn mcp_unknown_method_returns_method_not_found() {
        let (status, body) = post_mcp(r#"{"jsonrpc":"2.0","id":1,"method":"unknown"}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            b"{\"error\":{\"code\":-32601,\"message\":\"Method not found\"},\"id\":1,\"jsonrpc\":\"2.0\"}"
        );
    }

    #[tokio::test]
    async fn mcp_initialize_returns_result() {
        let body_json = post_mcp_json(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2024-11-05","clientInfo":{"name":"test-client","version":"1.0.0"},"capabilities":{}}}"#,
        )
        .await;

        assert_eq!(body_json["jsonrpc"], "2.0");
        assert_eq!(body_json["id"], 1);
        assert_eq!(body_json["result"]["protocolVersion"], "2024-11-05");
        assert_eq!(
            body_json["result"]["serverInfo"]["name"],
            env!("CARGO_PKG_NAME")
        );
        assert_eq!(
            body_json["result"]["serverInfo"]["version"],
            env!("CARGO_PKG_VERSION")
        );
        assert!(body_json["result"]["instructions"].is_string());
        assert!(body_json["result"]["capabilities"]["tools"].is_object());
        assert!(body_json["result"]["capabilities"]["resources"].is_object());
        assert!(body_json["result"]["capabilities"]["prompts"].is_object());
    }

    #[tokio::test]
    async fn mcp_initialize_rejects_unsupported_version() {
        let body_json = post_mcp_json(
            r#"{"jsonrpc":"2.0","id":11,"method":"initialize","params":{"protocolVersion":"1999-01-01","clientInfo":{"name":"test-client","version":"1.0.0"},"capabilities":{}}}"#,
        )
        .await;

        assert_eq!(body_json["error"]["code"], -32602);
        assert_eq!(
            body_json["error"]["data"]["code"],
            "unsupported_protocol_version"
        );
    }

    #[tokio::test]
    async fn mcp_tools_list_returns_catalog_in_registration_order() {
        let body_json =
            post_mcp_json(r#"{"jsonrpc":"2.0","id":2,"method":"tools/list","params":{}}"#).await;

        assert_eq!(body_json["id"], 2);
        let tools = body_json["result"]["tools"].as_array().expect("tools array");
        let names: Vec<&str> = tools
            .iter()
            .filter_map(|tool| tool["name"].as_str())
            .collect();
        assert_eq!(
            names,
            vec![
                "add",
                "multiply",
                "reverse_string",
                "word_count",
                "get_current_time",
                "format_json",
                "calculate"
            ]
        );
        assert_eq!(tools[0]["inputSchema"]["required"], serde_json::json!(["a", "b"]));
        assert_eq!(tools[0]["inputSchema"]["properties"]["a"]["type"], "number");
    }

    #[tokio::test]
    async fn mcp_tools_call_add_returns_structured_content() {
        let body_json = post_mcp_json(
            r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"add","arguments":{"a":2,"b":3}}}"#,
        )
        .await;

        assert_eq!(body_json["id"], 3);
        assert_eq!(body_json["result"]["structuredContent"]["result"], 5);
        assert!(body_json["result"]["content"].is_array());
    }

    #[tokio::test]
    async fn mcp_tools_call_rejects_mistyped_argument() {
        let body_json = post_mcp_json(
            r#"{"jsonrpc":"2.0","id":33,"method":"tools/call","params":{"name":"add","arguments":{"a":"two","b":3}}}"#,
        )
        .await;

        assert_eq!(body_json["id"], 33);
        assert_eq!(body_json["error"]["code"], -32602);
        assert_eq!(body_json["error"]["data"]["code"], "invalid_argument_type");
        assert_eq!(body_json["error"]["data"]["details"]["parameter"], "a");
    }

    #[tokio::test]
    async fn mcp_tools_call_format_json_soft_failure() {
        let body_json = post_mcp_json(
            r#"{"jsonrpc":"2.0","id":34,"method":"tools/call","params":{"name":"format_json","arguments":{"data":"not json"}}}"#,
        )
        .await;

        let text = body_json["result"]["structuredContent"]["result"]
            .as_str()
            .expect("soft failure text");
        assert!(text.starts_with("Error: Invalid JSON"));
    }

    #[tokio::test]
    async fn mcp_tools_call_unknown_tool_returns_tool_not_found_data() {
        let body_json = post_mcp_json(
            r#"{"jsonrpc":"2.0","id":503,"method":"tools/call","params":{"name":"unknown_tool","arguments":{}}}"#,
        )
        .await;

        assert_eq!(body_json["id"], 503);
        assert_eq!(body_json["error"]["code"], -32601);
        assert_eq!(body_json["error"]["data"]["code"], "tool_not_found");
        assert_eq!(body_json["error"]["data"]["details"]["name"], "unknown_tool");
    }

    #[tokio::test]
    async fn mcp_tools_call_malformed_params_returns_invalid_params() {
        let body_json = post_mcp_json(
            r#"{"jsonrpc":"2.0","id":502,"method":"tools/call","params":{"name":"add","arguments":"not-an-object"}}"#,
        )
        .await;

        assert_eq!(body_json["id"], 502);
        assert_eq!(body_json["error"]["code"], -32602);
    }

    #[tokio::test]
    async fn mcp_resources_list_includes_literal_uris_only() {
        let body_json =
            post_mcp_json(r#"{"jsonrpc":"2.0","id":41,"method":"resources/list","params":{}}"#)
                .await;

        let uris: Vec<&str> = body_json["result"]["resources"]
            .as_array()
            .expect("resources array")
            .iter()
            .filter_map(|resource| resource["uri"].as_str())
            .collect();
        assert_eq!(uris, vec!["config://server", "server://info", "data://stats"]);
    }

    #[tokio::test]
    async fn mcp_resources_read_returns_text_contents() {
        let body_json = post_mcp_json(
            r#"{"jsonrpc":"2.0","id":4,"method":"resources/read","params":{"uri":"config://server"}}"#,
        )
        .await;

        assert_eq!(body_json["id"], 4);
        assert_eq!(body_json["result"]["contents"][0]["uri"], "config://server");
        assert_eq!(
            body_json["result"]["contents"][0]["mimeType"],
            "application/json"
        );
        let content_text = body_json["result"]["contents"][0]["text"]
            .as_str()
            .expect("text content");
        let content_json: serde_json::Value =
            serde_json::from_str(content_text).expect("valid resource json");
        assert_eq!(content_json["features"][2], "prompts");
    }

    #[tokio::test]
    async fn mcp_resources_read_unknown_uri_returns_resource_not_found_data() {
        let body_json = post_mcp_json(
            r#"{"jsonrpc":"2.0","id":501,"method":"resources/read","params":{"uri":"user://42/profile"}}"#,
        )
        .await;

        assert_eq!(body_json["id"], 501);
        assert_eq!(body_json["error"]["code"], -32601);
        assert_eq!(body_json["error"]["data"]["code"], "resource_not_found");
        assert_eq!(
            body_json["error"]["data"]["details"]["uri"],
            "user://42/profile"
        );
    }

    #[tokio::test]
    async fn mcp_notification_returns_no_content() {
        let (status, body) = post_mcp(r#"{"jsonrpc":"2.0","method":"ping"}"#).await;

        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn mcp_batch_notifications_return_no_content() {
        let (status, body) = post_mcp(
            r#"[{"jsonrpc":"2.0","method":"ping"},{"jsonrpc":"2.0","method":"tools/list","params":{}}]"#,
        )
        .await;

        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn mcp_batch_mixed_requests_return_only_id_responses() {
        let body_json = post_mcp_json(
            r#"[{"jsonrpc":"2.0","method":"ping"},{"jsonrpc":"2.0","id":100,"method":"ping"},{"jsonrpc":"2.0","id":200,"method":"tools/list","params":{}}]"#,
        )
        .await;

        let responses = body_json.as_array().expect("batch response array");
        assert_eq!(responses.len(), 2);
        let ids: Vec<i64> = responses
            .iter()
            .filter_map(|item| item["id"].as_i64())
            .collect();
        assert!(ids.contains(&100));
        assert!(ids.contains(&200));
    }

    #[tokio::test]
    async fn mcp_parse_error_for_invalid_json() {
        let body_json = post_mcp_json("{").await;
        assert_eq!(body_json["error"]["code"], -32700);
    }
}
