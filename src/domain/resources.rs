//! Data sources exposed as MCP resources and resource templates

use serde_json::{json, Value};

use crate::domain::utils::{utc_timestamp, SERVER_DISPLAY_NAME};
use crate::errors::RegistrationError;
use crate::registry::{
    signature::{Arguments, ParamSpec, ParamType},
    DataSource, RegistryBuilder,
};

pub const CONFIG_RESOURCE_URI: &str = "config://server";
pub const STATS_RESOURCE_URI: &str = "data://stats";
pub const USER_INFO_RESOURCE_PATTERN: &str = "user://{user_id}/info";
pub const SERVER_INFO_RESOURCE_URI: &str = "server://info";

pub fn register_resources(builder: &mut RegistryBuilder) -> Result<(), RegistrationError> {
    builder.register(DataSource::new(
        CONFIG_RESOURCE_URI,
        "get_server_config",
        "Provides the server configuration.",
        server_config,
    ))?;
    builder.register(
        DataSource::new(
            USER_INFO_RESOURCE_PATTERN,
            "get_user_info",
            "Get information about a specific user by ID.",
            user_info,
        )
        .param(ParamSpec::required("user_id", ParamType::Text)),
    )?;
    builder.register(
        DataSource::new(
            SERVER_INFO_RESOURCE_URI,
            "get_server_info",
            "Information about this MCP server and its capabilities",
            server_info,
        )
        .mime_type("text/plain"),
    )?;

    // Counted last so the snapshot covers the full catalog, this resource included.
    let tools_count = builder.action_count();
    let resources_count = builder.data_source_count() + 1;
    builder.register(DataSource::new(
        STATS_RESOURCE_URI,
        "get_server_stats",
        "Provides server statistics.",
        move |_: &Arguments| server_stats(tools_count, resources_count),
    ))?;

    Ok(())
}

fn server_config(_: &Arguments) -> Value {
    json!({
        "name": SERVER_DISPLAY_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "features": ["tools", "resources", "prompts"],
        "status": "active",
    })
}

fn server_stats(tools_count: usize, resources_count: usize) -> Value {
    json!({
        "uptime_checked_at": utc_timestamp(),
        "tools_count": tools_count,
        "resources_count": resources_count,
        "status": "healthy",
    })
}

fn user_info(arguments: &Arguments) -> Value {
    let user_id = arguments.text("user_id");
    json!({
        "user_id": user_id,
        "username": format!("user_{user_id}"),
        "status": "active",
        "created_at": "2024-01-01",
        "last_seen": utc_timestamp(),
    })
}

fn server_info(_: &Arguments) -> Value {
    Value::String(format!(
        "{SERVER_DISPLAY_NAME}

This is a Model Context Protocol server demonstrating tools, resources, and prompts.

Available Tools:
- add/multiply/calculate: Arithmetic
- reverse_string/word_count/format_json: Text utilities
- get_current_time: Current date and time

Resources:
- {CONFIG_RESOURCE_URI}, {STATS_RESOURCE_URI}, {USER_INFO_RESOURCE_PATTERN}

Version: {}
",
        env!("CARGO_PKG_VERSION")
    ))
}
