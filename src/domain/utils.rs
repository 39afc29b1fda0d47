//! Shared formatting helpers for the capability implementations

use chrono::{Local, SecondsFormat, Utc};
use serde_json::{json, Value};

use crate::registry::CapabilityFault;

pub const SERVER_DISPLAY_NAME: &str = "Demo MCP Server";
pub const SERVER_INSTRUCTIONS: &str =
    "This server provides utility tools, data resources, and helpful prompts for various tasks.";

/// Emits integral results as JSON integers so `2 + 3` reads `5` rather than `5.0`.
/// JSON has no encoding for infinities or NaN, so those are faults.
pub fn number_value(value: f64) -> Result<Value, CapabilityFault> {
    if !value.is_finite() {
        return Err(CapabilityFault::new("result is not a finite number"));
    }
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        return Ok(json!(value as i64));
    }

    Ok(json!(value))
}

pub fn local_timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn utc_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
