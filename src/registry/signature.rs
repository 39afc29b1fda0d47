//! Parameter descriptors and argument binding
//!
//! A capability declares an ordered list of [`ParamSpec`]s. Incoming argument maps are
//! bound against that list: values are type-checked (string-encoded primitives are
//! coerced, since prompt arguments and URI segments always arrive as text), defaults
//! fill omitted optional parameters, and anything else is rejected by name.

use std::{collections::HashSet, fmt};

use serde_json::{json, Map, Number, Value};

use crate::errors::{AppError, RegistrationError};
use crate::registry::Category;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Text,
    Number,
    Integer,
    Boolean,
    Object,
}

impl ParamType {
    /// JSON Schema type keyword advertised to clients.
    pub fn schema_type(self) -> &'static str {
        match self {
            Self::Text => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Object => "object",
        }
    }

    /// Returns the value in its canonical form for this type, or `None` when it cannot be
    /// represented.
    pub fn coerce(self, value: &Value) -> Option<Value> {
        match (self, value) {
            (Self::Text, Value::String(_)) => Some(value.clone()),
            (Self::Number, Value::Number(_)) => Some(value.clone()),
            (Self::Number, Value::String(text)) => text
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number),
            (Self::Integer, Value::Number(number)) => integer_from_number(number),
            (Self::Integer, Value::String(text)) => {
                text.trim().parse::<i64>().ok().map(|parsed| json!(parsed))
            }
            (Self::Boolean, Value::Bool(_)) => Some(value.clone()),
            (Self::Boolean, Value::String(text)) => match text.trim().to_ascii_lowercase().as_str()
            {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },
            (Self::Object, Value::Object(_)) => Some(value.clone()),
            (Self::Object, Value::String(text)) => serde_json::from_str::<Value>(text)
                .ok()
                .filter(Value::is_object),
            _ => None,
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.schema_type())
    }
}

fn integer_from_number(number: &Number) -> Option<Value> {
    if number.is_i64() {
        return Some(Value::Number(number.clone()));
    }

    number
        .as_f64()
        .filter(|float| float.fract() == 0.0 && float.abs() < i64::MAX as f64)
        .map(|float| json!(float as i64))
}

#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: String,
    pub ty: ParamType,
    pub description: Option<String>,
    pub default: Option<Value>,
}

impl ParamSpec {
    pub fn required(name: &str, ty: ParamType) -> Self {
        Self {
            name: name.to_string(),
            ty,
            description: None,
            default: None,
        }
    }

    pub fn optional(name: &str, ty: ParamType, default: impl Into<Value>) -> Self {
        Self {
            name: name.to_string(),
            ty,
            description: None,
            default: Some(default.into()),
        }
    }

    pub fn describe(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// Checks a declared signature once, at registration time, and canonicalizes defaults.
pub fn check_signature(
    category: Category,
    name: &str,
    params: &mut [ParamSpec],
) -> Result<(), RegistrationError> {
    let mut seen = HashSet::new();
    for param in params.iter_mut() {
        if param.name.trim().is_empty() {
            return Err(RegistrationError::signature_mismatch(
                category,
                name,
                "parameter names must not be empty",
            ));
        }

        if !seen.insert(param.name.clone()) {
            return Err(RegistrationError::signature_mismatch(
                category,
                name,
                format!("parameter `{}` is declared twice", param.name),
            ));
        }

        if let Some(default) = param.default.as_ref() {
            let coerced = param.ty.coerce(default).ok_or_else(|| {
                RegistrationError::signature_mismatch(
                    category,
                    name,
                    format!(
                        "default for `{}` is not a valid {}",
                        param.name, param.ty
                    ),
                )
            })?;
            param.default = Some(coerced);
        }
    }

    Ok(())
}

/// Validated arguments handed to a capability implementation.
///
/// Every declared parameter is present with a value of its declared type, so the typed
/// accessors only fall back for names the signature does not declare.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    values: Map<String, Value>,
}

impl Arguments {
    pub fn bind(params: &[ParamSpec], supplied: &Map<String, Value>) -> Result<Self, AppError> {
        if let Some(unknown) = supplied
            .keys()
            .find(|key| !params.iter().any(|param| &param.name == *key))
        {
            return Err(AppError::unknown_argument(unknown));
        }

        let mut values = Map::new();
        for param in params {
            let value = match supplied.get(&param.name).filter(|value| !value.is_null()) {
                Some(value) => param
                    .ty
                    .coerce(value)
                    .ok_or_else(|| AppError::invalid_argument_type(&param.name, param.ty.schema_type()))?,
                None => param
                    .default
                    .clone()
                    .ok_or_else(|| AppError::missing_argument(&param.name))?,
            };
            values.insert(param.name.clone(), value);
        }

        Ok(Self { values })
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn text(&self, name: &str) -> &str {
        self.values
            .get(name)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn number(&self, name: &str) -> f64 {
        self.values
            .get(name)
            .and_then(Value::as_f64)
            .unwrap_or_default()
    }

    pub fn integer(&self, name: &str) -> i64 {
        self.values
            .get(name)
            .and_then(Value::as_i64)
            .unwrap_or_default()
    }

    pub fn boolean(&self, name: &str) -> bool {
        self.values
            .get(name)
            .and_then(Value::as_bool)
            .unwrap_or_default()
    }
}
