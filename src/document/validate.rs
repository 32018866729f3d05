// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Document data validation against a contract schema.

use serde_json::Value;

use crate::contract::{DocumentSchema, PropertySchema, PropertyType, StringFormat};
use crate::document::DocumentData;
use crate::error::{KernelError, Result};

pub fn validate_data(schema: &DocumentSchema, document_type: &str, data: &DocumentData) -> Result<()> {
    let fail = |reason: String| KernelError::SchemaValidation {
        document_type: document_type.to_string(),
        reason,
    };

    for field in &schema.required_fields {
        match data.get(field) {
            None | Some(Value::Null) => return Err(fail(format!("missing required property {field:?}"))),
            Some(_) => {}
        }
    }

    for (name, value) in data {
        if name.starts_with('$') {
            return Err(fail(format!("property {name:?} uses the reserved $ prefix")));
        }
        match schema.properties.get(name) {
            Some(prop) => check_property(prop, value).map_err(|reason| fail(format!("{name}: {reason}")))?,
            None if schema.additional_properties_allowed => {}
            None => return Err(fail(format!("additional property {name:?} is not allowed"))),
        }
    }
    Ok(())
}

fn check_property(prop: &PropertySchema, value: &Value) -> core::result::Result<(), String> {
    // Optional properties may be explicitly null.
    if value.is_null() {
        return Ok(());
    }

    let type_ok = match prop.kind {
        PropertyType::String => value.is_string(),
        PropertyType::Integer => value.is_i64() || value.is_u64(),
        PropertyType::Number => value.is_number(),
        PropertyType::Boolean => value.is_boolean(),
        PropertyType::Array => value.is_array(),
        PropertyType::Object => value.is_object(),
    };
    if !type_ok {
        return Err(format!("expected {:?}", prop.kind));
    }

    let length = match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(items) => Some(items.len()),
        _ => None,
    };
    if let Some(len) = length {
        if let Some(max) = prop.max_length {
            if len > max as usize {
                return Err(format!("length {len} exceeds maxLength {max}"));
            }
        }
        if let Some(min) = prop.min_length {
            if len < min as usize {
                return Err(format!("length {len} is below minLength {min}"));
            }
        }
    }

    if let Some(n) = value.as_f64() {
        if let Some(min) = prop.minimum {
            if n < min as f64 {
                return Err(format!("{n} is below minimum {min}"));
            }
        }
        if let Some(max) = prop.maximum {
            if n > max as f64 {
                return Err(format!("{n} exceeds maximum {max}"));
            }
        }
    }

    if let (Some(StringFormat::Url), Value::String(s)) = (prop.format, value) {
        if !is_url(s) {
            return Err(format!("{s:?} is not a url"));
        }
    }
    Ok(())
}

fn is_url(s: &str) -> bool {
    let rest = match s.strip_prefix("https://").or_else(|| s.strip_prefix("http://")) {
        Some(rest) => rest,
        None => return false,
    };
    let host = rest.split(['/', '?', '#']).next().unwrap_or("");
    !host.is_empty() && !host.contains(char::is_whitespace)
}
