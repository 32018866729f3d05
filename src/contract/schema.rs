// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Document schema definitions.
//!
//! Only the validation contract of the schema language is modelled: typed
//! properties with a handful of constraints, required fields, the
//! additional-properties policy and declared indices.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::{MAX_DOCUMENT_TYPE_NAME_LEN, MAX_INDEX_PROPERTIES};
use crate::error::{KernelError, Result};

/// System fields addressable from indices and queries.
pub const SYSTEM_ID: &str = "$id";
pub const SYSTEM_OWNER_ID: &str = "$ownerId";
pub const SYSTEM_REVISION: &str = "$revision";

pub fn is_system_field(name: &str) -> bool {
    matches!(name, SYSTEM_ID | SYSTEM_OWNER_ID | SYSTEM_REVISION)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StringFormat {
    Url,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub kind: PropertyType,
    #[serde(default)]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub min_length: Option<u32>,
    #[serde(default)]
    pub minimum: Option<i64>,
    #[serde(default)]
    pub maximum: Option<i64>,
    #[serde(default)]
    pub format: Option<StringFormat>,
}

impl PropertySchema {
    pub fn of(kind: PropertyType) -> Self {
        Self {
            kind,
            max_length: None,
            min_length: None,
            minimum: None,
            maximum: None,
            format: None,
        }
    }

    pub fn string() -> Self {
        Self::of(PropertyType::String)
    }

    pub fn with_max_length(mut self, max: u32) -> Self {
        self.max_length = Some(max);
        self
    }

    pub fn with_format(mut self, format: StringFormat) -> Self {
        self.format = Some(format);
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// One `(field, direction)` pair, encoded as `{"field": "asc"}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, SortDirection>", into = "BTreeMap<String, SortDirection>")]
pub struct IndexProperty {
    pub field: String,
    pub direction: SortDirection,
}

impl IndexProperty {
    pub fn asc(field: &str) -> Self {
        Self { field: field.to_string(), direction: SortDirection::Asc }
    }
}

impl TryFrom<BTreeMap<String, SortDirection>> for IndexProperty {
    type Error = String;

    fn try_from(map: BTreeMap<String, SortDirection>) -> core::result::Result<Self, Self::Error> {
        let mut iter = map.into_iter();
        match (iter.next(), iter.next()) {
            (Some((field, direction)), None) => Ok(Self { field, direction }),
            _ => Err("index property must have exactly one field".into()),
        }
    }
}

impl From<IndexProperty> for BTreeMap<String, SortDirection> {
    fn from(p: IndexProperty) -> Self {
        let mut map = BTreeMap::new();
        map.insert(p.field, p.direction);
        map
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDefinition {
    pub properties: Vec<IndexProperty>,
    #[serde(default)]
    pub unique: bool,
}

impl IndexDefinition {
    pub fn unique(fields: &[&str]) -> Self {
        Self {
            properties: fields.iter().map(|f| IndexProperty::asc(f)).collect(),
            unique: true,
        }
    }

    /// Owner-scoped when the owner id participates in the key.
    pub fn is_owner_scoped(&self) -> bool {
        self.properties.iter().any(|p| p.field == SYSTEM_OWNER_ID)
    }

    /// Display name, e.g. `$ownerId+toUserId`.
    pub fn name(&self) -> String {
        self.properties
            .iter()
            .map(|p| p.field.as_str())
            .collect::<Vec<_>>()
            .join("+")
    }
}

fn default_additional_properties() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSchema {
    pub properties: BTreeMap<String, PropertySchema>,
    #[serde(default, rename = "required")]
    pub required_fields: Vec<String>,
    #[serde(default = "default_additional_properties", rename = "additionalProperties")]
    pub additional_properties_allowed: bool,
    #[serde(default)]
    pub indices: Vec<IndexDefinition>,
}

impl DocumentSchema {
    pub fn new(properties: BTreeMap<String, PropertySchema>) -> Self {
        Self {
            properties,
            required_fields: Vec::new(),
            additional_properties_allowed: true,
            indices: Vec::new(),
        }
    }

    pub fn require(mut self, fields: &[&str]) -> Self {
        self.required_fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn closed(mut self) -> Self {
        self.additional_properties_allowed = false;
        self
    }

    pub fn with_index(mut self, index: IndexDefinition) -> Self {
        self.indices.push(index);
        self
    }

    pub fn is_required(&self, field: &str) -> bool {
        self.required_fields.iter().any(|f| f == field)
    }

    /// Checks the schema is well formed.
    pub fn validate(&self, document_type: &str) -> Result<()> {
        let invalid = |reason: String| KernelError::InvalidDataContract(format!("{document_type}: {reason}"));

        if document_type.is_empty() || document_type.len() > MAX_DOCUMENT_TYPE_NAME_LEN {
            return Err(invalid("document type name length out of range".into()));
        }
        if !document_type.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            return Err(invalid("document type name has invalid characters".into()));
        }

        for (name, prop) in &self.properties {
            if name.starts_with('$') {
                return Err(invalid(format!("property {name:?} uses the reserved $ prefix")));
            }
            if let (Some(min), Some(max)) = (prop.min_length, prop.max_length) {
                if min > max {
                    return Err(invalid(format!("property {name:?} has minLength > maxLength")));
                }
            }
            if let (Some(min), Some(max)) = (prop.minimum, prop.maximum) {
                if min > max {
                    return Err(invalid(format!("property {name:?} has minimum > maximum")));
                }
            }
            if prop.format.is_some() && prop.kind != PropertyType::String {
                return Err(invalid(format!("property {name:?} has a format but is not a string")));
            }
        }

        for field in &self.required_fields {
            if !self.properties.contains_key(field) {
                return Err(invalid(format!("required field {field:?} is not declared")));
            }
        }

        for index in &self.indices {
            if index.properties.is_empty() {
                return Err(invalid("index has no properties".into()));
            }
            if index.properties.len() > MAX_INDEX_PROPERTIES {
                return Err(invalid(format!("index {} has too many properties", index.name())));
            }
            let mut seen: Vec<&str> = Vec::with_capacity(index.properties.len());
            for p in &index.properties {
                if seen.contains(&p.field.as_str()) {
                    return Err(invalid(format!("index {} repeats {:?}", index.name(), p.field)));
                }
                seen.push(&p.field);

                if is_system_field(&p.field) {
                    continue;
                }
                if !self.properties.contains_key(&p.field) {
                    return Err(invalid(format!(
                        "index {} references undeclared property {:?}",
                        index.name(),
                        p.field
                    )));
                }
                // A unique key over an optional field could not tell two
                // documents apart when both omit it.
                if index.unique && !self.is_required(&p.field) {
                    return Err(invalid(format!(
                        "unique index {} needs {:?} to be required",
                        index.name(),
                        p.field
                    )));
                }
            }
        }
        Ok(())
    }
}
