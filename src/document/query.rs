// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Document queries.

use core::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::collection::DocumentCollection;
use crate::document::Document;
use crate::types::Identifier;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WhereOperator {
    #[serde(rename = "==")]
    Equal,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = "<=")]
    LessThanOrEqual,
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = ">=")]
    GreaterThanOrEqual,
    #[serde(rename = "startsWith")]
    StartsWith,
}

/// `[field, operator, value]`, e.g. `["$id", "==", "ab12…"]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WhereClause(pub String, pub WhereOperator, pub Value);

impl WhereClause {
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        WhereClause(field.to_string(), WhereOperator::Equal, value.into())
    }

    pub fn matches(&self, doc: &Document) -> bool {
        let actual = doc.field_value(&self.0);
        let expected = &self.2;
        match self.1 {
            WhereOperator::Equal => actual == *expected,
            WhereOperator::In => expected.as_array().is_some_and(|items| items.contains(&actual)),
            WhereOperator::LessThan => compare(&actual, expected) == Some(Ordering::Less),
            WhereOperator::LessThanOrEqual => {
                matches!(compare(&actual, expected), Some(Ordering::Less | Ordering::Equal))
            }
            WhereOperator::GreaterThan => compare(&actual, expected) == Some(Ordering::Greater),
            WhereOperator::GreaterThanOrEqual => {
                matches!(compare(&actual, expected), Some(Ordering::Greater | Ordering::Equal))
            }
            WhereOperator::StartsWith => match (actual.as_str(), expected.as_str()) {
                (Some(a), Some(prefix)) => a.starts_with(prefix),
                _ => false,
            },
        }
    }
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentQuery {
    #[serde(default, rename = "where")]
    pub where_clauses: Vec<WhereClause>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl DocumentQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_id(id: &Identifier) -> Self {
        Self {
            where_clauses: vec![WhereClause::eq(crate::contract::schema::SYSTEM_ID, id.to_hex())],
            limit: Some(1),
        }
    }

    pub fn filter(mut self, clause: WhereClause) -> Self {
        self.where_clauses.push(clause);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Matching live documents in `$id` order.
    pub fn run(&self, collection: &DocumentCollection) -> Vec<Document> {
        let limit = self.limit.unwrap_or(usize::MAX);
        collection
            .iter()
            .filter(|doc| self.where_clauses.iter().all(|c| c.matches(doc)))
            .take(limit)
            .cloned()
            .collect()
    }
}
