// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Store filters and updates.

use super::Document;
use serde_json::{Map, Value};

/// One condition on a document field.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Field equals the value.
    Eq(String, Value),
    /// Array field contains the value.
    Contains(String, Value),
    /// Array field contains every value.
    ContainsAll(String, Vec<Value>),
    /// At least one predicate holds.
    AnyOf(Vec<Predicate>),
}

impl Predicate {
    pub fn matches(&self, document: &Document) -> bool {
        match self {
            Predicate::Eq(field, value) => document.get(field) == Some(value),
            Predicate::Contains(field, value) => array_field(document, field)
                .map(|items| items.contains(value))
                .unwrap_or(false),
            Predicate::ContainsAll(field, values) => array_field(document, field)
                .map(|items| values.iter().all(|v| items.contains(v)))
                .unwrap_or(false),
            Predicate::AnyOf(preds) => preds.iter().any(|p| p.matches(document)),
        }
    }
}

fn array_field<'a>(document: &'a Document, field: &str) -> Option<&'a Vec<Value>> {
    document.get(field).and_then(Value::as_array)
}

/// Conjunction of predicates. An empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    predicates: Vec<Predicate>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.predicates
            .push(Predicate::Eq(field.to_string(), value.into()));
        self
    }

    pub fn contains(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.predicates
            .push(Predicate::Contains(field.to_string(), value.into()));
        self
    }

    pub fn contains_all<I, V>(mut self, field: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.predicates.push(Predicate::ContainsAll(
            field.to_string(),
            values.into_iter().map(Into::into).collect(),
        ));
        self
    }

    pub fn any_of(mut self, predicates: Vec<Predicate>) -> Self {
        self.predicates.push(Predicate::AnyOf(predicates));
        self
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn matches(&self, document: &Document) -> bool {
        self.predicates.iter().all(|p| p.matches(document))
    }
}

/// Field-level changes: `set` overwrites, `unset` removes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    set: Map<String, Value>,
    unset: Vec<String>,
}

impl Update {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.set.insert(field.to_string(), value.into());
        self
    }

    pub fn unset(mut self, field: &str) -> Self {
        self.unset.push(field.to_string());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.unset.is_empty()
    }

    pub fn sets(&self) -> &Map<String, Value> {
        &self.set
    }

    pub fn unsets(&self) -> &[String] {
        &self.unset
    }

    pub fn apply(&self, document: &mut Document) {
        for (field, value) in &self.set {
            document.insert(field.clone(), value.clone());
        }
        for field in &self.unset {
            document.remove(field);
        }
    }
}

impl From<Map<String, Value>> for Update {
    fn from(set: Map<String, Value>) -> Self {
        Self {
            set,
            unset: Vec::new(),
        }
    }
}
