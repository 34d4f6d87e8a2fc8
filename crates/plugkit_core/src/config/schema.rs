//! Extension configuration schema and parsed values.
//!
//! # Responsibility
//! - Describe the config keys an extension accepts.
//! - Parse raw JSON config into validated `ConfigValues`.
//! - Merge schemas (checked union, override-wins overlay) and values.
//!
//! # Invariants
//! - `union` never silently shadows a key; `overlay` always lets the
//!   override entry win.
//! - Parsed values only contain keys declared by the schema.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Value shape accepted by one config key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigFieldKind {
    String,
    Number,
    Boolean,
    Array,
    Object,
    Any,
}

impl ConfigFieldKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
            Self::Any => "any",
        }
    }

    fn accepts(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
            Self::Any => true,
        }
    }
}

/// Schema entry for one config key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigField {
    pub kind: ConfigFieldKind,
    #[serde(default)]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ConfigField {
    fn of(kind: ConfigFieldKind) -> Self {
        Self {
            kind,
            optional: false,
            default: None,
        }
    }

    pub fn string() -> Self {
        Self::of(ConfigFieldKind::String)
    }

    pub fn number() -> Self {
        Self::of(ConfigFieldKind::Number)
    }

    pub fn boolean() -> Self {
        Self::of(ConfigFieldKind::Boolean)
    }

    pub fn array() -> Self {
        Self::of(ConfigFieldKind::Array)
    }

    pub fn object() -> Self {
        Self::of(ConfigFieldKind::Object)
    }

    pub fn any() -> Self {
        Self::of(ConfigFieldKind::Any)
    }

    /// Allows the key to be absent from raw config.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Value used when the key is absent. Implies the key may be omitted.
    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }
}

/// Ordered mapping of config key to field schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigSchema {
    fields: BTreeMap<String, ConfigField>,
}

impl ConfigSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert; replaces an existing entry with the same key.
    pub fn with_field(mut self, key: impl Into<String>, field: ConfigField) -> Self {
        self.fields.insert(key.into(), field);
        self
    }

    /// Inserts one entry, rejecting keys that are already declared.
    pub fn insert(&mut self, key: impl Into<String>, field: ConfigField) -> Result<(), ConfigError> {
        let key = key.into();
        if self.fields.contains_key(key.as_str()) {
            return Err(ConfigError::DuplicateKey(key));
        }
        self.fields.insert(key, field);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&ConfigField> {
        self.fields.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Disjoint union of `self` and `other`.
    ///
    /// # Errors
    /// - `ConfigError::DuplicateKey` for the first key declared by both.
    pub fn union(&self, other: &ConfigSchema) -> Result<ConfigSchema, ConfigError> {
        let mut merged = self.clone();
        for (key, field) in &other.fields {
            merged.insert(key.clone(), field.clone())?;
        }
        Ok(merged)
    }

    /// Shallow union where entries from `overrides` replace colliding keys.
    pub fn overlay(&self, overrides: &ConfigSchema) -> ConfigSchema {
        let mut merged = self.clone();
        for (key, field) in &overrides.fields {
            merged.fields.insert(key.clone(), field.clone());
        }
        merged
    }

    /// Parses raw config against this schema.
    ///
    /// Absent raw config is treated as an empty object. Keys not declared by
    /// the schema are dropped.
    ///
    /// # Errors
    /// - `NotAnObject` when raw config is present but not a JSON object.
    /// - `MissingField` when a required key without default is absent.
    /// - `InvalidType` when a present value does not match its field kind.
    pub fn parse(&self, raw: Option<&Value>) -> Result<ConfigValues, ConfigError> {
        let empty = Map::new();
        let object = match raw {
            None | Some(Value::Null) => &empty,
            Some(Value::Object(object)) => object,
            Some(other) => return Err(ConfigError::NotAnObject(json_kind(other))),
        };

        let mut values = Map::new();
        for (key, field) in &self.fields {
            match object.get(key.as_str()) {
                Some(Value::Null) | None => {
                    if let Some(default) = &field.default {
                        values.insert(key.clone(), default.clone());
                    } else if !field.optional {
                        return Err(ConfigError::MissingField(key.clone()));
                    }
                }
                Some(value) => {
                    if !field.kind.accepts(value) {
                        return Err(ConfigError::InvalidType {
                            key: key.clone(),
                            expected: field.kind.as_str(),
                            found: json_kind(value),
                        });
                    }
                    values.insert(key.clone(), value.clone());
                }
            }
        }
        Ok(ConfigValues(values))
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Parsed, schema-validated config for one extension instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigValues(Map<String, Value>);

impl ConfigValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Shallow merge; keys from `overrides` win.
    pub fn merged_with(&self, overrides: &ConfigValues) -> ConfigValues {
        let mut merged = self.0.clone();
        for (key, value) in &overrides.0 {
            merged.insert(key.clone(), value.clone());
        }
        ConfigValues(merged)
    }
}

impl From<Map<String, Value>> for ConfigValues {
    fn from(value: Map<String, Value>) -> Self {
        Self(value)
    }
}

/// Config schema and parse errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    DuplicateKey(String),
    NotAnObject(&'static str),
    MissingField(String),
    InvalidType {
        key: String,
        expected: &'static str,
        found: &'static str,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateKey(key) => write!(f, "config key is declared twice: {key}"),
            Self::NotAnObject(found) => write!(f, "config must be an object, got {found}"),
            Self::MissingField(key) => write!(f, "missing required config value: {key}"),
            Self::InvalidType {
                key,
                expected,
                found,
            } => write!(f, "config value `{key}` must be {expected}, got {found}"),
        }
    }
}

impl Error for ConfigError {}
