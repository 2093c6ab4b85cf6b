//! `[inputs]` section parsing.
//!
//! Each input is a bullet sub-block of `key: value` lines:
//!
//! ```text
//! [inputs]
//! - name: weight
//!   type: number
//!   unit: kg | lb
//!   required: true
//!   min: 0.0
//!   max: 500.0
//!   description: Patient's weight
//!
//! - name: unit_system
//!   type: string
//!   enum: ["metric", "imperial"]
//! ```
//!
//! `enum` may also be written as a list, one bullet per choice, indented
//! deeper than the bullet that opened the field:
//!
//! ```text
//! - name: unit_system
//!   enum:
//!     - metric
//!     - imperial
//! ```
//!
//! A bullet at the field's own indentation always starts a new field.
//!
//! The fields drive form generation only. Validation stays inside each
//! calculator.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use super::{is_section_header, opens_section};

/// Declared value type of an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Integer,
    Boolean,
}

impl FieldType {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "string" | "str" | "text" => Some(FieldType::String),
            "number" | "float" | "decimal" => Some(FieldType::Number),
            "integer" | "int" => Some(FieldType::Integer),
            "boolean" | "bool" => Some(FieldType::Boolean),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Integer => "integer",
            FieldType::Boolean => "boolean",
        }
    }
}

/// One declared calculator input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputField {
    pub name: String,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub field_type: Option<FieldType>,

    #[serde(default)]
    pub required: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,

    /// Allowed values, in declaration order
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl InputField {
    pub fn new(name: impl Into<String>) -> Self {
        InputField {
            name: name.into(),
            field_type: None,
            required: false,
            unit: None,
            min: None,
            max: None,
            choices: None,
            description: None,
        }
    }

    /// Convert a raw text value (form field, `key=value` argument) into
    /// JSON using the declared type.
    ///
    /// Values that do not parse as the declared type are passed through as
    /// strings so the calculator can report them. Empty text yields `None`.
    pub fn coerce(&self, raw: &str) -> Option<Value> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        let parsed = match self.field_type {
            Some(FieldType::Number) => raw
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number),
            Some(FieldType::Integer) => raw.parse::<i64>().ok().map(Value::from),
            Some(FieldType::Boolean) => parse_bool(raw).map(Value::Bool),
            Some(FieldType::String) => None,
            None => serde_json::from_str::<Value>(raw)
                .ok()
                .filter(|v| v.is_number() || v.is_boolean()),
        };
        Some(parsed.unwrap_or_else(|| Value::String(raw.to_string())))
    }

    fn apply(&mut self, key: &str, value: &str) {
        let value = value.trim();
        match key {
            "name" => self.name = value.to_string(),
            "type" => {
                self.field_type = FieldType::parse(value);
                if self.field_type.is_none() {
                    tracing::debug!(field = %self.name, declared = value, "unrecognised input type");
                }
            }
            "required" => match parse_bool(value) {
                Some(required) => self.required = required,
                None => {
                    tracing::debug!(
                        field = %self.name,
                        declared = value,
                        "unrecognised required flag, treating as optional"
                    );
                    self.required = false;
                }
            },
            "unit" => self.unit = non_empty(value),
            "min" => self.min = value.parse().ok(),
            "max" => self.max = value.parse().ok(),
            "enum" => self.choices = parse_choices(value),
            "description" => self.description = non_empty(value),
            _ => {}
        }
    }

    fn push_choice(&mut self, item: &str) {
        let item = item.trim().trim_matches(|c: char| c == '"' || c == '\'');
        if !item.is_empty() {
            self.choices.get_or_insert_with(Vec::new).push(item.to_string());
        }
    }
}

static KEY_VALUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)\s*:(.*)$").expect("key/value pattern is valid")
});

/// Parse the `[inputs]` section into fields, in declaration order.
pub fn parse_inputs(doc_config: &str) -> Vec<InputField> {
    let mut fields = Vec::new();
    let mut current: Option<InputField> = None;
    let mut in_block = false;
    // Indentation of the bullet that opened `current`.
    let mut field_indent = 0;
    // Set after an `enum:` line with no inline value.
    let mut enum_list = false;

    for raw in doc_config.lines() {
        let line = raw.trim();
        if !in_block {
            in_block = opens_section(line, "inputs");
            continue;
        }
        if is_section_header(line) {
            break;
        }

        let indent = raw.len() - raw.trim_start().len();
        let body = match bullet_body(line) {
            Some(item) if enum_list && indent > field_indent => {
                if let Some(field) = current.as_mut() {
                    field.push_choice(item);
                }
                continue;
            }
            Some(body) => {
                fields.extend(current.take());
                current = Some(InputField::new(""));
                field_indent = indent;
                enum_list = false;
                body
            }
            None => line,
        };

        if let (Some(field), Some(caps)) = (current.as_mut(), KEY_VALUE.captures(body)) {
            let key = caps[1].to_ascii_lowercase();
            enum_list = key == "enum" && caps[2].trim().is_empty();
            field.apply(&key, &caps[2]);
        }
    }
    fields.extend(current);

    fields.retain(|f| !f.name.is_empty());
    fields
}

fn bullet_body(line: &str) -> Option<&str> {
    let rest = line.strip_prefix('-').or_else(|| line.strip_prefix('*'))?;
    if rest.starts_with(char::is_whitespace) {
        Some(rest.trim_start())
    } else {
        None
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Some(true),
        "false" | "no" | "0" | "off" => Some(false),
        _ => None,
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn parse_choices(raw: &str) -> Option<Vec<String>> {
    let choices: Vec<String> = match serde_json::from_str::<Vec<Value>>(raw) {
        Ok(values) => values
            .into_iter()
            .map(|v| match v {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect(),
        Err(_) => raw
            .trim()
            .trim_start_matches('[')
            .trim_end_matches(']')
            .split(',')
            .map(|s| s.trim().trim_matches(|c: char| c == '"' || c == '\'').to_string())
            .filter(|s| !s.is_empty())
            .collect(),
    };
    (!choices.is_empty()).then_some(choices)
}
