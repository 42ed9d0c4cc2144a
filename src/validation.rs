//! Schema validation for user input.
//!
//! Form submissions arrive as flat `key=value` pairs whose keys encode nested
//! objects (`user.name`) and arrays (`skills[0]`). [`reconstruct`] rebuilds the
//! nested shape, then a [`Schema`] checks and coerces it. The result is either
//! a JSON value ready to deserialize into a typed struct or a list of
//! per-field errors.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Number, Value};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.push(field, message);
        errors
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    #[cfg(test)]
    pub fn for_field(&self, field: &str) -> Vec<&str> {
        self.errors
            .iter()
            .filter(|e| e.field == field)
            .map(|e| e.message.as_str())
            .collect()
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.errors.iter().map(|e| e.message.as_str()).collect();
        f.write_str(&messages.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

// === Form reconstruction ===

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Splits `user.skills[2].name` into key and index segments.
pub fn parse_path(key: &str) -> Result<Vec<PathSegment>, String> {
    let invalid = || format!("invalid field name '{}'", key);
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = key.chars().peekable();
    // True right after `]`, where an empty key before `.` or `[` is fine
    let mut after_index = false;

    while let Some(c) = chars.next() {
        match c {
            '.' => {
                if current.is_empty() && !after_index {
                    return Err(invalid());
                }
                if !current.is_empty() {
                    segments.push(PathSegment::Key(std::mem::take(&mut current)));
                }
                after_index = false;
                if chars.peek().is_none() {
                    return Err(invalid());
                }
            }
            '[' => {
                if !current.is_empty() {
                    segments.push(PathSegment::Key(std::mem::take(&mut current)));
                } else if segments.is_empty() {
                    return Err(invalid());
                }
                let mut inner = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == ']' {
                        closed = true;
                        break;
                    }
                    inner.push(c);
                }
                if !closed || inner.is_empty() {
                    return Err(invalid());
                }
                match inner.parse::<usize>() {
                    Ok(index) => segments.push(PathSegment::Index(index)),
                    Err(_) => segments.push(PathSegment::Key(inner)),
                }
                after_index = true;
            }
            ']' => return Err(invalid()),
            _ => {
                if after_index {
                    return Err(invalid());
                }
                current.push(c);
            }
        }
    }

    if !current.is_empty() {
        segments.push(PathSegment::Key(current));
    }
    if segments.is_empty() {
        return Err(invalid());
    }
    Ok(segments)
}

/// Intermediate tree built from flat form pairs.
#[derive(Debug, Clone, PartialEq)]
pub enum FormNode {
    Scalar(String),
    Object(BTreeMap<String, FormNode>),
    // Keyed by index so sparse or out-of-order keys still come out ordered
    Array(BTreeMap<usize, FormNode>),
}

impl FormNode {
    fn empty_for(next: Option<&PathSegment>) -> Self {
        match next {
            None => FormNode::Scalar(String::new()),
            Some(PathSegment::Key(_)) => FormNode::Object(BTreeMap::new()),
            Some(PathSegment::Index(_)) => FormNode::Array(BTreeMap::new()),
        }
    }

    fn insert(&mut self, path: &[PathSegment], value: String) -> Result<(), ()> {
        let Some((head, rest)) = path.split_first() else {
            return match self {
                FormNode::Scalar(existing) => {
                    *existing = value;
                    Ok(())
                }
                _ => Err(()),
            };
        };

        let child = match (self, head) {
            (FormNode::Object(map), PathSegment::Key(key)) => map
                .entry(key.clone())
                .or_insert_with(|| FormNode::empty_for(rest.first())),
            (FormNode::Array(items), PathSegment::Index(index)) => items
                .entry(*index)
                .or_insert_with(|| FormNode::empty_for(rest.first())),
            _ => return Err(()),
        };
        child.insert(rest, value)
    }

    pub fn into_json(self) -> Value {
        match self {
            FormNode::Scalar(s) => Value::String(s),
            FormNode::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, v.into_json()))
                    .collect::<Map<String, Value>>(),
            ),
            FormNode::Array(items) => {
                Value::Array(items.into_values().map(FormNode::into_json).collect())
            }
        }
    }
}

/// Rebuilds nested objects and arrays from flat form pairs. A later pair for
/// the same key overwrites an earlier one.
pub fn reconstruct<I, K, V>(pairs: I) -> Result<Value, ValidationErrors>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<String>,
{
    let mut root = FormNode::Object(BTreeMap::new());
    let mut errors = ValidationErrors::default();

    for (key, value) in pairs {
        let key = key.as_ref();
        match parse_path(key) {
            Ok(path) => {
                if root.insert(&path, value.into()).is_err() {
                    errors.push(key, format!("{} conflicts with another field", key));
                }
            }
            Err(msg) => errors.push(key, msg),
        }
    }

    errors.into_result()?;
    Ok(root.into_json())
}

// === Schema ===

#[derive(Debug, Clone)]
pub enum FieldKind {
    String,
    Integer,
    Number,
    Boolean,
    Email,
    Uuid,
    Url,
    Object(Schema),
    Array(Box<FieldSchema>),
}

#[derive(Debug, Clone)]
pub struct FieldSchema {
    kind: FieldKind,
    required: bool,
    min_length: Option<usize>,
    max_length: Option<usize>,
    range: Option<(f64, f64)>,
}

impl FieldSchema {
    fn of(kind: FieldKind) -> Self {
        Self {
            kind,
            required: false,
            min_length: None,
            max_length: None,
            range: None,
        }
    }

    pub fn string() -> Self {
        Self::of(FieldKind::String)
    }

    pub fn integer() -> Self {
        Self::of(FieldKind::Integer)
    }

    pub fn number() -> Self {
        Self::of(FieldKind::Number)
    }

    pub fn boolean() -> Self {
        Self::of(FieldKind::Boolean)
    }

    pub fn email() -> Self {
        Self::of(FieldKind::Email)
    }

    pub fn uuid() -> Self {
        Self::of(FieldKind::Uuid)
    }

    pub fn url() -> Self {
        Self::of(FieldKind::Url)
    }

    pub fn object(schema: Schema) -> Self {
        Self::of(FieldKind::Object(schema))
    }

    pub fn array(items: FieldSchema) -> Self {
        Self::of(FieldKind::Array(Box::new(items)))
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Characters for text fields, items for arrays.
    pub fn min_length(mut self, min: usize) -> Self {
        self.min_length = Some(min);
        self
    }

    pub fn max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    pub fn range(mut self, min: f64, max: f64) -> Self {
        self.range = Some((min, max));
        self
    }
}

/// Declarative shape: field name to type and constraints. Fields not in the
/// schema are dropped from the output.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<(String, FieldSchema)>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, field: FieldSchema) -> Self {
        self.fields.push((name.into(), field));
        self
    }

    pub fn validate(&self, input: &Value) -> Result<Value, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let output = match input {
            Value::Object(map) => Value::Object(self.validate_object("", map, &mut errors)),
            _ => {
                errors.push("", "expected an object");
                Value::Null
            }
        };
        errors.into_result()?;
        Ok(output)
    }

    pub fn validate_form<I, K, V>(&self, pairs: I) -> Result<Value, ValidationErrors>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let value = reconstruct(pairs)?;
        self.validate(&value)
    }

    /// Reconstructs, validates and deserializes a form submission into `T`.
    pub fn parse_form<T, I, K, V>(&self, pairs: I) -> Result<T, ValidationErrors>
    where
        T: DeserializeOwned,
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let value = self.validate_form(pairs)?;
        serde_json::from_value(value).map_err(|e| ValidationErrors::single("", e.to_string()))
    }

    fn validate_object(
        &self,
        prefix: &str,
        input: &Map<String, Value>,
        errors: &mut ValidationErrors,
    ) -> Map<String, Value> {
        let mut output = Map::new();
        for (name, field) in &self.fields {
            let path = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{}.{}", prefix, name)
            };

            match input.get(name) {
                Some(value) if !is_blank(value) => {
                    if let Some(coerced) = validate_value(&path, value, field, errors) {
                        output.insert(name.clone(), coerced);
                    }
                }
                _ => {
                    if field.required {
                        errors.push(&path, format!("{} is required", path));
                    }
                }
            }
        }
        output
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn validate_value(
    path: &str,
    value: &Value,
    field: &FieldSchema,
    errors: &mut ValidationErrors,
) -> Option<Value> {
    let before = errors.len();
    let output = match &field.kind {
        FieldKind::String | FieldKind::Email | FieldKind::Uuid | FieldKind::Url => {
            let text = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => {
                    errors.push(path, format!("{} must be text", path));
                    return None;
                }
            };
            if let Some(min) = field.min_length {
                if let Some(msg) = rules::min_length(&text, min, path) {
                    errors.push(path, msg);
                }
            }
            if let Some(max) = field.max_length {
                if let Some(msg) = rules::max_length(&text, max, path) {
                    errors.push(path, msg);
                }
            }
            let format_error = match field.kind {
                FieldKind::Email if !is_valid_email(&text) => Some("a valid email address"),
                FieldKind::Uuid if !is_valid_uuid(&text) => Some("a valid UUID"),
                FieldKind::Url if !is_valid_url(&text) => Some("a valid URL"),
                _ => None,
            };
            if let Some(expected) = format_error {
                errors.push(path, format!("{} must be {}", path, expected));
            }
            Value::String(text)
        }
        FieldKind::Integer => {
            let parsed = match value {
                Value::Number(n) => n.as_i64(),
                Value::String(s) => s.trim().parse::<i64>().ok(),
                _ => None,
            };
            let Some(n) = parsed else {
                errors.push(path, format!("{} must be a whole number", path));
                return None;
            };
            check_range(path, n as f64, field, errors);
            Value::Number(Number::from(n))
        }
        FieldKind::Number => {
            let parsed = match value {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            };
            let Some(n) = parsed.and_then(Number::from_f64) else {
                errors.push(path, format!("{} must be a number", path));
                return None;
            };
            check_range(path, n.as_f64().unwrap_or_default(), field, errors);
            Value::Number(n)
        }
        FieldKind::Boolean => {
            let parsed = match value {
                Value::Bool(b) => Some(*b),
                Value::String(s) => match s.trim().to_lowercase().as_str() {
                    "true" | "on" | "yes" | "1" => Some(true),
                    "false" | "off" | "no" | "0" => Some(false),
                    _ => None,
                },
                _ => None,
            };
            let Some(b) = parsed else {
                errors.push(path, format!("{} must be true or false", path));
                return None;
            };
            Value::Bool(b)
        }
        FieldKind::Object(schema) => {
            let Value::Object(map) = value else {
                errors.push(path, format!("{} must be an object", path));
                return None;
            };
            Value::Object(schema.validate_object(path, map, errors))
        }
        FieldKind::Array(items) => {
            let Value::Array(values) = value else {
                errors.push(path, format!("{} must be a list", path));
                return None;
            };
            if let Some(min) = field.min_length {
                if values.len() < min {
                    errors.push(path, format!("{} must have at least {} items", path, min));
                }
            }
            if let Some(max) = field.max_length {
                if values.len() > max {
                    errors.push(path, format!("{} must have no more than {} items", path, max));
                }
            }
            let mut output = Vec::with_capacity(values.len());
            for (i, item) in values.iter().enumerate() {
                let item_path = format!("{}[{}]", path, i);
                if is_blank(item) {
                    if items.required {
                        errors.push(&item_path, format!("{} is required", item_path));
                    }
                    continue;
                }
                if let Some(coerced) = validate_value(&item_path, item, items, errors) {
                    output.push(coerced);
                }
            }
            Value::Array(output)
        }
    };

    (errors.len() == before).then_some(output)
}

fn check_range(path: &str, n: f64, field: &FieldSchema, errors: &mut ValidationErrors) {
    if let Some((min, max)) = field.range {
        if let Some(msg) = rules::range(n, min, max, path) {
            errors.push(path, msg);
        }
    }
}

// === Predicates ===

fn uuid_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[1-5][0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}$")
            .expect("uuid regex")
    })
}

fn email_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex"))
}

/// RFC 4122 versions 1 through 5.
pub fn is_valid_uuid(value: &str) -> bool {
    uuid_pattern().is_match(value)
}

pub fn is_valid_email(value: &str) -> bool {
    email_pattern().is_match(value)
}

pub fn is_valid_url(value: &str) -> bool {
    url::Url::parse(value).is_ok()
}

/// Single-value checks. Each returns `None` when the value passes and a
/// message naming the field when it does not.
pub mod rules {
    pub fn required(value: &str, field: &str) -> Option<String> {
        if value.trim().is_empty() {
            Some(format!("{} is required", field))
        } else {
            None
        }
    }

    pub fn min_length(value: &str, min: usize, field: &str) -> Option<String> {
        if value.chars().count() < min {
            Some(format!("{} must be at least {} characters", field, min))
        } else {
            None
        }
    }

    pub fn max_length(value: &str, max: usize, field: &str) -> Option<String> {
        if value.chars().count() > max {
            Some(format!("{} must be no more than {} characters", field, max))
        } else {
            None
        }
    }

    pub fn range(value: f64, min: f64, max: f64, field: &str) -> Option<String> {
        if value.is_nan() || value < min || value > max {
            Some(format!("{} must be between {} and {}", field, min, max))
        } else {
            None
        }
    }
}
