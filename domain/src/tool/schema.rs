//! Declarative field schemas for tool inputs/outputs and planner outputs.
//!
//! A [`Schema`] is an ordered list of [`FieldSpec`]s. Validation collects
//! every violation rather than stopping at the first one, so the caller can
//! hand the planner a complete list to fix in one go.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// JSON type of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
    /// Any JSON value is accepted.
    Any,
}

impl FieldType {
    pub fn as_str(&self) -> &str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Integer => "integer",
            FieldType::Boolean => "boolean",
            FieldType::Object => "object",
            FieldType::Array => "array",
            FieldType::Any => "any",
        }
    }

    fn matches(&self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Number => value.is_number(),
            FieldType::Integer => value.is_i64() || value.is_u64(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Object => value.is_object(),
            FieldType::Array => value.is_array(),
            FieldType::Any => true,
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Constraints for one named field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    /// Allowed values (compared by JSON equality).
    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            field_type,
            required: false,
            enum_values: None,
            minimum: None,
            maximum: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_enum<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.enum_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_min(mut self, min: f64) -> Self {
        self.minimum = Some(min);
        self
    }

    pub fn with_max(mut self, max: f64) -> Self {
        self.maximum = Some(max);
        self
    }

    fn check(&self, value: &Value, errors: &mut Vec<String>) {
        if !self.field_type.matches(value) {
            errors.push(format!(
                "Field '{}' must be of type {}, got {}",
                self.name,
                self.field_type,
                json_type_name(value)
            ));
            return;
        }

        if let Some(allowed) = &self.enum_values
            && !allowed.contains(value)
        {
            let allowed: Vec<String> = allowed.iter().map(|v| v.to_string()).collect();
            errors.push(format!(
                "Field '{}' must be one of [{}], got {}",
                self.name,
                allowed.join(", "),
                value
            ));
        }

        if let Some(n) = value.as_f64() {
            if let Some(min) = self.minimum
                && n < min
            {
                errors.push(format!(
                    "Field '{}' must be >= {}, got {}",
                    self.name, min, n
                ));
            }
            if let Some(max) = self.maximum
                && n > max
            {
                errors.push(format!(
                    "Field '{}' must be <= {}, got {}",
                    self.name, max, n
                ));
            }
        }
    }

    fn to_json_schema(&self) -> Value {
        let mut prop = Map::new();
        if self.field_type != FieldType::Any {
            prop.insert("type".to_string(), Value::from(self.field_type.as_str()));
        }
        if !self.description.is_empty() {
            prop.insert("description".to_string(), Value::from(self.description.clone()));
        }
        if let Some(values) = &self.enum_values {
            prop.insert("enum".to_string(), Value::Array(values.clone()));
        }
        if let Some(min) = self.minimum {
            prop.insert("minimum".to_string(), Value::from(min));
        }
        if let Some(max) = self.maximum {
            prop.insert("maximum".to_string(), Value::from(max));
        }
        Value::Object(prop)
    }
}

/// Ordered field list describing an object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Validate an arbitrary JSON value; non-objects fail unless the schema
    /// declares no fields at all.
    pub fn validate_value(&self, value: &Value) -> Vec<String> {
        match value {
            Value::Object(map) => self.validate(map),
            _ if self.is_empty() => Vec::new(),
            other => vec![format!("Expected an object, got {}", json_type_name(other))],
        }
    }

    /// Validate an argument map. Returns every violation found.
    ///
    /// Unknown keys are tolerated: derived inputs and risk-bound arguments are
    /// spliced in after planning and do not always appear in the schema.
    pub fn validate(&self, args: &Map<String, Value>) -> Vec<String> {
        let mut errors = Vec::new();
        for field in &self.fields {
            match args.get(&field.name) {
                None | Some(Value::Null) => {
                    if field.required {
                        errors.push(format!("Missing required field '{}'", field.name));
                    }
                }
                Some(value) => field.check(value, &mut errors),
            }
        }
        errors
    }

    /// Render as a JSON Schema `object`.
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for field in &self.fields {
            properties.insert(field.name.clone(), field.to_json_schema());
            if field.required {
                required.push(Value::from(field.name.clone()));
            }
        }
        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
