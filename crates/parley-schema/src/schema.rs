//! Output schema declarations

use serde_json::{json, Map, Value};

/// Instruction text telling the model how to shape its answer
const FORMAT_INSTRUCTIONS: &str = r#"The output should be formatted as a JSON instance that conforms to the JSON schema below.

As an example, for the schema {"properties": {"foo": {"title": "Foo", "description": "a list of strings", "type": "array", "items": {"type": "string"}}}, "required": ["foo"]}
the object {"foo": ["bar", "baz"]} is a well-formatted instance of the schema. The object {"properties": {"foo": ["bar", "baz"]}} is not well-formatted.

Here is the output schema:
```
"#;

/// Type of a declared field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    String,
    Integer,
    Number,
    Boolean,
    Array(Box<FieldType>),
    Object(Box<OutputSchema>),
}

impl FieldType {
    pub fn array_of(inner: FieldType) -> Self {
        FieldType::Array(Box::new(inner))
    }

    pub fn object(schema: OutputSchema) -> Self {
        FieldType::Object(Box::new(schema))
    }

    fn to_json(&self) -> Value {
        match self {
            FieldType::String => json!({"type": "string"}),
            FieldType::Integer => json!({"type": "integer"}),
            FieldType::Number => json!({"type": "number"}),
            FieldType::Boolean => json!({"type": "boolean"}),
            FieldType::Array(inner) => json!({"type": "array", "items": inner.to_json()}),
            FieldType::Object(schema) => schema.to_json_schema(),
        }
    }
}

/// A named field of an output record
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub description: Option<String>,
    pub field_type: FieldType,
    /// Optional fields may be absent or `null`
    pub required: bool,
    /// Allowed values for a constrained vocabulary
    pub enum_values: Vec<String>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            description: None,
            field_type,
            required: true,
            enum_values: Vec::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn enum_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enum_values = values.into_iter().map(Into::into).collect();
        self
    }

    fn to_json(&self) -> Value {
        let mut property = Map::new();
        property.insert("title".to_string(), Value::String(title_case(&self.name)));
        if let Some(description) = &self.description {
            property.insert(
                "description".to_string(),
                Value::String(description.clone()),
            );
        }

        if let Value::Object(type_json) = self.field_type.to_json() {
            for (key, value) in type_json {
                // Nested object metadata would shadow the field's own
                if (key == "title" || key == "description") && property.contains_key(&key) {
                    continue;
                }
                property.insert(key, value);
            }
        }

        if !self.enum_values.is_empty() {
            let mut values: Vec<Value> = self
                .enum_values
                .iter()
                .map(|v| Value::String(v.clone()))
                .collect();
            if !self.required {
                values.push(Value::Null);
            }
            property.insert("enum".to_string(), Value::Array(values));
        }

        if !self.required {
            if let Some(Value::String(t)) = property.get("type").cloned() {
                property.insert("type".to_string(), json!([t, "null"]));
            }
        }

        Value::Object(property)
    }
}

/// Declared shape of a structured model answer
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSchema {
    pub title: String,
    pub description: Option<String>,
    pub fields: Vec<FieldSpec>,
}

impl OutputSchema {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            fields: Vec::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    pub fn get_field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Render as a JSON Schema object
    pub fn to_json_schema(&self) -> Value {
        let mut schema = Map::new();
        schema.insert("title".to_string(), Value::String(self.title.clone()));
        if let Some(description) = &self.description {
            schema.insert(
                "description".to_string(),
                Value::String(description.clone()),
            );
        }
        schema.insert("type".to_string(), Value::String("object".to_string()));

        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|f| (f.name.clone(), f.to_json()))
            .collect();
        schema.insert("properties".to_string(), Value::Object(properties));

        let required: Vec<Value> = self
            .fields
            .iter()
            .filter(|f| f.required)
            .map(|f| Value::String(f.name.clone()))
            .collect();
        if !required.is_empty() {
            schema.insert("required".to_string(), Value::Array(required));
        }

        Value::Object(schema)
    }

    /// Prompt text describing the expected JSON shape.
    ///
    /// The top-level `title` and `type` keys are dropped from the embedded schema.
    pub fn format_instructions(&self) -> String {
        let mut reduced = self.to_json_schema();
        if let Value::Object(map) = &mut reduced {
            map.remove("title");
            map.remove("type");
        }
        format!("{}{}\n```", FORMAT_INSTRUCTIONS, reduced)
    }
}

/// `political_tendency` -> `Political Tendency`
fn title_case(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
