use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// Shape of a JSON value.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum SchemaKind {
    #[serde(rename = "null")]
    Null,
    #[serde(rename = "boolean")]
    Boolean,
    #[serde(rename = "integer")]
    Integer {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        minimum: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        maximum: Option<i64>,
    },
    #[serde(rename = "number")]
    Number,
    #[serde(rename = "string")]
    String,
    #[serde(rename = "enum")]
    Enum { values: Vec<String> },
    #[serde(rename = "array")]
    Array { items: Box<Schema> },
    #[serde(rename = "object")]
    Object {
        properties: BTreeMap<String, Schema>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        required: Vec<String>,
        #[serde(default = "Schema::allow_additional")]
        additional: bool,
    },
    #[serde(rename = "any")]
    Any,
}

/// A named, optionally nullable schema node.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Schema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub kind: SchemaKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub nullable: bool,
}

impl Schema {
    pub fn new(kind: SchemaKind) -> Self {
        Self {
            name: None,
            kind,
            description: None,
            nullable: false,
        }
    }

    pub fn string() -> Self {
        Self::new(SchemaKind::String)
    }

    pub fn boolean() -> Self {
        Self::new(SchemaKind::Boolean)
    }

    pub fn number() -> Self {
        Self::new(SchemaKind::Number)
    }

    pub fn integer() -> Self {
        Self::new(SchemaKind::Integer {
            minimum: None,
            maximum: None,
        })
    }

    pub fn integer_range(minimum: i64, maximum: i64) -> Self {
        Self::new(SchemaKind::Integer {
            minimum: Some(minimum),
            maximum: Some(maximum),
        })
    }

    pub fn one_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(SchemaKind::Enum {
            values: values.into_iter().map(Into::into).collect(),
        })
    }

    pub fn array(items: Schema) -> Self {
        Self::new(SchemaKind::Array {
            items: Box::new(items),
        })
    }

    pub fn object() -> Self {
        Self::new(SchemaKind::Object {
            properties: BTreeMap::new(),
            required: Vec::new(),
            additional: true,
        })
    }

    pub fn any() -> Self {
        Self::new(SchemaKind::Any)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Accepts `null` in addition to the declared kind.
    pub fn optional(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Adds an object property; ignored for non-object schemas.
    pub fn property(mut self, name: impl Into<String>, schema: Schema) -> Self {
        if let SchemaKind::Object { properties, .. } = &mut self.kind {
            properties.insert(name.into(), schema);
        }
        self
    }

    pub fn required_property(mut self, name: impl Into<String>, schema: Schema) -> Self {
        let name = name.into();
        if let SchemaKind::Object {
            properties,
            required,
            ..
        } = &mut self.kind
        {
            required.push(name.clone());
            properties.insert(name, schema);
        }
        self
    }

    pub fn deny_additional(mut self) -> Self {
        if let SchemaKind::Object { additional, .. } = &mut self.kind {
            *additional = false;
        }
        self
    }

    /// JSON Schema rendering for registries and protocol bridges.
    pub fn to_json_schema(&self) -> Value {
        let mut out = Map::new();
        let type_name = |name: &str| -> Value {
            if self.nullable {
                json!([name, "null"])
            } else {
                json!(name)
            }
        };
        match &self.kind {
            SchemaKind::Null => {
                out.insert("type".into(), json!("null"));
            }
            SchemaKind::Boolean => {
                out.insert("type".into(), type_name("boolean"));
            }
            SchemaKind::Integer { minimum, maximum } => {
                out.insert("type".into(), type_name("integer"));
                if let Some(min) = minimum {
                    out.insert("minimum".into(), json!(min));
                }
                if let Some(max) = maximum {
                    out.insert("maximum".into(), json!(max));
                }
            }
            SchemaKind::Number => {
                out.insert("type".into(), type_name("number"));
            }
            SchemaKind::String => {
                out.insert("type".into(), type_name("string"));
            }
            SchemaKind::Enum { values } => {
                out.insert("type".into(), type_name("string"));
                let mut allowed: Vec<Value> = values.iter().map(|v| json!(v)).collect();
                if self.nullable {
                    allowed.push(Value::Null);
                }
                out.insert("enum".into(), Value::Array(allowed));
            }
            SchemaKind::Array { items } => {
                out.insert("type".into(), type_name("array"));
                out.insert("items".into(), items.to_json_schema());
            }
            SchemaKind::Object {
                properties,
                required,
                additional,
            } => {
                out.insert("type".into(), type_name("object"));
                let props: Map<String, Value> = properties
                    .iter()
                    .map(|(key, schema)| (key.clone(), schema.to_json_schema()))
                    .collect();
                out.insert("properties".into(), Value::Object(props));
                if !required.is_empty() {
                    out.insert("required".into(), json!(required));
                }
                out.insert("additionalProperties".into(), json!(additional));
            }
            SchemaKind::Any => {}
        }
        if let Some(title) = &self.name {
            out.insert("title".into(), json!(title));
        }
        if let Some(description) = &self.description {
            out.insert("description".into(), json!(description));
        }
        Value::Object(out)
    }

    fn allow_additional() -> bool {
        true
    }
}
