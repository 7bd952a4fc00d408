use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::credentials::ServiceKey;
use crate::schema::Schema;

/// Static identity and documentation of a tool.
///
/// Descriptors are built once (usually into a `Lazy` static) and shared
/// read-only by every invocation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    pub service: ServiceKey,
    pub parameters: Schema,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Schema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl ToolDescriptor {
    pub fn builder(name: impl Into<String>, service: ServiceKey) -> ToolDescriptorBuilder {
        ToolDescriptorBuilder::new(name, service)
    }

    pub fn requires_auth(&self) -> bool {
        self.service.requires_auth()
    }

    /// Function-calling style rendering with JSON-Schema parameters.
    pub fn to_json(&self) -> Value {
        let mut out = json!({
            "name": self.name,
            "description": self.description,
            "service": self.service,
            "parameters": self.parameters.to_json_schema(),
        });
        if let Some(instructions) = &self.instructions {
            out["instructions"] = json!(instructions);
        }
        if let Some(result) = &self.result {
            out["result"] = result.to_json_schema();
        }
        if !self.tags.is_empty() {
            out["tags"] = json!(self.tags);
        }
        out
    }
}

#[derive(Clone, Debug)]
pub struct ToolDescriptorBuilder {
    descriptor: ToolDescriptor,
}

impl ToolDescriptorBuilder {
    pub fn new(name: impl Into<String>, service: ServiceKey) -> Self {
        Self {
            descriptor: ToolDescriptor {
                name: name.into(),
                description: String::new(),
                instructions: None,
                service,
                parameters: Schema::object(),
                result: None,
                tags: Vec::new(),
            },
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.descriptor.description = description.into();
        self
    }

    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.descriptor.instructions = Some(instructions.into());
        self
    }

    pub fn parameters(mut self, schema: Schema) -> Self {
        self.descriptor.parameters = schema;
        self
    }

    pub fn result(mut self, schema: Schema) -> Self {
        self.descriptor.result = Some(schema);
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.descriptor.tags.push(tag.into());
        self
    }

    pub fn build(self) -> ToolDescriptor {
        self.descriptor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_and_json_rendering() {
        let descriptor = ToolDescriptor::builder("jina_search", ServiceKey::Jina)
            .description("Search the web")
            .instructions("Use for fresh results")
            .parameters(Schema::object().required_property("query", Schema::string()))
            .tag("search")
            .build();

        assert!(descriptor.requires_auth());
        let rendered = descriptor.to_json();
        assert_eq!(rendered["name"], "jina_search");
        assert_eq!(rendered["service"], "jina");
        assert_eq!(rendered["parameters"]["required"], json!(["query"]));
        assert_eq!(rendered["tags"], json!(["search"]));
        assert!(rendered.get("result").is_none());
    }
}
