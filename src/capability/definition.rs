//! Types shared by every capability definition.
//!
//! A capability carries an ordered parameter list and a normalised handler.
//! Protocol callers always supply a single named-argument object; the
//! handler receives it as [`Arguments`], expanded into the declared
//! positional order.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use serde::de::DeserializeOwned;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{json, Map, Value};

use crate::capability::error::{CapabilityError, CapabilityResult, HandlerResult};
use crate::mcp::context::Context;

/// A boxed, sendable future.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Normalised tool handler: named arguments plus the optional execution context.
pub type ToolFn = Arc<dyn Fn(Arguments, Option<Context>) -> BoxFuture<HandlerResult<Value>> + Send + Sync>;

/// Normalised resource handler (concrete resources receive empty arguments).
pub type ResourceFn = Arc<dyn Fn(Arguments) -> BoxFuture<HandlerResult<ResourceBody>> + Send + Sync>;

/// Normalised prompt handler.
pub type PromptFn = Arc<dyn Fn(Arguments) -> BoxFuture<HandlerResult<String>> + Send + Sync>;

/// The four schema types a parameter can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    /// Free text (also the fallback for unrecognised types).
    String,
    /// Any numeric value.
    Number,
    /// A list.
    Array,
    /// A record / map.
    Object,
}

impl ParamType {
    /// Returns the JSON Schema type name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

impl std::fmt::Display for ParamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single declared parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name, unique within its definition.
    pub name: String,
    /// Schema type.
    #[serde(rename = "type")]
    pub param_type: ParamType,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Whether the caller must supply a value.
    #[serde(default)]
    pub required: bool,
}

impl Parameter {
    /// Creates a required parameter with an empty description.
    #[must_use]
    pub fn new(name: impl Into<String>, param_type: ParamType) -> Self {
        Self {
            name: name.into(),
            param_type,
            description: String::new(),
            required: true,
        }
    }

    /// Creates a required string parameter.
    #[must_use]
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::String)
    }

    /// Creates a required number parameter.
    #[must_use]
    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Number)
    }

    /// Creates a required array parameter.
    #[must_use]
    pub fn array(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Array)
    }

    /// Creates a required object parameter.
    #[must_use]
    pub fn object(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Object)
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Marks the parameter as optional.
    #[must_use]
    pub const fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

/// Builds a JSON Schema object for a parameter list.
#[must_use]
pub fn input_schema(parameters: &[Parameter]) -> Value {
    let properties: Map<String, Value> = parameters
        .iter()
        .map(|p| {
            (
                p.name.clone(),
                json!({
                    "type": p.param_type,
                    "description": p.description,
                }),
            )
        })
        .collect();

    let required: Vec<&str> = parameters
        .iter()
        .filter(|p| p.required)
        .map(|p| p.name.as_str())
        .collect();

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// Checks the invariants every capability definition shares.
pub(crate) fn validate_definition(kind: &str, name: &str, parameters: &[Parameter]) -> CapabilityResult<()> {
    if name.trim().is_empty() {
        return Err(CapabilityError::invalid_definition(format!(
            "{kind} name must not be empty"
        )));
    }
    for (index, param) in parameters.iter().enumerate() {
        if param.name.is_empty() {
            return Err(CapabilityError::invalid_definition(format!(
                "{kind} '{name}' has a parameter with an empty name"
            )));
        }
        if parameters[..index].iter().any(|p| p.name == param.name) {
            return Err(CapabilityError::invalid_definition(format!(
                "{kind} '{name}' declares parameter '{}' more than once",
                param.name
            )));
        }
    }
    Ok(())
}

/// Arguments handed to a capability handler.
///
/// Values are laid out in the declared parameter order; a parameter the
/// caller omitted is `Value::Null` in its slot. The original named object
/// stays available through [`Arguments::raw`] for keys that were not
/// declared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    names: Vec<String>,
    values: Vec<Value>,
    raw: Map<String, Value>,
}

impl Arguments {
    /// Expands a named-argument object into the declared positional order.
    #[must_use]
    pub fn expand(parameters: &[Parameter], raw: Map<String, Value>) -> Self {
        let names: Vec<String> = parameters.iter().map(|p| p.name.clone()).collect();
        let values = names
            .iter()
            .map(|name| raw.get(name).cloned().unwrap_or(Value::Null))
            .collect();
        Self { names, values, raw }
    }

    /// Number of declared positions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if no positions were declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the positional values.
    #[must_use]
    pub fn positional(&self) -> &[Value] {
        &self.values
    }

    /// Returns the value at a declared position, `None` if absent or null.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index).filter(|v| !v.is_null())
    }

    /// Returns a value by name, `None` if absent or null.
    #[must_use]
    pub fn named(&self, name: &str) -> Option<&Value> {
        self.names
            .iter()
            .position(|n| n == name)
            .and_then(|index| self.get(index))
            .or_else(|| self.raw.get(name).filter(|v| !v.is_null()))
    }

    /// Returns a string value by name.
    #[must_use]
    pub fn str(&self, name: &str) -> Option<&str> {
        self.named(name).and_then(Value::as_str)
    }

    /// Returns a numeric value by name.
    #[must_use]
    pub fn f64(&self, name: &str) -> Option<f64> {
        self.named(name).and_then(Value::as_f64)
    }

    /// Returns the named-argument object exactly as the caller sent it.
    #[must_use]
    pub const fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }

    /// Deserialises the named-argument object into a typed struct.
    ///
    /// # Errors
    ///
    /// Returns an error if the object does not fit `T`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.raw.clone()))
    }
}

/// Body of a resource read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceBody {
    /// UTF-8 text.
    Text(String),
    /// Binary data, base64-encoded on the wire.
    Blob(Vec<u8>),
}

impl ResourceBody {
    /// Returns the text if this is a text body.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Blob(_) => None,
        }
    }
}

impl From<String> for ResourceBody {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for ResourceBody {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Vec<u8>> for ResourceBody {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Blob(bytes)
    }
}

impl Serialize for ResourceBody {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            Self::Text(text) => map.serialize_entry("text", text)?,
            Self::Blob(bytes) => map.serialize_entry("blob", &BASE64_STANDARD.encode(bytes))?,
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> Vec<Parameter> {
        vec![
            Parameter::string("name").description("Who"),
            Parameter::number("age").optional(),
        ]
    }

    #[test]
    fn schema_lists_required_only() {
        let schema = input_schema(&params());
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["name"]["type"], "string");
        assert_eq!(schema["properties"]["name"]["description"], "Who");
        assert_eq!(schema["properties"]["age"]["type"], "number");
        assert_eq!(schema["required"], json!(["name"]));
    }

    #[test]
    fn expand_follows_declared_order() {
        let raw = json!({"age": 30, "name": "Ada", "extra": true});
        let Value::Object(raw) = raw else { unreachable!() };
        let args = Arguments::expand(&params(), raw);
        assert_eq!(args.positional(), [json!("Ada"), json!(30)]);
        assert_eq!(args.str("name"), Some("Ada"));
        assert_eq!(args.f64("age"), Some(30.0));
        assert_eq!(args.named("extra"), Some(&json!(true)));
    }

    #[test]
    fn missing_argument_is_null_slot() {
        let Value::Object(raw) = json!({"name": "Ada"}) else { unreachable!() };
        let args = Arguments::expand(&params(), raw);
        assert_eq!(args.len(), 2);
        assert_eq!(args.positional()[1], Value::Null);
        assert!(args.get(1).is_none());
        assert!(args.named("age").is_none());
    }

    #[test]
    fn deserialize_typed_arguments() {
        #[derive(Deserialize)]
        struct Greeting {
            name: String,
        }
        let Value::Object(raw) = json!({"name": "Ada"}) else { unreachable!() };
        let args = Arguments::expand(&params(), raw);
        let typed: Greeting = args.deserialize().unwrap();
        assert_eq!(typed.name, "Ada");
    }

    #[test]
    fn reject_duplicate_parameter_names() {
        let dup = vec![Parameter::string("a"), Parameter::number("a")];
        assert!(validate_definition("tool", "t", &dup).is_err());
        assert!(validate_definition("tool", "", &[]).is_err());
        assert!(validate_definition("tool", "t", &params()).is_ok());
    }

    #[test]
    fn resource_body_serialisation() {
        let text = serde_json::to_value(ResourceBody::from("hi")).unwrap();
        assert_eq!(text, json!({"text": "hi"}));
        let blob = serde_json::to_value(ResourceBody::from(vec![1u8, 2, 3])).unwrap();
        assert_eq!(blob, json!({"blob": "AQID"}));
    }
}
