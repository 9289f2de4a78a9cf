use futures::future::BoxFuture;
use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::errors::{AgentError, AgentResult};
use crate::models::tool::ToolSchema;

/// Declared type of a tool parameter.
///
/// Every variant resolves to one JSON-schema primitive via [`ParamType::json_type`];
/// anything that cannot be expressed precisely degrades to `"string"`.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamType {
    /// No declared type
    Any,
    String,
    Integer,
    Number,
    Boolean,
    /// Any list-like type, with or without an element type
    Array,
    /// Any mapping-like type, with or without key/value types
    Object,
    /// The absent/null marker, only meaningful inside a union
    Null,
    /// `T` or absent
    Optional(Box<ParamType>),
    Union(Vec<ParamType>),
    /// A type with no JSON-schema counterpart
    Other(String),
}

impl ParamType {
    pub fn optional(inner: ParamType) -> Self {
        ParamType::Optional(Box::new(inner))
    }

    pub fn json_type(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::Array => "array",
            ParamType::Object => "object",
            ParamType::Optional(inner) => inner.json_type(),
            ParamType::Union(members) => {
                let concrete: Vec<&ParamType> = members
                    .iter()
                    .filter(|member| !matches!(member, ParamType::Null))
                    .collect();
                match concrete.as_slice() {
                    [single] => single.json_type(),
                    _ => "string",
                }
            }
            ParamType::Any | ParamType::Null | ParamType::Other(_) => "string",
        }
    }

    /// Whether the type admits the absent marker
    pub fn is_nullable(&self) -> bool {
        match self {
            ParamType::Optional(_) | ParamType::Null => true,
            ParamType::Union(members) => members.iter().any(|m| matches!(m, ParamType::Null)),
            _ => false,
        }
    }
}

/// One declared parameter of a tool function
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub ty: ParamType,
    pub default: Option<Value>,
    pub description: Option<String>,
}

impl Parameter {
    pub fn new<S: Into<String>>(name: S, ty: ParamType) -> Self {
        // a nullable parameter without an explicit default defaults to null
        let default = ty.is_nullable().then_some(Value::Null);
        Self {
            name: name.into(),
            ty,
            default,
            description: None,
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }

    fn to_property(&self) -> Value {
        let description = self
            .description
            .clone()
            .unwrap_or_else(|| format!("{} parameter", self.name));
        json!({
            "type": self.ty.json_type(),
            "description": description,
        })
    }
}

/// Arguments bound to a tool's declared parameters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArgs(Map<String, Value>);

impl ToolArgs {
    pub fn new(args: Map<String, Value>) -> Self {
        Self(args)
    }

    /// Deserialize a named argument
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> AgentResult<T> {
        let value = self
            .0
            .get(name)
            .ok_or_else(|| AgentError::InvalidParameters(format!("missing argument '{}'", name)))?;
        serde_json::from_value(value.clone()).map_err(|e| {
            AgentError::InvalidParameters(format!("argument '{}' has the wrong type: {}", name, e))
        })
    }

    /// Like [`ToolArgs::get`], mapping an absent or null argument to `None`
    pub fn get_opt<T: DeserializeOwned>(&self, name: &str) -> AgentResult<Option<T>> {
        match self.0.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(_) => self.get(name).map(Some),
        }
    }

    pub fn raw(&self) -> &Map<String, Value> {
        &self.0
    }
}

pub type ToolFuture = BoxFuture<'static, anyhow::Result<Value>>;
pub type ToolHandler = Arc<dyn Fn(ToolArgs) -> ToolFuture + Send + Sync>;

/// A native callable together with its declared signature.
///
/// This is the input to the schema builder: it plays the part of an
/// introspectable function, with the signature written down explicitly.
#[derive(Clone)]
pub struct ToolFunction {
    name: String,
    doc: Option<String>,
    params: Vec<Parameter>,
    handler: ToolHandler,
}

impl ToolFunction {
    /// Wrap an async callable
    pub fn new<N, F, Fut, R>(name: N, handler: F) -> Self
    where
        N: Into<String>,
        F: Fn(ToolArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
        R: Serialize + 'static,
    {
        Self {
            name: name.into(),
            doc: None,
            params: Vec::new(),
            handler: async_handler(handler),
        }
    }

    /// Wrap a plain synchronous callable
    pub fn from_fn<N, F, R>(name: N, handler: F) -> Self
    where
        N: Into<String>,
        F: Fn(ToolArgs) -> anyhow::Result<R> + Send + Sync + 'static,
        R: Serialize + 'static,
    {
        Self {
            name: name.into(),
            doc: None,
            params: Vec::new(),
            handler: sync_handler(handler),
        }
    }

    /// Documentation string, used as the description when none is supplied
    pub fn doc<S: Into<String>>(mut self, doc: S) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Declare a parameter without a default
    pub fn param<S: Into<String>>(self, name: S, ty: ParamType) -> Self {
        self.parameter(Parameter::new(name, ty))
    }

    /// Declare a parameter with a default value
    pub fn param_with_default<S: Into<String>>(self, name: S, ty: ParamType, default: Value) -> Self {
        self.parameter(Parameter::new(name, ty).with_default(default))
    }

    pub fn parameter(mut self, parameter: Parameter) -> Self {
        self.params.push(parameter);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[Parameter] {
        &self.params
    }
}

fn to_value<R: Serialize>(result: anyhow::Result<R>) -> anyhow::Result<Value> {
    Ok(serde_json::to_value(result?)?)
}

fn async_handler<F, Fut, R>(handler: F) -> ToolHandler
where
    F: Fn(ToolArgs) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
    R: Serialize + 'static,
{
    Arc::new(move |args| handler(args).map(to_value::<R>).boxed())
}

fn sync_handler<F, R>(handler: F) -> ToolHandler
where
    F: Fn(ToolArgs) -> anyhow::Result<R> + Send + Sync + 'static,
    R: Serialize + 'static,
{
    Arc::new(move |args| futures::future::ready(to_value(handler(args))).boxed())
}

impl fmt::Debug for ToolFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolFunction")
            .field("name", &self.name)
            .field("doc", &self.doc)
            .field("params", &self.params)
            .finish()
    }
}

/// Build the object schema for a list of parameters
pub fn build_parameters(params: &[Parameter]) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for param in params {
        properties.insert(param.name.clone(), param.to_property());
        if param.is_required() {
            required.push(Value::String(param.name.clone()));
        }
    }

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// Transform a tool function into the schema sent to the model.
///
/// The description is the override if given, else the function's doc, else a
/// generic `"<name> function"`.
pub fn build_tool_schema(function: &ToolFunction, description: Option<&str>) -> ToolSchema {
    ToolSchema::function(
        function.name.clone(),
        describe(function, description),
        build_parameters(&function.params),
    )
}

fn describe(function: &ToolFunction, description: Option<&str>) -> String {
    description
        .map(str::to_string)
        .or_else(|| function.doc.clone())
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| format!("{} function", function.name))
}

/// A locally executed tool: metadata for the model plus the bound callable
#[derive(Clone)]
pub struct Tool {
    /// The name of the tool
    pub name: String,
    /// A description of what the tool does
    pub description: String,
    /// JSON schema of the parameters the tool accepts
    pub parameters: Value,
    params: Vec<Parameter>,
    handler: ToolHandler,
}

impl Tool {
    /// Create a tool from a function, deriving its schema
    pub fn from_function(function: ToolFunction, description: Option<&str>) -> Self {
        let description = describe(&function, description);
        let parameters = build_parameters(&function.params);
        Tool {
            name: function.name,
            description,
            parameters,
            params: function.params,
            handler: function.handler,
        }
    }

    pub fn to_schema(&self) -> ToolSchema {
        ToolSchema::function(
            self.name.clone(),
            self.description.clone(),
            self.parameters.clone(),
        )
    }

    /// Bind parsed arguments to the declared parameters, the way keyword
    /// arguments bind to a function call: defaults fill the gaps, missing
    /// required or unknown names are rejected.
    pub fn bind(&self, arguments: Value) -> AgentResult<ToolArgs> {
        let mut supplied = match arguments {
            Value::Object(map) => map,
            other => {
                return Err(AgentError::InvalidParameters(format!(
                    "arguments must be a JSON object, got {}",
                    other
                )))
            }
        };

        if let Some(unknown) = supplied
            .keys()
            .find(|key| !self.params.iter().any(|p| &p.name == *key))
        {
            return Err(AgentError::InvalidParameters(format!(
                "{}() got an unexpected argument '{}'",
                self.name, unknown
            )));
        }

        let mut bound = Map::new();
        for param in &self.params {
            match supplied.remove(&param.name).or_else(|| param.default.clone()) {
                Some(value) => {
                    bound.insert(param.name.clone(), value);
                }
                None => {
                    return Err(AgentError::InvalidParameters(format!(
                        "{}() missing required argument '{}'",
                        self.name, param.name
                    )))
                }
            }
        }

        Ok(ToolArgs(bound))
    }

    /// Invoke the tool with already-bound arguments
    pub fn call(&self, args: ToolArgs) -> ToolFuture {
        (self.handler)(args)
    }

    /// Bind and invoke in one step
    pub async fn execute(&self, arguments: Value) -> anyhow::Result<Value> {
        let args = self.bind(arguments)?;
        self.call(args).await
    }
}

impl fmt::Debug for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("parameters", &self.parameters)
            .finish()
    }
}
