//! Type graph model - the abstract input of the compiler
//!
//! A [`TypeGraph`] is an ordered set of named record types. Properties are
//! either scalars, references to a single object, or collection-valued
//! (array/map) references. Cycles and self references are allowed.

use serde::{Deserialize, Serialize};

use crate::error::{CompileError, CompileResult};

/// An ordered set of uniquely named types
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTypeGraph")]
pub struct TypeGraph {
    types: Vec<TypeDef>,
}

#[derive(Deserialize)]
struct RawTypeGraph {
    #[serde(default)]
    types: Vec<TypeDef>,
}

impl TryFrom<RawTypeGraph> for TypeGraph {
    type Error = CompileError;

    fn try_from(raw: RawTypeGraph) -> CompileResult<Self> {
        let mut graph = TypeGraph::new();
        for ty in raw.types {
            graph.add_type(ty)?;
        }
        Ok(graph)
    }
}

impl TypeGraph {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a serialized type graph document
    pub fn from_json(source: &str) -> CompileResult<Self> {
        Ok(serde_json::from_str(source)?)
    }

    /// Serialize the graph back to its document form
    pub fn to_json(&self) -> CompileResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Add a type; names must be unique (case-sensitive)
    pub fn add_type(&mut self, ty: TypeDef) -> CompileResult<()> {
        if self.contains(&ty.name) {
            return Err(CompileError::DuplicateType(ty.name));
        }
        self.types.push(ty);
        Ok(())
    }

    /// Builder-style variant of [`TypeGraph::add_type`]
    pub fn with_type(mut self, ty: TypeDef) -> CompileResult<Self> {
        self.add_type(ty)?;
        Ok(self)
    }

    /// Get a type by name
    pub fn get(&self, name: &str) -> Option<&TypeDef> {
        self.types.iter().find(|t| t.name == name)
    }

    /// Get a type by name or fail with [`CompileError::UnknownType`]
    pub fn resolve(&self, name: &str) -> CompileResult<&TypeDef> {
        self.get(name)
            .ok_or_else(|| CompileError::UnknownType(name.to_string()))
    }

    /// Check if a type exists
    pub fn contains(&self, name: &str) -> bool {
        self.types.iter().any(|t| t.name == name)
    }

    /// All types in declaration order
    pub fn types(&self) -> impl Iterator<Item = &TypeDef> {
        self.types.iter()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Every (owner, property, reference) whose reference names a type that
    /// is not part of the graph, in graph order
    pub fn unresolved_references(&self) -> Vec<(&str, &str, &str)> {
        let mut missing = Vec::new();
        for ty in &self.types {
            for property in &ty.properties {
                for reference in property.kind.references() {
                    if !self.contains(reference) {
                        missing.push((ty.name.as_str(), property.name.as_str(), reference));
                    }
                }
            }
        }
        missing
    }
}

/// A named record type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDef {
    pub name: String,
    #[serde(default)]
    pub properties: Vec<Property>,
}

impl TypeDef {
    /// Create a new type without properties
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Vec::new(),
        }
    }

    /// Add a property
    pub fn add_property(&mut self, property: Property) {
        self.properties.push(property);
    }

    /// Builder-style variant of [`TypeDef::add_property`]
    pub fn with_property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    /// Get a property by name
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }
}

/// A property of a type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawProperty", into = "RawProperty")]
pub struct Property {
    pub name: String,
    pub kind: PropertyKind,
    /// Only meaningful for string properties
    pub format: Option<Format>,
}

impl Property {
    pub fn new(name: impl Into<String>, kind: PropertyKind) -> Self {
        Self {
            name: name.into(),
            kind,
            format: None,
        }
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, PropertyKind::Boolean)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, PropertyKind::Integer)
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, PropertyKind::Number)
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, PropertyKind::String)
    }

    /// Single-object reference to another type
    pub fn object(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, PropertyKind::Object(target.into()))
    }

    /// Array of objects of another type
    pub fn array_of(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, PropertyKind::Array(Element::Type(target.into())))
    }

    /// Array of scalar values
    pub fn array_of_scalar(name: impl Into<String>, scalar: ScalarType) -> Self {
        Self::new(name, PropertyKind::Array(Element::Scalar(scalar)))
    }

    /// Map of objects of another type, keyed by string
    pub fn map_of(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, PropertyKind::Map(Element::Type(target.into())))
    }

    /// Map of scalar values
    pub fn map_of_scalar(name: impl Into<String>, scalar: ScalarType) -> Self {
        Self::new(name, PropertyKind::Map(Element::Scalar(scalar)))
    }

    pub fn union(name: impl Into<String>, targets: Vec<String>) -> Self {
        Self::new(name, PropertyKind::Union(targets))
    }

    pub fn intersection(name: impl Into<String>, targets: Vec<String>) -> Self {
        Self::new(name, PropertyKind::Intersection(targets))
    }

    /// Set the string format (date, date-time, time, ...)
    pub fn with_format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }
}

/// Closed set of property kinds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyKind {
    Boolean,
    Integer,
    Number,
    String,
    Object(String),
    Array(Element),
    Map(Element),
    Union(Vec<String>),
    Intersection(Vec<String>),
}

impl PropertyKind {
    /// Name of the kind as used in the serialized graph
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyKind::Boolean => "boolean",
            PropertyKind::Integer => "integer",
            PropertyKind::Number => "number",
            PropertyKind::String => "string",
            PropertyKind::Object(_) => "object",
            PropertyKind::Array(_) => "array",
            PropertyKind::Map(_) => "map",
            PropertyKind::Union(_) => "union",
            PropertyKind::Intersection(_) => "intersection",
        }
    }

    /// Type names this kind refers to
    pub fn references(&self) -> Vec<&str> {
        match self {
            PropertyKind::Object(target)
            | PropertyKind::Array(Element::Type(target))
            | PropertyKind::Map(Element::Type(target)) => vec![target.as_str()],
            PropertyKind::Union(targets) | PropertyKind::Intersection(targets) => {
                targets.iter().map(String::as_str).collect()
            }
            _ => Vec::new(),
        }
    }
}

/// Element of an array or map property
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    Scalar(ScalarType),
    Type(String),
}

/// Scalar value kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    Boolean,
    Integer,
    Number,
    String,
}

impl ScalarType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalarType::Boolean => "boolean",
            ScalarType::Integer => "integer",
            ScalarType::Number => "number",
            ScalarType::String => "string",
        }
    }

    /// Parse a scalar kind name, `None` for anything else
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "boolean" => Some(ScalarType::Boolean),
            "integer" => Some(ScalarType::Integer),
            "number" => Some(ScalarType::Number),
            "string" => Some(ScalarType::String),
            _ => None,
        }
    }
}

/// String formats; unrecognized formats are kept verbatim
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Format {
    Date,
    DateTime,
    Time,
    Other(String),
}

impl Format {
    pub fn as_str(&self) -> &str {
        match self {
            Format::Date => "date",
            Format::DateTime => "date-time",
            Format::Time => "time",
            Format::Other(other) => other,
        }
    }
}

impl From<String> for Format {
    fn from(value: String) -> Self {
        match value.as_str() {
            "date" => Format::Date,
            "date-time" => Format::DateTime,
            "time" => Format::Time,
            _ => Format::Other(value),
        }
    }
}

impl From<Format> for String {
    fn from(format: Format) -> Self {
        format.as_str().to_string()
    }
}

/// Wire form of a property: `{name, kind, reference?, references?, format?}`
#[derive(Serialize, Deserialize)]
struct RawProperty {
    name: String,
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reference: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    references: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    format: Option<Format>,
}

impl TryFrom<RawProperty> for Property {
    type Error = CompileError;

    fn try_from(raw: RawProperty) -> CompileResult<Self> {
        let invalid = |reason: &str| CompileError::InvalidProperty {
            property: raw.name.clone(),
            reason: reason.to_string(),
        };

        let element = |reference: &Option<String>| match reference {
            None => Element::Scalar(ScalarType::String),
            Some(name) => match ScalarType::parse(name) {
                Some(scalar) => Element::Scalar(scalar),
                None => Element::Type(name.clone()),
            },
        };

        let kind = match raw.kind.as_str() {
            "boolean" => PropertyKind::Boolean,
            "integer" => PropertyKind::Integer,
            "number" => PropertyKind::Number,
            "string" => PropertyKind::String,
            "object" => match &raw.reference {
                Some(target) => PropertyKind::Object(target.clone()),
                None => return Err(invalid("object property requires a reference")),
            },
            "array" => PropertyKind::Array(element(&raw.reference)),
            "map" => PropertyKind::Map(element(&raw.reference)),
            "union" | "intersection" => {
                let mut targets = raw.references.clone();
                if let Some(reference) = &raw.reference {
                    if !targets.contains(reference) {
                        targets.insert(0, reference.clone());
                    }
                }
                if targets.is_empty() {
                    return Err(invalid("composite property requires references"));
                }
                if raw.kind == "union" {
                    PropertyKind::Union(targets)
                } else {
                    PropertyKind::Intersection(targets)
                }
            }
            other => return Err(invalid(&format!("unrecognized kind '{}'", other))),
        };

        Ok(Property {
            name: raw.name,
            kind,
            format: raw.format,
        })
    }
}

impl From<Property> for RawProperty {
    fn from(property: Property) -> Self {
        let kind = property.kind.as_str().to_string();
        let (reference, references) = match property.kind {
            PropertyKind::Object(target) => (Some(target), Vec::new()),
            PropertyKind::Array(element) | PropertyKind::Map(element) => match element {
                Element::Scalar(scalar) => (Some(scalar.as_str().to_string()), Vec::new()),
                Element::Type(target) => (Some(target), Vec::new()),
            },
            PropertyKind::Union(targets) | PropertyKind::Intersection(targets) => {
                (None, targets)
            }
            _ => (None, Vec::new()),
        };
        RawProperty {
            name: property.name,
            kind,
            reference,
            references,
            format: property.format,
        }
    }
}
