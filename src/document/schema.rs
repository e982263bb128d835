//! Schema documents describing the output of query documents
//!
//! A schema document holds named definitions, a root definition name and the
//! imports (alias -> registered schema name) needed for references to other
//! types. Only imports that are actually referenced are emitted.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CompileError, CompileResult};
use crate::graph::{Element, Format, PropertyKind, ScalarType, TypeGraph};
use crate::sql::layout::TableLayout;
use crate::sql::naming::ColumnNames;
use crate::sql::schema::PRIMARY_KEY;

/// Import alias under which a collection schema refers to its entity schema
pub const ENTITY_ALIAS: &str = "Entity";

/// Type name -> externally registered schema name
pub type SchemaRegistry = IndexMap<String, String>;

/// Property schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSchemaProperty", into = "RawSchemaProperty")]
pub enum SchemaProperty {
    Scalar {
        kind: ScalarType,
        format: Option<Format>,
    },
    /// `$ref` to a definition, either local (`Human`) or imported
    /// (`Location:Location_Entity`)
    Reference(String),
    Array(Box<SchemaProperty>),
    Map(Box<SchemaProperty>),
    OneOf(Vec<SchemaProperty>),
    AllOf(Vec<SchemaProperty>),
}

impl SchemaProperty {
    pub fn scalar(kind: ScalarType) -> Self {
        SchemaProperty::Scalar { kind, format: None }
    }

    pub fn reference(target: impl Into<String>) -> Self {
        SchemaProperty::Reference(target.into())
    }
}

/// Wire form of [`SchemaProperty`]
#[derive(Serialize, Deserialize)]
struct RawSchemaProperty {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    format: Option<Format>,
    #[serde(rename = "$ref", default, skip_serializing_if = "Option::is_none")]
    reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    items: Option<Box<SchemaProperty>>,
    #[serde(
        rename = "additionalProperties",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    additional_properties: Option<Box<SchemaProperty>>,
    #[serde(rename = "oneOf", default, skip_serializing_if = "Option::is_none")]
    one_of: Option<Vec<SchemaProperty>>,
    #[serde(rename = "allOf", default, skip_serializing_if = "Option::is_none")]
    all_of: Option<Vec<SchemaProperty>>,
}

impl TryFrom<RawSchemaProperty> for SchemaProperty {
    type Error = CompileError;

    fn try_from(raw: RawSchemaProperty) -> CompileResult<Self> {
        if let Some(reference) = raw.reference {
            return Ok(SchemaProperty::Reference(reference));
        }
        if let Some(one_of) = raw.one_of {
            return Ok(SchemaProperty::OneOf(one_of));
        }
        if let Some(all_of) = raw.all_of {
            return Ok(SchemaProperty::AllOf(all_of));
        }

        let kind = raw.kind.unwrap_or_default();
        match (kind.as_str(), raw.items, raw.additional_properties) {
            ("array", Some(items), _) => Ok(SchemaProperty::Array(items)),
            ("object", _, Some(values)) => Ok(SchemaProperty::Map(values)),
            (scalar, _, _) => match ScalarType::parse(scalar) {
                Some(kind) => Ok(SchemaProperty::Scalar {
                    kind,
                    format: raw.format,
                }),
                None => Err(CompileError::InvalidProperty {
                    property: kind.clone(),
                    reason: "unsupported property schema".to_string(),
                }),
            },
        }
    }
}

impl From<SchemaProperty> for RawSchemaProperty {
    fn from(property: SchemaProperty) -> Self {
        let mut raw = RawSchemaProperty {
            kind: None,
            format: None,
            reference: None,
            items: None,
            additional_properties: None,
            one_of: None,
            all_of: None,
        };
        match property {
            SchemaProperty::Scalar { kind, format } => {
                raw.kind = Some(kind.as_str().to_string());
                raw.format = format;
            }
            SchemaProperty::Reference(target) => raw.reference = Some(target),
            SchemaProperty::Array(items) => {
                raw.kind = Some("array".to_string());
                raw.items = Some(items);
            }
            SchemaProperty::Map(values) => {
                raw.kind = Some("object".to_string());
                raw.additional_properties = Some(values);
            }
            SchemaProperty::OneOf(alternatives) => raw.one_of = Some(alternatives),
            SchemaProperty::AllOf(parts) => raw.all_of = Some(parts),
        }
        raw
    }
}

/// Flat property schemas of one type, as registered before compilation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaFragment {
    pub properties: IndexMap<String, SchemaProperty>,
}

impl SchemaFragment {
    /// Derive the fragment of a laid out type, keyed by the same output field
    /// names as its query definition
    ///
    /// References to types outside the graph are left out, the same way the
    /// relational layout leaves them out.
    pub fn from_layout(layout: &TableLayout<'_>, graph: &TypeGraph) -> Self {
        let known = |target: &str| graph.contains(target);
        let element = |element: &Element| match element {
            Element::Scalar(kind) => Some(SchemaProperty::scalar(*kind)),
            Element::Type(target) if known(target.as_str()) => {
                Some(SchemaProperty::reference(target.as_str()))
            }
            Element::Type(_) => None,
        };
        let references = |targets: &[String]| -> Vec<SchemaProperty> {
            targets
                .iter()
                .filter(|t| known(t.as_str()))
                .map(|t| SchemaProperty::reference(t.as_str()))
                .collect()
        };

        let mut properties = IndexMap::new();
        for (field, slot) in layout.fields() {
            let property = slot.property();
            let schema = match &property.kind {
                PropertyKind::Boolean => Some(SchemaProperty::scalar(ScalarType::Boolean)),
                PropertyKind::Integer => Some(SchemaProperty::scalar(ScalarType::Integer)),
                PropertyKind::Number => Some(SchemaProperty::scalar(ScalarType::Number)),
                PropertyKind::String => Some(SchemaProperty::Scalar {
                    kind: ScalarType::String,
                    format: property.format.clone(),
                }),
                PropertyKind::Object(target) if known(target.as_str()) => {
                    Some(SchemaProperty::reference(target.as_str()))
                }
                PropertyKind::Object(_) => None,
                PropertyKind::Array(e) => element(e).map(|s| SchemaProperty::Array(Box::new(s))),
                PropertyKind::Map(e) => element(e).map(|s| SchemaProperty::Map(Box::new(s))),
                PropertyKind::Union(targets) => {
                    Some(references(targets.as_slice())).filter(|r| !r.is_empty()).map(SchemaProperty::OneOf)
                }
                PropertyKind::Intersection(targets) => {
                    Some(references(targets.as_slice())).filter(|r| !r.is_empty()).map(SchemaProperty::AllOf)
                }
            };
            if let Some(schema) = schema {
                properties.insert(field.to_string(), schema);
            }
        }

        Self { properties }
    }
}

/// An object definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaDefinition {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub properties: IndexMap<String, SchemaProperty>,
}

impl SchemaDefinition {
    pub fn object(properties: IndexMap<String, SchemaProperty>) -> Self {
        Self {
            kind: "object",
            properties,
        }
    }
}

/// A schema document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaDocument {
    #[serde(rename = "import", skip_serializing_if = "IndexMap::is_empty")]
    pub imports: IndexMap<String, String>,
    pub definitions: IndexMap<String, SchemaDefinition>,
    #[serde(rename = "root")]
    pub root: String,
}

impl SchemaDocument {
    /// The root definition
    pub fn root_definition(&self) -> Option<&SchemaDefinition> {
        self.definitions.get(&self.root)
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json(&self) -> CompileResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Builds entity and collection schema documents
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaDocumentBuilder;

impl SchemaDocumentBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Entity schema of `type_name`: `id` followed by the fragment's
    /// properties, with every reference rewritten to a local or imported alias
    ///
    /// A fragment property named `id` is renamed `id_1` so that it cannot
    /// replace the primary key.
    pub fn build_entity_schema(
        &self,
        type_name: &str,
        fragment: &SchemaFragment,
        registry: &SchemaRegistry,
    ) -> CompileResult<SchemaDocument> {
        let mut resolver = ReferenceResolver {
            type_name,
            registry,
            imports: IndexMap::new(),
        };

        let mut names = ColumnNames::reserving(&[PRIMARY_KEY]);
        let mut properties = IndexMap::new();
        properties.insert(
            PRIMARY_KEY.to_string(),
            SchemaProperty::scalar(ScalarType::Integer),
        );
        for (name, property) in &fragment.properties {
            let resolved = resolver.resolve(name, property)?;
            properties.insert(names.claim(name), resolved);
        }

        debug!(
            type_name,
            imports = resolver.imports.len(),
            "built entity schema document"
        );

        let mut definitions = IndexMap::new();
        definitions.insert(type_name.to_string(), SchemaDefinition::object(properties));

        Ok(SchemaDocument {
            imports: resolver.imports,
            definitions,
            root: type_name.to_string(),
        })
    }

    /// Collection envelope around a registered entity schema
    pub fn build_collection_schema(
        &self,
        collection_name: &str,
        entity_name: &str,
    ) -> SchemaDocument {
        let integer = || SchemaProperty::scalar(ScalarType::Integer);

        let mut properties = IndexMap::new();
        properties.insert("totalResults".to_string(), integer());
        properties.insert("itemsPerPage".to_string(), integer());
        properties.insert("startIndex".to_string(), integer());
        properties.insert(
            "entry".to_string(),
            SchemaProperty::Array(Box::new(SchemaProperty::reference(format!(
                "{}:{}",
                ENTITY_ALIAS, entity_name
            )))),
        );

        let mut imports = IndexMap::new();
        imports.insert(ENTITY_ALIAS.to_string(), entity_name.to_string());

        let mut definitions = IndexMap::new();
        definitions.insert(
            collection_name.to_string(),
            SchemaDefinition::object(properties),
        );

        SchemaDocument {
            imports,
            definitions,
            root: collection_name.to_string(),
        }
    }
}

/// Rewrites references of one entity schema and records used imports
struct ReferenceResolver<'a> {
    type_name: &'a str,
    registry: &'a SchemaRegistry,
    imports: IndexMap<String, String>,
}

impl ReferenceResolver<'_> {
    fn resolve(&mut self, property: &str, schema: &SchemaProperty) -> CompileResult<SchemaProperty> {
        Ok(match schema {
            SchemaProperty::Scalar { .. } => schema.clone(),
            SchemaProperty::Reference(target) => {
                SchemaProperty::Reference(self.resolve_target(property, target)?)
            }
            SchemaProperty::Array(items) => {
                SchemaProperty::Array(Box::new(self.resolve(property, items)?))
            }
            SchemaProperty::Map(values) => {
                SchemaProperty::Map(Box::new(self.resolve(property, values)?))
            }
            SchemaProperty::OneOf(alternatives) => SchemaProperty::OneOf(
                alternatives
                    .iter()
                    .map(|a| self.resolve(property, a))
                    .collect::<CompileResult<_>>()?,
            ),
            SchemaProperty::AllOf(parts) => SchemaProperty::AllOf(
                parts
                    .iter()
                    .map(|p| self.resolve(property, p))
                    .collect::<CompileResult<_>>()?,
            ),
        })
    }

    fn resolve_target(&mut self, property: &str, target: &str) -> CompileResult<String> {
        if target == self.type_name {
            return Ok(target.to_string());
        }
        let registered =
            self.registry
                .get(target)
                .ok_or_else(|| CompileError::UnresolvedReference {
                    owner: self.type_name.to_string(),
                    property: property.to_string(),
                    reference: target.to_string(),
                })?;
        self.imports
            .entry(target.to_string())
            .or_insert_with(|| registered.clone());
        Ok(format!("{}:{}", target, registered))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Property, TypeDef};
    use crate::sql::catalog::NoTables;
    use crate::sql::layout::TableNames;
    use pretty_assertions::assert_eq;

    fn registry(entries: &[(&str, &str)]) -> SchemaRegistry {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_property_schema_json() {
        let fragment: SchemaFragment = serde_json::from_value(serde_json::json!({
            "properties": {
                "born": {"type": "string", "format": "date"},
                "home": {"$ref": "Location"},
                "pets": {"type": "object", "additionalProperties": {"$ref": "Pet"}},
                "tags": {"type": "array", "items": {"type": "string"}},
                "contact": {"oneOf": [{"$ref": "Email"}, {"$ref": "Phone"}]}
            }
        }))
        .unwrap();

        assert_eq!(
            fragment.properties["born"],
            SchemaProperty::Scalar {
                kind: ScalarType::String,
                format: Some(Format::Date),
            }
        );
        assert_eq!(
            fragment.properties["pets"],
            SchemaProperty::Map(Box::new(SchemaProperty::reference("Pet")))
        );
        assert_eq!(
            serde_json::to_value(&fragment.properties["tags"]).unwrap(),
            serde_json::json!({"type": "array", "items": {"type": "string"}})
        );
        assert!(serde_json::from_str::<SchemaProperty>(r#"{"type": "tuple"}"#).is_err());
    }

    #[test]
    fn test_entity_schema_rewrites_references() {
        let mut fragment = SchemaFragment::default();
        fragment
            .properties
            .insert("name".to_string(), SchemaProperty::scalar(ScalarType::String));
        fragment
            .properties
            .insert("home".to_string(), SchemaProperty::reference("Location"));
        fragment.properties.insert(
            "friends".to_string(),
            SchemaProperty::Array(Box::new(SchemaProperty::reference("Human"))),
        );
        fragment.properties.insert(
            "contact".to_string(),
            SchemaProperty::AllOf(vec![SchemaProperty::reference("Location")]),
        );

        let doc = SchemaDocumentBuilder::new()
            .build_entity_schema(
                "Human",
                &fragment,
                &registry(&[("Location", "Location_Entity"), ("Category", "Category_Entity")]),
            )
            .unwrap();

        assert_eq!(doc.root, "Human");
        assert_eq!(doc.imports, registry(&[("Location", "Location_Entity")]));

        let properties = &doc.root_definition().unwrap().properties;
        let names: Vec<_> = properties.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["id", "name", "home", "friends", "contact"]);
        assert_eq!(
            properties["home"],
            SchemaProperty::reference("Location:Location_Entity")
        );
        assert_eq!(
            properties["friends"],
            SchemaProperty::Array(Box::new(SchemaProperty::reference("Human")))
        );
        assert_eq!(
            properties["contact"],
            SchemaProperty::AllOf(vec![SchemaProperty::reference(
                "Location:Location_Entity"
            )])
        );
    }

    #[test]
    fn test_unregistered_reference() {
        let mut fragment = SchemaFragment::default();
        fragment.properties.insert(
            "pets".to_string(),
            SchemaProperty::Map(Box::new(SchemaProperty::reference("Pet"))),
        );

        let err = SchemaDocumentBuilder::new()
            .build_entity_schema("Human", &fragment, &SchemaRegistry::new())
            .unwrap_err();
        assert!(matches!(
            err,
            CompileError::UnresolvedReference { ref property, ref reference, .. }
                if property == "pets" && reference == "Pet"
        ));
    }

    #[test]
    fn test_collection_schema() {
        let doc = SchemaDocumentBuilder::new()
            .build_collection_schema("Human_Collection", "Human_Entity");

        assert_eq!(
            serde_json::to_value(&doc).unwrap(),
            serde_json::json!({
                "import": {"Entity": "Human_Entity"},
                "definitions": {
                    "Human_Collection": {
                        "type": "object",
                        "properties": {
                            "totalResults": {"type": "integer"},
                            "itemsPerPage": {"type": "integer"},
                            "startIndex": {"type": "integer"},
                            "entry": {"type": "array", "items": {"$ref": "Entity:Human_Entity"}}
                        }
                    }
                },
                "root": "Human_Collection"
            })
        );
    }

    #[test]
    fn test_fragment_from_layout() {
        let graph = TypeGraph::new()
            .with_type(
                TypeDef::new("Human")
                    .with_property(Property::string("born").with_format(Format::DateTime))
                    .with_property(Property::object("home", "Location"))
                    .with_property(Property::object("planet", "Planet"))
                    .with_property(Property::map_of_scalar("scores", ScalarType::Number))
                    .with_property(Property::union(
                        "contact",
                        vec!["Location".to_string(), "Planet".to_string()],
                    )),
            )
            .unwrap()
            .with_type(TypeDef::new("Location"))
            .unwrap();

        let tables = TableNames::allocate(&graph, "app", &NoTables);
        let layout = TableLayout::new(graph.get("Human").unwrap(), &graph, &tables).unwrap();
        let fragment = SchemaFragment::from_layout(&layout, &graph);
        let names: Vec<_> = fragment.properties.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["born", "home", "scores", "contact"]);
        assert_eq!(
            fragment.properties["scores"],
            SchemaProperty::Map(Box::new(SchemaProperty::scalar(ScalarType::Number)))
        );
        assert_eq!(
            fragment.properties["contact"],
            SchemaProperty::OneOf(vec![SchemaProperty::reference("Location")])
        );
    }

    #[test]
    fn test_fragment_id_does_not_replace_primary_key() {
        let mut fragment = SchemaFragment::default();
        fragment
            .properties
            .insert("id".to_string(), SchemaProperty::scalar(ScalarType::String));
        fragment
            .properties
            .insert("name".to_string(), SchemaProperty::scalar(ScalarType::String));

        let doc = SchemaDocumentBuilder::new()
            .build_entity_schema("Human", &fragment, &SchemaRegistry::new())
            .unwrap();
        let properties = &doc.root_definition().unwrap().properties;
        let names: Vec<_> = properties.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["id", "id_1", "name"]);
        assert_eq!(properties["id"], SchemaProperty::scalar(ScalarType::Integer));
        assert_eq!(properties["id_1"], SchemaProperty::scalar(ScalarType::String));
    }
}
