//! Physical layout of types: table names and per-property storage decisions
//!
//! Schema synthesis, query documents and mapping tables all read the layout
//! from here, so a column named in a query always exists in the schema.

use indexmap::IndexMap;
use serde::Serialize;

use super::catalog::TableCatalog;
use super::naming::{to_snake_case, ColumnNames, TableNameAllocator};
use super::schema::{column_type, ColumnType, PRIMARY_KEY};
use crate::error::{CompileError, CompileResult};
use crate::graph::{Element, Property, PropertyKind, TypeDef, TypeGraph};

/// Name of the map-key column of a map junction table
pub const MAP_KEY_COLUMN: &str = "name";

/// Table names allocated for one compilation run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TableNames {
    /// Type name -> table name
    types: IndexMap<String, String>,
    /// (owner type, property) -> junction table name
    #[serde(skip)]
    junctions: IndexMap<(String, String), String>,
}

impl TableNames {
    /// Allocate every table name of a graph
    ///
    /// Type tables are allocated first in graph order, then junction tables
    /// in graph and property order, all through one allocator.
    pub fn allocate(graph: &TypeGraph, prefix: &str, catalog: &dyn TableCatalog) -> Self {
        let mut allocator = TableNameAllocator::new(prefix, catalog);
        let mut names = TableNames::default();

        for ty in graph.types() {
            let table = allocator.allocate(&ty.name);
            names.types.insert(ty.name.clone(), table);
        }

        for ty in graph.types() {
            for property in &ty.properties {
                let target = match &property.kind {
                    PropertyKind::Array(Element::Type(target))
                    | PropertyKind::Map(Element::Type(target)) => target,
                    _ => continue,
                };
                if !graph.contains(target) {
                    continue;
                }
                let candidate = format!("{}_{}", names.types[&ty.name], to_snake_case(target));
                let table = allocator.claim(&candidate);
                names
                    .junctions
                    .insert((ty.name.clone(), property.name.clone()), table);
            }
        }

        names
    }

    /// Table of a type
    pub fn get(&self, type_name: &str) -> Option<&str> {
        self.types.get(type_name).map(String::as_str)
    }

    /// Table of a type or [`CompileError::UnknownType`]
    pub fn table(&self, type_name: &str) -> CompileResult<&str> {
        self.get(type_name)
            .ok_or_else(|| CompileError::UnknownType(type_name.to_string()))
    }

    /// Junction table of an array/map property
    pub fn junction(&self, type_name: &str, property: &str) -> Option<&str> {
        self.junctions
            .get(&(type_name.to_string(), property.to_string()))
            .map(String::as_str)
    }

    /// Type tables in graph order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.types.iter().map(|(t, n)| (t.as_str(), n.as_str()))
    }
}

/// Array or map cardinality of a junction relation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    Array,
    Map,
}

impl CollectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionKind::Array => "array",
            CollectionKind::Map => "map",
        }
    }
}

/// Why a property has no relational representation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// References a type that is not part of the graph
    UnresolvedReference(String),
    /// Union or intersection
    Composite,
}

/// How one property is stored
#[derive(Debug, Clone, PartialEq)]
pub enum Slot<'g> {
    /// Scalar or json column on the owning table
    Column {
        property: &'g Property,
        column: String,
        column_type: ColumnType,
    },
    /// Integer column referencing the target's primary key
    ForeignKey {
        property: &'g Property,
        column: String,
        target: &'g str,
    },
    /// Junction table holding owner id, optional map key, and target id
    ///
    /// `mapping_key` is claimed from the owning table's column names, so the
    /// mapping table can key junction entries next to columns.
    Junction {
        property: &'g Property,
        mapping_key: String,
        kind: CollectionKind,
        target: &'g str,
        table: String,
        owner_column: String,
        key_column: Option<String>,
        target_column: String,
    },
    Dropped {
        property: &'g Property,
        reason: DropReason,
    },
}

impl<'g> Slot<'g> {
    pub fn property(&self) -> &'g Property {
        match self {
            Slot::Column { property, .. }
            | Slot::ForeignKey { property, .. }
            | Slot::Junction { property, .. }
            | Slot::Dropped { property, .. } => property,
        }
    }
}

/// Storage decisions for every property of one type
#[derive(Debug, Clone, PartialEq)]
pub struct TableLayout<'g> {
    pub type_def: &'g TypeDef,
    pub table: String,
    pub slots: Vec<Slot<'g>>,
    /// Output field name of each slot; never `id`, which is the primary key
    fields: Vec<String>,
}

impl<'g> TableLayout<'g> {
    /// Compute the layout of `type_def`
    pub fn new(
        type_def: &'g TypeDef,
        graph: &'g TypeGraph,
        tables: &TableNames,
    ) -> CompileResult<Self> {
        let table = tables.table(&type_def.name)?.to_string();
        let mut columns = ColumnNames::reserving(&[PRIMARY_KEY]);
        let mut field_names = ColumnNames::reserving(&[PRIMARY_KEY]);
        let mut slots = Vec::with_capacity(type_def.properties.len());
        let mut fields = Vec::with_capacity(type_def.properties.len());

        for property in &type_def.properties {
            fields.push(field_names.claim(&property.name));
            let slot = match &property.kind {
                PropertyKind::Object(target) => {
                    if graph.contains(target) {
                        Slot::ForeignKey {
                            property,
                            column: columns.claim(&format!("{}_id", to_snake_case(target))),
                            target: target.as_str(),
                        }
                    } else {
                        Slot::Dropped {
                            property,
                            reason: DropReason::UnresolvedReference(target.clone()),
                        }
                    }
                }
                PropertyKind::Array(Element::Type(target))
                | PropertyKind::Map(Element::Type(target)) => {
                    let kind = if matches!(property.kind, PropertyKind::Map(_)) {
                        CollectionKind::Map
                    } else {
                        CollectionKind::Array
                    };
                    match tables.junction(&type_def.name, &property.name) {
                        Some(junction) => {
                            let (owner_column, key_column, target_column) =
                                junction_columns(&type_def.name, target, kind);
                            Slot::Junction {
                                property,
                                mapping_key: columns.claim(&property.name),
                                kind,
                                target: target.as_str(),
                                table: junction.to_string(),
                                owner_column,
                                key_column,
                                target_column,
                            }
                        }
                        None => Slot::Dropped {
                            property,
                            reason: DropReason::UnresolvedReference(target.clone()),
                        },
                    }
                }
                PropertyKind::Union(_) | PropertyKind::Intersection(_) => Slot::Dropped {
                    property,
                    reason: DropReason::Composite,
                },
                _ => match column_type(property) {
                    Some(column_type) => Slot::Column {
                        property,
                        column: columns.claim(&to_snake_case(&property.name)),
                        column_type,
                    },
                    None => Slot::Dropped {
                        property,
                        reason: DropReason::Composite,
                    },
                },
            };
            slots.push(slot);
        }

        Ok(Self {
            type_def,
            table,
            slots,
            fields,
        })
    }

    /// Slots paired with their output field names, in property order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Slot<'g>)> {
        self.fields.iter().map(String::as_str).zip(self.slots.iter())
    }

    /// Physical columns of the owning table, `id` first
    pub fn column_names(&self) -> Vec<&str> {
        let mut names = vec![PRIMARY_KEY];
        for slot in &self.slots {
            match slot {
                Slot::Column { column, .. } | Slot::ForeignKey { column, .. } => {
                    names.push(column.as_str())
                }
                _ => {}
            }
        }
        names
    }
}

/// Owner, map-key and target column names of a junction table
fn junction_columns(
    owner: &str,
    target: &str,
    kind: CollectionKind,
) -> (String, Option<String>, String) {
    let mut columns = ColumnNames::reserving(&[PRIMARY_KEY]);
    let owner_column = columns.claim(&format!("{}_id", to_snake_case(owner)));
    let key_column = match kind {
        CollectionKind::Map => Some(columns.claim(MAP_KEY_COLUMN)),
        CollectionKind::Array => None,
    };
    let target_column = columns.claim(&format!("{}_id", to_snake_case(target)));
    (owner_column, key_column, target_column)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ScalarType;
    use crate::sql::catalog::NoTables;

    fn human_graph() -> TypeGraph {
        TypeGraph::new()
            .with_type(
                TypeDef::new("Human")
                    .with_property(Property::string("firstName"))
                    .with_property(Property::object("home", "Location"))
                    .with_property(Property::object("work", "Location"))
                    .with_property(Property::array_of_scalar("tags", ScalarType::String))
                    .with_property(Property::map_of("pets", "Pet"))
                    .with_property(Property::array_of("friends", "Human"))
                    .with_property(Property::object("planet", "Planet"))
                    .with_property(Property::union("contact", vec!["Pet".to_string()])),
            )
            .unwrap()
            .with_type(TypeDef::new("Location").with_property(Property::string("city")))
            .unwrap()
            .with_type(TypeDef::new("Pet").with_property(Property::string("name")))
            .unwrap()
    }

    #[test]
    fn test_table_names() {
        let graph = human_graph();
        let tables = TableNames::allocate(&graph, "app", &NoTables);

        assert_eq!(tables.get("Human"), Some("app_human"));
        assert_eq!(tables.get("Location"), Some("app_location"));
        assert_eq!(tables.get("Pet"), Some("app_pet"));
        assert_eq!(tables.junction("Human", "pets"), Some("app_human_pet"));
        assert_eq!(tables.junction("Human", "friends"), Some("app_human_human"));
        assert_eq!(tables.get("Planet"), None);
        assert!(tables.table("Planet").is_err());
    }

    #[test]
    fn test_junction_names_do_not_collide() {
        let graph = TypeGraph::new()
            .with_type(
                TypeDef::new("Human")
                    .with_property(Property::array_of("pets", "Pet"))
                    .with_property(Property::array_of("formerPets", "Pet")),
            )
            .unwrap()
            .with_type(TypeDef::new("Pet"))
            .unwrap()
            .with_type(TypeDef::new("HumanPet"))
            .unwrap();
        let tables = TableNames::allocate(&graph, "app", &NoTables);

        assert_eq!(tables.get("HumanPet"), Some("app_human_pet"));
        assert_eq!(tables.junction("Human", "pets"), Some("app_human_pet_1"));
        assert_eq!(tables.junction("Human", "formerPets"), Some("app_human_pet_2"));
    }

    #[test]
    fn test_layout_slots() {
        let graph = human_graph();
        let tables = TableNames::allocate(&graph, "app", &NoTables);
        let human = graph.get("Human").unwrap();
        let layout = TableLayout::new(human, &graph, &tables).unwrap();

        assert_eq!(layout.table, "app_human");
        assert_eq!(
            layout.column_names(),
            vec!["id", "first_name", "location_id", "location_id_1", "tags"]
        );

        match &layout.slots[4] {
            Slot::Junction {
                kind,
                table,
                owner_column,
                key_column,
                target_column,
                ..
            } => {
                assert_eq!(*kind, CollectionKind::Map);
                assert_eq!(table, "app_human_pet");
                assert_eq!(owner_column, "human_id");
                assert_eq!(key_column.as_deref(), Some("name"));
                assert_eq!(target_column, "pet_id");
            }
            other => panic!("expected junction, got {:?}", other),
        }

        match &layout.slots[5] {
            Slot::Junction {
                owner_column,
                target_column,
                ..
            } => {
                assert_eq!(owner_column, "human_id");
                assert_eq!(target_column, "human_id_1");
            }
            other => panic!("expected junction, got {:?}", other),
        }

        assert_eq!(
            layout.slots[6],
            Slot::Dropped {
                property: human.property("planet").unwrap(),
                reason: DropReason::UnresolvedReference("Planet".to_string()),
            }
        );
        assert!(matches!(
            layout.slots[7],
            Slot::Dropped {
                reason: DropReason::Composite,
                ..
            }
        ));
    }

    #[test]
    fn test_field_named_id_keeps_primary_key() {
        let graph = TypeGraph::new()
            .with_type(
                TypeDef::new("Human")
                    .with_property(Property::string("id"))
                    .with_property(Property::string("name"))
                    .with_property(Property::object("home", "Location"))
                    .with_property(Property::array_of("location_id", "Location")),
            )
            .unwrap()
            .with_type(TypeDef::new("Location"))
            .unwrap();
        let tables = TableNames::allocate(&graph, "app", &NoTables);
        let layout = TableLayout::new(graph.get("Human").unwrap(), &graph, &tables).unwrap();

        let fields: Vec<&str> = layout.fields().map(|(field, _)| field).collect();
        assert_eq!(fields, vec!["id_1", "name", "home", "location_id"]);
        assert_eq!(
            layout.column_names(),
            vec!["id", "id_1", "name", "location_id"]
        );

        match &layout.slots[3] {
            Slot::Junction { mapping_key, .. } => assert_eq!(mapping_key, "location_id_1"),
            other => panic!("expected junction, got {:?}", other),
        }
    }

    #[test]
    fn test_layout_of_unknown_type() {
        let graph = human_graph();
        let tables = TableNames::allocate(&graph, "app", &NoTables);
        let stranger = TypeDef::new("Stranger");
        let err = TableLayout::new(&stranger, &graph, &tables).unwrap_err();
        assert!(matches!(err, CompileError::UnknownType(name) if name == "Stranger"));
    }
}
