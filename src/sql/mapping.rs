//! Column/property mapping tables for single-table write handlers
//!
//! Each type gets an ordered table keyed by column name. Junction relations
//! have no column on the owning table; they are keyed by a name claimed from
//! the same namespace as the columns, normally the property name:
//!
//! - scalar/json column: `"<property>"`
//! - object column: `"<property>:object"`
//! - array/map of objects: `"<property>:<array|map>:<table>:<ownerColumn>:<foreignColumn>"`

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::layout::{CollectionKind, Slot, TableLayout};
use crate::error::{CompileError, CompileResult};

/// One decoded mapping entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PropertyMapping {
    /// Column stored as-is under the given property
    Scalar { property: String },
    /// Foreign key column holding the id of a single related object
    Object { property: String },
    /// Relation maintained through a junction table
    Relation {
        property: String,
        kind: CollectionKind,
        table: String,
        owner_column: String,
        foreign_column: String,
    },
}

impl PropertyMapping {
    pub fn property(&self) -> &str {
        match self {
            PropertyMapping::Scalar { property }
            | PropertyMapping::Object { property }
            | PropertyMapping::Relation { property, .. } => property,
        }
    }

    /// Decode a mapping entry
    pub fn parse(encoded: &str) -> CompileResult<Self> {
        let invalid = |reason: String| CompileError::InvalidRelationMapping {
            mapping: encoded.to_string(),
            reason,
        };

        let parts: Vec<&str> = encoded.split(':').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(invalid("empty field".to_string()));
        }

        match parts.as_slice() {
            [property] => Ok(PropertyMapping::Scalar {
                property: property.to_string(),
            }),
            [property, "object"] => Ok(PropertyMapping::Object {
                property: property.to_string(),
            }),
            [property, kind, table, owner_column, foreign_column] => {
                let kind = match *kind {
                    "array" => CollectionKind::Array,
                    "map" => CollectionKind::Map,
                    other => return Err(invalid(format!("unknown relation kind '{}'", other))),
                };
                Ok(PropertyMapping::Relation {
                    property: property.to_string(),
                    kind,
                    table: table.to_string(),
                    owner_column: owner_column.to_string(),
                    foreign_column: foreign_column.to_string(),
                })
            }
            [_, kind] => Err(invalid(format!("unknown relation kind '{}'", kind))),
            _ => Err(invalid(format!(
                "expected 1, 2 or 5 fields, got {}",
                parts.len()
            ))),
        }
    }
}

impl fmt::Display for PropertyMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyMapping::Scalar { property } => write!(f, "{}", property),
            PropertyMapping::Object { property } => write!(f, "{}:object", property),
            PropertyMapping::Relation {
                property,
                kind,
                table,
                owner_column,
                foreign_column,
            } => write!(
                f,
                "{}:{}:{}:{}:{}",
                property,
                kind.as_str(),
                table,
                owner_column,
                foreign_column
            ),
        }
    }
}

impl FromStr for PropertyMapping {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PropertyMapping {
    type Error = CompileError;

    fn try_from(value: String) -> CompileResult<Self> {
        Self::parse(&value)
    }
}

impl From<PropertyMapping> for String {
    fn from(mapping: PropertyMapping) -> Self {
        mapping.to_string()
    }
}

/// Mapping table of one type, in property order
pub type MappingTable = IndexMap<String, PropertyMapping>;

/// Derive the mapping table of a type from its layout
pub fn mapping_table(layout: &TableLayout<'_>) -> MappingTable {
    let mut table = MappingTable::new();
    for slot in &layout.slots {
        match slot {
            Slot::Column {
                property, column, ..
            } => {
                table.insert(
                    column.clone(),
                    PropertyMapping::Scalar {
                        property: property.name.clone(),
                    },
                );
            }
            Slot::ForeignKey {
                property, column, ..
            } => {
                table.insert(
                    column.clone(),
                    PropertyMapping::Object {
                        property: property.name.clone(),
                    },
                );
            }
            Slot::Junction {
                property,
                mapping_key,
                kind,
                table: junction,
                owner_column,
                target_column,
                ..
            } => {
                table.insert(
                    mapping_key.clone(),
                    PropertyMapping::Relation {
                        property: property.name.clone(),
                        kind: *kind,
                        table: junction.clone(),
                        owner_column: owner_column.clone(),
                        foreign_column: target_column.clone(),
                    },
                );
            }
            Slot::Dropped { .. } => {}
        }
    }
    table
}
