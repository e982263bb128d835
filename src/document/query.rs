//! Nested query documents
//!
//! A query document tells the nested-query interpreter how to fetch one type
//! and reassemble it, together with one level of related objects, from flat
//! rows. Nodes serialize to the `$`-keyed JSON shape the interpreter reads:
//!
//! ```json
//! {
//!   "$entity": "SELECT id, name, location_id FROM app_human WHERE id = :id",
//!   "$params": {"id": {"$context": "id"}},
//!   "$definition": {
//!     "id": {"$field": "id", "$type": "integer"},
//!     "name": {"$field": "name", "$type": "string"},
//!     "home": {
//!       "$entity": "SELECT id, city FROM app_location WHERE id = :location_id",
//!       "$params": {"location_id": {"$field": "location_id"}},
//!       "$definition": {...}
//!     }
//!   }
//! }
//! ```

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::error::CompileResult;
use crate::graph::{TypeDef, TypeGraph};
use crate::sql::dialect::{get_dialect, SqlDialect, SqlDialectImpl};
use crate::sql::layout::{Slot, TableLayout, TableNames};
use crate::sql::schema::{ColumnType, PRIMARY_KEY};

/// Composite properties are expanded into sub-queries only below this depth
pub const MAX_EXPANSION_DEPTH: usize = 1;

/// Default number of rows per page of a collection
pub const DEFAULT_PAGE_SIZE: u32 = 16;

/// Alias of the map key selected from a map junction table
pub const MAP_KEY_ALIAS: &str = "hash_key";

/// Context parameter carrying the paging offset of a root collection
pub const START_INDEX_PARAM: &str = "startIndex";

/// Output field name -> node
pub type Definition = IndexMap<String, QueryNode>;

/// Bound query parameters, by placeholder name
pub type Params = IndexMap<String, Param>;

/// Scalar type of a flat field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Integer,
    Number,
    Boolean,
    String,
    Date,
    DateTime,
    Time,
    Json,
}

impl From<ColumnType> for FieldType {
    fn from(column_type: ColumnType) -> Self {
        match column_type {
            ColumnType::Integer => FieldType::Integer,
            ColumnType::Float => FieldType::Number,
            ColumnType::Boolean => FieldType::Boolean,
            ColumnType::String => FieldType::String,
            ColumnType::Date => FieldType::Date,
            ColumnType::DateTime => FieldType::DateTime,
            ColumnType::Time => FieldType::Time,
            ColumnType::Json => FieldType::Json,
        }
    }
}

/// Value bound to a query placeholder
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Param {
    /// Value supplied by the caller (request context)
    Context {
        #[serde(rename = "$context")]
        name: String,
        #[serde(rename = "$default", skip_serializing_if = "Option::is_none")]
        default: Option<serde_json::Value>,
    },
    /// Value of a column of the enclosing row
    Field {
        #[serde(rename = "$field")]
        column: String,
    },
}

impl Param {
    pub fn context(name: impl Into<String>) -> Self {
        Param::Context {
            name: name.into(),
            default: None,
        }
    }

    pub fn field(column: impl Into<String>) -> Self {
        Param::Field {
            column: column.into(),
        }
    }
}

/// A node of the query document tree
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryNode {
    /// List query; `key` turns the result into a map keyed by that column
    Collection {
        #[serde(rename = "$collection")]
        sql: String,
        #[serde(rename = "$params", skip_serializing_if = "IndexMap::is_empty")]
        params: Params,
        #[serde(rename = "$definition")]
        definition: Definition,
        #[serde(rename = "$key", skip_serializing_if = "Option::is_none")]
        key: Option<String>,
    },
    /// Single-row query
    Entity {
        #[serde(rename = "$entity")]
        sql: String,
        #[serde(rename = "$params", skip_serializing_if = "IndexMap::is_empty")]
        params: Params,
        #[serde(rename = "$definition")]
        definition: Definition,
    },
    /// Single scalar selected by a query
    Value {
        #[serde(rename = "$value")]
        sql: String,
        #[serde(rename = "$params", skip_serializing_if = "IndexMap::is_empty")]
        params: Params,
        #[serde(rename = "$column")]
        column: String,
    },
    /// Column of the enclosing row
    Field {
        #[serde(rename = "$field")]
        column: String,
        #[serde(rename = "$type")]
        field_type: FieldType,
    },
    /// Caller-supplied value
    Context {
        #[serde(rename = "$context")]
        name: String,
        #[serde(rename = "$default", skip_serializing_if = "Option::is_none")]
        default: Option<serde_json::Value>,
    },
    /// Constant
    Literal(serde_json::Value),
    /// Plain object of nodes
    Object(Definition),
}

impl QueryNode {
    /// Definition of a collection/entity/object node
    pub fn definition(&self) -> Option<&Definition> {
        match self {
            QueryNode::Collection { definition, .. }
            | QueryNode::Entity { definition, .. }
            | QueryNode::Object(definition) => Some(definition),
            _ => None,
        }
    }

    /// SQL text of a query node
    pub fn sql(&self) -> Option<&str> {
        match self {
            QueryNode::Collection { sql, .. }
            | QueryNode::Entity { sql, .. }
            | QueryNode::Value { sql, .. } => Some(sql),
            _ => None,
        }
    }

    /// Whether this node runs a query of its own
    pub fn is_query(&self) -> bool {
        self.sql().is_some()
    }
}

/// Root query document of a type
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDocument {
    pub root: QueryNode,
    /// Columns selected by the root query of the type's table
    pub columns: Vec<String>,
}

impl Serialize for QueryDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.root.serialize(serializer)
    }
}

impl QueryDocument {
    /// Serialize to pretty-printed JSON
    pub fn to_json(&self) -> CompileResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Builds entity and collection query documents
///
/// Table and column names that are reserved words or not plain lower-case
/// identifiers are quoted in the generated SQL.
pub struct QueryDocumentBuilder<'a> {
    graph: &'a TypeGraph,
    tables: &'a TableNames,
    page_size: u32,
    dialect: Box<dyn SqlDialectImpl>,
}

impl<'a> QueryDocumentBuilder<'a> {
    pub fn new(graph: &'a TypeGraph, tables: &'a TableNames) -> Self {
        Self {
            graph,
            tables,
            page_size: DEFAULT_PAGE_SIZE,
            dialect: get_dialect(SqlDialect::default()),
        }
    }

    /// Set the page size of collections
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set the dialect the SQL text is written for
    pub fn with_dialect(mut self, dialect: SqlDialect) -> Self {
        self.dialect = get_dialect(dialect);
        self
    }

    fn ident(&self, name: &str) -> String {
        self.dialect.quote_if_needed(name)
    }

    /// Comma separated select list, each column optionally qualified
    fn select_list(&self, qualifier: Option<&str>, columns: &[String]) -> Vec<String> {
        columns
            .iter()
            .map(|column| match qualifier {
                Some(alias) => format!("{}.{}", alias, self.ident(column)),
                None => self.ident(column),
            })
            .collect()
    }

    /// Single-entity document keyed by the `id` context parameter
    pub fn build_entity(&self, type_name: &str) -> CompileResult<QueryDocument> {
        let ty = self.graph.resolve(type_name)?;
        let table = self.tables.table(type_name)?;
        let (definition, columns) = self.definition(ty, 0)?;

        let sql = format!(
            "SELECT {} FROM {} WHERE {} = :{}",
            self.select_list(None, &columns).join(", "),
            self.ident(table),
            PRIMARY_KEY,
            PRIMARY_KEY
        );
        debug!(type_name, %sql, "built entity query document");

        let mut params = Params::new();
        params.insert(PRIMARY_KEY.to_string(), Param::context(PRIMARY_KEY));

        Ok(QueryDocument {
            root: QueryNode::Entity {
                sql,
                params,
                definition,
            },
            columns,
        })
    }

    /// Paged collection document with `totalResults`, `startIndex`,
    /// `itemsPerPage` and `entry`
    pub fn build_collection(&self, type_name: &str) -> CompileResult<QueryDocument> {
        let ty = self.graph.resolve(type_name)?;
        let table = self.tables.table(type_name)?;
        let (definition, columns) = self.definition(ty, 0)?;

        let sql = format!(
            "SELECT {} FROM {} ORDER BY {} DESC LIMIT {} OFFSET :{}",
            self.select_list(None, &columns).join(", "),
            self.ident(table),
            PRIMARY_KEY,
            self.page_size,
            START_INDEX_PARAM
        );
        debug!(type_name, %sql, "built collection query document");

        let mut params = Params::new();
        params.insert(
            START_INDEX_PARAM.to_string(),
            Param::Context {
                name: START_INDEX_PARAM.to_string(),
                default: Some(serde_json::json!(0)),
            },
        );

        let mut root = Definition::new();
        root.insert(
            "totalResults".to_string(),
            QueryNode::Value {
                sql: format!("SELECT COUNT(*) AS cnt FROM {}", self.ident(table)),
                params: Params::new(),
                column: "cnt".to_string(),
            },
        );
        root.insert(
            "startIndex".to_string(),
            QueryNode::Context {
                name: START_INDEX_PARAM.to_string(),
                default: Some(serde_json::json!(0)),
            },
        );
        root.insert(
            "itemsPerPage".to_string(),
            QueryNode::Literal(self.page_size.into()),
        );
        root.insert(
            "entry".to_string(),
            QueryNode::Collection {
                sql,
                params,
                definition,
                key: None,
            },
        );

        Ok(QueryDocument {
            root: QueryNode::Object(root),
            columns,
        })
    }

    /// Field definition of `ty` and the columns its query must select
    ///
    /// Entries are keyed by the layout's output field names, so a property
    /// named `id` never replaces the primary key. Object, array and
    /// map-of-object properties become sub-queries only while
    /// `depth < MAX_EXPANSION_DEPTH`; deeper they are dropped, which bounds
    /// the document on cyclic graphs.
    pub fn definition(
        &self,
        ty: &TypeDef,
        depth: usize,
    ) -> CompileResult<(Definition, Vec<String>)> {
        let layout = TableLayout::new(ty, self.graph, self.tables)?;
        let expand = depth < MAX_EXPANSION_DEPTH;

        let mut definition = Definition::new();
        let mut columns = vec![PRIMARY_KEY.to_string()];
        definition.insert(
            PRIMARY_KEY.to_string(),
            QueryNode::Field {
                column: PRIMARY_KEY.to_string(),
                field_type: FieldType::Integer,
            },
        );

        for (field, slot) in layout.fields() {
            match slot {
                Slot::Column {
                    column,
                    column_type,
                    ..
                } => {
                    definition.insert(
                        field.to_string(),
                        QueryNode::Field {
                            column: column.clone(),
                            field_type: (*column_type).into(),
                        },
                    );
                    columns.push(column.clone());
                }
                Slot::ForeignKey { column, target, .. } if expand => {
                    let target_type = self.graph.resolve(target)?;
                    let target_table = self.tables.table(target)?;
                    let (sub_definition, sub_columns) = self.definition(target_type, depth + 1)?;

                    let sql = format!(
                        "SELECT {} FROM {} WHERE {} = :{}",
                        self.select_list(None, &sub_columns).join(", "),
                        self.ident(target_table),
                        PRIMARY_KEY,
                        column
                    );
                    let mut params = Params::new();
                    params.insert(column.clone(), Param::field(column.clone()));

                    definition.insert(
                        field.to_string(),
                        QueryNode::Entity {
                            sql,
                            params,
                            definition: sub_definition,
                        },
                    );
                    columns.push(column.clone());
                }
                Slot::Junction {
                    target,
                    table,
                    owner_column,
                    key_column,
                    target_column,
                    ..
                } if expand => {
                    let target_type = self.graph.resolve(target)?;
                    let target_table = self.tables.table(target)?;
                    let (sub_definition, sub_columns) = self.definition(target_type, depth + 1)?;

                    let mut select = Vec::with_capacity(sub_columns.len() + 1);
                    if let Some(key_column) = key_column {
                        select.push(format!(
                            "rel.{} AS {}",
                            self.ident(key_column),
                            MAP_KEY_ALIAS
                        ));
                    }
                    select.extend(self.select_list(Some("entity"), &sub_columns));

                    let sql = format!(
                        "SELECT {} FROM {} rel INNER JOIN {} entity ON entity.{} = rel.{} \
                         WHERE rel.{} = :{} ORDER BY entity.{} DESC LIMIT {}",
                        select.join(", "),
                        self.ident(table),
                        self.ident(target_table),
                        PRIMARY_KEY,
                        self.ident(target_column),
                        self.ident(owner_column),
                        PRIMARY_KEY,
                        PRIMARY_KEY,
                        self.page_size
                    );
                    let mut params = Params::new();
                    params.insert(PRIMARY_KEY.to_string(), Param::field(PRIMARY_KEY));

                    definition.insert(
                        field.to_string(),
                        QueryNode::Collection {
                            sql,
                            params,
                            definition: sub_definition,
                            key: key_column.as_ref().map(|_| MAP_KEY_ALIAS.to_string()),
                        },
                    );
                }
                // Composite below the depth bound, dangling or union/intersection
                _ => {}
            }
        }

        Ok((definition, columns))
    }
}
