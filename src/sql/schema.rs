//! Relational schema model and property-to-column type mapping

use serde::Serialize;

use crate::graph::{Element, Format, Property, PropertyKind};

/// Name of the surrogate primary key column of every generated table
pub const PRIMARY_KEY: &str = "id";

/// Abstract relational column types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Integer,
    Boolean,
    Float,
    String,
    Date,
    DateTime,
    Time,
    Json,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Integer => "integer",
            ColumnType::Boolean => "boolean",
            ColumnType::Float => "float",
            ColumnType::String => "string",
            ColumnType::Date => "date",
            ColumnType::DateTime => "datetime",
            ColumnType::Time => "time",
            ColumnType::Json => "json",
        }
    }
}

/// Map a property to its column type
///
/// Returns `None` for properties that are not stored in a column of the
/// owning table: array/map of objects (junction table) and union/intersection.
pub fn column_type(property: &Property) -> Option<ColumnType> {
    match &property.kind {
        PropertyKind::Boolean => Some(ColumnType::Boolean),
        PropertyKind::Integer => Some(ColumnType::Integer),
        PropertyKind::Number => Some(ColumnType::Float),
        PropertyKind::String => Some(match property.format {
            Some(Format::Date) => ColumnType::Date,
            Some(Format::DateTime) => ColumnType::DateTime,
            Some(Format::Time) => ColumnType::Time,
            Some(Format::Other(_)) | None => ColumnType::String,
        }),
        PropertyKind::Object(_) => Some(ColumnType::Integer),
        PropertyKind::Array(Element::Scalar(_)) | PropertyKind::Map(Element::Scalar(_)) => {
            Some(ColumnType::Json)
        }
        PropertyKind::Array(Element::Type(_)) | PropertyKind::Map(Element::Type(_)) => None,
        PropertyKind::Union(_) | PropertyKind::Intersection(_) => None,
    }
}

/// The complete set of generated tables
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RelationalSchema {
    pub tables: Vec<Table>,
    /// Relations in the order they were recorded; each one is also
    /// materialized as a foreign key on its owning table
    pub relations: Vec<Relation>,
}

impl RelationalSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a table by name
    pub fn get_table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    fn get_table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.iter_mut().find(|t| t.name == name)
    }

    pub fn add_table(&mut self, table: Table) {
        self.tables.push(table);
    }

    /// Turn a relation into a foreign key on its owning table
    ///
    /// Returns `false` when the owning table is not part of the schema.
    pub fn add_relation(&mut self, relation: Relation) -> bool {
        let foreign_key = relation.to_foreign_key();
        match self.get_table_mut(&relation.owner_table) {
            Some(table) => {
                table.foreign_keys.push(foreign_key);
                self.relations.push(relation);
                true
            }
            None => false,
        }
    }
}

/// A table with a surrogate auto-increment primary key
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    pub primary_key: String,
    pub foreign_keys: Vec<ForeignKey>,
}

impl Table {
    /// Create a table holding only the `id` primary key column
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: vec![Column {
                name: PRIMARY_KEY.to_string(),
                column_type: ColumnType::Integer,
                nullable: false,
                auto_increment: true,
            }],
            primary_key: PRIMARY_KEY.to_string(),
            foreign_keys: Vec::new(),
        }
    }

    /// Add a nullable column
    pub fn add_column(&mut self, name: impl Into<String>, column_type: ColumnType) {
        self.columns.push(Column::new(name, column_type));
    }

    /// Builder-style variant of [`Table::add_column`]
    pub fn with_column(mut self, name: impl Into<String>, column_type: ColumnType) -> Self {
        self.add_column(name, column_type);
        self
    }

    /// Get a column by name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// A table column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
    pub nullable: bool,
    pub auto_increment: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: true,
            auto_increment: false,
        }
    }
}

/// A foreign key constraint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForeignKey {
    pub name: String,
    pub columns: Vec<String>,
    pub referenced_table: String,
    pub referenced_columns: Vec<String>,
}

/// A relation between two tables, recorded during synthesis and wired as a
/// foreign key once every table exists
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relation {
    pub owner_table: String,
    pub target_table: String,
    pub local_columns: Vec<String>,
    pub target_columns: Vec<String>,
}

impl Relation {
    /// Relation from `owner_table.column` to the primary key of `target_table`
    pub fn to_primary_key(
        owner_table: impl Into<String>,
        column: impl Into<String>,
        target_table: impl Into<String>,
    ) -> Self {
        Self {
            owner_table: owner_table.into(),
            target_table: target_table.into(),
            local_columns: vec![column.into()],
            target_columns: vec![PRIMARY_KEY.to_string()],
        }
    }

    /// Foreign key constraint named `fk_<owner>_<columns>`
    pub fn to_foreign_key(&self) -> ForeignKey {
        ForeignKey {
            name: format!("fk_{}_{}", self.owner_table, self.local_columns.join("_")),
            columns: self.local_columns.clone(),
            referenced_table: self.target_table.clone(),
            referenced_columns: self.target_columns.clone(),
        }
    }
}
