//! Relational side of type graph compilation
//!
//! This module turns a type graph into a relational schema and renders that
//! schema as DDL for PostgreSQL or SQLite.
//!
//! # Overview
//!
//! The synthesis involves:
//! 1. Allocating a unique table name per type and per junction relation
//! 2. Laying out each type's properties as columns, foreign keys or junctions
//! 3. Building tables and wiring foreign keys once every table exists
//!
//! # Example
//!
//! ```rust
//! use relgraph::graph::{Property, TypeDef, TypeGraph};
//! use relgraph::sql::{DdlGenerator, NoTables, SchemaSynthesizer, SqlDialect, TableNames};
//!
//! let graph = TypeGraph::new()
//!     .with_type(
//!         TypeDef::new("Post")
//!             .with_property(Property::string("title"))
//!             .with_property(Property::array_of("tags", "Tag")),
//!     )?
//!     .with_type(TypeDef::new("Tag").with_property(Property::string("label")))?;
//!
//! let tables = TableNames::allocate(&graph, "app", &NoTables);
//! let synthesis = SchemaSynthesizer::new(&graph, &tables).synthesize()?;
//! assert!(synthesis.schema.get_table("app_post_tag").is_some());
//!
//! let ddl = DdlGenerator::new(SqlDialect::Sqlite).generate_schema(&synthesis.schema);
//! assert_eq!(ddl.len(), 3);
//! # Ok::<(), relgraph::CompileError>(())
//! ```
//!
//! ## SQL Dialects
//!
//! - **PostgreSQL**: `SERIAL` keys, foreign keys added with `ALTER TABLE`
//! - **SQLite**: `AUTOINCREMENT` keys, foreign keys inlined in `CREATE TABLE`

pub mod catalog;
pub mod ddl;
pub mod dialect;
pub mod layout;
pub mod mapping;
pub mod naming;
pub mod schema;
pub mod synthesizer;

// Re-export main types
pub use catalog::{NoTables, SchemaMigrator, TableCatalog};
pub use ddl::DdlGenerator;
pub use dialect::{PostgresDialect, SqlDialect, SqlDialectImpl, SqliteDialect};
pub use layout::{CollectionKind, Slot, TableLayout, TableNames};
pub use mapping::{mapping_table, MappingTable, PropertyMapping};
pub use naming::{to_snake_case, TableNameAllocator};
pub use schema::{Column, ColumnType, ForeignKey, Relation, RelationalSchema, Table};
pub use synthesizer::{SchemaSynthesizer, Synthesis};
