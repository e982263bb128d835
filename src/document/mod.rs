//! Query and schema documents
//!
//! Both document kinds are derived from the same [`TableLayout`] as the
//! relational schema and share its output field names. Every column a query
//! selects exists on its table. Every field a query produces is declared by
//! the matching schema; union and intersection properties have no storage,
//! so they appear in the schema only.
//!
//! [`TableLayout`]: crate::sql::layout::TableLayout

pub mod query;
pub mod schema;

pub use query::{
    Definition, FieldType, Param, Params, QueryDocument, QueryDocumentBuilder, QueryNode,
    DEFAULT_PAGE_SIZE, MAX_EXPANSION_DEPTH,
};
pub use schema::{
    SchemaDefinition, SchemaDocument, SchemaDocumentBuilder, SchemaFragment, SchemaProperty,
    SchemaRegistry,
};
