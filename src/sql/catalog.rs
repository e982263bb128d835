//! Interfaces to the target database
//!
//! The compiler never talks to a database itself. It asks a [`TableCatalog`]
//! whether a table name is already in use, and hands the synthesized schema to
//! a [`SchemaMigrator`] that owns diffing and DDL execution.

use std::collections::{BTreeSet, HashSet};

use super::schema::RelationalSchema;
use crate::error::CompileResult;

/// Answers "does table X already exist" for the target database
pub trait TableCatalog {
    fn table_exists(&self, name: &str) -> bool;
}

/// Catalog of an empty database
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTables;

impl TableCatalog for NoTables {
    fn table_exists(&self, _name: &str) -> bool {
        false
    }
}

impl TableCatalog for HashSet<String> {
    fn table_exists(&self, name: &str) -> bool {
        self.contains(name)
    }
}

impl TableCatalog for BTreeSet<String> {
    fn table_exists(&self, name: &str) -> bool {
        self.contains(name)
    }
}

impl TableCatalog for Vec<String> {
    fn table_exists(&self, name: &str) -> bool {
        self.iter().any(|t| t == name)
    }
}

impl TableCatalog for RelationalSchema {
    fn table_exists(&self, name: &str) -> bool {
        self.get_table(name).is_some()
    }
}

/// Schema diff/apply collaborator: current schema + desired schema produce
/// an ordered list of DDL statements
pub trait SchemaMigrator {
    /// Schema currently present in the target database
    fn current_schema(&self) -> CompileResult<RelationalSchema>;

    /// Statements that turn `current` into `desired`, in execution order
    fn migrate(
        &self,
        current: &RelationalSchema,
        desired: &RelationalSchema,
    ) -> CompileResult<Vec<String>>;
}
