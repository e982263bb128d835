//! DDL generation for a synthesized relational schema

use super::catalog::SchemaMigrator;
use super::dialect::{get_dialect, SqlDialect, SqlDialectImpl};
use super::schema::{Column, ForeignKey, RelationalSchema, Table};
use crate::error::CompileResult;

/// Generator for SQL DDL (CREATE TABLE, foreign keys, DROP TABLE)
pub struct DdlGenerator {
    dialect: Box<dyn SqlDialectImpl>,
}

impl DdlGenerator {
    /// Create a new DDL generator for the specified dialect
    pub fn new(dialect: SqlDialect) -> Self {
        Self {
            dialect: get_dialect(dialect),
        }
    }

    /// Generate CREATE TABLE statement for a table
    ///
    /// Foreign keys are only inlined for dialects that cannot add them later.
    pub fn generate_table(&self, table: &Table) -> String {
        let mut sql = format!(
            "CREATE TABLE {} (\n",
            self.dialect.quote_identifier(&table.name)
        );

        let mut lines: Vec<String> = table
            .columns
            .iter()
            .map(|column| format!("    {}", self.generate_column(table, column)))
            .collect();

        if !self.dialect.supports_alter_foreign_key() {
            for fk in &table.foreign_keys {
                lines.push(format!("    {}", self.foreign_key_clause(fk)));
            }
        }

        sql.push_str(&lines.join(",\n"));
        sql.push_str("\n)");
        sql
    }

    /// Generate column definition
    fn generate_column(&self, table: &Table, column: &Column) -> String {
        if column.name == table.primary_key && column.auto_increment {
            return self.dialect.auto_increment_primary_key(&column.name);
        }

        let mut col = format!(
            "{} {}",
            self.dialect.quote_identifier(&column.name),
            self.dialect.column_type(column.column_type)
        );
        if column.name == table.primary_key {
            col.push_str(" PRIMARY KEY");
        } else if !column.nullable {
            col.push_str(" NOT NULL");
        }
        col
    }

    fn foreign_key_clause(&self, fk: &ForeignKey) -> String {
        format!(
            "FOREIGN KEY ({}) REFERENCES {} ({})",
            self.quote_list(&fk.columns),
            self.dialect.quote_identifier(&fk.referenced_table),
            self.quote_list(&fk.referenced_columns)
        )
    }

    fn quote_list(&self, names: &[String]) -> String {
        names
            .iter()
            .map(|n| self.dialect.quote_identifier(n))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Generate `ALTER TABLE ... ADD CONSTRAINT` statements for a table
    ///
    /// Empty for dialects that inline foreign keys.
    pub fn generate_foreign_keys(&self, table: &Table) -> Vec<String> {
        if !self.dialect.supports_alter_foreign_key() {
            return Vec::new();
        }
        table
            .foreign_keys
            .iter()
            .map(|fk| {
                format!(
                    "ALTER TABLE {} ADD CONSTRAINT {} {}",
                    self.dialect.quote_identifier(&table.name),
                    self.dialect.quote_identifier(&fk.name),
                    self.foreign_key_clause(fk)
                )
            })
            .collect()
    }

    /// Generate ordered DDL statements for the given tables: every CREATE
    /// TABLE first, then every foreign key
    pub fn generate_tables<'t>(&self, tables: impl IntoIterator<Item = &'t Table>) -> Vec<String> {
        let tables: Vec<&Table> = tables.into_iter().collect();
        let mut statements: Vec<String> =
            tables.iter().map(|t| self.generate_table(t)).collect();
        for table in &tables {
            statements.extend(self.generate_foreign_keys(table));
        }
        statements
    }

    /// Generate complete DDL for a schema
    pub fn generate_schema(&self, schema: &RelationalSchema) -> Vec<String> {
        self.generate_tables(&schema.tables)
    }

    /// Generate DROP TABLE statement
    pub fn generate_drop_table(&self, table: &Table) -> String {
        format!(
            "DROP TABLE IF EXISTS {}",
            self.dialect.quote_identifier(&table.name)
        )
    }

    /// Generate DROP TABLE statements for all tables in reverse creation order
    pub fn generate_drop_schema(&self, schema: &RelationalSchema) -> Vec<String> {
        schema
            .tables
            .iter()
            .rev()
            .map(|t| self.generate_drop_table(t))
            .collect()
    }
}

/// Creates the tables missing from the current schema; existing tables are
/// left untouched
impl SchemaMigrator for DdlGenerator {
    fn current_schema(&self) -> CompileResult<RelationalSchema> {
        Ok(RelationalSchema::new())
    }

    fn migrate(
        &self,
        current: &RelationalSchema,
        desired: &RelationalSchema,
    ) -> CompileResult<Vec<String>> {
        let missing = desired
            .tables
            .iter()
            .filter(|t| current.get_table(&t.name).is_none());
        Ok(self.generate_tables(missing))
    }
}
