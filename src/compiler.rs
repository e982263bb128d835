//! Type graph compilation
//!
//! Runs the whole pipeline for a graph: table naming, relational schema
//! synthesis, and the per-type query documents, schema documents and mapping
//! tables. Either every artifact is produced or the compilation fails.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::document::query::{QueryDocument, QueryDocumentBuilder, DEFAULT_PAGE_SIZE};
use crate::document::schema::{
    SchemaDocument, SchemaDocumentBuilder, SchemaFragment, SchemaRegistry,
};
use crate::error::{CompileError, CompileResult, CompileWarning};
use crate::graph::TypeGraph;
use crate::sql::catalog::{SchemaMigrator, TableCatalog};
use crate::sql::ddl::DdlGenerator;
use crate::sql::dialect::SqlDialect;
use crate::sql::layout::{TableLayout, TableNames};
use crate::sql::mapping::{mapping_table, MappingTable};
use crate::sql::schema::RelationalSchema;
use crate::sql::synthesizer::SchemaSynthesizer;

/// Default prefix of generated table names
pub const DEFAULT_TABLE_PREFIX: &str = "app";

/// Compilation settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompilerConfig {
    /// Prefix of every generated table name
    pub table_prefix: String,
    /// Dialect used by [`Compiler::ddl`]
    pub dialect: SqlDialect,
    /// Rows per page of collection queries
    pub page_size: u32,
    /// Fail on references to types outside the graph instead of dropping them
    pub strict_references: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            table_prefix: DEFAULT_TABLE_PREFIX.to_string(),
            dialect: SqlDialect::default(),
            page_size: DEFAULT_PAGE_SIZE,
            strict_references: false,
        }
    }
}

impl CompilerConfig {
    pub fn with_table_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.table_prefix = prefix.into();
        self
    }

    pub fn with_dialect(mut self, dialect: SqlDialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_strict_references(mut self, strict: bool) -> Self {
        self.strict_references = strict;
        self
    }
}

/// Registered name of a type's entity schema
pub fn entity_schema_name(type_name: &str) -> String {
    format!("{}_Entity", type_name)
}

/// Registered name of a type's collection schema
pub fn collection_schema_name(type_name: &str) -> String {
    format!("{}_Collection", type_name)
}

/// Artifacts generated for one type
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeArtifacts {
    pub type_name: String,
    pub table_name: String,
    pub entity_query: QueryDocument,
    pub collection_query: QueryDocument,
    pub entity_schema: SchemaDocument,
    pub collection_schema: SchemaDocument,
    pub mapping: MappingTable,
}

/// Result of compiling a type graph
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Compilation {
    pub schema: RelationalSchema,
    pub types: Vec<TypeArtifacts>,
    pub warnings: Vec<CompileWarning>,
}

impl Compilation {
    /// Artifacts of a type
    pub fn get(&self, type_name: &str) -> Option<&TypeArtifacts> {
        self.types.iter().find(|t| t.type_name == type_name)
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json(&self) -> CompileResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Type graph compiler
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    config: CompilerConfig,
}

impl Compiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compile a graph against the tables that already exist in `catalog`
    pub fn compile(
        &self,
        graph: &TypeGraph,
        catalog: &dyn TableCatalog,
    ) -> CompileResult<Compilation> {
        if self.config.strict_references {
            if let Some((owner, property, reference)) =
                graph.unresolved_references().into_iter().next()
            {
                return Err(CompileError::UnresolvedReference {
                    owner: owner.to_string(),
                    property: property.to_string(),
                    reference: reference.to_string(),
                });
            }
        }

        let tables = TableNames::allocate(graph, &self.config.table_prefix, catalog);
        let synthesis = SchemaSynthesizer::new(graph, &tables).synthesize()?;

        let queries = QueryDocumentBuilder::new(graph, &tables)
            .with_page_size(self.config.page_size)
            .with_dialect(self.config.dialect);
        let schemas = SchemaDocumentBuilder::new();
        let registry: SchemaRegistry = graph
            .types()
            .map(|ty| (ty.name.clone(), entity_schema_name(&ty.name)))
            .collect();

        let mut types = Vec::with_capacity(graph.len());
        for ty in graph.types() {
            let layout = TableLayout::new(ty, graph, &tables)?;
            let fragment = SchemaFragment::from_layout(&layout, graph);

            let artifacts = TypeArtifacts {
                type_name: ty.name.clone(),
                table_name: layout.table.clone(),
                entity_query: queries.build_entity(&ty.name)?,
                collection_query: queries.build_collection(&ty.name)?,
                entity_schema: schemas.build_entity_schema(&ty.name, &fragment, &registry)?,
                collection_schema: schemas.build_collection_schema(
                    &collection_schema_name(&ty.name),
                    &entity_schema_name(&ty.name),
                ),
                mapping: mapping_table(&layout),
            };
            debug!(type_name = %ty.name, table = %artifacts.table_name, "compiled type");
            types.push(artifacts);
        }

        info!(
            types = types.len(),
            tables = synthesis.schema.tables.len(),
            warnings = synthesis.warnings.len(),
            "compiled type graph"
        );

        Ok(Compilation {
            schema: synthesis.schema,
            types,
            warnings: synthesis.warnings,
        })
    }

    /// DDL creating the whole schema in the configured dialect
    pub fn ddl(&self, compilation: &Compilation) -> Vec<String> {
        DdlGenerator::new(self.config.dialect).generate_schema(&compilation.schema)
    }

    /// Hand the compiled schema to a migrator and return its statements
    pub fn apply(
        &self,
        compilation: &Compilation,
        migrator: &dyn SchemaMigrator,
    ) -> CompileResult<Vec<String>> {
        let current = migrator.current_schema()?;
        let statements = migrator.migrate(&current, &compilation.schema)?;
        info!(statements = statements.len(), "migrated schema");
        Ok(statements)
    }
}
