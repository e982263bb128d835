//! Relational schema synthesis from a type graph
//!
//! Runs in two passes. The first creates one table per type plus one junction
//! table per array/map-of-object property and records every relation. The
//! second wires the recorded relations as foreign keys, once all tables
//! exist, so forward references and cycles need no ordering.

use tracing::{debug, warn};

use super::layout::{DropReason, Slot, TableLayout, TableNames};
use super::schema::{ColumnType, Relation, RelationalSchema, Table};
use crate::error::{CompileResult, CompileWarning};
use crate::graph::TypeGraph;

/// Output of schema synthesis
#[derive(Debug, Clone, PartialEq)]
pub struct Synthesis {
    pub schema: RelationalSchema,
    pub warnings: Vec<CompileWarning>,
}

/// Builds the relational schema of a type graph
pub struct SchemaSynthesizer<'a> {
    graph: &'a TypeGraph,
    tables: &'a TableNames,
}

impl<'a> SchemaSynthesizer<'a> {
    pub fn new(graph: &'a TypeGraph, tables: &'a TableNames) -> Self {
        Self { graph, tables }
    }

    /// Synthesize tables and foreign keys for every type of the graph
    pub fn synthesize(&self) -> CompileResult<Synthesis> {
        let mut schema = RelationalSchema::new();
        let mut pending = Vec::new();
        let mut warnings = Vec::new();

        // Pass 1: tables
        for ty in self.graph.types() {
            let layout = TableLayout::new(ty, self.graph, self.tables)?;
            let mut table = Table::new(layout.table.clone());
            let mut junctions = Vec::new();

            for slot in &layout.slots {
                match slot {
                    Slot::Column {
                        column,
                        column_type,
                        ..
                    } => table.add_column(column.clone(), *column_type),
                    Slot::ForeignKey { column, target, .. } => {
                        table.add_column(column.clone(), ColumnType::Integer);
                        pending.push(Relation::to_primary_key(
                            &layout.table,
                            column.clone(),
                            self.tables.table(target)?,
                        ));
                    }
                    Slot::Junction {
                        target,
                        table: junction_name,
                        owner_column,
                        key_column,
                        target_column,
                        ..
                    } => {
                        let mut junction = Table::new(junction_name.clone())
                            .with_column(owner_column.clone(), ColumnType::Integer);
                        if let Some(key_column) = key_column {
                            junction.add_column(key_column.clone(), ColumnType::String);
                        }
                        junction.add_column(target_column.clone(), ColumnType::Integer);
                        junctions.push(junction);

                        pending.push(Relation::to_primary_key(
                            junction_name.clone(),
                            owner_column.clone(),
                            &layout.table,
                        ));
                        pending.push(Relation::to_primary_key(
                            junction_name.clone(),
                            target_column.clone(),
                            self.tables.table(target)?,
                        ));
                    }
                    Slot::Dropped { property, reason } => {
                        let warning = match reason {
                            DropReason::UnresolvedReference(reference) => {
                                CompileWarning::UnresolvedReference {
                                    owner: ty.name.clone(),
                                    property: property.name.clone(),
                                    reference: reference.clone(),
                                }
                            }
                            DropReason::Composite => CompileWarning::CompositeProperty {
                                owner: ty.name.clone(),
                                property: property.name.clone(),
                            },
                        };
                        warn!("{}", warning);
                        warnings.push(warning);
                    }
                }
            }

            debug!(
                table = %table.name,
                columns = table.columns.len(),
                junctions = junctions.len(),
                "synthesized table"
            );
            schema.add_table(table);
            for junction in junctions {
                schema.add_table(junction);
            }
        }

        // Pass 2: foreign keys
        for relation in pending {
            schema.add_relation(relation);
        }

        Ok(Synthesis { schema, warnings })
    }
}
