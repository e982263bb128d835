//! WebAssembly bindings for relgraph
//!
//! # Usage from JavaScript
//!
//! ```javascript
//! import init, { compileTypeGraph, generateDdl } from 'relgraph';
//!
//! await init();
//!
//! const graph = JSON.stringify({
//!   types: [
//!     { name: 'Human', properties: [{ name: 'home', kind: 'object', reference: 'Location' }] },
//!     { name: 'Location', properties: [{ name: 'city', kind: 'string' }] },
//!   ],
//! });
//!
//! const result = compileTypeGraph(graph, { tablePrefix: 'app', dialect: 'sqlite' }, ['app_human']);
//! if (result.success) {
//!   console.log(result.compilation.types[0].entityQuery);
//!   console.log(result.ddl);
//! } else {
//!   console.error(result.error);
//! }
//! ```

use std::collections::HashSet;

use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::compiler::{Compiler, CompilerConfig};
use crate::graph::TypeGraph;
use crate::sql::dialect::SqlDialect;

/// Helper to serialize values as plain JS objects (not Maps)
fn to_js_value<T: Serialize>(value: &T) -> JsValue {
    let serializer = serde_wasm_bindgen::Serializer::new().serialize_maps_as_objects(true);
    value.serialize(&serializer).unwrap_or(JsValue::NULL)
}

fn failure(error: String) -> JsValue {
    to_js_value(&serde_json::json!({
        "success": false,
        "error": error,
    }))
}

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Compile a type graph JSON document
///
/// `options` is an optional compiler configuration object and
/// `existingTables` an optional array of table names already in use.
///
/// Returns a JSON object with:
/// - `success`: boolean
/// - `compilation`: schema, per-type artifacts and warnings (if successful)
/// - `ddl`: DDL statements in the configured dialect (if successful)
/// - `error`: error message (if failed)
#[wasm_bindgen(js_name = compileTypeGraph)]
pub fn compile_type_graph(source: &str, options: JsValue, existing_tables: JsValue) -> JsValue {
    let config = if options.is_undefined() || options.is_null() {
        CompilerConfig::default()
    } else {
        match serde_wasm_bindgen::from_value::<CompilerConfig>(options) {
            Ok(config) => config,
            Err(e) => return failure(format!("Invalid options: {}", e)),
        }
    };

    let existing: HashSet<String> = if existing_tables.is_undefined() || existing_tables.is_null()
    {
        HashSet::new()
    } else {
        match serde_wasm_bindgen::from_value::<Vec<String>>(existing_tables) {
            Ok(tables) => tables.into_iter().collect(),
            Err(e) => return failure(format!("Invalid existing tables: {}", e)),
        }
    };

    let graph = match TypeGraph::from_json(source) {
        Ok(graph) => graph,
        Err(e) => return failure(format!("Type graph error: {}", e)),
    };

    let compiler = Compiler::new(config);
    match compiler.compile(&graph, &existing) {
        Ok(compilation) => to_js_value(&serde_json::json!({
            "success": true,
            "ddl": compiler.ddl(&compilation),
            "compilation": compilation,
        })),
        Err(e) => failure(format!("Compilation error: {}", e)),
    }
}

/// Generate DDL for a type graph JSON document
///
/// # Arguments
/// * `source` - The type graph JSON
/// * `dialect` - Either "sqlite" or "postgres"
#[wasm_bindgen(js_name = generateDdl)]
pub fn generate_ddl(source: &str, dialect: &str) -> JsValue {
    let dialect = match dialect.parse::<SqlDialect>() {
        Ok(dialect) => dialect,
        Err(e) => return failure(format!("{}. Use 'sqlite' or 'postgres'.", e)),
    };

    let graph = match TypeGraph::from_json(source) {
        Ok(graph) => graph,
        Err(e) => return failure(format!("Type graph error: {}", e)),
    };

    let compiler = Compiler::new(CompilerConfig::default().with_dialect(dialect));
    match compiler.compile(&graph, &crate::sql::catalog::NoTables) {
        Ok(compilation) => to_js_value(&serde_json::json!({
            "success": true,
            "ddl": compiler.ddl(&compilation),
        })),
        Err(e) => failure(format!("Compilation error: {}", e)),
    }
}
