//! relgraph: compile a type graph into tables, query and schema documents.

use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use relgraph::graph::{Format, Property, ScalarType, TypeDef, TypeGraph};
use relgraph::sql::SqlDialect;
use relgraph::{Compilation, Compiler, CompilerConfig};

#[derive(Parser)]
#[command(
    name = "relgraph",
    about = "Compile a type graph into a relational schema, query documents and schema documents",
    version
)]
struct Cli {
    /// Path to the type graph JSON. A built-in demo graph is used when omitted.
    graph: Option<PathBuf>,

    /// Path to a JSON compiler configuration.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// SQL dialect for DDL output (postgres, sqlite).
    #[arg(long)]
    dialect: Option<SqlDialect>,

    /// Prefix of generated table names.
    #[arg(long)]
    prefix: Option<String>,

    /// Table that already exists in the target database (repeatable).
    #[arg(long = "existing-table")]
    existing_tables: Vec<String>,

    /// Print DDL statements instead of the compiled artifacts.
    #[arg(long)]
    ddl: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &cli.config {
        Some(path) => {
            let source = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_json::from_str::<CompilerConfig>(&source)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => CompilerConfig::default(),
    };
    if let Some(dialect) = cli.dialect {
        config.dialect = dialect;
    }
    if let Some(prefix) = cli.prefix {
        config.table_prefix = prefix;
    }

    let graph = match &cli.graph {
        Some(path) => {
            let source = std::fs::read_to_string(path)
                .with_context(|| format!("reading type graph {}", path.display()))?;
            TypeGraph::from_json(&source)
                .with_context(|| format!("parsing type graph {}", path.display()))?
        }
        None => demo_graph()?,
    };

    let existing: HashSet<String> = cli.existing_tables.into_iter().collect();
    let compiler = Compiler::new(config);
    // warnings are logged by the synthesizer and kept in the JSON output
    let compilation = compiler.compile(&graph, &existing)?;
    println!("{}", render(&compiler, &compilation, cli.ddl)?);

    Ok(())
}

/// Standard output of a run: DDL statements or the compiled artifacts
fn render(compiler: &Compiler, compilation: &Compilation, ddl: bool) -> anyhow::Result<String> {
    if ddl {
        Ok(compiler
            .ddl(compilation)
            .iter()
            .map(|statement| format!("{};\n", statement))
            .collect::<Vec<_>>()
            .join("\n"))
    } else {
        Ok(compilation.to_json()?)
    }
}

fn demo_graph() -> relgraph::CompileResult<TypeGraph> {
    TypeGraph::new()
        .with_type(
            TypeDef::new("Human")
                .with_property(Property::string("name"))
                .with_property(Property::string("born").with_format(Format::Date))
                .with_property(Property::object("home", "Location"))
                .with_property(Property::map_of("pets", "Pet"))
                .with_property(Property::array_of_scalar("nicknames", ScalarType::String)),
        )?
        .with_type(
            TypeDef::new("Location")
                .with_property(Property::string("city"))
                .with_property(Property::number("latitude"))
                .with_property(Property::number("longitude")),
        )?
        .with_type(
            TypeDef::new("Pet")
                .with_property(Property::string("name"))
                .with_property(Property::boolean("vaccinated")),
        )
}
