//! Relational schema synthesis and DDL generation from type graphs

use std::collections::HashSet;

use pretty_assertions::assert_eq;
use relgraph::graph::{Property, ScalarType, TypeDef, TypeGraph};
use relgraph::sql::{
    mapping_table, DdlGenerator, NoTables, PropertyMapping, SchemaSynthesizer, Slot, SqlDialect,
    TableLayout, TableNames,
};
use relgraph::CompileWarning;

fn human_location_graph() -> TypeGraph {
    TypeGraph::from_json(
        r#"{
            "types": [
                {
                    "name": "Human",
                    "properties": [
                        {"name": "name", "kind": "string"},
                        {"name": "born", "kind": "string", "format": "date"},
                        {"name": "home", "kind": "object", "reference": "Location"},
                        {"name": "pets", "kind": "map", "reference": "Pet"},
                        {"name": "nicknames", "kind": "array", "reference": "string"}
                    ]
                },
                {
                    "name": "Location",
                    "properties": [
                        {"name": "city", "kind": "string"},
                        {"name": "latitude", "kind": "number"}
                    ]
                },
                {
                    "name": "Pet",
                    "properties": [{"name": "species", "kind": "string"}]
                }
            ]
        }"#,
    )
    .unwrap()
}

fn synthesize(graph: &TypeGraph) -> relgraph::sql::Synthesis {
    let tables = TableNames::allocate(graph, "app", &NoTables);
    SchemaSynthesizer::new(graph, &tables).synthesize().unwrap()
}

#[test]
fn test_colliding_type_names_get_unique_tables() {
    let graph = TypeGraph::new()
        .with_type(TypeDef::new("Foo_Bar"))
        .unwrap()
        .with_type(TypeDef::new("FooBar"))
        .unwrap();

    let tables = TableNames::allocate(&graph, "app", &NoTables);
    assert_eq!(tables.get("Foo_Bar"), Some("app_foo_bar"));
    assert_eq!(tables.get("FooBar"), Some("app_foo_bar_1"));

    let existing: HashSet<String> = ["app_foo_bar".to_string()].into_iter().collect();
    let tables = TableNames::allocate(&graph, "app", &existing);
    assert_eq!(tables.get("Foo_Bar"), Some("app_foo_bar_1"));
    assert_eq!(tables.get("FooBar"), Some("app_foo_bar_2"));
}

#[test]
fn test_table_names_are_injective() {
    let graph = TypeGraph::new()
        .with_type(TypeDef::new("Post").with_property(Property::array_of("tags", "Tag")))
        .unwrap()
        .with_type(TypeDef::new("PostTag"))
        .unwrap()
        .with_type(TypeDef::new("Tag"))
        .unwrap();

    let synthesis = synthesize(&graph);
    let names: Vec<&str> = synthesis
        .schema
        .tables
        .iter()
        .map(|t| t.name.as_str())
        .collect();
    let unique: HashSet<&str> = names.iter().copied().collect();
    assert_eq!(names.len(), unique.len());
    // PostTag claims app_post_tag before the junction table is allocated
    assert!(names.contains(&"app_post_tag"));
    assert!(names.contains(&"app_post_tag_1"));
}

#[test]
fn test_human_location_scenario() {
    let synthesis = synthesize(&human_location_graph());
    let schema = &synthesis.schema;

    assert!(synthesis.warnings.is_empty());
    assert_eq!(
        schema
            .tables
            .iter()
            .map(|t| t.name.as_str())
            .collect::<Vec<_>>(),
        vec!["app_human", "app_human_pet", "app_location", "app_pet"]
    );

    let human = schema.get_table("app_human").unwrap();
    assert_eq!(
        human.column_names(),
        vec!["id", "name", "born", "location_id", "nicknames"]
    );
    assert!(human.columns.iter().skip(1).all(|c| c.nullable));
    assert_eq!(human.foreign_keys.len(), 1);
    assert_eq!(human.foreign_keys[0].name, "fk_app_human_location_id");
    assert_eq!(human.foreign_keys[0].referenced_table, "app_location");
    assert_eq!(human.foreign_keys[0].referenced_columns, vec!["id"]);

    let location = schema.get_table("app_location").unwrap();
    assert_eq!(location.column_names(), vec!["id", "city", "latitude"]);
    assert!(location.foreign_keys.is_empty());
}

#[test]
fn test_map_junction_table() {
    let synthesis = synthesize(&human_location_graph());
    let junction = synthesis.schema.get_table("app_human_pet").unwrap();

    assert_eq!(
        junction.column_names(),
        vec!["id", "human_id", "name", "pet_id"]
    );
    let references: Vec<(&str, &str)> = junction
        .foreign_keys
        .iter()
        .map(|fk| (fk.columns[0].as_str(), fk.referenced_table.as_str()))
        .collect();
    assert_eq!(
        references,
        vec![("human_id", "app_human"), ("pet_id", "app_pet")]
    );
}

#[test]
fn test_self_referencing_junction() {
    let graph = TypeGraph::new()
        .with_type(TypeDef::new("Human").with_property(Property::array_of("friends", "Human")))
        .unwrap();

    let synthesis = synthesize(&graph);
    let junction = synthesis.schema.get_table("app_human_human").unwrap();
    assert_eq!(junction.column_names(), vec!["id", "human_id", "human_id_1"]);
    assert!(junction
        .foreign_keys
        .iter()
        .all(|fk| fk.referenced_table == "app_human"));
}

#[test]
fn test_dangling_references_are_dropped_with_warnings() {
    let graph = TypeGraph::new()
        .with_type(
            TypeDef::new("Human")
                .with_property(Property::string("name"))
                .with_property(Property::object("planet", "Planet"))
                .with_property(Property::array_of("moons", "Moon")),
        )
        .unwrap();

    let synthesis = synthesize(&graph);
    assert_eq!(synthesis.schema.tables.len(), 1);
    assert_eq!(
        synthesis.schema.tables[0].column_names(),
        vec!["id", "name"]
    );
    assert!(synthesis.schema.relations.is_empty());
    assert_eq!(
        synthesis.warnings,
        vec![
            CompileWarning::UnresolvedReference {
                owner: "Human".to_string(),
                property: "planet".to_string(),
                reference: "Planet".to_string(),
            },
            CompileWarning::UnresolvedReference {
                owner: "Human".to_string(),
                property: "moons".to_string(),
                reference: "Moon".to_string(),
            },
        ]
    );
}

#[test]
fn test_every_property_has_exactly_one_storage() {
    let graph = TypeGraph::new()
        .with_type(
            TypeDef::new("Human")
                .with_property(Property::string("name"))
                .with_property(Property::integer("id"))
                .with_property(Property::object("home", "Location"))
                .with_property(Property::object("work", "Location"))
                .with_property(Property::array_of_scalar("scores", ScalarType::Number))
                .with_property(Property::array_of("visited", "Location"))
                .with_property(Property::union(
                    "contact",
                    vec!["Location".to_string()],
                )),
        )
        .unwrap()
        .with_type(TypeDef::new("Location").with_property(Property::string("city")))
        .unwrap();
    let tables = TableNames::allocate(&graph, "app", &NoTables);
    let synthesis = SchemaSynthesizer::new(&graph, &tables).synthesize().unwrap();

    let human = graph.get("Human").unwrap();
    let layout = TableLayout::new(human, &graph, &tables).unwrap();
    let table = synthesis.schema.get_table(&layout.table).unwrap();
    let mapping = mapping_table(&layout);

    for slot in &layout.slots {
        let property = slot.property().name.as_str();
        let entries = mapping
            .values()
            .filter(|m| m.property() == property)
            .count();
        match slot {
            Slot::Column { column, .. } | Slot::ForeignKey { column, .. } => {
                assert!(table.column(column).is_some(), "{} has no column", property);
                assert_eq!(entries, 1, "{}", property);
            }
            Slot::Junction { table: junction, .. } => {
                assert!(synthesis.schema.get_table(junction).is_some());
                assert_eq!(entries, 1, "{}", property);
            }
            Slot::Dropped { .. } => assert_eq!(entries, 0, "{}", property),
        }
    }

    // user-defined `id` and the second Location reference are renamed
    assert_eq!(
        table.column_names(),
        vec!["id", "name", "id_1", "location_id", "location_id_1", "scores"]
    );
    assert_eq!(
        mapping["location_id_1"],
        PropertyMapping::Object {
            property: "work".to_string()
        }
    );
    assert_eq!(
        mapping["visited"].to_string(),
        "visited:array:app_human_location:human_id:location_id"
    );
}

#[test]
fn test_tags_mapping_encoding() {
    let graph = TypeGraph::new()
        .with_type(
            TypeDef::new("Post")
                .with_property(Property::string("title"))
                .with_property(Property::array_of("tags", "Tag")),
        )
        .unwrap()
        .with_type(TypeDef::new("Tag").with_property(Property::string("label")))
        .unwrap();
    let tables = TableNames::allocate(&graph, "app", &NoTables);
    let layout = TableLayout::new(graph.get("Post").unwrap(), &graph, &tables).unwrap();
    let mapping = mapping_table(&layout);

    let encoded: Vec<(String, String)> = mapping
        .iter()
        .map(|(k, v)| (k.clone(), v.to_string()))
        .collect();
    assert_eq!(
        encoded,
        vec![
            ("title".to_string(), "title".to_string()),
            (
                "tags".to_string(),
                "tags:array:app_post_tag:post_id:tag_id".to_string()
            ),
        ]
    );

    let decoded: PropertyMapping = "tags:array:app_post_tag:post_id:tag_id".parse().unwrap();
    assert_eq!(decoded, mapping["tags"]);
}

#[test]
fn test_postgres_ddl_creates_before_constraints() {
    let synthesis = synthesize(&human_location_graph());
    let statements = DdlGenerator::new(SqlDialect::Postgres).generate_schema(&synthesis.schema);

    let first_alter = statements
        .iter()
        .position(|s| s.starts_with("ALTER TABLE"))
        .unwrap();
    assert_eq!(first_alter, 4);
    assert!(statements[..first_alter]
        .iter()
        .all(|s| s.starts_with("CREATE TABLE")));
    assert_eq!(statements.len(), 4 + 3);
    assert!(statements[0].contains("\"born\" DATE"));
    assert!(statements[0].contains("\"nicknames\" JSON"));
}
