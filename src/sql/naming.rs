//! Identifier naming: snake_case conversion and unique table name allocation

use std::collections::HashSet;

use tracing::debug;

use super::catalog::TableCatalog;

/// Convert a camelCase/PascalCase identifier to snake_case for SQL
///
/// Not injective: `Foo_Bar` and `FooBar` both become `foo_bar`.
pub fn to_snake_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 4);
    let mut chars = s.chars().peekable();
    let mut prev_was_upper = false;
    let mut prev_was_underscore = true; // Treat start as after underscore

    while let Some(c) = chars.next() {
        if c == '_' {
            result.push('_');
            prev_was_underscore = true;
            prev_was_upper = false;
        } else if c.is_uppercase() {
            // Add underscore before uppercase if:
            // - Not at start
            // - Previous char was lowercase OR next char is lowercase (for sequences like "HTTPApi" -> "http_api")
            if !prev_was_underscore {
                let next_is_lower = chars.peek().map(|c| c.is_lowercase()).unwrap_or(false);
                if !prev_was_upper || next_is_lower {
                    result.push('_');
                }
            }
            result.extend(c.to_lowercase());
            prev_was_upper = true;
            prev_was_underscore = false;
        } else {
            result.extend(c.to_lowercase());
            prev_was_upper = false;
            prev_was_underscore = false;
        }
    }

    result
}

/// Return `candidate` if it is free, otherwise the first free `candidate_N`
/// for N = 1, 2, ...
pub fn first_free_name(candidate: &str, is_taken: impl Fn(&str) -> bool) -> String {
    if !is_taken(candidate) {
        return candidate.to_string();
    }
    let mut suffix = 1u64;
    loop {
        let name = format!("{}_{}", candidate, suffix);
        if !is_taken(&name) {
            return name;
        }
        suffix += 1;
    }
}

/// Allocates unique table names for one compilation run
///
/// A name is taken when the catalog reports it as existing in the target
/// database, or when it was handed out earlier by this allocator.
pub struct TableNameAllocator<'a> {
    prefix: String,
    catalog: &'a dyn TableCatalog,
    allocated: HashSet<String>,
}

impl<'a> TableNameAllocator<'a> {
    pub fn new(prefix: impl Into<String>, catalog: &'a dyn TableCatalog) -> Self {
        Self {
            prefix: prefix.into(),
            catalog,
            allocated: HashSet::new(),
        }
    }

    /// Allocate `<prefix>_<snake(type_name)>`, disambiguated by suffix
    pub fn allocate(&mut self, type_name: &str) -> String {
        let candidate = format!("{}_{}", self.prefix, to_snake_case(type_name));
        self.claim(&candidate)
    }

    /// Claim an exact candidate name, disambiguated by suffix
    pub fn claim(&mut self, candidate: &str) -> String {
        let name = first_free_name(candidate, |name| self.is_taken(name));
        debug!(table = %name, "allocated table name");
        self.allocated.insert(name.clone());
        name
    }

    /// Check if a name exists in the catalog or was already allocated
    pub fn is_taken(&self, name: &str) -> bool {
        self.allocated.contains(name) || self.catalog.table_exists(name)
    }
}

/// Tracks the column (or output field) names of one table so that no two
/// share a name
#[derive(Debug, Clone, Default)]
pub struct ColumnNames {
    used: HashSet<String>,
}

impl ColumnNames {
    /// Start with the given names already taken
    pub fn reserving(names: &[&str]) -> Self {
        Self {
            used: names.iter().map(|n| n.to_string()).collect(),
        }
    }

    /// Claim `candidate`, or the first free suffixed variant of it
    pub fn claim(&mut self, candidate: &str) -> String {
        let name = first_free_name(candidate, |name| self.used.contains(name));
        self.used.insert(name.clone());
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::catalog::NoTables;
    use std::collections::BTreeSet;

    #[test]
    fn test_snake_case_conversion() {
        assert_eq!(to_snake_case("Human"), "human");
        assert_eq!(to_snake_case("firstName"), "first_name");
        assert_eq!(to_snake_case("Foo_Bar"), "foo_bar");
        assert_eq!(to_snake_case("FooBar"), "foo_bar");
        assert_eq!(to_snake_case("HTTPServer"), "http_server");
        assert_eq!(to_snake_case("getHTTPResponse"), "get_http_response");
        assert_eq!(to_snake_case("already_snake"), "already_snake");
        assert_eq!(to_snake_case(""), "");
    }

    #[test]
    fn test_allocate_free_name() {
        let mut allocator = TableNameAllocator::new("app", &NoTables);
        assert_eq!(allocator.allocate("Human"), "app_human");
        assert_eq!(allocator.allocate("BlogPost"), "app_blog_post");
    }

    #[test]
    fn test_allocate_against_catalog() {
        let existing: BTreeSet<String> = ["app_human".to_string(), "app_human_1".to_string()]
            .into_iter()
            .collect();
        let mut allocator = TableNameAllocator::new("app", &existing);
        assert_eq!(allocator.allocate("Human"), "app_human_2");
    }

    #[test]
    fn test_allocate_case_folding_collision() {
        let mut allocator = TableNameAllocator::new("app", &NoTables);
        assert_eq!(allocator.allocate("Foo_Bar"), "app_foo_bar");
        assert_eq!(allocator.allocate("FooBar"), "app_foo_bar_1");
        assert_eq!(allocator.allocate("fooBar"), "app_foo_bar_2");
    }

    #[test]
    fn test_allocation_is_stable() {
        let existing: BTreeSet<String> = ["app_pet".to_string()].into_iter().collect();
        let run = || {
            let mut allocator = TableNameAllocator::new("app", &existing);
            vec![allocator.allocate("Pet"), allocator.allocate("Human")]
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_column_names() {
        let mut columns = ColumnNames::reserving(&["id"]);
        assert_eq!(columns.claim("name"), "name");
        assert_eq!(columns.claim("id"), "id_1");
        assert_eq!(columns.claim("name"), "name_1");
    }
}
