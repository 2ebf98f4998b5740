use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Error, Result};

/// Per-table inclusion predicate derived from include/exclude maps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TableFilter {
    /// Every table is kept.
    #[default]
    All,
    /// Only the listed tables are kept; unlisted schemas keep nothing.
    Include(BTreeMap<String, BTreeSet<String>>),
    /// Every table except the listed ones is kept.
    Exclude(BTreeMap<String, BTreeSet<String>>),
}

impl TableFilter {
    /// Build a filter from schema → table maps. The maps are mutually exclusive.
    pub fn new(
        include: &BTreeMap<String, Vec<String>>,
        exclude: &BTreeMap<String, Vec<String>>,
    ) -> Result<Self> {
        match (include.is_empty(), exclude.is_empty()) {
            (true, true) => Ok(TableFilter::All),
            (false, true) => Ok(TableFilter::Include(to_sets(include))),
            (true, false) => Ok(TableFilter::Exclude(to_sets(exclude))),
            (false, false) => Err(Error::InvalidConfig(
                "include_tables and exclude_tables cannot both be set".to_string(),
            )),
        }
    }

    pub fn allows(&self, schema: &str, table: &str) -> bool {
        match self {
            TableFilter::All => true,
            TableFilter::Include(tables) => tables
                .get(schema)
                .is_some_and(|names| names.contains(table)),
            TableFilter::Exclude(tables) => !tables
                .get(schema)
                .is_some_and(|names| names.contains(table)),
        }
    }
}

fn to_sets(map: &BTreeMap<String, Vec<String>>) -> BTreeMap<String, BTreeSet<String>> {
    map.iter()
        .map(|(schema, tables)| (schema.clone(), tables.iter().cloned().collect()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
        entries
            .iter()
            .map(|(schema, tables)| {
                (
                    schema.to_string(),
                    tables.iter().map(|t| t.to_string()).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn include_keeps_only_listed_tables() {
        let filter = TableFilter::new(&map(&[("public", &["users"])]), &BTreeMap::new()).unwrap();
        assert!(filter.allows("public", "users"));
        assert!(!filter.allows("public", "orders"));
        assert!(!filter.allows("audit", "users"));
    }

    #[test]
    fn exclude_drops_listed_tables() {
        let filter = TableFilter::new(&BTreeMap::new(), &map(&[("public", &["secrets"])])).unwrap();
        assert!(!filter.allows("public", "secrets"));
        assert!(filter.allows("public", "users"));
        assert!(filter.allows("audit", "secrets"));
    }

    #[test]
    fn include_and_exclude_are_exclusive() {
        let err = TableFilter::new(&map(&[("public", &["a"])]), &map(&[("public", &["b"])]))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }
}
