use std::collections::HashSet;

use crate::domain::persistence::Persistence;
use crate::domain::tables::{Column, Index, Table, articles_table};

/// One transactional unit of DDL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStep {
    pub ctx: &'static str,
    pub ddls: Vec<String>,
}

impl MigrationStep {
    fn create_table(database_schema: &str, table: &Table) -> Self {
        Self {
            ctx: "CREATE TABLE",
            ddls: create_table_ddl(database_schema, table),
        }
    }
}

pub struct Migration<P: Persistence> {
    persistence: P,
}

impl<P: Persistence> Migration<P> {
    pub fn new(persistence: P) -> Self {
        Self { persistence }
    }

    /// Create whatever is missing. Returns the number of applied steps.
    pub async fn migrate(&self) -> Result<usize, anyhow::Error> {
        let existing = self.persistence.load().await?;
        let steps = migration_steps(self.persistence.database_schema(), &existing);
        let applied = steps.len();
        self.persistence.apply_migration_steps(steps).await?;
        Ok(applied)
    }
}

pub fn migration_steps(database_schema: &str, existing: &HashSet<String>) -> Vec<MigrationStep> {
    let needed_schema = vec![articles_table()];

    let mut result = Vec::new();
    for table in needed_schema {
        if existing.contains(&table.name) {
            tracing::debug!(table = %table.name, "table exists, skipping");
        } else {
            result.push(MigrationStep::create_table(database_schema, &table));
        }
    }
    result
}

fn create_table_ddl(schema: &str, table: &Table) -> Vec<String> {
    let mut columns = Vec::new();
    let mut pk_columns = Vec::new();

    for column in table.columns.iter() {
        columns.push(column_ddl(column));
        if column.primary_key {
            pk_columns.push(format!("\"{}\"", column.name));
        }
    }

    let columns_sql = columns.join(",\n    ");
    let pk_columns_sql = pk_columns.join(",");

    let table_ddl = format!(
        "CREATE TABLE \"{}\".\"{}\" (\n    {},\n    PRIMARY KEY({})\n)",
        schema, table.name, columns_sql, pk_columns_sql
    );

    let mut ddls = vec![table_ddl];
    for index in table.indexes.iter() {
        ddls.push(create_index_ddl(schema, index));
    }
    ddls
}

fn column_ddl(column: &Column) -> String {
    let mut sql = format!("\"{}\" {}", column.name, column.column_type.sql());
    if column.not_null || column.primary_key {
        sql.push_str(" NOT NULL");
    }
    if let Some(default_value) = &column.default_value {
        sql.push_str(&format!(" DEFAULT {}", default_value));
    }
    sql
}

fn create_index_ddl(schema: &str, index: &Index) -> String {
    let order = if index.descending { " DESC" } else { "" };
    let columns_sql = index
        .columns
        .iter()
        .map(|column| format!("\"{}\"{}", column, order))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "CREATE INDEX \"{}_{}_idx\" ON \"{}\".\"{}\" ({})",
        index.table_name,
        index.columns.join("_"),
        schema,
        index.table_name,
        columns_sql
    )
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Clone, Default)]
    struct RecordingPersistence {
        existing: HashSet<String>,
        applied: Arc<Mutex<Vec<MigrationStep>>>,
    }

    impl Persistence for RecordingPersistence {
        async fn load(&self) -> Result<HashSet<String>, anyhow::Error> {
            Ok(self.existing.clone())
        }

        async fn apply_migration_steps(&self, steps: Vec<MigrationStep>) -> Result<(), anyhow::Error> {
            self.applied.lock().unwrap().extend(steps);
            Ok(())
        }

        fn database_schema(&self) -> &str {
            "public"
        }
    }

    #[test]
    fn missing_articles_table_is_created_with_index() {
        let steps = migration_steps("public", &HashSet::new());

        assert_eq!(steps.len(), 1);
        let ddls = &steps[0].ddls;
        assert!(ddls[0].starts_with("CREATE TABLE \"public\".\"articles\""));
        assert!(ddls[0].contains("\"id\" TEXT NOT NULL"));
        assert!(ddls[0].contains("\"specs\" JSONB NOT NULL DEFAULT '[]'::jsonb"));
        assert!(ddls[0].contains("\"counter_min\" INTEGER,"));
        assert!(ddls[0].contains("PRIMARY KEY(\"id\")"));
        assert_eq!(
            ddls[1],
            "CREATE INDEX \"articles_created_at_idx\" ON \"public\".\"articles\" (\"created_at\" DESC)"
        );
    }

    #[test]
    fn existing_table_needs_no_steps() {
        let existing = HashSet::from(["articles".to_string()]);
        assert!(migration_steps("public", &existing).is_empty());
    }

    #[tokio::test]
    async fn migrate_applies_the_computed_steps() {
        let persistence = RecordingPersistence::default();
        let migration = Migration::new(persistence.clone());

        let applied = migration.migrate().await.unwrap();

        assert_eq!(applied, 1);
        assert_eq!(persistence.applied.lock().unwrap()[0].ctx, "CREATE TABLE");
    }
}
