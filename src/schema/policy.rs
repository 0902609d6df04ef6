//! Schema-specific knobs kept as data so query construction never branches on table names.

use std::collections::{HashMap, HashSet};

#[derive(Clone, Debug)]
pub struct SchemaPolicy {
    /// Foreign keys into these tables are never joined.
    pub excluded_join_tables: HashSet<String>,
    /// Referenced table → column surfaced as its human-readable label.
    pub display_columns: HashMap<String, String>,
    /// Label column tried when a referenced table has no entry above.
    pub default_display_column: String,
    /// Business identifiers that are write-once.
    pub immutable_columns: HashSet<String>,
}

impl SchemaPolicy {
    /// Label column configured for `table`, falling back to the default.
    pub fn display_column(&self, table: &str) -> &str {
        self.display_columns
            .get(table)
            .map(String::as_str)
            .unwrap_or(&self.default_display_column)
    }

    pub fn is_excluded_join(&self, table: &str) -> bool {
        self.excluded_join_tables.contains(table)
    }

    pub fn is_immutable(&self, column: &str) -> bool {
        self.immutable_columns.contains(column)
    }
}

impl Default for SchemaPolicy {
    fn default() -> Self {
        SchemaPolicy {
            excluded_join_tables: ["reserva"].into_iter().map(String::from).collect(),
            display_columns: [
                ("cliente", "nombre_comercial"),
                ("producto", "titulo"),
                ("talla", "talla"),
            ]
            .into_iter()
            .map(|(t, c)| (t.to_string(), c.to_string()))
            .collect(),
            default_display_column: "nombre".into(),
            immutable_columns: ["rut"].into_iter().map(String::from).collect(),
        }
    }
}
