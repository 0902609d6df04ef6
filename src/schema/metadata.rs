//! Column and table descriptors materialised from the database catalog.

use crate::db::Record;
use crate::error::SchemaError;
use serde_json::Value;

/// `COLUMN_KEY` as reported by the catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyKind {
    None,
    Primary,
    Unique,
    Multiple,
}

impl KeyKind {
    fn parse(s: &str) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "PRI" => KeyKind::Primary,
            "UNI" => KeyKind::Unique,
            "MUL" => KeyKind::Multiple,
            _ => KeyKind::None,
        }
    }
}

/// Whether the table's primary key spans one column or several.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PkArity {
    Simple,
    Composite,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForeignKeyRef {
    pub table: String,
    pub column: String,
}

/// Coarse value class derived from `DATA_TYPE`, used for request validation and docs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeClass {
    Integer,
    Boolean,
    Decimal,
    Float,
    Date,
    DateTime,
    Time,
    Enum,
    Text,
    Other,
}

#[derive(Clone, Debug)]
pub struct ColumnMetadata {
    pub name: String,
    pub ordinal: u32,
    /// Raw `COLUMN_DEFAULT`; MariaDB reports an explicit `NULL` default as the string "NULL".
    pub default: Option<String>,
    pub nullable: bool,
    pub data_type: String,
    /// Full `COLUMN_TYPE`, e.g. `enum('a','b')` or `tinyint(1)`.
    pub column_type: String,
    pub max_length: Option<u64>,
    pub key: KeyKind,
    /// Set only for primary-key columns.
    pub pk_arity: Option<PkArity>,
    pub extra: String,
    pub references: Option<ForeignKeyRef>,
}

impl ColumnMetadata {
    /// Build from one row of the introspection query.
    pub fn from_catalog_row(table: &str, row: &Record) -> Result<Self, SchemaError> {
        let malformed = |detail: &str| SchemaError::MalformedCatalog {
            table: table.to_string(),
            detail: detail.to_string(),
        };
        let name = text(row, "column_name").ok_or_else(|| malformed("column_name missing"))?;
        let key = KeyKind::parse(&text(row, "column_key").unwrap_or_default());
        let pk_arity = match (key, integer(row, "pk_column_count")) {
            (KeyKind::Primary, Some(n)) if n > 1 => Some(PkArity::Composite),
            (KeyKind::Primary, _) => Some(PkArity::Simple),
            _ => None,
        };
        let references = match (
            text(row, "referenced_table_name"),
            text(row, "referenced_column_name"),
        ) {
            (Some(t), Some(c)) if !t.is_empty() => Some(ForeignKeyRef { table: t, column: c }),
            _ => None,
        };
        Ok(ColumnMetadata {
            ordinal: integer(row, "ordinal_position").unwrap_or(0) as u32,
            default: text(row, "column_default"),
            nullable: text(row, "is_nullable")
                .map(|s| s.eq_ignore_ascii_case("YES"))
                .unwrap_or(true),
            data_type: text(row, "data_type")
                .ok_or_else(|| malformed("data_type missing"))?
                .to_ascii_lowercase(),
            column_type: text(row, "column_type").unwrap_or_default(),
            max_length: integer(row, "character_maximum_length").map(|n| n as u64),
            key,
            pk_arity,
            extra: text(row, "extra").unwrap_or_default(),
            references,
            name,
        })
    }

    pub fn is_primary(&self) -> bool {
        self.key == KeyKind::Primary
    }

    pub fn is_simple_primary(&self) -> bool {
        self.pk_arity == Some(PkArity::Simple)
    }

    pub fn is_composite_primary(&self) -> bool {
        self.pk_arity == Some(PkArity::Composite)
    }

    pub fn is_auto_increment(&self) -> bool {
        contains_ci(&self.extra, "auto_increment")
    }

    /// True when the catalog reports a meaningful default. NULL, empty and `0` defaults
    /// count as none, so such columns stay insertable and, when NOT NULL, required.
    pub fn has_default(&self) -> bool {
        match self.default.as_deref().map(str::trim) {
            None | Some("") | Some("0") => false,
            Some(d) => !d.eq_ignore_ascii_case("NULL"),
        }
    }

    /// `DEFAULT CURRENT_TIMESTAMP` or `ON UPDATE CURRENT_TIMESTAMP` columns are maintained by the server.
    pub fn is_auto_timestamp(&self) -> bool {
        self.default
            .as_deref()
            .map(|d| contains_ci(d, "current_timestamp"))
            .unwrap_or(false)
            || contains_ci(&self.extra, "on update")
    }

    pub fn is_enum(&self) -> bool {
        self.data_type == "enum"
    }

    /// Values of an `enum(...)` column, unquoted; empty for other types.
    pub fn enum_values(&self) -> Vec<String> {
        if !self.is_enum() {
            return Vec::new();
        }
        let body = self
            .column_type
            .find('(')
            .zip(self.column_type.rfind(')'))
            .map(|(start, end)| &self.column_type[start + 1..end])
            .unwrap_or("");
        parse_quoted_list(body)
    }

    pub fn type_class(&self) -> TypeClass {
        match self.data_type.as_str() {
            "tinyint" if self.column_type.eq_ignore_ascii_case("tinyint(1)") => TypeClass::Boolean,
            "tinyint" | "smallint" | "mediumint" | "int" | "integer" | "bigint" | "year" => {
                TypeClass::Integer
            }
            "decimal" | "numeric" => TypeClass::Decimal,
            "float" | "double" | "real" => TypeClass::Float,
            "date" => TypeClass::Date,
            "datetime" | "timestamp" => TypeClass::DateTime,
            "time" => TypeClass::Time,
            "enum" => TypeClass::Enum,
            "char" | "varchar" | "tinytext" | "text" | "mediumtext" | "longtext" => TypeClass::Text,
            _ => TypeClass::Other,
        }
    }
}

/// One table's columns in ordinal order. Immutable once loaded.
#[derive(Clone, Debug)]
pub struct TableMetadata {
    pub name: String,
    pub columns: Vec<ColumnMetadata>,
}

impl TableMetadata {
    pub fn from_catalog_rows(table: &str, rows: &[Record]) -> Result<Self, SchemaError> {
        let mut columns: Vec<ColumnMetadata> = Vec::with_capacity(rows.len());
        for row in rows {
            let column = ColumnMetadata::from_catalog_row(table, row)?;
            // A column taking part in several FK constraints yields one row per constraint.
            if columns.iter().any(|c| c.name == column.name) {
                continue;
            }
            columns.push(column);
        }
        columns.sort_by_key(|c| c.ordinal);
        Ok(TableMetadata {
            name: table.to_string(),
            columns,
        })
    }

    pub fn column(&self, name: &str) -> Option<&ColumnMetadata> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn primary_key(&self) -> Vec<&ColumnMetadata> {
        self.columns.iter().filter(|c| c.is_primary()).collect()
    }

    pub fn require_column(&self, name: &str) -> Result<&ColumnMetadata, SchemaError> {
        self.column(name).ok_or_else(|| SchemaError::UnknownColumn {
            table: self.name.clone(),
            column: name.to_string(),
        })
    }
}

fn text(row: &Record, key: &str) -> Option<String> {
    match row.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn integer(row: &Record, key: &str) -> Option<i64> {
    match row.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_ascii_lowercase().contains(needle)
}

/// Parses `'a','b','it''s'` into `["a", "b", "it's"]`.
fn parse_quoted_list(body: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;
    let mut chars = body.chars().peekable();
    while let Some(ch) = chars.next() {
        match (ch, in_quote) {
            ('\'', true) if chars.peek() == Some(&'\'') => {
                current.push('\'');
                chars.next();
            }
            ('\'', true) => {
                in_quote = false;
                out.push(std::mem::take(&mut current));
            }
            ('\'', false) => in_quote = true,
            (c, true) => current.push(c),
            _ => {}
        }
    }
    out
}
