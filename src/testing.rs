//! Test fixtures: catalog rows for the storefront tables and an in-memory `Database`.

use crate::db::{Database, Record};
use crate::error::AppError;
use crate::schema::{SchemaIntrospector, SchemaPolicy, TableMetadata};
use crate::service::GenericRepository;
use crate::sql::QueryBuf;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

pub const FIXTURE_TABLES: [&str; 7] = [
    "usuario",
    "cliente",
    "producto",
    "talla",
    "producto_talla_stock",
    "categoria",
    "rol",
];

/// One `information_schema` row, built fluently.
#[derive(Clone, Debug)]
pub struct CatalogColumn {
    name: String,
    data_type: String,
    column_type: Option<String>,
    default: Option<String>,
    extra: String,
    nullable: bool,
    ordinal: u32,
    key: &'static str,
    pk_count: Option<i64>,
    max_length: Option<i64>,
    references: Option<(String, String)>,
}

impl CatalogColumn {
    pub fn new(name: &str, data_type: &str) -> Self {
        CatalogColumn {
            name: name.into(),
            data_type: data_type.into(),
            column_type: None,
            default: None,
            extra: String::new(),
            nullable: false,
            ordinal: 1,
            key: "",
            pk_count: None,
            max_length: None,
            references: None,
        }
    }

    pub fn column_type(mut self, t: &str) -> Self {
        self.column_type = Some(t.into());
        self
    }

    pub fn default(mut self, d: &str) -> Self {
        self.default = Some(d.into());
        self
    }

    pub fn extra(mut self, e: &str) -> Self {
        self.extra = e.into();
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn ordinal(mut self, n: u32) -> Self {
        self.ordinal = n;
        self
    }

    pub fn primary(mut self, count: i64) -> Self {
        self.key = "PRI";
        self.pk_count = Some(count);
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.extra = "auto_increment".into();
        self
    }

    pub fn max_length(mut self, n: i64) -> Self {
        self.max_length = Some(n);
        self
    }

    pub fn references(mut self, table: &str, column: &str) -> Self {
        if self.key.is_empty() {
            self.key = "MUL";
        }
        self.references = Some((table.into(), column.into()));
        self
    }

    pub fn row(&self) -> Record {
        let opt = |v: &Option<String>| v.clone().map(Value::String).unwrap_or(Value::Null);
        let mut row = Record::new();
        row.insert("column_name".into(), Value::String(self.name.clone()));
        row.insert("ordinal_position".into(), Value::from(self.ordinal));
        row.insert("column_default".into(), opt(&self.default));
        row.insert(
            "is_nullable".into(),
            Value::from(if self.nullable { "YES" } else { "NO" }),
        );
        row.insert("data_type".into(), Value::String(self.data_type.clone()));
        row.insert(
            "column_type".into(),
            Value::String(self.column_type.clone().unwrap_or_else(|| self.data_type.clone())),
        );
        row.insert(
            "character_maximum_length".into(),
            self.max_length.map(Value::from).unwrap_or(Value::Null),
        );
        row.insert("column_key".into(), Value::from(self.key));
        row.insert("extra".into(), Value::String(self.extra.clone()));
        row.insert(
            "pk_column_count".into(),
            self.pk_count.map(Value::from).unwrap_or(Value::Null),
        );
        let (rt, rc) = match &self.references {
            Some((t, c)) => (Value::String(t.clone()), Value::String(c.clone())),
            None => (Value::Null, Value::Null),
        };
        row.insert("referenced_table_name".into(), rt);
        row.insert("referenced_column_name".into(), rc);
        row
    }

    pub fn metadata(&self, table: &str) -> crate::schema::ColumnMetadata {
        crate::schema::ColumnMetadata::from_catalog_row(table, &self.row())
            .expect("fixture column")
    }
}

fn id() -> CatalogColumn {
    CatalogColumn::new("id", "int").column_type("int(11)").primary(1).auto_increment()
}

fn varchar(name: &str, len: i64) -> CatalogColumn {
    CatalogColumn::new(name, "varchar")
        .column_type(&format!("varchar({})", len))
        .max_length(len)
}

fn fixture_columns(table: &str) -> Vec<CatalogColumn> {
    match table {
        "usuario" => vec![
            id(),
            varchar("nombre", 100),
            varchar("apellido", 100),
            varchar("email", 150),
            varchar("contrasena", 255),
            CatalogColumn::new("rol_id", "int").references("rol", "id"),
            CatalogColumn::new("activo", "tinyint").column_type("tinyint(1)").default("1"),
            CatalogColumn::new("cliente_id", "int").nullable().references("cliente", "id"),
            CatalogColumn::new("fecha_registro", "timestamp")
                .default("current_timestamp()"),
        ],
        "cliente" => vec![
            id(),
            varchar("nombre_comercial", 150),
            varchar("rut", 30),
            CatalogColumn::new("porcentaje_descuento", "decimal")
                .column_type("decimal(5,2)")
                .default("0.00"),
            CatalogColumn::new("categoria", "enum")
                .column_type("enum('Regular','Preferencial')")
                .default("'Regular'"),
            CatalogColumn::new("fecha_registro", "timestamp")
                .default("current_timestamp()"),
        ],
        "producto" => vec![
            id(),
            varchar("titulo", 200),
            varchar("club", 100).nullable(),
            varchar("pais", 100).nullable(),
            varchar("tipo", 50).nullable(),
            varchar("color", 50).nullable(),
            varchar("sku", 50),
            CatalogColumn::new("precio", "decimal").column_type("decimal(10,2)"),
            CatalogColumn::new("precio_oferta", "decimal")
                .column_type("decimal(10,2)")
                .nullable(),
            CatalogColumn::new("categoria_id", "int")
                .nullable()
                .references("categoria", "id"),
            CatalogColumn::new("actualizado_en", "datetime")
                .nullable()
                .extra("on update current_timestamp()"),
        ],
        "talla" => vec![id(), varchar("talla", 20)],
        "producto_talla_stock" => vec![
            CatalogColumn::new("producto_id", "int")
                .primary(2)
                .references("producto", "id"),
            CatalogColumn::new("talla_id", "int")
                .primary(2)
                .references("talla", "id"),
            CatalogColumn::new("stock", "int").default("0"),
        ],
        "categoria" | "rol" => vec![id(), varchar("nombre", 100)],
        _ => Vec::new(),
    }
}

/// Catalog rows for a fixture table, ordinals assigned in declaration order.
pub fn fixture_rows(table: &str) -> Vec<Record> {
    fixture_columns(table)
        .into_iter()
        .enumerate()
        .map(|(i, c)| c.ordinal(i as u32 + 1).row())
        .collect()
}

pub fn fixture_table(table: &str) -> TableMetadata {
    TableMetadata::from_catalog_rows(table, &fixture_rows(table)).expect("fixture table")
}

/// Shorthand for building a result row in tests.
pub fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => panic!("record() expects an object, got {}", other),
    }
}

/// In-memory `Database`: answers catalog queries from fixtures and replays queued results
/// for everything else, logging each statement it was handed.
#[derive(Default)]
pub struct FakeDatabase {
    catalog: HashMap<String, Vec<Record>>,
    rows: Mutex<VecDeque<Result<Vec<Record>, AppError>>>,
    affected: Mutex<VecDeque<Result<u64, AppError>>>,
    inserted: Mutex<VecDeque<Result<u64, AppError>>>,
    statements: Mutex<Vec<QueryBuf>>,
    catalog_queries: Mutex<Vec<QueryBuf>>,
}

impl FakeDatabase {
    pub fn with_fixtures() -> Self {
        let catalog = FIXTURE_TABLES
            .iter()
            .map(|t| (t.to_string(), fixture_rows(t)))
            .collect();
        FakeDatabase {
            catalog,
            ..FakeDatabase::default()
        }
    }

    /// Next `fetch_*` result. Unqueued fetches return no rows.
    pub fn push_rows(&self, rows: Vec<Record>) -> &Self {
        lock(&self.rows).push_back(Ok(rows));
        self
    }

    pub fn push_fetch_error(&self, err: AppError) -> &Self {
        lock(&self.rows).push_back(Err(err));
        self
    }

    /// Next `execute` result. Unqueued executes report one affected row.
    pub fn push_affected(&self, result: Result<u64, AppError>) -> &Self {
        lock(&self.affected).push_back(result);
        self
    }

    /// Next `insert_atomic` result. Unqueued inserts report id 1.
    pub fn push_insert(&self, result: Result<u64, AppError>) -> &Self {
        lock(&self.inserted).push_back(result);
        self
    }

    pub fn statements(&self) -> Vec<QueryBuf> {
        lock(&self.statements).clone()
    }

    pub fn last_statement(&self) -> QueryBuf {
        lock(&self.statements).last().cloned().expect("no statement executed")
    }

    pub fn catalog_queries(&self) -> Vec<QueryBuf> {
        lock(&self.catalog_queries).clone()
    }

    pub fn catalog_hits(&self) -> usize {
        lock(&self.catalog_queries).len()
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|p| p.into_inner())
}

#[async_trait]
impl Database for FakeDatabase {
    async fn fetch_all(&self, q: &QueryBuf) -> Result<Vec<Record>, AppError> {
        if q.sql.contains("information_schema") {
            lock(&self.catalog_queries).push(q.clone());
            let table = q.params.get(1).and_then(Value::as_str).unwrap_or_default();
            return Ok(self.catalog.get(table).cloned().unwrap_or_default());
        }
        lock(&self.statements).push(q.clone());
        lock(&self.rows).pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn execute(&self, q: &QueryBuf) -> Result<u64, AppError> {
        lock(&self.statements).push(q.clone());
        lock(&self.affected).pop_front().unwrap_or(Ok(1))
    }

    async fn insert_atomic(&self, q: &QueryBuf) -> Result<u64, AppError> {
        lock(&self.statements).push(q.clone());
        lock(&self.inserted).pop_front().unwrap_or(Ok(1))
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}

/// Introspector over the fixture catalog.
pub fn introspector(db: Arc<FakeDatabase>) -> Arc<SchemaIntrospector> {
    Arc::new(SchemaIntrospector::new(db, "tienda", SchemaPolicy::default()))
}

pub fn repository(db: Arc<FakeDatabase>) -> GenericRepository {
    GenericRepository::new(db.clone(), introspector(db))
}
