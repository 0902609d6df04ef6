//! Builds parameterized SELECT, INSERT, UPDATE, DELETE from introspected table metadata.
//!
//! Identifiers are checked against the metadata before they are spliced into SQL; values
//! always travel as `?` parameters.

use crate::db::Record;
use crate::error::SchemaError;
use crate::schema::{ForeignKeyRef, SchemaPolicy, TableMetadata};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Alias of the table being queried; joined tables are `r1`, `r2`, ...
const BASE_ALIAS: &str = "t";

/// Quote identifier for MySQL (only ever called with metadata-validated names).
pub fn quoted(s: &str) -> String {
    format!("`{}`", s.replace('`', "``"))
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn push_param(&mut self, v: Value) -> &'static str {
        self.params.push(v);
        "?"
    }
}

/// WHERE condition on a column of the base table.
#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    /// `column > 0`
    Positive(String),
}

impl Filter {
    pub fn column(&self) -> &str {
        match self {
            Filter::Eq(c, _) | Filter::Positive(c) => c,
        }
    }
}

/// One LEFT JOIN resolving a foreign key to its display label.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JoinTarget {
    pub column: String,
    pub table: String,
    pub ref_column: String,
    pub label_column: String,
}

/// Joins for every foreign key among `columns`, in column order. `referenced` must hold the
/// metadata of each referenced table; references to tables not in it are left unjoined.
pub fn plan_joins(
    columns: &[String],
    foreign_keys: &BTreeMap<String, ForeignKeyRef>,
    policy: &SchemaPolicy,
    referenced: &HashMap<&str, &TableMetadata>,
) -> Vec<JoinTarget> {
    columns
        .iter()
        .filter_map(|col| {
            let fk = foreign_keys.get(col)?;
            let target = referenced.get(fk.table.as_str())?;
            if !target.has_column(&fk.column) {
                return None;
            }
            let preferred = policy.display_column(&fk.table);
            let label_column = if target.has_column(preferred) {
                preferred
            } else if target.has_column(&policy.default_display_column) {
                policy.default_display_column.as_str()
            } else {
                fk.column.as_str()
            };
            Some(JoinTarget {
                column: col.clone(),
                table: fk.table.clone(),
                ref_column: fk.column.clone(),
                label_column: label_column.to_string(),
            })
        })
        .collect()
}

/// SELECT of `columns` with a `<table>_label` column ahead of each joined foreign key,
/// filtered, ordered by primary key, optionally limited.
pub fn select(
    meta: &TableMetadata,
    columns: &[String],
    joins: &[JoinTarget],
    filters: &[Filter],
    limit: Option<u32>,
) -> Result<QueryBuf, SchemaError> {
    let mut q = QueryBuf::default();
    let mut taken: HashSet<String> = columns.iter().cloned().collect();
    let mut projections = Vec::with_capacity(columns.len() + joins.len());
    let mut join_clauses = Vec::with_capacity(joins.len());

    for col in columns {
        meta.require_column(col)?;
        if let Some(join) = joins.iter().find(|j| j.column == *col) {
            let alias = format!("r{}", join_clauses.len() + 1);
            let label = unique_alias(format!("{}_label", join.table), &mut taken);
            projections.push(format!(
                "{}.{} AS {}",
                alias,
                quoted(&join.label_column),
                quoted(&label)
            ));
            join_clauses.push(format!(
                " LEFT JOIN {} {} ON {}.{} = {}.{}",
                quoted(&join.table),
                alias,
                BASE_ALIAS,
                quoted(col),
                alias,
                quoted(&join.ref_column)
            ));
        }
        projections.push(format!("{}.{}", BASE_ALIAS, quoted(col)));
    }
    if projections.is_empty() {
        projections.push(format!("{}.*", BASE_ALIAS));
    }

    let mut where_parts = Vec::with_capacity(filters.len());
    for filter in filters {
        let col = meta.require_column(filter.column())?;
        let lhs = format!("{}.{}", BASE_ALIAS, quoted(&col.name));
        match filter {
            Filter::Eq(_, v) => {
                let ph = q.push_param(v.clone());
                where_parts.push(format!("{} = {}", lhs, ph));
            }
            Filter::Positive(_) => where_parts.push(format!("{} > 0", lhs)),
        }
    }
    let where_clause = if where_parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", where_parts.join(" AND "))
    };
    let pk: Vec<String> = meta
        .primary_key()
        .iter()
        .map(|c| format!("{}.{}", BASE_ALIAS, quoted(&c.name)))
        .collect();
    let order_clause = if pk.is_empty() {
        String::new()
    } else {
        format!(" ORDER BY {}", pk.join(", "))
    };
    let limit_clause = limit.map(|n| format!(" LIMIT {}", n)).unwrap_or_default();

    q.sql = format!(
        "SELECT {} FROM {} {}{}{}{}{}",
        projections.join(", "),
        quoted(&meta.name),
        BASE_ALIAS,
        join_clauses.concat(),
        where_clause,
        order_clause,
        limit_clause
    );
    Ok(q)
}

/// INSERT covering exactly `fillable`; columns missing from `data` bind as NULL.
pub fn insert(meta: &TableMetadata, fillable: &[String], data: &Record) -> Result<QueryBuf, SchemaError> {
    let mut q = QueryBuf::default();
    let mut cols = Vec::with_capacity(fillable.len());
    let mut placeholders = Vec::with_capacity(fillable.len());
    for name in fillable {
        meta.require_column(name)?;
        cols.push(quoted(name));
        placeholders.push(q.push_param(data.get(name).cloned().unwrap_or(Value::Null)));
    }
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quoted(&meta.name),
        cols.join(", "),
        placeholders.join(", ")
    );
    Ok(q)
}

/// Result of planning an UPDATE: no statement when nothing writable was supplied.
#[derive(Debug, PartialEq)]
pub struct UpdatePlan {
    pub query: Option<QueryBuf>,
    /// Keys of the input that are not writable, in input order.
    pub not_updated: Vec<String>,
}

/// UPDATE setting each writable column present in `data`. A null clears a nullable
/// column; a null aimed at a NOT NULL column is reported in `not_updated` instead.
pub fn update(
    meta: &TableMetadata,
    writable: &[String],
    key: &[(String, Value)],
    data: &Record,
) -> Result<UpdatePlan, SchemaError> {
    let clears = |name: &str| meta.column(name).map_or(false, |c| c.nullable);
    let not_updated: Vec<String> = data
        .iter()
        .filter(|&(k, v)| !writable.contains(k) || (v.is_null() && !clears(k.as_str())))
        .map(|(k, _)| k.clone())
        .collect();

    let mut q = QueryBuf::default();
    let mut sets = Vec::new();
    for col in writable {
        match data.get(col) {
            None => continue,
            Some(Value::Null) if !clears(col.as_str()) => continue,
            Some(v) => {
                meta.require_column(col)?;
                let ph = q.push_param(v.clone());
                sets.push(format!("{} = {}", quoted(col), ph));
            }
        }
    }
    if sets.is_empty() {
        return Ok(UpdatePlan {
            query: None,
            not_updated,
        });
    }
    let where_clause = key_clause(meta, key, &mut q)?;
    q.sql = format!(
        "UPDATE {} SET {} WHERE {}",
        quoted(&meta.name),
        sets.join(", "),
        where_clause
    );
    Ok(UpdatePlan {
        query: Some(q),
        not_updated,
    })
}

/// DELETE matching every key column.
pub fn delete(meta: &TableMetadata, key: &[(String, Value)]) -> Result<QueryBuf, SchemaError> {
    let mut q = QueryBuf::default();
    let where_clause = key_clause(meta, key, &mut q)?;
    q.sql = format!("DELETE FROM {} WHERE {}", quoted(&meta.name), where_clause);
    Ok(q)
}

fn key_clause(
    meta: &TableMetadata,
    key: &[(String, Value)],
    q: &mut QueryBuf,
) -> Result<String, SchemaError> {
    // An empty key would turn into an unconditional statement.
    if key.is_empty() {
        return Err(SchemaError::MissingPrimaryKey(meta.name.clone()));
    }
    let mut parts = Vec::with_capacity(key.len());
    for (col, v) in key {
        meta.require_column(col)?;
        let ph = q.push_param(v.clone());
        parts.push(format!("{} = {}", quoted(col), ph));
    }
    Ok(parts.join(" AND "))
}

fn unique_alias(base: String, taken: &mut HashSet<String>) -> String {
    let mut candidate = base.clone();
    let mut n = 2;
    while taken.contains(&candidate) {
        candidate = format!("{}_{}", base, n);
        n += 1;
    }
    taken.insert(candidate.clone());
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::classify;
    use crate::testing::{fixture_table, record};
    use serde_json::json;

    fn joins_for(meta: &TableMetadata, columns: &[String]) -> Vec<JoinTarget> {
        let policy = SchemaPolicy::default();
        let classified = classify(meta, &policy);
        let tables: Vec<TableMetadata> = classified
            .foreign_keys
            .values()
            .map(|fk| fixture_table(&fk.table))
            .collect();
        let referenced: HashMap<&str, &TableMetadata> =
            tables.iter().map(|t| (t.name.as_str(), t)).collect();
        plan_joins(columns, &classified.foreign_keys, &policy, &referenced)
    }

    #[test]
    fn select_joins_each_foreign_key_with_its_own_alias() {
        let meta = fixture_table("producto_talla_stock");
        let cols = meta.column_names();
        let joins = joins_for(&meta, &cols);
        let q = select(&meta, &cols, &joins, &[], None).unwrap();
        insta::assert_snapshot!(q.sql, @"SELECT r1.`titulo` AS `producto_label`, t.`producto_id`, r2.`talla` AS `talla_label`, t.`talla_id`, t.`stock` FROM `producto_talla_stock` t LEFT JOIN `producto` r1 ON t.`producto_id` = r1.`id` LEFT JOIN `talla` r2 ON t.`talla_id` = r2.`id` ORDER BY t.`producto_id`, t.`talla_id`");
        assert!(q.params.is_empty());
    }

    #[test]
    fn label_falls_back_to_default_display_column() {
        let meta = fixture_table("usuario");
        let cols = meta.column_names();
        let joins = joins_for(&meta, &cols);
        assert_eq!(joins.len(), 2);
        assert_eq!(joins[0].column, "rol_id");
        assert_eq!(joins[0].label_column, "nombre");
        assert_eq!(joins[1].label_column, "nombre_comercial");
    }

    #[test]
    fn filtered_select_binds_values() {
        let meta = fixture_table("producto");
        let cols = vec!["id".to_string(), "titulo".to_string(), "pais".to_string()];
        let filters = vec![
            Filter::Eq("pais".into(), json!("Chile")),
            Filter::Eq("color".into(), json!("rojo")),
        ];
        let q = select(&meta, &cols, &[], &filters, Some(1)).unwrap();
        insta::assert_snapshot!(q.sql, @"SELECT t.`id`, t.`titulo`, t.`pais` FROM `producto` t WHERE t.`pais` = ? AND t.`color` = ? ORDER BY t.`id` LIMIT 1");
        assert_eq!(q.params, vec![json!("Chile"), json!("rojo")]);
    }

    #[test]
    fn positive_filter_has_no_parameter() {
        let meta = fixture_table("cliente");
        let cols = vec!["id".to_string()];
        let q = select(&meta, &cols, &[], &[Filter::Positive("porcentaje_descuento".into())], None)
            .unwrap();
        insta::assert_snapshot!(q.sql, @"SELECT t.`id` FROM `cliente` t WHERE t.`porcentaje_descuento` > 0 ORDER BY t.`id`");
        assert!(q.params.is_empty());
    }

    #[test]
    fn unknown_identifiers_are_rejected() {
        let meta = fixture_table("producto");
        let err = select(&meta, &["id; DROP TABLE x".to_string()], &[], &[], None).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownColumn { .. }));
        let err = select(
            &meta,
            &["id".to_string()],
            &[],
            &[Filter::Eq("nope".into(), json!(1))],
            None,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::UnknownColumn { .. }));
    }

    #[test]
    fn label_alias_avoids_existing_column_names() {
        let mut taken: HashSet<String> = ["talla_label".to_string()].into_iter().collect();
        assert_eq!(unique_alias("talla_label".into(), &mut taken), "talla_label_2");
        assert_eq!(unique_alias("talla_label".into(), &mut taken), "talla_label_3");
    }

    #[test]
    fn insert_binds_every_fillable_column_and_ignores_extras() {
        let meta = fixture_table("talla");
        let data = record(json!({"talla": "XL", "id": 99, "rol_id": 1}));
        let q = insert(&meta, &["talla".to_string()], &data).unwrap();
        insta::assert_snapshot!(q.sql, @"INSERT INTO `talla` (`talla`) VALUES (?)");
        assert_eq!(q.params, vec![json!("XL")]);

        let meta = fixture_table("usuario");
        let fillable = crate::schema::fillable(&meta);
        let q = insert(&meta, &fillable, &record(json!({"nombre": "Ana"}))).unwrap();
        assert_eq!(q.params.len(), fillable.len());
        assert_eq!(q.params[0], json!("Ana"));
        assert!(q.params[1..].iter().all(Value::is_null));
    }

    #[test]
    fn update_sets_present_writable_columns_and_reports_the_rest() {
        let meta = fixture_table("producto");
        let writable = vec!["titulo".to_string(), "precio".to_string(), "color".to_string()];
        let data = record(json!({"precio": 1500, "sku": "X-1", "color": null}));
        let plan = update(&meta, &writable, &[("id".into(), json!(4))], &data).unwrap();
        let q = plan.query.unwrap();
        insta::assert_snapshot!(q.sql, @"UPDATE `producto` SET `precio` = ?, `color` = ? WHERE `id` = ?");
        assert_eq!(q.params, vec![json!(1500), Value::Null, json!(4)]);
        assert_eq!(plan.not_updated, vec!["sku"]);
    }

    #[test]
    fn update_null_on_not_null_column_is_reported() {
        let meta = fixture_table("producto");
        let writable = vec!["titulo".to_string(), "precio_oferta".to_string()];
        let data = record(json!({"titulo": null, "precio_oferta": null}));
        let plan = update(&meta, &writable, &[("id".into(), json!(4))], &data).unwrap();
        let q = plan.query.unwrap();
        insta::assert_snapshot!(q.sql, @"UPDATE `producto` SET `precio_oferta` = ? WHERE `id` = ?");
        assert_eq!(q.params, vec![Value::Null, json!(4)]);
        assert_eq!(plan.not_updated, vec!["titulo"]);
    }

    #[test]
    fn update_without_writable_input_plans_nothing() {
        let meta = fixture_table("producto");
        let plan = update(
            &meta,
            &["titulo".to_string()],
            &[("id".into(), json!(4))],
            &record(json!({"sku": "X-1", "id": 5})),
        )
        .unwrap();
        assert!(plan.query.is_none());
        let mut ignored = plan.not_updated;
        ignored.sort();
        assert_eq!(ignored, vec!["id", "sku"]);
    }

    #[test]
    fn delete_matches_the_whole_composite_key() {
        let meta = fixture_table("producto_talla_stock");
        let key = vec![
            ("producto_id".to_string(), json!(3)),
            ("talla_id".to_string(), json!(2)),
        ];
        let q = delete(&meta, &key).unwrap();
        insta::assert_snapshot!(q.sql, @"DELETE FROM `producto_talla_stock` WHERE `producto_id` = ? AND `talla_id` = ?");
        assert_eq!(q.params, vec![json!(3), json!(2)]);
        assert!(matches!(
            delete(&meta, &[]),
            Err(SchemaError::MissingPrimaryKey(_))
        ));
    }
}
