//! Derives writable/required/foreign-key column sets from table metadata.
//!
//! All functions are pure; results are cached next to the metadata by the introspector.

use crate::schema::metadata::{ForeignKeyRef, TableMetadata};
use crate::schema::policy::SchemaPolicy;
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default)]
pub struct ColumnClassification {
    /// Every column, ordinal order.
    pub all: Vec<String>,
    pub fillable: Vec<String>,
    pub updatable: Vec<String>,
    pub mandatory: Vec<String>,
    pub foreign_keys: BTreeMap<String, ForeignKeyRef>,
}

impl ColumnClassification {
    /// Columns an UPDATE may touch once the caller's grant is applied.
    pub fn writable(&self, grant: &UpdateGrant) -> Vec<String> {
        let mut cols: Vec<String> = self
            .updatable
            .iter()
            .filter(|c| !grant.withheld.iter().any(|w| w == *c))
            .cloned()
            .collect();
        for extra in &grant.extra {
            if self.all.contains(extra) && !cols.contains(extra) {
                cols.push(extra.clone());
            }
        }
        cols
    }
}

/// Per-request adjustment of the updatable set, decided by the caller from the actor's role.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UpdateGrant {
    /// Columns writable in addition to the updatable set.
    pub extra: Vec<String>,
    /// Updatable columns the actor may not write.
    pub withheld: Vec<String>,
}

impl UpdateGrant {
    pub fn none() -> Self {
        UpdateGrant::default()
    }

    pub fn extra<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        UpdateGrant {
            extra: columns.into_iter().map(Into::into).collect(),
            withheld: Vec::new(),
        }
    }

    pub fn withheld<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        UpdateGrant {
            extra: Vec::new(),
            withheld: columns.into_iter().map(Into::into).collect(),
        }
    }
}

pub fn classify(meta: &TableMetadata, policy: &SchemaPolicy) -> ColumnClassification {
    ColumnClassification {
        all: meta.column_names(),
        fillable: fillable(meta),
        updatable: updatable(meta, policy),
        mandatory: mandatory(meta),
        foreign_keys: foreign_keys(meta, policy),
    }
}

/// Insertable columns: non-key columns without a server default, plus every member of a
/// composite primary key.
pub fn fillable(meta: &TableMetadata) -> Vec<String> {
    meta.columns
        .iter()
        .filter(|c| (!c.is_primary() && !c.has_default()) || c.is_composite_primary())
        .map(|c| c.name.clone())
        .collect()
}

pub fn updatable(meta: &TableMetadata, policy: &SchemaPolicy) -> Vec<String> {
    meta.columns
        .iter()
        .filter(|c| {
            !c.is_primary()
                && !c.is_auto_increment()
                && !c.is_auto_timestamp()
                && !c.is_enum()
                && !policy.is_immutable(&c.name)
        })
        .map(|c| c.name.clone())
        .collect()
}

pub fn mandatory(meta: &TableMetadata) -> Vec<String> {
    meta.columns
        .iter()
        .filter(|c| !c.is_primary() && !c.is_auto_increment() && !c.has_default() && !c.nullable)
        .map(|c| c.name.clone())
        .collect()
}

pub fn foreign_keys(meta: &TableMetadata, policy: &SchemaPolicy) -> BTreeMap<String, ForeignKeyRef> {
    meta.columns
        .iter()
        .filter_map(|c| {
            let r = c.references.as_ref()?;
            if r.table.is_empty() || policy.is_excluded_join(&r.table) {
                return None;
            }
            Some((c.name.clone(), r.clone()))
        })
        .collect()
}
