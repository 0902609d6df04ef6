//! Catalog-driven table metadata: what columns exist, which may be written, and how they join.

mod classify;
mod introspect;
mod metadata;
mod policy;

pub use classify::{
    classify, fillable, foreign_keys, mandatory, updatable, ColumnClassification, UpdateGrant,
};
pub use introspect::{SchemaIntrospector, TableSchema};
pub use metadata::{ColumnMetadata, ForeignKeyRef, KeyKind, PkArity, TableMetadata, TypeClass};
pub use policy::SchemaPolicy;
