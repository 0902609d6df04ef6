//! OpenAPI document generated from the live schema on each request.

use crate::error::AppError;
use crate::resources::{Resource, RESOURCES, STOCK};
use crate::schema::{ColumnMetadata, TableSchema, TypeClass};
use crate::state::AppState;
use axum::{extract::State, Json};
use std::sync::Arc;
use utoipa::openapi::{
    content::ContentBuilder,
    info::InfoBuilder,
    path::{HttpMethod, OperationBuilder, ParameterBuilder, ParameterIn, PathItemBuilder, PathsBuilder},
    request_body::RequestBodyBuilder,
    response::ResponseBuilder,
    schema::{ComponentsBuilder, KnownFormat, ObjectBuilder, Ref, Schema, SchemaFormat, Type},
    OpenApi, OpenApiBuilder, RefOr, Required,
};

fn column_schema(col: &ColumnMetadata) -> RefOr<Schema> {
    let builder = match col.type_class() {
        TypeClass::Integer => ObjectBuilder::new().schema_type(Type::Integer),
        TypeClass::Boolean => ObjectBuilder::new().schema_type(Type::Boolean),
        TypeClass::Decimal | TypeClass::Float => ObjectBuilder::new().schema_type(Type::Number),
        TypeClass::Enum => ObjectBuilder::new()
            .schema_type(Type::String)
            .enum_values(Some(col.enum_values())),
        TypeClass::Date => ObjectBuilder::new()
            .schema_type(Type::String)
            .format(Some(SchemaFormat::KnownFormat(KnownFormat::Date))),
        TypeClass::DateTime => ObjectBuilder::new()
            .schema_type(Type::String)
            .format(Some(SchemaFormat::KnownFormat(KnownFormat::DateTime))),
        TypeClass::Text => ObjectBuilder::new()
            .schema_type(Type::String)
            .max_length(col.max_length.map(|n| n as usize)),
        TypeClass::Time | TypeClass::Other => ObjectBuilder::new().schema_type(Type::String),
    };
    RefOr::T(Schema::Object(builder.build()))
}

/// Component schema for one table: every column, non-null non-key columns required.
pub fn table_schema(schema: &TableSchema) -> RefOr<Schema> {
    let mut object = ObjectBuilder::new().schema_type(Type::Object);
    for col in &schema.meta.columns {
        object = object.property(col.name.clone(), column_schema(col));
        if !col.nullable && !col.is_primary() {
            object = object.required(col.name.clone());
        }
    }
    RefOr::T(Schema::Object(object.build()))
}

fn id_parameter(name: &str) -> utoipa::openapi::path::Parameter {
    ParameterBuilder::new()
        .name(name)
        .parameter_in(ParameterIn::Path)
        .required(Required::True)
        .schema(Some(RefOr::T(Schema::Object(
            ObjectBuilder::new().schema_type(Type::Integer).build(),
        ))))
        .build()
}

fn operation(tag: &str, summary: String, body: Option<&str>, params: &[&str]) -> OperationBuilder {
    let mut op = OperationBuilder::new()
        .tag(tag)
        .summary(Some(summary))
        .response("200", ResponseBuilder::new().description("Success").build())
        .response("401", ResponseBuilder::new().description("Not signed in").build())
        .response("403", ResponseBuilder::new().description("Access denied").build());
    for p in params {
        op = op.parameter(id_parameter(p));
    }
    if let Some(schema_name) = body {
        op = op
            .request_body(Some(
                RequestBodyBuilder::new()
                    .content(
                        "application/json",
                        ContentBuilder::new()
                            .schema(Some(Ref::from_schema_name(schema_name)))
                            .build(),
                    )
                    .required(Some(Required::True))
                    .build(),
            ))
            .response("422", ResponseBuilder::new().description("Validation failed").build());
    }
    op
}

/// Paths for a collection and its item, e.g. `/private/talla` and `/private/talla/{id}`.
fn resource_paths(
    paths: PathsBuilder,
    collection: &str,
    item_params: &[&str],
    resource: &Resource,
    schema_name: &str,
) -> PathsBuilder {
    let tag = resource.path;
    let (item_path, collection_params) = match item_params.split_last() {
        Some((last, parents)) => (format!("{}/{{{}}}", collection, last), parents),
        None => (collection.to_string(), item_params),
    };
    let list = PathItemBuilder::new()
        .operation(
            HttpMethod::Get,
            operation(tag, format!("List {}", schema_name), None, collection_params).build(),
        )
        .operation(
            HttpMethod::Post,
            operation(tag, format!("Create {}", schema_name), Some(schema_name), collection_params)
                .response("201", ResponseBuilder::new().description("Created").build())
                .build(),
        )
        .build();
    let item = PathItemBuilder::new()
        .operation(
            HttpMethod::Get,
            operation(tag, format!("Show {}", schema_name), None, item_params).build(),
        )
        .operation(
            HttpMethod::Put,
            operation(tag, format!("Update {}", schema_name), Some(schema_name), item_params).build(),
        )
        .operation(
            HttpMethod::Patch,
            operation(tag, format!("Update {}", schema_name), Some(schema_name), item_params).build(),
        )
        .operation(
            HttpMethod::Delete,
            operation(tag, format!("Delete {}", schema_name), None, item_params).build(),
        )
        .build();
    paths.path(collection, list).path(item_path, item)
}

/// Builds the document from already-loaded table schemas.
pub fn build_document(tables: &[(&Resource, Arc<TableSchema>)]) -> OpenApi {
    let mut components = ComponentsBuilder::new();
    let mut paths = PathsBuilder::new();
    for (resource, schema) in tables {
        let name = schema.meta.name.as_str();
        components = components.schema(name, table_schema(schema));
        paths = if std::ptr::eq(*resource, &STOCK) {
            resource_paths(
                paths,
                "/private/producto/{id}/stock",
                &["id", "talla_id"],
                resource,
                name,
            )
        } else {
            resource_paths(paths, &format!("/private/{}", resource.path), &["id"], resource, name)
        };
    }
    OpenApiBuilder::new()
        .info(
            InfoBuilder::new()
                .title(env!("CARGO_PKG_NAME"))
                .version(env!("CARGO_PKG_VERSION"))
                .build(),
        )
        .paths(paths.build())
        .components(Some(components.build()))
        .build()
}

pub async fn openapi(State(state): State<AppState>) -> Result<Json<OpenApi>, AppError> {
    let mut tables = Vec::with_capacity(RESOURCES.len() + 1);
    for resource in RESOURCES.iter().copied().chain(std::iter::once(&STOCK)) {
        tables.push((resource, state.repo.table(resource.table).await?));
    }
    Ok(Json(build_document(&tables)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{CLIENTS, PRODUCTS};
    use crate::schema::{classify, SchemaPolicy};
    use crate::testing::fixture_table;
    use serde_json::{json, Value};

    fn loaded(table: &str) -> Arc<TableSchema> {
        let meta = fixture_table(table);
        let columns = classify(&meta, &SchemaPolicy::default());
        Arc::new(TableSchema { meta, columns })
    }

    fn document() -> Value {
        let doc = build_document(&[
            (&PRODUCTS, loaded("producto")),
            (&CLIENTS, loaded("cliente")),
            (&STOCK, loaded("producto_talla_stock")),
        ]);
        serde_json::to_value(doc).unwrap()
    }

    #[test]
    fn column_types_map_to_json_types() {
        let doc = document();
        let producto = &doc["components"]["schemas"]["producto"];
        assert_eq!(producto["properties"]["precio"]["type"], "number");
        assert_eq!(producto["properties"]["id"]["type"], "integer");
        assert_eq!(producto["properties"]["titulo"]["maxLength"], 200);
        assert_eq!(
            doc["components"]["schemas"]["cliente"]["properties"]["categoria"]["enum"],
            json!(["Regular", "Preferencial"])
        );
    }

    #[test]
    fn required_lists_non_null_non_key_columns() {
        let doc = document();
        let required = doc["components"]["schemas"]["producto"]["required"]
            .as_array()
            .unwrap()
            .clone();
        assert!(required.contains(&json!("titulo")));
        assert!(required.contains(&json!("precio")));
        assert!(!required.contains(&json!("id")));
        assert!(!required.contains(&json!("club")));
    }

    #[test]
    fn stock_paths_nest_under_products() {
        let doc = document();
        let paths = doc["paths"].as_object().unwrap();
        assert!(paths.contains_key("/private/producto"));
        assert!(paths.contains_key("/private/producto/{id}"));
        assert!(paths.contains_key("/private/producto/{id}/stock"));
        assert!(paths.contains_key("/private/producto/{id}/stock/{talla_id}"));
        assert!(paths["/private/producto/{id}/stock"]["post"]["requestBody"].is_object());
    }
}
