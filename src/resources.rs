//! Resource descriptors: everything table-specific about an endpoint, kept as data.

use crate::auth::{hash_password, Access, AccessRules, Actor, Role};
use crate::db::Record;
use crate::error::AppError;
use crate::schema::UpdateGrant;
use crate::service::{FieldRule, Format, PriceRule, PRODUCT_PRICE};
use crate::sql::Filter;
use serde_json::Value;
use std::collections::HashMap;

/// How list and show read rows.
#[derive(Clone, Copy, Debug)]
pub enum ReadPath {
    Plain,
    /// Rows get a computed price for the acting party.
    Priced(&'static PriceRule),
}

/// Query-string parameter accepted on list.
#[derive(Clone, Copy, Debug)]
pub enum QueryFilter {
    /// `?column=value`, skipped when empty.
    Equals(&'static str),
    /// `?param=1` keeps rows whose `column` is positive.
    PositiveFlag {
        param: &'static str,
        column: &'static str,
    },
}

#[derive(Debug)]
pub struct Resource {
    /// URL segment under `/private`.
    pub path: &'static str,
    pub table: &'static str,
    /// Columns stripped from every response.
    pub hidden: &'static [&'static str],
    pub rules: &'static [FieldRule],
    /// Columns stored as bcrypt hashes.
    pub hashed: &'static [&'static str],
    /// Updatable only by `privileged_role`.
    pub privileged: &'static [&'static str],
    pub privileged_role: Role,
    pub access: AccessRules,
    pub read: ReadPath,
    pub filters: &'static [QueryFilter],
}

const ADMIN: &[Role] = &[Role::Admin];
const STAFF: &[Role] = &[Role::Admin, Role::Editor];

const BASE: Resource = Resource {
    path: "",
    table: "",
    hidden: &[],
    rules: &[],
    hashed: &[],
    privileged: &[],
    privileged_role: Role::Admin,
    access: AccessRules::OPEN,
    read: ReadPath::Plain,
    filters: &[],
};

pub static USERS: Resource = Resource {
    path: "usuario",
    table: "usuario",
    hidden: &["contrasena", "rol_id", "cliente_id"],
    rules: &[
        FieldRule::new("nombre").required(),
        FieldRule::new("apellido").required(),
        FieldRule::new("email").required().format(Format::Email),
        FieldRule::new("contrasena").required(),
        FieldRule::new("rol_id").allowed(&["1", "2", "3"]),
        FieldRule::new("activo").allowed(&["0", "1"]),
        FieldRule::new("fecha_nacimiento").format(Format::Date),
    ],
    hashed: &["contrasena"],
    privileged: &["email", "rol_id", "activo", "cliente_id"],
    access: AccessRules {
        list: Access::Roles(ADMIN),
        show: Access::Authenticated,
        create: Access::Roles(ADMIN),
        update: Access::RolesOrSelf(ADMIN),
        delete: Access::Roles(ADMIN),
    },
    ..BASE
};

pub static PRODUCTS: Resource = Resource {
    path: "producto",
    table: "producto",
    hidden: &["categoria_id"],
    rules: &[
        FieldRule::new("titulo").required(),
        FieldRule::new("sku").required(),
        FieldRule::new("precio").required().minimum(0.0).max_decimals(2),
        FieldRule::new("precio_oferta").minimum(0.0).max_decimals(2),
    ],
    access: AccessRules::writes_for(STAFF),
    read: ReadPath::Priced(&PRODUCT_PRICE),
    filters: &[
        QueryFilter::Equals("pais"),
        QueryFilter::Equals("tipo"),
        QueryFilter::Equals("color"),
    ],
    ..BASE
};

pub static CLIENTS: Resource = Resource {
    path: "cliente",
    table: "cliente",
    rules: &[
        FieldRule::new("nombre_comercial").required(),
        FieldRule::new("rut").required().pattern(r"^\d{7,8}-[0-9kK]$"),
        FieldRule::new("contacto_email").format(Format::Email),
        FieldRule::new("porcentaje_descuento").range(0.0, 100.0).max_decimals(2),
    ],
    access: AccessRules::writes_for(ADMIN),
    filters: &[QueryFilter::PositiveFlag {
        param: "con_descuento",
        column: "porcentaje_descuento",
    }],
    ..BASE
};

pub static SIZES: Resource = Resource {
    path: "talla",
    table: "talla",
    rules: &[FieldRule::new("talla").required()],
    access: AccessRules::writes_for(STAFF),
    ..BASE
};

/// Stock per product and size, nested under `/private/producto/:id/stock`.
pub static STOCK: Resource = Resource {
    path: "stock",
    table: "producto_talla_stock",
    hidden: &["producto_id", "talla_id"],
    rules: &[
        FieldRule::new("talla_id").required(),
        FieldRule::new("stock").required().minimum(0.0),
    ],
    access: AccessRules::writes_for(STAFF),
    ..BASE
};

/// Resources served by the generic CRUD routes.
pub static RESOURCES: [&Resource; 4] = [&USERS, &PRODUCTS, &CLIENTS, &SIZES];

impl Resource {
    /// Every table the service touches, for startup preload.
    pub fn all_tables() -> Vec<&'static str> {
        RESOURCES
            .iter()
            .map(|r| r.table)
            .chain(std::iter::once(STOCK.table))
            .collect()
    }

    pub fn by_path(path: &str) -> Option<&'static Resource> {
        RESOURCES.iter().copied().find(|r| r.path == path)
    }

    /// Privileged columns are extra for the privileged role and withheld from everyone else.
    pub fn update_grant(&self, actor: &Actor) -> UpdateGrant {
        if self.privileged.is_empty() {
            UpdateGrant::none()
        } else if actor.is(self.privileged_role) {
            UpdateGrant::extra(self.privileged.iter().copied())
        } else {
            UpdateGrant::withheld(self.privileged.iter().copied())
        }
    }

    pub fn strip_hidden(&self, row: &mut Record) {
        for field in self.hidden {
            row.remove(*field);
        }
    }

    pub fn filters_from_query(&self, query: &HashMap<String, String>) -> Vec<Filter> {
        self.filters
            .iter()
            .filter_map(|f| match f {
                QueryFilter::Equals(col) => query
                    .get(*col)
                    .map(|v| v.trim())
                    .filter(|v| !v.is_empty())
                    .map(|v| Filter::Eq(col.to_string(), Value::String(v.to_string()))),
                QueryFilter::PositiveFlag { param, column } => query
                    .get(*param)
                    .filter(|v| matches!(v.trim(), "1" | "true"))
                    .map(|_| Filter::Positive(column.to_string())),
            })
            .collect()
    }

    /// Replaces plaintext values of hashed columns before they reach the database.
    pub async fn hash_secrets(&self, data: &mut Record) -> Result<(), AppError> {
        for col in self.hashed {
            if let Some(Value::String(plain)) = data.get(*col) {
                let hashed = hash_password(plain.clone()).await?;
                data.insert(col.to_string(), Value::String(hashed));
            }
        }
        Ok(())
    }
}
