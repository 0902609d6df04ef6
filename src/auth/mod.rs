//! Session authentication and role-based access.

mod access;
mod password;
mod session;

pub use access::{Access, AccessRules, Action};
pub use password::{hash_password, verify_password};
pub use session::{now_secs, RequestContext, SessionUser, SESSION_KEY};

use serde::{Deserialize, Serialize};

/// Role marker stored on `usuario.rol_id`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum Role {
    Admin,
    Editor,
    Client,
    Other(i64),
}

impl Role {
    pub fn id(self) -> i64 {
        match self {
            Role::Admin => 1,
            Role::Editor => 2,
            Role::Client => 3,
            Role::Other(n) => n,
        }
    }
}

impl From<i64> for Role {
    fn from(id: i64) -> Self {
        match id {
            1 => Role::Admin,
            2 => Role::Editor,
            3 => Role::Client,
            n => Role::Other(n),
        }
    }
}

impl From<Role> for i64 {
    fn from(role: Role) -> i64 {
        role.id()
    }
}

/// The authenticated party a request acts for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: i64,
    pub role: Role,
    /// Client company the user belongs to; carries the price discount.
    pub client_id: Option<i64>,
}

impl Actor {
    /// Reads identity columns from a `usuario` row.
    pub fn from_user_row(row: &crate::db::Record) -> Option<Actor> {
        let int = |key: &str| match row.get(key)? {
            serde_json::Value::Number(n) => n.as_i64(),
            serde_json::Value::String(s) => s.parse().ok(),
            _ => None,
        };
        Some(Actor {
            id: int("id")?,
            role: Role::from(int("rol_id")?),
            client_id: int("cliente_id"),
        })
    }

    pub fn is(&self, role: Role) -> bool {
        self.role == role
    }
}
