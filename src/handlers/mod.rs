//! HTTP handlers: generic resource CRUD, nested stock, authentication, API document.

pub mod auth;
pub mod docs;
pub mod entity;
pub mod stock;
