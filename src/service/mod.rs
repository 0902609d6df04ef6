//! Data access and the domain rules layered on top of it.

mod pricing;
mod repository;
mod validation;
pub use pricing::{decimal_cell, final_price, PriceRule, PRODUCT_PRICE};
pub use repository::{key_filters, GenericRepository, RecordKey, UpdateOutcome};
pub use validation::{FieldRule, Format, Mode, RequestValidator};
