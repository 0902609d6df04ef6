//! Final-price overlay for product reads.
//!
//! An offer price wins outright. Otherwise the base price is reduced by the acting client's
//! discount percentage. Results are rounded to whole currency units, half away from zero
//! (the rounding `ROUND(x, 0)` applies to exact decimals in MySQL).

use crate::auth::Actor;
use crate::db::Record;
use crate::error::AppError;
use crate::service::{GenericRepository, RecordKey};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;
use std::str::FromStr;

/// Which columns feed the computed price and where the discount lives.
#[derive(Debug)]
pub struct PriceRule {
    pub base: &'static str,
    pub offer: &'static str,
    pub output: &'static str,
    pub discount_table: &'static str,
    pub discount_column: &'static str,
}

pub const PRODUCT_PRICE: PriceRule = PriceRule {
    base: "precio",
    offer: "precio_oferta",
    output: "precio_final",
    discount_table: "cliente",
    discount_column: "porcentaje_descuento",
};

pub fn final_price(base: Decimal, offer: Option<Decimal>, discount_pct: Decimal) -> Decimal {
    let raw = match offer {
        Some(o) => o,
        None => base * (Decimal::ONE - discount_pct / Decimal::ONE_HUNDRED),
    };
    raw.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// Reads a numeric cell that may arrive as a JSON number or a decimal string.
pub fn decimal_cell(v: Option<&Value>) -> Option<Decimal> {
    match v? {
        Value::Number(n) => n
            .as_i64()
            .map(Decimal::from)
            .or_else(|| n.as_f64().and_then(Decimal::from_f64_retain)),
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

impl PriceRule {
    /// Discount percentage for the acting party; zero without a client affiliation.
    pub async fn discount_for(
        &self,
        repo: &GenericRepository,
        actor: Option<&Actor>,
    ) -> Result<Decimal, AppError> {
        let Some(client_id) = actor.and_then(|a| a.client_id) else {
            return Ok(Decimal::ZERO);
        };
        let client = repo
            .find(self.discount_table, &RecordKey::Id(Value::from(client_id)))
            .await?;
        Ok(client
            .and_then(|c| decimal_cell(c.get(self.discount_column)))
            .unwrap_or(Decimal::ZERO))
    }

    /// Adds the output column to `row`. Rows without a usable base price get `null`.
    pub fn apply(&self, row: &mut Record, discount_pct: Decimal) {
        let price = decimal_cell(row.get(self.base)).map(|base| {
            final_price(base, decimal_cell(row.get(self.offer)), discount_pct)
        });
        let value = price
            .and_then(|p| p.to_i64())
            .map(Value::from)
            .unwrap_or(Value::Null);
        row.insert(self.output.to_string(), value);
    }
}
