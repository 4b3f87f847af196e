// Copyright (c) 2025 Daniel Jara.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use comfy_table::{presets::UTF8_FULL, Cell, Table};
use once_cell::sync::Lazy;
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::Product;

/// First day of business operations; no sale may predate it.
pub static BUSINESS_START: Lazy<NaiveDate> =
    Lazy::new(|| NaiveDate::from_ymd_opt(2024, 4, 1).expect("valid date"));

/// Widest date range a report or search may cover.
pub const MAX_RANGE_DAYS: i64 = 730;

const DEFAULT_EXCHANGE_RATE: &str = "945";

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("start date {0} is after end date {1}")]
    StartAfterEnd(NaiveDate, NaiveDate),
    #[error("start date {0} predates business operations ({1})")]
    BeforeBusinessStart(NaiveDate, NaiveDate),
    #[error("end date {0} is in the future")]
    EndInFuture(NaiveDate),
    #[error("date range exceeds {MAX_RANGE_DAYS} days")]
    RangeTooWide,
    #[error("suspicious filter value '{0}'")]
    SuspiciousInput(String),
}

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", s))
}

pub fn parse_month(s: &str) -> Result<String> {
    chrono::NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d")
        .with_context(|| format!("Invalid month '{}', expected YYYY-MM", s))?;
    Ok(s.to_string())
}

pub fn parse_decimal(s: &str) -> Result<Decimal> {
    s.parse::<Decimal>()
        .with_context(|| format!("Invalid decimal '{}'", s))
}

pub fn validate_range(start: NaiveDate, end: NaiveDate) -> Result<(), ValidationError> {
    validate_range_at(start, end, Local::now().date_naive())
}

pub fn validate_range_at(
    start: NaiveDate,
    end: NaiveDate,
    today: NaiveDate,
) -> Result<(), ValidationError> {
    if start > end {
        return Err(ValidationError::StartAfterEnd(start, end));
    }
    if start < *BUSINESS_START {
        return Err(ValidationError::BeforeBusinessStart(start, *BUSINESS_START));
    }
    if end > today {
        return Err(ValidationError::EndInFuture(end));
    }
    if (end - start).num_days() > MAX_RANGE_DAYS {
        return Err(ValidationError::RangeTooWide);
    }
    Ok(())
}

/// IVA-inclusive divisor: gross / 1.19 = net.
pub fn iva_divisor() -> Decimal {
    Decimal::new(119, 2)
}

/// Split a gross (IVA-inclusive) amount into (net, tax).
pub fn split_iva(total: Decimal) -> (Decimal, Decimal) {
    if total.is_zero() {
        return (Decimal::ZERO, Decimal::ZERO);
    }
    let net = (total / iva_divisor()).round_dp(4);
    (net, total - net)
}

pub fn kg_to_tons(kg: Decimal) -> Decimal {
    kg / Decimal::from(1000)
}

fn group_thousands(digits: &str, sep: char) -> String {
    let chars: Vec<char> = digits.chars().collect();
    let mut out = String::with_capacity(chars.len() + chars.len() / 3);
    for (i, ch) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            out.push(sep);
        }
        out.push(*ch);
    }
    out
}

/// Chilean peso display: dot-grouped thousands, no decimals.
pub fn fmt_clp(amount: &Decimal) -> String {
    let rounded = amount.round_dp(0);
    let grouped = group_thousands(&rounded.abs().trunc().to_string(), '.');
    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("-${}", grouped)
    } else {
        format!("${}", grouped)
    }
}

/// USD display: comma-grouped thousands, two decimals.
pub fn fmt_usd(amount: &Decimal) -> String {
    let rounded = amount.round_dp(2);
    let text = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));
    let grouped = group_thousands(int_part, ',');
    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("-${}.{}", grouped, frac_part)
    } else {
        format!("${}.{}", grouped, frac_part)
    }
}

pub fn pretty_table(headers: &[&str], rows: Vec<Vec<String>>) -> Table {
    let mut t = Table::new();
    t.load_preset(UTF8_FULL);
    t.set_header(headers.iter().map(|h| Cell::new(*h)));
    for r in rows {
        t.add_row(r.into_iter().map(Cell::new));
    }
    t
}

pub fn id_for_branch(conn: &Connection, name: &str) -> Result<i64> {
    let mut stmt = conn.prepare("SELECT id FROM branches WHERE name=?1")?;
    let id: i64 = stmt
        .query_row(params![name], |r| r.get(0))
        .with_context(|| format!("Branch '{}' not found", name))?;
    Ok(id)
}

pub fn id_for_document_type(conn: &Connection, name: &str) -> Result<i64> {
    let mut stmt = conn.prepare("SELECT id FROM document_types WHERE name=?1")?;
    let id: i64 = stmt
        .query_row(params![name], |r| r.get(0))
        .with_context(|| format!("Document type '{}' not found", name))?;
    Ok(id)
}

pub fn id_for_payment_method(conn: &Connection, name: &str) -> Result<i64> {
    let mut stmt = conn.prepare("SELECT id FROM payment_methods WHERE name=?1")?;
    let id: i64 = stmt
        .query_row(params![name], |r| r.get(0))
        .with_context(|| format!("Payment method '{}' not found", name))?;
    Ok(id)
}

pub fn product_by_name(conn: &Connection, name: &str) -> Result<Product> {
    let mut stmt = conn.prepare(
        "SELECT id, name, product_type, sales_type, unit_label, kg_per_unit, unit_price, by_weight
         FROM products WHERE name=?1",
    )?;
    let product = stmt
        .query_row(params![name], |r| {
            Ok((
                r.get::<_, i64>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, String>(3)?,
                r.get::<_, String>(4)?,
                r.get::<_, i64>(5)?,
                r.get::<_, String>(6)?,
                r.get::<_, i64>(7)?,
            ))
        })
        .with_context(|| format!("Product '{}' not found", name))?;
    let unit_price = parse_decimal(&product.6)
        .with_context(|| format!("Invalid unit price for product '{}'", product.1))?;
    Ok(Product {
        id: product.0,
        name: product.1,
        product_type: product.2,
        sales_type: product.3,
        unit_label: product.4,
        kg_per_unit: product.5,
        unit_price,
        by_weight: product.7 != 0,
    })
}

// Exchange rate settings (CLP per USD)
pub fn get_exchange_rate(conn: &Connection) -> Result<Decimal> {
    let v: Option<String> = conn
        .query_row(
            "SELECT value FROM settings WHERE key='exchange_rate'",
            [],
            |r| r.get(0),
        )
        .optional()?;
    parse_decimal(v.as_deref().unwrap_or(DEFAULT_EXCHANGE_RATE))
}

pub fn set_exchange_rate(conn: &Connection, rate: Decimal) -> Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value) VALUES('exchange_rate', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        params![rate.to_string()],
    )?;
    Ok(())
}

pub fn maybe_print_json<T: serde::Serialize>(
    json_flag: bool,
    jsonl_flag: bool,
    v: &T,
) -> Result<bool> {
    if json_flag {
        println!("{}", serde_json::to_string_pretty(v)?);
        return Ok(true);
    }
    if jsonl_flag {
        // If v is an array, stream each element; else stream single line
        let val = serde_json::to_value(v)?;
        if let Some(arr) = val.as_array() {
            for item in arr {
                println!("{}", serde_json::to_string(item)?);
            }
        } else {
            println!("{}", serde_json::to_string(&val)?);
        }
        return Ok(true);
    }
    Ok(false)
}
