// Copyright (c) 2025 Daniel Jara.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::Sale;
use crate::utils::{
    fmt_clp, maybe_print_json, parse_date, pretty_table, validate_range, ValidationError,
};
use anyhow::Result;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::Connection;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Sentinel that disables a set filter ("all of them").
pub const FILTER_ALL: &str = "Todo";

pub const BASE_QUERY: &str = "SELECT s.id, s.date, p.name, b.name, dt.name, s.document_number, \
     s.quantity, s.total_kg, s.unit_price, s.discount, s.net, s.tax, s.total, s.net_per_kg, \
     pm.name, s.receipt_number \
     FROM sales s \
     JOIN products p ON s.product_id=p.id \
     JOIN branches b ON s.branch_id=b.id \
     JOIN document_types dt ON s.document_type_id=dt.id \
     JOIN payment_methods pm ON s.payment_method_id=pm.id";

// Defense in depth only; every value still travels as a bound parameter.
static SQL_DENYLIST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(DROP|DELETE|UPDATE|INSERT|EXEC|EXECUTE|SCRIPT|UNION|SELECT)\b|--|/\*|\*/|;")
        .expect("valid regex")
});

pub fn screen_value(value: &str) -> Result<(), ValidationError> {
    if SQL_DENYLIST.is_match(value) {
        return Err(ValidationError::SuspiciousInput(value.to_string()));
    }
    Ok(())
}

/// Structured search criteria over the sales ledger.
#[derive(Debug, Clone, Default)]
pub struct SaleFilter {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub branches: Vec<String>,
    pub document_types: Vec<String>,
    pub products: Vec<String>,
    pub document_number: Option<String>,
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn set_applies(values: &[String]) -> bool {
    !values.is_empty() && !values.iter().any(|v| v == FILTER_ALL)
}

impl SaleFilter {
    /// Translate the filter into a parameterized query. Values never land in
    /// the SQL text itself.
    pub fn build_query(&self) -> Result<(String, Vec<String>), ValidationError> {
        for value in self
            .branches
            .iter()
            .chain(self.document_types.iter())
            .chain(self.products.iter())
            .chain(self.document_number.iter())
        {
            screen_value(value)?;
        }

        let mut conditions: Vec<String> = Vec::new();
        let mut params: Vec<String> = Vec::new();

        if self.start == self.end {
            conditions.push("s.date = ?".into());
            params.push(self.start.to_string());
        } else {
            conditions.push("s.date BETWEEN ? AND ?".into());
            params.push(self.start.to_string());
            params.push(self.end.to_string());
        }

        if set_applies(&self.branches) {
            conditions.push(format!("b.name IN ({})", placeholders(self.branches.len())));
            params.extend(self.branches.iter().cloned());
        }
        if set_applies(&self.document_types) {
            conditions.push(format!(
                "dt.name IN ({})",
                placeholders(self.document_types.len())
            ));
            params.extend(self.document_types.iter().cloned());
        }
        if set_applies(&self.products) {
            conditions.push(format!("p.name IN ({})", placeholders(self.products.len())));
            params.extend(self.products.iter().cloned());
        }
        if let Some(number) = self.document_number.as_deref().map(str::trim) {
            if !number.is_empty() {
                conditions.push("s.document_number = ?".into());
                params.push(number.to_string());
            }
        }

        let sql = format!(
            "{} WHERE {} ORDER BY s.date DESC, s.id DESC",
            BASE_QUERY,
            conditions.join(" AND ")
        );
        Ok((sql, params))
    }
}

struct CacheEntry {
    at: Instant,
    rows: Vec<Sale>,
}

/// Result cache keyed by query text plus parameters, with a fixed TTL.
pub struct QueryCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl QueryCache {
    pub fn new(ttl: Duration) -> Self {
        QueryCache {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &str) -> Option<Vec<Sale>> {
        let mut entries = self.entries.lock().ok()?;
        match entries.get(key) {
            Some(entry) if entry.at.elapsed() < self.ttl => Some(entry.rows.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn put(&self, key: String, rows: Vec<Sale>) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(
                key,
                CacheEntry {
                    at: Instant::now(),
                    rows,
                },
            );
        }
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}

static CACHE: Lazy<QueryCache> = Lazy::new(|| QueryCache::new(Duration::from_secs(300)));

pub fn invalidate_cache() {
    CACHE.clear();
}

pub fn run_search(conn: &Connection, filter: &SaleFilter) -> Result<Vec<Sale>> {
    validate_range(filter.start, filter.end)?;
    let (sql, params) = filter.build_query()?;
    let key = format!("{}\u{1f}{}", sql, params.join("\u{1f}"));
    if let Some(rows) = CACHE.get(&key) {
        return Ok(rows);
    }
    let rows = query_sales(conn, &sql, &params)?;
    CACHE.put(key, rows.clone());
    Ok(rows)
}

pub fn query_sales(conn: &Connection, sql: &str, params: &[String]) -> Result<Vec<Sale>> {
    let mut stmt = conn.prepare(sql)?;
    let bound: Vec<&dyn rusqlite::ToSql> =
        params.iter().map(|s| s as &dyn rusqlite::ToSql).collect();
    let mut rows = stmt.query(rusqlite::params_from_iter(bound))?;

    let mut data = Vec::new();
    while let Some(r) = rows.next()? {
        data.push(Sale {
            id: r.get(0)?,
            date: r.get(1)?,
            product: r.get(2)?,
            branch: r.get(3)?,
            document_type: r.get(4)?,
            document_number: r.get(5)?,
            quantity: r.get(6)?,
            total_kg: r.get(7)?,
            unit_price: crate::utils::parse_decimal(&r.get::<_, String>(8)?)?,
            discount: crate::utils::parse_decimal(&r.get::<_, String>(9)?)?,
            net: crate::utils::parse_decimal(&r.get::<_, String>(10)?)?,
            tax: crate::utils::parse_decimal(&r.get::<_, String>(11)?)?,
            total: crate::utils::parse_decimal(&r.get::<_, String>(12)?)?,
            net_per_kg: crate::utils::parse_decimal(&r.get::<_, String>(13)?)?,
            payment_method: r.get(14)?,
            receipt_number: r.get(15)?,
        });
    }
    Ok(data)
}

pub fn filter_from_matches(sub: &clap::ArgMatches) -> Result<SaleFilter> {
    let start = parse_date(sub.get_one::<String>("from").unwrap())?;
    let end = parse_date(sub.get_one::<String>("to").unwrap())?;
    let collect = |id: &str| -> Vec<String> {
        sub.get_many::<String>(id)
            .map(|v| v.cloned().collect())
            .unwrap_or_default()
    };
    Ok(SaleFilter {
        start,
        end,
        branches: collect("branch"),
        document_types: collect("doc-type"),
        products: collect("product"),
        document_number: sub.get_one::<String>("doc-number").cloned(),
    })
}

pub fn handle(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let filter = filter_from_matches(sub)?;
    let data = run_search(conn, &filter)?;

    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|s| {
                vec![
                    s.date.to_string(),
                    s.product.clone(),
                    s.branch.clone(),
                    s.document_type.clone(),
                    s.document_number.clone(),
                    s.quantity.to_string(),
                    s.total_kg.to_string(),
                    fmt_clp(&s.net),
                    fmt_clp(&s.tax),
                    fmt_clp(&s.total),
                    s.payment_method.clone(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &[
                    "Date", "Product", "Branch", "Doc", "N°", "Qty", "Kg", "Net", "IVA", "Total",
                    "Payment",
                ],
                rows,
            )
        );
        println!("{} record(s)", data.len());
    }
    Ok(())
}
