// Copyright (c) 2025 Daniel Jara.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::sales::CREDIT_NOTE;
use crate::utils::{pretty_table, BUSINESS_START};
use anyhow::Result;
use rusqlite::Connection;

pub fn handle(conn: &Connection) -> Result<()> {
    let mut rows = Vec::new();

    // 1) Duplicate document numbers ("0" marks unnumbered internal docs)
    let mut stmt = conn.prepare(
        "SELECT dt.name, s.document_number, COUNT(*)
         FROM sales s JOIN document_types dt ON s.document_type_id=dt.id
         WHERE s.document_number != '0'
         GROUP BY s.document_type_id, s.document_number
         HAVING COUNT(*) > 1",
    )?;
    let mut cur = stmt.query([])?;
    while let Some(r) = cur.next()? {
        let doc_type: String = r.get(0)?;
        let number: String = r.get(1)?;
        let count: i64 = r.get(2)?;
        rows.push(vec![
            "duplicate_document".into(),
            format!("{} {} ({}x)", doc_type, number, count),
        ]);
    }

    // 2) Duplicate receipt numbers
    let mut stmt2 = conn.prepare(
        "SELECT s.receipt_number, COUNT(*)
         FROM sales s
         WHERE s.receipt_number IS NOT NULL AND s.receipt_number != ''
         GROUP BY s.receipt_number
         HAVING COUNT(*) > 1",
    )?;
    let mut cur2 = stmt2.query([])?;
    while let Some(r) = cur2.next()? {
        let receipt: String = r.get(0)?;
        let count: i64 = r.get(1)?;
        rows.push(vec![
            "duplicate_receipt".into(),
            format!("{} ({}x)", receipt, count),
        ]);
    }

    // 3) Credit notes must carry negative totals
    let mut stmt3 = conn.prepare(
        "SELECT s.id, s.document_number
         FROM sales s JOIN document_types dt ON s.document_type_id=dt.id
         WHERE dt.name=?1 AND CAST(s.total AS REAL) > 0",
    )?;
    let mut cur3 = stmt3.query([CREDIT_NOTE])?;
    while let Some(r) = cur3.next()? {
        let id: i64 = r.get(0)?;
        let number: String = r.get(1)?;
        rows.push(vec![
            "credit_note_positive".into(),
            format!("sale {} (doc {})", id, number),
        ]);
    }

    // 4) Negative quantities outside credit notes
    let mut stmt4 = conn.prepare(
        "SELECT s.id, dt.name
         FROM sales s JOIN document_types dt ON s.document_type_id=dt.id
         WHERE dt.name != ?1 AND s.quantity < 0",
    )?;
    let mut cur4 = stmt4.query([CREDIT_NOTE])?;
    while let Some(r) = cur4.next()? {
        let id: i64 = r.get(0)?;
        let doc_type: String = r.get(1)?;
        rows.push(vec![
            "negative_quantity".into(),
            format!("sale {} ({})", id, doc_type),
        ]);
    }

    // 5) Sales pointing at products removed from the catalog
    let mut stmt5 = conn.prepare(
        "SELECT s.id, s.product_id
         FROM sales s LEFT JOIN products p ON s.product_id=p.id
         WHERE p.id IS NULL",
    )?;
    let mut cur5 = stmt5.query([])?;
    while let Some(r) = cur5.next()? {
        let id: i64 = r.get(0)?;
        let product_id: i64 = r.get(1)?;
        rows.push(vec![
            "orphaned_product".into(),
            format!("sale {} (product_id {})", id, product_id),
        ]);
    }

    // 6) Sales recorded before business operations began
    let mut stmt6 = conn.prepare("SELECT id, date FROM sales WHERE date < ?1")?;
    let mut cur6 = stmt6.query([BUSINESS_START.to_string()])?;
    while let Some(r) = cur6.next()? {
        let id: i64 = r.get(0)?;
        let date: String = r.get(1)?;
        rows.push(vec![
            "sale_before_business_start".into(),
            format!("sale {} on {}", id, date),
        ]);
    }

    if rows.is_empty() {
        println!("doctor: no issues found");
    } else {
        println!("{}", pretty_table(&["Issue", "Detail"], rows));
    }
    Ok(())
}
