// Copyright (c) 2025 Daniel Jara.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use pelletbook::{cli, commands::exporter, db};
use rusqlite::{params, Connection};
use tempfile::tempdir;

fn seeded_conn() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    db::init_schema(&mut conn).unwrap();
    conn.execute_batch(
        r#"
        INSERT INTO branches(name) VALUES ('Osorno'), ('La Unión');
        INSERT INTO products(name, product_type, sales_type, unit_label, kg_per_unit, unit_price, by_weight)
        VALUES ('Pellet Bolsa 15 Kg (Retiro)', 'Pellet', 'Local', 'bolsas', 15, '4500', 0);
        "#,
    )
    .unwrap();
    conn
}

fn insert_sale(conn: &Connection, date: &str, doc_number: &str, qty: i64) {
    conn.execute(
        "INSERT INTO sales(date, product_id, branch_id, document_type_id, document_number,
             quantity, total_kg, unit_price, discount, net, tax, total, net_per_kg,
             payment_method_id, receipt_number)
         VALUES (?1, 1, 1, 1, ?2, ?3, ?4, '4500', '0', '37815.1261', '7184.8739', '45000',
             '252.1008', 1, NULL)",
        params![date, doc_number, qty, qty * 15],
    )
    .unwrap();
}

fn run_export(conn: &Connection, args: &[&str]) -> anyhow::Result<()> {
    let mut full = vec!["pelletbook", "export"];
    full.extend_from_slice(args);
    let matches = cli::build_cli().get_matches_from(full);
    if let Some(("export", export_m)) = matches.subcommand() {
        exporter::handle(conn, export_m)
    } else {
        panic!("no export subcommand");
    }
}

#[test]
fn csv_export_writes_headers_and_rows() {
    let conn = seeded_conn();
    insert_sale(&conn, "2025-04-01", "501", 10);
    insert_sale(&conn, "2025-04-02", "502", 2);

    let dir = tempdir().unwrap();
    let out = dir.path().join("ventas.csv");
    let out_str = out.to_string_lossy().to_string();
    run_export(
        &conn,
        &[
            "search", "--from", "2025-04-01", "--to", "2025-04-03", "--format", "csv", "--out",
            &out_str,
        ],
    )
    .unwrap();

    let contents = std::fs::read_to_string(&out).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("date,product,branch,document_type,document_number"));
    assert!(lines[1].contains("2025-04-02")); // newest first
    assert!(lines[1].contains("Pellet Bolsa 15 Kg (Retiro)"));
    assert!(lines[2].contains("2025-04-01"));
}

#[test]
fn json_export_round_trips_through_serde() {
    let conn = seeded_conn();
    insert_sale(&conn, "2025-04-10", "503", 4);

    let dir = tempdir().unwrap();
    let out = dir.path().join("ventas.json");
    let out_str = out.to_string_lossy().to_string();
    run_export(
        &conn,
        &[
            "search", "--from", "2025-04-10", "--to", "2025-04-11", "--format", "json", "--out",
            &out_str,
        ],
    )
    .unwrap();

    let contents = std::fs::read_to_string(&out).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&contents).unwrap();
    let arr = parsed.as_array().unwrap();
    assert_eq!(arr.len(), 1);
    assert_eq!(arr[0]["document_number"], "503");
    assert_eq!(arr[0]["quantity"], 4);
}

#[test]
fn unknown_format_is_rejected_before_touching_the_filesystem() {
    let conn = seeded_conn();
    let dir = tempdir().unwrap();
    let out = dir.path().join("ventas.xml");
    let out_str = out.to_string_lossy().to_string();
    assert!(run_export(
        &conn,
        &[
            "search", "--from", "2025-04-20", "--to", "2025-04-21", "--format", "xml", "--out",
            &out_str,
        ],
    )
    .is_err());
    assert!(!out.exists());
}

#[test]
fn xlsx_export_produces_a_workbook() {
    let conn = seeded_conn();
    insert_sale(&conn, "2025-05-15", "504", 6);

    let dir = tempdir().unwrap();
    let out = dir.path().join("ventas.xlsx");
    let out_str = out.to_string_lossy().to_string();
    run_export(
        &conn,
        &[
            "search", "--from", "2025-05-14", "--to", "2025-05-16", "--format", "xlsx", "--out",
            &out_str,
        ],
    )
    .unwrap();
    let meta = std::fs::metadata(&out).unwrap();
    assert!(meta.len() > 0);
}

#[test]
fn report_export_writes_one_sheet_per_branch() {
    let conn = seeded_conn();
    insert_sale(&conn, "2025-06-01", "505", 3);

    let dir = tempdir().unwrap();
    let out = dir.path().join("reporte.xlsx");
    let out_str = out.to_string_lossy().to_string();
    run_export(
        &conn,
        &["report", "--from", "2025-06-01", "--to", "2025-06-30", "--out", &out_str],
    )
    .unwrap();
    let meta = std::fs::metadata(&out).unwrap();
    assert!(meta.len() > 0);
}
