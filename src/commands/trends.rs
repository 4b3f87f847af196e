// Copyright (c) 2025 Daniel Jara.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::utils::{maybe_print_json, parse_date, pretty_table, validate_range};
use anyhow::Result;
use rusqlite::{params, Connection};

/// Slope below which a series counts as flat.
pub const TREND_THRESHOLD: f64 = 0.1;

pub fn cumulative(data: &[f64]) -> Vec<f64> {
    let mut running = 0.0;
    data.iter()
        .map(|v| {
            running += v;
            running
        })
        .collect()
}

/// Moving average with partial windows at the head, so the output is always
/// the same length as the input.
pub fn moving_average(data: &[f64], window: usize) -> Vec<f64> {
    if window == 0 {
        return data.to_vec();
    }
    (0..data.len())
        .map(|i| {
            let lo = (i + 1).saturating_sub(window);
            let slice = &data[lo..=i];
            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect()
}

/// Least-squares line fit over x = 0..n, returning (slope, intercept).
pub fn linear_fit(data: &[f64]) -> (f64, f64) {
    let n = data.len() as f64;
    if data.is_empty() {
        return (0.0, 0.0);
    }
    let sum_x: f64 = (0..data.len()).map(|i| i as f64).sum();
    let sum_y: f64 = data.iter().sum();
    let sum_xy: f64 = data.iter().enumerate().map(|(i, y)| i as f64 * y).sum();
    let sum_xx: f64 = (0..data.len()).map(|i| (i * i) as f64).sum();
    let denom = n * sum_xx - sum_x * sum_x;
    if denom == 0.0 {
        return (0.0, sum_y / n);
    }
    let slope = (n * sum_xy - sum_x * sum_y) / denom;
    let intercept = (sum_y - slope * sum_x) / n;
    (slope, intercept)
}

pub fn classify_trend(slope: f64) -> &'static str {
    if slope > TREND_THRESHOLD {
        "upward"
    } else if slope < -TREND_THRESHOLD {
        "downward"
    } else {
        "stable"
    }
}

/// Project the fitted line `periods` steps past the series end.
pub fn forecast(slope: f64, intercept: f64, len: usize, periods: usize) -> Vec<f64> {
    (len..len + periods)
        .map(|x| slope * x as f64 + intercept)
        .collect()
}

pub fn daily_quantities(
    conn: &Connection,
    branch: &str,
    sales_type: &str,
    start: chrono::NaiveDate,
    end: chrono::NaiveDate,
) -> Result<Vec<(String, f64)>> {
    let mut stmt = conn.prepare(
        "SELECT s.date, SUM(s.quantity)
         FROM sales s
         JOIN products p ON s.product_id=p.id
         JOIN branches b ON s.branch_id=b.id
         WHERE b.name=?1 AND p.sales_type=?2 AND s.date BETWEEN ?3 AND ?4
         GROUP BY s.date ORDER BY s.date",
    )?;
    let mut rows = stmt.query(params![
        branch,
        sales_type,
        start.to_string(),
        end.to_string()
    ])?;
    let mut series = Vec::new();
    while let Some(r) = rows.next()? {
        let date: String = r.get(0)?;
        let quantity: i64 = r.get(1)?;
        series.push((date, quantity as f64));
    }
    Ok(series)
}

pub fn handle(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let branch = sub.get_one::<String>("branch").unwrap();
    let sales_type = sub.get_one::<String>("sales-type").unwrap();
    let start = parse_date(sub.get_one::<String>("from").unwrap())?;
    let end = parse_date(sub.get_one::<String>("to").unwrap())?;
    let window = *sub.get_one::<usize>("window").unwrap_or(&7);
    let periods = *sub.get_one::<usize>("forecast").unwrap_or(&5);
    validate_range(start, end)?;

    let series = daily_quantities(conn, branch, sales_type, start, end)?;
    if series.len() < 3 {
        println!(
            "Insufficient data for {} / {} ({} day(s) with sales)",
            branch,
            sales_type,
            series.len()
        );
        return Ok(());
    }

    let values: Vec<f64> = series.iter().map(|(_, v)| *v).collect();
    let running = cumulative(&values);
    let smoothed = moving_average(&values, window);
    let (slope, intercept) = linear_fit(&values);
    let trend = classify_trend(slope);
    let projected = forecast(slope, intercept, values.len(), periods);

    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    if json_flag || jsonl_flag {
        let payload = serde_json::json!({
            "branch": branch,
            "sales_type": sales_type,
            "dates": series.iter().map(|(d, _)| d.clone()).collect::<Vec<_>>(),
            "quantities": values,
            "cumulative": running,
            "moving_average": smoothed,
            "slope": slope,
            "trend": trend,
            "forecast": projected,
        });
        maybe_print_json(json_flag, jsonl_flag, &payload)?;
        return Ok(());
    }

    let rows: Vec<Vec<String>> = series
        .iter()
        .enumerate()
        .map(|(i, (date, v))| {
            vec![
                date.clone(),
                format!("{:.0}", v),
                format!("{:.0}", running[i]),
                format!("{:.2}", smoothed[i]),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(&["Date", "Units", "Cumulative", "Moving avg"], rows)
    );
    println!("Trend: {} (slope {:.3})", trend, slope);
    let rendered: Vec<String> = projected.iter().map(|v| format!("{:.1}", v)).collect();
    println!("Forecast next {}: {}", periods, rendered.join(", "));
    Ok(())
}
