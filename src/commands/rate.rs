// Copyright (c) 2025 Daniel Jara.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::search;
use crate::utils::{get_exchange_rate, parse_decimal, set_exchange_rate};
use anyhow::{bail, Result};
use rusqlite::Connection;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("set", sub)) => {
            let rate = parse_decimal(sub.get_one::<String>("value").unwrap())?;
            if rate.is_sign_negative() || rate.is_zero() {
                bail!("Exchange rate must be positive");
            }
            set_exchange_rate(conn, rate)?;
            // USD columns depend on the rate; stale search results must go.
            search::invalidate_cache();
            println!("Exchange rate set to {} CLP/USD", rate);
        }
        Some(("show", _)) => {
            println!("{} CLP/USD", get_exchange_rate(conn)?);
        }
        _ => {}
    }
    Ok(())
}
