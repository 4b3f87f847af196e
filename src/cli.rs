// Copyright (c) 2025 Daniel Jara.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{value_parser, Arg, ArgAction, Command};

fn json_flags(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print pretty JSON"),
    )
    .arg(
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .help("Print one JSON object per line"),
    )
}

fn filter_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("from")
            .long("from")
            .required(true)
            .help("Start date (YYYY-MM-DD)"),
    )
    .arg(
        Arg::new("to")
            .long("to")
            .required(true)
            .help("End date (YYYY-MM-DD)"),
    )
    .arg(
        Arg::new("branch")
            .long("branch")
            .action(ArgAction::Append)
            .help("Branch filter, repeatable ('Todo' selects all)"),
    )
    .arg(
        Arg::new("doc-type")
            .long("doc-type")
            .action(ArgAction::Append)
            .help("Document type filter, repeatable ('Todo' selects all)"),
    )
    .arg(
        Arg::new("product")
            .long("product")
            .action(ArgAction::Append)
            .help("Product filter, repeatable ('Todo' selects all)"),
    )
    .arg(
        Arg::new("doc-number")
            .long("doc-number")
            .help("Exact document number"),
    )
}

pub fn build_cli() -> Command {
    Command::new("pelletbook")
        .version(clap::crate_version!())
        .about("Sales ledger, reporting, search and Excel export for a pellet fuel distributor")
        .subcommand(Command::new("init").about("Initialize the database"))
        .subcommand(
            Command::new("product")
                .about("Manage the product catalog")
                .subcommand(
                    Command::new("add")
                        .about("Add a product")
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(
                            Arg::new("type")
                                .long("type")
                                .required(true)
                                .value_parser(["Pellet", "Vacam"]),
                        )
                        .arg(
                            Arg::new("sales-type")
                                .long("sales-type")
                                .required(true)
                                .value_parser(["Local", "Distribuidor"]),
                        )
                        .arg(
                            Arg::new("unit")
                                .long("unit")
                                .required(true)
                                .help("Unit label, e.g. 'bolsas'"),
                        )
                        .arg(
                            Arg::new("kg")
                                .long("kg")
                                .required(true)
                                .value_parser(value_parser!(i64))
                                .help("Kilograms per unit"),
                        )
                        .arg(
                            Arg::new("price")
                                .long("price")
                                .required(true)
                                .help("Unit price in CLP (per kg for bulk products)"),
                        )
                        .arg(
                            Arg::new("by-weight")
                                .long("by-weight")
                                .action(ArgAction::SetTrue)
                                .help("Price applies per kilogram (bulk)"),
                        ),
                )
                .subcommand(json_flags(Command::new("list").about("List products")))
                .subcommand(
                    Command::new("rm")
                        .about("Remove a product")
                        .arg(Arg::new("name").long("name").required(true)),
                ),
        )
        .subcommand(
            Command::new("branch")
                .about("Manage branches")
                .subcommand(
                    Command::new("add")
                        .about("Add a branch")
                        .arg(Arg::new("name").long("name").required(true)),
                )
                .subcommand(Command::new("list").about("List branches"))
                .subcommand(
                    Command::new("rm")
                        .about("Remove a branch")
                        .arg(Arg::new("name").long("name").required(true)),
                ),
        )
        .subcommand(
            Command::new("sale")
                .about("Record and list sales")
                .subcommand(
                    Command::new("add")
                        .about("Record a sale")
                        .arg(Arg::new("date").long("date").required(true))
                        .arg(Arg::new("product").long("product").required(true))
                        .arg(Arg::new("branch").long("branch").required(true))
                        .arg(Arg::new("doc-type").long("doc-type").required(true))
                        .arg(
                            Arg::new("doc-number")
                                .long("doc-number")
                                .required(true)
                                .help("Document number ('0' for unnumbered)"),
                        )
                        .arg(
                            Arg::new("quantity")
                                .long("quantity")
                                .required(true)
                                .value_parser(value_parser!(i64)),
                        )
                        .arg(
                            Arg::new("discount")
                                .long("discount")
                                .help("Discount per unit in CLP"),
                        )
                        .arg(Arg::new("payment").long("payment").required(true))
                        .arg(Arg::new("receipt").long("receipt").help("Receipt number")),
                )
                .subcommand(json_flags(
                    Command::new("list")
                        .about("List sales")
                        .arg(Arg::new("date").long("date"))
                        .arg(Arg::new("month").long("month"))
                        .arg(Arg::new("branch").long("branch"))
                        .arg(
                            Arg::new("limit")
                                .long("limit")
                                .value_parser(value_parser!(usize)),
                        ),
                )),
        )
        .subcommand(json_flags(filter_args(
            Command::new("search").about("Search the sales ledger"),
        )))
        .subcommand(
            Command::new("report")
                .about("Daily, monthly and branch reports")
                .subcommand(json_flags(
                    Command::new("daily")
                        .about("Per-product summary for one day")
                        .arg(Arg::new("date").long("date").required(true)),
                ))
                .subcommand(json_flags(
                    Command::new("monthly")
                        .about("Per-product summary for one month")
                        .arg(
                            Arg::new("month")
                                .long("month")
                                .required(true)
                                .help("Month (YYYY-MM)"),
                        ),
                ))
                .subcommand(json_flags(
                    Command::new("branches")
                        .about("Branch comparison over a date range")
                        .arg(Arg::new("from").long("from").required(true))
                        .arg(Arg::new("to").long("to").required(true)),
                )),
        )
        .subcommand(json_flags(
            Command::new("trend")
                .about("Daily unit series with moving average and forecast")
                .arg(Arg::new("branch").long("branch").required(true))
                .arg(
                    Arg::new("sales-type")
                        .long("sales-type")
                        .required(true)
                        .value_parser(["Local", "Distribuidor"]),
                )
                .arg(Arg::new("from").long("from").required(true))
                .arg(Arg::new("to").long("to").required(true))
                .arg(
                    Arg::new("window")
                        .long("window")
                        .value_parser(value_parser!(usize))
                        .default_value("7")
                        .help("Moving average window"),
                )
                .arg(
                    Arg::new("forecast")
                        .long("forecast")
                        .value_parser(value_parser!(usize))
                        .default_value("5")
                        .help("Forecast periods"),
                ),
        ))
        .subcommand(
            Command::new("export")
                .about("Export search results and reports")
                .subcommand(
                    filter_args(Command::new("search").about("Export search results"))
                        .arg(
                            Arg::new("format")
                                .long("format")
                                .required(true)
                                .help("csv | json | xlsx"),
                        )
                        .arg(Arg::new("out").long("out").required(true)),
                )
                .subcommand(
                    Command::new("report")
                        .about("Export a multi-branch report workbook")
                        .arg(Arg::new("from").long("from").required(true))
                        .arg(Arg::new("to").long("to").required(true))
                        .arg(Arg::new("out").long("out").required(true)),
                ),
        )
        .subcommand(
            Command::new("rate")
                .about("CLP/USD exchange rate used in USD columns")
                .subcommand(
                    Command::new("set")
                        .about("Set the exchange rate")
                        .arg(Arg::new("value").required(true)),
                )
                .subcommand(Command::new("show").about("Show the exchange rate")),
        )
        .subcommand(Command::new("doctor").about("Scan the ledger for integrity issues"))
}
