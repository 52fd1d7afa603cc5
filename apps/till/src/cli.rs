//! # Command Line
//!
//! `till [--config PATH] [--db PATH] <group> <action> [args] [--flags]`
//!
//! Arguments are split into positionals and `--flag value` pairs, then
//! dispatched to the command functions. Results print as JSON on stdout;
//! errors print as JSON on stderr.

use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::commands::product::{self, CreateProductRequest};
use crate::commands::report::{self, DateRange};
use crate::commands::sale;
use crate::commands::ticket::{self, ProductRef};
use crate::config::TillConfig;
use crate::error::ApiError;
use taproom_core::validation::parse_amount;
use taproom_core::{GainRule, ProductUpdate};
use taproom_db::Database;

pub const USAGE: &str = "\
Taproom POS till

Usage: till [--config PATH] [--db PATH] <group> <action> [args]

  product search [QUERY]
  product show ID
  product add NAME PRICE [--cost N] [--barcode CODE]
  product update ID [--name TEXT] [--price N] [--cost N] [--barcode CODE|-]
  product delete ID [--force]
  product import FILE | product export FILE | product seed

  ticket new [NAME] | ticket list | ticket show ID
  ticket rename ID [NAME] | ticket pay ID [METHOD] | ticket delete ID
  ticket add ID (--product ID | --barcode CODE) [--qty N] [--price N]
  ticket common ID PRICE [--qty N] [--name TEXT] [--gain 35%|$500|none]
  ticket remove ID LINE | ticket qty ID LINE QTY | ticket clear ID

  sale checkout TICKET [--receipt] | sale show ID [--receipt]
  sale today [--date YYYY-MM-DD]

  report summary|top|daily|hourly|monthly|sales [--from DATE] [--to DATE] [--limit N]

  config show | config init
";

/// Flags that never take a value.
const SWITCHES: [&str; 3] = ["force", "receipt", "help"];

// =============================================================================
// Parsing
// =============================================================================

/// A parsed command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    pub config_path: Option<PathBuf>,
    pub db_path: Option<PathBuf>,
    pub group: String,
    pub action: String,
    pub args: Vec<String>,
    pub flags: HashMap<String, String>,
}

impl Invocation {
    pub fn wants_help(&self) -> bool {
        self.group.is_empty() || self.group == "help" || self.flags.contains_key("help")
    }

    fn flag(&self, name: &str) -> Option<&str> {
        self.flags.get(name).map(String::as_str)
    }

    fn switch(&self, name: &str) -> bool {
        self.flags.contains_key(name)
    }

    fn arg(&self, index: usize, name: &str) -> Result<&str, ApiError> {
        self.args
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| ApiError::validation(format!("missing argument <{}>", name)))
    }

    fn opt_arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    fn id_arg(&self, index: usize, name: &str) -> Result<i64, ApiError> {
        parse_id(self.arg(index, name)?, name)
    }

    fn amount_flag(&self, name: &str) -> Result<Option<i64>, ApiError> {
        self.flag(name).map(|text| amount(text, name)).transpose()
    }
}

/// Splits `args` (without the program name).
pub fn parse(args: &[String]) -> Result<Invocation, ApiError> {
    let mut invocation = Invocation::default();
    let mut positionals = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.strip_prefix("--") {
            Some(name) if SWITCHES.contains(&name) => {
                invocation.flags.insert(name.to_string(), String::new());
            }
            Some(name) => {
                let value = iter
                    .next()
                    .ok_or_else(|| ApiError::validation(format!("--{} needs a value", name)))?;
                match name {
                    "config" => invocation.config_path = Some(PathBuf::from(value)),
                    "db" => invocation.db_path = Some(PathBuf::from(value)),
                    _ => {
                        invocation.flags.insert(name.to_string(), value.clone());
                    }
                }
            }
            None if arg == "-h" => {
                invocation.flags.insert("help".to_string(), String::new());
            }
            None => positionals.push(arg.clone()),
        }
    }

    let mut positionals = positionals.into_iter();
    invocation.group = positionals.next().unwrap_or_default();
    invocation.action = positionals.next().unwrap_or_default();
    invocation.args = positionals.collect();

    Ok(invocation)
}

fn parse_id(text: &str, name: &str) -> Result<i64, ApiError> {
    text.trim()
        .parse::<i64>()
        .map_err(|_| ApiError::validation(format!("<{}> must be a whole number, got '{}'", name, text)))
}

fn amount(text: &str, name: &str) -> Result<i64, ApiError> {
    parse_amount(text).map_err(|e| ApiError::validation(format!("{}: {}", name, e)))
}

// =============================================================================
// Output
// =============================================================================

/// What a command prints.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Json(serde_json::Value),
    Text(String),
}

impl Output {
    fn json<T: Serialize>(value: &T) -> Result<Output, ApiError> {
        serde_json::to_value(value)
            .map(Output::Json)
            .map_err(|e| ApiError::internal(format!("Could not encode output: {}", e)))
    }

    pub fn render(&self) -> String {
        match self {
            Output::Json(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
            Output::Text(text) => text.clone(),
        }
    }
}

// =============================================================================
// Dispatch
// =============================================================================

/// Runs a parsed invocation against an open database.
pub async fn execute(
    db: &Database,
    config: &TillConfig,
    inv: &Invocation,
) -> Result<Output, ApiError> {
    match inv.group.as_str() {
        "product" => execute_product(db, inv).await,
        "ticket" => execute_ticket(db, config, inv).await,
        "sale" => execute_sale(db, config, inv).await,
        "report" => execute_report(db, inv).await,
        other => Err(unknown("group", other)),
    }
}

/// `config` commands need no database.
pub fn execute_config(config: &TillConfig, inv: &Invocation) -> Result<Output, ApiError> {
    match inv.action.as_str() {
        "show" => Output::json(config),
        "init" => {
            let path = config
                .save(inv.config_path.clone())
                .map_err(|e| ApiError::internal(e.to_string()))?;
            Ok(Output::Text(format!("Wrote {}", path.display())))
        }
        other => Err(unknown("config action", other)),
    }
}

fn unknown(what: &str, value: &str) -> ApiError {
    ApiError::validation(format!("unknown {} '{}', see `till help`", what, value))
}

async fn execute_product(db: &Database, inv: &Invocation) -> Result<Output, ApiError> {
    match inv.action.as_str() {
        "search" => Output::json(&product::search_products(db, inv.opt_arg(0).unwrap_or("")).await?),
        "show" => Output::json(&product::get_product(db, inv.id_arg(0, "ID")?).await?),
        "add" => {
            let request = CreateProductRequest {
                name: inv.arg(0, "NAME")?.to_string(),
                sale_price: amount(inv.arg(1, "PRICE")?, "PRICE")?,
                purchase_price: inv.amount_flag("cost")?.unwrap_or(0),
                barcode: inv.flag("barcode").map(String::from),
            };
            Output::json(&product::create_product(db, request).await?)
        }
        "update" => {
            let update = ProductUpdate {
                name: inv.flag("name").map(String::from),
                sale_price: inv.amount_flag("price")?,
                purchase_price: inv.amount_flag("cost")?,
                barcode: inv
                    .flag("barcode")
                    .map(|code| (code != "-").then(|| code.to_string())),
            };
            Output::json(&product::update_product(db, inv.id_arg(0, "ID")?, update).await?)
        }
        "delete" => {
            let id = inv.id_arg(0, "ID")?;
            if inv.switch("force") {
                Output::json(&product::force_delete_product(db, id).await?)
            } else {
                product::delete_product(db, id).await?;
                Ok(Output::Text(format!("Deleted product {}", id)))
            }
        }
        "import" => {
            let path = PathBuf::from(inv.arg(0, "FILE")?);
            Output::json(&product::import_products(db, &path).await?)
        }
        "export" => {
            let path = PathBuf::from(inv.arg(0, "FILE")?);
            let written = product::export_products(db, &path).await?;
            Ok(Output::Text(format!("Exported {} products to {}", written, path.display())))
        }
        "seed" => {
            let inserted = product::seed_products(db).await?;
            Ok(Output::Text(format!("Inserted {} demo products", inserted)))
        }
        other => Err(unknown("product action", other)),
    }
}

async fn execute_ticket(
    db: &Database,
    config: &TillConfig,
    inv: &Invocation,
) -> Result<Output, ApiError> {
    match inv.action.as_str() {
        "new" => Output::json(
            &ticket::create_ticket(db, inv.opt_arg(0), config.default_pay_method).await?,
        ),
        "list" => Output::json(&ticket::list_tickets(db).await?),
        "show" => Output::json(&ticket::view_ticket(db, inv.id_arg(0, "ID")?).await?),
        "rename" => Output::json(
            &ticket::rename_ticket(db, inv.id_arg(0, "ID")?, inv.opt_arg(1)).await?,
        ),
        "pay" => Output::json(
            &ticket::set_pay_method(db, inv.id_arg(0, "ID")?, inv.opt_arg(1)).await?,
        ),
        "delete" => {
            let id = inv.id_arg(0, "ID")?;
            let deleted = ticket::delete_ticket(db, id).await?;
            Ok(Output::Text(if deleted {
                format!("Deleted ticket {}", id)
            } else {
                format!("Ticket {} did not exist", id)
            }))
        }
        "add" => {
            let product = match (inv.flag("product"), inv.flag("barcode")) {
                (Some(id), None) => ProductRef::Id(parse_id(id, "product")?),
                (None, Some(code)) => ProductRef::Barcode(code.to_string()),
                _ => {
                    return Err(ApiError::validation(
                        "give exactly one of --product or --barcode",
                    ))
                }
            };
            let qty = inv.flag("qty").map(|q| parse_id(q, "qty")).transpose()?.unwrap_or(1);
            Output::json(
                &ticket::add_item(
                    db,
                    inv.id_arg(0, "ID")?,
                    product,
                    qty,
                    inv.amount_flag("price")?,
                )
                .await?,
            )
        }
        "common" => {
            let gain = match inv.flag("gain") {
                Some(text) => text.parse::<GainRule>()?,
                None => config
                    .common_gain_rule()
                    .map_err(|e| ApiError::validation(e.to_string()))?,
            };
            let qty = inv.flag("qty").map(|q| parse_id(q, "qty")).transpose()?.unwrap_or(1);
            Output::json(
                &ticket::add_common_item(
                    db,
                    inv.id_arg(0, "ID")?,
                    qty,
                    amount(inv.arg(1, "PRICE")?, "PRICE")?,
                    inv.flag("name"),
                    gain,
                )
                .await?,
            )
        }
        "remove" => Output::json(
            &ticket::remove_item(db, inv.id_arg(0, "ID")?, inv.id_arg(1, "LINE")?).await?,
        ),
        "qty" => Output::json(
            &ticket::update_item_qty(
                db,
                inv.id_arg(0, "ID")?,
                inv.id_arg(1, "LINE")?,
                inv.id_arg(2, "QTY")?,
            )
            .await?,
        ),
        "clear" => Output::json(&ticket::clear_ticket(db, inv.id_arg(0, "ID")?).await?),
        other => Err(unknown("ticket action", other)),
    }
}

async fn execute_sale(
    db: &Database,
    config: &TillConfig,
    inv: &Invocation,
) -> Result<Output, ApiError> {
    let receipt = match inv.action.as_str() {
        "checkout" => sale::checkout(db, inv.id_arg(0, "TICKET")?).await?,
        "show" => sale::get_sale(db, inv.id_arg(0, "ID")?).await?,
        "today" => {
            let day = inv
                .flag("date")
                .map(|d| DateRange::parse(Some(d), None))
                .transpose()?
                .map(|range| range.from);
            return Output::json(&sale::list_sales_for_day(db, day).await?);
        }
        other => return Err(unknown("sale action", other)),
    };

    if inv.switch("receipt") {
        Ok(Output::Text(receipt.to_text(config)))
    } else {
        Output::json(&receipt)
    }
}

async fn execute_report(db: &Database, inv: &Invocation) -> Result<Output, ApiError> {
    let range = DateRange::parse(inv.flag("from"), inv.flag("to"))?;

    match inv.action.as_str() {
        "summary" => Output::json(&report::summary(db, range).await?),
        "top" => {
            let limit = inv
                .flag("limit")
                .map(|l| {
                    l.parse::<u32>()
                        .map_err(|_| ApiError::validation(format!("limit: '{}' is not a count", l)))
                })
                .transpose()?;
            Output::json(&report::top_products(db, range, limit).await?)
        }
        "daily" => Output::json(&report::daily_totals(db, range).await?),
        "hourly" => Output::json(&report::hourly_totals(db, range).await?),
        "monthly" => Output::json(&report::monthly_totals(db, range).await?),
        "sales" => Output::json(&report::list_sales(db, range).await?),
        other => Err(unknown("report action", other)),
    }
}
