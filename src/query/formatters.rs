use crate::balances::BalanceRecord;
use crate::portfolio::{PortfolioSummary, Position};
use crate::query::commands::{NetworkInfo, TokenCheck};
use crate::tokens::TokenDescriptor;
use crate::yields::{RiskLevel, YieldOpportunity};
use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use csv::Writer;
use serde_json::json;

#[derive(Debug, Clone)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "csv" => OutputFormat::Csv,
            _ => OutputFormat::Table,
        }
    }
}

/// `$1,234.56`, with a leading minus for negative values.
pub fn format_usd(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as u128;
    let whole = (cents / 100).to_string();
    let fraction = cents % 100;

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}${grouped}.{fraction:02}")
}

fn format_apy(apy: f64) -> String {
    format!("{apy}%")
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(header);
    table
}

fn risk_color(risk: RiskLevel) -> Color {
    match risk {
        RiskLevel::Low => Color::Green,
        RiskLevel::Medium => Color::Yellow,
        RiskLevel::High => Color::Red,
    }
}

fn finish_csv(wtr: Writer<Vec<u8>>) -> String {
    String::from_utf8(wtr.into_inner().unwrap_or_default()).unwrap_or_default()
}

pub fn format_holdings(records: &[BalanceRecord], format: &OutputFormat) -> String {
    match format {
        OutputFormat::Table => format_holdings_table(records),
        OutputFormat::Json => format_holdings_json(records),
        OutputFormat::Csv => format_holdings_csv(records),
    }
}

fn format_holdings_table(records: &[BalanceRecord]) -> String {
    if records.is_empty() {
        return "No holdings found.".to_string();
    }

    let mut table = new_table(vec!["Token", "Name", "Balance", "Value (USD)"]);
    for record in records {
        table.add_row(vec![
            Cell::new(&record.symbol),
            Cell::new(&record.name),
            Cell::new(&record.amount).fg(Color::Green),
            Cell::new(format!("~{}", format_usd(record.usd_value))),
        ]);
    }

    table.to_string()
}

fn format_holdings_json(records: &[BalanceRecord]) -> String {
    let json_records: Vec<_> = records
        .iter()
        .map(|r| {
            json!({
                "symbol": r.symbol,
                "name": r.name,
                "balance": r.amount,
                "balance_raw": r.raw.to_string(),
                "value_usd": r.usd_value,
            })
        })
        .collect();

    serde_json::to_string_pretty(&json_records).unwrap_or_else(|_| "[]".to_string())
}

fn format_holdings_csv(records: &[BalanceRecord]) -> String {
    let mut wtr = Writer::from_writer(vec![]);
    let _ = wtr.write_record(["symbol", "name", "balance", "balance_raw", "value_usd"]);

    for record in records {
        let _ = wtr.write_record([
            &record.symbol,
            &record.name,
            &record.amount,
            &record.raw.to_string(),
            &format!("{:.2}", record.usd_value),
        ]);
    }

    finish_csv(wtr)
}

/// A single requested token. Without a record the balance is zero, unless
/// the lookup came from the cache, where it is unknown.
pub fn format_token_holding(
    token: &TokenDescriptor,
    record: Option<&BalanceRecord>,
    cached: bool,
    format: &OutputFormat,
) -> String {
    let known = record.is_some() || !cached;
    let amount = record.map_or("0", |r| r.amount.as_str());
    let raw = record.map_or("0".to_string(), |r| r.raw.to_string());
    let usd_value = record.map_or(0.0, |r| r.usd_value);

    match format {
        OutputFormat::Table => {
            let mut table = new_table(vec!["Token", "Balance", "Value (USD)"]);
            if known {
                table.add_row(vec![
                    Cell::new(&token.symbol),
                    Cell::new(amount).fg(Color::Green),
                    Cell::new(format!("~{}", format_usd(usd_value))),
                ]);
            } else {
                table.add_row(vec![
                    Cell::new(&token.symbol),
                    Cell::new("N/A").fg(Color::Red),
                    Cell::new("N/A"),
                ]);
            }
            table.to_string()
        }
        OutputFormat::Json => serde_json::to_string_pretty(&json!({
            "symbol": token.symbol,
            "name": token.name,
            "balance": known.then_some(amount),
            "balance_raw": known.then_some(raw),
            "value_usd": known.then_some(usd_value),
            "cached": cached,
        }))
        .unwrap_or_else(|_| "{}".to_string()),
        OutputFormat::Csv => {
            let na = |value: String| if known { value } else { "N/A".to_string() };
            let mut wtr = Writer::from_writer(vec![]);
            let _ = wtr.write_record(["symbol", "name", "balance", "balance_raw", "value_usd"]);
            let _ = wtr.write_record([
                token.symbol.clone(),
                token.name.clone(),
                na(amount.to_string()),
                na(raw),
                na(format!("{usd_value:.2}")),
            ]);
            finish_csv(wtr)
        }
    }
}

pub fn format_yields(opportunities: &[YieldOpportunity], format: &OutputFormat) -> String {
    match format {
        OutputFormat::Table => {
            if opportunities.is_empty() {
                return "No yield opportunities match the filter.".to_string();
            }

            let mut table = new_table(vec!["Pool", "APY", "TVL", "Risk"]);
            for opportunity in opportunities {
                table.add_row(vec![
                    Cell::new(opportunity.pool),
                    Cell::new(format_apy(opportunity.apy)).fg(Color::Green),
                    Cell::new(opportunity.tvl),
                    Cell::new(opportunity.risk).fg(risk_color(opportunity.risk)),
                ]);
            }
            table.to_string()
        }
        OutputFormat::Json => {
            serde_json::to_string_pretty(opportunities).unwrap_or_else(|_| "[]".to_string())
        }
        OutputFormat::Csv => {
            let mut wtr = Writer::from_writer(vec![]);
            let _ = wtr.write_record(["pool", "apy", "tvl", "risk"]);
            for opportunity in opportunities {
                let _ = wtr.write_record([
                    opportunity.pool,
                    &opportunity.apy.to_string(),
                    opportunity.tvl,
                    &opportunity.risk.to_string(),
                ]);
            }
            finish_csv(wtr)
        }
    }
}

pub fn format_positions(positions: &[Position], format: &OutputFormat) -> String {
    match format {
        OutputFormat::Table => {
            if positions.is_empty() {
                return "No active positions.".to_string();
            }

            let mut table = new_table(vec!["Pool", "Deposited", "APY", "Earned"]);
            for position in positions {
                table.add_row(vec![
                    Cell::new(position.pool_name()),
                    Cell::new(format_usd(position.deposited_usd)),
                    Cell::new(format_apy(position.apy)).fg(Color::Green),
                    Cell::new(format!("+{}", format_usd(position.earned_usd))).fg(Color::Green),
                ]);
            }
            table.to_string()
        }
        OutputFormat::Json => {
            serde_json::to_string_pretty(positions).unwrap_or_else(|_| "[]".to_string())
        }
        OutputFormat::Csv => {
            let mut wtr = Writer::from_writer(vec![]);
            let _ = wtr.write_record(["pool", "deposited_usd", "apy", "earned_usd"]);
            for position in positions {
                let _ = wtr.write_record([
                    position.pool,
                    &format!("{:.2}", position.deposited_usd),
                    &position.apy.to_string(),
                    &format!("{:.2}", position.earned_usd),
                ]);
            }
            finish_csv(wtr)
        }
    }
}

pub fn format_summary(summary: &PortfolioSummary, format: &OutputFormat) -> String {
    let rows = [
        ("Wallet Value", "wallet_value", summary.wallet_value),
        ("Staked Value", "staked_value", Some(summary.staked_value)),
        ("Pending Rewards", "pending_rewards", Some(summary.pending_rewards)),
        ("Total Value", "total_value", Some(summary.total_value)),
    ];

    match format {
        OutputFormat::Table => {
            let mut table = new_table(vec!["Metric", "Value (USD)"]);
            for (label, _, value) in rows {
                let cell = match value {
                    Some(value) => Cell::new(format_usd(value)).fg(Color::Green),
                    None => Cell::new("N/A").fg(Color::Red),
                };
                table.add_row(vec![Cell::new(label), cell]);
            }
            table.to_string()
        }
        OutputFormat::Json => {
            serde_json::to_string_pretty(summary).unwrap_or_else(|_| "{}".to_string())
        }
        OutputFormat::Csv => {
            let mut wtr = Writer::from_writer(vec![]);
            let _ = wtr.write_record(["metric", "value_usd"]);
            for (_, key, value) in rows {
                let value = value.map_or_else(|| "N/A".to_string(), |v| format!("{v:.2}"));
                let _ = wtr.write_record([key, &value]);
            }
            finish_csv(wtr)
        }
    }
}

/// Whole portfolio as one JSON document, so `--format json` stays parseable.
/// `holdings` is `None` when the wallet's balances could not be fetched.
pub fn format_portfolio_json(
    holdings: Option<&[BalanceRecord]>,
    positions: &[Position],
    summary: &PortfolioSummary,
    cached: bool,
) -> String {
    let holdings: serde_json::Value = match holdings {
        Some(holdings) => serde_json::from_str(&format_holdings_json(holdings))
            .unwrap_or_else(|_| json!([])),
        None => serde_json::Value::Null,
    };

    serde_json::to_string_pretty(&json!({
        "holdings": holdings,
        "holdings_cached": cached,
        "positions": positions,
        "summary": summary,
    }))
    .unwrap_or_else(|_| "{}".to_string())
}

pub fn format_network_info(info: &NetworkInfo, format: &OutputFormat) -> String {
    let na = || "N/A".to_string();
    let endpoint = info.endpoint.clone().unwrap_or_else(na);
    let chain_id = info.chain_id.map_or_else(na, |id| id.to_string());
    let latest_block = info.latest_block.map_or_else(na, |b| b.to_string());
    let status = info.status();

    match format {
        OutputFormat::Table => {
            let mut table = new_table(vec!["Property", "Value"]);
            table.add_row(vec![Cell::new("Network"), Cell::new(info.network)]);
            table.add_row(vec![
                Cell::new("Expected Chain ID"),
                Cell::new(info.expected_chain_id),
            ]);
            table.add_row(vec![Cell::new("Endpoint"), Cell::new(&endpoint)]);
            table.add_row(vec![Cell::new("Chain ID"), Cell::new(&chain_id)]);
            table.add_row(vec![Cell::new("Latest Block"), Cell::new(&latest_block)]);
            table.add_row(vec![
                Cell::new("Endpoints Configured"),
                Cell::new(info.candidates),
            ]);
            let status_color = if info.is_healthy() {
                Color::Green
            } else {
                Color::Red
            };
            table.add_row(vec![
                Cell::new("Status"),
                Cell::new(status).fg(status_color),
            ]);
            table.to_string()
        }
        OutputFormat::Json => serde_json::to_string_pretty(&json!({
            "network": info.network,
            "expected_chain_id": info.expected_chain_id,
            "endpoint": info.endpoint,
            "chain_id": info.chain_id,
            "latest_block": info.latest_block,
            "endpoints_configured": info.candidates,
            "status": status,
        }))
        .unwrap_or_else(|_| "{}".to_string()),
        OutputFormat::Csv => {
            let mut wtr = Writer::from_writer(vec![]);
            let _ = wtr.write_record(["property", "value"]);
            let _ = wtr.write_record(["network", info.network]);
            let _ = wtr.write_record(["expected_chain_id", &info.expected_chain_id.to_string()]);
            let _ = wtr.write_record(["endpoint", &endpoint]);
            let _ = wtr.write_record(["chain_id", &chain_id]);
            let _ = wtr.write_record(["latest_block", &latest_block]);
            let _ = wtr.write_record(["endpoints_configured", &info.candidates.to_string()]);
            let _ = wtr.write_record(["status", &status]);
            finish_csv(wtr)
        }
    }
}

pub fn format_token_checks(checks: &[TokenCheck], format: &OutputFormat) -> String {
    match format {
        OutputFormat::Table => {
            let mut table = new_table(vec!["Symbol", "Name", "Address", "Decimals", "Status"]);
            for check in checks {
                let address = if check.token.is_native() {
                    "native".to_string()
                } else {
                    format!("{:#}", check.token.address)
                };
                table.add_row(vec![
                    Cell::new(&check.token.symbol),
                    Cell::new(&check.token.name),
                    Cell::new(address),
                    Cell::new(check.token.decimals),
                    Cell::new(check.status()),
                ]);
            }
            table.to_string()
        }
        OutputFormat::Json => {
            let json_checks: Vec<_> = checks
                .iter()
                .map(|c| {
                    json!({
                        "symbol": c.token.symbol,
                        "name": c.token.name,
                        "address": format!("{:?}", c.token.address),
                        "decimals": c.token.decimals,
                        "price_usd": c.token.price_usd,
                        "status": c.status(),
                    })
                })
                .collect();
            serde_json::to_string_pretty(&json_checks).unwrap_or_else(|_| "[]".to_string())
        }
        OutputFormat::Csv => {
            let mut wtr = Writer::from_writer(vec![]);
            let _ = wtr.write_record(["symbol", "name", "address", "decimals", "status"]);
            for check in checks {
                let _ = wtr.write_record([
                    &check.token.symbol,
                    &check.token.name,
                    &format!("{:?}", check.token.address),
                    &check.token.decimals.to_string(),
                    &check.status(),
                ]);
            }
            finish_csv(wtr)
        }
    }
}
