//! Text and JSON rendering of venues and positions.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::{json, Value};

use ignition_client::config::ConfigurationResolver;
use ignition_client::PositionTable;

const SECONDS_PER_HOUR: u64 = 3_600;
const SECONDS_PER_DAY: u64 = 86_400;
/// 365.25 / 12 days.
const SECONDS_PER_MONTH: u64 = 2_629_800;

/// Lockup length as the receipts spell it: `"1 Hour"`, `"6 Months"`.
pub fn describe_lockup(seconds: u64) -> String {
    let (count, unit) = if seconds >= SECONDS_PER_MONTH && seconds % SECONDS_PER_MONTH == 0 {
        (seconds / SECONDS_PER_MONTH, "Month")
    } else if seconds >= SECONDS_PER_DAY && seconds % SECONDS_PER_DAY == 0 {
        (seconds / SECONDS_PER_DAY, "Day")
    } else if seconds >= SECONDS_PER_HOUR && seconds % SECONDS_PER_HOUR == 0 {
        (seconds / SECONDS_PER_HOUR, "Hour")
    } else {
        (seconds, "Second")
    };
    let plural = if count == 1 { "" } else { "s" };
    format!("{count} {unit}{plural}")
}

fn symbol_of<'a>(resolver: &'a ConfigurationResolver, resource: &'a str) -> &'a str {
    resolver
        .resource(resource)
        .map(|meta| meta.symbol.as_str())
        .unwrap_or(resource)
}

// ---------------------------------------------------------------------------
// Venues
// ---------------------------------------------------------------------------

/// Venues with their pools, then the offered lockup periods.
pub fn venues_table(resolver: &ConfigurationResolver) -> String {
    let mut out = String::new();
    for (name, venue) in resolver.venues() {
        out.push_str(&format!("{name}  (receipt {})\n", venue.receipt_resource));
        for (resource, pool) in &venue.pools {
            out.push_str(&format!("    {:<8} {}\n", symbol_of(resolver, resource), pool));
        }
    }

    out.push_str("\nLockup periods\n");
    for option in resolver.protocol().lockup_options() {
        out.push_str(&format!(
            "    {:<10} {:>10}s  {}%\n",
            describe_lockup(option.seconds),
            option.seconds,
            (option.rate * Decimal::ONE_HUNDRED).normalize()
        ));
    }
    out
}

/// The venue listing as one JSON document.
pub fn venues_json(resolver: &ConfigurationResolver) -> Value {
    let venues: Vec<Value> = resolver
        .venues()
        .map(|(name, venue)| {
            json!({
                "name": name,
                "receipt_resource": venue.receipt_resource,
                "adapter": venue.adapter,
                "pools": venue.pools,
            })
        })
        .collect();
    let lockups: Vec<Value> = resolver
        .protocol()
        .lockup_options()
        .into_iter()
        .map(|option| {
            json!({
                "seconds": option.seconds,
                "label": describe_lockup(option.seconds),
                "rate": option.rate,
            })
        })
        .collect();

    json!({
        "network_id": resolver.network_id(),
        "ignition": resolver.ignition_address(),
        "venues": venues,
        "lockup_periods": lockups,
    })
}

// ---------------------------------------------------------------------------
// Positions
// ---------------------------------------------------------------------------

fn maturity_text(maturity: Option<DateTime<Utc>>) -> String {
    maturity
        .map(|at| at.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Positions as aligned columns, or a one-line notice when there are none.
pub fn positions_table(
    resolver: &ConfigurationResolver,
    table: &PositionTable,
    now: DateTime<Utc>,
) -> String {
    if table.is_empty() {
        return "No open positions.\n".to_string();
    }

    let mut out = format!(
        "{:<12} {:<8} {:<8} {:>20} {:<20} {}\n",
        "VENUE", "ID", "ASSET", "AMOUNT", "MATURITY", "STATUS"
    );
    for (resource, id, receipt) in table.iter() {
        let venue = resolver.venue_for_receipt(resource).unwrap_or("?");
        let status = if receipt.is_matured_at(now) {
            "closable"
        } else {
            "locked"
        };
        out.push_str(&format!(
            "{:<12} {:<8} {:<8} {:>20} {:<20} {}\n",
            venue,
            id,
            symbol_of(resolver, &receipt.user_resource_address),
            receipt.user_contribution_amount,
            maturity_text(receipt.maturity()),
            status
        ));
    }
    out
}

/// Positions as a JSON array.
pub fn positions_json(
    resolver: &ConfigurationResolver,
    table: &PositionTable,
    now: DateTime<Utc>,
) -> Value {
    let positions: Vec<Value> = table
        .iter()
        .map(|(resource, id, receipt)| {
            json!({
                "venue": resolver.venue_for_receipt(resource),
                "receipt_resource": resource,
                "id": id,
                "receipt": receipt,
                "maturity": receipt.maturity(),
                "closable": receipt.is_matured_at(now),
            })
        })
        .collect();
    Value::Array(positions)
}
