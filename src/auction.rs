use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

pub type ItemId = String;
pub type ItemIdRef<'s> = &'s str;
pub type TeamId = String;
pub type TeamIdRef<'s> = &'s str;
pub type Amount = u64;

/// All the teams of the last snapshot, by team id
pub type Teams = BTreeMap<TeamId, TeamSnapshot>;

/// The item currently open for bidding
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Lot {
    pub name: ItemId,
    pub base_bid: Option<Amount>,
    pub photo_path: Option<String>,
}

/// Bidding status of the active lot, as asserted by the server
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BidState {
    pub current_amount: Option<Amount>,
    pub highest_bidder: Option<TeamId>,
    pub bidder_logo_path: Option<String>,
    /// Computed by the server from its increment rules
    pub next_potential_bid: Option<Amount>,
}

impl BidState {
    pub fn is_highest_bidder(&self, team: TeamIdRef) -> bool {
        self.highest_bidder.as_deref() == Some(team)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RosterEntry {
    pub sold_price: Option<Amount>,
    pub base_bid: Option<Amount>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TeamSnapshot {
    pub id: TeamId,
    /// `None` means the snapshot carried no usable number
    pub funds: Option<Amount>,
    pub logo_path: Option<String>,
    pub roster: BTreeMap<String, RosterEntry>,
}

/// One entry of the sold ticker
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SoldRecord {
    pub player_name: String,
    pub winning_team: TeamId,
    pub price: Option<Amount>,
    pub player_photo_path: Option<String>,
    pub winning_team_logo_path: Option<String>,
}

impl SoldRecord {
    /// Two sold events with the same key describe the same sale
    pub fn same_sale(&self, other: &SoldRecord) -> bool {
        self.player_name == other.player_name
            && self.price == other.price
            && self.winning_team == other.winning_team
    }
}

/// Read an amount out of a loosely typed JSON value
///
/// Only finite, non-negative, integral numbers are amounts. Strings
/// (`"N/A"`), nulls, fractions and negatives are all `None`.
pub fn amount_from_value(value: &Value) -> Option<Amount> {
    match value {
        Value::Number(n) => {
            if let Some(v) = n.as_u64() {
                return Some(v);
            }
            let f = n.as_f64()?;
            if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f < Amount::MAX as f64 {
                Some(f as Amount)
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Read a non-empty string out of a loosely typed JSON value
pub fn string_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// Render an amount the way the displays show it: `₹1,234,567`, or `--`
pub fn format_amount(amount: Option<Amount>) -> String {
    let amount = match amount {
        Some(a) => a,
        None => return "--".to_owned(),
    };

    let digits = amount.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i != 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("₹{grouped}")
}
