//! Events flowing through the log
//!
//! Inbound events arrive as one JSON envelope per message,
//! `{"event": "<name>", "data": {...}}`. Decoding is lenient: only an
//! unreadable envelope or an unknown event name is an error. Anything
//! wrong inside `data` degrades the affected field to `None`.
use crate::auction::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Push(PushEvent),
    Connection(ConnectionEvent),
    Outbound(OutboundEvent),
    #[cfg(test)]
    Test,
}

/// Server-originated realtime message
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PushEvent {
    FullStateUpdate(FullStateUpdate),
    ItemSold(ItemSold),
    ItemPassed { item_name: Option<ItemId> },
    BidError { message: String },
    BidAccepted { message: Option<String> },
    AccessRevoked { message: String },
    /// The server refused our credentials for a request
    AuthError { message: String },
    ReloadAllTeamStatus,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FullStateUpdate {
    pub lot: Option<Lot>,
    pub bid: Option<BidState>,
    pub is_item_active: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ItemSold {
    pub player_name: Option<String>,
    pub winning_team: Option<TeamId>,
    pub price: Option<Amount>,
    pub player_photo_path: Option<String>,
    pub winning_team_logo_path: Option<String>,
}

impl ItemSold {
    /// The ticker entry, if the event names both the player and the team
    pub fn to_record(&self) -> Option<SoldRecord> {
        Some(SoldRecord {
            player_name: self.player_name.clone()?,
            winning_team: self.winning_team.clone()?,
            price: self.price,
            player_photo_path: self.player_photo_path.clone(),
            winning_team_logo_path: self.winning_team_logo_path.clone(),
        })
    }
}

/// State changes of the transport itself
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionEvent {
    Connected,
    Disconnected,
    Error(String),
}

/// Requests sent to the server
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum OutboundEvent {
    RequestInitialData {
        #[serde(skip_serializing_if = "Option::is_none")]
        team_name: Option<TeamId>,
        #[serde(skip_serializing_if = "Option::is_none")]
        access_token: Option<String>,
    },
    SubmitBidFromManager {
        team_name: TeamId,
        item_name: ItemId,
        access_token: Option<String>,
    },
}

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("malformed envelope: {0}")]
    Envelope(#[from] serde_json::Error),
    #[error("unknown event: {0}")]
    UnknownEvent(String),
}

#[derive(Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    data: Value,
}

/// Decode a single inbound message
pub fn decode(message: &str) -> Result<Event, DecodeError> {
    let Envelope { event, data } = serde_json::from_str(message)?;

    Ok(match event.as_str() {
        "connect" => Event::Connection(ConnectionEvent::Connected),
        "disconnect" => Event::Connection(ConnectionEvent::Disconnected),
        "connect_error" => Event::Connection(ConnectionEvent::Error(message_of(&data))),
        "full_state_update" => Event::Push(PushEvent::FullStateUpdate(decode_full_state(&data))),
        "item_sold_event" => Event::Push(PushEvent::ItemSold(ItemSold {
            player_name: string_from_value(&data["player_name"]),
            winning_team: string_from_value(&data["winning_team_name"]),
            price: amount_field(&data, "sold_price"),
            player_photo_path: string_from_value(&data["player_photo_path"]),
            winning_team_logo_path: string_from_value(&data["winning_team_logo_path"]),
        })),
        "item_passed_event" => Event::Push(PushEvent::ItemPassed {
            item_name: string_from_value(&data["item_name"]),
        }),
        "bid_error" => Event::Push(PushEvent::BidError {
            message: message_of(&data),
        }),
        "bid_accepted" => Event::Push(PushEvent::BidAccepted {
            message: string_from_value(&data["message"]),
        }),
        "access_revoked" => Event::Push(PushEvent::AccessRevoked {
            message: message_of(&data),
        }),
        "auth_error" => Event::Push(PushEvent::AuthError {
            message: message_of(&data),
        }),
        "reload_all_team_status" => Event::Push(PushEvent::ReloadAllTeamStatus),
        _ => return Err(DecodeError::UnknownEvent(event)),
    })
}

fn message_of(data: &Value) -> String {
    string_from_value(&data["message"]).unwrap_or_default()
}

/// Like [`amount_from_value`], but reports fields that are present and unusable
fn amount_field(data: &Value, key: &str) -> Option<Amount> {
    let value = &data[key];
    let amount = amount_from_value(value);
    if amount.is_none() && !value.is_null() {
        warn!(field = key, %value, "ignoring malformed amount");
    }
    amount
}

fn decode_full_state(data: &Value) -> FullStateUpdate {
    let item = &data["current_item"];
    let lot = string_from_value(&item["name"]).map(|name| Lot {
        name,
        base_bid: amount_field(item, "base_bid"),
        photo_path: string_from_value(&item["photo_path"]),
    });

    let status = &data["bid_status"];
    let bid = status.is_object().then(|| BidState {
        current_amount: amount_field(status, "bid_amount"),
        highest_bidder: if status["highest_bidder_exists"] == Value::Bool(true) {
            string_from_value(&status["highest_bidder_name"])
        } else {
            None
        },
        bidder_logo_path: string_from_value(&status["bidder_logo_path"]),
        next_potential_bid: amount_field(status, "next_potential_bid"),
    });

    FullStateUpdate {
        lot,
        bid,
        is_item_active: data["is_item_active"] == Value::Bool(true),
    }
}

impl OutboundEvent {
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
