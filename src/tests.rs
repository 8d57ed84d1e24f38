mod view;

use crate::auction::*;
use std::collections::BTreeMap;

pub fn lot(name: &str) -> Lot {
    Lot {
        name: name.to_owned(),
        base_bid: Some(1000),
        photo_path: None,
    }
}

pub fn bid(next: Option<Amount>, highest: Option<&str>) -> BidState {
    BidState {
        current_amount: Some(4000),
        highest_bidder: highest.map(str::to_owned),
        bidder_logo_path: None,
        next_potential_bid: next,
    }
}

pub fn team(id: &str, funds: Option<Amount>) -> TeamSnapshot {
    TeamSnapshot {
        id: id.to_owned(),
        funds,
        logo_path: None,
        roster: BTreeMap::new(),
    }
}

pub fn teams(list: &[(&str, Option<Amount>)]) -> Teams {
    list.iter()
        .map(|(id, funds)| (id.to_string(), team(id, *funds)))
        .collect()
}
