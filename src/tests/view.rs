use super::*;
use crate::{
    event::{ConnectionEvent, ItemSold, OutboundEvent, PushEvent},
    view::*,
};

fn manager() -> AuctionViewState {
    let mut view = AuctionViewState::new_manager("TeamA", Some("secret".to_owned()));
    view.apply_connection(&ConnectionEvent::Connected);
    view
}

fn sold(player: &str, team: &str, price: Amount) -> ItemSold {
    ItemSold {
        player_name: Some(player.to_owned()),
        winning_team: Some(team.to_owned()),
        price: Some(price),
        ..Default::default()
    }
}

#[test]
fn inactive_lot_never_has_a_next_bid() {
    let mut view = manager();
    view.apply_snapshot(teams(&[("TeamA", Some(100_000))]));

    view.apply_full_state_update(Some(lot("PlayerX")), Some(bid(Some(5000), None)), false);
    assert_eq!(view.derive_bidding_decision(Some("TeamA")).next_bid, None);

    view.apply_full_state_update(None, Some(bid(Some(5000), None)), false);
    assert_eq!(view.derive_bidding_decision(Some("TeamA")).next_bid, None);

    view.apply_full_state_update(Some(lot("PlayerY")), None, false);
    assert_eq!(view.derive_bidding_decision(Some("TeamA")).next_bid, None);
    assert_eq!(view.state().bid, None);
    assert_eq!(view.state().active_lot, None);
}

#[test]
fn bid_without_lot_is_cleared() {
    let mut view = manager();
    view.apply_full_state_update(None, Some(bid(Some(5000), Some("TeamB"))), true);

    assert_eq!(view.state().active_lot, None);
    assert_eq!(view.state().bid, None);
    assert_eq!(view.derived_view().bid, None);
}

#[test]
fn unnamed_lot_is_no_lot() {
    let mut view = manager();
    view.apply_full_state_update(Some(lot("")), Some(bid(Some(5000), None)), true);

    assert_eq!(view.state().active_lot, None);
    assert_eq!(view.decision().next_bid, None);
}

#[test]
fn snapshot_is_idempotent() {
    let snapshot = teams(&[("TeamA", Some(4000)), ("TeamB", None)]);

    let mut once = manager();
    once.apply_snapshot(snapshot.clone());

    let mut twice = manager();
    twice.apply_snapshot(snapshot.clone());
    twice.apply_snapshot(snapshot);

    assert_eq!(once.state(), twice.state());
    assert_eq!(once.derived_view(), twice.derived_view());
}

#[test]
fn snapshot_replaces_teams_wholesale() {
    let mut view = manager();
    view.apply_snapshot(teams(&[("TeamA", Some(4000)), ("TeamB", Some(1))]));
    view.apply_snapshot(teams(&[("TeamA", Some(3000))]));

    assert_eq!(view.state().teams, teams(&[("TeamA", Some(3000))]));
}

#[test]
fn push_and_snapshot_commute() {
    let snapshot = teams(&[("TeamA", Some(4000)), ("TeamB", Some(9000))]);

    let mut push_first = manager();
    push_first.apply_full_state_update(Some(lot("PlayerX")), Some(bid(Some(5000), Some("TeamB"))), true);
    push_first.apply_snapshot(snapshot.clone());

    let mut snapshot_first = manager();
    snapshot_first.apply_snapshot(snapshot);
    snapshot_first.apply_full_state_update(Some(lot("PlayerX")), Some(bid(Some(5000), Some("TeamB"))), true);

    assert_eq!(push_first.state(), snapshot_first.state());
    assert_eq!(push_first.derived_view(), snapshot_first.derived_view());
}

#[test]
fn cannot_afford_more_than_funds() {
    let mut view = manager();
    view.apply_snapshot(teams(&[("TeamA", Some(4000))]));
    view.apply_full_state_update(Some(lot("PlayerX")), Some(bid(Some(5000), Some("TeamB"))), true);

    assert_eq!(
        view.derive_bidding_decision(Some("TeamA")),
        BiddingDecision {
            next_bid: Some(5000),
            can_afford: false,
            is_self_highest: false,
        }
    );
    assert_eq!(view.derive_money_after_bid(Some("TeamA")), None);
}

#[test]
fn can_afford_exact_funds() {
    let mut view = manager();
    view.apply_snapshot(teams(&[("TeamA", Some(5000))]));
    view.apply_full_state_update(Some(lot("PlayerX")), Some(bid(Some(5000), Some("TeamB"))), true);

    let decision = view.derive_bidding_decision(Some("TeamA"));
    assert!(decision.can_afford);
    assert_eq!(decision.next_bid, Some(5000));
    assert_eq!(view.derive_money_after_bid(Some("TeamA")), Some(0));
}

#[test]
fn unknown_funds_cannot_afford() {
    let mut view = manager();
    view.apply_snapshot(teams(&[("TeamB", Some(100_000))]));
    view.apply_full_state_update(Some(lot("PlayerX")), Some(bid(Some(5000), None)), true);

    let decision = view.derive_bidding_decision(Some("TeamA"));
    assert_eq!(decision.next_bid, Some(5000));
    assert!(!decision.can_afford);
    assert_eq!(view.derive_money_after_bid(Some("TeamA")), None);

    // present in the snapshot, but without a usable number
    view.apply_snapshot(teams(&[("TeamA", None)]));
    assert!(!view.derive_bidding_decision(Some("TeamA")).can_afford);
}

#[test]
fn highest_bidder_cannot_outbid_itself() {
    let mut view = manager();
    view.apply_snapshot(teams(&[("TeamA", Some(100_000))]));
    view.apply_full_state_update(Some(lot("PlayerX")), Some(bid(Some(5000), Some("TeamA"))), true);

    let decision = view.decision();
    assert!(decision.is_self_highest);
    assert!(!decision.can_afford);
    assert_eq!(view.derive_money_after_bid(Some("TeamA")), Some(95_000));
}

#[test]
fn sold_locks_bidding_immediately() {
    let mut view = manager();
    view.apply_snapshot(teams(&[("TeamA", Some(100_000))]));
    view.apply_full_state_update(Some(lot("PlayerX")), Some(bid(Some(5000), None)), true);
    assert_eq!(view.decision().next_bid, Some(5000));

    view.apply_item_sold(&sold("PlayerX", "TeamA", 10_000));

    assert_eq!(view.bidding_lock(), BiddingLock::Locked);
    assert_eq!(view.decision().next_bid, None);
    assert!(!view.can_submit());
    // the lot itself waits for the follow-up state update
    assert!(view.state().active_lot.is_some());

    view.apply_full_state_update(None, None, false);
    assert_eq!(view.state().active_lot, None);
}

#[test]
fn passed_locks_bidding_without_history() {
    let mut view = manager();
    view.apply_full_state_update(Some(lot("PlayerX")), Some(bid(Some(5000), None)), true);

    view.apply_item_passed(Some("PlayerX"));

    assert_eq!(view.decision().next_bid, None);
    assert!(view.sold_history().is_empty());
    assert_eq!(view.last_passed(), Some("PlayerX"));
}

#[test]
fn new_lot_reopens_bidding() {
    let mut view = manager();
    view.apply_full_state_update(Some(lot("PlayerX")), Some(bid(Some(5000), None)), true);
    view.apply_item_passed(Some("PlayerX"));
    view.apply_full_state_update(Some(lot("PlayerY")), Some(bid(Some(2000), None)), true);

    assert_eq!(view.bidding_lock(), BiddingLock::Open);
    assert_eq!(view.decision().next_bid, Some(2000));
}

#[test]
fn sold_history_keeps_ten_most_recent_first() {
    let mut view = manager();
    for i in 0..11 {
        view.apply_item_sold(&sold(&format!("Player{i}"), "TeamA", 1000 + i));
    }

    let names: Vec<_> = view
        .sold_history()
        .iter()
        .map(|s| s.player_name.as_str())
        .collect();
    assert_eq!(view.sold_history().len(), SOLD_HISTORY_CAPACITY);
    assert_eq!(names.first(), Some(&"Player10"));
    assert_eq!(names.last(), Some(&"Player1"));
    assert!(!names.contains(&"Player0"));
}

#[test]
fn duplicate_sold_is_recorded_once_but_still_locks() {
    let mut view = manager();
    view.apply_item_sold(&sold("PlayerX", "TeamA", 10_000));
    view.apply_full_state_update(Some(lot("PlayerY")), Some(bid(Some(5000), None)), true);

    view.apply_item_sold(&sold("PlayerX", "TeamA", 10_000));

    assert_eq!(view.sold_history().len(), 1);
    assert_eq!(view.bidding_lock(), BiddingLock::Locked);

    // same player, different price: a different sale
    view.apply_item_sold(&sold("PlayerX", "TeamA", 12_000));
    assert_eq!(view.sold_history().len(), 2);
}

#[test]
fn sold_without_names_still_locks() {
    let mut view = manager();
    view.apply_full_state_update(Some(lot("PlayerX")), Some(bid(Some(5000), None)), true);

    view.apply_item_sold(&ItemSold::default());

    assert!(view.sold_history().is_empty());
    assert_eq!(view.decision().next_bid, None);
}

#[test]
fn malformed_next_bid_is_absent() -> anyhow::Result<()> {
    let message = r#"{"event": "full_state_update", "data": {
        "current_item": {"name": "PlayerX", "base_bid": 1000},
        "bid_status": {"bid_amount": 1000, "next_potential_bid": "N/A"},
        "is_item_active": true}}"#;
    let mut view = manager();
    view.apply_snapshot(teams(&[("TeamA", Some(100_000))]));

    match crate::event::decode(message)? {
        crate::event::Event::Push(push) => {
            view.apply_push(&push);
        }
        other => panic!("unexpected event {other:?}"),
    }

    let decision = view.decision();
    assert_eq!(decision.next_bid, None);
    assert!(!decision.can_afford);
    assert!(view.state().active_lot.is_some());
    assert_eq!(view.derive_money_after_bid(Some("TeamA")), None);
    Ok(())
}

#[test]
fn submit_bid_goes_pending() {
    let mut view = manager();
    view.apply_snapshot(teams(&[("TeamA", Some(10_000))]));
    view.apply_full_state_update(Some(lot("PlayerX")), Some(bid(Some(5000), Some("TeamB"))), true);

    assert_eq!(
        view.submit_bid(),
        Ok(OutboundEvent::SubmitBidFromManager {
            team_name: "TeamA".to_owned(),
            item_name: "PlayerX".to_owned(),
            access_token: Some("secret".to_owned()),
        })
    );
    assert_eq!(
        view.submission(),
        &Submission::Pending {
            item: "PlayerX".to_owned()
        }
    );
    assert_eq!(view.submit_bid(), Err(SubmitError::AlreadyPending));
}

#[test]
fn bid_error_resolves_without_touching_state() {
    let mut view = manager();
    view.apply_snapshot(teams(&[("TeamA", Some(10_000))]));
    view.apply_full_state_update(Some(lot("PlayerX")), Some(bid(Some(5000), Some("TeamB"))), true);
    view.submit_bid().expect("can bid");
    let before = view.state().clone();

    view.apply_push(&PushEvent::BidError {
        message: "Insufficient funds".to_owned(),
    });

    assert_eq!(view.state(), &before);
    assert_eq!(
        view.submission(),
        &Submission::Resolved(Feedback {
            message: "Error: Insufficient funds".to_owned(),
            is_error: true,
        })
    );
}

#[test]
fn state_update_settles_pending_submission() {
    let mut view = manager();
    view.apply_snapshot(teams(&[("TeamA", Some(10_000))]));
    view.apply_full_state_update(Some(lot("PlayerX")), Some(bid(Some(5000), Some("TeamB"))), true);
    view.submit_bid().expect("can bid");

    view.apply_full_state_update(Some(lot("PlayerX")), Some(bid(Some(5500), Some("TeamA"))), true);

    assert_eq!(
        view.submission(),
        &Submission::Resolved(Feedback {
            message: DEFAULT_ACCEPTED_MESSAGE.to_owned(),
            is_error: false,
        })
    );
    assert!(view.decision().is_self_highest);
}

#[test]
fn submit_rejections() {
    let mut view = AuctionViewState::new_manager("TeamA", None);
    assert_eq!(view.submit_bid(), Err(SubmitError::NotConnected));

    view.apply_connection(&ConnectionEvent::Connected);
    assert_eq!(view.submit_bid(), Err(SubmitError::NoActiveLot));
    assert_eq!(
        view.submission(),
        &Submission::Resolved(Feedback {
            message: "No item selected for bidding.".to_owned(),
            is_error: true,
        })
    );

    view.apply_full_state_update(Some(lot("PlayerX")), Some(bid(Some(5000), None)), true);
    assert_eq!(view.submit_bid(), Err(SubmitError::FundsUnknown));

    view.apply_snapshot(teams(&[("TeamA", Some(4000))]));
    assert_eq!(
        view.submit_bid(),
        Err(SubmitError::InsufficientFunds {
            funds: 4000,
            needed: 5000
        })
    );

    let mut presenter = AuctionViewState::new_presenter();
    presenter.apply_connection(&ConnectionEvent::Connected);
    assert_eq!(presenter.submit_bid(), Err(SubmitError::NoTeam));
}

#[test]
fn revoked_access_is_terminal() {
    let mut view = manager();
    view.apply_snapshot(teams(&[("TeamA", Some(10_000))]));
    view.apply_full_state_update(Some(lot("PlayerX")), Some(bid(Some(5000), None)), true);
    assert!(view.can_submit());

    view.apply_push(&PushEvent::AccessRevoked {
        message: "bye".to_owned(),
    });
    let followup = view.apply_connection(&ConnectionEvent::Connected);

    assert_eq!(view.connection(), &Connection::Revoked("bye".to_owned()));
    assert_eq!(followup, Followup::default());
    assert!(!view.can_submit());
}

#[test]
fn revoked_client_stays_locked_on_new_lots() {
    let mut view = manager();
    view.apply_snapshot(teams(&[("TeamA", Some(10_000))]));
    view.apply_access_revoked("bye");

    view.apply_full_state_update(Some(lot("PlayerY")), Some(bid(Some(5000), None)), true);

    assert_eq!(view.bidding_lock(), BiddingLock::Locked);
    assert_eq!(view.decision(), BiddingDecision::default());
    assert_eq!(view.derive_money_after_bid(Some("TeamA")), None);
    // the lot itself is still shown
    assert_eq!(view.state().active_lot, Some(lot("PlayerY")));
}

#[test]
fn auth_error_is_shown_and_closes_bidding() {
    let mut view = manager();
    view.apply_snapshot(teams(&[("TeamA", Some(10_000))]));
    view.apply_full_state_update(Some(lot("PlayerX")), Some(bid(Some(5000), None)), true);
    view.submit_bid().expect("bid allowed");

    let followup = view.apply_push(&PushEvent::AuthError {
        message: "bad token".to_owned(),
    });

    assert_eq!(followup, Followup::default());
    assert_eq!(
        view.submission(),
        &Submission::Resolved(Feedback {
            message: "Auth Error: bad token".to_owned(),
            is_error: true,
        })
    );
    assert_eq!(view.bidding_lock(), BiddingLock::Locked);
    assert_eq!(view.decision().next_bid, None);
    assert_eq!(view.connection(), &Connection::Live);

    // a fresh lot update is authoritative again
    view.apply_full_state_update(Some(lot("PlayerY")), Some(bid(Some(6000), None)), true);
    assert_eq!(view.decision().next_bid, Some(6000));
}

#[test]
fn abandoned_submission_no_longer_blocks_bidding() {
    let mut view = manager();
    view.apply_snapshot(teams(&[("TeamA", Some(10_000))]));
    view.apply_full_state_update(Some(lot("PlayerX")), Some(bid(Some(5000), None)), true);
    view.submit_bid().expect("bid allowed");
    assert_eq!(view.submit_bid(), Err(SubmitError::AlreadyPending));

    view.abandon_submission("log closed");

    assert_eq!(
        view.submission(),
        &Submission::Resolved(Feedback {
            message: "Error: log closed".to_owned(),
            is_error: true,
        })
    );
    assert!(view.can_submit());
}

#[test]
fn reconnect_requests_fresh_state() {
    let mut view = manager();
    view.apply_connection(&ConnectionEvent::Disconnected);
    assert_eq!(view.connection(), &Connection::Disconnected);

    let followup = view.apply_connection(&ConnectionEvent::Connected);
    assert!(followup.refresh_snapshot && followup.request_initial_data);
    assert_eq!(
        view.initial_data_request(),
        OutboundEvent::RequestInitialData {
            team_name: Some("TeamA".to_owned()),
            access_token: Some("secret".to_owned()),
        }
    );
}

#[test]
fn bad_token_is_rejected() {
    let mut view = AuctionViewState::new_manager("TeamA", None);
    view.apply_connection(&ConnectionEvent::Error("Invalid token".to_owned()));
    assert!(view.connection().is_terminal());

    let mut view = AuctionViewState::new_manager("TeamA", None);
    view.apply_connection(&ConnectionEvent::Error("timeout".to_owned()));
    assert_eq!(view.connection(), &Connection::Disconnected);
}

#[test]
fn teams_overview_is_sorted() {
    let mut view = AuctionViewState::new_presenter();
    view.apply_snapshot(teams(&[("Zebras", Some(1)), ("Ants", Some(2))]));

    let ids: Vec<_> = view.teams_overview().into_iter().map(|t| t.id).collect();
    assert_eq!(ids, vec!["Ants".to_owned(), "Zebras".to_owned()]);
    assert_eq!(view.team("Ants").and_then(|t| t.funds), Some(2));
    assert!(view.team("Bees").is_none());
}

#[test]
fn amounts_render_with_placeholder() {
    assert_eq!(format_amount(None), "--");
    assert_eq!(format_amount(Some(0)), "₹0");
    assert_eq!(format_amount(Some(999)), "₹999");
    assert_eq!(format_amount(Some(1_000)), "₹1,000");
    assert_eq!(format_amount(Some(1_234_567)), "₹1,234,567");
}
