//! Client view of the auction
//!
//! [`AuctionViewState`] holds the best-known picture of the auction
//! and derives everything a display needs from it. It has two
//! independent inputs:
//!
//! * push events, which only ever touch the lot/bid half of the state,
//! * snapshots, which only ever replace `teams`.
//!
//! Because the two write disjoint fields, a snapshot fetch resolving
//! before or after a push event ends in the same state.
use crate::auction::*;
use crate::event::{ConnectionEvent, FullStateUpdate, ItemSold, OutboundEvent, PushEvent};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const SOLD_HISTORY_CAPACITY: usize = 10;
pub const DEFAULT_ACCEPTED_MESSAGE: &str = "Bid submitted successfully!";

/// The data half of the view
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ViewState {
    pub active_lot: Option<Lot>,
    pub bid: Option<BidState>,
    pub teams: Teams,
    /// Our own team; `None` for presenter clients
    pub self_id: Option<TeamId>,
}

impl ViewState {
    /// The bid state, but only while there is a lot for it to belong to
    pub fn current_bid(&self) -> Option<&BidState> {
        self.active_lot.as_ref().and(self.bid.as_ref())
    }

    pub fn funds_of(&self, team: TeamIdRef) -> Option<Amount> {
        self.teams.get(team).and_then(|t| t.funds)
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BiddingLock {
    Open,
    #[default]
    Locked,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Feedback {
    pub message: String,
    pub is_error: bool,
}

impl Feedback {
    fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            is_error: true,
        }
    }

    fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            is_error: false,
        }
    }
}

/// Where our last bid submission is at
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Submission {
    #[default]
    Idle,
    Pending { item: ItemId },
    Resolved(Feedback),
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum Connection {
    #[default]
    Connecting,
    Live,
    Disconnected,
    /// Access revoked by the server; terminal
    Revoked(String),
    /// Connection refused (bad token); terminal
    Rejected(String),
}

impl Connection {
    pub fn is_live(&self) -> bool {
        matches!(self, Connection::Live)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Connection::Revoked(_) | Connection::Rejected(_))
    }
}

/// Bounded list of recent sales, most recent first
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SoldHistory(VecDeque<SoldRecord>);

impl SoldHistory {
    /// Returns `false` if the sale was already recorded
    pub fn record(&mut self, sale: SoldRecord) -> bool {
        if self.0.iter().any(|s| s.same_sale(&sale)) {
            return false;
        }
        self.0.push_front(sale);
        self.0.truncate(SOLD_HISTORY_CAPACITY);
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = &SoldRecord> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BiddingDecision {
    pub next_bid: Option<Amount>,
    pub can_afford: bool,
    pub is_self_highest: bool,
}

/// Reasons a bid can't be submitted right now
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error("not connected to the auction")]
    NotConnected,
    #[error("this view has no team to bid for")]
    NoTeam,
    #[error("a bid is already being submitted")]
    AlreadyPending,
    #[error("No item selected for bidding.")]
    NoActiveLot,
    #[error("you are already the highest bidder")]
    AlreadyHighest,
    #[error("team funds are not known yet")]
    FundsUnknown,
    #[error("insufficient funds: have {funds}, need {needed}")]
    InsufficientFunds { funds: Amount, needed: Amount },
}

/// Everything a display renders, derived from the current state
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DerivedView {
    pub lot: Option<Lot>,
    pub bid: Option<BidState>,
    pub decision: BiddingDecision,
    pub money_after_bid: Option<Amount>,
    pub self_funds: Option<Amount>,
    pub can_submit: bool,
    pub submission: Submission,
    pub connection: Connection,
    pub sold_history: SoldHistory,
    pub last_passed: Option<ItemId>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TeamOverview {
    pub id: TeamId,
    pub funds: Option<Amount>,
    pub logo_path: Option<String>,
    pub roster_size: usize,
}

/// What the caller should do after an event was applied
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Followup {
    /// Team funds/rosters may have changed; fetch a new snapshot
    pub refresh_snapshot: bool,
    /// (Re)connected; ask the server for its current state
    pub request_initial_data: bool,
}

#[derive(Clone, Debug, Default)]
pub struct AuctionViewState {
    state: ViewState,
    lot_active: bool,
    lock: BiddingLock,
    sold_history: SoldHistory,
    last_passed: Option<ItemId>,
    submission: Submission,
    connection: Connection,
    access_token: Option<String>,
}

pub type SharedView = Arc<parking_lot::Mutex<AuctionViewState>>;

impl AuctionViewState {
    /// A manager view, bidding for `self_id`
    pub fn new_manager(self_id: impl Into<TeamId>, access_token: Option<String>) -> Self {
        Self {
            state: ViewState {
                self_id: Some(self_id.into()),
                ..Default::default()
            },
            access_token,
            ..Default::default()
        }
    }

    /// A read-only presenter view
    pub fn new_presenter() -> Self {
        Self::default()
    }

    pub fn into_shared(self) -> SharedView {
        Arc::new(parking_lot::Mutex::new(self))
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn bidding_lock(&self) -> BiddingLock {
        self.lock
    }

    pub fn sold_history(&self) -> &SoldHistory {
        &self.sold_history
    }

    pub fn submission(&self) -> &Submission {
        &self.submission
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn last_passed(&self) -> Option<ItemIdRef> {
        self.last_passed.as_deref()
    }

    /// Install a new lot and its bid status as one unit
    ///
    /// Without a named, active lot both are cleared together.
    pub fn apply_full_state_update(
        &mut self,
        lot: Option<Lot>,
        bid: Option<BidState>,
        is_lot_active: bool,
    ) -> DerivedView {
        match lot {
            Some(lot) if is_lot_active && !lot.name.is_empty() => {
                debug!(lot = %lot.name, ?bid, "lot active");
                self.state.active_lot = Some(lot);
                self.state.bid = bid;
                self.lot_active = true;
                self.lock = if self.connection.is_terminal() {
                    BiddingLock::Locked
                } else {
                    BiddingLock::Open
                };
            }
            _ => {
                self.state.active_lot = None;
                self.state.bid = None;
                self.lot_active = false;
                self.lock = BiddingLock::Locked;
            }
        }

        if let Submission::Pending { .. } = self.submission {
            self.submission = if self.decision().is_self_highest {
                Submission::Resolved(Feedback::success(DEFAULT_ACCEPTED_MESSAGE))
            } else {
                Submission::Idle
            };
        }

        self.derived_view()
    }

    /// Replace all teams with a freshly fetched snapshot
    pub fn apply_snapshot(&mut self, teams: Teams) {
        self.state.teams = teams;
    }

    /// A lot was sold; stop bidding on it right away
    ///
    /// The lot itself is cleared by the `full_state_update` that follows.
    pub fn apply_item_sold(&mut self, sold: &ItemSold) {
        self.lock = BiddingLock::Locked;
        self.settle_on_lot_closed();

        match sold.to_record() {
            Some(record) => {
                if self.sold_history.record(record) {
                    info!(
                        player = ?sold.player_name,
                        team = ?sold.winning_team,
                        price = %format_amount(sold.price),
                        "sold"
                    );
                } else {
                    debug!(player = ?sold.player_name, "duplicate sold event");
                }
            }
            None => warn!(?sold, "sold event without player or team, not recorded"),
        }
    }

    /// A lot went unsold; stop bidding on it right away
    pub fn apply_item_passed(&mut self, lot_name: Option<ItemIdRef>) {
        self.lock = BiddingLock::Locked;
        self.settle_on_lot_closed();
        if let Some(name) = lot_name {
            info!(lot = name, "passed");
            self.last_passed = Some(name.to_owned());
        }
    }

    /// Server rejected our bid; only the feedback changes
    pub fn apply_bid_error(&mut self, message: &str) {
        warn!(reason = message, "bid rejected");
        self.submission = Submission::Resolved(Feedback::error(format!("Error: {message}")));
    }

    pub fn apply_bid_accepted(&mut self, message: Option<&str>) {
        self.submission = Submission::Resolved(Feedback::success(
            message.unwrap_or(DEFAULT_ACCEPTED_MESSAGE),
        ));
    }

    pub fn apply_access_revoked(&mut self, message: &str) {
        warn!(reason = message, "access revoked");
        self.connection = Connection::Revoked(message.to_owned());
        self.lock = BiddingLock::Locked;
        self.settle_pending();
    }

    /// Server refused our credentials; bidding stays closed until the next lot update
    pub fn apply_auth_error(&mut self, message: &str) {
        warn!(reason = message, "auth error");
        self.lock = BiddingLock::Locked;
        self.submission = Submission::Resolved(Feedback::error(format!("Auth Error: {message}")));
    }

    /// Our bid request never left the client
    pub fn abandon_submission(&mut self, reason: &str) {
        if let Submission::Pending { item } = &self.submission {
            warn!(lot = %item, reason, "bid submission abandoned");
            self.submission =
                Submission::Resolved(Feedback::error(format!("Error: {reason}")));
        }
    }

    pub fn apply_connection(&mut self, event: &ConnectionEvent) -> Followup {
        if self.connection.is_terminal() {
            debug!(?event, connection = ?self.connection, "ignoring connection event");
            return Followup::default();
        }

        match event {
            ConnectionEvent::Connected => {
                info!("connected");
                self.connection = Connection::Live;
                Followup {
                    refresh_snapshot: true,
                    request_initial_data: true,
                }
            }
            ConnectionEvent::Disconnected => {
                info!("disconnected");
                self.connection = Connection::Disconnected;
                Followup::default()
            }
            ConnectionEvent::Error(message) => {
                warn!(reason = %message, "connection error");
                self.connection = if message.contains("Invalid token") || message.contains("refused")
                {
                    Connection::Rejected(message.clone())
                } else {
                    Connection::Disconnected
                };
                Followup::default()
            }
        }
    }

    /// Apply any push event
    pub fn apply_push(&mut self, event: &PushEvent) -> Followup {
        let refresh_snapshot = match event {
            PushEvent::FullStateUpdate(FullStateUpdate {
                lot,
                bid,
                is_item_active,
            }) => {
                self.apply_full_state_update(lot.clone(), bid.clone(), *is_item_active);
                true
            }
            PushEvent::ItemSold(sold) => {
                self.apply_item_sold(sold);
                true
            }
            PushEvent::ItemPassed { item_name } => {
                self.apply_item_passed(item_name.as_deref());
                false
            }
            PushEvent::BidError { message } => {
                self.apply_bid_error(message);
                false
            }
            PushEvent::BidAccepted { message } => {
                self.apply_bid_accepted(message.as_deref());
                false
            }
            PushEvent::AccessRevoked { message } => {
                self.apply_access_revoked(message);
                false
            }
            PushEvent::AuthError { message } => {
                self.apply_auth_error(message);
                false
            }
            PushEvent::ReloadAllTeamStatus => {
                self.settle_pending();
                true
            }
        };

        Followup {
            refresh_snapshot,
            request_initial_data: false,
        }
    }

    fn settle_on_lot_closed(&mut self) {
        self.submission = Submission::Idle;
    }

    /// A pending submission never outlives the next push event
    fn settle_pending(&mut self) {
        if let Submission::Pending { .. } = self.submission {
            self.submission = Submission::Idle;
        }
    }

    /// Next bid, affordability and leadership for `self_id`
    pub fn derive_bidding_decision(&self, self_id: Option<TeamIdRef>) -> BiddingDecision {
        let bid = if self.lot_active && self.lock == BiddingLock::Open {
            self.state.current_bid()
        } else {
            None
        };

        let next_bid = bid.and_then(|b| b.next_potential_bid);
        let is_self_highest = match (bid, self_id) {
            (Some(bid), Some(me)) => bid.is_highest_bidder(me),
            _ => false,
        };
        let funds = self_id.and_then(|me| self.state.funds_of(me));

        let can_afford = match (next_bid, funds) {
            (Some(next), Some(funds)) => !is_self_highest && next <= funds,
            _ => false,
        };

        BiddingDecision {
            next_bid,
            can_afford,
            is_self_highest,
        }
    }

    /// Funds left for `self_id` after paying the next bid
    pub fn derive_money_after_bid(&self, self_id: Option<TeamIdRef>) -> Option<Amount> {
        let next_bid = self.derive_bidding_decision(self_id).next_bid?;
        let funds = self.state.funds_of(self_id?)?;
        funds.checked_sub(next_bid)
    }

    /// Decision for our own team
    pub fn decision(&self) -> BiddingDecision {
        self.derive_bidding_decision(self.state.self_id.as_deref())
    }

    pub fn can_submit(&self) -> bool {
        self.check_submit().is_ok()
    }

    fn check_submit(&self) -> Result<(TeamId, ItemId, Amount), SubmitError> {
        if !self.connection.is_live() {
            return Err(SubmitError::NotConnected);
        }
        let me = self.state.self_id.clone().ok_or(SubmitError::NoTeam)?;
        if let Submission::Pending { .. } = self.submission {
            return Err(SubmitError::AlreadyPending);
        }

        let decision = self.decision();
        let next_bid = decision.next_bid.ok_or(SubmitError::NoActiveLot)?;
        let lot = self
            .state
            .active_lot
            .as_ref()
            .ok_or(SubmitError::NoActiveLot)?;
        if decision.is_self_highest {
            return Err(SubmitError::AlreadyHighest);
        }
        let funds = self.state.funds_of(&me).ok_or(SubmitError::FundsUnknown)?;
        if !decision.can_afford {
            return Err(SubmitError::InsufficientFunds {
                funds,
                needed: next_bid,
            });
        }

        Ok((me, lot.name.clone(), next_bid))
    }

    /// Start a bid submission for the active lot
    ///
    /// On success the submission is pending until the next push event.
    pub fn submit_bid(&mut self) -> Result<OutboundEvent, SubmitError> {
        match self.check_submit() {
            Ok((team_name, item_name, amount)) => {
                info!(team = %team_name, lot = %item_name, amount = %format_amount(Some(amount)), "submitting bid");
                self.submission = Submission::Pending {
                    item: item_name.clone(),
                };
                Ok(OutboundEvent::SubmitBidFromManager {
                    team_name,
                    item_name,
                    access_token: self.access_token.clone(),
                })
            }
            Err(e) => {
                if e != SubmitError::AlreadyPending {
                    self.submission = Submission::Resolved(Feedback::error(e.to_string()));
                }
                Err(e)
            }
        }
    }

    pub fn initial_data_request(&self) -> OutboundEvent {
        OutboundEvent::RequestInitialData {
            team_name: self.state.self_id.clone(),
            access_token: self.access_token.clone(),
        }
    }

    pub fn derived_view(&self) -> DerivedView {
        let self_id = self.state.self_id.as_deref();
        DerivedView {
            lot: self.state.active_lot.clone(),
            bid: self.state.current_bid().cloned(),
            decision: self.derive_bidding_decision(self_id),
            money_after_bid: self.derive_money_after_bid(self_id),
            self_funds: self_id.and_then(|me| self.state.funds_of(me)),
            can_submit: self.can_submit(),
            submission: self.submission.clone(),
            connection: self.connection.clone(),
            sold_history: self.sold_history.clone(),
            last_passed: self.last_passed.clone(),
        }
    }

    /// All teams, sorted by id
    pub fn teams_overview(&self) -> Vec<TeamOverview> {
        self.state
            .teams
            .values()
            .map(|team| TeamOverview {
                id: team.id.clone(),
                funds: team.funds,
                logo_path: team.logo_path.clone(),
                roster_size: team.roster.len(),
            })
            .collect()
    }

    pub fn team(&self, id: TeamIdRef) -> Option<&TeamSnapshot> {
        self.state.teams.get(id)
    }
}
