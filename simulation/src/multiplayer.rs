//! Multiplayer System
//!
//! Leaderboards, player trades, cooperative contracts, friends and gifts,
//! persisted as documents in a shared `DocumentStore`.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::store::{DocumentStore, Query, SortOrder, StoreError};
use crate::world::GameWorld;

const LEADERBOARD: &str = "leaderboard";
const TRADES: &str = "trades";
const CONTRACTS: &str = "contracts";
const FRIEND_REQUESTS: &str = "friendRequests";
const GIFTS: &str = "gifts";
const PLAYERS: &str = "players";
const FARMS: &str = "farms";

pub const TRADE_LIFETIME_DAYS: i64 = 7;
pub const TRADE_QUERY_LIMIT: usize = 50;
pub const TRADE_HISTORY_LEN: usize = 100;

const REP_PURCHASE: i64 = 2;
const REP_FRIEND: i64 = 1;
const REP_GIFT: i64 = 3;

#[derive(Debug, Error)]
pub enum MultiplayerError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Malformed document: {0}")]
    Document(#[from] serde_json::Error),

    #[error("Contract {0} not found")]
    ContractNotFound(String),

    #[error("Contract {id} is full ({max} players)")]
    ContractFull { id: String, max: u32 },

    #[error("Already participating in contract {0}")]
    AlreadyJoined(String),

    #[error("Trade {0} not found")]
    TradeNotFound(String),

    #[error("Trade {0} is no longer available")]
    TradeUnavailable(String),

    #[error("Cannot buy your own offer")]
    OwnTrade,

    #[error("Invalid trade offer: {0}")]
    InvalidOffer(String),

    #[error("Friend request {0} not found")]
    RequestNotFound(String),

    #[error("Gift {0} not found")]
    GiftNotFound(String),
}

fn millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

// ============================================================================
// Contracts
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContractKind {
    BulkOrder,
    SeedSharing,
    WeatherResponse,
    ResearchProject,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractRewards {
    pub xp: u64,
    pub money: u64,
    pub rare_seeds: u32,
    pub unlocks: Vec<String>,
    pub reputation: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContractTemplate {
    pub name: &'static str,
    pub description: &'static str,
    pub min_players: u32,
    pub max_players: u32,
    pub duration_days: i64,
    pub xp: u64,
    pub money: u64,
    pub rare_seeds: u32,
    pub unlock: Option<&'static str>,
    pub reputation: i64,
}

impl ContractKind {
    pub const ALL: [ContractKind; 4] = [
        ContractKind::BulkOrder,
        ContractKind::SeedSharing,
        ContractKind::WeatherResponse,
        ContractKind::ResearchProject,
    ];

    pub const fn template(self) -> ContractTemplate {
        match self {
            ContractKind::BulkOrder => ContractTemplate {
                name: "Bulk Produce Order",
                description: "Fulfill large orders together",
                min_players: 2,
                max_players: 5,
                duration_days: 7,
                xp: 500,
                money: 2000,
                rare_seeds: 0,
                unlock: None,
                reputation: 10,
            },
            ContractKind::SeedSharing => ContractTemplate {
                name: "Seed Sharing Program",
                description: "Share rare seeds with other farmers",
                min_players: 3,
                max_players: 8,
                duration_days: 3,
                xp: 200,
                money: 0,
                rare_seeds: 5,
                unlock: None,
                reputation: 5,
            },
            ContractKind::WeatherResponse => ContractTemplate {
                name: "Weather Emergency Response",
                description: "Help each other during severe weather",
                min_players: 2,
                max_players: 10,
                duration_days: 1,
                xp: 300,
                money: 1000,
                rare_seeds: 0,
                unlock: None,
                reputation: 15,
            },
            ContractKind::ResearchProject => ContractTemplate {
                name: "Agricultural Research",
                description: "Collaborate on crop research",
                min_players: 4,
                max_players: 6,
                duration_days: 14,
                xp: 1000,
                money: 5000,
                rare_seeds: 0,
                unlock: Some("advancedSeeds"),
                reputation: 25,
            },
        }
    }

    pub fn rewards(self) -> ContractRewards {
        let t = self.template();
        ContractRewards {
            xp: t.xp,
            money: t.money,
            rare_seeds: t.rare_seeds,
            unlocks: t.unlock.map(str::to_string).into_iter().collect(),
            reputation: t.reputation,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    Recruiting,
    Active,
    Completed,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Contribution {
    pub joined: bool,
    pub contribution: f64,
    pub last_active: i64,
    pub details: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Text,
    System,
    Achievement,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub sender_id: String,
    pub sender_name: String,
    pub content: String,
    pub timestamp: i64,
    #[serde(rename = "type")]
    pub kind: MessageKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    #[serde(rename = "type")]
    pub kind: ContractKind,
    pub name: String,
    pub description: String,
    pub min_players: u32,
    pub max_players: u32,
    pub rewards: ContractRewards,
    pub creator_id: String,
    pub creator_name: String,
    pub participants: Vec<String>,
    pub participant_names: Vec<String>,
    pub status: ContractStatus,
    pub created_at: i64,
    pub expires_at: i64,
    #[serde(default)]
    pub requirements: Value,
    #[serde(default)]
    pub progress: BTreeMap<String, Contribution>,
    #[serde(default)]
    pub chat_messages: Vec<ChatMessage>,
}

impl Contract {
    pub fn is_full(&self) -> bool {
        self.participants.len() as u32 >= self.max_players
    }

    pub fn total_contribution(&self) -> f64 {
        self.progress.values().map(|p| p.contribution).sum()
    }
}

// ============================================================================
// Trades
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeItemType {
    Crops,
    Equipment,
    Resources,
}

impl TradeItemType {
    /// Discount off the market price for player-to-player sales
    pub fn price_multiplier(self) -> f64 {
        match self {
            TradeItemType::Crops => 0.9,
            TradeItemType::Equipment => 0.85,
            TradeItemType::Resources => 0.8,
        }
    }

    pub fn suggested_price(self, market_price: u64) -> u64 {
        (market_price as f64 * self.price_multiplier()).round() as u64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeStatus {
    Active,
    Sold,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeOffer {
    pub seller_id: String,
    pub seller_name: String,
    pub item_type: TradeItemType,
    pub item_id: String,
    pub quantity: u32,
    pub price_per_unit: u64,
    pub total_price: u64,
    pub description: String,
    pub created_at: i64,
    pub expires_at: i64,
    pub status: TradeStatus,
    #[serde(default)]
    pub interested_buyers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sold_at: Option<i64>,
}

/// What a seller puts up for trade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTrade {
    pub item_type: TradeItemType,
    pub item_id: String,
    pub quantity: u32,
    pub price_per_unit: u64,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeSide {
    Purchase,
    Sale,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub side: TradeSide,
    pub trade_id: String,
    pub at_ms: i64,
}

// ============================================================================
// Social
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Accepted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequest {
    pub from_id: String,
    pub from_name: String,
    pub to_id: String,
    pub status: RequestStatus,
    pub sent_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gift {
    pub sender_id: String,
    pub sender_name: String,
    pub recipient_id: String,
    pub item_type: TradeItemType,
    pub item_id: String,
    pub quantity: u32,
    pub message: String,
    pub sent_at: i64,
    pub status: RequestStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ReputationLevel {
    Novice,
    Apprentice,
    Experienced,
    Skilled,
    Expert,
    Master,
    Legendary,
}

impl ReputationLevel {
    pub fn from_reputation(reputation: i64) -> Self {
        match reputation {
            r if r >= 1000 => ReputationLevel::Legendary,
            r if r >= 500 => ReputationLevel::Master,
            r if r >= 200 => ReputationLevel::Expert,
            r if r >= 100 => ReputationLevel::Skilled,
            r if r >= 50 => ReputationLevel::Experienced,
            r if r >= 20 => ReputationLevel::Apprentice,
            _ => ReputationLevel::Novice,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnlineStatus {
    Online,
    Away,
    Offline,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiplayerStats {
    pub reputation: i64,
    pub reputation_level: ReputationLevel,
    pub friends: usize,
    pub active_contracts: usize,
    pub trades_completed: usize,
    pub trades_sold: usize,
    pub online_status: OnlineStatus,
    pub last_seen: DateTime<Utc>,
}

// ============================================================================
// Leaderboard
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeaderboardCategory {
    TotalMoney,
    Level,
    TotalHarvests,
    FieldsOwned,
    Reputation,
}

impl LeaderboardCategory {
    pub fn field(self) -> &'static str {
        match self {
            LeaderboardCategory::TotalMoney => "totalMoney",
            LeaderboardCategory::Level => "level",
            LeaderboardCategory::TotalHarvests => "totalHarvests",
            LeaderboardCategory::FieldsOwned => "fieldsOwned",
            LeaderboardCategory::Reputation => "reputation",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub player_id: String,
    pub player_name: String,
    pub level: u32,
    pub total_money: u64,
    pub total_harvests: u64,
    pub fields_owned: u32,
    pub reputation: i64,
    pub last_updated: i64,
    pub achievements: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub rank: usize,
    pub entry: LeaderboardEntry,
}

// ============================================================================
// System
// ============================================================================

/// One player's view of the shared multiplayer world
pub struct MultiplayerSystem {
    pub player_id: String,
    pub player_name: String,
    store: Arc<dyn DocumentStore>,
    friends: BTreeSet<String>,
    active_contracts: BTreeMap<String, Contract>,
    trade_history: Vec<TradeRecord>,
    reputation: i64,
    online_status: OnlineStatus,
    last_seen: DateTime<Utc>,
}

impl MultiplayerSystem {
    pub fn new(player_id: &str, player_name: &str, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            player_id: player_id.to_string(),
            player_name: player_name.to_string(),
            store,
            friends: BTreeSet::new(),
            active_contracts: BTreeMap::new(),
            trade_history: Vec::new(),
            reputation: 0,
            online_status: OnlineStatus::Online,
            last_seen: Utc::now(),
        }
    }

    pub fn reputation(&self) -> i64 {
        self.reputation
    }

    pub fn friends(&self) -> impl Iterator<Item = &str> {
        self.friends.iter().map(String::as_str)
    }

    pub fn active_contracts(&self) -> &BTreeMap<String, Contract> {
        &self.active_contracts
    }

    pub fn trade_history(&self) -> &[TradeRecord] {
        &self.trade_history
    }

    fn record_trade(&mut self, side: TradeSide, trade_id: &str) {
        self.trade_history.push(TradeRecord {
            side,
            trade_id: trade_id.to_string(),
            at_ms: millis(Utc::now()),
        });
    }

    // --- leaderboard ---

    pub fn update_leaderboard(&self, game: &GameWorld) -> Result<(), MultiplayerError> {
        let entry = LeaderboardEntry {
            player_id: self.player_id.clone(),
            player_name: game.player.name.clone(),
            level: game.player.level,
            total_money: game.player.money,
            total_harvests: game.farm.total_harvests,
            fields_owned: game.field_count() as u32,
            reputation: self.reputation,
            last_updated: millis(Utc::now()),
            achievements: game
                .achievements
                .unlocked()
                .map(|id| id.info().name.to_string())
                .collect(),
        };
        self.store
            .set(LEADERBOARD, &self.player_id, serde_json::to_value(entry)?, true)?;
        Ok(())
    }

    /// Top entries for a category, highest first
    pub fn leaderboard(
        &self,
        category: LeaderboardCategory,
        limit: usize,
    ) -> Result<Vec<RankedEntry>, MultiplayerError> {
        let query = Query::new()
            .order_by(category.field(), SortOrder::Descending)
            .limit(limit);
        self.store
            .query(LEADERBOARD, &query)?
            .into_iter()
            .enumerate()
            .map(|(i, (_, doc))| -> Result<RankedEntry, MultiplayerError> {
                Ok(RankedEntry {
                    rank: i + 1,
                    entry: serde_json::from_value(doc)?,
                })
            })
            .collect()
    }

    // --- trading ---

    pub fn create_trade_offer(&mut self, offer: NewTrade) -> Result<String, MultiplayerError> {
        if offer.quantity == 0 {
            return Err(MultiplayerError::InvalidOffer("quantity must be at least 1".into()));
        }
        let total_price = offer
            .price_per_unit
            .checked_mul(offer.quantity as u64)
            .ok_or_else(|| MultiplayerError::InvalidOffer("total price too large".into()))?;
        let now = Utc::now();
        let trade = TradeOffer {
            seller_id: self.player_id.clone(),
            seller_name: self.player_name.clone(),
            item_type: offer.item_type,
            item_id: offer.item_id,
            quantity: offer.quantity,
            price_per_unit: offer.price_per_unit,
            total_price,
            description: offer.description,
            created_at: millis(now),
            expires_at: millis(now + Duration::days(TRADE_LIFETIME_DAYS)),
            status: TradeStatus::Active,
            interested_buyers: Vec::new(),
            buyer_id: None,
            buyer_name: None,
            sold_at: None,
        };
        let id = self.store.add(TRADES, serde_json::to_value(trade)?)?;
        self.record_trade(TradeSide::Sale, &id);
        info!("{} listed trade {}", self.player_id, id);
        Ok(id)
    }

    /// Active offers from other players, newest first
    pub fn trade_offers(
        &self,
        item_type: Option<TradeItemType>,
        max_price: Option<u64>,
    ) -> Result<Vec<(String, TradeOffer)>, MultiplayerError> {
        let mut query = Query::new()
            .filter("status", "active")
            .order_by("createdAt", SortOrder::Descending);
        if let Some(item_type) = item_type {
            query = query.filter("itemType", serde_json::to_value(item_type)?);
        }

        let mut offers = Vec::new();
        for (id, doc) in self.store.query(TRADES, &query)? {
            let offer: TradeOffer = serde_json::from_value(doc)?;
            if offer.seller_id == self.player_id {
                continue;
            }
            if max_price.is_some_and(|max| offer.price_per_unit > max) {
                continue;
            }
            offers.push((id, offer));
            if offers.len() == TRADE_QUERY_LIMIT {
                break;
            }
        }
        Ok(offers)
    }

    pub fn purchase_trade_offer(&mut self, trade_id: &str) -> Result<TradeOffer, MultiplayerError> {
        let doc = self
            .store
            .get(TRADES, trade_id)?
            .ok_or_else(|| MultiplayerError::TradeNotFound(trade_id.to_string()))?;
        let mut offer: TradeOffer = serde_json::from_value(doc)?;
        if offer.status != TradeStatus::Active || offer.expires_at < millis(Utc::now()) {
            return Err(MultiplayerError::TradeUnavailable(trade_id.to_string()));
        }
        if offer.seller_id == self.player_id {
            return Err(MultiplayerError::OwnTrade);
        }

        let sold_at = millis(Utc::now());
        self.store.update(
            TRADES,
            trade_id,
            vec![
                ("status".into(), serde_json::to_value(TradeStatus::Sold)?),
                ("buyerId".into(), json!(self.player_id)),
                ("buyerName".into(), json!(self.player_name)),
                ("soldAt".into(), json!(sold_at)),
            ],
        )?;

        offer.status = TradeStatus::Sold;
        offer.buyer_id = Some(self.player_id.clone());
        offer.buyer_name = Some(self.player_name.clone());
        offer.sold_at = Some(sold_at);

        self.record_trade(TradeSide::Purchase, trade_id);
        self.reputation += REP_PURCHASE;
        info!("{} bought trade {}", self.player_id, trade_id);
        Ok(offer)
    }

    // --- cooperative contracts ---

    pub fn create_contract(
        &mut self,
        kind: ContractKind,
        requirements: Value,
    ) -> Result<String, MultiplayerError> {
        let template = kind.template();
        let now = Utc::now();
        let mut progress = BTreeMap::new();
        progress.insert(
            self.player_id.clone(),
            Contribution {
                joined: true,
                contribution: 0.0,
                last_active: millis(now),
                details: Value::Null,
            },
        );
        let contract = Contract {
            kind,
            name: template.name.to_string(),
            description: template.description.to_string(),
            min_players: template.min_players,
            max_players: template.max_players,
            rewards: kind.rewards(),
            creator_id: self.player_id.clone(),
            creator_name: self.player_name.clone(),
            participants: vec![self.player_id.clone()],
            participant_names: vec![self.player_name.clone()],
            status: ContractStatus::Recruiting,
            created_at: millis(now),
            expires_at: millis(now + Duration::days(template.duration_days)),
            requirements,
            progress,
            chat_messages: Vec::new(),
        };

        let id = self.store.add(CONTRACTS, serde_json::to_value(&contract)?)?;
        self.active_contracts.insert(id.clone(), contract);
        info!("{} started contract {} ({})", self.player_id, id, template.name);
        Ok(id)
    }

    fn load_contract(&self, contract_id: &str) -> Result<Contract, MultiplayerError> {
        let doc = self
            .store
            .get(CONTRACTS, contract_id)?
            .ok_or_else(|| MultiplayerError::ContractNotFound(contract_id.to_string()))?;
        Ok(serde_json::from_value(doc)?)
    }

    pub fn join_contract(&mut self, contract_id: &str) -> Result<Contract, MultiplayerError> {
        let mut contract = self.load_contract(contract_id)?;
        if contract.participants.contains(&self.player_id) {
            return Err(MultiplayerError::AlreadyJoined(contract_id.to_string()));
        }
        if contract.is_full() {
            return Err(MultiplayerError::ContractFull {
                id: contract_id.to_string(),
                max: contract.max_players,
            });
        }

        let entry = Contribution {
            joined: true,
            contribution: 0.0,
            last_active: millis(Utc::now()),
            details: Value::Null,
        };
        contract.participants.push(self.player_id.clone());
        contract.participant_names.push(self.player_name.clone());
        contract.progress.insert(self.player_id.clone(), entry.clone());
        if contract.participants.len() as u32 >= contract.min_players {
            contract.status = ContractStatus::Active;
        }

        self.store.update(
            CONTRACTS,
            contract_id,
            vec![
                ("participants".into(), json!(contract.participants)),
                ("participantNames".into(), json!(contract.participant_names)),
                ("status".into(), serde_json::to_value(contract.status)?),
                (format!("progress.{}", self.player_id), serde_json::to_value(entry)?),
            ],
        )?;

        self.active_contracts
            .insert(contract_id.to_string(), contract.clone());
        info!("{} joined contract {}", self.player_id, contract_id);
        Ok(contract)
    }

    /// Add to this player's contribution. Returns the new total for the player.
    pub fn update_contract_progress(
        &mut self,
        contract_id: &str,
        contribution: f64,
        details: Value,
    ) -> Result<f64, MultiplayerError> {
        let contract = self.load_contract(contract_id)?;
        let current = contract
            .progress
            .get(&self.player_id)
            .map(|p| p.contribution)
            .unwrap_or(0.0);
        let total = current + contribution;
        let prefix = format!("progress.{}", self.player_id);

        self.store.update(
            CONTRACTS,
            contract_id,
            vec![
                (format!("{}.joined", prefix), json!(true)),
                (format!("{}.contribution", prefix), json!(total)),
                (format!("{}.lastActive", prefix), json!(millis(Utc::now()))),
                (format!("{}.details", prefix), details),
            ],
        )?;

        if let Ok(fresh) = self.load_contract(contract_id) {
            self.active_contracts.insert(contract_id.to_string(), fresh);
        }
        debug!("{} contributed {} to {}", self.player_id, contribution, contract_id);
        Ok(total)
    }

    pub fn send_message(
        &mut self,
        contract_id: &str,
        content: &str,
        kind: MessageKind,
    ) -> Result<(), MultiplayerError> {
        let mut contract = self.load_contract(contract_id)?;
        contract.chat_messages.push(ChatMessage {
            sender_id: self.player_id.clone(),
            sender_name: self.player_name.clone(),
            content: content.to_string(),
            timestamp: millis(Utc::now()),
            kind,
        });
        self.store.update(
            CONTRACTS,
            contract_id,
            vec![("chatMessages".into(), serde_json::to_value(&contract.chat_messages)?)],
        )?;
        if self.active_contracts.contains_key(contract_id) {
            self.active_contracts.insert(contract_id.to_string(), contract);
        }
        Ok(())
    }

    // --- friends ---

    pub fn send_friend_request(&self, target_player_id: &str) -> Result<String, MultiplayerError> {
        let request = FriendRequest {
            from_id: self.player_id.clone(),
            from_name: self.player_name.clone(),
            to_id: target_player_id.to_string(),
            status: RequestStatus::Pending,
            sent_at: millis(Utc::now()),
        };
        Ok(self.store.add(FRIEND_REQUESTS, serde_json::to_value(request)?)?)
    }

    /// Pending requests addressed to this player
    pub fn friend_requests(&self) -> Result<Vec<(String, FriendRequest)>, MultiplayerError> {
        let query = Query::new()
            .filter("toId", self.player_id.as_str())
            .filter("status", "pending");
        self.store
            .query(FRIEND_REQUESTS, &query)?
            .into_iter()
            .map(|(id, doc)| -> Result<(String, FriendRequest), MultiplayerError> {
                Ok((id, serde_json::from_value(doc)?))
            })
            .collect()
    }

    pub fn accept_friend_request(&mut self, request_id: &str) -> Result<String, MultiplayerError> {
        let doc = self
            .store
            .get(FRIEND_REQUESTS, request_id)?
            .ok_or_else(|| MultiplayerError::RequestNotFound(request_id.to_string()))?;
        let request: FriendRequest = serde_json::from_value(doc)?;
        if request.to_id != self.player_id || request.status != RequestStatus::Pending {
            return Err(MultiplayerError::RequestNotFound(request_id.to_string()));
        }

        self.store.update(
            FRIEND_REQUESTS,
            request_id,
            vec![
                ("status".into(), serde_json::to_value(RequestStatus::Accepted)?),
                ("acceptedAt".into(), json!(millis(Utc::now()))),
            ],
        )?;
        self.friends.insert(request.from_id.clone());
        self.reputation += REP_FRIEND;
        Ok(request.from_id)
    }

    // --- gifts ---

    pub fn send_gift(
        &mut self,
        recipient_id: &str,
        item_type: TradeItemType,
        item_id: &str,
        quantity: u32,
        message: &str,
    ) -> Result<String, MultiplayerError> {
        let gift = Gift {
            sender_id: self.player_id.clone(),
            sender_name: self.player_name.clone(),
            recipient_id: recipient_id.to_string(),
            item_type,
            item_id: item_id.to_string(),
            quantity,
            message: message.to_string(),
            sent_at: millis(Utc::now()),
            status: RequestStatus::Pending,
        };
        let id = self.store.add(GIFTS, serde_json::to_value(gift)?)?;
        self.reputation += REP_GIFT;
        Ok(id)
    }

    /// Unclaimed gifts for this player, newest first
    pub fn pending_gifts(&self) -> Result<Vec<(String, Gift)>, MultiplayerError> {
        let query = Query::new()
            .filter("recipientId", self.player_id.as_str())
            .filter("status", "pending")
            .order_by("sentAt", SortOrder::Descending);
        self.store
            .query(GIFTS, &query)?
            .into_iter()
            .map(|(id, doc)| -> Result<(String, Gift), MultiplayerError> {
                Ok((id, serde_json::from_value(doc)?))
            })
            .collect()
    }

    pub fn accept_gift(&mut self, gift_id: &str) -> Result<Gift, MultiplayerError> {
        let doc = self
            .store
            .get(GIFTS, gift_id)?
            .ok_or_else(|| MultiplayerError::GiftNotFound(gift_id.to_string()))?;
        let mut gift: Gift = serde_json::from_value(doc)?;
        if gift.recipient_id != self.player_id || gift.status != RequestStatus::Pending {
            return Err(MultiplayerError::GiftNotFound(gift_id.to_string()));
        }
        self.store.update(
            GIFTS,
            gift_id,
            vec![
                ("status".into(), serde_json::to_value(RequestStatus::Accepted)?),
                ("acceptedAt".into(), json!(millis(Utc::now()))),
            ],
        )?;
        gift.status = RequestStatus::Accepted;
        Ok(gift)
    }

    // --- presence ---

    pub fn reputation_level(&self) -> ReputationLevel {
        ReputationLevel::from_reputation(self.reputation)
    }

    pub fn stats(&self) -> MultiplayerStats {
        MultiplayerStats {
            reputation: self.reputation,
            reputation_level: self.reputation_level(),
            friends: self.friends.len(),
            active_contracts: self.active_contracts.len(),
            trades_completed: self
                .trade_history
                .iter()
                .filter(|t| t.side == TradeSide::Purchase)
                .count(),
            trades_sold: self
                .trade_history
                .iter()
                .filter(|t| t.side == TradeSide::Sale)
                .count(),
            online_status: self.online_status,
            last_seen: self.last_seen,
        }
    }

    pub fn update_online_status(&mut self, status: OnlineStatus) {
        self.online_status = status;
        self.last_seen = Utc::now();

        let doc = json!({
            "onlineStatus": status,
            "lastSeen": millis(self.last_seen),
        });
        if let Err(e) = self.store.set(PLAYERS, &self.player_id, doc, true) {
            warn!("Failed to update online status for {}: {}", self.player_id, e);
        }
    }

    /// Drop expired contracts and trim trade history
    pub fn cleanup(&mut self, now: DateTime<Utc>) {
        let now_ms = millis(now);
        let before = self.active_contracts.len();
        self.active_contracts.retain(|_, c| c.expires_at >= now_ms);
        let expired = before - self.active_contracts.len();
        if expired > 0 {
            debug!("Dropped {} expired contracts", expired);
        }

        if self.trade_history.len() > TRADE_HISTORY_LEN {
            let excess = self.trade_history.len() - TRADE_HISTORY_LEN;
            self.trade_history.drain(..excess);
        }
    }

    /// Publish the farm state to `farms/<player>`
    pub fn sync_farm(&self, game: &GameWorld) -> Result<(), MultiplayerError> {
        let mut doc = serde_json::to_value(game.state())?;
        if let Some(object) = doc.as_object_mut() {
            object.insert("lastSaved".into(), json!(millis(Utc::now())));
        }
        self.store.set(FARMS, &self.player_id, doc, false)?;
        debug!("Synced farm for {}", self.player_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::store::MemoryStore;

    fn pair() -> (MultiplayerSystem, MultiplayerSystem, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let alice = MultiplayerSystem::new("alice", "Alice", store.clone());
        let bob = MultiplayerSystem::new("bob", "Bob", store.clone());
        (alice, bob, store)
    }

    fn wheat(price: u64) -> NewTrade {
        NewTrade {
            item_type: TradeItemType::Crops,
            item_id: "wheat".into(),
            quantity: 10,
            price_per_unit: price,
            description: String::new(),
        }
    }

    #[test]
    fn test_trade_listing_and_purchase() {
        let (mut alice, mut bob, _) = pair();
        let cheap = alice.create_trade_offer(wheat(10)).unwrap();
        alice.create_trade_offer(wheat(50)).unwrap();

        assert!(alice.trade_offers(None, None).unwrap().is_empty());
        let offers = bob.trade_offers(Some(TradeItemType::Crops), Some(20)).unwrap();
        assert_eq!(offers.len(), 1);
        assert_eq!(offers[0].0, cheap);
        assert_eq!(offers[0].1.total_price, 100);
        assert!(bob.trade_offers(Some(TradeItemType::Equipment), None).unwrap().is_empty());

        let sold = bob.purchase_trade_offer(&cheap).unwrap();
        assert_eq!(sold.status, TradeStatus::Sold);
        assert_eq!(sold.buyer_id.as_deref(), Some("bob"));
        assert_eq!(bob.reputation(), 2);
        assert_eq!(bob.stats().trades_completed, 1);
        assert_eq!(alice.stats().trades_sold, 2);

        assert!(matches!(
            bob.purchase_trade_offer(&cheap),
            Err(MultiplayerError::TradeUnavailable(_))
        ));
        assert_eq!(bob.trade_offers(None, None).unwrap().len(), 1);
    }

    #[test]
    fn test_oversized_or_empty_offers_are_rejected() {
        let (mut alice, bob, _) = pair();
        let mut huge = wheat(u64::MAX / 2);
        huge.quantity = 3;
        assert!(matches!(
            alice.create_trade_offer(huge),
            Err(MultiplayerError::InvalidOffer(_))
        ));

        let mut empty = wheat(10);
        empty.quantity = 0;
        assert!(matches!(
            alice.create_trade_offer(empty),
            Err(MultiplayerError::InvalidOffer(_))
        ));
        assert!(alice.trade_history().is_empty());
        assert!(bob.trade_offers(None, None).unwrap().is_empty());
    }

    #[test]
    fn test_cannot_buy_own_offer() {
        let (mut alice, _, _) = pair();
        let id = alice.create_trade_offer(wheat(10)).unwrap();
        assert!(matches!(alice.purchase_trade_offer(&id), Err(MultiplayerError::OwnTrade)));
        assert!(matches!(
            alice.purchase_trade_offer("nope"),
            Err(MultiplayerError::TradeNotFound(_))
        ));
    }

    #[test]
    fn test_contract_join_progress_and_chat() {
        let (mut alice, mut bob, store) = pair();
        let id = alice.create_contract(ContractKind::BulkOrder, json!({})).unwrap();

        let joined = bob.join_contract(&id).unwrap();
        assert_eq!(joined.participants, vec!["alice", "bob"]);
        assert_eq!(joined.status, ContractStatus::Active);
        assert!(matches!(bob.join_contract(&id), Err(MultiplayerError::AlreadyJoined(_))));
        assert!(matches!(
            bob.join_contract("missing"),
            Err(MultiplayerError::ContractNotFound(_))
        ));

        bob.update_contract_progress(&id, 3.0, Value::Null).unwrap();
        let total = bob.update_contract_progress(&id, 4.5, json!({ "crop": "corn" })).unwrap();
        assert_eq!(total, 7.5);

        alice.send_message(&id, "thanks!", MessageKind::Text).unwrap();
        let doc = store.get(CONTRACTS, &id).unwrap().unwrap();
        let contract: Contract = serde_json::from_value(doc).unwrap();
        assert_eq!(contract.total_contribution(), 7.5);
        assert_eq!(contract.chat_messages.len(), 1);
        assert_eq!(contract.chat_messages[0].sender_name, "Alice");
    }

    #[test]
    fn test_full_contract_rejects_joins() {
        let store = Arc::new(MemoryStore::new());
        let mut creator = MultiplayerSystem::new("p0", "P0", store.clone());
        let id = creator.create_contract(ContractKind::BulkOrder, Value::Null).unwrap();
        for i in 1..5 {
            let mut p = MultiplayerSystem::new(&format!("p{}", i), "P", store.clone());
            p.join_contract(&id).unwrap();
        }
        let mut late = MultiplayerSystem::new("late", "Late", store);
        assert!(matches!(
            late.join_contract(&id),
            Err(MultiplayerError::ContractFull { max: 5, .. })
        ));
    }

    #[test]
    fn test_friends_and_gifts() {
        let (mut alice, mut bob, _) = pair();
        alice.send_friend_request("bob").unwrap();
        let requests = bob.friend_requests().unwrap();
        assert_eq!(requests.len(), 1);

        let friend = bob.accept_friend_request(&requests[0].0).unwrap();
        assert_eq!(friend, "alice");
        assert_eq!(bob.friends().collect::<Vec<_>>(), vec!["alice"]);
        assert_eq!(bob.reputation(), 1);
        assert!(bob.friend_requests().unwrap().is_empty());

        let gift = alice
            .send_gift("bob", TradeItemType::Resources, "seeds", 3, "enjoy")
            .unwrap();
        assert_eq!(alice.reputation(), 3);
        assert!(alice.pending_gifts().unwrap().is_empty());
        assert_eq!(bob.pending_gifts().unwrap().len(), 1);

        assert!(matches!(alice.accept_gift(&gift), Err(MultiplayerError::GiftNotFound(_))));
        let accepted = bob.accept_gift(&gift).unwrap();
        assert_eq!(accepted.quantity, 3);
        assert!(bob.pending_gifts().unwrap().is_empty());
    }

    #[test]
    fn test_leaderboard_ranks_by_category() {
        let (alice, bob, _) = pair();
        let mut rich = GameWorld::new(&GameConfig::default());
        rich.player.money = 9_000;
        let poor = GameWorld::new(&GameConfig::default());

        alice.update_leaderboard(&rich).unwrap();
        bob.update_leaderboard(&poor).unwrap();

        let board = bob.leaderboard(LeaderboardCategory::TotalMoney, 10).unwrap();
        assert_eq!(board.len(), 2);
        assert_eq!(board[0].rank, 1);
        assert_eq!(board[0].entry.player_id, "alice");
        assert_eq!(board[1].entry.total_money, 500);
        assert_eq!(bob.leaderboard(LeaderboardCategory::Level, 1).unwrap().len(), 1);
    }

    #[test]
    fn test_reputation_levels() {
        assert_eq!(ReputationLevel::from_reputation(0), ReputationLevel::Novice);
        assert_eq!(ReputationLevel::from_reputation(20), ReputationLevel::Apprentice);
        assert_eq!(ReputationLevel::from_reputation(99), ReputationLevel::Experienced);
        assert_eq!(ReputationLevel::from_reputation(500), ReputationLevel::Master);
        assert_eq!(ReputationLevel::from_reputation(5_000), ReputationLevel::Legendary);
    }

    #[test]
    fn test_cleanup_expires_contracts_and_trims_history() {
        let (mut alice, _, _) = pair();
        alice.create_contract(ContractKind::WeatherResponse, Value::Null).unwrap();
        alice.create_contract(ContractKind::ResearchProject, Value::Null).unwrap();
        for _ in 0..105 {
            alice.record_trade(TradeSide::Sale, "t");
        }

        alice.cleanup(Utc::now() + Duration::days(2));
        assert_eq!(alice.active_contracts().len(), 1);
        assert_eq!(alice.trade_history().len(), TRADE_HISTORY_LEN);
    }

    #[test]
    fn test_presence_and_farm_sync() {
        let (mut alice, _, store) = pair();
        alice.update_online_status(OnlineStatus::Away);
        assert_eq!(alice.stats().online_status, OnlineStatus::Away);
        let player = store.get(PLAYERS, "alice").unwrap().unwrap();
        assert_eq!(player["onlineStatus"], json!("away"));

        let game = GameWorld::new(&GameConfig::default());
        alice.sync_farm(&game).unwrap();
        let farm = store.get(FARMS, "alice").unwrap().unwrap();
        assert_eq!(farm["fields"].as_array().map(Vec::len), Some(3));
        assert!(farm.get("lastSaved").is_some());
    }

    #[test]
    fn test_suggested_trade_prices() {
        assert_eq!(TradeItemType::Crops.suggested_price(100), 90);
        assert_eq!(TradeItemType::Resources.suggested_price(100), 80);
    }
}
