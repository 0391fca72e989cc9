use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Item-type identifier from the log stream. One TypeId is designated Base
/// Currency elsewhere in config/constants and is never priced or taxed.
pub type TypeId = i64;

/// (PageId, SlotId) pair uniquely identifying an inventory cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotKey {
    pub page_id: i64,
    pub slot_id: i64,
}

/// A tag classifying the enclosing context a delta was observed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContextTag {
    PickItems,
    MapOpen,
    Recycle,
    ExchangeBuy,
    ExchangeSell,
    Other,
}

impl ContextTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextTag::PickItems => "PickItems",
            ContextTag::MapOpen => "MapOpen",
            ContextTag::Recycle => "Recycle",
            ContextTag::ExchangeBuy => "ExchangeBuy",
            ContextTag::ExchangeSell => "ExchangeSell",
            ContextTag::Other => "Other",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "PickItems" => ContextTag::PickItems,
            "MapOpen" => ContextTag::MapOpen,
            "Recycle" => ContextTag::Recycle,
            "ExchangeBuy" => ContextTag::ExchangeBuy,
            "ExchangeSell" => ContextTag::ExchangeSell,
            _ => ContextTag::Other,
        }
    }
}

/// Current occupant of a Slot Key: empty, or (TypeId, absolute quantity).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotOccupant {
    pub type_id: TypeId,
    pub quantity: i64,
}

/// Row of recorded slot state for a given PlayerScope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotStateRow {
    pub scope: String,
    pub page_id: i64,
    pub slot_id: i64,
    pub type_id: TypeId,
    pub quantity: i64,
}

/// Run lifecycle record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: String,
    pub scope: String,
    pub start_ts: DateTime<Utc>,
    pub end_ts: Option<DateTime<Utc>>,
    pub zone_signature: String,
    pub level_id: i64,
    pub level_type: String,
    pub level_uid: String,
    pub is_hub_zone: bool,
    pub is_sub_zone: bool,
    pub parent_run_id: Option<String>,
    pub consolidated_children: Vec<String>,
}

/// Immutable, append-only delta record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delta {
    pub id: i64,
    pub scope: String,
    pub run_id: Option<String>,
    pub page_id: i64,
    pub slot_id: i64,
    pub type_id: TypeId,
    pub signed_quantity: i64,
    pub context_tag: ContextTag,
    pub ts: DateTime<Utc>,
}

/// Item metadata row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub type_id: TypeId,
    pub name: String,
    pub icon_ref: Option<String>,
    pub is_base_currency: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceSource {
    Manual,
    ExchangeLearned,
}

impl PriceSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceSource::Manual => "Manual",
            PriceSource::ExchangeLearned => "ExchangeLearned",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "ExchangeLearned" => PriceSource::ExchangeLearned,
            _ => PriceSource::Manual,
        }
    }
}

/// Locally known price for a TypeId within a scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Price {
    pub scope: String,
    pub type_id: TypeId,
    pub value: f64,
    pub source: PriceSource,
    pub updated_ts: DateTime<Utc>,
}

/// Cloud-aggregated price for a TypeId.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudPrice {
    pub type_id: TypeId,
    pub median: f64,
    pub p10: f64,
    pub p90: f64,
    pub contributor_count: u32,
    pub cloud_updated_ts: DateTime<Utc>,
}

/// Hourly-bucketed price history row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceHistoryRow {
    pub type_id: TypeId,
    pub hour_bucket: i64,
    pub median: f64,
    pub p10: f64,
    pub p90: f64,
    pub submission_count: u32,
    pub unique_device_count: u32,
}

/// Pending cloud upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxEntry {
    pub id: i64,
    pub type_id: TypeId,
    pub value: f64,
    pub captured_ts: DateTime<Utc>,
    pub attempts: u32,
    pub last_attempt_ts: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

pub type DatabaseResult<T> = crate::errors::EngineResult<T>;
