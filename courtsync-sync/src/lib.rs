//! Multi-source basketball data ingestion: source clients with a raw fetch
//! cache, pure mappers, cross-source entity reconciliation, and the sync
//! orchestrator.

pub mod adapters;
pub mod de;
pub mod dedup;
pub mod entities;
pub mod error;
pub mod euroleague;
pub mod fetch;
pub mod manager;
pub mod parse;
pub mod pbp;
pub mod player_info;
pub mod ratelimit;
pub mod types;
pub mod winner;

pub use adapters::{LeagueAdapter, PlayerInfoAdapter};
pub use error::SourceError;
pub use manager::{SourceSettings, SyncConfig, SyncError, SyncEvent, SyncManager};
