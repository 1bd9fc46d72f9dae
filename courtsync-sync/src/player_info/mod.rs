//! Multi-source player biography aggregation with provenance.

mod merger;
mod service;

pub use merger::{EmptySourcesError, MergedPlayerInfo, merge_player_info};
pub use service::{PlayerFieldDelta, PlayerInfoService};
