//! Aggregates player biographies across the configured sources and turns
//! the merge into a field delta for the canonical player row.

use diesel::PgConnection;
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;

use courtsync_db::models::{DbPlayer, PlayerInfoDelta};

use crate::adapters::PlayerInfoAdapter;
use crate::player_info::merger::{MergedPlayerInfo, merge_player_info};
use crate::types::RawPlayerInfo;

/// Owned version of the update applied to a player row; `as_changeset`
/// produces the diesel changeset view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerFieldDelta {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub birth_date: Option<chrono::NaiveDate>,
    pub height_cm: Option<i32>,
    pub position: Option<String>,
}

impl PlayerFieldDelta {
    pub fn is_empty(&self) -> bool {
        *self == PlayerFieldDelta::default()
    }

    pub fn as_changeset(&self) -> PlayerInfoDelta<'_> {
        PlayerInfoDelta {
            first_name: self.first_name.as_deref(),
            last_name: self.last_name.as_deref(),
            birth_date: self.birth_date,
            height_cm: self.height_cm,
            position: self.position.as_deref(),
        }
    }
}

pub struct PlayerInfoService {
    /// Priority order: earlier adapters win conflicting fields.
    adapters: Vec<Arc<dyn PlayerInfoAdapter>>,
}

impl PlayerInfoService {
    pub fn new(adapters: Vec<Arc<dyn PlayerInfoAdapter>>) -> Self {
        Self { adapters }
    }

    pub fn source_names(&self) -> Vec<&'static str> {
        self.adapters.iter().map(|a| a.source_name()).collect()
    }

    /// Fetches from every adapter whose source appears in `external_ids`,
    /// skipping per-adapter failures. `None` only when every adapter
    /// produced nothing.
    pub async fn get_player_info(
        &self,
        conn: &mut PgConnection,
        external_ids: &HashMap<String, String>,
    ) -> Option<MergedPlayerInfo> {
        let mut sources: Vec<(String, RawPlayerInfo)> = Vec::new();

        for adapter in &self.adapters {
            let source = adapter.source_name();
            let Some(external_id) = external_ids.get(source) else {
                continue;
            };
            match adapter.get_player_info(conn, external_id).await {
                Ok(info) => sources.push((source.to_string(), info)),
                Err(e) => {
                    debug!("Skipping {source} for player {external_id}: {e}");
                }
            }
        }

        if sources.is_empty() {
            return None;
        }
        merge_player_info(&sources).ok()
    }

    /// Union of search results across all adapters; failing adapters are
    /// skipped.
    pub async fn search_player(
        &self,
        conn: &mut PgConnection,
        name: &str,
        team: Option<&str>,
    ) -> Vec<RawPlayerInfo> {
        let mut results = Vec::new();
        for adapter in &self.adapters {
            match adapter.search_player(conn, name, team).await {
                Ok(mut found) => results.append(&mut found),
                Err(e) => debug!("Search failed on {}: {e}", adapter.source_name()),
            }
        }
        results
    }

    /// The field delta to apply to `player` from the merged view. Fields
    /// whose merged value is null are excluded; the delta never blanks a
    /// column.
    pub async fn update_player_from_sources(
        &self,
        conn: &mut PgConnection,
        player: &DbPlayer,
    ) -> PlayerFieldDelta {
        let external_ids: HashMap<String, String> = player
            .external_ids
            .as_object()
            .map(|map| {
                map.iter()
                    .filter_map(|(k, v)| Some((k.clone(), v.as_str()?.to_string())))
                    .collect()
            })
            .unwrap_or_default();

        if external_ids.is_empty() {
            return PlayerFieldDelta::default();
        }

        let Some(merged) = self.get_player_info(conn, &external_ids).await else {
            return PlayerFieldDelta::default();
        };

        PlayerFieldDelta {
            first_name: (!merged.first_name.is_empty()).then_some(merged.first_name),
            last_name: (!merged.last_name.is_empty()).then_some(merged.last_name),
            birth_date: merged.birth_date,
            height_cm: merged.height_cm,
            position: merged.position,
        }
    }
}
