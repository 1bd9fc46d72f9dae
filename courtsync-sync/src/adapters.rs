//! The uniform per-source contracts. A league adapter composes a client (and
//! possibly a scraper) with its mapper behind one surface; the manager never
//! sees a provider dialect.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::PgConnection;
use std::collections::HashMap;

use crate::error::SourceError;
use crate::types::{
    GameStatus, RawBoxScore, RawGame, RawPBPEvent, RawPlayerInfo, RawSeason, RawTeam,
};

/// Play-by-play payloads carry their own player identity space; the adapter
/// also surfaces the lineup's id -> jersey map so the syncer can fall back
/// to jersey matching when the PBP ids don't line up with box-score ids.
pub type PbpResult = (Vec<RawPBPEvent>, HashMap<String, String>);

#[async_trait]
pub trait LeagueAdapter: Send + Sync {
    fn source_name(&self) -> &'static str;

    async fn get_seasons(&self, conn: &mut PgConnection) -> Result<Vec<RawSeason>, SourceError>;

    async fn get_teams(
        &self,
        conn: &mut PgConnection,
        season_id: &str,
    ) -> Result<Vec<RawTeam>, SourceError>;

    async fn get_schedule(
        &self,
        conn: &mut PgConnection,
        season_id: &str,
    ) -> Result<Vec<RawGame>, SourceError>;

    async fn get_game_boxscore(
        &self,
        conn: &mut PgConnection,
        game_id: &str,
    ) -> Result<RawBoxScore, SourceError>;

    async fn get_game_pbp(
        &self,
        conn: &mut PgConnection,
        game_id: &str,
    ) -> Result<PbpResult, SourceError>;

    /// Final means final *and* scored; a 0-0 "final" is a scheduling artifact.
    fn is_game_final(&self, game: &RawGame) -> bool {
        game.status == GameStatus::Final
            && game.home_score.is_some()
            && game.away_score.is_some()
    }

    /// Finished games since `since`. The default walks the schedule;
    /// adapters with a cheaper incremental endpoint override it.
    async fn get_games_since(
        &self,
        conn: &mut PgConnection,
        since: DateTime<Utc>,
        season_id: Option<&str>,
    ) -> Result<Vec<RawGame>, SourceError> {
        let season_id = match season_id {
            Some(id) => id.to_string(),
            None => {
                let seasons = self.get_seasons(conn).await?;
                match seasons.first() {
                    Some(season) => season.external_id.clone(),
                    None => return Ok(Vec::new()),
                }
            }
        };
        let games = self.get_schedule(conn, &season_id).await?;
        Ok(games
            .into_iter()
            .filter(|g| g.game_date >= since && self.is_game_final(g))
            .collect())
    }

    async fn get_available_seasons(
        &self,
        conn: &mut PgConnection,
    ) -> Result<Vec<String>, SourceError> {
        let seasons = self.get_seasons(conn).await?;
        Ok(seasons.into_iter().map(|s| s.name).collect())
    }
}

/// A roster row: (player external id, display name, profile when fetched).
pub type RosterEntry = (String, String, Option<RawPlayerInfo>);

#[async_trait]
pub trait PlayerInfoAdapter: Send + Sync {
    fn source_name(&self) -> &'static str;

    async fn get_player_info(
        &self,
        conn: &mut PgConnection,
        external_id: &str,
    ) -> Result<RawPlayerInfo, SourceError>;

    async fn search_player(
        &self,
        conn: &mut PgConnection,
        name: &str,
        team: Option<&str>,
    ) -> Result<Vec<RawPlayerInfo>, SourceError>;

    async fn get_team_roster(
        &self,
        _conn: &mut PgConnection,
        _team_external_id: &str,
        _fetch_profiles: bool,
    ) -> Result<Vec<RosterEntry>, SourceError> {
        Ok(Vec::new())
    }
}
