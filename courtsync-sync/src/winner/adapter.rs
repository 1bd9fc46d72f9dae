//! The league adapter for the Israeli league: composes the JSON client, the
//! HTML scraper and the mapper behind the uniform contracts. The `games_all`
//! response serves seasons, teams and the schedule from one round-trip, so
//! it is memoized for the adapter's lifetime.

use async_trait::async_trait;
use diesel::PgConnection;
use log::{debug, warn};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::adapters::{LeagueAdapter, PbpResult, PlayerInfoAdapter, RosterEntry};
use crate::error::SourceError;
use crate::types::{RawBoxScore, RawGame, RawPlayerInfo, RawSeason, RawTeam};
use crate::winner::client::{SOURCE, WinnerClient};
use crate::winner::config::WinnerConfig;
use crate::winner::mapper;
use crate::winner::scraper::WinnerScraper;

pub struct WinnerAdapter {
    client: WinnerClient,
    scraper: WinnerScraper,
    games_cache: Mutex<Option<Value>>,
}

impl WinnerAdapter {
    pub fn new(config: WinnerConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: WinnerClient::new(config.clone())?,
            scraper: WinnerScraper::new(config)?,
            games_cache: Mutex::new(None),
        })
    }

    async fn games_payload(
        &self,
        conn: &mut PgConnection,
        force: bool,
    ) -> Result<mapper::GamesAllPayload, SourceError> {
        let mut cache = self.games_cache.lock().await;
        if force || cache.is_none() {
            let result = self.client.fetch_games_all(conn, force).await?;
            *cache = Some(result.data);
        }
        let data = cache.as_ref().expect("games cache was just populated");
        mapper::parse_games_all(data)
    }

    async fn game_zone_fallback(
        &self,
        conn: &mut PgConnection,
        game_id: &str,
    ) -> Option<RawBoxScore> {
        let payload = match self.games_payload(conn, false).await {
            Ok(payload) => payload,
            Err(e) => {
                debug!("No schedule for game-zone fallback of game {game_id}: {e}");
                return None;
            }
        };
        let schedule_game = mapper::map_schedule(&payload)
            .into_iter()
            .find(|g| g.external_id == game_id)?;

        match self.scraper.fetch_game_zone_boxscore(conn, game_id, false).await {
            Ok(zone) => {
                warn!("Serving game {game_id} box score from the game-zone page");
                Some(mapper::map_game_zone_boxscore(&zone, &schedule_game))
            }
            Err(e) => {
                debug!("Game-zone fallback failed for game {game_id}: {e}");
                None
            }
        }
    }
}

#[async_trait]
impl LeagueAdapter for WinnerAdapter {
    fn source_name(&self) -> &'static str {
        SOURCE
    }

    async fn get_seasons(&self, conn: &mut PgConnection) -> Result<Vec<RawSeason>, SourceError> {
        let payload = self.games_payload(conn, false).await?;
        Ok(vec![mapper::map_season(&payload)])
    }

    async fn get_teams(
        &self,
        conn: &mut PgConnection,
        _season_id: &str,
    ) -> Result<Vec<RawTeam>, SourceError> {
        // The API exposes the current season only; the season id is implied.
        let payload = self.games_payload(conn, false).await?;
        Ok(mapper::extract_teams_from_games(&payload))
    }

    async fn get_schedule(
        &self,
        conn: &mut PgConnection,
        _season_id: &str,
    ) -> Result<Vec<RawGame>, SourceError> {
        let payload = self.games_payload(conn, false).await?;
        Ok(mapper::map_schedule(&payload))
    }

    async fn get_game_boxscore(
        &self,
        conn: &mut PgConnection,
        game_id: &str,
    ) -> Result<RawBoxScore, SourceError> {
        let primary = match self.client.fetch_boxscore(conn, game_id, false).await {
            Ok(result) => mapper::map_boxscore(&result.data, game_id),
            Err(e) => Err(e),
        };

        match &primary {
            Ok(boxscore)
                if !boxscore.home_players.is_empty() || !boxscore.away_players.is_empty() =>
            {
                primary
            }
            // The realtime backend only covers recent seasons; older games
            // still have a box score on the game-zone page.
            _ => match self.game_zone_fallback(conn, game_id).await {
                Some(boxscore) => Ok(boxscore),
                None => primary,
            },
        }
    }

    async fn get_game_pbp(
        &self,
        conn: &mut PgConnection,
        game_id: &str,
    ) -> Result<PbpResult, SourceError> {
        let result = self.client.fetch_pbp(conn, game_id, false).await?;
        mapper::map_pbp(&result.data, game_id)
    }
}

#[async_trait]
impl PlayerInfoAdapter for WinnerAdapter {
    fn source_name(&self) -> &'static str {
        SOURCE
    }

    async fn get_player_info(
        &self,
        conn: &mut PgConnection,
        external_id: &str,
    ) -> Result<RawPlayerInfo, SourceError> {
        let profile = self.scraper.fetch_player(conn, external_id, false).await?;
        Ok(mapper::map_player_info(&profile))
    }

    /// Walks team rosters looking for a case-insensitive name match and
    /// fetches the full profile for each hit. Teams whose roster page fails
    /// are skipped rather than failing the search.
    async fn search_player(
        &self,
        conn: &mut PgConnection,
        name: &str,
        team: Option<&str>,
    ) -> Result<Vec<RawPlayerInfo>, SourceError> {
        let payload = self.games_payload(conn, false).await?;
        let mut teams = mapper::extract_teams_from_games(&payload);
        if let Some(team) = team {
            teams.retain(|t| t.external_id == team);
        }

        let needle = name.to_lowercase();
        let mut results = Vec::new();

        for raw_team in teams {
            let roster = match self
                .scraper
                .fetch_team_roster(conn, &raw_team.external_id, false)
                .await
            {
                Ok(roster) => roster,
                Err(e) => {
                    debug!("Skipping roster for team {}: {e}", raw_team.external_id);
                    continue;
                }
            };

            for player in roster.players {
                if !player.name.to_lowercase().contains(&needle) {
                    continue;
                }
                match self.scraper.fetch_player(conn, &player.player_id, false).await {
                    Ok(profile) => results.push(mapper::map_player_info(&profile)),
                    Err(e) => {
                        warn!("Profile fetch failed for player {}: {e}", player.player_id);
                    }
                }
            }
        }

        Ok(results)
    }

    async fn get_team_roster(
        &self,
        conn: &mut PgConnection,
        team_external_id: &str,
        fetch_profiles: bool,
    ) -> Result<Vec<RosterEntry>, SourceError> {
        let roster = self
            .scraper
            .fetch_team_roster(conn, team_external_id, false)
            .await?;

        let mut entries = Vec::with_capacity(roster.players.len());
        for player in roster.players {
            let info = if fetch_profiles {
                match self.scraper.fetch_player(conn, &player.player_id, false).await {
                    Ok(profile) => Some(mapper::map_player_info(&profile)),
                    Err(e) => {
                        warn!("Profile fetch failed for player {}: {e}", player.player_id);
                        Some(mapper::map_roster_player_info(&player))
                    }
                }
            } else {
                Some(mapper::map_roster_player_info(&player))
            };
            entries.push((player.player_id, player.name, info));
        }

        Ok(entries)
    }
}
