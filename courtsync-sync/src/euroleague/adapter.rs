//! League and player-info adapter for the European competition. Seasons come
//! from configuration (the feeds have no season-list endpoint); per-game data
//! is served by the live JSON API, with the `Header` endpoint supplying the
//! tip-off date the box score lacks.

use async_trait::async_trait;
use diesel::PgConnection;
use log::{debug, warn};

use crate::adapters::{LeagueAdapter, PbpResult, PlayerInfoAdapter, RosterEntry};
use crate::error::SourceError;
use crate::euroleague::client::{EuroleagueClient, SOURCE, xml_of};
use crate::euroleague::config::EuroleagueConfig;
use crate::euroleague::mapper;
use crate::types::{RawBoxScore, RawGame, RawPlayerInfo, RawSeason, RawTeam};

pub struct EuroleagueAdapter {
    client: EuroleagueClient,
}

impl EuroleagueAdapter {
    pub fn new(config: EuroleagueConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: EuroleagueClient::new(config)?,
        })
    }

    fn config(&self) -> &EuroleagueConfig {
        self.client.config()
    }

    /// Season start year for a normalized season name, falling back to the
    /// newest configured season.
    fn season_year(&self, season_id: &str) -> Result<i32, SourceError> {
        if let Some((start, _)) = crate::parse::season_years_from_name(season_id) {
            return Ok(start);
        }
        mapper::current_season(&self.config().seasons).ok_or_else(|| {
            SourceError::parse(
                SOURCE,
                "season",
                season_id,
                "no seasons configured for this source",
                None,
            )
        })
    }

    fn split_game_id(&self, game_id: &str) -> Result<(i32, i32), SourceError> {
        mapper::parse_game_id(game_id)
            .map(|(_, season, gamecode)| (season, gamecode))
            .ok_or_else(|| {
                SourceError::parse(
                    SOURCE,
                    "game",
                    game_id,
                    "expected a <competition><year>_<gamecode> id",
                    None,
                )
            })
    }
}

#[async_trait]
impl LeagueAdapter for EuroleagueAdapter {
    fn source_name(&self) -> &'static str {
        SOURCE
    }

    async fn get_seasons(&self, _conn: &mut PgConnection) -> Result<Vec<RawSeason>, SourceError> {
        let config = self.config();
        let mut seasons: Vec<i32> = config.seasons.clone();
        seasons.sort_unstable_by(|a, b| b.cmp(a));
        Ok(seasons
            .into_iter()
            .map(|year| {
                mapper::map_season(year, &config.competition, mapper::season_is_current(year))
            })
            .collect())
    }

    async fn get_teams(
        &self,
        conn: &mut PgConnection,
        season_id: &str,
    ) -> Result<Vec<RawTeam>, SourceError> {
        let season = self.season_year(season_id)?;
        let result = self.client.fetch_teams(conn, season, false).await?;
        mapper::teams_from_xml(&xml_of(&result), &self.config().season_code(season))
    }

    async fn get_schedule(
        &self,
        conn: &mut PgConnection,
        season_id: &str,
    ) -> Result<Vec<RawGame>, SourceError> {
        let season = self.season_year(season_id)?;
        let result = self.client.fetch_schedule(conn, season, false).await?;
        mapper::schedule_from_xml(&xml_of(&result), season, &self.config().competition)
    }

    async fn get_game_boxscore(
        &self,
        conn: &mut PgConnection,
        game_id: &str,
    ) -> Result<RawBoxScore, SourceError> {
        let (season, gamecode) = self.split_game_id(game_id)?;
        let result = self
            .client
            .fetch_live_boxscore(conn, season, gamecode, false)
            .await?;
        let mut boxscore = mapper::map_boxscore_from_live(
            &result.data,
            season,
            gamecode,
            &self.config().competition,
        )?;

        // The box score has no date; patch it from the header when we can.
        match self.client.fetch_live_header(conn, season, gamecode, false).await {
            Ok(header) => {
                if let Some(date) = mapper::game_date_from_header(&header.data) {
                    boxscore.game.game_date = date;
                }
            }
            Err(e) => debug!("No header for game {game_id}: {e}"),
        }

        Ok(boxscore)
    }

    async fn get_game_pbp(
        &self,
        conn: &mut PgConnection,
        game_id: &str,
    ) -> Result<PbpResult, SourceError> {
        let (season, gamecode) = self.split_game_id(game_id)?;
        let result = self
            .client
            .fetch_live_pbp(conn, season, gamecode, false)
            .await?;
        let events = mapper::map_pbp_from_live(&result.data);

        // PBP player ids match the box-score identity space here, but the
        // jersey map still backstops players missing from the store.
        let jerseys = match self
            .client
            .fetch_live_boxscore(conn, season, gamecode, false)
            .await
        {
            Ok(boxscore) => mapper::jerseys_from_live_boxscore(&boxscore.data),
            Err(e) => {
                debug!("No boxscore lineups for game {game_id}: {e}");
                Default::default()
            }
        };

        Ok((events, jerseys))
    }
}

#[async_trait]
impl PlayerInfoAdapter for EuroleagueAdapter {
    fn source_name(&self) -> &'static str {
        SOURCE
    }

    async fn get_player_info(
        &self,
        conn: &mut PgConnection,
        external_id: &str,
    ) -> Result<RawPlayerInfo, SourceError> {
        let season = mapper::current_season(&self.config().seasons).ok_or_else(|| {
            SourceError::parse(SOURCE, "player", external_id, "no seasons configured", None)
        })?;
        let result = self.client.fetch_player(conn, external_id, season, false).await?;
        mapper::player_from_xml(&xml_of(&result), external_id)
    }

    /// Searches the rosters embedded in the teams feed, fetching the full
    /// biography for each match.
    async fn search_player(
        &self,
        conn: &mut PgConnection,
        name: &str,
        team: Option<&str>,
    ) -> Result<Vec<RawPlayerInfo>, SourceError> {
        let Some(season) = mapper::current_season(&self.config().seasons) else {
            return Ok(Vec::new());
        };
        let result = self.client.fetch_teams(conn, season, false).await?;
        let rosters =
            mapper::rosters_from_xml(&xml_of(&result), &self.config().season_code(season))?;

        let needle = name.to_lowercase();
        let mut players = Vec::new();
        for (team_code, player_code, player_name) in rosters {
            if let Some(team) = team
                && team_code != team
            {
                continue;
            }
            if !player_name.to_lowercase().contains(&needle) {
                continue;
            }
            match self.get_player_info(conn, &player_code).await {
                Ok(info) => players.push(info),
                Err(e) => warn!("Biography fetch failed for {player_code}: {e}"),
            }
        }
        Ok(players)
    }

    async fn get_team_roster(
        &self,
        conn: &mut PgConnection,
        team_external_id: &str,
        fetch_profiles: bool,
    ) -> Result<Vec<RosterEntry>, SourceError> {
        let Some(season) = mapper::current_season(&self.config().seasons) else {
            return Ok(Vec::new());
        };
        let result = self.client.fetch_teams(conn, season, false).await?;
        let rosters =
            mapper::rosters_from_xml(&xml_of(&result), &self.config().season_code(season))?;

        let mut entries = Vec::new();
        for (team_code, player_code, player_name) in rosters {
            if team_code != team_external_id {
                continue;
            }
            let info = if fetch_profiles {
                match self.get_player_info(conn, &player_code).await {
                    Ok(info) => Some(info),
                    Err(e) => {
                        warn!("Biography fetch failed for {player_code}: {e}");
                        None
                    }
                }
            } else {
                let (first_name, last_name) = mapper::split_comma_name(&player_name);
                Some(RawPlayerInfo {
                    external_id: player_code.clone(),
                    first_name,
                    last_name,
                    ..RawPlayerInfo::default()
                })
            };
            entries.push((player_code, player_name, info));
        }
        Ok(entries)
    }
}
