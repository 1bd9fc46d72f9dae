//! Entity syncers: upsert teams, games, box scores and play-by-play through
//! the matchers. Every mutation here runs inside a transaction; on error the
//! transaction aborts and the manager decides what to do with the game.

use diesel::{Connection, PgConnection, QueryResult};
use log::warn;
use serde_json::json;
use std::collections::HashMap;
use uuid::Uuid;

use courtsync_db::db;
use courtsync_db::models::{
    DbGame, DbTeam, NewGame, NewPlayByPlayEvent, NewPlayerGameStats, NewPlayerTeamHistory,
};

use crate::dedup::{PlayerContext, PlayerDeduplicator, TeamMatcher, TeamResolution};
use crate::types::{RawBoxScore, RawGame, RawPBPEvent, RawPlayerStats, RawTeam};

/// Box-score totals are a data-quality observation, not a hard gate.
const SCORE_SUM_TOLERANCE: i32 = 5;

#[derive(Debug, Default)]
pub struct TeamSyncer {
    matcher: TeamMatcher,
}

impl TeamSyncer {
    pub fn sync_team_season(
        &self,
        conn: &mut PgConnection,
        raw: &RawTeam,
        season_id: Uuid,
        source: &str,
    ) -> QueryResult<TeamResolution> {
        conn.transaction(|conn| {
            let resolution = self.matcher.resolve(conn, raw, season_id, source)?;
            db::ensure_team_season(conn, resolution.team.id, season_id)?;
            Ok(resolution)
        })
    }
}

#[derive(Debug, Default)]
pub struct GameSyncer {
    matcher: TeamMatcher,
    deduplicator: PlayerDeduplicator,
}

#[derive(Debug)]
pub struct GameUpsert {
    pub game: DbGame,
    pub created: bool,
}

impl GameSyncer {
    /// Upserts the game row by external id. Teams missing a canonical row
    /// are created eagerly (with their TeamSeason rows) so a standalone
    /// game sync never dangles.
    pub fn sync_game(
        &self,
        conn: &mut PgConnection,
        raw: &RawGame,
        season_id: Uuid,
        source: &str,
    ) -> QueryResult<GameUpsert> {
        conn.transaction(|conn| {
            let home = self.resolve_game_team(conn, &raw.home_team_external_id, season_id, source)?;
            let away = self.resolve_game_team(conn, &raw.away_team_external_id, season_id, source)?;

            let status = raw.status.to_string();
            if let Some(existing) = db::get_game_by_external_id(conn, source, &raw.external_id)? {
                let game = db::update_game_result(
                    conn,
                    existing.id,
                    raw.game_date,
                    &status,
                    raw.home_score,
                    raw.away_score,
                )?;
                return Ok(GameUpsert {
                    game,
                    created: false,
                });
            }

            let game = db::insert_game(
                conn,
                &NewGame {
                    season_id,
                    home_team_id: home.id,
                    away_team_id: away.id,
                    game_date: raw.game_date,
                    status: &status,
                    home_score: raw.home_score,
                    away_score: raw.away_score,
                    external_ids: json!({ source: raw.external_id }),
                },
            )?;
            Ok(GameUpsert {
                game,
                created: true,
            })
        })
    }

    fn resolve_game_team(
        &self,
        conn: &mut PgConnection,
        team_external_id: &str,
        season_id: Uuid,
        source: &str,
    ) -> QueryResult<DbTeam> {
        // Teams normally exist by the time games sync; a placeholder name
        // covers the standalone-game path where no team list was fetched.
        let raw = RawTeam {
            external_id: team_external_id.to_string(),
            name: format!("Team {team_external_id}"),
            short_name: None,
        };
        let resolution = self.matcher.resolve(conn, &raw, season_id, source)?;
        db::ensure_team_season(conn, resolution.team.id, season_id)?;
        Ok(resolution.team)
    }

    /// Replaces the game's stat rows with the mapped box score. Prior rows
    /// are deleted in the same transaction, so upstream corrections can
    /// never leave stale or duplicate lines.
    pub fn sync_boxscore(
        &self,
        conn: &mut PgConnection,
        boxscore: &RawBoxScore,
        game: &DbGame,
        source: &str,
    ) -> QueryResult<usize> {
        conn.transaction(|conn| {
            let mut rows = Vec::new();
            for (players, team_id) in [
                (&boxscore.home_players, game.home_team_id),
                (&boxscore.away_players, game.away_team_id),
            ] {
                for stats in players {
                    rows.push(self.stats_row(conn, stats, game, team_id, source)?);
                }
            }

            let inserted = db::replace_player_game_stats(conn, game.id, &rows)?;
            self.check_score_totals(game, &rows);
            Ok(inserted)
        })
    }

    fn stats_row(
        &self,
        conn: &mut PgConnection,
        stats: &RawPlayerStats,
        game: &DbGame,
        team_id: Uuid,
        source: &str,
    ) -> QueryResult<NewPlayerGameStats> {
        let resolution = self.deduplicator.resolve(
            conn,
            source,
            &stats.player_external_id,
            &stats.player_name,
            None,
            PlayerContext {
                team_id: Some(team_id),
                season_id: Some(game.season_id),
            },
        )?;
        db::ensure_player_team_history(
            conn,
            &NewPlayerTeamHistory {
                player_id: resolution.player.id,
                team_id,
                season_id: game.season_id,
                jersey_number: None,
                position: None,
            },
        )?;

        Ok(NewPlayerGameStats {
            game_id: game.id,
            player_id: resolution.player.id,
            team_id,
            minutes_played: stats.minutes_played,
            is_starter: stats.is_starter,
            points: stats.points,
            two_pointers_made: stats.two_pointers_made,
            two_pointers_attempted: stats.two_pointers_attempted,
            three_pointers_made: stats.three_pointers_made,
            three_pointers_attempted: stats.three_pointers_attempted,
            free_throws_made: stats.free_throws_made,
            free_throws_attempted: stats.free_throws_attempted,
            offensive_rebounds: stats.offensive_rebounds,
            defensive_rebounds: stats.defensive_rebounds,
            total_rebounds: stats.total_rebounds,
            assists: stats.assists,
            steals: stats.steals,
            blocks: stats.blocks,
            turnovers: stats.turnovers,
            personal_fouls: stats.personal_fouls,
            plus_minus: stats.plus_minus,
            efficiency: stats.efficiency,
        })
    }

    fn check_score_totals(&self, game: &DbGame, rows: &[NewPlayerGameStats]) {
        for (team_id, reported) in [
            (game.home_team_id, game.home_score),
            (game.away_team_id, game.away_score),
        ] {
            let Some(reported) = reported else { continue };
            let summed: i32 = rows
                .iter()
                .filter(|r| r.team_id == team_id)
                .map(|r| r.points)
                .sum();
            if (summed - reported).abs() > SCORE_SUM_TOLERANCE {
                warn!(
                    "Box-score points for team {team_id} in game {} sum to {summed}, \
                    final score says {reported}",
                    game.id,
                );
            }
        }
    }

    /// Replaces the game's play-by-play atomically, in provider order.
    /// Events whose player or team cannot be resolved keep NULL references
    /// rather than being dropped; resolution never creates players.
    pub fn sync_pbp(
        &self,
        conn: &mut PgConnection,
        events: &[RawPBPEvent],
        jersey_map: &HashMap<String, String>,
        game: &DbGame,
        source: &str,
    ) -> QueryResult<usize> {
        conn.transaction(|conn| {
            let team_ids = self.pbp_team_ids(conn, game, source)?;
            let jersey_lookup = self.jersey_lookup(conn, game)?;

            let mut unresolved_players = 0usize;
            let rows = events
                .iter()
                .map(|event| {
                    let team_id = event
                        .team_external_id
                        .as_deref()
                        .and_then(|id| team_ids.get(id).copied());

                    let player_id = self.resolve_pbp_player(
                        conn,
                        event,
                        jersey_map,
                        &jersey_lookup,
                        source,
                    )?;
                    if player_id.is_none() && event.player_external_id.is_some() {
                        unresolved_players += 1;
                    }

                    Ok(NewPlayByPlayEvent {
                        game_id: game.id,
                        event_number: event.event_number,
                        period: event.period,
                        clock: event.clock.clone(),
                        event_type: event.event_type.to_string(),
                        event_subtype: event.event_subtype.clone(),
                        team_id,
                        player_id,
                        success: event.success,
                        coord_x: event.coord_x,
                        coord_y: event.coord_y,
                        related_event_numbers: event.related_event_numbers.clone(),
                    })
                })
                .collect::<QueryResult<Vec<_>>>()?;

            if unresolved_players > 0 {
                warn!(
                    "{unresolved_players} play-by-play events in game {} kept a NULL \
                    player reference",
                    game.id,
                );
            }

            db::replace_pbp_events(conn, game.id, &rows)
        })
    }

    /// PBP team references arrive as provider ids; map them through the two
    /// participating teams' external id sets.
    fn pbp_team_ids(
        &self,
        conn: &mut PgConnection,
        game: &DbGame,
        source: &str,
    ) -> QueryResult<HashMap<String, Uuid>> {
        let mut map = HashMap::new();
        for team in db::teams_in_season(conn, game.season_id)? {
            if team.id != game.home_team_id && team.id != game.away_team_id {
                continue;
            }
            if let Some(external_id) = team.external_id(source) {
                map.insert(external_id.to_string(), team.id);
            }
        }
        Ok(map)
    }

    /// Jersey -> player for the game's two rosters; jerseys worn by more
    /// than one player resolve to nothing (refusing the fallback beats
    /// guessing).
    fn jersey_lookup(
        &self,
        conn: &mut PgConnection,
        game: &DbGame,
    ) -> QueryResult<HashMap<String, Option<Uuid>>> {
        let mut lookup: HashMap<String, Option<Uuid>> = HashMap::new();
        for team_id in [game.home_team_id, game.away_team_id] {
            for entry in db::roster_entries(conn, team_id, game.season_id)? {
                let Some(jersey) = entry.jersey_number else {
                    continue;
                };
                lookup
                    .entry(jersey)
                    .and_modify(|existing| {
                        if *existing != Some(entry.player_id) {
                            *existing = None;
                        }
                    })
                    .or_insert(Some(entry.player_id));
            }
        }
        Ok(lookup)
    }

    fn resolve_pbp_player(
        &self,
        conn: &mut PgConnection,
        event: &RawPBPEvent,
        jersey_map: &HashMap<String, String>,
        jersey_lookup: &HashMap<String, Option<Uuid>>,
        source: &str,
    ) -> QueryResult<Option<Uuid>> {
        let Some(external_id) = event.player_external_id.as_deref() else {
            return Ok(None);
        };

        if let Some(player) = db::get_player_by_external_id(conn, source, external_id)? {
            return Ok(Some(player.id));
        }

        // PBP identity spaces don't always match box-score ids; fall back
        // to the lineup's jersey number when it is unambiguous.
        Ok(jersey_map
            .get(external_id)
            .and_then(|jersey| jersey_lookup.get(jersey).copied())
            .flatten())
    }
}
