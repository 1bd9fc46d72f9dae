pub mod cache;
pub mod sync_log;
pub mod tracker;

pub use cache::{CacheResult, canonical_hash, get_cache, upsert_cache};
pub use sync_log::*;
pub use tracker::*;

use chrono::{DateTime, NaiveDate, Utc};
use diesel::dsl::sql;
use diesel::sql_types::{Bool, Text};
use diesel::{PgConnection, prelude::*};
use uuid::Uuid;

use crate::models::{
    DbGame, DbLeague, DbPlayer, DbPlayerTeamHistory, DbSeason, DbTeam, NewGame, NewLeague,
    NewPlayer, NewPlayerGameStats, NewPlayerTeamHistory, NewPlayByPlayEvent, NewSeason, NewTeam,
    NewTeamSeason, PlayerInfoDelta,
};
use crate::schema::{
    games, leagues, play_by_play_events, player_game_stats, player_team_histories, players,
    seasons, team_seasons, teams,
};

// Matches `external_ids ->> $source = $external_id` on any table carrying the
// jsonb external id map. The partial unique indexes created by the migrations
// make this lookup authoritative per source.
macro_rules! external_id_filter {
    ($source:expr, $external_id:expr) => {
        sql::<Bool>("external_ids ->> ")
            .bind::<Text, _>($source)
            .sql(" = ")
            .bind::<Text, _>($external_id)
    };
}

pub fn get_league_by_code(conn: &mut PgConnection, code: &str) -> QueryResult<Option<DbLeague>> {
    leagues::table
        .filter(leagues::code.eq(code))
        .select(DbLeague::as_select())
        .first(conn)
        .optional()
}

pub fn insert_league(conn: &mut PgConnection, league: &NewLeague) -> QueryResult<DbLeague> {
    diesel::insert_into(leagues::table)
        .values(league)
        .returning(DbLeague::as_returning())
        .get_result(conn)
}

pub fn get_season_by_name(conn: &mut PgConnection, name: &str) -> QueryResult<Option<DbSeason>> {
    seasons::table
        .filter(seasons::name.eq(name))
        .select(DbSeason::as_select())
        .first(conn)
        .optional()
}

pub fn insert_season(conn: &mut PgConnection, season: &NewSeason) -> QueryResult<DbSeason> {
    diesel::insert_into(seasons::table)
        .values(season)
        .returning(DbSeason::as_returning())
        .get_result(conn)
}

pub fn get_team_by_external_id(
    conn: &mut PgConnection,
    source: &str,
    external_id: &str,
) -> QueryResult<Option<DbTeam>> {
    teams::table
        .filter(external_id_filter!(source, external_id))
        .select(DbTeam::as_select())
        .first(conn)
        .optional()
}

pub fn insert_team(conn: &mut PgConnection, team: &NewTeam) -> QueryResult<DbTeam> {
    diesel::insert_into(teams::table)
        .values(team)
        .returning(DbTeam::as_returning())
        .get_result(conn)
}

pub fn add_team_external_id(
    conn: &mut PgConnection,
    team_id: Uuid,
    source: &str,
    external_id: &str,
) -> QueryResult<()> {
    let mut ids: serde_json::Value = teams::table
        .find(team_id)
        .select(teams::external_ids)
        .first(conn)?;
    if let Some(map) = ids.as_object_mut() {
        map.insert(source.to_string(), serde_json::Value::from(external_id));
    }
    diesel::update(teams::table.find(team_id))
        .set(teams::external_ids.eq(&ids))
        .execute(conn)?;
    Ok(())
}

pub fn teams_in_season(conn: &mut PgConnection, season_id: Uuid) -> QueryResult<Vec<DbTeam>> {
    teams::table
        .inner_join(team_seasons::table)
        .filter(team_seasons::season_id.eq(season_id))
        .select(DbTeam::as_select())
        .order_by(teams::id)
        .get_results(conn)
}

pub fn ensure_team_season(
    conn: &mut PgConnection,
    team_id: Uuid,
    season_id: Uuid,
) -> QueryResult<()> {
    diesel::insert_into(team_seasons::table)
        .values(&NewTeamSeason { team_id, season_id })
        .on_conflict_do_nothing()
        .execute(conn)?;
    Ok(())
}

pub fn get_player_by_external_id(
    conn: &mut PgConnection,
    source: &str,
    external_id: &str,
) -> QueryResult<Option<DbPlayer>> {
    players::table
        .filter(external_id_filter!(source, external_id))
        .select(DbPlayer::as_select())
        .first(conn)
        .optional()
}

pub fn insert_player(conn: &mut PgConnection, player: &NewPlayer) -> QueryResult<DbPlayer> {
    diesel::insert_into(players::table)
        .values(player)
        .returning(DbPlayer::as_returning())
        .get_result(conn)
}

pub fn add_player_external_id(
    conn: &mut PgConnection,
    player_id: Uuid,
    source: &str,
    external_id: &str,
) -> QueryResult<()> {
    let mut ids: serde_json::Value = players::table
        .find(player_id)
        .select(players::external_ids)
        .first(conn)?;
    if let Some(map) = ids.as_object_mut() {
        map.insert(source.to_string(), serde_json::Value::from(external_id));
    }
    diesel::update(players::table.find(player_id))
        .set(players::external_ids.eq(&ids))
        .execute(conn)?;
    Ok(())
}

pub fn update_player_fields(
    conn: &mut PgConnection,
    player_id: Uuid,
    delta: &PlayerInfoDelta,
) -> QueryResult<usize> {
    if delta.is_empty() {
        return Ok(0);
    }
    diesel::update(players::table.find(player_id))
        .set(delta)
        .execute(conn)
}

pub fn players_on_roster(
    conn: &mut PgConnection,
    team_id: Uuid,
    season_id: Uuid,
) -> QueryResult<Vec<DbPlayer>> {
    players::table
        .inner_join(player_team_histories::table)
        .filter(player_team_histories::team_id.eq(team_id))
        .filter(player_team_histories::season_id.eq(season_id))
        .select(DbPlayer::as_select())
        .order_by(players::id)
        .get_results(conn)
}

pub fn roster_entries(
    conn: &mut PgConnection,
    team_id: Uuid,
    season_id: Uuid,
) -> QueryResult<Vec<DbPlayerTeamHistory>> {
    player_team_histories::table
        .filter(player_team_histories::team_id.eq(team_id))
        .filter(player_team_histories::season_id.eq(season_id))
        .select(DbPlayerTeamHistory::as_select())
        .get_results(conn)
}

pub fn players_by_birth_date(
    conn: &mut PgConnection,
    birth_date: NaiveDate,
) -> QueryResult<Vec<DbPlayer>> {
    players::table
        .filter(players::birth_date.eq(birth_date))
        .select(DbPlayer::as_select())
        .order_by(players::id)
        .get_results(conn)
}

pub fn ensure_player_team_history(
    conn: &mut PgConnection,
    entry: &NewPlayerTeamHistory,
) -> QueryResult<()> {
    diesel::insert_into(player_team_histories::table)
        .values(entry)
        .on_conflict_do_nothing()
        .execute(conn)?;
    Ok(())
}

pub fn get_game_by_external_id(
    conn: &mut PgConnection,
    source: &str,
    external_id: &str,
) -> QueryResult<Option<DbGame>> {
    games::table
        .filter(external_id_filter!(source, external_id))
        .select(DbGame::as_select())
        .first(conn)
        .optional()
}

pub fn insert_game(conn: &mut PgConnection, game: &NewGame) -> QueryResult<DbGame> {
    diesel::insert_into(games::table)
        .values(game)
        .returning(DbGame::as_returning())
        .get_result(conn)
}

pub fn update_game_result(
    conn: &mut PgConnection,
    game_id: Uuid,
    game_date: DateTime<Utc>,
    status: &str,
    home_score: Option<i32>,
    away_score: Option<i32>,
) -> QueryResult<DbGame> {
    diesel::update(games::table.find(game_id))
        .set((
            games::game_date.eq(game_date),
            games::status.eq(status),
            games::home_score.eq(home_score),
            games::away_score.eq(away_score),
        ))
        .returning(DbGame::as_returning())
        .get_result(conn)
}

/// Rewrites the box-score rows for one game. Delete and insert share a
/// transaction so an upstream correction can never leave stale rows behind.
pub fn replace_player_game_stats(
    conn: &mut PgConnection,
    game_id: Uuid,
    rows: &[NewPlayerGameStats],
) -> QueryResult<usize> {
    conn.transaction(|conn| {
        diesel::delete(player_game_stats::table.filter(player_game_stats::game_id.eq(game_id)))
            .execute(conn)?;
        diesel::insert_into(player_game_stats::table)
            .values(rows)
            .execute(conn)
    })
}

/// Rewrites the play-by-play rows for one game atomically, preserving the
/// order (and the dense event numbering) the caller produced.
pub fn replace_pbp_events(
    conn: &mut PgConnection,
    game_id: Uuid,
    rows: &[NewPlayByPlayEvent],
) -> QueryResult<usize> {
    conn.transaction(|conn| {
        diesel::delete(
            play_by_play_events::table.filter(play_by_play_events::game_id.eq(game_id)),
        )
        .execute(conn)?;
        diesel::insert_into(play_by_play_events::table)
            .values(rows)
            .execute(conn)
    })
}
