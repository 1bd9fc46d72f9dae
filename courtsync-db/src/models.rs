use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::leagues)]
pub struct NewLeague<'a> {
    pub code: &'a str,
    pub name: &'a str,
    pub country: &'a str,
}

#[derive(Debug, Clone, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::leagues)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DbLeague {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub country: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::seasons)]
pub struct NewSeason<'a> {
    pub league_id: Uuid,
    pub name: &'a str,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_current: bool,
}

#[derive(Debug, Clone, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::seasons)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DbSeason {
    pub id: Uuid,
    pub league_id: Uuid,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_current: bool,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::teams)]
pub struct NewTeam<'a> {
    pub name: &'a str,
    pub short_name: Option<&'a str>,
    pub city: Option<&'a str>,
    pub country: Option<&'a str>,
    pub external_ids: serde_json::Value,
}

#[derive(Debug, Clone, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::teams)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DbTeam {
    pub id: Uuid,
    pub name: String,
    pub short_name: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub external_ids: serde_json::Value,
}

impl DbTeam {
    pub fn external_id(&self, source: &str) -> Option<&str> {
        self.external_ids.get(source).and_then(|v| v.as_str())
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::team_seasons)]
pub struct NewTeamSeason {
    pub team_id: Uuid,
    pub season_id: Uuid,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::players)]
pub struct NewPlayer<'a> {
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub birth_date: Option<NaiveDate>,
    pub height_cm: Option<i32>,
    pub position: Option<&'a str>,
    pub nationality: Option<&'a str>,
    pub external_ids: serde_json::Value,
}

#[derive(Debug, Clone, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::players)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DbPlayer {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Option<NaiveDate>,
    pub height_cm: Option<i32>,
    pub position: Option<String>,
    pub nationality: Option<String>,
    pub external_ids: serde_json::Value,
}

impl DbPlayer {
    pub fn external_id(&self, source: &str) -> Option<&str> {
        self.external_ids.get(source).and_then(|v| v.as_str())
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Field-level delta from the player-info merge. `None` fields are left
/// untouched by the update.
#[derive(Debug, Default, PartialEq, AsChangeset)]
#[diesel(table_name = crate::schema::players)]
pub struct PlayerInfoDelta<'a> {
    pub first_name: Option<&'a str>,
    pub last_name: Option<&'a str>,
    pub birth_date: Option<NaiveDate>,
    pub height_cm: Option<i32>,
    pub position: Option<&'a str>,
}

impl PlayerInfoDelta<'_> {
    pub fn is_empty(&self) -> bool {
        *self == PlayerInfoDelta::default()
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::player_team_histories)]
pub struct NewPlayerTeamHistory<'a> {
    pub player_id: Uuid,
    pub team_id: Uuid,
    pub season_id: Uuid,
    pub jersey_number: Option<&'a str>,
    pub position: Option<&'a str>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = crate::schema::player_team_histories)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DbPlayerTeamHistory {
    pub player_id: Uuid,
    pub team_id: Uuid,
    pub season_id: Uuid,
    pub jersey_number: Option<String>,
    pub position: Option<String>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::games)]
pub struct NewGame<'a> {
    pub season_id: Uuid,
    pub home_team_id: Uuid,
    pub away_team_id: Uuid,
    pub game_date: DateTime<Utc>,
    pub status: &'a str,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    pub external_ids: serde_json::Value,
}

#[derive(Debug, Clone, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::games)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DbGame {
    pub id: Uuid,
    pub season_id: Uuid,
    pub home_team_id: Uuid,
    pub away_team_id: Uuid,
    pub game_date: DateTime<Utc>,
    pub status: String,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    pub external_ids: serde_json::Value,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::player_game_stats)]
pub struct NewPlayerGameStats {
    pub game_id: Uuid,
    pub player_id: Uuid,
    pub team_id: Uuid,
    pub minutes_played: i32,
    pub is_starter: bool,
    pub points: i32,
    pub two_pointers_made: i32,
    pub two_pointers_attempted: i32,
    pub three_pointers_made: i32,
    pub three_pointers_attempted: i32,
    pub free_throws_made: i32,
    pub free_throws_attempted: i32,
    pub offensive_rebounds: i32,
    pub defensive_rebounds: i32,
    pub total_rebounds: i32,
    pub assists: i32,
    pub steals: i32,
    pub blocks: i32,
    pub turnovers: i32,
    pub personal_fouls: i32,
    pub plus_minus: i32,
    pub efficiency: i32,
}

#[derive(Debug, Clone, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::player_game_stats)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DbPlayerGameStats {
    pub id: Uuid,
    pub game_id: Uuid,
    pub player_id: Uuid,
    pub team_id: Uuid,
    pub minutes_played: i32,
    pub is_starter: bool,
    pub points: i32,
    pub two_pointers_made: i32,
    pub two_pointers_attempted: i32,
    pub three_pointers_made: i32,
    pub three_pointers_attempted: i32,
    pub free_throws_made: i32,
    pub free_throws_attempted: i32,
    pub offensive_rebounds: i32,
    pub defensive_rebounds: i32,
    pub total_rebounds: i32,
    pub assists: i32,
    pub steals: i32,
    pub blocks: i32,
    pub turnovers: i32,
    pub personal_fouls: i32,
    pub plus_minus: i32,
    pub efficiency: i32,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::play_by_play_events)]
pub struct NewPlayByPlayEvent {
    pub game_id: Uuid,
    pub event_number: i32,
    pub period: i32,
    pub clock: String,
    pub event_type: String,
    pub event_subtype: Option<String>,
    pub team_id: Option<Uuid>,
    pub player_id: Option<Uuid>,
    pub success: Option<bool>,
    pub coord_x: Option<f64>,
    pub coord_y: Option<f64>,
    pub related_event_numbers: Option<Vec<i32>>,
}

#[derive(Debug, Clone, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::play_by_play_events)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DbPlayByPlayEvent {
    pub id: Uuid,
    pub game_id: Uuid,
    pub event_number: i32,
    pub period: i32,
    pub clock: String,
    pub event_type: String,
    pub event_subtype: Option<String>,
    pub team_id: Option<Uuid>,
    pub player_id: Option<Uuid>,
    pub success: Option<bool>,
    pub coord_x: Option<f64>,
    pub coord_y: Option<f64>,
    pub related_event_numbers: Option<Vec<i32>>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::sync_cache)]
pub struct NewSyncCache<'a> {
    pub source: &'a str,
    pub resource_type: &'a str,
    pub resource_id: &'a str,
    pub raw_data: &'a serde_json::Value,
    pub content_hash: &'a str,
    pub fetched_at: DateTime<Utc>,
    pub http_status: Option<i32>,
}

#[derive(Debug, Clone, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::sync_cache)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DbSyncCache {
    pub id: Uuid,
    pub source: String,
    pub resource_type: String,
    pub resource_id: String,
    pub raw_data: serde_json::Value,
    pub content_hash: String,
    pub fetched_at: DateTime<Utc>,
    pub http_status: Option<i32>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::sync_logs)]
pub struct NewSyncLog<'a> {
    pub source: &'a str,
    pub entity_type: &'a str,
    pub season_id: Option<Uuid>,
    pub game_id: Option<Uuid>,
    pub status: &'a str,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Identifiable, Queryable, Selectable, Serialize)]
#[diesel(table_name = crate::schema::sync_logs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DbSyncLog {
    pub id: Uuid,
    pub source: String,
    pub entity_type: String,
    pub season_id: Option<Uuid>,
    pub game_id: Option<Uuid>,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub records_processed: i32,
    pub records_created: i32,
    pub records_updated: i32,
    pub records_skipped: i32,
    pub error_message: Option<String>,
    pub error_details: Option<serde_json::Value>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::sync_tracker)]
pub struct NewSyncTracker<'a> {
    pub source: &'a str,
    pub game_external_id: &'a str,
    pub game_id: Uuid,
    pub synced_at: DateTime<Utc>,
}
