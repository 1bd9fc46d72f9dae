//! Canonical DTOs produced by the mappers, independent of provider dialect.
//! The syncer layer is the only consumer; mappers never touch the store.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, Default,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    #[default]
    Scheduled,
    Live,
    Final,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Shot,
    FreeThrow,
    Rebound,
    Assist,
    Turnover,
    Steal,
    Block,
    Foul,
    Substitution,
    Timeout,
    JumpBall,
    TipOff,
    BeginPeriod,
    EndPeriod,
    /// Provider codes with no canonical equivalent are carried verbatim.
    #[strum(default, to_string = "{0}")]
    Other(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawSeason {
    /// The normalized `YYYY-YY` name; doubles as the cross-source external id.
    pub external_id: String,
    pub name: String,
    /// The provider's own season identifier (e.g. `E2024`), kept for later
    /// API calls.
    pub source_id: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub is_current: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawTeam {
    pub external_id: String,
    pub name: String,
    pub short_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawGame {
    pub external_id: String,
    pub home_team_external_id: String,
    pub away_team_external_id: String,
    pub game_date: DateTime<Utc>,
    pub status: GameStatus,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPlayerStats {
    pub player_external_id: String,
    pub player_name: String,
    pub team_external_id: String,
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
    pub turnovers: i32,
    pub steals: i32,
    pub blocks: i32,
    pub personal_fouls: i32,
    pub plus_minus: i32,
    pub efficiency: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawBoxScore {
    pub game: RawGame,
    pub home_players: Vec<RawPlayerStats>,
    pub away_players: Vec<RawPlayerStats>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawPBPEvent {
    /// 1-based, dense, in the order the provider produced the events.
    pub event_number: i32,
    pub period: i32,
    /// `MM:SS` remaining in the period.
    pub clock: String,
    pub event_type: EventType,
    pub event_subtype: Option<String>,
    pub player_external_id: Option<String>,
    pub player_name: Option<String>,
    pub team_external_id: Option<String>,
    pub success: Option<bool>,
    pub coord_x: Option<f64>,
    pub coord_y: Option<f64>,
    pub related_event_numbers: Option<Vec<i32>>,
}

impl RawPBPEvent {
    pub fn new(event_number: i32, period: i32, clock: impl Into<String>, kind: EventType) -> Self {
        Self {
            event_number,
            period,
            clock: clock.into(),
            event_type: kind,
            event_subtype: None,
            player_external_id: None,
            player_name: None,
            team_external_id: None,
            success: None,
            coord_x: None,
            coord_y: None,
            related_event_numbers: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPlayerInfo {
    pub external_id: String,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Option<NaiveDate>,
    pub height_cm: Option<i32>,
    pub position: Option<String>,
    pub nationality: Option<String>,
}
