use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::fetch::RetryPolicy;

/// European competition feeds: the XML v1 API for teams/players/schedules
/// and the live JSON API for per-game data. The season code is the
/// one-letter competition tag concatenated with the start year (`E2024`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EuroleagueConfig {
    /// 'E' = Euroleague, 'U' = EuroCup.
    pub competition: String,
    /// Season start years this deployment ingests, newest first.
    pub seasons: Vec<i32>,

    pub teams_api_url: String,
    pub players_api_url: String,
    pub schedule_api_url: String,
    pub live_api_url: String,

    pub requests_per_second: f64,
    pub burst_size: u32,

    pub request_timeout_secs: f64,
    pub max_retries: u32,
    pub retry_base_delay_secs: f64,
    pub retry_max_delay_secs: f64,

    pub user_agent: String,
}

impl Default for EuroleagueConfig {
    fn default() -> Self {
        Self {
            competition: "E".to_string(),
            seasons: vec![2024],
            teams_api_url: "https://api-live.euroleague.net/v1/teams".to_string(),
            players_api_url: "https://api-live.euroleague.net/v1/players".to_string(),
            schedule_api_url: "https://api-live.euroleague.net/v1/schedules".to_string(),
            live_api_url: "https://live.euroleague.net/api".to_string(),
            requests_per_second: 2.0,
            burst_size: 5,
            request_timeout_secs: 30.0,
            max_retries: 3,
            retry_base_delay_secs: 1.0,
            retry_max_delay_secs: 30.0,
            user_agent: "courtsync/0.1 (+https://github.com/courtsync/courtsync)".to_string(),
        }
    }
}

impl EuroleagueConfig {
    pub fn season_code(&self, season: i32) -> String {
        format!("{}{}", self.competition, season)
    }

    pub fn teams_url(&self, season: i32) -> String {
        format!("{}?seasonCode={}", self.teams_api_url, self.season_code(season))
    }

    pub fn player_url(&self, player_code: &str, season: i32) -> String {
        format!(
            "{}?playerCode={}&seasonCode={}",
            self.players_api_url,
            player_code,
            self.season_code(season),
        )
    }

    pub fn schedule_url(&self, season: i32) -> String {
        format!(
            "{}?seasonCode={}",
            self.schedule_api_url,
            self.season_code(season),
        )
    }

    pub fn live_url(&self, endpoint: &str, gamecode: i32, season: i32) -> String {
        format!(
            "{}/{}?gamecode={}&seasoncode={}",
            self.live_api_url,
            endpoint,
            gamecode,
            self.season_code(season),
        )
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_secs_f64(self.retry_base_delay_secs),
            max_delay: Duration::from_secs_f64(self.retry_max_delay_secs),
            request_timeout: Duration::from_secs_f64(self.request_timeout_secs),
        }
    }
}
