use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::fetch::RetryPolicy;

/// Endpoints and pacing for the Israeli league API and its stats backend.
/// The JSON endpoints tolerate a faster clip than the HTML pages, so the
/// two transport classes carry separate budgets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WinnerConfig {
    pub games_all_url: String,
    pub boxscore_url_template: String,
    pub pbp_url_template: String,

    pub player_url_template: String,
    pub team_url_template: String,
    pub results_url_template: String,
    pub game_zone_url_template: String,

    pub api_requests_per_second: f64,
    pub api_burst_size: u32,
    pub scrape_requests_per_second: f64,
    pub scrape_burst_size: u32,

    pub request_timeout_secs: f64,
    pub max_retries: u32,
    pub retry_base_delay_secs: f64,
    pub retry_max_delay_secs: f64,

    pub user_agent: String,
}

impl Default for WinnerConfig {
    fn default() -> Self {
        Self {
            games_all_url: "https://basket.co.il/pbp/json/games_all.json".to_string(),
            boxscore_url_template:
                "https://stats.segevstats.com/realtimestat_heb/get_team_score.php?game_id={game_id}"
                    .to_string(),
            pbp_url_template:
                "https://stats.segevstats.com/realtimestat_heb/get_team_action.php?game_id={game_id}"
                    .to_string(),
            player_url_template: "https://basket.co.il/player.asp?PlayerId={player_id}&lang=en"
                .to_string(),
            team_url_template: "https://basket.co.il/team.asp?TeamId={team_id}&lang=en".to_string(),
            results_url_template: "https://basket.co.il/results.asp?cYear={year}&lang=en"
                .to_string(),
            game_zone_url_template: "https://basket.co.il/game-zone.asp?GameId={game_id}&lang=en"
                .to_string(),
            api_requests_per_second: 2.0,
            api_burst_size: 5,
            scrape_requests_per_second: 0.5,
            scrape_burst_size: 2,
            request_timeout_secs: 30.0,
            max_retries: 3,
            retry_base_delay_secs: 1.0,
            retry_max_delay_secs: 30.0,
            user_agent: "courtsync/0.1 (+https://github.com/courtsync/courtsync)".to_string(),
        }
    }
}

impl WinnerConfig {
    pub fn boxscore_url(&self, game_id: &str) -> String {
        self.boxscore_url_template.replace("{game_id}", game_id)
    }

    pub fn pbp_url(&self, game_id: &str) -> String {
        self.pbp_url_template.replace("{game_id}", game_id)
    }

    pub fn player_url(&self, player_id: &str) -> String {
        self.player_url_template.replace("{player_id}", player_id)
    }

    pub fn team_url(&self, team_id: &str) -> String {
        self.team_url_template.replace("{team_id}", team_id)
    }

    pub fn results_url(&self, year: i32) -> String {
        self.results_url_template
            .replace("{year}", &year.to_string())
    }

    pub fn game_zone_url(&self, game_id: &str) -> String {
        self.game_zone_url_template.replace("{game_id}", game_id)
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
