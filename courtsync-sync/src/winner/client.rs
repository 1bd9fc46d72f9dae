//! JSON client for the league schedule and the segevstats realtime
//! endpoints. Every fetch goes through the raw cache: `force=false` serves a
//! cached entry without touching the network, `force=true` refetches and
//! lets the content hash decide whether anything actually changed.

use diesel::PgConnection;
use std::collections::HashMap;

use courtsync_db::db::{self, CacheResult};

use crate::error::SourceError;
use crate::fetch::{RetryPolicy, build_http_client, fetch_json};
use crate::ratelimit::RateLimiter;
use crate::winner::config::WinnerConfig;

pub const SOURCE: &str = "winner";

pub struct WinnerClient {
    config: WinnerConfig,
    policy: RetryPolicy,
    http: reqwest::Client,
    limiter: RateLimiter,
}

impl WinnerClient {
    pub fn new(config: WinnerConfig) -> Result<Self, reqwest::Error> {
        let policy = config.retry_policy();
        let http = build_http_client(&config.user_agent, policy.request_timeout)?;
        let limiter = RateLimiter::new(config.api_requests_per_second, config.api_burst_size);
        Ok(Self {
            config,
            policy,
            http,
            limiter,
        })
    }

    /// The season's full schedule in one payload; also the source for team
    /// and season extraction.
    pub async fn fetch_games_all(
        &self,
        conn: &mut PgConnection,
        force: bool,
    ) -> Result<CacheResult, SourceError> {
        self.fetch_cached(conn, "games_all", "current", &self.config.games_all_url, force)
            .await
    }

    pub async fn fetch_boxscore(
        &self,
        conn: &mut PgConnection,
        game_id: &str,
        force: bool,
    ) -> Result<CacheResult, SourceError> {
        let url = self.config.boxscore_url(game_id);
        self.fetch_cached(conn, "boxscore", game_id, &url, force).await
    }

    pub async fn fetch_pbp(
        &self,
        conn: &mut PgConnection,
        game_id: &str,
        force: bool,
    ) -> Result<CacheResult, SourceError> {
        let url = self.config.pbp_url(game_id);
        self.fetch_cached(conn, "pbp", game_id, &url, force).await
    }

    pub async fn fetch_multiple_boxscores(
        &self,
        conn: &mut PgConnection,
        game_ids: &[String],
        force: bool,
    ) -> Result<HashMap<String, CacheResult>, SourceError> {
        let mut results = HashMap::new();
        for game_id in game_ids {
            let result = self.fetch_boxscore(conn, game_id, force).await?;
            results.insert(game_id.clone(), result);
        }
        Ok(results)
    }

    async fn fetch_cached(
        &self,
        conn: &mut PgConnection,
        resource_type: &str,
        resource_id: &str,
        url: &str,
        force: bool,
    ) -> Result<CacheResult, SourceError> {
        if !force && let Some(entry) = db::get_cache(conn, SOURCE, resource_type, resource_id)? {
            return Ok(CacheResult::hit(entry));
        }

        let data = fetch_json(
            SOURCE,
            &self.http,
            &self.limiter,
            &self.policy,
            url,
            resource_type,
            resource_id,
        )
        .await?;

        let (entry, changed) =
            db::upsert_cache(conn, SOURCE, resource_type, resource_id, &data, Some(200))?;
        Ok(CacheResult::fresh(entry, changed))
    }
}
