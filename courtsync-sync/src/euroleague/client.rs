//! Transport for the European competition feeds. The v1 endpoints serve
//! XML, which is cached verbatim as `{"xml": ...}` payloads (the hash is
//! computed over that JSON rendering, so byte-identical feeds read as
//! unchanged); the live endpoints serve JSON and are cached as-is.

use diesel::PgConnection;
use serde_json::json;

use courtsync_db::db::{self, CacheResult};

use crate::error::SourceError;
use crate::euroleague::config::EuroleagueConfig;
use crate::fetch::{RetryPolicy, build_http_client, fetch_json, fetch_text};
use crate::ratelimit::RateLimiter;

pub const SOURCE: &str = "euroleague";

pub struct EuroleagueClient {
    config: EuroleagueConfig,
    policy: RetryPolicy,
    http: reqwest::Client,
    limiter: RateLimiter,
}

impl EuroleagueClient {
    pub fn new(config: EuroleagueConfig) -> Result<Self, reqwest::Error> {
        let policy = config.retry_policy();
        let http = build_http_client(&config.user_agent, policy.request_timeout)?;
        let limiter = RateLimiter::new(config.requests_per_second, config.burst_size);
        Ok(Self {
            config,
            policy,
            http,
            limiter,
        })
    }

    pub fn config(&self) -> &EuroleagueConfig {
        &self.config
    }

    pub async fn fetch_teams(
        &self,
        conn: &mut PgConnection,
        season: i32,
        force: bool,
    ) -> Result<CacheResult, SourceError> {
        let url = self.config.teams_url(season);
        self.fetch_xml_cached(conn, "teams", &self.config.season_code(season), &url, force)
            .await
    }

    pub async fn fetch_schedule(
        &self,
        conn: &mut PgConnection,
        season: i32,
        force: bool,
    ) -> Result<CacheResult, SourceError> {
        let url = self.config.schedule_url(season);
        self.fetch_xml_cached(
            conn,
            "schedule",
            &self.config.season_code(season),
            &url,
            force,
        )
        .await
    }

    pub async fn fetch_player(
        &self,
        conn: &mut PgConnection,
        player_code: &str,
        season: i32,
        force: bool,
    ) -> Result<CacheResult, SourceError> {
        let url = self.config.player_url(player_code, season);
        let resource_id = format!("{}_{}", self.config.season_code(season), player_code);
        self.fetch_xml_cached(conn, "player", &resource_id, &url, force)
            .await
    }

    pub async fn fetch_live_boxscore(
        &self,
        conn: &mut PgConnection,
        season: i32,
        gamecode: i32,
        force: bool,
    ) -> Result<CacheResult, SourceError> {
        self.fetch_live(conn, "Boxscore", "boxscore", season, gamecode, force)
            .await
    }

    pub async fn fetch_live_pbp(
        &self,
        conn: &mut PgConnection,
        season: i32,
        gamecode: i32,
        force: bool,
    ) -> Result<CacheResult, SourceError> {
        self.fetch_live(conn, "PlaybyPlay", "pbp", season, gamecode, force)
            .await
    }

    pub async fn fetch_live_header(
        &self,
        conn: &mut PgConnection,
        season: i32,
        gamecode: i32,
        force: bool,
    ) -> Result<CacheResult, SourceError> {
        self.fetch_live(conn, "Header", "header", season, gamecode, force)
            .await
    }

    async fn fetch_live(
        &self,
        conn: &mut PgConnection,
        endpoint: &str,
        resource_type: &str,
        season: i32,
        gamecode: i32,
        force: bool,
    ) -> Result<CacheResult, SourceError> {
        let resource_id = format!("{}_{}", self.config.season_code(season), gamecode);
        if !force && let Some(entry) = db::get_cache(conn, SOURCE, resource_type, &resource_id)? {
            return Ok(CacheResult::hit(entry));
        }

        let url = self.config.live_url(endpoint, gamecode, season);
        let data = fetch_json(
            SOURCE,
            &self.http,
            &self.limiter,
            &self.policy,
            &url,
            resource_type,
            &resource_id,
        )
        .await?;

        let (entry, changed) =
            db::upsert_cache(conn, SOURCE, resource_type, &resource_id, &data, Some(200))?;
        Ok(CacheResult::fresh(entry, changed))
    }

    async fn fetch_xml_cached(
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

        let xml = fetch_text(SOURCE, &self.http, &self.limiter, &self.policy, url).await?;
        let data = json!({ "xml": xml });
        let (entry, changed) =
            db::upsert_cache(conn, SOURCE, resource_type, resource_id, &data, Some(200))?;
        Ok(CacheResult::fresh(entry, changed))
    }
}

/// The XML text carried by a cached `{"xml": ...}` payload.
pub fn xml_of(result: &CacheResult) -> String {
    result
        .data
        .get("xml")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}
