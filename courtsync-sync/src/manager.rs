//! The sync orchestrator. Coordinates adapters, syncers, the tracker and the
//! sync log for season/game/teams/recent/roster syncs, and streams progress
//! events for the interactive path.
//!
//! Per-game work is isolated: each game runs in its own transaction, a
//! failure rolls that game back, bumps `records_skipped` and the loop moves
//! on. Play-by-play failures are non-fatal; the game stays synced.

use chrono::{Datelike, Duration as ChronoDuration, NaiveDate, Utc};
use diesel::{Connection, PgConnection};
use itertools::Itertools;
use log::{info, warn};
use miette::Diagnostic;
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use courtsync_db::db::{self, SyncCounters};
use courtsync_db::models::{DbSeason, DbSyncLog, NewLeague, NewSeason};

use crate::adapters::LeagueAdapter;
use crate::entities::{GameSyncer, GameUpsert, TeamSyncer};
use crate::error::SourceError;
use crate::player_info::PlayerInfoService;
use crate::types::{RawGame, RawTeam};

#[derive(Debug, Error, Diagnostic)]
pub enum SyncError {
    #[error("unknown source: {0}")]
    UnknownSource(String),

    #[error("source '{0}' is not enabled")]
    SourceDisabled(String),

    #[error("a {entity_type} sync for '{provider}' is already running")]
    AlreadyRunning {
        provider: String,
        entity_type: String,
    },

    #[error("no seasons available from '{0}'")]
    NoSeasons(String),

    #[error("player info service is not configured")]
    NoPlayerInfoService,

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("database error")]
    Db(#[from] diesel::result::Error),
}

#[derive(Debug, Clone, Default)]
pub struct SourceSettings {
    pub enabled: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SyncConfig {
    pub sources: HashMap<String, SourceSettings>,
}

impl SyncConfig {
    pub fn is_source_enabled(&self, source: &str) -> bool {
        self.sources.get(source).is_some_and(|s| s.enabled)
    }
}

/// The progress stream, emitted in order: one `start`, then
/// `progress`/`synced`/`error` per game, then a terminal `complete`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SyncEvent {
    Start {
        phase: String,
        total: usize,
        skipped: usize,
    },
    Progress {
        current: usize,
        total: usize,
        game_id: String,
        status: String,
    },
    Synced {
        game_id: String,
    },
    Error {
        game_id: String,
        error: String,
    },
    Complete {
        sync_log: SyncLogSummary,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncLogSummary {
    pub id: Uuid,
    pub status: String,
    pub records_processed: i32,
    pub records_created: i32,
    pub records_updated: i32,
    pub records_skipped: i32,
    pub error_message: Option<String>,
}

impl From<&DbSyncLog> for SyncLogSummary {
    fn from(log: &DbSyncLog) -> Self {
        Self {
            id: log.id,
            status: log.status.clone(),
            records_processed: log.records_processed,
            records_created: log.records_created,
            records_updated: log.records_updated,
            records_skipped: log.records_skipped,
            error_message: log.error_message.clone(),
        }
    }
}

struct Progress<'a> {
    tx: Option<&'a mpsc::Sender<SyncEvent>>,
    /// Flips when the consumer goes away; the producer finishes the current
    /// game and stops.
    open: bool,
}

impl<'a> Progress<'a> {
    fn new(tx: Option<&'a mpsc::Sender<SyncEvent>>) -> Self {
        Self { tx, open: true }
    }

    async fn emit(&mut self, event: SyncEvent) {
        if let Some(tx) = self.tx
            && tx.send(event).await.is_err()
        {
            self.open = false;
        }
    }
}

pub struct SyncManager {
    adapters: HashMap<String, Arc<dyn LeagueAdapter>>,
    config: SyncConfig,
    player_info_service: Option<PlayerInfoService>,
    team_syncer: TeamSyncer,
    game_syncer: GameSyncer,
}

impl SyncManager {
    pub fn new(
        adapters: HashMap<String, Arc<dyn LeagueAdapter>>,
        config: SyncConfig,
        player_info_service: Option<PlayerInfoService>,
    ) -> Self {
        Self {
            adapters,
            config,
            player_info_service,
            team_syncer: TeamSyncer::default(),
            game_syncer: GameSyncer::default(),
        }
    }

    fn adapter(&self, source: &str) -> Result<Arc<dyn LeagueAdapter>, SyncError> {
        let adapter = self
            .adapters
            .get(source)
            .ok_or_else(|| SyncError::UnknownSource(source.to_string()))?;
        if !self.config.is_source_enabled(source) {
            return Err(SyncError::SourceDisabled(source.to_string()));
        }
        Ok(adapter.clone())
    }

    /// Full season sync; returns the closed sync log (COMPLETED or FAILED).
    pub async fn sync_season(
        &self,
        conn: &mut PgConnection,
        source: &str,
        season_external_id: &str,
        include_pbp: bool,
    ) -> Result<DbSyncLog, SyncError> {
        self.run_season_sync(conn, source, season_external_id, include_pbp, None, None)
            .await
    }

    /// Progress-streaming variant. The receiver sees the event stream; the
    /// join handle resolves to the closed sync log. Dropping the receiver
    /// stops the producer after the in-flight game.
    pub fn sync_season_with_progress(
        self: Arc<Self>,
        mut conn: PgConnection,
        source: String,
        season_external_id: String,
        include_pbp: bool,
        cancel: CancellationToken,
    ) -> (
        mpsc::Receiver<SyncEvent>,
        JoinHandle<Result<DbSyncLog, SyncError>>,
    ) {
        let (tx, rx) = mpsc::channel(32);
        let handle = tokio::spawn(async move {
            self.run_season_sync(
                &mut conn,
                &source,
                &season_external_id,
                include_pbp,
                Some(&tx),
                Some(&cancel),
            )
            .await
        });
        (rx, handle)
    }

    async fn run_season_sync(
        &self,
        conn: &mut PgConnection,
        source: &str,
        season_external_id: &str,
        include_pbp: bool,
        tx: Option<&mpsc::Sender<SyncEvent>>,
        cancel: Option<&CancellationToken>,
    ) -> Result<DbSyncLog, SyncError> {
        let adapter = self.adapter(source)?;
        let season = self.get_or_create_season(conn, source, season_external_id)?;

        // One running sync per (source, season); refuse a second.
        if db::count_running_syncs(conn, source, "season", Some(season.id))? > 0 {
            return Err(SyncError::AlreadyRunning {
                provider: source.to_string(),
                entity_type: "season".to_string(),
            });
        }

        let sync_log = db::start_sync(conn, source, "season", Some(season.id), None)?;
        let mut counters = SyncCounters::default();
        let mut team_merges: Vec<serde_json::Value> = Vec::new();
        let mut progress = Progress::new(tx);

        let body = self
            .season_sync_body(
                conn,
                adapter.as_ref(),
                &season,
                source,
                season_external_id,
                include_pbp,
                &mut counters,
                &mut team_merges,
                &mut progress,
                cancel,
            )
            .await;

        let details = (!team_merges.is_empty()).then(|| json!({ "team_merges": team_merges }));

        let log = match body {
            Ok(()) => {
                info!(
                    "Season sync for {source}/{season_external_id} complete: \
                    {} processed, {} created, {} updated, {} skipped",
                    counters.records_processed,
                    counters.records_created,
                    counters.records_updated,
                    counters.records_skipped,
                );
                db::complete_sync(conn, sync_log.id, counters, details)?
            }
            Err(e) => {
                warn!("Season sync for {source}/{season_external_id} failed: {e}");
                db::fail_sync(
                    conn,
                    sync_log.id,
                    counters,
                    &e.to_string(),
                    Some(json!({ "cause": format!("{e:?}"), "team_merges": team_merges })),
                )?
            }
        };

        progress
            .emit(SyncEvent::Complete {
                sync_log: SyncLogSummary::from(&log),
            })
            .await;

        Ok(log)
    }

    #[allow(clippy::too_many_arguments)]
    async fn season_sync_body(
        &self,
        conn: &mut PgConnection,
        adapter: &dyn LeagueAdapter,
        season: &DbSeason,
        source: &str,
        season_external_id: &str,
        include_pbp: bool,
        counters: &mut SyncCounters,
        team_merges: &mut Vec<serde_json::Value>,
        progress: &mut Progress<'_>,
        cancel: Option<&CancellationToken>,
    ) -> Result<(), SyncError> {
        // Teams first; games reference them.
        let teams = adapter.get_teams(conn, season_external_id).await?;
        for raw_team in &teams {
            let resolution = self
                .team_syncer
                .sync_team_season(conn, raw_team, season.id, source)?;
            if resolution.cross_source_merge {
                team_merges.push(json!({
                    "team_id": resolution.team.id,
                    "team_name": resolution.team.name,
                    "source": source,
                    "external_id": raw_team.external_id,
                }));
            }
        }

        let games = adapter.get_schedule(conn, season_external_id).await?;
        let final_games: Vec<RawGame> = games
            .into_iter()
            .filter(|g| adapter.is_game_final(g))
            .collect();

        let all_ids = final_games
            .iter()
            .map(|g| g.external_id.clone())
            .collect_vec();
        let unsynced_ids = db::get_unsynced_games(conn, source, &all_ids)?;
        let unsynced = final_games
            .iter()
            .filter(|g| unsynced_ids.contains(&g.external_id))
            .collect_vec();

        counters.records_processed = final_games.len() as i32;
        counters.records_skipped = (final_games.len() - unsynced.len()) as i32;

        progress
            .emit(SyncEvent::Start {
                phase: "games".to_string(),
                total: unsynced.len(),
                skipped: counters.records_skipped as usize,
            })
            .await;

        let total = unsynced.len();
        for (index, raw_game) in unsynced.into_iter().enumerate() {
            if cancel.is_some_and(|c| c.is_cancelled()) || !progress.open {
                info!("Season sync cancelled after {index} of {total} games");
                break;
            }

            progress
                .emit(SyncEvent::Progress {
                    current: index + 1,
                    total,
                    game_id: raw_game.external_id.clone(),
                    status: "syncing".to_string(),
                })
                .await;

            match self
                .sync_one_game(conn, adapter, raw_game, season.id, source, include_pbp)
                .await
            {
                Ok(upsert) => {
                    if upsert.created {
                        counters.records_created += 1;
                    } else {
                        counters.records_updated += 1;
                    }
                    progress
                        .emit(SyncEvent::Synced {
                            game_id: raw_game.external_id.clone(),
                        })
                        .await;
                }
                Err(e) => {
                    warn!("Error syncing game {}: {e}", raw_game.external_id);
                    counters.records_skipped += 1;
                    progress
                        .emit(SyncEvent::Error {
                            game_id: raw_game.external_id.clone(),
                            error: e.to_string(),
                        })
                        .await;
                }
            }
        }

        Ok(())
    }

    /// Fetch outside, persist inside: the box score and (optionally) the
    /// play-by-play are fetched first, then one transaction writes the game,
    /// its stats, the PBP (best-effort, in a savepoint) and the tracker row.
    async fn sync_one_game(
        &self,
        conn: &mut PgConnection,
        adapter: &dyn LeagueAdapter,
        raw_game: &RawGame,
        season_id: Uuid,
        source: &str,
        include_pbp: bool,
    ) -> Result<GameUpsert, SyncError> {
        let boxscore = adapter.get_game_boxscore(conn, &raw_game.external_id).await?;

        let pbp = if include_pbp {
            match adapter.get_game_pbp(conn, &raw_game.external_id).await {
                Ok(pbp) => Some(pbp),
                Err(e) => {
                    warn!(
                        "PBP fetch failed for game {} (non-fatal): {e}",
                        raw_game.external_id,
                    );
                    None
                }
            }
        } else {
            None
        };

        let upsert = conn.transaction(|conn| {
            let upsert = self
                .game_syncer
                .sync_game(conn, raw_game, season_id, source)?;
            self.game_syncer
                .sync_boxscore(conn, &boxscore, &upsert.game, source)?;

            if let Some((events, jerseys)) = &pbp {
                // sync_pbp opens its own savepoint; a failure rolls back
                // only the PBP rows and the game stays synced.
                if let Err(e) =
                    self.game_syncer
                        .sync_pbp(conn, events, jerseys, &upsert.game, source)
                {
                    warn!(
                        "PBP sync failed for game {} (non-fatal): {e}",
                        raw_game.external_id,
                    );
                }
            }

            db::mark_game_synced(conn, source, &raw_game.external_id, upsert.game.id)?;
            Ok::<_, diesel::result::Error>(upsert)
        })?;

        Ok(upsert)
    }

    /// Syncs a single game by external id, resolving the season from the
    /// adapter's season list. Already-tracked games are counted as skipped
    /// unless `force` is set.
    pub async fn sync_game(
        &self,
        conn: &mut PgConnection,
        source: &str,
        game_external_id: &str,
        include_pbp: bool,
        force: bool,
    ) -> Result<DbSyncLog, SyncError> {
        let adapter = self.adapter(source)?;
        let sync_log = db::start_sync(conn, source, "game", None, None)?;

        let body: Result<SyncCounters, SyncError> = async {
            if !force && db::get_tracked_game(conn, source, game_external_id)?.is_some() {
                return Ok(SyncCounters {
                    records_processed: 1,
                    records_skipped: 1,
                    ..SyncCounters::default()
                });
            }

            let boxscore = adapter.get_game_boxscore(conn, game_external_id).await?;
            let mut raw_game = boxscore.game.clone();
            if raw_game.external_id.is_empty() {
                raw_game.external_id = game_external_id.to_string();
            }

            let seasons = adapter.get_seasons(conn).await?;
            let season_external_id = seasons
                .first()
                .map(|s| s.external_id.clone())
                .ok_or_else(|| SyncError::NoSeasons(source.to_string()))?;
            let season = self.get_or_create_season(conn, source, &season_external_id)?;

            for team_external_id in [
                &raw_game.home_team_external_id,
                &raw_game.away_team_external_id,
            ] {
                let placeholder = RawTeam {
                    external_id: team_external_id.clone(),
                    name: format!("Team {team_external_id}"),
                    short_name: None,
                };
                self.team_syncer
                    .sync_team_season(conn, &placeholder, season.id, source)?;
            }

            let upsert = self
                .sync_one_game(conn, adapter.as_ref(), &raw_game, season.id, source, include_pbp)
                .await?;
            db::set_sync_game(conn, sync_log.id, upsert.game.id)?;

            Ok(SyncCounters {
                records_processed: 1,
                records_created: i32::from(upsert.created),
                records_updated: i32::from(!upsert.created),
                ..SyncCounters::default()
            })
        }
        .await;

        self.close_log(conn, sync_log.id, body)
    }

    /// Syncs the team list for a season without touching games.
    pub async fn sync_teams(
        &self,
        conn: &mut PgConnection,
        source: &str,
        season_external_id: &str,
    ) -> Result<DbSyncLog, SyncError> {
        let adapter = self.adapter(source)?;
        let season = self.get_or_create_season(conn, source, season_external_id)?;
        let sync_log = db::start_sync(conn, source, "teams", Some(season.id), None)?;

        let body: Result<SyncCounters, SyncError> = async {
            let teams = adapter.get_teams(conn, season_external_id).await?;
            let mut counters = SyncCounters {
                records_processed: teams.len() as i32,
                ..SyncCounters::default()
            };

            for raw_team in &teams {
                let resolution = self
                    .team_syncer
                    .sync_team_season(conn, raw_team, season.id, source)?;
                if resolution.created {
                    counters.records_created += 1;
                } else {
                    counters.records_updated += 1;
                }
            }
            Ok(counters)
        }
        .await;

        self.close_log(conn, sync_log.id, body)
    }

    /// Re-syncs finished games from the last `days` days, scoped to the
    /// seasons those games belong to.
    pub async fn sync_recent(
        &self,
        conn: &mut PgConnection,
        source: &str,
        days: i64,
        include_pbp: bool,
    ) -> Result<DbSyncLog, SyncError> {
        let adapter = self.adapter(source)?;
        let sync_log = db::start_sync(conn, source, "recent", None, None)?;

        let body: Result<SyncCounters, SyncError> = async {
            let since = Utc::now() - ChronoDuration::days(days);
            let games = adapter.get_games_since(conn, since, None).await?;

            let seasons = adapter.get_seasons(conn).await?;
            let season_external_id = seasons
                .first()
                .map(|s| s.external_id.clone())
                .ok_or_else(|| SyncError::NoSeasons(source.to_string()))?;
            let season = self.get_or_create_season(conn, source, &season_external_id)?;

            let all_ids = games.iter().map(|g| g.external_id.clone()).collect_vec();
            let unsynced_ids = db::get_unsynced_games(conn, source, &all_ids)?;

            let mut counters = SyncCounters {
                records_processed: games.len() as i32,
                records_skipped: (games.len() - unsynced_ids.len()) as i32,
                ..SyncCounters::default()
            };

            for raw_game in games.iter().filter(|g| unsynced_ids.contains(&g.external_id)) {
                match self
                    .sync_one_game(conn, adapter.as_ref(), raw_game, season.id, source, include_pbp)
                    .await
                {
                    Ok(upsert) => {
                        if upsert.created {
                            counters.records_created += 1;
                        } else {
                            counters.records_updated += 1;
                        }
                    }
                    Err(e) => {
                        warn!("Error syncing recent game {}: {e}", raw_game.external_id);
                        counters.records_skipped += 1;
                    }
                }
            }
            Ok(counters)
        }
        .await;

        self.close_log(conn, sync_log.id, body)
    }

    /// Refreshes biographical fields for every player on a team-season
    /// roster from the configured player-info sources.
    pub async fn sync_player_info(
        &self,
        conn: &mut PgConnection,
        team_id: Uuid,
        season_id: Uuid,
    ) -> Result<DbSyncLog, SyncError> {
        let service = self
            .player_info_service
            .as_ref()
            .ok_or(SyncError::NoPlayerInfoService)?;

        let sync_log = db::start_sync(conn, "aggregated", "player_info", Some(season_id), None)?;

        let body: Result<SyncCounters, SyncError> = async {
            let players = db::players_on_roster(conn, team_id, season_id)?;
            let mut counters = SyncCounters {
                records_processed: players.len() as i32,
                ..SyncCounters::default()
            };

            for player in &players {
                let delta = service.update_player_from_sources(conn, player).await;
                if delta.is_empty() {
                    counters.records_skipped += 1;
                    continue;
                }
                db::update_player_fields(conn, player.id, &delta.as_changeset())?;
                counters.records_updated += 1;
            }
            Ok(counters)
        }
        .await;

        self.close_log(conn, sync_log.id, body)
    }

    /// Per-source sync posture: enabled flag, running syncs, latest logs.
    pub fn get_sync_status(
        &self,
        conn: &mut PgConnection,
    ) -> Result<serde_json::Value, SyncError> {
        let mut sources = Vec::new();
        let mut total_running = 0i64;

        for source in self.adapters.keys() {
            let running = db::count_running_for_source(conn, source)?;
            total_running += running;

            let latest_season = db::latest_sync_for_source(conn, source, "season")?;
            let latest_game = db::latest_sync_for_source(conn, source, "game")?;

            sources.push(json!({
                "name": source,
                "enabled": self.config.is_source_enabled(source),
                "running_syncs": running,
                "latest_season_sync": latest_season.as_ref().map(|log| json!({
                    "id": log.id,
                    "status": log.status,
                    "started_at": log.started_at,
                    "records_processed": log.records_processed,
                    "records_created": log.records_created,
                })),
                "latest_game_sync": latest_game.as_ref().map(|log| json!({
                    "id": log.id,
                    "status": log.status,
                    "started_at": log.started_at,
                })),
            }));
        }

        Ok(json!({
            "sources": sources,
            "total_running_syncs": total_running,
        }))
    }

    fn close_log(
        &self,
        conn: &mut PgConnection,
        sync_id: Uuid,
        body: Result<SyncCounters, SyncError>,
    ) -> Result<DbSyncLog, SyncError> {
        match body {
            Ok(counters) => Ok(db::complete_sync(conn, sync_id, counters, None)?),
            Err(e) => {
                warn!("Sync {sync_id} failed: {e}");
                Ok(db::fail_sync(
                    conn,
                    sync_id,
                    SyncCounters::default(),
                    &e.to_string(),
                    Some(json!({ "cause": format!("{e:?}") })),
                )?)
            }
        }
    }

    /// Finds the canonical season by normalized name, creating the league
    /// and season rows on first encounter. Season spans default to
    /// September 1 through June 30 of the parsed years.
    fn get_or_create_season(
        &self,
        conn: &mut PgConnection,
        source: &str,
        season_external_id: &str,
    ) -> Result<DbSeason, SyncError> {
        if let Some(season) = db::get_season_by_name(conn, season_external_id)? {
            return Ok(season);
        }

        let league_code = source.to_uppercase();
        let league = match db::get_league_by_code(conn, &league_code)? {
            Some(league) => league,
            None => {
                let country = match source {
                    "winner" => "Israel",
                    "euroleague" => "Europe",
                    _ => "Unknown",
                };
                let mut name = source.to_string();
                if let Some(first) = name.get_mut(..1) {
                    first.make_ascii_uppercase();
                }
                db::insert_league(
                    conn,
                    &NewLeague {
                        code: &league_code,
                        name: &format!("{name} League"),
                        country,
                    },
                )?
            }
        };

        let (start_year, end_year) = crate::parse::season_years_from_name(season_external_id)
            .unwrap_or_else(|| {
                let year = Utc::now().year();
                (year, year + 1)
            });

        let season = db::insert_season(
            conn,
            &NewSeason {
                league_id: league.id,
                name: season_external_id,
                start_date: NaiveDate::from_ymd_opt(start_year, 9, 1)
                    .expect("September 1 is always valid"),
                end_date: NaiveDate::from_ymd_opt(end_year, 6, 30)
                    .expect("June 30 is always valid"),
                is_current: true,
            },
        )?;
        info!("Created season {season_external_id} for league {league_code}");
        Ok(season)
    }
}
