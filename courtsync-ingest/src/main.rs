mod config;

use clap::{Parser, Subcommand};
use log::{info, warn};
use miette::IntoDiagnostic;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use courtsync_db::models::DbSyncLog;
use courtsync_db::{Connection, PgConnection};
use courtsync_sync::euroleague::EuroleagueAdapter;
use courtsync_sync::manager::{SourceSettings, SyncConfig, SyncEvent, SyncManager};
use courtsync_sync::player_info::PlayerInfoService;
use courtsync_sync::winner::WinnerAdapter;
use courtsync_sync::{LeagueAdapter, PlayerInfoAdapter};

use crate::config::IngestConfig;

#[derive(Debug, Parser)]
#[command(name = "courtsync-ingest", about = "Basketball data ingestion")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sync a full season: teams, final games, box scores and play-by-play.
    Season {
        source: String,
        season: String,
        #[arg(long)]
        no_pbp: bool,
    },
    /// Sync one game by its provider id.
    Game {
        source: String,
        game_id: String,
        #[arg(long)]
        no_pbp: bool,
        /// Re-ingest even when the tracker already has the game.
        #[arg(long)]
        force: bool,
    },
    /// Sync the team list for a season.
    Teams { source: String, season: String },
    /// Sync finished games from the last N days.
    Recent {
        source: String,
        #[arg(long, default_value_t = 7)]
        days: i64,
    },
    /// Refresh player biographies for a team-season roster.
    PlayerInfo { team_id: Uuid, season_id: Uuid },
    /// Show per-source sync status.
    Status,
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = IngestConfig::config().into_diagnostic()?;

    courtsync_db::run_migrations().into_diagnostic()?;

    let url = courtsync_db::postgres_url_from_environment();
    let mut conn = PgConnection::establish(&url).into_diagnostic()?;

    let manager = Arc::new(build_manager(&config)?);

    let log = match cli.command {
        Command::Season {
            source,
            season,
            no_pbp,
        } => {
            let cancel = CancellationToken::new();
            tokio::spawn({
                let cancel = cancel.clone();
                async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        warn!("Interrupt received; finishing the in-flight game");
                        cancel.cancel();
                    }
                }
            });

            let (mut events, handle) = manager.clone().sync_season_with_progress(
                conn,
                source,
                season,
                !no_pbp && config.include_pbp,
                cancel,
            );

            while let Some(event) = events.recv().await {
                print_event(&event);
            }

            Some(handle.await.into_diagnostic()?.into_diagnostic()?)
        }
        Command::Game {
            source,
            game_id,
            no_pbp,
            force,
        } => Some(
            manager
                .sync_game(
                    &mut conn,
                    &source,
                    &game_id,
                    !no_pbp && config.include_pbp,
                    force,
                )
                .await
                .into_diagnostic()?,
        ),
        Command::Teams { source, season } => Some(
            manager
                .sync_teams(&mut conn, &source, &season)
                .await
                .into_diagnostic()?,
        ),
        Command::Recent { source, days } => Some(
            manager
                .sync_recent(&mut conn, &source, days, config.include_pbp)
                .await
                .into_diagnostic()?,
        ),
        Command::PlayerInfo { team_id, season_id } => Some(
            manager
                .sync_player_info(&mut conn, team_id, season_id)
                .await
                .into_diagnostic()?,
        ),
        Command::Status => {
            let status = manager.get_sync_status(&mut conn).into_diagnostic()?;
            println!(
                "{}",
                serde_json::to_string_pretty(&status).into_diagnostic()?
            );
            None
        }
    };

    if let Some(log) = log {
        print_summary(&log);
        if log.status == "FAILED" {
            std::process::exit(1);
        }
    }

    Ok(())
}

fn build_manager(config: &IngestConfig) -> miette::Result<SyncManager> {
    let winner = Arc::new(WinnerAdapter::new(config.winner.clone()).into_diagnostic()?);
    let euroleague = Arc::new(EuroleagueAdapter::new(config.euroleague.clone()).into_diagnostic()?);

    let mut adapters: HashMap<String, Arc<dyn LeagueAdapter>> = HashMap::new();
    adapters.insert("winner".to_string(), winner.clone());
    adapters.insert("euroleague".to_string(), euroleague.clone());

    let sync_config = SyncConfig {
        sources: HashMap::from([
            (
                "winner".to_string(),
                SourceSettings {
                    enabled: config.winner_enabled,
                },
            ),
            (
                "euroleague".to_string(),
                SourceSettings {
                    enabled: config.euroleague_enabled,
                },
            ),
        ]),
    };

    // Player-info priority: the local league first, the European feed as
    // the fallback for fields it is missing.
    let info_adapters: Vec<Arc<dyn PlayerInfoAdapter>> =
        vec![winner as Arc<dyn PlayerInfoAdapter>, euroleague];
    let player_info = PlayerInfoService::new(info_adapters);

    Ok(SyncManager::new(adapters, sync_config, Some(player_info)))
}

fn print_event(event: &SyncEvent) {
    match serde_json::to_string(event) {
        Ok(line) => println!("{line}"),
        Err(e) => warn!("Unserializable progress event: {e}"),
    }
}

fn print_summary(log: &DbSyncLog) {
    info!(
        "Sync {} finished with status {}: {} processed, {} created, {} updated, {} skipped",
        log.id,
        log.status,
        log.records_processed,
        log.records_created,
        log.records_updated,
        log.records_skipped,
    );
    if let Some(message) = &log.error_message {
        warn!("Failure: {message}");
    }
}
