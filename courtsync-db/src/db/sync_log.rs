use chrono::Utc;
use diesel::{PgConnection, prelude::*};
use uuid::Uuid;

use crate::models::{DbSyncLog, NewSyncLog};
use crate::schema::sync_logs;

pub const SYNC_STATUS_RUNNING: &str = "RUNNING";
pub const SYNC_STATUS_COMPLETED: &str = "COMPLETED";
pub const SYNC_STATUS_FAILED: &str = "FAILED";

#[derive(Debug, Clone, Copy, Default)]
pub struct SyncCounters {
    pub records_processed: i32,
    pub records_created: i32,
    pub records_updated: i32,
    pub records_skipped: i32,
}

pub fn start_sync(
    conn: &mut PgConnection,
    source: &str,
    entity_type: &str,
    season_id: Option<Uuid>,
    game_id: Option<Uuid>,
) -> QueryResult<DbSyncLog> {
    diesel::insert_into(sync_logs::table)
        .values(&NewSyncLog {
            source,
            entity_type,
            season_id,
            game_id,
            status: SYNC_STATUS_RUNNING,
            started_at: Utc::now(),
        })
        .returning(DbSyncLog::as_returning())
        .get_result(conn)
}

pub fn complete_sync(
    conn: &mut PgConnection,
    sync_id: Uuid,
    counters: SyncCounters,
    details: Option<serde_json::Value>,
) -> QueryResult<DbSyncLog> {
    diesel::update(sync_logs::table.find(sync_id))
        .set((
            sync_logs::status.eq(SYNC_STATUS_COMPLETED),
            sync_logs::completed_at.eq(Utc::now()),
            sync_logs::records_processed.eq(counters.records_processed),
            sync_logs::records_created.eq(counters.records_created),
            sync_logs::records_updated.eq(counters.records_updated),
            sync_logs::records_skipped.eq(counters.records_skipped),
            sync_logs::error_details.eq(details),
        ))
        .returning(DbSyncLog::as_returning())
        .get_result(conn)
}

pub fn fail_sync(
    conn: &mut PgConnection,
    sync_id: Uuid,
    counters: SyncCounters,
    error_message: &str,
    error_details: Option<serde_json::Value>,
) -> QueryResult<DbSyncLog> {
    diesel::update(sync_logs::table.find(sync_id))
        .set((
            sync_logs::status.eq(SYNC_STATUS_FAILED),
            sync_logs::completed_at.eq(Utc::now()),
            sync_logs::records_processed.eq(counters.records_processed),
            sync_logs::records_created.eq(counters.records_created),
            sync_logs::records_updated.eq(counters.records_updated),
            sync_logs::records_skipped.eq(counters.records_skipped),
            sync_logs::error_message.eq(error_message),
            sync_logs::error_details.eq(error_details),
        ))
        .returning(DbSyncLog::as_returning())
        .get_result(conn)
}

pub fn set_sync_game(conn: &mut PgConnection, sync_id: Uuid, game_id: Uuid) -> QueryResult<()> {
    diesel::update(sync_logs::table.find(sync_id))
        .set(sync_logs::game_id.eq(game_id))
        .execute(conn)?;
    Ok(())
}

/// Running syncs for (source, entity_type), optionally scoped to a season.
/// The manager refuses to start a second sync while one is RUNNING.
pub fn count_running_syncs(
    conn: &mut PgConnection,
    source: &str,
    entity_type: &str,
    season_id: Option<Uuid>,
) -> QueryResult<i64> {
    let mut query = sync_logs::table
        .filter(sync_logs::source.eq(source))
        .filter(sync_logs::entity_type.eq(entity_type))
        .filter(sync_logs::status.eq(SYNC_STATUS_RUNNING))
        .into_boxed();
    if let Some(season_id) = season_id {
        query = query.filter(sync_logs::season_id.eq(season_id));
    }
    query.count().get_result(conn)
}

pub fn count_running_for_source(conn: &mut PgConnection, source: &str) -> QueryResult<i64> {
    sync_logs::table
        .filter(sync_logs::source.eq(source))
        .filter(sync_logs::status.eq(SYNC_STATUS_RUNNING))
        .count()
        .get_result(conn)
}

pub fn latest_sync_for_source(
    conn: &mut PgConnection,
    source: &str,
    entity_type: &str,
) -> QueryResult<Option<DbSyncLog>> {
    sync_logs::table
        .filter(sync_logs::source.eq(source))
        .filter(sync_logs::entity_type.eq(entity_type))
        .order_by(sync_logs::started_at.desc())
        .select(DbSyncLog::as_select())
        .first(conn)
        .optional()
}
