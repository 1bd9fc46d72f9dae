use chrono::Utc;
use diesel::{PgConnection, prelude::*};
use std::collections::HashSet;
use uuid::Uuid;

use crate::models::NewSyncTracker;
use crate::schema::sync_tracker;

/// Returns the subset of `external_ids` with no tracker row, i.e. the games
/// that still need a full ingest.
pub fn get_unsynced_games(
    conn: &mut PgConnection,
    source: &str,
    external_ids: &[String],
) -> QueryResult<HashSet<String>> {
    let synced: Vec<String> = sync_tracker::table
        .filter(sync_tracker::source.eq(source))
        .filter(sync_tracker::game_external_id.eq_any(external_ids))
        .select(sync_tracker::game_external_id)
        .get_results(conn)?;
    let synced: HashSet<String> = synced.into_iter().collect();
    Ok(external_ids
        .iter()
        .filter(|id| !synced.contains(*id))
        .cloned()
        .collect())
}

/// Insert-or-ignore: a game marked synced stays marked under concurrent
/// re-runs.
pub fn mark_game_synced(
    conn: &mut PgConnection,
    source: &str,
    game_external_id: &str,
    game_id: Uuid,
) -> QueryResult<()> {
    diesel::insert_into(sync_tracker::table)
        .values(&NewSyncTracker {
            source,
            game_external_id,
            game_id,
            synced_at: Utc::now(),
        })
        .on_conflict_do_nothing()
        .execute(conn)?;
    Ok(())
}

pub fn get_tracked_game(
    conn: &mut PgConnection,
    source: &str,
    game_external_id: &str,
) -> QueryResult<Option<Uuid>> {
    sync_tracker::table
        .filter(sync_tracker::source.eq(source))
        .filter(sync_tracker::game_external_id.eq(game_external_id))
        .select(sync_tracker::game_id)
        .first(conn)
        .optional()
}
