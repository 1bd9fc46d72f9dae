use chrono::{DateTime, Utc};
use diesel::{PgConnection, prelude::*};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::{DbSyncCache, NewSyncCache};
use crate::schema::sync_cache;

/// The result of a cache-through fetch. `from_cache` means no network call
/// happened at all; `changed=false` with `from_cache=false` means the
/// provider was queried but returned byte-identical content.
#[derive(Debug, Clone)]
pub struct CacheResult {
    pub data: serde_json::Value,
    pub changed: bool,
    pub fetched_at: DateTime<Utc>,
    pub cache_id: Uuid,
    pub from_cache: bool,
}

impl CacheResult {
    pub fn hit(entry: DbSyncCache) -> Self {
        Self {
            data: entry.raw_data,
            changed: false,
            fetched_at: entry.fetched_at,
            cache_id: entry.id,
            from_cache: true,
        }
    }

    pub fn fresh(entry: DbSyncCache, changed: bool) -> Self {
        Self {
            data: entry.raw_data,
            changed,
            fetched_at: entry.fetched_at,
            cache_id: entry.id,
            from_cache: false,
        }
    }
}

/// SHA-256 over the canonical JSON rendering of `data`. serde_json's `Map`
/// is a `BTreeMap`, so `to_string` emits keys in sorted order and the hash
/// is stable across fetches regardless of provider key ordering.
pub fn canonical_hash(data: &serde_json::Value) -> String {
    let canonical = serde_json::to_string(data).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn get_cache(
    conn: &mut PgConnection,
    source: &str,
    resource_type: &str,
    resource_id: &str,
) -> QueryResult<Option<DbSyncCache>> {
    sync_cache::table
        .filter(sync_cache::source.eq(source))
        .filter(sync_cache::resource_type.eq(resource_type))
        .filter(sync_cache::resource_id.eq(resource_id))
        .select(DbSyncCache::as_select())
        .first(conn)
        .optional()
}

/// Writes `data` through the cache. An existing entry with an equal content
/// hash only refreshes `fetched_at`; anything else replaces the payload.
/// Returns the stored entry and whether the content changed.
pub fn upsert_cache(
    conn: &mut PgConnection,
    source: &str,
    resource_type: &str,
    resource_id: &str,
    data: &serde_json::Value,
    http_status: Option<i32>,
) -> QueryResult<(DbSyncCache, bool)> {
    let content_hash = canonical_hash(data);
    let now = Utc::now();

    if let Some(existing) = get_cache(conn, source, resource_type, resource_id)? {
        let changed = existing.content_hash.trim() != content_hash;
        let entry = if changed {
            diesel::update(sync_cache::table.find(existing.id))
                .set((
                    sync_cache::raw_data.eq(data),
                    sync_cache::content_hash.eq(&content_hash),
                    sync_cache::fetched_at.eq(now),
                    sync_cache::http_status.eq(http_status),
                ))
                .returning(DbSyncCache::as_returning())
                .get_result(conn)?
        } else {
            diesel::update(sync_cache::table.find(existing.id))
                .set(sync_cache::fetched_at.eq(now))
                .returning(DbSyncCache::as_returning())
                .get_result(conn)?
        };
        return Ok((entry, changed));
    }

    let entry = diesel::insert_into(sync_cache::table)
        .values(&NewSyncCache {
            source,
            resource_type,
            resource_id,
            raw_data: data,
            content_hash: &content_hash,
            fetched_at: now,
            http_status,
        })
        .returning(DbSyncCache::as_returning())
        .get_result(conn)?;
    Ok((entry, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hash_is_key_order_independent() {
        // serde_json sorts object keys, so logically-equal payloads hash
        // identically no matter how the provider ordered them.
        let a: serde_json::Value =
            serde_json::from_str(r#"{"b": 1, "a": {"y": 2, "x": 3}}"#).unwrap();
        let b: serde_json::Value =
            serde_json::from_str(r#"{"a": {"x": 3, "y": 2}, "b": 1}"#).unwrap();
        assert_eq!(canonical_hash(&a), canonical_hash(&b));
    }

    #[test]
    fn hash_changes_with_content() {
        let a = json!({"games": [{"id": 1, "score": 80}]});
        let b = json!({"games": [{"id": 1, "score": 81}]});
        assert_ne!(canonical_hash(&a), canonical_hash(&b));
    }

    #[test]
    fn hash_is_hex_sha256() {
        let h = canonical_hash(&json!({}));
        assert_eq!(h.len(), 64);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
