//! Cross-source entity reconciliation: resolve incoming teams and players
//! to existing canonical rows before creating new ones.
//!
//! Both matchers are deterministic: identical input against identical store
//! state yields the same decision, and creation races are absorbed by the
//! per-source unique indexes on `external_ids`.

use chrono::NaiveDate;
use diesel::{PgConnection, QueryResult};
use log::{info, warn};
use serde_json::json;
use uuid::Uuid;

use courtsync_db::db;
use courtsync_db::models::{DbPlayer, DbTeam, NewPlayer, NewTeam};

use crate::types::RawTeam;

/// Trailing roster-listing tokens that are not part of a player's name.
/// Provider-dependent data, extended as new dialects appear.
const POSITION_TOKENS: &[&str] = &[
    "g", "f", "c", "pg", "sg", "sf", "pf", "g-f", "f-g", "f-c", "c-f", "g-", "f-", "c-",
];

const CAPTAIN_MARKERS: &[&str] = &["captain", "captain|", "(c)", "קפטן"];

/// Lowercase, collapse whitespace, strip trailing position tokens and
/// captain markers. Hebrew has no case, so those characters pass through
/// unchanged.
pub fn normalize_name(name: &str) -> String {
    let lowered = name.to_lowercase();
    let mut tokens: Vec<&str> = lowered.split_whitespace().collect();

    while let Some(last) = tokens.last() {
        let bare = last.trim_matches('|');
        if CAPTAIN_MARKERS.contains(&bare) || POSITION_TOKENS.contains(&bare) {
            tokens.pop();
        } else {
            break;
        }
    }

    tokens.join(" ")
}

/// Normalized name with punctuation and whitespace removed, for
/// high-precision comparison across sources that disagree on spacing.
pub fn compact_name(name: &str) -> String {
    normalize_name(name)
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect()
}

/// Splits a display name into (first, last). A single token is a last name;
/// everything after the first token joins the last name.
pub fn split_name(name: &str) -> (String, String) {
    let mut parts = name.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some(first), Some(second)) => {
            let mut last = second.to_string();
            for part in parts {
                last.push(' ');
                last.push_str(part);
            }
            (first.to_string(), last)
        }
        (Some(only), None) => (String::new(), only.to_string()),
        _ => (String::new(), String::new()),
    }
}

#[derive(Debug)]
pub struct TeamResolution {
    pub team: DbTeam,
    pub created: bool,
    /// Set when the match joined this source's id onto a row that already
    /// carries another source's id. Surfaced for human review.
    pub cross_source_merge: bool,
}

#[derive(Debug, Default)]
pub struct TeamMatcher;

impl TeamMatcher {
    /// Resolution order: external id, then exact normalized name within the
    /// season's teams, then create. A name match adds this source's id to
    /// the matched row.
    pub fn resolve(
        &self,
        conn: &mut PgConnection,
        raw: &RawTeam,
        season_id: Uuid,
        source: &str,
    ) -> QueryResult<TeamResolution> {
        if let Some(team) = db::get_team_by_external_id(conn, source, &raw.external_id)? {
            return Ok(TeamResolution {
                team,
                created: false,
                cross_source_merge: false,
            });
        }

        let wanted = normalize_name(&raw.name);
        if !wanted.is_empty() {
            let mut candidates: Vec<DbTeam> = db::teams_in_season(conn, season_id)?
                .into_iter()
                .filter(|t| normalize_name(&t.name) == wanted)
                // A row that already maps this source to a *different* id is
                // a different team as far as this source is concerned.
                .filter(|t| t.external_id(source).is_none())
                .collect();

            if !candidates.is_empty() {
                if candidates.len() > 1 {
                    // Deterministic tie-break; teams_in_season orders by id.
                    warn!(
                        "Ambiguous team name match for '{}' ({} candidates); \
                        choosing the lowest id",
                        raw.name,
                        candidates.len(),
                    );
                }
                let team = candidates.remove(0);
                let cross_source_merge = !team
                    .external_ids
                    .as_object()
                    .map(|m| m.is_empty())
                    .unwrap_or(true);
                if cross_source_merge {
                    warn!(
                        "Joining source '{source}' id '{}' onto existing team '{}' ({}) \
                        matched by name; flagged for review",
                        raw.external_id, team.name, team.id,
                    );
                }
                db::add_team_external_id(conn, team.id, source, &raw.external_id)?;
                let team = db::get_team_by_external_id(conn, source, &raw.external_id)?
                    .unwrap_or(team);
                return Ok(TeamResolution {
                    team,
                    created: false,
                    cross_source_merge,
                });
            }
        }

        let team = db::insert_team(
            conn,
            &NewTeam {
                name: &raw.name,
                short_name: raw.short_name.as_deref(),
                city: None,
                country: None,
                external_ids: json!({ source: raw.external_id }),
            },
        )?;
        info!("Created team '{}' for source '{source}'", raw.name);
        Ok(TeamResolution {
            team,
            created: true,
            cross_source_merge: false,
        })
    }
}

/// Context carried into player resolution from the surrounding game or
/// roster sync.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlayerContext {
    pub team_id: Option<Uuid>,
    pub season_id: Option<Uuid>,
}

#[derive(Debug)]
pub struct PlayerResolution {
    pub player: DbPlayer,
    pub created: bool,
}

#[derive(Debug, Default)]
pub struct PlayerDeduplicator;

impl PlayerDeduplicator {
    /// Resolution order: external id; roster name match within the
    /// team-season context; (name, birth date) match; create.
    pub fn resolve(
        &self,
        conn: &mut PgConnection,
        source: &str,
        external_id: &str,
        display_name: &str,
        birth_date: Option<NaiveDate>,
        ctx: PlayerContext,
    ) -> QueryResult<PlayerResolution> {
        if !external_id.is_empty()
            && let Some(player) = db::get_player_by_external_id(conn, source, external_id)?
        {
            return Ok(PlayerResolution {
                player,
                created: false,
            });
        }

        let wanted = compact_name(display_name);

        if !wanted.is_empty()
            && let (Some(team_id), Some(season_id)) = (ctx.team_id, ctx.season_id)
        {
            let matched = Self::pick_candidate(
                db::players_on_roster(conn, team_id, season_id)?,
                &wanted,
                source,
            );
            if let Some(player) = matched {
                return self.adopt(conn, player, source, external_id);
            }
        }

        if !wanted.is_empty()
            && let Some(birth_date) = birth_date
        {
            let matched = Self::pick_candidate(
                db::players_by_birth_date(conn, birth_date)?,
                &wanted,
                source,
            );
            if let Some(player) = matched {
                return self.adopt(conn, player, source, external_id);
            }
        }

        let (first_name, last_name) = split_name(display_name);
        let external_ids = if external_id.is_empty() {
            json!({})
        } else {
            json!({ source: external_id })
        };
        let player = db::insert_player(
            conn,
            &NewPlayer {
                first_name: &first_name,
                last_name: &last_name,
                birth_date,
                height_cm: None,
                position: None,
                nationality: None,
                external_ids,
            },
        )?;
        Ok(PlayerResolution {
            player,
            created: true,
        })
    }

    fn pick_candidate(candidates: Vec<DbPlayer>, wanted: &str, source: &str) -> Option<DbPlayer> {
        let mut matched: Vec<DbPlayer> = candidates
            .into_iter()
            .filter(|p| compact_name(&p.full_name()) == wanted)
            .filter(|p| p.external_id(source).is_none())
            .collect();
        if matched.len() > 1 {
            warn!(
                "Ambiguous player name match ({} candidates); choosing the lowest id",
                matched.len(),
            );
        }
        // players_on_roster / players_by_birth_date order by id.
        (!matched.is_empty()).then(|| matched.remove(0))
    }

    fn adopt(
        &self,
        conn: &mut PgConnection,
        player: DbPlayer,
        source: &str,
        external_id: &str,
    ) -> QueryResult<PlayerResolution> {
        if !external_id.is_empty() {
            db::add_player_external_id(conn, player.id, source, external_id)?;
        }
        let player = db::get_player_by_external_id(conn, source, external_id)?.unwrap_or(player);
        Ok(PlayerResolution {
            player,
            created: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_strips_position_tokens() {
        assert_eq!(normalize_name("John Smith G"), "john smith");
        assert_eq!(normalize_name("John Smith PF"), "john smith");
        assert_eq!(normalize_name("John Smith G-F"), "john smith");
        assert_eq!(normalize_name("  John   Smith  "), "john smith");
    }

    #[test]
    fn normalization_strips_captain_markers() {
        assert_eq!(normalize_name("John Smith Captain|"), "john smith");
        assert_eq!(normalize_name("John Smith captain"), "john smith");
        assert_eq!(normalize_name("John Smith (C)"), "john smith");
    }

    #[test]
    fn normalization_keeps_hebrew_intact() {
        assert_eq!(normalize_name("מכבי תל אביב"), "מכבי תל אביב");
        assert_eq!(normalize_name("יוסי כהן קפטן"), "יוסי כהן");
    }

    #[test]
    fn compact_form_removes_punctuation_and_spaces() {
        assert_eq!(compact_name("Maccabi Tel-Aviv"), "maccabitelaviv");
        assert_eq!(compact_name("O'Neal, Shaq"), "onealshaq");
    }

    #[test]
    fn position_tokens_inside_names_survive() {
        // Only trailing tokens are stripped; a leading or medial "C" stays.
        assert_eq!(normalize_name("C Brown"), "c brown");
    }

    #[test]
    fn split_name_variants() {
        assert_eq!(
            split_name("LeBron James"),
            ("LeBron".to_string(), "James".to_string())
        );
        assert_eq!(
            split_name("Juan Carlos Navarro"),
            ("Juan".to_string(), "Carlos Navarro".to_string())
        );
        assert_eq!(split_name("Nene"), (String::new(), "Nene".to_string()));
        assert_eq!(split_name(""), (String::new(), String::new()));
    }
}
