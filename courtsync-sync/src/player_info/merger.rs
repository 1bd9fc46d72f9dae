//! Deterministic field-level merge of player biographies across sources.
//! Sources are ordered by priority; per field, the first source with a
//! usable value wins and is recorded in the provenance map.

use chrono::NaiveDate;
use std::collections::HashMap;
use thiserror::Error;

use crate::types::RawPlayerInfo;

#[derive(Debug, Error, PartialEq)]
#[error("cannot merge an empty sources list")]
pub struct EmptySourcesError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedPlayerInfo {
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Option<NaiveDate>,
    pub height_cm: Option<i32>,
    pub position: Option<String>,
    /// Field name -> the source that supplied the winning value.
    pub sources: HashMap<String, String>,
}

/// Merges biographies in priority order (first source highest). Strings win
/// when non-empty, everything else when non-null; zero is a valid numeric
/// value and beats missing.
pub fn merge_player_info(
    sources: &[(String, RawPlayerInfo)],
) -> Result<MergedPlayerInfo, EmptySourcesError> {
    if sources.is_empty() {
        return Err(EmptySourcesError);
    }

    let mut merged = MergedPlayerInfo::default();

    for (source_name, info) in sources {
        if merged.first_name.is_empty() && !info.first_name.is_empty() {
            merged.first_name = info.first_name.clone();
            merged
                .sources
                .insert("first_name".to_string(), source_name.clone());
        }
        if merged.last_name.is_empty() && !info.last_name.is_empty() {
            merged.last_name = info.last_name.clone();
            merged
                .sources
                .insert("last_name".to_string(), source_name.clone());
        }
        if merged.birth_date.is_none() && info.birth_date.is_some() {
            merged.birth_date = info.birth_date;
            merged
                .sources
                .insert("birth_date".to_string(), source_name.clone());
        }
        if merged.height_cm.is_none() && info.height_cm.is_some() {
            merged.height_cm = info.height_cm;
            merged
                .sources
                .insert("height_cm".to_string(), source_name.clone());
        }
        if merged.position.is_none() && info.position.is_some() {
            merged.position = info.position.clone();
            merged
                .sources
                .insert("position".to_string(), source_name.clone());
        }
    }

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(
        first: &str,
        last: &str,
        height: Option<i32>,
        position: Option<&str>,
    ) -> RawPlayerInfo {
        RawPlayerInfo {
            external_id: "x".to_string(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            height_cm: height,
            position: position.map(str::to_string),
            ..RawPlayerInfo::default()
        }
    }

    #[test]
    fn first_source_wins_per_field() {
        let sources = vec![
            (
                "winner".to_string(),
                info("LeBron", "James", Some(206), None),
            ),
            (
                "euroleague".to_string(),
                info("Lebron", "James", Some(205), Some("SF")),
            ),
        ];

        let merged = merge_player_info(&sources).unwrap();
        assert_eq!(merged.first_name, "LeBron");
        assert_eq!(merged.last_name, "James");
        assert_eq!(merged.height_cm, Some(206));
        assert_eq!(merged.position.as_deref(), Some("SF"));
        assert_eq!(merged.sources["first_name"], "winner");
        assert_eq!(merged.sources["last_name"], "winner");
        assert_eq!(merged.sources["height_cm"], "winner");
        assert_eq!(merged.sources["position"], "euroleague");
    }

    #[test]
    fn empty_strings_fall_through() {
        let sources = vec![
            ("winner".to_string(), info("", "", None, None)),
            ("euroleague".to_string(), info("Dan", "Levi", None, None)),
        ];
        let merged = merge_player_info(&sources).unwrap();
        assert_eq!(merged.first_name, "Dan");
        assert_eq!(merged.sources["first_name"], "euroleague");
    }

    #[test]
    fn zero_is_a_valid_numeric_value() {
        let sources = vec![
            ("winner".to_string(), info("A", "B", Some(0), None)),
            ("euroleague".to_string(), info("A", "B", Some(200), None)),
        ];
        let merged = merge_player_info(&sources).unwrap();
        assert_eq!(merged.height_cm, Some(0));
        assert_eq!(merged.sources["height_cm"], "winner");
    }

    #[test]
    fn merge_is_deterministic() {
        let sources = vec![
            ("winner".to_string(), info("LeBron", "James", Some(206), None)),
            (
                "euroleague".to_string(),
                info("Lebron", "James", Some(205), Some("SF")),
            ),
        ];
        let a = merge_player_info(&sources).unwrap();
        let b = merge_player_info(&sources).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn empty_input_is_a_programming_error() {
        assert_eq!(merge_player_info(&[]), Err(EmptySourcesError));
    }
}
