//! Pure transforms for the European competition feeds: XML for teams,
//! players and schedules, live JSON for box scores and play-by-play.
//!
//! Game external ids combine the season code with the gamecode
//! (`E2024_5`); season names are normalized to `YYYY-YY` with the provider
//! code preserved in `source_id`.

use chrono::{NaiveDate, Utc};
use serde_json::Value;
use std::collections::HashMap;

use crate::error::SourceError;
use crate::euroleague::client::SOURCE;
use crate::parse::{
    parse_birth_date, parse_game_datetime, parse_height_cm, parse_minutes_to_seconds,
    season_name_from_start_year, try_parse_datetime,
};
use crate::pbp::infer_links;
use crate::types::{
    EventType, GameStatus, RawBoxScore, RawGame, RawPBPEvent, RawPlayerInfo, RawPlayerStats,
    RawSeason, RawTeam,
};

fn parse_error(resource_type: &str, resource_id: &str, message: impl Into<String>) -> SourceError {
    SourceError::parse(SOURCE, resource_type, resource_id, message, None)
}

// ---------------------------------------------------------------------------
// Seasons and game ids
// ---------------------------------------------------------------------------

pub fn map_season(season: i32, competition: &str, is_current: bool) -> RawSeason {
    let name = season_name_from_start_year(season);
    RawSeason {
        external_id: name.clone(),
        name,
        source_id: Some(format!("{competition}{season}")),
        // The competition runs October through May.
        start_date: NaiveDate::from_ymd_opt(season, 10, 1),
        end_date: NaiveDate::from_ymd_opt(season + 1, 5, 31),
        is_current,
    }
}

pub fn game_external_id(competition: &str, season: i32, gamecode: i32) -> String {
    format!("{competition}{season}_{gamecode}")
}

/// `E2024_5` -> ("E", 2024, 5).
pub fn parse_game_id(external_id: &str) -> Option<(String, i32, i32)> {
    let (code, gamecode) = external_id.split_once('_')?;
    let gamecode: i32 = gamecode.parse().ok()?;
    let split_at = code.find(|c: char| c.is_ascii_digit())?;
    let (competition, season) = code.split_at(split_at);
    if competition.is_empty() {
        return None;
    }
    Some((competition.to_string(), season.parse().ok()?, gamecode))
}

// ---------------------------------------------------------------------------
// XML feeds
// ---------------------------------------------------------------------------

fn child_text<'a>(node: roxmltree::Node<'a, 'a>, names: &[&str]) -> Option<&'a str> {
    for child in node.children() {
        if !child.is_element() {
            continue;
        }
        let tag = child.tag_name().name();
        if names.iter().any(|n| tag.eq_ignore_ascii_case(n)) {
            let text = child.text().map(str::trim).unwrap_or_default();
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

fn attr_or_child<'a>(node: roxmltree::Node<'a, 'a>, names: &[&str]) -> Option<String> {
    for name in names {
        if let Some(value) = node
            .attributes()
            .find(|a| a.name().eq_ignore_ascii_case(name))
            .map(|a| a.value().trim())
            .filter(|v| !v.is_empty())
        {
            return Some(value.to_string());
        }
    }
    child_text(node, names).map(str::to_string)
}

/// Teams from the `/v1/teams` feed. Both `<club>` and `<team>` element
/// names are in the wild depending on competition and season.
pub fn teams_from_xml(xml: &str, season_code: &str) -> Result<Vec<RawTeam>, SourceError> {
    let doc = roxmltree::Document::parse(xml)
        .map_err(|e| parse_error("teams", season_code, format!("bad XML: {e}")))?;

    let mut teams = Vec::new();
    for node in doc.descendants().filter(|n| {
        n.is_element()
            && (n.tag_name().name().eq_ignore_ascii_case("club")
                || n.tag_name().name().eq_ignore_ascii_case("team"))
    }) {
        let Some(code) = attr_or_child(node, &["code"]) else {
            continue;
        };
        let name = attr_or_child(node, &["name"]).unwrap_or_default();
        if name.is_empty() {
            continue;
        }
        teams.push(RawTeam {
            short_name: attr_or_child(node, &["tvcode", "tv_code"]).or_else(|| Some(code.clone())),
            external_id: code,
            name,
        });
    }

    Ok(teams)
}

/// Roster players embedded in the teams feed, as (team code, player code,
/// player name). Not every season carries rosters; absent is fine.
pub fn rosters_from_xml(
    xml: &str,
    season_code: &str,
) -> Result<Vec<(String, String, String)>, SourceError> {
    let doc = roxmltree::Document::parse(xml)
        .map_err(|e| parse_error("teams", season_code, format!("bad XML: {e}")))?;

    let mut players = Vec::new();
    for club in doc.descendants().filter(|n| {
        n.is_element()
            && (n.tag_name().name().eq_ignore_ascii_case("club")
                || n.tag_name().name().eq_ignore_ascii_case("team"))
    }) {
        let Some(team_code) = attr_or_child(club, &["code"]) else {
            continue;
        };
        for player in club
            .descendants()
            .filter(|n| n.is_element() && n.tag_name().name().eq_ignore_ascii_case("player"))
        {
            let Some(code) = attr_or_child(player, &["code"]) else {
                continue;
            };
            let Some(name) = attr_or_child(player, &["name"]) else {
                continue;
            };
            players.push((team_code.clone(), code, name));
        }
    }

    Ok(players)
}

/// Games from the `/v1/schedules` feed, one `<item>` per game.
pub fn schedule_from_xml(
    xml: &str,
    season: i32,
    competition: &str,
) -> Result<Vec<RawGame>, SourceError> {
    let season_code = format!("{competition}{season}");
    let doc = roxmltree::Document::parse(xml)
        .map_err(|e| parse_error("schedule", &season_code, format!("bad XML: {e}")))?;

    let mut games = Vec::new();
    for item in doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name().eq_ignore_ascii_case("item"))
    {
        let Some(gamecode) = attr_or_child(item, &["gamecode", "game", "gamenumber"])
            .and_then(|g| g.parse::<i32>().ok())
        else {
            continue;
        };

        let home_score = attr_or_child(item, &["homescore"]).and_then(|s| s.parse().ok());
        let away_score = attr_or_child(item, &["awayscore"]).and_then(|s| s.parse().ok());
        let played = attr_or_child(item, &["played"])
            .map(|p| matches!(p.to_lowercase().as_str(), "true" | "1"))
            .unwrap_or(false);

        let status = match (home_score, away_score) {
            (Some(_), Some(_)) if played => GameStatus::Final,
            (Some(h), Some(a)) if h > 0 || a > 0 => GameStatus::Final,
            _ => GameStatus::Scheduled,
        };

        let date = attr_or_child(item, &["date"]).unwrap_or_default();

        games.push(RawGame {
            external_id: game_external_id(competition, season, gamecode),
            home_team_external_id: attr_or_child(item, &["homecode", "codeteama"])
                .unwrap_or_default(),
            away_team_external_id: attr_or_child(item, &["awaycode", "codeteamb"])
                .unwrap_or_default(),
            game_date: parse_game_datetime(&date),
            status,
            home_score,
            away_score,
        });
    }

    Ok(games)
}

/// One player's biography from the `/v1/players` feed. Names arrive as
/// `LASTNAME, FIRSTNAME`; heights in meters.
pub fn player_from_xml(xml: &str, player_code: &str) -> Result<RawPlayerInfo, SourceError> {
    let doc = roxmltree::Document::parse(xml)
        .map_err(|e| parse_error("player", player_code, format!("bad XML: {e}")))?;

    let player = doc
        .descendants()
        .find(|n| n.is_element() && n.tag_name().name().eq_ignore_ascii_case("player"))
        .ok_or_else(|| parse_error("player", player_code, "no <player> element"))?;

    let name = attr_or_child(player, &["name"]).unwrap_or_default();
    let (first_name, last_name) = split_comma_name(&name);

    Ok(RawPlayerInfo {
        external_id: attr_or_child(player, &["code", "player_code"])
            .unwrap_or_else(|| player_code.to_string()),
        first_name,
        last_name,
        birth_date: attr_or_child(player, &["birthdate", "birth_date"])
            .as_deref()
            .and_then(parse_birth_date),
        height_cm: attr_or_child(player, &["height"])
            .as_deref()
            .and_then(parse_height_cm),
        position: attr_or_child(player, &["position"]),
        nationality: attr_or_child(player, &["country", "nationality"]),
    })
}

/// `"JAMES, LEBRON"` -> ("LEBRON", "JAMES"); a plain name splits on the
/// first space instead.
pub fn split_comma_name(name: &str) -> (String, String) {
    if let Some((last, first)) = name.split_once(',') {
        (first.trim().to_string(), last.trim().to_string())
    } else {
        crate::dedup::split_name(name)
    }
}

// ---------------------------------------------------------------------------
// Live JSON: box score
// ---------------------------------------------------------------------------

/// Box score from the live `Boxscore` endpoint: `Stats` carries one entry
/// per team (home first), scores come from the `ByQuarter` totals.
pub fn map_boxscore_from_live(
    data: &Value,
    season: i32,
    gamecode: i32,
    competition: &str,
) -> Result<RawBoxScore, SourceError> {
    let external_id = game_external_id(competition, season, gamecode);

    let stats = data
        .get("Stats")
        .and_then(Value::as_array)
        .ok_or_else(|| parse_error("boxscore", &external_id, "missing Stats array"))?;
    if stats.len() < 2 {
        return Err(parse_error(
            "boxscore",
            &external_id,
            format!("expected 2 team entries in Stats, got {}", stats.len()),
        ));
    }

    let home_players = players_of(&stats[0]);
    let away_players = players_of(&stats[1]);

    let home_team_code = home_players
        .first()
        .map(|p| p.team_external_id.clone())
        .unwrap_or_default();
    let away_team_code = away_players
        .first()
        .map(|p| p.team_external_id.clone())
        .unwrap_or_default();

    let (home_score, away_score) = quarter_totals(data);
    let live = data.get("Live").and_then(Value::as_bool).unwrap_or(true);

    let game = RawGame {
        external_id,
        home_team_external_id: home_team_code,
        away_team_external_id: away_team_code,
        // The live payload has no date; the Header endpoint supplies one.
        game_date: Utc::now(),
        status: if live { GameStatus::Live } else { GameStatus::Final },
        home_score,
        away_score,
    };

    Ok(RawBoxScore {
        game,
        home_players,
        away_players,
    })
}

fn players_of(team_stats: &Value) -> Vec<RawPlayerStats> {
    team_stats
        .get("PlayersStats")
        .and_then(Value::as_array)
        .map(|players| players.iter().map(map_live_player_stats).collect())
        .unwrap_or_default()
}

fn quarter_totals(data: &Value) -> (Option<i32>, Option<i32>) {
    let Some(by_quarter) = data.get("ByQuarter").and_then(Value::as_array) else {
        return (None, None);
    };
    if by_quarter.len() < 2 {
        return (None, None);
    }
    let total = |row: &Value| -> Option<i32> {
        let mut sum = 0;
        let mut any = false;
        for quarter in 1..=4 {
            if let Some(points) = row
                .get(format!("Quarter{quarter}"))
                .and_then(Value::as_i64)
            {
                sum += points as i32;
                any = true;
            }
        }
        // Overtime rides in a fifth key on some payloads.
        if let Some(extra) = row.get("Extra").and_then(Value::as_i64) {
            sum += extra as i32;
        }
        any.then_some(sum)
    };
    (total(&by_quarter[0]), total(&by_quarter[1]))
}

fn int_of(record: &Value, key: &str) -> i32 {
    match record.get(key) {
        Some(Value::Number(n)) => n.as_i64().unwrap_or(0) as i32,
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn str_of(record: &Value, key: &str) -> String {
    match record.get(key) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

pub fn map_live_player_stats(record: &Value) -> RawPlayerStats {
    let fg2m = int_of(record, "FieldGoalsMade2");
    let fg2a = int_of(record, "FieldGoalsAttempted2");
    let fg3m = int_of(record, "FieldGoalsMade3");
    let fg3a = int_of(record, "FieldGoalsAttempted3");

    RawPlayerStats {
        player_external_id: str_of(record, "Player_ID"),
        player_name: str_of(record, "Player"),
        team_external_id: str_of(record, "Team"),
        minutes_played: parse_minutes_to_seconds(&str_of(record, "Minutes")),
        is_starter: int_of(record, "IsStarter") != 0,
        points: int_of(record, "Points"),
        two_pointers_made: fg2m,
        two_pointers_attempted: fg2a,
        three_pointers_made: fg3m,
        three_pointers_attempted: fg3a,
        free_throws_made: int_of(record, "FreeThrowsMade"),
        free_throws_attempted: int_of(record, "FreeThrowsAttempted"),
        offensive_rebounds: int_of(record, "OffensiveRebounds"),
        defensive_rebounds: int_of(record, "DefensiveRebounds"),
        total_rebounds: int_of(record, "TotalRebounds"),
        assists: int_of(record, "Assistances"),
        turnovers: int_of(record, "Turnovers"),
        steals: int_of(record, "Steals"),
        blocks: int_of(record, "BlocksFavour"),
        personal_fouls: int_of(record, "FoulsCommited"),
        plus_minus: int_of(record, "Plusminus"),
        efficiency: int_of(record, "Valuation"),
    }
}

// ---------------------------------------------------------------------------
// Live JSON: play-by-play
// ---------------------------------------------------------------------------

/// The live feed splits events by quarter; stitch them in order, assign
/// dense event numbers, and run link inference over the whole game.
/// ("ForthQuarter" is the feed's own spelling; both are accepted.)
const QUARTER_KEYS: &[(&[&str], i32)] = &[
    (&["FirstQuarter"], 1),
    (&["SecondQuarter"], 2),
    (&["ThirdQuarter"], 3),
    (&["FourthQuarter", "ForthQuarter"], 4),
    (&["ExtraTime"], 5),
];

pub fn map_pbp_from_live(data: &Value) -> Vec<RawPBPEvent> {
    let mut events = Vec::new();
    let mut event_number = 1;

    for (keys, period) in QUARTER_KEYS {
        let quarter_events = keys
            .iter()
            .find_map(|key| data.get(*key).and_then(Value::as_array));
        let Some(quarter_events) = quarter_events else {
            continue;
        };
        for record in quarter_events {
            events.push(map_live_pbp_event(record, event_number, *period));
            event_number += 1;
        }
    }

    infer_links(&mut events);
    events
}

fn map_live_pbp_event(record: &Value, event_number: i32, period: i32) -> RawPBPEvent {
    let play_type = {
        let p = str_of(record, "PLAYTYPE");
        if p.is_empty() { str_of(record, "playtype") } else { p }
    };

    let (event_type, subtype, success) = classify_play_type(play_type.trim());

    let period = match record.get("PERIOD").or_else(|| record.get("period")) {
        Some(Value::Number(n)) => n.as_i64().map(|n| n as i32).unwrap_or(period),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(period),
        _ => period,
    };

    let mut event = RawPBPEvent::new(
        event_number,
        period.max(1),
        pick_str(record, &["MARKERTIME", "markertime"]),
        event_type,
    );
    event.event_subtype = subtype;
    event.success = success;

    let player_id = pick_str(record, &["PLAYER_ID", "player_id"]);
    event.player_external_id = (!player_id.is_empty()).then_some(player_id);

    let player_name = pick_str(record, &["PLAYERNAME", "playername", "PLAYER", "player"]);
    event.player_name = (!player_name.is_empty()).then_some(player_name);

    let team = pick_str(record, &["TEAM", "team", "CODETEAM", "codeteam"]);
    event.team_external_id = (!team.is_empty()).then_some(team);

    event.coord_x = pick_float(record, &["COORD_X", "coord_x"]);
    event.coord_y = pick_float(record, &["COORD_Y", "coord_y"]);
    event
}

fn pick_str(record: &Value, keys: &[&str]) -> String {
    for key in keys {
        let value = str_of(record, key);
        if !value.is_empty() {
            return value;
        }
    }
    String::new()
}

fn pick_float(record: &Value, keys: &[&str]) -> Option<f64> {
    for key in keys {
        match record.get(*key) {
            Some(Value::Number(n)) => return n.as_f64(),
            Some(Value::String(s)) => {
                if let Ok(f) = s.trim().parse() {
                    return Some(f);
                }
            }
            _ => {}
        }
    }
    None
}

/// Provider play codes to canonical types. Made/attempted shot codes carry
/// the success flag; rebound, foul and substitution flavors land in the
/// subtype.
fn classify_play_type(code: &str) -> (EventType, Option<String>, Option<bool>) {
    match code {
        "2FGM" => (EventType::Shot, Some("2pt".into()), Some(true)),
        "2FGA" => (EventType::Shot, Some("2pt".into()), Some(false)),
        "3FGM" => (EventType::Shot, Some("3pt".into()), Some(true)),
        "3FGA" => (EventType::Shot, Some("3pt".into()), Some(false)),
        "FTM" => (EventType::FreeThrow, None, Some(true)),
        "FTA" => (EventType::FreeThrow, None, Some(false)),
        "O" => (EventType::Rebound, Some("offensive".into()), None),
        "D" => (EventType::Rebound, Some("defensive".into()), None),
        "AS" => (EventType::Assist, None, None),
        "TO" => (EventType::Turnover, None, None),
        "ST" => (EventType::Steal, None, None),
        "FV" => (EventType::Block, None, None),
        "AG" => (EventType::Block, Some("against".into()), None),
        "CM" => (EventType::Foul, Some("committed".into()), None),
        "RV" => (EventType::Foul, Some("received".into()), None),
        "BP" => (EventType::BeginPeriod, None, None),
        "EP" => (EventType::EndPeriod, None, None),
        "TPOFF" => (EventType::TipOff, None, None),
        "IN" => (EventType::Substitution, Some("in".into()), None),
        "OUT" => (EventType::Substitution, Some("out".into()), None),
        other => (EventType::Other(other.to_lowercase()), None, None),
    }
}

/// Tip-off date from the `Header` endpoint, when available.
pub fn game_date_from_header(data: &Value) -> Option<chrono::DateTime<Utc>> {
    let date = str_of(data, "Date");
    if date.is_empty() {
        return None;
    }
    try_parse_datetime(&date)
}

/// The jersey map for PBP resolution; the live feed's `Dorsal` field pairs
/// each player id with a jersey number.
pub fn jerseys_from_live_boxscore(data: &Value) -> HashMap<String, String> {
    let mut jerseys = HashMap::new();
    let Some(stats) = data.get("Stats").and_then(Value::as_array) else {
        return jerseys;
    };
    for team in stats {
        let Some(players) = team.get("PlayersStats").and_then(Value::as_array) else {
            continue;
        };
        for player in players {
            let id = str_of(player, "Player_ID");
            let dorsal = str_of(player, "Dorsal");
            if !id.is_empty() && !dorsal.is_empty() {
                jerseys.insert(id, dorsal);
            }
        }
    }
    jerseys
}

/// The current season is the newest configured year.
pub fn current_season(seasons: &[i32]) -> Option<i32> {
    seasons.iter().copied().max()
}

/// A season still in progress today (October through June spill-over).
pub fn season_is_current(season: i32) -> bool {
    let today = Utc::now().date_naive();
    let start = NaiveDate::from_ymd_opt(season, 10, 1);
    let end = NaiveDate::from_ymd_opt(season + 1, 7, 1);
    match (start, end) {
        (Some(start), Some(end)) => today >= start && today < end,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn season_normalization() {
        let season = map_season(2024, "E", true);
        assert_eq!(season.name, "2024-25");
        assert_eq!(season.external_id, "2024-25");
        assert_eq!(season.source_id.as_deref(), Some("E2024"));
        assert_eq!(
            season.start_date,
            NaiveDate::from_ymd_opt(2024, 10, 1)
        );
        assert_eq!(season.end_date, NaiveDate::from_ymd_opt(2025, 5, 31));

        let season = map_season(1999, "E", false);
        assert_eq!(season.name, "1999-00");
        assert_eq!(season.source_id.as_deref(), Some("E1999"));
    }

    #[test]
    fn game_id_round_trip() {
        let id = game_external_id("E", 2024, 5);
        assert_eq!(id, "E2024_5");
        assert_eq!(parse_game_id(&id), Some(("E".to_string(), 2024, 5)));
        assert_eq!(parse_game_id("U2023_101"), Some(("U".to_string(), 2023, 101)));
        assert_eq!(parse_game_id("nonsense"), None);
    }

    #[test]
    fn teams_from_xml_clubs() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
            <clubs>
              <club code="MAD"><name>Real Madrid</name><tvcode>RMB</tvcode></club>
              <club code="BAR"><name>FC Barcelona</name></club>
            </clubs>"#;
        let teams = teams_from_xml(xml, "E2024").unwrap();
        assert_eq!(teams.len(), 2);
        assert_eq!(teams[0].external_id, "MAD");
        assert_eq!(teams[0].name, "Real Madrid");
        assert_eq!(teams[0].short_name.as_deref(), Some("RMB"));
        assert_eq!(teams[1].short_name.as_deref(), Some("BAR"));
    }

    #[test]
    fn schedule_from_xml_items() {
        let xml = r#"<schedule>
              <item>
                <gamecode>5</gamecode>
                <date>Oct 03, 2024</date>
                <homecode>MAD</homecode><hometeam>Real Madrid</hometeam>
                <awaycode>BAR</awaycode><awayteam>FC Barcelona</awayteam>
                <homescore>93</homescore><awayscore>80</awayscore>
                <played>true</played>
              </item>
              <item>
                <gamecode>6</gamecode>
                <date>Oct 04, 2024</date>
                <homecode>PAN</homecode><awaycode>OLY</awaycode>
                <played>false</played>
              </item>
            </schedule>"#;
        let games = schedule_from_xml(xml, 2024, "E").unwrap();
        assert_eq!(games.len(), 2);
        assert_eq!(games[0].external_id, "E2024_5");
        assert_eq!(games[0].home_team_external_id, "MAD");
        assert_eq!(games[0].status, GameStatus::Final);
        assert_eq!(games[0].home_score, Some(93));
        assert_eq!(games[1].status, GameStatus::Scheduled);
        assert_eq!(games[1].home_score, None);
    }

    #[test]
    fn player_from_xml_biography() {
        let xml = r#"<players>
              <player>
                <code>ABC</code>
                <name>JAMES, LEBRON</name>
                <height>2.06</height>
                <birthdate>1984-12-30</birthdate>
                <position>Forward</position>
                <country>USA</country>
              </player>
            </players>"#;
        let info = player_from_xml(xml, "ABC").unwrap();
        assert_eq!(info.external_id, "ABC");
        assert_eq!(info.first_name, "LEBRON");
        assert_eq!(info.last_name, "JAMES");
        assert_eq!(info.height_cm, Some(206));
        assert_eq!(info.birth_date, NaiveDate::from_ymd_opt(1984, 12, 30));
        assert_eq!(info.position.as_deref(), Some("Forward"));
    }

    #[test]
    fn live_boxscore_with_quarter_totals() {
        let data = json!({
            "Live": false,
            "Stats": [
                { "PlayersStats": [
                    { "Player_ID": "P001", "Player": "SMITH, JOHN", "Team": "MAD",
                      "Dorsal": "7", "Minutes": "25:30", "IsStarter": 1,
                      "Points": 18, "FieldGoalsMade2": 6, "FieldGoalsAttempted2": 9,
                      "FieldGoalsMade3": 2, "FieldGoalsAttempted3": 4,
                      "Assistances": 3, "BlocksFavour": 1, "FoulsCommited": 2,
                      "Valuation": 20, "Plusminus": 5 }
                ]},
                { "PlayersStats": [
                    { "Player_ID": "P002", "Player": "DOE, DAN", "Team": "BAR",
                      "Dorsal": "11", "Minutes": "30:00", "IsStarter": 0, "Points": 12 }
                ]}
            ],
            "ByQuarter": [
                { "Quarter1": 20, "Quarter2": 25, "Quarter3": 18, "Quarter4": 30 },
                { "Quarter1": 22, "Quarter2": 19, "Quarter3": 21, "Quarter4": 18 }
            ]
        });

        let boxscore = map_boxscore_from_live(&data, 2024, 5, "E").unwrap();
        assert_eq!(boxscore.game.external_id, "E2024_5");
        assert_eq!(boxscore.game.status, GameStatus::Final);
        assert_eq!(boxscore.game.home_score, Some(93));
        assert_eq!(boxscore.game.away_score, Some(80));
        assert_eq!(boxscore.game.home_team_external_id, "MAD");

        let player = &boxscore.home_players[0];
        assert_eq!(player.minutes_played, 1530);
        assert!(player.is_starter);
        assert_eq!(player.two_pointers_made, 6);
        assert_eq!(player.efficiency, 20);

        let jerseys = jerseys_from_live_boxscore(&data);
        assert_eq!(jerseys.get("P001").map(String::as_str), Some("7"));
    }

    #[test]
    fn live_pbp_stitches_quarters_densely() {
        let data = json!({
            "FirstQuarter": [
                { "PLAYTYPE": "BP", "MARKERTIME": "10:00" },
                { "PLAYTYPE": "2FGM", "MARKERTIME": "09:45", "TEAM": "MAD",
                  "PLAYER_ID": "P001", "COORD_X": "12.5", "COORD_Y": "-3.0" },
                { "PLAYTYPE": "AS", "MARKERTIME": "09:45", "TEAM": "MAD",
                  "PLAYER_ID": "P003" }
            ],
            "SecondQuarter": [
                { "PLAYTYPE": "3FGA", "MARKERTIME": "08:00", "TEAM": "BAR" },
                { "PLAYTYPE": "D", "MARKERTIME": "07:58", "TEAM": "MAD" }
            ]
        });

        let events = map_pbp_from_live(&data);
        assert_eq!(events.len(), 5);
        assert_eq!(
            events.iter().map(|e| e.event_number).collect::<Vec<_>>(),
            vec![1, 2, 3, 4, 5]
        );
        assert_eq!(events[0].event_type, EventType::BeginPeriod);
        assert_eq!(events[1].success, Some(true));
        assert_eq!(events[1].coord_x, Some(12.5));
        // Assist links to the made shot; rebound links to the miss.
        assert_eq!(events[2].related_event_numbers, Some(vec![2]));
        assert_eq!(events[3].period, 2);
        assert_eq!(events[4].related_event_numbers, Some(vec![4]));
        assert_eq!(events[4].event_subtype.as_deref(), Some("defensive"));
    }

    #[test]
    fn unknown_play_codes_are_preserved() {
        let (kind, subtype, success) = classify_play_type("XYZ");
        assert_eq!(kind, EventType::Other("xyz".to_string()));
        assert_eq!(subtype, None);
        assert_eq!(success, None);
    }
}
