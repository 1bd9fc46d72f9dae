//! Pure transforms from the league's wire payloads to the canonical types.
//!
//! Two boxscore dialects are in the wild: the legacy flat layout
//! (`{GameId, HomeTeam, AwayTeam}`) and the segevstats JSON-RPC envelope
//! (`{result: {boxscore: {gameInfo, homeTeam, awayTeam}}}`). Selection is
//! structural (envelope presence), never configured. The same split exists
//! for play-by-play (`{Events: [...]}` vs `{result: {gameInfo, actions}}`).

use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

use crate::de;
use crate::error::SourceError;
use crate::parse::{
    parse_game_datetime, parse_minutes_to_seconds, season_name_from_start_year, try_parse_datetime,
};
use crate::pbp::infer_links;
use crate::types::{
    EventType, GameStatus, RawBoxScore, RawGame, RawPBPEvent, RawPlayerInfo, RawPlayerStats,
    RawSeason, RawTeam,
};
use crate::winner::client::SOURCE;
use crate::winner::scraper::{PlayerProfile, RosterPlayer};

fn parse_error(resource_type: &str, resource_id: &str, message: impl Into<String>) -> SourceError {
    SourceError::parse(SOURCE, resource_type, resource_id, message, None)
}

// ---------------------------------------------------------------------------
// Schedule (games_all)
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GamesAllPayload {
    #[serde(deserialize_with = "de::opt_string")]
    pub season: Option<String>,
    pub games: Vec<ScheduleGame>,
}

/// One schedule row. The current API and the legacy API use different field
/// names for the same concepts; both are kept and precedence is applied in
/// the accessors (current first).
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ScheduleGame {
    #[serde(rename = "ExternalID", deserialize_with = "de::opt_id")]
    pub external_id: Option<String>,
    #[serde(rename = "GameId", deserialize_with = "de::opt_id")]
    pub legacy_game_id: Option<String>,

    #[serde(deserialize_with = "de::opt_id")]
    pub team1: Option<String>,
    #[serde(deserialize_with = "de::opt_id")]
    pub team2: Option<String>,
    #[serde(rename = "HomeTeamId", deserialize_with = "de::opt_id")]
    pub legacy_home_team_id: Option<String>,
    #[serde(rename = "AwayTeamId", deserialize_with = "de::opt_id")]
    pub legacy_away_team_id: Option<String>,

    #[serde(deserialize_with = "de::opt_string")]
    pub team_name_1: Option<String>,
    #[serde(deserialize_with = "de::opt_string")]
    pub team_name_2: Option<String>,
    #[serde(deserialize_with = "de::opt_string")]
    pub team_name_eng_1: Option<String>,
    #[serde(deserialize_with = "de::opt_string")]
    pub team_name_eng_2: Option<String>,
    #[serde(rename = "HomeTeamName", deserialize_with = "de::opt_string")]
    pub legacy_home_team_name: Option<String>,
    #[serde(rename = "AwayTeamName", deserialize_with = "de::opt_string")]
    pub legacy_away_team_name: Option<String>,

    #[serde(deserialize_with = "de::opt_int")]
    pub score_team1: Option<i32>,
    #[serde(deserialize_with = "de::opt_int")]
    pub score_team2: Option<i32>,
    #[serde(rename = "HomeScore", deserialize_with = "de::opt_int")]
    pub legacy_home_score: Option<i32>,
    #[serde(rename = "AwayScore", deserialize_with = "de::opt_int")]
    pub legacy_away_score: Option<i32>,

    #[serde(deserialize_with = "de::opt_string")]
    pub game_date_txt: Option<String>,
    #[serde(rename = "GameDate", deserialize_with = "de::opt_string")]
    pub legacy_game_date: Option<String>,

    #[serde(rename = "Status", deserialize_with = "de::opt_string")]
    pub status: Option<String>,
    #[serde(deserialize_with = "de::opt_int")]
    pub game_year: Option<i32>,
}

impl ScheduleGame {
    fn game_id(&self) -> Option<&str> {
        self.external_id.as_deref().or(self.legacy_game_id.as_deref())
    }

    fn home_team_id(&self) -> Option<&str> {
        self.team1.as_deref().or(self.legacy_home_team_id.as_deref())
    }

    fn away_team_id(&self) -> Option<&str> {
        self.team2.as_deref().or(self.legacy_away_team_id.as_deref())
    }

    /// Team names prefer the explicit English field over the localized one.
    fn home_team_name(&self) -> &str {
        self.team_name_eng_1
            .as_deref()
            .or(self.team_name_1.as_deref())
            .or(self.legacy_home_team_name.as_deref())
            .unwrap_or_default()
    }

    fn away_team_name(&self) -> &str {
        self.team_name_eng_2
            .as_deref()
            .or(self.team_name_2.as_deref())
            .or(self.legacy_away_team_name.as_deref())
            .unwrap_or_default()
    }

    fn home_score(&self) -> Option<i32> {
        self.score_team1.or(self.legacy_home_score)
    }

    fn away_score(&self) -> Option<i32> {
        self.score_team2.or(self.legacy_away_score)
    }

    fn date_str(&self) -> &str {
        self.game_date_txt
            .as_deref()
            .or(self.legacy_game_date.as_deref())
            .unwrap_or_default()
    }
}

/// A season's games. The API occasionally wraps the object in a one-element
/// list; unwrap structurally.
pub fn parse_games_all(data: &Value) -> Result<GamesAllPayload, SourceError> {
    let data = match data {
        Value::Array(items) if !items.is_empty() => &items[0],
        other => other,
    };
    serde_json::from_value(data.clone())
        .map_err(|e| parse_error("games_all", "current", format!("bad schedule payload: {e}")))
}

/// Score-based status derivation. An explicit `live` wins (partial scores
/// are moving); otherwise present-and-nonzero scores mean final regardless
/// of what the provider's status field claims. 0-0 is an unplayed game.
fn derive_status(explicit: Option<&str>, home: Option<i32>, away: Option<i32>) -> GameStatus {
    let explicit: Option<GameStatus> = explicit.and_then(|s| s.to_lowercase().parse().ok());
    if explicit == Some(GameStatus::Live) {
        return GameStatus::Live;
    }
    match (home, away) {
        (Some(h), Some(a)) if h > 0 || a > 0 => GameStatus::Final,
        _ => explicit.unwrap_or(GameStatus::Scheduled),
    }
}

pub fn map_game(game: &ScheduleGame) -> RawGame {
    let home_score = game.home_score();
    let away_score = game.away_score();
    RawGame {
        external_id: game.game_id().unwrap_or_default().to_string(),
        home_team_external_id: game.home_team_id().unwrap_or_default().to_string(),
        away_team_external_id: game.away_team_id().unwrap_or_default().to_string(),
        game_date: parse_game_datetime(game.date_str()),
        status: derive_status(game.status.as_deref(), home_score, away_score),
        home_score,
        away_score,
    }
}

pub fn map_schedule(payload: &GamesAllPayload) -> Vec<RawGame> {
    payload.games.iter().map(map_game).collect()
}

/// The schedule response lists games but not teams; accumulate the distinct
/// teams across all games. Never emits a team with an empty external id.
pub fn extract_teams_from_games(payload: &GamesAllPayload) -> Vec<RawTeam> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut teams = Vec::new();

    for game in &payload.games {
        for (id, name) in [
            (game.home_team_id(), game.home_team_name()),
            (game.away_team_id(), game.away_team_name()),
        ] {
            let Some(id) = id else { continue };
            if seen.insert(id) {
                teams.push(RawTeam {
                    external_id: id.to_string(),
                    name: name.to_string(),
                    short_name: None,
                });
            }
        }
    }

    teams
}

/// Derives the (single) season the schedule payload covers. The season
/// string is inferred from `game_year` (the season's end year) or from the
/// first game's date when missing; the date range comes from the games.
pub fn map_season(payload: &GamesAllPayload) -> RawSeason {
    let mut name = payload.season.clone().unwrap_or_default();

    if name.is_empty() {
        if let Some(end_year) = payload.games.first().and_then(|g| g.game_year) {
            name = season_name_from_start_year(end_year - 1);
        } else if let Some(date) = payload
            .games
            .first()
            .and_then(|g| try_parse_datetime(g.date_str()))
        {
            use chrono::Datelike;
            // Seasons start in September.
            let start_year = if date.month() >= 9 {
                date.year()
            } else {
                date.year() - 1
            };
            name = season_name_from_start_year(start_year);
        }
    }

    let mut dates: Vec<_> = payload
        .games
        .iter()
        .filter_map(|g| try_parse_datetime(g.date_str()))
        .map(|d| d.date_naive())
        .collect();
    dates.sort_unstable();

    RawSeason {
        external_id: name.clone(),
        name,
        source_id: None,
        start_date: dates.first().copied(),
        end_date: dates.last().copied(),
        is_current: true,
    }
}

// ---------------------------------------------------------------------------
// Box score
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SegevEnvelope {
    result: SegevResult,
}

#[derive(Debug, Deserialize)]
struct SegevResult {
    boxscore: SegevBoxscore,
}

#[derive(Debug, Deserialize)]
struct SegevBoxscore {
    #[serde(rename = "gameInfo", default)]
    game_info: SegevGameInfo,
    #[serde(rename = "homeTeam", default)]
    home_team: SegevTeam,
    #[serde(rename = "awayTeam", default)]
    away_team: SegevTeam,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SegevGameInfo {
    #[serde(rename = "gameId", deserialize_with = "de::opt_id")]
    game_id: Option<String>,
    #[serde(rename = "homeTeamId", deserialize_with = "de::opt_id")]
    home_team_id: Option<String>,
    #[serde(rename = "awayTeamId", deserialize_with = "de::opt_id")]
    away_team_id: Option<String>,
    #[serde(rename = "homeScore", deserialize_with = "de::opt_int")]
    home_score: Option<i32>,
    #[serde(rename = "awayScore", deserialize_with = "de::opt_int")]
    away_score: Option<i32>,
    #[serde(rename = "gameFinished", deserialize_with = "de::opt_bool")]
    game_finished: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SegevTeam {
    players: Vec<SegevPlayer>,
}

/// segevstats serializes every stat as a string; made/missed pairs arrive
/// separately and attempts are computed.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SegevPlayer {
    #[serde(rename = "playerId", deserialize_with = "de::opt_id")]
    player_id: Option<String>,
    #[serde(deserialize_with = "de::opt_string")]
    minutes: Option<String>,
    #[serde(deserialize_with = "de::opt_bool")]
    starter: Option<bool>,
    #[serde(deserialize_with = "de::opt_int")]
    points: Option<i32>,
    #[serde(deserialize_with = "de::opt_int")]
    fg_2m: Option<i32>,
    #[serde(deserialize_with = "de::opt_int")]
    fg_2mis: Option<i32>,
    #[serde(deserialize_with = "de::opt_int")]
    fg_3m: Option<i32>,
    #[serde(deserialize_with = "de::opt_int")]
    fg_3mis: Option<i32>,
    #[serde(deserialize_with = "de::opt_int")]
    ft_m: Option<i32>,
    #[serde(deserialize_with = "de::opt_int")]
    ft_mis: Option<i32>,
    #[serde(deserialize_with = "de::opt_int")]
    reb_o: Option<i32>,
    #[serde(deserialize_with = "de::opt_int")]
    reb_d: Option<i32>,
    #[serde(deserialize_with = "de::opt_int")]
    ast: Option<i32>,
    #[serde(deserialize_with = "de::opt_int")]
    stl: Option<i32>,
    #[serde(deserialize_with = "de::opt_int")]
    blk: Option<i32>,
    #[serde(deserialize_with = "de::opt_int")]
    to: Option<i32>,
    #[serde(deserialize_with = "de::opt_int")]
    f: Option<i32>,
    #[serde(rename = "plusMinus", deserialize_with = "de::opt_int")]
    plus_minus: Option<i32>,
    #[serde(deserialize_with = "de::opt_int")]
    rate: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FlatBoxscore {
    #[serde(rename = "GameId", deserialize_with = "de::opt_id")]
    game_id: Option<String>,
    #[serde(rename = "GameDate", deserialize_with = "de::opt_string")]
    game_date: Option<String>,
    #[serde(rename = "HomeTeam", default)]
    home_team: FlatTeam,
    #[serde(rename = "AwayTeam", default)]
    away_team: FlatTeam,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FlatTeam {
    #[serde(rename = "TeamId", deserialize_with = "de::opt_id")]
    team_id: Option<String>,
    #[serde(rename = "Score", deserialize_with = "de::opt_int")]
    score: Option<i32>,
    #[serde(rename = "Players")]
    players: Vec<FlatPlayer>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FlatPlayer {
    #[serde(rename = "PlayerId", deserialize_with = "de::opt_id")]
    player_id: Option<String>,
    #[serde(rename = "Name", deserialize_with = "de::opt_string")]
    name: Option<String>,
    #[serde(rename = "Minutes", deserialize_with = "de::opt_string")]
    minutes: Option<String>,
    #[serde(rename = "IsStarter", deserialize_with = "de::opt_bool")]
    is_starter: Option<bool>,
    #[serde(rename = "Points", deserialize_with = "de::opt_int")]
    points: Option<i32>,
    #[serde(rename = "FGM", deserialize_with = "de::opt_int")]
    fgm: Option<i32>,
    #[serde(rename = "FGA", deserialize_with = "de::opt_int")]
    fga: Option<i32>,
    #[serde(rename = "ThreePM", deserialize_with = "de::opt_int")]
    three_pm: Option<i32>,
    #[serde(rename = "ThreePA", deserialize_with = "de::opt_int")]
    three_pa: Option<i32>,
    #[serde(rename = "FTM", deserialize_with = "de::opt_int")]
    ftm: Option<i32>,
    #[serde(rename = "FTA", deserialize_with = "de::opt_int")]
    fta: Option<i32>,
    #[serde(rename = "OffReb", deserialize_with = "de::opt_int")]
    off_reb: Option<i32>,
    #[serde(rename = "DefReb", deserialize_with = "de::opt_int")]
    def_reb: Option<i32>,
    #[serde(rename = "Rebounds", deserialize_with = "de::opt_int")]
    rebounds: Option<i32>,
    #[serde(rename = "Assists", deserialize_with = "de::opt_int")]
    assists: Option<i32>,
    #[serde(rename = "Turnovers", deserialize_with = "de::opt_int")]
    turnovers: Option<i32>,
    #[serde(rename = "Steals", deserialize_with = "de::opt_int")]
    steals: Option<i32>,
    #[serde(rename = "Blocks", deserialize_with = "de::opt_int")]
    blocks: Option<i32>,
    #[serde(rename = "Fouls", deserialize_with = "de::opt_int")]
    fouls: Option<i32>,
    #[serde(rename = "PlusMinus", deserialize_with = "de::opt_int")]
    plus_minus: Option<i32>,
    #[serde(rename = "Efficiency", deserialize_with = "de::opt_int")]
    efficiency: Option<i32>,
}

pub fn map_boxscore(data: &Value, game_id: &str) -> Result<RawBoxScore, SourceError> {
    if data.get("result").is_some_and(Value::is_object) {
        map_segev_boxscore(data, game_id)
    } else {
        map_flat_boxscore(data, game_id)
    }
}

fn map_segev_boxscore(data: &Value, game_id: &str) -> Result<RawBoxScore, SourceError> {
    let envelope: SegevEnvelope = serde_json::from_value(data.clone())
        .map_err(|e| parse_error("boxscore", game_id, format!("bad segevstats payload: {e}")))?;
    let boxscore = envelope.result.boxscore;
    let info = boxscore.game_info;

    let home_team_id = info.home_team_id.unwrap_or_default();
    let away_team_id = info.away_team_id.unwrap_or_default();

    let game = RawGame {
        external_id: info.game_id.unwrap_or_else(|| game_id.to_string()),
        home_team_external_id: home_team_id.clone(),
        away_team_external_id: away_team_id.clone(),
        // The realtime boxscore carries no date; the schedule row does.
        game_date: Utc::now(),
        status: if info.game_finished.unwrap_or(false) {
            GameStatus::Final
        } else {
            GameStatus::Live
        },
        home_score: info.home_score,
        away_score: info.away_score,
    };

    Ok(RawBoxScore {
        home_players: boxscore
            .home_team
            .players
            .iter()
            .map(|p| map_segev_player(p, &home_team_id))
            .collect(),
        away_players: boxscore
            .away_team
            .players
            .iter()
            .map(|p| map_segev_player(p, &away_team_id))
            .collect(),
        game,
    })
}

fn map_segev_player(player: &SegevPlayer, team_id: &str) -> RawPlayerStats {
    let fg_2m = player.fg_2m.unwrap_or(0);
    let fg_2mis = player.fg_2mis.unwrap_or(0);
    let fg_3m = player.fg_3m.unwrap_or(0);
    let fg_3mis = player.fg_3mis.unwrap_or(0);
    let ft_m = player.ft_m.unwrap_or(0);
    let ft_mis = player.ft_mis.unwrap_or(0);
    let reb_o = player.reb_o.unwrap_or(0);
    let reb_d = player.reb_d.unwrap_or(0);

    RawPlayerStats {
        player_external_id: player.player_id.clone().unwrap_or_default(),
        // Names are not present in the segevstats boxscore; the
        // deduplicator resolves through external ids instead.
        player_name: String::new(),
        team_external_id: team_id.to_string(),
        minutes_played: parse_minutes_to_seconds(player.minutes.as_deref().unwrap_or_default()),
        is_starter: player.starter.unwrap_or(false),
        points: player.points.unwrap_or(0),
        two_pointers_made: fg_2m,
        two_pointers_attempted: fg_2m + fg_2mis,
        three_pointers_made: fg_3m,
        three_pointers_attempted: fg_3m + fg_3mis,
        free_throws_made: ft_m,
        free_throws_attempted: ft_m + ft_mis,
        offensive_rebounds: reb_o,
        defensive_rebounds: reb_d,
        total_rebounds: reb_o + reb_d,
        assists: player.ast.unwrap_or(0),
        turnovers: player.to.unwrap_or(0),
        steals: player.stl.unwrap_or(0),
        blocks: player.blk.unwrap_or(0),
        personal_fouls: player.f.unwrap_or(0),
        plus_minus: player.plus_minus.unwrap_or(0),
        efficiency: player.rate.unwrap_or(0),
    }
}

fn map_flat_boxscore(data: &Value, game_id: &str) -> Result<RawBoxScore, SourceError> {
    let flat: FlatBoxscore = serde_json::from_value(data.clone())
        .map_err(|e| parse_error("boxscore", game_id, format!("bad boxscore payload: {e}")))?;

    let home_team_id = flat.home_team.team_id.clone().unwrap_or_default();
    let away_team_id = flat.away_team.team_id.clone().unwrap_or_default();
    let home_score = flat.home_team.score;
    let away_score = flat.away_team.score;

    let game = RawGame {
        external_id: flat.game_id.clone().unwrap_or_else(|| game_id.to_string()),
        home_team_external_id: home_team_id.clone(),
        away_team_external_id: away_team_id.clone(),
        game_date: parse_game_datetime(flat.game_date.as_deref().unwrap_or_default()),
        status: if home_score.is_some() && away_score.is_some() {
            GameStatus::Final
        } else {
            GameStatus::Scheduled
        },
        home_score,
        away_score,
    };

    Ok(RawBoxScore {
        home_players: flat
            .home_team
            .players
            .iter()
            .map(|p| map_flat_player(p, &home_team_id))
            .collect(),
        away_players: flat
            .away_team
            .players
            .iter()
            .map(|p| map_flat_player(p, &away_team_id))
            .collect(),
        game,
    })
}

fn map_flat_player(player: &FlatPlayer, team_id: &str) -> RawPlayerStats {
    let fgm = player.fgm.unwrap_or(0);
    let fga = player.fga.unwrap_or(0);
    let three_pm = player.three_pm.unwrap_or(0);
    let three_pa = player.three_pa.unwrap_or(0);

    RawPlayerStats {
        player_external_id: player.player_id.clone().unwrap_or_default(),
        player_name: player.name.clone().unwrap_or_default(),
        team_external_id: team_id.to_string(),
        minutes_played: parse_minutes_to_seconds(player.minutes.as_deref().unwrap_or_default()),
        is_starter: player.is_starter.unwrap_or(false),
        points: player.points.unwrap_or(0),
        two_pointers_made: (fgm - three_pm).max(0),
        two_pointers_attempted: (fga - three_pa).max(0),
        three_pointers_made: three_pm,
        three_pointers_attempted: three_pa,
        free_throws_made: player.ftm.unwrap_or(0),
        free_throws_attempted: player.fta.unwrap_or(0),
        offensive_rebounds: player.off_reb.unwrap_or(0),
        defensive_rebounds: player.def_reb.unwrap_or(0),
        total_rebounds: player.rebounds.unwrap_or(0),
        assists: player.assists.unwrap_or(0),
        turnovers: player.turnovers.unwrap_or(0),
        steals: player.steals.unwrap_or(0),
        blocks: player.blocks.unwrap_or(0),
        personal_fouls: player.fouls.unwrap_or(0),
        plus_minus: player.plus_minus.unwrap_or(0),
        efficiency: player.efficiency.unwrap_or(0),
    }
}

/// Box score scraped from the game-zone page, used when the realtime
/// endpoint has nothing for a (usually historical) game. The page carries
/// team names but not ids; the schedule row supplies the identity.
pub fn map_game_zone_boxscore(
    zone: &crate::winner::scraper::GameZoneBoxscore,
    schedule_game: &RawGame,
) -> RawBoxScore {
    let map_rows = |rows: &[crate::winner::scraper::BoxscorePlayerRow], team_id: &str| {
        rows.iter()
            .map(|row| RawPlayerStats {
                player_external_id: row.player_id.clone().unwrap_or_default(),
                player_name: row.player_name.clone(),
                team_external_id: team_id.to_string(),
                minutes_played: parse_minutes_to_seconds(
                    row.minutes.as_deref().unwrap_or_default(),
                ),
                is_starter: false,
                points: row.points,
                two_pointers_made: row.two_pt_made,
                two_pointers_attempted: row.two_pt_attempted,
                three_pointers_made: row.three_pt_made,
                three_pointers_attempted: row.three_pt_attempted,
                free_throws_made: row.ft_made,
                free_throws_attempted: row.ft_attempted,
                offensive_rebounds: row.offensive_rebounds,
                defensive_rebounds: row.defensive_rebounds,
                total_rebounds: row.total_rebounds,
                assists: row.assists,
                turnovers: row.turnovers,
                steals: row.steals,
                blocks: row.blocks,
                personal_fouls: row.fouls,
                plus_minus: 0,
                efficiency: 0,
            })
            .collect()
    };

    RawBoxScore {
        game: schedule_game.clone(),
        home_players: map_rows(&zone.home_players, &schedule_game.home_team_external_id),
        away_players: map_rows(&zone.away_players, &schedule_game.away_team_external_id),
    }
}

// ---------------------------------------------------------------------------
// Play-by-play
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SegevPbpEnvelope {
    result: SegevPbpResult,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SegevPbpResult {
    #[serde(rename = "gameInfo")]
    game_info: SegevPbpGameInfo,
    actions: Vec<SegevAction>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SegevPbpGameInfo {
    #[serde(rename = "homeTeam")]
    home_team: Option<SegevLineup>,
    #[serde(rename = "awayTeam")]
    away_team: Option<SegevLineup>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SegevLineup {
    players: Vec<SegevLineupPlayer>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SegevLineupPlayer {
    #[serde(deserialize_with = "de::opt_id")]
    id: Option<String>,
    #[serde(deserialize_with = "de::opt_string")]
    jersey: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SegevAction {
    #[serde(rename = "type", deserialize_with = "de::opt_string")]
    kind: Option<String>,
    #[serde(deserialize_with = "de::opt_int")]
    quarter: Option<i32>,
    #[serde(rename = "quarterTime", deserialize_with = "de::opt_string")]
    quarter_time: Option<String>,
    #[serde(rename = "playerId", deserialize_with = "de::opt_id")]
    player_id: Option<String>,
    #[serde(rename = "teamId", deserialize_with = "de::opt_id")]
    team_id: Option<String>,
    parameters: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LegacyEvents {
    #[serde(rename = "Events")]
    events: Vec<LegacyEvent>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LegacyEvent {
    #[serde(rename = "EventType", deserialize_with = "de::opt_string")]
    event_type: Option<String>,
    #[serde(rename = "Quarter", deserialize_with = "de::opt_int")]
    quarter: Option<i32>,
    #[serde(rename = "GameClock", deserialize_with = "de::opt_string")]
    game_clock: Option<String>,
    #[serde(rename = "PlayerId", deserialize_with = "de::opt_id")]
    player_id: Option<String>,
    #[serde(rename = "PlayerName", deserialize_with = "de::opt_string")]
    player_name: Option<String>,
    #[serde(rename = "TeamId", deserialize_with = "de::opt_id")]
    team_id: Option<String>,
    #[serde(rename = "CoordX", deserialize_with = "de::opt_float")]
    coord_x: Option<f64>,
    #[serde(rename = "CoordY", deserialize_with = "de::opt_float")]
    coord_y: Option<f64>,
    #[serde(rename = "Description", deserialize_with = "de::opt_string")]
    description: Option<String>,
}

/// Maps either play-by-play dialect into ordered canonical events plus the
/// lineup's player-id -> jersey map (empty for the legacy dialect, which
/// shares the box-score identity space).
pub fn map_pbp(
    data: &Value,
    game_id: &str,
) -> Result<(Vec<RawPBPEvent>, HashMap<String, String>), SourceError> {
    if data.get("result").is_some_and(Value::is_object) {
        map_segev_pbp(data, game_id)
    } else {
        let legacy: LegacyEvents = serde_json::from_value(data.clone())
            .map_err(|e| parse_error("pbp", game_id, format!("bad pbp payload: {e}")))?;
        let mut events: Vec<RawPBPEvent> = legacy
            .events
            .iter()
            .enumerate()
            .map(|(i, e)| map_legacy_event(e, i as i32 + 1))
            .collect();
        infer_links(&mut events);
        Ok((events, HashMap::new()))
    }
}

fn map_segev_pbp(
    data: &Value,
    game_id: &str,
) -> Result<(Vec<RawPBPEvent>, HashMap<String, String>), SourceError> {
    let envelope: SegevPbpEnvelope = serde_json::from_value(data.clone())
        .map_err(|e| parse_error("pbp", game_id, format!("bad segevstats pbp payload: {e}")))?;
    let result = envelope.result;

    let mut jerseys = HashMap::new();
    for lineup in [&result.game_info.home_team, &result.game_info.away_team]
        .into_iter()
        .flatten()
    {
        for player in &lineup.players {
            if let (Some(id), Some(jersey)) = (&player.id, &player.jersey) {
                jerseys.insert(id.clone(), jersey.clone());
            }
        }
    }

    let mut events: Vec<RawPBPEvent> = result
        .actions
        .iter()
        .enumerate()
        .map(|(i, action)| map_segev_action(action, i as i32 + 1))
        .collect();
    infer_links(&mut events);

    Ok((events, jerseys))
}

fn map_segev_action(action: &SegevAction, event_number: i32) -> RawPBPEvent {
    let kind = action.kind.as_deref().unwrap_or_default();
    let made = lenient_bool(action.parameters.get("made"));

    let (event_type, mut subtype, success) = match kind {
        "2pt" => (EventType::Shot, Some("2pt".to_string()), made),
        "3pt" => (EventType::Shot, Some("3pt".to_string()), made),
        "ft" => (EventType::FreeThrow, None, made),
        "rebound" => (EventType::Rebound, None, None),
        "assist" => (EventType::Assist, None, None),
        "turnover" => (EventType::Turnover, None, None),
        "steal" => (EventType::Steal, None, None),
        "block" => (EventType::Block, None, None),
        "foul" => (EventType::Foul, None, None),
        "substitution" => (EventType::Substitution, None, None),
        "timeout" => (EventType::Timeout, None, None),
        "jumpball" => (EventType::JumpBall, None, None),
        "tipoff" => (EventType::TipOff, None, None),
        "startperiod" => (EventType::BeginPeriod, None, None),
        "endperiod" => (EventType::EndPeriod, None, None),
        other => (EventType::Other(other.to_string()), None, None),
    };

    // Rebound and foul flavors ride in the parameters blob.
    if subtype.is_none()
        && let Some(p) = action.parameters.get("type").and_then(Value::as_str)
    {
        subtype = Some(p.to_string());
    }

    let mut event = RawPBPEvent::new(
        event_number,
        action.quarter.unwrap_or(1).max(1),
        action.quarter_time.clone().unwrap_or_default(),
        event_type,
    );
    event.event_subtype = subtype;
    event.player_external_id = action.player_id.clone();
    event.team_external_id = action.team_id.clone();
    event.success = success;
    event.coord_x = lenient_float(action.parameters.get("coordX"));
    event.coord_y = lenient_float(action.parameters.get("coordY"));
    event
}

fn lenient_bool(value: Option<&Value>) -> Option<bool> {
    match value? {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        Value::String(s) => match s.as_str() {
            "1" | "true" => Some(true),
            "0" | "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn lenient_float(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn map_legacy_event(event: &LegacyEvent, event_number: i32) -> RawPBPEvent {
    let code = event.event_type.as_deref().unwrap_or_default();

    let (event_type, subtype) = match code {
        "MADE_2PT" | "MISS_2PT" => (EventType::Shot, Some("2pt".to_string())),
        "MADE_3PT" | "MISS_3PT" => (EventType::Shot, Some("3pt".to_string())),
        "MADE_FT" | "MISS_FT" => (EventType::FreeThrow, None),
        "REBOUND" => (EventType::Rebound, None),
        "ASSIST" => (EventType::Assist, None),
        "TURNOVER" => (EventType::Turnover, None),
        "STEAL" => (EventType::Steal, None),
        "BLOCK" => (EventType::Block, None),
        "FOUL" => (EventType::Foul, None),
        "JUMP_BALL" => (EventType::JumpBall, None),
        "TIMEOUT" => (EventType::Timeout, None),
        "SUBSTITUTION" => (EventType::Substitution, None),
        other => (EventType::Other(other.to_lowercase()), None),
    };

    let success = if code.starts_with("MADE_") {
        Some(true)
    } else if code.starts_with("MISS_") {
        Some(false)
    } else {
        None
    };

    // Older payloads omit the player name field; the description opens with
    // it ("John Smith makes 2-pt shot").
    let player_name = event.player_name.clone().or_else(|| {
        let description = event.description.as_deref()?;
        let mut words = description.split_whitespace();
        match (words.next(), words.next()) {
            (Some(first), Some(second)) => Some(format!("{first} {second}")),
            _ => None,
        }
    });

    let mut mapped = RawPBPEvent::new(
        event_number,
        event.quarter.unwrap_or(1).max(1),
        event.game_clock.clone().unwrap_or_default(),
        event_type,
    );
    mapped.event_subtype = subtype;
    mapped.player_external_id = event.player_id.clone();
    mapped.player_name = player_name;
    mapped.team_external_id = event.team_id.clone();
    mapped.success = success;
    mapped.coord_x = event.coord_x;
    mapped.coord_y = event.coord_y;
    mapped
}

// ---------------------------------------------------------------------------
// Player info
// ---------------------------------------------------------------------------

pub fn map_player_info(profile: &PlayerProfile) -> RawPlayerInfo {
    let (first_name, last_name) = crate::dedup::split_name(&profile.name);
    RawPlayerInfo {
        external_id: profile.player_id.clone(),
        first_name,
        last_name,
        birth_date: profile.birth_date,
        height_cm: profile.height_cm,
        position: profile.position.clone(),
        nationality: profile.nationality.clone(),
    }
}

/// Roster rows carry less than a profile page; no birth date or height
/// without a profile fetch.
pub fn map_roster_player_info(player: &RosterPlayer) -> RawPlayerInfo {
    let (first_name, last_name) = crate::dedup::split_name(&player.name);
    RawPlayerInfo {
        external_id: player.player_id.clone(),
        first_name,
        last_name,
        birth_date: None,
        height_cm: None,
        position: player.position.clone(),
        nationality: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn segev_player_1019() -> Value {
        json!({
            "playerId": "1019", "minutes": "27:06", "starter": true,
            "points": "22", "fg_2m": "6", "fg_2mis": "2", "fg_3m": "1",
            "fg_3mis": "3", "ft_m": "7", "ft_mis": "1", "reb_d": "2",
            "reb_o": "3", "ast": "1", "stl": "2", "blk": "2", "to": "1",
            "f": "3", "plusMinus": "3", "rate": "25"
        })
    }

    fn filler_players(count: usize, points: i32) -> Vec<Value> {
        (0..count)
            .map(|i| {
                json!({
                    "playerId": format!("{}", 2000 + i),
                    "minutes": "10:00",
                    "starter": false,
                    "points": points.to_string(),
                })
            })
            .collect()
    }

    #[test]
    fn segevstats_boxscore_envelope() {
        // 11 filler players at 5 + 2 + player 1019's 22 = 79 = home score.
        let mut home_players = filler_players(11, 5);
        home_players[0]["points"] = json!("7");
        home_players.push(segev_player_1019());
        let away_players = filler_players(12, 7);

        let data = json!({
            "result": {
                "boxscore": {
                    "gameInfo": {
                        "gameId": "24", "homeTeamId": "2", "awayTeamId": "4",
                        "homeScore": "79", "awayScore": "84", "gameFinished": true
                    },
                    "homeTeam": { "players": home_players },
                    "awayTeam": { "players": away_players }
                }
            }
        });

        let boxscore = map_boxscore(&data, "24").unwrap();
        assert_eq!(boxscore.game.external_id, "24");
        assert_eq!(boxscore.game.status, GameStatus::Final);
        assert_eq!(boxscore.game.home_score, Some(79));
        assert_eq!(boxscore.game.away_score, Some(84));
        assert_eq!(boxscore.home_players.len(), 12);
        assert_eq!(boxscore.away_players.len(), 12);

        let star = boxscore
            .home_players
            .iter()
            .find(|p| p.player_external_id == "1019")
            .unwrap();
        assert_eq!(star.minutes_played, 1626);
        assert!(star.is_starter);
        assert_eq!(star.points, 22);
        assert_eq!(star.two_pointers_made, 6);
        assert_eq!(star.two_pointers_attempted, 8);
        assert_eq!(star.three_pointers_made, 1);
        assert_eq!(star.three_pointers_attempted, 4);
        assert_eq!(star.free_throws_made, 7);
        assert_eq!(star.free_throws_attempted, 8);
        assert_eq!(star.offensive_rebounds, 3);
        assert_eq!(star.defensive_rebounds, 2);
        assert_eq!(star.total_rebounds, 5);
        assert_eq!(star.assists, 1);
        assert_eq!(star.steals, 2);
        assert_eq!(star.blocks, 2);
        assert_eq!(star.turnovers, 1);
        assert_eq!(star.personal_fouls, 3);
        assert_eq!(star.plus_minus, 3);
        assert_eq!(star.team_external_id, "2");

        let home_points: i32 = boxscore.home_players.iter().map(|p| p.points).sum();
        assert_eq!(home_points, 79);
    }

    #[test]
    fn flat_boxscore_dialect() {
        let data = json!({
            "GameId": "101",
            "GameDate": "12/01/2024",
            "HomeTeam": {
                "TeamId": 7, "Score": 90,
                "Players": [{
                    "PlayerId": "55", "Name": "John Smith", "Minutes": "30:00",
                    "IsStarter": true, "Points": 20, "FGM": 8, "FGA": 15,
                    "ThreePM": 2, "ThreePA": 5, "FTM": 2, "FTA": 2
                }]
            },
            "AwayTeam": { "TeamId": 9, "Score": 88, "Players": [] }
        });

        let boxscore = map_boxscore(&data, "101").unwrap();
        assert_eq!(boxscore.game.external_id, "101");
        assert_eq!(boxscore.game.status, GameStatus::Final);
        let player = &boxscore.home_players[0];
        assert_eq!(player.player_name, "John Smith");
        assert_eq!(player.two_pointers_made, 6);
        assert_eq!(player.two_pointers_attempted, 10);
        assert_eq!(player.three_pointers_made, 2);
    }

    #[test]
    fn schedule_with_bilingual_team_names() {
        let data = json!({
            "games": [
                {
                    "ExternalID": "1", "team1": 1109,
                    "team_name_1": "מכבי ת\"א", "team_name_eng_1": "Maccabi Tel-Aviv",
                    "team2": 1112, "team_name_eng_2": "Hapoel Jerusalem",
                    "score_team1": 85, "score_team2": 79,
                    "game_date_txt": "12/01/2024"
                },
                {
                    "ExternalID": "2", "team1": 1112,
                    "team_name_eng_1": "Hapoel Jerusalem",
                    "team2": 1120, "team_name_eng_2": "Hapoel Holon",
                    "game_date_txt": "13/01/2024"
                },
                {
                    "ExternalID": "3", "team1": 1120,
                    "team_name_eng_1": "Hapoel Holon",
                    "team2": 1109, "team_name_eng_2": "Maccabi Tel-Aviv",
                    "game_date_txt": "14/01/2024"
                }
            ]
        });

        let payload = parse_games_all(&data).unwrap();
        let teams = extract_teams_from_games(&payload);
        assert_eq!(teams.len(), 3);

        let ids: Vec<&str> = teams.iter().map(|t| t.external_id.as_str()).collect();
        assert_eq!(ids, vec!["1109", "1112", "1120"]);

        for team in &teams {
            assert!(!team.name.is_empty());
            assert!(
                !team
                    .name
                    .chars()
                    .any(|c| ('\u{0590}'..='\u{05FF}').contains(&c)),
                "Hebrew codepoints in team name: {}",
                team.name,
            );
        }
    }

    #[test]
    fn single_element_list_wrapper_is_unwrapped() {
        let data = json!([{ "games": [{"ExternalID": "9", "team1": 1, "team2": 2}] }]);
        let payload = parse_games_all(&data).unwrap();
        assert_eq!(payload.games.len(), 1);
    }

    #[test]
    fn status_derivation_prefers_scores() {
        assert_eq!(derive_status(None, Some(85), Some(79)), GameStatus::Final);
        assert_eq!(derive_status(None, Some(0), Some(0)), GameStatus::Scheduled);
        assert_eq!(derive_status(None, None, None), GameStatus::Scheduled);
        // Explicit final with 0-0 is an unplayed game.
        assert_eq!(
            derive_status(Some("final"), Some(0), Some(0)),
            GameStatus::Scheduled
        );
        assert_eq!(derive_status(Some("live"), Some(12), Some(8)), GameStatus::Live);
    }

    #[test]
    fn season_inferred_from_game_year() {
        let data = json!({
            "games": [
                { "ExternalID": "1", "team1": 1, "team2": 2, "game_year": 2026,
                  "game_date_txt": "12/10/2025" },
                { "ExternalID": "2", "team1": 2, "team2": 1, "game_year": 2026,
                  "game_date_txt": "20/03/2026" }
            ]
        });
        let payload = parse_games_all(&data).unwrap();
        let season = map_season(&payload);
        assert_eq!(season.name, "2025-26");
        assert_eq!(season.external_id, "2025-26");
        assert_eq!(season.start_date.map(|d| d.to_string()), Some("2025-10-12".into()));
        assert_eq!(season.end_date.map(|d| d.to_string()), Some("2026-03-20".into()));
    }

    #[test]
    fn segev_pbp_actions_and_jersey_map() {
        let data = json!({
            "result": {
                "gameInfo": {
                    "homeTeam": { "players": [
                        { "id": "501", "jersey": "12" },
                        { "id": "502", "jersey": "7" }
                    ]},
                    "awayTeam": { "players": [{ "id": "601", "jersey": "9" }] }
                },
                "actions": [
                    { "type": "2pt", "quarter": 1, "quarterTime": "09:45",
                      "playerId": "501", "teamId": "100",
                      "parameters": { "made": "1", "coordX": "12.5", "coordY": "3.0" } },
                    { "type": "assist", "quarter": 1, "quarterTime": "09:44",
                      "playerId": "502", "teamId": "100", "parameters": {} },
                    { "type": "rebound", "quarter": 1, "quarterTime": "09:30",
                      "playerId": "601", "teamId": "101",
                      "parameters": { "type": "defensive" } }
                ]
            }
        });

        let (events, jerseys) = map_pbp(&data, "24").unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(jerseys.get("501").map(String::as_str), Some("12"));
        assert_eq!(jerseys.len(), 3);

        assert_eq!(events[0].event_type, EventType::Shot);
        assert_eq!(events[0].success, Some(true));
        assert_eq!(events[0].coord_x, Some(12.5));
        assert_eq!(events[0].event_number, 1);

        assert_eq!(events[1].event_type, EventType::Assist);
        // Assist one second after a made shot by the same team links back.
        assert_eq!(events[1].related_event_numbers, Some(vec![1]));

        assert_eq!(events[2].event_subtype.as_deref(), Some("defensive"));
    }

    #[test]
    fn game_zone_rows_adopt_schedule_identity() {
        use crate::winner::scraper::{BoxscorePlayerRow, GameZoneBoxscore};

        let schedule_game = RawGame {
            external_id: "24".to_string(),
            home_team_external_id: "2".to_string(),
            away_team_external_id: "4".to_string(),
            game_date: chrono::Utc::now(),
            status: GameStatus::Final,
            home_score: Some(79),
            away_score: Some(84),
        };
        let zone = GameZoneBoxscore {
            game_id: "24".to_string(),
            home_players: vec![BoxscorePlayerRow {
                player_id: Some("1019".to_string()),
                player_name: "John Smith".to_string(),
                minutes: Some("27:06".to_string()),
                points: 22,
                two_pt_made: 6,
                two_pt_attempted: 8,
                ..BoxscorePlayerRow::default()
            }],
            ..GameZoneBoxscore::default()
        };

        let boxscore = map_game_zone_boxscore(&zone, &schedule_game);
        assert_eq!(boxscore.game, schedule_game);
        let row = &boxscore.home_players[0];
        assert_eq!(row.team_external_id, "2");
        assert_eq!(row.minutes_played, 1626);
        assert_eq!(row.points, 22);
    }

    #[test]
    fn legacy_pbp_events() {
        let data = json!({
            "Events": [
                { "EventType": "MISS_3PT", "Quarter": 2, "GameClock": "05:10",
                  "TeamId": 100, "Description": "John Smith misses 3-pt shot" },
                { "EventType": "REBOUND", "Quarter": 2, "GameClock": "05:08",
                  "TeamId": 101, "PlayerName": "Dan Levi" }
            ]
        });

        let (events, jerseys) = map_pbp(&data, "24").unwrap();
        assert!(jerseys.is_empty());
        assert_eq!(events[0].event_type, EventType::Shot);
        assert_eq!(events[0].success, Some(false));
        assert_eq!(events[0].player_name.as_deref(), Some("John Smith"));
        assert_eq!(events[1].related_event_numbers, Some(vec![1]));
    }
}
