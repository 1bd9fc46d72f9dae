//! HTML scraping for the league site: player profiles, team rosters,
//! historical results and the game-zone boxscore page.
//!
//! The site serves two generations of markup. Parsers try the modern
//! card-based layout first and fall back to the legacy table layout, and
//! field labels are matched bilingually (the site mixes English and Hebrew
//! even with `lang=en`). Scraped pages go through the same raw cache as the
//! JSON endpoints, stored as `{"html": ...}` payloads.

use chrono::{DateTime, NaiveDate, Utc};
use diesel::PgConnection;
use scraper::{ElementRef, Html, Selector};
use serde_json::json;

use courtsync_db::db::{self, CacheResult};

use crate::error::SourceError;
use crate::fetch::{RetryPolicy, build_http_client, fetch_text};
use crate::parse::{parse_birth_date, parse_height_cm, try_parse_datetime};
use crate::ratelimit::RateLimiter;
use crate::winner::client::SOURCE;
use crate::winner::config::WinnerConfig;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerProfile {
    pub player_id: String,
    pub name: String,
    pub team_name: Option<String>,
    pub jersey_number: Option<String>,
    pub position: Option<String>,
    pub height_cm: Option<i32>,
    pub birth_date: Option<NaiveDate>,
    pub nationality: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RosterPlayer {
    pub player_id: String,
    pub name: String,
    pub jersey_number: Option<String>,
    pub position: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeamRoster {
    pub team_id: String,
    pub team_name: Option<String>,
    pub players: Vec<RosterPlayer>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameResult {
    pub game_id: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub home_team: String,
    pub away_team: String,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoricalResults {
    pub year: i32,
    pub games: Vec<GameResult>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoxscorePlayerRow {
    pub player_id: Option<String>,
    pub player_name: String,
    pub minutes: Option<String>,
    pub points: i32,
    pub two_pt_made: i32,
    pub two_pt_attempted: i32,
    pub three_pt_made: i32,
    pub three_pt_attempted: i32,
    pub ft_made: i32,
    pub ft_attempted: i32,
    pub offensive_rebounds: i32,
    pub defensive_rebounds: i32,
    pub total_rebounds: i32,
    pub assists: i32,
    pub steals: i32,
    pub blocks: i32,
    pub turnovers: i32,
    pub fouls: i32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameZoneBoxscore {
    pub game_id: String,
    pub home_team_name: Option<String>,
    pub away_team_name: Option<String>,
    pub home_players: Vec<BoxscorePlayerRow>,
    pub away_players: Vec<BoxscorePlayerRow>,
}

pub struct WinnerScraper {
    config: WinnerConfig,
    policy: RetryPolicy,
    http: reqwest::Client,
    limiter: RateLimiter,
}

impl WinnerScraper {
    pub fn new(config: WinnerConfig) -> Result<Self, reqwest::Error> {
        let policy = config.retry_policy();
        let http = build_http_client(&config.user_agent, policy.request_timeout)?;
        let limiter =
            RateLimiter::new(config.scrape_requests_per_second, config.scrape_burst_size);
        Ok(Self {
            config,
            policy,
            http,
            limiter,
        })
    }

    pub async fn fetch_player(
        &self,
        conn: &mut PgConnection,
        player_id: &str,
        force: bool,
    ) -> Result<PlayerProfile, SourceError> {
        let url = self.config.player_url(player_id);
        let result = self
            .fetch_page(conn, "player_page", player_id, &url, force)
            .await?;
        parse_player_profile(&html_of(&result), player_id)
    }

    pub async fn fetch_team_roster(
        &self,
        conn: &mut PgConnection,
        team_id: &str,
        force: bool,
    ) -> Result<TeamRoster, SourceError> {
        let url = self.config.team_url(team_id);
        let result = self
            .fetch_page(conn, "team_page", team_id, &url, force)
            .await?;
        parse_team_roster(&html_of(&result), team_id)
    }

    pub async fn fetch_historical_results(
        &self,
        conn: &mut PgConnection,
        year: i32,
        force: bool,
    ) -> Result<HistoricalResults, SourceError> {
        let url = self.config.results_url(year);
        let result = self
            .fetch_page(conn, "results_page", &year.to_string(), &url, force)
            .await?;
        parse_historical_results(&html_of(&result), year)
    }

    pub async fn fetch_game_zone_boxscore(
        &self,
        conn: &mut PgConnection,
        game_id: &str,
        force: bool,
    ) -> Result<GameZoneBoxscore, SourceError> {
        let url = self.config.game_zone_url(game_id);
        let result = self
            .fetch_page(conn, "game_zone_page", game_id, &url, force)
            .await?;
        parse_game_zone_boxscore(&html_of(&result), game_id)
    }

    async fn fetch_page(
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

        let html = fetch_text(SOURCE, &self.http, &self.limiter, &self.policy, url).await?;
        let data = json!({ "html": html });
        let (entry, changed) =
            db::upsert_cache(conn, SOURCE, resource_type, resource_id, &data, Some(200))?;
        Ok(CacheResult::fresh(entry, changed))
    }
}

fn html_of(result: &CacheResult) -> String {
    result
        .data
        .get("html")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

fn selector(css: &'static str) -> Selector {
    Selector::parse(css).expect("static selector is valid")
}

fn element_text(el: ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Value of `key` in an `x.asp?Key=val` style href.
fn query_param(href: &str, key: &str) -> Option<String> {
    let (_, query) = href.split_once('?')?;
    for pair in query.split('&') {
        let (k, v) = pair.split_once('=')?;
        if k.eq_ignore_ascii_case(key) && !v.is_empty() {
            return Some(v.to_string());
        }
    }
    None
}

fn label_is(label: &str, english: &str, hebrew: &str) -> bool {
    let label = label.to_lowercase();
    label.contains(english) || label.contains(hebrew)
}

pub fn parse_player_profile(html: &str, player_id: &str) -> Result<PlayerProfile, SourceError> {
    let doc = Html::parse_document(html);

    // Page title carries the player name as the last pipe-separated part:
    // "LEAGUE | ... | Team Name | Player Name".
    let mut name = String::new();
    if let Some(title) = doc.select(&selector("title")).next() {
        let title = element_text(title);
        if let Some((_, last)) = title.rsplit_once('|') {
            name = last.trim().to_string();
        } else if let Some((first, _)) = title.split_once(" - ") {
            name = first.trim().to_string();
        } else {
            name = title;
        }
    }

    let mut profile = PlayerProfile {
        player_id: player_id.to_string(),
        name: if name.is_empty() {
            format!("Player {player_id}")
        } else {
            name
        },
        ..PlayerProfile::default()
    };

    // Modern card layout: <div class="p_info">
    //   <span class="p_info_title">Label:</span>Value<br/>
    if let Some(info) = doc.select(&selector("div.p_info")).next() {
        for span in info.select(&selector("span.p_info_title")) {
            let label = element_text(span).trim_end_matches(':').to_lowercase();
            let value = span
                .next_sibling()
                .and_then(|node| node.value().as_text().map(|t| t.to_string()))
                .unwrap_or_default()
                .replace('\u{a0}', " ")
                .trim()
                .to_string();
            apply_profile_field(&mut profile, &label, &value);
        }
    }

    // Legacy layout: a details table of label/value rows.
    if profile.height_cm.is_none() && profile.birth_date.is_none() {
        for row in doc.select(&selector("table tr")) {
            let cells: Vec<String> = row
                .select(&selector("td, th"))
                .map(element_text)
                .collect();
            if let [label, value, ..] = cells.as_slice() {
                apply_profile_field(&mut profile, &label.to_lowercase(), value);
            }
        }
    }

    if profile.name.is_empty() {
        return Err(SourceError::parse(
            SOURCE,
            "player_page",
            player_id,
            "no player name found in page",
            Some(html),
        ));
    }

    Ok(profile)
}

fn apply_profile_field(profile: &mut PlayerProfile, label: &str, value: &str) {
    if value.is_empty() {
        return;
    }
    if label_is(label, "team", "קבוצה") {
        profile.team_name = Some(value.to_string());
    } else if label_is(label, "number", "מספר") {
        profile.jersey_number = Some(value.to_string());
    } else if label_is(label, "position", "עמדה") {
        profile.position = Some(value.to_string());
    } else if label_is(label, "height", "גובה") {
        profile.height_cm = parse_height_cm(value);
    } else if label_is(label, "nationality", "לאום") {
        profile.nationality = Some(value.to_string());
    } else if label_is(label, "birth", "תאריך") || label.contains("dob") {
        profile.birth_date = parse_birth_date(value);
    }
}

pub fn parse_team_roster(html: &str, team_id: &str) -> Result<TeamRoster, SourceError> {
    let doc = Html::parse_document(html);

    let team_name = doc
        .select(&selector("h1"))
        .next()
        .or_else(|| doc.select(&selector("title")).next())
        .map(element_text)
        .map(|t| match t.split_once(" - ") {
            Some((first, _)) => first.trim().to_string(),
            None => t,
        })
        .filter(|t| !t.is_empty());

    let mut roster = TeamRoster {
        team_id: team_id.to_string(),
        team_name,
        players: Vec::new(),
    };

    // Modern card layout first.
    for card in doc.select(&selector("div.player_card, div.roster_player")) {
        let Some(link) = card.select(&selector("a[href*='player.asp']")).next() else {
            continue;
        };
        let Some(player_id) = link.value().attr("href").and_then(|h| query_param(h, "PlayerId"))
        else {
            continue;
        };
        let name = element_text(link);
        if name.is_empty() {
            continue;
        }
        roster.players.push(RosterPlayer {
            player_id,
            name,
            jersey_number: card
                .select(&selector(".player_number, .p_number"))
                .next()
                .map(element_text)
                .filter(|t| !t.is_empty()),
            position: card
                .select(&selector(".player_position, .p_position"))
                .next()
                .map(element_text)
                .filter(|t| !t.is_empty()),
        });
    }

    // Legacy table layout: one row per player with a profile link.
    if roster.players.is_empty() {
        for row in doc.select(&selector("table tr")) {
            let Some(link) = row.select(&selector("a[href*='player.asp']")).next() else {
                continue;
            };
            let Some(player_id) =
                link.value().attr("href").and_then(|h| query_param(h, "PlayerId"))
            else {
                continue;
            };
            let name = element_text(link);
            if name.is_empty() {
                continue;
            }

            let cells: Vec<String> = row.select(&selector("td")).map(element_text).collect();
            // Conventional column order: jersey, name, position.
            let jersey_number = cells
                .first()
                .filter(|c| c.chars().all(|ch| ch.is_ascii_digit()) && !c.is_empty())
                .cloned();
            let position = cells.get(2).filter(|c| !c.is_empty()).cloned();

            roster.players.push(RosterPlayer {
                player_id,
                name,
                jersey_number,
                position,
            });
        }
    }

    Ok(roster)
}

pub fn parse_historical_results(html: &str, year: i32) -> Result<HistoricalResults, SourceError> {
    let doc = Html::parse_document(html);
    let mut results = HistoricalResults {
        year,
        games: Vec::new(),
    };

    for row in doc.select(&selector("table tr")) {
        let game_id = row
            .select(&selector("a[href*='game-zone.asp']"))
            .next()
            .and_then(|link| link.value().attr("href"))
            .and_then(|href| query_param(href, "GameId"));

        let cells: Vec<String> = row.select(&selector("td")).map(element_text).collect();
        if cells.len() < 3 {
            continue;
        }

        // Conventional row shape: date | home | score | away (score column
        // like "85 - 79"); rows without a recognizable score are skipped.
        let Some((score_index, (home_score, away_score))) = cells
            .iter()
            .enumerate()
            .find_map(|(i, cell)| parse_score_pair(cell).map(|scores| (i, scores)))
        else {
            continue;
        };
        if score_index == 0 || score_index + 1 >= cells.len() {
            continue;
        }

        let date = cells.first().and_then(|c| try_parse_datetime(c));
        let home_team = cells[score_index - 1].clone();
        let away_team = cells[score_index + 1].clone();
        if home_team.is_empty() || away_team.is_empty() {
            continue;
        }

        results.games.push(GameResult {
            game_id,
            date,
            home_team,
            away_team,
            home_score: Some(home_score),
            away_score: Some(away_score),
        });
    }

    Ok(results)
}

/// `"85 - 79"` or `"85-79"` -> (85, 79).
fn parse_score_pair(cell: &str) -> Option<(i32, i32)> {
    let (left, right) = cell.split_once('-')?;
    let left: i32 = left.trim().parse().ok()?;
    let right: i32 = right.trim().parse().ok()?;
    Some((left, right))
}

pub fn parse_game_zone_boxscore(
    html: &str,
    game_id: &str,
) -> Result<GameZoneBoxscore, SourceError> {
    let doc = Html::parse_document(html);
    let mut boxscore = GameZoneBoxscore {
        game_id: game_id.to_string(),
        ..GameZoneBoxscore::default()
    };

    let mut team_tables: Vec<(Option<String>, Vec<BoxscorePlayerRow>)> = Vec::new();

    for table in doc.select(&selector("table")) {
        let header: Vec<String> = table
            .select(&selector("th"))
            .map(|th| element_text(th).to_lowercase())
            .collect();
        let is_boxscore = header
            .iter()
            .any(|h| h.contains("min") || h.contains("דקות"));
        if !is_boxscore {
            continue;
        }

        let mut rows = Vec::new();
        for row in table.select(&selector("tr")) {
            if let Some(parsed) = parse_boxscore_row(row) {
                rows.push(parsed);
            }
        }
        if rows.is_empty() {
            continue;
        }

        // The nearest preceding heading names the team.
        let team_name = table
            .prev_siblings()
            .filter_map(ElementRef::wrap)
            .find(|el| matches!(el.value().name(), "h2" | "h3" | "div"))
            .map(element_text)
            .filter(|t| !t.is_empty());

        team_tables.push((team_name, rows));
    }

    let mut tables = team_tables.into_iter();
    if let Some((name, players)) = tables.next() {
        boxscore.home_team_name = name;
        boxscore.home_players = players;
    }
    if let Some((name, players)) = tables.next() {
        boxscore.away_team_name = name;
        boxscore.away_players = players;
    }

    if boxscore.home_players.is_empty() {
        return Err(SourceError::parse(
            SOURCE,
            "game_zone_page",
            game_id,
            "no box-score tables found in page",
            Some(html),
        ));
    }

    Ok(boxscore)
}

fn parse_boxscore_row(row: ElementRef) -> Option<BoxscorePlayerRow> {
    let link = row.select(&selector("a[href*='player.asp']")).next()?;
    let player_name = element_text(link);
    if player_name.is_empty() {
        return None;
    }

    let cells: Vec<String> = row.select(&selector("td")).map(element_text).collect();
    // Name | MIN | PTS | 2P | 3P | FT | OREB | DREB | REB | AST | STL | BLK | TO | PF
    if cells.len() < 14 {
        return None;
    }

    let (two_pt_made, two_pt_attempted) = parse_made_attempted(&cells[3]);
    let (three_pt_made, three_pt_attempted) = parse_made_attempted(&cells[4]);
    let (ft_made, ft_attempted) = parse_made_attempted(&cells[5]);

    Some(BoxscorePlayerRow {
        player_id: link.value().attr("href").and_then(|h| query_param(h, "PlayerId")),
        player_name,
        minutes: Some(cells[1].clone()).filter(|c| !c.is_empty()),
        points: parse_stat(&cells[2]),
        two_pt_made,
        two_pt_attempted,
        three_pt_made,
        three_pt_attempted,
        ft_made,
        ft_attempted,
        offensive_rebounds: parse_stat(&cells[6]),
        defensive_rebounds: parse_stat(&cells[7]),
        total_rebounds: parse_stat(&cells[8]),
        assists: parse_stat(&cells[9]),
        steals: parse_stat(&cells[10]),
        blocks: parse_stat(&cells[11]),
        turnovers: parse_stat(&cells[12]),
        fouls: parse_stat(&cells[13]),
    })
}

fn parse_stat(cell: &str) -> i32 {
    cell.trim().parse().unwrap_or(0)
}

/// `"6-8"` or `"6/8"` -> (6, 8).
fn parse_made_attempted(cell: &str) -> (i32, i32) {
    let cell = cell.trim();
    for sep in ['-', '/'] {
        if let Some((made, attempted)) = cell.split_once(sep) {
            return (
                made.trim().parse().unwrap_or(0),
                attempted.trim().parse().unwrap_or(0),
            );
        }
    }
    (0, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE_HTML: &str = r#"
        <html><head><title>Winner League | Teams | Maccabi Tel-Aviv | John Smith</title></head>
        <body>
          <div class="p_info">
            <span class="p_info_title">Team:</span>Maccabi Tel-Aviv<br/>
            <span class="p_info_title">Number:</span>12<br/>
            <span class="p_info_title">Position:</span>Guard<br/>
            <span class="p_info_title">Height:</span>1.93<br/>
            <span class="p_info_title">Date of birth:</span>12/03/1998<br/>
            <span class="p_info_title">Nationality:</span>Israel<br/>
          </div>
        </body></html>"#;

    #[test]
    fn profile_from_card_layout() {
        let profile = parse_player_profile(PROFILE_HTML, "1019").unwrap();
        assert_eq!(profile.name, "John Smith");
        assert_eq!(profile.jersey_number.as_deref(), Some("12"));
        assert_eq!(profile.position.as_deref(), Some("Guard"));
        assert_eq!(profile.height_cm, Some(193));
        assert_eq!(
            profile.birth_date,
            NaiveDate::from_ymd_opt(1998, 3, 12)
        );
        assert_eq!(profile.nationality.as_deref(), Some("Israel"));
    }

    #[test]
    fn profile_from_legacy_table_layout() {
        let html = r#"
            <html><head><title>League | Hapoel | Dan Levi</title></head><body>
            <table>
              <tr><td>Height</td><td>198</td></tr>
              <tr><td>תאריך לידה</td><td>1995-07-01</td></tr>
              <tr><td>עמדה</td><td>F</td></tr>
            </table></body></html>"#;
        let profile = parse_player_profile(html, "7").unwrap();
        assert_eq!(profile.name, "Dan Levi");
        assert_eq!(profile.height_cm, Some(198));
        assert_eq!(profile.birth_date, NaiveDate::from_ymd_opt(1995, 7, 1));
        assert_eq!(profile.position.as_deref(), Some("F"));
    }

    #[test]
    fn roster_from_legacy_table() {
        let html = r#"
            <html><head><title>Maccabi Tel-Aviv - Roster</title></head><body>
            <table>
              <tr><th>#</th><th>Player</th><th>Pos</th></tr>
              <tr><td>12</td><td><a href="player.asp?PlayerId=1019">John Smith</a></td><td>G</td></tr>
              <tr><td>7</td><td><a href="player.asp?PlayerId=1020&lang=en">Dan Levi</a></td><td>F</td></tr>
            </table></body></html>"#;
        let roster = parse_team_roster(html, "1109").unwrap();
        assert_eq!(roster.team_name.as_deref(), Some("Maccabi Tel-Aviv"));
        assert_eq!(roster.players.len(), 2);
        assert_eq!(roster.players[0].player_id, "1019");
        assert_eq!(roster.players[0].jersey_number.as_deref(), Some("12"));
        assert_eq!(roster.players[1].player_id, "1020");
        assert_eq!(roster.players[1].position.as_deref(), Some("F"));
    }

    #[test]
    fn historical_results_rows() {
        let html = r#"
            <html><body><table>
              <tr><th>Date</th><th>Home</th><th>Score</th><th>Away</th></tr>
              <tr>
                <td>12/01/2024</td><td>Maccabi Tel-Aviv</td>
                <td><a href="game-zone.asp?GameId=24">85 - 79</a></td>
                <td>Hapoel Jerusalem</td>
              </tr>
              <tr><td>13/01/2024</td><td>Upcoming</td><td>vs</td><td>Other</td></tr>
            </table></body></html>"#;
        let results = parse_historical_results(html, 2024).unwrap();
        assert_eq!(results.games.len(), 1);
        let game = &results.games[0];
        assert_eq!(game.game_id.as_deref(), Some("24"));
        assert_eq!(game.home_team, "Maccabi Tel-Aviv");
        assert_eq!(game.away_team, "Hapoel Jerusalem");
        assert_eq!(game.home_score, Some(85));
        assert_eq!(game.away_score, Some(79));
    }

    #[test]
    fn game_zone_boxscore_tables() {
        let html = r#"
            <html><body>
            <h2>Maccabi Tel-Aviv</h2>
            <table>
              <tr><th>Player</th><th>MIN</th><th>PTS</th><th>2P</th><th>3P</th><th>FT</th>
                  <th>OREB</th><th>DREB</th><th>REB</th><th>AST</th><th>STL</th><th>BLK</th>
                  <th>TO</th><th>PF</th></tr>
              <tr>
                <td><a href="player.asp?PlayerId=1019">John Smith</a></td>
                <td>27:06</td><td>22</td><td>6-8</td><td>1-4</td><td>7-8</td>
                <td>3</td><td>2</td><td>5</td><td>1</td><td>2</td><td>2</td>
                <td>1</td><td>3</td>
              </tr>
            </table>
            <h2>Hapoel Jerusalem</h2>
            <table>
              <tr><th>Player</th><th>MIN</th><th>PTS</th><th>2P</th><th>3P</th><th>FT</th>
                  <th>OREB</th><th>DREB</th><th>REB</th><th>AST</th><th>STL</th><th>BLK</th>
                  <th>TO</th><th>PF</th></tr>
              <tr>
                <td><a href="player.asp?PlayerId=2044">Dan Levi</a></td>
                <td>30:00</td><td>18</td><td>5-9</td><td>2-6</td><td>2-2</td>
                <td>1</td><td>4</td><td>5</td><td>6</td><td>1</td><td>0</td>
                <td>2</td><td>2</td>
              </tr>
            </table>
            </body></html>"#;

        let boxscore = parse_game_zone_boxscore(html, "24").unwrap();
        assert_eq!(boxscore.home_team_name.as_deref(), Some("Maccabi Tel-Aviv"));
        assert_eq!(boxscore.away_team_name.as_deref(), Some("Hapoel Jerusalem"));
        assert_eq!(boxscore.home_players.len(), 1);

        let row = &boxscore.home_players[0];
        assert_eq!(row.player_id.as_deref(), Some("1019"));
        assert_eq!(row.points, 22);
        assert_eq!(row.two_pt_made, 6);
        assert_eq!(row.two_pt_attempted, 8);
        assert_eq!(row.ft_made, 7);
        assert_eq!(row.total_rebounds, 5);
        assert_eq!(boxscore.away_players[0].assists, 6);
    }

    #[test]
    fn query_param_extraction() {
        assert_eq!(
            query_param("player.asp?PlayerId=1019&lang=en", "PlayerId").as_deref(),
            Some("1019")
        );
        assert_eq!(query_param("player.asp?PlayerId=", "PlayerId"), None);
        assert_eq!(query_param("player.asp", "PlayerId"), None);
    }

    #[test]
    fn made_attempted_cells() {
        assert_eq!(parse_made_attempted("6-8"), (6, 8));
        assert_eq!(parse_made_attempted("6/8"), (6, 8));
        assert_eq!(parse_made_attempted(""), (0, 0));
    }
}
