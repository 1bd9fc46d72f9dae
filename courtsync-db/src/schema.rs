diesel::table! {
    leagues (id) {
        id -> Uuid,
        code -> Text,
        name -> Text,
        country -> Text,
    }
}

diesel::table! {
    seasons (id) {
        id -> Uuid,
        league_id -> Uuid,
        name -> Text,
        start_date -> Date,
        end_date -> Date,
        is_current -> Bool,
    }
}

diesel::table! {
    teams (id) {
        id -> Uuid,
        name -> Text,
        short_name -> Nullable<Text>,
        city -> Nullable<Text>,
        country -> Nullable<Text>,
        external_ids -> Jsonb,
    }
}

diesel::table! {
    team_seasons (team_id, season_id) {
        team_id -> Uuid,
        season_id -> Uuid,
    }
}

diesel::table! {
    players (id) {
        id -> Uuid,
        first_name -> Text,
        last_name -> Text,
        birth_date -> Nullable<Date>,
        height_cm -> Nullable<Int4>,
        position -> Nullable<Text>,
        nationality -> Nullable<Text>,
        external_ids -> Jsonb,
    }
}

diesel::table! {
    player_team_histories (player_id, team_id, season_id) {
        player_id -> Uuid,
        team_id -> Uuid,
        season_id -> Uuid,
        jersey_number -> Nullable<Text>,
        position -> Nullable<Text>,
    }
}

diesel::table! {
    games (id) {
        id -> Uuid,
        season_id -> Uuid,
        home_team_id -> Uuid,
        away_team_id -> Uuid,
        game_date -> Timestamptz,
        status -> Text,
        home_score -> Nullable<Int4>,
        away_score -> Nullable<Int4>,
        external_ids -> Jsonb,
    }
}

diesel::table! {
    player_game_stats (id) {
        id -> Uuid,
        game_id -> Uuid,
        player_id -> Uuid,
        team_id -> Uuid,
        minutes_played -> Int4,
        is_starter -> Bool,
        points -> Int4,
        two_pointers_made -> Int4,
        two_pointers_attempted -> Int4,
        three_pointers_made -> Int4,
        three_pointers_attempted -> Int4,
        free_throws_made -> Int4,
        free_throws_attempted -> Int4,
        offensive_rebounds -> Int4,
        defensive_rebounds -> Int4,
        total_rebounds -> Int4,
        assists -> Int4,
        steals -> Int4,
        blocks -> Int4,
        turnovers -> Int4,
        personal_fouls -> Int4,
        plus_minus -> Int4,
        efficiency -> Int4,
    }
}

diesel::table! {
    play_by_play_events (id) {
        id -> Uuid,
        game_id -> Uuid,
        event_number -> Int4,
        period -> Int4,
        clock -> Text,
        event_type -> Text,
        event_subtype -> Nullable<Text>,
        team_id -> Nullable<Uuid>,
        player_id -> Nullable<Uuid>,
        success -> Nullable<Bool>,
        coord_x -> Nullable<Float8>,
        coord_y -> Nullable<Float8>,
        related_event_numbers -> Nullable<Array<Int4>>,
    }
}

diesel::table! {
    sync_cache (id) {
        id -> Uuid,
        source -> Text,
        resource_type -> Text,
        resource_id -> Text,
        raw_data -> Jsonb,
        content_hash -> Bpchar,
        fetched_at -> Timestamptz,
        http_status -> Nullable<Int4>,
    }
}

diesel::table! {
    sync_logs (id) {
        id -> Uuid,
        source -> Text,
        entity_type -> Text,
        season_id -> Nullable<Uuid>,
        game_id -> Nullable<Uuid>,
        status -> Text,
        started_at -> Timestamptz,
        completed_at -> Nullable<Timestamptz>,
        records_processed -> Int4,
        records_created -> Int4,
        records_updated -> Int4,
        records_skipped -> Int4,
        error_message -> Nullable<Text>,
        error_details -> Nullable<Jsonb>,
    }
}

diesel::table! {
    sync_tracker (source, game_external_id) {
        source -> Text,
        game_external_id -> Text,
        game_id -> Uuid,
        synced_at -> Timestamptz,
    }
}

diesel::joinable!(seasons -> leagues (league_id));
diesel::joinable!(team_seasons -> teams (team_id));
diesel::joinable!(team_seasons -> seasons (season_id));
diesel::joinable!(player_team_histories -> players (player_id));
diesel::joinable!(player_team_histories -> teams (team_id));
diesel::joinable!(player_team_histories -> seasons (season_id));
diesel::joinable!(games -> seasons (season_id));
diesel::joinable!(player_game_stats -> games (game_id));
diesel::joinable!(player_game_stats -> players (player_id));
diesel::joinable!(player_game_stats -> teams (team_id));
diesel::joinable!(play_by_play_events -> games (game_id));
diesel::joinable!(sync_logs -> seasons (season_id));
diesel::joinable!(sync_logs -> games (game_id));
diesel::joinable!(sync_tracker -> games (game_id));

diesel::allow_tables_to_appear_in_same_query!(
    leagues,
    seasons,
    teams,
    team_seasons,
    players,
    player_team_histories,
    games,
    player_game_stats,
    play_by_play_events,
    sync_cache,
    sync_logs,
    sync_tracker,
);
