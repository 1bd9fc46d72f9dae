use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Deserialize;
use std::path::PathBuf;

/// Assembles the Postgres URL from `POSTGRES_*` environment variables.
/// `POSTGRES_URL` wins outright when set; otherwise user/password/host/db
/// are combined, with the password percent-encoded.
pub fn postgres_url_from_environment() -> String {
    #[derive(Debug, Deserialize)]
    struct PostgresConfig {
        url: Option<String>,
        user: Option<String>,
        password: Option<String>,
        password_file: Option<PathBuf>,
        host: Option<String>,
        db: Option<String>,
    }

    let provider = figment::providers::Env::prefixed("POSTGRES_");
    let config: PostgresConfig = figment::Figment::from(provider)
        .extract()
        .expect("Postgres configuration environment variable(s) missing or invalid");

    if let Some(url) = config.url {
        return url;
    }

    let user = config.user.expect("POSTGRES_USER must be provided");
    let db = config.db.expect("POSTGRES_DB must be provided");
    let host = config.host.unwrap_or_else(|| "localhost".to_string());

    let password = if let Some(password) = config.password {
        password
    } else if let Some(password_file) = config.password_file {
        std::fs::read_to_string(password_file).expect("Failed to read postgres password file")
    } else {
        panic!("One of POSTGRES_PASSWORD or POSTGRES_PASSWORD_FILE must be provided");
    };

    // A trailing newline is the file-editor convention; strip only that.
    let password = password.strip_suffix('\n').unwrap_or(&password);
    let password = utf8_percent_encode(password, NON_ALPHANUMERIC);

    format!("postgres://{user}:{password}@{host}/{db}")
}
