mod migrations;
mod pool;
mod schema;
mod url;

pub mod db;
pub mod models;

pub use migrations::{MigrationError, run_migrations};
pub use pool::{ConnectionPool, get_pool};
pub use url::postgres_url_from_environment;

pub use diesel::{Connection, PgConnection, QueryResult};
