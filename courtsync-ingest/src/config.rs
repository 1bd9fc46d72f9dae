use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use courtsync_sync::euroleague::EuroleagueConfig;
use courtsync_sync::winner::WinnerConfig;

/// Ingest configuration: defaults, overlaid by `COURTSYNC.toml`, overlaid by
/// `COURTSYNC_*` environment variables (double underscore nests into the
/// per-source sections). The `SYNC_<SOURCE>_ENABLED` flags ride on a
/// separate prefix so deployments can toggle sources without touching the
/// rest.
#[derive(Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct IngestConfig {
    pub winner_enabled: bool,
    pub euroleague_enabled: bool,
    pub include_pbp: bool,
    pub winner: WinnerConfig,
    pub euroleague: EuroleagueConfig,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            winner_enabled: true,
            euroleague_enabled: true,
            include_pbp: true,
            winner: WinnerConfig::default(),
            euroleague: EuroleagueConfig::default(),
        }
    }
}

impl IngestConfig {
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file("COURTSYNC.toml"))
            .merge(Env::prefixed("COURTSYNC_").split("__"))
            .merge(Env::prefixed("SYNC_"))
    }

    pub fn config() -> figment::Result<Self> {
        Self::figment().extract()
    }
}
