//! Config loader — reads `~/.cogbot/config.json`, merges env vars, and
//! applies legacy migrations.
//!
//! # Loading precedence
//! 1. Defaults (from `Config::default()`)
//! 2. JSON file at `~/.cogbot/config.json`
//! 3. Environment variables `COGBOT_<SECTION>__<FIELD>` (override JSON)

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::schema::Config;

/// Helpchat keys older configs wrote in snake_case, with their current names.
const LEGACY_HELPCHAT_KEYS: &[(&str, &str)] = &[
    ("message_with_channel", "messageWithChannel"),
    ("message_without_channel", "messageWithoutChannel"),
    ("seconds_until_stale", "secondsUntilStale"),
    ("seconds_to_poll", "secondsToPoll"),
    ("relocate_emoji", "relocateEmoji"),
    ("resolve_emoji", "resolveEmoji"),
    ("free_prefix", "freePrefix"),
    ("busy_prefix", "busyPrefix"),
    ("stale_prefix", "stalePrefix"),
    ("resolve_with_reaction", "resolveWithReaction"),
];

/// Default config file path.
pub fn get_config_path() -> PathBuf {
    crate::utils::get_data_path().join("config.json")
}

/// Load configuration from the default path + env vars.
///
/// Falls back to `Config::default()` if the file doesn't exist or can't be parsed.
pub fn load_config(path: Option<&Path>) -> Config {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    load_config_from_path(&config_path)
}

/// Load config from a specific file path.
fn load_config_from_path(path: &Path) -> Config {
    if !path.exists() {
        info!("No config file found at {}, using defaults", path.display());
        return apply_env_overrides(Config::default());
    }

    debug!("Loading config from {}", path.display());

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return apply_env_overrides(Config::default());
        }
    };

    // Parse JSON → Value first for migration
    let mut raw: serde_json::Value = match serde_json::from_str(&content) {
        Ok(v) => v,
        Err(e) => {
            warn!("Failed to parse config JSON: {}", e);
            return apply_env_overrides(Config::default());
        }
    };

    migrate_config(&mut raw);

    let config: Config = match serde_json::from_value(raw) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to deserialize config: {}", e);
            return apply_env_overrides(Config::default());
        }
    };

    apply_env_overrides(config)
}

/// Save configuration to disk (pretty-printed JSON with camelCase keys).
pub fn save_config(config: &Config, path: Option<&Path>) -> std::io::Result<()> {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(config).map_err(std::io::Error::other)?;

    std::fs::write(&config_path, json)?;
    debug!("Config saved to {}", config_path.display());
    Ok(())
}

/// Apply legacy config migrations.
///
/// Renames snake_case keys under `helpchat.servers.<guild>` to camelCase.
/// An existing camelCase key wins over its legacy twin.
fn migrate_config(raw: &mut serde_json::Value) {
    let Some(servers) = raw
        .get_mut("helpchat")
        .and_then(|h| h.get_mut("servers"))
        .and_then(|s| s.as_object_mut())
    else {
        return;
    };

    for (guild, server) in servers.iter_mut() {
        let Some(server) = server.as_object_mut() else {
            continue;
        };
        for (legacy, current) in LEGACY_HELPCHAT_KEYS {
            if let Some(value) = server.remove(*legacy) {
                if !server.contains_key(*current) {
                    server.insert((*current).to_string(), value);
                    debug!(guild = %guild, "Migrated helpchat.{} → {}", legacy, current);
                }
            }
        }
    }
}

/// Apply environment variable overrides on top of a loaded config.
///
/// Env var format: `COGBOT_<SECTION>__<FIELD>` (double underscore as delimiter).
///
/// Supported overrides:
/// - `COGBOT_DISCORD__TOKEN` → `discord.token`
/// - `COGBOT_DISCORD__API_BASE` → `discord.api_base`
/// - `COGBOT_DISCORD__GATEWAY_URL` → `discord.gateway_url`
/// - `COGBOT_FEED__POLLING_INTERVAL` → `feed.polling_interval`
/// - `COGBOT_JIRA__BASE_URL` → `jira.base_url`
/// - `COGBOT_COMMANDS__PREFIX` → `commands.prefix`
fn apply_env_overrides(mut config: Config) -> Config {
    if let Ok(val) = std::env::var("COGBOT_DISCORD__TOKEN") {
        config.discord.token = val;
    }
    if let Ok(val) = std::env::var("COGBOT_DISCORD__API_BASE") {
        config.discord.api_base = val;
    }
    if let Ok(val) = std::env::var("COGBOT_DISCORD__GATEWAY_URL") {
        config.discord.gateway_url = val;
    }

    if let Ok(val) = std::env::var("COGBOT_FEED__POLLING_INTERVAL") {
        match val.parse::<u64>() {
            Ok(n) => config.feed.polling_interval = n,
            Err(_) => warn!("Ignoring invalid COGBOT_FEED__POLLING_INTERVAL={}", val),
        }
    }

    if let Ok(val) = std::env::var("COGBOT_JIRA__BASE_URL") {
        config.jira.base_url = val;
    }

    if let Ok(val) = std::env::var("COGBOT_COMMANDS__PREFIX") {
        config.commands.prefix = val;
    }

    config
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp_json(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_missing_file() {
        let config = load_config_from_path(Path::new("/nonexistent/path/config.json"));
        assert_eq!(config.feed.polling_interval, 60);
        assert_eq!(config.commands.prefix, "!");
    }

    #[test]
    fn test_load_valid_json() {
        let file = write_temp_json(
            r#"{
            "servers": { "100": { "logChannel": "900" } },
            "helpchat": {
                "servers": {
                    "100": {
                        "channels": ["201", "202"],
                        "secondsUntilStale": 1800,
                        "resolveWithReaction": true
                    }
                }
            }
        }"#,
        );

        let config = load_config_from_path(file.path());
        assert_eq!(config.servers["100"].log_channel.as_deref(), Some("900"));
        let hc = &config.helpchat.servers["100"];
        assert_eq!(hc.channels, vec!["201", "202"]);
        assert_eq!(hc.seconds_until_stale, 1800);
        assert!(hc.resolve_with_reaction);
        // Default preserved
        assert_eq!(hc.seconds_to_poll, 600);
    }

    #[test]
    fn test_load_invalid_json_returns_defaults() {
        let file = write_temp_json("not valid json {{{");
        let config = load_config_from_path(file.path());
        assert!(config.helpchat.servers.is_empty());
        assert_eq!(config.jira.project_key, "MC");
    }

    #[test]
    fn test_load_empty_json() {
        let file = write_temp_json("{}");
        let config = load_config_from_path(file.path());
        assert_eq!(config.jira.base_url, "https://bugs.mojang.com");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = Config::default();
        config.jira.base_url = "https://jira.example.com".to_string();
        config.commands.managers = vec!["42".to_string()];

        save_config(&config, Some(&path)).unwrap();

        let reloaded = load_config_from_path(&path);
        assert_eq!(reloaded.jira.base_url, "https://jira.example.com");
        assert_eq!(reloaded.commands.managers, vec!["42"]);
    }

    #[test]
    fn test_migrate_snake_case_helpchat_keys() {
        let file = write_temp_json(
            r#"{
            "helpchat": {
                "servers": {
                    "100": {
                        "channels": ["201"],
                        "seconds_until_stale": 120,
                        "free_prefix": "🟢",
                        "resolve_with_reaction": true
                    }
                }
            }
        }"#,
        );

        let config = load_config_from_path(file.path());
        let hc = &config.helpchat.servers["100"];
        assert_eq!(hc.seconds_until_stale, 120);
        assert_eq!(hc.free_prefix, "🟢");
        assert!(hc.resolve_with_reaction);
    }

    #[test]
    fn test_migrate_no_overwrite() {
        let file = write_temp_json(
            r#"{
            "helpchat": {
                "servers": {
                    "100": {
                        "secondsToPoll": 30,
                        "seconds_to_poll": 999
                    }
                }
            }
        }"#,
        );

        let config = load_config_from_path(file.path());
        // Existing value should NOT be overwritten by migration
        assert_eq!(config.helpchat.servers["100"].seconds_to_poll, 30);
    }

    #[test]
    fn test_env_override_token() {
        std::env::set_var("COGBOT_DISCORD__TOKEN", "env-token");
        let config = apply_env_overrides(Config::default());
        assert_eq!(config.discord.token, "env-token");
        std::env::remove_var("COGBOT_DISCORD__TOKEN");
    }

    #[test]
    fn test_env_override_polling_interval() {
        std::env::set_var("COGBOT_FEED__POLLING_INTERVAL", "300");
        let config = apply_env_overrides(Config::default());
        assert_eq!(config.feed.polling_interval, 300);
        std::env::remove_var("COGBOT_FEED__POLLING_INTERVAL");
    }

    #[test]
    fn test_saved_json_uses_camel_case() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = Config::default();
        config
            .helpchat
            .servers
            .insert("100".into(), Default::default());
        save_config(&config, Some(&path)).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let raw: serde_json::Value = serde_json::from_str(&content).unwrap();

        let server = &raw["helpchat"]["servers"]["100"];
        assert!(server.get("secondsUntilStale").is_some());
        assert!(server.get("seconds_until_stale").is_none());
        assert!(raw["feed"].get("pollingInterval").is_some());
    }
}
