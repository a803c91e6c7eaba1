use parallel_worlds_core::SessionConfig;
use std::{fs, path::Path};
use tracing::{debug, warn};

pub const DEFAULT_SESSION_PATH: &str = "config/session.toml";

/// Load session settings from `path` (or the default location), falling back
/// to defaults when the file is missing or malformed.
pub fn load_session_config(path: Option<&Path>) -> SessionConfig {
    let explicit = path.is_some();
    let path = path.unwrap_or(Path::new(DEFAULT_SESSION_PATH));
    match fs::read_to_string(path) {
        Ok(contents) => parse_session_config(&contents).unwrap_or_else(|err| {
            warn!("Failed to parse {}: {err}. Using defaults", path.display());
            SessionConfig::default()
        }),
        Err(err) => {
            if explicit || err.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to read {}: {err}. Using defaults", path.display());
            } else {
                debug!(
                    "Session config not found at {}. Using defaults",
                    path.display()
                );
            }
            SessionConfig::default()
        }
    }
}

fn parse_session_config(contents: &str) -> Result<SessionConfig, toml::de::Error> {
    toml::from_str(contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parallel_worlds_core::PickMode;
    use std::io::Write;

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = parse_session_config(
            r#"
            tick_rate = 30
            pick_mode = "random"

            [shooting]
            cooldown = 0.5
            "#,
        )
        .unwrap();
        assert_eq!(config.tick_rate, 30);
        assert_eq!(config.pick_mode, PickMode::Random);
        assert_eq!(config.shooting.cooldown, 0.5);
        assert_eq!(config.shooting.max_range, 50.0);
        assert_eq!(config.max_health, SessionConfig::default().max_health);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "tick_rate = \"fast\"").unwrap();
        let config = load_session_config(Some(file.path()));
        assert_eq!(config, SessionConfig::default());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_session_config(Some(&dir.path().join("absent.toml")));
        assert_eq!(config, SessionConfig::default());
    }

    #[test]
    fn shipped_config_parses() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join(DEFAULT_SESSION_PATH);
        let contents = fs::read_to_string(path).unwrap();
        let config = parse_session_config(&contents).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.bot.swap_interval, 3.0);
    }
}
