use std::path::PathBuf;

use crate::db::Database;

pub const DB_ENV: &str = "FACHOWIEC_DB";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub db_path: PathBuf,
    /// env_logger filter used when RUST_LOG is not set.
    pub log_filter: String,
}

impl Config {
    /// Flag beats environment beats the platform data directory.
    pub fn resolve(db_flag: Option<PathBuf>, verbose: bool) -> Self {
        Self::from_sources(db_flag, std::env::var_os(DB_ENV).map(PathBuf::from), verbose)
    }

    fn from_sources(db_flag: Option<PathBuf>, db_env: Option<PathBuf>, verbose: bool) -> Self {
        let db_path = db_flag
            .or(db_env.filter(|p| !p.as_os_str().is_empty()))
            .unwrap_or_else(Database::default_path);
        Self {
            db_path,
            log_filter: if verbose { "debug" } else { "warn" }.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_wins() {
        let cfg = Config::from_sources(Some("a.db".into()), Some("b.db".into()), false);
        assert_eq!(cfg.db_path, PathBuf::from("a.db"));
        assert_eq!(cfg.log_filter, "warn");
    }

    #[test]
    fn test_env_then_default() {
        let cfg = Config::from_sources(None, Some("b.db".into()), true);
        assert_eq!(cfg.db_path, PathBuf::from("b.db"));
        assert_eq!(cfg.log_filter, "debug");

        let cfg = Config::from_sources(None, Some("".into()), false);
        assert_eq!(cfg.db_path, Database::default_path());
    }
}
