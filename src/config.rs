#![forbid(unsafe_code)]

//! Startup configuration, read from the environment.
//!
//! | variable               | default                  |
//! |------------------------|--------------------------|
//! | `TWINPANE_HOME`        | `$HOME`, else `/`        |
//! | `TWINPANE_STATE_DIR`   | `$HOME/.twinpane`        |
//! | `TWINPANE_GALLERY_COLUMNS` | `4`                  |
//! | `TWINPANE_ROWS_PER_PAGE`   | `20`                 |
//! | `TWINPANE_HISTORY_LIMIT`   | `50`                 |
//! | `TWINPANE_ARCHIVE_EXCLUDE` | macOS metadata     |

use std::path::PathBuf;
use std::str::FromStr;

use crate::history::DEFAULT_HISTORY_LIMIT;
use crate::pane::PaneLayout;

pub const DEFAULT_ARCHIVE_EXCLUDE: &str = r"^(__MACOSX(/|$)|.*\.DS_Store$)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Fallback directory for navigation failures and the first start.
    pub home: String,
    /// Holds the session file, the user menu and the keymap override.
    pub state_dir: PathBuf,
    pub gallery_columns: usize,
    pub rows_per_page: usize,
    pub history_limit: usize,
    /// Regex sent with `cvd` to hide archive members server-side.
    pub archive_exclude: String,
}

impl Default for Config {
    fn default() -> Self {
        let layout = PaneLayout::default();
        Self {
            home: "/".to_string(),
            state_dir: PathBuf::from(".twinpane"),
            gallery_columns: layout.gallery_columns,
            rows_per_page: layout.rows_per_page,
            history_limit: DEFAULT_HISTORY_LIMIT,
            archive_exclude: DEFAULT_ARCHIVE_EXCLUDE.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Builds a config from any variable source; unparsable numbers keep their default.
    pub fn from_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let user_home = lookup("HOME").filter(|home| !home.is_empty());
        let home = lookup("TWINPANE_HOME")
            .filter(|home| !home.is_empty())
            .or_else(|| user_home.clone())
            .unwrap_or(defaults.home);
        let state_dir = lookup("TWINPANE_STATE_DIR")
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from)
            .or_else(|| user_home.map(|home| PathBuf::from(home).join(".twinpane")))
            .unwrap_or(defaults.state_dir);

        Self {
            home,
            state_dir,
            gallery_columns: number(&lookup, "TWINPANE_GALLERY_COLUMNS", defaults.gallery_columns)
                .max(1),
            rows_per_page: number(&lookup, "TWINPANE_ROWS_PER_PAGE", defaults.rows_per_page)
                .max(1),
            history_limit: number(&lookup, "TWINPANE_HISTORY_LIMIT", defaults.history_limit)
                .max(1),
            archive_exclude: lookup("TWINPANE_ARCHIVE_EXCLUDE").unwrap_or(defaults.archive_exclude),
        }
    }

    pub fn session_path(&self) -> PathBuf {
        self.state_dir.join("session.json")
    }

    pub fn user_menu_path(&self) -> PathBuf {
        self.state_dir.join("usermenu.txt")
    }

    pub fn keymap_path(&self) -> PathBuf {
        self.state_dir.join("keymap.json")
    }

    pub fn layout(&self) -> PaneLayout {
        PaneLayout {
            gallery_columns: self.gallery_columns,
            rows_per_page: self.rows_per_page,
        }
    }
}

fn number<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Copy,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("ignoring {}={:?}: not a number", key, raw);
            default
        }),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_follow_the_user_home() {
        let config = config(&[("HOME", "/home/ana")]);
        assert_eq!(config.home, "/home/ana");
        assert_eq!(config.session_path(), PathBuf::from("/home/ana/.twinpane/session.json"));
        assert_eq!(config.gallery_columns, 4);
        assert_eq!(config.rows_per_page, 20);
        assert_eq!(config.history_limit, 50);
        assert_eq!(config.archive_exclude, DEFAULT_ARCHIVE_EXCLUDE);
    }

    #[test]
    fn overrides_and_bad_numbers() {
        let config = config(&[
            ("HOME", "/home/ana"),
            ("TWINPANE_HOME", "/srv"),
            ("TWINPANE_STATE_DIR", "/tmp/tp"),
            ("TWINPANE_GALLERY_COLUMNS", "6"),
            ("TWINPANE_ROWS_PER_PAGE", "lots"),
            ("TWINPANE_HISTORY_LIMIT", "0"),
        ]);
        assert_eq!(config.home, "/srv");
        assert_eq!(config.keymap_path(), PathBuf::from("/tmp/tp/keymap.json"));
        assert_eq!(config.layout().gallery_columns, 6);
        assert_eq!(config.rows_per_page, 20);
        assert_eq!(config.history_limit, 1);
    }

    #[test]
    fn no_home_at_all_uses_root() {
        let config = config(&[]);
        assert_eq!(config.home, "/");
        assert_eq!(config.state_dir, PathBuf::from(".twinpane"));
    }
}
