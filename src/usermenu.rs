#![forbid(unsafe_code)]

//! `label|command` lines run through the service's shell.

use std::io;
use std::path::Path;

use crate::model::UserMenuItem;

const SAMPLE: &str = "# label|command, run in the active directory\nList|ls -la\nDisk usage|du -sh *\n";

pub fn ensure_user_menu_file(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if !path.exists() {
        std::fs::write(path, SAMPLE)?;
        tracing::info!("created sample user menu at {}", path.display());
    }
    Ok(())
}

/// Unreadable files give an empty menu.
pub fn load_user_menu(path: &Path) -> Vec<UserMenuItem> {
    match std::fs::read_to_string(path) {
        Ok(content) => parse_user_menu(&content),
        Err(e) => {
            tracing::warn!("cannot read user menu {}: {}", path.display(), e);
            Vec::new()
        }
    }
}

pub fn parse_user_menu(content: &str) -> Vec<UserMenuItem> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let (label, command) = line.split_once('|').unwrap_or((line, ""));
            let label = label.trim();
            let command = command.trim();
            (!label.is_empty() && !command.is_empty()).then(|| UserMenuItem {
                label: label.to_string(),
                command: command.to_string(),
            })
        })
        .collect()
}
