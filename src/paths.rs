#![forbid(unsafe_code)]

//! String path helpers. Paths come from the server and are never touched on
//! the local filesystem, so everything here is lexical.

pub fn join_path(base: &str, name: &str) -> String {
    if name.starts_with('/') || base.is_empty() {
        return name.to_string();
    }
    if base.ends_with('/') {
        format!("{base}{name}")
    } else {
        format!("{base}/{name}")
    }
}

/// `None` for the root and for empty paths.
pub fn parent_path(path: &str) -> Option<String> {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.rsplit_once('/') {
        Some(("", _)) => Some("/".to_string()),
        Some((head, _)) => Some(head.to_string()),
        None => None,
    }
}

/// Resolves `.` and `..` segments without consulting the filesystem.
pub fn normalize_path(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if matches!(parts.last(), Some(last) if *last != "..") {
                    parts.pop();
                } else if !absolute {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }
    let joined = parts.join("/");
    if absolute {
        format!("/{joined}")
    } else {
        joined
    }
}

/// First segment of `old` below `new`, when `new` is a strict ancestor of `old`.
pub fn child_on_path(new: &str, old: &str) -> Option<String> {
    let new = new.trim_end_matches('/');
    let rest = old.strip_prefix(new)?;
    if !rest.starts_with('/') {
        return None;
    }
    rest.trim_start_matches('/')
        .split('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}

/// Joins a name onto a path inside an archive; the archive root is `""`.
pub fn inner_join(inner: &str, name: &str) -> String {
    let inner = inner.trim_matches('/');
    if inner.is_empty() {
        name.to_string()
    } else {
        format!("{inner}/{name}")
    }
}

/// Path a pane shows while browsing inside an archive.
pub fn overlay_path(archive: &str, inner: &str) -> String {
    let inner = inner.trim_matches('/');
    if inner.is_empty() {
        archive.to_string()
    } else {
        join_path(archive, inner)
    }
}

pub fn file_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}
