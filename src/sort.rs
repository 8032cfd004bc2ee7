#![forbid(unsafe_code)]

use std::cmp::Ordering;

use crate::model::{DirPosition, Entry, SortCriterion, SortField, SortOrder};

/// Sorted view over `entries`. The `..` entry always leads.
pub fn sort_entries(entries: &[Entry], criterion: SortCriterion) -> Vec<&Entry> {
    let (mut sorted, mut rest): (Vec<&Entry>, Vec<&Entry>) =
        entries.iter().partition(|entry| entry.is_parent());
    rest.sort_by(|a, b| compare(a, b, criterion));
    sorted.extend(rest);
    sorted
}

fn compare(a: &Entry, b: &Entry, criterion: SortCriterion) -> Ordering {
    let group = match criterion.dir_position {
        DirPosition::Top => b.is_dir().cmp(&a.is_dir()),
        DirPosition::Bottom => a.is_dir().cmp(&b.is_dir()),
        DirPosition::None => Ordering::Equal,
    };
    group.then_with(|| {
        let ordering = match criterion.field {
            SortField::Name => cmp_name(a, b),
            SortField::Extension => cmp_ext(a, b).then_with(|| cmp_name(a, b)),
            SortField::Size => cmp_size(a, b).then_with(|| cmp_name(a, b)),
            SortField::Time => cmp_time(a, b).then_with(|| cmp_name(a, b)),
            SortField::Unsorted => Ordering::Equal,
        };
        match criterion.order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    })
}

pub fn cmp_name(a: &Entry, b: &Entry) -> Ordering {
    a.name
        .to_lowercase()
        .cmp(&b.name.to_lowercase())
        .then_with(|| a.name.cmp(&b.name))
}

pub fn cmp_ext(a: &Entry, b: &Entry) -> Ordering {
    extension(&a.name).cmp(&extension(&b.name))
}

pub fn cmp_time(a: &Entry, b: &Entry) -> Ordering {
    a.time.cmp(&b.time)
}

pub fn cmp_size(a: &Entry, b: &Entry) -> Ordering {
    parse_size(&a.size).cmp(&parse_size(&b.size))
}

fn extension(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext.to_lowercase(),
        _ => String::new(),
    }
}

/// Bytes from a display size such as `812`, `4.0K` or `1.5 MB`; 0 when unreadable.
pub fn parse_size(display: &str) -> u64 {
    let display = display.trim();
    let split = display
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(display.len());
    let (number, suffix) = display.split_at(split);
    let Ok(value) = number.parse::<f64>() else {
        return 0;
    };
    let exponent = match suffix.trim().chars().next().map(|c| c.to_ascii_uppercase()) {
        None | Some('B') => 0,
        Some('K') => 1,
        Some('M') => 2,
        Some('G') => 3,
        Some('T') => 4,
        Some('P') => 5,
        Some(_) => return 0,
    };
    (value * 1024f64.powi(exponent)) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, size: &str, time: &str) -> Entry {
        let mut entry = Entry::new(name, "-rw-r--r--");
        entry.size = size.to_string();
        entry.time = time.to_string();
        entry
    }

    fn dir(name: &str) -> Entry {
        Entry::new(name, "drwxr-xr-x")
    }

    fn names(entries: &[&Entry]) -> Vec<String> {
        entries.iter().map(|e| e.name.clone()).collect()
    }

    fn listing() -> Vec<Entry> {
        vec![
            file("b.txt", "2K", "2024-01-03 10:00"),
            Entry::parent(),
            dir("Zeta"),
            file("A.md", "100", "2024-01-01 10:00"),
            dir("alpha"),
            file("c.rs", "1.5M", "2024-01-02 10:00"),
        ]
    }

    #[test]
    fn default_sort_puts_parent_then_dirs_then_names() {
        let entries = listing();
        let sorted = sort_entries(&entries, SortCriterion::default());
        assert_eq!(names(&sorted), ["..", "alpha", "Zeta", "A.md", "b.txt", "c.rs"]);
    }

    #[test]
    fn descending_size_with_dirs_at_bottom() {
        let entries = listing();
        let criterion = SortCriterion {
            field: SortField::Size,
            order: SortOrder::Desc,
            dir_position: DirPosition::Bottom,
        };
        let sorted = sort_entries(&entries, criterion);
        assert_eq!(names(&sorted), ["..", "c.rs", "b.txt", "A.md", "Zeta", "alpha"]);
    }

    #[test]
    fn time_sort_mixed_with_directories() {
        let entries = listing();
        let criterion = SortCriterion {
            field: SortField::Time,
            order: SortOrder::Asc,
            dir_position: DirPosition::None,
        };
        let sorted = sort_entries(&entries, criterion);
        assert_eq!(names(&sorted), ["..", "alpha", "Zeta", "A.md", "c.rs", "b.txt"]);
    }

    #[test]
    fn unsorted_keeps_server_order() {
        let entries = listing();
        let criterion = SortCriterion {
            field: SortField::Unsorted,
            order: SortOrder::Asc,
            dir_position: DirPosition::None,
        };
        let sorted = sort_entries(&entries, criterion);
        assert_eq!(names(&sorted), ["..", "b.txt", "Zeta", "A.md", "alpha", "c.rs"]);
    }

    #[test]
    fn display_sizes_parse_with_binary_suffixes() {
        assert_eq!(parse_size("812"), 812);
        assert_eq!(parse_size("4.0K"), 4096);
        assert_eq!(parse_size("1.5 MB"), 1_572_864);
        assert_eq!(parse_size("2G"), 2 * 1024 * 1024 * 1024);
        assert_eq!(parse_size("-"), 0);
        assert_eq!(parse_size(""), 0);
    }
}
