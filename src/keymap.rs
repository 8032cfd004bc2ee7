#![forbid(unsafe_code)]

//! Key combos and the per-scope binding table.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::KeymapError;
use crate::model::{Mode, Scope};

const MOD_SHIFT: u8 = 0b001;
const MOD_CONTROL: u8 = 0b010;
const MOD_ALT: u8 = 0b100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KeyCombo {
    key: KeyToken,
    modifiers: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum KeyToken {
    Char(char),
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    Tab,
    BackTab,
    Enter,
    Backspace,
    Esc,
    Delete,
    Insert,
    Space,
    F(u8),
}

impl KeyCombo {
    fn new(key: KeyToken, mut modifiers: u8) -> Self {
        let key = match key {
            KeyToken::Char(' ') => KeyToken::Space,
            KeyToken::Char(ch) if ch.is_uppercase() => {
                modifiers |= MOD_SHIFT;
                KeyToken::Char(ch.to_lowercase().next().unwrap_or(ch))
            }
            KeyToken::Char(ch) if !ch.is_alphabetic() => {
                // The terminal reports shift for `?`, `+` and friends.
                modifiers &= !MOD_SHIFT;
                KeyToken::Char(ch)
            }
            KeyToken::Tab if modifiers & MOD_SHIFT != 0 => {
                modifiers &= !MOD_SHIFT;
                KeyToken::BackTab
            }
            KeyToken::BackTab => {
                modifiers &= !MOD_SHIFT;
                KeyToken::BackTab
            }
            other => other,
        };
        Self { key, modifiers }
    }

    pub fn from_event(event: KeyEvent) -> Option<Self> {
        if event.kind == KeyEventKind::Release {
            return None;
        }
        let modifiers = normalize_modifiers(event.modifiers);
        let key = match event.code {
            KeyCode::Char(ch) => KeyToken::Char(ch),
            KeyCode::Up => KeyToken::Up,
            KeyCode::Down => KeyToken::Down,
            KeyCode::Left => KeyToken::Left,
            KeyCode::Right => KeyToken::Right,
            KeyCode::Home => KeyToken::Home,
            KeyCode::End => KeyToken::End,
            KeyCode::PageUp => KeyToken::PageUp,
            KeyCode::PageDown => KeyToken::PageDown,
            KeyCode::Tab => KeyToken::Tab,
            KeyCode::BackTab => KeyToken::BackTab,
            KeyCode::Enter => KeyToken::Enter,
            KeyCode::Backspace => KeyToken::Backspace,
            KeyCode::Esc => KeyToken::Esc,
            KeyCode::Delete => KeyToken::Delete,
            KeyCode::Insert => KeyToken::Insert,
            KeyCode::F(n) if (1..=12).contains(&n) => KeyToken::F(n),
            _ => return None,
        };
        Some(Self::new(key, modifiers))
    }

    /// The typed character of an unmodified (or shifted) printable key.
    pub fn printable(&self) -> Option<char> {
        if self.modifiers & (MOD_CONTROL | MOD_ALT) != 0 {
            return None;
        }
        match self.key {
            KeyToken::Char(ch) if self.modifiers & MOD_SHIFT != 0 => ch.to_uppercase().next(),
            KeyToken::Char(ch) => Some(ch),
            KeyToken::Space => Some(' '),
            _ => None,
        }
    }
}

impl FromStr for KeyCombo {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let mut rest = raw.trim();
        if rest.is_empty() {
            return Err("combo is empty".to_owned());
        }

        let mut modifiers = 0u8;
        loop {
            let lower = rest.to_ascii_lowercase();
            let (flag, len) = if lower.starts_with("ctrl+") {
                (MOD_CONTROL, "ctrl+".len())
            } else if lower.starts_with("control+") {
                (MOD_CONTROL, "control+".len())
            } else if lower.starts_with("alt+") {
                (MOD_ALT, "alt+".len())
            } else if lower.starts_with("shift+") {
                (MOD_SHIFT, "shift+".len())
            } else {
                break;
            };
            if rest.len() == len {
                break;
            }
            modifiers |= flag;
            rest = &rest[len..];
        }

        let lower = rest.to_ascii_lowercase();
        let key = match lower.as_str() {
            "up" => KeyToken::Up,
            "down" => KeyToken::Down,
            "left" => KeyToken::Left,
            "right" => KeyToken::Right,
            "home" => KeyToken::Home,
            "end" => KeyToken::End,
            "pageup" => KeyToken::PageUp,
            "pagedown" => KeyToken::PageDown,
            "tab" => KeyToken::Tab,
            "backtab" => KeyToken::BackTab,
            "enter" => KeyToken::Enter,
            "backspace" => KeyToken::Backspace,
            "esc" | "escape" => KeyToken::Esc,
            "delete" | "del" => KeyToken::Delete,
            "insert" | "ins" => KeyToken::Insert,
            "space" => KeyToken::Space,
            name if name.len() > 1 && name.starts_with('f') => {
                let n: u8 = name[1..]
                    .parse()
                    .map_err(|_| format!("unknown key '{rest}'"))?;
                if !(1..=12).contains(&n) {
                    return Err(format!("function key out of range '{rest}'"));
                }
                KeyToken::F(n)
            }
            _ => {
                let mut chars = rest.chars();
                let Some(ch) = chars.next() else {
                    return Err("missing key after modifier".to_owned());
                };
                if chars.next().is_some() {
                    return Err(format!(
                        "keys must be single chars or named keys, got '{rest}'"
                    ));
                }
                KeyToken::Char(ch)
            }
        };
        Ok(Self::new(key, modifiers))
    }
}

impl fmt::Display for KeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if self.modifiers & MOD_CONTROL != 0 {
            parts.push("ctrl".to_owned());
        }
        if self.modifiers & MOD_ALT != 0 {
            parts.push("alt".to_owned());
        }
        if self.modifiers & MOD_SHIFT != 0 {
            parts.push("shift".to_owned());
        }
        let key = match self.key {
            KeyToken::Char(ch) => ch.to_string(),
            KeyToken::Up => "up".to_owned(),
            KeyToken::Down => "down".to_owned(),
            KeyToken::Left => "left".to_owned(),
            KeyToken::Right => "right".to_owned(),
            KeyToken::Home => "home".to_owned(),
            KeyToken::End => "end".to_owned(),
            KeyToken::PageUp => "pageup".to_owned(),
            KeyToken::PageDown => "pagedown".to_owned(),
            KeyToken::Tab => "tab".to_owned(),
            KeyToken::BackTab => "backtab".to_owned(),
            KeyToken::Enter => "enter".to_owned(),
            KeyToken::Backspace => "backspace".to_owned(),
            KeyToken::Esc => "esc".to_owned(),
            KeyToken::Delete => "delete".to_owned(),
            KeyToken::Insert => "insert".to_owned(),
            KeyToken::Space => "space".to_owned(),
            KeyToken::F(n) => format!("f{n}"),
        };
        parts.push(key);
        write!(f, "{}", parts.join("+"))
    }
}

fn normalize_modifiers(modifiers: KeyModifiers) -> u8 {
    let mut normalized = 0u8;
    if modifiers.contains(KeyModifiers::SHIFT) {
        normalized |= MOD_SHIFT;
    }
    if modifiers.contains(KeyModifiers::CONTROL) {
        normalized |= MOD_CONTROL;
    }
    if modifiers.contains(KeyModifiers::ALT) {
        normalized |= MOD_ALT;
    }
    normalized
}

/// Serializable binding table, as stored in `keymap.json`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct KeymapConfig {
    pub scopes: BTreeMap<Scope, Vec<ComboConfig>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComboConfig {
    pub keys: Vec<String>,
    pub bindings: Vec<BindingSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindingSpec {
    pub command: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub args: Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Guard<T> {
    pub value: T,
    pub negated: bool,
}

impl<T: Ord> Guard<T> {
    fn holds(&self, present: &BTreeSet<T>) -> bool {
        present.contains(&self.value) != self.negated
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub command: String,
    pub args: Value,
    pub modes: Vec<Guard<Mode>>,
    pub tags: Vec<Guard<String>>,
}

impl Binding {
    /// Any guard of a kind may hold; every non-empty kind must.
    pub fn passes(&self, modes: &BTreeSet<Mode>, tags: &BTreeSet<String>) -> bool {
        let modes_ok = self.modes.is_empty() || self.modes.iter().any(|g| g.holds(modes));
        let tags_ok = self.tags.is_empty() || self.tags.iter().any(|g| g.holds(tags));
        modes_ok && tags_ok
    }
}

pub type ScopeBindings = BTreeMap<KeyCombo, Vec<Binding>>;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Keymap {
    scopes: BTreeMap<Scope, ScopeBindings>,
}

impl Keymap {
    pub fn compile(config: &KeymapConfig) -> Result<Self, KeymapError> {
        let mut scopes = BTreeMap::new();
        for (scope, combos) in &config.scopes {
            let mut table = ScopeBindings::new();
            for combo in combos {
                let bindings = combo
                    .bindings
                    .iter()
                    .map(|spec| compile_binding(*scope, spec))
                    .collect::<Result<Vec<_>, _>>()?;
                for raw in &combo.keys {
                    let key: KeyCombo =
                        raw.parse().map_err(|message| KeymapError::InvalidCombo {
                            combo: raw.clone(),
                            message,
                        })?;
                    table
                        .entry(key)
                        .or_insert_with(Vec::new)
                        .extend(bindings.iter().cloned());
                }
            }
            scopes.insert(*scope, table);
        }
        Ok(Self { scopes })
    }

    /// Reads an override file, or the built-in table when there is none.
    pub fn load(path: &Path) -> Result<Self, KeymapError> {
        if !path.exists() {
            return Self::compile(&default_config());
        }
        let raw = std::fs::read_to_string(path)?;
        let config: KeymapConfig = serde_json::from_str(&raw)?;
        tracing::info!("loaded keymap from {}", path.display());
        Self::compile(&config)
    }

    pub fn builtin() -> Self {
        match Self::compile(&default_config()) {
            Ok(keymap) => keymap,
            Err(e) => {
                tracing::error!("built-in keymap is invalid: {}", e);
                Self::default()
            }
        }
    }

    pub fn scope(&self, scope: Scope) -> Option<&ScopeBindings> {
        self.scopes.get(&scope)
    }
}

fn compile_binding(scope: Scope, spec: &BindingSpec) -> Result<Binding, KeymapError> {
    let invalid = |guard: &str, message: String| KeymapError::InvalidGuard {
        scope: scope.to_string(),
        guard: guard.to_owned(),
        message,
    };

    let mut modes = Vec::with_capacity(spec.modes.len());
    for raw in &spec.modes {
        let (name, negated) = split_guard(raw);
        let mode: Mode = name.parse().map_err(|message| invalid(raw, message))?;
        modes.push(Guard {
            value: mode,
            negated,
        });
    }

    let mut tags = Vec::with_capacity(spec.tags.len());
    for raw in &spec.tags {
        let (name, negated) = split_guard(raw);
        if name.is_empty() {
            return Err(invalid(raw, "tag name is empty".to_owned()));
        }
        tags.push(Guard {
            value: name.to_owned(),
            negated,
        });
    }

    Ok(Binding {
        command: spec.command.clone(),
        args: spec.args.clone(),
        modes,
        tags,
    })
}

fn split_guard(raw: &str) -> (&str, bool) {
    let raw = raw.trim();
    match raw.strip_prefix('!') {
        Some(name) => (name.trim(), true),
        None => (raw, false),
    }
}

fn bind(keys: &[&str], bindings: Vec<BindingSpec>) -> ComboConfig {
    ComboConfig {
        keys: keys.iter().map(|key| (*key).to_owned()).collect(),
        bindings,
    }
}

fn run(command: &str, args: Value) -> BindingSpec {
    BindingSpec {
        command: command.to_owned(),
        args,
        modes: Vec::new(),
        tags: Vec::new(),
    }
}

fn when_mode(mut spec: BindingSpec, modes: &[&str]) -> BindingSpec {
    spec.modes = modes.iter().map(|m| (*m).to_owned()).collect();
    spec
}

fn when_tag(mut spec: BindingSpec, tags: &[&str]) -> BindingSpec {
    spec.tags = tags.iter().map(|t| (*t).to_owned()).collect();
    spec
}

fn step(direction: &str) -> Value {
    json!({"kind": "step", "direction": direction})
}

pub fn default_config() -> KeymapConfig {
    let mut browse = vec![
        bind(&["up"], vec![run("cursor", step("up"))]),
        bind(&["down"], vec![run("cursor", step("down"))]),
        bind(
            &["ctrl+up"],
            vec![run("cursor", json!({"kind": "step", "direction": "up", "wrap": true}))],
        ),
        bind(
            &["ctrl+down"],
            vec![run("cursor", json!({"kind": "step", "direction": "down", "wrap": true}))],
        ),
        bind(
            &["left"],
            vec![
                when_mode(run("cursor", step("left")), &["gallery"]),
                when_mode(run("parent", Value::Null), &["!gallery"]),
            ],
        ),
        bind(
            &["right"],
            vec![
                when_mode(run("cursor", step("right")), &["gallery"]),
                when_mode(run("enter", Value::Null), &["!gallery"]),
            ],
        ),
        bind(&["pageup"], vec![run("cursor", json!({"kind": "page", "direction": "up"}))]),
        bind(&["pagedown"], vec![run("cursor", json!({"kind": "page", "direction": "down"}))]),
        bind(&["home"], vec![run("cursor", json!({"kind": "home"}))]),
        bind(&["end"], vec![run("cursor", json!({"kind": "end"}))]),
        bind(&["enter"], vec![run("enter", Value::Null)]),
        bind(&["backspace"], vec![run("parent", Value::Null)]),
        bind(&["alt+left"], vec![run("history-back", Value::Null)]),
        bind(&["alt+right"], vec![run("history-forward", Value::Null)]),
        bind(&["tab"], vec![run("switch-frame", Value::Null)]),
        bind(&["insert", "space"], vec![run("toggle-select", json!({"advance": true}))]),
        bind(&["+"], vec![run("select-all", Value::Null)]),
        bind(&["-"], vec![run("deselect-all", Value::Null)]),
        bind(&["*"], vec![run("invert-selection", Value::Null)]),
        bind(&["ctrl+n"], vec![run("sort", json!({"field": "name"}))]),
        bind(&["ctrl+e"], vec![run("sort", json!({"field": "extension"}))]),
        bind(&["ctrl+s"], vec![run("sort", json!({"field": "size"}))]),
        bind(&["ctrl+t"], vec![run("sort", json!({"field": "time"}))]),
        bind(&["ctrl+u"], vec![run("sort", json!({"field": "unsorted"}))]),
        bind(&["ctrl+o"], vec![run("sort-order", Value::Null)]),
        bind(&["ctrl+d"], vec![run("sort-dirs", Value::Null)]),
        bind(&["ctrl+x"], vec![run("sort-clear", Value::Null)]),
        bind(&["/"], vec![run("filter-open", Value::Null)]),
        bind(&["ctrl+g"], vec![run("toggle-mode", json!({"mode": "gallery"}))]),
        bind(&["f3"], vec![run("toggle-mode", json!({"mode": "preview"}))]),
        bind(&["f4"], vec![run("open", Value::Null)]),
        bind(
            &["f5"],
            vec![
                when_mode(run("copy", Value::Null), &["!virtual-dir"]),
                when_mode(run("extract", Value::Null), &["virtual-dir"]),
            ],
        ),
        bind(&["f6"], vec![when_mode(run("move", Value::Null), &["!virtual-dir"])]),
        bind(&["f8", "delete"], vec![when_mode(run("delete", Value::Null), &["!virtual-dir"])]),
        bind(&["ctrl+k"], vec![run("abort-task", Value::Null)]),
        bind(&["ctrl+b"], vec![run("bookmark-add", Value::Null)]),
        bind(&["ctrl+r"], vec![run("refresh", Value::Null)]),
    ];
    for n in 1..=9 {
        let user_menu = format!("alt+{n}");
        let bookmark = format!("shift+f{n}");
        browse.push(bind(
            &[user_menu.as_str()],
            vec![run("user-menu", json!({"index": n - 1}))],
        ));
        browse.push(bind(
            &[bookmark.as_str()],
            vec![run("bookmark-goto", json!({"index": n - 1}))],
        ));
    }

    let filter = vec![
        bind(&["esc"], vec![run("filter-cancel", Value::Null)]),
        bind(&["enter"], vec![run("filter-close", Value::Null)]),
        bind(&["backspace"], vec![run("filter-backspace", Value::Null)]),
        bind(&["up"], vec![run("cursor", step("up"))]),
        bind(&["down"], vec![run("cursor", step("down"))]),
    ];

    let confirm = vec![
        bind(
            &["enter"],
            vec![
                when_tag(run("dialog-accept", Value::Null), &["dialog-ok"]),
                when_tag(run("dialog-reject", Value::Null), &["dialog-cancel"]),
            ],
        ),
        bind(&["y"], vec![run("dialog-accept", Value::Null)]),
        bind(&["n", "esc"], vec![run("dialog-reject", Value::Null)]),
        bind(&["tab", "left", "right"], vec![run("dialog-focus", Value::Null)]),
    ];

    let mut scopes = BTreeMap::new();
    scopes.insert(Scope::Browse, browse);
    scopes.insert(Scope::Filter, filter);
    scopes.insert(Scope::Confirm, confirm);
    KeymapConfig { scopes }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn combo(raw: &str) -> KeyCombo {
        raw.parse().expect("combo")
    }

    #[test]
    fn combos_normalize_to_canonical_names() {
        assert_eq!(combo("Ctrl+Alt+x").to_string(), "ctrl+alt+x");
        assert_eq!(combo("X").to_string(), "shift+x");
        assert_eq!(combo("shift+x"), combo("X"));
        assert_eq!(combo("shift+?").to_string(), "?");
        assert_eq!(combo("+").to_string(), "+");
        assert_eq!(combo("ctrl++").to_string(), "ctrl++");
        assert_eq!(combo("space").to_string(), "space");
        assert_eq!(combo("F12").to_string(), "f12");
        assert_eq!(combo("shift+tab").to_string(), "backtab");
        assert_eq!(combo("shift+backtab").to_string(), "backtab");
    }

    #[test]
    fn invalid_combos_are_rejected() {
        assert!("".parse::<KeyCombo>().is_err());
        assert!("ctrl+nope".parse::<KeyCombo>().is_err());
        assert!("f13".parse::<KeyCombo>().is_err());
    }

    #[test]
    fn key_events_map_to_combos() {
        let event = KeyEvent::new(KeyCode::Char('A'), KeyModifiers::SHIFT);
        assert_eq!(KeyCombo::from_event(event), Some(combo("shift+a")));

        let event = KeyEvent::new(KeyCode::Tab, KeyModifiers::SHIFT);
        assert_eq!(KeyCombo::from_event(event), Some(combo("backtab")));

        let event = KeyEvent::new(KeyCode::Char('?'), KeyModifiers::SHIFT);
        assert_eq!(KeyCombo::from_event(event).map(|c| c.to_string()), Some("?".into()));

        let event = KeyEvent::new(KeyCode::F(5), KeyModifiers::NONE);
        assert_eq!(KeyCombo::from_event(event), Some(combo("f5")));

        let event = KeyEvent::new(KeyCode::CapsLock, KeyModifiers::NONE);
        assert_eq!(KeyCombo::from_event(event), None);
    }

    #[test]
    fn printable_keys_report_typed_text() {
        assert_eq!(combo("a").printable(), Some('a'));
        assert_eq!(combo("shift+a").printable(), Some('A'));
        assert_eq!(combo("space").printable(), Some(' '));
        assert_eq!(combo("ctrl+a").printable(), None);
        assert_eq!(combo("enter").printable(), None);
    }

    #[test]
    fn guards_are_or_within_kind_and_across_kinds() {
        let binding = Binding {
            command: "x".into(),
            args: Value::Null,
            modes: vec![
                Guard {
                    value: Mode::Gallery,
                    negated: false,
                },
                Guard {
                    value: Mode::Filter,
                    negated: false,
                },
            ],
            tags: vec![Guard {
                value: "busy".to_string(),
                negated: true,
            }],
        };
        let gallery: BTreeSet<Mode> = [Mode::Gallery].into();
        let none = BTreeSet::new();
        let busy: BTreeSet<String> = ["busy".to_string()].into();
        let idle = BTreeSet::new();

        assert!(binding.passes(&gallery, &idle));
        assert!(!binding.passes(&gallery, &busy));
        assert!(!binding.passes(&none, &idle));
    }

    #[test]
    fn unknown_mode_guard_is_rejected() {
        let mut config = KeymapConfig::default();
        config.scopes.insert(
            Scope::Browse,
            vec![bind(&["a"], vec![when_mode(run("x", Value::Null), &["!zoom"])])],
        );
        let err = Keymap::compile(&config).expect_err("invalid guard");
        assert!(matches!(err, KeymapError::InvalidGuard { .. }));
    }

    #[test]
    fn repeated_combo_appends_bindings_in_order() {
        let mut config = KeymapConfig::default();
        config.scopes.insert(
            Scope::Browse,
            vec![
                bind(&["a"], vec![run("first", Value::Null)]),
                bind(&["a", "b"], vec![run("second", Value::Null)]),
            ],
        );
        let keymap = Keymap::compile(&config).expect("compiles");
        let table = keymap.scope(Scope::Browse).expect("browse");
        let commands: Vec<&str> = table[&combo("a")].iter().map(|b| b.command.as_str()).collect();
        assert_eq!(commands, ["first", "second"]);
        assert_eq!(table[&combo("b")].len(), 1);
    }

    #[test]
    fn builtin_table_compiles_for_every_scope() {
        let keymap = Keymap::builtin();
        for scope in [Scope::Browse, Scope::Filter, Scope::Confirm] {
            assert!(keymap.scope(scope).is_some_and(|table| !table.is_empty()));
        }
        let browse = keymap.scope(Scope::Browse).expect("browse");
        assert_eq!(browse[&combo("left")].len(), 2);
    }

    #[test]
    fn load_falls_back_to_builtin_and_reads_overrides() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("keymap.json");
        assert_eq!(Keymap::load(&path).expect("default"), Keymap::builtin());

        let mut config = KeymapConfig::default();
        config
            .scopes
            .insert(Scope::Browse, vec![bind(&["q"], vec![run("refresh", Value::Null)])]);
        std::fs::write(&path, serde_json::to_string(&config).expect("encode")).expect("write");
        let keymap = Keymap::load(&path).expect("override");
        assert_eq!(keymap.scope(Scope::Browse).map(|t| t.len()), Some(1));
        assert!(keymap.scope(Scope::Confirm).is_none());
    }
}
