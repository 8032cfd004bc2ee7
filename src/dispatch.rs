#![forbid(unsafe_code)]

//! Key press to command resolution.
//!
//! Binding a scope resolves every command name once. Guards are checked on
//! each press against the live mode and tag state, and every passing handler
//! runs in binding order.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;

use crate::capability::Capabilities;
use crate::keymap::{Binding, KeyCombo, Keymap};
use crate::model::Scope;

pub type CommandFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

pub trait CommandHandler: Send + Sync {
    fn call<'a>(
        &'a self,
        caps: &'a dyn Capabilities,
        combo: &'a str,
        args: &'a Value,
    ) -> CommandFuture<'a>;
}

impl<F> CommandHandler for F
where
    F: for<'a> Fn(&'a dyn Capabilities, &'a str, &'a Value) -> CommandFuture<'a> + Send + Sync,
{
    fn call<'a>(
        &'a self,
        caps: &'a dyn Capabilities,
        combo: &'a str,
        args: &'a Value,
    ) -> CommandFuture<'a> {
        self(caps, combo, args)
    }
}

#[derive(Clone, Default)]
pub struct CommandRegistry {
    commands: HashMap<String, Arc<dyn CommandHandler>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, name: impl Into<String>, handler: H)
    where
        H: CommandHandler + 'static,
    {
        self.commands.insert(name.into(), Arc::new(handler));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn CommandHandler>> {
        self.commands.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    Consumed,
    Propagate,
}

#[derive(Clone)]
struct Resolved {
    binding: Binding,
    handler: Arc<dyn CommandHandler>,
}

struct BoundScope {
    scope: Scope,
    combos: BTreeMap<KeyCombo, Vec<Resolved>>,
}

pub struct Dispatcher {
    keymap: Keymap,
    registry: CommandRegistry,
    bound: Mutex<BoundScope>,
}

impl Dispatcher {
    /// Starts with nothing bound; call [`Dispatcher::bind`] before dispatching.
    pub fn new(keymap: Keymap, registry: CommandRegistry) -> Self {
        Self {
            keymap,
            registry,
            bound: Mutex::new(BoundScope {
                scope: Scope::Browse,
                combos: BTreeMap::new(),
            }),
        }
    }

    pub fn keymap(&self) -> &Keymap {
        &self.keymap
    }

    pub fn scope(&self) -> Scope {
        self.lock().scope
    }

    /// Drops all bound combos and binds the table of `scope`.
    pub fn bind(&self, scope: Scope) {
        let mut combos = BTreeMap::new();
        match self.keymap.scope(scope) {
            Some(table) => {
                for (combo, bindings) in table {
                    let resolved: Vec<Resolved> = bindings
                        .iter()
                        .filter_map(|binding| match self.registry.get(&binding.command) {
                            Some(handler) => Some(Resolved {
                                binding: binding.clone(),
                                handler,
                            }),
                            None => {
                                tracing::warn!(
                                    "Unknown command '{}' bound to {} in {} scope",
                                    binding.command,
                                    combo,
                                    scope
                                );
                                None
                            }
                        })
                        .collect();
                    if !resolved.is_empty() {
                        combos.insert(*combo, resolved);
                    }
                }
            }
            None => tracing::debug!("no bindings for {} scope", scope),
        }
        *self.lock() = BoundScope { scope, combos };
    }

    pub async fn dispatch(&self, combo: KeyCombo, caps: &dyn Capabilities) -> KeyOutcome {
        let bindings = self.lock().combos.get(&combo).cloned();
        let Some(bindings) = bindings else {
            return KeyOutcome::Propagate;
        };

        let modes = caps.modes(caps.active_frame());
        let tags = caps.tags();
        let passing: Vec<Resolved> = bindings
            .into_iter()
            .filter(|resolved| resolved.binding.passes(&modes, &tags))
            .collect();
        if passing.is_empty() {
            return KeyOutcome::Propagate;
        }

        let name = combo.to_string();
        for resolved in &passing {
            tracing::debug!(combo = %name, command = %resolved.binding.command, "running command");
            resolved
                .handler
                .call(caps, &name, &resolved.binding.args)
                .await;
        }
        KeyOutcome::Consumed
    }

    /// Bound combos and the commands they resolve to.
    pub fn active_commands(&self) -> BTreeMap<String, Vec<String>> {
        self.lock()
            .combos
            .iter()
            .map(|(combo, resolved)| {
                (
                    combo.to_string(),
                    resolved
                        .iter()
                        .map(|r| r.binding.command.clone())
                        .collect(),
                )
            })
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, BoundScope> {
        self.bound.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
