use std::future::Future;

use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::{
    core::{
        registry::{Deletion, MacroDetail, MissionRow, PendingImport, Registry, SaveAction},
        store::{KeyMigration, MacroRow},
    },
    key::{KeyFormatError, MacroKey},
    params::ValidationError,
    persist::{snapshot::ImportFormatError, CacheInfo, PersistError},
    query::{RowFilter, SortState},
    record::MacroRecord,
    types::{KeyString, MissionName},
};

use super::events::RegistryEvent;

/// Errors returned through [`RegistryHandle`].
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Rejected input.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Undecodable key.
    #[error(transparent)]
    KeyFormat(#[from] KeyFormatError),
    /// Malformed import text.
    #[error(transparent)]
    Import(#[from] ImportFormatError),
    /// Storage failure.
    #[error(transparent)]
    Persist(#[from] PersistError),
    /// The registry task has stopped.
    #[error("registry runtime channel closed")]
    ChannelClosed,
}

/// Channel sizing for [`spawn_registry`].
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Pending command capacity.
    pub command_queue_bound: usize,
    /// Event broadcast capacity.
    pub event_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            command_queue_bound: 256,
            event_capacity: 1024,
        }
    }
}

/// Result of [`RegistryHandle::import`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    /// The import replaced the registry.
    Applied {
        /// Imported macro count.
        macros: usize,
        /// Imported mission count.
        missions: usize,
    },
    /// The confirm step declined.
    Cancelled,
}

/// Cloneable handle to the registry task.
#[derive(Clone)]
pub struct RegistryHandle {
    cmd_tx: mpsc::Sender<Command>,
    events_tx: broadcast::Sender<RegistryEvent>,
}

enum Command {
    Get {
        key: KeyString,
        resp: oneshot::Sender<Option<MacroRecord>>,
    },
    Detail {
        key: KeyString,
        resp: oneshot::Sender<Result<Option<MacroDetail>, RuntimeError>>,
    },
    Set {
        key: KeyString,
        record: MacroRecord,
        resp: oneshot::Sender<()>,
    },
    Save {
        key: MacroKey,
        record: MacroRecord,
        resp: oneshot::Sender<SaveAction>,
    },
    UpdateMemo {
        key: KeyString,
        memo: String,
        resp: oneshot::Sender<bool>,
    },
    Delete {
        key: KeyString,
        resp: oneshot::Sender<Deletion>,
    },
    Link {
        name: MissionName,
        key: KeyString,
        resp: oneshot::Sender<Result<Option<KeyString>, RuntimeError>>,
    },
    Unlink {
        name: MissionName,
        resp: oneshot::Sender<Option<KeyString>>,
    },
    Rows {
        filter: RowFilter,
        sort: SortState,
        resp: oneshot::Sender<Vec<MacroRow>>,
    },
    MissionRows {
        query: String,
        resp: oneshot::Sender<Vec<MissionRow>>,
    },
    Export {
        resp: oneshot::Sender<Result<String, RuntimeError>>,
    },
    CommitImport {
        pending: PendingImport,
        resp: oneshot::Sender<()>,
    },
    Migrate {
        resp: oneshot::Sender<KeyMigration>,
    },
    Clear {
        resp: oneshot::Sender<bool>,
    },
    CacheInfo {
        resp: oneshot::Sender<Option<CacheInfo>>,
    },
    Shutdown {
        resp: oneshot::Sender<bool>,
    },
}

/// Moves `registry` into a task that owns it and serves commands in order.
pub fn spawn_registry(registry: Registry, config: RuntimeConfig) -> RegistryHandle {
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<Command>(config.command_queue_bound);
    let (events_tx, _) = broadcast::channel::<RegistryEvent>(config.event_capacity);

    let events_tx_loop = events_tx.clone();

    tokio::spawn(async move {
        let mut registry = registry;
        // Notices queued during load are published after the first command,
        // once callers have had a chance to subscribe.
        while let Some(cmd) = cmd_rx.recv().await {
            let done = handle_command(cmd, &mut registry, &events_tx_loop);
            publish_notices(&mut registry, &events_tx_loop);
            if done {
                break;
            }
        }
    });

    RegistryHandle { cmd_tx, events_tx }
}

impl RegistryHandle {
    /// New receiver for registry events.
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.events_tx.subscribe()
    }

    /// Fuzzy read of `key`.
    pub async fn get(&self, key: impl Into<KeyString>) -> Result<Option<MacroRecord>, RuntimeError> {
        let key = key.into();
        self.call(|resp| Command::Get { key, resp }).await
    }

    /// Detail view of `key`.
    pub async fn detail(&self, key: impl Into<KeyString>) -> Result<Option<MacroDetail>, RuntimeError> {
        let key = key.into();
        self.call(|resp| Command::Detail { key, resp }).await?
    }

    /// Upserts at exactly `key`.
    pub async fn set(&self, key: impl Into<KeyString>, record: MacroRecord) -> Result<(), RuntimeError> {
        let key = key.into();
        self.call(|resp| Command::Set { key, record, resp }).await
    }

    /// Trims and stores `record`; blank text deletes.
    pub async fn save(&self, key: MacroKey, record: MacroRecord) -> Result<SaveAction, RuntimeError> {
        self.call(|resp| Command::Save { key, record, resp }).await
    }

    /// Rewrites the memo of the macro `key` resolves to.
    pub async fn update_memo(
        &self,
        key: impl Into<KeyString>,
        memo: impl Into<String>,
    ) -> Result<bool, RuntimeError> {
        let key = key.into();
        let memo = memo.into();
        self.call(|resp| Command::UpdateMemo { key, memo, resp }).await
    }

    /// Deletes exactly `key` and cascades its links.
    pub async fn delete(&self, key: impl Into<KeyString>) -> Result<Deletion, RuntimeError> {
        let key = key.into();
        self.call(|resp| Command::Delete { key, resp }).await
    }

    /// Links a mission to `key`.
    pub async fn link(
        &self,
        name: impl Into<MissionName>,
        key: impl Into<KeyString>,
    ) -> Result<Option<KeyString>, RuntimeError> {
        let name = name.into();
        let key = key.into();
        self.call(|resp| Command::Link { name, key, resp }).await?
    }

    /// Removes a mission link.
    pub async fn unlink(&self, name: impl Into<MissionName>) -> Result<Option<KeyString>, RuntimeError> {
        let name = name.into();
        self.call(|resp| Command::Unlink { name, resp }).await
    }

    /// Filtered and sorted listing rows.
    pub async fn rows(&self, filter: RowFilter, sort: SortState) -> Result<Vec<MacroRow>, RuntimeError> {
        self.call(|resp| Command::Rows { filter, sort, resp }).await
    }

    /// Mission rows matching `query`.
    pub async fn mission_rows(&self, query: impl Into<String>) -> Result<Vec<MissionRow>, RuntimeError> {
        let query = query.into();
        self.call(|resp| Command::MissionRows { query, resp }).await
    }

    /// Indented snapshot text.
    pub async fn export(&self) -> Result<String, RuntimeError> {
        self.call(|resp| Command::Export { resp }).await?
    }

    /// Parses `raw`, waits for `confirm`, then replaces the registry.
    ///
    /// Nothing reaches the registry task before `confirm` resolves to true.
    pub async fn import<F>(&self, raw: &str, confirm: F) -> Result<ImportOutcome, RuntimeError>
    where
        F: Future<Output = bool>,
    {
        let pending = Registry::stage_import(raw)?;
        if !confirm.await {
            return Ok(ImportOutcome::Cancelled);
        }

        let outcome = ImportOutcome::Applied {
            macros: pending.macro_count(),
            missions: pending.mission_count(),
        };
        self.call(|resp| Command::CommitImport { pending, resp }).await?;
        Ok(outcome)
    }

    /// Rewrites legacy keys to canonical form.
    pub async fn migrate_legacy_keys(&self) -> Result<KeyMigration, RuntimeError> {
        self.call(|resp| Command::Migrate { resp }).await
    }

    /// Removes the stored blob and empties the registry.
    pub async fn clear(&self) -> Result<bool, RuntimeError> {
        self.call(|resp| Command::Clear { resp }).await
    }

    /// Summary of the stored blob.
    pub async fn cache_info(&self) -> Result<Option<CacheInfo>, RuntimeError> {
        self.call(|resp| Command::CacheInfo { resp }).await
    }

    /// Saves one last time and stops the registry task.
    /// Returns whether the final save succeeded.
    pub async fn shutdown(&self) -> Result<bool, RuntimeError> {
        self.call(|resp| Command::Shutdown { resp }).await
    }

    async fn call<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(make(tx))
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }
}

fn handle_command(
    cmd: Command,
    registry: &mut Registry,
    events_tx: &broadcast::Sender<RegistryEvent>,
) -> bool {
    match cmd {
        Command::Get { key, resp } => {
            let _ = resp.send(registry.get_macro(&key));
        }
        Command::Detail { key, resp } => {
            let _ = resp.send(registry.macro_detail(&key).map_err(RuntimeError::from));
        }
        Command::Set { key, record, resp } => {
            registry.set_macro(key.clone(), record);
            let _ = events_tx.send(RegistryEvent::MacroSaved { key });
            let _ = resp.send(());
        }
        Command::Save { key, record, resp } => {
            let action = registry.save_macro(&key, record);
            match &action {
                SaveAction::Stored { key } => {
                    let _ = events_tx.send(RegistryEvent::MacroSaved { key: key.clone() });
                }
                SaveAction::Deleted(deletion) => emit_deletion(events_tx, deletion),
            }
            let _ = resp.send(action);
        }
        Command::UpdateMemo { key, memo, resp } => {
            let updated = registry.update_memo(&key, memo);
            if updated {
                let _ = events_tx.send(RegistryEvent::MacroSaved { key });
            }
            let _ = resp.send(updated);
        }
        Command::Delete { key, resp } => {
            let deletion = registry.delete_macro(&key);
            emit_deletion(events_tx, &deletion);
            let _ = resp.send(deletion);
        }
        Command::Link { name, key, resp } => {
            let res = registry
                .link_mission(&name, key.clone())
                .map_err(RuntimeError::from);
            if res.is_ok() {
                let _ = events_tx.send(RegistryEvent::MissionLinked {
                    name: name.trim().to_string(),
                    key,
                });
            }
            let _ = resp.send(res);
        }
        Command::Unlink { name, resp } => {
            let prev = registry.unlink_mission(&name);
            if prev.is_some() {
                let _ = events_tx.send(RegistryEvent::MissionUnlinked { name });
            }
            let _ = resp.send(prev);
        }
        Command::Rows { filter, sort, resp } => {
            let _ = resp.send(registry.rows(&filter, &sort));
        }
        Command::MissionRows { query, resp } => {
            let _ = resp.send(registry.mission_rows(&query));
        }
        Command::Export { resp } => {
            let _ = resp.send(registry.export_snapshot().map_err(RuntimeError::from));
        }
        Command::CommitImport { pending, resp } => {
            let macros = pending.macro_count();
            let missions = pending.mission_count();
            registry.commit_import(pending);
            let _ = events_tx.send(RegistryEvent::Imported { macros, missions });
            let _ = resp.send(());
        }
        Command::Migrate { resp } => {
            let migration = registry.migrate_legacy_keys();
            if !migration.renamed.is_empty() {
                let _ = events_tx.send(RegistryEvent::KeysNormalized {
                    renamed: migration.renamed.len(),
                });
            }
            let _ = resp.send(migration);
        }
        Command::Clear { resp } => {
            let ok = registry.clear();
            if ok {
                let _ = events_tx.send(RegistryEvent::Cleared);
            }
            let _ = resp.send(ok);
        }
        Command::CacheInfo { resp } => {
            let _ = resp.send(registry.cache_info());
        }
        Command::Shutdown { resp } => {
            let _ = resp.send(registry.save());
            return true;
        }
    }

    false
}

fn emit_deletion(events_tx: &broadcast::Sender<RegistryEvent>, deletion: &Deletion) {
    if deletion.removed.is_some() {
        let _ = events_tx.send(RegistryEvent::MacroDeleted {
            key: deletion.key.clone(),
            unlinked: deletion.unlinked.clone(),
        });
    }
}

fn publish_notices(registry: &mut Registry, events_tx: &broadcast::Sender<RegistryEvent>) {
    for notice in registry.drain_notices() {
        let _ = events_tx.send(RegistryEvent::Notice(notice));
    }
}
