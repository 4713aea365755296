use tokio::sync::{mpsc, oneshot};

use conwatch_core::kv::KeyValueStore;
use conwatch_core::{ConwatchError, Settings, Theme, WatchEntry, WatchEntryDraft, WatchStore};

/// Cloneable handle to the store actor, the single owner of persisted state.
#[derive(Clone)]
pub struct StoreHandle {
    tx: mpsc::UnboundedSender<StoreCommand>,
}

enum StoreCommand {
    Upsert {
        draft: WatchEntryDraft,
        reply: oneshot::Sender<Result<WatchEntry, ConwatchError>>,
    },
    TogglePin {
        id: String,
        reply: oneshot::Sender<Result<Option<bool>, ConwatchError>>,
    },
    Delete {
        id: String,
        reply: oneshot::Sender<Result<bool, ConwatchError>>,
    },
    List {
        filter: String,
        reply: oneshot::Sender<Result<Vec<WatchEntry>, ConwatchError>>,
    },
    Get {
        id: String,
        reply: oneshot::Sender<Result<Option<WatchEntry>, ConwatchError>>,
    },
    GetSettings {
        reply: oneshot::Sender<Result<Settings, ConwatchError>>,
    },
    UpdateSettings {
        theme: Option<Theme>,
        autosave: Option<String>,
        reply: oneshot::Sender<Result<Settings, ConwatchError>>,
    },
}

fn actor_closed() -> ConwatchError {
    ConwatchError::StorageUnavailable("store actor closed".into())
}

impl StoreHandle {
    /// Move `store` onto a dedicated thread and return a handle to it.
    pub fn spawn<S>(store: WatchStore<S>) -> Result<Self, ConwatchError>
    where
        S: KeyValueStore + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();

        std::thread::Builder::new()
            .name("store-actor".into())
            .spawn(move || actor_loop(store, rx))?;

        Ok(Self { tx })
    }

    pub async fn upsert(&self, draft: WatchEntryDraft) -> Result<WatchEntry, ConwatchError> {
        let (reply, rx) = oneshot::channel();
        let _ = self.tx.send(StoreCommand::Upsert { draft, reply });
        rx.await.unwrap_or_else(|_| Err(actor_closed()))
    }

    pub async fn toggle_pin(&self, id: impl Into<String>) -> Result<Option<bool>, ConwatchError> {
        let (reply, rx) = oneshot::channel();
        let _ = self.tx.send(StoreCommand::TogglePin {
            id: id.into(),
            reply,
        });
        rx.await.unwrap_or_else(|_| Err(actor_closed()))
    }

    pub async fn delete(&self, id: impl Into<String>) -> Result<bool, ConwatchError> {
        let (reply, rx) = oneshot::channel();
        let _ = self.tx.send(StoreCommand::Delete {
            id: id.into(),
            reply,
        });
        rx.await.unwrap_or_else(|_| Err(actor_closed()))
    }

    pub async fn list(&self, filter: impl Into<String>) -> Result<Vec<WatchEntry>, ConwatchError> {
        let (reply, rx) = oneshot::channel();
        let _ = self.tx.send(StoreCommand::List {
            filter: filter.into(),
            reply,
        });
        rx.await.unwrap_or_else(|_| Err(actor_closed()))
    }

    pub async fn get(&self, id: impl Into<String>) -> Result<Option<WatchEntry>, ConwatchError> {
        let (reply, rx) = oneshot::channel();
        let _ = self.tx.send(StoreCommand::Get {
            id: id.into(),
            reply,
        });
        rx.await.unwrap_or_else(|_| Err(actor_closed()))
    }

    pub async fn settings(&self) -> Result<Settings, ConwatchError> {
        let (reply, rx) = oneshot::channel();
        let _ = self.tx.send(StoreCommand::GetSettings { reply });
        rx.await.unwrap_or_else(|_| Err(actor_closed()))
    }

    /// Merge the given fields into the stored settings; `None` keeps a field.
    pub async fn update_settings(
        &self,
        theme: Option<Theme>,
        autosave: Option<String>,
    ) -> Result<Settings, ConwatchError> {
        let (reply, rx) = oneshot::channel();
        let _ = self.tx.send(StoreCommand::UpdateSettings {
            theme,
            autosave,
            reply,
        });
        rx.await.unwrap_or_else(|_| Err(actor_closed()))
    }
}

fn actor_loop<S: KeyValueStore>(
    store: WatchStore<S>,
    mut rx: mpsc::UnboundedReceiver<StoreCommand>,
) {
    while let Some(cmd) = rx.blocking_recv() {
        match cmd {
            StoreCommand::Upsert { draft, reply } => {
                let result = store.upsert(draft);
                if let Err(e) = &result {
                    tracing::warn!(error = %e, "Upsert failed");
                }
                let _ = reply.send(result);
            }
            StoreCommand::TogglePin { id, reply } => {
                let _ = reply.send(store.toggle_pin(&id));
            }
            StoreCommand::Delete { id, reply } => {
                let _ = reply.send(store.delete(&id));
            }
            StoreCommand::List { filter, reply } => {
                let _ = reply.send(store.list(&filter));
            }
            StoreCommand::Get { id, reply } => {
                let _ = reply.send(store.get(&id));
            }
            StoreCommand::GetSettings { reply } => {
                let _ = reply.send(store.settings());
            }
            StoreCommand::UpdateSettings {
                theme,
                autosave,
                reply,
            } => {
                let result = store.update_settings(|settings| {
                    if let Some(theme) = theme {
                        settings.theme = theme;
                    }
                    if let Some(autosave) = autosave {
                        settings.autosave = autosave;
                    }
                });
                let _ = reply.send(result);
            }
        }
    }
    tracing::debug!("Store actor shutting down");
}

#[cfg(test)]
mod tests {
    use conwatch_core::kv::MemoryStore;

    use super::*;

    fn draft(id: &str, last_watched: i64) -> WatchEntryDraft {
        WatchEntryDraft {
            id: id.into(),
            url: format!("https://{id}"),
            hostname: "a.com".into(),
            title: id.into(),
            episode: String::new(),
            timestamp: 1.0,
            duration: 2.0,
            thumbnail: String::new(),
            favicon: String::new(),
            last_watched,
        }
    }

    #[tokio::test]
    async fn test_actor_roundtrip() {
        let handle = StoreHandle::spawn(WatchStore::new(MemoryStore::new())).unwrap();
        handle.upsert(draft("a.com/1", 1)).await.unwrap();
        assert_eq!(handle.toggle_pin("a.com/1").await.unwrap(), Some(true));
        let list = handle.list("").await.unwrap();
        assert_eq!(list.len(), 1);
        assert!(list[0].pinned);
        assert!(handle.delete("a.com/1").await.unwrap());
        assert!(handle.get("a.com/1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_saves_converge() {
        let handle = StoreHandle::spawn(WatchStore::new(MemoryStore::new())).unwrap();
        let tasks: Vec<_> = (0..10)
            .map(|i| {
                let handle = handle.clone();
                tokio::spawn(async move { handle.upsert(draft("a.com/same", i)).await })
            })
            .collect();
        for t in tasks {
            t.await.unwrap().unwrap();
        }
        let list = handle.list("").await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].last_watched, 9);
    }

    #[tokio::test]
    async fn test_settings_merge() {
        let handle = StoreHandle::spawn(WatchStore::new(MemoryStore::new())).unwrap();
        handle
            .update_settings(Some(Theme::Dark), Some("a.com".into()))
            .await
            .unwrap();
        let s = handle.update_settings(None, Some("b.com".into())).await.unwrap();
        assert_eq!(s.theme, Theme::Dark);
        assert_eq!(s.autosave, "b.com");
        assert_eq!(handle.settings().await.unwrap(), s);
    }
}
