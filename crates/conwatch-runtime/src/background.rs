//! Background context: the message endpoint page contexts and the UI talk to.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use conwatch_core::orchestrator::{bookmark_draft, now_millis};
use conwatch_core::{Settings, WatchEntry};

use crate::message::{Message, Response};
use crate::store::StoreHandle;
use crate::tabs::TabRegistry;
use crate::transport::{self, Channel};
use crate::RuntimeError;

#[derive(Clone)]
pub struct Background {
    store: StoreHandle,
    tabs: TabRegistry,
}

impl Background {
    pub fn new(store: StoreHandle, tabs: TabRegistry) -> Self {
        Self { store, tabs }
    }

    pub fn store(&self) -> &StoreHandle {
        &self.store
    }

    pub fn tabs(&self) -> &TabRegistry {
        &self.tabs
    }

    /// Serve messages one at a time until every sender is gone.
    pub fn spawn(self, timeout: Duration) -> (Channel<Message, Response>, JoinHandle<()>) {
        let (channel, mut inbox) = transport::channel::<Message, Response>(timeout);
        let task = tokio::spawn(async move {
            while let Some(env) = inbox.recv().await {
                let response = self.handle(env.message.clone()).await;
                env.respond(response);
            }
            debug!("Background inbox closed");
        });
        (channel, task)
    }

    pub async fn handle(&self, message: Message) -> Response {
        match message {
            Message::SaveVideo { data } => match self.store.upsert(data).await {
                Ok(entry) => {
                    debug!(id = %entry.id, timestamp = entry.timestamp, "Entry saved");
                    Response::ok()
                }
                Err(e) => {
                    warn!(error = %e, "Save failed");
                    Response::failed()
                }
            },
            Message::TriggerManualAdd => match self.bookmark_active().await {
                Ok(_) => Response::ok(),
                Err(e) => {
                    warn!(error = %e, "Bookmark failed");
                    Response::failed()
                }
            },
            Message::GetSettings => {
                let settings = self.store.settings().await.unwrap_or_else(|e| {
                    warn!(error = %e, "Settings unavailable, using defaults");
                    Settings::default()
                });
                Response::Settings { settings }
            }
            Message::GetVideoDetails => {
                debug!("Video details requested from background");
                Response::failed()
            }
        }
    }

    /// Save the active tab as a bookmark: no video, no progress.
    pub async fn bookmark_active(&self) -> Result<WatchEntry, RuntimeError> {
        let tab = self
            .tabs
            .active()
            .await
            .ok_or_else(|| RuntimeError::NotFound("active tab".into()))?;
        let draft = bookmark_draft(
            &tab.url,
            tab.title.as_deref(),
            tab.fav_icon_url.as_deref(),
            now_millis(),
        )?;
        let entry = self.store.upsert(draft).await?;
        info!(id = %entry.id, "Page bookmarked");
        Ok(entry)
    }

    /// Ask the active tab for its video and save what it reports.
    ///
    /// `Ok(None)` covers every "nothing saved" case: no active page, no
    /// video, or an unreachable page context.
    pub async fn manual_save(&self) -> Result<Option<WatchEntry>, RuntimeError> {
        let Some(page) = self.tabs.active_page().await else {
            debug!("No page context in the active tab");
            return Ok(None);
        };
        let draft = match page.request(Message::GetVideoDetails).await {
            Ok(Response::Details { data: Some(draft) }) => draft,
            Ok(_) => return Ok(None),
            Err(e) => {
                warn!(error = %e, "Active tab unreachable");
                return Ok(None);
            }
        };
        let entry = self.store.upsert(draft).await?;
        info!(id = %entry.id, timestamp = entry.timestamp, "Manual save");
        Ok(Some(entry))
    }
}
