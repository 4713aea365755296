//! Async contexts around the conwatch core: a background endpoint, one task
//! per page, and a store actor owning persisted state.

pub mod background;
pub mod message;
pub mod page;
pub mod schedule;
pub mod store;
pub mod tabs;
pub mod transport;

use tokio::task::JoinHandle;

use conwatch_core::config::AppConfig;
use conwatch_core::kv::KeyValueStore;
use conwatch_core::storage::SqliteStore;
use conwatch_core::{ConwatchError, WatchEntry, WatchStore};
use conwatch_detect::{PageControl, PageObserver};

pub use background::Background;
pub use message::{Message, Response};
pub use page::{PageContext, PageEvent, PageHandle, PageReply};
pub use schedule::{PollSchedule, PollTick};
pub use store::StoreHandle;
pub use tabs::{TabId, TabInfo, TabRegistry};
pub use transport::{Channel, TransportError};

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Storage(#[from] ConwatchError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("not found: {0}")]
    NotFound(String),
}

/// Everything a front-end needs: store, tabs and the background endpoint.
///
/// Must be created inside a tokio runtime.
pub struct Runtime {
    config: AppConfig,
    background: Background,
    channel: Channel<Message, Response>,
    task: JoinHandle<()>,
}

impl Runtime {
    /// Open the on-disk store at the configured location.
    pub fn open(config: AppConfig) -> Result<Self, RuntimeError> {
        let db_path = AppConfig::ensure_db_path()?;
        tracing::debug!(path = %db_path.display(), "Opening watch store");
        Self::with_store(SqliteStore::open(&db_path)?, config)
    }

    pub fn with_store<S>(kv: S, config: AppConfig) -> Result<Self, RuntimeError>
    where
        S: KeyValueStore + 'static,
    {
        let store = StoreHandle::spawn(WatchStore::new(kv))?;
        let background = Background::new(store, TabRegistry::new());
        let (channel, task) = background
            .clone()
            .spawn(config.messaging.request_timeout());
        Ok(Self {
            config,
            background,
            channel,
            task,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> &StoreHandle {
        self.background.store()
    }

    pub fn tabs(&self) -> &TabRegistry {
        self.background.tabs()
    }

    /// Sending half of the background inbox.
    pub fn channel(&self) -> Channel<Message, Response> {
        self.channel.clone()
    }

    /// Send one message to the background and wait for its reply.
    pub async fn send(&self, message: Message) -> Result<Response, RuntimeError> {
        Ok(self.channel.request(message).await?)
    }

    /// Start a page context for `page`, register its tab and focus it.
    ///
    /// The context runs until the tab is removed and every other handle clone
    /// is dropped.
    pub async fn open_page<P>(
        &self,
        info: TabInfo,
        page: P,
    ) -> (PageHandle, JoinHandle<PageContext<P>>)
    where
        P: PageObserver + PageControl + Send + 'static,
    {
        let ctx = PageContext::new(page, self.channel(), self.config.clone());
        let (handle, task) = ctx.spawn();
        let id = info.id;
        self.tabs().insert(info, Some(handle.clone())).await;
        self.tabs().activate(id).await;
        tracing::debug!(tab = %id, "Page context started");
        (handle, task)
    }

    pub async fn manual_save(&self) -> Result<Option<WatchEntry>, RuntimeError> {
        self.background.manual_save().await
    }

    pub async fn bookmark_active(&self) -> Result<WatchEntry, RuntimeError> {
        self.background.bookmark_active().await
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        self.task.abort();
    }
}
