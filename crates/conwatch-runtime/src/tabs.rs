use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::page::PageHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TabId(pub u64);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tab-{}", self.0)
    }
}

/// Browser-side metadata for a tab, as the background sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct TabInfo {
    pub id: TabId,
    pub url: String,
    pub title: Option<String>,
    pub fav_icon_url: Option<String>,
}

struct Tab {
    info: TabInfo,
    page: Option<PageHandle>,
}

#[derive(Default)]
struct Inner {
    tabs: HashMap<TabId, Tab>,
    active: Option<TabId>,
}

/// Open tabs and which one is focused. Cheap to clone.
#[derive(Clone, Default)]
pub struct TabRegistry {
    inner: Arc<RwLock<Inner>>,
}

impl TabRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a tab. A tab with no page handle has no page context
    /// (e.g. a browser-internal page).
    pub async fn insert(&self, info: TabInfo, page: Option<PageHandle>) {
        let mut inner = self.inner.write().await;
        inner.tabs.insert(info.id, Tab { info, page });
    }

    pub async fn activate(&self, id: TabId) -> bool {
        let mut inner = self.inner.write().await;
        if inner.tabs.contains_key(&id) {
            inner.active = Some(id);
            true
        } else {
            false
        }
    }

    pub async fn remove(&self, id: TabId) -> Option<TabInfo> {
        let mut inner = self.inner.write().await;
        if inner.active == Some(id) {
            inner.active = None;
        }
        inner.tabs.remove(&id).map(|t| t.info)
    }

    pub async fn active(&self) -> Option<TabInfo> {
        let inner = self.inner.read().await;
        let id = inner.active?;
        inner.tabs.get(&id).map(|t| t.info.clone())
    }

    /// Page handle of the focused tab, if it has a page context.
    pub async fn active_page(&self) -> Option<PageHandle> {
        let inner = self.inner.read().await;
        let id = inner.active?;
        inner.tabs.get(&id).and_then(|t| t.page.clone())
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.tabs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(id: u64, url: &str) -> TabInfo {
        TabInfo {
            id: TabId(id),
            url: url.into(),
            title: None,
            fav_icon_url: None,
        }
    }

    #[tokio::test]
    async fn test_active_tab_tracking() {
        let tabs = TabRegistry::new();
        assert!(tabs.active().await.is_none());

        tabs.insert(info(1, "https://a.com"), None).await;
        tabs.insert(info(2, "https://b.com"), None).await;
        assert!(!tabs.activate(TabId(9)).await);
        assert!(tabs.activate(TabId(2)).await);
        assert_eq!(tabs.active().await.unwrap().url, "https://b.com");
        assert!(tabs.active_page().await.is_none());

        tabs.remove(TabId(2)).await;
        assert!(tabs.active().await.is_none());
        assert_eq!(tabs.len().await, 1);
    }
}
