//! Document title management
//!
//! Views push a title when they mount and pop it when they unmount; the most
//! recently mounted view wins.

use crate::constants::DEFAULT_DOCUMENT_TITLE;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
struct HeadInner {
    default_title: String,
    titles: Mutex<Vec<(u64, String)>>,
    next_id: AtomicU64,
}

impl HeadInner {
    fn titles(&self) -> MutexGuard<'_, Vec<(u64, String)>> {
        self.titles.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Shared document head
#[derive(Debug, Clone)]
pub struct PageHead {
    inner: Arc<HeadInner>,
}

impl Default for PageHead {
    fn default() -> Self {
        Self::new(DEFAULT_DOCUMENT_TITLE)
    }
}

impl PageHead {
    pub fn new(default_title: &str) -> Self {
        Self {
            inner: Arc::new(HeadInner {
                default_title: default_title.to_string(),
                titles: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Pushes a title for as long as the returned guard lives
    pub fn push(&self, title: &str) -> TitleGuard {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.titles().push((id, title.to_string()));
        TitleGuard {
            id,
            inner: Arc::clone(&self.inner),
        }
    }

    /// Title currently shown by the document
    pub fn current(&self) -> String {
        self.inner
            .titles()
            .last()
            .map(|(_, title)| title.clone())
            .unwrap_or_else(|| self.inner.default_title.clone())
    }
}

/// Keeps a pushed title alive; dropping it restores the previous one
#[derive(Debug)]
pub struct TitleGuard {
    id: u64,
    inner: Arc<HeadInner>,
}

impl TitleGuard {
    /// Replaces this guard's title
    pub fn set(&self, title: &str) {
        let mut titles = self.inner.titles();
        if let Some(slot) = titles.iter_mut().find(|(id, _)| *id == self.id) {
            if slot.1 != title {
                slot.1 = title.to_string();
            }
        }
    }
}

impl Drop for TitleGuard {
    fn drop(&mut self) {
        self.inner.titles().retain(|(id, _)| *id != self.id);
    }
}
