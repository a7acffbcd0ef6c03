// ── Notification feed ──
//
// Newest-first list of client-side notices (offline devices, energy
// alerts, server messages). Kept separate from the registry; the reducer
// produces notices and the controller bridge pushes them here.

use std::sync::Arc;

use tokio::sync::watch;
use uuid::Uuid;

use super::Snapshot;
use crate::model::Notice;
use crate::stream::EntityStream;

/// Oldest notices are dropped past this length.
pub const MAX_NOTICES: usize = 200;

pub struct NotificationFeed {
    notices: watch::Sender<Snapshot<Notice>>,
}

impl Default for NotificationFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationFeed {
    pub fn new() -> Self {
        let (notices, _) = watch::channel(Arc::new(Vec::new()));
        Self { notices }
    }

    pub fn push(&self, notice: Notice) {
        self.notices.send_modify(|list| {
            let mut next = Vec::with_capacity(list.len() + 1);
            next.push(Arc::new(notice));
            next.extend(list.iter().take(MAX_NOTICES - 1).cloned());
            *list = Arc::new(next);
        });
    }

    /// Returns `false` if no notice has that id or it was already read.
    pub fn mark_read(&self, id: Uuid) -> bool {
        self.notices.send_if_modified(|list| {
            let Some(pos) = list.iter().position(|n| n.id == id && !n.read) else {
                return false;
            };
            let mut next = list.as_ref().clone();
            if let Some(slot) = next.get_mut(pos) {
                Arc::make_mut(slot).read = true;
            }
            *list = Arc::new(next);
            true
        })
    }

    pub fn mark_all_read(&self) {
        self.notices.send_if_modified(|list| {
            if list.iter().all(|n| n.read) {
                return false;
            }
            let next = list
                .iter()
                .map(|n| {
                    let mut n = Arc::clone(n);
                    Arc::make_mut(&mut n).read = true;
                    n
                })
                .collect();
            *list = Arc::new(next);
            true
        });
    }

    pub fn remove(&self, id: Uuid) -> bool {
        self.notices.send_if_modified(|list| {
            if !list.iter().any(|n| n.id == id) {
                return false;
            }
            let next = list.iter().filter(|n| n.id != id).cloned().collect();
            *list = Arc::new(next);
            true
        })
    }

    pub fn unread_count(&self) -> usize {
        self.notices.borrow().iter().filter(|n| !n.read).count()
    }

    /// Newest first.
    pub fn snapshot(&self) -> Snapshot<Notice> {
        self.notices.borrow().clone()
    }

    pub fn subscribe(&self) -> EntityStream<Notice> {
        EntityStream::new(self.notices.subscribe())
    }

    pub fn len(&self) -> usize {
        self.notices.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.notices.borrow().is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::NoticeLevel;
    use chrono::Utc;

    fn notice(title: &str) -> Notice {
        Notice::new(NoticeLevel::Info, title, "msg", Utc::now())
    }

    #[test]
    fn newest_first() {
        let feed = NotificationFeed::new();
        feed.push(notice("first"));
        feed.push(notice("second"));
        let snap = feed.snapshot();
        assert_eq!(snap[0].title, "second");
        assert_eq!(snap[1].title, "first");
    }

    #[test]
    fn read_tracking() {
        let feed = NotificationFeed::new();
        let a = notice("a");
        let a_id = a.id;
        feed.push(a);
        feed.push(notice("b"));
        assert_eq!(feed.unread_count(), 2);

        assert!(feed.mark_read(a_id));
        assert!(!feed.mark_read(a_id));
        assert_eq!(feed.unread_count(), 1);

        feed.mark_all_read();
        assert_eq!(feed.unread_count(), 0);
    }

    #[test]
    fn remove_by_id() {
        let feed = NotificationFeed::new();
        let a = notice("a");
        let a_id = a.id;
        feed.push(a);
        assert!(feed.remove(a_id));
        assert!(!feed.remove(a_id));
        assert!(feed.is_empty());
    }

    #[test]
    fn capped_length() {
        let feed = NotificationFeed::new();
        for i in 0..MAX_NOTICES + 5 {
            feed.push(notice(&format!("n{i}")));
        }
        assert_eq!(feed.len(), MAX_NOTICES);
        assert_eq!(feed.snapshot()[0].title, format!("n{}", MAX_NOTICES + 4));
    }
}
