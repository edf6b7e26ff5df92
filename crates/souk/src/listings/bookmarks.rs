//! Device-local saved set. One JSON file per (user directory, kind), named by
//! the kind's stable storage key, holding an array of listing ids. Nothing
//! here ever reaches the backend.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::warn;

use super::domain::{ListingId, ResourceKind, UserId};

struct BookmarkState {
    /// `None` once the store has degraded to memory-only for this session.
    path: Option<PathBuf>,
    ids: BTreeSet<ListingId>,
}

/// A per-(user, kind) saved set.
///
/// Storage failure is never an error: the store degrades to an in-memory,
/// non-persisted set for the rest of the session and keeps answering toggles.
pub struct BookmarkStore {
    state: Mutex<BookmarkState>,
}

impl BookmarkStore {
    /// Open the saved set for one user and catalogue, reading any existing
    /// file. A missing file is an empty set; an unreadable or corrupt one
    /// degrades the store.
    pub async fn open(base_dir: &Path, user: &UserId, kind: ResourceKind) -> Self {
        let path = base_dir
            .join(&user.0)
            .join(format!("{}.json", kind.storage_name()));

        let (path, ids) = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<Vec<ListingId>>(&bytes) {
                Ok(ids) => (Some(path), ids.into_iter().collect()),
                Err(error) => {
                    warn!(path = %path.display(), %error, "saved set file corrupt, starting empty");
                    (Some(path), BTreeSet::new())
                }
            },
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                (Some(path), BTreeSet::new())
            }
            Err(error) => {
                warn!(
                    path = %path.display(),
                    %error,
                    "saved set storage unavailable, degrading to memory-only"
                );
                (None, BTreeSet::new())
            }
        };

        Self {
            state: Mutex::new(BookmarkState { path, ids }),
        }
    }

    /// A store with no backing file at all, used when no storage directory is
    /// configured and by tests.
    pub fn memory_only() -> Self {
        Self {
            state: Mutex::new(BookmarkState {
                path: None,
                ids: BTreeSet::new(),
            }),
        }
    }

    pub fn is_saved(&self, id: &ListingId) -> bool {
        self.lock().ids.contains(id)
    }

    pub fn list(&self) -> BTreeSet<ListingId> {
        self.lock().ids.clone()
    }

    /// Flip membership for `id`, returning the new state. Calling twice
    /// restores the original membership.
    pub async fn toggle(&self, id: &ListingId) -> bool {
        let (saved, snapshot) = {
            let mut state = self.lock();
            let saved = if state.ids.remove(id) {
                false
            } else {
                state.ids.insert(id.clone());
                true
            };
            (saved, state.ids.iter().cloned().collect::<Vec<_>>())
        };
        self.persist(snapshot).await;
        saved
    }

    pub async fn clear(&self) {
        {
            let mut state = self.lock();
            state.ids.clear();
        }
        self.persist(Vec::new()).await;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BookmarkState> {
        self.state.lock().expect("bookmark mutex poisoned")
    }

    async fn persist(&self, snapshot: Vec<ListingId>) {
        let Some(path) = self.lock().path.clone() else {
            return;
        };

        let bytes = match serde_json::to_vec(&snapshot) {
            Ok(bytes) => bytes,
            Err(error) => {
                warn!(%error, "saved set not serializable, keeping in-memory state");
                return;
            }
        };

        let result = async {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&path, &bytes).await
        }
        .await;

        if let Err(error) = result {
            warn!(
                path = %path.display(),
                %error,
                "saved set write failed, degrading to memory-only"
            );
            self.lock().path = None;
        }
    }
}
