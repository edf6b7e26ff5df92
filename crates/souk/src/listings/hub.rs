//! Session registry. Hands out one [`ListingSession`] per (user, role, kind)
//! so the HTTP surface and the CLI demo share a single engine entry point.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex as AsyncMutex;

use super::bookmarks::BookmarkStore;
use super::directory::ListingDirectory;
use super::domain::{Actor, ResourceKind, Role, UserId};
use super::session::{ListingSession, SessionSettings};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SessionKey {
    user: UserId,
    role: Role,
    kind: ResourceKind,
}

/// Shared factory and cache for listing sessions.
pub struct ListingHub<D> {
    directory: Arc<D>,
    settings: SessionSettings,
    /// Base directory for device-local saved sets; `None` keeps them
    /// memory-only.
    bookmark_dir: Option<PathBuf>,
    /// One entry per distinct (user, role, kind) ever seen; nothing here
    /// evicts. A deployment that accepts unauthenticated caller-chosen user
    /// ids must bound or authenticate them upstream.
    sessions: AsyncMutex<HashMap<SessionKey, Arc<ListingSession<D>>>>,
}

impl<D> ListingHub<D>
where
    D: ListingDirectory,
{
    pub fn new(directory: Arc<D>, settings: SessionSettings, bookmark_dir: Option<PathBuf>) -> Self {
        Self {
            directory,
            settings,
            bookmark_dir,
            sessions: AsyncMutex::new(HashMap::new()),
        }
    }

    /// The session for this actor and catalogue, created on first use. A
    /// returning actor gets the same session back, with its scope, list, and
    /// in-flight disciplines intact.
    pub async fn session(&self, actor: &Actor, kind: ResourceKind) -> Arc<ListingSession<D>> {
        let key = SessionKey {
            user: actor.user_id.clone(),
            role: actor.role,
            kind,
        };

        let mut sessions = self.sessions.lock().await;
        if let Some(session) = sessions.get(&key) {
            return session.clone();
        }

        let bookmarks = match &self.bookmark_dir {
            Some(base) => Arc::new(BookmarkStore::open(base, &actor.user_id, kind).await),
            None => Arc::new(BookmarkStore::memory_only()),
        };
        let session = Arc::new(ListingSession::new(
            self.directory.clone(),
            bookmarks,
            actor.clone(),
            kind,
            self.settings,
        ));
        sessions.insert(key, session.clone());
        session
    }
}
