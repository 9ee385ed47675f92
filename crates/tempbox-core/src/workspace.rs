//! Composition root for a front end.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::collection::{CollectionStore, SyncedCollection};
use crate::config::SessionConfig;
use crate::gateway::MailGateway;
use crate::model::{
    HistoryEntry, Message, MessageDetail, MessageId, PinnedEntry, PinnedId, PinnedSource,
    Resource, ResourceId,
};
use crate::session::SessionController;
use crate::snapshot::SnapshotRepository;
use crate::time::SharedClock;
use crate::view::{DetailItem, Scope, Tab, ViewCoordinator};
use crate::{Error, Result};

/// Result of a save request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// A new pinned entry was created.
    Saved(PinnedEntry),
    /// The source was already pinned; this is the existing entry.
    AlreadySaved(PinnedEntry),
}

impl SaveOutcome {
    /// The pinned entry either way.
    #[must_use]
    pub const fn entry(&self) -> &PinnedEntry {
        match self {
            Self::Saved(entry) | Self::AlreadySaved(entry) => entry,
        }
    }
}

/// Session, collections and navigation wired together.
pub struct Workspace<G> {
    gateway: Arc<G>,
    session: SessionController<G>,
    history: SyncedCollection<HistoryEntry, G>,
    pinned: SyncedCollection<PinnedEntry, G>,
    view: Mutex<ViewCoordinator>,
    // Held across the save request so each source reaches the gateway once.
    saving: tokio::sync::Mutex<()>,
    snapshot: Option<SnapshotRepository>,
    config: SessionConfig,
}

impl<G: MailGateway> Workspace<G> {
    /// Wires a workspace around `gateway`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `config` is invalid.
    pub fn new(
        gateway: Arc<G>,
        clock: SharedClock,
        config: SessionConfig,
        snapshot: Option<SnapshotRepository>,
    ) -> Result<Self> {
        let history_store = config
            .history_capacity()
            .map_or_else(CollectionStore::new, CollectionStore::bounded);
        let history = SyncedCollection::new(Arc::clone(&gateway), history_store);
        let pinned = SyncedCollection::new(Arc::clone(&gateway), CollectionStore::new());
        let session = SessionController::new(
            Arc::clone(&gateway),
            clock,
            history.clone(),
            config.clone(),
        )?;

        Ok(Self {
            gateway,
            session,
            history,
            pinned,
            view: Mutex::new(ViewCoordinator::new()),
            saving: tokio::sync::Mutex::new(()),
            snapshot,
            config,
        })
    }

    fn view_state(&self) -> MutexGuard<'_, ViewCoordinator> {
        self.view.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The session controller.
    #[must_use]
    pub const fn session(&self) -> &SessionController<G> {
        &self.session
    }

    /// History collection.
    #[must_use]
    pub const fn history(&self) -> &SyncedCollection<HistoryEntry, G> {
        &self.history
    }

    /// Pinned collection.
    #[must_use]
    pub const fn pinned(&self) -> &SyncedCollection<PinnedEntry, G> {
        &self.pinned
    }

    /// Session configuration.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Copy of the navigation state.
    #[must_use]
    pub fn view(&self) -> ViewCoordinator {
        self.view_state().clone()
    }

    /// Loads cached collections, syncs them, and creates a first resource if
    /// configured to.
    ///
    /// Cache and sync failures are logged; the collections keep whatever
    /// they had.
    ///
    /// # Errors
    ///
    /// Returns the creation error.
    pub async fn bootstrap(&self) -> Result<Option<Resource>> {
        if let Some(snapshot) = &self.snapshot {
            match snapshot.load_history().await {
                Ok(entries) => self.history.replace_all(entries),
                Err(e) => warn!("Failed to load cached history: {e}"),
            }
            match snapshot.load_pinned().await {
                Ok(entries) => self.pinned.replace_all(entries),
                Err(e) => warn!("Failed to load cached pinned entries: {e}"),
            }
            debug!(
                "Loaded snapshot: {} history, {} pinned",
                self.history.len(),
                self.pinned.len()
            );
        }

        if let Err(e) = self.history.sync().await {
            warn!("History sync failed, using cached entries: {e}");
        }
        if let Err(e) = self.pinned.sync().await {
            warn!("Pinned sync failed, using cached entries: {e}");
        }

        if self.config.auto_create && self.session.active().is_none() {
            let resource = self.session.create(self.config.preference()).await?;
            return Ok(Some(resource));
        }
        Ok(None)
    }

    /// Pins the active resource.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] without an active resource, or the gateway
    /// error.
    pub async fn save_active(&self) -> Result<SaveOutcome> {
        let active = self
            .session
            .active()
            .ok_or_else(|| Error::NotFound("no active resource".to_string()))?;
        let source = PinnedSource::Resource(active.id.clone());

        self.save(source, self.gateway.save_resource(&active.id))
            .await
    }

    /// Pins a message with its content.
    ///
    /// # Errors
    ///
    /// Returns the gateway error.
    pub async fn save_message(
        &self,
        resource_id: &ResourceId,
        message_id: &MessageId,
    ) -> Result<SaveOutcome> {
        let source = PinnedSource::Message(resource_id.clone(), message_id.clone());
        self.save(source, self.gateway.save_message(resource_id, message_id))
            .await
    }

    async fn save(
        &self,
        source: PinnedSource,
        request: impl Future<Output = Result<PinnedEntry>>,
    ) -> Result<SaveOutcome> {
        let _saving = self.saving.lock().await;
        if let Some(existing) = self.pinned.find(|e| e.source() == source) {
            debug!("{source:?} already pinned as {}", existing.id);
            return Ok(SaveOutcome::AlreadySaved(existing));
        }

        let entry = request.await?;
        // A sync during the request may have brought the new pin in already.
        if let Some(existing) = self.pinned.find(|e| e.source() == source) {
            debug!("{source:?} pinned meanwhile as {}", existing.id);
            return Ok(SaveOutcome::AlreadySaved(existing));
        }
        match self.pinned.add(entry.clone()) {
            Ok(()) => {
                info!("Pinned {}", entry.label());
                Ok(SaveOutcome::Saved(entry))
            }
            Err(e) if e.is_duplicate() => {
                let existing = self.pinned.get(&entry.id).unwrap_or(entry);
                Ok(SaveOutcome::AlreadySaved(existing))
            }
            Err(e) => Err(e),
        }
    }

    /// Opens a message of the active or a history resource and fetches its
    /// content.
    ///
    /// Returns `None` if the view moved on before the content arrived.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for the pinned scope (use
    /// [`open_pinned`](Self::open_pinned)) or without an active resource, or
    /// the gateway error.
    pub async fn open_message(
        &self,
        scope: Scope,
        message_id: &MessageId,
    ) -> Result<Option<MessageDetail>> {
        let (resource_id, archived) = match &scope {
            Scope::Active => {
                let active = self
                    .session
                    .active()
                    .ok_or_else(|| Error::NotFound("no active resource".to_string()))?;
                (active.id, false)
            }
            Scope::History(id) => (id.clone(), true),
            Scope::Pinned => {
                return Err(Error::NotFound(format!(
                    "message {message_id} is not addressable in the pinned scope"
                )));
            }
        };

        let ticket = self
            .view_state()
            .select(scope, DetailItem::Message(message_id.clone()));
        let detail = if archived {
            self.gateway
                .get_archived_message_detail(&resource_id, message_id)
                .await?
        } else {
            self.gateway
                .get_message_detail(&resource_id, message_id)
                .await?
        };

        let applied = self.view_state().apply_detail(ticket, detail.clone());
        if applied {
            Ok(Some(detail))
        } else {
            debug!("Discarding detail of {message_id}: view moved on");
            Ok(None)
        }
    }

    /// Opens a pinned entry. Message content comes from the capture, without
    /// a gateway call.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if there is no such entry.
    pub fn open_pinned(&self, id: &PinnedId) -> Result<PinnedEntry> {
        let entry = self
            .pinned
            .get(id)
            .ok_or_else(|| Error::NotFound(format!("pinned entry {id}")))?;

        let mut view = self.view_state();
        let ticket = view.select(Scope::Pinned, DetailItem::Pinned(id.clone()));
        if let Some(detail) = entry.detail() {
            view.apply_detail(ticket, detail.clone());
        }
        Ok(entry)
    }

    /// Opens a history resource and fetches its message list.
    ///
    /// Returns `None` if the view moved on before the list arrived.
    ///
    /// # Errors
    ///
    /// Returns the gateway error.
    pub async fn open_history(&self, id: &ResourceId) -> Result<Option<Vec<Message>>> {
        let ticket = self
            .view_state()
            .select(Scope::History(id.clone()), DetailItem::Resource);
        let messages = self.history_messages(id).await?;

        let applied = self.view_state().apply_listing(ticket, messages.clone());
        Ok(applied.then_some(messages))
    }

    /// Message list of an archived resource.
    ///
    /// # Errors
    ///
    /// Returns the gateway error.
    pub async fn history_messages(&self, id: &ResourceId) -> Result<Vec<Message>> {
        self.gateway.list_archived_messages(id).await
    }

    /// Goes up one navigation level.
    pub fn back(&self) {
        self.view_state().back();
    }

    /// Switches tabs.
    pub fn switch_tab(&self, tab: Tab) {
        self.view_state().switch_tab(tab);
    }

    /// Writes both collections to the snapshot cache, if one is configured.
    ///
    /// # Errors
    ///
    /// Returns the database error.
    pub async fn persist(&self) -> Result<()> {
        let Some(snapshot) = &self.snapshot else {
            return Ok(());
        };
        snapshot.save_history(&self.history.list()).await?;
        snapshot.save_pinned(&self.pinned.list()).await?;
        Ok(())
    }

    /// Stops background work.
    pub fn shutdown(&self) {
        self.session.shutdown();
    }
}
