//! The session controller: owner of the single active resource.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::{ClearReason, ExpiryGuard, SessionEvent};
use crate::collection::SyncedCollection;
use crate::config::{ArchivePolicy, SessionConfig};
use crate::gateway::MailGateway;
use crate::model::{HistoryEntry, Preference, ProviderPreference, Resource, ResourceId};
use crate::refresh::RefreshScheduler;
use crate::time::SharedClock;
use crate::{Error, Result};

const EVENT_CAPACITY: usize = 64;

/// Lifecycle phase of the active slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No active resource.
    Empty,
    /// A live resource is active.
    Active,
    /// The active resource has expired and awaits replacement.
    Expiring,
}

/// Result of a renewal request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Renewal {
    /// The replacement is now active.
    Replaced(Resource),
    /// A renewal for the same resource is already running.
    AlreadyInFlight,
    /// The slot changed while the request was in flight; the replacement
    /// was discarded.
    Superseded,
}

/// What a countdown tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Seconds left on the active resource.
    Running(u64),
    /// The expired resource was replaced.
    Renewed(Resource),
    /// Another renewal for this resource is running.
    RenewalInFlight,
    /// The renewal failed; the next tick retries.
    RenewalFailed,
    /// Nothing to count down.
    Idle,
}

struct State {
    active: Option<Resource>,
    preference: Preference,
    guard: ExpiryGuard,
    countdown: Option<JoinHandle<()>>,
}

enum RenewalStart {
    Fresh(Preference),
    Skipped(Renewal),
    Started {
        id: ResourceId,
        preference: Preference,
        archived: Option<Resource>,
    },
}

struct Inner<G> {
    gateway: Arc<G>,
    clock: SharedClock,
    config: SessionConfig,
    history: SyncedCollection<HistoryEntry, G>,
    refresh: RefreshScheduler<G>,
    events: broadcast::Sender<SessionEvent>,
    state: Mutex<State>,
}

/// Releases the expiry guard when the renewal ends, however it ends.
struct RenewalPermit<'a, G> {
    inner: &'a Inner<G>,
    id: ResourceId,
}

impl<G> Drop for RenewalPermit<'_, G> {
    fn drop(&mut self) {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .guard
            .release(&self.id);
    }
}

/// Owns the active resource, its countdown and its message polling.
///
/// All state sits behind a short synchronous lock that is never held across
/// a gateway call. Local state changes only after the awaited call returns,
/// so a failed request leaves the controller as it was. Cloning yields
/// another handle to the same session.
pub struct SessionController<G> {
    inner: Arc<Inner<G>>,
}

impl<G> Clone for SessionController<G> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<G: MailGateway> SessionController<G> {
    /// Creates an empty session.
    ///
    /// Archived resources go to `history`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `config` is invalid.
    pub fn new(
        gateway: Arc<G>,
        clock: SharedClock,
        history: SyncedCollection<HistoryEntry, G>,
        config: SessionConfig,
    ) -> Result<Self> {
        config.validate()?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let inner = Arc::new_cyclic(|weak: &std::sync::Weak<Inner<G>>| {
            let weak = weak.clone();
            let refresh = RefreshScheduler::new(
                Arc::clone(&gateway),
                config.refresh_interval(),
                events.clone(),
                move |id| {
                    if let Some(inner) = weak.upgrade() {
                        SessionController { inner }.clear_if_active(id, ClearReason::Gone);
                    }
                },
            );
            Inner {
                gateway,
                clock,
                history,
                refresh,
                events,
                state: Mutex::new(State {
                    active: None,
                    preference: config.preference(),
                    guard: ExpiryGuard::new(),
                    countdown: None,
                }),
                config,
            }
        });

        Ok(Self { inner })
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.inner.events.send(event);
    }

    /// Subscribes to session events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// The active resource, if any.
    #[must_use]
    pub fn active(&self) -> Option<Resource> {
        self.state().active.clone()
    }

    /// Preference used for renewals.
    #[must_use]
    pub fn preference(&self) -> Preference {
        self.state().preference.clone()
    }

    /// Whole seconds left on the active resource, zero when there is none.
    #[must_use]
    pub fn time_left(&self) -> u64 {
        let now = self.inner.clock.now();
        self.state()
            .active
            .as_ref()
            .map_or(0, |resource| resource.time_left(now))
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        let now = self.inner.clock.now();
        match self.state().active.as_ref() {
            None => SessionPhase::Empty,
            Some(r) if r.is_archived || r.is_expired_at(now) => SessionPhase::Expiring,
            Some(_) => SessionPhase::Active,
        }
    }

    /// Returns true if a renewal for the active resource is running.
    #[must_use]
    pub fn renewal_in_flight(&self) -> bool {
        let state = self.state();
        state
            .active
            .as_ref()
            .is_some_and(|r| state.guard.is_held_for(&r.id))
    }

    /// The message poller.
    #[must_use]
    pub fn refresh(&self) -> &RefreshScheduler<G> {
        &self.inner.refresh
    }

    /// History collection that archived resources go to.
    #[must_use]
    pub fn history(&self) -> &SyncedCollection<HistoryEntry, G> {
        &self.inner.history
    }

    /// Domains offered by `provider`.
    ///
    /// # Errors
    ///
    /// Returns the gateway error.
    pub async fn domains(&self, provider: &ProviderPreference) -> Result<Vec<String>> {
        self.inner.gateway.list_domains(provider).await
    }

    /// Creates a resource and makes it active.
    ///
    /// `preference` is kept for later renewals. A live resource displaced
    /// by the new one is archived.
    ///
    /// # Errors
    ///
    /// Returns the gateway error; the previous resource stays active.
    pub async fn create(&self, preference: Preference) -> Result<Resource> {
        let resource = self.inner.gateway.create_resource(&preference).await?;
        info!(
            "Created {} ({}) via {}",
            resource.address,
            resource.id,
            resource.provider.display_name()
        );

        let displaced = {
            let mut state = self.state();
            state.preference = preference;
            self.install(&mut state, resource.clone())
        };
        if let Some(old) = displaced.filter(|r| !r.is_archived) {
            self.archive(old);
        }
        self.emit(SessionEvent::Activated(resource.clone()));
        Ok(resource)
    }

    /// Archives the active resource and replaces it using the stored
    /// preference.
    ///
    /// With no active resource this simply creates one.
    ///
    /// # Errors
    ///
    /// Returns the gateway error. A live resource is left as it was, still
    /// active and polled. An expired one stays in the slot, already archived,
    /// until a later replacement succeeds.
    pub async fn archive_and_replace(&self) -> Result<Renewal> {
        self.renew(None).await
    }

    /// Checks the slot and takes the guard.
    ///
    /// An expired resource is archived here and its polling stopped under the
    /// same lock. A live one stays untouched until its replacement is
    /// installed.
    fn begin_renewal(&self, expected: Option<&ResourceId>) -> RenewalStart {
        let now = self.inner.clock.now();
        let mut guard = self.state();
        let state = &mut *guard;
        let Some(active) = state.active.as_mut() else {
            return match expected {
                Some(_) => RenewalStart::Skipped(Renewal::Superseded),
                None => RenewalStart::Fresh(state.preference.clone()),
            };
        };
        if expected.is_some_and(|expected| *expected != active.id) {
            return RenewalStart::Skipped(Renewal::Superseded);
        }
        if !state.guard.try_acquire(&active.id) {
            debug!("Renewal of {} already in flight", active.id);
            return RenewalStart::Skipped(Renewal::AlreadyInFlight);
        }

        let archived = (!active.is_archived && active.is_expired_at(now)).then(|| {
            active.is_archived = true;
            self.inner.refresh.stop();
            active.clone()
        });
        RenewalStart::Started {
            id: active.id.clone(),
            preference: state.preference.clone(),
            archived,
        }
    }

    async fn renew(&self, expected: Option<&ResourceId>) -> Result<Renewal> {
        let (id, preference, archived) = match self.begin_renewal(expected) {
            RenewalStart::Fresh(preference) => {
                return self.create(preference).await.map(Renewal::Replaced);
            }
            RenewalStart::Skipped(renewal) => return Ok(renewal),
            RenewalStart::Started {
                id,
                preference,
                archived,
            } => (id, preference, archived),
        };
        let _permit = RenewalPermit {
            inner: &self.inner,
            id: id.clone(),
        };

        if let Some(resource) = archived {
            self.archive(resource);
        }

        let replacement = match self.inner.gateway.create_resource(&preference).await {
            Ok(resource) => resource,
            Err(e) => {
                warn!("Replacing {id} failed: {e}");
                return Err(e);
            }
        };

        let displaced = {
            let mut state = self.state();
            if state.active.as_ref().is_some_and(|r| r.id == id) {
                Some(self.install(&mut state, replacement.clone()))
            } else {
                None
            }
        };

        if let Some(displaced) = displaced {
            if let Some(old) = displaced.filter(|r| !r.is_archived) {
                self.archive(old);
            }
            info!("Replaced {id} with {}", replacement.address);
            self.emit(SessionEvent::Activated(replacement.clone()));
            Ok(Renewal::Replaced(replacement))
        } else {
            debug!("Discarding replacement {} for superseded {id}", replacement.id);
            if let Err(e) = self.inner.gateway.delete_resource(&replacement.id).await
                && !e.is_not_found()
            {
                warn!("Failed to delete discarded replacement {}: {e}", replacement.id);
            }
            Ok(Renewal::Superseded)
        }
    }

    /// Deletes the active resource upstream, then clears the slot.
    ///
    /// Whether the resource is archived follows the configured
    /// [`ArchivePolicy`]. Does nothing without an active resource.
    ///
    /// # Errors
    ///
    /// Returns the gateway error; the resource stays active in that case.
    pub async fn delete(&self) -> Result<()> {
        let Some(active) = self.active() else {
            return Ok(());
        };

        match self.inner.gateway.delete_resource(&active.id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => debug!("{} already gone upstream", active.id),
            Err(e) => return Err(e),
        }
        self.clear_if_active(&active.id, ClearReason::Deleted);
        Ok(())
    }

    /// Extends the active resource's lifetime in place.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if nothing is active, if the resource is gone
    ///   upstream (the slot is cleared), or if it was replaced meanwhile.
    /// - [`Error::Expired`] if the resource already expired.
    /// - Any other gateway error.
    pub async fn extend(&self) -> Result<Resource> {
        let Some(active) = self.active() else {
            return Err(Error::NotFound("no active resource".to_string()));
        };
        if active.is_archived {
            return Err(Error::Expired(active.id.to_string()));
        }

        let expires_at = match self.inner.gateway.extend_resource(&active.id).await {
            Ok(expires_at) => expires_at,
            Err(e) => {
                if e.is_not_found() {
                    self.clear_if_active(&active.id, ClearReason::Gone);
                }
                return Err(e);
            }
        };

        let extended = {
            let mut state = self.state();
            state
                .active
                .as_mut()
                .filter(|r| r.id == active.id && !r.is_archived)
                .map(|r| {
                    r.expires_at = expires_at;
                    r.clone()
                })
        };

        match extended {
            Some(resource) => {
                info!("Extended {} until {}", resource.id, resource.expires_at);
                self.emit(SessionEvent::Extended(resource.clone()));
                Ok(resource)
            }
            None => {
                debug!("Discarding extension for inactive {}", active.id);
                Err(Error::NotFound(format!("{} is no longer active", active.id)))
            }
        }
    }

    /// Runs one countdown step for the active resource.
    ///
    /// At zero this starts the guarded renewal and waits for it.
    pub async fn tick(&self) -> TickOutcome {
        let Some(id) = self.state().active.as_ref().map(|r| r.id.clone()) else {
            return TickOutcome::Idle;
        };
        self.tick_for(&id).await
    }

    async fn tick_for(&self, id: &ResourceId) -> TickOutcome {
        let now = self.inner.clock.now();
        let time_left = {
            let state = self.state();
            match state.active.as_ref() {
                Some(r) if r.id == *id => r.time_left(now),
                _ => return TickOutcome::Idle,
            }
        };
        if time_left > 0 {
            return TickOutcome::Running(time_left);
        }

        match self.renew(Some(id)).await {
            Ok(Renewal::Replaced(resource)) => TickOutcome::Renewed(resource),
            Ok(Renewal::AlreadyInFlight) => TickOutcome::RenewalInFlight,
            Ok(Renewal::Superseded) => TickOutcome::Idle,
            Err(e) => {
                warn!("Automatic renewal of {id} failed, retrying next tick: {e}");
                self.emit(SessionEvent::RenewalFailed {
                    resource_id: id.clone(),
                    error: e.to_string(),
                });
                TickOutcome::RenewalFailed
            }
        }
    }

    /// Empties the slot if `id` is still active.
    ///
    /// Returns false if another resource (or none) is active.
    pub fn clear_if_active(&self, id: &ResourceId, reason: ClearReason) -> bool {
        let removed = {
            let mut state = self.state();
            if state.active.as_ref().is_none_or(|r| r.id != *id) {
                return false;
            }
            if let Some(task) = state.countdown.take() {
                task.abort();
            }
            state.guard.reset();
            self.inner.refresh.stop();
            state.active.take()
        };

        if let Some(resource) = removed {
            info!("Cleared {} ({reason:?})", resource.id);
            if self.inner.config.archive_policy == ArchivePolicy::AnyRemoval
                && !resource.is_archived
            {
                self.archive(resource);
            }
            self.emit(SessionEvent::Cleared {
                resource_id: id.clone(),
                reason,
            });
        }
        true
    }

    /// Stops the countdown and polling.
    pub fn shutdown(&self) {
        if let Some(task) = self.state().countdown.take() {
            task.abort();
        }
        self.inner.refresh.stop();
    }

    /// Makes `resource` active and returns what it displaced.
    fn install(&self, state: &mut State, resource: Resource) -> Option<Resource> {
        if let Some(task) = state.countdown.take() {
            task.abort();
        }
        state.guard.reset();
        state.countdown = Some(self.spawn_countdown(resource.id.clone()));
        self.inner.refresh.follow(resource.id.clone());
        state.active.replace(resource)
    }

    fn archive(&self, resource: Resource) {
        let entry = HistoryEntry::archived_locally(resource, self.inner.clock.now());
        match self.inner.history.add(entry.clone()) {
            Ok(()) => {
                info!("Archived {}", entry.resource.address);
                self.emit(SessionEvent::Archived(entry));
            }
            Err(e) => debug!("Not archiving {}: {e}", entry.resource.id),
        }
    }

    /// Ticks every countdown interval while `id` stays active.
    ///
    /// Renewals run on their own task, since installing the replacement
    /// aborts this one.
    fn spawn_countdown(&self, id: ResourceId) -> JoinHandle<()> {
        let weak = Arc::downgrade(&self.inner);
        let period = self.inner.config.countdown_interval();

        tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let controller = SessionController { inner };

                let (time_left, in_flight) = {
                    let state = controller.state();
                    match state.active.as_ref() {
                        Some(r) if r.id == id => (
                            r.time_left(controller.inner.clock.now()),
                            state.guard.is_held_for(&id),
                        ),
                        _ => break,
                    }
                };

                if time_left == 0 && !in_flight {
                    let id = id.clone();
                    tokio::spawn(async move {
                        controller.tick_for(&id).await;
                    });
                }
            }
        })
    }
}
