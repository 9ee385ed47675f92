//! Background polling of the active resource's messages.
//!
//! The scheduler follows one resource id at a time. Following a new id
//! cancels the previous task, and any response fetched for an id that is no
//! longer followed is dropped on arrival.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, warn};

use crate::Result;
use crate::gateway::MailGateway;
use crate::model::{Message, MessageId, ResourceId};
use crate::session::SessionEvent;

/// Called when the followed resource turns out to be gone upstream.
pub type GoneHook = Box<dyn Fn(&ResourceId) + Send + Sync>;

/// Result of a single poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The listing was installed.
    Applied {
        /// Messages now listed.
        count: usize,
        /// Messages not in the previous listing.
        new: usize,
    },
    /// The followed id changed while the request was in flight.
    Stale,
    /// Nothing is being followed.
    Idle,
}

#[derive(Default)]
struct RefreshState {
    followed: Option<ResourceId>,
    messages: Vec<Message>,
    task: Option<JoinHandle<()>>,
}

struct RefreshInner<G> {
    gateway: Arc<G>,
    period: Duration,
    events: broadcast::Sender<SessionEvent>,
    on_gone: GoneHook,
    state: Mutex<RefreshState>,
}

/// Periodic message poller for the active resource.
///
/// Cloning yields another handle to the same scheduler.
pub struct RefreshScheduler<G> {
    inner: Arc<RefreshInner<G>>,
}

impl<G> Clone for RefreshScheduler<G> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<G: MailGateway> RefreshScheduler<G> {
    /// Creates an idle scheduler.
    ///
    /// `on_gone` runs (outside any lock) when a poll reports the followed
    /// resource as not found.
    pub fn new(
        gateway: Arc<G>,
        period: Duration,
        events: broadcast::Sender<SessionEvent>,
        on_gone: impl Fn(&ResourceId) + Send + Sync + 'static,
    ) -> Self {
        Self {
            inner: Arc::new(RefreshInner {
                gateway,
                period,
                events,
                on_gone: Box::new(on_gone),
                state: Mutex::new(RefreshState::default()),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, RefreshState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts polling `id`, cancelling whatever was followed before.
    ///
    /// The first poll happens immediately. Following the id that is already
    /// followed restarts its task but keeps the current listing.
    pub fn follow(&self, id: ResourceId) {
        let mut state = self.state();
        if let Some(task) = state.task.take() {
            task.abort();
        }
        if state.followed.as_ref() != Some(&id) {
            state.messages.clear();
        }
        debug!("Polling messages for {id} every {:?}", self.inner.period);
        state.followed = Some(id.clone());
        state.task = Some(self.spawn(id));
    }

    /// Cancels polling and forgets the listing.
    pub fn stop(&self) {
        let mut state = self.state();
        if let Some(task) = state.task.take() {
            task.abort();
        }
        if let Some(id) = state.followed.take() {
            debug!("Stopped polling messages for {id}");
        }
        state.messages.clear();
    }

    /// The followed id, if any.
    #[must_use]
    pub fn followed(&self) -> Option<ResourceId> {
        self.state().followed.clone()
    }

    /// Latest listing for the followed id.
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.state().messages.clone()
    }

    /// Message at `index` in the latest listing, provided that listing
    /// belongs to `id`.
    #[must_use]
    pub fn message_of(&self, id: &ResourceId, index: usize) -> Option<Message> {
        let state = self.state();
        if state.followed.as_ref() != Some(id) {
            return None;
        }
        state.messages.get(index).cloned()
    }

    /// Polls the followed id once.
    ///
    /// # Errors
    ///
    /// Returns the gateway error. A not-found response also runs the gone
    /// hook.
    pub async fn refresh_now(&self) -> Result<PollOutcome> {
        let Some(id) = self.followed() else {
            return Ok(PollOutcome::Idle);
        };
        self.poll(&id).await
    }

    async fn poll(&self, id: &ResourceId) -> Result<PollOutcome> {
        let result = self.inner.gateway.list_messages(id).await;

        let mut state = self.state();
        if state.followed.as_ref() != Some(id) {
            debug!("Discarding stale message listing for {id}");
            return Ok(PollOutcome::Stale);
        }

        match result {
            Ok(messages) => {
                let known: HashSet<&MessageId> = state.messages.iter().map(|m| &m.id).collect();
                let new = messages.iter().filter(|m| !known.contains(&m.id)).count();
                let count = messages.len();
                state.messages = messages;
                drop(state);

                debug!("Polled {id}: {count} messages, {new} new");
                let _ = self.inner.events.send(SessionEvent::MessagesUpdated {
                    resource_id: id.clone(),
                    count,
                    new,
                });
                Ok(PollOutcome::Applied { count, new })
            }
            Err(e) if e.is_not_found() => {
                // Detach rather than abort: this may be running on that task.
                state.task = None;
                state.followed = None;
                state.messages.clear();
                drop(state);

                warn!("Resource {id} is gone upstream");
                (self.inner.on_gone)(id);
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    fn spawn(&self, id: ResourceId) -> JoinHandle<()> {
        let weak = Arc::downgrade(&self.inner);
        let period = self.inner.period;

        tokio::spawn(async move {
            let mut ticker = time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let scheduler = RefreshScheduler { inner };

                match scheduler.poll(&id).await {
                    Ok(PollOutcome::Applied { .. }) => {}
                    Ok(PollOutcome::Stale | PollOutcome::Idle) => break,
                    Err(e) if e.is_not_found() => break,
                    Err(e) => {
                        warn!("Polling {id} failed: {e}");
                        let _ = scheduler.inner.events.send(SessionEvent::PollFailed {
                            resource_id: id.clone(),
                            error: e.to_string(),
                        });
                    }
                }
            }
        })
    }
}

impl<G> Drop for RefreshInner<G> {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = state.task.take() {
            task.abort();
        }
    }
}
