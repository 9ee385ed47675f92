//! In-memory gateway shared by the integration tests.

#![allow(dead_code, clippy::unwrap_used)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::Semaphore;

use tempbox_core::{
    Clock, Error, HistoryEntry, MailGateway, Message, MessageDetail, MessageId, MockClock,
    PinnedEntry, PinnedId, PinnedItem, Preference, ProviderPreference, ProviderTag, Resource,
    ResourceId, Result, Sender, SessionConfig, SharedClock, Workspace,
};

/// Lifetime granted to every created resource.
pub const TTL: Duration = Duration::from_secs(600);

#[derive(Default)]
struct Upstream {
    next_id: u64,
    resources: HashMap<ResourceId, Resource>,
    messages: HashMap<ResourceId, Vec<Message>>,
    history: Vec<HistoryEntry>,
    pinned: Vec<PinnedEntry>,
    deleted: Vec<ResourceId>,
}

/// Fake backend whose calls can be held open or made to fail.
pub struct FakeGateway {
    clock: Arc<MockClock>,
    upstream: Mutex<Upstream>,
    create_gate: Mutex<Option<Arc<Semaphore>>>,
    save_gate: Mutex<Option<Arc<Semaphore>>>,
    message_gates: Mutex<HashMap<ResourceId, Arc<Semaphore>>>,
    creates: AtomicUsize,
    saves: AtomicUsize,
    failing_creates: AtomicUsize,
    fail_collection_deletes: AtomicBool,
}

impl FakeGateway {
    pub fn new(clock: Arc<MockClock>) -> Self {
        Self {
            clock,
            upstream: Mutex::new(Upstream::default()),
            create_gate: Mutex::new(None),
            save_gate: Mutex::new(None),
            message_gates: Mutex::new(HashMap::new()),
            creates: AtomicUsize::new(0),
            saves: AtomicUsize::new(0),
            failing_creates: AtomicUsize::new(0),
            fail_collection_deletes: AtomicBool::new(false),
        }
    }

    fn upstream(&self) -> MutexGuard<'_, Upstream> {
        self.upstream.lock().unwrap()
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Blocks every later create until permits are added.
    pub fn hold_creates(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.create_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    /// Lets later creates through. Creates already waiting stay held.
    pub fn release_creates(&self) {
        *self.create_gate.lock().unwrap() = None;
    }

    /// Blocks every later save until permits are added.
    pub fn hold_saves(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.save_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    async fn pass_save_gate(&self) {
        let gate = self.save_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }
    }

    /// Blocks message listings for `id` until permits are added.
    pub fn hold_messages(&self, id: &ResourceId) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.message_gates
            .lock()
            .unwrap()
            .insert(id.clone(), Arc::clone(&gate));
        gate
    }

    /// Makes the next `n` creates fail with a transient error.
    pub fn fail_next_creates(&self, n: usize) {
        self.failing_creates.store(n, Ordering::SeqCst);
    }

    pub fn fail_collection_deletes(&self, fail: bool) {
        self.fail_collection_deletes.store(fail, Ordering::SeqCst);
    }

    /// Number of create requests received.
    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    /// Number of save requests received.
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Resources deleted upstream, in order.
    pub fn deleted(&self) -> Vec<ResourceId> {
        self.upstream().deleted.clone()
    }

    /// Drops a resource upstream without telling anyone.
    pub fn purge(&self, id: &ResourceId) {
        let mut upstream = self.upstream();
        upstream.resources.remove(id);
        upstream.messages.remove(id);
    }

    /// Delivers a message to `id`.
    pub fn deliver(&self, id: &ResourceId, subject: &str) -> MessageId {
        let now = self.now();
        let mut upstream = self.upstream();
        let messages = upstream.messages.entry(id.clone()).or_default();
        let message_id = MessageId::new(format!("{id}-m{}", messages.len() + 1));
        messages.insert(
            0,
            Message {
                id: message_id.clone(),
                from: Sender {
                    name: None,
                    address: "sender@example.test".to_string(),
                },
                subject: subject.to_string(),
                created_at: now,
            },
        );
        message_id
    }

    /// Seeds the remote history listing.
    pub fn seed_history(&self, entries: Vec<HistoryEntry>) {
        self.upstream().history = entries;
    }

    pub fn resource(&self, n: u64) -> Resource {
        let now = self.now();
        Resource {
            id: ResourceId::new(format!("r{n}")),
            address: format!("box{n}@example.test"),
            provider: ProviderTag::MailTm,
            created_at: now,
            expires_at: now + TimeDelta::from_std(TTL).unwrap(),
            is_archived: false,
        }
    }

    fn detail(&self, resource_id: &ResourceId, message_id: &MessageId) -> Result<MessageDetail> {
        let upstream = self.upstream();
        let summary = upstream
            .messages
            .get(resource_id)
            .and_then(|messages| messages.iter().find(|m| m.id == *message_id))
            .cloned()
            .ok_or_else(|| Error::NotFound(message_id.to_string()))?;
        Ok(MessageDetail {
            summary,
            html: Vec::new(),
            text: vec![format!("body of {message_id}")],
        })
    }

    fn pin(&self, item: PinnedItem) -> PinnedEntry {
        self.saves.fetch_add(1, Ordering::SeqCst);
        let now = self.now();
        let mut upstream = self.upstream();
        let entry = PinnedEntry {
            id: PinnedId::new(format!("p{}", upstream.pinned.len() + 1)),
            saved_at: now,
            item,
        };
        upstream.pinned.insert(0, entry.clone());
        entry
    }
}

impl MailGateway for FakeGateway {
    async fn list_domains(&self, provider: &ProviderPreference) -> Result<Vec<String>> {
        Ok(match provider {
            ProviderPreference::Specific(ProviderTag::Other(_)) => Vec::new(),
            _ => vec!["example.test".to_string()],
        })
    }

    async fn create_resource(&self, _preference: &Preference) -> Result<Resource> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        let gate = self.create_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            let _permit = gate.acquire().await.unwrap();
        }

        let failing = self.failing_creates.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_creates.store(failing - 1, Ordering::SeqCst);
            return Err(Error::RequestFailed("upstream timeout".to_string()));
        }

        let mut upstream = self.upstream();
        upstream.next_id += 1;
        let resource = self.resource(upstream.next_id);
        upstream
            .resources
            .insert(resource.id.clone(), resource.clone());
        Ok(resource)
    }

    async fn delete_resource(&self, id: &ResourceId) -> Result<()> {
        let mut upstream = self.upstream();
        upstream.deleted.push(id.clone());
        upstream
            .resources
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    async fn extend_resource(&self, id: &ResourceId) -> Result<DateTime<Utc>> {
        let mut upstream = self.upstream();
        let resource = upstream
            .resources
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        resource.expires_at += TimeDelta::from_std(TTL).unwrap();
        Ok(resource.expires_at)
    }

    async fn list_messages(&self, resource_id: &ResourceId) -> Result<Vec<Message>> {
        let gate = self.message_gates.lock().unwrap().get(resource_id).cloned();
        if let Some(gate) = gate {
            let _permit = gate.acquire().await.unwrap();
        }

        let upstream = self.upstream();
        if !upstream.resources.contains_key(resource_id) {
            return Err(Error::NotFound(resource_id.to_string()));
        }
        Ok(upstream
            .messages
            .get(resource_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_message_detail(
        &self,
        resource_id: &ResourceId,
        message_id: &MessageId,
    ) -> Result<MessageDetail> {
        self.detail(resource_id, message_id)
    }

    async fn save_resource(&self, resource_id: &ResourceId) -> Result<PinnedEntry> {
        self.pass_save_gate().await;
        let resource = self
            .upstream()
            .resources
            .get(resource_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(resource_id.to_string()))?;
        Ok(self.pin(PinnedItem::Resource { resource }))
    }

    async fn save_message(
        &self,
        resource_id: &ResourceId,
        message_id: &MessageId,
    ) -> Result<PinnedEntry> {
        self.pass_save_gate().await;
        let detail = self.detail(resource_id, message_id)?;
        Ok(self.pin(PinnedItem::Message {
            resource_id: resource_id.clone(),
            detail,
        }))
    }

    async fn list_history(&self) -> Result<Vec<HistoryEntry>> {
        Ok(self.upstream().history.clone())
    }

    async fn delete_history(&self, ids: Option<&HashSet<ResourceId>>) -> Result<()> {
        if self.fail_collection_deletes.load(Ordering::SeqCst) {
            return Err(Error::RequestFailed("history delete failed".to_string()));
        }
        let mut upstream = self.upstream();
        match ids {
            Some(ids) => upstream.history.retain(|e| !ids.contains(&e.resource.id)),
            None => upstream.history.clear(),
        }
        Ok(())
    }

    async fn list_pinned(&self) -> Result<Vec<PinnedEntry>> {
        Ok(self.upstream().pinned.clone())
    }

    async fn delete_pinned(&self, ids: Option<&HashSet<PinnedId>>) -> Result<()> {
        if self.fail_collection_deletes.load(Ordering::SeqCst) {
            return Err(Error::RequestFailed("pinned delete failed".to_string()));
        }
        let mut upstream = self.upstream();
        match ids {
            Some(ids) => upstream.pinned.retain(|e| !ids.contains(&e.id)),
            None => upstream.pinned.clear(),
        }
        Ok(())
    }
}

/// Test fixture: a workspace over a fake gateway with a manual clock.
pub struct Harness {
    pub clock: Arc<MockClock>,
    pub gateway: Arc<FakeGateway>,
    pub workspace: Workspace<FakeGateway>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(SessionConfig::default())
    }

    pub fn with_config(config: SessionConfig) -> Self {
        let clock = MockClock::shared();
        let gateway = Arc::new(FakeGateway::new(Arc::clone(&clock)));
        let shared: SharedClock = clock.clone();
        let workspace = Workspace::new(Arc::clone(&gateway), shared, config, None).unwrap();
        Self {
            clock,
            gateway,
            workspace,
        }
    }

    /// Advances the manual clock past the resource lifetime.
    pub fn expire(&self) {
        self.clock.advance(TTL);
    }

    pub async fn create(&self) -> Resource {
        self.workspace
            .session()
            .create(Preference::auto())
            .await
            .unwrap()
    }
}

/// Lets spawned tasks run until they block.
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}
