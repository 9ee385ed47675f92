//! Navigation state for front ends.
//!
//! A front end shows either a list for one of the three tabs or the detail of
//! one item within a scope. Detail content arrives asynchronously, so every
//! navigation step bumps a generation counter and fetched content is only
//! applied if it was requested under the current generation.

use crate::model::{Message, MessageDetail, MessageId, PinnedId, ResourceId};

/// Top-level list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    /// The active resource and its messages.
    Active,
    /// Archived resources.
    History,
    /// Saved resources and messages.
    Pinned,
}

impl Tab {
    /// Parses a tab name as typed by a user.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "active" | "inbox" => Some(Self::Active),
            "history" => Some(Self::History),
            "pinned" | "saved" => Some(Self::Pinned),
            _ => None,
        }
    }
}

/// Where a detail view was opened from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// The active resource.
    Active,
    /// One archived resource.
    History(ResourceId),
    /// The pinned collection.
    Pinned,
}

impl Scope {
    /// Tab this scope belongs to.
    #[must_use]
    pub const fn tab(&self) -> Tab {
        match self {
            Self::Active => Tab::Active,
            Self::History(_) => Tab::History,
            Self::Pinned => Tab::Pinned,
        }
    }
}

/// What a detail view shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailItem {
    /// One message.
    Message(MessageId),
    /// The scope's resource and its message list.
    Resource,
    /// One pinned entry.
    Pinned(PinnedId),
}

/// Current view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    /// A tab's list.
    List(Tab),
    /// One item within a scope.
    Detail(Scope, DetailItem),
}

/// Proof that content was requested under a given navigation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct Ticket(u64);

/// Tracks the current view and the content fetched for it.
#[derive(Debug, Clone)]
pub struct ViewCoordinator {
    view: View,
    generation: u64,
    detail: Option<MessageDetail>,
    listing: Option<Vec<Message>>,
}

impl Default for ViewCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewCoordinator {
    /// Starts on the active tab's list.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            view: View::List(Tab::Active),
            generation: 0,
            detail: None,
            listing: None,
        }
    }

    /// Current view.
    #[must_use]
    pub const fn view(&self) -> &View {
        &self.view
    }

    /// Tab the current view belongs to.
    #[must_use]
    pub const fn tab(&self) -> Tab {
        match &self.view {
            View::List(tab) => *tab,
            View::Detail(scope, _) => scope.tab(),
        }
    }

    /// Message detail fetched for the current view.
    #[must_use]
    pub const fn detail(&self) -> Option<&MessageDetail> {
        self.detail.as_ref()
    }

    /// Message list fetched for a history resource.
    #[must_use]
    pub fn listing(&self) -> Option<&[Message]> {
        self.listing.as_deref()
    }

    /// Returns true while a message detail is awaited.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self.view, View::Detail(_, DetailItem::Message(_))) && self.detail.is_none()
    }

    fn advance(&mut self, view: View) -> Ticket {
        self.generation += 1;
        self.view = view;
        self.detail = None;
        Ticket(self.generation)
    }

    /// Opens `item` within `scope`.
    ///
    /// Opening a resource drops its previous message list; opening a message
    /// of a history resource keeps the list to return to.
    pub fn select(&mut self, scope: Scope, item: DetailItem) -> Ticket {
        let keep_listing = matches!(
            (&self.view, &scope),
            (View::Detail(Scope::History(current), _), Scope::History(next)) if current == next
        ) && item != DetailItem::Resource;
        if !keep_listing {
            self.listing = None;
        }
        self.advance(View::Detail(scope, item))
    }

    /// Goes up one level.
    ///
    /// A message of a history resource returns to that resource's message
    /// list; everything else returns to the scope's tab list.
    pub fn back(&mut self) {
        let next = match &self.view {
            View::List(_) => return,
            View::Detail(Scope::History(id), DetailItem::Message(_)) => {
                View::Detail(Scope::History(id.clone()), DetailItem::Resource)
            }
            View::Detail(scope, _) => View::List(scope.tab()),
        };
        if matches!(next, View::List(_)) {
            self.listing = None;
        }
        let _ = self.advance(next);
    }

    /// Switches to a tab's list, dropping any fetched content.
    pub fn switch_tab(&mut self, tab: Tab) {
        self.listing = None;
        let _ = self.advance(View::List(tab));
    }

    /// Installs a fetched message detail.
    ///
    /// Returns false (and drops `detail`) if the view moved on since
    /// `ticket` was issued.
    pub fn apply_detail(&mut self, ticket: Ticket, detail: MessageDetail) -> bool {
        let current = ticket.0 == self.generation
            && match &self.view {
                View::Detail(_, DetailItem::Message(id)) => *id == detail.summary.id,
                View::Detail(Scope::Pinned, DetailItem::Pinned(_)) => true,
                _ => false,
            };
        if current {
            self.detail = Some(detail);
        }
        current
    }

    /// Installs a fetched history message list.
    ///
    /// Returns false if the view moved on since `ticket` was issued.
    pub fn apply_listing(&mut self, ticket: Ticket, messages: Vec<Message>) -> bool {
        let current = ticket.0 == self.generation
            && matches!(&self.view, View::Detail(Scope::History(_), DetailItem::Resource));
        if current {
            self.listing = Some(messages);
        }
        current
    }
}
