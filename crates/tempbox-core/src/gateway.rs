//! Interface to the remote mail service.
//!
//! The core never talks to providers directly. Everything that crosses the
//! network goes through a [`MailGateway`], whose transport is up to the
//! implementor (see the `tempbox-http` crate for the REST implementation).
//!
//! Implementations must hand back canonical model types: message bodies are
//! always ordered fragment sequences, never bare strings or nulls.

use std::collections::HashSet;
use std::future::Future;

use chrono::{DateTime, Utc};

use crate::Result;
use crate::model::{
    HistoryEntry, Message, MessageDetail, MessageId, PinnedEntry, PinnedId, Preference,
    ProviderPreference, Resource, ResourceId,
};

/// Remote operations consumed by the session controller, the refresh
/// scheduler and the synced collections.
///
/// Error contract:
/// - [`Error::ProviderUnavailable`](crate::Error::ProviderUnavailable) when no
///   resource can be created for the requested provider or domain.
/// - [`Error::NotFound`](crate::Error::NotFound) when the target is gone.
/// - [`Error::RequestFailed`](crate::Error::RequestFailed) for everything
///   transient.
pub trait MailGateway: Send + Sync + 'static {
    /// Domains offered by a provider. An empty list is valid.
    fn list_domains(
        &self,
        provider: &ProviderPreference,
    ) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// Provisions a new resource.
    fn create_resource(
        &self,
        preference: &Preference,
    ) -> impl Future<Output = Result<Resource>> + Send;

    /// Deletes a resource upstream.
    fn delete_resource(&self, id: &ResourceId) -> impl Future<Output = Result<()>> + Send;

    /// Extends a resource's lifetime, returning the new expiry.
    fn extend_resource(
        &self,
        id: &ResourceId,
    ) -> impl Future<Output = Result<DateTime<Utc>>> + Send;

    /// Latest message summaries for a resource, in server order.
    fn list_messages(
        &self,
        resource_id: &ResourceId,
    ) -> impl Future<Output = Result<Vec<Message>>> + Send;

    /// Full content of one message.
    fn get_message_detail(
        &self,
        resource_id: &ResourceId,
        message_id: &MessageId,
    ) -> impl Future<Output = Result<MessageDetail>> + Send;

    /// Message summaries of an archived resource.
    ///
    /// Backends that keep archived resources under a separate route override
    /// this; by default it is [`list_messages`](Self::list_messages).
    fn list_archived_messages(
        &self,
        resource_id: &ResourceId,
    ) -> impl Future<Output = Result<Vec<Message>>> + Send {
        self.list_messages(resource_id)
    }

    /// Full content of one message of an archived resource.
    fn get_archived_message_detail(
        &self,
        resource_id: &ResourceId,
        message_id: &MessageId,
    ) -> impl Future<Output = Result<MessageDetail>> + Send {
        self.get_message_detail(resource_id, message_id)
    }

    /// Pins a resource.
    fn save_resource(
        &self,
        resource_id: &ResourceId,
    ) -> impl Future<Output = Result<PinnedEntry>> + Send;

    /// Pins a message, capturing its content.
    fn save_message(
        &self,
        resource_id: &ResourceId,
        message_id: &MessageId,
    ) -> impl Future<Output = Result<PinnedEntry>> + Send;

    /// Archived resources, most recent first.
    fn list_history(&self) -> impl Future<Output = Result<Vec<HistoryEntry>>> + Send;

    /// Deletes the given history entries, or all of them when `ids` is `None`.
    fn delete_history(
        &self,
        ids: Option<&HashSet<ResourceId>>,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Pinned entries, most recent first.
    fn list_pinned(&self) -> impl Future<Output = Result<Vec<PinnedEntry>>> + Send;

    /// Deletes the given pinned entries, or all of them when `ids` is `None`.
    fn delete_pinned(
        &self,
        ids: Option<&HashSet<PinnedId>>,
    ) -> impl Future<Output = Result<()>> + Send;
}
