//! REST implementation of [`MailGateway`].

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tempbox_core::{
    HistoryEntry, MailGateway, Message, MessageDetail, MessageId, PinnedEntry, PinnedId,
    Preference, ProviderPreference, Resource, ResourceId,
};
use tracing::{debug, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::wire::{
    CreateRequest, DeleteRequest, WireDetail, WireDomains, WireExtension, WireMessageList,
    WireResource, WireSaved,
};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

/// Gateway to the Tempbox backend's `/api` routes.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    base: Url,
}

impl HttpGateway {
    /// Creates a gateway for the backend at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let mut base = Url::parse(base_url)?;
        if base.cannot_be_a_base() {
            return Err(Error::InvalidBaseUrl(base_url.to_string()));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("tempbox/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, base })
    }

    /// Backend base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base
    }

    /// URL of `/api/<segments>`, with each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("api").extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let url = self.endpoint(segments);
        debug!("{method} {url}");
        self.client.request(method, url)
    }

    /// Sends a request, turning non-success statuses into [`Error::Status`].
    async fn send(request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorBody>(&body)
            .map(|e| match e.detail {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            })
            .unwrap_or_else(|_| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });
        Err(Error::Status {
            status: status.as_u16(),
            detail,
        })
    }

    async fn json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T> {
        let response = Self::send(request).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn fetch_domains(&self, provider: &ProviderPreference) -> Result<Vec<String>> {
        let request = self
            .request(Method::GET, &["domains"])
            .query(&[("service", provider.as_str())]);
        let domains: WireDomains = Self::json(request).await?;
        Ok(domains.domains)
    }

    async fn post_create(&self, preference: &Preference) -> Result<Resource> {
        let request = self
            .request(Method::POST, &["emails", "create"])
            .json(&CreateRequest::new(preference));
        let created: WireResource = Self::json(request).await?;
        created.into_resource()
    }

    async fn fetch_messages(&self, segments: &[&str]) -> Result<Vec<Message>> {
        let listing: WireMessageList = Self::json(self.request(Method::GET, segments)).await?;
        Ok(listing.into_messages())
    }

    async fn fetch_detail(&self, segments: &[&str]) -> Result<MessageDetail> {
        let detail: WireDetail = Self::json(self.request(Method::GET, segments)).await?;
        Ok(detail.into())
    }

    async fn post_save(&self, segments: &[&str]) -> Result<PinnedEntry> {
        let saved: WireSaved = Self::json(self.request(Method::POST, segments)).await?;
        saved.into_pinned()
    }

    async fn bulk_delete(&self, segments: &[&str], body: DeleteRequest) -> Result<()> {
        Self::send(self.request(Method::DELETE, segments).json(&body)).await?;
        Ok(())
    }
}

impl MailGateway for HttpGateway {
    async fn list_domains(&self, provider: &ProviderPreference) -> tempbox_core::Result<Vec<String>> {
        Ok(self.fetch_domains(provider).await?)
    }

    async fn create_resource(&self, preference: &Preference) -> tempbox_core::Result<Resource> {
        if let (ProviderPreference::Specific(tag), Some(domain)) =
            (&preference.provider, &preference.domain)
        {
            let domains = self.fetch_domains(&preference.provider).await?;
            if !domains.iter().any(|d| d.eq_ignore_ascii_case(domain)) {
                return Err(tempbox_core::Error::ProviderUnavailable(format!(
                    "{tag} does not offer {domain}"
                )));
            }
        }

        self.post_create(preference).await.map_err(|e| {
            warn!("Create request failed: {e}");
            e.into_create_error()
        })
    }

    async fn delete_resource(&self, id: &ResourceId) -> tempbox_core::Result<()> {
        Self::send(self.request(Method::DELETE, &["emails", id.as_str()])).await?;
        Ok(())
    }

    async fn extend_resource(&self, id: &ResourceId) -> tempbox_core::Result<DateTime<Utc>> {
        let request = self.request(Method::POST, &["emails", id.as_str(), "extend-time"]);
        let extension: WireExtension = Self::json(request).await?;
        Ok(extension.expires_at)
    }

    async fn list_messages(&self, resource_id: &ResourceId) -> tempbox_core::Result<Vec<Message>> {
        Ok(self
            .fetch_messages(&["emails", resource_id.as_str(), "messages"])
            .await?)
    }

    async fn get_message_detail(
        &self,
        resource_id: &ResourceId,
        message_id: &MessageId,
    ) -> tempbox_core::Result<MessageDetail> {
        Ok(self
            .fetch_detail(&["emails", resource_id.as_str(), "messages", &message_id.0])
            .await?)
    }

    async fn list_archived_messages(
        &self,
        resource_id: &ResourceId,
    ) -> tempbox_core::Result<Vec<Message>> {
        Ok(self
            .fetch_messages(&["emails", "history", resource_id.as_str(), "messages"])
            .await?)
    }

    async fn get_archived_message_detail(
        &self,
        resource_id: &ResourceId,
        message_id: &MessageId,
    ) -> tempbox_core::Result<MessageDetail> {
        Ok(self
            .fetch_detail(&[
                "emails",
                "history",
                resource_id.as_str(),
                "messages",
                &message_id.0,
            ])
            .await?)
    }

    async fn save_resource(&self, resource_id: &ResourceId) -> tempbox_core::Result<PinnedEntry> {
        Ok(self
            .post_save(&["emails", resource_id.as_str(), "save"])
            .await?)
    }

    async fn save_message(
        &self,
        resource_id: &ResourceId,
        message_id: &MessageId,
    ) -> tempbox_core::Result<PinnedEntry> {
        Ok(self
            .post_save(&[
                "emails",
                resource_id.as_str(),
                "messages",
                &message_id.0,
                "save",
            ])
            .await?)
    }

    async fn list_history(&self) -> tempbox_core::Result<Vec<HistoryEntry>> {
        let entries: Vec<WireResource> =
            Self::json(self.request(Method::GET, &["emails", "history", "list"])).await?;
        Ok(entries.into_iter().map(WireResource::into_history).collect())
    }

    async fn delete_history(&self, ids: Option<&HashSet<ResourceId>>) -> tempbox_core::Result<()> {
        let ids = ids.map(|ids| ids.iter().map(ResourceId::as_str).collect::<HashSet<_>>());
        Ok(self
            .bulk_delete(&["emails", "history", "delete"], DeleteRequest::new(ids.as_ref()))
            .await?)
    }

    async fn list_pinned(&self) -> tempbox_core::Result<Vec<PinnedEntry>> {
        let entries: Vec<WireSaved> = Self::json(self.request(Method::GET, &["saved"])).await?;
        let mut pinned = Vec::with_capacity(entries.len());
        for entry in entries {
            match entry.into_pinned() {
                Ok(entry) => pinned.push(entry),
                Err(e) => warn!("Skipping saved entry: {e}"),
            }
        }
        Ok(pinned)
    }

    async fn delete_pinned(&self, ids: Option<&HashSet<PinnedId>>) -> tempbox_core::Result<()> {
        let ids = ids.map(|ids| ids.iter().map(|id| id.0.as_str()).collect::<HashSet<_>>());
        Ok(self
            .bulk_delete(&["saved", "delete"], DeleteRequest::new(ids.as_ref()))
            .await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_building() {
        let gateway = HttpGateway::new("http://localhost:8001", DEFAULT_TIMEOUT).unwrap();
        assert_eq!(
            gateway.endpoint(&["emails", "7", "messages"]).as_str(),
            "http://localhost:8001/api/emails/7/messages"
        );

        let nested = HttpGateway::new("https://example.test/tempbox", DEFAULT_TIMEOUT).unwrap();
        assert_eq!(
            nested.endpoint(&["emails", "history", "list"]).as_str(),
            "https://example.test/tempbox/api/emails/history/list"
        );
    }

    #[test]
    fn test_segments_are_encoded() {
        let gateway = HttpGateway::new("http://localhost:8001/", DEFAULT_TIMEOUT).unwrap();
        assert_eq!(
            gateway.endpoint(&["emails", "a/b c"]).as_str(),
            "http://localhost:8001/api/emails/a%2Fb%20c"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            HttpGateway::new("mailto:someone@example.test", DEFAULT_TIMEOUT),
            Err(Error::InvalidBaseUrl(_))
        ));
        assert!(matches!(
            HttpGateway::new("not a url", DEFAULT_TIMEOUT),
            Err(Error::Url(_))
        ));
    }

    #[test]
    fn test_unreachable_backend_is_transient() {
        let gateway =
            HttpGateway::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
        let result = tokio_test::block_on(gateway.list_history());
        assert!(result.unwrap_err().is_retryable());
    }
}
