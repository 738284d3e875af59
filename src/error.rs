use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Classified error returned by every operation of this crate.
///
/// `status` is the HTTP status code when the failure came from a response
/// and `None` otherwise. A `None` status is either a network failure (the
/// server was never reached) or a local one (the request could not be built),
/// see [`ApiError::is_network`] and [`ApiError::is_local`].
#[derive(Clone, Debug, thiserror::Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct ApiError {
    /// Human-readable message extracted from the response or transport.
    pub message: String,
    /// HTTP status code of the failing response, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Parsed JSON error body, when the server sent one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Identifying fields of a missing or soft-deleted resource (404/410).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<ResourceRef>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    local: bool,
    #[serde(skip)]
    #[source]
    source: Option<Arc<reqwest::Error>>,
}

impl ApiError {
    /// Builds an error for a response with the given status.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: Some(status),
            data: None,
            resource: None,
            local: false,
            source: None,
        }
    }

    /// Builds an error for a request that never got an HTTP response.
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            data: None,
            resource: None,
            local: false,
            source: None,
        }
    }

    /// Builds an error raised before any request was sent.
    pub fn local(message: impl Into<String>) -> Self {
        Self {
            local: true,
            ..Self::network(message)
        }
    }

    /// The clean authentication failure raised by session recovery.
    pub fn unauthorized() -> Self {
        Self::http(401, "Unauthorized")
    }

    /// Wraps a `reqwest` failure. Builder errors (such as an unparsable URL)
    /// are local; anything else means the server was not reached.
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        let message = match std::error::Error::source(&err) {
            Some(cause) if err.is_builder() => format!("{err}: {cause}"),
            _ => err.to_string(),
        };
        Self {
            message,
            status: None,
            data: None,
            resource: None,
            local: err.is_builder(),
            source: Some(Arc::new(err)),
        }
    }

    /// Attaches the status of a response whose body could not be read.
    pub(crate) fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self.local = false;
        self
    }

    pub(crate) fn with_data(mut self, data: Option<serde_json::Value>) -> Self {
        self.data = data;
        self
    }

    pub(crate) fn with_resource(mut self, resource: Option<ResourceRef>) -> Self {
        self.resource = resource;
        self
    }

    /// Returns the underlying transport error, if the failure came from `reqwest`.
    pub fn transport(&self) -> Option<&reqwest::Error> {
        self.source.as_deref()
    }

    /// `true` when the server was never reached.
    pub fn is_network(&self) -> bool {
        self.status.is_none() && !self.local
    }

    /// `true` when the request failed before it was sent, for instance on an
    /// invalid URL or an unserializable body. Such errors are never retried.
    pub fn is_local(&self) -> bool {
        self.local
    }

    /// `true` for 401 and 403, the statuses that trigger session recovery.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status, Some(401 | 403))
    }

    /// `true` for 404.
    pub fn is_not_found(&self) -> bool {
        self.status == Some(404)
    }

    /// `true` for 410, a soft-deleted resource.
    pub fn is_gone(&self) -> bool {
        self.status == Some(410)
    }

    /// `true` for 429.
    pub fn is_rate_limited(&self) -> bool {
        self.status == Some(429)
    }

    /// `true` for any 5xx status.
    pub fn is_server_error(&self) -> bool {
        matches!(self.status, Some(500..=599))
    }

    /// Recovery fields of a 404/410, from the structured field or, failing
    /// that, from the encoded message prefix. Always `None` for other statuses.
    pub fn resource(&self) -> Option<ResourceRef> {
        if !matches!(self.status, Some(404 | 410)) {
            return None;
        }
        self.resource
            .clone()
            .or_else(|| ResourceRef::from_message(&self.message))
    }
}

/// Identifying fields of a resource reported missing or soft-deleted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    /// Table or collection the resource lived in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    /// Identifier of the resource.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Display name of the resource.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

const RESOURCE_KEYS: [&str; 3] = ["table", "id", "name"];

impl ResourceRef {
    /// `true` when no field is present.
    pub fn is_empty(&self) -> bool {
        self.table.is_none() && self.id.is_none() && self.name.is_none()
    }

    /// Prefixes `message` with `table:..|id:..|name:..|` for the fields present.
    ///
    /// The encoded form keeps the fields available to callers that only
    /// receive the message string.
    pub fn encode_into(&self, message: &str) -> String {
        let mut encoded = String::new();
        for (key, value) in RESOURCE_KEYS
            .iter()
            .zip([&self.table, &self.id, &self.name])
        {
            if let Some(value) = value {
                encoded.push_str(key);
                encoded.push(':');
                encoded.push_str(value);
                encoded.push('|');
            }
        }
        encoded.push_str(message);
        encoded
    }

    /// Parses the prefix written by [`ResourceRef::encode_into`].
    pub fn from_message(message: &str) -> Option<Self> {
        let mut resource = Self::default();
        for segment in message.split('|') {
            let Some((key, value)) = segment.split_once(':') else {
                break;
            };
            let slot = match key {
                "table" => &mut resource.table,
                "id" => &mut resource.id,
                "name" => &mut resource.name,
                _ => break,
            };
            *slot = Some(value.to_owned());
        }
        (!resource.is_empty()).then_some(resource)
    }
}

#[cfg(test)]
mod tests {
    use super::{ApiError, ResourceRef};

    #[test]
    fn encodes_only_present_fields() {
        let resource = ResourceRef {
            table: Some("users".to_owned()),
            id: Some("42".to_owned()),
            name: None,
        };
        assert_eq!(
            resource.encode_into("User was deleted"),
            "table:users|id:42|User was deleted"
        );
    }

    #[test]
    fn parses_encoded_prefix() {
        let parsed = ResourceRef::from_message("table:users|id:42|name:Kit|User was deleted")
            .expect("prefix must parse");
        assert_eq!(parsed.table.as_deref(), Some("users"));
        assert_eq!(parsed.id.as_deref(), Some("42"));
        assert_eq!(parsed.name.as_deref(), Some("Kit"));
    }

    #[test]
    fn plain_message_has_no_resource() {
        assert_eq!(ResourceRef::from_message("Not Found"), None);
        assert_eq!(ResourceRef::from_message("reason: stale cache"), None);
    }

    #[test]
    fn serialized_error_keeps_status_and_resource() {
        let err = ApiError::http(410, "table:orders|id:7|Order was deleted").with_resource(Some(
            ResourceRef {
                table: Some("orders".to_owned()),
                id: Some("7".to_owned()),
                name: None,
            },
        ));

        let json = serde_json::to_string(&err).expect("error must serialize");
        let back: ApiError = serde_json::from_str(&json).expect("error must deserialize");

        assert_eq!(back.status, Some(410));
        assert!(back.is_gone());
        assert_eq!(back.resource, err.resource);
        assert_eq!(back.to_string(), err.message);
    }

    #[test]
    fn resource_falls_back_to_message() {
        let err = ApiError::http(404, "table:users|id:9|missing");
        assert_eq!(
            err.resource().and_then(|resource| resource.id),
            Some("9".to_owned())
        );
    }

    #[test]
    fn resource_is_only_read_for_not_found_and_gone() {
        assert_eq!(ApiError::http(422, "name: field required").resource(), None);
        assert_eq!(
            ApiError::http(400, "id:abc is not a valid uuid").resource(),
            None
        );
        assert_eq!(ApiError::network("id:1|connection reset").resource(), None);
        assert!(ApiError::http(410, "id:abc|gone").resource().is_some());
    }

    #[test]
    fn local_errors_are_not_network_errors() {
        let err = ApiError::local("invalid request body: key must be a string");
        assert_eq!(err.status, None);
        assert!(err.is_local());
        assert!(!err.is_network());

        let json = serde_json::to_string(&err).expect("error must serialize");
        let back: ApiError = serde_json::from_str(&json).expect("error must deserialize");
        assert!(back.is_local());

        let network = ApiError::network("connection refused");
        assert!(network.is_network());
        assert!(!network.is_local());
        let json = serde_json::to_string(&network).expect("error must serialize");
        assert!(!json.contains("local"));
    }

    #[test]
    fn unauthorized_is_clean() {
        let err = ApiError::unauthorized();
        assert_eq!(err.message, "Unauthorized");
        assert_eq!(err.status, Some(401));
        assert!(err.is_unauthorized());
        assert!(err.transport().is_none());
    }
}
