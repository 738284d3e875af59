use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;

use crate::{
    wire::{Detail, ErrorBody, ValidationIssue},
    ApiError, ResourceRef, Result,
};

const ISSUE_SEPARATOR: &str = "; ";

/// Turns a non-success response into a classified error.
///
/// `content_type` is the raw `Content-Type` header; the body is parsed as
/// JSON only when it advertises JSON.
pub(crate) fn error_from_response(
    status: StatusCode,
    content_type: Option<&str>,
    body: &str,
) -> ApiError {
    let is_json = content_type.is_some_and(|value| value.to_ascii_lowercase().contains("json"));
    let parsed = if is_json {
        serde_json::from_str::<Value>(body).ok()
    } else {
        None
    };

    let mut message = match &parsed {
        Some(value) => extract_message(value),
        None => body.trim().to_owned(),
    };
    if message.is_empty() {
        message = status
            .canonical_reason()
            .map(str::to_owned)
            .unwrap_or_else(|| format!("request failed with status {}", status.as_u16()));
    }

    let mut resource = None;
    match status {
        StatusCode::NOT_FOUND | StatusCode::GONE => {
            resource = parsed.as_ref().and_then(resource_from_body);
            if let Some(resource) = &resource {
                message = resource.encode_into(&message);
            }
        }
        StatusCode::TOO_MANY_REQUESTS => {
            message = rate_limit_message(&message);
        }
        _ => {}
    }

    ApiError::http(status.as_u16(), message)
        .with_data(parsed)
        .with_resource(resource)
}

/// Decodes a success body. An empty body (or 204) decodes from JSON `null`.
pub(crate) fn decode_success<T: DeserializeOwned>(status: StatusCode, body: &str) -> Result<T> {
    let decoded = if status == StatusCode::NO_CONTENT || body.trim().is_empty() {
        serde_json::from_value(Value::Null)
    } else {
        serde_json::from_str(body)
    };

    decoded.map_err(|err| {
        ApiError::http(
            status.as_u16(),
            format!("invalid response JSON: {err}"),
        )
    })
}

fn extract_message(value: &Value) -> String {
    let body = match ErrorBody::deserialize_from(value) {
        Some(body) => body,
        None => return value.to_string(),
    };

    match body.detail {
        Some(Detail::Text(text)) => return text,
        Some(Detail::Issues(issues)) if !issues.is_empty() => return format_issues(&issues),
        Some(Detail::Issues(_)) => {}
        Some(Detail::Other(other)) => return other.to_string(),
        None => {}
    }

    if let Some(message) = body.message.as_ref().and_then(scalar_text) {
        return message;
    }

    value.to_string()
}

/// Flattens `[{loc, msg}]` into `"loc.path: msg"` entries.
fn format_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|issue| {
            let path = issue
                .loc
                .iter()
                .filter_map(scalar_text)
                .collect::<Vec<_>>()
                .join(".");
            if path.is_empty() {
                issue.msg.clone()
            } else {
                format!("{path}: {}", issue.msg)
            }
        })
        .collect::<Vec<_>>()
        .join(ISSUE_SEPARATOR)
}

fn resource_from_body(value: &Value) -> Option<ResourceRef> {
    let body = ErrorBody::deserialize_from(value)?;
    let resource = ResourceRef {
        table: body.table_name.as_ref().and_then(scalar_text),
        id: body.item_id.as_ref().and_then(scalar_text),
        name: body.item_name.as_ref().and_then(scalar_text),
    };
    (!resource.is_empty()).then_some(resource)
}

fn rate_limit_message(detail: &str) -> String {
    let detail = detail.trim().trim_end_matches('.');
    format!("Rate limit exceeded: {detail}. Please wait a moment before trying again.")
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

impl ErrorBody {
    fn deserialize_from(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        Self::deserialize(value).ok()
    }
}
