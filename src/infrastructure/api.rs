//! HTTP client for the registration backend.
//!
//! All collaborators live under one base URL: the registry name check, the
//! application status lookup, the payment gateway proxy and the
//! registration endpoint itself. [`RegistrationApi`] is the seam the wizard
//! talks to; [`HttpRegistrationApi`] is the blocking `reqwest`
//! implementation.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use reqwest::StatusCode;
use reqwest::Url;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, Response};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::SubmissionPayload;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid API URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// Non-success status; `message` is the backend's own explanation when
    /// it sent one, otherwise `"<status>: <reason>"`.
    #[error("{message}")]
    Status { status: u16, message: String },
    #[error("unexpected response: {0}")]
    Decode(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

static NAME_REFUSED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:not\s+available|unavailable|reserved|taken|rejected)\b").expect("static pattern")
});
static NAME_CONFLICT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:similar|exists?|existing|match(?:es|ing)?|conflicts?)\b").expect("static pattern")
});
static CONFLICT_NEGATED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:no|none|not|without)\s+(?:\w+\s+)?(?:similar|exists?|existing|match(?:es|ing)?|conflicts?)\b")
        .expect("static pattern")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NameCheckRequest {
    pub proposed_name: String,
    pub line_of_business: String,
}

/// Registry verdict on one proposed business name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameCheckOutcome {
    pub name: String,
    pub available: bool,
    pub message: String,
    pub recommendations: Vec<String>,
}

impl NameCheckOutcome {
    /// Reads the registry's reply, which carries a free-text similarity
    /// message and optionally an explicit flag and suggested alternatives.
    pub fn from_response(name: &str, json: &Value) -> Self {
        let data = json.get("data").unwrap_or(&Value::Null);
        let message = string_at(json, &["/message", "/data/message"]).unwrap_or_default();

        let available = availability_flag(json)
            .or_else(|| availability_status(json))
            .unwrap_or_else(|| message_says_available(&message));

        let mut recommendations = Vec::new();
        for key in ["recommendedNames", "recommendations", "keywords"] {
            if let Some(items) = data.get(key).and_then(Value::as_array) {
                recommendations.extend(items.iter().filter_map(Value::as_str).map(str::to_string));
            }
        }

        Self {
            name: name.to_string(),
            available,
            message,
            recommendations,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub amount: u64,
    pub wallet_id: String,
    pub currency: String,
    pub metadata: Value,
}

/// Where to send the payer, and the reference to poll afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentCheckout {
    pub authorization_url: String,
    pub reference: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisteredEntity {
    #[serde(deserialize_with = "lenient_string")]
    pub rc_number: String,
    #[serde(deserialize_with = "lenient_string")]
    pub entity_name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub entity_type: String,
    #[serde(deserialize_with = "lenient_string")]
    pub registration_date: String,
    #[serde(deserialize_with = "lenient_string")]
    pub tin: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplicationStatus {
    #[serde(deserialize_with = "lenient_string")]
    pub status: String,
    #[serde(deserialize_with = "lenient_string")]
    pub transaction_ref: String,
    #[serde(rename = "data")]
    pub entity: Option<RegisteredEntity>,
    #[serde(skip)]
    pub message: String,
}

/// Body of a successful registration POST.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationAck {
    pub transaction_ref: Option<String>,
    pub body: Value,
}

impl RegistrationAck {
    pub fn from_response(body: Value) -> Self {
        let transaction_ref = string_at(&body, &["/data/transactionRef"]);
        Self {
            transaction_ref,
            body,
        }
    }
}

/// The backend operations the wizard depends on.
pub trait RegistrationApi {
    fn check_name(&self, request: &NameCheckRequest) -> ApiResult<NameCheckOutcome>;
    fn application_status(&self, reference: &str) -> ApiResult<ApplicationStatus>;
    fn initialize_payment(&self, request: &PaymentRequest) -> ApiResult<PaymentCheckout>;
    /// Current gateway status for `reference`, lowercased.
    fn payment_status(&self, reference: &str) -> ApiResult<String>;
    fn register(&self, payload: &SubmissionPayload) -> ApiResult<RegistrationAck>;
}

#[derive(Debug, Clone)]
pub struct HttpRegistrationApi {
    client: Client,
    base_url: Url,
}

impl HttpRegistrationApi {
    /// Builds a client rooted at `base_url`. A trailing `/` is added when
    /// missing so relative endpoint paths land beneath it.
    pub fn new(base_url: &str, timeout: Duration) -> ApiResult<Self> {
        let base_url = parse_base_url(base_url)?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str, reference: Option<&str>) -> ApiResult<Url> {
        let mut url = self.base_url.join(path).map_err(|e| ApiError::InvalidUrl {
            url: format!("{}{}", self.base_url, path),
            reason: e.to_string(),
        })?;
        if let Some(reference) = reference {
            let display = url.to_string();
            url.path_segments_mut()
                .map_err(|_| ApiError::InvalidUrl {
                    url: display,
                    reason: "cannot carry path segments".to_string(),
                })?
                .pop_if_empty()
                .push(reference.trim());
        }
        Ok(url)
    }
}

impl RegistrationApi for HttpRegistrationApi {
    fn check_name(&self, request: &NameCheckRequest) -> ApiResult<NameCheckOutcome> {
        let url = self.endpoint("check-bn", None)?;
        debug!(name = %request.proposed_name, "checking business name");
        let json = read_json(self.client.post(url).json(request).send()?)?;
        Ok(NameCheckOutcome::from_response(&request.proposed_name, &json))
    }

    fn application_status(&self, reference: &str) -> ApiResult<ApplicationStatus> {
        let url = self.endpoint("check-status/", Some(reference))?;
        let json = read_json(self.client.get(url).send()?)?;

        let payload = json
            .get("data")
            .filter(|data| !data.is_null())
            .ok_or_else(|| ApiError::Decode("no status data returned".to_string()))?;
        let mut status: ApplicationStatus = serde_json::from_value(payload.clone())
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        status.message = string_at(&json, &["/message", "/data/message"]).unwrap_or_default();
        Ok(status)
    }

    fn initialize_payment(&self, request: &PaymentRequest) -> ApiResult<PaymentCheckout> {
        let url = self.endpoint("payments/initialize", None)?;
        let json = read_json(self.client.post(url).json(request).send()?)?;

        let authorization_url = string_at(&json, &["/checkout/data/authorization_url"])
            .ok_or_else(|| ApiError::Decode("checkout has no authorization_url".to_string()))?;
        let reference = string_at(&json, &["/checkout/data/reference"])
            .ok_or_else(|| ApiError::Decode("checkout has no reference".to_string()))?;
        info!(%reference, "payment initialized");
        Ok(PaymentCheckout {
            authorization_url,
            reference,
        })
    }

    fn payment_status(&self, reference: &str) -> ApiResult<String> {
        let url = self.endpoint("payments/checkout/status/", Some(reference))?;
        let json = read_json(self.client.get(url).send()?)?;
        extract_payment_status(&json)
            .ok_or_else(|| ApiError::Decode("payment status missing".to_string()))
    }

    fn register(&self, payload: &SubmissionPayload) -> ApiResult<RegistrationAck> {
        let url = self.endpoint("reg-bn", None)?;
        debug!(
            fields = payload.fields.len(),
            attachments = payload.attachments.len(),
            "submitting registration"
        );
        let json = read_json(self.client.post(url).multipart(multipart_form(payload)?).send()?)?;
        Ok(RegistrationAck::from_response(json))
    }
}

fn parse_base_url(raw: &str) -> ApiResult<Url> {
    let trimmed = raw.trim();
    let normalized = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    let url = Url::parse(&normalized).map_err(|e| ApiError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    if url.cannot_be_a_base() {
        return Err(ApiError::InvalidUrl {
            url: raw.to_string(),
            reason: "not a base URL".to_string(),
        });
    }
    Ok(url)
}

fn multipart_form(payload: &SubmissionPayload) -> ApiResult<Form> {
    let mut form = Form::new();
    for (name, value) in &payload.fields {
        form = form.text(*name, value.clone());
    }
    for attachment in &payload.attachments {
        let part = Part::bytes(attachment.bytes.clone())
            .file_name(attachment.file_name)
            .mime_str(&attachment.content_type)?;
        form = form.part(attachment.field, part);
    }
    Ok(form)
}

fn read_json(response: Response) -> ApiResult<Value> {
    let status = response.status();
    let body = response.text()?;
    if !status.is_success() {
        return Err(ApiError::Status {
            status: status.as_u16(),
            message: error_message(status, &body),
        });
    }
    serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
}

/// The backend's `message` when the error body is JSON, otherwise the
/// status line.
pub fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|json| string_at(&json, &["/message"]))
        .unwrap_or_else(|| {
            format!(
                "{}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown Status")
            )
        })
}

/// Finds the gateway status wherever this gateway version nests it.
pub fn extract_payment_status(json: &Value) -> Option<String> {
    string_at(
        json,
        &[
            "/data/status",
            "/checkout/data/status",
            "/data/data/status",
            "/status",
        ],
    )
    .map(|status| status.trim().to_lowercase())
}

fn availability_flag(json: &Value) -> Option<bool> {
    [
        "/data/available",
        "/data/isAvailable",
        "/data/nameAvailable",
        "/available",
        "/isAvailable",
    ]
    .iter()
    .find_map(|pointer| json.pointer(pointer).and_then(Value::as_bool))
}

fn availability_status(json: &Value) -> Option<bool> {
    let status = string_at(json, &["/data/status", "/data/nameStatus"])?.to_lowercase();
    match status.trim() {
        "available" | "approved" | "free" => Some(true),
        "reserved" | "unavailable" | "not available" | "taken" | "rejected" => Some(false),
        _ => None,
    }
}

/// Reads a free-text verdict one clause at a time. A clause such as "no
/// similar names found" does not count against the name.
fn message_says_available(message: &str) -> bool {
    let lowered = message.to_lowercase();
    let mut available = false;
    for clause in lowered.split(['.', ';', '!', '\n']).map(str::trim) {
        if NAME_REFUSED.is_match(clause) {
            return false;
        }
        if NAME_CONFLICT.is_match(clause) && !CONFLICT_NEGATED.is_match(clause) {
            return false;
        }
        if clause.contains("available") {
            available = true;
        }
    }
    available
}

fn string_at(json: &Value, pointers: &[&str]) -> Option<String> {
    pointers
        .iter()
        .filter_map(|pointer| json.pointer(pointer))
        .filter_map(Value::as_str)
        .find(|value| !value.trim().is_empty())
        .map(str::to_string)
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}
