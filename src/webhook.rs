// src/webhook.rs
//
// Identity provider webhooks, delivered through Svix. Each delivery is signed
// with HMAC-SHA256 over "{svix-id}.{svix-timestamp}.{body}".

use actix_web::{web, HttpRequest, HttpResponse};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::app_state::AppState;
use crate::error::ApiError;
use crate::events::{Event, Publish};

type HmacSha256 = Hmac<Sha256>;

/// Allowed clock skew between the sender and us.
pub const TOLERANCE_SECS: i64 = 5 * 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WebhookError {
    #[error("missing header {0}")]
    MissingHeader(&'static str),
    #[error("webhook secret is not valid base64")]
    BadSecret,
    #[error("invalid timestamp")]
    BadTimestamp,
    #[error("timestamp outside the tolerance window")]
    Expired,
    #[error("no matching signature")]
    SignatureMismatch,
}

/// Computes the `v1,<base64>` signature of a delivery.
pub fn sign(secret: &str, msg_id: &str, timestamp: &str, body: &[u8]) -> Result<String, WebhookError> {
    let key = STANDARD
        .decode(secret.strip_prefix("whsec_").unwrap_or(secret))
        .map_err(|_| WebhookError::BadSecret)?;
    let mut mac = HmacSha256::new_from_slice(&key).map_err(|_| WebhookError::BadSecret)?;
    mac.update(msg_id.as_bytes());
    mac.update(b".");
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(body);
    Ok(format!("v1,{}", STANDARD.encode(mac.finalize().into_bytes())))
}

/// Checks a delivery against a space separated `svix-signature` list.
pub fn verify(
    secret: &str,
    msg_id: &str,
    timestamp: &str,
    signatures: &str,
    body: &[u8],
    now: DateTime<Utc>,
) -> Result<(), WebhookError> {
    let sent_at: i64 = timestamp
        .trim()
        .parse()
        .map_err(|_| WebhookError::BadTimestamp)?;
    if now.timestamp().abs_diff(sent_at) > TOLERANCE_SECS.unsigned_abs() {
        return Err(WebhookError::Expired);
    }

    let expected = sign(secret, msg_id, timestamp, body)?;
    let matched = signatures
        .split_whitespace()
        .any(|candidate| bool::from(candidate.as_bytes().ct_eq(expected.as_bytes())));
    if matched {
        Ok(())
    } else {
        Err(WebhookError::SignatureMismatch)
    }
}

#[derive(Debug, Deserialize)]
struct Delivery {
    #[serde(rename = "type")]
    kind: String,
    data: serde_json::Value,
}

fn payload<T: DeserializeOwned>(data: serde_json::Value) -> Result<T, ApiError> {
    serde_json::from_value(data)
        .map_err(|e| ApiError::BadRequest(format!("Invalid webhook payload: {}", e)))
}

/// Maps a delivery onto an internal event. Unhandled types map to `None`.
fn to_event(delivery: Delivery) -> Result<Option<Event>, ApiError> {
    let event = match delivery.kind.as_str() {
        "user.created" => Event::UserCreated(payload(delivery.data)?),
        "user.updated" => Event::UserUpdated(payload(delivery.data)?),
        "user.deleted" => Event::UserDeleted(payload(delivery.data)?),
        "organization.created" => Event::WorkspaceCreated(payload(delivery.data)?),
        "organization.updated" => Event::WorkspaceUpdated(payload(delivery.data)?),
        "organization.deleted" => Event::WorkspaceDeleted(payload(delivery.data)?),
        "organizationMembership.created" => {
            Event::WorkspaceMemberCreated(payload(delivery.data)?)
        }
        _ => return Ok(None),
    };
    Ok(Some(event))
}

fn header<'a>(req: &'a HttpRequest, name: &'static str) -> Result<&'a str, WebhookError> {
    req.headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .ok_or(WebhookError::MissingHeader(name))
}

/// POST /api/webhooks/clerk
pub async fn clerk_webhook(
    req: HttpRequest,
    data: web::Data<AppState>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let secret = data
        .config
        .clerk_webhook_secret
        .as_deref()
        .ok_or_else(|| ApiError::Internal("Webhook secret is not configured".to_string()))?;

    let verified = header(&req, "svix-id").and_then(|msg_id| {
        verify(
            secret,
            msg_id,
            header(&req, "svix-timestamp")?,
            header(&req, "svix-signature")?,
            &body,
            Utc::now(),
        )
    });
    if let Err(e) = verified {
        warn!("Rejected webhook delivery: {}", e);
        return Err(ApiError::Unauthorized("Invalid webhook signature"));
    }

    let delivery: Delivery = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid webhook payload: {}", e)))?;
    let kind = delivery.kind.clone();
    match to_event(delivery)? {
        Some(event) => {
            info!("Webhook {} accepted as {}", kind, event.name());
            data.events.do_send(Publish(event));
        }
        None => debug!("Ignoring webhook type {}", kind),
    }

    Ok(HttpResponse::Ok().json(json!({ "received": true })))
}
