//! Client identification for lockout tracking.

use axum::http::HeaderMap;

/// Identifier used when no proxy header names the client.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Derive the lockout key for a request from its proxy headers.
///
/// `X-Forwarded-For` can contain a chain (`client, proxy1, proxy2`); the first
/// entry is the original client. `X-Real-IP` is the nginx fallback. Both are
/// caller-controlled, so the service must sit behind a proxy that overwrites
/// them.
pub fn client_identifier(headers: &HeaderMap) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for")
        && let Ok(value) = forwarded.to_str()
        && let Some(client_ip) = value.split(',').next()
        && !client_ip.trim().is_empty()
    {
        return client_ip.trim().to_string();
    }

    if let Some(real_ip) = headers.get("x-real-ip")
        && let Ok(value) = real_ip.to_str()
        && !value.trim().is_empty()
    {
        return value.trim().to_string();
    }

    UNKNOWN_CLIENT.to_string()
}
