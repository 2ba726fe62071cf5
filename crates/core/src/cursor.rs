//! Opaque pagination cursors.
//!
//! A cursor carries the key of the last item returned on a page. The token
//! format is `base64url(json) "." base64url(hmac_sha256(json))`, so callers
//! cannot forge or edit a position; any change to the token fails decoding
//! with [`CoreError::InvalidCursor`].

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::CoreError;
use crate::keys::ItemKey;

type HmacSha256 = Hmac<Sha256>;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Page size used when the caller does not ask for one.
pub const DEFAULT_PAGE_LIMIT: usize = 20;

/// Largest page a caller may request.
pub const MAX_PAGE_LIMIT: usize = 100;

// ---------------------------------------------------------------------------
// Start key
// ---------------------------------------------------------------------------

/// Resume position of a query: the primary key of the last returned item,
/// plus its index entry when the query ran against an index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartKey {
    pub primary: ItemKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<ItemKey>,
}

impl StartKey {
    /// Partition the position belongs to (the index partition for index queries).
    pub fn partition(&self) -> &str {
        match &self.index {
            Some(index) => &index.pk,
            None => &self.primary.pk,
        }
    }
}

// ---------------------------------------------------------------------------
// Codec
// ---------------------------------------------------------------------------

/// Signs and verifies cursor tokens with a server-side secret.
#[derive(Clone)]
pub struct CursorCodec {
    secret: Vec<u8>,
}

impl std::fmt::Debug for CursorCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CursorCodec").finish_non_exhaustive()
    }
}

impl CursorCodec {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    fn mac(&self) -> Result<HmacSha256, CoreError> {
        HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| CoreError::Internal(format!("cursor key: {e}")))
    }

    /// Encode a resume position into an opaque token.
    pub fn encode(&self, start: &StartKey) -> Result<String, CoreError> {
        let payload = serde_json::to_vec(start)?;
        let mut mac = self.mac()?;
        mac.update(&payload);
        let tag = mac.finalize().into_bytes();
        Ok(format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(&payload),
            URL_SAFE_NO_PAD.encode(tag)
        ))
    }

    /// Decode and verify a token produced by [`CursorCodec::encode`].
    pub fn decode(&self, token: &str) -> Result<StartKey, CoreError> {
        let (payload_b64, tag_b64) = token
            .split_once('.')
            .ok_or_else(|| CoreError::InvalidCursor("missing signature".into()))?;

        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| CoreError::InvalidCursor("malformed payload".into()))?;
        let tag = URL_SAFE_NO_PAD
            .decode(tag_b64)
            .map_err(|_| CoreError::InvalidCursor("malformed signature".into()))?;

        let mut mac = self.mac()?;
        mac.update(&payload);
        mac.verify_slice(&tag)
            .map_err(|_| CoreError::InvalidCursor("signature mismatch".into()))?;

        serde_json::from_slice(&payload)
            .map_err(|_| CoreError::InvalidCursor("unreadable position".into()))
    }
}

// ---------------------------------------------------------------------------
// Page request / result
// ---------------------------------------------------------------------------

/// Caller-supplied paging parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageRequest {
    /// Requested page size; `0` means [`DEFAULT_PAGE_LIMIT`].
    #[serde(default)]
    pub limit: usize,
    /// Token from a previous page's `next_cursor`.
    #[serde(default)]
    pub cursor: Option<String>,
}

impl PageRequest {
    pub fn first(limit: usize) -> Self {
        Self {
            limit,
            cursor: None,
        }
    }

    pub fn after(limit: usize, cursor: impl Into<String>) -> Self {
        Self {
            limit,
            cursor: Some(cursor.into()),
        }
    }

    /// Clamp the requested limit into `1..=max`, substituting `default` for 0.
    pub fn effective_limit(&self, default: usize, max: usize) -> usize {
        match self.limit {
            0 => default.min(max),
            n => n.min(max),
        }
    }
}

/// One page of results.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            next_cursor: None,
            has_more: false,
        }
    }

    /// Convert the items while keeping the paging state.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            next_cursor: self.next_cursor,
            has_more: self.has_more,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn codec() -> CursorCodec {
        CursorCodec::new("test-cursor-secret")
    }

    fn start() -> StartKey {
        StartKey {
            primary: ItemKey::new("OWNER#u1", "TRACK#t9"),
            index: Some(ItemKey::new("PUBLIC_TRACK", "2026-01-01T00:00:00.000Z#t9")),
        }
    }

    #[test]
    fn encode_then_decode_returns_position() {
        let token = codec().encode(&start()).unwrap();
        assert_eq!(codec().decode(&token).unwrap(), start());
    }

    #[test]
    fn token_is_url_safe() {
        let token = codec().encode(&start()).unwrap();
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.'));
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let token = codec().encode(&start()).unwrap();
        let (_, tag) = token.split_once('.').unwrap();
        let forged = StartKey {
            primary: ItemKey::new("OWNER#u2", "TRACK#t1"),
            index: None,
        };
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged).unwrap());
        assert_matches!(
            codec().decode(&format!("{forged_payload}.{tag}")),
            Err(CoreError::InvalidCursor(_))
        );
    }

    #[test]
    fn other_secret_is_rejected() {
        let token = CursorCodec::new("other").encode(&start()).unwrap();
        assert_matches!(codec().decode(&token), Err(CoreError::InvalidCursor(_)));
    }

    #[test]
    fn garbage_is_rejected() {
        assert_matches!(codec().decode(""), Err(CoreError::InvalidCursor(_)));
        assert_matches!(codec().decode("abc"), Err(CoreError::InvalidCursor(_)));
        assert_matches!(codec().decode("!!.!!"), Err(CoreError::InvalidCursor(_)));
    }

    #[test]
    fn start_key_partition_prefers_index() {
        assert_eq!(start().partition(), "PUBLIC_TRACK");
        let primary_only = StartKey {
            primary: ItemKey::new("OWNER#u1", "TRACK#t9"),
            index: None,
        };
        assert_eq!(primary_only.partition(), "OWNER#u1");
    }

    #[test]
    fn effective_limit_defaults_and_clamps() {
        assert_eq!(PageRequest::first(0).effective_limit(20, 100), 20);
        assert_eq!(PageRequest::first(5).effective_limit(20, 100), 5);
        assert_eq!(PageRequest::first(500).effective_limit(20, 100), 100);
    }
}
