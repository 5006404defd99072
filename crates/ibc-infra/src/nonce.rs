//! Anti-forgery nonces for AJAX requests
//!
//! A nonce is bound to an action and to the caller's session id, which the
//! browser holds in a `SameSite=Strict` cookie. Time is split into ticks of
//! half the nonce lifetime. A nonce is the first ten hex characters of
//! `HMAC-SHA256(secret, "<tick>|<action>|<session>")` and is accepted during
//! its own tick and the next one, so it stays valid for between half and the
//! whole lifetime.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};
use subtle::ConstantTimeEq;
use uuid::Uuid;

/// Action the upload endpoint's nonces are issued for
pub const UPLOAD_NONCE_ACTION: &str = "ibc";

/// Cookie carrying the session id a nonce is bound to
pub const SESSION_COOKIE: &str = "ibc-session";

const NONCE_LENGTH: usize = 10;

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct NonceService {
    secret: String,
    lifetime_secs: u64,
}

impl std::fmt::Debug for NonceService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NonceService")
            .field("lifetime_secs", &self.lifetime_secs)
            .finish_non_exhaustive()
    }
}

impl NonceService {
    pub fn new(secret: impl Into<String>, lifetime_secs: u64) -> Self {
        Self {
            secret: secret.into(),
            lifetime_secs,
        }
    }

    /// Fresh random session id
    pub fn new_session() -> String {
        Uuid::new_v4().simple().to_string()
    }

    /// Whether `value` has the shape of an id issued by [`Self::new_session`]
    pub fn is_session_id(value: &str) -> bool {
        value.len() == 32 && Uuid::try_parse(value).is_ok()
    }

    /// Issue a nonce for `action` and `session`, valid from now
    pub fn create(&self, action: &str, session: &str) -> String {
        self.create_at(action, session, now_secs())
    }

    pub fn create_at(&self, action: &str, session: &str, now: u64) -> String {
        self.token(self.tick(now), action, session)
    }

    pub fn verify(&self, action: &str, session: &str, nonce: &str) -> bool {
        self.verify_at(action, session, nonce, now_secs())
    }

    pub fn verify_at(&self, action: &str, session: &str, nonce: &str, now: u64) -> bool {
        if nonce.is_empty() || session.is_empty() {
            return false;
        }

        let tick = self.tick(now);
        [Some(tick), tick.checked_sub(1)]
            .into_iter()
            .flatten()
            .any(|t| {
                let expected = self.token(t, action, session);
                expected.as_bytes().ct_eq(nonce.as_bytes()).into()
            })
    }

    fn tick(&self, now: u64) -> u64 {
        now / (self.lifetime_secs / 2).max(1)
    }

    fn token(&self, tick: u64, action: &str, session: &str) -> String {
        let mut mac =
            HmacSha256::new_from_slice(self.secret.as_bytes()).expect("HMAC can take key of any size");
        mac.update(format!("{}|{}|{}", tick, action, session).as_bytes());
        let mut token = hex::encode(mac.finalize().into_bytes());
        token.truncate(NONCE_LENGTH);
        token
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
