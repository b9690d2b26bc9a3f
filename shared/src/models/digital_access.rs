//! Digital Access Model
//!
//! One grant per (order item, customer): the right to download a purchased
//! file, bounded by an optional hard expiry and a download cap, fronted by
//! a short-lived rotating token.

use serde::{Deserialize, Serialize};

/// A token with its validity window.
///
/// Pure value object so rotation logic is testable without a clock mock:
/// callers pass `now` explicitly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenWindow {
    pub token: String,
    pub issued_at: i64,
    pub expires_at: i64,
}

impl TokenWindow {
    /// Whether the window still covers `now`
    pub fn is_current(&self, now: i64) -> bool {
        now < self.expires_at
    }

    /// A token needs rotation when absent or expiring within the safety
    /// margin. Rotation never touches the download counter or the hard
    /// expiry of the owning access.
    pub fn needs_rotation(current: Option<&TokenWindow>, now: i64, margin_ms: i64) -> bool {
        match current {
            None => true,
            Some(w) => now + margin_ms >= w.expires_at,
        }
    }
}

/// Digital access entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct DigitalAccess {
    pub id: i64,
    pub order_item_id: i64,
    pub product_id: i64,
    pub customer_id: i64,
    pub granted_at: i64,
    /// Hard expiry; None means the grant never hard-expires
    pub expires_at: Option<i64>,
    pub download_count: i64,
    pub max_downloads: i64,
    /// Current rotating token (cleared on revocation)
    pub token: Option<String>,
    pub token_issued_at: Option<i64>,
    pub token_expires_at: Option<i64>,
    pub last_downloaded_at: Option<i64>,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl DigitalAccess {
    /// Hard expiry passed
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|e| now >= e)
    }

    /// Download cap not yet reached
    pub fn has_downloads_remaining(&self) -> bool {
        self.download_count < self.max_downloads
    }

    /// Current token window, when all three fields are present
    pub fn token_window(&self) -> Option<TokenWindow> {
        match (&self.token, self.token_issued_at, self.token_expires_at) {
            (Some(token), Some(issued_at), Some(expires_at)) => Some(TokenWindow {
                token: token.clone(),
                issued_at,
                expires_at,
            }),
            _ => None,
        }
    }
}

/// Admin adjustment payload (cap / hard expiry / active flag)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigitalAccessUpdate {
    pub max_downloads: Option<i64>,
    pub expires_at: Option<i64>,
    pub is_active: Option<bool>,
}

/// Download link handed to the customer; its validity is the token
/// window's, independent of the access's hard expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadLink {
    pub access_id: i64,
    pub url: String,
    pub token: String,
    pub expires_at: i64,
    pub downloads_remaining: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn access() -> DigitalAccess {
        DigitalAccess {
            id: 1,
            order_item_id: 10,
            product_id: 100,
            customer_id: 1000,
            granted_at: 1_000,
            expires_at: Some(100_000),
            download_count: 0,
            max_downloads: 5,
            token: Some("abc".to_string()),
            token_issued_at: Some(1_000),
            token_expires_at: Some(10_000),
            last_downloaded_at: None,
            is_active: true,
            created_at: 1_000,
            updated_at: 1_000,
        }
    }

    #[test]
    fn test_is_expired() {
        let a = access();
        assert!(!a.is_expired(99_999));
        assert!(a.is_expired(100_000));
        let mut forever = access();
        forever.expires_at = None;
        assert!(!forever.is_expired(i64::MAX));
    }

    #[test]
    fn test_has_downloads_remaining() {
        let mut a = access();
        assert!(a.has_downloads_remaining());
        a.download_count = 5;
        assert!(!a.has_downloads_remaining());
        a.download_count = 6;
        assert!(!a.has_downloads_remaining());
    }

    #[test]
    fn test_needs_rotation_when_missing() {
        assert!(TokenWindow::needs_rotation(None, 0, 0));
    }

    #[test]
    fn test_needs_rotation_within_margin() {
        let w = TokenWindow {
            token: "t".to_string(),
            issued_at: 0,
            expires_at: 10_000,
        };
        // Plenty of time left
        assert!(!TokenWindow::needs_rotation(Some(&w), 1_000, 2_000));
        // Inside the margin
        assert!(TokenWindow::needs_rotation(Some(&w), 9_000, 2_000));
        // Already expired
        assert!(TokenWindow::needs_rotation(Some(&w), 11_000, 0));
    }

    #[test]
    fn test_token_window_requires_all_fields() {
        let mut a = access();
        assert!(a.token_window().is_some());
        a.token = None;
        assert!(a.token_window().is_none());
    }
}
