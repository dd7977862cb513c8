use serde::{Deserialize, Serialize};

/// Serialized snapshot of cookies and local storage for an authenticated
/// browser context. The JSON layout follows the common automation-driver
/// `storage_state` format so existing session files remain readable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageState {
    #[serde(default)]
    pub cookies: Vec<StoredCookie>,
    #[serde(default)]
    pub origins: Vec<OriginStorage>,
}

impl StorageState {
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty() && self.origins.iter().all(|o| o.local_storage.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    #[serde(default = "default_path")]
    pub path: String,
    /// Seconds since the epoch; -1 for session cookies
    #[serde(default = "session_expiry")]
    pub expires: f64,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub secure: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<String>,
}

fn default_path() -> String {
    "/".to_string()
}

fn session_expiry() -> f64 {
    -1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginStorage {
    pub origin: String,
    #[serde(default)]
    pub local_storage: Vec<NameValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameValue {
    pub name: String,
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_driver_storage_state_format() {
        let raw = r#"{
            "cookies": [{
                "name": "sid", "value": "abc", "domain": ".salesforce.com",
                "path": "/", "expires": 1767225600.5, "httpOnly": true,
                "secure": true, "sameSite": "Lax"
            }],
            "origins": [{
                "origin": "https://trailhead.salesforce.com",
                "localStorage": [{"name": "k", "value": "v"}]
            }]
        }"#;
        let state: StorageState = serde_json::from_str(raw).unwrap();
        assert_eq!(state.cookies[0].name, "sid");
        assert!(state.cookies[0].http_only);
        assert_eq!(state.cookies[0].same_site.as_deref(), Some("Lax"));
        assert_eq!(state.origins[0].local_storage[0].value, "v");
        assert!(!state.is_empty());
    }

    #[test]
    fn test_minimal_cookie_defaults() {
        let raw = r#"{"cookies": [{"name": "a", "value": "b", "domain": "x.com"}]}"#;
        let state: StorageState = serde_json::from_str(raw).unwrap();
        assert_eq!(state.cookies[0].path, "/");
        assert_eq!(state.cookies[0].expires, -1.0);
        assert!(state.origins.is_empty());
    }

    #[test]
    fn test_empty_state() {
        assert!(StorageState::default().is_empty());
    }
}
