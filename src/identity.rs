//! Identity parameters carried in the page URL.
//!
//! The same parameters become request headers for the health-tracking API and,
//! serialized as a JSON object, the credential blob handed to the token
//! endpoint and the running agent.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use serde::Serialize;
use url::Url;

/// Query parameters each field may come from, in lookup order.
const USER_ID: [&str; 2] = ["goqiiUserId", "goqiiuserid"];
const NONCE: [&str; 2] = ["nonce", "Nonce"];
const SIGNATURE: [&str; 2] = ["signature", "Signature"];
const API_KEY: [&str; 2] = ["apiKey", "apikey"];
const ACCESS_TOKEN: [&str; 2] = ["goqiiAccessToken", "goqiiaccesstoken"];
const PAGINATION: [&str; 2] = ["pagination", "Pagination"];
const APP_VERSION: [&str; 2] = ["appVersion", "AppVersion"];
const APP_TYPE: [&str; 2] = ["appType", "AppType"];
const COACH_ID: [&str; 2] = ["goqiiCoachId", "goqiicoachid"];

/// Identity and auth values read from the page URL. Missing values are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageParams {
    pub goqii_user_id: String,
    pub nonce: String,
    pub signature: String,
    pub api_key: String,
    pub goqii_access_token: String,
    pub pagination: String,
    pub app_version: String,
    pub app_type: String,
    pub goqii_coach_id: String,
}

impl PageParams {
    pub fn from_url(url: &Url) -> Self {
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        let lookup = |names: [&str; 2]| -> String {
            names
                .iter()
                .find_map(|name| {
                    pairs
                        .iter()
                        .find(|(k, v)| k == name && !v.is_empty())
                        .map(|(_, v)| v.clone())
                })
                .unwrap_or_default()
        };

        Self {
            goqii_user_id: lookup(USER_ID),
            nonce: lookup(NONCE),
            signature: lookup(SIGNATURE),
            api_key: lookup(API_KEY),
            goqii_access_token: lookup(ACCESS_TOKEN),
            pagination: lookup(PAGINATION),
            app_version: lookup(APP_VERSION),
            app_type: lookup(APP_TYPE),
            goqii_coach_id: lookup(COACH_ID),
        }
    }

    /// Whether any credential-bearing field is present.
    pub fn has_credential(&self) -> bool {
        !self.api_key.is_empty() || !self.goqii_access_token.is_empty()
    }

    /// JSON blob forwarded as the session credential, or `None` when no
    /// credential field is present.
    pub fn credential_blob(&self) -> Option<String> {
        if !self.has_credential() {
            return None;
        }
        serde_json::to_string(self).ok()
    }

    /// Headers attached to every health-tracking API request.
    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let fields = [
            ("h-goqiiuserid", &self.goqii_user_id),
            ("h-nonce", &self.nonce),
            ("h-signature", &self.signature),
            ("h-apikey", &self.api_key),
            ("h-goqiiaccesstoken", &self.goqii_access_token),
            ("h-appversion", &self.app_version),
            ("h-apptype", &self.app_type),
        ];
        for (name, value) in fields {
            match HeaderValue::from_str(value) {
                Ok(value) => {
                    headers.insert(HeaderName::from_static(name), value);
                }
                Err(_) => {
                    tracing::warn!("Dropping header {} with non-visible characters", name);
                    headers.insert(HeaderName::from_static(name), HeaderValue::from_static(""));
                }
            }
        }
        headers
    }
}
