// Allow dead code: API response structs have fields for completeness
#![allow(dead_code)]

use serde::{Deserialize, Serialize};

/// Response from `POST /v3/users/login_with_email` and
/// `POST /v2/users/restore`. Also synthesized locally when a login is
/// served from the credential store without a network call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginUserResponse {
    pub user_id: i64,
    pub access_token: String,
    pub refresh_token: String,
}

/// Response from `POST /api/v1/oauth/token`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// Response from account update endpoints (change email/password,
/// login update). The service echoes back whichever fields changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginUpdateResponse {
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_response_parses_extra_fields() {
        // The service returns more fields than we model; they are ignored
        let json = r#"{
            "result": "success",
            "user_id": 123,
            "access_token": "T1",
            "refresh_token": "R1",
            "expires_in": 86400
        }"#;
        let resp: LoginUserResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.user_id, 123);
        assert_eq!(resp.access_token, "T1");
        assert_eq!(resp.refresh_token, "R1");
    }

    #[test]
    fn test_login_update_response_tolerates_sparse_body() {
        let resp: LoginUpdateResponse = serde_json::from_str(r#"{"email": "a@x.com"}"#).unwrap();
        assert_eq!(resp.email.as_deref(), Some("a@x.com"));
        assert!(resp.access_token.is_none());
    }
}
