//! High-level client: login orchestration and auth endpoint wrappers.
//!
//! `Client` composes the request dispatcher, the in-memory session state,
//! and the encrypted credential store. Its `login` decides whether a
//! network round-trip is needed at all: a session cached for the email is
//! reused without touching the network; a cache miss performs the real
//! login and persists the result; a record that no longer decrypts is
//! purged and the failure surfaced to the caller.

use anyhow::Result;
use chrono::Utc;
use reqwest::Method;
use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

use crate::api::ApiClient;
use crate::auth::{CredentialError, CredentialStore, LocalUser, SessionState};
use crate::config::{self, Config};
use crate::models::{LoginUpdateResponse, LoginUserResponse, TokenResponse};
use crate::utils::signed_info;

/// Outcome of consulting the credential store before a network login.
#[derive(Debug)]
enum CachedLogin {
    /// A stored session for the email decrypted cleanly.
    Hit(LocalUser),
    /// Nothing stored for the email.
    Miss,
    /// A record exists but cannot be decrypted with the current key.
    /// The stale record has already been destroyed.
    Stale(CredentialError),
}

/// Client for the Yay! API holding one active session.
pub struct Client {
    api: ApiClient,
    state: SessionState,
    store: CredentialStore,
    device_uuid: String,
}

impl Client {
    /// Create a client from the saved configuration (or defaults).
    pub fn new() -> Result<Self> {
        Self::with_config(Config::load()?)
    }

    /// Create a client from an explicit configuration.
    pub fn with_config(config: Config) -> Result<Self> {
        let device_uuid = config
            .device_uuid
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let store = CredentialStore::open(config.storage_dir()?)?;
        let api = ApiClient::new(&config.api_host)?;

        Ok(Self {
            api,
            state: SessionState::new(),
            store,
            device_uuid,
        })
    }

    pub fn device_uuid(&self) -> &str {
        &self.device_uuid
    }

    pub fn user_id(&self) -> Option<i64> {
        self.state.user_id()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.state.access_token()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.is_authenticated()
    }

    /// Log in with an email address.
    ///
    /// Sets the store's encryption key from `password` on first use, then
    /// prefers a locally cached session over a network login. A cached
    /// record that fails to decrypt is purged and the error propagated -
    /// that usually means the password changed, and a deliberate fresh
    /// login is required rather than a silent fallback.
    pub async fn login(
        &mut self,
        email: &str,
        password: &str,
        two_fa_code: Option<&str>,
    ) -> Result<LoginUserResponse> {
        if !self.store.has_encryption_key() {
            self.store.set_encryption_key(password)?;
        }

        match self.check_cached(email)? {
            CachedLogin::Hit(user) => {
                info!(user_id = user.user_id, "user found in local storage");
                let response = LoginUserResponse {
                    user_id: user.user_id,
                    access_token: user.access_token.clone(),
                    refresh_token: user.refresh_token.clone(),
                };
                self.adopt_session(user);
                Ok(response)
            }
            CachedLogin::Stale(err) => {
                error!(
                    "failed to decrypt locally stored credentials; this may follow a \
                     password change - log in again to store fresh ones"
                );
                Err(err.into())
            }
            CachedLogin::Miss => self.network_login(email, password, two_fa_code).await,
        }
    }

    /// Look up and decrypt a stored session for `email`.
    fn check_cached(&mut self, email: &str) -> Result<CachedLogin, CredentialError> {
        let Some(record) = self.store.get_user_by_email(email)? else {
            return Ok(CachedLogin::Miss);
        };
        match self.store.decrypt(&record) {
            Ok(user) => Ok(CachedLogin::Hit(user)),
            Err(CredentialError::InvalidCredentials) => {
                self.store.destroy(record.user_id)?;
                Ok(CachedLogin::Stale(CredentialError::InvalidCredentials))
            }
            Err(e) => Err(e),
        }
    }

    async fn network_login(
        &mut self,
        email: &str,
        password: &str,
        two_fa_code: Option<&str>,
    ) -> Result<LoginUserResponse> {
        let payload = LoginPayload {
            api_key: config::API_KEY,
            email,
            password,
            uuid: &self.device_uuid,
            two_fa_code,
        };

        let response: LoginUserResponse =
            self.api.post("/v3/users/login_with_email", &payload).await?;

        let user = LocalUser {
            user_id: response.user_id,
            email: email.to_string(),
            device_uuid: self.device_uuid.clone(),
            access_token: response.access_token.clone(),
            refresh_token: response.refresh_token.clone(),
        };
        self.store.set_user(&user)?;
        self.store.save()?;
        self.adopt_session(user);

        info!(user_id = response.user_id, "authentication successful");
        Ok(response)
    }

    /// Attach `user` as the active session and its token to the dispatcher.
    fn adopt_session(&mut self, user: LocalUser) {
        self.api.set_token(user.access_token.clone());
        self.state.set_user(user);
    }

    /// Exchange a grant for fresh tokens via `POST /api/v1/oauth/token`.
    ///
    /// When a session is active, the refreshed tokens replace the stored
    /// record so the next process start picks them up.
    pub async fn get_token(
        &mut self,
        grant_type: &str,
        refresh_token: Option<&str>,
        email: Option<&str>,
        password: Option<&str>,
    ) -> Result<TokenResponse> {
        let payload = TokenPayload {
            grant_type,
            refresh_token,
            email,
            password,
        };
        let response: TokenResponse = self.api.post("/api/v1/oauth/token", &payload).await?;

        if let Some(user) = self.state.user() {
            let mut updated = user.clone();
            updated.access_token = response.access_token.clone();
            updated.refresh_token = response.refresh_token.clone();
            self.store.set_user(&updated)?;
            self.store.save()?;
            self.adopt_session(updated);
        }

        Ok(response)
    }

    /// Log out the active session and purge its stored record.
    pub async fn logout(&mut self) -> Result<()> {
        let payload = LogoutPayload {
            uuid: &self.device_uuid,
        };
        let _: serde_json::Value = self.api.post("/v1/users/logout", &payload).await?;

        if let Some(user_id) = self.state.user_id() {
            self.store.destroy(user_id)?;
        }
        self.state.clear();
        self.api.clear_token();
        info!("logged out");
        Ok(())
    }

    /// Change the account email via `PUT /v1/users/change_email`.
    pub async fn change_email(
        &self,
        email: &str,
        password: &str,
        email_grant_token: Option<&str>,
    ) -> Result<LoginUpdateResponse> {
        let payload = ChangeEmailPayload {
            api_key: config::API_KEY,
            email,
            password,
            email_grant_token,
        };
        self.api
            .request(Method::PUT, "/v1/users/change_email", Some(&payload))
            .await
    }

    /// Change the account password via `PUT /v1/users/change_password`.
    pub async fn change_password(
        &self,
        current_password: &str,
        new_password: &str,
    ) -> Result<LoginUpdateResponse> {
        let payload = ChangePasswordPayload {
            api_key: config::API_KEY,
            current_password,
            password: new_password,
        };
        self.api
            .request(Method::PUT, "/v1/users/change_password", Some(&payload))
            .await
    }

    /// Attach an email/password to the account via `POST /v3/users/login_update`.
    pub async fn save_account_with_email(
        &self,
        email: &str,
        password: Option<&str>,
        current_password: Option<&str>,
        email_grant_token: Option<&str>,
    ) -> Result<LoginUpdateResponse> {
        let payload = LoginUpdatePayload {
            api_key: config::API_KEY,
            email,
            password,
            current_password,
            email_grant_token,
        };
        self.api.post("/v3/users/login_update", &payload).await
    }

    /// Resend the account confirmation email.
    pub async fn resend_confirm_email(&self) -> Result<()> {
        let _: serde_json::Value = self
            .api
            .post("/v2/users/resend_confirm_email", &serde_json::json!({}))
            .await?;
        Ok(())
    }

    /// Restore a deleted account via `POST /v2/users/restore`.
    pub async fn restore_user(&self, user_id: i64) -> Result<LoginUserResponse> {
        let timestamp = Utc::now().timestamp();
        let payload = RestorePayload {
            user_id,
            api_key: config::API_KEY,
            uuid: &self.device_uuid,
            timestamp,
            signed_info: signed_info(&self.device_uuid, timestamp, false),
        };
        self.api.post("/v2/users/restore", &payload).await
    }
}

// Request payloads. Optional fields are skipped when absent so one
// builder covers both payload shapes (e.g. login with/without a 2FA code).

#[derive(Serialize)]
struct LoginPayload<'a> {
    api_key: &'a str,
    email: &'a str,
    password: &'a str,
    uuid: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    two_fa_code: Option<&'a str>,
}

#[derive(Serialize)]
struct TokenPayload<'a> {
    grant_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_token: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<&'a str>,
}

#[derive(Serialize)]
struct LogoutPayload<'a> {
    uuid: &'a str,
}

#[derive(Serialize)]
struct ChangeEmailPayload<'a> {
    api_key: &'a str,
    email: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    email_grant_token: Option<&'a str>,
}

#[derive(Serialize)]
struct ChangePasswordPayload<'a> {
    api_key: &'a str,
    current_password: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct LoginUpdatePayload<'a> {
    api_key: &'a str,
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    current_password: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email_grant_token: Option<&'a str>,
}

#[derive(Serialize)]
struct RestorePayload<'a> {
    user_id: i64,
    api_key: &'a str,
    uuid: &'a str,
    timestamp: i64,
    signed_info: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(server: &MockServer, dir: &TempDir) -> Client {
        Client::with_config(Config {
            api_host: server.uri(),
            storage_dir: Some(dir.path().to_path_buf()),
            device_uuid: Some("dev-1".to_string()),
        })
        .unwrap()
    }

    fn login_response_body() -> serde_json::Value {
        json!({"user_id": 1, "access_token": "T1", "refresh_token": "R1"})
    }

    #[tokio::test]
    async fn test_first_login_hits_network_and_persists() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();

        Mock::given(method("POST"))
            .and(path("/v3/users/login_with_email"))
            .and(body_partial_json(json!({
                "email": "a@x.com",
                "password": "pw1",
                "uuid": "dev-1"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(login_response_body()))
            .expect(1)
            .mount(&server)
            .await;

        let mut client = test_client(&server, &dir);
        let response = client.login("a@x.com", "pw1", None).await.unwrap();

        assert_eq!(response.user_id, 1);
        assert_eq!(response.access_token, "T1");
        assert!(client.is_authenticated());
        assert_eq!(client.access_token(), Some("T1"));
        // Exactly one record persisted for user 1
        assert!(dir.path().join("1.user").exists());
    }

    #[tokio::test]
    async fn test_cached_login_makes_no_network_call() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();

        Mock::given(method("POST"))
            .and(path("/v3/users/login_with_email"))
            .respond_with(ResponseTemplate::new(200).set_body_json(login_response_body()))
            .expect(1)
            .mount(&server)
            .await;

        // First login seeds the store over the network
        {
            let mut client = test_client(&server, &dir);
            client.login("a@x.com", "pw1", None).await.unwrap();
        }

        // Second client (new process): same store, same password. The
        // expect(1) above fails the test if this crosses the network.
        let mut client = test_client(&server, &dir);
        let response = client.login("a@x.com", "pw1", None).await.unwrap();

        assert_eq!(response.user_id, 1);
        assert_eq!(response.access_token, "T1");
        assert_eq!(response.refresh_token, "R1");
        assert!(client.is_authenticated());
    }

    #[tokio::test]
    async fn test_changed_password_purges_stale_record_and_errors() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();

        Mock::given(method("POST"))
            .and(path("/v3/users/login_with_email"))
            .respond_with(ResponseTemplate::new(200).set_body_json(login_response_body()))
            .expect(1)
            .mount(&server)
            .await;

        {
            let mut client = test_client(&server, &dir);
            client.login("a@x.com", "pw1", None).await.unwrap();
        }

        // Simulated password change: new process derives its key from "pw2"
        let mut client = test_client(&server, &dir);
        let err = client.login("a@x.com", "pw2", None).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<CredentialError>(),
            Some(CredentialError::InvalidCredentials)
        ));
        assert!(!client.is_authenticated());
        // The stale record is gone; no silent fallback to a network login
        assert!(!dir.path().join("1.user").exists());
    }

    #[tokio::test]
    async fn test_login_sends_two_fa_code_when_supplied() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();

        Mock::given(method("POST"))
            .and(path("/v3/users/login_with_email"))
            .and(body_partial_json(json!({"two_fa_code": "123456"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(login_response_body()))
            .expect(1)
            .mount(&server)
            .await;

        let mut client = test_client(&server, &dir);
        client.login("a@x.com", "pw1", Some("123456")).await.unwrap();
    }

    #[tokio::test]
    async fn test_two_fa_code_absent_from_payload_when_none() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();

        // Reject any payload that carries the key at all
        Mock::given(method("POST"))
            .and(path("/v3/users/login_with_email"))
            .and(body_partial_json(json!({"two_fa_code": null})))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v3/users/login_with_email"))
            .respond_with(ResponseTemplate::new(200).set_body_json(login_response_body()))
            .mount(&server)
            .await;

        let mut client = test_client(&server, &dir);
        client.login("a@x.com", "pw1", None).await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_network_login_leaves_store_untouched() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();

        Mock::given(method("POST"))
            .and(path("/v3/users/login_with_email"))
            .respond_with(
                ResponseTemplate::new(400).set_body_string("invalid email or password"),
            )
            .mount(&server)
            .await;

        let mut client = test_client(&server, &dir);
        let err = client.login("a@x.com", "wrong", None).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<crate::api::ApiError>(),
            Some(crate::api::ApiError::BadRequest(_))
        ));
        assert!(!client.is_authenticated());
        assert!(!dir.path().join("1.user").exists());
    }

    #[tokio::test]
    async fn test_token_refresh_updates_persisted_record() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();

        Mock::given(method("POST"))
            .and(path("/v3/users/login_with_email"))
            .respond_with(ResponseTemplate::new(200).set_body_json(login_response_body()))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/oauth/token"))
            .and(body_partial_json(json!({
                "grant_type": "refresh_token",
                "refresh_token": "R1"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "T2",
                "refresh_token": "R2",
                "expires_in": 86400
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut client = test_client(&server, &dir);
        client.login("a@x.com", "pw1", None).await.unwrap();
        let token = client
            .get_token("refresh_token", Some("R1"), None, None)
            .await
            .unwrap();

        assert_eq!(token.access_token, "T2");
        assert_eq!(client.access_token(), Some("T2"));

        // A fresh client must see the refreshed tokens from the store
        drop(client);
        let mut client = test_client(&server, &dir);
        let response = client.login("a@x.com", "pw1", None).await.unwrap();
        assert_eq!(response.access_token, "T2");
        assert_eq!(response.refresh_token, "R2");
    }

    #[tokio::test]
    async fn test_logout_clears_session_and_store() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();

        Mock::given(method("POST"))
            .and(path("/v3/users/login_with_email"))
            .respond_with(ResponseTemplate::new(200).set_body_json(login_response_body()))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/users/logout"))
            .and(body_partial_json(json!({"uuid": "dev-1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": "success"})))
            .expect(1)
            .mount(&server)
            .await;

        let mut client = test_client(&server, &dir);
        client.login("a@x.com", "pw1", None).await.unwrap();
        client.logout().await.unwrap();

        assert!(!client.is_authenticated());
        assert!(!dir.path().join("1.user").exists());
    }

    #[tokio::test]
    async fn test_restore_user_sends_signed_info() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();

        Mock::given(method("POST"))
            .and(path("/v2/users/restore"))
            .and(body_partial_json(json!({"user_id": 7, "uuid": "dev-1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "user_id": 7,
                "access_token": "T7",
                "refresh_token": "R7"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server, &dir);
        let response = client.restore_user(7).await.unwrap();
        assert_eq!(response.user_id, 7);
    }
}
