use std::time::{Duration as StdDuration, Instant};

use chrono::{Duration, Utc};
use dashmap::DashMap;
use log::{info, warn};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tutor_core::Config;
use url::Url;

use crate::{
    util::random_string, DatabaseError, NewAccount, NewSession, NewUser, PrimaryKey,
    SessionData, SharedDatabase, UpdatedUser, UserData,
};

/// How long an authorization request may take before its state is forgotten
const STATE_LIFETIME: StdDuration = StdDuration::from_secs(10 * 60);

pub struct Auth {
    db: SharedDatabase,
    client: Client,
    provider: OAuthProvider,
    session_days: i64,
    /// States handed out with authorization URLs that have not been used yet
    pending: DashMap<String, Instant>,
}

#[derive(Debug, Error)]
pub enum AuthError {
    /// The session does not exist or has expired
    #[error("Invalid or expired session")]
    InvalidSession,
    /// The OAuth state is unknown, already used, or too old
    #[error("Invalid OAuth state")]
    InvalidState,
    /// The provider refused or failed the exchange
    #[error("OAuth provider error: {0}")]
    Provider(String),
    /// Something else went wrong with the database
    #[error(transparent)]
    Db(DatabaseError),
}

/// Endpoints and credentials of an OAuth provider
#[derive(Debug, Clone)]
pub struct OAuthProvider {
    pub name: String,
    pub authorize_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
}

impl OAuthProvider {
    pub fn google(config: &Config) -> Self {
        Self {
            name: "google".to_string(),
            authorize_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            userinfo_url: "https://openidconnect.googleapis.com/v1/userinfo".to_string(),
            client_id: config.google_client_id.clone(),
            client_secret: config.google_client_secret.clone(),
            redirect_url: config.oauth_redirect_url.clone(),
        }
    }
}

/// The identity reported by the provider
#[derive(Debug, Clone)]
pub struct OAuthProfile {
    pub email: String,
    pub name: String,
    pub image: Option<String>,
}

/// The provider account the identity belongs to, with its tokens
#[derive(Debug, Clone)]
pub struct OAuthAccount {
    pub provider: String,
    pub provider_account_id: String,
    pub access_token: Option<String>,
    pub expires_at: Option<i64>,
    pub token_type: Option<String>,
    pub scope: Option<String>,
    pub id_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
    token_type: Option<String>,
    scope: Option<String>,
    id_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    sub: String,
    email: String,
    name: Option<String>,
    picture: Option<String>,
}

impl Auth {
    pub fn new(
        db: &SharedDatabase,
        client: &Client,
        provider: OAuthProvider,
        session_days: i64,
    ) -> Self {
        Self {
            db: db.clone(),
            client: client.clone(),
            provider,
            session_days,
            pending: DashMap::new(),
        }
    }

    /// Returns the consent URL the user should be redirected to
    pub fn authorize_url(&self) -> String {
        self.pending
            .retain(|_, created_at| created_at.elapsed() < STATE_LIFETIME);

        let state = random_string(32);
        self.pending.insert(state.clone(), Instant::now());

        let params = [
            ("client_id", self.provider.client_id.as_str()),
            ("redirect_uri", self.provider.redirect_url.as_str()),
            ("response_type", "code"),
            ("scope", "openid email profile"),
            ("access_type", "offline"),
            ("prompt", "consent"),
            ("state", state.as_str()),
        ];

        match Url::parse_with_params(&self.provider.authorize_url, &params) {
            Ok(url) => url.to_string(),
            Err(e) => {
                warn!("Invalid authorize URL {}: {}", self.provider.authorize_url, e);
                self.provider.authorize_url.clone()
            }
        }
    }

    /// Finishes an authorization started with [Auth::authorize_url]
    pub async fn complete_oauth(&self, code: &str, state: &str) -> Result<SessionData, AuthError> {
        let (_, created_at) = self.pending.remove(state).ok_or(AuthError::InvalidState)?;

        if created_at.elapsed() >= STATE_LIFETIME {
            return Err(AuthError::InvalidState);
        }

        let token: TokenResponse = self
            .client
            .post(&self.provider.token_url)
            .form(&[
                ("code", code),
                ("client_id", self.provider.client_id.as_str()),
                ("client_secret", self.provider.client_secret.as_str()),
                ("redirect_uri", self.provider.redirect_url.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AuthError::Provider(e.to_string()))?
            .json()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))?;

        let info: UserInfo = self
            .client
            .get(&self.provider.userinfo_url)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AuthError::Provider(e.to_string()))?
            .json()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))?;

        let profile = OAuthProfile {
            name: info.name.unwrap_or_else(|| info.email.clone()),
            email: info.email,
            image: info.picture,
        };

        let account = OAuthAccount {
            provider: self.provider.name.clone(),
            provider_account_id: info.sub,
            access_token: Some(token.access_token),
            expires_at: token.expires_in.map(|s| Utc::now().timestamp() + s),
            token_type: token.token_type,
            scope: token.scope,
            id_token: token.id_token,
        };

        self.sign_in(profile, account).await
    }

    /// Signs in a user, creating it and linking the account as needed, and returns a new session
    pub async fn sign_in(
        &self,
        profile: OAuthProfile,
        account: OAuthAccount,
    ) -> Result<SessionData, AuthError> {
        self.clear_expired().await;

        // A linked provider account wins over the email, which can change at the provider
        let user_id = match self
            .db
            .account_by_provider(&account.provider, &account.provider_account_id)
            .await
        {
            Ok(linked) => linked.user_id,
            Err(e) if e.is_not_found() => self.link_account(profile, account).await?,
            Err(e) => return Err(AuthError::Db(e)),
        };

        let new_session = NewSession {
            token: random_string(32),
            user_id,
            expires_at: Utc::now() + Duration::days(self.session_days),
        };

        self.db
            .create_session(new_session)
            .await
            .map_err(AuthError::Db)
    }

    /// Finds the user by email, creating it if needed, and links the account to it
    async fn link_account(
        &self,
        profile: OAuthProfile,
        account: OAuthAccount,
    ) -> Result<PrimaryKey, AuthError> {
        let user = match self.db.user_by_email(&profile.email).await {
            Ok(user) => user,
            Err(e) if e.is_not_found() => {
                info!("Creating user for {}", profile.email);

                self.db
                    .create_user(NewUser {
                        email: profile.email,
                        name: profile.name,
                        image: profile.image,
                    })
                    .await
                    .map_err(AuthError::Db)?
            }
            Err(e) => return Err(AuthError::Db(e)),
        };

        self.db
            .create_account(NewAccount {
                user_id: user.id,
                provider: account.provider,
                provider_account_id: account.provider_account_id,
                kind: "oauth".to_string(),
                access_token: account.access_token,
                expires_at: account.expires_at,
                token_type: account.token_type,
                scope: account.scope,
                id_token: account.id_token,
            })
            .await
            .map_err(AuthError::Db)?;

        Ok(user.id)
    }

    /// Deletes the associated session, if it exists
    pub async fn logout(&self, token: &str) -> Result<(), DatabaseError> {
        self.db.delete_session_by_token(token).await
    }

    /// Returns a session if it exists and has not expired
    pub async fn session(&self, token: &str) -> Result<SessionData, AuthError> {
        let session = self.db.session_by_token(token).await.map_err(|e| match e {
            DatabaseError::NotFound { .. } => AuthError::InvalidSession,
            err => AuthError::Db(err),
        })?;

        if session.expires_at <= Utc::now() {
            return Err(AuthError::InvalidSession);
        }

        Ok(session)
    }

    /// Updates a user
    pub async fn update_profile(
        &self,
        updated_user: UpdatedUser,
    ) -> Result<UserData, DatabaseError> {
        self.db.update_user(updated_user).await
    }

    /// Deletes a user completely
    pub async fn delete_user(&self, user_id: PrimaryKey) -> Result<(), DatabaseError> {
        self.db.delete_user(user_id).await
    }

    async fn clear_expired(&self) {
        if let Err(e) = self.db.clear_expired_sessions().await {
            warn!("Failed to clear expired sessions: {}", e);
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use crate::{Database, MemoryDatabase};

    use super::*;

    fn auth() -> (Auth, SharedDatabase) {
        let db: SharedDatabase = Arc::new(MemoryDatabase::new());
        let auth = Auth::new(
            &db,
            &Client::new(),
            OAuthProvider::google(&Config::default()),
            7,
        );

        (auth, db)
    }

    fn profile() -> (OAuthProfile, OAuthAccount) {
        (
            OAuthProfile {
                email: "ada@example.com".into(),
                name: "Ada".into(),
                image: None,
            },
            OAuthAccount {
                provider: "google".into(),
                provider_account_id: "1234".into(),
                access_token: Some("access".into()),
                expires_at: None,
                token_type: Some("Bearer".into()),
                scope: None,
                id_token: None,
            },
        )
    }

    #[tokio::test]
    async fn test_sign_in_reuses_user() {
        let (auth, db) = auth();

        let (profile, account) = self::profile();
        let first = auth.sign_in(profile.clone(), account.clone()).await.unwrap();
        let second = auth.sign_in(profile, account).await.unwrap();

        assert_eq!(first.user.id, second.user.id);
        assert_ne!(first.token, second.token);
        assert!(db.account_by_provider("google", "1234").await.is_ok());
    }

    #[tokio::test]
    async fn test_linked_account_wins_over_changed_email() {
        let (auth, db) = auth();

        let (profile, account) = self::profile();
        let first = auth.sign_in(profile.clone(), account.clone()).await.unwrap();

        let renamed = OAuthProfile {
            email: "ada.lovelace@example.com".into(),
            ..profile
        };
        let second = auth.sign_in(renamed, account).await.unwrap();

        assert_eq!(second.user.id, first.user.id);
        assert!(db.user_by_email("ada.lovelace@example.com").await.is_err());
    }

    #[tokio::test]
    async fn test_expired_session_is_rejected() {
        let (auth, db) = auth();

        let (profile, account) = self::profile();
        let session = auth.sign_in(profile, account).await.unwrap();

        db.create_session(NewSession {
            token: "expired".into(),
            user_id: session.user.id,
            expires_at: Utc::now() - Duration::days(1),
        })
        .await
        .unwrap();

        assert!(auth.session(&session.token).await.is_ok());
        assert!(matches!(
            auth.session("expired").await,
            Err(AuthError::InvalidSession)
        ));
        assert!(matches!(
            auth.session("missing").await,
            Err(AuthError::InvalidSession)
        ));
    }

    #[tokio::test]
    async fn test_unknown_state_is_rejected() {
        let (auth, _) = auth();

        let url = auth.authorize_url();
        assert!(url.contains("state="));

        assert!(matches!(
            auth.complete_oauth("code", "not-a-state").await,
            Err(AuthError::InvalidState)
        ));
    }
}
