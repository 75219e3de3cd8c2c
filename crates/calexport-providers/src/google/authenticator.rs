//! Cached, self-refreshing Google credentials.
//!
//! [`GoogleAuthenticator`] is the [`TokenSource`] handed to the events
//! client. On each request it serves the cached access token, refreshes it
//! when expired, and falls back to the browser consent flow when there is
//! no usable grant.

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::ProviderResult;
use crate::provider::{BoxFuture, TokenSource};

use super::config::GoogleConfig;
use super::oauth::OAuthClient;
use super::tokens::{TokenInfo, TokenStorage};

/// What to do with the grant currently on hand.
#[derive(Debug, Clone, PartialEq, Eq)]
enum TokenAction {
    UseCached,
    Refresh(String),
    Consent,
}

fn plan(tokens: Option<&TokenInfo>, scopes: &[String]) -> TokenAction {
    match tokens {
        Some(t) if !t.has_scopes(scopes) => TokenAction::Consent,
        Some(t) if !t.is_expired() => TokenAction::UseCached,
        Some(TokenInfo {
            refresh_token: Some(refresh),
            ..
        }) => TokenAction::Refresh(refresh.clone()),
        _ => TokenAction::Consent,
    }
}

pub struct GoogleAuthenticator {
    config: GoogleConfig,
    storage: TokenStorage,
    oauth: OAuthClient,
    current: Mutex<Option<TokenInfo>>,
}

impl GoogleAuthenticator {
    pub fn new(config: GoogleConfig) -> ProviderResult<Self> {
        config.validate()?;
        let oauth = OAuthClient::new(config.credentials.clone(), config.timeout)?;
        Ok(Self {
            storage: TokenStorage::new(&config.token_path),
            config,
            oauth,
            current: Mutex::new(None),
        })
    }

    /// Replaces the OAuth client, e.g. to target a different token endpoint.
    pub fn with_oauth_client(mut self, oauth: OAuthClient) -> Self {
        self.oauth = oauth;
        self
    }

    pub fn storage(&self) -> &TokenStorage {
        &self.storage
    }

    /// Reads the cache; an unreadable cache is treated as empty so the user
    /// is sent through consent again.
    fn load_cached(&self) -> Option<TokenInfo> {
        self.storage.load().unwrap_or_else(|e| {
            warn!("ignoring token cache: {e}");
            None
        })
    }

    async fn valid_token(&self) -> ProviderResult<String> {
        let mut current = self.current.lock().await;
        if current.is_none() {
            *current = self.load_cached();
        }

        match plan(current.as_ref(), &self.config.scopes) {
            TokenAction::UseCached => {
                if let Some(tokens) = current.as_ref() {
                    return Ok(tokens.access_token.clone());
                }
            }
            TokenAction::Refresh(refresh_token) => {
                debug!("access token expired, refreshing");
                match self.oauth.refresh(&refresh_token).await {
                    Ok(grant) => {
                        if let Some(tokens) = current.as_mut() {
                            tokens.apply_refresh(
                                grant.access_token,
                                grant.expires_in,
                                grant.refresh_token,
                            );
                            self.storage.save(tokens)?;
                            return Ok(tokens.access_token.clone());
                        }
                    }
                    Err(e) => warn!("token refresh failed, asking for consent again: {e}"),
                }
            }
            TokenAction::Consent => {
                info!("no usable Google grant cached, starting consent flow");
            }
        }

        let fresh = self
            .oauth
            .authorize(&self.config.scopes, self.config.loopback_port_range)
            .await?;
        self.storage.save(&fresh)?;
        info!("Google authorization saved to {}", self.storage.path().display());

        let token = fresh.access_token.clone();
        *current = Some(fresh);
        Ok(token)
    }
}

impl TokenSource for GoogleAuthenticator {
    fn access_token(&self) -> BoxFuture<'_, ProviderResult<String>> {
        Box::pin(self.valid_token())
    }
}
