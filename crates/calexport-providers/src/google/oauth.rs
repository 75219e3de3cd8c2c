//! OAuth 2.0 authorization code flow with PKCE (RFC 7636) for Google.
//!
//! [`OAuthClient::authorize`] runs the interactive consent flow through the
//! browser and a [`LoopbackListener`]; [`OAuthClient::refresh`] trades a
//! refresh token for a new access token without user interaction.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng as _;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::{ProviderError, ProviderResult};

use super::config::OAuthCredentials;
use super::loopback::LoopbackListener;
use super::tokens::TokenInfo;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Random bytes in the verifier; 32 bytes encode to 43 characters.
const VERIFIER_BYTES: usize = 32;
const STATE_BYTES: usize = 16;

/// How long the user has to finish the consent screen.
const CONSENT_TIMEOUT: Duration = Duration::from_secs(300);

/// PKCE verifier, its S256 challenge and the CSRF `state` for one flow.
#[derive(Debug, Clone)]
pub struct PkceFlow {
    pub verifier: String,
    pub challenge: String,
    pub state: String,
}

fn random_urlsafe(len: usize) -> String {
    let mut rng = rand::rng();
    let bytes: Vec<u8> = (0..len).map(|_| rng.random()).collect();
    URL_SAFE_NO_PAD.encode(bytes)
}

impl PkceFlow {
    pub fn new() -> Self {
        let verifier = random_urlsafe(VERIFIER_BYTES);
        Self {
            challenge: Self::challenge_for(&verifier),
            verifier,
            state: random_urlsafe(STATE_BYTES),
        }
    }

    /// `BASE64URL(SHA256(verifier))` without padding.
    pub fn challenge_for(verifier: &str) -> String {
        URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
    }

    /// Builds the consent URL.
    ///
    /// `access_type=offline` and `prompt=consent` make Google hand out a
    /// refresh token every time.
    pub fn authorization_url(
        &self,
        base: &str,
        client_id: &str,
        redirect_uri: &str,
        scopes: &[String],
    ) -> String {
        let scope = scopes.join(" ");
        let params: [(&str, &str); 9] = [
            ("client_id", client_id),
            ("redirect_uri", redirect_uri),
            ("response_type", "code"),
            ("scope", scope.as_str()),
            ("code_challenge", self.challenge.as_str()),
            ("code_challenge_method", "S256"),
            ("state", self.state.as_str()),
            ("access_type", "offline"),
            ("prompt", "consent"),
        ];
        let query = params
            .iter()
            .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        format!("{base}?{query}")
    }
}

impl Default for PkceFlow {
    fn default() -> Self {
        Self::new()
    }
}

/// Body of a successful token endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Space-separated scopes actually granted.
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenGrant {
    fn granted_scopes(&self, requested: &[String]) -> Vec<String> {
        match &self.scope {
            Some(scope) => scope.split_whitespace().map(str::to_string).collect(),
            None => requested.to_vec(),
        }
    }
}

/// Talks to Google's authorization and token endpoints.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    credentials: OAuthCredentials,
    http: reqwest::Client,
    auth_url: String,
    token_url: String,
}

impl OAuthClient {
    pub fn new(credentials: OAuthCredentials, timeout: Duration) -> ProviderResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::internal("failed to build HTTP client").with_source(e))?;

        Ok(Self {
            credentials,
            http,
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
        })
    }

    /// Points token requests at a different endpoint.
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    /// Runs the interactive consent flow and returns a fresh grant.
    pub async fn authorize(
        &self,
        scopes: &[String],
        port_range: (u16, u16),
    ) -> ProviderResult<TokenInfo> {
        let flow = PkceFlow::new();
        let listener = LoopbackListener::bind(port_range)?;
        let redirect_uri = listener.redirect_uri();
        let url = flow.authorization_url(
            &self.auth_url,
            &self.credentials.client_id,
            &redirect_uri,
            scopes,
        );

        info!("opening browser for Google consent");
        debug!("authorization URL: {url}");
        if let Err(e) = open::that(&url) {
            warn!("could not open a browser: {e}");
            eprintln!("Open this URL in your browser to authorize calexport:\n\n{url}\n");
        }

        let response = listener.wait(CONSENT_TIMEOUT).await?;
        if response.state.as_deref() != Some(flow.state.as_str()) {
            return Err(ProviderError::authentication(
                "OAuth state mismatch in callback",
            ));
        }

        info!("authorization code received");
        let grant = self
            .post_token_form(
                &[
                    ("client_id", self.credentials.client_id.as_str()),
                    ("client_secret", self.credentials.client_secret.as_str()),
                    ("code", response.code.as_str()),
                    ("code_verifier", flow.verifier.as_str()),
                    ("grant_type", "authorization_code"),
                    ("redirect_uri", redirect_uri.as_str()),
                ],
                "code exchange",
            )
            .await?;

        let scopes = grant.granted_scopes(scopes);
        Ok(TokenInfo::new(
            grant.access_token,
            grant.refresh_token,
            grant.expires_in,
            scopes,
        ))
    }

    /// Exchanges a refresh token for a new access token.
    pub async fn refresh(&self, refresh_token: &str) -> ProviderResult<TokenGrant> {
        let grant = self
            .post_token_form(
                &[
                    ("client_id", self.credentials.client_id.as_str()),
                    ("client_secret", self.credentials.client_secret.as_str()),
                    ("refresh_token", refresh_token),
                    ("grant_type", "refresh_token"),
                ],
                "token refresh",
            )
            .await?;
        info!("access token refreshed");
        Ok(grant)
    }

    async fn post_token_form(
        &self,
        params: &[(&str, &str)],
        what: &str,
    ) -> ProviderResult<TokenGrant> {
        let response = self
            .http
            .post(&self.token_url)
            .form(params)
            .send()
            .await
            .map_err(|e| ProviderError::network(format!("{what} request failed")).with_source(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            ProviderError::network(format!("failed to read {what} response")).with_source(e)
        })?;

        if !status.is_success() {
            return Err(ProviderError::authentication(format!(
                "{what} rejected ({status}): {body}"
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("unexpected {what} response")).with_source(e)
        })
    }
}
