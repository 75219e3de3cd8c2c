//! Google Calendar backend.
//!
//! - [`GoogleAuthenticator`]: OAuth 2.0 installed-app flow with PKCE, a
//!   loopback redirect, and a token cache at
//!   `~/.credentials/calexport/tokens-user.json`
//! - [`GoogleCalendarClient`]: the v3 events list endpoint as an
//!   [`EventSource`](crate::EventSource)
//!
//! ```ignore
//! let credentials = OAuthCredentials::from_file("credentials.json")?;
//! let config = GoogleConfig::new(credentials);
//! let auth = Arc::new(GoogleAuthenticator::new(config.clone())?);
//! let client = GoogleCalendarClient::from_config(&config, auth)?;
//! ```

mod authenticator;
mod client;
mod config;
mod loopback;
mod oauth;
mod tokens;

pub use authenticator::GoogleAuthenticator;
pub use client::GoogleCalendarClient;
pub use config::{GoogleConfig, OAuthCredentials};
pub use loopback::{AuthorizationResponse, LoopbackListener};
pub use oauth::{OAuthClient, PkceFlow, TokenGrant};
pub use tokens::{TokenInfo, TokenStorage};
