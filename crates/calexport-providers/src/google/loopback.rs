//! Loopback redirect listener for the installed-app OAuth flow.
//!
//! Google redirects the browser to `http://127.0.0.1:{port}/callback` with
//! the authorization code in the query string. The listener accepts
//! connections on a helper thread and hands the first usable callback back
//! through a oneshot channel so the caller can await it with a timeout.
//! The helper polls a non-blocking socket and exits once the receiver is
//! gone.

use std::io::{self, BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::error::{ProviderError, ProviderResult};

const CALLBACK_PATH: &str = "/callback";
const ACCEPT_POLL: Duration = Duration::from_millis(50);

const SUCCESS_PAGE: &str = "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=utf-8\r\nConnection: close\r\n\r\n\
<html><body><h1>calexport is authorized</h1><p>You can close this tab and return to the terminal.</p></body></html>";

const FAILURE_PAGE: &str = "HTTP/1.1 400 Bad Request\r\nContent-Type: text/html; charset=utf-8\r\nConnection: close\r\n\r\n\
<html><body><h1>Authorization failed</h1><p>Return to the terminal for details.</p></body></html>";

/// What the authorization server sent back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationResponse {
    pub code: String,
    pub state: Option<String>,
}

/// A bound loopback listener waiting for the OAuth redirect.
#[derive(Debug)]
pub struct LoopbackListener {
    listener: TcpListener,
    port: u16,
}

impl LoopbackListener {
    /// Binds the first free port in the inclusive range.
    pub fn bind(port_range: (u16, u16)) -> ProviderResult<Self> {
        let (first, last) = port_range;
        for port in first..=last {
            match TcpListener::bind(("127.0.0.1", port)) {
                Ok(listener) => {
                    let port = listener.local_addr().map(|a| a.port()).unwrap_or(port);
                    debug!("loopback listener bound on port {port}");
                    return Ok(Self { listener, port });
                }
                Err(e) => debug!("port {port} unavailable: {e}"),
            }
        }
        Err(ProviderError::configuration(format!(
            "no free port for the OAuth redirect in {first}-{last}"
        )))
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn redirect_uri(&self) -> String {
        format!("http://127.0.0.1:{}{CALLBACK_PATH}", self.port)
    }

    /// Waits up to `timeout` for the browser to hit the callback.
    pub async fn wait(self, timeout: Duration) -> ProviderResult<AuthorizationResponse> {
        let (tx, rx) = oneshot::channel::<ProviderResult<AuthorizationResponse>>();
        let listener = self.listener;
        listener.set_nonblocking(true).map_err(|e| {
            ProviderError::internal("failed to configure loopback listener").with_source(e)
        })?;

        thread::spawn(move || {
            while !tx.is_closed() {
                match listener.accept() {
                    Ok((stream, _)) => {
                        if let Err(e) = stream.set_nonblocking(false) {
                            warn!("loopback connection unusable: {e}");
                            continue;
                        }
                        if let Some(outcome) = serve_one(stream) {
                            let _ = tx.send(outcome);
                            return;
                        }
                    }
                    Err(e) if e.kind() == io::ErrorKind::WouldBlock => thread::sleep(ACCEPT_POLL),
                    Err(e) => {
                        warn!("loopback accept failed: {e}");
                        thread::sleep(ACCEPT_POLL);
                    }
                }
            }
            debug!("loopback listener closed");
        });

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(ProviderError::internal("loopback listener stopped unexpectedly")),
            Err(_) => Err(ProviderError::authentication(format!(
                "no OAuth callback received within {} seconds",
                timeout.as_secs()
            ))),
        }
    }
}

/// Reads one request, answers the browser, and returns the outcome if the
/// request was the callback. Stray requests (favicon and the like) yield `None`.
fn serve_one(mut stream: TcpStream) -> Option<ProviderResult<AuthorizationResponse>> {
    let mut request_line = String::new();
    BufReader::new(&stream).read_line(&mut request_line).ok()?;

    let outcome = parse_callback(&request_line)?;
    let page = if outcome.is_ok() {
        SUCCESS_PAGE
    } else {
        FAILURE_PAGE
    };
    let _ = stream.write_all(page.as_bytes());
    let _ = stream.flush();
    Some(outcome)
}

/// Interprets an HTTP request line such as
/// `GET /callback?code=...&state=... HTTP/1.1`.
pub(crate) fn parse_callback(request_line: &str) -> Option<ProviderResult<AuthorizationResponse>> {
    let mut parts = request_line.split_whitespace();
    if parts.next()? != "GET" {
        return None;
    }
    let target = parts.next()?;
    let (path, query) = target.split_once('?').unwrap_or((target, ""));
    if path != CALLBACK_PATH {
        return None;
    }

    let mut code = None;
    let mut state = None;
    let mut error = None;
    for pair in query.split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        let value = urlencoding::decode(value)
            .map(|v| v.into_owned())
            .unwrap_or_else(|_| value.to_string());
        match key {
            "code" => code = Some(value),
            "state" => state = Some(value),
            "error" => error = Some(value),
            _ => {}
        }
    }

    if let Some(error) = error {
        return Some(Err(ProviderError::authorization(format!(
            "consent was not granted: {error}"
        ))));
    }

    Some(match code {
        Some(code) => Ok(AuthorizationResponse { code, state }),
        None => Err(ProviderError::authentication(
            "OAuth callback did not include an authorization code",
        )),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorCode;

    #[test]
    fn parses_code_and_state() {
        let outcome = parse_callback("GET /callback?state=abc&code=4%2F0Ab HTTP/1.1\r\n")
            .unwrap()
            .unwrap();
        assert_eq!(outcome.code, "4/0Ab");
        assert_eq!(outcome.state.as_deref(), Some("abc"));
    }

    #[test]
    fn error_param_means_denied() {
        let err = parse_callback("GET /callback?error=access_denied&state=abc HTTP/1.1")
            .unwrap()
            .unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::AuthorizationFailed);
        assert!(err.message().contains("access_denied"));
    }

    #[test]
    fn missing_code_is_an_error() {
        let err = parse_callback("GET /callback?state=abc HTTP/1.1")
            .unwrap()
            .unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::AuthenticationFailed);
    }

    #[test]
    fn stray_requests_are_ignored() {
        assert!(parse_callback("GET /favicon.ico HTTP/1.1").is_none());
        assert!(parse_callback("POST /callback?code=x HTTP/1.1").is_none());
        assert!(parse_callback("").is_none());
    }

    #[test]
    fn binds_within_range() {
        let listener = LoopbackListener::bind((0, 0)).unwrap();
        assert!(listener.redirect_uri().starts_with("http://127.0.0.1:"));
        assert!(listener.redirect_uri().ends_with("/callback"));
    }

    #[tokio::test]
    async fn receives_callback_over_tcp() {
        let listener = LoopbackListener::bind((0, 0)).unwrap();
        let port = listener.port();
        assert_ne!(port, 0);

        let client = thread::spawn(move || {
            let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
            stream
                .write_all(b"GET /callback?code=c0de&state=s HTTP/1.1\r\nHost: localhost\r\n\r\n")
                .unwrap();
            let mut reply = String::new();
            BufReader::new(&stream).read_line(&mut reply).unwrap();
            reply
        });

        let outcome = listener.wait(Duration::from_secs(5)).await.unwrap();
        assert_eq!(outcome.code, "c0de");
        assert!(client.join().unwrap().starts_with("HTTP/1.1 200"));
    }

    #[tokio::test]
    async fn times_out_without_callback() {
        let listener = LoopbackListener::bind((0, 0)).unwrap();
        let err = listener.wait(Duration::from_millis(50)).await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::AuthenticationFailed);
    }

    #[tokio::test]
    async fn port_is_released_after_timeout() {
        let listener = LoopbackListener::bind((0, 0)).unwrap();
        let port = listener.port();
        assert!(listener.wait(Duration::from_millis(20)).await.is_err());

        let mut rebound = None;
        for _ in 0..40 {
            tokio::time::sleep(Duration::from_millis(25)).await;
            if let Ok(l) = TcpListener::bind(("127.0.0.1", port)) {
                rebound = Some(l);
                break;
            }
        }
        assert!(rebound.is_some(), "port {port} still held by the helper thread");
    }
}
