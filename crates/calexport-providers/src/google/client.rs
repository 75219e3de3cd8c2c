//! Google Calendar v3 events client.
//!
//! Implements [`EventSource`] on top of `GET /calendars/{id}/events`. Every
//! request asks for expanded single instances, hides deleted events, and
//! orders by start time.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDate, SecondsFormat};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{BoxFuture, EventPage, EventSource, PageRequest, TokenSource};
use crate::raw_event::{RawAttendee, RawEvent, RawEventTime};

use super::config::GoogleConfig;

const PROVIDER_NAME: &str = "google";

/// HTTP client for the events list endpoint.
pub struct GoogleCalendarClient {
    http: reqwest::Client,
    tokens: Arc<dyn TokenSource>,
    base_url: String,
}

impl GoogleCalendarClient {
    pub fn new(
        tokens: Arc<dyn TokenSource>,
        base_url: impl Into<String>,
        timeout: Duration,
        user_agent: &str,
    ) -> ProviderResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| ProviderError::internal("failed to build HTTP client").with_source(e))?;

        Ok(Self {
            http,
            tokens,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Builds a client from the API settings of a [`GoogleConfig`].
    pub fn from_config(config: &GoogleConfig, tokens: Arc<dyn TokenSource>) -> ProviderResult<Self> {
        Self::new(tokens, &config.api_base_url, config.timeout, &config.user_agent)
    }

    fn events_url(&self, calendar_id: &str) -> String {
        format!(
            "{}/calendars/{}/events",
            self.base_url,
            urlencoding::encode(calendar_id)
        )
    }

    async fn fetch_page(&self, request: PageRequest) -> ProviderResult<EventPage> {
        let token = self.tokens.access_token().await?;

        let mut query = vec![
            (
                "timeMin",
                request.time_min.to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
            ("singleEvents", "true".to_string()),
            ("showDeleted", "false".to_string()),
            ("orderBy", "startTime".to_string()),
            ("maxResults", request.max_results.to_string()),
        ];
        if let Some(page_token) = request.page_token {
            query.push(("pageToken", page_token));
        }

        let response = self
            .http
            .get(self.events_url(&request.calendar_id))
            .bearer_auth(token)
            .query(&query)
            .send()
            .await
            .map_err(|e| {
                let message = if e.is_timeout() {
                    "request timed out"
                } else if e.is_connect() {
                    "could not connect to the Calendar API"
                } else {
                    "request to the Calendar API failed"
                };
                ProviderError::network(message).with_source(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &request.calendar_id, retry_after, &body)
                .with_status(status.as_u16())
                .with_provider(PROVIDER_NAME));
        }

        let body = response.text().await.map_err(|e| {
            ProviderError::network("failed to read events response").with_source(e)
        })?;
        let list: EventList = serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response("events response is not the expected JSON")
                .with_source(e)
                .with_provider(PROVIDER_NAME)
        })?;

        debug!(
            "calendar {} returned {} items, next page: {}",
            request.calendar_id,
            list.items.len(),
            list.next_page_token.is_some()
        );

        Ok(EventPage::new(
            list.items.into_iter().map(ApiEvent::into_raw).collect(),
            list.next_page_token,
        ))
    }
}

impl EventSource for GoogleCalendarClient {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn list_page(&self, request: PageRequest) -> BoxFuture<'_, ProviderResult<EventPage>> {
        Box::pin(self.fetch_page(request))
    }
}

fn status_error(
    status: StatusCode,
    calendar_id: &str,
    retry_after: Option<String>,
    body: &str,
) -> ProviderError {
    match status {
        StatusCode::NOT_FOUND => {
            ProviderError::not_found(format!("calendar '{calendar_id}' not found"))
        }
        StatusCode::UNAUTHORIZED => {
            ProviderError::authentication("access token was rejected")
        }
        StatusCode::FORBIDDEN => {
            ProviderError::authorization(format!("access to calendar '{calendar_id}' denied"))
        }
        StatusCode::TOO_MANY_REQUESTS => ProviderError::rate_limited(match retry_after {
            Some(secs) => format!("rate limit exceeded, retry after {secs} seconds"),
            None => "rate limit exceeded".to_string(),
        }),
        StatusCode::BAD_REQUEST => ProviderError::bad_request(format!("request rejected: {body}")),
        _ => ProviderError::server(format!("Calendar API error ({status}): {body}")),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventList {
    #[serde(default)]
    items: Vec<ApiEvent>,
    next_page_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEvent {
    id: Option<String>,
    summary: Option<String>,
    description: Option<String>,
    location: Option<String>,
    start: Option<ApiEventTime>,
    end: Option<ApiEventTime>,
    status: Option<String>,
    organizer: Option<ApiPerson>,
    creator: Option<ApiPerson>,
    attendees: Option<Vec<ApiAttendee>>,
    html_link: Option<String>,
    created: Option<String>,
    updated: Option<String>,
    recurring_event_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEventTime {
    date: Option<String>,
    date_time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiPerson {
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiAttendee {
    email: Option<String>,
}

fn parse_timestamp(value: &str, what: &str, id: Option<&str>) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value)
        .map_err(|e| warn!("event {}: unparseable {what} '{value}': {e}", id.unwrap_or("?")))
        .ok()
}

impl ApiEventTime {
    /// A `date` wins over a `dateTime` when both are present.
    fn into_raw(self, what: &str, id: Option<&str>) -> Option<RawEventTime> {
        if let Some(date) = self.date {
            return NaiveDate::parse_from_str(&date, "%Y-%m-%d")
                .map_err(|e| {
                    warn!("event {}: unparseable {what} date '{date}': {e}", id.unwrap_or("?"))
                })
                .ok()
                .map(RawEventTime::Date);
        }
        let dt = self.date_time?;
        parse_timestamp(&dt, what, id).map(RawEventTime::DateTime)
    }
}

impl ApiEvent {
    fn into_raw(self) -> RawEvent {
        let id = self.id.as_deref();
        let start = self.start.and_then(|t| t.into_raw("start", id));
        let end = self.end.and_then(|t| t.into_raw("end", id));
        let created = self
            .created
            .as_deref()
            .and_then(|v| parse_timestamp(v, "created", id));
        let updated = self
            .updated
            .as_deref()
            .and_then(|v| parse_timestamp(v, "updated", id));

        RawEvent {
            id: self.id,
            summary: self.summary,
            description: self.description,
            location: self.location,
            start,
            end,
            status: self.status,
            organizer_email: self.organizer.and_then(|p| p.email),
            creator_email: self.creator.and_then(|p| p.email),
            attendees: self.attendees.map(|list| {
                list.into_iter()
                    .map(|a| RawAttendee { email: a.email })
                    .collect()
            }),
            html_link: self.html_link,
            created,
            updated,
            recurring_event_id: self.recurring_event_id,
        }
    }
}
