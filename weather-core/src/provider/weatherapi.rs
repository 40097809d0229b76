use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::{Config, FetchError, WeatherQuery, WeatherReading};

use super::WeatherProvider;

const MISSING_KEY: &str = "No API key configured for WeatherAPI.com.";

/// Client for WeatherAPI.com's `current.json` endpoint.
///
/// A provider without a key can be built; every fetch then fails with
/// [`FetchError::Config`] so the error lands in the view state like any other.
#[derive(Debug, Clone)]
pub struct WeatherApiProvider {
    api_key: Option<String>,
    base_url: String,
    http: Client,
}

impl WeatherApiProvider {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(FetchError::Config("WeatherAPI.com API key is empty.".into()));
        }
        Self::build(Some(api_key), base_url.into(), timeout)
    }

    /// Missing key is not an error here; it surfaces on the first fetch.
    pub fn from_config(config: &Config) -> Result<Self, FetchError> {
        let api_key = config.api_key().ok().map(str::to_string);
        Self::build(api_key, config.base_url.clone(), config.timeout())
    }

    fn build(
        api_key: Option<String>,
        base_url: String,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    #[instrument(skip(self, query), fields(city = %query.city))]
    async fn fetch_current(&self, query: &WeatherQuery) -> Result<WeatherReading, FetchError> {
        let api_key =
            self.api_key.as_deref().ok_or_else(|| FetchError::Config(MISSING_KEY.into()))?;
        let url = format!("{}/current.json", self.base_url);

        debug!("Requesting current weather");
        let res = self
            .http
            .get(&url)
            .query(&[
                ("key", api_key),
                ("q", query.city.as_str()),
                ("aqi", "no"),
            ])
            .send()
            .await
            .map_err(|e| {
                FetchError::Network(format!("Failed to send request to WeatherAPI.com: {e}"))
            })?;

        let status = res.status();
        let body = res.text().await.map_err(|e| {
            FetchError::Network(format!("Failed to read WeatherAPI current response body: {e}"))
        })?;

        if !status.is_success() {
            debug!(%status, "WeatherAPI returned an error status");
            return Err(status_error(status, &body));
        }

        parse_current(&body)
    }
}

#[async_trait]
impl WeatherProvider for WeatherApiProvider {
    async fn fetch(&self, query: &WeatherQuery) -> Result<WeatherReading, FetchError> {
        self.fetch_current(query).await
    }
}

#[derive(Debug, Deserialize)]
struct WaLocation {
    name: String,
}

#[derive(Debug, Deserialize)]
struct WaCurrent {
    temp_c: f64,
    temp_f: f64,
    feelslike_c: f64,
    humidity: u8,
    last_updated_epoch: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct WaResponse {
    location: WaLocation,
    current: WaCurrent,
}

#[derive(Debug, Deserialize)]
struct WaErrorBody {
    code: Option<i64>,
    message: String,
}

#[derive(Debug, Deserialize)]
struct WaErrorEnvelope {
    error: WaErrorBody,
}

/// Map a successful `current.json` body to a reading.
pub(crate) fn parse_current(body: &str) -> Result<WeatherReading, FetchError> {
    let parsed: WaResponse = serde_json::from_str(body)
        .map_err(|e| FetchError::Api(format!("Failed to parse WeatherAPI current JSON: {e}")))?;

    if parsed.location.name.trim().is_empty() {
        return Err(FetchError::Api("WeatherAPI response has an empty location name".into()));
    }

    let observed_at = parsed.current.last_updated_epoch.and_then(unix_to_utc);

    Ok(WeatherReading {
        temperature_c: parsed.current.temp_c,
        temperature_f: parsed.current.temp_f,
        humidity_pct: parsed.current.humidity,
        feels_like_c: parsed.current.feelslike_c,
        location_name: parsed.location.name,
        observed_at,
    })
}

/// 401/403 mean the key was missing, invalid or disabled.
fn status_error(status: StatusCode, body: &str) -> FetchError {
    let detail = match serde_json::from_str::<WaErrorEnvelope>(body) {
        Ok(env) => match env.error.code {
            Some(code) => format!("{} (code {code})", env.error.message),
            None => env.error.message,
        },
        Err(_) => truncate_body(body),
    };

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            FetchError::Config(format!("WeatherAPI rejected the API key: {detail}"))
        }
        _ => FetchError::Api(format!("status {status}: {detail}")),
    }
}

fn unix_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(ts, 0)
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.chars().count() > MAX {
        format!("{}...", body.chars().take(MAX).collect::<String>())
    } else {
        body.to_string()
    }
}
