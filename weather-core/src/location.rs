//! Device location → city name, with a default city for every failure path.
//!
//! The platform side (permission prompt, GPS fix) sits behind [`LocationSource`];
//! coordinates become a city via a [`Geocoder`].

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::{fmt::Debug, sync::Arc, time::Duration};
use tracing::{debug, info, warn};

use crate::{Config, error::LocationError};

const USER_AGENT: &str = concat!("weather-core/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Platform-provided location capability.
#[async_trait]
pub trait LocationSource: Send + Sync + Debug {
    /// `true` when the app may read the device location.
    async fn request_permission(&self) -> bool;

    async fn last_known_location(&self) -> Option<Coordinates>;
}

#[async_trait]
pub trait Geocoder: Send + Sync + Debug {
    async fn city_for(&self, at: Coordinates) -> Result<String, LocationError>;
}

/// Location source with a fixed answer, e.g. coordinates given on the command line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FixedLocation {
    Denied,
    Unavailable,
    At(Coordinates),
}

impl FixedLocation {
    /// `Denied` when no coordinates were supplied.
    pub fn from_option(at: Option<Coordinates>) -> Self {
        at.map_or(FixedLocation::Denied, FixedLocation::At)
    }
}

#[async_trait]
impl LocationSource for FixedLocation {
    async fn request_permission(&self) -> bool {
        !matches!(self, FixedLocation::Denied)
    }

    async fn last_known_location(&self) -> Option<Coordinates> {
        match self {
            FixedLocation::At(c) => Some(*c),
            _ => None,
        }
    }
}

/// Geocoder that never resolves; the resolver always lands on its default city.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGeocoder;

#[async_trait]
impl Geocoder for NoGeocoder {
    async fn city_for(&self, _at: Coordinates) -> Result<String, LocationError> {
        Err(LocationError::Geocoding("reverse geocoding is disabled".into()))
    }
}

/// Reverse geocoding through OpenStreetMap Nominatim. No API key required.
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    base_url: String,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct NominatimResponse {
    address: Option<NominatimAddress>,
}

#[derive(Debug, Deserialize)]
struct NominatimAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    municipality: Option<String>,
    county: Option<String>,
    state: Option<String>,
}

impl NominatimGeocoder {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, LocationError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| LocationError::Geocoding(format!("failed to build client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, LocationError> {
        Self::new(config.geocoder_url.clone(), config.timeout())
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn city_for(&self, at: Coordinates) -> Result<String, LocationError> {
        let url = format!("{}/reverse", self.base_url);

        let res = self
            .http
            .get(&url)
            .query(&[
                ("lat", at.latitude.to_string()),
                ("lon", at.longitude.to_string()),
                ("format", "json".to_string()),
                ("addressdetails", "1".to_string()),
                ("zoom", "10".to_string()),
            ])
            .send()
            .await
            .map_err(|e| LocationError::Geocoding(e.to_string()))?;

        if !res.status().is_success() {
            return Err(LocationError::Geocoding(format!("status {}", res.status())));
        }

        let body: NominatimResponse =
            res.json().await.map_err(|e| LocationError::Geocoding(e.to_string()))?;

        let addr = body
            .address
            .ok_or_else(|| LocationError::Geocoding("response has no address".into()))?;

        // city > town > village > municipality > county > state, skipping blanks
        [addr.city, addr.town, addr.village, addr.municipality, addr.county, addr.state]
            .into_iter()
            .flatten()
            .find(|name| !name.trim().is_empty())
            .ok_or_else(|| LocationError::Geocoding("no place name for coordinates".into()))
    }
}

/// Turns the device location into a city query, falling back to a default.
#[derive(Debug, Clone)]
pub struct LocationResolver {
    source: Arc<dyn LocationSource>,
    geocoder: Arc<dyn Geocoder>,
    default_city: String,
}

impl LocationResolver {
    pub fn new(
        source: Arc<dyn LocationSource>,
        geocoder: Arc<dyn Geocoder>,
        default_city: impl Into<String>,
    ) -> Self {
        Self { source, geocoder, default_city: default_city.into() }
    }

    pub fn default_city(&self) -> &str {
        &self.default_city
    }

    /// City for the current device location. Never fails: permission denial,
    /// a missing fix, or a geocoding failure all yield the default city.
    pub async fn resolve(&self) -> String {
        match self.try_resolve().await {
            Ok(city) => {
                info!(%city, "Resolved device location");
                city
            }
            Err(LocationError::PermissionDenied) => {
                debug!(default = %self.default_city, "Location permission denied, using default city");
                self.default_city.clone()
            }
            Err(err) => {
                warn!(error = %err, default = %self.default_city, "Location lookup failed, using default city");
                self.default_city.clone()
            }
        }
    }

    async fn try_resolve(&self) -> Result<String, LocationError> {
        if !self.source.request_permission().await {
            return Err(LocationError::PermissionDenied);
        }

        let at = self.source.last_known_location().await.ok_or(LocationError::Unavailable)?;
        debug!(lat = at.latitude, lon = at.longitude, "Got location fix");

        self.geocoder.city_for(at).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const OSLO: Coordinates = Coordinates { latitude: 59.91, longitude: 10.75 };

    #[derive(Debug, Default)]
    struct CountingGeocoder {
        calls: AtomicUsize,
        answer: Option<String>,
    }

    #[async_trait]
    impl Geocoder for CountingGeocoder {
        async fn city_for(&self, _at: Coordinates) -> Result<String, LocationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer.clone().ok_or_else(|| LocationError::Geocoding("offline".into()))
        }
    }

    fn resolver(source: FixedLocation, geocoder: Arc<CountingGeocoder>) -> LocationResolver {
        LocationResolver::new(Arc::new(source), geocoder, "London")
    }

    #[tokio::test]
    async fn permission_denied_returns_default_without_geocoding() {
        let geocoder = Arc::new(CountingGeocoder { answer: Some("Oslo".into()), ..Default::default() });

        let city = resolver(FixedLocation::Denied, geocoder.clone()).resolve().await;

        assert_eq!(city, "London");
        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_fix_returns_default() {
        let geocoder = Arc::new(CountingGeocoder { answer: Some("Oslo".into()), ..Default::default() });

        let city = resolver(FixedLocation::Unavailable, geocoder.clone()).resolve().await;

        assert_eq!(city, "London");
        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fix_is_reverse_geocoded() {
        let geocoder = Arc::new(CountingGeocoder { answer: Some("Oslo".into()), ..Default::default() });

        let city = resolver(FixedLocation::At(OSLO), geocoder.clone()).resolve().await;

        assert_eq!(city, "Oslo");
        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn geocoder_failure_returns_default() {
        let geocoder = Arc::new(CountingGeocoder::default());

        let city = resolver(FixedLocation::At(OSLO), geocoder).resolve().await;

        assert_eq!(city, "London");
    }

    #[tokio::test]
    async fn no_geocoder_keeps_default_only_behaviour() {
        let r = LocationResolver::new(Arc::new(FixedLocation::At(OSLO)), Arc::new(NoGeocoder), "Paris");
        assert_eq!(r.resolve().await, "Paris");
        assert_eq!(r.default_city(), "Paris");
    }

    #[test]
    fn from_option_without_coordinates_is_denied() {
        assert_eq!(FixedLocation::from_option(None), FixedLocation::Denied);
        assert_eq!(FixedLocation::from_option(Some(OSLO)), FixedLocation::At(OSLO));
    }
}
