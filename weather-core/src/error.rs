use thiserror::Error;

/// Failure of a single weather fetch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Connectivity problem or timeout; the request may succeed if resubmitted.
    #[error("Network error: {0}")]
    Network(String),

    /// Non-success status or a payload that does not have the expected shape.
    #[error("Weather service error: {0}")]
    Api(String),

    /// Missing or rejected API key.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl FetchError {
    /// Message shown to the user in place of a reading.
    pub fn user_message(&self) -> String {
        match self {
            FetchError::Network(_) => {
                "Could not reach the weather service. Check your connection and try again."
                    .to_string()
            }
            FetchError::Api(detail) => format!("The weather service returned an error: {detail}"),
            FetchError::Config(detail) => format!(
                "{detail}\nHint: run `weather configure` or set WEATHER_API_KEY."
            ),
        }
    }
}

/// Reasons a device location could not be turned into a city.
/// Always recovered inside the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Location not available")]
    Unavailable,
    #[error("Reverse geocoding failed: {0}")]
    Geocoding(String),
}
