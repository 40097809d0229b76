use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The only input needed to fetch weather: a city name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherQuery {
    pub city: String,
}

impl WeatherQuery {
    pub fn new(city: impl Into<String>) -> Self {
        Self { city: city.into() }
    }

    /// Build a query from raw user input. Blank input yields `None`.
    pub fn parse(input: &str) -> Option<Self> {
        let city = input.trim();
        if city.is_empty() { None } else { Some(Self::new(city)) }
    }
}

/// Snapshot of one successful fetch. Replaced wholesale, never patched.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReading {
    pub temperature_c: f64,
    pub temperature_f: f64,
    pub humidity_pct: u8,
    pub feels_like_c: f64,
    pub location_name: String,
    pub observed_at: Option<DateTime<Utc>>,
}

impl WeatherReading {
    pub fn temperature(&self, unit: UnitPreference) -> f64 {
        match unit {
            UnitPreference::Metric => self.temperature_c,
            UnitPreference::Imperial => self.temperature_f,
        }
    }

    /// The provider only reports feels-like in °C; °F is derived.
    pub fn feels_like(&self, unit: UnitPreference) -> f64 {
        match unit {
            UnitPreference::Metric => self.feels_like_c,
            UnitPreference::Imperial => self.feels_like_c * 9.0 / 5.0 + 32.0,
        }
    }
}

/// Which temperature field is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitPreference {
    #[default]
    Metric,
    Imperial,
}

impl UnitPreference {
    pub fn toggled(self) -> Self {
        match self {
            UnitPreference::Metric => UnitPreference::Imperial,
            UnitPreference::Imperial => UnitPreference::Metric,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            UnitPreference::Metric => "°C",
            UnitPreference::Imperial => "°F",
        }
    }
}

impl std::fmt::Display for UnitPreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            UnitPreference::Metric => "metric",
            UnitPreference::Imperial => "imperial",
        })
    }
}
