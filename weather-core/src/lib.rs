//! Core library for the `weather` app.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The WeatherAPI.com client behind the [`WeatherProvider`] trait
//! - Device location → city resolution with a default-city fallback
//! - The view state and the controller that drives the request cycle
//!
//! It is used by `weather-cli`, but can also back any other front end that
//! renders a [`ViewState`].

pub mod config;
pub mod controller;
pub mod error;
pub mod location;
pub mod model;
pub mod provider;
pub mod state;

pub use config::Config;
pub use controller::{Completion, RequestController};
pub use error::{FetchError, LocationError};
pub use location::{
    Coordinates, FixedLocation, Geocoder, LocationResolver, LocationSource, NoGeocoder,
    NominatimGeocoder,
};
pub use model::{UnitPreference, WeatherQuery, WeatherReading};
pub use provider::{WeatherProvider, provider_from_config};
pub use state::{Phase, ViewState};
