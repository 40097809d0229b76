use crate::{
    Config, FetchError, WeatherQuery, WeatherReading, provider::weatherapi::WeatherApiProvider,
};
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

pub mod weatherapi;

/// Source of current-weather readings. One attempt per call; callers decide
/// whether to try again.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn fetch(&self, query: &WeatherQuery) -> Result<WeatherReading, FetchError>;
}

/// Construct the WeatherAPI.com provider from config. A missing API key is
/// reported by `fetch`, not here.
pub fn provider_from_config(config: &Config) -> Result<Arc<dyn WeatherProvider>, FetchError> {
    let provider = WeatherApiProvider::from_config(config)?;
    Ok(Arc::new(provider))
}
