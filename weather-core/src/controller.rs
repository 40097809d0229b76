//! Request cycle: dispatch a query off the owning context, apply the outcome
//! back on it.
//!
//! Fetches run on spawned tokio tasks and report through an mpsc channel; only
//! [`RequestController::apply`] touches the [`ViewState`]. Every submit gets a
//! new generation and older completions are dropped, so the last submitted
//! query always wins.

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tracing::{debug, warn};

use crate::{
    FetchError, UnitPreference, WeatherQuery, WeatherReading, WeatherProvider,
    config::DEFAULT_TIMEOUT_SECS, location::LocationResolver, state::ViewState,
};

/// Outcome of one dispatched fetch, tagged with the submit it belongs to.
#[derive(Debug)]
pub struct Completion {
    generation: u64,
    result: Result<WeatherReading, FetchError>,
}

#[derive(Debug)]
pub struct RequestController {
    provider: Arc<dyn WeatherProvider>,
    timeout: Duration,
    state: ViewState,
    /// Reading shown again if the current request fails.
    last_good: Option<WeatherReading>,
    generation: u64,
    in_flight: Option<JoinHandle<()>>,
    tx: mpsc::UnboundedSender<Completion>,
    rx: mpsc::UnboundedReceiver<Completion>,
    publisher: watch::Sender<ViewState>,
}

impl RequestController {
    pub fn new(provider: Arc<dyn WeatherProvider>, unit: UnitPreference) -> Self {
        let state = ViewState::new(unit);
        let (tx, rx) = mpsc::unbounded_channel();
        let (publisher, _) = watch::channel(state.clone());

        Self {
            provider,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            state,
            last_good: None,
            generation: 0,
            in_flight: None,
            tx,
            rx,
            publisher,
        }
    }

    /// Upper bound on a single fetch, on top of whatever the provider enforces.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    /// Snapshots of the view state, one per change.
    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.publisher.subscribe()
    }

    /// Dispatch `query`. The outcome lands through [`Self::apply`].
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(&mut self, query: WeatherQuery) {
        self.dispatch(query, None);
    }

    /// Resolve the device location to a city, then submit it.
    pub async fn submit_location(&mut self, resolver: &LocationResolver) {
        let city = resolver.resolve().await;
        self.dispatch(WeatherQuery::new(city.clone()), Some(city));
    }

    /// `location_label` is only kept for location-driven requests.
    fn dispatch(&mut self, query: WeatherQuery, location_label: Option<String>) {
        self.generation += 1;
        let generation = self.generation;

        if let Some(prev) = self.in_flight.take() {
            prev.abort();
        }

        self.state.city_name_input = query.city.clone();
        self.state.location_label = location_label;
        self.state.is_loading = true;
        self.state.last_reading = None;
        self.state.last_error = None;
        self.publish();

        debug!(generation, city = %query.city, "Dispatching weather request");

        let provider = Arc::clone(&self.provider);
        let tx = self.tx.clone();
        let timeout = self.timeout;
        self.in_flight = Some(tokio::spawn(async move {
            let result = match tokio::time::timeout(timeout, provider.fetch(&query)).await {
                Ok(result) => result,
                Err(_) => Err(FetchError::Network(format!(
                    "request timed out after {}s",
                    timeout.as_secs_f32()
                ))),
            };
            // Receiver lives as long as the controller; a send error means it is gone.
            let _ = tx.send(Completion { generation, result });
        }));
    }

    /// Flip between °C and °F. Never fetches.
    pub fn toggle_unit(&mut self) {
        self.state.unit_preference = self.state.unit_preference.toggled();
        self.publish();
    }

    /// Wait for the next completion from any dispatched request.
    pub async fn next_completion(&mut self) -> Option<Completion> {
        self.rx.recv().await
    }

    /// Apply a completion to the view state. Returns `false` when it was
    /// superseded by a later submit and dropped.
    pub fn apply(&mut self, completion: Completion) -> bool {
        if completion.generation != self.generation {
            warn!(
                stale = completion.generation,
                current = self.generation,
                "Discarding superseded weather result"
            );
            return false;
        }

        self.in_flight = None;
        self.state.is_loading = false;

        match completion.result {
            Ok(reading) => {
                debug!(location = %reading.location_name, "Weather request succeeded");
                self.last_good = Some(reading.clone());
                self.state.last_reading = Some(reading);
                self.state.last_error = None;
            }
            Err(err) => {
                warn!(error = %err, "Weather request failed");
                self.state.last_reading = self.last_good.clone();
                self.state.last_error = Some(err.user_message());
            }
        }

        self.publish();
        true
    }

    /// Apply completions until the latest submit has landed.
    pub async fn settle(&mut self) {
        while self.state.is_loading {
            match self.rx.recv().await {
                Some(completion) => {
                    self.apply(completion);
                }
                None => break,
            }
        }
    }

    fn publish(&self) {
        self.publisher.send_replace(self.state.clone());
    }
}

impl Drop for RequestController {
    fn drop(&mut self) {
        if let Some(task) = self.in_flight.take() {
            task.abort();
        }
    }
}
