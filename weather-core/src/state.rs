use crate::model::{UnitPreference, WeatherReading};

/// Where the screen is in the request cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading,
    Ready,
    Failed,
}

/// Everything the rendering layer shows. Mutated only by the request controller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub unit_preference: UnitPreference,
    pub city_name_input: String,
    pub last_reading: Option<WeatherReading>,
    pub last_error: Option<String>,
    pub is_loading: bool,
    /// City produced by the last location lookup.
    pub location_label: Option<String>,
}

impl ViewState {
    pub fn new(unit_preference: UnitPreference) -> Self {
        Self { unit_preference, ..Self::default() }
    }

    pub fn phase(&self) -> Phase {
        if self.is_loading {
            Phase::Loading
        } else if self.last_error.is_some() {
            Phase::Failed
        } else if self.last_reading.is_some() {
            Phase::Ready
        } else {
            Phase::Idle
        }
    }

    /// Temperature of the current reading in the selected unit, e.g. `"15 °C"`.
    pub fn display_temperature(&self) -> Option<String> {
        self.last_reading.as_ref().map(|r| {
            format!("{} {}", r.temperature(self.unit_preference), self.unit_preference.symbol())
        })
    }

    /// Feels-like of the current reading in the selected unit, one decimal.
    pub fn display_feels_like(&self) -> Option<String> {
        self.last_reading.as_ref().map(|r| {
            format!("{:.1} {}", r.feels_like(self.unit_preference), self.unit_preference.symbol())
        })
    }
}
