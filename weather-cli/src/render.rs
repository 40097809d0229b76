use chrono::Local;
use weather_core::{Phase, ViewState};

/// Text for one frame of the weather screen.
pub fn screen(state: &ViewState) -> String {
    let mut out = String::new();

    if let Some(label) = &state.location_label {
        out.push_str(&format!("Your location: {label}\n"));
    }

    match state.phase() {
        Phase::Idle => out.push_str("Enter a city name to see the weather.\n"),
        Phase::Loading => out.push_str(&format!("Loading weather for {}...\n", state.city_name_input)),
        Phase::Ready | Phase::Failed => {}
    }

    if let Some(reading) = &state.last_reading {
        out.push_str(&format!("Weather in {}\n", reading.location_name));
        if let Some(temp) = state.display_temperature() {
            out.push_str(&format!("  Temperature: {temp}\n"));
        }
        if let Some(feels) = state.display_feels_like() {
            out.push_str(&format!("  Feels like:  {feels}\n"));
        }
        out.push_str(&format!("  Humidity:    {}%\n", reading.humidity_pct));
        if let Some(at) = reading.observed_at {
            out.push_str(&format!(
                "  Updated:     {}\n",
                at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
            ));
        }
    }

    if let Some(err) = &state.last_error {
        out.push_str(&format!("Error: {err}\n"));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use weather_core::{UnitPreference, WeatherReading};

    fn ready(unit: UnitPreference) -> ViewState {
        ViewState {
            unit_preference: unit,
            city_name_input: "London".into(),
            last_reading: Some(WeatherReading {
                temperature_c: 15.0,
                temperature_f: 59.0,
                humidity_pct: 80,
                feels_like_c: 14.0,
                location_name: "London".into(),
                observed_at: None,
            }),
            ..ViewState::default()
        }
    }

    #[test]
    fn shows_selected_unit_only() {
        let text = screen(&ready(UnitPreference::Imperial));
        assert!(text.contains("Weather in London"));
        assert!(text.contains("Temperature: 59 °F"));
        assert!(text.contains("Feels like:  57.2 °F"));
        assert!(!text.contains("°C"));
    }

    #[test]
    fn shows_error_below_last_good_reading() {
        let mut state = ready(UnitPreference::Metric);
        state.last_error = Some("Could not reach the weather service.".into());

        let text = screen(&state);
        assert!(text.contains("Temperature: 15 °C"));
        assert!(text.ends_with("Error: Could not reach the weather service.\n"));
    }

    #[test]
    fn idle_prompts_for_city() {
        assert!(screen(&ViewState::default()).contains("Enter a city name"));
    }
}
