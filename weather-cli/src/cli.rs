use std::{
    fmt,
    io::{self, Write},
    sync::Arc,
};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode, Select, Text};
use tokio::task::JoinHandle;
use weather_core::{
    Config, Coordinates, FixedLocation, Geocoder, LocationResolver, NoGeocoder, NominatimGeocoder,
    RequestController, UnitPreference, WeatherQuery, provider_from_config,
};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Current weather for a city")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the WeatherAPI.com key and defaults in the config file.
    Configure,

    /// Show current weather once and exit.
    Show {
        /// City name; when absent the location lookup picks one.
        city: Option<String>,

        /// Show °F instead of °C.
        #[arg(long)]
        imperial: bool,

        #[command(flatten)]
        location: LocationArgs,
    },

    /// Interactive screen: search, toggle °C/°F, use location (the default).
    Interactive {
        #[command(flatten)]
        location: LocationArgs,
    },
}

/// Device coordinates. Without them location permission counts as denied.
#[derive(Debug, Clone, Copy, Default, Args)]
pub struct LocationArgs {
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    lat: Option<f64>,

    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    lon: Option<f64>,

    /// Skip reverse geocoding; coordinates always map to the default city.
    #[arg(long)]
    no_geocode: bool,
}

impl LocationArgs {
    fn coordinates(&self) -> Option<Coordinates> {
        match (self.lat, self.lon) {
            (Some(latitude), Some(longitude)) => Some(Coordinates { latitude, longitude }),
            _ => None,
        }
    }

    fn resolver(&self, config: &Config) -> anyhow::Result<LocationResolver> {
        let geocoder: Arc<dyn Geocoder> = if self.no_geocode {
            Arc::new(NoGeocoder)
        } else {
            Arc::new(
                NominatimGeocoder::from_config(config)
                    .context("Failed to set up reverse geocoding")?,
            )
        };

        Ok(LocationResolver::new(
            Arc::new(FixedLocation::from_option(self.coordinates())),
            geocoder,
            config.default_city.clone(),
        ))
    }
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Some(Command::Configure) => configure(),
            Some(Command::Show { city, imperial, location }) => {
                show(city, imperial, location).await
            }
            Some(Command::Interactive { location }) => interactive(location).await,
            None => interactive(LocationArgs::default()).await,
        }
    }
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let key = Password::new("WeatherAPI.com API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;
    if !key.trim().is_empty() {
        config.api_key = Some(key.trim().to_string());
    }

    config.default_city = Text::new("Default city:")
        .with_default(&config.default_city)
        .prompt()
        .context("Failed to read default city")?;

    let units = vec![UnitPreference::Metric, UnitPreference::Imperial];
    config.unit = Select::new("Temperature unit:", units)
        .with_starting_cursor(match config.unit {
            UnitPreference::Metric => 0,
            UnitPreference::Imperial => 1,
        })
        .prompt()
        .context("Failed to read temperature unit")?;

    let path = config.save()?;
    tracing::debug!(path = %path.display(), "Saved configuration");
    println!("Configuration saved to {}", path.display());
    Ok(())
}

/// A missing API key is not checked here; it shows up on the screen on the first fetch.
fn controller(config: &Config, unit: UnitPreference) -> anyhow::Result<RequestController> {
    let provider =
        provider_from_config(config).context("Failed to set up the weather client")?;
    Ok(RequestController::new(provider, unit).with_timeout(config.timeout()))
}

async fn show(city: Option<String>, imperial: bool, location: LocationArgs) -> anyhow::Result<()> {
    let config = Config::load()?;
    let unit = if imperial { UnitPreference::Imperial } else { config.unit };
    let mut ctl = controller(&config, unit)?;

    match city.as_deref().and_then(WeatherQuery::parse) {
        Some(query) => ctl.submit(query),
        None => ctl.submit_location(&location.resolver(&config)?).await,
    }
    ctl.settle().await;

    print!("{}", render::screen(ctl.state()));

    if ctl.state().last_error.is_some() {
        anyhow::bail!("Failed to fetch weather");
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuItem {
    Search,
    ToggleUnit,
    UseLocation,
    Quit,
}

impl fmt::Display for MenuItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MenuItem::Search => "Search city",
            MenuItem::ToggleUnit => "Toggle °C / °F",
            MenuItem::UseLocation => "Use my location",
            MenuItem::Quit => "Quit",
        })
    }
}

/// What the user asked for at the menu.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Action {
    /// `None` when the typed city was blank.
    Search(Option<WeatherQuery>),
    ToggleUnit,
    UseLocation,
    Quit,
}

/// Blocking terminal prompt; run it on the blocking pool.
fn prompt_action() -> anyhow::Result<Action> {
    let items = vec![MenuItem::Search, MenuItem::ToggleUnit, MenuItem::UseLocation, MenuItem::Quit];
    let choice = Select::new("What next?", items).prompt().context("Failed to read choice")?;

    Ok(match choice {
        MenuItem::Search => {
            let input = Text::new("Enter city name:").prompt().context("Failed to read city")?;
            Action::Search(WeatherQuery::parse(&input))
        }
        MenuItem::ToggleUnit => Action::ToggleUnit,
        MenuItem::UseLocation => Action::UseLocation,
        MenuItem::Quit => Action::Quit,
    })
}

async fn interactive(location: LocationArgs) -> anyhow::Result<()> {
    let config = Config::load()?;
    let resolver = location.resolver(&config)?;
    let mut ctl = controller(&config, config.unit)?;
    tracing::debug!(default_city = %config.default_city, "Starting interactive screen");

    ctl.submit_location(&resolver).await;

    run_screen(
        &mut ctl,
        &resolver,
        || tokio::task::spawn_blocking(prompt_action),
        &mut io::stdout(),
    )
    .await
}

/// Screen loop. The prompt runs while requests are in flight; completions are
/// applied and redrawn as they land, and a new search supersedes the old one.
async fn run_screen<P, W>(
    ctl: &mut RequestController,
    resolver: &LocationResolver,
    mut next_action: P,
    out: &mut W,
) -> anyhow::Result<()>
where
    P: FnMut() -> JoinHandle<anyhow::Result<Action>>,
    W: Write,
{
    loop {
        draw(out, ctl)?;

        let mut prompt = next_action();
        let action = loop {
            tokio::select! {
                joined = &mut prompt => break joined.context("Input prompt failed")??,
                Some(completion) = ctl.next_completion() => {
                    if ctl.apply(completion) {
                        draw(out, ctl)?;
                    }
                }
            }
        };

        match action {
            Action::Search(Some(query)) => ctl.submit(query),
            Action::Search(None) => writeln!(out, "City name cannot be empty.")?,
            Action::ToggleUnit => ctl.toggle_unit(),
            Action::UseLocation => ctl.submit_location(resolver).await,
            Action::Quit => return Ok(()),
        }
    }
}

fn draw<W: Write>(out: &mut W, ctl: &RequestController) -> io::Result<()> {
    write!(out, "\n{}", render::screen(ctl.state()))?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::{collections::VecDeque, time::Duration};
    use weather_core::{FetchError, WeatherProvider, WeatherReading};

    /// "Slow" never answers; every other city answers at once.
    #[derive(Debug)]
    struct SlowCityProvider;

    #[async_trait]
    impl WeatherProvider for SlowCityProvider {
        async fn fetch(&self, query: &WeatherQuery) -> Result<WeatherReading, FetchError> {
            if query.city == "Slow" {
                std::future::pending::<()>().await;
            }
            Ok(WeatherReading {
                temperature_c: 20.0,
                temperature_f: 68.0,
                humidity_pct: 40,
                feels_like_c: 19.0,
                location_name: query.city.clone(),
                observed_at: None,
            })
        }
    }

    /// Menu answers, each handed back after its delay; `Quit` once exhausted.
    fn scripted(
        actions: Vec<(Duration, Action)>,
    ) -> impl FnMut() -> JoinHandle<anyhow::Result<Action>> {
        let mut actions = VecDeque::from(actions);
        move || {
            let (delay, action) = actions.pop_front().unwrap_or((Duration::ZERO, Action::Quit));
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                Ok(action)
            })
        }
    }

    fn slow_start() -> (RequestController, LocationResolver) {
        let ctl = RequestController::new(Arc::new(SlowCityProvider), UnitPreference::Metric);
        let resolver =
            LocationResolver::new(Arc::new(FixedLocation::Denied), Arc::new(NoGeocoder), "Slow");
        (ctl, resolver)
    }

    #[tokio::test]
    async fn search_while_loading_supersedes_the_pending_request() {
        let (mut ctl, resolver) = slow_start();
        ctl.submit_location(&resolver).await;
        let mut out = Vec::new();

        let actions = scripted(vec![
            (Duration::ZERO, Action::Search(WeatherQuery::parse("Fast"))),
            (Duration::from_millis(200), Action::Quit),
        ]);
        tokio::time::timeout(
            Duration::from_secs(5),
            run_screen(&mut ctl, &resolver, actions, &mut out),
        )
        .await
        .expect("screen waited on the pending request")
        .unwrap();

        let state = ctl.state();
        assert!(!state.is_loading);
        assert!(state.location_label.is_none());
        assert_eq!(state.last_reading.as_ref().map(|r| r.location_name.as_str()), Some("Fast"));

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Loading weather for Slow"));
        assert!(text.contains("Weather in Fast"));
    }

    #[tokio::test]
    async fn menu_stays_usable_while_loading() {
        let (mut ctl, resolver) = slow_start();
        ctl.submit_location(&resolver).await;
        let mut out = Vec::new();

        let actions = scripted(vec![
            (Duration::ZERO, Action::ToggleUnit),
            (Duration::ZERO, Action::Search(None)),
        ]);
        tokio::time::timeout(
            Duration::from_secs(5),
            run_screen(&mut ctl, &resolver, actions, &mut out),
        )
        .await
        .expect("screen waited on the pending request")
        .unwrap();

        assert!(ctl.state().is_loading);
        assert_eq!(ctl.state().unit_preference, UnitPreference::Imperial);
        assert!(String::from_utf8(out).unwrap().contains("City name cannot be empty."));
    }

    #[test]
    fn no_subcommand_means_interactive() {
        let cli = Cli::try_parse_from(["weather"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn show_parses_city_and_unit() {
        let cli = Cli::try_parse_from(["weather", "show", "Oslo", "--imperial"]).unwrap();
        match cli.command {
            Some(Command::Show { city, imperial, location }) => {
                assert_eq!(city.as_deref(), Some("Oslo"));
                assert!(imperial);
                assert!(location.coordinates().is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn coordinates_accept_negative_values() {
        let cli = Cli::try_parse_from(["weather", "show", "--lat", "-33.87", "--lon", "151.21"])
            .unwrap();
        let Some(Command::Show { location, .. }) = cli.command else {
            panic!("expected show");
        };
        assert_eq!(
            location.coordinates(),
            Some(Coordinates { latitude: -33.87, longitude: 151.21 })
        );
    }

    #[test]
    fn lat_without_lon_is_rejected() {
        assert!(Cli::try_parse_from(["weather", "interactive", "--lat", "51.5"]).is_err());
    }

    #[test]
    fn resolver_without_coordinates_uses_default_city() {
        let config = Config { default_city: "Oslo".into(), ..Config::default() };
        let resolver = LocationArgs::default().resolver(&config).unwrap();
        assert_eq!(resolver.default_city(), "Oslo");
    }
}
