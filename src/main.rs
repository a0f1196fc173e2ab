use color_eyre::Result;
use crossterm::event::KeyEvent;
use physio_locator::{
    acquirer::CoordinateAcquirer,
    api::{GoogleMapsClient, MapsApi},
    app::{Action, App},
    config::Config,
    db::PositionCache,
    events::{forward_changes, Event, EventHandler},
    location::{IpLocator, StoredPermission},
    logging,
    picker::LocationPicker,
    places::PlaceSearchClient,
    resolver::AddressResolver,
    state::{LocationPipeline, LocationStateMachine},
    ui,
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{io, sync::Arc};
use tokio::sync::mpsc::UnboundedSender;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Instrumentation and safety
    let _log_guard = logging::initialize_logging();
    color_eyre::install()?;
    install_panic_hook();

    let config = Config::load();
    let (location, picker) = build_pipeline(&config)?;
    info!("Location pipeline ready (auto_fetch = {})", config.location.auto_fetch);

    // Ready terminal and state
    let mut terminal = setup_terminal()?;
    let mut app = App::new();
    app.location = location.snapshot();
    let mut events = EventHandler::new(150);

    forward_changes(location.subscribe(), events.tx.clone(), Event::Location);
    forward_changes(picker.subscribe(), events.tx.clone(), Event::Picker);

    // Main loop
    while !app.should_quit {
        terminal.draw(|f| ui::render(f, &app))?;

        match events.next().await {
            Some(Event::Input(key)) => on_key(&mut app, key, &location, &picker, &events.tx),
            Some(event) => app.on_event(event),
            None => break,
        }
    }

    restore_terminal(terminal)?;
    Ok(())
}

fn build_pipeline(config: &Config) -> Result<(LocationStateMachine, LocationPicker)> {
    let timeout = config.maps.request_timeout();
    let cache = Arc::new(PositionCache::open(&config.positioning.cache_path)?);
    let locator = Arc::new(IpLocator::new(cache.clone(), config.positioning.clone()));
    let maps: Arc<dyn MapsApi> = Arc::new(GoogleMapsClient::new(config.maps.clone())?);

    let pipeline = LocationPipeline {
        permissions: Arc::new(StoredPermission::new(cache, config.location.allow_location)),
        acquirer: CoordinateAcquirer::new(locator.clone(), config.location.freshness(), timeout),
        resolver: AddressResolver::new(maps.clone(), locator, timeout),
    };
    let location = LocationStateMachine::launch(pipeline, config.location.auto_fetch);

    let places = PlaceSearchClient::new(maps, config.picker.min_query_len, timeout);
    let picker = LocationPicker::new(places, location.clone(), config.picker.debounce());

    Ok((location, picker))
}

/// Maps a key press to pipeline calls. Anything that awaits runs on its own
/// task so the UI keeps drawing.
fn on_key(
    app: &mut App,
    key: KeyEvent,
    location: &LocationStateMachine,
    picker: &LocationPicker,
    tx: &UnboundedSender<Event>,
) {
    let Some(action) = app.handle_key(key) else {
        return;
    };

    match action {
        Action::Quit => {}
        Action::Refresh => {
            let location = location.clone();
            tokio::spawn(async move {
                location.refresh_location().await;
            });
        }
        Action::Clear => location.clear_location(),
        Action::OpenPicker => picker.open(),
        Action::ClosePicker => picker.close(),
        Action::QueryChanged(query) => picker.on_query_change(query),
        Action::UseCurrentLocation => {
            let picker = picker.clone();
            tokio::spawn(async move {
                picker.use_current_location().await;
            });
        }
        Action::Select(prediction) => {
            let picker = picker.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                if let Err(e) = picker.select(&prediction).await {
                    let _ = tx.send(Event::PickerError(e.to_string()));
                }
            });
        }
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    crossterm::terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    crossterm::execute!(
        stdout,
        crossterm::terminal::EnterAlternateScreen,
        crossterm::cursor::Hide
    )?;
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

fn restore_terminal(mut terminal: Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    crossterm::terminal::disable_raw_mode()?;
    crossterm::execute!(
        terminal.backend_mut(),
        crossterm::terminal::LeaveAlternateScreen,
        crossterm::cursor::Show
    )?;
    Ok(())
}

fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        // Force terminal cleanup!
        crossterm::terminal::disable_raw_mode().ok();
        crossterm::execute!(
            std::io::stdout(),
            crossterm::terminal::LeaveAlternateScreen,
            crossterm::cursor::Show
        )
        .ok();
        original_hook(panic_info);
    }));
}
