use std::path::PathBuf;
use std::time::Instant;

use crossterm::terminal;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tracing_subscriber::EnvFilter;

use beatline::app::App;
use beatline::audio;
use beatline::model::TimelineModel;
use beatline::provider::SampleProvider;
use beatline::session;
use beatline::tui::{self, Action};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    // logs go to stderr; redirect with 2> to keep the screen clean
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // the engine must come up before anything else is worth doing
    let audio = audio::start_audio()?;
    let sample_rate = audio.sample_rate();

    let project_dir: PathBuf = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default());

    let mut provider = SampleProvider::new(&project_dir, sample_rate);
    let model = match session::load(&project_dir) {
        Some(saved) => session::restore(saved, &mut provider),
        None => TimelineModel::new(),
    };
    let mut app = App::new(
        model,
        provider,
        project_dir,
        sample_rate,
        audio.has_input(),
    );

    terminal::enable_raw_mode()?;
    let _guard = RawModeGuard; // auto drops when out of scope

    let backend = CrosstermBackend::new(std::io::stdout());
    let mut term = Terminal::new(backend)?;
    term.clear()?;

    let tick_rate = std::time::Duration::from_millis(16); // ~60fps

    loop {
        let now = Instant::now();
        let ds = app.display_state(now);
        term.draw(|frame| {
            let area = frame.area();
            tui::view::render(frame, area, &ds);
        })?;

        if let Some(action) = tui::input::poll_input(tick_rate)? {
            if action == Action::Quit {
                // save before quitting
                if let Err(err) = app.save() {
                    tracing::warn!(%err, "could not save project");
                }
                drop(term);
                drop(audio);
                return Ok(());
            }
            for cmd in app.handle(action, Instant::now()) {
                audio.send(cmd);
            }
        }

        // a finished mic take comes back from the engine thread
        if let Some(rec) = audio.poll_completed_recording() {
            for cmd in app.on_recording_complete(rec, Instant::now()) {
                audio.send(cmd);
            }
        }

        // deadline expiry + playhead sampling
        for cmd in app.tick(Instant::now()) {
            audio.send(cmd);
        }
    }
}

struct RawModeGuard;
impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}
