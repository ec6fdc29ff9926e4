use campus_viewer::app::WalkthroughStep;
use campus_viewer::cli::CliOverrides;
use campus_viewer::{load_config, run_walkthrough, run_windowed, CampusApp};
use tracing_subscriber::EnvFilter;

const HARNESS_DT: f32 = 1.0 / 60.0;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = match CliOverrides::parse_from_env() {
        Ok(parsed) => parsed,
        Err(err) => {
            eprintln!("[cli] {err}");
            std::process::exit(2);
        }
    };
    let config = load_config(cli.config_path(), &cli.to_config_overrides());

    let result = if cli.windowed() {
        run_windowed(config)
    } else {
        CampusApp::new(config).and_then(|mut app| {
            let script = WalkthroughStep::tour(cli.frames());
            run_walkthrough(&mut app, &script, HARNESS_DT).map(|report| {
                for event in &report.events {
                    tracing::info!(%event, "event");
                }
            })
        })
    };
    if let Err(err) = result {
        tracing::error!(error = ?err, "campus viewer failed");
        std::process::exit(1);
    }
}
