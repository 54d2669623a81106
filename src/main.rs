//! CLI entry point for the subway congestion dashboard backend.
//!
//! Every subcommand builds one request, answers it through a [`Session`] and
//! prints the view-model as JSON on stdout. `serve` does the same for a stream
//! of JSON requests on stdin.

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use subway_congestion::{
    aggregator::Selection,
    config::Settings,
    dataset::{Dimension, Dimensions},
    output::{append_series, print_pretty, write_json},
    session::{Request, Response, Session},
    view::{ComparisonRequest, StationPick},
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "subway_congestion")]
#[command(about = "Compare Seoul subway congestion by station and hour", long_about = None)]
struct Cli {
    /// Congestion CSV to read (overrides CONGESTION_DATA_PATH)
    #[arg(short, long, global = true, value_name = "CSV")]
    data: Option<PathBuf>,

    /// Geocode with the built-in station table only, never the network
    #[arg(long, global = true, default_value_t = false)]
    offline: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List lines, stations, day types and directions
    Options {
        /// Only list stations on this line
        #[arg(short, long)]
        line: Option<String>,
    },
    /// Print the raw rows matching the given filters
    Filter {
        #[arg(long)]
        line: Option<String>,
        #[arg(long)]
        station: Option<String>,
        #[arg(long)]
        day_type: Option<String>,
        #[arg(long)]
        direction: Option<String>,
    },
    /// Hourly average congestion for one station
    Hourly {
        #[arg(long)]
        station: String,
        #[arg(long)]
        day_type: String,
        #[arg(long)]
        direction: String,
        /// Restrict to one line instead of averaging across lines
        #[arg(long)]
        line: Option<String>,
        /// CSV file to append the series to
        #[arg(short, long)]
        export: Option<String>,
    },
    /// Compare two stations under a shared day type and direction
    Compare {
        #[arg(long)]
        line1: String,
        #[arg(long)]
        station1: Option<String>,
        #[arg(long)]
        line2: String,
        #[arg(long)]
        station2: Option<String>,
        #[arg(long)]
        day_type: String,
        #[arg(long)]
        direction: String,
        /// Also geocode both stations and print the map view
        #[arg(short, long, default_value_t = false)]
        map: bool,
    },
    /// Look up the coordinates of a place
    Geocode {
        #[arg(value_name = "PLACE", default_value = "서울")]
        place: String,
    },
    /// Answer JSON requests from stdin, one per line
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/subway_congestion.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("subway_congestion.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    let mut settings = Settings::from_env()?;
    if let Some(data) = cli.data {
        settings.data_path = data;
    }
    debug!(data_path = %settings.data_path.display(), offline = cli.offline, "Settings resolved");
    let mut session = Session::from_settings(settings, cli.offline)?;

    match cli.command {
        Commands::Options { line } => {
            let response = session.handle(Request::Options { line }).await;
            emit(&response)?;
        }
        Commands::Filter {
            line,
            station,
            day_type,
            direction,
        } => {
            let dimensions = Dimensions::new()
                .with_opt(Dimension::Line, line)
                .with_opt(Dimension::Station, station)
                .with_opt(Dimension::DayType, day_type)
                .with_opt(Dimension::Direction, direction);
            let response = session.handle(Request::Filter { dimensions }).await;
            emit(&response)?;
        }
        Commands::Hourly {
            station,
            day_type,
            direction,
            line,
            export,
        } => {
            let selection = Selection {
                line,
                station,
                day_type,
                direction,
            };
            let response = session.handle(Request::Hourly(selection.clone())).await;
            emit(&response)?;

            if let (Some(path), Response::Hourly(series)) = (export, &response) {
                append_series(&path, &selection, series)?;
                info!(path = %path, "Series exported");
            }
        }
        Commands::Compare {
            line1,
            station1,
            line2,
            station2,
            day_type,
            direction,
            map,
        } => {
            let request = ComparisonRequest {
                first: StationPick {
                    line: line1,
                    station: station1,
                },
                second: StationPick {
                    line: line2,
                    station: station2,
                },
                day_type,
                direction,
            };
            let response = session.handle(Request::Compare(request.clone())).await;
            emit(&response)?;

            if map {
                let response = session.handle(Request::Map(request)).await;
                emit(&response)?;
            }
        }
        Commands::Geocode { place } => {
            let response = session.handle(Request::Geocode { place }).await;
            emit(&response)?;
        }
        Commands::Serve => serve(&mut session).await?,
    }

    Ok(())
}

/// Prints a response on stdout. Error responses fail the command.
fn emit(response: &Response) -> Result<()> {
    print_pretty(response);
    write_json(std::io::stdout().lock(), response)?;

    if let Response::Error { message, .. } = response {
        bail!("{message}");
    }
    Ok(())
}

/// Answers newline-delimited JSON requests until stdin closes.
#[tracing::instrument(skip(session))]
async fn serve(session: &mut Session) -> Result<()> {
    info!(data_path = %session.settings().data_path.display(), "Serving requests from stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut answered = 0usize;

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let response = session.handle_line(&line).await;
        if let Response::Error { message, fatal } = &response {
            warn!(fatal, message = %message, "Request failed");
        }
        write_json(std::io::stdout().lock(), &response)?;
        answered += 1;
    }

    info!(answered, "Input closed, shutting down");
    Ok(())
}
