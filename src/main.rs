use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::process::ExitCode;

use pass_scheduler::config::Config;
use pass_scheduler::model::{Satellite, User};
use pass_scheduler::predict::{Sgp4Propagator, TleCatalog};
use pass_scheduler::scheduler::{
    available_stations, BookingRequest, FileStore, Observation, OverlapMode, Scheduler,
    WindowQuery,
};
use pass_scheduler::time_expr::TimeExpr;

#[derive(Parser)]
#[command(name = "pass-scheduler")]
#[command(about = "Satellite pass discovery and observation booking")]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = "config.yaml", global = true)]
    config: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration file
    Validate,
    /// List bookable windows of a satellite over a station
    Windows(WindowsArgs),
    /// Book an observation
    Book(BookArgs),
    /// List stations a user may book for a transmitter
    Stations {
        #[arg(long)]
        transmitter: String,
        #[arg(long)]
        user: String,
    },
}

#[derive(Args)]
struct WindowsArgs {
    #[arg(long)]
    station: u32,
    #[arg(long)]
    norad: u32,
    #[arg(long, default_value = "T+0s")]
    start: TimeExpr,
    #[arg(long, default_value = "T+48h")]
    end: TimeExpr,
    /// reject, truncate, keep-full, or 0/1/2
    #[arg(long, default_value_t = OverlapMode::Reject)]
    mode: OverlapMode,
    /// Overrides the station horizon, degrees
    #[arg(long)]
    min_horizon: Option<f64>,
}

#[derive(Args)]
struct BookArgs {
    #[arg(long)]
    station: u32,
    #[arg(long)]
    norad: u32,
    #[arg(long)]
    transmitter: String,
    #[arg(long)]
    user: String,
    #[arg(long)]
    start: TimeExpr,
    #[arg(long)]
    end: TimeExpr,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let config = match Config::from_file(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config {}: {}", cli.config, e);
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Validate => validate(&config),
        Commands::Windows(args) => windows(&config, &args),
        Commands::Book(args) => book(&config, &args),
        Commands::Stations { transmitter, user } => stations(&config, &transmitter, &user),
    }
}

fn validate(config: &Config) -> ExitCode {
    println!(
        "Config is valid ({} stations, {} transmitters, {} operators)",
        config.stations.len(),
        config.transmitters.len(),
        config.operators.len()
    );
    for station in &config.stations {
        println!(
            "  {}: {} @ {:.4}, {:.4} (horizon {} deg, {} antennas)",
            station.id,
            station.name,
            station.lat,
            station.lng,
            station.horizon,
            station.antennas.len()
        );
    }
    ExitCode::SUCCESS
}

fn windows(config: &Config, args: &WindowsArgs) -> ExitCode {
    let Some(station) = config.find_station(args.station) else {
        eprintln!("Unknown station {}", args.station);
        return ExitCode::FAILURE;
    };
    let Some(satellite) = load_satellite(config, args.norad) else {
        return ExitCode::FAILURE;
    };

    let now = Utc::now();
    let Some((start, end)) = resolve_range(&args.start, &args.end, now) else {
        return ExitCode::FAILURE;
    };
    let query = WindowQuery {
        station,
        satellite: &satellite,
        min_horizon: args.min_horizon,
        mode: args.mode,
        start,
        end,
    };

    match scheduler(config).predict_windows(&query, now) {
        Ok(outcome) => print_json(&outcome),
        Err(e) => {
            eprintln!("Window search failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn book(config: &Config, args: &BookArgs) -> ExitCode {
    let Some(station) = config.find_station(args.station) else {
        eprintln!("Unknown station {}", args.station);
        return ExitCode::FAILURE;
    };
    let Some(transmitter) = config.find_transmitter(&args.transmitter) else {
        eprintln!("Unknown transmitter {}", args.transmitter);
        return ExitCode::FAILURE;
    };
    let Some(satellite) = load_satellite(config, args.norad) else {
        return ExitCode::FAILURE;
    };

    let now = Utc::now();
    let Some((start, end)) = resolve_range(&args.start, &args.end, now) else {
        return ExitCode::FAILURE;
    };
    let author = User::new(args.user.as_str());
    let request = BookingRequest {
        station,
        satellite: &satellite,
        transmitter,
        start,
        end,
        author: &author,
    };

    #[derive(Serialize)]
    struct Booked<'a> {
        id: String,
        #[serde(flatten)]
        observation: &'a Observation,
    }

    match scheduler(config).book(&request, config, now) {
        Ok((id, observation)) => print_json(&Booked {
            id,
            observation: &observation,
        }),
        Err(e) => {
            eprintln!("Booking failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn stations(config: &Config, transmitter: &str, user: &str) -> ExitCode {
    let Some(transmitter) = config.find_transmitter(transmitter) else {
        eprintln!("Unknown transmitter {}", transmitter);
        return ExitCode::FAILURE;
    };
    let stations = available_stations(
        &config.stations,
        transmitter.downlink_low,
        &User::new(user),
        config,
    );
    print_json(&stations)
}

fn scheduler(config: &Config) -> Scheduler<Sgp4Propagator, FileStore> {
    Scheduler::new(
        Sgp4Propagator::default(),
        FileStore::new(config.bookings_folder.clone()),
        config.scheduling.clone(),
    )
}

fn load_satellite(config: &Config, norad_id: u32) -> Option<Satellite> {
    let mut catalog = TleCatalog::new(config.tle_folder.clone());
    if let Err(e) = catalog.load_all() {
        eprintln!("Error loading TLEs from {}: {}", config.tle_folder.display(), e);
        return None;
    }
    Some(catalog.satellite(norad_id))
}

fn resolve_range(
    start: &TimeExpr,
    end: &TimeExpr,
    now: DateTime<Utc>,
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let resolved = start.resolve(now).zip(end.resolve(now));
    if resolved.is_none() {
        eprintln!("Time offset out of range");
    }
    resolved
}

fn print_json<T: Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error encoding output: {}", e);
            ExitCode::FAILURE
        }
    }
}
