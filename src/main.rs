use bus_beacon::config::Config;
use bus_beacon::position::VehicleId;
use bus_beacon::sync::FlushOutcome;
use bus_beacon::web::{run_server, AppState};
use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "bus-beacon")]
#[command(about = "Vehicle position agent")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a configuration file
    Validate { config: String },
    /// Run the agent and its control API
    Run {
        config: String,
        /// Start tracking this vehicle immediately
        #[arg(long)]
        vehicle: Option<String>,
    },
    /// Deliver everything in the pending queue once
    Flush { config: String },
    /// Show the pending queue and the last known position
    Pending { config: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { config } => validate(&config),
        Commands::Run { config, vehicle } => run(&config, vehicle).await,
        Commands::Flush { config } => flush(&config).await,
        Commands::Pending { config } => pending(&config),
    }
}

fn load(path: &str) -> Option<Config> {
    match Config::from_file(path) {
        Ok(config) => Some(config),
        Err(e) => {
            eprintln!("Error loading {}: {}", path, e);
            None
        }
    }
}

fn load_state(path: &str) -> Option<AppState> {
    let config = load(path)?;
    match AppState::from_config(&config) {
        Ok(state) => Some(state),
        Err(e) => {
            eprintln!("Error: {}", e);
            None
        }
    }
}

fn validate(path: &str) -> ExitCode {
    let Some(config) = load(path) else {
        return ExitCode::FAILURE;
    };

    println!("Configuration is valid");
    println!("  collector:    {}", config.collector.base_url);
    println!(
        "  queue:        {} entries, batches of {}",
        config.agent.queue_capacity, config.agent.batch_size
    );
    println!(
        "  send timeout: {}",
        humantime::format_duration(config.agent.send_timeout)
    );
    match &config.storage.path {
        Some(path) => println!("  storage:      {}", path.display()),
        None => println!("  storage:      in memory"),
    }
    match config.sync.interval {
        Some(interval) => println!("  auto flush:   every {}", humantime::format_duration(interval)),
        None => println!("  auto flush:   disabled"),
    }
    ExitCode::SUCCESS
}

async fn run(path: &str, vehicle: Option<String>) -> ExitCode {
    let Some(config) = load(path) else {
        return ExitCode::FAILURE;
    };

    match run_server(config, vehicle.map(VehicleId::new)).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn flush(path: &str) -> ExitCode {
    let Some(state) = load_state(path) else {
        return ExitCode::FAILURE;
    };

    match state.sync.flush().await {
        FlushOutcome::Completed { delivered } => {
            println!("Delivered {} pending positions", delivered);
            ExitCode::SUCCESS
        }
        FlushOutcome::Interrupted {
            delivered,
            remaining,
        } => {
            eprintln!(
                "Flush interrupted: {} delivered, {} still pending",
                delivered, remaining
            );
            ExitCode::FAILURE
        }
        FlushOutcome::Skipped => {
            eprintln!("Flush already in progress");
            ExitCode::FAILURE
        }
    }
}

fn pending(path: &str) -> ExitCode {
    let Some(state) = load_state(path) else {
        return ExitCode::FAILURE;
    };

    let status = state.reporter.snapshot();
    println!("{} positions pending", status.pending_count);
    if let Some((oldest, newest)) = state.reporter.pending_span() {
        println!("  oldest: {}", oldest);
        println!("  newest: {}", newest);
    }
    match state.reporter.last_position() {
        Some(p) => println!(
            "Last position: {} ({:.6}, {:.6}) at {}",
            p.vehicle_id, p.latitude, p.longitude, p.timestamp
        ),
        None => println!("No last position recorded"),
    }
    ExitCode::SUCCESS
}
