//! input-doctor - health checks and a scripted demo for the input pipeline

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use inputflow::config::InputSettings;
use inputflow::health::fixtures::{self, GAMEPAD_FORMAT, GamepadState};
use inputflow::health::{self, print_report};
use inputflow::prelude::*;

#[derive(Parser, Debug)]
#[command(name = "input-doctor")]
#[command(version, about = "Checks an inputflow setup", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Settings profile (defaults to INPUT_PROFILE, then "release")
    #[arg(short, long)]
    profile: Option<String>,

    /// Print per-check details
    #[arg(short, long)]
    details: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the health check suite (default)
    Check,
    /// Drive a demo gamepad through a few frames and print action changes
    Demo {
        /// Frames per second of the simulated frame loop
        #[arg(long, default_value = "60")]
        fps: u32,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let settings = match &cli.profile {
        Some(profile) => InputSettings::load(profile),
        None => InputSettings::load_from_env(),
    }
    .context("Failed to load input settings")?;

    match cli.command.unwrap_or(Commands::Check) {
        Commands::Check => {
            let report = health::run_all_checks(settings);
            print_report(&report, cli.details);
            std::process::exit(report.exit_code());
        }
        Commands::Demo { fps } => run_demo(settings, fps),
    }
}

fn run_demo(settings: InputSettings, fps: u32) -> Result<()> {
    let mut system = InputSystem::new(settings);
    system.add_listener(Box::new(EventLog::new()));
    let pad = system.add_device(fixtures::gamepad("pad1"));
    system.add_action_map(fixtures::gameplay_map())?;
    system.enable_map("gameplay")?;

    let frame = 1.0 / f64::from(fps.max(1));
    let script = [
        GamepadState::SOUTH,
        0,
        GamepadState::EAST,
        GamepadState::EAST,
        GamepadState::EAST | GamepadState::DPAD_UP,
        0,
    ];

    let mut driver = FrameDriver::new();
    let mut events = InputEventBuffer::new();
    for buttons in script {
        let time = driver.time() + frame;
        let state = GamepadState::with_buttons(buttons);
        events.push_state(pad, time, GAMEPAD_FORMAT, state.as_bytes());
        // Each script step lasts 16 frames
        for _ in 0..16 {
            driver.advance(&mut system, &mut events, frame);
        }
    }

    let log = system
        .listener::<EventLog>()
        .context("Event log listener missing")?;
    for (action, phase, time) in log.phases() {
        println!("{time:>8.3}s  {action:<8} {phase}");
    }
    Ok(())
}
