//! Dome trajectory demo and configuration tool.
//!
//! Subcommands:
//! - `run`: follow a synthetic telescope track with a simulated dome
//! - `list`: list saved configuration sets
//! - `show`: print a configuration set
//! - `save`: write a configuration set to storage

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use dome::{
    ControlClock, ControlInput, ControlLoop, MockDome, MockDomeConfig, TrajectoryEvent,
};
use shared::{ConfigStorage, TrajectoryConfig, DEFAULT_CONFIG_NAME};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};
use trajectory::{wrap_angle, AlgorithmConfig, TelescopePose};

/// Telescope pose sample period for the synthetic track
const POSE_INTERVAL: Duration = Duration::from_millis(100);

/// Dome trajectory control tool
#[derive(Parser, Debug)]
#[command(name = "dome_trajectory")]
#[command(about = "Drive a telescope dome to follow the telescope azimuth")]
#[command(version)]
struct Args {
    /// Configuration directory (defaults to ~/.dome_config)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Follow a synthetic telescope track with a simulated dome
    Run {
        /// Configuration set to load
        #[arg(short, long, default_value = DEFAULT_CONFIG_NAME)]
        settings: String,

        /// How long to run, in seconds
        #[arg(short, long, default_value = "30")]
        duration: f64,

        /// Telescope starting azimuth (deg)
        #[arg(long, default_value = "0")]
        start_azimuth: f64,

        /// Telescope azimuth rate (deg/s)
        #[arg(long, default_value = "2.0")]
        rate: f64,

        /// Telescope elevation (deg)
        #[arg(long, default_value = "45")]
        elevation: f64,

        /// Dome slew rate (deg/s)
        #[arg(long, default_value = "3.0")]
        dome_velocity: f64,

        /// Leave following disabled (vignetting is still reported)
        #[arg(long)]
        no_follow: bool,

        /// Print events as JSON lines instead of log messages
        #[arg(long)]
        json: bool,
    },

    /// List saved configuration sets
    List,

    /// Print a configuration set
    Show {
        #[arg(default_value = DEFAULT_CONFIG_NAME)]
        name: String,
    },

    /// Save a configuration set
    Save {
        name: String,

        /// Copy settings from a JSON file instead of using defaults
        #[arg(long)]
        from: Option<PathBuf>,

        /// Override the simple algorithm's max delta azimuth (deg)
        #[arg(long)]
        max_delta_azimuth: Option<f64>,
    },
}

/// Validate the `--duration` argument.
fn run_duration(secs: f64) -> Result<Duration> {
    if !(secs.is_finite() && secs >= 0.0) {
        bail!("Duration must be a finite, non-negative number of seconds, got {secs}");
    }
    Duration::try_from_secs_f64(secs)
        .with_context(|| format!("Duration of {secs} seconds is too large"))
}

fn storage(config_dir: Option<PathBuf>) -> Result<ConfigStorage> {
    match config_dir {
        Some(path) => Ok(ConfigStorage::with_path(path)),
        None => ConfigStorage::new().context("Failed to locate configuration directory"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();
    let storage = storage(args.config_dir)?;

    match args.command {
        Command::Run {
            settings,
            duration,
            start_azimuth,
            rate,
            elevation,
            dome_velocity,
            no_follow,
            json,
        } => {
            let config = storage
                .load_or_default(&settings)
                .with_context(|| format!("Failed to load configuration {settings:?}"))?;
            let track = Track {
                start_azimuth,
                rate,
                elevation,
            };
            run(
                config,
                track,
                run_duration(duration)?,
                dome_velocity,
                !no_follow,
                json,
            )
            .await
        }
        Command::List => {
            for name in storage.list()? {
                println!("{name}");
            }
            Ok(())
        }
        Command::Show { name } => {
            let config = storage
                .load_or_default(&name)
                .with_context(|| format!("Failed to load configuration {name:?}"))?;
            println!("{}", config.to_json()?);
            Ok(())
        }
        Command::Save {
            name,
            from,
            max_delta_azimuth,
        } => {
            let mut config = match from {
                Some(path) => TrajectoryConfig::load_from_file(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                None => TrajectoryConfig::default(),
            };
            if let Some(max_delta) = max_delta_azimuth {
                config.simple = AlgorithmConfig::new(max_delta)?;
            }
            let path = storage.save(&name, &config)?;
            info!("Saved configuration {name:?} to {}", path.display());
            Ok(())
        }
    }
}

/// Constant-rate telescope azimuth track.
#[derive(Debug, Clone, Copy)]
struct Track {
    start_azimuth: f64,
    rate: f64,
    elevation: f64,
}

impl Track {
    fn pose_at(&self, clock: &ControlClock) -> TelescopePose {
        let timestamp = clock.now();
        let azimuth = wrap_angle(self.start_azimuth + self.rate * timestamp.as_secs_f64());
        TelescopePose::new(azimuth, self.elevation, timestamp)
    }
}

async fn run(
    config: TrajectoryConfig,
    track: Track,
    duration: Duration,
    dome_velocity: f64,
    follow: bool,
    json: bool,
) -> Result<()> {
    let clock = ControlClock::start();
    let (input_tx, input_rx) = mpsc::channel(64);
    let (event_tx, event_rx) = broadcast::channel(256);

    let (commander, dome_task) = MockDome::new(MockDomeConfig {
        velocity_deg_per_s: dome_velocity,
        ..Default::default()
    })
    .spawn(clock, input_tx.clone());
    let ready = commander.ready_signal();

    let control = ControlLoop::new(config.build_controller(), commander, event_tx)
        .with_algorithm_config(config.algorithm_config_json())
        .with_command_timeout(config.command_timeout);
    let control_handle = tokio::spawn(control.run(input_rx, ready));
    let event_handle = tokio::spawn(report_events(event_rx, json));

    if follow {
        input_tx.send(ControlInput::SetFollowing(true)).await?;
    }

    let mut ticker = tokio::time::interval(POSE_INTERVAL);
    let deadline = tokio::time::sleep(duration);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
            _ = ticker.tick() => {
                match input_tx.try_send(ControlInput::TelescopePose(track.pose_at(&clock))) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        debug!("Dropping telescope pose; input queue full")
                    }
                    Err(TrySendError::Closed(_)) => {
                        warn!("Control loop stopped early");
                        break;
                    }
                }
            }
        }
    }

    // Closing every input sender ends the control loop
    drop(input_tx);
    drop(dome_task);

    let controller = control_handle.await??;
    event_handle.await?;

    info!(
        "Finished: following={}, vignetting={}, outstanding={:?}",
        controller.is_enabled(),
        controller.vignetting(),
        controller.outstanding_command()
    );
    if let (Some(pose), Some(dome)) = (
        controller.last_telescope_pose(),
        controller.last_dome_status(),
    ) {
        info!(
            "Telescope az {:.2} deg, dome az {:.2} deg",
            pose.azimuth_deg, dome.azimuth_deg
        );
    }
    Ok(())
}

async fn report_events(mut events: broadcast::Receiver<TrajectoryEvent>, json: bool) {
    loop {
        match events.recv().await {
            Ok(event) => {
                if json {
                    match serde_json::to_string(&event) {
                        Ok(line) => println!("{line}"),
                        Err(e) => warn!("Failed to serialize event: {e}"),
                    }
                } else {
                    info!("{event:?}");
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!("Event reporter lagged by {n} events")
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_duration() {
        assert_eq!(run_duration(0.0).unwrap(), Duration::ZERO);
        assert_eq!(run_duration(2.5).unwrap(), Duration::from_millis(2500));
        for bad in [-1.0, f64::NAN, f64::INFINITY, 1e300] {
            assert!(run_duration(bad).is_err(), "{bad}");
        }
    }
}
