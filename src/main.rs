//! gcflow: host entry point for the GCxGC flow controller.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │  SimulatedDevice / DetachedDevice   SimClock / SystemClock   │
//! │  (DevicePort)                       (ClockPort)              │
//! │  TsvRunLog (RunLogSink)   LogEventSink   JsonConfigStore     │
//! │                                                              │
//! │  ──────────────── Port Trait Boundary ───────────────────    │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │             RunController (pure logic)                 │  │
//! │  │  FlowStrategy · RunState · TickSchedule                │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Ten simulated minutes of a triggered time-programmed run
//! gcflow run --mode time --program ramp.txt --trigger --simulate --ticks 600
//!
//! # Print pulse register values
//! gcflow pulse --period 6 --width 300
//!
//! # Write a default config file
//! gcflow -c gcflow.json config init
//! ```

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::Local;
use clap::{Parser, Subcommand, ValueEnum};
use log::{info, warn};

use gcflow::adapters::config_store::JsonConfigStore;
use gcflow::adapters::detached::DetachedDevice;
use gcflow::adapters::log_sink::LogEventSink;
use gcflow::adapters::run_log::TsvRunLog;
use gcflow::adapters::simulated::{OvenModel, SimulatedDevice};
use gcflow::adapters::time::{SimClock, SystemClock};
use gcflow::app::commands::AppCommand;
use gcflow::app::controller::{CancelHandle, RunController, StartOutcome};
use gcflow::app::ports::{ClockPort, ConfigPort, DevicePort};
use gcflow::app::record::{format_hms, format_minutes};
use gcflow::config::ControllerConfig;
use gcflow::control::flow::ControlMode;
use gcflow::control::pulse::{PulseParameters, PulseTiming};
use gcflow::error::CommandError;

/// GCxGC flow-rate and oven-cooling run controller
#[derive(Parser)]
#[command(name = "gcflow")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// JSON config file (defaults are used when it does not exist)
    #[arg(short, long, value_name = "FILE", default_value = "gcflow.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Manual,
    Time,
    Temp,
}

impl From<ModeArg> for ControlMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Manual => ControlMode::Manual,
            ModeArg::Time => ControlMode::TimeProgram,
            ModeArg::Temp => ControlMode::TempProgram,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Start a run and drive the control loop
    Run {
        #[arg(short, long, value_enum, default_value = "manual")]
        mode: ModeArg,

        /// Manual flow setpoint (L/min)
        #[arg(long, default_value = "1.0")]
        flow: f64,

        /// Time-program file, one flow value per line
        #[arg(long, value_name = "FILE")]
        program: Option<PathBuf>,

        /// Program step / update interval (seconds)
        #[arg(long)]
        interval: Option<f64>,

        /// Wait for the autosampler trigger before starting
        #[arg(long)]
        trigger: bool,

        /// Start the next triggered run automatically
        #[arg(long)]
        repeat: bool,

        /// Run length limit (minutes)
        #[arg(long)]
        max_minutes: Option<f64>,

        /// Oven must cool below this (°C) before the next run; (20, 250) enables cooling
        #[arg(long)]
        cooling_temp: Option<f64>,

        /// Pulse period (seconds, 1-20)
        #[arg(long)]
        pulse_period: Option<f64>,

        /// Pulse width (milliseconds, 100-1000)
        #[arg(long)]
        pulse_width: Option<f64>,

        /// Drive the simulated instrument on a simulated clock
        #[arg(long)]
        simulate: bool,

        /// Simulated trigger fires after this many polls
        #[arg(long, default_value = "5")]
        trigger_polls: u32,

        /// Stop after this many ticks (runs until the run stops otherwise)
        #[arg(long)]
        ticks: Option<u64>,

        /// Directory for run logs (overrides config)
        #[arg(long, value_name = "DIR")]
        log_dir: Option<PathBuf>,
    },

    /// Print the pulse register values for a period/width pair
    Pulse {
        #[arg(long, default_value = "6")]
        period: f64,

        #[arg(long, default_value = "300")]
        width: f64,
    },

    /// Inspect or create the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write the default configuration to the config path
    Init,
}

/// Run options after CLI parsing.
struct RunOptions {
    mode: ControlMode,
    flow: f64,
    program: Option<PathBuf>,
    interval: Option<f64>,
    trigger: bool,
    repeat: bool,
    max_minutes: Option<f64>,
    cooling_temp: Option<f64>,
    pulse_period: Option<f64>,
    pulse_width: Option<f64>,
    ticks: Option<u64>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let store = JsonConfigStore::new(&cli.config);

    match cli.command {
        Commands::Run {
            mode,
            flow,
            program,
            interval,
            trigger,
            repeat,
            max_minutes,
            cooling_temp,
            pulse_period,
            pulse_width,
            simulate,
            trigger_polls,
            ticks,
            log_dir,
        } => {
            let mut config = store
                .load()
                .with_context(|| format!("loading {}", cli.config.display()))?;
            if let Some(dir) = log_dir {
                config.log_dir = dir;
            }
            let opts = RunOptions {
                mode: mode.into(),
                flow,
                program,
                interval,
                trigger,
                repeat,
                max_minutes,
                cooling_temp,
                pulse_period,
                pulse_width,
                ticks,
            };
            run_controller(config, &opts, simulate, trigger_polls)
        }
        Commands::Pulse { period, width } => run_pulse(&store, period, width),
        Commands::Config { action } => run_config(&store, &action),
    }
}

fn run_controller(
    config: ControllerConfig,
    opts: &RunOptions,
    simulate: bool,
    trigger_polls: u32,
) -> Result<()> {
    let run_log = TsvRunLog::new(config.log_dir.clone());
    info!("RunLog: writing triggered runs to {}", run_log.dir().display());
    let run_log = Box::new(run_log);
    let events = Box::new(LogEventSink::new());
    let shutdown = CancelHandle::new();

    if simulate {
        let clock = SimClock::new(Local::now().naive_local());
        let device = SimulatedDevice::new(
            clock.clone(),
            config.calibration,
            OvenModel::default(),
            trigger_polls,
        );
        let period = config.tick_secs();
        let mut ctl = RunController::new(config, device, clock.clone(), run_log, events);
        install_interrupt(ctl.cancel_handle(), shutdown.clone())?;
        configure(&mut ctl, opts)?;
        drive(&mut ctl, opts.ticks, &shutdown, || clock.advance(period))
    } else {
        warn!("No acquisition unit driver available; running detached");
        let mut ctl = RunController::new(config, DetachedDevice, SystemClock::new(), run_log, events);
        install_interrupt(ctl.cancel_handle(), shutdown.clone())?;
        configure(&mut ctl, opts)?;
        drive(&mut ctl, opts.ticks, &shutdown, || {})
    }
}

/// Ctrl-C aborts a pending trigger wait and ends the drive loop, which
/// then flushes the run through `stop_all`.
fn install_interrupt(trigger: CancelHandle, shutdown: CancelHandle) -> Result<()> {
    ctrlc::set_handler(move || {
        warn!("Interrupted, stopping run");
        trigger.cancel();
        shutdown.cancel();
    })
    .context("installing Ctrl-C handler")
}

/// Apply the run options and start the run.
fn configure<D: DevicePort, C: ClockPort>(
    ctl: &mut RunController<D, C>,
    opts: &RunOptions,
) -> Result<()> {
    let mut commands = vec![AppCommand::SetMode(opts.mode)];
    if let Some(minutes) = opts.max_minutes {
        commands.push(AppCommand::SetMaxDuration(minutes * 60.0));
    }
    if let Some(temp) = opts.cooling_temp {
        commands.push(AppCommand::SetCoolingThreshold(temp));
    }
    if let Some(period) = opts.pulse_period {
        commands.push(AppCommand::SetPulsePeriod(period));
    }
    if let Some(width) = opts.pulse_width {
        commands.push(AppCommand::SetPulseWidth(width));
    }
    commands.push(AppCommand::SetRepeat(opts.repeat));
    match opts.mode {
        ControlMode::Manual => commands.push(AppCommand::SetFlowRate(opts.flow)),
        ControlMode::TimeProgram => {
            if let Some(path) = &opts.program {
                commands.push(AppCommand::LoadProgram(path.clone()));
            } else {
                warn!("No program file given; using the fallback program");
                commands.push(AppCommand::SetProgram(vec![1.0]));
            }
        }
        ControlMode::TempProgram => {}
    }
    if let Some(secs) = opts.interval {
        commands.push(AppCommand::SetTimeInterval(secs));
    }
    commands.push(AppCommand::Start {
        wait_for_trigger: opts.trigger,
        reset_time: true,
    });

    for cmd in commands {
        let label = format!("{cmd:?}");
        match ctl.handle_command(cmd) {
            Ok(()) => {}
            Err(e @ CommandError::Program(_)) => warn!("{label}: {e}"),
            Err(CommandError::NotStarted(StartOutcome::Cancelled)) => {
                info!("Trigger wait cancelled before the run started");
            }
            Err(e) => return Err(e).with_context(|| label),
        }
    }
    Ok(())
}

/// Drive the tick loop until the tick budget is spent, the run ends or
/// the process is interrupted.
fn drive<D: DevicePort, C: ClockPort>(
    ctl: &mut RunController<D, C>,
    ticks: Option<u64>,
    shutdown: &CancelHandle,
    mut step: impl FnMut(),
) -> Result<()> {
    let budget = ticks.unwrap_or(u64::MAX);
    let mut ran = 0;
    while ran < budget {
        if shutdown.is_cancelled() {
            info!("Stopping after {ran} ticks on interrupt");
            break;
        }
        step();
        if let Some(wait) = ctl.next_tick_in() {
            if wait > 0.0 {
                thread::sleep(Duration::from_secs_f64(wait));
            }
        }
        if ctl.poll() {
            ran += 1;
            print_status(ctl);
        }
        if !ctl.is_running() && !ctl.oven_is_cooling() {
            info!("Run finished after {ran} ticks");
            break;
        }
    }

    let path = ctl.stop_all().context("flushing run log")?;
    if let Some(path) = path {
        println!("Run log written to {}", path.display());
    }
    Ok(())
}

fn print_status<D: DevicePort, C: ClockPort>(ctl: &RunController<D, C>) {
    let temps: Vec<String> = ctl
        .temperatures()
        .iter()
        .map(|t| t.map_or_else(|| "--".to_string(), |v| format!("{v:.1}")))
        .collect();
    println!(
        "{} | {:>6} min | {:<17} | flow {:>5.2} L/min | T {}",
        format_hms(ctl.elapsed_secs()),
        format_minutes(ctl.elapsed_secs()),
        ctl.phase().name(),
        ctl.current_flow_rate(),
        temps.join(" / ")
    );
}

fn run_pulse(store: &JsonConfigStore, period: f64, width: f64) -> Result<()> {
    let config = store.load()?;
    let timing = PulseTiming::new(period, width)?;
    let params =
        PulseParameters::for_timing(timing, config.core_frequency_hz, config.clock_divisor)?;

    println!("Pulse timing");
    println!("  period:        {} s", timing.period_secs());
    println!("  width:         {} ms", timing.width_ms());
    println!("  clock divisor: {}", params.clock_divisor);
    println!("  roll value:    {}", params.roll_value);
    println!("  high count:    {}", params.high_count);
    println!("  duty cycle:    {:.2}%", params.duty_cycle() * 100.0);
    println!(
        "  output freq:   {:.4} Hz",
        params.output_frequency_hz(config.core_frequency_hz)
    );
    Ok(())
}

fn run_config(store: &JsonConfigStore, action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = store.load()?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigAction::Init => {
            if store.path().exists() {
                bail!("{} already exists", store.path().display());
            }
            store.save(&ControllerConfig::default())?;
            println!("Wrote {}", store.path().display());
        }
    }
    Ok(())
}
