//! TPG26x CLI - Command-line interface
//!
//! Reads a Pfeiffer TPG 261 / TPG 262 controller over a serial port, or a
//! simulated one when no hardware is attached.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tpg26x_core::cli::{
    print_exit_codes, render_dual_reading, render_identity, render_info, render_reading,
    render_sample, CliResult, ExitCodes, OutputFormat,
};
use tpg26x_core::config::{self, AppConfig, ConfigError, LoggingConfig};
use tpg26x_core::core::controller::{Channels, GaugeController};
use tpg26x_core::core::gauge::PressureGauge;
use tpg26x_core::core::history::{Sample, SampleWindow};
use tpg26x_core::core::logger::{generate_log_filename, LogFormat, SampleLogger};
use tpg26x_core::core::protocol::ProtocolError;
use tpg26x_core::core::simulator::SimulatedGauge;
use tpg26x_core::core::transport::list_ports;
use tracing_subscriber::EnvFilter;

/// TPG26x CLI
#[derive(Parser, Debug)]
#[command(
    name = "tpg26x-cli",
    version,
    about = "Pfeiffer TPG 26x vacuum gauge controller utility",
    long_about = None
)]
struct Cli {
    /// Serial port name (e.g., COM3, /dev/ttyUSB0)
    #[arg(short, long, global = true, env = "TPG26X_PORT")]
    port: Option<String>,

    /// Baud rate (9600, 19200, 38400)
    #[arg(short, long, global = true)]
    baud: Option<u32>,

    /// Read timeout in milliseconds
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Controller channels (single, dual)
    #[arg(long, global = true)]
    channels: Option<Channels>,

    /// Use the simulated controller
    #[arg(long, global = true)]
    simulate: bool,

    /// Fail instead of falling back to the simulated controller
    #[arg(long, global = true)]
    no_fallback: bool,

    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, global = true, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List available serial ports
    ListPorts,

    /// Show firmware version, gauge types and pressure unit
    Info,

    /// Read the pressure of one gauge
    Read {
        /// Gauge number (1 or 2)
        #[arg(short, long)]
        gauge: Option<u8>,
    },

    /// Read the pressure of both gauges
    ReadBoth,

    /// Run the RS232 loopback test
    LoopbackTest,

    /// Poll one gauge periodically until Ctrl+C
    Monitor {
        /// Gauge number (1 or 2)
        #[arg(short, long)]
        gauge: Option<u8>,

        /// Poll interval in milliseconds
        #[arg(short, long)]
        interval_ms: Option<u64>,

        /// Stop after this many polls
        #[arg(short = 'n', long)]
        count: Option<u64>,

        /// Append samples to this file (.csv, .jsonl or text)
        #[arg(short, long)]
        log: Option<PathBuf>,
    },

    /// Configuration file management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Print the exit code table
    ExitCodes,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the config file path
    Path,
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::from(ExitCodes::CONFIG_ERROR);
        }
    };

    let _guard = init_tracing(&cli, &config.logging);
    tracing::debug!("Starting tpg26x-cli v{}", tpg26x_core::VERSION);

    let result = match run(&cli, &config) {
        Ok(result) => result,
        Err(err) => error_result(&err),
    };

    match &result {
        CliResult::Success(Some(msg)) => println!("{msg}"),
        CliResult::Error(code, msg) => {
            tracing::error!(code, "{msg}");
            if !cli.quiet {
                eprintln!("Error: {msg}");
            }
        }
        CliResult::Success(None) => {}
    }
    result.to_exit_code()
}

fn error_result(err: &anyhow::Error) -> CliResult {
    if let Some(e) = err.downcast_ref::<ProtocolError>() {
        let code = CliResult::from(e).code();
        CliResult::error(code, format!("{err:#}"))
    } else if err.downcast_ref::<ConfigError>().is_some() {
        CliResult::error(ExitCodes::CONFIG_ERROR, format!("{err:#}"))
    } else if let Some(e) = err.downcast_ref::<std::io::Error>() {
        let code = CliResult::from(std::io::Error::from(e.kind())).code();
        CliResult::error(code, format!("{err:#}"))
    } else {
        CliResult::error(ExitCodes::ERROR, format!("{err:#}"))
    }
}

/// Load the config file and apply command-line overrides
fn load_config(cli: &Cli) -> Result<AppConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };

    let conn = &mut config.connection;
    if let Some(port) = &cli.port {
        conn.port.clone_from(port);
    }
    if let Some(baud) = cli.baud {
        conn.baud_rate = baud;
    }
    if let Some(timeout) = cli.timeout_ms {
        conn.timeout_ms = timeout;
    }
    if let Some(channels) = cli.channels {
        conn.channels = channels;
    }
    conn.simulate |= cli.simulate;
    if cli.no_fallback {
        conn.fallback_to_simulator = false;
    }

    config.validate()?;
    Ok(config)
}

fn init_tracing(
    cli: &Cli,
    logging: &LoggingConfig,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else if cli.quiet {
        EnvFilter::new("warn")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level))
    };

    match (&logging.directory, logging.enabled) {
        (Some(dir), true) => {
            let appender = tracing_appender::rolling::daily(dir, "tpg26x.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let builder = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false);
            if logging.format == LogFormat::Json {
                builder.json().init();
            } else {
                builder.init();
            }
            Some(guard)
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
            None
        }
    }
}

fn run(cli: &Cli, config: &AppConfig) -> anyhow::Result<CliResult> {
    match &cli.command {
        Commands::ListPorts => list_serial_ports(cli),
        Commands::Info => with_gauge(config, |gauge| show_info(cli, gauge)),
        Commands::Read { gauge } => {
            let which = gauge.unwrap_or(config.monitor.gauge);
            with_gauge(config, |g| read_gauge(cli, g, which))
        }
        Commands::ReadBoth => with_gauge(config, |g| read_both(cli, g)),
        Commands::LoopbackTest => with_gauge(config, loopback_test),
        Commands::Monitor {
            gauge,
            interval_ms,
            count,
            log,
        } => {
            let options = MonitorOptions {
                gauge: gauge.unwrap_or(config.monitor.gauge),
                interval: Duration::from_millis(interval_ms.unwrap_or(config.monitor.interval_ms)),
                count: *count,
                log: log.clone(),
            };
            with_gauge(config, |g| monitor(cli, config, g, &options))
        }
        Commands::Config { action } => handle_config(cli, config, action),
        Commands::ExitCodes => {
            print_exit_codes();
            Ok(CliResult::success())
        }
    }
}

/// Open the configured controller, falling back to the simulated one if allowed
fn open_gauge(config: &AppConfig) -> anyhow::Result<Box<dyn PressureGauge>> {
    let conn = &config.connection;
    if conn.simulate {
        tracing::info!("Using simulated controller");
        return Ok(Box::new(SimulatedGauge::new(config.simulator, conn.channels)));
    }

    tracing::debug!(port = %conn.port, baud = conn.baud_rate, "Opening controller");
    match GaugeController::open_serial(conn.serial_config(), conn.channels) {
        Ok(controller) => Ok(Box::new(controller.with_drain_limit(conn.drain_limit))),
        Err(e) if conn.fallback_to_simulator => {
            tracing::warn!(
                port = %conn.port,
                error = %e,
                "No instrument available, falling back to simulated controller"
            );
            Ok(Box::new(SimulatedGauge::new(config.simulator, conn.channels)))
        }
        Err(e) => Err(e).with_context(|| format!("Failed to open {}", conn.port)),
    }
}

/// Run `f` against an open gauge and close it afterwards
fn with_gauge<F>(config: &AppConfig, f: F) -> anyhow::Result<CliResult>
where
    F: FnOnce(&mut dyn PressureGauge) -> anyhow::Result<CliResult>,
{
    let mut gauge = open_gauge(config)?;
    tracing::debug!("Connected: {}", gauge.description());
    let result = f(gauge.as_mut());
    if let Err(e) = gauge.close() {
        tracing::warn!(error = %e, "Failed to close controller");
    }
    result
}

fn list_serial_ports(cli: &Cli) -> anyhow::Result<CliResult> {
    let ports = list_ports()?;

    if ports.is_empty() {
        if !cli.quiet {
            eprintln!("No serial ports found.");
        }
        return Ok(CliResult::success());
    }

    match cli.format {
        OutputFormat::Json => {
            let json: Vec<serde_json::Value> = ports
                .iter()
                .map(|p| {
                    serde_json::json!({
                        "name": p.port_name,
                        "type": format!("{:?}", p.port_type)
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Csv => {
            println!("name,type");
            for port in &ports {
                println!("{},{:?}", port.port_name, port.port_type);
            }
        }
        OutputFormat::Text => {
            for port in &ports {
                println!("{} [{:?}]", port.port_name, port.port_type);
            }
        }
    }

    Ok(CliResult::success())
}

fn show_info(cli: &Cli, gauge: &mut dyn PressureGauge) -> anyhow::Result<CliResult> {
    let firmware = gauge.program_number()?;
    let ids = gauge.identify()?;
    let unit = gauge.unit()?;
    Ok(CliResult::success_with_message(render_info(
        &firmware, &ids, unit, cli.format,
    )))
}

fn read_gauge(cli: &Cli, gauge: &mut dyn PressureGauge, which: u8) -> anyhow::Result<CliResult> {
    let unit = gauge.unit()?;
    let reading = gauge.read_gauge(which)?;
    if !reading.is_okay() {
        tracing::warn!(gauge = which, "Gauge status: {}", reading.status_text());
    }
    Ok(CliResult::success_with_message(render_reading(
        which, &reading, unit, cli.format,
    )))
}

fn read_both(cli: &Cli, gauge: &mut dyn PressureGauge) -> anyhow::Result<CliResult> {
    let unit = gauge.unit()?;
    let dual = gauge.read_both()?;
    for (which, reading) in [(1, &dual.gauge1), (2, &dual.gauge2)] {
        if !reading.is_okay() {
            tracing::warn!(gauge = which, "Gauge status: {}", reading.status_text());
        }
    }
    Ok(CliResult::success_with_message(render_dual_reading(
        &dual, unit, cli.format,
    )))
}

fn loopback_test(gauge: &mut dyn PressureGauge) -> anyhow::Result<CliResult> {
    if gauge.loopback_test()? {
        Ok(CliResult::success_with_message("RS232 loopback test passed"))
    } else {
        Ok(CliResult::error(
            ExitCodes::LOOPBACK_FAILED,
            "RS232 loopback test failed: echo mismatch",
        ))
    }
}

struct MonitorOptions {
    gauge: u8,
    interval: Duration,
    count: Option<u64>,
    log: Option<PathBuf>,
}

fn log_format_for(path: &Path, fallback: LogFormat) -> LogFormat {
    match path.extension().and_then(|e| e.to_str()) {
        Some("csv") => LogFormat::Csv,
        Some("jsonl" | "json") => LogFormat::Json,
        Some("txt" | "log") => LogFormat::Text,
        _ => fallback,
    }
}

fn open_sample_log(config: &AppConfig, options: &MonitorOptions) -> anyhow::Result<SampleLogger> {
    let mut logger = SampleLogger::new();
    let target = match (&options.log, &config.logging.directory) {
        (Some(path), _) => Some(path.clone()),
        (None, Some(dir)) if config.logging.enabled => {
            std::fs::create_dir_all(dir)?;
            Some(dir.join(generate_log_filename("pressure", config.logging.format)))
        }
        _ => None,
    };
    if let Some(path) = target {
        let format = log_format_for(&path, config.logging.format);
        logger
            .start(&path, format)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        tracing::info!(path = %path.display(), "Logging samples");
    }
    Ok(logger)
}

fn monitor(
    cli: &Cli,
    config: &AppConfig,
    gauge: &mut dyn PressureGauge,
    options: &MonitorOptions,
) -> anyhow::Result<CliResult> {
    let unit = gauge.unit()?;
    let mut window = SampleWindow::new(config.monitor.window);
    let mut logger = open_sample_log(config, options)?;

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    if !cli.quiet {
        eprintln!(
            "Monitoring gauge {} every {} ms. Press Ctrl+C to stop.",
            options.gauge,
            options.interval.as_millis()
        );
    }

    let mut index = 0u64;
    while running.load(Ordering::SeqCst) {
        if options.count.is_some_and(|count| index >= count) {
            break;
        }
        let tick = Instant::now();

        match gauge.read_gauge(options.gauge) {
            Ok(reading) => {
                if !reading.is_okay() {
                    tracing::warn!(gauge = options.gauge, "Gauge status: {}", reading.status_text());
                }
                let sample = Sample::now(index, options.gauge, reading);
                window.push(sample);
                logger.log_sample(&sample)?;
                println!("{}", render_sample(&sample, &window, unit, cli.format));
            }
            Err(e @ ProtocolError::InvalidArgument(_)) => return Err(e.into()),
            Err(e) => {
                tracing::warn!(error = %e, "Did not record pressure data.");
                window.record_failure();
                logger.log_failure(index, options.gauge, &e.to_string())?;
            }
        }
        index += 1;

        while running.load(Ordering::SeqCst) && tick.elapsed() < options.interval {
            std::thread::sleep(Duration::from_millis(50).min(options.interval));
        }
    }

    logger.stop();
    let summary = match window.value_range() {
        Some((min, max)) => format!(
            "{} polls, {} failed, {} in window, min {:.4e} max {:.4e} {}",
            index,
            window.failures(),
            window.len(),
            min,
            max,
            unit
        ),
        None => format!("{} polls, {} failed", index, window.failures()),
    };
    if !cli.quiet {
        eprintln!("{summary}");
    }
    Ok(CliResult::success())
}

fn handle_config(cli: &Cli, config: &AppConfig, action: &ConfigAction) -> anyhow::Result<CliResult> {
    let path = match &cli.config {
        Some(path) => path.clone(),
        None => config::config_path().ok_or(ConfigError::NoConfigDir)?,
    };
    match action {
        ConfigAction::Show => {
            let text = toml::to_string_pretty(config).map_err(ConfigError::from)?;
            Ok(CliResult::success_with_message(text.trim_end().to_string()))
        }
        ConfigAction::Path => Ok(CliResult::success_with_message(path.display().to_string())),
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                return Ok(CliResult::error(
                    ExitCodes::CONFIG_ERROR,
                    format!("{} already exists (use --force)", path.display()),
                ));
            }
            config::init_directories()?;
            AppConfig::default().save_to(&path)?;
            Ok(CliResult::success_with_message(format!(
                "Wrote {}",
                path.display()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_monitor() {
        let cli = Cli::parse_from([
            "tpg26x-cli",
            "--simulate",
            "monitor",
            "-g",
            "2",
            "-n",
            "5",
            "--format",
            "json",
        ]);
        assert!(cli.simulate);
        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command {
            Commands::Monitor { gauge, count, .. } => {
                assert_eq!(gauge, Some(2));
                assert_eq!(count, Some(5));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_log_format_from_extension() {
        assert_eq!(log_format_for(Path::new("a.csv"), LogFormat::Text), LogFormat::Csv);
        assert_eq!(log_format_for(Path::new("a.jsonl"), LogFormat::Text), LogFormat::Json);
        assert_eq!(log_format_for(Path::new("a"), LogFormat::Csv), LogFormat::Csv);
    }

    #[test]
    fn test_error_result_maps_protocol_errors() {
        let err = anyhow::Error::new(ProtocolError::NegativeAcknowledge).context("reading gauge");
        assert_eq!(error_result(&err).code(), ExitCodes::NEGATIVE_ACKNOWLEDGE);

        let err = anyhow::anyhow!("something else");
        assert_eq!(error_result(&err).code(), ExitCodes::ERROR);
    }
}
