//! gf - grantflow CLI
//!
//! Request accessibility access from a terminal and inspect what the
//! dependent service was told.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use grantflow::host::{Receiver, Sender};
use grantflow::prelude::*;
use grantflow::{
    config, decide, ConfigSnapshot, FlowDecision, LaunchError, PlatformTraits, Resolution, Settings,
};

#[derive(Parser)]
#[command(name = "gf")]
#[command(about = "grantflow - request accessibility access and report the outcome")]
#[command(version)]
struct Cli {
    /// Tracing filter, e.g. "debug" or "grantflow_core=trace". Falls back to RUST_LOG.
    #[arg(long, global = true)]
    log_level: Option<String>,
    /// Settings directory (default ~/.grantflow)
    #[arg(long, global = true)]
    dir: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the permission flow
    Request {
        /// Do not notify the dependent service
        #[arg(long)]
        no_service: bool,
        /// Override the stored view-only setting
        #[arg(long)]
        view_only: Option<bool>,
        /// Report `granted: false` instead of waiting when no settings screen opens
        #[arg(long)]
        report_launch_failure: bool,
        /// Where the outcome goes
        #[arg(long, value_enum, default_value = "spool")]
        sink: Sink,
        /// Identifier highlighted in the accessibility list where supported
        #[arg(long, default_value = grantflow::flow::DEFAULT_APP_ID)]
        app_id: String,
    },
    /// Show current access and what a request would ask for
    Status,
    /// Read or change stored settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// List outcomes delivered to the spool
    Outcomes {
        #[arg(long)]
        clear: bool,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    Show,
    Set { key: String, value: String },
    Unset { key: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum Sink {
    Spool,
    Stdout,
}

#[derive(Serialize)]
struct Output<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<Error>,
}

impl<T: Serialize> Output<T> {
    fn ok(data: T) -> Self {
        Self { success: true, data: Some(data), error: None }
    }
    fn err(e: Error) -> Output<()> {
        Output { success: false, data: None, error: Some(e) }
    }
}

fn print_json<T: Serialize>(output: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(output)?);
    Ok(())
}

fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(l) => EnvFilter::try_new(l).ok(),
        None => EnvFilter::try_from_default_env().ok(),
    }
    .unwrap_or_else(|| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

// ── Terminal collaborators ──────────────────────────────────────────────────

/// What the flow thread wants the terminal to show
enum UiEvent {
    Consent(Prompt),
    Fallback(String),
    Navigating(SettingsScreen),
}

/// Consent prompts are rendered by the main thread, which owns stdin
struct TerminalConsent {
    tx: Sender<UiEvent>,
}

impl ConsentUi for TerminalConsent {
    fn ask(&self, prompt: Prompt) {
        let _ = self.tx.send(UiEvent::Consent(prompt));
    }

    fn offer_fallback(&self, notice: &str) {
        let _ = self.tx.send(UiEvent::Fallback(notice.to_string()));
    }
}

/// System navigator that also tells the terminal a screen is open
struct WatchedNavigator {
    inner: SystemNavigator,
    tx: Sender<UiEvent>,
}

impl SettingsNavigator for WatchedNavigator {
    fn resolve(&self, screen: &SettingsScreen) -> Resolution {
        self.inner.resolve(screen)
    }

    fn launch(&self, screen: &SettingsScreen) -> std::result::Result<(), LaunchError> {
        self.inner.launch(screen)?;
        let _ = self.tx.send(UiEvent::Navigating(screen.clone()));
        Ok(())
    }
}

fn read_line() -> Result<String> {
    let mut line = String::new();
    let n = io::stdin().lock().read_line(&mut line)?;
    if n == 0 {
        bail!("stdin closed");
    }
    Ok(line.trim().to_lowercase())
}

/// Non-cancelable: keeps asking until it gets an answer
fn ask_yes_no(question: &str) -> Result<bool> {
    loop {
        print!("{} [y/n] ", question);
        io::stdout().flush()?;
        match read_line()?.as_str() {
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            _ => continue,
        }
    }
}

// ── Main ────────────────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    let dir = cli.dir.clone();
    let result: Result<()> = match cli.command {
        Commands::Request { no_service, view_only, report_launch_failure, sink, app_id } => {
            let request = FlowRequest {
                suppress_service_start: no_service,
                view_only_override: view_only,
            };
            request_access(dir.as_deref(), request, report_launch_failure, sink, &app_id)
        }
        Commands::Status => status(dir.as_deref()),
        Commands::Config { action } => config_cmd(dir.as_deref(), action),
        Commands::Outcomes { clear } => outcomes(dir.as_deref(), clear),
    };

    if let Err(e) = result {
        let err = match e.downcast::<Error>() {
            Ok(err) => err,
            Err(other) => Error::new(ErrorCode::Unknown, format!("{:#}", other)),
        };
        let _ = print_json(&Output::<()>::err(err));
        std::process::exit(1);
    }
}

fn store(dir: Option<&str>) -> Result<JsonConfigStore> {
    Ok(match dir {
        Some(d) => JsonConfigStore::with_dir(d)?,
        None => JsonConfigStore::new()?,
    })
}

fn spool(dir: Option<&str>) -> Result<OutcomeSpool> {
    match dir {
        Some(d) => OutcomeSpool::with_dir(d),
        None => OutcomeSpool::new(),
    }
}

fn request_access(
    dir: Option<&str>,
    request: FlowRequest,
    report_launch_failure: bool,
    sink: Sink,
    app_id: &str,
) -> Result<()> {
    let store = store(dir)?;
    let defaults = store.defaults()?;
    let service: Arc<dyn DependentService> = match sink {
        Sink::Spool => Arc::new(SpoolService::new(spool(dir)?)),
        Sink::Stdout => Arc::new(StdoutService),
    };

    let (tx, ui_rx) = crossbeam_channel::unbounded::<UiEvent>();
    let controller = FlowController::new(Collaborators {
        status: Arc::new(SystemStatus),
        config: Arc::new(store),
        consent: Arc::new(TerminalConsent { tx: tx.clone() }),
        navigator: Arc::new(WatchedNavigator { inner: SystemNavigator, tx }),
        service,
    })
    .defaults(defaults)
    .app_id(app_id)
    .report_launch_failure(report_launch_failure);

    // Tearing the host down discards the flow; no outcome is reported.
    ctrlc::set_handler(|| {
        eprintln!("\nCancelled, no outcome reported");
        std::process::exit(130);
    })?;

    tracing::debug!(?request, "starting flow");
    let handle = FlowDriver::spawn(controller, request)?;
    let end = run_terminal(&handle, &ui_rx)?;

    match end.outcome() {
        Some(outcome) => {
            let access = if outcome.granted { "granted" } else { "not granted" };
            eprintln!("Accessibility access {}", access);
        }
        None => eprintln!("Flow ended without an outcome"),
    }
    Ok(())
}

fn run_terminal(handle: &FlowHandle, ui_rx: &Receiver<UiEvent>) -> Result<FlowEnd> {
    loop {
        if let Some(end) = handle.try_end() {
            return Ok(end);
        }
        let event = match ui_rx.recv_timeout(Duration::from_millis(50)) {
            Ok(e) => e,
            Err(_) => continue,
        };
        match event {
            UiEvent::Consent(prompt) => {
                eprintln!("{}\n\n{}\n", prompt.title(), prompt.message());
                let answer = if ask_yes_no("Continue?")? {
                    ConsentAnswer::Accept
                } else {
                    ConsentAnswer::Decline
                };
                handle.send(FlowMessage::Consent(answer));
            }
            UiEvent::Fallback(notice) => {
                eprintln!("{}", notice);
                let message = if ask_yes_no("Open settings?")? {
                    FlowMessage::FallbackAcknowledged
                } else {
                    FlowMessage::FallbackDismissed
                };
                handle.send(message);
            }
            UiEvent::Navigating(screen) => {
                print!("Opened {} settings. Press Enter when done... ", screen.name());
                io::stdout().flush()?;
                read_line()?;
                handle.send(FlowMessage::NavigationFinished);
            }
        }
    }
}

#[derive(Serialize)]
struct StatusReport {
    accessibility: bool,
    settings: ConfigSnapshot,
    decision: FlowDecision,
}

fn status(dir: Option<&str>) -> Result<()> {
    let store = store(dir)?;
    let defaults = store.defaults()?;
    let snapshot = ConfigSnapshot::read(&store, &defaults);
    let decision = decide(&FlowRequest::new(), &snapshot, PlatformTraits::current());
    print_json(&Output::ok(StatusReport {
        accessibility: grantflow::has_accessibility(),
        settings: snapshot,
        decision,
    }))
}

fn config_cmd(dir: Option<&str>, action: ConfigAction) -> Result<()> {
    let store = store(dir)?;
    let mut settings = store.load()?;
    match action {
        ConfigAction::Show => {
            let defaults = store.defaults()?;
            return print_json(&Output::ok(serde_json::json!({
                "path": store.settings_path(),
                "settings": settings,
                "defaults": defaults,
                "access_key": !config::access_key(&store, &defaults).is_empty(),
            })));
        }
        ConfigAction::Set { key, value } => apply(&mut settings, &key, Some(&value))?,
        ConfigAction::Unset { key } => apply(&mut settings, &key, None)?,
    }
    store.save(&settings)?;
    print_json(&Output::ok(&settings))
}

fn apply(settings: &mut Settings, key: &str, value: Option<&str>) -> Result<()> {
    let parse_bool = |v: &str| -> Result<bool> {
        v.parse().with_context(|| format!("'{}' is not true/false", v))
    };
    match key {
        "view_only" => settings.view_only = value.map(parse_bool).transpose()?,
        "start_on_boot" => settings.start_on_boot = value.map(parse_bool).transpose()?,
        "access_key" => settings.access_key = value.map(str::to_string),
        _ => {
            return Err(Error::new(ErrorCode::ConfigInvalid, format!("Unknown setting '{}'", key))
                .with_suggestions(vec![
                    "view_only".to_string(),
                    "start_on_boot".to_string(),
                    "access_key".to_string(),
                ])
                .into())
        }
    }
    Ok(())
}

fn outcomes(dir: Option<&str>, clear: bool) -> Result<()> {
    let spool = spool(dir)?;
    if clear {
        spool.clear()?;
        return print_json(&Output::ok(Vec::<ServiceMessage>::new()));
    }
    print_json(&Output::ok(spool.load()?))
}
