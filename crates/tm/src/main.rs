//! tm - touchmacro CLI
//!
//! Author, import and replay touch macros. Every command prints one JSON
//! envelope on stdout; logs go to stderr.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use crossbeam_channel::{bounded, select};
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use touchmacro::action::{self, RejectedLine};
use touchmacro::prelude::*;
use touchmacro::{AdbDispatcher, DryRunDispatcher};

#[derive(Parser)]
#[command(name = "tm")]
#[command(about = "touchmacro - author, import and replay touch macros")]
#[command(version)]
struct Cli {
    /// Macro store directory [default: $TOUCHMACRO_HOME or ~/.touchmacro]
    #[arg(long, global = true)]
    dir: Option<PathBuf>,
    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    // === Library ===
    /// List stored macros
    List,
    /// Show one macro with its commands
    Show { id: String },
    /// Create a macro from command lines
    Add {
        #[arg(short, long)]
        name: String,
        #[command(flatten)]
        source: CommandSource,
    },
    /// Replace a macro's name and/or commands
    Edit {
        id: String,
        #[arg(short, long)]
        name: Option<String>,
        #[command(flatten)]
        source: CommandSource,
    },
    /// Delete a macro (clears the selection if it pointed there)
    Delete { id: String },
    /// Select the macro `run` uses by default
    Select {
        id: Option<String>,
        #[arg(long, conflicts_with = "id")]
        clear: bool,
    },

    // === Recordings ===
    /// Decode a recording and store it as a macro
    Import {
        file: PathBuf,
        /// Overrides the name stored in the recording
        #[arg(short, long)]
        name: Option<String>,
        /// Select the imported macro
        #[arg(long)]
        select: bool,
        /// Decode and print without storing
        #[arg(long)]
        preview: bool,
        #[command(flatten)]
        decode: DecodeArgs,
    },
    /// Look for .mmor recordings
    Scan {
        /// Extra directories to search recursively
        #[arg(long = "root")]
        roots: Vec<PathBuf>,
        /// Skip the built-in emulator locations
        #[arg(long)]
        no_defaults: bool,
    },

    // === Playback ===
    /// Run a macro (the selected one if no id is given)
    Run {
        id: Option<String>,
        #[command(flatten)]
        playback: PlaybackArgs,
    },
}

#[derive(Args)]
struct CommandSource {
    /// One command line, e.g. `tap,100,200` (repeatable)
    #[arg(short = 'c', long = "command")]
    commands: Vec<String>,
    /// Read command lines from a file (`-` for stdin)
    #[arg(short, long)]
    file: Option<PathBuf>,
}

#[derive(Args)]
struct DecodeArgs {
    /// Target screen width in pixels
    #[arg(long, default_value = "1920")]
    width: u32,
    /// Target screen height in pixels
    #[arg(long, default_value = "1080")]
    height: u32,
    /// How the recording expresses positions: short-side | per-axis
    #[arg(long, default_value = "short-side")]
    space: CoordinateSpace,
    /// Shortest timestamp gap that becomes a delay
    #[arg(long, default_value = "5")]
    min_delay: u64,
}

#[derive(Args)]
struct PlaybackArgs {
    /// Log gestures instead of sending them to a device
    #[arg(long)]
    dry_run: bool,
    /// With --dry-run, wait out each gesture's duration
    #[arg(long, requires = "dry_run")]
    realtime: bool,
    /// adb device serial
    #[arg(long)]
    device: Option<String>,
    /// adb binary
    #[arg(long, default_value = "adb")]
    adb: PathBuf,
    /// Pause after each gesture completes
    #[arg(long, default_value = "50")]
    settle_ms: u64,
    /// Press duration of a tap
    #[arg(long, default_value = "100")]
    tap_ms: u64,
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

#[derive(Serialize)]
struct MacroSummary<'a> {
    id: &'a str,
    name: &'a str,
    actions: usize,
    estimated_ms: u64,
    selected: bool,
}

impl<'a> MacroSummary<'a> {
    fn new(m: &'a Macro, library: &MacroLibrary) -> Self {
        Self {
            id: m.id(),
            name: m.name(),
            actions: m.len(),
            estimated_ms: m.estimated_duration_ms(),
            selected: library.selected_id() == Some(m.id()),
        }
    }
}

// ── Main ────────────────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = execute(cli) {
        let err = match e.downcast::<Error>() {
            Ok(err) => err,
            Err(e) => Error::from(e),
        };
        let _ = print_json(&Output::<()>::err(err));
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();
}

fn execute(cli: Cli) -> Result<()> {
    if let Commands::Scan { roots, no_defaults } = &cli.command {
        return scan(roots, *no_defaults);
    }

    let storage = open_storage(cli.dir.as_deref())?;
    match cli.command {
        Commands::List => list(&storage),
        Commands::Show { id } => show(&storage, &id),
        Commands::Add { name, source } => add(&storage, &name, &source),
        Commands::Edit { id, name, source } => edit(&storage, &id, name.as_deref(), &source),
        Commands::Delete { id } => delete(&storage, &id),
        Commands::Select { id, clear } => select_macro(&storage, id.as_deref(), clear),
        Commands::Import { file, name, select, preview, decode } => {
            import(&storage, &file, name, select, preview, &decode)
        }
        Commands::Run { id, playback } => run(&storage, id.as_deref(), &playback),
        Commands::Scan { .. } => Ok(()),
    }
}

fn open_storage(dir: Option<&Path>) -> Result<MacroStorage> {
    let storage = match dir {
        Some(dir) => MacroStorage::with_dir(dir),
        None => MacroStorage::new(),
    };
    storage.map_err(|e| Error::storage_failed("Opening macro store", &format!("{:#}", e)).into())
}

fn load(storage: &MacroStorage) -> Result<MacroLibrary> {
    storage
        .load()
        .map_err(|e| Error::storage_failed("Loading macros", &format!("{:#}", e)).into())
}

// ══════════════════════════════════════════════════════════════════════════════
//  Library commands
// ══════════════════════════════════════════════════════════════════════════════

fn list(storage: &MacroStorage) -> Result<()> {
    let library = load(storage)?;
    let summaries: Vec<_> = library
        .macros()
        .iter()
        .map(|m| MacroSummary::new(m, &library))
        .collect();
    print_json(&Output::ok(summaries))
}

fn show(storage: &MacroStorage, id: &str) -> Result<()> {
    let library = load(storage)?;
    let m = library.get(id).ok_or_else(|| Error::macro_not_found(id))?;
    print_json(&Output::ok(serde_json::json!({
        "macro": MacroSummary::new(m, &library),
        "commands": m.commands(),
        "actions": m.actions(),
    })))
}

/// Command text from `-c` lines and/or `--file`, with the lines that were dropped.
fn read_commands(source: &CommandSource) -> Result<Option<(Vec<Action>, Vec<RejectedLine>)>> {
    let mut text = source.commands.join("\n");
    if let Some(file) = &source.file {
        let body = if file.as_os_str() == "-" {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        } else {
            std::fs::read_to_string(file)
                .with_context(|| format!("Failed to read {}", file.display()))?
        };
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(&body);
    }
    if source.commands.is_empty() && source.file.is_none() {
        return Ok(None);
    }

    let rejected = action::validate_commands(&text);
    for r in &rejected {
        warn!(line = r.line, text = %r.text, reason = %r.reason, "dropping command");
    }
    Ok(Some((action::parse_actions(&text), rejected)))
}

fn add(storage: &MacroStorage, name: &str, source: &CommandSource) -> Result<()> {
    let (actions, rejected) = read_commands(source)?.unwrap_or_default();
    if actions.is_empty() {
        return Err(Error::empty_macro(Some(name))
            .with_suggestions(vec!["Pass commands with -c 'tap,100,200' or --file".to_string()])
            .into());
    }
    let created = storage.add(name, actions)?;
    info!(id = created.id(), name, "macro added");
    print_json(&Output::ok(serde_json::json!({
        "id": created.id(),
        "name": created.name(),
        "actions": created.len(),
        "rejected": rejected,
    })))
}

fn edit(storage: &MacroStorage, id: &str, name: Option<&str>, source: &CommandSource) -> Result<()> {
    let library = load(storage)?;
    let current = library.get(id).ok_or_else(|| Error::macro_not_found(id))?;

    let (actions, rejected) = match read_commands(source)? {
        Some(parsed) => parsed,
        None => (current.actions().to_vec(), Vec::new()),
    };
    let name = name.unwrap_or(current.name()).to_string();
    storage.update(id, &name, actions)?;
    info!(id, name = %name, "macro updated");
    print_json(&Output::ok(serde_json::json!({
        "id": id,
        "name": name,
        "rejected": rejected,
    })))
}

fn delete(storage: &MacroStorage, id: &str) -> Result<()> {
    let removed = storage.delete(id)?;
    info!(id, "macro deleted");
    print_json(&Output::ok(serde_json::json!({
        "deleted": removed.id(),
        "name": removed.name(),
    })))
}

fn select_macro(storage: &MacroStorage, id: Option<&str>, clear: bool) -> Result<()> {
    match (id, clear) {
        (Some(id), _) => storage.set_selected(Some(id))?,
        (None, true) => storage.set_selected(None)?,
        (None, false) => {
            let selected = storage.selected_macro()?;
            return print_json(&Output::ok(serde_json::json!({
                "selected": selected.as_ref().map(Macro::id),
                "name": selected.as_ref().map(Macro::name),
            })));
        }
    }
    print_json(&Output::ok(serde_json::json!({ "selected": id })))
}

// ══════════════════════════════════════════════════════════════════════════════
//  Recording commands
// ══════════════════════════════════════════════════════════════════════════════

fn import(
    storage: &MacroStorage,
    file: &Path,
    name: Option<String>,
    select: bool,
    preview: bool,
    args: &DecodeArgs,
) -> Result<()> {
    let config = DecoderConfig::default()
        .with_screen(ScreenSize::new(args.width, args.height))
        .with_space(args.space)
        .with_min_delay_ms(args.min_delay);
    let mut result = Decoder::new(config).decode_file(file);

    if !result.success {
        let message = result
            .error_message
            .clone()
            .unwrap_or_else(|| "Recording could not be decoded".to_string());
        return Err(Error::decode_failed(message)
            .with_suggestions(vec![
                "Check --width/--height match the target device".to_string(),
                "Try --space per-axis for recorders that normalize each axis".to_string(),
            ])
            .with_context(serde_json::to_value(&result)?)
            .into());
    }
    if name.is_some() {
        result.name = name;
    }

    let report = serde_json::json!({
        "total_events": result.total_events,
        "touch_events": result.touch_events,
        "converted_actions": result.converted_actions,
        "resolution": result.resolution,
        "schema": result.schema,
    });
    if preview {
        let commands = touchmacro::serialize_actions(&result.actions);
        return print_json(&Output::ok(serde_json::json!({
            "name": result.name,
            "commands": commands,
            "report": report,
        })));
    }

    let fallback = file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "imported".to_string());
    let Some(imported) = result.into_macro(&fallback) else {
        return Err(Error::decode_failed("Recording produced no actions").into());
    };
    storage.insert(imported.clone())?;
    if select {
        storage.set_selected(Some(imported.id()))?;
    }
    info!(id = imported.id(), name = imported.name(), actions = imported.len(), "recording imported");

    print_json(&Output::ok(serde_json::json!({
        "id": imported.id(),
        "name": imported.name(),
        "actions": imported.len(),
        "selected": select,
        "report": report,
    })))
}

#[derive(Serialize)]
struct FoundRecording<'a> {
    name: &'a str,
    path: &'a Path,
    size: String,
    modified: Option<String>,
}

fn scan(roots: &[PathBuf], no_defaults: bool) -> Result<()> {
    let base = if no_defaults {
        RecordingScanner::new()
    } else {
        RecordingScanner::with_default_roots()
    };
    let scanner = roots.iter().fold(base, |s, r| s.add_root(r.clone()));
    let found = scanner.scan();

    let recordings: Vec<_> = found
        .iter()
        .map(|r| FoundRecording {
            name: r.display_name(),
            path: &r.path,
            size: r.size_string(),
            modified: r.modified.map(|m| m.to_rfc3339()),
        })
        .collect();
    let searched: Vec<_> = scanner
        .searched_paths()
        .into_iter()
        .map(|(path, exists)| serde_json::json!({ "path": path, "exists": exists }))
        .collect();
    print_json(&Output::ok(serde_json::json!({
        "recordings": recordings,
        "searched": searched,
    })))
}

// ══════════════════════════════════════════════════════════════════════════════
//  Playback
// ══════════════════════════════════════════════════════════════════════════════

fn run(storage: &MacroStorage, id: Option<&str>, args: &PlaybackArgs) -> Result<()> {
    let library = load(storage)?;
    let macro_def = match id {
        Some(id) => library.get(id).cloned().ok_or_else(|| Error::macro_not_found(id))?,
        None => library.selected().cloned().ok_or_else(|| {
            Error::empty_macro(None)
                .with_suggestions(vec!["Pass a macro id or run `tm select <id>` first".to_string()])
        })?,
    };
    if macro_def.is_empty() {
        return Err(Error::empty_macro(Some(macro_def.name())).into());
    }

    let config = EngineConfig {
        settle_delay: Duration::from_millis(args.settle_ms),
        tap_duration_ms: args.tap_ms,
    };
    let runner = if args.dry_run {
        let realtime = args.realtime;
        MacroRunner::spawn(config, move |sink| {
            let dispatcher = DryRunDispatcher::new(sink);
            if realtime {
                dispatcher.realtime()
            } else {
                dispatcher
            }
        })?
    } else {
        AdbDispatcher::probe(&args.adb, args.device.as_deref()).map_err(Error::from)?;
        let adb = args.adb.clone();
        let device = args.device.clone();
        MacroRunner::spawn(config, move |sink| {
            let dispatcher = AdbDispatcher::new(sink).with_adb_path(adb);
            match device {
                Some(serial) => dispatcher.with_serial(serial),
                None => dispatcher,
            }
        })?
    };

    let (stop_tx, stop_rx) = bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = stop_tx.try_send(());
    })?;

    let started = Instant::now();
    runner.start(macro_def.clone());
    let mut stopped = false;
    let mut outcome: Option<std::result::Result<(), Error>> = None;
    while outcome.is_none() {
        select! {
            recv(runner.signals()) -> signal => match signal {
                Ok(Signal::Started) => info!(name = macro_def.name(), "running (Ctrl+C to stop)"),
                Ok(signal) => outcome = run_outcome(signal),
                Err(_) => {
                    outcome = Some(Err(Error::new(ErrorCode::Unknown, "run loop exited unexpectedly")))
                }
            },
            recv(stop_rx) -> _ => {
                if !stopped {
                    stopped = true;
                    info!("stopping");
                    runner.stop();
                }
            }
        }
    }
    runner.shutdown();

    if let Some(Err(err)) = outcome {
        return Err(err.into());
    }
    print_json(&Output::ok(serde_json::json!({
        "id": macro_def.id(),
        "name": macro_def.name(),
        "actions": macro_def.len(),
        "stopped": stopped,
        "elapsed_ms": started.elapsed().as_millis() as u64,
        "dry_run": args.dry_run,
    })))
}

/// Terminal outcome of a run for a signal, if the signal ends it.
fn run_outcome(signal: Signal) -> Option<std::result::Result<(), Error>> {
    match signal {
        Signal::Started => None,
        Signal::Finished => Some(Ok(())),
        Signal::Error(err) => Some(Err(Error::from(err))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use touchmacro::EngineError;

    #[test]
    fn engine_rejections_keep_their_code() {
        let err = run_outcome(Signal::Error(EngineError::AlreadyRunning))
            .unwrap()
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::AlreadyRunning);

        let err = run_outcome(Signal::Error(EngineError::EmptyMacro))
            .unwrap()
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::EmptyMacro);
        let json = serde_json::to_value(Output::<()>::err(err)).unwrap();
        assert_eq!(json["error"]["code"], "EMPTY_MACRO");
    }

    #[test]
    fn finished_ends_the_run() {
        assert!(matches!(run_outcome(Signal::Finished), Some(Ok(()))));
        assert!(run_outcome(Signal::Started).is_none());
    }
}
