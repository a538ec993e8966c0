// Command-line front end for the resource store and delta codec.
//
// Subcommands map one-to-one onto store operations; global options pick
// the base directory, the store location and an optional properties file.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};

use crate::config::DiffableConfig;
use crate::engine::DeltaCodec;
use crate::io::read_text;
use crate::monitor::ResourceMonitor;
use crate::store::{ResourceRequest, Response, VersionMap, VersionedResourceStore};

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// Versioned web-asset store with block-based text deltas.
#[derive(Parser, Debug)]
#[command(
    name = "diffable",
    version,
    about = "Versioned resource store and delta codec",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Directory the store location is relative to (default: current dir).
    #[arg(long = "base-dir", global = true, value_hint = ValueHint::DirPath)]
    base_dir: Option<PathBuf>,

    /// Store location: absolute, relative to the base dir, or file://path.
    #[arg(long, global = true)]
    store: Option<String>,

    /// Properties file with store settings.
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Quiet mode (suppress non-error output).
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Verbose mode (use multiple times for more detail).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Output stats as JSON to stderr.
    #[arg(long = "json", global = true)]
    json_output: bool,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Print the diff payload turning OLD into NEW.
    Diff(DiffArgs),
    /// Run one change-detection pass over the given folders.
    Sync(FolderArgs),
    /// Keep watching folders, one pass per interval.
    Watch(WatchArgs),
    /// Resolve a resource token and print the response body.
    Get(GetArgs),
    /// List managed resources with their ids and current versions.
    List,
    /// Stop managing a file and remove its stored versions.
    Delete(DeleteArgs),
    /// Print the effective configuration.
    Config,
}

#[derive(Args, Debug)]
struct DiffArgs {
    /// Base version.
    #[arg(value_hint = ValueHint::FilePath)]
    old: PathBuf,

    /// Target version.
    #[arg(value_hint = ValueHint::FilePath)]
    new: PathBuf,

    /// Block size in characters (default: from config).
    #[arg(long = "block-size", short = 'b', value_parser = clap::value_parser!(u64).range(1..))]
    block_size: Option<u64>,

    /// Apply the produced script and check it reproduces NEW.
    #[arg(long)]
    verify: bool,
}

#[derive(Args, Debug)]
struct FolderArgs {
    /// Folders to scan recursively.
    #[arg(required = true, value_hint = ValueHint::DirPath)]
    folders: Vec<PathBuf>,
}

#[derive(Args, Debug)]
struct WatchArgs {
    #[command(flatten)]
    folders: FolderArgs,

    /// Milliseconds between passes (default: from config).
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    interval: Option<u64>,

    /// Stop after this many passes (default: run until killed).
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    ticks: Option<u64>,
}

#[derive(Args, Debug)]
struct GetArgs {
    /// `<id>` or `<id>_<old>_<new>.diff`.
    token: String,
}

#[derive(Args, Debug)]
struct DeleteArgs {
    /// Managed file.
    #[arg(value_hint = ValueHint::FilePath)]
    file: PathBuf,
}

// ---------------------------------------------------------------------------
// Resolved options
// ---------------------------------------------------------------------------

struct Options {
    quiet: bool,
    verbose: u8,
    json_output: bool,
    base_dir: PathBuf,
    config: DiffableConfig,
}

fn resolve_options(cli: &Cli) -> Result<Options, String> {
    let mut config = match &cli.config {
        Some(path) => DiffableConfig::load(path).map_err(|e| e.to_string())?,
        None => DiffableConfig::default(),
    };
    if let Some(store) = &cli.store {
        config.store_location = Some(store.clone());
    }
    let base_dir = match &cli.base_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().map_err(|e| format!("current directory: {e}"))?,
    };
    Ok(Options {
        quiet: cli.quiet,
        verbose: cli.verbose.min(2),
        json_output: cli.json_output,
        base_dir,
        config,
    })
}

fn log_filter(quiet: bool, verbose: u8) -> &'static str {
    match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        _ => "debug",
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run() -> ! {
    let cli = Cli::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(log_filter(cli.quiet, cli.verbose)),
    )
    .format_timestamp(None)
    .format_target(false)
    .init();

    let opts = match resolve_options(&cli) {
        Ok(opts) => opts,
        Err(e) => {
            eprintln!("diffable: {e}");
            process::exit(1);
        }
    };

    let exit_code = match &cli.command {
        Cmd::Diff(args) => cmd_diff(&opts, args),
        Cmd::Sync(args) => cmd_sync(&opts, args),
        Cmd::Watch(args) => cmd_watch(&opts, args),
        Cmd::Get(args) => cmd_get(&opts, args),
        Cmd::List => cmd_list(&opts),
        Cmd::Delete(args) => cmd_delete(&opts, args),
        Cmd::Config => cmd_config(&opts),
    };

    process::exit(exit_code);
}

fn open_store(opts: &Options) -> Result<Arc<VersionedResourceStore>, i32> {
    VersionedResourceStore::initialize(
        &opts.base_dir,
        opts.config.clone(),
        Arc::new(VersionMap::new()),
    )
    .map(Arc::new)
    .map_err(|e| {
        eprintln!("diffable: {e}");
        1
    })
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => eprintln!("{text}"),
        Err(e) => eprintln!("diffable: json: {e}"),
    }
}

// ---------------------------------------------------------------------------
// Diff command
// ---------------------------------------------------------------------------

fn cmd_diff(opts: &Options, args: &DiffArgs) -> i32 {
    let read = |path: &Path| {
        read_text(path).map_err(|e| {
            eprintln!("diffable: {}: {e}", path.display());
            1
        })
    };
    let base = match read(&args.old) {
        Ok(text) => text,
        Err(code) => return code,
    };
    let target = match read(&args.new) {
        Ok(text) => text,
        Err(code) => return code,
    };

    let block_size = args
        .block_size
        .map_or(opts.config.block_size, |b| b as usize);
    let codec = DeltaCodec::rolling(block_size, opts.config.hash_params());
    let script = codec.diff(&base, &target);

    match &script {
        Some(script) => println!("{}", script.to_payload()),
        None => println!("null"),
    }

    if args.verify
        && let Some(script) = &script
    {
        match script.apply(&base) {
            Ok(rebuilt) if rebuilt == target => {}
            Ok(_) => {
                eprintln!("diffable: verify: reconstructed text differs from target");
                return 1;
            }
            Err(e) => {
                eprintln!("diffable: verify: {e}");
                return 1;
            }
        }
    }

    let ops = script.as_ref().map_or(0, |s| s.len());
    if opts.verbose > 0 && !opts.quiet {
        eprintln!(
            "diffable: diff: base chars: {}, target chars: {}, ops: {ops}",
            base.chars().count(),
            target.chars().count()
        );
    }
    if opts.json_output {
        print_json(&serde_json::json!({
            "command": "diff",
            "block_size": block_size,
            "base_chars": base.chars().count(),
            "target_chars": target.chars().count(),
            "identical": script.is_none(),
            "ops": ops,
            "payload_bytes": script.as_ref().map_or(0, |s| s.to_payload().len()),
        }));
    }
    0
}

// ---------------------------------------------------------------------------
// Sync / watch commands
// ---------------------------------------------------------------------------

fn cmd_sync(opts: &Options, args: &FolderArgs) -> i32 {
    let store = match open_store(opts) {
        Ok(store) => store,
        Err(code) => return code,
    };
    let monitor = ResourceMonitor::new(Arc::clone(&store), args.folders.clone());
    let report = monitor.check_folders();

    if opts.verbose > 0 && !opts.quiet {
        eprintln!(
            "diffable: sync: scanned: {}, updated: {}, removed: {}, failed: {}",
            report.scanned, report.updated, report.removed, report.failed
        );
    }
    if opts.json_output {
        print_json(&serde_json::json!({
            "command": "sync",
            "store": store.root().display().to_string(),
            "scanned": report.scanned,
            "updated": report.updated,
            "removed": report.removed,
            "failed": report.failed,
            "managed": store.get_managed_resources().len(),
        }));
    }
    if report.failed > 0 { 1 } else { 0 }
}

fn cmd_watch(opts: &Options, args: &WatchArgs) -> i32 {
    let store = match open_store(opts) {
        Ok(store) => store,
        Err(code) => return code,
    };
    let interval = args
        .interval
        .map_or(opts.config.monitor_interval, Duration::from_millis);
    let monitor = ResourceMonitor::new(Arc::clone(&store), args.folders.folders.clone());
    let spawned = match args.ticks {
        Some(ticks) => {
            monitor.spawn_limited(interval, usize::try_from(ticks).unwrap_or(usize::MAX))
        }
        None => monitor.spawn(interval),
    };
    let handle = match spawned {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("diffable: cannot start monitor: {e}");
            return 1;
        }
    };

    if args.ticks.is_none() {
        while !handle.is_finished() {
            thread::park_timeout(interval);
        }
        return 1;
    }
    let passes = handle.join();

    if opts.verbose > 0 && !opts.quiet {
        eprintln!("diffable: watch: {passes} passes");
    }
    if opts.json_output {
        print_json(&serde_json::json!({
            "command": "watch",
            "passes": passes,
            "interval_ms": interval.as_millis() as u64,
            "managed": store.get_managed_resources().len(),
        }));
    }
    0
}

// ---------------------------------------------------------------------------
// Store queries
// ---------------------------------------------------------------------------

fn cmd_get(opts: &Options, args: &GetArgs) -> i32 {
    let request = match ResourceRequest::parse(&args.token) {
        Ok(req) => req,
        Err(e) => {
            eprintln!("diffable: {e}");
            return 2;
        }
    };
    let store = match open_store(opts) {
        Ok(store) => store,
        Err(code) => return code,
    };
    let Some(response) = store.get(&request) else {
        eprintln!("diffable: no resource for {request}");
        return 1;
    };
    let mut out = io::stdout().lock();
    if let Err(e) = out.write_all(response.body()).and_then(|()| out.flush()) {
        eprintln!("diffable: cannot write response: {e}");
        return 1;
    }

    if opts.json_output {
        let (kind, version) = match &response {
            Response::Content { version, .. } => ("content", Some(version.as_str())),
            Response::Delta { .. } => ("delta", None),
        };
        print_json(&serde_json::json!({
            "command": "get",
            "resource_id": response.resource_id(),
            "kind": kind,
            "version": version,
            "bytes": response.body().len(),
        }));
    }
    0
}

fn cmd_list(opts: &Options) -> i32 {
    let store = match open_store(opts) {
        Ok(store) => store,
        Err(code) => return code,
    };
    let mut rows = Vec::new();
    for path in store.get_managed_resources() {
        let id = store.resource_id(&path).unwrap_or_default();
        let version = store.current_version(&path).unwrap_or_default();
        if !opts.quiet {
            println!("{}\t{id}\t{version}", path.display());
        }
        rows.push(serde_json::json!({
            "path": path.display().to_string(),
            "resource_id": id,
            "version": version,
        }));
    }
    if opts.json_output {
        print_json(&serde_json::json!({
            "command": "list",
            "store": store.root().display().to_string(),
            "resources": rows,
        }));
    }
    0
}

fn cmd_delete(opts: &Options, args: &DeleteArgs) -> i32 {
    let store = match open_store(opts) {
        Ok(store) => store,
        Err(code) => return code,
    };
    let was_managed = store.is_managed(&args.file);
    if let Err(e) = store.delete_resource(&args.file) {
        eprintln!("diffable: {e}");
        return 1;
    }
    if !was_managed && !opts.quiet {
        eprintln!("diffable: {} was not managed", args.file.display());
    }
    0
}

// ---------------------------------------------------------------------------
// Config command
// ---------------------------------------------------------------------------

fn cmd_config(opts: &Options) -> i32 {
    let cfg = &opts.config;
    let version = env!("CARGO_PKG_VERSION");
    eprintln!("diffable version {version}");

    let parallel = cfg!(feature = "parallel") as u8;
    println!("ResourceStorePath={}", cfg.store_location.as_deref().unwrap_or(""));
    println!("StoreRoot={}", cfg.resolve_store_root(&opts.base_dir).display());
    println!("BlockSize={}", cfg.block_size);
    println!("KeepResourcesInMemory={}", cfg.keep_in_memory);
    println!("ResourceMonitorInterval={}", cfg.monitor_interval.as_millis());
    println!("PrimeBase={}", cfg.prime_base);
    println!("PrimeMod={}", cfg.prime_mod);
    println!("PARALLEL={parallel}");

    if opts.json_output {
        print_json(&serde_json::json!({
            "command": "config",
            "store_root": cfg.resolve_store_root(&opts.base_dir).display().to_string(),
            "block_size": cfg.block_size,
            "keep_in_memory": cfg.keep_in_memory,
            "monitor_interval_ms": cfg.monitor_interval.as_millis() as u64,
            "prime_base": cfg.prime_base,
            "prime_mod": cfg.prime_mod,
        }));
    }
    0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let argv: Vec<String> = std::iter::once("diffable".to_string())
            .chain(args.iter().map(|s| s.to_string()))
            .collect();
        Cli::try_parse_from(argv).expect("cli parse failed")
    }

    #[test]
    fn diff_subcommand_parses() {
        let cli = parse(&["diff", "-b", "3", "--verify", "old.js", "new.js"]);
        match cli.command {
            Cmd::Diff(args) => {
                assert_eq!(args.block_size, Some(3));
                assert!(args.verify);
                assert_eq!(args.old, PathBuf::from("old.js"));
                assert_eq!(args.new, PathBuf::from("new.js"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn zero_block_size_is_rejected() {
        let argv = ["diffable", "diff", "-b", "0", "a", "b"];
        assert!(Cli::try_parse_from(argv).is_err());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = parse(&["list", "--store", "file:///tmp/s", "--base-dir", "/srv", "-vv"]);
        let opts = resolve_options(&cli).unwrap();
        assert_eq!(opts.config.store_location.as_deref(), Some("file:///tmp/s"));
        assert_eq!(opts.base_dir, PathBuf::from("/srv"));
        assert_eq!(opts.verbose, 2);
    }

    #[test]
    fn watch_requires_folders() {
        assert!(Cli::try_parse_from(["diffable", "watch"]).is_err());
        let cli = parse(&["watch", "web", "--interval", "50", "--ticks", "2"]);
        match cli.command {
            Cmd::Watch(args) => {
                assert_eq!(args.folders.folders, vec![PathBuf::from("web")]);
                assert_eq!(args.interval, Some(50));
                assert_eq!(args.ticks, Some(2));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn config_file_feeds_options() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("diffable.properties");
        std::fs::write(&file, "BlockSize=7\nResourceStorePath=cache\n").unwrap();
        let cli = parse(&["config", "--config", file.to_str().unwrap(), "--store", "other"]);
        let opts = resolve_options(&cli).unwrap();
        assert_eq!(opts.config.block_size, 7);
        assert_eq!(opts.config.store_location.as_deref(), Some("other"));
    }

    #[test]
    fn log_levels() {
        assert_eq!(log_filter(true, 2), "error");
        assert_eq!(log_filter(false, 0), "warn");
        assert_eq!(log_filter(false, 1), "info");
        assert_eq!(log_filter(false, 2), "debug");
    }
}
