//! `scanbridge` – scan-trigger bridge command line
//!
//! 1. Loads `~/.scanbridge/config.toml` (or `--config`), falling back to
//!    defaults when the file is absent.
//! 2. Reads the pose file; an unreadable file or malformed record stops the
//!    program before anything is published.
//! 3. Connects to `rosbridge_server` and runs the scan-trigger loop.
//! 4. Intercepts **Ctrl-C** to stop after the pose currently in progress.
//!
//! Exit codes: `0` done, `1` pose file unreadable, `2` malformed pose record,
//! `3` transport failure, `4` configuration error, `5` anything else.

mod config;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use colored::Colorize;
use tracing::{error, info, warn};

use scanbridge_middleware::{PoseTransport, RosbridgeClient};
use scanbridge_runtime::{PoseQueue, ProcessCapture, RunSummary, ScanTriggerOrchestrator};
use scanbridge_types::ScanError;

/// Publish robot arm poses over rosbridge and trigger a 3D scan at each one.
#[derive(Debug, Parser)]
#[command(name = "scanbridge", version)]
struct Cli {
    /// Pose file (`x y z qx qy qz qw` per line). Overrides the config value.
    pose_file: Option<PathBuf>,

    /// Capture executable to run at each reached pose. Overrides the config value.
    capture_program: Option<PathBuf>,

    /// Config file to use instead of `~/.scanbridge/config.toml`.
    #[arg(long)]
    config: Option<PathBuf>,

    /// rosbridge WebSocket URL, e.g. `ws://192.168.186.129:9090`.
    #[arg(long)]
    rosbridge_url: Option<String>,

    /// Write a JSON run report to this path.
    #[arg(long)]
    report: Option<PathBuf>,

    /// Write the effective configuration to the config path and exit.
    #[arg(long)]
    init_config: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let _guard = scanbridge_runtime::init_tracing("scanbridge");

    print_banner();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "scanbridge stopped");
            println!("{}: {}", "Error".red().bold(), e);
            ExitCode::from(exit_code(&e))
        }
    }
}

fn run(cli: Cli) -> Result<(), ScanError> {
    // ── Configuration ─────────────────────────────────────────────────────
    let config_path = cli.config.clone().unwrap_or_else(config::config_path);
    let mut cfg = match config::load_from(&config_path)? {
        Some(cfg) => {
            println!("  Config loaded from {}", config_path.display().to_string().bold());
            cfg
        }
        // Only the default location may be absent; `--init-config` creates it.
        None if cli.config.is_some() && !cli.init_config => {
            return Err(ScanError::Config(format!(
                "config file {} not found",
                config_path.display()
            )));
        }
        None => {
            let mut cfg = config::Config::default();
            config::apply_env_overrides(&mut cfg);
            cfg
        }
    };
    if let Some(pose_file) = cli.pose_file {
        cfg.pose_file = pose_file;
    }
    if let Some(program) = cli.capture_program {
        cfg.capture_program = program;
    }
    if let Some(url) = cli.rosbridge_url {
        cfg.rosbridge_url = url;
    }

    if cli.init_config {
        config::save_to(&cfg, &config_path)?;
        println!(
            "  {} Config saved to {}",
            "✓".green().bold(),
            config_path.display().to_string().bold()
        );
        return Ok(());
    }

    // ── Pose queue ────────────────────────────────────────────────────────
    let poses = PoseQueue::load(&cfg.pose_file)?;
    info!(path = %cfg.pose_file.display(), poses = poses.len(), "pose file loaded");

    // ── Ctrl-C handler ────────────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_flag = Arc::clone(&shutdown);
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!(
            "{}",
            "⚠  Ctrl-C received – stopping after the current pose …".yellow().bold()
        );
        shutdown_flag.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "failed to install Ctrl-C handler; Ctrl-C will stop immediately");
    }

    // ── Scan loop ─────────────────────────────────────────────────────────
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| ScanError::Config(format!("failed to start async runtime: {e}")))?;

    let summary = runtime.block_on(async {
        println!("  Connecting to {} …", cfg.rosbridge_url.dimmed());
        let transport = RosbridgeClient::connect(&cfg.rosbridge_url, cfg.topics()).await?;
        let capture =
            ProcessCapture::new(cfg.capture_program.clone()).with_args(cfg.capture_args.clone());

        let mut orchestrator =
            ScanTriggerOrchestrator::new(cfg.orchestrator_config(), transport, capture)
                .with_shutdown(shutdown);
        let summary = orchestrator.run(poses).await?;

        let (mut transport, _) = orchestrator.into_parts();
        if let Err(e) = transport.close().await {
            warn!(error = %e, "rosbridge connection did not close cleanly");
        }
        Ok::<_, ScanError>(summary)
    })?;

    print_summary(&summary);

    if let Some(path) = cli.report {
        std::fs::write(&path, summary.to_json()?).map_err(|e| {
            ScanError::Serialization(format!("failed to write report {}: {e}", path.display()))
        })?;
        info!(path = %path.display(), "run report written");
    }
    Ok(())
}

fn exit_code(err: &ScanError) -> u8 {
    match err {
        ScanError::PoseFileOpen { .. } => 1,
        ScanError::MalformedPose { .. } => 2,
        ScanError::TransportConnect(_) | ScanError::Transport(_) => 3,
        ScanError::Config(_) => 4,
        ScanError::Serialization(_) | ScanError::Capture(_) => 5,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Output
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!(
        "  {} {}",
        "ScanBridge".bold().cyan(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Robot arm pose → 3D scan trigger");
    println!();
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!("  {}", "All done!".bold());
    println!("    {} captured", summary.captured.to_string().green().bold());
    if summary.capture_failed > 0 {
        println!("    {} capture failures", summary.capture_failed.to_string().red().bold());
    }
    if summary.skipped > 0 {
        println!("    {} poses skipped", summary.skipped.to_string().yellow().bold());
    }
    if summary.interrupted {
        println!("    {}", "stopped early by Ctrl-C".yellow());
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_failure_class() {
        let open = ScanError::PoseFileOpen {
            path: "pose.txt".to_string(),
            reason: "not found".to_string(),
        };
        let malformed = ScanError::MalformedPose {
            line: 3,
            reason: "expected 7 fields, found 2".to_string(),
        };
        assert_eq!(exit_code(&open), 1);
        assert_eq!(exit_code(&malformed), 2);
        assert_eq!(exit_code(&ScanError::TransportConnect("refused".into())), 3);
        assert_eq!(exit_code(&ScanError::Config("bad toml".into())), 4);
    }

    #[test]
    fn cli_accepts_positional_overrides() {
        let cli = Cli::parse_from([
            "scanbridge",
            "poses.txt",
            "C:/scanner/simple-capture-sample.exe",
            "--rosbridge-url",
            "ws://192.168.186.129:9090",
        ]);
        assert_eq!(cli.pose_file, Some(PathBuf::from("poses.txt")));
        assert_eq!(
            cli.capture_program,
            Some(PathBuf::from("C:/scanner/simple-capture-sample.exe"))
        );
        assert_eq!(cli.rosbridge_url.as_deref(), Some("ws://192.168.186.129:9090"));
        assert!(!cli.init_config);
    }

    #[test]
    fn cli_parses_with_no_arguments() {
        let cli = Cli::parse_from(["scanbridge"]);
        assert!(cli.pose_file.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn explicit_config_path_must_exist() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let cli = Cli::parse_from([
            "scanbridge".to_string(),
            "--config".to_string(),
            dir.path().join("missing.toml").to_string_lossy().into_owned(),
        ]);
        let err = run(cli).unwrap_err();
        assert!(matches!(err, ScanError::Config(_)), "{err:?}");
        assert_eq!(exit_code(&err), 4);
    }

    #[test]
    fn init_config_creates_explicit_config_path() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("scanbridge").join("config.toml");
        let cli = Cli::parse_from([
            "scanbridge".to_string(),
            "--config".to_string(),
            path.to_string_lossy().into_owned(),
            "--rosbridge-url".to_string(),
            "ws://arm-host:9090".to_string(),
            "--init-config".to_string(),
        ]);
        run(cli).expect("init-config succeeds");

        let saved = config::load_from(&path).expect("load ok").expect("written");
        assert_eq!(saved.rosbridge_url, "ws://arm-host:9090");
    }

    /// An empty config file, so tests never read the user's home config.
    fn empty_config(dir: &tempfile::TempDir) -> String {
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "").unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn missing_pose_file_fails_before_connecting() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let cli = Cli::parse_from([
            "scanbridge".to_string(),
            dir.path().join("missing.txt").to_string_lossy().into_owned(),
            "--config".to_string(),
            empty_config(&dir),
            "--rosbridge-url".to_string(),
            "ws://127.0.0.1:1".to_string(),
        ]);
        let err = run(cli).unwrap_err();
        assert_eq!(exit_code(&err), 1);
    }

    #[test]
    fn malformed_pose_file_fails_before_connecting() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let pose_file = dir.path().join("pose.txt");
        std::fs::write(&pose_file, "1 2 3 0 0 0 1\n1 2 3\n").unwrap();
        let cli = Cli::parse_from([
            "scanbridge".to_string(),
            pose_file.to_string_lossy().into_owned(),
            "--config".to_string(),
            empty_config(&dir),
        ]);
        let err = run(cli).unwrap_err();
        assert!(matches!(err, ScanError::MalformedPose { line: 2, .. }));
        assert_eq!(exit_code(&err), 2);
    }
}
