//! proofmark entrypoint.
use anyhow::{Context, Result};
use clap::Parser;
use core_config::load_from;
use core_events::{LIFECYCLE_EVENTS_EMITTED, LIFECYCLE_SEND_FAILURES};
use core_text::Utf16Range;
use proofmark::{Rule, RuleSet, RunRequest, run_document};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Once;
use std::sync::atomic::Ordering;
use tokio::task::LocalSet;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(
    name = "proofmark",
    version,
    about = "Proofread a document and report where its underlines land"
)]
struct Args {
    /// UTF-8 text file to check. Reads stdin when omitted.
    pub path: Option<PathBuf>,
    /// Configuration file path (overrides discovery of `proofmark.toml`).
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
    /// Border-box width of the simulated surface in pixels.
    #[arg(long, default_value_t = 320.0)]
    pub width: f64,
    /// Border-box height of the simulated surface in pixels.
    #[arg(long, default_value_t = 200.0)]
    pub height: f64,
    /// Restrict the run to a UTF-16 range, `START..END`.
    #[arg(long, value_parser = parse_range)]
    pub selection: Option<Utf16Range>,
    /// Apply the correction at this index once the run completes.
    #[arg(long)]
    pub apply: Option<usize>,
    /// Render through native range highlights instead of overlay nodes.
    #[arg(long)]
    pub native: bool,
    /// Turn off a built-in rule (repeatable).
    #[arg(long = "disable", value_enum)]
    pub disable: Vec<Rule>,
    /// Emit JSON lines instead of the text report.
    #[arg(long)]
    pub json: bool,
}

fn parse_range(raw: &str) -> Result<Utf16Range, String> {
    let (start, end) = raw
        .split_once("..")
        .ok_or_else(|| format!("expected START..END, got `{raw}`"))?;
    let start: usize = start.trim().parse().map_err(|e| format!("start: {e}"))?;
    let end: usize = end.trim().parse().map_err(|e| format!("end: {e}"))?;
    Ok(Utf16Range::new(start, end))
}

fn configure_logging() -> Option<WorkerGuard> {
    let log_dir = Path::new(".");
    let log_path = log_dir.join("proofmark.log");
    if log_path.exists() {
        let _ = std::fs::remove_file(&log_path);
    }

    let file_appender = tracing_appender::rolling::never(log_dir, "proofmark.log");
    let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
    match tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(nb_writer)
        .try_init()
    {
        Ok(()) => Some(guard),
        // Global subscriber already installed; dropping the guard shuts the writer down.
        Err(_) => None,
    }
}

fn install_panic_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            tracing::error!(target: "runtime.panic", ?info, "panic");
            default_panic(info);
        }));
    });
}

fn read_input(path: Option<&Path>) -> Result<String> {
    let raw = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading stdin")?;
            buf
        }
    };
    let text = raw.replace("\r\n", "\n");
    tracing::debug!(target: "io", size_bytes = text.len(), from_stdin = path.is_none(), "input_read");
    Ok(text)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let _log_guard = configure_logging();
    install_panic_hook();
    info!(target: "runtime", "startup");

    let args = Args::parse();
    let config = load_from(args.config.clone())?;
    let text = read_input(args.path.as_deref())?;
    let rules = args
        .disable
        .iter()
        .fold(RuleSet::default(), |rules, rule| rules.without(*rule));
    let request = RunRequest {
        text,
        width: args.width,
        height: args.height,
        selection: args.selection,
        apply: args.apply,
        native: args.native,
        rules,
    };

    let report = match LocalSet::new()
        .run_until(run_document(&config, request))
        .await
    {
        Ok(report) => report,
        Err(err) => {
            error!(target: "runtime", error = %err, "run_failed");
            return Err(err);
        }
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if args.json {
        report.write_json(&mut out)?;
    } else {
        report.write_text(&mut out)?;
    }
    info!(
        target: "runtime",
        events = LIFECYCLE_EVENTS_EMITTED.load(Ordering::Relaxed),
        send_failures = LIFECYCLE_SEND_FAILURES.load(Ordering::Relaxed),
        "shutdown"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_selection_ranges() {
        assert_eq!(parse_range("4..12"), Ok(Utf16Range::new(4, 12)));
        assert_eq!(parse_range(" 9 .. 2"), Ok(Utf16Range::new(2, 9)));
        assert!(parse_range("4-12").is_err());
        assert!(parse_range("a..2").is_err());
    }

    #[test]
    fn cli_accepts_repeated_disable() {
        let args = Args::try_parse_from([
            "proofmark",
            "doc.txt",
            "--disable",
            "double-spaces",
            "--disable",
            "lowercase-i",
            "--selection",
            "0..5",
            "--json",
        ])
        .expect("parse");
        assert_eq!(args.disable, vec![Rule::DoubleSpaces, Rule::LowercaseI]);
        assert_eq!(args.selection, Some(Utf16Range::new(0, 5)));
        assert!(args.json);
    }
}
