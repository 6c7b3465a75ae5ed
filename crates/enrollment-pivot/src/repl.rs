//! Line-oriented upload session on stdin.

use std::io::Write;
use std::path::{Path, PathBuf};

use pivot_core::error::PivotError;
use pivot_core::formatting::format_count;
use pivot_core::models::{KeyLayout, PivotTable};
use pivot_data::aggregator::Aggregation;
use pivot_data::exporter::SHEET_NAME;
use pivot_data::store::SnapshotStore;
use pivot_runtime::session::{UploadOutcome, UploadSession};
use pivot_ui::app::PivotViewer;
use pivot_ui::text_view::render_plain;
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "\
Commands:
  upload <path>    aggregate a monthly roster (name ending in _YYMM.xlsx)
  download <path>  write the current result as .xlsx
  show             print the current result
  view             open the current result in the table viewer
  help             show this list
  quit             leave the session (Ctrl+C also works)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Upload(PathBuf),
    Download(PathBuf),
    Show,
    View,
    Help,
    Quit,
    /// Unrecognised input, with a message for the user.
    Invalid(String),
}

/// Whether the loop keeps reading after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Option<SessionCommand> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let path_arg = |make: fn(PathBuf) -> SessionCommand| {
        if rest.is_empty() {
            SessionCommand::Invalid(format!("usage: {word} <path>"))
        } else {
            make(PathBuf::from(rest))
        }
    };

    let command = match word.to_lowercase().as_str() {
        "upload" | "u" => path_arg(SessionCommand::Upload),
        "download" | "d" => path_arg(SessionCommand::Download),
        "show" | "s" => SessionCommand::Show,
        "view" | "v" => SessionCommand::View,
        "help" | "h" | "?" => SessionCommand::Help,
        "quit" | "exit" | "q" => SessionCommand::Quit,
        other => SessionCommand::Invalid(format!("unknown command: {other} (try 'help')")),
    };
    Some(command)
}

/// Read commands from stdin until `quit`, end of input or Ctrl+C.
pub async fn run_session<S: SnapshotStore>(session: &UploadSession<S>, theme: &str) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = std::io::stdout();
    writeln!(stdout, "{HELP}")?;

    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;

        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    writeln!(stdout)?;
                    break;
                };
                let Some(command) = parse_command(&line) else {
                    continue;
                };
                match execute(session, command, theme, &mut stdout) {
                    Ok(Flow::Quit) => break,
                    Ok(Flow::Continue) => {}
                    Err(e) => {
                        tracing::debug!(error = ?e, "command failed");
                        writeln!(stdout, "Error: {e}")?;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl+C received; ending session");
                writeln!(stdout)?;
                break;
            }
        }
    }
    Ok(())
}

/// Run one command against `session`, writing user-facing text to `out`.
pub fn execute<S: SnapshotStore, W: Write>(
    session: &UploadSession<S>,
    command: SessionCommand,
    theme: &str,
    out: &mut W,
) -> anyhow::Result<Flow> {
    match command {
        SessionCommand::Upload(path) => {
            let bytes = std::fs::read(&path).map_err(|source| PivotError::FileRead {
                path: path.clone(),
                source,
            })?;
            let outcome = session.upload(&file_name(&path), &bytes)?;
            write_outcome(out, &outcome)?;
        }
        SessionCommand::Download(path) => match session.download() {
            Ok(bytes) => {
                std::fs::write(&path, &bytes).map_err(|source| PivotError::FileWrite {
                    path: path.clone(),
                    source,
                })?;
                writeln!(out, "Saved {} ({} bytes)", path.display(), format_count(bytes.len() as u64))?;
            }
            Err(PivotError::NoData) => writeln!(out, "{}", PivotError::NoData)?,
            Err(e) => return Err(e.into()),
        },
        SessionCommand::Show => match current_table(session)? {
            Some(table) => write!(out, "{}", render_plain(&table))?,
            None => writeln!(out, "{}", PivotError::NoData)?,
        },
        SessionCommand::View => {
            let table = current_table(session)?.unwrap_or_else(|| PivotTable::empty(KeyLayout::default()));
            PivotViewer::new(theme, SHEET_NAME, table).run()?;
        }
        SessionCommand::Help => writeln!(out, "{HELP}")?,
        SessionCommand::Quit => return Ok(Flow::Quit),
        SessionCommand::Invalid(message) => writeln!(out, "{message}")?,
    }
    Ok(Flow::Continue)
}

/// The last upload's result, or else whatever is already stored.
fn current_table<S: SnapshotStore>(
    session: &UploadSession<S>,
) -> anyhow::Result<Option<PivotTable>> {
    if let Some(table) = session.last_result().filter(|t| !t.is_empty()) {
        return Ok(Some(table));
    }
    let stored = session.current_pivot()?;
    Ok((!stored.is_empty()).then_some(stored))
}

fn write_outcome<W: Write>(out: &mut W, outcome: &UploadOutcome) -> std::io::Result<()> {
    let month = outcome
        .target
        .map(|m| m.to_string())
        .unwrap_or_else(|| "unknown month".to_string());
    match &outcome.aggregation {
        Aggregation::Empty(reason) => writeln!(out, "{month}: no data ({reason})")?,
        Aggregation::Month(snapshot) if outcome.persisted => {
            writeln!(out, "{month}: {} rows stored", snapshot.len())?
        }
        Aggregation::Month(snapshot) => writeln!(
            out,
            "{month}: {} rows (not stored: filename has no _YYMM suffix)",
            snapshot.len()
        )?,
    }
    if outcome.result.is_empty() {
        writeln!(out, "{}", PivotError::NoData)?;
    } else {
        write!(out, "{}", render_plain(&outcome.result))?;
    }
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
