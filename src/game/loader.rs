use crate::game::parsing::chroma::{self, ParseError};
use crate::game::parsing::embedded::{self, EmbeddedError};
use crate::game::triggers::TriggerBank;
use log::{debug, info, warn};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Where a chart's chroma data came from, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChromaSource {
    Script(PathBuf),
    Embedded(String),
}

impl fmt::Display for ChromaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChromaSource::Script(path) => write!(f, "script '{}'", path.display()),
            ChromaSource::Embedded(key) => write!(f, "embedded data '{key}'"),
        }
    }
}

/// A present-but-broken source is an error and aborts the load; callers keep
/// whatever bank was installed before. Missing sources are never errors.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("{}: {source}", .path.display())]
    Script { path: PathBuf, source: ParseError },
    #[error("{}: {source}", .path.display())]
    Embedded { path: PathBuf, source: EmbeddedError },
    #[error("failed to read '{}': {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
}

/// Resolves and builds the trigger bank for one chart + difficulty.
///
/// Source precedence: difficulty-specific script file, generic script file,
/// embedded chart data (difficulty-specific key, then generic), none. The
/// returned bank is fully built before the caller installs it, so
/// replacement stays atomic.
pub fn load_for_chart(
    chart_path: &Path,
    difficulty: &str,
) -> Result<Option<(TriggerBank, ChromaSource)>, LoadError> {
    for candidate in script_candidates(chart_path, difficulty) {
        match fs::read_to_string(&candidate) {
            Ok(text) => {
                let bank = build_from_script(&candidate, &text)?;
                return Ok(Some((bank, ChromaSource::Script(candidate))));
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                "skipping unreadable chroma script '{}': {e}",
                candidate.display()
            ),
        }
    }

    let text = match fs::read_to_string(chart_path) {
        Ok(text) => text,
        Err(e) => {
            warn!(
                "chart '{}' unreadable ({e}); no chroma data",
                chart_path.display()
            );
            return Ok(None);
        }
    };
    let chart: serde_json::Value = match serde_json::from_str(&text) {
        Ok(value) => value,
        Err(e) => {
            debug!(
                "chart '{}' is not a JSON document ({e}); no embedded chroma data",
                chart_path.display()
            );
            return Ok(None);
        }
    };
    match embedded::extract(&chart, difficulty) {
        Ok(Some((key, per_lane))) => {
            let bank = TriggerBank::build(per_lane);
            info!(
                "loaded {} chroma events from embedded data '{key}' in '{}'",
                bank.authored_event_count(),
                chart_path.display()
            );
            Ok(Some((bank, ChromaSource::Embedded(key))))
        }
        Ok(None) => Ok(None),
        Err(source) => Err(LoadError::Embedded {
            path: chart_path.to_path_buf(),
            source,
        }),
    }
}

/// Loads a standalone `.chroma` file, bypassing chart resolution. Here a
/// missing file *is* an error: the caller asked for this exact script.
pub fn load_script_file(path: &Path) -> Result<(TriggerBank, ChromaSource), LoadError> {
    let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let bank = build_from_script(path, &text)?;
    Ok((bank, ChromaSource::Script(path.to_path_buf())))
}

fn build_from_script(path: &Path, text: &str) -> Result<TriggerBank, LoadError> {
    let per_lane = chroma::parse_script(text).map_err(|source| LoadError::Script {
        path: path.to_path_buf(),
        source,
    })?;
    let bank = TriggerBank::build(per_lane);
    info!(
        "loaded {} chroma events from '{}'",
        bank.authored_event_count(),
        path.display()
    );
    Ok(bank)
}

/// `dir(P)/N_<D>.chroma` then `dir(P)/N.chroma`, per the file-resolution
/// contract.
fn script_candidates(chart_path: &Path, difficulty: &str) -> Vec<PathBuf> {
    let Some(base) = chart_path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
        return Vec::new();
    };
    let dir = chart_path.parent().unwrap_or_else(|| Path::new(""));
    vec![
        dir.join(format!("{base}_{difficulty}.chroma")),
        dir.join(format!("{base}.chroma")),
    ]
}
