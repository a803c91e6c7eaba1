//! Golden-file snapshots.
//!
//! Values are stored as pretty JSON with object keys sorted and a trailing
//! newline. A mismatch names the first line that differs. Rerun with
//! `PW_UPDATE_SNAPSHOTS=1` to rewrite goldens.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Environment variable that enables snapshot updates.
pub const UPDATE_SNAPSHOTS_ENV: &str = "PW_UPDATE_SNAPSHOTS";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SnapshotMode {
    Compare,
    Update,
}

impl SnapshotMode {
    fn from_env() -> Self {
        match std::env::var(UPDATE_SNAPSHOTS_ENV) {
            Ok(flag) if matches!(flag.to_ascii_lowercase().as_str(), "1" | "true" | "yes") => {
                Self::Update
            }
            _ => Self::Compare,
        }
    }
}

/// Compare `value` against the golden at `path`, or rewrite the golden when
/// updates are enabled.
pub fn assert_json_snapshot<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> Result<()> {
    let path = path.as_ref();
    let actual = canonical_json(value)?;

    if SnapshotMode::from_env() == SnapshotMode::Update {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        return fs::write(path, &actual)
            .with_context(|| format!("Failed to write golden {}", path.display()));
    }

    let golden = fs::read_to_string(path).with_context(|| {
        format!(
            "No golden at {}; set {}=1 to record one",
            path.display(),
            UPDATE_SNAPSHOTS_ENV
        )
    })?;

    if let Some(line) = first_difference(&golden, &actual) {
        bail!(
            "Golden {} differs at line {} (set {}=1 to accept)",
            path.display(),
            line,
            UPDATE_SNAPSHOTS_ENV
        );
    }
    Ok(())
}

/// 1-based line of the first difference, if any.
fn first_difference(expected: &str, actual: &str) -> Option<usize> {
    if expected == actual {
        return None;
    }
    let mut expected_lines = expected.lines();
    let mut actual_lines = actual.lines();
    let mut line = 1;
    loop {
        match (expected_lines.next(), actual_lines.next()) {
            (Some(e), Some(a)) if e == a => line += 1,
            _ => return Some(line),
        }
    }
}

fn canonical_json<T: Serialize>(value: &T) -> Result<String> {
    let value = serde_json::to_value(value).context("Snapshot value is not serializable")?;
    let mut text = serde_json::to_string_pretty(&sorted(value))
        .context("Failed to render snapshot JSON")?;
    text.push('\n');
    Ok(text)
}

fn sorted(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let ordered: BTreeMap<String, Value> =
                map.into_iter().map(|(k, v)| (k, sorted(v))).collect();
            Value::Object(ordered.into_iter().collect::<Map<_, _>>())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sorted).collect()),
        leaf => leaf,
    }
}
