//! Command implementations

pub mod assets;

pub mod notes;

pub mod publish;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tagpress_core::context;

/// Environment lookup handed to the core's `GITHUB_*` readers.
pub fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Directory every command resolves assets and the changelog against.
pub fn release_root(cwd: &Utf8Path) -> Utf8PathBuf {
    context::workspace_root(env_var, cwd)
}

/// Render a byte count for humans (`1.5 MiB`).
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    #[allow(clippy::cast_precision_loss)]
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

/// Pretty-print a value as JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
