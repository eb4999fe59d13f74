//! Minimal `key=value` properties reader shared by the config files.

use crate::error::{KvdbError, Result};

/// Parse `key=value` lines in file order
///
/// Blank lines and lines starting with `#` or `!` are skipped. Whitespace
/// around keys and values is trimmed.
pub fn parse_properties(text: &str) -> Result<Vec<(String, String)>> {
    let mut entries = Vec::new();
    for (lineno, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }
        let (key, value) = line.split_once('=').ok_or_else(|| {
            KvdbError::Config(format!("line {}: expected key=value, got {:?}", lineno + 1, line))
        })?;
        let key = key.trim();
        if key.is_empty() {
            return Err(KvdbError::Config(format!("line {}: empty key", lineno + 1)));
        }
        entries.push((key.to_string(), value.trim().to_string()));
    }
    Ok(entries)
}
