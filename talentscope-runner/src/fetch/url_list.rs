use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::warn;

/// One URL per line. Blank lines and `#` comments are skipped, as are lines
/// that are not http(s) URLs.
pub fn parse_url_list(content: &str) -> Vec<String> {
    content
        .lines()
        .enumerate()
        .filter_map(|(number, line)| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            if !(line.starts_with("http://") || line.starts_with("https://")) {
                warn!("Skipping line {}: not an http(s) URL: {}", number + 1, line);
                return None;
            }
            Some(line.to_string())
        })
        .collect()
}

pub fn load_url_list<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading URL list {}", path.display()))?;
    Ok(parse_url_list(&content))
}
