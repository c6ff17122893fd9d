use std::fs::read_to_string;
use std::path::Path;

use anyhow::Context;

/// Read a file with one cell per line. Blank lines are ignored
pub fn read_cell_list_file(filename: &Path) -> anyhow::Result<Vec<String>> {
    let text = read_to_string(filename)
        .with_context(|| format!("Failed to read file with list of cells {}", filename.display()))?;
    Ok(parse_cell_list(&text))
}

pub fn parse_cell_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}
