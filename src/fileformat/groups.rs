use std::collections::BTreeSet;
use std::fs::read_to_string;
use std::path::Path;

use anyhow::{bail, Context};
use rustc_hash::FxHashMap;

///////////////////////////////
/// Assignment of cells to groups. Each line of the file is "KEY-groupNumber"
#[derive(Debug, Clone, Default)]
pub struct GroupTable {
    groups: FxHashMap<String, u32>,
}

impl GroupTable {
    pub fn read(path: &Path) -> anyhow::Result<GroupTable> {
        log::info!("Reading in the groups from {}", path.display());
        let text = read_to_string(path)
            .with_context(|| format!("Failed to read group file {}", path.display()))?;
        let table = GroupTable::parse(&text)
            .with_context(|| format!("Failed to parse group file {}", path.display()))?;
        log::info!("Number of groups found: {}", table.num_groups());
        log::info!("Number of cells read: {}", table.len());
        Ok(table)
    }

    pub fn parse(text: &str) -> anyhow::Result<GroupTable> {
        let mut table = GroupTable::default();
        for (i, line) in text.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }
            //Keys may contain dashes themselves; the group is after the last one
            let Some((key, group)) = line.rsplit_once('-') else {
                bail!("Line {} is not on the form KEY-group: {}", i + 1, line);
            };
            if key.is_empty() {
                bail!("Line {} has an empty key", i + 1);
            }
            let group: u32 = group
                .parse()
                .with_context(|| format!("Line {} has an invalid group number: {}", i + 1, line))?;
            table.insert(key, group);
        }
        Ok(table)
    }

    pub fn insert(&mut self, key: &str, group: u32) {
        self.groups.insert(key.to_string(), group);
    }

    pub fn get(&self, key: &str) -> Option<u32> {
        self.groups.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn num_groups(&self) -> usize {
        self.groups.values().collect::<BTreeSet<_>>().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line() {
        let table = GroupTable::parse("CELLX-7\n").unwrap();
        assert_eq!(table.get("CELLX"), Some(7));
        assert_eq!(table.get("CELLY"), None);
    }

    #[test]
    fn several_cells_per_group() {
        let table = GroupTable::parse("AAAC-1\nAAAG-1\r\n\nTTTA-12\nACGT-1-3\n").unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table.num_groups(), 3);
        assert_eq!(table.get("AAAG"), Some(1));
        assert_eq!(table.get("TTTA"), Some(12));
        assert_eq!(table.get("ACGT-1"), Some(3));
    }

    #[test]
    fn malformed_lines() {
        assert!(GroupTable::parse("CELLX7\n").is_err());
        assert!(GroupTable::parse("CELLX-seven\n").is_err());
        assert!(GroupTable::parse("-3\n").is_err());
    }
}
