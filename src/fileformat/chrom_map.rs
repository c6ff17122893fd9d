use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context};
use rustc_hash::FxHashMap;

///////////////////////////////
/// Translation of reference names, from a file with lines "original<TAB>replacement"
#[derive(Debug, Clone, Default)]
pub struct ChromosomeMap {
    names: FxHashMap<String, String>,
}

impl ChromosomeMap {
    pub fn read(path: &Path) -> anyhow::Result<ChromosomeMap> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open chromosome mapping file {}", path.display()))?;
        let map = ChromosomeMap::from_reader(file)
            .with_context(|| format!("Failed to parse chromosome mapping file {}", path.display()))?;
        log::info!("Read {} chromosome name mappings", map.len());
        Ok(map)
    }

    pub fn from_reader(src: impl Read) -> anyhow::Result<ChromosomeMap> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .from_reader(src);

        let mut map = ChromosomeMap::default();
        for (i, result) in reader.records().enumerate() {
            let row = result?;
            if row.len() == 1 && row[0].is_empty() {
                continue;
            }
            if row.len() < 2 {
                bail!("Line {} does not have two columns", i + 1);
            }
            //First occurrence wins
            map.insert(&row[0], &row[1]);
        }
        Ok(map)
    }

    pub fn insert(&mut self, from: &str, to: &str) {
        if !self.names.contains_key(from) {
            self.names.insert(from.to_string(), to.to_string());
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.names.get(name).map(String::as_str)
    }

    /// Readable name for a reference; the name itself if it has no translation
    pub fn translate<'a>(&'a self, name: &'a str) -> &'a str {
        self.get(name).unwrap_or(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
