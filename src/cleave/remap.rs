use crate::fileformat::ChromosomeMap;

///////////////////////////////
/// One reference sequence as listed in a header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub name: String,
    pub len: u64,
}
impl Target {
    pub fn new(name: impl Into<String>, len: u64) -> Target {
        Target {
            name: name.into(),
            len,
        }
    }
}

///////////////////////////////
/// Which of the two output groupings a record belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Destination {
    First,
    Second,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemapEntry {
    pub destination: Destination,
    pub tid: i32,
}
impl RemapEntry {
    pub fn new(destination: Destination, tid: i32) -> RemapEntry {
        RemapEntry { destination, tid }
    }
}

///////////////////////////////
/// How references are to be split between the destinations.
/// Without prefix and rename table every reference stays in the first destination
#[derive(Debug, Clone, Default)]
pub struct RemapFilter {
    pub prefix: Option<String>,
    pub renames: Option<ChromosomeMap>,
}
impl RemapFilter {
    pub fn is_active(&self) -> bool {
        self.prefix.is_some() || self.renames.is_some()
    }
}

///////////////////////////////
/// Translation of original reference indices into (destination, new index)
#[derive(Debug, Clone)]
pub enum RemapTable {
    /// Everything goes to the first destination with the index unchanged
    Passthrough { targets: Vec<Target> },
    Filtered {
        entries: Vec<RemapEntry>,
        first: Vec<Target>,
        second: Vec<Target>,
    },
}

impl RemapTable {
    pub fn build(targets: &[Target], filter: &RemapFilter) -> RemapTable {
        if !filter.is_active() {
            return RemapTable::Passthrough {
                targets: targets.to_vec(),
            };
        }

        let mut entries = Vec::with_capacity(targets.len());
        let mut first: Vec<Target> = Vec::new();
        let mut second: Vec<Target> = Vec::new();

        for target in targets {
            //Prefix is checked before the rename table
            let stripped = filter
                .prefix
                .as_deref()
                .and_then(|prefix| target.name.strip_prefix(prefix));

            let first_name = match stripped {
                Some(stripped) => Some(stripped.to_string()),
                None => filter
                    .renames
                    .as_ref()
                    .and_then(|renames| renames.get(&target.name))
                    .map(String::from),
            };

            if let Some(name) = first_name {
                entries.push(RemapEntry::new(Destination::First, first.len() as i32));
                first.push(Target::new(name, target.len));
            } else {
                entries.push(RemapEntry::new(Destination::Second, second.len() as i32));
                second.push(target.clone());
            }
        }

        log::info!(
            "Split {} references into {} for the first and {} for the second destination",
            targets.len(),
            first.len(),
            second.len()
        );

        RemapTable::Filtered {
            entries,
            first,
            second,
        }
    }

    pub fn is_filtered(&self) -> bool {
        matches!(self, RemapTable::Filtered { .. })
    }

    /// Look up an original reference index. Index -1 must be handled by the caller, see [RemapTable::route]
    pub fn lookup(&self, tid: usize) -> RemapEntry {
        match self {
            RemapTable::Passthrough { .. } => RemapEntry::new(Destination::First, tid as i32),
            RemapTable::Filtered { entries, .. } => entries[tid],
        }
    }

    /// Like lookup, but also accepts the unplaced index -1, which stays -1.
    /// Unplaced reads follow the fallback unless nothing is being filtered
    pub fn route(&self, tid: i32) -> RemapEntry {
        if tid < 0 {
            match self {
                RemapTable::Passthrough { .. } => RemapEntry::new(Destination::First, -1),
                RemapTable::Filtered { .. } => RemapEntry::new(Destination::Second, -1),
            }
        } else {
            self.lookup(tid as usize)
        }
    }

    /// References to put in the header of files for the given destination
    pub fn targets(&self, destination: Destination) -> &[Target] {
        match self {
            RemapTable::Passthrough { targets } => targets,
            RemapTable::Filtered { first, second, .. } => match destination {
                Destination::First => first,
                Destination::Second => second,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets(names: &[&str]) -> Vec<Target> {
        names
            .iter()
            .enumerate()
            .map(|(i, n)| Target::new(*n, 1000 * (i as u64 + 1)))
            .collect()
    }

    fn names(list: &[Target]) -> Vec<&str> {
        list.iter().map(|t| t.name.as_str()).collect()
    }

    #[test]
    fn passthrough_is_identity() {
        let src = targets(&["chr1", "chr2", "chrM"]);
        let table = RemapTable::build(&src, &RemapFilter::default());

        assert!(!table.is_filtered());
        for i in 0..src.len() {
            assert_eq!(table.lookup(i), RemapEntry::new(Destination::First, i as i32));
        }
        assert_eq!(table.route(-1), RemapEntry::new(Destination::First, -1));
        assert_eq!(table.targets(Destination::First), &src[..]);
        assert_eq!(table.targets(Destination::Second), &src[..]);
    }

    #[test]
    fn prefix_goes_to_first_and_is_stripped() {
        let src = targets(&["chrA", "chrB", "mouse_chr1"]);
        let filter = RemapFilter {
            prefix: Some("mouse_".to_string()),
            ..Default::default()
        };
        let table = RemapTable::build(&src, &filter);

        assert_eq!(names(table.targets(Destination::First)), vec!["chr1"]);
        assert_eq!(names(table.targets(Destination::Second)), vec!["chrA", "chrB"]);
        assert_eq!(table.lookup(0), RemapEntry::new(Destination::Second, 0));
        assert_eq!(table.lookup(1), RemapEntry::new(Destination::Second, 1));
        assert_eq!(table.lookup(2), RemapEntry::new(Destination::First, 0));

        //Lengths follow the reference
        assert_eq!(table.targets(Destination::First)[0].len, 3000);
    }

    #[test]
    fn prefix_wins_over_rename() {
        let src = targets(&["mouse_chr1", "MT", "chrX"]);
        let mut renames = ChromosomeMap::default();
        renames.insert("mouse_chr1", "renamed");
        renames.insert("MT", "chrM");
        let filter = RemapFilter {
            prefix: Some("mouse_".to_string()),
            renames: Some(renames),
        };
        let table = RemapTable::build(&src, &filter);

        assert_eq!(names(table.targets(Destination::First)), vec!["chr1", "chrM"]);
        assert_eq!(names(table.targets(Destination::Second)), vec!["chrX"]);
        assert_eq!(table.lookup(1), RemapEntry::new(Destination::First, 1));
        assert_eq!(table.route(-1), RemapEntry::new(Destination::Second, -1));
    }

    #[test]
    fn rename_only() {
        let src = targets(&["1", "2", "chr1"]);
        let mut renames = ChromosomeMap::default();
        renames.insert("2", "mm_2");
        let filter = RemapFilter {
            prefix: None,
            renames: Some(renames),
        };
        let table = RemapTable::build(&src, &filter);
        assert!(table.is_filtered());
        assert_eq!(names(table.targets(Destination::First)), vec!["mm_2"]);
        assert_eq!(names(table.targets(Destination::Second)), vec!["1", "chr1"]);
    }

    #[test]
    fn empty_rename_table_still_filters() {
        let src = targets(&["chr1"]);
        let filter = RemapFilter {
            prefix: None,
            renames: Some(ChromosomeMap::default()),
        };
        let table = RemapTable::build(&src, &filter);
        assert_eq!(table.lookup(0), RemapEntry::new(Destination::Second, 0));
        assert!(table.targets(Destination::First).is_empty());
    }

    #[test]
    fn lookup_is_stable() {
        let src = targets(&["a", "x_b", "c", "x_d"]);
        let filter = RemapFilter {
            prefix: Some("x_".to_string()),
            ..Default::default()
        };
        let table = RemapTable::build(&src, &filter);
        let once: Vec<RemapEntry> = (0..src.len()).map(|i| table.lookup(i)).collect();
        let twice: Vec<RemapEntry> = (0..src.len()).map(|i| table.lookup(i)).collect();
        assert_eq!(once, twice);
        assert_eq!(
            once,
            vec![
                RemapEntry::new(Destination::Second, 0),
                RemapEntry::new(Destination::First, 0),
                RemapEntry::new(Destination::Second, 1),
                RemapEntry::new(Destination::First, 1),
            ]
        );
    }
}
