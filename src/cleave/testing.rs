//! In-memory sources and outputs, so the splitting logic can be tested without BAM files

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use rust_htslib::bam::record::Aux;
use rust_htslib::bam::record::Record as BamRecord;

use super::io::{AlignmentChannel, AlignmentSource, ChannelFactory, ChannelsExhausted};
use super::Target;

const FLAG_PAIRED: u16 = 0x1;
const FLAG_UNMAPPED: u16 = 0x4;
const FLAG_MATE_UNMAPPED: u16 = 0x8;

fn record(name: &str, tid: i32, mtid: i32, flags: u16) -> BamRecord {
    let mut record = BamRecord::new();
    record.set(name.as_bytes(), None, b"ACGT", &[30, 30, 30, 30]);
    record.set_tid(tid);
    record.set_pos(100);
    record.set_mtid(mtid);
    record.set_mpos(if mtid < 0 { -1 } else { 200 });
    record.set_flags(flags);
    record
}

/// Mapped read without a mapped mate
pub fn read(name: &str, tid: i32) -> BamRecord {
    record(name, tid, -1, FLAG_PAIRED | FLAG_MATE_UNMAPPED)
}

/// Mapped read whose mate maps to mtid
pub fn pair(name: &str, tid: i32, mtid: i32) -> BamRecord {
    record(name, tid, mtid, FLAG_PAIRED)
}

/// Unmapped read; the mate, if any, maps to mtid
pub fn unmapped(name: &str, mtid: i32) -> BamRecord {
    if mtid < 0 {
        record(name, -1, -1, FLAG_PAIRED | FLAG_UNMAPPED | FLAG_MATE_UNMAPPED)
    } else {
        record(name, mtid, mtid, FLAG_PAIRED | FLAG_UNMAPPED)
    }
}

pub fn tagged(mut record: BamRecord, cell: &str) -> BamRecord {
    record.push_aux(b"XC", Aux::String(cell)).unwrap();
    record
}

pub fn qname(record: &BamRecord) -> String {
    String::from_utf8_lossy(record.qname()).into_owned()
}

///////////////////////////////
pub struct VecSource {
    targets: Vec<Target>,
    records: Vec<BamRecord>,
    pos: usize,
    pub rewinds: usize,
}
impl VecSource {
    pub fn new(targets: Vec<Target>, records: Vec<BamRecord>) -> VecSource {
        VecSource {
            targets,
            records,
            pos: 0,
            rewinds: 0,
        }
    }
}
impl AlignmentSource for VecSource {
    fn targets(&self) -> &[Target] {
        &self.targets
    }

    fn read_next(&mut self, record: &mut BamRecord) -> Option<anyhow::Result<()>> {
        let next = self.records.get(self.pos)?;
        *record = next.clone();
        self.pos += 1;
        Some(Ok(()))
    }

    fn rewind(&mut self) -> anyhow::Result<()> {
        self.pos = 0;
        self.rewinds += 1;
        Ok(())
    }
}

///////////////////////////////
#[derive(Default)]
struct MemoryFiles {
    opened: Vec<(PathBuf, Vec<String>)>,
    files: BTreeMap<PathBuf, Vec<BamRecord>>,
    indexed: Vec<PathBuf>,
}

/// Keeps every written file in memory. Clones share the same files
#[derive(Clone, Default)]
pub struct MemoryFactory {
    files: Rc<RefCell<MemoryFiles>>,
    max_open: Option<usize>,
    fail_open: Option<String>,
    fail_index: bool,
}
impl MemoryFactory {
    /// Refuse to open more than this many files in total, like a process out of handles
    pub fn with_max_open(max_open: usize) -> MemoryFactory {
        MemoryFactory {
            max_open: Some(max_open),
            ..Default::default()
        }
    }

    /// Fail to open any path containing this text, as if the disk refused it
    pub fn failing_open(mut self, path_part: &str) -> MemoryFactory {
        self.fail_open = Some(path_part.to_string());
        self
    }

    pub fn failing_index(mut self) -> MemoryFactory {
        self.fail_index = true;
        self
    }

    /// Paths and header reference names, in order of opening
    pub fn opened(&self) -> Vec<(PathBuf, Vec<String>)> {
        self.files.borrow().opened.clone()
    }

    pub fn indexed(&self) -> Vec<PathBuf> {
        self.files.borrow().indexed.clone()
    }

    pub fn records_in(&self, path: &Path) -> Vec<BamRecord> {
        self.files.borrow().files.get(path).cloned().unwrap_or_default()
    }

    pub fn names_in(&self, path: &Path) -> Vec<String> {
        self.records_in(path).iter().map(qname).collect()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.borrow().files.keys().cloned().collect()
    }
}

pub struct MemoryChannel {
    path: PathBuf,
    records: Vec<BamRecord>,
    files: Rc<RefCell<MemoryFiles>>,
}
impl AlignmentChannel for MemoryChannel {
    fn write(&mut self, record: &BamRecord) -> anyhow::Result<()> {
        self.records.push(record.clone());
        Ok(())
    }

    fn close(self) -> anyhow::Result<()> {
        self.files.borrow_mut().files.insert(self.path, self.records);
        Ok(())
    }
}

impl ChannelFactory for MemoryFactory {
    type Channel = MemoryChannel;

    fn open(&mut self, path: &Path, targets: &[Target]) -> anyhow::Result<MemoryChannel> {
        let mut files = self.files.borrow_mut();
        if let Some(max_open) = self.max_open {
            if files.opened.len() >= max_open {
                return Err(anyhow::Error::new(ChannelsExhausted {
                    path: path.to_path_buf(),
                }));
            }
        }
        if let Some(part) = &self.fail_open {
            if path.to_string_lossy().contains(part.as_str()) {
                anyhow::bail!("Permission denied: {}", path.display());
            }
        }
        files.opened.push((
            path.to_path_buf(),
            targets.iter().map(|t| t.name.clone()).collect(),
        ));
        Ok(MemoryChannel {
            path: path.to_path_buf(),
            records: Vec::new(),
            files: Rc::clone(&self.files),
        })
    }

    fn index(&mut self, path: &Path) -> anyhow::Result<()> {
        if self.fail_index {
            anyhow::bail!("File is not sorted");
        }
        self.files.borrow_mut().indexed.push(path.to_path_buf());
        Ok(())
    }
}
