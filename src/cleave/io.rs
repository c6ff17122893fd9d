use std::fmt;
use std::path::{Path, PathBuf};

use rust_htslib::bam::record::Record as BamRecord;

use super::Target;

///////////////////////////////
/// A stream of alignments that can be read more than once
pub trait AlignmentSource {
    /// References of the source header, in index order
    fn targets(&self) -> &[Target];

    /// Read the next record into the given buffer. None once the stream is exhausted
    fn read_next(&mut self, record: &mut BamRecord) -> Option<anyhow::Result<()>>;

    /// Start over from the first record
    fn rewind(&mut self) -> anyhow::Result<()>;
}

///////////////////////////////
/// One open output file
pub trait AlignmentChannel {
    fn write(&mut self, record: &BamRecord) -> anyhow::Result<()>;

    /// Flush and finalize the file
    fn close(self) -> anyhow::Result<()>;
}

///////////////////////////////
/// Opens output files and indexes them once they are closed
pub trait ChannelFactory {
    type Channel: AlignmentChannel;

    /// Open a new output. If the process is out of file handles, the error must
    /// carry a [ChannelsExhausted] so that callers can tell it apart from a real failure
    fn open(&mut self, path: &Path, targets: &[Target]) -> anyhow::Result<Self::Channel>;

    fn index(&mut self, path: &Path) -> anyhow::Result<()>;
}

///////////////////////////////
/// No more files can be opened, because of the limit on open file handles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelsExhausted {
    pub path: PathBuf,
}

impl fmt::Display for ChannelsExhausted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Out of file handles when opening {}", self.path.display())
    }
}

impl std::error::Error for ChannelsExhausted {}

//EMFILE and ENFILE; same numbers on Linux and macOS
const OS_ERRORS_OUT_OF_HANDLES: [i32; 2] = [24, 23];

/// Whether an OS error means the process or system has run out of file handles
pub fn is_out_of_handles(e: &std::io::Error) -> bool {
    e.raw_os_error()
        .is_some_and(|code| OS_ERRORS_OUT_OF_HANDLES.contains(&code))
}

/// Check whether an error from [ChannelFactory::open] only means no more files can be opened
pub fn is_exhausted(e: &anyhow::Error) -> bool {
    e.downcast_ref::<ChannelsExhausted>().is_some()
}
