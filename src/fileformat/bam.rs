use std::path::{Path, PathBuf};

use anyhow::Context;
use rust_htslib::bam;
use rust_htslib::bam::record::Record as BamRecord;
use rust_htslib::bam::{HeaderView, Read};

use crate::cleave::io::is_out_of_handles;
use crate::cleave::{AlignmentChannel, AlignmentSource, ChannelFactory, ChannelsExhausted, Target};

pub const PROGRAM_ID: &str = "bamcleave";

///////////////////////////////
/// Reads a BAM/SAM/CRAM file. Rewinding opens the file anew
pub struct BamSource {
    path: PathBuf,
    reader: bam::Reader,
    targets: Vec<Target>,
    num_threads: usize,
}

impl BamSource {
    pub fn open(path: &Path, num_threads: usize) -> anyhow::Result<BamSource> {
        let reader = open_reader(path, num_threads)?;
        let targets = targets_of(reader.header());
        log::info!("Input has {} references", targets.len());
        Ok(BamSource {
            path: path.to_path_buf(),
            reader,
            targets,
            num_threads,
        })
    }

    /// Raw text of the input header
    pub fn header_text(&self) -> Vec<u8> {
        self.reader.header().as_bytes().to_vec()
    }
}

fn open_reader(path: &Path, num_threads: usize) -> anyhow::Result<bam::Reader> {
    let mut reader = bam::Reader::from_path(path)
        .with_context(|| format!("Failed to open input file {}", path.display()))?;
    if num_threads > 1 {
        //Activate multithreaded decompression
        reader.set_threads(num_threads)?;
    }
    Ok(reader)
}

pub fn targets_of(header: &HeaderView) -> Vec<Target> {
    (0..header.target_count())
        .map(|tid| {
            Target::new(
                String::from_utf8_lossy(header.tid2name(tid)),
                header.target_len(tid).unwrap_or(0),
            )
        })
        .collect()
}

impl AlignmentSource for BamSource {
    fn targets(&self) -> &[Target] {
        &self.targets
    }

    fn read_next(&mut self, record: &mut BamRecord) -> Option<anyhow::Result<()>> {
        self.reader
            .read(record)
            .map(|r| r.with_context(|| format!("Failed to parse record in {}", self.path.display())))
    }

    fn rewind(&mut self) -> anyhow::Result<()> {
        log::debug!("Rewinding {}", self.path.display());
        self.reader = open_reader(&self.path, self.num_threads)?;
        Ok(())
    }
}

///////////////////////////////
/// Header of the input with its @SQ lines swapped for those of one destination,
/// plus a @PG line for this program
#[derive(Debug, Clone)]
pub struct HeaderTemplate {
    hd: Vec<String>,
    other: Vec<String>,
    program: String,
}

impl HeaderTemplate {
    pub fn from_source(text: &[u8], command_line: &str) -> HeaderTemplate {
        let text = String::from_utf8_lossy(text);
        let mut hd = Vec::new();
        let mut other = Vec::new();
        for line in text.lines().filter(|l| !l.is_empty()) {
            if line.starts_with("@HD\t") {
                hd.push(line.to_string());
            } else if !line.starts_with("@SQ\t") {
                other.push(line.to_string());
            }
        }

        //Program IDs must be unique, for instance if the input was made by this program too
        let taken = |id: &str| {
            let field = format!("ID:{}", id);
            other
                .iter()
                .any(|l| l.starts_with("@PG\t") && l.split('\t').any(|f| f == field))
        };
        let mut id = PROGRAM_ID.to_string();
        let mut n = 0;
        while taken(&id) {
            n += 1;
            id = format!("{}.{}", PROGRAM_ID, n);
        }
        let program = format!(
            "@PG\tID:{}\tPN:{}\tVN:{}\tCL:{}",
            id,
            PROGRAM_ID,
            env!("CARGO_PKG_VERSION"),
            command_line.replace('\t', " ")
        );

        HeaderTemplate { hd, other, program }
    }

    pub fn render(&self, targets: &[Target]) -> Vec<u8> {
        let mut lines: Vec<String> = self.hd.clone();
        for t in targets {
            lines.push(format!("@SQ\tSN:{}\tLN:{}", t.name, t.len));
        }
        lines.extend(self.other.iter().cloned());
        lines.push(self.program.clone());

        let mut text = lines.join("\n");
        text.push('\n');
        text.into_bytes()
    }

    pub fn to_header(&self, targets: &[Target]) -> bam::Header {
        bam::Header::from_template(&HeaderView::from_bytes(&self.render(targets)))
    }
}

///////////////////////////////
/// Writes BAM files and indexes them with a .bai
pub struct BamChannelFactory {
    template: HeaderTemplate,
}

impl BamChannelFactory {
    pub fn new(template: HeaderTemplate) -> BamChannelFactory {
        BamChannelFactory { template }
    }
}

pub struct BamChannel {
    writer: bam::Writer,
}

impl AlignmentChannel for BamChannel {
    fn write(&mut self, record: &BamRecord) -> anyhow::Result<()> {
        self.writer.write(record)?;
        Ok(())
    }

    fn close(self) -> anyhow::Result<()> {
        //htslib flushes and writes the EOF block when the writer is dropped
        drop(self.writer);
        Ok(())
    }
}

impl ChannelFactory for BamChannelFactory {
    type Channel = BamChannel;

    fn open(&mut self, path: &Path, targets: &[Target]) -> anyhow::Result<BamChannel> {
        let header = self.template.to_header(targets);
        match bam::Writer::from_path(path, &header, bam::Format::Bam) {
            Ok(writer) => Ok(BamChannel { writer }),
            Err(e) => {
                //htslib leaves the reason in errno
                let os_error = std::io::Error::last_os_error();
                if is_out_of_handles(&os_error) {
                    Err(anyhow::Error::new(ChannelsExhausted {
                        path: path.to_path_buf(),
                    })
                    .context(os_error))
                } else {
                    Err(e).with_context(|| format!("Failed to open output file {}", path.display()))
                }
            }
        }
    }

    fn index(&mut self, path: &Path) -> anyhow::Result<()> {
        bam::index::build(path, None, bam::index::Type::Bai, 1)
            .with_context(|| format!("Failed to index {}", path.display()))?;
        Ok(())
    }
}
