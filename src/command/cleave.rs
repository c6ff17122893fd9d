use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use super::determine_reader_threads;
use crate::cleave::{
    write_split_log, AdmissionPolicy, AlignmentSource, BucketKeySource, Bucketing, ChannelMux,
    ChimeraReport, CleaveOptions, CleaveOutcome, Cleaver, OutputNaming, RemapFilter, RemapTable,
    DEFAULT_CELL_TAG,
};
use crate::fileformat::{read_cell_list_file, BamChannelFactory, BamSource, ChromosomeMap, GroupTable, HeaderTemplate};

///////////////////////////////
/// Argument to -c: either a number of cells, or a file listing them
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellSelection {
    Top(usize),
    List(PathBuf),
}

pub fn parse_cell_selection(s: &str) -> Result<CellSelection, String> {
    if s.is_empty() {
        return Err("expected a number of cells or a file with a list of cells".to_string());
    }
    match s.parse::<usize>() {
        Ok(n) => Ok(CellSelection::Top(n)),
        Err(_) => Ok(CellSelection::List(PathBuf::from(s))),
    }
}

#[derive(Args)]
pub struct CleaveCMD {
    #[arg(short = 'b', value_parser)]
    /// BAM file to split
    pub path_in: PathBuf,

    #[arg(short = 'm', value_parser)]
    /// Chromosome mapping file. Chromosomes listed are renamed and go to the first genome
    pub path_chrom_map: Option<PathBuf>,

    #[arg(short = 'g', value_parser)]
    /// Write one file per group of cells, given a file with lines CELL-group
    pub path_groups: Option<PathBuf>,

    #[arg(short = 'p')]
    /// Chromosomes beginning with this go to the first genome, with the prefix stripped
    pub prefix: Option<String>,

    #[arg(short = 'c', value_parser = parse_cell_selection)]
    /// Create files for the top N cells, or for the cells listed in a file
    pub cells: Option<CellSelection>,

    #[arg(short = 't', default_value = DEFAULT_CELL_TAG)]
    /// Tag holding the cell identity
    pub tag: String,

    #[arg(short = 'n')]
    /// Take the cell identity from the read name, up to any of these characters
    pub name_stop_chars: Option<String>,

    #[arg(short = 'o', value_parser)]
    /// Output file root (default: input file without extension)
    pub path_out: Option<PathBuf>,

    #[arg(long = "write-group-records")]
    /// In group mode, also write the reads into the group files
    pub write_group_records: bool,

    //Thread settings
    #[arg(short = '@', value_parser = clap::value_parser!(usize))]
    num_threads_total: Option<usize>,
}

impl CleaveCMD {
    /// Run the commandline option
    pub fn try_execute(&mut self) -> Result<()> {
        let num_threads = determine_reader_threads(self.num_threads_total)?;
        log::info!("Using threads {}", num_threads);

        let chromosome_map = match &self.path_chrom_map {
            Some(path) => Some(ChromosomeMap::read(path)?),
            None => None,
        };

        let key_source = match &self.name_stop_chars {
            Some(stop_chars) => BucketKeySource::read_name(stop_chars),
            None => BucketKeySource::tag(&self.tag)?,
        };

        let policy = if let Some(path_groups) = &self.path_groups {
            if self.cells.is_some() {
                log::warn!("Both groups and cells given; splitting by group");
            }
            Some(AdmissionPolicy::Grouped(GroupTable::read(path_groups)?))
        } else {
            match &self.cells {
                Some(CellSelection::Top(n)) => Some(AdmissionPolicy::TopK(*n)),
                Some(CellSelection::List(path)) => {
                    Some(AdmissionPolicy::Listed(read_cell_list_file(path)?))
                }
                None => None,
            }
        };

        let bucketing = match policy {
            Some(policy) => Bucketing::ByCell { key_source, policy },
            None => Bucketing::None,
        };

        Cleave::run(&Cleave {
            path_in: self.path_in.clone(),
            path_out: self.path_out.clone(),
            prefix: self.prefix.clone(),
            chromosome_map,
            options: CleaveOptions {
                bucketing,
                write_group_records: self.write_group_records,
            },
            num_threads,
            command_line: std::env::args().collect::<Vec<_>>().join(" "),
        })?;

        log::info!("Cleave has finished successfully");
        Ok(())
    }
}

pub struct Cleave {
    pub path_in: PathBuf,
    pub path_out: Option<PathBuf>,
    pub prefix: Option<String>,
    pub chromosome_map: Option<ChromosomeMap>,
    pub options: CleaveOptions,
    pub num_threads: usize,
    pub command_line: String,
}

impl Cleave {
    /// Run the algorithm
    pub fn run(params: &Cleave) -> Result<CleaveOutcome> {
        let mut source = BamSource::open(&params.path_in, params.num_threads)?;

        let filter = RemapFilter {
            prefix: params.prefix.clone(),
            renames: params.chromosome_map.clone(),
        };
        let remap = RemapTable::build(source.targets(), &filter);

        let naming = OutputNaming::from_input(
            &params.path_in,
            params.path_out.as_deref(),
            params.prefix.as_deref(),
        );
        let template = HeaderTemplate::from_source(&source.header_text(), &params.command_line);
        let mut mux = ChannelMux::new(BamChannelFactory::new(template), naming.clone(), &remap)?;

        //Reads with one end in each genome are only possible when splitting genomes
        let mut chimeras = if remap.is_filtered() {
            let path = naming.chimeras();
            let file = File::create(&path)
                .with_context(|| format!("Failed to open chimera file {}", path.display()))?;
            Some(ChimeraReport::new(BufWriter::new(file))?)
        } else {
            None
        };

        let path_log = naming.log();
        let log_file = File::create(&path_log)
            .with_context(|| format!("Failed to open log file {}", path_log.display()))?;

        let names = params.chromosome_map.clone().unwrap_or_default();
        let outcome = Cleaver::new(&remap, &names, &params.options).run(&mut source, &mut mux, chimeras.as_mut())?;

        if let Some(chimeras) = chimeras {
            chimeras.finish()?;
        }
        if outcome.emit_report {
            write_split_log(BufWriter::new(log_file), &outcome.stats, outcome.registry.as_ref())?;
        }

        for closed in &outcome.closed {
            log::info!("Wrote {} reads to {}", closed.records, closed.path.display());
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_selection() {
        assert_eq!(parse_cell_selection("1000"), Ok(CellSelection::Top(1000)));
        assert_eq!(
            parse_cell_selection("cells.txt"),
            Ok(CellSelection::List(PathBuf::from("cells.txt")))
        );
        assert!(parse_cell_selection("").is_err());
    }
}
