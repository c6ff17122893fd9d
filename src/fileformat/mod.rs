pub mod bam;
pub mod cell_list_file;
pub mod chrom_map;
pub mod groups;

pub use bam::{BamChannelFactory, BamSource, HeaderTemplate};
pub use cell_list_file::read_cell_list_file;
pub use chrom_map::ChromosomeMap;
pub use groups::GroupTable;
