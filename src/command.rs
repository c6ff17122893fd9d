use clap::Subcommand;

pub mod cleave;
pub mod threadcount;

pub use cleave::{Cleave, CleaveCMD};
pub use threadcount::determine_reader_threads;

///////////////////////////////
/// Possible subcommands to parse
#[derive(Subcommand)]
pub enum Commands {
    /// Split a BAM file by genome, and optionally by cell
    Cleave(CleaveCMD),
}
