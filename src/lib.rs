pub mod cleave;
pub mod command;
pub mod fileformat;
