pub mod check;
pub mod gain;
pub mod merge;
pub mod process;
pub mod trim;
