pub mod cli;
pub mod helper;
pub mod pipelines;
