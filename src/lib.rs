pub mod analyzers;
pub mod compare;
pub mod config;
pub mod output;
pub mod parser;
pub mod report;
pub mod sample;
pub mod stats;
