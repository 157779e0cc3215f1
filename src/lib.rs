pub mod analyzers;
pub mod config;
pub mod error;
pub mod features;
pub mod loader;
pub mod output;
pub mod pipeline;
pub mod plot;
pub mod report;
pub mod table;
