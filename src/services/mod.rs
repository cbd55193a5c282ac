pub mod charts;
pub mod dataset;
pub mod report;
pub mod stats;
pub mod summary;
