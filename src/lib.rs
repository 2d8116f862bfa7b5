pub mod config;
pub mod encoding;
pub mod engine;
pub mod error;
pub mod explain;
pub mod features;
pub mod feedback;
pub mod logging;
pub mod model;
pub mod predict;
pub mod ranks;
pub mod report_export;
pub mod state;
