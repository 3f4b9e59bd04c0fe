pub mod compare;
pub mod config;
pub mod data_load;
pub mod did;
pub mod error;
pub mod fingerprint;
pub mod football_data;
pub mod geo;
pub mod goal_stats;
pub mod http_cache;
pub mod http_client;
pub mod ols;
pub mod pipeline;
pub mod stats;
pub mod sweep;
pub mod table;
pub mod team_stats;

pub use error::{AnalysisError, Result};
pub use table::{Table, Value};
