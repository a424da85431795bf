pub mod audit;
pub mod config;
pub mod data;
pub mod divergence;
pub mod error;
pub mod family_share;
pub mod pipeline;
pub mod rating;
pub mod type_scores;
pub mod unify;

pub use config::Config;
pub use error::{Error, Result};
pub use pipeline::{Report, analyze, run};
