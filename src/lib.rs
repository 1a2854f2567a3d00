//! earshot - acoustic sensor network backend
//!
//! Ingests arrival reports from a network of acoustic sensors and infers
//! discrete impulsive-source events (time and location) via
//! time-difference-of-arrival multilateration. Bursts of ingest activity
//! are debounced into single detection sweeps; each sweep correlates
//! reports into candidate groups and localizes every qualifying group.

pub mod api;
pub mod db;
pub mod detect;
pub mod error;
pub mod events;
pub mod publish;

pub use error::{Error, Result};
