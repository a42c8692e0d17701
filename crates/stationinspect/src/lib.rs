//! `stationinspect` - Broadcast station inspections and compliance reports
//!
//! This library records transmitter site inspections, checks effective
//! radiated power and equipment against licensing rules, and assembles the
//! formal inspection report as a Word document. The same operations are
//! exposed through the `stinspect` CLI and an HTTP API.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod assembler;
pub mod cli;
pub mod config;
pub mod docx;
pub mod erp;
pub mod error;
pub mod logging;
pub mod media;
pub mod model;
pub mod narrative;
pub mod numbering;
pub mod server;
pub mod service;
pub mod storage;
pub mod units;
pub mod validation;
pub mod violations;

pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use service::ReportService;
pub use storage::{Storage, StorageStats};
