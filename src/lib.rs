//! # testgen-batch
//!
//! Drives a test-generation service over every source file of a project and
//! records the coverage outcome of each call.
//!
//! For each candidate file, in a stable order:
//! 1. Build a generation request and POST it to the service
//! 2. Decode the streamed response into progress events as they arrive
//! 3. Fold the events into one [`metrics::Metrics`] record
//! 4. Persist the record durably before moving to the next file
//!
//! A failing file is logged and skipped; the run always continues.
//!
//! ## Example
//!
//! ```rust,ignore
//! use testgen_batch::{candidates, client::HttpGenerationClient, driver::BatchDriver, sink::SqliteSink, Config};
//!
//! let config = Config::from_env()?;
//! let sink = SqliteSink::open(&config.output_path)?;
//! let client = HttpGenerationClient::new(config.generate_url.clone());
//! let mut driver = BatchDriver::new(client, sink, config.root_dir.clone(), config.request.clone());
//! let summary = driver.run(candidates::enumerate(&config.root_dir, &config.candidates)).await;
//! ```

pub mod candidates;
pub mod client;
pub mod config;
pub mod decoder;
pub mod driver;
pub mod error;
pub mod events;
pub mod extract;
pub mod metrics;
pub mod request;
pub mod sink;

pub use config::Config;
