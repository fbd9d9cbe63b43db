//! Radar Pipeline
//!
//! The job harvesting pipeline: crawl listing pages, record raw candidates,
//! classify them, persist accepted jobs and notify subscribers.
//!
//! Architecture:
//! - Crawl: paginated, age-bounded listing crawler
//! - Processor: keyword filter and completion-backed classifier
//! - Store: persistence contracts implemented by the server
//! - Notify: subscription-filtered email delivery
//! - Scheduler: interval and cron drivers with a single-flight guard
//!
//! Stages talk to each other through traits only, so the server wires in
//! its SQLite store and real HTTP clients while tests use stubs.

pub mod config;
pub mod crawl;
pub mod cron;
pub mod error;
pub mod notify;
pub mod processor;
pub mod scheduler;
pub mod store;
