//! Core domain types
//!
//! These types represent the fundamental business entities and are shared
//! between the pipeline (which produces them) and the server (which persists
//! and serves them).

pub mod job;
pub mod raw_job;
pub mod subscription;
pub mod tags;
