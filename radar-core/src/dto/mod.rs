//! Data Transfer Objects
//!
//! Lightweight types passed between the crawl engine, the stores and the HTTP
//! API. Unlike the domain types they carry no store-assigned fields.

pub mod job;
pub mod meta;
pub mod raw_job;
pub mod subscription;
