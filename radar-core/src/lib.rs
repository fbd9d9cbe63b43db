//! Radar Core
//!
//! Core types shared by the Remote Radar crates.
//!
//! This crate contains:
//! - Domain types: Raw crawl records, classified jobs, subscriptions
//! - DTOs: Data transfer objects passed between the pipeline, the store and the HTTP API

pub mod domain;
pub mod dto;
