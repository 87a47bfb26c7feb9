// src/models/mod.rs

//! Domain models for the crawler.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod facility;
mod job;
mod slot;

// Re-export all public types
pub use config::{BreakerConfig, Config, CrawlerConfig, OutputConfig, PortalConfig};
pub use facility::{Court, Facility, ResponseFormat};
pub use job::CrawlJob;
pub use slot::{CourtAvailability, DailyResult, DailyStatus, SlotTime, TimeSlot};
