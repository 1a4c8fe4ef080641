//! costgate - budget-driven streaming quality controller
//!
//! Periodically reads month-to-date cloud spend against a budget, maps the
//! utilization to a quality tier and caps the media server's remote
//! streaming bitrate to match. The last applied decision is persisted so
//! unchanged tiers never touch the media server.

pub mod budget;
pub mod cli;
pub mod config;
pub mod controller;
pub mod logging;
pub mod media;
pub mod metrics;
pub mod policy;
pub mod state;
