//! Nearby public-transit monitor.
//!
//! Periodically fetches stations and departures around a coordinate from
//! the stations API, keeps the last good result when the API misbehaves,
//! and derives the metrics consumers read: station count, minutes to the
//! next departure, and a ranked departure board.

pub mod city;
pub mod config;
pub mod coordinator;
pub mod domain;
pub mod fetch;
pub mod metrics;
pub mod sensors;
pub mod web;
