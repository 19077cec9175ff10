//! Vehicle-resident position agent.
//!
//! Captures location fixes while a vehicle is being tracked, validates them, sends them to a
//! remote collector and keeps whatever could not be sent in a durable queue until the next
//! flush.

pub mod capture;
pub mod config;
pub mod delivery;
pub mod position;
pub mod queue;
pub mod scheduler;
pub mod status;
pub mod storage;
pub mod sync;
pub mod tracker;
pub mod web;

#[cfg(test)]
mod testing;
