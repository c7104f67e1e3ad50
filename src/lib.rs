//! Backline: booking and session lifecycle engine for a recording-studio
//! complex with fixed 30-minute slots.
//!
//! The engine owns validation, conflict admission, the
//! pending/confirmed/cancelled lifecycle, presence tracking, and loyalty
//! accrual over a pluggable document store ([`engine::store`]). Background
//! concerns live beside it: [`monitor`] sweeps for no-shows and overruns,
//! [`notify`] turns store snapshots into alerts.

pub mod calendar;
pub mod engine;
pub mod model;
pub mod monitor;
pub mod notify;
pub mod observability;
pub mod selection;

pub use engine::{Engine, EngineError, Outcome};
