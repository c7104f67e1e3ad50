use chrono::NaiveDate;
use ulid::Ulid;

use crate::calendar::{Minute, Slot};

/// Why a check-in attempt was refused. Every variant carries enough context
/// to render a precise kiosk message; all are recoverable by an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionError {
    /// The reservation is for a different calendar day.
    WrongDate { booked: NaiveDate },
    /// Current time is at or past the last slot's end.
    SessionEnded,
    /// No early check-in; come back in `minutes_early`.
    TooEarly { minutes_early: Minute },
    /// More than the grace window past session start; operator must admit
    /// manually.
    TooLate { minutes_late: Minute },
}

impl std::fmt::Display for AdmissionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdmissionError::WrongDate { booked } => {
                write!(f, "booking is for {booked}; check-in is only allowed on the booking date")
            }
            AdmissionError::SessionEnded => {
                write!(f, "session has already ended; check-in is no longer available")
            }
            AdmissionError::TooEarly { minutes_early } => {
                write!(f, "too early: session starts in {minutes_early} minutes")
            }
            AdmissionError::TooLate { minutes_late } => {
                write!(f, "{minutes_late} minutes late: contact an operator for assistance")
            }
        }
    }
}

#[derive(Debug)]
pub enum EngineError {
    NotFound(Ulid),
    UnknownReceipt(String),
    /// Malformed input, rejected before any write. Never retried.
    Validation(&'static str),
    /// Slot no longer free at write time; caller must re-resolve
    /// availability. Never auto-retried or auto-merged.
    Conflict { slot: Slot },
    /// Lifecycle mutation attempted on a cancelled reservation.
    Terminal(Ulid),
    Admission(AdmissionError),
    /// Transient store failure. The monitor logs these and retries next
    /// tick; interactive callers surface them as retryable.
    Store(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::NotFound(id) => write!(f, "reservation not found: {id}"),
            EngineError::UnknownReceipt(code) => write!(f, "no reservation for receipt {code}"),
            EngineError::Validation(msg) => write!(f, "invalid request: {msg}"),
            EngineError::Conflict { slot } => write!(f, "slot {slot} is no longer free"),
            EngineError::Terminal(id) => {
                write!(f, "reservation {id} is cancelled; no further changes allowed")
            }
            EngineError::Admission(e) => write!(f, "check-in refused: {e}"),
            EngineError::Store(e) => write!(f, "store error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}
