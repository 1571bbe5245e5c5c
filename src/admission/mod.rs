// src/admission/mod.rs

//! Admission control: the gate between "ready" and "running".
//!
//! - [`territory`] implements declared, advisory exclusive claims over
//!   logical resources, with a conflict predicate.
//! - [`governor`] filters the scheduler's ready set down to what may
//!   actually start now, applying per-tier concurrency ceilings and
//!   territory conflicts.

pub mod governor;
pub mod territory;

pub use governor::{
    ActiveByTier, Admission, AdmissionController, DenialReason, TierLimits,
};
pub use territory::{Territory, TerritoryClaim};
