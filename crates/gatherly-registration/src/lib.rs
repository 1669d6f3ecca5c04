//! # gatherly-registration
//!
//! The capacity-bounded registration engine: given an event with a fixed
//! capacity and an optional waitlist, decide under concurrency whether each
//! registering user is confirmed or waitlisted, keep the waitlist strictly
//! ordered by arrival, and promote the waitlist head when a confirmed slot
//! frees up. The event's confirmed count never exceeds its capacity and never
//! drifts from the actual set of confirmed registrations.
//!
//! ## Components
//!
//! - [`AdmissionController`] decides confirm-vs-waitlist-vs-reject for a new
//!   registration and applies the decision with one conditional commit.
//! - [`PromotionEngine`] handles unregistration: it deletes the registration
//!   and, when a confirmed slot is vacated, either promotes the waitlist head
//!   (count unchanged) or decrements the count.
//! - [`WaitlistIndex`] answers head/next-position queries over the store.
//! - [`RegistrationService`] is the facade the HTTP layer consumes.
//!
//! ## Concurrency
//!
//! The engine holds no locks and keeps no mutable state; it can run on any
//! number of stateless instances. Atomicity comes from the store's
//! revision-guarded `commit_event`: the engine reads an event record, decides,
//! and commits against the revision it read. A concurrent commit on the same
//! event makes the write fail with a revision conflict, which the engine
//! retries with bounded exponential backoff before surfacing
//! [`RegistrationError::Aborted`]. Operations on different events never
//! contend.

mod admission;
mod error;
mod promotion;
mod retry;
mod service;
mod waitlist;

pub use admission::AdmissionController;
pub use error::RegistrationError;
pub use promotion::PromotionEngine;
pub use retry::RetryPolicy;
pub use service::RegistrationService;
pub use waitlist::WaitlistIndex;
