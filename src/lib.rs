//! Conflict detection and time normalization for shared-resource reservations.
//!
//! - [`time`] canonicalizes raw datetime strings into offset-qualified instants.
//! - [`model`] holds the half-open [`model::TimeRange`] and reservation types.
//! - [`engine`] decides admission ([`engine::check`]), audits stored data
//!   ([`engine::audit_all`]), validates payloads, and runs the serialized write
//!   path over a [`engine::ReservationStore`].
//! - [`dump`] audits a dump of stored rows for the command-line tool.

pub mod config;
pub mod dump;
pub mod engine;
pub mod model;
pub mod observability;
pub mod time;
