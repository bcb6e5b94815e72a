//! Event bus and the events published on it.
//!
//! Submodules:
//! - [`bus`] – generic priority publish/subscribe hub with expiry and
//!   consumption
//! - [`collision`] – contact, trigger and tile collision payloads published
//!   by the collision pipeline
pub mod bus;
pub mod collision;
