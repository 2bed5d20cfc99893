//! Service layer for review harvesting.
//!
//! This module contains domain logic separated from transport concerns.
//! Services are used by the schedulers and the web server alike.

pub mod harvest;

pub use harvest::ReviewHarvester;
