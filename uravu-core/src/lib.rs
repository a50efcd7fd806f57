//! Core types and external service clients for the Uravu flux pipeline.
//!
//! Each collaborator (geocoder, population knowledge base, historical
//! weather archive, elevation service) is reached through a trait so the
//! pipeline can run against the real HTTP clients (behind the `api`
//! feature) or against the in-memory [`fakes`].

pub mod boundary;
pub mod date_range;
pub mod demand;
pub mod error;
pub mod fakes;
pub mod population;
pub mod query;
pub mod report;
pub mod terrain;
pub mod weather;

#[cfg(feature = "api")]
mod http;

pub use error::{
    BoundaryError, BoundaryUnavailable, ElevationUnavailable, PopulationUnavailable, QueryError,
    WeatherUnavailable,
};
