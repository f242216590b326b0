//! Shared test material: RDF documents used by unit and integration tests.

pub mod fixtures;
