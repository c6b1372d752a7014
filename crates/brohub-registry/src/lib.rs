//! Client for the Bronhouderportaal delivery API and the public
//! uitgifteservice geometry lookup.

pub mod client;
pub mod delivery;
pub mod geometry;

pub use client::{upload_id_from_url, RegistryApi, RegistryClient};
pub use delivery::{BronDocument, DeliveryStatus, ValidationOutcome};
pub use geometry::GeometryClient;
