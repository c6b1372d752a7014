//! Worker side of the delivery hub: the pipeline that carries one upload task
//! through render, validate, upload, deliver and poll, plus the pool that
//! claims pending work from the task store.

pub mod delivery;
pub mod queue;

pub use delivery::{DeliveryPipeline, WellGeometry, INSERT_REWRITE_TRIGGER};
pub use queue::DeliveryQueue;
