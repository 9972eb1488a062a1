//! Crit walk tracker orchestration.
//!
//! [`tracker::CritWalkTracker`] implements every inspection operation on top
//! of two collaborators: an [`store::InspectionStore`] for documents and a
//! [`blob::BlobStore`] for photos. Postgres, filesystem, S3 and in-memory
//! implementations are provided.

pub mod blob;
pub mod config;
pub mod error;
pub mod retention;
pub mod retry;
pub mod store;
pub mod tracker;
