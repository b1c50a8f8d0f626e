//! medrx-core: Shared domain types and pure logic for the prescription
//! analysis server.
//!
//! This crate holds everything that does no I/O: parsing the vision
//! model's reply, classifying search queries, projecting warehouse rows
//! into response shapes, and the search result types.

pub mod error;
pub mod extract;
pub mod patient;
pub mod query;
pub mod search;

pub use error::RecordError;
pub use extract::{ExtractedPrescription, Extraction, NOT_FOUND};
pub use patient::{PatientDetail, PatientListing, PatientRecord};
pub use query::SearchMode;
pub use search::{SearchOutcome, SearchResult, SearchType, similarity_from_distance};
