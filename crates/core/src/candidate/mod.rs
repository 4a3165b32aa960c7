//! Candidate resolution.
//!
//! Turns a [`Selection`] (explicit release references, a file of references, or a
//! discovery mode) into an ordered, de-duplicated [`CandidateBatch`]. Discovery
//! modes ask the tracker and drop anything already in the ledger; explicit
//! references are taken as given and bypass the media filter.

mod reference;
mod source;
mod types;

pub use reference::{parse_release_reference, read_reference_file};
pub use source::CandidateSource;
pub use types::{CandidateBatch, CandidateError, Selection, SelectionMode};
