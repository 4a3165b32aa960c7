//! Source locator.
//!
//! Finds the local copy of a release under the configured source roots,
//! inspects it, and applies the 24-bit mislabel check before anything is
//! transcoded.

mod confirm;
mod locate;

pub use confirm::{Confirmer, StdinConfirmer};
pub use locate::{LocateError, LocatedSource, ReleaseLocator};
