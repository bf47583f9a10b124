//! Energy allocation (rateio) engine.
//!
//! Pure, in-process logic: no I/O, no shared state. Callers own the
//! participant list and pass it in.
//!
//! - `calculate_auto_distribution` derives allocations and credit usage
//! - [`validate_rateio`] checks the share rules and flags over-allocation
//! - [`RateioDraft`] sequences edits the way an operator makes them

mod distribute;
mod draft;
mod error;
mod validate;

pub use draft::{RateioDraft, ShareField};
pub use error::{AllocationError, ValidationReport};
pub use validate::{DEFAULT_TOLERANCE, validate_rateio};
