//! Pre-shift checklists: rotated question selection, answers and evaluation.
//!
//! - [`rotation`] picks which questions a check asks (pure, cursor in/cursor out)
//! - [`evaluation`] derives pass/fail from answered items (pure)
//! - [`instance`] drives one check through its lifecycle
//! - [`service`] ties the above to the collaborator stores

pub mod evaluation;
pub mod instance;
pub mod rotation;
pub mod rules;
pub mod service;

pub use evaluation::{evaluate, has_critical_failure, is_complete};
pub use rotation::{applies_to, select_rotated, RotationSelection};
pub use service::ChecklistService;
