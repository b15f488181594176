//! Geometry of structured domains and their boundary faces.
//!
//! - [`domain`]: node layout shared by all domains, corner offsets and side walks
//! - [`face`]: canonical face signatures and the matches between them

pub mod domain;
pub mod face;

pub use domain::{DomainLayout, FaceWalk, N_SIDES};
pub use face::{Face, FaceMatch};
