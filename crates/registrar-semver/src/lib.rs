#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

mod constraint;
mod ops;
mod platform;
mod version;

pub use constraint::VersionConstraint;
pub use ops::SemverOps;
pub use platform::is_platform_package;
pub use version::{ComposerVersion, Stability};
