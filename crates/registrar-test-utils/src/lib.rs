#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

mod fake_vcs;
mod seed;

pub use fake_vcs::FakeVcsAdapter;
pub use seed::seed_package;
