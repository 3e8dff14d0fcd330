#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

mod error;
mod json;
mod model;

pub use error::{Error, Result};
pub use json::{from_json, from_json_slice, to_json, to_json_pretty};
pub use model::{DependencyEdge, Package, PackageVersion, PluginRecord, RawJson, VersionState};

pub use ahash::{AHashMap, AHashSet};
pub use dashmap::DashMap;
pub use parking_lot::{Mutex, RwLock};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;
