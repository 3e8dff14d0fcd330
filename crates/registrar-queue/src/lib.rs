#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

mod tokio_queue;
mod traits;

pub use tokio_queue::TokioJobQueue;
pub use traits::{Job, JobQueue};
