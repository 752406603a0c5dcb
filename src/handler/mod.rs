//! Batch and single-job lifecycle managers.

mod adapter;
mod batch;
mod history;
mod job;
mod resources;

use crate::config::Config;
use crate::store::ResourceStore;

pub use self::batch::BatchHandler;
pub use self::job::JobHandler;

/// State shared by every request: the resource store and the configuration
#[derive(Debug)]
pub struct HandlerContext<S> {
    pub store: S,
    pub config: Config,
}

impl<S: ResourceStore> HandlerContext<S> {
    pub fn new(store: S, config: Config) -> Self {
        HandlerContext { store, config }
    }
}
