//! Event dispatch.
//!
//! [`LabelBot`] owns the platform client and the plugin configuration and
//! routes each webhook event to either the comment path ([`note`]) or the
//! pull request path ([`pull_request`]).

pub mod note;
pub mod pull_request;

use std::sync::Arc;

use crate::config::Configuration;
use crate::platform::LabelPlatform;

pub use note::NoteOutcome;
pub use pull_request::PrOutcome;

/// Label service state shared by every event.
#[derive(Clone)]
pub struct LabelBot {
    platform: Arc<dyn LabelPlatform>,
    configuration: Arc<Configuration>,
}

impl LabelBot {
    pub fn new(platform: Arc<dyn LabelPlatform>, configuration: Arc<Configuration>) -> Self {
        Self {
            platform,
            configuration,
        }
    }

    #[must_use]
    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    pub(crate) fn platform(&self) -> Arc<dyn LabelPlatform> {
        Arc::clone(&self.platform)
    }
}
