use serde::{Deserialize, Serialize};

use crate::qos::QualityOfServiceSpec;

/// Settings applied to every participant a [`crate::Factory`] creates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticipantConfig {
    /// Quality of service requested from each port.
    pub quality_of_service: QualityOfServiceSpec,
}

impl ParticipantConfig {
    /// Sets the quality of service.
    #[must_use]
    pub const fn with_quality_of_service(mut self, quality_of_service: QualityOfServiceSpec) -> Self {
        self.quality_of_service = quality_of_service;
        self
    }
}
