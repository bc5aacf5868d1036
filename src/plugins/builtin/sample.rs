use async_trait::async_trait;

use crate::plugins::Plugin;

/// Illustrative handler with no real logic: echoes its input back.
///
/// Kept registered so the dispatch path can be exercised end-to-end without
/// touching the filesystem.
pub struct SamplePlugin;

impl SamplePlugin {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SamplePlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Plugin for SamplePlugin {
    fn name(&self) -> &str {
        "sample"
    }

    fn description(&self) -> &str {
        "Echoes the input back; exists to demonstrate the handler contract."
    }

    async fn execute(&self, input: &str) -> String {
        format!("Sample plugin received: {input}")
    }
}
