//! Sandboxed file access handler.
//!
//! Accepts `"<command>:<argument>"` inputs and confines every filesystem
//! operation to the configured sandbox root. A denied path yields an
//! ordinary result string, not a transport error, so probing the sandbox is
//! indistinguishable from any other handler activity at the status-code
//! level.
//!
//! All I/O uses `tokio::fs` to avoid blocking the async runtime.

use std::path::Path;

use async_trait::async_trait;

use crate::plugins::sandbox::Sandbox;
use crate::plugins::Plugin;

const ACCESS_DENIED: &str = "Access denied: Outside sandbox.";
const UNKNOWN_COMMAND: &str = "Unknown command.";

/// Reserved: the write command is intentionally not implemented. The
/// handler returns this fixed placeholder and never mutates the filesystem.
const WRITE_NOT_IMPLEMENTED: &str = "Write operation not implemented.";

pub struct FileAccessPlugin {
    sandbox: Sandbox,
}

impl FileAccessPlugin {
    /// Creates the handler over an existing sandbox root directory.
    pub fn new(sandbox_root: &Path) -> std::io::Result<Self> {
        Ok(Self {
            sandbox: Sandbox::open(sandbox_root)?,
        })
    }
}

#[async_trait]
impl Plugin for FileAccessPlugin {
    fn name(&self) -> &str {
        "file_access"
    }

    fn description(&self) -> &str {
        "Reads files confined to the configured sandbox directory. \
         Input format: \"read:<relative path>\"."
    }

    async fn execute(&self, input: &str) -> String {
        // Split on the first colon only; without one, the whole input is
        // the command and the argument is empty.
        let (command, argument) = input.split_once(':').unwrap_or((input, ""));

        let path = match self.sandbox.resolve(argument) {
            Ok(path) => path,
            Err(_) => return ACCESS_DENIED.to_string(),
        };

        match command {
            "read" => match tokio::fs::read_to_string(&path).await {
                Ok(contents) => contents,
                Err(e) => format!("Error reading file: {e}"),
            },
            "write" => WRITE_NOT_IMPLEMENTED.to_string(),
            _ => UNKNOWN_COMMAND.to_string(),
        }
    }
}
