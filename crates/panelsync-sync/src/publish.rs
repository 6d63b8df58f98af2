//! Subscription artifact publishing.
//!
//! Atomic write (tmp + rename) so readers never see a half-written file.

use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::debug;

use crate::error::PublishError;

/// What [`Publisher::publish`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    Written(PathBuf),
    /// No real link was available; the previous artifact was kept.
    Skipped,
}

/// Writes per-user subscription files into one directory.
#[derive(Debug, Clone)]
pub struct Publisher {
    dir: PathBuf,
}

impl Publisher {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[inline]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Artifact path for `token`.
    pub fn path_for(&self, token: &str) -> Result<PathBuf, PublishError> {
        validate_token(token)?;
        Ok(self.dir.join(token))
    }

    /// Publish the status link followed by `links`.
    ///
    /// Nothing is written when `links` is empty.
    pub async fn publish(
        &self,
        token: &str,
        status_link: &str,
        links: &[String],
    ) -> Result<PublishOutcome, PublishError> {
        let target = self.path_for(token)?;
        if links.is_empty() {
            debug!(token, "no links, keeping previous artifact");
            return Ok(PublishOutcome::Skipped);
        }

        let mut lines = Vec::with_capacity(links.len() + 1);
        lines.push(status_link);
        lines.extend(links.iter().map(String::as_str));
        let body = encode(&lines);

        tokio::fs::create_dir_all(&self.dir).await?;
        let tmp = self.dir.join(format!(".{token}.tmp"));
        tokio::fs::write(&tmp, body.as_bytes()).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &target).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        debug!(path = %target.display(), links = links.len(), "artifact written");
        Ok(PublishOutcome::Written(target))
    }
}

/// Newline-join and base64-encode (standard alphabet, padded).
pub fn encode(lines: &[&str]) -> String {
    STANDARD.encode(lines.join("\n"))
}

/// Tokens become file names: no separators, no dot-prefixed names.
fn validate_token(token: &str) -> Result<(), PublishError> {
    let bad = token.is_empty()
        || token.starts_with('.')
        || token.contains(['/', '\\', '\0'])
        || token.contains("..");
    if bad {
        Err(PublishError::InvalidToken(token.to_string()))
    } else {
        Ok(())
    }
}
