//! Copying trees between the device and the host filesystem.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, instrument};

use super::AfcClient;
use crate::error::{AfcError, ProtocolError, Result};
use crate::utils::metrics::Timer;
use crate::utils::paths::{is_traversal_entry, join_remote, remote_basename, sanitize_component};

impl<S> AfcClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Mirror the remote file or tree at `remote` into `local_dir`.
    ///
    /// The copy is named after the last component of `remote`; pulling the
    /// device root copies its children straight into `local_dir`. Symlinks are
    /// followed one hop, and a directory reached twice is only copied once.
    #[instrument(skip(self, local_dir), level = "debug")]
    pub async fn pull(&self, remote: &str, local_dir: impl AsRef<Path>) -> Result<()> {
        let _timer = Timer::start("pull");
        let style = self.config.host_path_style;
        let local_dir = local_dir.as_ref();

        let destination = match remote_basename(remote) {
            "" => local_dir.to_path_buf(),
            name => local_dir.join(sanitize_component(name, style)),
        };

        let mut visited = HashSet::new();
        let mut pending = vec![(remote.to_string(), destination)];
        while let Some((source, destination)) = pending.pop() {
            self.check_cancelled()?;
            let source = self.resolve(&source).await?;
            info!("{} --> {}", source, destination.display());

            if !self.is_directory(&source).await? {
                let contents = self.get_contents(&source).await?.unwrap_or_default();
                tokio::fs::write(&destination, contents).await?;
                continue;
            }

            tokio::fs::create_dir_all(&destination).await?;
            if !visited.insert(source.clone()) {
                debug!(directory = %source, "Directory already pulled");
                continue;
            }

            let entries = self.list_directory(&source).await?;
            for name in entries.into_iter().rev() {
                if is_traversal_entry(&name) {
                    continue;
                }
                let child_destination = destination.join(sanitize_component(&name, style));
                pending.push((join_remote(&source, &name), child_destination));
            }
        }
        Ok(())
    }

    /// Upload the local file or tree at `local` into the device directory
    /// `remote_dir`, creating directories as needed.
    #[instrument(skip(self, local), level = "debug")]
    pub async fn push(&self, local: impl AsRef<Path>, remote_dir: &str) -> Result<()> {
        let _timer = Timer::start("push");
        let local = local.as_ref();

        let name = local
            .file_name()
            .ok_or_else(|| ProtocolError::ConfigError(format!("{} has no file name", local.display())))?;
        let destination = join_remote(remote_dir, host_name(name)?);

        let mut visited: HashSet<PathBuf> = HashSet::new();
        let mut pending = vec![(local.to_path_buf(), destination)];
        while let Some((source, destination)) = pending.pop() {
            self.check_cancelled()?;
            info!("{} --> {}", source.display(), destination);

            let metadata = tokio::fs::metadata(&source).await?;
            if !metadata.is_dir() {
                let contents = tokio::fs::read(&source).await?;
                self.set_contents(&destination, contents).await?;
                continue;
            }

            if !visited.insert(tokio::fs::canonicalize(&source).await?) {
                debug!(directory = %source.display(), "Directory already pushed");
                continue;
            }

            match self.make_directory(&destination).await {
                Ok(()) => {}
                Err(e) if e.code() == Some(AfcError::ObjectExists) => {}
                Err(e) => return Err(e),
            }

            let mut children = Vec::new();
            let mut entries = tokio::fs::read_dir(&source).await?;
            while let Some(entry) = entries.next_entry().await? {
                let name = entry.file_name();
                let remote_child = join_remote(&destination, host_name(&name)?);
                children.push((entry.path(), remote_child));
            }
            children.sort();
            pending.extend(children.into_iter().rev());
        }
        Ok(())
    }
}

fn host_name(name: &std::ffi::OsStr) -> Result<&str> {
    name.to_str().ok_or(ProtocolError::InvalidUtf8)
}
