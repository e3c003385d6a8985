//! Path-addressed operations.

use std::collections::HashMap;

use bytes::Bytes;
use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, instrument, warn};

use super::AfcClient;
use crate::core::request::Request;
use crate::core::response;
use crate::error::{constants, AfcError, ProtocolError, Result};
use crate::protocol::{FileInfo, FileType, LinkType, OpenMode};
use crate::utils::paths::{is_traversal_entry, join_remote, resolve_link_target};

impl<S> AfcClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// File info for `path`, or `None` when the device returns no fields.
    ///
    /// A `ReadError` status from the device means the path does not exist
    /// and is reported as [`ProtocolError::FileNotFound`].
    #[instrument(skip(self), level = "debug")]
    pub async fn stat(&self, path: &str) -> Result<Option<FileInfo>> {
        let request = Request::FileInfo {
            path: path.to_string(),
        };
        let raw = match self.request(request, response::decode_info).await {
            Err(ProtocolError::Status(AfcError::ReadError)) => {
                return Err(ProtocolError::FileNotFound {
                    path: path.to_string(),
                })
            }
            other => other?,
        };

        if raw.is_empty() {
            return Ok(None);
        }
        FileInfo::from_raw(&raw).map(Some)
    }

    pub async fn exists(&self, path: &str) -> Result<bool> {
        match self.stat(path).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn is_directory(&self, path: &str) -> Result<bool> {
        Ok(self.stat(path).await?.is_some_and(|info| info.is_dir()))
    }

    /// Follow `path` one hop if it is a symlink.
    ///
    /// A link pointing at another link is not followed further.
    #[instrument(skip(self), level = "debug")]
    pub async fn resolve(&self, path: &str) -> Result<String> {
        let Some(info) = self.stat(path).await? else {
            return Ok(path.to_string());
        };
        if !info.is_symlink() {
            return Ok(path.to_string());
        }

        let target = info.link_target.ok_or_else(|| {
            ProtocolError::afc(
                AfcError::ObjectNotFound,
                format!("{path} is a symlink without a LinkTarget"),
            )
        })?;
        Ok(resolve_link_target(path, &target))
    }

    /// Raw directory entries, `.` and `..` included.
    #[instrument(skip(self), level = "debug")]
    pub async fn list_directory(&self, path: &str) -> Result<Vec<String>> {
        let request = Request::ReadDirectory {
            path: path.to_string(),
        };
        self.request(request, response::decode_string_list).await
    }

    #[instrument(skip(self), level = "debug")]
    pub async fn make_directory(&self, path: &str) -> Result<()> {
        let request = Request::MakeDirectory {
            path: path.to_string(),
        };
        self.request(request, response::expect_success).await
    }

    #[instrument(skip(self), level = "debug")]
    pub async fn rename(&self, from: &str, to: &str) -> Result<()> {
        let request = Request::Rename {
            from: from.to_string(),
            to: to.to_string(),
        };
        self.request(request, response::expect_success).await
    }

    /// Create `link` pointing at `target`.
    #[instrument(skip(self), level = "debug")]
    pub async fn make_link(&self, kind: LinkType, target: &str, link: &str) -> Result<()> {
        let request = Request::MakeLink {
            kind,
            target: target.to_string(),
            link: link.to_string(),
        };
        self.request(request, response::expect_success).await
    }

    /// Filesystem statistics reported by the device (model, block size, free bytes...).
    #[instrument(skip(self), level = "debug")]
    pub async fn device_info(&self) -> Result<HashMap<String, String>> {
        self.request(Request::DeviceInfo, response::decode_info)
            .await
    }

    /// Issue one remove request. With `force`, a failing status yields
    /// `Ok(false)` instead of an error.
    async fn remove_single(&self, path: &str, force: bool) -> Result<bool> {
        let request = Request::Remove {
            path: path.to_string(),
        };
        let status = self.request(request, response::decode_status).await?;
        match status {
            AfcError::Success => Ok(true),
            code if force => {
                warn!(path, %code, "Failed to remove path");
                Ok(false)
            }
            code => Err(ProtocolError::Status(code)),
        }
    }

    /// Remove a file or a directory tree.
    ///
    /// Children are always removed best-effort; `force` only governs the
    /// top-level path. With `force`, paths that could not be removed are
    /// returned. Without it, a failure on the top-level path is raised, and
    /// leftover children raise [`ProtocolError::RemoveFailed`] naming them all.
    #[instrument(skip(self), level = "debug")]
    pub async fn remove(&self, path: &str, force: bool) -> Result<Vec<String>> {
        self.remove_tree(path.to_string(), force).await
    }

    fn remove_tree(&self, path: String, force: bool) -> BoxFuture<'_, Result<Vec<String>>> {
        async move {
            let info = match self.stat(&path).await {
                Ok(info) => info,
                Err(e) if e.is_not_found() => {
                    if force {
                        debug!(path = %path, "Nothing to remove");
                        return Ok(Vec::new());
                    }
                    self.remove_single(&path, false).await?;
                    return Ok(Vec::new());
                }
                Err(e) => return Err(e),
            };

            if !info.is_some_and(|info| info.is_dir()) {
                if self.remove_single(&path, force).await? {
                    return Ok(Vec::new());
                }
                return Ok(vec![path]);
            }

            let mut undeleted = Vec::new();
            for entry in self.list_directory(&path).await? {
                if is_traversal_entry(&entry) {
                    continue;
                }

                let child = join_remote(&path, &entry);
                let child_is_dir = match self.is_directory(&child).await {
                    Ok(is_dir) => is_dir,
                    Err(e) if e.is_not_found() => continue,
                    Err(e) => return Err(e),
                };

                if child_is_dir {
                    match self.remove_tree(child, true).await {
                        Ok(left) | Err(ProtocolError::RemoveFailed(left)) => undeleted.extend(left),
                        Err(e) => return Err(e),
                    }
                } else if !self.remove_single(&child, true).await? {
                    undeleted.push(child);
                }
            }

            match self.remove_single(&path, force).await {
                Ok(true) => {}
                Ok(false) => {
                    undeleted.push(path);
                    return Ok(undeleted);
                }
                Err(e) if undeleted.is_empty() => return Err(e),
                Err(_) => undeleted.push(path),
            }

            if !undeleted.is_empty() {
                return Err(ProtocolError::RemoveFailed(undeleted));
            }
            Ok(Vec::new())
        }
        .boxed()
    }

    /// Whole contents of a regular file, following one symlink hop.
    ///
    /// Returns `None` when the device hands back the zero handle.
    #[instrument(skip(self), level = "debug")]
    pub async fn get_contents(&self, path: &str) -> Result<Option<Vec<u8>>> {
        let path = self.resolve(path).await?;
        let info = self.stat(&path).await?;

        let file_type = info.as_ref().and_then(|info| info.file_type.as_ref());
        match file_type {
            None => {
                return Err(ProtocolError::afc(
                    AfcError::ObjectNotFound,
                    "couldn't find st_ifmt in file info",
                ))
            }
            Some(FileType::Regular) => {}
            Some(_) => {
                return Err(ProtocolError::afc(
                    AfcError::InvalidArg,
                    format!("{path} isn't a file"),
                ))
            }
        }

        let size = info.and_then(|info| info.size).ok_or_else(|| {
            ProtocolError::afc(AfcError::ObjectNotFound, "couldn't find st_size in file info")
        })?;
        let size = usize::try_from(size).map_err(|_| {
            ProtocolError::afc(AfcError::TooMuchData, format!("{path} is too large to buffer"))
        })?;

        let handle = self.open(&path, OpenMode::ReadOnly).await?;
        if handle.is_null() {
            return Ok(None);
        }

        let contents = self.read(handle, size).await;
        let closed = self.close(handle).await;
        let contents = contents?;
        closed?;
        Ok(Some(contents))
    }

    /// Replace the contents of `path`, creating it if needed.
    #[instrument(skip(self, data), level = "debug")]
    pub async fn set_contents(&self, path: &str, data: impl Into<Bytes>) -> Result<()> {
        let handle = self.open(path, OpenMode::WriteOnly).await?;
        if handle.is_null() {
            return Err(ProtocolError::afc(
                AfcError::OpenFailed,
                constants::ERR_OPEN_FOR_WRITE,
            ));
        }

        let written = self.write(handle, data).await;
        let closed = self.close(handle).await;
        written?;
        closed
    }
}
