//! Lazy tree traversal.

use futures::stream::{self, Stream, StreamExt, TryStreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use super::AfcClient;
use crate::error::{ProtocolError, Result};
use crate::utils::paths::{is_traversal_entry, join_remote};

/// One directory visited by [`AfcClient::walk`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    pub directory: String,
    /// Names of child directories, in listing order
    pub directories: Vec<String>,
    /// Names of every other child, in listing order
    pub files: Vec<String>,
    /// Levels below the walk root; the root itself is 0
    pub depth: usize,
}

impl<S> AfcClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Pre-order traversal of the tree rooted at `path`.
    ///
    /// Each directory is yielded before any of its subdirectories, and
    /// subdirectories are visited in listing order. Entries that vanish
    /// between the listing and their stat are skipped, as are entries whose
    /// info carries no `st_ifmt`. The stream stops at the first error.
    pub fn walk<'a>(&'a self, path: &str) -> impl Stream<Item = Result<WalkEntry>> + 'a {
        self.walk_to(path, None)
    }

    /// [`walk`](Self::walk) that never descends into directories `max_depth`
    /// or more levels below the root.
    fn walk_to<'a>(
        &'a self,
        path: &str,
        max_depth: Option<usize>,
    ) -> impl Stream<Item = Result<WalkEntry>> + 'a {
        let pending = vec![(path.to_string(), 0usize)];
        stream::try_unfold(pending, move |mut pending| async move {
            let Some((directory, depth)) = pending.pop() else {
                return Ok::<_, ProtocolError>(None);
            };

            let entry = self.visit(directory, depth).await?;
            if max_depth.map_or(true, |max| depth + 1 < max) {
                for name in entry.directories.iter().rev() {
                    pending.push((join_remote(&entry.directory, name), depth + 1));
                }
            }
            Ok(Some((entry, pending)))
        })
    }

    async fn visit(&self, directory: String, depth: usize) -> Result<WalkEntry> {
        let mut directories = Vec::new();
        let mut files = Vec::new();

        for name in self.list_directory(&directory).await? {
            if is_traversal_entry(&name) {
                continue;
            }
            match self.stat(&join_remote(&directory, &name)).await {
                Ok(Some(info)) if info.is_dir() => directories.push(name),
                Ok(Some(info)) if info.file_type.is_some() => files.push(name),
                Ok(_) => {
                    debug!(directory = %directory, name = %name, "Entry without st_ifmt skipped");
                }
                Err(e) if e.is_not_found() => {
                    debug!(directory = %directory, name = %name, "Entry vanished during walk");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(WalkEntry {
            directory,
            directories,
            files,
            depth,
        })
    }

    /// Every path under `path`, the root first.
    ///
    /// `max_depth` of `None` is unbounded. With `Some(0)` only `path` is
    /// yielded and nothing is sent to the device; with `Some(n)` entries up to
    /// `n` levels below the root are yielded.
    pub fn list<'a>(
        &'a self,
        path: &str,
        max_depth: Option<usize>,
    ) -> impl Stream<Item = Result<String>> + 'a {
        let root = stream::once(futures::future::ready(Ok(path.to_string())));

        let children = match max_depth {
            Some(0) => None,
            _ => Some(
                self.walk_to(path, max_depth)
                    .map_ok(|entry| {
                        let WalkEntry {
                            directory,
                            directories,
                            files,
                            ..
                        } = entry;
                        let paths: Vec<Result<String>> = directories
                            .into_iter()
                            .chain(files)
                            .map(|name| Ok(join_remote(&directory, &name)))
                            .collect();
                        stream::iter(paths)
                    })
                    .try_flatten(),
            ),
        };

        root.chain(stream::iter(children).flatten())
    }
}
