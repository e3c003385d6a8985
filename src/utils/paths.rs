//! Remote path arithmetic and host path sanitisation.
//!
//! Device paths always use `/`, independent of the host, so they are handled
//! as plain strings rather than through `std::path`.

use serde::{Deserialize, Serialize};

/// Directory entries that never name a child.
pub const TRAVERSAL_ENTRIES: [&str; 3] = [".", "..", ""];

pub fn is_traversal_entry(name: &str) -> bool {
    TRAVERSAL_ENTRIES.contains(&name)
}

/// `dir/name` without doubling the separator.
pub fn join_remote(dir: &str, name: &str) -> String {
    if dir.ends_with('/') {
        format!("{dir}{name}")
    } else {
        format!("{dir}/{name}")
    }
}

/// Containing directory of a device path; empty for a bare name.
pub fn remote_parent(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) => "/",
        Some(idx) => &trimmed[..idx],
        None if path.starts_with('/') => "/",
        None => "",
    }
}

/// Final component of a device path; empty for the root.
pub fn remote_basename(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// Where a symlink at `link_path` pointing to `target` leads.
///
/// Relative targets resolve against the link's containing directory; the
/// result is not normalised.
pub fn resolve_link_target(link_path: &str, target: &str) -> String {
    if target.starts_with('/') {
        return target.to_string();
    }
    match remote_parent(link_path) {
        "" => target.to_string(),
        parent => join_remote(parent, target),
    }
}

/// Naming rules of the host filesystem receiving pulled files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostPathStyle {
    /// Whatever the running platform requires
    #[default]
    Native,
    Posix,
    Windows,
}

impl HostPathStyle {
    fn effective(self) -> Self {
        match self {
            HostPathStyle::Native if cfg!(windows) => HostPathStyle::Windows,
            HostPathStyle::Native => HostPathStyle::Posix,
            other => other,
        }
    }
}

const WINDOWS_RESERVED: [&str; 22] = [
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Make one device file name safe to create on the host.
///
/// Separators never survive, and `.`/`..` are replaced so a component cannot
/// climb out of the destination directory.
pub fn sanitize_component(name: &str, style: HostPathStyle) -> String {
    if is_traversal_entry(name) {
        return "_".to_string();
    }

    match style.effective() {
        HostPathStyle::Windows => sanitize_windows(name),
        _ => name.replace(['/', '\0'], "_"),
    }
}

fn sanitize_windows(name: &str) -> String {
    let mut cleaned: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if (c as u32) < 0x20 => '_',
            c => c,
        })
        .collect();

    let trimmed_len = cleaned.trim_end_matches(['.', ' ']).len();
    cleaned.truncate(trimmed_len);
    if cleaned.is_empty() {
        return "_".to_string();
    }

    let stem = cleaned.split('.').next().unwrap_or_default();
    if WINDOWS_RESERVED
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(stem))
    {
        cleaned.insert(0, '_');
    }
    cleaned
}
