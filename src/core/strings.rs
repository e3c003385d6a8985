//! NUL-delimited string lists.
//!
//! Directory listings, file info and device info replies are runs of
//! NUL-terminated UTF-8 strings with no outer length prefix.

use std::collections::HashMap;

use bytes::BufMut;

use crate::error::{ProtocolError, Result};

/// Split a payload into its strings, keeping order.
///
/// The empty segment after the final terminator is dropped. An unterminated
/// trailing segment is kept.
pub fn parse_string_list(data: &[u8]) -> Result<Vec<String>> {
    let text = std::str::from_utf8(data).map_err(|_| ProtocolError::InvalidUtf8)?;
    let mut strings: Vec<String> = text.split('\0').map(str::to_owned).collect();
    if strings.last().is_some_and(|last| last.is_empty()) {
        strings.pop();
    }
    Ok(strings)
}

/// Pair consecutive entries into a key/value dictionary.
pub fn parse_info_dictionary(data: &[u8]) -> Result<HashMap<String, String>> {
    let strings = parse_string_list(data)?;
    if strings.len() % 2 != 0 {
        return Err(ProtocolError::UnbalancedInfoPairs(strings.len()));
    }

    let mut info = HashMap::with_capacity(strings.len() / 2);
    let mut entries = strings.into_iter();
    while let (Some(key), Some(value)) = (entries.next(), entries.next()) {
        info.insert(key, value);
    }
    Ok(info)
}

/// Append `value` followed by its NUL terminator.
pub fn put_c_string<B: BufMut>(dst: &mut B, value: &str) {
    dst.put_slice(value.as_bytes());
    dst.put_u8(0);
}

/// Encoded length of `value` including its terminator.
pub fn c_string_len(value: &str) -> u64 {
    value.len() as u64 + 1
}

/// Join strings into a terminated list, the inverse of [`parse_string_list`].
pub fn encode_string_list<S: AsRef<str>>(strings: &[S]) -> Vec<u8> {
    let mut out = Vec::new();
    for value in strings {
        put_c_string(&mut out, value.as_ref());
    }
    out
}
