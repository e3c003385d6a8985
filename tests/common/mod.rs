//! In-memory AFC device for integration tests.
//!
//! The device keeps a flat map of absolute paths to nodes and answers frames
//! over one end of a `tokio::io::duplex` pipe. Every received frame is logged
//! so tests can assert on exactly what went over the wire.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use afc_client::core::header::{AfcHeader, HEADER_LENGTH};
use afc_client::core::opcode::OpCode;
use afc_client::core::strings::encode_string_list;
use afc_client::{AfcClient, AfcError, ClientConfig};
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio_util::sync::CancellationToken;

pub const MTIME_NANOS: &str = "1700000000000000000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    File(Vec<u8>),
    Dir,
    Link(String),
}

#[derive(Debug, Clone)]
pub struct Received {
    pub header: AfcHeader,
    pub payload: Vec<u8>,
}

impl Received {
    /// Leading NUL-terminated string of the payload, after `skip` bytes.
    pub fn path(&self, skip: usize) -> String {
        let rest = &self.payload[skip..];
        let end = rest.iter().position(|b| *b == 0).unwrap_or(rest.len());
        String::from_utf8(rest[..end].to_vec()).unwrap()
    }
}

#[derive(Debug)]
struct OpenFile {
    path: String,
    position: usize,
}

#[derive(Debug)]
pub struct DeviceState {
    pub nodes: BTreeMap<String, Node>,
    pub received: Vec<Received>,
    /// Paths whose removal is refused with `PermissionDenied`
    pub undeletable: HashSet<String>,
    /// Zero-based index of the write frame to refuse with `WriteError`
    pub fail_write_frame: Option<usize>,
    /// Answer every open with the zero handle
    pub null_handles: bool,
    /// Swallow requests without replying
    pub mute: bool,
    /// Encode tell replies big-endian
    pub tell_big_endian: bool,
    /// Cancel the token once this many write frames have been handled
    cancel_after_writes: Option<(usize, CancellationToken)>,
    handles: HashMap<u64, OpenFile>,
    next_handle: u64,
    write_frames: usize,
}

impl Default for DeviceState {
    fn default() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert("/".to_string(), Node::Dir);
        Self {
            nodes,
            received: Vec::new(),
            undeletable: HashSet::new(),
            fail_write_frame: None,
            null_handles: false,
            mute: false,
            tell_big_endian: false,
            cancel_after_writes: None,
            handles: HashMap::new(),
            next_handle: 1,
            write_frames: 0,
        }
    }
}

fn parent(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) => "/",
        Some(idx) => &path[..idx],
        None => "",
    }
}

fn name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn c_strings(bytes: &[u8]) -> Vec<String> {
    bytes
        .split(|b| *b == 0)
        .filter(|s| !s.is_empty())
        .map(|s| String::from_utf8(s.to_vec()).unwrap())
        .collect()
}

fn u64_at(bytes: &[u8], index: usize) -> u64 {
    u64::from_le_bytes(bytes[index * 8..index * 8 + 8].try_into().unwrap())
}

fn status(code: AfcError) -> (OpCode, Vec<u8>) {
    (OpCode::Status, code.wire_value().unwrap().to_le_bytes().to_vec())
}

fn data(payload: Vec<u8>) -> (OpCode, Vec<u8>) {
    (OpCode::Data, payload)
}

impl DeviceState {
    pub fn with_file(mut self, path: &str, contents: &[u8]) -> Self {
        self.nodes.insert(path.to_string(), Node::File(contents.to_vec()));
        self
    }

    pub fn with_dir(mut self, path: &str) -> Self {
        self.nodes.insert(path.to_string(), Node::Dir);
        self
    }

    pub fn with_link(mut self, path: &str, target: &str) -> Self {
        self.nodes.insert(path.to_string(), Node::Link(target.to_string()));
        self
    }

    pub fn failing_write_frame(mut self, index: usize) -> Self {
        self.fail_write_frame = Some(index);
        self
    }

    pub fn with_null_handles(mut self) -> Self {
        self.null_handles = true;
        self
    }

    pub fn with_big_endian_tell(mut self) -> Self {
        self.tell_big_endian = true;
        self
    }

    pub fn muted(mut self) -> Self {
        self.mute = true;
        self
    }

    pub fn cancelling_after_writes(mut self, frames: usize, token: CancellationToken) -> Self {
        self.cancel_after_writes = Some((frames, token));
        self
    }

    pub fn undeletable(mut self, path: &str) -> Self {
        self.undeletable.insert(path.to_string());
        self
    }

    pub fn file(&self, path: &str) -> Option<&[u8]> {
        match self.nodes.get(path) {
            Some(Node::File(contents)) => Some(contents),
            _ => None,
        }
    }

    /// Received frames carrying `op`.
    pub fn frames(&self, op: OpCode) -> Vec<&Received> {
        self.received
            .iter()
            .filter(|r| r.header.operation == op)
            .collect()
    }

    fn children(&self, dir: &str) -> Vec<String> {
        self.nodes
            .keys()
            .filter(|path| path.as_str() != "/" && parent(path) == dir)
            .map(|path| name(path).to_string())
            .collect()
    }

    fn info(&self, path: &str) -> (OpCode, Vec<u8>) {
        let fields: Vec<String> = match self.nodes.get(path) {
            None => return status(AfcError::ReadError),
            Some(Node::File(contents)) => vec![
                "st_size".into(),
                contents.len().to_string(),
                "st_blocks".into(),
                contents.len().div_ceil(512).to_string(),
                "st_nlink".into(),
                "1".into(),
                "st_ifmt".into(),
                "S_IFREG".into(),
                "st_mtime".into(),
                MTIME_NANOS.into(),
                "st_birthtime".into(),
                MTIME_NANOS.into(),
            ],
            Some(Node::Dir) => vec![
                "st_size".into(),
                "64".into(),
                "st_nlink".into(),
                "2".into(),
                "st_ifmt".into(),
                "S_IFDIR".into(),
            ],
            Some(Node::Link(target)) => vec![
                "st_size".into(),
                target.len().to_string(),
                "st_ifmt".into(),
                "S_IFLNK".into(),
                "LinkTarget".into(),
                target.clone(),
            ],
        };
        data(encode_string_list(&fields))
    }

    fn open(&mut self, mode: u64, path: String) -> (OpCode, Vec<u8>) {
        if self.null_handles {
            return (OpCode::FileOpenResult, 0u64.to_le_bytes().to_vec());
        }

        let is_dir = self.nodes.get(&path).map(|node| *node == Node::Dir);
        match (is_dir, mode) {
            (Some(true), _) => return status(AfcError::ObjectIsDirectory),
            (None, 1 | 2) => return status(AfcError::ObjectNotFound),
            (Some(false), 1 | 2) => {}
            (_, 3 | 4) => {
                if !matches!(self.nodes.get(parent(&path)), Some(Node::Dir)) {
                    return status(AfcError::ObjectNotFound);
                }
                self.nodes.insert(path.clone(), Node::File(Vec::new()));
            }
            _ => return status(AfcError::InvalidArg),
        }

        let handle = self.next_handle;
        self.next_handle += 1;
        self.handles.insert(handle, OpenFile { path, position: 0 });
        (OpCode::FileOpenResult, handle.to_le_bytes().to_vec())
    }

    fn contents_mut(&mut self, handle: u64) -> Option<(&mut Vec<u8>, &mut usize)> {
        let open = self.handles.get_mut(&handle)?;
        match self.nodes.get_mut(&open.path) {
            Some(Node::File(contents)) => Some((contents, &mut open.position)),
            _ => None,
        }
    }

    fn remove(&mut self, path: &str) -> (OpCode, Vec<u8>) {
        if self.undeletable.contains(path) {
            return status(AfcError::PermissionDenied);
        }
        let is_dir = self.nodes.get(path).map(|node| *node == Node::Dir);
        match is_dir {
            None => status(AfcError::ObjectNotFound),
            Some(true) if !self.children(path).is_empty() => status(AfcError::DirNotEmpty),
            Some(_) => {
                self.nodes.remove(path);
                status(AfcError::Success)
            }
        }
    }

    fn rename(&mut self, from: &str, to: &str) -> (OpCode, Vec<u8>) {
        let moved: Vec<String> = self
            .nodes
            .keys()
            .filter(|path| path.as_str() == from || path.starts_with(&format!("{from}/")))
            .cloned()
            .collect();
        if moved.is_empty() {
            return status(AfcError::ObjectNotFound);
        }
        for old in moved {
            let node = self.nodes.remove(&old).unwrap();
            let new = format!("{to}{}", &old[from.len()..]);
            self.nodes.insert(new, node);
        }
        status(AfcError::Success)
    }

    fn handle(&mut self, op: OpCode, payload: &[u8]) -> (OpCode, Vec<u8>) {
        match op {
            OpCode::GetFileInfo => self.info(&c_strings(payload)[0]),
            OpCode::ReadDir => {
                let path = &c_strings(payload)[0];
                match self.nodes.get(path) {
                    Some(Node::Dir) => {
                        let mut entries = vec![".".to_string(), "..".to_string()];
                        entries.extend(self.children(path));
                        data(encode_string_list(&entries))
                    }
                    Some(_) => status(AfcError::InvalidArg),
                    None => status(AfcError::ObjectNotFound),
                }
            }
            OpCode::FileOpen => {
                let path = c_strings(&payload[8..]).remove(0);
                self.open(u64_at(payload, 0), path)
            }
            OpCode::FileRead => {
                let size = u64_at(payload, 1) as usize;
                match self.contents_mut(u64_at(payload, 0)) {
                    Some((contents, position)) => {
                        let start = (*position).min(contents.len());
                        let end = (start + size).min(contents.len());
                        *position = end;
                        data(contents[start..end].to_vec())
                    }
                    None => status(AfcError::InvalidArg),
                }
            }
            OpCode::FileWrite => {
                let index = self.write_frames;
                self.write_frames += 1;
                if let Some((frames, token)) = &self.cancel_after_writes {
                    if self.write_frames == *frames {
                        token.cancel();
                    }
                }
                if self.fail_write_frame == Some(index) {
                    return status(AfcError::WriteError);
                }
                match self.contents_mut(u64_at(payload, 0)) {
                    Some((contents, position)) => {
                        let chunk = &payload[8..];
                        let end = *position + chunk.len();
                        if contents.len() < end {
                            contents.resize(end, 0);
                        }
                        contents[*position..end].copy_from_slice(chunk);
                        *position = end;
                        status(AfcError::Success)
                    }
                    None => status(AfcError::InvalidArg),
                }
            }
            OpCode::FileSeek => {
                let (whence, offset) = (u64_at(payload, 1), u64_at(payload, 2) as i64);
                match self.contents_mut(u64_at(payload, 0)) {
                    Some((contents, position)) => {
                        let base = match whence {
                            0 => 0,
                            1 => *position as i64,
                            _ => contents.len() as i64,
                        };
                        *position = (base + offset).max(0) as usize;
                        status(AfcError::Success)
                    }
                    None => status(AfcError::InvalidArg),
                }
            }
            OpCode::FileTell => {
                let big = self.tell_big_endian;
                match self.contents_mut(u64_at(payload, 0)) {
                    Some((_, position)) => {
                        let position = *position as u64;
                        let bytes = if big {
                            position.to_be_bytes()
                        } else {
                            position.to_le_bytes()
                        };
                        (OpCode::FileTellResult, bytes.to_vec())
                    }
                    None => status(AfcError::InvalidArg),
                }
            }
            OpCode::FileSetSize => {
                let size = u64_at(payload, 1) as usize;
                match self.contents_mut(u64_at(payload, 0)) {
                    Some((contents, _)) => {
                        contents.resize(size, 0);
                        status(AfcError::Success)
                    }
                    None => status(AfcError::InvalidArg),
                }
            }
            OpCode::FileClose => match self.handles.remove(&u64_at(payload, 0)) {
                Some(_) => status(AfcError::Success),
                None => status(AfcError::InvalidArg),
            },
            OpCode::FileLock => status(AfcError::Success),
            OpCode::RemovePath => self.remove(&c_strings(payload)[0]),
            OpCode::MakeDir => {
                let path = c_strings(payload).remove(0);
                if self.nodes.contains_key(&path) {
                    return status(AfcError::ObjectExists);
                }
                self.nodes.insert(path, Node::Dir);
                status(AfcError::Success)
            }
            OpCode::RenamePath => {
                let paths = c_strings(payload);
                self.rename(&paths[0], &paths[1])
            }
            OpCode::MakeLink => {
                let paths = c_strings(&payload[8..]);
                let node = match u64_at(payload, 0) {
                    2 => Node::Link(paths[0].clone()),
                    _ => match self.nodes.get(&paths[0]) {
                        Some(node) => node.clone(),
                        None => return status(AfcError::ObjectNotFound),
                    },
                };
                self.nodes.insert(paths[1].clone(), node);
                status(AfcError::Success)
            }
            OpCode::GetDeviceInfo => data(encode_string_list(&[
                "Model",
                "iPhone14,2",
                "FSTotalBytes",
                "128000000000",
                "FSFreeBytes",
                "64000000000",
                "FSBlockSize",
                "4096",
            ])),
            _ => status(AfcError::UnknownPacketType),
        }
    }
}

pub type Device = Arc<Mutex<DeviceState>>;

/// Serve `state` on `stream` until the client side closes.
pub fn serve(state: Device, mut stream: DuplexStream) {
    tokio::spawn(async move {
        loop {
            let mut head = [0u8; HEADER_LENGTH as usize];
            if stream.read_exact(&mut head).await.is_err() {
                return;
            }
            let header = AfcHeader::decode(&head).unwrap();
            let mut payload = vec![0u8; header.data_length() as usize];
            if stream.read_exact(&mut payload).await.is_err() {
                return;
            }

            let reply = {
                let mut device = state.lock().unwrap();
                device.received.push(Received {
                    header,
                    payload: payload.clone(),
                });
                if device.mute {
                    None
                } else {
                    Some(device.handle(header.operation, &payload))
                }
            };

            let Some((op, body)) = reply else {
                continue;
            };
            let mut frame = AfcHeader::single(body.len() as u64, header.packet_number, op)
                .to_bytes()
                .to_vec();
            frame.extend_from_slice(&body);
            if stream.write_all(&frame).await.is_err() {
                return;
            }
        }
    });
}

pub fn connect(state: DeviceState) -> (AfcClient<DuplexStream>, Device) {
    connect_with(state, ClientConfig::default())
}

pub fn connect_with(state: DeviceState, config: ClientConfig) -> (AfcClient<DuplexStream>, Device) {
    let (client_side, device_side) = tokio::io::duplex(64 * 1024);
    let device = Arc::new(Mutex::new(state));
    serve(device.clone(), device_side);
    (AfcClient::with_config(client_side, config), device)
}
