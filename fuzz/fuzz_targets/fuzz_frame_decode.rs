#![no_main]

use afc_client::core::codec::AfcCodec;
use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use tokio_util::codec::Decoder;

fuzz_target!(|data: &[u8]| {
    // Decode frames until the buffer runs dry or an error stops the stream
    let mut codec = AfcCodec::new(1024 * 1024);
    let mut buf = BytesMut::from(data);
    while let Ok(Some(_frame)) = codec.decode(&mut buf) {}
});
