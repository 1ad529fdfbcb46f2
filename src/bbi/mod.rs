//! On-disk layout of bigWig files: the fixed header, zoom-level summary
//! blocks and the choice between zoom levels.

mod block;
mod header;
mod zoom;

pub use block::{BlockDecoder, SUMMARY_RECORD_LEN, inflate};
pub use header::{BIGWIG_MAGIC, FileHeader, HEADER_LEN, ZOOM_HEADER_LEN, ZoomHeader};
pub use zoom::{ZoomLevel, choose_zoom_level};

use bytes::Buf;
use serde::Serialize;

/// Byte order of a file, detected from its magic number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    #[default]
    Little,
    Big,
}

/// Reads fixed-width fields in a given byte order
pub(crate) struct FieldReader<B> {
    buf: B,
    order: ByteOrder,
}

impl<B: Buf> FieldReader<B> {
    pub(crate) fn new(buf: B, order: ByteOrder) -> Self {
        Self { buf, order }
    }

    pub(crate) fn skip(&mut self, n: usize) {
        self.buf.advance(n);
    }

    pub(crate) fn u16(&mut self) -> u16 {
        match self.order {
            ByteOrder::Little => self.buf.get_u16_le(),
            ByteOrder::Big => self.buf.get_u16(),
        }
    }

    pub(crate) fn u32(&mut self) -> u32 {
        match self.order {
            ByteOrder::Little => self.buf.get_u32_le(),
            ByteOrder::Big => self.buf.get_u32(),
        }
    }

    pub(crate) fn u64(&mut self) -> u64 {
        match self.order {
            ByteOrder::Little => self.buf.get_u64_le(),
            ByteOrder::Big => self.buf.get_u64(),
        }
    }

    pub(crate) fn f32(&mut self) -> f32 {
        match self.order {
            ByteOrder::Little => self.buf.get_f32_le(),
            ByteOrder::Big => self.buf.get_f32(),
        }
    }
}
