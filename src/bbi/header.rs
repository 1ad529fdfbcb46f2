use super::{ByteOrder, FieldReader};
use crate::stream::ByteStream;
use crate::{Error, Result};
use serde::Serialize;

pub const BIGWIG_MAGIC: u32 = 0x888F_FC26;

/// Size of the fixed header at offset 0
pub const HEADER_LEN: usize = 64;

/// Size of one zoom header; they follow the fixed header back to back
pub const ZOOM_HEADER_LEN: usize = 24;

/// One precomputed resolution as listed in the file header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ZoomHeader {
    pub reduction_level: u32,
    pub data_offset: u64,
    pub index_offset: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileHeader {
    pub byte_order: ByteOrder,
    pub version: u16,
    pub zoom_levels: u16,
    pub chrom_tree_offset: u64,
    pub full_data_offset: u64,
    pub full_index_offset: u64,
    pub field_count: u16,
    pub defined_field_count: u16,
    pub auto_sql_offset: u64,
    pub total_summary_offset: u64,
    /// Maximum inflated block size; 0 means blocks are stored uncompressed
    pub uncompress_buf_size: u32,
    pub zoom_headers: Vec<ZoomHeader>,
}

impl FileHeader {
    /// Read the fixed header and the zoom headers from the start of `stream`.
    pub async fn read(stream: &mut ByteStream) -> Result<Self> {
        let fixed = stream.read_at(0, HEADER_LEN).await?;
        let mut header = Self::parse(&fixed)?;

        let zoom_len = header.zoom_levels as usize * ZOOM_HEADER_LEN;
        let zooms = stream.read(zoom_len).await?;
        header.zoom_headers = parse_zoom_headers(&zooms, header.byte_order, header.zoom_levels);

        tracing::debug!(
            version = header.version,
            zoom_levels = header.zoom_levels,
            compressed = header.is_compressed(),
            "read file header"
        );
        Ok(header)
    }

    /// Parse the fixed 64-byte header. Zoom headers are left empty.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(Error::Format(format!(
                "header is {} bytes, expected {}",
                bytes.len(),
                HEADER_LEN
            )));
        }

        let magic = [bytes[0], bytes[1], bytes[2], bytes[3]];
        let byte_order = if u32::from_le_bytes(magic) == BIGWIG_MAGIC {
            ByteOrder::Little
        } else if u32::from_be_bytes(magic) == BIGWIG_MAGIC {
            ByteOrder::Big
        } else {
            return Err(Error::Format(format!(
                "unknown magic {:#010x} (not a bigWig file)",
                u32::from_le_bytes(magic)
            )));
        };

        let mut fields = FieldReader::new(&bytes[4..HEADER_LEN], byte_order);
        Ok(Self {
            byte_order,
            version: fields.u16(),
            zoom_levels: fields.u16(),
            chrom_tree_offset: fields.u64(),
            full_data_offset: fields.u64(),
            full_index_offset: fields.u64(),
            field_count: fields.u16(),
            defined_field_count: fields.u16(),
            auto_sql_offset: fields.u64(),
            total_summary_offset: fields.u64(),
            uncompress_buf_size: fields.u32(),
            zoom_headers: Vec::new(),
        })
    }

    pub fn is_compressed(&self) -> bool {
        self.uncompress_buf_size > 0
    }
}

fn parse_zoom_headers(bytes: &[u8], order: ByteOrder, count: u16) -> Vec<ZoomHeader> {
    let mut fields = FieldReader::new(bytes, order);
    (0..count)
        .map(|_| {
            let reduction_level = fields.u32();
            fields.skip(4);
            ZoomHeader {
                reduction_level,
                data_offset: fields.u64(),
                index_offset: fields.u64(),
            }
        })
        .collect()
}
