use super::{ByteOrder, FieldReader, FileHeader};
use crate::error::zeroed_buffer;
use crate::stream::ByteStream;
use crate::types::SummaryRecord;
use crate::{Error, Result};
use flate2::{Decompress, FlushDecompress, Status};

/// `chromId, start, end` followed by `validCount, min, max, sum, sumSquares`
pub const SUMMARY_RECORD_LEN: usize = 32;

/// Fetches one stored summary record and decodes it
#[derive(Debug, Clone, Copy)]
pub struct BlockDecoder {
    byte_order: ByteOrder,
    max_uncompressed: usize,
}

impl BlockDecoder {
    pub fn new(byte_order: ByteOrder, max_uncompressed: u32) -> Self {
        Self {
            byte_order,
            max_uncompressed: max_uncompressed as usize,
        }
    }

    pub fn for_header(header: &FileHeader) -> Self {
        Self::new(header.byte_order, header.uncompress_buf_size)
    }

    /// Read `size` bytes at `offset`, inflate them if `compressed`, and decode
    /// the summary record they hold.
    pub async fn fetch(
        &self,
        stream: &mut ByteStream,
        offset: u64,
        size: u32,
        compressed: bool,
    ) -> Result<SummaryRecord> {
        stream.seek(offset).await?;
        let mut raw = zeroed_buffer(size as usize)?;
        stream.read_exact(&mut raw).await?;

        let data = if compressed {
            inflate(&raw, self.max_uncompressed)?
        } else {
            raw
        };
        self.decode(&data)
    }

    /// Decode one record; the leading `chromId, start, end` are skipped.
    pub fn decode(&self, data: &[u8]) -> Result<SummaryRecord> {
        if data.len() != SUMMARY_RECORD_LEN {
            return Err(Error::Format(format!(
                "summary record is {} bytes, expected {}",
                data.len(),
                SUMMARY_RECORD_LEN
            )));
        }

        let mut fields = FieldReader::new(data, self.byte_order);
        fields.skip(12);
        Ok(SummaryRecord {
            covered_bases: fields.u32(),
            min: fields.f32(),
            max: fields.f32(),
            sum: fields.f32(),
            sum_squares: fields.f32(),
        })
    }
}

/// Inflate a zlib stream into at most `max_len` bytes.
pub fn inflate(raw: &[u8], max_len: usize) -> Result<Vec<u8>> {
    if max_len == 0 {
        return Err(Error::Format(
            "compressed block but no uncompressed buffer size".to_string(),
        ));
    }

    let mut out = zeroed_buffer(max_len)?;
    let mut inflater = Decompress::new(true);
    match inflater.decompress(raw, &mut out, FlushDecompress::Finish) {
        Ok(Status::StreamEnd) => {
            out.truncate(inflater.total_out() as usize);
            Ok(out)
        }
        Ok(status) => Err(Error::Decode(format!(
            "inflate stopped before the end of the stream ({:?})",
            status
        ))),
        Err(e) => Err(Error::Decode(e.to_string())),
    }
}
