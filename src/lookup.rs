//! Seams to the collaborators that locate data inside a file.
//!
//! Walking the on-disk R-tree indexes and decoding raw data sections is done
//! by implementations of these traits; the statistics engine only consumes
//! their results.

use crate::Result;
use crate::stream::ByteStream;
use crate::types::{Interval, OverlapBlock};
use async_trait::async_trait;
use std::collections::HashMap;

/// Spatial index over zoom-level summary blocks
#[async_trait]
pub trait IndexLookup: Send + Sync {
    /// Loaded root of one index, cached per zoom level by the file handle
    type Root: Send + Sync;

    /// Load the index root stored at `index_offset`.
    async fn load_root(&self, stream: &mut ByteStream, index_offset: u64) -> Result<Self::Root>;

    /// Blocks overlapping `[start, end)` on `chrom_id`, in file order.
    async fn overlapping_blocks(
        &self,
        stream: &mut ByteStream,
        root: &Self::Root,
        chrom_id: u32,
        start: u32,
        end: u32,
    ) -> Result<Vec<OverlapBlock>>;
}

/// Source of raw stored intervals
#[async_trait]
pub trait RawIntervalLookup: Send + Sync {
    /// Intervals intersecting `[start, end)` on `chrom`, unclipped.
    ///
    /// `Ok(None)` means there is legitimately no data there; failures are `Err`.
    async fn overlapping_intervals(
        &self,
        stream: &mut ByteStream,
        chrom: &str,
        start: u32,
        end: u32,
    ) -> Result<Option<Vec<Interval>>>;
}

/// Chromosome name to numeric id
#[derive(Debug, Clone, Default)]
pub struct ChromTable {
    ids: HashMap<String, u32>,
}

impl ChromTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, id: u32) {
        self.ids.insert(name.into(), id);
    }

    pub fn chrom_id(&self, name: &str) -> Option<u32> {
        self.ids.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, u32)> for ChromTable {
    fn from_iter<I: IntoIterator<Item = (S, u32)>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().map(|(name, id)| (name.into(), id)).collect(),
        }
    }
}
