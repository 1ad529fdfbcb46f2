use crate::bbi::{BlockDecoder, FileHeader, ZoomLevel, choose_zoom_level};
use crate::config::StreamConfig;
use crate::error::try_vec;
use crate::lookup::{ChromTable, IndexLookup, RawIntervalLookup};
use crate::stats::{self, SummaryAccumulator, interval_statistic};
use crate::stream::ByteStream;
use crate::types::{Bin, StatKind};
use crate::{Error, Result};

/// An open bigWig file: its stream, header, chromosome table, zoom levels and
/// the lookups that locate data inside it.
///
/// Zoom-level index roots are loaded on first use and cached here. Queries
/// take `&mut self`; open one handle per concurrent caller.
pub struct SignalFile<L: IndexLookup, R: RawIntervalLookup> {
    stream: ByteStream,
    header: FileHeader,
    decoder: BlockDecoder,
    chroms: ChromTable,
    zoom_levels: Vec<ZoomLevel<L::Root>>,
    index: L,
    raw: R,
}

impl<L: IndexLookup, R: RawIntervalLookup> SignalFile<L, R> {
    pub fn new(stream: ByteStream, header: FileHeader, chroms: ChromTable, index: L, raw: R) -> Self {
        let zoom_levels = header.zoom_headers.iter().map(ZoomLevel::from).collect();
        Self {
            decoder: BlockDecoder::for_header(&header),
            stream,
            header,
            chroms,
            zoom_levels,
            index,
            raw,
        }
    }

    /// Open `descriptor` and read its header.
    pub async fn open(
        descriptor: &str,
        config: &StreamConfig,
        chroms: ChromTable,
        index: L,
        raw: R,
    ) -> Result<Self> {
        let mut stream = ByteStream::open(descriptor, config).await?;
        let header = FileHeader::read(&mut stream).await?;
        Ok(Self::new(stream, header, chroms, index, raw))
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    pub fn chroms(&self) -> &ChromTable {
        &self.chroms
    }

    pub fn zoom_levels(&self) -> &[ZoomLevel<L::Root>] {
        &self.zoom_levels
    }

    pub fn stream(&mut self) -> &mut ByteStream {
        &mut self.stream
    }

    /// Index of the zoom level to use for `bases_per_bin`, or `None` for raw data.
    pub fn choose_zoom_level(&self, bases_per_bin: u32) -> Option<usize> {
        let levels: Vec<u32> = self.zoom_levels.iter().map(ZoomLevel::bases_per_bin).collect();
        choose_zoom_level(&levels, bases_per_bin)
    }

    /// One `kind` value per bin of `[start, end)` split into `n_bins` bins.
    ///
    /// The zoom level is chosen once for the whole query from the rounded-up
    /// bin width; if no level is fine enough, every bin is computed from raw
    /// intervals. Any lookup, read or decode failure fails the whole call.
    ///
    /// Zoom-path coverage is the number of covered bases per bin; raw-path
    /// coverage is the covered fraction of the bin.
    pub async fn compute_windowed_statistic(
        &mut self,
        chrom: &str,
        start: u32,
        end: u32,
        n_bins: u32,
        kind: StatKind,
    ) -> Result<Vec<f64>> {
        let (bins, chrom_id) = self.prepare(chrom, start, end, n_bins)?;

        let requested = stats::requested_bases_per_bin(start, end, n_bins);
        let level = self.choose_zoom_level(requested);
        tracing::debug!(
            chrom,
            start,
            end,
            n_bins,
            %kind,
            requested,
            zoom_level = ?level,
            "windowed statistic"
        );

        match level {
            Some(level) => self.zoom_statistics(level, chrom_id, &bins, kind).await,
            None => self.raw_statistics(chrom, &bins, kind).await,
        }
    }

    /// Like [`compute_windowed_statistic`](Self::compute_windowed_statistic),
    /// but always aggregates raw intervals, even when a zoom level would fit.
    pub async fn compute_exact_statistic(
        &mut self,
        chrom: &str,
        start: u32,
        end: u32,
        n_bins: u32,
        kind: StatKind,
    ) -> Result<Vec<f64>> {
        let (bins, _) = self.prepare(chrom, start, end, n_bins)?;
        tracing::debug!(chrom, start, end, n_bins, %kind, "exact statistic");
        self.raw_statistics(chrom, &bins, kind).await
    }

    /// Like [`compute_windowed_statistic`](Self::compute_windowed_statistic),
    /// but answers from the given zoom level (an index into
    /// [`zoom_levels`](Self::zoom_levels)) regardless of the bin width.
    pub async fn compute_zoom_statistic(
        &mut self,
        level: usize,
        chrom: &str,
        start: u32,
        end: u32,
        n_bins: u32,
        kind: StatKind,
    ) -> Result<Vec<f64>> {
        if level >= self.zoom_levels.len() {
            return Err(Error::InvalidInput(format!(
                "zoom level {} out of range ({} levels)",
                level,
                self.zoom_levels.len()
            )));
        }
        let (bins, chrom_id) = self.prepare(chrom, start, end, n_bins)?;
        tracing::debug!(chrom, start, end, n_bins, %kind, level, "zoom statistic");
        self.zoom_statistics(level, chrom_id, &bins, kind).await
    }

    /// Validate the query: bins first, then the chromosome.
    fn prepare(&self, chrom: &str, start: u32, end: u32, n_bins: u32) -> Result<(Vec<Bin>, u32)> {
        let bins = stats::bins(start, end, n_bins)?;
        let chrom_id = self
            .chroms
            .chrom_id(chrom)
            .ok_or_else(|| Error::NotFound(format!("chromosome {}", chrom)))?;
        Ok((bins, chrom_id))
    }

    async fn zoom_statistics(
        &mut self,
        level: usize,
        chrom_id: u32,
        bins: &[Bin],
        kind: StatKind,
    ) -> Result<Vec<f64>> {
        let zoom = &self.zoom_levels[level];
        if zoom.index().is_none() {
            tracing::debug!(level, offset = zoom.index_offset(), "loading zoom index");
            let root = self.index.load_root(&mut self.stream, zoom.index_offset()).await?;
            zoom.set_index(root);
        }
        let root = zoom
            .index()
            .ok_or_else(|| Error::Internal(format!("zoom level {} index not loaded", level)))?;

        let compressed = self.header.is_compressed();
        let mut output = try_vec(bins.len())?;
        for bin in bins {
            let blocks = self
                .index
                .overlapping_blocks(&mut self.stream, root, chrom_id, bin.start, bin.end)
                .await?;

            let mut acc = SummaryAccumulator::new();
            for block in &blocks {
                let record = self
                    .decoder
                    .fetch(&mut self.stream, block.offset, block.size, compressed)
                    .await?;
                acc.push(&record);
            }
            output.push(acc.statistic(kind));
        }
        Ok(output)
    }

    async fn raw_statistics(&mut self, chrom: &str, bins: &[Bin], kind: StatKind) -> Result<Vec<f64>> {
        let mut output = try_vec(bins.len())?;
        for &bin in bins {
            let value = match self
                .raw
                .overlapping_intervals(&mut self.stream, chrom, bin.start, bin.end)
                .await?
            {
                Some(intervals) => interval_statistic(&intervals, bin, kind),
                None => interval_statistic(&[], bin, kind),
            };
            output.push(value);
        }
        Ok(output)
    }
}

impl<L: IndexLookup, R: RawIntervalLookup> std::fmt::Debug for SignalFile<L, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalFile")
            .field("stream", &self.stream)
            .field("header", &self.header)
            .field("chroms", &self.chroms.len())
            .finish()
    }
}
