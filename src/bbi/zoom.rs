use super::ZoomHeader;
use std::sync::OnceLock;

/// Pick the zoom level whose bin width is closest to, without exceeding,
/// `requested` bases per bin.
///
/// Returns `None` when every level is coarser than requested (or there are no
/// levels), in which case the query must be answered from raw intervals.
/// On ties the earlier level wins.
pub fn choose_zoom_level(bases_per_bin: &[u32], requested: u32) -> Option<usize> {
    bases_per_bin
        .iter()
        .enumerate()
        .filter(|&(_, &level)| level <= requested)
        .min_by_key(|&(i, &level)| (requested - level, i))
        .map(|(i, _)| i)
}

/// One precomputed resolution and its lazily loaded index root.
///
/// The root is loaded the first time a query uses this level and kept for the
/// lifetime of the file handle.
#[derive(Debug)]
pub struct ZoomLevel<R> {
    bases_per_bin: u32,
    data_offset: u64,
    index_offset: u64,
    index: OnceLock<R>,
}

impl<R> ZoomLevel<R> {
    pub fn new(bases_per_bin: u32, data_offset: u64, index_offset: u64) -> Self {
        Self {
            bases_per_bin,
            data_offset,
            index_offset,
            index: OnceLock::new(),
        }
    }

    pub fn bases_per_bin(&self) -> u32 {
        self.bases_per_bin
    }

    pub fn data_offset(&self) -> u64 {
        self.data_offset
    }

    pub fn index_offset(&self) -> u64 {
        self.index_offset
    }

    /// The loaded index root, if a query has used this level yet.
    pub fn index(&self) -> Option<&R> {
        self.index.get()
    }

    /// Store the loaded root. A root already present is kept and returned.
    pub fn set_index(&self, root: R) -> &R {
        self.index.get_or_init(|| root)
    }
}

impl<R> From<&ZoomHeader> for ZoomLevel<R> {
    fn from(header: &ZoomHeader) -> Self {
        Self::new(header.reduction_level, header.data_offset, header.index_offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_choose_closest_not_exceeding() {
        let levels = [10, 40, 160, 640];
        assert_eq!(choose_zoom_level(&levels, 100), Some(1));
        assert_eq!(choose_zoom_level(&levels, 160), Some(2));
        assert_eq!(choose_zoom_level(&levels, 10_000), Some(3));
        assert_eq!(choose_zoom_level(&levels, 10), Some(0));
    }

    #[test]
    fn test_choose_unordered_levels() {
        let levels = [640, 10, 160, 40];
        assert_eq!(choose_zoom_level(&levels, 200), Some(2));
        assert_eq!(choose_zoom_level(&levels, 39), Some(1));
    }

    #[test]
    fn test_choose_none() {
        assert_eq!(choose_zoom_level(&[], 100), None);
        assert_eq!(choose_zoom_level(&[40, 160], 39), None);
    }

    #[test]
    fn test_choose_tie_prefers_first() {
        assert_eq!(choose_zoom_level(&[40, 40, 10], 50), Some(0));
    }

    #[test]
    fn test_choose_is_monotonic() {
        let levels = [37, 5, 1200, 90, 400, 90];
        let mut previous: Option<u32> = None;
        for requested in 0..2000 {
            let chosen = choose_zoom_level(&levels, requested).map(|i| levels[i]);
            if let (Some(prev), Some(now)) = (previous, chosen) {
                assert!(now >= prev, "requested {} chose {} after {}", requested, now, prev);
            }
            if chosen.is_some() {
                previous = chosen;
            } else {
                assert!(previous.is_none());
            }
        }
    }

    #[test]
    fn test_index_is_set_once() {
        let level: ZoomLevel<String> = ZoomLevel::new(40, 100, 200);
        assert!(level.index().is_none());
        assert_eq!(level.set_index("first".to_string()), "first");
        assert_eq!(level.set_index("second".to_string()), "first");
        assert_eq!(level.index().map(String::as_str), Some("first"));
        assert_eq!(level.index_offset(), 200);
        assert_eq!(level.data_offset(), 100);
    }
}
