//! Global ↔ item-local coordinate translation.
//!
//! Pure lookups over the catalog's cumulative tables. An item covers the
//! half-open interval `[cum[i-1], cum[i])` of the global timeline, so an
//! instant that falls exactly on a boundary belongs to the later item.
//! Global stream indices are laid out the same way: item `i` owns
//! `[cum_streams[i-1], cum_streams[i])`.

use crate::catalog::PlaylistCatalog;

/// Translates between global and item-local coordinates.
#[derive(Debug, Clone, Copy)]
pub struct TimelineTranslator<'a> {
    durations: &'a [i64],
    streams: &'a [usize],
}

impl<'a> TimelineTranslator<'a> {
    /// Translator over explicit cumulative tables.
    pub fn new(cumulative_durations: &'a [i64], cumulative_streams: &'a [usize]) -> Self {
        Self {
            durations: cumulative_durations,
            streams: cumulative_streams,
        }
    }

    /// Translator over a catalog's current tables.
    pub fn for_catalog<R>(catalog: &'a PlaylistCatalog<R>) -> Self
    where
        R: crate::reader::ItemReader,
    {
        Self::new(catalog.cumulative_durations(), catalog.cumulative_stream_counts())
    }

    /// Number of items covered.
    pub fn len(&self) -> usize {
        self.durations.len()
    }

    /// Check if no item is covered.
    pub fn is_empty(&self) -> bool {
        self.durations.is_empty()
    }

    /// Global start time of item `index`.
    pub fn item_start(&self, index: usize) -> Option<i64> {
        match index {
            _ if index >= self.durations.len() => None,
            0 => Some(0),
            _ => Some(self.durations[index - 1]),
        }
    }

    /// The item covering `global_pts` and the matching local time.
    ///
    /// `None` when `global_pts` is at or past the end of every covered
    /// item; the caller extends the tables by opening more items.
    pub fn item_and_local_time_for(&self, global_pts: i64) -> Option<(usize, i64)> {
        let index = self.durations.partition_point(|&end| end <= global_pts);
        let start = self.item_start(index)?;
        Some((index, global_pts - start))
    }

    /// Global index of local stream `local` of item `item`.
    pub fn global_stream_index_for(&self, item: usize, local: usize) -> Option<usize> {
        let end = *self.streams.get(item)?;
        let start = if item == 0 { 0 } else { self.streams[item - 1] };
        let global = start + local;
        (global < end).then_some(global)
    }

    /// Owning item and local index of global stream `global`.
    pub fn local_stream_index_for(&self, global: usize) -> Option<(usize, usize)> {
        let item = self.streams.partition_point(|&end| end <= global);
        if item >= self.streams.len() {
            return None;
        }
        let start = if item == 0 { 0 } else { self.streams[item - 1] };
        Some((item, global - start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary_belongs_to_next_item() {
        let t = TimelineTranslator::new(&[100, 250], &[1, 2]);
        assert_eq!(t.item_and_local_time_for(0), Some((0, 0)));
        assert_eq!(t.item_and_local_time_for(99), Some((0, 99)));
        assert_eq!(t.item_and_local_time_for(100), Some((1, 0)));
        assert_eq!(t.item_and_local_time_for(249), Some((1, 149)));
        assert_eq!(t.item_and_local_time_for(250), None);
    }

    #[test]
    fn test_zero_length_items_are_skipped() {
        let t = TimelineTranslator::new(&[100, 100, 300], &[1, 1, 2]);
        assert_eq!(t.item_and_local_time_for(100), Some((2, 0)));
        assert_eq!(t.item_and_local_time_for(50), Some((0, 50)));
    }

    #[test]
    fn test_negative_time_maps_to_first_item() {
        let t = TimelineTranslator::new(&[100], &[1]);
        assert_eq!(t.item_and_local_time_for(-5), Some((0, -5)));
    }

    #[test]
    fn test_empty_tables() {
        let t = TimelineTranslator::new(&[], &[]);
        assert!(t.is_empty());
        assert_eq!(t.item_and_local_time_for(0), None);
        assert_eq!(t.local_stream_index_for(0), None);
        assert_eq!(t.item_start(0), None);
    }

    #[test]
    fn test_stream_index_mapping() {
        // item 0: 2 streams, item 1: 1 stream, item 2: 3 streams
        let t = TimelineTranslator::new(&[10, 20, 30], &[2, 3, 6]);
        assert_eq!(t.global_stream_index_for(0, 1), Some(1));
        assert_eq!(t.global_stream_index_for(1, 0), Some(2));
        assert_eq!(t.global_stream_index_for(2, 2), Some(5));
        assert_eq!(t.global_stream_index_for(1, 1), None);
        assert_eq!(t.global_stream_index_for(3, 0), None);

        assert_eq!(t.local_stream_index_for(0), Some((0, 0)));
        assert_eq!(t.local_stream_index_for(2), Some((1, 0)));
        assert_eq!(t.local_stream_index_for(5), Some((2, 2)));
        assert_eq!(t.local_stream_index_for(6), None);
    }

    #[test]
    fn test_streamless_item_owns_no_indices() {
        let t = TimelineTranslator::new(&[10, 20], &[0, 1]);
        assert_eq!(t.local_stream_index_for(0), Some((1, 0)));
        assert_eq!(t.global_stream_index_for(0, 0), None);
    }
}
