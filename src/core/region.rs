//! Rectangular pixel regions and the row-band partitioner.
//!
//! Every scheduling model splits an image the same way: the image bounds are
//! cut into horizontal bands, one per worker, and each worker writes only the
//! rows of its own band. Bands for the same `(whole, worker_count)` are
//! pairwise disjoint and cover `whole` exactly, which is what lets workers
//! write the output buffer concurrently.
//!
//! # Remainder policy
//!
//! Band height is `rows / worker_count` (integer division). Bands are handed
//! out from the bottom of the region (largest `y`) upward, and the band of
//! the last worker stretches to the region's top edge, so it absorbs every
//! leftover row. With 10 rows and 4 workers the bands are 2, 2, 2 and 4 rows.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// An axis-aligned rectangle of pixel coordinates.
///
/// `max_x` and `max_y` are exclusive, so a region with `min == max` on either
/// axis is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    /// Left edge (inclusive).
    pub min_x: u32,
    /// Top edge (inclusive).
    pub min_y: u32,
    /// Right edge (exclusive).
    pub max_x: u32,
    /// Bottom edge (exclusive).
    pub max_y: u32,
}

impl Region {
    /// Create a region from its corners.
    ///
    /// # Panics
    ///
    /// Panics if a minimum exceeds the matching maximum.
    pub fn new(min_x: u32, min_y: u32, max_x: u32, max_y: u32) -> Self {
        assert!(
            min_x <= max_x && min_y <= max_y,
            "region corners out of order: ({min_x}, {min_y})..({max_x}, {max_y})"
        );
        Self { min_x, min_y, max_x, max_y }
    }

    /// Region covering a whole `width` x `height` image.
    pub fn from_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.max_x - self.min_x
    }

    /// Number of rows.
    pub fn height(&self) -> u32 {
        self.max_y - self.min_y
    }

    /// Area in pixels.
    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    /// Whether the region holds no pixels.
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Row coordinates covered by this region.
    pub fn rows(&self) -> Range<u32> {
        self.min_y..self.max_y
    }

    /// Column coordinates covered by this region.
    pub fn columns(&self) -> Range<u32> {
        self.min_x..self.max_x
    }

    /// Check if a pixel lies inside the region.
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.min_x && x < self.max_x && y >= self.min_y && y < self.max_y
    }

    /// Check if `other` lies entirely inside this region.
    pub fn contains_region(&self, other: &Region) -> bool {
        other.min_x >= self.min_x
            && other.max_x <= self.max_x
            && other.min_y >= self.min_y
            && other.max_y <= self.max_y
    }

    /// Check if the two regions share at least one pixel.
    pub fn overlaps(&self, other: &Region) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.min_x < other.max_x
            && other.min_x < self.max_x
            && self.min_y < other.max_y
            && other.min_y < self.max_y
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {})..({}, {})",
            self.min_x, self.min_y, self.max_x, self.max_y
        )
    }
}

/// Return the band of `whole` assigned to `worker_index` out of `worker_count`.
///
/// Pure function of its inputs. With a single worker the whole region is
/// returned unchanged. When there are fewer rows than workers, every band but
/// the last is empty.
///
/// # Panics
///
/// Panics if `worker_count` is zero or `worker_index >= worker_count`.
pub fn partition(whole: Region, worker_index: usize, worker_count: usize) -> Region {
    assert!(worker_count > 0, "partition needs at least one worker");
    assert!(
        worker_index < worker_count,
        "worker index {worker_index} out of range for {worker_count} workers"
    );

    let band = whole.height() as usize / worker_count;
    // worker_index * band <= rows, so the subtraction never underflows
    let max_y = whole.max_y - (worker_index * band) as u32;
    let min_y = if worker_index == worker_count - 1 {
        whole.min_y
    } else {
        max_y - band as u32
    };

    Region {
        min_x: whole.min_x,
        min_y,
        max_x: whole.max_x,
        max_y,
    }
}

/// All bands of `whole` for `worker_count` workers, in worker order.
pub fn partitions(whole: Region, worker_count: usize) -> Vec<Region> {
    (0..worker_count)
        .map(|index| partition(whole, index, worker_count))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_dimensions() {
        let region = Region::new(10, 20, 110, 220);
        assert_eq!(region.width(), 100);
        assert_eq!(region.height(), 200);
        assert_eq!(region.area(), 20000);
        assert!(!region.is_empty());
        assert!(Region::new(3, 3, 3, 9).is_empty());
    }

    #[test]
    #[should_panic(expected = "out of order")]
    fn test_region_rejects_inverted_corners() {
        Region::new(5, 0, 4, 1);
    }

    #[test]
    fn test_region_containment() {
        let region = Region::from_size(4, 4);
        assert!(region.contains(0, 0));
        assert!(region.contains(3, 3));
        assert!(!region.contains(4, 0));
        assert!(region.contains_region(&Region::new(1, 1, 4, 4)));
        assert!(!region.contains_region(&Region::new(1, 1, 5, 4)));
    }

    #[test]
    fn test_region_overlap() {
        let a = Region::new(0, 0, 4, 2);
        let b = Region::new(0, 2, 4, 4);
        let c = Region::new(0, 1, 4, 3);
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(b.overlaps(&c));
        assert!(!a.overlaps(&Region::new(0, 1, 4, 1)));
    }

    #[test]
    fn test_single_worker_gets_whole_region() {
        let whole = Region::new(2, 3, 50, 41);
        assert_eq!(partition(whole, 0, 1), whole);
    }

    #[test]
    fn test_even_split() {
        let whole = Region::from_size(8, 8);
        assert_eq!(partition(whole, 0, 4), Region::new(0, 6, 8, 8));
        assert_eq!(partition(whole, 1, 4), Region::new(0, 4, 8, 6));
        assert_eq!(partition(whole, 2, 4), Region::new(0, 2, 8, 4));
        assert_eq!(partition(whole, 3, 4), Region::new(0, 0, 8, 2));
    }

    #[test]
    fn test_remainder_goes_to_last_worker() {
        let whole = Region::from_size(5, 10);
        let bands = partitions(whole, 4);
        let heights: Vec<u32> = bands.iter().map(Region::height).collect();
        assert_eq!(heights, vec![2, 2, 2, 4]);
        assert_eq!(bands[3], Region::new(0, 0, 5, 4));
    }

    #[test]
    fn test_more_workers_than_rows() {
        let whole = Region::from_size(4, 2);
        let bands = partitions(whole, 3);
        assert!(bands[0].is_empty());
        assert!(bands[1].is_empty());
        assert_eq!(bands[2], whole);
    }

    #[test]
    fn test_offset_region_bands_stay_inside() {
        let whole = Region::new(3, 7, 9, 20);
        for band in partitions(whole, 3) {
            assert!(whole.contains_region(&band));
            assert_eq!(band.columns(), whole.columns());
        }
    }

    #[test]
    #[should_panic(expected = "at least one worker")]
    fn test_zero_workers_rejected() {
        partition(Region::from_size(1, 1), 0, 0);
    }
}
