//! Pixel planes and the double-buffered image that engines coordinate around.
//!
//! An [`Image`] owns two planes of the same size. During a stage every effect
//! reads the *input* plane and writes the *output* plane; between stages the
//! two are swapped so the previous output becomes the next input.
//!
//! Concurrent writes go through [`Band`]s: the rows of a region are moved out
//! of the output plane into a band (no pixel copy), a worker fills the band
//! while reading the shared input plane, and the band is checked back in. The
//! image refuses to swap or hand out its final plane while any band is out,
//! so a stage can only end once every partition has reported back.

use crate::core::error::{ImageError, ImageResult};
use crate::core::region::Region;
use crate::filters::effect::Effect;
use image::{ImageBuffer, Rgba};
use std::sync::Arc;

/// A 16-bit-per-channel RGBA pixel.
pub type Pixel = Rgba<u16>;

/// Fully transparent black, the content of a fresh plane.
pub const TRANSPARENT: Pixel = Rgba([0, 0, 0, 0]);

/// A row-major grid of pixels.
///
/// Rows are stored separately so that a run of rows can be lent out to a
/// worker by moving the row vectors rather than copying pixels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plane {
    width: u32,
    height: u32,
    rows: Vec<Vec<Pixel>>,
}

impl Plane {
    /// Create a transparent plane.
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, TRANSPARENT)
    }

    /// Create a plane where every pixel is `pixel`.
    pub fn filled(width: u32, height: u32, pixel: Pixel) -> Self {
        Self {
            width,
            height,
            rows: vec![vec![pixel; width as usize]; height as usize],
        }
    }

    /// Create a plane by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> Pixel) -> Self {
        let rows = (0..height)
            .map(|y| (0..width).map(|x| f(x, y)).collect())
            .collect();
        Self { width, height, rows }
    }

    /// Convert from an `image` crate buffer.
    pub fn from_rgba16(buffer: &ImageBuffer<Pixel, Vec<u16>>) -> Self {
        Self::from_fn(buffer.width(), buffer.height(), |x, y| *buffer.get_pixel(x, y))
    }

    /// Convert into an `image` crate buffer for encoding.
    pub fn to_rgba16(&self) -> ImageBuffer<Pixel, Vec<u16>> {
        ImageBuffer::from_fn(self.width, self.height, |x, y| self.get(x, y))
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Region covering the whole plane.
    pub fn bounds(&self) -> Region {
        Region::from_size(self.width, self.height)
    }

    /// Get a pixel.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is outside the plane.
    pub fn get(&self, x: u32, y: u32) -> Pixel {
        self.rows[y as usize][x as usize]
    }

    /// Get a pixel by signed coordinates, `None` outside the plane.
    pub fn sample(&self, x: i64, y: i64) -> Option<Pixel> {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return None;
        }
        Some(self.rows[y as usize][x as usize])
    }

    /// Set a pixel.
    pub fn put(&mut self, x: u32, y: u32, pixel: Pixel) {
        self.rows[y as usize][x as usize] = pixel;
    }

    /// Iterate over all pixels in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = &Pixel> {
        self.rows.iter().flatten()
    }
}

/// Rows of an output plane lent out to one worker.
///
/// A band holds every row of its region in full width; only the columns of
/// the region are meant to be written.
#[derive(Debug)]
pub struct Band {
    region: Region,
    rows: Vec<Vec<Pixel>>,
}

impl Band {
    /// The region this band may write.
    pub fn region(&self) -> Region {
        self.region
    }

    /// Write a pixel, in image coordinates.
    pub fn put(&mut self, x: u32, y: u32, pixel: Pixel) {
        debug_assert!(self.region.contains(x, y), "({x}, {y}) outside band {}", self.region);
        self.rows[(y - self.region.min_y) as usize][x as usize] = pixel;
    }
}

/// A double-buffered image.
#[derive(Debug)]
pub struct Image {
    input: Arc<Plane>,
    output: Plane,
    bands_out: usize,
    swaps: usize,
}

impl Image {
    /// Wrap a decoded plane; it becomes the input of the first stage.
    pub fn new(plane: Plane) -> Self {
        let output = Plane::new(plane.width, plane.height);
        Self {
            input: Arc::new(plane),
            output,
            bands_out: 0,
            swaps: 0,
        }
    }

    /// Region covering the whole image.
    pub fn bounds(&self) -> Region {
        self.input.bounds()
    }

    /// The plane effects read from during the current stage.
    pub fn input(&self) -> &Plane {
        &self.input
    }

    /// A shared handle to the input plane, for workers outside this borrow.
    ///
    /// Handles must be dropped before the next [`swap`](Self::swap), or the
    /// swap has to allocate a fresh output plane.
    pub fn share_input(&self) -> Arc<Plane> {
        Arc::clone(&self.input)
    }

    /// The plane holding the result once every band is checked in.
    pub fn output(&self) -> ImageResult<&Plane> {
        match self.bands_out {
            0 => Ok(&self.output),
            count => Err(ImageError::BandsOutstanding(count)),
        }
    }

    /// Number of swaps performed so far.
    pub fn swap_count(&self) -> usize {
        self.swaps
    }

    /// Number of bands currently checked out.
    pub fn bands_out(&self) -> usize {
        self.bands_out
    }

    /// Move the rows of `region` out of the output plane.
    pub fn checkout(&mut self, region: Region) -> ImageResult<Band> {
        if !self.bounds().contains_region(&region) {
            return Err(ImageError::OutOfBounds {
                region,
                width: self.output.width,
                height: self.output.height,
            });
        }

        let width = self.output.width as usize;
        let mut taken = Vec::with_capacity(region.height() as usize);
        for y in region.rows() {
            let row = &mut self.output.rows[y as usize];
            if row.len() != width {
                // Put back what was already taken before failing
                for (offset, row) in taken.into_iter().enumerate() {
                    self.output.rows[region.min_y as usize + offset] = row;
                }
                return Err(ImageError::BandOverlap(region));
            }
            taken.push(std::mem::take(row));
        }

        self.bands_out += 1;
        Ok(Band { region, rows: taken })
    }

    /// Check out one band per region; on failure nothing stays checked out.
    pub fn checkout_all(&mut self, regions: &[Region]) -> ImageResult<Vec<Band>> {
        let mut bands = Vec::with_capacity(regions.len());
        for region in regions {
            match self.checkout(*region) {
                Ok(band) => bands.push(band),
                Err(error) => {
                    for band in bands {
                        self.checkin(band)?;
                    }
                    return Err(error);
                }
            }
        }
        Ok(bands)
    }

    /// Return a band's rows to the output plane.
    pub fn checkin(&mut self, band: Band) -> ImageResult<()> {
        let width = self.output.width as usize;
        let fits = self.bounds().contains_region(&band.region)
            && band.rows.len() == band.region.height() as usize
            && band.rows.iter().all(|row| row.len() == width)
            && band
                .region
                .rows()
                .all(|y| self.output.rows[y as usize].is_empty() || width == 0);
        if !fits || self.bands_out == 0 {
            return Err(ImageError::ForeignBand(band.region));
        }

        let first = band.region.min_y as usize;
        for (offset, row) in band.rows.into_iter().enumerate() {
            self.output.rows[first + offset] = row;
        }
        self.bands_out -= 1;
        Ok(())
    }

    /// Apply `effect` to `region` on the calling thread.
    pub fn apply(&mut self, effect: Effect, region: Region) -> ImageResult<()> {
        let mut band = self.checkout(region)?;
        effect.apply(&self.input, &mut band);
        self.checkin(band)
    }

    /// Exchange the input and output planes.
    ///
    /// O(1) as long as no shared input handle outlives the stage.
    pub fn swap(&mut self) -> ImageResult<()> {
        if self.bands_out > 0 {
            return Err(ImageError::BandsOutstanding(self.bands_out));
        }

        let finished = Arc::new(std::mem::take(&mut self.output));
        let previous = std::mem::replace(&mut self.input, finished);
        self.output = Arc::try_unwrap(previous)
            .unwrap_or_else(|shared| Plane::new(shared.width, shared.height));
        self.swaps += 1;
        Ok(())
    }
}
