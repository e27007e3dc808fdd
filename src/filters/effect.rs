//! Effects: grayscale, sharpen, edge detection and box blur.
//!
//! Each effect computes an output pixel from the input plane alone, so any
//! region of the image can be processed independently of every other region.
//! Convolutions treat samples outside the image as zero.

use crate::core::error::TaskError;
use crate::core::image::{Band, Pixel, Plane};
use image::Rgba;
use std::fmt;
use std::str::FromStr;

/// A 3x3 convolution kernel in row-major order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Kernel(pub [f64; 9]);

impl Kernel {
    /// Sharpening kernel.
    pub const SHARPEN: Kernel = Kernel([0.0, -1.0, 0.0, -1.0, 5.0, -1.0, 0.0, -1.0, 0.0]);

    /// Edge detection kernel.
    pub const EDGE_DETECT: Kernel = Kernel([-1.0, -1.0, -1.0, -1.0, 8.0, -1.0, -1.0, -1.0, -1.0]);

    /// Box blur kernel.
    pub const BOX_BLUR: Kernel = Kernel([1.0 / 9.0; 9]);

    /// Convolve the neighbourhood of `(x, y)` in `input`.
    ///
    /// Color channels are filtered independently; alpha is taken from the
    /// centre pixel.
    pub fn convolve(&self, input: &Plane, x: u32, y: u32) -> Pixel {
        let mut sums = [0.0f64; 3];
        for dy in -1i64..=1 {
            for dx in -1i64..=1 {
                let Some(sample) = input.sample(x as i64 + dx, y as i64 + dy) else {
                    continue;
                };
                let weight = self.0[((dy + 1) * 3 + dx + 1) as usize];
                for (sum, channel) in sums.iter_mut().zip(sample.0) {
                    *sum += weight * channel as f64;
                }
            }
        }

        let alpha = input.get(x, y).0[3];
        Rgba([clamp(sums[0]), clamp(sums[1]), clamp(sums[2]), alpha])
    }
}

/// Round to the nearest channel value and saturate.
pub fn clamp(value: f64) -> u16 {
    value.round().clamp(0.0, u16::MAX as f64) as u16
}

/// The closed set of effects a job may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Effect {
    /// `G`: average of the color channels.
    Grayscale,
    /// `S`: sharpen.
    Sharpen,
    /// `E`: edge detection.
    EdgeDetect,
    /// `B`: 3x3 box blur.
    Blur,
}

impl Effect {
    /// Every effect, in code order.
    pub const ALL: [Effect; 4] = [
        Effect::Grayscale,
        Effect::Sharpen,
        Effect::EdgeDetect,
        Effect::Blur,
    ];

    /// The one-letter code used in job lists.
    pub fn code(self) -> &'static str {
        match self {
            Effect::Grayscale => "G",
            Effect::Sharpen => "S",
            Effect::EdgeDetect => "E",
            Effect::Blur => "B",
        }
    }

    /// The convolution kernel, or `None` for pixel-wise effects.
    pub fn kernel(self) -> Option<&'static Kernel> {
        match self {
            Effect::Grayscale => None,
            Effect::Sharpen => Some(&Kernel::SHARPEN),
            Effect::EdgeDetect => Some(&Kernel::EDGE_DETECT),
            Effect::Blur => Some(&Kernel::BOX_BLUR),
        }
    }

    /// Compute this effect for every pixel of `band`'s region.
    ///
    /// Reads only `input` and writes only the band, so calling it again with
    /// the same input produces the same band.
    pub fn apply(self, input: &Plane, band: &mut Band) {
        let region = band.region();
        for y in region.rows() {
            for x in region.columns() {
                let pixel = match self.kernel() {
                    Some(kernel) => kernel.convolve(input, x, y),
                    None => grayscale(input.get(x, y)),
                };
                band.put(x, y, pixel);
            }
        }
    }

    /// Parse a list of codes, failing on the first unknown one.
    pub fn parse_all<S: AsRef<str>>(codes: &[S]) -> Result<Vec<Effect>, TaskError> {
        codes.iter().map(|code| code.as_ref().parse()).collect()
    }
}

fn grayscale(pixel: Pixel) -> Pixel {
    let [r, g, b, a] = pixel.0;
    let gray = clamp((r as u32 + g as u32 + b as u32) as f64 / 3.0);
    Rgba([gray, gray, gray, a])
}

impl FromStr for Effect {
    type Err = TaskError;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        match code.trim() {
            "G" => Ok(Effect::Grayscale),
            "S" => Ok(Effect::Sharpen),
            "E" => Ok(Effect::EdgeDetect),
            "B" => Ok(Effect::Blur),
            other => Err(TaskError::UnknownEffect {
                code: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Effect::Grayscale => "grayscale",
            Effect::Sharpen => "sharpen",
            Effect::EdgeDetect => "edge-detect",
            Effect::Blur => "blur",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::image::Image;
    use crate::core::region::Region;

    const WHITE: Pixel = Rgba([u16::MAX, u16::MAX, u16::MAX, u16::MAX]);

    fn run(effect: Effect, plane: Plane) -> Plane {
        let mut image = Image::new(plane);
        image.apply(effect, image.bounds()).unwrap();
        image.output().unwrap().clone()
    }

    #[test]
    fn test_codes_round_trip() {
        for effect in Effect::ALL {
            assert_eq!(effect.code().parse::<Effect>().unwrap(), effect);
        }
    }

    #[test]
    fn test_unknown_code_is_an_error() {
        let err = "X".parse::<Effect>().unwrap_err();
        assert!(matches!(err, TaskError::UnknownEffect { ref code } if code == "X"));

        let err = Effect::parse_all(&["B", "Z", "G"]).unwrap_err();
        assert!(matches!(err, TaskError::UnknownEffect { ref code } if code == "Z"));
    }

    #[test]
    fn test_blur_zero_pads_corners() {
        let out = run(Effect::Blur, Plane::filled(3, 3, WHITE));

        // 4 of the corner's 9 samples are inside the image
        let corner = clamp(4.0 * u16::MAX as f64 / 9.0);
        assert_eq!(out.get(0, 0), Rgba([corner, corner, corner, u16::MAX]));
        assert!(out.get(0, 0).0[0] < u16::MAX);
        // Edge pixels see 6 samples, the centre sees all 9
        let edge = clamp(6.0 * u16::MAX as f64 / 9.0);
        assert_eq!(out.get(1, 0).0[0], edge);
        assert_eq!(out.get(1, 1), WHITE);
    }

    #[test]
    fn test_grayscale_ignores_boundaries() {
        let out = run(Effect::Grayscale, Plane::filled(3, 3, WHITE));
        assert!(out.pixels().all(|p| *p == WHITE));
    }

    #[test]
    fn test_grayscale_averages_channels() {
        let out = run(Effect::Grayscale, Plane::filled(1, 1, Rgba([300, 600, 901, 7])));
        assert_eq!(out.get(0, 0), Rgba([600, 600, 600, 7]));
    }

    #[test]
    fn test_uniform_interior_is_blur_fixed_point() {
        let gray = Rgba([30000, 30000, 30000, u16::MAX]);
        let out = run(Effect::Blur, Plane::filled(5, 5, gray));
        for y in 1..4 {
            for x in 1..4 {
                assert_eq!(out.get(x, y), gray);
            }
        }
    }

    #[test]
    fn test_edge_detect_flat_interior_is_black() {
        let gray = Rgba([1234, 1234, 1234, 99]);
        let out = run(Effect::EdgeDetect, Plane::filled(4, 4, gray));
        assert_eq!(out.get(1, 1), Rgba([0, 0, 0, 99]));
        // Zero padding makes the border light up
        assert!(out.get(0, 0).0[0] > 0);
    }

    #[test]
    fn test_sharpen_saturates() {
        let mut plane = Plane::filled(3, 3, Rgba([0, 0, 0, u16::MAX]));
        plane.put(1, 1, Rgba([20000, 20000, 20000, u16::MAX]));
        let out = run(Effect::Sharpen, plane);
        assert_eq!(out.get(1, 1).0[0], u16::MAX);
        assert_eq!(out.get(0, 1).0[0], 0);
    }

    #[test]
    fn test_apply_restricted_to_region() {
        let mut image = Image::new(Plane::filled(4, 4, WHITE));
        image.apply(Effect::Blur, Region::new(0, 2, 4, 4)).unwrap();
        let out = image.output().unwrap();
        // Rows outside the region keep the fresh plane's content
        assert_eq!(out.get(0, 0), Rgba([0, 0, 0, 0]));
        assert_eq!(out.get(1, 2), WHITE);
    }
}
