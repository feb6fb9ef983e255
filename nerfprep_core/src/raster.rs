//! Raster primitives shared by the depth and mask rasterizers.
//!
//! Pixel `(x, y)` covers the continuous square centered on `(x, y)`, so a
//! continuous coordinate is assigned to a pixel by rounding. Polygon fills
//! sample pixel centers with inclusive edges.

use crate::camera::ImageSize;
use geo::{Area, ConvexHull, MultiPoint, Point};
use image::{GrayImage, ImageBuffer, ImageOutputFormat, ImageResult, Luma};
use std::io::Cursor;

/// Mask value for pixels to keep.
pub const INCLUDE: u8 = 255;
/// Mask value for pixels to drop.
pub const EXCLUDE: u8 = 0;

/// Tolerance for pixel-center tests against polygon edges.
const EDGE_EPSILON: f64 = 1e-9;

// ============================================================================
// BINARY CANVAS
// ============================================================================

/// A single-bit drawing surface marking evidence pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryCanvas {
    size: ImageSize,
    cells: Vec<bool>,
}

impl BinaryCanvas {
    pub fn new(size: ImageSize) -> Self {
        Self {
            size,
            cells: vec![false; size.area()],
        }
    }

    pub fn size(&self) -> ImageSize {
        self.size
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.size.width as usize + x as usize
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        self.cells[self.index(x, y)]
    }

    /// Marks a pixel; coordinates outside the canvas are ignored.
    pub fn set(&mut self, x: i64, y: i64) {
        if x >= 0 && y >= 0 && x < self.size.width as i64 && y < self.size.height as i64 {
            let i = self.index(x as u32, y as u32);
            self.cells[i] = true;
        }
    }

    /// Number of marked pixels.
    pub fn count(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }

    /// Filled disc of all pixels with `dx² + dy² ≤ radius²`.
    pub fn fill_disc(&mut self, cx: i64, cy: i64, radius: i64) {
        let r2 = radius * radius;
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dy * dy <= r2 {
                    self.set(cx + dx, cy + dy);
                }
            }
        }
    }

    /// Filled axis-aligned rectangle, corners inclusive, clipped to the canvas.
    pub fn fill_rect(&mut self, x0: i64, y0: i64, x1: i64, y1: i64) {
        let (w, h) = (self.size.width as i64, self.size.height as i64);
        let (xa, xb) = (x0.min(x1).max(0), x0.max(x1).min(w - 1));
        let (ya, yb) = (y0.min(y1).max(0), y0.max(y1).min(h - 1));
        for y in ya..=yb {
            for x in xa..=xb {
                self.set(x, y);
            }
        }
    }

    /// Fills a convex polygon given by its vertices in pixel coordinates.
    ///
    /// Each row is sampled at its pixel center; every pixel center between the
    /// leftmost and rightmost edge crossing (inclusive) is marked.
    pub fn fill_convex_polygon(&mut self, vertices: &[(f64, f64)]) {
        if vertices.is_empty() || self.size.area() == 0 {
            return;
        }

        let min_y = vertices.iter().map(|v| v.1).fold(f64::INFINITY, f64::min);
        let max_y = vertices.iter().map(|v| v.1).fold(f64::NEG_INFINITY, f64::max);
        let row_start = (min_y - EDGE_EPSILON).ceil().max(0.0) as i64;
        let row_end = (max_y + EDGE_EPSILON).floor().min(self.size.height as f64 - 1.0) as i64;

        for y in row_start..=row_end {
            let yf = y as f64;
            let mut span: Option<(f64, f64)> = None;
            let mut widen = |x: f64| {
                span = Some(match span {
                    Some((lo, hi)) => (lo.min(x), hi.max(x)),
                    None => (x, x),
                });
            };

            for (i, &(px, py)) in vertices.iter().enumerate() {
                let (qx, qy) = vertices[(i + 1) % vertices.len()];
                if (py - qy).abs() < EDGE_EPSILON {
                    if (py - yf).abs() <= EDGE_EPSILON {
                        widen(px);
                        widen(qx);
                    }
                } else if yf >= py.min(qy) - EDGE_EPSILON && yf <= py.max(qy) + EDGE_EPSILON {
                    widen(px + (yf - py) * (qx - px) / (qy - py));
                }
            }

            if let Some((lo, hi)) = span {
                let x_start = (lo - EDGE_EPSILON).ceil() as i64;
                let x_end = (hi + EDGE_EPSILON).floor() as i64;
                for x in x_start..=x_end {
                    self.set(x, y);
                }
            }
        }
    }

    /// Marks every pixel marked in `other`. Sizes must match.
    pub fn union(&mut self, other: &BinaryCanvas) {
        debug_assert_eq!(self.size, other.size);
        for (dst, &src) in self.cells.iter_mut().zip(&other.cells) {
            *dst |= src;
        }
    }

    /// Morphological dilation with a `k x k` square kernel.
    ///
    /// The anchor sits at `k / 2`, so even kernels grow one pixel more
    /// toward the bottom-right than the top-left. `k ≤ 1` leaves the canvas
    /// unchanged.
    pub fn dilate(&mut self, kernel: u32) {
        if kernel <= 1 {
            return;
        }
        let anchor = (kernel / 2) as i64;
        let (lo, hi) = (-anchor, kernel as i64 - 1 - anchor);
        let (w, h) = (self.size.width as i64, self.size.height as i64);

        // Square max-filter is separable: rows, then columns.
        let mut rows = vec![false; self.cells.len()];
        for y in 0..h {
            for x in 0..w {
                let hit = (lo..=hi)
                    .map(|d| x + d)
                    .filter(|&sx| sx >= 0 && sx < w)
                    .any(|sx| self.cells[(y * w + sx) as usize]);
                rows[(y * w + x) as usize] = hit;
            }
        }

        for y in 0..h {
            for x in 0..w {
                let hit = (lo..=hi)
                    .map(|d| y + d)
                    .filter(|&sy| sy >= 0 && sy < h)
                    .any(|sy| rows[(sy * w + x) as usize]);
                self.cells[(y * w + x) as usize] = hit;
            }
        }
    }

    /// Inverts into an inclusion mask: marked pixels become `EXCLUDE`,
    /// everything else `INCLUDE`.
    pub fn into_inclusion_mask(self) -> MaskRaster {
        let width = self.size.width;
        MaskRaster(GrayImage::from_fn(self.size.width, self.size.height, |x, y| {
            if self.cells[y as usize * width as usize + x as usize] {
                Luma([EXCLUDE])
            } else {
                Luma([INCLUDE])
            }
        }))
    }
}

// ============================================================================
// HULL
// ============================================================================

/// Convex hull of a pixel set, as polygon vertices.
///
/// Returns `None` when the hull has zero area (fewer than three distinct
/// points, or all collinear).
pub fn convex_hull(pixels: &[(i64, i64)]) -> Option<Vec<(f64, f64)>> {
    if pixels.len() < 3 {
        return None;
    }
    let points: MultiPoint<f64> = pixels
        .iter()
        .map(|&(x, y)| Point::new(x as f64, y as f64))
        .collect();
    let hull = points.convex_hull();
    if hull.unsigned_area() <= EDGE_EPSILON {
        return None;
    }
    Some(hull.exterior().coords().map(|c| (c.x, c.y)).collect())
}

// ============================================================================
// OUTPUT RASTERS
// ============================================================================

/// 8-bit single-channel inclusion mask; values are exactly 0 or 255.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskRaster(GrayImage);

impl MaskRaster {
    /// A mask that includes every pixel.
    pub fn include_all(size: ImageSize) -> Self {
        BinaryCanvas::new(size).into_inclusion_mask()
    }

    pub fn width(&self) -> u32 {
        self.0.width()
    }

    pub fn height(&self) -> u32 {
        self.0.height()
    }

    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.0.get_pixel(x, y)[0]
    }

    /// Number of pixels with the given value.
    pub fn count(&self, value: u8) -> usize {
        self.0.pixels().filter(|p| p[0] == value).count()
    }

    pub fn as_image(&self) -> &GrayImage {
        &self.0
    }

    pub fn encode_png(&self) -> ImageResult<Vec<u8>> {
        let mut bytes = Vec::new();
        self.0.write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)?;
        Ok(bytes)
    }
}

/// 16-bit single-channel depth raster in millimetres; 0 means no depth.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthRaster(ImageBuffer<Luma<u16>, Vec<u16>>);

impl DepthRaster {
    /// An all-zero raster.
    pub fn empty(size: ImageSize) -> Self {
        Self(ImageBuffer::new(size.width, size.height))
    }

    pub fn width(&self) -> u32 {
        self.0.width()
    }

    pub fn height(&self) -> u32 {
        self.0.height()
    }

    pub fn get(&self, x: u32, y: u32) -> u16 {
        self.0.get_pixel(x, y)[0]
    }

    pub fn set(&mut self, x: u32, y: u32, millimetres: u16) {
        self.0.put_pixel(x, y, Luma([millimetres]));
    }

    /// Number of pixels carrying a depth.
    pub fn written(&self) -> usize {
        self.0.pixels().filter(|p| p[0] != 0).count()
    }

    pub fn as_image(&self) -> &ImageBuffer<Luma<u16>, Vec<u16>> {
        &self.0
    }

    pub fn encode_png(&self) -> ImageResult<Vec<u8>> {
        let mut bytes = Vec::new();
        self.0.write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canvas(w: u32, h: u32) -> BinaryCanvas {
        BinaryCanvas::new(ImageSize::new(w, h))
    }

    #[test]
    fn test_disc_radius_three_has_29_pixels() {
        let mut c = canvas(20, 20);
        c.fill_disc(10, 10, 3);
        assert_eq!(c.count(), 29);
        assert!(c.get(13, 10));
        assert!(!c.get(13, 11));
    }

    #[test]
    fn test_disc_is_clipped_at_border() {
        let mut c = canvas(20, 20);
        c.fill_disc(0, 0, 3);
        // Quarter disc including both axes
        assert_eq!(c.count(), 11);
    }

    #[test]
    fn test_dilation_anchor_for_even_kernel() {
        let mut c = canvas(10, 10);
        c.set(5, 5);
        c.dilate(4);

        // Sampling offsets -2..=1 spread the pixel over 4..=7
        assert_eq!(c.count(), 16);
        assert!(c.get(4, 4));
        assert!(c.get(7, 7));
        assert!(!c.get(3, 5));
        assert!(!c.get(8, 5));
    }

    #[test]
    fn test_dilation_of_one_is_noop() {
        let mut c = canvas(10, 10);
        c.set(2, 7);
        let before = c.clone();
        c.dilate(1);
        assert_eq!(c, before);
        c.dilate(0);
        assert_eq!(c, before);
    }

    #[test]
    fn test_rect_is_inclusive_and_clipped() {
        let mut c = canvas(10, 10);
        c.fill_rect(-5, 8, 2, 20);
        assert_eq!(c.count(), 3 * 2);
    }

    #[test]
    fn test_convex_polygon_fill_matches_square() {
        let mut c = canvas(10, 10);
        c.fill_convex_polygon(&[(2.0, 2.0), (5.0, 2.0), (5.0, 4.0), (2.0, 4.0)]);
        assert_eq!(c.count(), 4 * 3);
        assert!(c.get(2, 2) && c.get(5, 4));
    }

    #[test]
    fn test_convex_polygon_fill_triangle() {
        let mut c = canvas(10, 10);
        c.fill_convex_polygon(&[(0.0, 0.0), (4.0, 0.0), (0.0, 4.0)]);
        // Rows 0..=4 hold 5,4,3,2,1 pixels
        assert_eq!(c.count(), 15);
    }

    #[test]
    fn test_hull_rejects_collinear_points() {
        assert!(convex_hull(&[(0, 0), (1, 1), (2, 2), (3, 3)]).is_none());
        assert!(convex_hull(&[(0, 0), (5, 0)]).is_none());

        let hull = convex_hull(&[(0, 0), (4, 0), (4, 4), (0, 4), (2, 2)]).unwrap();
        // Closed ring: four corners plus the repeated first vertex
        assert_eq!(hull.len(), 5);
    }

    #[test]
    fn test_inclusion_mask_polarity() {
        let mut c = canvas(4, 4);
        c.set(1, 1);
        let mask = c.into_inclusion_mask();

        assert_eq!(mask.get(1, 1), EXCLUDE);
        assert_eq!(mask.get(0, 0), INCLUDE);
        assert_eq!(mask.count(EXCLUDE) + mask.count(INCLUDE), 16);
    }

    #[test]
    fn test_png_encoding_round_trips_depth() {
        let mut depth = DepthRaster::empty(ImageSize::new(3, 2));
        depth.set(2, 1, 65535);
        depth.set(0, 0, 5000);

        let png = depth.encode_png().unwrap();
        let decoded = image::load_from_memory(&png).unwrap().into_luma16();
        assert_eq!(decoded.get_pixel(2, 1)[0], 65535);
        assert_eq!(decoded.get_pixel(0, 0)[0], 5000);
        assert_eq!(decoded.get_pixel(1, 0)[0], 0);
    }
}
