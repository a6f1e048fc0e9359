//! Marker candidate blobs and best-blob selection
//!
//! Core abstraction for representing one detected contour and ranking a pool
//! of them.

use crate::Result;
use marker_core::{Observation, Position, Window};
use opencv::{
    core::{self, Mat, Point, Point2d, Rect, Vector},
    imgproc,
    prelude::*,
};
use std::cmp::Ordering;
use std::f64::consts::PI;

/// One connected region interpreted as a marker candidate.
///
/// Immutable once built. A contour enclosing zero area yields the sentinel
/// centroid (-1, -1) with every derived metric zeroed.
#[derive(Debug, Clone, PartialEq)]
pub struct Blob {
    id: u32,
    contour: Vec<Point>,
    centroid: Point2d,
    area: f64,
    perimeter: f64,
    circularity: f64,
    intensity: f64,
    convex: bool,
    rect: Rect,
}

impl Blob {
    /// Build a blob from a closed contour.
    ///
    /// `image` is the 3-channel frame the contour was found in and `mask` the
    /// binary image it was traced from; the intensity is the sum of the mean
    /// channel values over the masked pixels inside the bounding rectangle.
    pub fn new(id: u32, contour: &Vector<Point>, image: &Mat, mask: &Mat) -> Result<Self> {
        let moments = imgproc::moments(contour, false)?;
        let points = contour.to_vec();

        if moments.m00.abs() <= f64::EPSILON {
            return Ok(Self::degenerate(id, points));
        }

        let rect = imgproc::bounding_rect(contour)?;
        let image_roi = Mat::roi(image, rect)?.try_clone()?;
        let mask_roi = Mat::roi(mask, rect)?.try_clone()?;
        let mean = core::mean(&image_roi, &mask_roi)?;

        let area = imgproc::contour_area(contour, false)?;
        let perimeter = imgproc::arc_length(contour, true)?;
        let circularity = if perimeter > 0.0 {
            4.0 * PI * area / (perimeter * perimeter)
        } else {
            0.0
        };

        Ok(Self {
            id,
            contour: points,
            centroid: Point2d::new(moments.m10 / moments.m00, moments.m01 / moments.m00),
            area,
            perimeter,
            circularity,
            intensity: mean[0] + mean[1] + mean[2],
            convex: imgproc::is_contour_convex(contour)?,
            rect,
        })
    }

    fn degenerate(id: u32, contour: Vec<Point>) -> Self {
        Self {
            id,
            contour,
            centroid: Point2d::new(-1.0, -1.0),
            area: 0.0,
            perimeter: 0.0,
            circularity: 0.0,
            intensity: 0.0,
            convex: false,
            rect: Rect::default(),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn contour(&self) -> &[Point] {
        &self.contour
    }

    pub fn centroid(&self) -> Point2d {
        self.centroid
    }

    pub fn area(&self) -> f64 {
        self.area
    }

    pub fn perimeter(&self) -> f64 {
        self.perimeter
    }

    /// `4π·area / perimeter²`: 1.0 for a circle, towards 0 for irregular shapes
    pub fn circularity(&self) -> f64 {
        self.circularity
    }

    pub fn intensity(&self) -> f64 {
        self.intensity
    }

    pub fn is_convex(&self) -> bool {
        self.convex
    }

    pub fn bounding_rect(&self) -> Rect {
        self.rect
    }

    pub fn equivalent_diameter(&self) -> f64 {
        (4.0 * self.area / PI).sqrt()
    }

    pub fn is_degenerate(&self) -> bool {
        self.centroid == Point2d::new(-1.0, -1.0)
    }

    /// Centroid as a tracker position, `None` for a degenerate contour
    pub fn position(&self) -> Option<Position> {
        if self.is_degenerate() {
            None
        } else {
            Some(Position::new(self.centroid.x, self.centroid.y))
        }
    }

    /// True if any contour point lies on a non-zero pixel of `mask`
    pub fn is_on_mask(&self, mask: &Mat) -> Result<bool> {
        let (rows, cols) = (mask.rows(), mask.cols());
        for point in &self.contour {
            if point.x < 0 || point.y < 0 || point.x >= cols || point.y >= rows {
                continue;
            }
            if *mask.at_2d::<u8>(point.y, point.x)? != 0 {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// True if at least one contour point lies inside `window`
    pub fn touches(&self, window: &Window) -> bool {
        self.contour
            .iter()
            .any(|point| window.contains(point.x as f64, point.y as f64))
    }

    /// Move a blob found inside a cropped region back to frame coordinates
    pub fn translate(mut self, offset: Point) -> Self {
        if offset == Point::default() {
            return self;
        }
        for point in &mut self.contour {
            point.x += offset.x;
            point.y += offset.y;
        }
        if !self.is_degenerate() {
            self.centroid.x += offset.x as f64;
            self.centroid.y += offset.y as f64;
            self.rect.x += offset.x;
            self.rect.y += offset.y;
        }
        self
    }

    #[cfg(test)]
    pub(crate) fn with_metrics(
        id: u32,
        contour: Vec<Point>,
        area: f64,
        circularity: f64,
        intensity: f64,
    ) -> Self {
        let n = contour.len().max(1) as f64;
        let (sx, sy) = contour
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x as f64, sy + p.y as f64));
        Self {
            id,
            contour,
            centroid: Point2d::new(sx / n, sy / n),
            area,
            perimeter: 0.0,
            circularity,
            intensity,
            convex: true,
            rect: Rect::default(),
        }
    }
}

/// Ranking criteria used by the consensus rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankCriterion {
    /// Brightest first
    Intensity,
    /// Least circular first
    Circularity,
    /// Largest first
    Area,
}

impl RankCriterion {
    pub const ALL: [RankCriterion; 3] = [
        RankCriterion::Intensity,
        RankCriterion::Circularity,
        RankCriterion::Area,
    ];

    fn compare(&self, a: &Blob, b: &Blob) -> Ordering {
        match self {
            RankCriterion::Intensity => b.intensity.total_cmp(&a.intensity),
            RankCriterion::Circularity => a.circularity.total_cmp(&b.circularity),
            RankCriterion::Area => b.area.total_cmp(&a.area),
        }
    }
}

/// Outcome of best-blob selection
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Found(Blob),
    NotFound,
}

impl Selection {
    pub fn blob(&self) -> Option<&Blob> {
        match self {
            Selection::Found(blob) => Some(blob),
            Selection::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Selection::Found(_))
    }

    /// Tracker observation of this selection
    pub fn observation(&self) -> Observation {
        self.blob()
            .and_then(Blob::position)
            .map_or(Observation::NotFound, Observation::Found)
    }
}

/// Filtered candidate blobs of one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlobPool {
    blobs: Vec<Blob>,
}

impl BlobPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_vec(blobs: Vec<Blob>) -> Self {
        Self { blobs }
    }

    pub fn push(&mut self, blob: Blob) {
        self.blobs.push(blob);
    }

    pub fn as_slice(&self) -> &[Blob] {
        &self.blobs
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Blob> {
        self.blobs.iter()
    }

    /// Drop blobs touching the static exclusion mask or smaller than `min_area`
    pub fn filter(mut self, exclusion: &Mat, min_area: f64) -> Result<Self> {
        let mut kept = Vec::with_capacity(self.blobs.len());
        for blob in self.blobs.drain(..) {
            if blob.is_on_mask(exclusion)? || blob.area < min_area {
                continue;
            }
            kept.push(blob);
        }
        Ok(Self::from_vec(kept))
    }

    /// Keep only blobs with at least one contour point inside `window`
    pub fn restrict_to(mut self, window: &Window) -> Self {
        self.blobs.retain(|blob| blob.touches(window));
        self
    }

    /// Pool ordered by one criterion, ties keeping pool order
    pub fn ranked(&self, criterion: RankCriterion) -> Vec<&Blob> {
        let mut ranked: Vec<&Blob> = self.blobs.iter().collect();
        ranked.sort_by(|a, b| criterion.compare(a, b));
        ranked
    }

    /// Pick the single best blob inside `window`, consuming the pool.
    ///
    /// The pool is first restricted to `window`. A blob is only returned when
    /// it ranks first by intensity, by circularity and by area at once; any
    /// disagreement yields `NotFound`.
    pub fn select_best(self, window: &Window) -> Selection {
        let pool = self.restrict_to(window);
        if pool.is_empty() {
            return Selection::NotFound;
        }

        let leaders: Vec<&Blob> = RankCriterion::ALL
            .iter()
            .filter_map(|criterion| pool.ranked(*criterion).first().copied())
            .collect();

        let first = leaders[0];
        if leaders.iter().all(|leader| leader.id == first.id) {
            Selection::Found(first.clone())
        } else {
            Selection::NotFound
        }
    }
}

impl IntoIterator for BlobPool {
    type Item = Blob;
    type IntoIter = std::vec::IntoIter<Blob>;

    fn into_iter(self) -> Self::IntoIter {
        self.blobs.into_iter()
    }
}

impl FromIterator<Blob> for BlobPool {
    fn from_iter<T: IntoIterator<Item = Blob>>(iter: T) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::{CV_8UC1, CV_8UC3, Scalar};

    fn square(x: i32, y: i32, side: i32) -> Vec<Point> {
        vec![
            Point::new(x, y),
            Point::new(x, y + side),
            Point::new(x + side, y + side),
            Point::new(x + side, y),
        ]
    }

    fn blank(rows: i32, cols: i32) -> Result<(Mat, Mat)> {
        let color = Scalar::new(10.0, 20.0, 30.0, 0.0);
        let image = Mat::new_rows_cols_with_default(rows, cols, CV_8UC3, color)?;
        let mask = Mat::new_rows_cols_with_default(rows, cols, CV_8UC1, Scalar::all(255.0))?;
        Ok((image, mask))
    }

    #[test]
    fn test_zero_area_contour_is_degenerate() -> Result<()> {
        let (image, mask) = blank(50, 50)?;
        let line = Vector::from_slice(&[Point::new(5, 5), Point::new(20, 5), Point::new(35, 5)]);

        let blob = Blob::new(0, &line, &image, &mask)?;
        assert_eq!(blob.centroid(), Point2d::new(-1.0, -1.0));
        assert_eq!(blob.area(), 0.0);
        assert_eq!(blob.perimeter(), 0.0);
        assert_eq!(blob.circularity(), 0.0);
        assert!(!blob.is_convex());
        assert!(blob.position().is_none());
        Ok(())
    }

    #[test]
    fn test_square_metrics() -> Result<()> {
        let (image, mask) = blank(50, 50)?;
        let contour = Vector::from_slice(&square(10, 10, 20));

        let blob = Blob::new(3, &contour, &image, &mask)?;
        assert_eq!(blob.id(), 3);
        assert_eq!(blob.area(), 400.0);
        assert_eq!(blob.perimeter(), 80.0);
        assert!((blob.circularity() - PI / 4.0).abs() < 1e-9);
        assert!((blob.centroid().x - 20.0).abs() < 1e-9);
        assert!((blob.centroid().y - 20.0).abs() < 1e-9);
        assert!((blob.intensity() - 60.0).abs() < 1e-9);
        assert!(blob.is_convex());
        Ok(())
    }

    #[test]
    fn test_circular_contour_has_unit_circularity() -> Result<()> {
        let (image, mask) = blank(300, 300)?;
        let radius = 100.0;
        let points: Vec<Point> = (0..64)
            .map(|i| {
                let angle = 2.0 * PI * i as f64 / 64.0;
                Point::new(
                    (150.0 + radius * angle.cos()).round() as i32,
                    (150.0 + radius * angle.sin()).round() as i32,
                )
            })
            .collect();

        let blob = Blob::new(0, &Vector::from_slice(&points), &image, &mask)?;
        assert!((blob.circularity() - 1.0).abs() < 0.05, "circularity {}", blob.circularity());
        assert!((blob.equivalent_diameter() - 200.0).abs() < 5.0);
        Ok(())
    }

    #[test]
    fn test_translate_moves_geometry() -> Result<()> {
        let (image, mask) = blank(50, 50)?;
        let blob = Blob::new(0, &Vector::from_slice(&square(0, 0, 10)), &image, &mask)?;
        let moved = blob.translate(Point::new(100, 40));
        assert_eq!(moved.contour()[0], Point::new(100, 40));
        assert!((moved.centroid().x - 105.0).abs() < 1e-9);
        assert_eq!(moved.bounding_rect().y, 40);
        Ok(())
    }

    #[test]
    fn test_is_on_mask() -> Result<()> {
        let (image, mask) = blank(50, 50)?;
        let blob = Blob::new(0, &Vector::from_slice(&square(10, 10, 10)), &image, &mask)?;

        let mut exclusion = Mat::new_rows_cols_with_default(50, 50, CV_8UC1, Scalar::all(0.0))?;
        assert!(!blob.is_on_mask(&exclusion)?);
        *exclusion.at_2d_mut::<u8>(20, 20)? = 255;
        assert!(blob.is_on_mask(&exclusion)?);
        Ok(())
    }

    #[test]
    fn test_filter_drops_small_and_masked_blobs() -> Result<()> {
        let mut exclusion = Mat::new_rows_cols_with_default(100, 100, CV_8UC1, Scalar::all(0.0))?;
        *exclusion.at_2d_mut::<u8>(50, 50)? = 255;
        let pool = BlobPool::from_vec(vec![
            Blob::with_metrics(0, square(10, 10, 5), 25.0, 0.7, 100.0),
            Blob::with_metrics(1, square(10, 30, 1), 1.0, 0.7, 100.0),
            Blob::with_metrics(2, square(45, 45, 5), 25.0, 0.7, 100.0),
        ]);

        let filtered = pool.filter(&exclusion, 4.0)?;
        let ids: Vec<u32> = filtered.iter().map(Blob::id).collect();
        assert_eq!(ids, vec![0]);
        Ok(())
    }

    #[test]
    fn test_select_best_empty_window_is_not_found() {
        let pool =
            BlobPool::from_vec(vec![Blob::with_metrics(0, square(10, 10, 5), 25.0, 0.7, 100.0)]);
        let window = Window::new(200.0, 200.0, 100.0, 100.0);
        assert_eq!(pool.select_best(&window), Selection::NotFound);
        assert_eq!(BlobPool::new().select_best(&window), Selection::NotFound);
    }

    #[test]
    fn test_select_best_requires_consensus() {
        // Largest, least circular and brightest are three different blobs
        let pool = BlobPool::from_vec(vec![
            Blob::with_metrics(0, square(10, 10, 5), 90.0, 0.8, 100.0),
            Blob::with_metrics(1, square(30, 10, 5), 40.0, 0.3, 150.0),
            Blob::with_metrics(2, square(50, 10, 5), 30.0, 0.9, 300.0),
        ]);
        let window = Window::new(0.0, 0.0, 100.0, 100.0);
        assert_eq!(pool.select_best(&window), Selection::NotFound);
    }

    #[test]
    fn test_select_best_returns_dominant_blob() {
        let pool = BlobPool::from_vec(vec![
            Blob::with_metrics(0, square(10, 10, 5), 20.0, 0.8, 100.0),
            Blob::with_metrics(1, square(30, 10, 5), 90.0, 0.2, 400.0),
            Blob::with_metrics(2, square(50, 10, 5), 30.0, 0.9, 300.0),
        ]);
        let window = Window::new(0.0, 0.0, 100.0, 100.0);

        let selection = pool.select_best(&window);
        assert_eq!(selection.blob().map(Blob::id), Some(1));
        assert!(selection.observation().is_found());
    }

    #[test]
    fn test_select_best_ignores_blobs_outside_window() {
        // The dominant blob lies outside the window; the remaining one wins alone
        let pool = BlobPool::from_vec(vec![
            Blob::with_metrics(0, square(10, 10, 5), 20.0, 0.8, 100.0),
            Blob::with_metrics(1, square(300, 300, 5), 90.0, 0.2, 400.0),
        ]);
        let window = Window::new(0.0, 0.0, 100.0, 100.0);
        assert_eq!(pool.select_best(&window).blob().map(Blob::id), Some(0));
    }
}
