/*
This code is part of the crown_segmentation library.
Created: 19/10/2026
Last Modified: 19/10/2026
License: MIT
*/

use crate::configs::Configs;
use crate::structures::{LidarPoint, Point2D, Point3D};
use kd_tree::{KdPoint, KdTree};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::io::{Error, ErrorKind};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

/// A finite, indexed collection of 3-D points. The index of a point is its
/// identity throughout a segmentation run.
pub trait PointSource {
    fn num_points(&self) -> usize;
    fn get_point(&self, index: usize) -> Point3D;
}

impl PointSource for [Point3D] {
    fn num_points(&self) -> usize {
        self.len()
    }

    fn get_point(&self, index: usize) -> Point3D {
        self[index]
    }
}

impl PointSource for Vec<Point3D> {
    fn num_points(&self) -> usize {
        self.len()
    }

    fn get_point(&self, index: usize) -> Point3D {
        self[index]
    }
}

impl PointSource for [[f64; 3]] {
    fn num_points(&self) -> usize {
        self.len()
    }

    fn get_point(&self, index: usize) -> Point3D {
        let p = self[index];
        Point3D::new(p[0], p[1], p[2])
    }
}

impl PointSource for Vec<[f64; 3]> {
    fn num_points(&self) -> usize {
        self.len()
    }

    fn get_point(&self, index: usize) -> Point3D {
        self.as_slice().get_point(index)
    }
}

#[derive(Clone, Copy, Debug)]
struct TreeItem {
    point: [f64; 2],
    id: usize,
}

impl KdPoint for TreeItem {
    type Scalar = f64;
    type Dim = typenum::U2;
    fn at(&self, k: usize) -> f64 {
        self.point[k]
    }
}

/// Owns the full input cloud and the working set of smoothed surface points
/// that the delineation loop consumes.
///
/// Surface points live in an arena addressed by slot. Removal only clears a
/// liveness flag, so slots stay valid for the whole run. The tallest live
/// point is found through a cursor over the slots pre-sorted by descending
/// height, with ties going to the lower original index.
pub struct PointStore {
    full: Vec<LidarPoint>,
    full_tree: KdTree<TreeItem>,
    surface: Vec<LidarPoint>,
    surface_tree: Arc<KdTree<TreeItem>>,
    live: Vec<bool>,
    num_live: usize,
    order: Vec<usize>,
    cursor: usize,
}

impl PointStore {
    /// Reads the input cloud and prepares the working set: the cloud is
    /// thinned to its highest point per `nps` cell, points at or below `th`
    /// are dropped and the remaining heights are Gaussian-smoothed.
    pub fn new<S: PointSource + ?Sized>(
        source: &S,
        nps: f64,
        th: f64,
        configs: &Configs,
    ) -> Result<PointStore, Error> {
        let n_points = source.num_points();
        let mut full: Vec<LidarPoint> = Vec::with_capacity(n_points);
        for i in 0..n_points {
            let p = source.get_point(i);
            if !p.is_finite() {
                return Err(Error::new(
                    ErrorKind::InvalidInput,
                    format!("Point {} has a non-finite coordinate.", i),
                ));
            }
            full.push(LidarPoint::new(p.x, p.y, p.z, i));
        }

        let surface_ids = thin_highest(&full, nps, configs.verbose_mode);
        let retained: Vec<LidarPoint> = surface_ids
            .into_iter()
            .map(|i| full[i])
            .filter(|p| p.z > th)
            .collect();

        let surface_tree: Arc<KdTree<TreeItem>> = Arc::new(KdTree::build_by_ordered_float(
            retained
                .iter()
                .enumerate()
                .map(|(slot, p)| TreeItem {
                    point: [p.x, p.y],
                    id: slot,
                })
                .collect(),
        ));

        let surface = smooth_heights(retained, &surface_tree, nps, configs)?;

        let full_tree: KdTree<TreeItem> = KdTree::build_by_ordered_float(
            full.iter()
                .map(|p| TreeItem {
                    point: [p.x, p.y],
                    id: p.index,
                })
                .collect(),
        );

        let mut order: Vec<usize> = (0..surface.len()).collect();
        order.sort_by(|a, b| {
            surface[*b]
                .z
                .total_cmp(&surface[*a].z)
                .then(surface[*a].index.cmp(&surface[*b].index))
        });

        let num_live = surface.len();
        Ok(PointStore {
            full,
            full_tree,
            surface,
            surface_tree,
            live: vec![true; num_live],
            num_live,
            order,
            cursor: 0,
        })
    }

    /// Number of points in the full input cloud.
    pub fn num_points(&self) -> usize {
        self.full.len()
    }

    pub fn full_point(&self, index: usize) -> &LidarPoint {
        &self.full[index]
    }

    /// Number of preprocessed surface points, live or consumed.
    pub fn num_surface_points(&self) -> usize {
        self.surface.len()
    }

    pub fn surface_point(&self, slot: usize) -> &LidarPoint {
        &self.surface[slot]
    }

    pub fn num_live(&self) -> usize {
        self.num_live
    }

    pub fn is_empty(&self) -> bool {
        self.num_live == 0
    }

    /// The slot of the tallest live surface point.
    pub fn highest_live(&mut self) -> Option<usize> {
        while self.cursor < self.order.len() {
            let slot = self.order[self.cursor];
            if self.live[slot] {
                return Some(slot);
            }
            self.cursor += 1;
        }
        None
    }

    /// Removes a point from the working set. Returns false if it had already
    /// been consumed.
    pub fn remove(&mut self, slot: usize) -> bool {
        if self.live[slot] {
            self.live[slot] = false;
            self.num_live -= 1;
            true
        } else {
            false
        }
    }

    /// Slots of the live surface points within a planar radius of a location,
    /// in ascending slot order.
    pub fn live_within(&self, center: &Point2D, radius: f64) -> Vec<usize> {
        if self.is_empty() {
            return vec![];
        }
        let mut slots: Vec<usize> = self
            .surface_tree
            .within_radius(&[center.x, center.y], radius)
            .iter()
            .map(|item| item.id)
            .filter(|slot| self.live[*slot])
            .collect();
        slots.sort_unstable();
        slots
    }

    /// Original indices of the full-cloud points within a planar radius of a
    /// location, in ascending order.
    pub fn full_within(&self, center: &Point2D, radius: f64) -> Vec<usize> {
        if self.full.is_empty() {
            return vec![];
        }
        let mut ids: Vec<usize> = self
            .full_tree
            .within_radius(&[center.x, center.y], radius)
            .iter()
            .map(|item| item.id)
            .collect();
        ids.sort_unstable();
        ids
    }
}

/// Returns the original indices of the highest point in each occupied grid
/// cell of size `nps`, in ascending order. Of equally high points in a cell
/// the one that comes first in the cloud is kept. Only occupied cells are
/// stored, so sparse clouds with distant outliers cost no more than dense ones.
fn thin_highest(points: &[LidarPoint], nps: f64, verbose: bool) -> Vec<usize> {
    let n_points = points.len();
    if n_points == 0 {
        return vec![];
    }
    if verbose {
        println!("Thinning surface points...");
    }

    let mut west = f64::INFINITY;
    let mut north = f64::NEG_INFINITY;
    for p in points {
        west = west.min(p.x);
        north = north.max(p.y);
    }

    let mut cells: HashMap<(isize, isize), usize> = HashMap::new();
    let mut filtered = vec![false; n_points];
    let mut row: isize;
    let mut col: isize;
    let num_points = (n_points - 1).max(1) as f64; // used for progress calculation only
    let mut progress: usize;
    let mut old_progress: usize = 1;
    for i in 0..n_points {
        let p = &points[i];
        col = ((p.x - west) / nps).floor() as isize;
        row = ((north - p.y) / nps).floor() as isize;
        match cells.entry((row, col)) {
            Entry::Vacant(cell) => {
                cell.insert(i);
            }
            Entry::Occupied(mut cell) => {
                let prev_id = *cell.get();
                if p.z > points[prev_id].z {
                    cell.insert(i);
                    filtered[prev_id] = true;
                } else {
                    filtered[i] = true;
                }
            }
        }
        if verbose {
            progress = (100.0_f64 * i as f64 / num_points) as usize;
            if progress != old_progress {
                println!("Progress: {}%", progress);
                old_progress = progress;
            }
        }
    }

    (0..n_points).filter(|i| !filtered[*i]).collect()
}

/// Replaces each point's height with the Gaussian-weighted mean height of
/// the points in a square window of half-width `3 * nps` around it.
fn smooth_heights(
    points: Vec<LidarPoint>,
    kdtree: &Arc<KdTree<TreeItem>>,
    nps: f64,
    configs: &Configs,
) -> Result<Vec<LidarPoint>, Error> {
    let n_points = points.len();
    if n_points == 0 {
        return Ok(points);
    }
    if configs.verbose_mode {
        println!("Smoothing surface heights...");
    }

    let half_width = 3f64 * nps;
    // covers the corners of the square window
    let search_radius = half_width * 1.5f64;
    let two_sigma_sqrd = 2f64 * nps * nps;
    let num_procs = configs.num_procs();

    let points = Arc::new(points);
    let (tx, rx) = mpsc::channel();
    for tid in 0..num_procs {
        let points = points.clone();
        let kdtree = kdtree.clone();
        let tx = tx.clone();
        thread::spawn(move || {
            for i in (0..n_points).filter(|i| i % num_procs == tid) {
                let p = points[i];
                let found = kdtree.within_radius(&[p.x, p.y], search_radius);
                let mut sum_weights = 0f64;
                let mut sum_z = 0f64;
                for item in found {
                    let q = &points[item.id];
                    let (dx, dy) = (q.x - p.x, q.y - p.y);
                    if dx.abs() <= half_width && dy.abs() <= half_width {
                        let w = (-(dx * dx + dy * dy) / two_sigma_sqrd).exp();
                        sum_weights += w;
                        sum_z += w * q.z;
                    }
                }
                let z = if sum_weights > 0f64 {
                    sum_z / sum_weights
                } else {
                    p.z
                };
                if tx.send((i, z)).is_err() {
                    return;
                }
            }
        });
    }
    drop(tx);

    let mut smoothed: Vec<LidarPoint> = (*points).clone();
    let mut progress: usize;
    let mut old_progress: usize = 1;
    for n in 0..n_points {
        let (i, z) = rx
            .recv()
            .map_err(|e| Error::new(ErrorKind::Other, format!("Smoothing failed: {}", e)))?;
        smoothed[i].z = z;
        if configs.verbose_mode {
            progress = (100.0_f64 * n as f64 / (n_points - 1).max(1) as f64) as usize;
            if progress != old_progress {
                println!("Progress: {}%", progress);
                old_progress = progress;
            }
        }
    }
    Ok(smoothed)
}

#[cfg(test)]
mod test {
    use super::{PointSource, PointStore};
    use crate::configs::Configs;
    use crate::structures::{Point2D, Point3D};
    use std::io::ErrorKind;

    fn quiet() -> Configs {
        Configs::new()
    }

    #[test]
    fn test_point_sources() {
        let raw: Vec<[f64; 3]> = vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        assert_eq!(raw.num_points(), 2);
        assert_eq!(raw.get_point(1), Point3D::new(4.0, 5.0, 6.0));
        assert_eq!(raw[..].get_point(0), Point3D::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_thinning_keeps_highest_point_per_cell() {
        let points = vec![
            Point3D::new(0.2, 0.2, 10.0),
            Point3D::new(0.7, 0.4, 12.0),
            Point3D::new(0.6, 0.3, 12.0),
            Point3D::new(5.5, 0.2, 9.0),
        ];
        let store = PointStore::new(&points, 1.0, 1.0, &quiet()).unwrap();
        assert_eq!(store.num_points(), 4);
        assert_eq!(store.num_surface_points(), 2);
        assert_eq!(store.surface_point(0).index, 1);
        assert_eq!(store.surface_point(1).index, 3);
    }

    #[test]
    fn test_thinning_far_outlier() {
        let points = vec![
            Point3D::new(0.0, 0.0, 10.0),
            Point3D::new(200000.0, 200000.0, 10.0),
            Point3D::new(0.1, -0.1, 9.0),
        ];
        let store = PointStore::new(&points, 0.25, 5.0, &quiet()).unwrap();
        assert_eq!(store.num_surface_points(), 2);
        assert_eq!(store.surface_point(0).index, 0);
        assert_eq!(store.surface_point(1).index, 1);
        assert_eq!(store.surface_point(1).z, 10.0);
    }

    #[test]
    fn test_height_filter() {
        let points = vec![
            Point3D::new(0.0, 0.0, 5.0),
            Point3D::new(10.0, 0.0, 5.5),
            Point3D::new(20.0, 0.0, 1.0),
        ];
        let store = PointStore::new(&points, 0.5, 5.0, &quiet()).unwrap();
        assert_eq!(store.num_surface_points(), 1);
        assert_eq!(store.surface_point(0).index, 1);
        assert_eq!(store.surface_point(0).z, 5.5);
    }

    #[test]
    fn test_smoothing_changes_height_only() {
        let mut points = vec![];
        for row in 0..8 {
            for col in 0..8 {
                let z = if row == 4 && col == 4 { 14.0 } else { 10.0 };
                points.push(Point3D::new(col as f64 * 0.5, row as f64 * 0.5, z));
            }
        }
        let store = PointStore::new(&points, 0.5, 2.0, &quiet()).unwrap();
        assert_eq!(store.num_surface_points(), 64);
        let peak = store
            .order
            .first()
            .map(|slot| *store.surface_point(*slot))
            .unwrap();
        assert_eq!(peak.index, 36);
        assert_eq!((peak.x, peak.y), (2.0, 2.0));
        assert!(peak.z > 10.0 && peak.z < 14.0);
        // beyond the window the spike has no influence
        assert!((store.surface_point(0).z - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_working_set() {
        let points = vec![
            Point3D::new(0.0, 0.0, 8.0),
            Point3D::new(50.0, 0.0, 9.0),
            Point3D::new(100.0, 0.0, 8.0),
        ];
        let mut store = PointStore::new(&points, 0.25, 2.0, &quiet()).unwrap();
        assert_eq!(store.num_live(), 3);
        let first = store.highest_live().unwrap();
        assert_eq!(store.surface_point(first).index, 1);
        assert!(store.remove(first));
        assert!(!store.remove(first));
        // equal heights go to the lower index
        let second = store.highest_live().unwrap();
        assert_eq!(store.surface_point(second).index, 0);

        let near = store.live_within(&Point2D::new(45.0, 0.0), 60.0);
        assert_eq!(near, vec![0, 2]);
        assert_eq!(store.full_within(&Point2D::new(45.0, 0.0), 10.0), vec![1]);

        assert!(store.remove(0));
        assert!(store.remove(2));
        assert!(store.is_empty());
        assert!(store.highest_live().is_none());
        assert!(store.live_within(&Point2D::new(0.0, 0.0), 1.0).is_empty());
    }

    #[test]
    fn test_non_finite_input() {
        let points = vec![Point3D::new(0.0, f64::NAN, 8.0)];
        let e = PointStore::new(&points, 0.25, 2.0, &quiet()).err().unwrap();
        assert_eq!(e.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_empty_input() {
        let points: Vec<Point3D> = vec![];
        let mut store = PointStore::new(&points, 0.25, 2.0, &quiet()).unwrap();
        assert!(store.is_empty());
        assert!(store.highest_live().is_none());
    }
}
