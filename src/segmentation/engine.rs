/*
This code is part of the crown_segmentation library.
Created: 19/10/2026
Last Modified: 19/10/2026
License: MIT
*/

use super::boundary::{build_boundary, CrownBoundary};
use super::gap_detector::{find_extremity, Extremity};
use super::parameters::HamrazParameters;
use super::point_store::{PointSource, PointStore};
use super::profile::sample_profiles;
use crate::configs::Configs;
use crate::structures::{LidarPoint, Point2D};
use crate::utils::get_formatted_elapsed_time;
use std::io::{Error, ErrorKind};
use std::time::Instant;

/// A delineated tree.
#[derive(Clone, Debug)]
pub struct TreeRecord {
    /// Identifier, starting at 1 and increasing in order of acceptance.
    pub id: usize,
    /// The apex of the crown, with its smoothed height.
    pub apex: LidarPoint,
    /// The crown boundary, a counter-clockwise open ring.
    pub polygon: Vec<Point2D>,
    pub area: f64,
    /// Number of input points assigned to this tree.
    pub num_points: usize,
}

/// Summary of one pass of the delineation loop, handed to the progress
/// callback.
#[derive(Clone, Debug)]
pub struct IterationReport {
    pub iteration: usize,
    /// Original index of the apex of this iteration.
    pub apex_index: usize,
    pub area: f64,
    /// Working-set points consumed by this iteration.
    pub removed: usize,
    /// Working-set points left after this iteration.
    pub remaining: usize,
    pub tree_id: Option<usize>,
}

#[derive(Clone, Debug, Default)]
pub struct SegmentationResult {
    /// One entry per input point, in input order.
    pub tree_ids: Vec<Option<usize>>,
    pub trees: Vec<TreeRecord>,
    pub iterations: usize,
    /// False when the run stopped at the iteration cap before the working set
    /// was exhausted.
    pub completed: bool,
}

impl SegmentationResult {
    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    pub fn num_assigned(&self) -> usize {
        self.tree_ids.iter().filter(|id| id.is_some()).count()
    }
}

/// Assigns a tree id to a point unless the point already belongs to a tree.
/// Returns whether the assignment was made.
pub fn claim(tree_ids: &mut [Option<usize>], index: usize, id: usize) -> bool {
    if tree_ids[index].is_none() {
        tree_ids[index] = Some(id);
        true
    } else {
        false
    }
}

/// Segments a point cloud into individual tree crowns.
///
/// Each iteration takes the tallest remaining surface point as an apex,
/// delineates a crown boundary around it from angular height profiles,
/// consumes the working-set points inside the boundary and, if the boundary
/// is large enough, assigns a new tree id to every unassigned input point
/// inside it. Taller trees are delineated first, so they keep any points in
/// dispute with later ones.
///
/// ```ignore
/// let mut segmenter = CrownSegmenter::new(HamrazParameters::default())
///     .on_progress(|r| println!("{} points remaining", r.remaining));
/// let result = segmenter.run(&points)?;
/// ```
pub struct CrownSegmenter<'a> {
    params: HamrazParameters,
    configs: Configs,
    progress: Option<Box<dyn FnMut(&IterationReport) + 'a>>,
}

impl<'a> CrownSegmenter<'a> {
    pub fn new(params: HamrazParameters) -> CrownSegmenter<'a> {
        CrownSegmenter {
            params,
            configs: Configs::default(),
            progress: None,
        }
    }

    pub fn with_configs(mut self, configs: Configs) -> CrownSegmenter<'a> {
        self.configs = configs;
        self
    }

    /// Registers a callback that is invoked once per iteration.
    pub fn on_progress<F>(mut self, callback: F) -> CrownSegmenter<'a>
    where
        F: FnMut(&IterationReport) + 'a,
    {
        self.progress = Some(Box::new(callback));
        self
    }

    pub fn run<S: PointSource + ?Sized>(&mut self, source: &S) -> Result<SegmentationResult, Error> {
        self.params.validate()?;
        let params = self.params.clone();
        let verbose = self.configs.verbose_mode;

        if verbose {
            let tool_name = "CrownSegmentation";
            let welcome_len = format!("* Welcome to {} *", tool_name).len().max(33);
            println!("{}", "*".repeat(welcome_len));
            println!("* Welcome to {} {}*", tool_name, " ".repeat(welcome_len - 15 - tool_name.len()));
            println!("* Powered by crown_segmentation {}*", " ".repeat(welcome_len - 33));
            println!("{}", "*".repeat(welcome_len));
        }

        let start = Instant::now();

        let n_points = source.num_points();
        let mut result = SegmentationResult {
            tree_ids: vec![None; n_points],
            trees: vec![],
            iterations: 0,
            completed: true,
        };
        if n_points == 0 {
            if verbose {
                println!("The input point cloud is empty.");
            }
            return Ok(result);
        }

        let mut store = PointStore::new(source, params.nps, params.th, &self.configs)?;
        let initial_size = store.num_live();
        if verbose {
            println!(
                "{} of {} points retained as crown surface points.",
                initial_size, n_points
            );
            println!("Delineating tree crowns...");
        }

        let min_area = params.min_crown_area();
        let mut progress: usize;
        let mut old_progress: usize = 1;
        while !store.is_empty() {
            if let Some(max_iterations) = params.max_iterations {
                if result.iterations >= max_iterations {
                    result.completed = false;
                    break;
                }
            }
            result.iterations += 1;
            if result.iterations > initial_size {
                return Err(consistency_failure(&format!(
                    "iteration {} exceeds the initial working-set size of {}",
                    result.iterations, initial_size
                )));
            }

            let apex_slot = match store.highest_live() {
                Some(slot) => slot,
                None => {
                    return Err(consistency_failure(
                        "the working set is not empty but holds no live point",
                    ))
                }
            };
            let apex = *store.surface_point(apex_slot);
            let apex_xy = apex.planar();

            let boundary = self.delineate(&store, apex_slot, &apex);
            let reach = boundary.reach(&apex_xy) + params.nps;

            let mut members = vec![apex_slot];
            if !boundary.is_degenerate() {
                for slot in store.live_within(&apex_xy, reach) {
                    if slot != apex_slot && boundary.contains(&store.surface_point(slot).planar()) {
                        members.push(slot);
                    }
                }
            }

            let before = store.num_live();
            for slot in members {
                store.remove(slot);
            }
            let removed = before - store.num_live();
            if removed == 0 {
                return Err(consistency_failure(&format!(
                    "iteration {} consumed no points",
                    result.iterations
                )));
            }

            let mut tree_id = None;
            if boundary.area > min_area {
                let id = result.trees.len() + 1;
                let mut num_points = 0usize;
                for index in store.full_within(&apex_xy, reach) {
                    if boundary.contains(&store.full_point(index).planar())
                        && claim(&mut result.tree_ids, index, id)
                    {
                        num_points += 1;
                    }
                }
                result.trees.push(TreeRecord {
                    id,
                    apex,
                    polygon: boundary.hull.clone(),
                    area: boundary.area,
                    num_points,
                });
                tree_id = Some(id);
            }

            let report = IterationReport {
                iteration: result.iterations,
                apex_index: apex.index,
                area: boundary.area,
                removed,
                remaining: store.num_live(),
                tree_id,
            };
            if let Some(callback) = self.progress.as_mut() {
                callback(&report);
            }

            if verbose {
                progress =
                    (100.0_f64 * (initial_size - report.remaining) as f64 / initial_size as f64) as usize;
                if progress != old_progress {
                    println!("Progress: {}%", progress);
                    old_progress = progress;
                }
            }
        }

        if verbose {
            if !result.completed {
                println!(
                    "Warning: stopped after {} iterations with {} surface points remaining.",
                    result.iterations,
                    store.num_live()
                );
            }
            println!("Number of trees: {}", result.tree_count());
            println!(
                "{}",
                &format!("Elapsed Time: {}", get_formatted_elapsed_time(start))
            );
        }

        Ok(result)
    }

    fn delineate(&self, store: &PointStore, apex_slot: usize, apex: &LidarPoint) -> CrownBoundary {
        let apex_xy = apex.planar();
        let extremities: Vec<Extremity> = sample_profiles(
            store,
            apex_slot,
            self.params.search_radius,
            self.params.angular_bins,
        )
        .iter()
        .map(|profile| find_extremity(profile, &apex_xy, apex.z, &self.params))
        .collect();
        build_boundary(&extremities, &self.params)
    }
}

fn consistency_failure(msg: &str) -> Error {
    Error::new(
        ErrorKind::Other,
        format!("internal consistency failure: {}", msg),
    )
}

#[cfg(test)]
mod test {
    use super::{claim, CrownSegmenter, IterationReport};
    use crate::segmentation::parameters::HamrazParameters;
    use crate::structures::{Point2D, Point3D};
    use crate::algorithms::point_in_poly;
    use std::io::ErrorKind;

    const SPACING: f64 = 0.125;

    /// A lattice of points over the square of the given half-width around a
    /// centre, with heights from a surface function.
    fn lattice<F: Fn(f64, f64) -> f64>(cx: f64, cy: f64, half_width: f64, f: F) -> Vec<Point3D> {
        let n = (half_width / SPACING) as isize;
        let mut points = vec![];
        for row in -n..=n {
            for col in -n..=n {
                let x = cx + col as f64 * SPACING;
                let y = cy + row as f64 * SPACING;
                points.push(Point3D::new(x, y, f(x, y)));
            }
        }
        points
    }

    fn cone(cx: f64, cy: f64, height: f64, slope: f64) -> impl Fn(f64, f64) -> f64 {
        move |x: f64, y: f64| {
            let r = ((x - cx) * (x - cx) + (y - cy) * (y - cy)).sqrt();
            (height - slope * r).max(0.0)
        }
    }

    fn lattice_params() -> HamrazParameters {
        let mut params = HamrazParameters::default();
        params.nps = SPACING;
        params.th = 2.0;
        params
    }

    fn index_of(points: &[Point3D], x: f64, y: f64) -> usize {
        points
            .iter()
            .position(|p| p.x == x && p.y == y)
            .unwrap()
    }

    #[test]
    fn test_two_separated_trees() {
        let mut points = lattice(0.0, 0.0, 6.0, cone(0.0, 0.0, 10.0, 2.0));
        let n_first = points.len();
        points.extend(lattice(50.0, 50.0, 6.0, cone(50.0, 50.0, 10.0, 2.0)));

        let mut segmenter = CrownSegmenter::new(lattice_params());
        let result = segmenter.run(&points).unwrap();
        assert!(result.completed);
        assert!(result.tree_count() >= 2);
        assert_eq!(result.tree_ids.len(), points.len());

        // equally tall apexes go in input order
        assert_eq!(result.tree_ids[index_of(&points, 0.0, 0.0)], Some(1));
        assert_eq!(result.tree_ids[index_of(&points, 50.0, 50.0)], Some(2));
        for (i, id) in result.tree_ids.iter().enumerate() {
            if i < n_first {
                assert_ne!(*id, Some(2));
            } else {
                assert_ne!(*id, Some(1));
            }
        }
        assert!(result.trees[0].num_points > 3000);
        assert!(result.trees[1].num_points > 3000);
        for tree in &result.trees {
            assert!(tree.num_points > 0);
            assert!(tree.area > std::f64::consts::PI * 0.75 * 0.75);
        }
        // anything accepted later starts from the rim a crown left behind
        for tree in &result.trees[2..] {
            let p = tree.apex.planar();
            let centre = if p.x < 25.0 {
                Point2D::new(0.0, 0.0)
            } else {
                Point2D::new(50.0, 50.0)
            };
            assert!(p.distance(&centre) > 3.5);
            assert!(tree.num_points < result.trees[0].num_points);
        }
    }

    #[test]
    fn test_taller_tree_keeps_overlap() {
        let tall = cone(0.0, 0.0, 12.0, 2.4);
        let short = cone(6.0, 0.0, 10.0, 2.0);
        let points = lattice(3.0, 0.0, 7.5, |x, y| tall(x, y).max(short(x, y)));

        let mut segmenter = CrownSegmenter::new(lattice_params());
        let result = segmenter.run(&points).unwrap();
        assert!(result.tree_count() >= 2);

        let first = &result.trees[0];
        let second = &result.trees[1];
        assert_eq!(first.id, 1);
        assert_eq!(first.apex.index, index_of(&points, 0.0, 0.0));
        assert_eq!(second.id, 2);
        assert_eq!(second.apex.index, index_of(&points, 6.0, 0.0));
        assert_eq!(result.tree_ids[index_of(&points, 0.0, 0.0)], Some(1));
        assert_eq!(result.tree_ids[index_of(&points, 1.5, 0.0)], Some(1));
        assert_eq!(result.tree_ids[index_of(&points, 6.0, 0.0)], Some(2));
        assert_eq!(result.tree_ids[index_of(&points, 5.0, 0.0)], Some(2));

        let mut disputed = 0;
        for (i, p) in points.iter().enumerate() {
            let p = Point2D::new(p.x, p.y);
            if point_in_poly(&p, &first.polygon) {
                assert_eq!(result.tree_ids[i], Some(1));
                if point_in_poly(&p, &second.polygon) {
                    disputed += 1;
                }
            }
        }
        assert!(disputed > 0);
    }

    #[test]
    fn test_ids_and_progress() {
        let mut points = lattice(0.0, 0.0, 6.0, cone(0.0, 0.0, 10.0, 2.0));
        points.extend(lattice(20.0, 0.0, 6.0, cone(20.0, 0.0, 8.0, 2.0)));

        let mut reports: Vec<IterationReport> = vec![];
        let result = {
            let mut segmenter =
                CrownSegmenter::new(lattice_params()).on_progress(|r| reports.push(r.clone()));
            segmenter.run(&points).unwrap()
        };
        assert_eq!(reports.len(), result.iterations);
        let mut previous = usize::MAX;
        for r in &reports {
            assert!(r.removed > 0);
            assert!(r.remaining < previous);
            previous = r.remaining;
        }
        assert_eq!(previous, 0);

        let accepted: Vec<usize> = reports.iter().filter_map(|r| r.tree_id).collect();
        let expected: Vec<usize> = (1..=result.tree_count()).collect();
        assert_eq!(accepted, expected);
        for id in result.tree_ids.iter().flatten() {
            assert!(*id >= 1 && *id <= result.tree_count());
        }
        let total: usize = result.trees.iter().map(|t| t.num_points).sum();
        assert_eq!(total, result.num_assigned());
    }

    #[test]
    fn test_single_point() {
        let points = vec![Point3D::new(1.0, 1.0, 10.0)];
        let mut iterations = 0;
        let result = CrownSegmenter::new(HamrazParameters::default())
            .on_progress(|_| iterations += 1)
            .run(&points)
            .unwrap();
        assert_eq!(result.iterations, 1);
        assert_eq!(result.tree_count(), 0);
        assert_eq!(result.tree_ids, vec![None]);
        assert!(result.completed);
        assert_eq!(iterations, 1);
    }

    #[test]
    fn test_empty_input() {
        let points: Vec<Point3D> = vec![];
        let result = CrownSegmenter::new(HamrazParameters::default())
            .run(&points)
            .unwrap();
        assert!(result.tree_ids.is_empty());
        assert_eq!(result.iterations, 0);

        // nothing above the height threshold
        let low: Vec<[f64; 3]> = vec![[0.0, 0.0, 1.0], [3.0, 0.0, 2.0], [6.0, 0.0, 5.0]];
        let result = CrownSegmenter::new(HamrazParameters::default())
            .run(&low)
            .unwrap();
        assert_eq!(result.tree_ids, vec![None; 3]);
        assert_eq!(result.tree_count(), 0);
        assert!(result.completed);
    }

    #[test]
    fn test_invalid_input() {
        let mut params = HamrazParameters::default();
        params.mdcw = -1.0;
        let points = vec![Point3D::new(0.0, 0.0, 10.0)];
        let e = CrownSegmenter::new(params).run(&points).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::InvalidInput);

        let points = vec![Point3D::new(0.0, f64::INFINITY, 10.0)];
        let e = CrownSegmenter::new(HamrazParameters::default())
            .run(&points)
            .unwrap_err();
        assert_eq!(e.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_iteration_cap() {
        let points = lattice(0.0, 0.0, 6.0, cone(0.0, 0.0, 10.0, 2.0));
        let mut params = lattice_params();
        params.max_iterations = Some(1);
        let result = CrownSegmenter::new(params).run(&points).unwrap();
        assert_eq!(result.iterations, 1);
        assert!(!result.completed);
        assert_eq!(result.tree_count(), 1);
        assert_eq!(result.tree_ids[index_of(&points, 0.0, 0.0)], Some(1));
    }

    #[test]
    fn test_claim_keeps_first_writer() {
        let mut ids = vec![None; 3];
        assert!(claim(&mut ids, 1, 1));
        assert!(!claim(&mut ids, 1, 2));
        assert!(claim(&mut ids, 2, 2));
        assert_eq!(ids, vec![None, Some(1), Some(2)]);
    }
}
