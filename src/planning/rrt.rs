//! Incremental RRT planner.
//!
//! Grows a tree from the start by sampling the arena, with every
//! `goal_bias_interval`-th attempt aimed straight at the goal. Returns the
//! first feasible route found, not a shortest one.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::geometry::{DEFAULT_EDGE_SAMPLES, Obstacle, Point2D, is_free, segment_collides};

use super::tree::{RrtTree, TreeNode};

/// Configuration for the RRT planner.
#[derive(Clone, Debug)]
pub struct PlannerConfig {
    /// Maximum expansion attempts before giving up
    pub max_iterations: usize,
    /// Maximum edge length (cm)
    pub step_size: f32,
    /// Every n-th attempt samples the goal itself (0 disables goal bias)
    pub goal_bias_interval: usize,
    /// Intervals sampled along each edge for the collision check
    pub edge_samples: usize,
    /// RNG seed; 0 draws a fresh seed from the OS
    pub seed: u64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_iterations: 2000,
            step_size: 35.0,
            goal_bias_interval: 10,
            edge_samples: DEFAULT_EDGE_SAMPLES,
            seed: 0,
        }
    }
}

/// The arena and endpoints for one planning run.
#[derive(Clone, Debug)]
pub struct PlanningProblem {
    pub start: Point2D,
    pub goal: Point2D,
    pub arena_width: f32,
    pub arena_height: f32,
    pub obstacles: Vec<Obstacle>,
}

impl PlanningProblem {
    /// Check that the arena is usable and both endpoints are reachable cells.
    pub fn validate(&self) -> Result<(), PlanError> {
        if !(self.arena_width > 0.0 && self.arena_height > 0.0) {
            return Err(PlanError::InvalidProblem(format!(
                "arena must have positive size, got {}x{}",
                self.arena_width, self.arena_height
            )));
        }
        for (name, p) in [("start", self.start), ("goal", self.goal)] {
            if !self.in_arena(p) {
                return Err(PlanError::InvalidProblem(format!(
                    "{} ({:.1}, {:.1}) is outside the arena",
                    name, p.x, p.y
                )));
            }
            if !is_free(p, &self.obstacles) {
                return Err(PlanError::InvalidProblem(format!(
                    "{} ({:.1}, {:.1}) is inside an obstacle",
                    name, p.x, p.y
                )));
            }
        }
        Ok(())
    }

    fn in_arena(&self, p: Point2D) -> bool {
        p.x >= 0.0 && p.x <= self.arena_width && p.y >= 0.0 && p.y <= self.arena_height
    }
}

/// Planning failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanError {
    #[error("Invalid planning problem: {0}")]
    InvalidProblem(String),

    #[error("No path found within {iterations} iterations ({nodes} nodes in tree)")]
    Exhausted { iterations: usize, nodes: usize },
}

/// Why an expansion attempt added no node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rejection {
    /// The sampled candidate lies inside an obstacle
    InsideObstacle,
    /// The edge from the nearest node crosses an obstacle
    EdgeBlocked,
}

/// Notification sink for tree growth, used by renderers.
///
/// Purely informational: the planner never reads anything back.
pub trait TreeObserver {
    fn on_node_added(&mut self, _index: usize, _node: &TreeNode, _parent: Point2D) {}

    fn on_candidate_rejected(&mut self, _candidate: Point2D, _reason: Rejection) {}

    fn on_path_found(&mut self, _path: &PlannedPath) {}
}

/// Observer that ignores every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullObserver;

impl TreeObserver for NullObserver {}

/// Result of a successful planning run.
#[derive(Clone, Debug, PartialEq)]
pub struct PlannedPath {
    /// Waypoints from start to goal
    pub waypoints: Vec<Point2D>,
    /// Iteration on which the goal was reached (1-based)
    pub iterations: usize,
    /// Number of nodes in the tree when the goal was reached
    pub tree_size: usize,
}

impl PlannedPath {
    /// Total polyline length in centimeters.
    pub fn length(&self) -> f32 {
        self.waypoints
            .windows(2)
            .map(|w| w[0].distance(&w[1]))
            .sum()
    }
}

/// Final tree plus outcome, for callers that want to draw the tree.
#[derive(Clone, Debug)]
pub struct PlanningRun {
    pub tree: RrtTree,
    pub result: Result<PlannedPath, PlanError>,
}

/// RRT path planner.
pub struct RrtPlanner {
    config: PlannerConfig,
}

impl RrtPlanner {
    /// Create a new RRT planner with configuration.
    pub fn new(config: PlannerConfig) -> Self {
        Self { config }
    }

    /// Create a new RRT planner with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(PlannerConfig::default())
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Plan a route, seeding the sampler from the configured seed.
    pub fn plan(
        &self,
        problem: &PlanningProblem,
        observer: &mut dyn TreeObserver,
    ) -> Result<PlannedPath, PlanError> {
        self.plan_tree(problem, observer).result
    }

    /// Like [`plan`](Self::plan) but also hands back the final tree.
    pub fn plan_tree(&self, problem: &PlanningProblem, observer: &mut dyn TreeObserver) -> PlanningRun {
        let mut rng = if self.config.seed == 0 {
            StdRng::from_os_rng()
        } else {
            StdRng::seed_from_u64(self.config.seed)
        };
        self.plan_tree_with_rng(problem, observer, &mut rng)
    }

    /// Plan with a caller-supplied random source.
    pub fn plan_with_rng<R: Rng>(
        &self,
        problem: &PlanningProblem,
        observer: &mut dyn TreeObserver,
        rng: &mut R,
    ) -> Result<PlannedPath, PlanError> {
        self.plan_tree_with_rng(problem, observer, rng).result
    }

    /// Core RRT loop.
    pub fn plan_tree_with_rng<R: Rng>(
        &self,
        problem: &PlanningProblem,
        observer: &mut dyn TreeObserver,
        rng: &mut R,
    ) -> PlanningRun {
        let mut tree = RrtTree::new(problem.start, problem.goal);

        if let Err(e) = self.validate(problem) {
            tracing::warn!("{}", e);
            return PlanningRun {
                tree,
                result: Err(e),
            };
        }

        if tree.goal_reached() {
            let path = self.finish(&tree, 0, observer);
            return PlanningRun { tree, result: path };
        }

        for iteration in 0..self.config.max_iterations {
            let goal_biased = self.config.goal_bias_interval > 0
                && iteration % self.config.goal_bias_interval == 0;

            let candidate = if goal_biased {
                problem.goal
            } else {
                Point2D::new(
                    rng.random_range(0.0..problem.arena_width),
                    rng.random_range(0.0..problem.arena_height),
                )
            };

            self.expand(&mut tree, problem, candidate, observer);

            if tree.goal_reached() {
                let result = self.finish(&tree, iteration + 1, observer);
                return PlanningRun { tree, result };
            }
        }

        let err = PlanError::Exhausted {
            iterations: self.config.max_iterations,
            nodes: tree.len(),
        };
        tracing::warn!("{}", err);
        PlanningRun {
            tree,
            result: Err(err),
        }
    }

    fn validate(&self, problem: &PlanningProblem) -> Result<(), PlanError> {
        if !(self.config.step_size > 0.0) {
            return Err(PlanError::InvalidProblem(format!(
                "step size must be positive, got {}",
                self.config.step_size
            )));
        }
        problem.validate()
    }

    /// One expansion attempt toward `candidate`.
    ///
    /// Returns the index of the accepted node, if any.
    fn expand(
        &self,
        tree: &mut RrtTree,
        problem: &PlanningProblem,
        candidate: Point2D,
        observer: &mut dyn TreeObserver,
    ) -> Option<usize> {
        if !is_free(candidate, &problem.obstacles) {
            tracing::trace!(
                "Candidate ({:.1}, {:.1}) inside obstacle",
                candidate.x,
                candidate.y
            );
            observer.on_candidate_rejected(candidate, Rejection::InsideObstacle);
            return None;
        }

        let index = tree.push(candidate);
        let near = tree.nearest_before(index)?;
        tree.steer(near, index, self.config.step_size);

        let near_point = tree.nodes()[near].point;
        let node = tree.nodes()[index];

        if segment_collides(
            near_point,
            node.point,
            &problem.obstacles,
            self.config.edge_samples,
        ) {
            tree.rollback_last();
            tracing::trace!(
                "Edge ({:.1}, {:.1}) -> ({:.1}, {:.1}) blocked",
                near_point.x,
                near_point.y,
                node.point.x,
                node.point.y
            );
            observer.on_candidate_rejected(candidate, Rejection::EdgeBlocked);
            return None;
        }

        observer.on_node_added(index, &node, near_point);
        Some(index)
    }

    fn finish(
        &self,
        tree: &RrtTree,
        iterations: usize,
        observer: &mut dyn TreeObserver,
    ) -> Result<PlannedPath, PlanError> {
        let waypoints = tree.path_to_goal().ok_or(PlanError::Exhausted {
            iterations,
            nodes: tree.len(),
        })?;

        let path = PlannedPath {
            waypoints,
            iterations,
            tree_size: tree.len(),
        };

        tracing::info!(
            "Path found at iteration {}: {} waypoints, {:.1}cm, {} nodes in tree",
            iterations,
            path.waypoints.len(),
            path.length(),
            path.tree_size
        );
        observer.on_path_found(&path);
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        added: Vec<(usize, Option<usize>)>,
        rejected: Vec<Rejection>,
        paths: usize,
    }

    impl TreeObserver for Recorder {
        fn on_node_added(&mut self, index: usize, node: &TreeNode, _parent: Point2D) {
            self.added.push((index, node.parent));
        }

        fn on_candidate_rejected(&mut self, _candidate: Point2D, reason: Rejection) {
            self.rejected.push(reason);
        }

        fn on_path_found(&mut self, _path: &PlannedPath) {
            self.paths += 1;
        }
    }

    fn open_arena(start: Point2D, goal: Point2D) -> PlanningProblem {
        PlanningProblem {
            start,
            goal,
            arena_width: 200.0,
            arena_height: 200.0,
            obstacles: Vec::new(),
        }
    }

    fn seeded(seed: u64) -> PlannerConfig {
        PlannerConfig {
            seed,
            ..Default::default()
        }
    }

    #[test]
    fn test_goal_within_one_step_found_immediately() {
        let planner = RrtPlanner::new(seeded(1));
        let problem = open_arena(Point2D::new(20.0, 20.0), Point2D::new(40.0, 40.0));
        let mut rec = Recorder::default();

        let path = planner.plan(&problem, &mut rec).unwrap();
        assert_eq!(path.waypoints, vec![problem.start, problem.goal]);
        assert_eq!(path.iterations, 1);
        assert_eq!(rec.added, vec![(1, Some(0))]);
        assert_eq!(rec.paths, 1);
    }

    #[test]
    fn test_open_arena_path_reaches_goal() {
        let planner = RrtPlanner::new(seeded(7));
        let problem = open_arena(Point2D::new(20.0, 20.0), Point2D::new(180.0, 180.0));

        let path = planner.plan(&problem, &mut NullObserver).unwrap();
        assert_eq!(path.waypoints.first(), Some(&problem.start));
        assert_eq!(path.waypoints.last(), Some(&problem.goal));
        // The snapped last edge may reach up to two steps
        let last = path.waypoints.len() - 2;
        for (i, w) in path.waypoints.windows(2).enumerate() {
            let limit = if i == last { 70.0 } else { 35.0 + 1e-3 };
            assert!(w[0].distance(&w[1]) <= limit);
        }
    }

    #[test]
    fn test_start_inside_obstacle_is_invalid() {
        let planner = RrtPlanner::new(seeded(1));
        let mut problem = open_arena(Point2D::new(40.0, 60.0), Point2D::new(133.0, 133.0));
        problem.obstacles.push(Obstacle::new(32.0, 50.0, 37.0, 25.0));

        let result = planner.plan(&problem, &mut NullObserver);
        assert!(matches!(result, Err(PlanError::InvalidProblem(_))));
    }

    #[test]
    fn test_non_positive_step_is_invalid() {
        let planner = RrtPlanner::new(PlannerConfig {
            step_size: 0.0,
            seed: 1,
            ..Default::default()
        });
        let problem = open_arena(Point2D::new(20.0, 20.0), Point2D::new(133.0, 133.0));
        assert!(matches!(
            planner.plan(&problem, &mut NullObserver),
            Err(PlanError::InvalidProblem(_))
        ));
    }

    #[test]
    fn test_walled_goal_exhausts() {
        // Goal boxed in by four walls with no gap
        let obstacles = vec![
            Obstacle::new(120.0, 120.0, 30.0, 5.0),
            Obstacle::new(120.0, 145.0, 30.0, 5.0),
            Obstacle::new(120.0, 120.0, 5.0, 30.0),
            Obstacle::new(145.0, 120.0, 5.0, 30.0),
        ];
        let problem = PlanningProblem {
            start: Point2D::new(20.0, 20.0),
            goal: Point2D::new(135.0, 135.0),
            arena_width: 200.0,
            arena_height: 200.0,
            obstacles,
        };
        let planner = RrtPlanner::new(PlannerConfig {
            max_iterations: 300,
            seed: 3,
            ..Default::default()
        });
        let mut rec = Recorder::default();

        let result = planner.plan(&problem, &mut rec);
        match result {
            Err(PlanError::Exhausted { iterations, nodes }) => {
                assert_eq!(iterations, 300);
                assert_eq!(nodes, rec.added.len() + 1);
            }
            other => panic!("expected exhaustion, got {:?}", other),
        }
        assert!(rec.rejected.contains(&Rejection::EdgeBlocked));
        assert_eq!(rec.paths, 0);
    }

    #[test]
    fn test_zero_iterations_exhausts_without_growth() {
        let planner = RrtPlanner::new(PlannerConfig {
            max_iterations: 0,
            seed: 1,
            ..Default::default()
        });
        let problem = open_arena(Point2D::new(20.0, 20.0), Point2D::new(133.0, 133.0));
        assert_eq!(
            planner.plan(&problem, &mut NullObserver),
            Err(PlanError::Exhausted {
                iterations: 0,
                nodes: 1
            })
        );
    }
}
