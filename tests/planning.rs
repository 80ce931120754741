//! Planner integration tests over the demonstration arenas

mod common;

use approx::assert_abs_diff_eq;
use common::{RecordingObserver, single_box_arena, two_box_arena};
use marga::geometry::{DEFAULT_EDGE_SAMPLES, Point2D, is_free, segment_collides};
use marga::planning::{
    NullObserver, PlanError, PlannedPath, PlannerConfig, PlanningProblem, Rejection, RrtPlanner,
};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn seeded_planner(seed: u64) -> RrtPlanner {
    RrtPlanner::new(PlannerConfig {
        seed,
        ..PlannerConfig::default()
    })
}

/// Every property a returned path must have, whatever the seed.
fn assert_valid_path(path: &PlannedPath, problem: &PlanningProblem, step_size: f32) {
    let waypoints = &path.waypoints;
    assert!(waypoints.len() >= 2);
    assert_eq!(waypoints[0], problem.start);
    assert_eq!(*waypoints.last().unwrap(), problem.goal);

    // Only the snapped final edge may exceed one step
    let last = waypoints.len() - 2;
    for (i, w) in waypoints.windows(2).enumerate() {
        let limit = if i == last { 2.0 * step_size } else { step_size + 1e-3 };
        assert!(
            w[0].distance(&w[1]) <= limit,
            "edge {:?} -> {:?} too long",
            w[0],
            w[1]
        );
        assert!(
            !segment_collides(w[0], w[1], &problem.obstacles, DEFAULT_EDGE_SAMPLES),
            "edge {:?} -> {:?} crosses an obstacle",
            w[0],
            w[1]
        );
    }
    for p in waypoints {
        assert!(is_free(*p, &problem.obstacles));
    }
}

#[test]
fn test_single_box_arena_path_is_valid_or_exhausted() {
    let problem = single_box_arena();
    for seed in 1..=20 {
        match seeded_planner(seed).plan(&problem, &mut NullObserver) {
            Ok(path) => {
                assert_valid_path(&path, &problem, 35.0);
                assert!(path.iterations <= 2000);
            }
            Err(PlanError::Exhausted { iterations, .. }) => assert_eq!(iterations, 2000),
            Err(e) => panic!("unexpected error: {}", e),
        }
    }
}

#[test]
fn test_two_box_arena_path_is_valid_or_exhausted() {
    let problem = two_box_arena();
    for seed in 1..=20 {
        match seeded_planner(seed).plan(&problem, &mut NullObserver) {
            Ok(path) => assert_valid_path(&path, &problem, 35.0),
            Err(e) => assert!(matches!(e, PlanError::Exhausted { .. })),
        }
    }
}

#[test]
fn test_same_seed_same_path() {
    let problem = two_box_arena();
    let a = seeded_planner(42).plan(&problem, &mut NullObserver);
    let b = seeded_planner(42).plan(&problem, &mut NullObserver);
    assert_eq!(a, b);
}

#[test]
fn test_caller_rng_is_deterministic() {
    let problem = single_box_arena();
    let planner = RrtPlanner::with_defaults();

    let mut rng_a = StdRng::seed_from_u64(9);
    let mut rng_b = StdRng::seed_from_u64(9);
    let a = planner.plan_with_rng(&problem, &mut NullObserver, &mut rng_a);
    let b = planner.plan_with_rng(&problem, &mut NullObserver, &mut rng_b);
    assert_eq!(a, b);
}

#[test]
fn test_observer_sees_consistent_growth() {
    let problem = two_box_arena();
    let mut observer = RecordingObserver::default();
    let run = seeded_planner(7).plan_tree(&problem, &mut observer);

    // Root plus one node per accepted expansion
    assert_eq!(run.tree.len(), observer.added.len() + 1);

    // Indices are handed out densely and never reused
    for (i, (index, node, parent)) in observer.added.iter().enumerate() {
        assert_eq!(*index, i + 1);
        let parent_index = node.parent.unwrap();
        assert!(parent_index < *index);
        assert_eq!(run.tree.nodes()[parent_index].point, *parent);
        if node.point != problem.goal {
            assert!(parent.distance(&node.point) <= 35.0 + 1e-3);
        }
    }

    // Rejected candidates never made it into the tree
    for (candidate, reason) in &observer.rejected {
        if *reason == Rejection::InsideObstacle {
            assert!(!is_free(*candidate, &problem.obstacles));
        }
    }

    match run.result {
        Ok(path) => assert_eq!(observer.found, Some(path)),
        Err(_) => assert!(observer.found.is_none()),
    }
}

#[test]
fn test_tree_edges_are_collision_free() {
    let problem = two_box_arena();
    let run = seeded_planner(3).plan_tree(&problem, &mut NullObserver);

    for node in &run.tree.nodes()[1..] {
        let parent = run.tree.nodes()[node.parent.unwrap()].point;
        assert!(!segment_collides(
            parent,
            node.point,
            &problem.obstacles,
            DEFAULT_EDGE_SAMPLES
        ));
    }
}

#[test]
fn test_goal_within_one_step_is_reached_on_first_iteration() {
    let problem = PlanningProblem {
        start: Point2D::new(20.0, 20.0),
        goal: Point2D::new(40.0, 20.0),
        arena_width: 200.0,
        arena_height: 200.0,
        obstacles: vec![],
    };
    let path = seeded_planner(1).plan(&problem, &mut NullObserver).unwrap();

    // First attempt is goal-biased and lands inside the snap radius
    assert_eq!(path.iterations, 1);
    assert_eq!(path.waypoints, vec![problem.start, problem.goal]);
    assert_abs_diff_eq!(path.length(), 20.0, epsilon = 1e-4);
}

#[test]
fn test_goal_bias_grows_straight_line_in_open_arena() {
    let problem = PlanningProblem {
        start: Point2D::new(0.0, 0.0),
        goal: Point2D::new(0.0, 150.0),
        arena_width: 200.0,
        arena_height: 200.0,
        obstacles: vec![],
    };
    let planner = RrtPlanner::new(PlannerConfig {
        goal_bias_interval: 1,
        seed: 5,
        ..PlannerConfig::default()
    });
    let path = planner.plan(&problem, &mut NullObserver).unwrap();

    // Steps of 35 along x = 0; the step reaching y = 140 snaps onto the goal
    assert_eq!(path.iterations, 4);
    assert_eq!(path.waypoints.len(), 5);
    for p in &path.waypoints {
        assert_abs_diff_eq!(p.x, 0.0, epsilon = 1e-3);
    }
    assert_abs_diff_eq!(path.waypoints[3].y, 105.0, epsilon = 1e-3);
    assert_eq!(path.waypoints[4], problem.goal);
}

#[test]
fn test_blocked_goal_exhausts_with_rejections() {
    // Wall spanning the whole arena between start and goal
    let problem = PlanningProblem {
        start: Point2D::new(100.0, 20.0),
        goal: Point2D::new(100.0, 180.0),
        arena_width: 200.0,
        arena_height: 200.0,
        obstacles: vec![marga::Obstacle::new(0.0, 90.0, 200.0, 20.0)],
    };
    let planner = RrtPlanner::new(PlannerConfig {
        max_iterations: 300,
        seed: 11,
        ..PlannerConfig::default()
    });
    let mut observer = RecordingObserver::default();
    let run = planner.plan_tree(&problem, &mut observer);

    assert_eq!(
        run.result,
        Err(PlanError::Exhausted {
            iterations: 300,
            nodes: run.tree.len()
        })
    );
    assert!(observer.found.is_none());
    assert!(
        observer
            .rejected
            .iter()
            .any(|(_, r)| *r == Rejection::EdgeBlocked)
    );
    assert!(run.tree.nodes().iter().all(|n| n.point.y < 90.0));
}

#[test]
fn test_invalid_problems_are_reported() {
    let mut problem = single_box_arena();
    problem.start = Point2D::new(40.0, 60.0);
    assert!(matches!(
        RrtPlanner::with_defaults().plan(&problem, &mut NullObserver),
        Err(PlanError::InvalidProblem(_))
    ));

    let mut problem = single_box_arena();
    problem.goal = Point2D::new(250.0, 10.0);
    assert!(matches!(
        RrtPlanner::with_defaults().plan(&problem, &mut NullObserver),
        Err(PlanError::InvalidProblem(_))
    ));
}
