//! Route planning over the arena.
//!
//! This module provides:
//! - Append-only RRT tree storage with nearest-neighbor search and rollback
//! - An incremental, goal-biased RRT planner with pluggable growth notifications

mod rrt;
mod tree;

pub use rrt::{
    NullObserver, PlanError, PlannedPath, PlannerConfig, PlanningProblem, PlanningRun, Rejection,
    RrtPlanner, TreeObserver,
};
pub use tree::{RrtTree, TreeNode};
