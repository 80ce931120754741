//! Append-only RRT node storage.
//!
//! Nodes live in a flat vector and refer to their parent by index. Indices
//! stay stable for the whole planning run; the only removal allowed is
//! rolling back the most recently appended node after its edge turns out to
//! be blocked.

use crate::geometry::Point2D;

/// A node of the exploration tree.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TreeNode {
    pub point: Point2D,
    /// Index of the parent node; `None` only for the root.
    pub parent: Option<usize>,
}

/// Tree state for one planning run.
///
/// Invariant: when `goal_node` is `Some(i)`, node `i` sits exactly on the goal.
#[derive(Clone, Debug)]
pub struct RrtTree {
    nodes: Vec<TreeNode>,
    goal: Point2D,
    goal_node: Option<usize>,
}

impl RrtTree {
    /// Create a tree holding only the root at `start`.
    pub fn new(start: Point2D, goal: Point2D) -> Self {
        Self {
            nodes: vec![TreeNode {
                point: start,
                parent: None,
            }],
            goal,
            goal_node: (start == goal).then_some(0),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: the root is never removed.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> Option<&TreeNode> {
        self.nodes.get(index)
    }

    pub fn goal(&self) -> Point2D {
        self.goal
    }

    pub fn goal_reached(&self) -> bool {
        self.goal_node.is_some()
    }

    pub fn goal_node(&self) -> Option<usize> {
        self.goal_node
    }

    /// Append a provisional node with no parent yet. Returns its index.
    pub fn push(&mut self, point: Point2D) -> usize {
        self.nodes.push(TreeNode {
            point,
            parent: None,
        });
        self.nodes.len() - 1
    }

    /// Remove the most recently appended node.
    ///
    /// Clears the goal marker if it referred to the removed node. The root
    /// cannot be rolled back.
    pub fn rollback_last(&mut self) -> Option<TreeNode> {
        if self.nodes.len() <= 1 {
            return None;
        }
        let removed_index = self.nodes.len() - 1;
        if self.goal_node == Some(removed_index) {
            self.goal_node = None;
        }
        self.nodes.pop()
    }

    /// Nearest node among those with an index lower than `index`.
    ///
    /// Exhaustive linear scan; ties go to the lowest index.
    pub fn nearest_before(&self, index: usize) -> Option<usize> {
        let target = self.nodes.get(index)?.point;
        Self::nearest_in(&self.nodes[..index], target)
    }

    fn nearest_in(nodes: &[TreeNode], target: Point2D) -> Option<usize> {
        let mut best: Option<(usize, f32)> = None;
        for (i, node) in nodes.iter().enumerate() {
            let d = node.point.distance(&target);
            match best {
                Some((_, best_d)) if d >= best_d => {}
                _ => best = Some((i, d)),
            }
        }
        best.map(|(i, _)| i)
    }

    /// Attach node `index` to `near`, limiting the edge to `step_size` and
    /// snapping onto the goal when the resulting node lands within
    /// `step_size` of it.
    ///
    /// Snapping looks only at the post-step position.
    pub fn steer(&mut self, near: usize, index: usize, step_size: f32) {
        let near_point = self.nodes[near].point;
        let node = &mut self.nodes[index];

        if near_point.distance(&node.point) > step_size {
            let heading = near_point.heading_to(&node.point);
            node.point = near_point.advance(heading, step_size);
        }
        node.parent = Some(near);

        if node.point.distance(&self.goal) < step_size {
            node.point = self.goal;
            self.goal_node = Some(index);
        }
    }

    /// Walk parent links from the goal node back to the root.
    ///
    /// Returns waypoints in start-to-goal order, or `None` if the goal has
    /// not been reached.
    pub fn path_to_goal(&self) -> Option<Vec<Point2D>> {
        let mut current = self.goal_node?;
        let mut path = Vec::new();
        loop {
            let node = self.nodes.get(current)?;
            path.push(node.point);
            // A valid tree never has more hops than nodes
            if path.len() > self.nodes.len() {
                return None;
            }
            match node.parent {
                Some(parent) => current = parent,
                None => break,
            }
        }
        path.reverse();
        Some(path)
    }
}
