//! Continuous 1D transfer function curves.
//!
//! Both curves are piecewise linear between their nodes and clamp to the
//! end nodes outside the node range.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use volstage_core::{ModTime, TimeStamp};

/// How a multi-component array is reduced before color mapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VectorMode {
    /// Use one component of each tuple.
    #[default]
    Component,
    /// Use the Euclidean norm of each tuple.
    Magnitude,
}

/// Returns `n` evenly spaced positions over `[lo, hi]`.
///
/// The first and last positions are exactly `lo` and `hi`; a single sample
/// sits at the midpoint.
pub fn sample_positions(lo: f64, hi: f64, n: usize) -> impl Iterator<Item = f64> {
    #[allow(clippy::cast_precision_loss)]
    let last = n.saturating_sub(1) as f64;
    (0..n).map(move |i| {
        if n == 1 {
            0.5 * (lo + hi)
        } else {
            #[allow(clippy::cast_precision_loss)]
            let t = i as f64 / last;
            lo * (1.0 - t) + hi * t
        }
    })
}

/// Finds the segment around `x` and the interpolation weight inside it.
fn locate<T>(nodes: &[(f64, T)], x: f64) -> Option<(usize, usize, f64)> {
    let first = nodes.first()?;
    let last = nodes.len() - 1;
    if x.is_nan() || x <= first.0 {
        return Some((0, 0, 0.0));
    }
    if x >= nodes[last].0 {
        return Some((last, last, 0.0));
    }
    let upper = nodes.partition_point(|(nx, _)| *nx <= x);
    let lower = upper - 1;
    let span = nodes[upper].0 - nodes[lower].0;
    let t = if span > 0.0 {
        (x - nodes[lower].0) / span
    } else {
        0.0
    };
    Some((lower, upper, t))
}

fn insert_sorted<T>(nodes: &mut Vec<(f64, T)>, x: f64, value: T) {
    match nodes.binary_search_by(|(nx, _)| nx.total_cmp(&x)) {
        Ok(idx) => nodes[idx].1 = value,
        Err(idx) => nodes.insert(idx, (x, value)),
    }
}

fn node_range<T>(nodes: &[(f64, T)]) -> (f64, f64) {
    match (nodes.first(), nodes.last()) {
        (Some(first), Some(last)) => (first.0, last.0),
        _ => (0.0, 0.0),
    }
}

/// Maps scalar values to RGB colors.
#[derive(Debug, Clone)]
pub struct ColorTransferFunction {
    nodes: Vec<(f64, Vec3)>,
    vector_mode: VectorMode,
    vector_component: usize,
    mtime: TimeStamp,
}

impl Default for ColorTransferFunction {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            vector_mode: VectorMode::Component,
            vector_component: 0,
            mtime: TimeStamp::new(),
        }
    }
}

impl ColorTransferFunction {
    /// Creates an empty color ramp.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node, replacing an existing node at the same position.
    pub fn add_rgb_point(&mut self, x: f64, color: Vec3) -> &mut Self {
        insert_sorted(&mut self.nodes, x, color);
        self.mtime.modified();
        self
    }

    /// Removes the node at `x`. Returns whether one was removed.
    pub fn remove_point(&mut self, x: f64) -> bool {
        let before = self.nodes.len();
        self.nodes.retain(|(nx, _)| *nx != x);
        let removed = self.nodes.len() != before;
        if removed {
            self.mtime.modified();
        }
        removed
    }

    /// Removes every node.
    pub fn remove_all_points(&mut self) {
        self.nodes.clear();
        self.mtime.modified();
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn num_points(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the declared domain: first and last node position.
    ///
    /// A ramp with fewer than two distinct nodes has `hi <= lo`.
    #[must_use]
    pub fn range(&self) -> (f64, f64) {
        node_range(&self.nodes)
    }

    /// Evaluates the ramp at `x`.
    #[must_use]
    pub fn color(&self, x: f64) -> Vec3 {
        match locate(&self.nodes, x) {
            #[allow(clippy::cast_possible_truncation)]
            Some((lower, upper, t)) => self.nodes[lower].1.lerp(self.nodes[upper].1, t as f32),
            None => Vec3::ZERO,
        }
    }

    /// Samples `n` colors evenly over `[lo, hi]`.
    #[must_use]
    pub fn table(&self, lo: f64, hi: f64, n: usize) -> Vec<Vec3> {
        sample_positions(lo, hi, n).map(|x| self.color(x)).collect()
    }

    /// Returns how vector data is reduced.
    #[must_use]
    pub fn vector_mode(&self) -> VectorMode {
        self.vector_mode
    }

    /// Sets how vector data is reduced.
    pub fn set_vector_mode(&mut self, mode: VectorMode) -> &mut Self {
        self.vector_mode = mode;
        self.mtime.modified();
        self
    }

    /// Returns the component used in [`VectorMode::Component`].
    #[must_use]
    pub fn vector_component(&self) -> usize {
        self.vector_component
    }

    /// Sets the component used in [`VectorMode::Component`].
    pub fn set_vector_component(&mut self, component: usize) -> &mut Self {
        self.vector_component = component;
        self.mtime.modified();
        self
    }

    /// Returns the last modification time.
    #[must_use]
    pub fn mtime(&self) -> ModTime {
        self.mtime.get()
    }
}

/// Maps scalar values to scalars, typically opacity in `[0, 1]`.
#[derive(Debug, Clone)]
pub struct PiecewiseFunction {
    nodes: Vec<(f64, f64)>,
    mtime: TimeStamp,
}

impl Default for PiecewiseFunction {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            mtime: TimeStamp::new(),
        }
    }
}

impl PiecewiseFunction {
    /// Creates an empty function.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node, replacing an existing node at the same position.
    pub fn add_point(&mut self, x: f64, y: f64) -> &mut Self {
        insert_sorted(&mut self.nodes, x, y);
        self.mtime.modified();
        self
    }

    /// Removes the node at `x`. Returns whether one was removed.
    pub fn remove_point(&mut self, x: f64) -> bool {
        let before = self.nodes.len();
        self.nodes.retain(|(nx, _)| *nx != x);
        let removed = self.nodes.len() != before;
        if removed {
            self.mtime.modified();
        }
        removed
    }

    /// Removes every node.
    pub fn remove_all_points(&mut self) {
        self.nodes.clear();
        self.mtime.modified();
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn num_points(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the first and last node position.
    #[must_use]
    pub fn range(&self) -> (f64, f64) {
        node_range(&self.nodes)
    }

    /// Evaluates the function at `x`.
    #[must_use]
    pub fn value(&self, x: f64) -> f64 {
        match locate(&self.nodes, x) {
            Some((lower, upper, t)) => {
                let (a, b) = (self.nodes[lower].1, self.nodes[upper].1);
                a + (b - a) * t
            }
            None => 0.0,
        }
    }

    /// Samples `n` values evenly over `[lo, hi]`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn table(&self, lo: f64, hi: f64, n: usize) -> Vec<f32> {
        sample_positions(lo, hi, n)
            .map(|x| self.value(x) as f32)
            .collect()
    }

    /// Returns the last modification time.
    #[must_use]
    pub fn mtime(&self) -> ModTime {
        self.mtime.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blue_to_red() -> ColorTransferFunction {
        let mut ctf = ColorTransferFunction::new();
        ctf.add_rgb_point(0.0, Vec3::new(0.0, 0.0, 1.0))
            .add_rgb_point(1.0, Vec3::new(1.0, 0.0, 0.0));
        ctf
    }

    #[test]
    fn test_sample_positions_hit_endpoints() {
        let xs: Vec<f64> = sample_positions(0.1, 0.7, 4).collect();
        assert_eq!(xs.len(), 4);
        assert_eq!(xs[0], 0.1);
        assert_eq!(xs[3], 0.7);
        assert!((xs[1] - 0.3).abs() < 1e-12);

        let single: Vec<f64> = sample_positions(2.0, 4.0, 1).collect();
        assert_eq!(single, vec![3.0]);
        assert_eq!(sample_positions(0.0, 1.0, 0).count(), 0);
    }

    #[test]
    fn test_color_interpolation() {
        let ctf = blue_to_red();
        let mid = ctf.color(0.5);
        assert!((mid - Vec3::new(0.5, 0.0, 0.5)).length() < 1e-6);
    }

    #[test]
    fn test_color_clamps_outside_range() {
        let ctf = blue_to_red();
        assert_eq!(ctf.color(-3.0), Vec3::new(0.0, 0.0, 1.0));
        assert_eq!(ctf.color(42.0), Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_color_range() {
        assert_eq!(blue_to_red().range(), (0.0, 1.0));

        let mut single = ColorTransferFunction::new();
        single.add_rgb_point(5.0, Vec3::ONE);
        let (lo, hi) = single.range();
        assert!(hi <= lo);

        let (lo, hi) = ColorTransferFunction::new().range();
        assert!(hi <= lo);
    }

    #[test]
    fn test_replace_and_remove_nodes() {
        let mut ctf = blue_to_red();
        ctf.add_rgb_point(1.0, Vec3::ONE);
        assert_eq!(ctf.num_points(), 2);
        assert_eq!(ctf.color(1.0), Vec3::ONE);
        assert!(ctf.remove_point(0.0));
        assert!(!ctf.remove_point(0.0));
        assert_eq!(ctf.num_points(), 1);
    }

    #[test]
    fn test_empty_curves_yield_zero() {
        assert_eq!(ColorTransferFunction::new().table(0.0, 1.0, 3), vec![Vec3::ZERO; 3]);
        assert_eq!(PiecewiseFunction::new().table(0.0, 1.0, 2), vec![0.0, 0.0]);
    }

    #[test]
    fn test_opacity_table() {
        let mut otf = PiecewiseFunction::new();
        otf.add_point(0.0, 0.0).add_point(1.0, 1.0);
        let table = otf.table(0.0, 1.0, 5);
        assert_eq!(table, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
    }

    #[test]
    fn test_mutation_bumps_mtime() {
        let mut ctf = ColorTransferFunction::new();
        let before = ctf.mtime();
        ctf.set_vector_component(2);
        assert!(ctf.mtime() > before);
        assert_eq!(ctf.vector_component(), 2);

        let mut otf = PiecewiseFunction::new();
        let before = otf.mtime();
        otf.add_point(0.0, 1.0);
        assert!(otf.mtime() > before);
    }
}
