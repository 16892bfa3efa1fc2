use eframe::egui::{Vec2, vec2};

const LEAF_CAPACITY: usize = 12;
const MAX_DEPTH: usize = 10;

#[derive(Clone, Copy)]
struct Bounds {
    center: Vec2,
    half_extent: f32,
}

impl Bounds {
    fn around(points: &[Vec2]) -> Option<Self> {
        let mut min = vec2(f32::INFINITY, f32::INFINITY);
        let mut max = vec2(f32::NEG_INFINITY, f32::NEG_INFINITY);
        for point in points {
            min = min.min(*point);
            max = max.max(*point);
        }

        if !min.x.is_finite() || !min.y.is_finite() || !max.x.is_finite() || !max.y.is_finite() {
            return None;
        }

        let span = (max - min).max(Vec2::splat(1.0));
        Some(Self {
            center: (min + max) * 0.5,
            half_extent: span.x.max(span.y) * 0.5 + 1.0,
        })
    }

    fn contains(self, point: Vec2) -> bool {
        (point.x - self.center.x).abs() <= self.half_extent
            && (point.y - self.center.y).abs() <= self.half_extent
    }

    fn child(self, quadrant: usize) -> Self {
        let quarter = self.half_extent * 0.5;
        let offset = match quadrant {
            0 => vec2(-quarter, -quarter),
            1 => vec2(quarter, -quarter),
            2 => vec2(-quarter, quarter),
            _ => vec2(quarter, quarter),
        };
        Self {
            center: self.center + offset,
            half_extent: quarter,
        }
    }

    fn quadrant_for(self, point: Vec2) -> usize {
        match (point.x >= self.center.x, point.y >= self.center.y) {
            (false, false) => 0,
            (true, false) => 1,
            (false, true) => 2,
            (true, true) => 3,
        }
    }
}

/// Barnes-Hut cell: aggregated mass for far-field repulsion.
pub(super) struct QuadNode {
    bounds: Bounds,
    center_of_mass: Vec2,
    mass: f32,
    indices: Vec<usize>,
    children: [Option<Box<QuadNode>>; 4],
}

impl QuadNode {
    pub(super) fn build(positions: &[Vec2]) -> Option<Self> {
        let bounds = Bounds::around(positions)?;
        let indices = (0..positions.len()).collect();
        Some(Self::build_node(bounds, indices, positions, 0))
    }

    fn build_node(bounds: Bounds, indices: Vec<usize>, positions: &[Vec2], depth: usize) -> Self {
        let mass = indices.len() as f32;
        let mut center_of_mass = indices
            .iter()
            .fold(Vec2::ZERO, |sum, &index| sum + positions[index]);
        if mass > 0.0 {
            center_of_mass /= mass;
        }

        let mut node = Self {
            bounds,
            center_of_mass,
            mass,
            indices,
            children: std::array::from_fn(|_| None),
        };

        if depth >= MAX_DEPTH || node.indices.len() <= LEAF_CAPACITY {
            return node;
        }

        let mut buckets = std::array::from_fn::<_, 4, _>(|_| Vec::new());
        for &index in &node.indices {
            buckets[bounds.quadrant_for(positions[index])].push(index);
        }
        if buckets.iter().filter(|bucket| !bucket.is_empty()).count() <= 1 {
            return node;
        }

        for (quadrant, bucket) in buckets.into_iter().enumerate() {
            if !bucket.is_empty() {
                node.children[quadrant] = Some(Box::new(Self::build_node(
                    bounds.child(quadrant),
                    bucket,
                    positions,
                    depth + 1,
                )));
            }
        }
        node.indices.clear();
        node
    }

    fn is_leaf(&self) -> bool {
        self.children.iter().all(Option::is_none)
    }
}

#[derive(Clone, Copy)]
pub(super) struct Repulsion {
    pub strength: f32,
    pub softening: f32,
    pub theta: f32,
}

impl Repulsion {
    fn between(self, point: Vec2, other: Vec2, mass: f32) -> Vec2 {
        let delta = point - other;
        let distance_sq = delta.length_sq();
        let distance = distance_sq.sqrt();
        let direction = if distance > 0.0001 {
            delta / distance
        } else {
            vec2(1.0, 0.0)
        };
        direction * (self.strength * mass / (distance_sq + self.softening))
    }

    /// Repulsive force on `positions[index]` from every other point in `node`.
    pub(super) fn accumulate(self, node: &QuadNode, index: usize, positions: &[Vec2]) -> Vec2 {
        if node.mass <= 0.0 {
            return Vec2::ZERO;
        }

        let point = positions[index];
        if node.is_leaf() {
            return node
                .indices
                .iter()
                .filter(|&&other| other != index)
                .fold(Vec2::ZERO, |force, &other| {
                    force + self.between(point, positions[other], 1.0)
                });
        }

        let distance = (point - node.center_of_mass).length().max(0.01);
        let far_enough = !node.bounds.contains(point)
            && node.bounds.half_extent * 2.0 / distance < self.theta
            && node.mass > 1.0;
        if far_enough {
            return self.between(point, node.center_of_mass, node.mass);
        }

        node.children
            .iter()
            .flatten()
            .fold(Vec2::ZERO, |force, child| {
                force + self.accumulate(child, index, positions)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approximation_tracks_exact_sum() {
        let positions = (0..200)
            .map(|i| vec2((i % 20) as f32 * 10.0, (i / 20) as f32 * 10.0))
            .collect::<Vec<_>>();
        let tree = QuadNode::build(&positions).unwrap();
        let repulsion = Repulsion {
            strength: 1000.0,
            softening: 1.0,
            theta: 0.72,
        };

        let approx = repulsion.accumulate(&tree, 0, &positions);
        let exact = (1..positions.len()).fold(Vec2::ZERO, |sum, other| {
            sum + repulsion.between(positions[0], positions[other], 1.0)
        });

        assert!((approx - exact).length() < exact.length() * 0.25);
    }

    #[test]
    fn non_finite_points_yield_no_tree() {
        assert!(QuadNode::build(&[vec2(f32::NAN, 0.0)]).is_none());
        assert!(QuadNode::build(&[]).is_none());
    }
}
