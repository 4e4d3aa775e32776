//! Random placement of instances on a sphere.

use std::f32::consts::{PI, TAU};

use cgmath::Vector3;
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::data_structures::instance::Instance;

/// Position and per-axis scale of one sampled instance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    pub position: Vector3<f32>,
    pub scale: Vector3<f32>,
}

impl Placement {
    pub fn into_instance(self) -> Instance {
        Instance::new()
            .with_position(self.position)
            .with_scale(self.scale)
    }
}

/// Samples points on a sphere surface and random non-uniform scales.
///
/// The polar angle is drawn uniformly, so samples cluster towards the poles
/// rather than spreading evenly over the surface.
#[derive(Clone, Debug)]
pub struct RandomPlacementGenerator<R: Rng = StdRng> {
    rng: R,
}

impl<R: Rng> RandomPlacementGenerator<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// A point at distance `radius` from `(0, 0, -vertical_offset)` and a scale with
    /// each axis in `[0.5, 2.5)`.
    pub fn sample(&mut self, radius: f32, vertical_offset: f32) -> Placement {
        let theta = self.rng.r#gen::<f32>() * TAU;
        let phi = self.rng.r#gen::<f32>() * PI;
        let position = Vector3::new(
            radius * phi.sin() * theta.cos(),
            radius * phi.sin() * theta.sin(),
            radius * phi.cos(),
        ) - Vector3::new(0.0, 0.0, vertical_offset);
        let scale = Vector3::new(self.scale_factor(), self.scale_factor(), self.scale_factor());
        Placement { position, scale }
    }

    fn scale_factor(&mut self) -> f32 {
        self.rng.r#gen::<f32>() * 2.0 + 0.5
    }
}

impl RandomPlacementGenerator<StdRng> {
    /// Reproducible placements.
    pub fn from_seed(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }
}

#[cfg(test)]
mod tests {
    use cgmath::InnerSpace;
    use rand::rngs::mock::StepRng;

    use super::*;

    #[test]
    fn samples_lie_on_the_sphere() {
        let mut placements = RandomPlacementGenerator::from_seed(7);
        for _ in 0..1000 {
            let Placement { position, scale } = placements.sample(30.0, 5.0);
            let centered = position + Vector3::new(0.0, 0.0, 5.0);
            assert!((centered.magnitude() - 30.0).abs() < 1e-3, "{:?}", position);
            for s in [scale.x, scale.y, scale.z] {
                assert!((0.5..2.5).contains(&s), "{}", s);
            }
        }
    }

    #[test]
    fn same_seed_same_placements() {
        let mut a = RandomPlacementGenerator::from_seed(42);
        let mut b = RandomPlacementGenerator::from_seed(42);
        for _ in 0..10 {
            assert_eq!(a.sample(30.0, 5.0), b.sample(30.0, 5.0));
        }
    }

    #[test]
    fn zero_draws_give_the_north_pole_and_smallest_scale() {
        let mut placements = RandomPlacementGenerator::new(StepRng::new(0, 0));
        let placement = placements.sample(30.0, 5.0);
        assert!((placement.position - Vector3::new(0.0, 0.0, 25.0)).magnitude() < 1e-5);
        assert_eq!(placement.scale, Vector3::new(0.5, 0.5, 0.5));

        let instance = placement.into_instance();
        assert_eq!(instance.position, placement.position);
        assert_eq!(instance.scale, placement.scale);
    }
}
