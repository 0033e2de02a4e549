//! Short ray probes for climbable surfaces ahead of the agent and floor below it.

use nalgebra::{Point3, Vector3};
use tracing::trace;

use super::host::RayCaster;
use super::AgentPose;
use crate::config::ProbeConfig;

/// A climbable surface sensed this tick.
///
/// `normal` is unit length and points away from the struck surface. Hits are
/// recomputed every tick and never cached beyond comparing `part_id` with
/// the surface currently held.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceHit {
    pub part_id: u64,
    pub position: Point3<f32>,
    pub normal: Vector3<f32>,
}

impl SurfaceHit {
    /// Dot of the normal with world up: 1 for floors, 0 for walls, -1 for ceilings.
    pub fn steepness(&self) -> f32 {
        self.normal.dot(&Vector3::y())
    }
}

/// Classification of a single probe ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Detection {
    None,
    NonClimbable(u64),
    Climbable(SurfaceHit),
}

impl Detection {
    pub fn climbable(self) -> Option<SurfaceHit> {
        match self {
            Detection::Climbable(hit) => Some(hit),
            _ => None,
        }
    }

    pub fn is_solid(&self) -> bool {
        !matches!(self, Detection::None)
    }
}

/// Forward reach to use for a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reach {
    /// Longer reach used when first trying to grab a wall.
    Initial,
    /// Shorter reach used to stay on a wall already held.
    Maintain,
}

/// Casts the forward and floor rays used by the climb state.
#[derive(Debug, Clone)]
pub struct SurfaceProbe {
    config: ProbeConfig,
}

impl SurfaceProbe {
    pub fn new(config: ProbeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    pub fn reach(&self, reach: Reach) -> f32 {
        match reach {
            Reach::Initial => self.config.initial_reach,
            Reach::Maintain => self.config.maintain_reach,
        }
    }

    /// Casts one ray and classifies what it struck.
    pub fn detect<W: RayCaster + ?Sized>(
        &self,
        world: &W,
        origin: Point3<f32>,
        direction: Vector3<f32>,
        max_distance: f32,
        exclude_character: u64,
    ) -> Detection {
        let Some(hit) = world.cast_ray(origin, direction, max_distance, exclude_character) else {
            return Detection::None;
        };
        if !hit.climbable {
            return Detection::NonClimbable(hit.part_id);
        }
        // A ray starting inside geometry reports no usable normal.
        let Some(normal) = hit.normal.try_normalize(1.0e-6) else {
            return Detection::None;
        };
        Detection::Climbable(SurfaceHit {
            part_id: hit.part_id,
            position: hit.position,
            normal,
        })
    }

    /// Returns the climbable surface struck by the ray, if any.
    pub fn probe<W: RayCaster + ?Sized>(
        &self,
        world: &W,
        origin: Point3<f32>,
        direction: Vector3<f32>,
        max_distance: f32,
        exclude_character: u64,
    ) -> Option<SurfaceHit> {
        self.detect(world, origin, direction, max_distance, exclude_character)
            .climbable()
    }

    /// Probes straight ahead of the agent from just in front of its center.
    pub fn forward<W: RayCaster + ?Sized>(
        &self,
        world: &W,
        agent: &AgentPose,
        reach: Reach,
    ) -> Option<SurfaceHit> {
        let origin = agent.local_point(self.config.forward_offset);
        let hit = self.probe(
            world,
            origin,
            agent.forward(),
            self.reach(reach),
            agent.character_id,
        );
        trace!(
            character_id = agent.character_id,
            ?reach,
            part_id = hit.map(|h| h.part_id),
            "forward probe"
        );
        hit
    }

    /// Whether any solid geometry lies just below the agent's ground-sensing point.
    pub fn floor_near<W: RayCaster + ?Sized>(&self, world: &W, agent: &AgentPose) -> bool {
        let origin = agent.local_point(self.config.ground_offset);
        self.detect(
            world,
            origin,
            -Vector3::y(),
            self.config.floor_distance,
            agent.character_id,
        )
        .is_solid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::climbing::testing::{agent_at, wall_hit, MockHost};

    #[test]
    fn test_forward_probe_respects_reach() {
        let mut host = MockHost::new();
        host.set_forward_hit(wall_hit(7, 2.5), 2.5);
        let probe = SurfaceProbe::new(ProbeConfig::default());
        let agent = agent_at(0.0, 0.0, 0.0);

        let initial = probe.forward(&host, &agent, Reach::Initial);
        assert_eq!(initial.map(|h| h.part_id), Some(7));
        assert!(probe.forward(&host, &agent, Reach::Maintain).is_none());
    }

    #[test]
    fn test_forward_probe_origin_and_direction() {
        let mut host = MockHost::new();
        host.set_forward_hit(wall_hit(7, 1.0), 1.0);
        let probe = SurfaceProbe::new(ProbeConfig::default());
        probe.forward(&host, &agent_at(1.0, 2.0, 3.0), Reach::Initial);

        let casts = host.casts();
        let (origin, direction, distance, exclude) = casts[0];
        assert!((origin - Point3::new(1.0, 2.0, 2.5)).norm() < 1e-5);
        assert!((direction - Vector3::new(0.0, 0.0, -1.0)).norm() < 1e-5);
        assert_eq!(distance, ProbeConfig::default().initial_reach);
        assert_eq!(exclude, 1);
    }

    #[test]
    fn test_non_climbable_hit_is_not_a_surface() {
        let mut host = MockHost::new();
        let mut hit = wall_hit(9, 1.0);
        hit.climbable = false;
        host.set_forward_hit(hit, 1.0);
        let probe = SurfaceProbe::new(ProbeConfig::default());
        let agent = agent_at(0.0, 0.0, 0.0);

        let detection = probe.detect(&host, agent.position, agent.forward(), 3.0, 1);
        assert_eq!(detection, Detection::NonClimbable(9));
        assert!(probe.forward(&host, &agent, Reach::Initial).is_none());
    }

    #[test]
    fn test_zero_normal_is_a_miss() {
        let mut host = MockHost::new();
        let mut hit = wall_hit(3, 0.0);
        hit.normal = Vector3::zeros();
        host.set_forward_hit(hit, 0.0);
        let probe = SurfaceProbe::new(ProbeConfig::default());
        assert!(probe
            .forward(&host, &agent_at(0.0, 0.0, 0.0), Reach::Initial)
            .is_none());
    }

    #[test]
    fn test_hit_normal_is_normalized() {
        let mut host = MockHost::new();
        let mut hit = wall_hit(3, 1.0);
        hit.normal = Vector3::new(0.0, 0.0, 4.0);
        host.set_forward_hit(hit, 1.0);
        let probe = SurfaceProbe::new(ProbeConfig::default());
        let surface = probe
            .forward(&host, &agent_at(0.0, 0.0, 0.0), Reach::Initial)
            .unwrap();
        assert!((surface.normal.norm() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_floor_probe_counts_any_solid_geometry() {
        let mut host = MockHost::new();
        let probe = SurfaceProbe::new(ProbeConfig::default());
        let agent = agent_at(0.0, 5.0, 0.0);
        assert!(!probe.floor_near(&host, &agent));

        let mut floor = wall_hit(2, 0.5);
        floor.climbable = false;
        floor.normal = Vector3::y();
        host.set_floor_hit(floor, 0.5);
        assert!(probe.floor_near(&host, &agent));

        let (origin, direction, distance, _) = host.casts().last().copied().unwrap();
        assert!((origin - Point3::new(0.0, 4.0, 0.0)).norm() < 1e-5);
        assert_eq!(direction, -Vector3::y());
        assert_eq!(distance, ProbeConfig::default().floor_distance);
    }

    #[test]
    fn test_steepness_of_common_surfaces() {
        let wall = wall_hit(1, 1.0);
        assert!(wall_surface(wall).steepness().abs() < 1e-6);
        let floor = SurfaceHit {
            part_id: 1,
            position: Point3::origin(),
            normal: Vector3::y(),
        };
        assert_eq!(floor.steepness(), 1.0);
    }

    fn wall_surface(hit: crate::game::climbing::RayHit) -> SurfaceHit {
        SurfaceHit {
            part_id: hit.part_id,
            position: hit.position,
            normal: hit.normal,
        }
    }
}
