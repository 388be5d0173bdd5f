//! Projectile resolution: lifetime, bounds, cover and player hits
//!
//! Every geometry test for a projectile in a tick is evaluated over the same
//! sub-step: the ray always starts at the projectile's position *before* this
//! tick's integration. The path test runs to the post-step position, the
//! occlusion test for a hit runs to the victim's body point.

use tracing::debug;
use uuid::Uuid;

use super::combat::{CombatSystem, Projectile};
use super::geometry::Vec3;
use super::world::{spawn_point, PlayerId, WorldState};

/// A damaging hit applied this tick
#[derive(Debug, Clone, PartialEq)]
pub struct HitResult {
    pub projectile_id: Uuid,
    pub shooter_id: PlayerId,
    pub target_id: PlayerId,
    pub pos: Vec3,
    pub target_killed: bool,
}

/// What happened to one projectile during a tick
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectileFate {
    Alive,
    Expired,
    OutOfBounds,
    HitCover,
    /// Touched a player but cover lies between the shot and the body
    Occluded,
    Hit(HitResult),
}

/// Per-tick tally of projectile outcomes
#[derive(Debug, Clone, Default)]
pub struct CollisionReport {
    pub expired: usize,
    pub out_of_bounds: usize,
    pub hit_cover: usize,
    pub occluded: usize,
    pub hits: Vec<HitResult>,
}

impl CollisionReport {
    fn record(&mut self, fate: ProjectileFate) {
        match fate {
            ProjectileFate::Alive => {}
            ProjectileFate::Expired => self.expired += 1,
            ProjectileFate::OutOfBounds => self.out_of_bounds += 1,
            ProjectileFate::HitCover => self.hit_cover += 1,
            ProjectileFate::Occluded => self.occluded += 1,
            ProjectileFate::Hit(hit) => self.hits.push(hit),
        }
    }
}

pub struct CollisionResolver;

impl CollisionResolver {
    /// Advance every projectile by `dt` and resolve what it touched
    pub fn resolve(world: &mut WorldState, dt: f32) -> CollisionReport {
        let mut report = CollisionReport::default();
        let projectiles = std::mem::take(&mut world.projectiles);
        let mut survivors = Vec::with_capacity(projectiles.len());

        for mut projectile in projectiles {
            match Self::step(world, &mut projectile, dt) {
                ProjectileFate::Alive => survivors.push(projectile),
                fate => report.record(fate),
            }
        }

        world.projectiles = survivors;
        report
    }

    /// Resolve one projectile. Anything but `Alive` destroys it.
    pub fn step(world: &mut WorldState, projectile: &mut Projectile, dt: f32) -> ProjectileFate {
        let config = &world.config;

        if projectile.is_expired(world.clock, config.bullet_lifetime) {
            return ProjectileFate::Expired;
        }

        let origin = projectile.pos;
        projectile.pos += projectile.vel * dt;
        let pos = projectile.pos;

        if pos.y <= 0.0
            || pos.y > config.bullet_ceiling
            || pos.x.abs() > config.half_size
            || pos.z.abs() > config.half_size
        {
            return ProjectileFate::OutOfBounds;
        }

        if world.catalog.segment_blocked(origin, pos) {
            return ProjectileFate::HitCover;
        }

        let Some((target_id, body)) = Self::find_target(world, projectile) else {
            return ProjectileFate::Alive;
        };

        if world.catalog.segment_blocked(origin, body) {
            debug!(bullet_id = %projectile.id, target_id = %target_id, "Shot blocked by cover");
            return ProjectileFate::Occluded;
        }

        ProjectileFate::Hit(Self::apply_hit(world, projectile, target_id))
    }

    /// First player, in store order, the projectile touches (owner excluded)
    fn find_target(world: &WorldState, projectile: &Projectile) -> Option<(PlayerId, Vec3)> {
        let config = &world.config;
        let reach = config.hit_distance();
        let pos = projectile.pos;

        world
            .players
            .values()
            .filter(|p| p.id != projectile.owner_id)
            .find_map(|p| {
                let body = Vec3::new(p.pos.x, p.pos.y + config.body_offset, p.pos.z);
                let in_height = pos.y >= p.pos.y && pos.y <= p.pos.y + config.standing_height;
                (in_height && pos.distance(body) <= reach).then(|| (p.id.clone(), body))
            })
    }

    /// Damage the target; on death credit the shooter and respawn the victim
    fn apply_hit(world: &mut WorldState, projectile: &Projectile, target_id: PlayerId) -> HitResult {
        let mut killed = false;

        if let Some(target) = world.players.get_mut(&target_id) {
            killed = CombatSystem::apply_damage(target);
            if killed {
                target.pos = spawn_point(&mut world.rng, &world.config, &world.catalog);
                target.yaw = 0.0;
                target.hp = world.config.start_hp;
            }
        }

        if killed {
            if let Some(shooter) = world.players.get_mut(&projectile.owner_id) {
                shooter.score += 1;
            }
        }

        debug!(
            bullet_id = %projectile.id,
            shooter_id = %projectile.owner_id,
            target_id = %target_id,
            killed,
            "Projectile hit player"
        );

        HitResult {
            projectile_id: projectile.id,
            shooter_id: projectile.owner_id.clone(),
            target_id,
            pos: projectile.pos,
            target_killed: killed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ArenaConfig;
    use crate::game::geometry::{CoverBox, GeometryCatalog};
    use std::sync::Arc;
    use std::time::Duration;

    const DT: f32 = 1.0 / 30.0;

    fn world_with(boxes: Vec<CoverBox>, start_hp: i32) -> WorldState {
        let config = ArenaConfig {
            seed: Some(11),
            start_hp,
            ..ArenaConfig::default()
        };
        let catalog = GeometryCatalog::from_boxes(config.half_size, boxes);
        WorldState::new(Arc::new(config), Arc::new(catalog))
    }

    fn place(world: &mut WorldState, id: &str, x: f32, z: f32) {
        world.on_presence_enter(id, None);
        world.players.get_mut(id).unwrap().pos = Vec3::new(x, 0.0, z);
    }

    fn bullet(owner: &str, pos: Vec3, vel: Vec3) -> Projectile {
        Projectile::new(owner.to_string(), pos, vel, Duration::ZERO)
    }

    #[test]
    fn expired_projectile_is_removed_before_moving() {
        let mut world = world_with(Vec::new(), 1);
        world.clock = Duration::from_millis(2600);
        world.projectiles.push(bullet("a", Vec3::new(0.0, 1.2, 0.0), Vec3::new(0.0, 0.0, 16.0)));

        let report = CollisionResolver::resolve(&mut world, DT);
        assert_eq!(report.expired, 1);
        assert!(world.projectiles.is_empty());
    }

    #[test]
    fn ground_ceiling_and_edges_remove_projectiles() {
        let mut world = world_with(Vec::new(), 1);
        world.projectiles.push(bullet("a", Vec3::new(0.0, 0.1, 0.0), Vec3::new(0.0, -16.0, 0.0)));
        world.projectiles.push(bullet("a", Vec3::new(0.0, 9.9, 0.0), Vec3::new(0.0, 16.0, 0.0)));
        world.projectiles.push(bullet("a", Vec3::new(19.9, 1.2, 0.0), Vec3::new(16.0, 0.0, 0.0)));
        world.projectiles.push(bullet("a", Vec3::new(0.0, 1.2, -19.9), Vec3::new(0.0, 0.0, -16.0)));
        world.projectiles.push(bullet("a", Vec3::new(0.0, 1.2, 0.0), Vec3::new(16.0, 0.0, 0.0)));

        let report = CollisionResolver::resolve(&mut world, DT);
        assert_eq!(report.out_of_bounds, 4);
        assert_eq!(world.projectiles.len(), 1);
        assert!((world.projectiles[0].pos.x - 16.0 * DT).abs() < 1e-5);
    }

    #[test]
    fn cover_on_path_destroys_projectile() {
        let wall = CoverBox::new(Vec3::new(-1.0, 0.0, 0.3), Vec3::new(1.0, 2.0, 0.4));
        let mut world = world_with(vec![wall], 1);
        world.projectiles.push(bullet("a", Vec3::new(0.0, 1.2, 0.0), Vec3::new(0.0, 0.0, 16.0)));

        let report = CollisionResolver::resolve(&mut world, DT);
        assert_eq!(report.hit_cover, 1);
        assert!(world.projectiles.is_empty());
    }

    #[test]
    fn owner_is_never_hit() {
        let mut world = world_with(Vec::new(), 1);
        place(&mut world, "a", 0.0, 0.0);
        world.projectiles.push(bullet("a", Vec3::new(0.0, 1.2, -0.3), Vec3::new(0.0, 0.0, 1.0)));

        let report = CollisionResolver::resolve(&mut world, DT);
        assert!(report.hits.is_empty());
        assert_eq!(world.projectiles.len(), 1);
    }

    #[test]
    fn lethal_hit_scores_and_respawns() {
        let mut world = world_with(Vec::new(), 1);
        place(&mut world, "a", 0.0, -5.0);
        place(&mut world, "b", 0.0, 0.0);
        world.players.get_mut("b").unwrap().yaw = 1.0;
        world.projectiles.push(bullet("a", Vec3::new(0.0, 1.2, -0.6), Vec3::new(0.0, 0.0, 6.0)));

        let report = CollisionResolver::resolve(&mut world, DT);
        assert_eq!(report.hits.len(), 1);
        assert!(report.hits[0].target_killed);
        assert!(world.projectiles.is_empty());

        let victim = world.player("b").unwrap();
        assert_eq!(victim.hp, 1);
        assert_eq!(victim.yaw, 0.0);
        let extent = world.config.half_size - world.config.respawn_margin;
        assert!(victim.pos.x.abs() <= extent && victim.pos.z.abs() <= extent);
        assert_eq!(world.player("a").unwrap().score, 1);
    }

    #[test]
    fn non_lethal_hit_only_damages() {
        let mut world = world_with(Vec::new(), 3);
        place(&mut world, "a", 0.0, -5.0);
        place(&mut world, "b", 0.0, 0.0);
        world.projectiles.push(bullet("a", Vec3::new(0.0, 1.2, -0.6), Vec3::new(0.0, 0.0, 6.0)));

        let report = CollisionResolver::resolve(&mut world, DT);
        assert_eq!(report.hits.len(), 1);
        assert!(!report.hits[0].target_killed);
        assert_eq!(world.player("b").unwrap().hp, 2);
        assert_eq!(world.player("b").unwrap().pos, Vec3::ZERO);
        assert_eq!(world.player("a").unwrap().score, 0);
    }

    #[test]
    fn bullet_above_head_misses() {
        let mut world = world_with(Vec::new(), 1);
        place(&mut world, "b", 0.0, 0.0);
        world.projectiles.push(bullet("a", Vec3::new(0.0, 1.9, -0.3), Vec3::new(0.0, 0.0, 1.0)));

        let report = CollisionResolver::resolve(&mut world, DT);
        assert!(report.hits.is_empty());
        assert_eq!(world.projectiles.len(), 1);
    }

    #[test]
    fn only_first_player_in_store_order_is_hit() {
        let mut world = world_with(Vec::new(), 1);
        place(&mut world, "shooter", 0.0, -8.0);
        place(&mut world, "b1", 0.0, 0.0);
        place(&mut world, "b2", 0.0, 0.0);
        world.projectiles.push(bullet("shooter", Vec3::new(0.0, 1.2, -0.4), Vec3::new(0.0, 0.0, 3.0)));

        let report = CollisionResolver::resolve(&mut world, DT);
        assert_eq!(report.hits.len(), 1);
        assert_eq!(report.hits[0].target_id, "b1");
        assert_eq!(world.player("b2").unwrap().pos, Vec3::ZERO);
        assert_eq!(world.player("b2").unwrap().hp, 1);
    }

    #[test]
    fn occluded_hit_destroys_without_damage() {
        // Thin pane between the projectile's pre-step position and the body
        // point, but not crossed by the projectile's own sub-step.
        let pane = CoverBox::new(Vec3::new(-1.0, 0.85, -0.05), Vec3::new(1.0, 1.05, 0.05));
        let mut world = world_with(vec![pane], 1);
        place(&mut world, "a", 0.0, -8.0);
        place(&mut world, "b", 0.0, 0.3);
        world.projectiles.push(bullet("a", Vec3::new(0.0, 1.2, -0.2), Vec3::new(0.0, 0.0, 3.0)));

        let report = CollisionResolver::resolve(&mut world, DT);
        assert_eq!(report.occluded, 1);
        assert!(report.hits.is_empty());
        assert!(world.projectiles.is_empty());
        assert_eq!(world.player("b").unwrap().hp, 1);
        assert_eq!(world.player("a").unwrap().score, 0);
    }
}
