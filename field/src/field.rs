use rapier3d::prelude::RigidBodyHandle;

use crate::cube::Cube;
use crate::grid::{CubeId, CubeSpec};
use crate::physics::PhysicsEngine;

/// The live cubes of the current grid, in spawn order.
///
/// Ids are dense and assigned in spawn order, so a cube's id is also its index.
#[derive(Debug, Default)]
pub struct Field {
    cubes: Vec<Cube>,
}

impl Field {
    /// Spawn one cube per spec, in order.
    pub fn spawn<P, I>(specs: I, physics: &mut P, half_extent: f32) -> Self
    where
        P: PhysicsEngine + ?Sized,
        I: IntoIterator<Item = CubeSpec>,
    {
        let cubes = specs
            .into_iter()
            .map(|spec| Cube::spawn(spec, physics, half_extent))
            .collect();
        Self { cubes }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cubes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cubes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cube> {
        self.cubes.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Cube> {
        self.cubes.iter_mut()
    }

    pub fn get(&self, id: CubeId) -> Option<&Cube> {
        self.cubes.get(id as usize).filter(|c| c.id() == id)
    }

    pub fn get_mut(&mut self, id: CubeId) -> Option<&mut Cube> {
        self.cubes.get_mut(id as usize).filter(|c| c.id() == id)
    }

    pub fn find_by_body(&self, body: RigidBodyHandle) -> Option<&Cube> {
        self.cubes.iter().find(|c| c.body() == body)
    }

    pub fn find_by_body_mut(&mut self, body: RigidBodyHandle) -> Option<&mut Cube> {
        self.cubes.iter_mut().find(|c| c.body() == body)
    }

    /// Despawn every cube, discarding any in-flight return motion.
    pub fn destroy<P: PhysicsEngine + ?Sized>(&mut self, physics: &mut P) {
        for cube in self.cubes.drain(..) {
            cube.despawn(physics);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{GridAnchor, generate};
    use crate::rapier_world::RapierPhysics;
    use crate::types::{Quat, Vec3};

    fn anchor() -> GridAnchor {
        GridAnchor {
            position: Vec3::zeros(),
            orientation: Quat::identity(),
            view_distance: 3.0,
        }
    }

    #[test]
    fn spawn_keeps_lattice_order() {
        let mut physics = RapierPhysics::new();
        let specs = generate(&anchor());
        let field = Field::spawn(specs.clone(), &mut physics, 0.05);

        assert_eq!(field.len(), specs.len());
        for (cube, spec) in field.iter().zip(&specs) {
            assert_eq!(cube.spec(), spec);
            assert_eq!(physics.pose(cube.body()), Some(spec.transform()));
        }
    }

    #[test]
    fn lookup_by_id_and_body() {
        let mut physics = RapierPhysics::new();
        let field = Field::spawn(generate(&anchor()), &mut physics, 0.05);

        let cube = field.get(5).unwrap();
        assert_eq!(cube.id(), 5);
        assert_eq!(field.find_by_body(cube.body()).map(Cube::id), Some(5));
        assert!(field.get(field.len() as CubeId).is_none());
    }

    #[test]
    fn destroy_removes_all_bodies() {
        let mut physics = RapierPhysics::new();
        let mut field = Field::spawn(generate(&anchor()), &mut physics, 0.05);
        let bodies: Vec<_> = field.iter().map(Cube::body).collect();

        field.destroy(&mut physics);

        assert!(field.is_empty());
        assert!(bodies.iter().all(|b| physics.pose(*b).is_none()));
        assert_eq!(physics.bodies.len(), 0);
    }
}
