// Entity registry - arena of interactable world objects keyed by id
//
// Sub-controllers never hold references into the scene graph. They look entities up by id
// and may only write a transform while they hold the matching claim.

use bevy::prelude::*;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use crate::constants::{DEFAULT_BUILDING_HALF_EXTENTS, DEFAULT_MINION_HALF_EXTENTS};
use crate::terrain::HeightSampler;
use crate::types::*;

/// Who currently controls an entity's transform
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Claim {
    Grab,
    Move,
    Suspend,
}

#[derive(Clone, Debug)]
pub struct RegisteredEntity {
    pub id: EntityId,
    pub handle: Entity,
    pub kind: TargetKind,
    pub metadata: EntityMetadata,
    pub transform: Transform,
    pub half_extents: Vec3,  // Local bounds in world units (scale already applied)
    claim: Option<Claim>,
    dirty: bool,             // Transform written by a controller, not yet pushed to the ECS
}

impl RegisteredEntity {
    pub fn claim(&self) -> Option<Claim> {
        self.claim
    }

    /// Set the pose directly (registration time / tests)
    pub fn place(&mut self, transform: Transform) -> &mut Self {
        self.transform = transform;
        self
    }

    pub fn with_half_extents(&mut self, half_extents: Vec3) -> &mut Self {
        self.half_extents = half_extents;
        self
    }

    /// Half extents of the world-space axis aligned box around the rotated bounds
    pub fn world_half_extents(&self) -> Vec3 {
        let m = Mat3::from_quat(self.transform.rotation);
        m.x_axis.abs() * self.half_extents.x
            + m.y_axis.abs() * self.half_extents.y
            + m.z_axis.abs() * self.half_extents.z
    }

    /// Width (x) and depth (z) of the world-space bounding box
    pub fn footprint(&self) -> Vec2 {
        let half = self.world_half_extents();
        Vec2::new(half.x * 2.0, half.z * 2.0)
    }
}

/// The designated ground: an optional mesh entity plus its height function
#[derive(Clone)]
pub struct GroundSurfaceRef {
    pub handle: Option<Entity>,
    pub heights: Arc<dyn HeightSampler>,
}

/// Registry of minions, buildings and the ground surface
#[derive(Resource, Default)]
pub struct WorldObjects {
    entities: HashMap<EntityId, RegisteredEntity>,
    ground: Option<GroundSurfaceRef>,
}

impl WorldObjects {
    pub fn register_minion(&mut self, id: impl Into<EntityId>, handle: Entity, metadata: EntityMetadata) -> &mut RegisteredEntity {
        self.register(id.into(), handle, TargetKind::Minion, metadata)
    }

    pub fn register_building(&mut self, id: impl Into<EntityId>, handle: Entity, metadata: EntityMetadata) -> &mut RegisteredEntity {
        self.register(id.into(), handle, TargetKind::Building, metadata)
    }

    fn register(&mut self, id: EntityId, handle: Entity, kind: TargetKind, metadata: EntityMetadata) -> &mut RegisteredEntity {
        if let Some(existing) = self.entities.get(&id) {
            if existing.handle != handle {
                warn!("Re-registering {} with a different entity ({:?} -> {:?})", id, existing.handle, handle);
            }
        }

        let half_extents = match kind {
            TargetKind::Building => DEFAULT_BUILDING_HALF_EXTENTS,
            _ => DEFAULT_MINION_HALF_EXTENTS,
        };

        debug!("Registered {:?} {}", kind, id);
        let registered = RegisteredEntity {
            id: id.clone(),
            handle,
            kind,
            metadata,
            transform: Transform::IDENTITY,
            half_extents,
            claim: None,
            dirty: false,
        };
        match self.entities.entry(id) {
            Entry::Occupied(mut slot) => {
                slot.insert(registered);
                slot.into_mut()
            }
            Entry::Vacant(slot) => slot.insert(registered),
        }
    }

    pub fn unregister_entity(&mut self, id: &str) -> Option<RegisteredEntity> {
        let removed = self.entities.remove(id);
        if removed.is_some() {
            debug!("Unregistered {}", id);
        }
        removed
    }

    pub fn set_ground_surface(&mut self, handle: Option<Entity>, heights: impl HeightSampler + 'static) {
        self.ground = Some(GroundSurfaceRef {
            handle,
            heights: Arc::new(heights),
        });
    }

    pub fn ground(&self) -> Option<&GroundSurfaceRef> {
        self.ground.as_ref()
    }

    /// Ground height at (x, z), if a ground surface is set
    pub fn height_at(&self, x: f32, z: f32) -> Option<f32> {
        self.ground.as_ref().map(|g| g.heights.height_at(x, z))
    }

    pub fn get(&self, id: &str) -> Option<&RegisteredEntity> {
        self.entities.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entities.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter_kind(&self, kind: TargetKind) -> impl Iterator<Item = &RegisteredEntity> {
        self.entities.values().filter(move |e| e.kind == kind)
    }

    /// Take exclusive control of an entity's transform. Fails if missing or already claimed.
    pub fn try_claim(&mut self, id: &str, claim: Claim) -> bool {
        match self.entities.get_mut(id) {
            Some(entity) if entity.claim.is_none() => {
                entity.claim = Some(claim);
                true
            }
            Some(entity) => {
                debug!("{} is already claimed by {:?}", id, entity.claim);
                false
            }
            None => false,
        }
    }

    /// Drop a claim; only the current holder may release it
    pub fn release_claim(&mut self, id: &str, claim: Claim) -> bool {
        match self.entities.get_mut(id) {
            Some(entity) if entity.claim == Some(claim) => {
                entity.claim = None;
                true
            }
            _ => false,
        }
    }

    /// Write a transform on behalf of the claim holder
    pub fn write_transform(&mut self, id: &str, claim: Claim, transform: Transform) -> bool {
        match self.entities.get_mut(id) {
            Some(entity) if entity.claim == Some(claim) => {
                entity.transform = transform;
                entity.dirty = true;
                true
            }
            _ => false,
        }
    }

    /// Refresh pose and bounds from the scene. Claimed or pending entities keep the controller's pose.
    pub fn sync_from_scene(&mut self, handle: Entity, transform: Transform, half_extents: Option<Vec3>) {
        for entity in self.entities.values_mut().filter(|e| e.handle == handle) {
            if let Some(half) = half_extents {
                entity.half_extents = half;
            }
            if entity.claim.is_none() && !entity.dirty {
                entity.transform = transform;
            }
        }
    }

    /// Drain transforms written by controllers since the last push
    pub fn take_dirty(&mut self) -> Vec<(Entity, Transform)> {
        self.entities
            .values_mut()
            .filter(|e| e.dirty)
            .map(|e| {
                e.dirty = false;
                (e.handle, e.transform)
            })
            .collect()
    }
}
