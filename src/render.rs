// ==============================================================================
// render.rs — RENDER BACKEND SEAM + BODY → VISUAL SYNC
// ------------------------------------------------------------------------------
// The simulation never reads from the renderer. It only:
// - creates visual objects from a shape + material description
// - writes their transforms (RenderSync, once per frame after the step)
// - asks for a frame with the current camera pose
// ==============================================================================

use nalgebra::UnitQuaternion;
use rapier3d::prelude::*;
use std::collections::{BTreeMap, HashSet};

use crate::error::SimError;
use crate::physics::ShapeDesc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VisualHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SceneHandle(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub struct MaterialDesc {
    pub color: [f32; 3],    // linear rgb
    pub roughness: f32,
    pub cast_shadow: bool,
}

impl MaterialDesc {
    pub fn solid(color: [f32; 3]) -> Self {
        Self { color, roughness: 0.8, cast_shadow: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub position: Point<Real>,
    pub orientation: UnitQuaternion<Real>,
}

impl Default for CameraPose {
    fn default() -> Self {
        Self { position: Point::origin(), orientation: UnitQuaternion::identity() }
    }
}

pub trait RenderBackend {
    fn create_visual_object(&mut self, shape: &ShapeDesc, material: &MaterialDesc) -> VisualHandle;
    fn set_transform(&mut self, visual: VisualHandle, position: Point<Real>, orientation: UnitQuaternion<Real>);
    fn render_frame(&mut self, scene: SceneHandle, camera: &CameraPose);
}

// ---------------------------------------------
// SYNC
// ---------------------------------------------

/// Visual ↔ body pairs. A visual is paired once and never re-assigned.
#[derive(Debug, Default)]
pub struct RenderSync {
    entries: Vec<(VisualHandle, RigidBodyHandle)>,
    paired: HashSet<VisualHandle>,
}

impl RenderSync {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, visual: VisualHandle, body: RigidBodyHandle) -> Result<(), SimError> {
        if !self.paired.insert(visual) {
            return Err(SimError::AlreadyPaired(visual));
        }
        self.entries.push((visual, body));
        Ok(())
    }

    pub fn is_paired(&self, visual: VisualHandle) -> bool {
        self.paired.contains(&visual)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn body_of(&self, visual: VisualHandle) -> Option<RigidBodyHandle> {
        self.entries.iter().find(|(v, _)| *v == visual).map(|(_, b)| *b)
    }

    /// Copies every paired body pose onto its visual. Bodies that left the
    /// world are skipped. Returns the number of visuals written.
    pub fn sync(&self, bodies: &RigidBodySet, backend: &mut dyn RenderBackend) -> usize {
        let mut written = 0;
        for &(visual, handle) in &self.entries {
            let Some(body) = bodies.get(handle) else { continue };
            let pos = body.position();
            backend.set_transform(visual, Point::from(pos.translation.vector), pos.rotation);
            written += 1;
        }
        written
    }
}

// ---------------------------------------------
// IN-MEMORY BACKEND
// ---------------------------------------------
#[derive(Debug, Clone)]
pub struct RecordedVisual {
    pub shape: ShapeDesc,
    pub material: MaterialDesc,
    pub transform: Option<(Point<Real>, UnitQuaternion<Real>)>,
    pub writes: u64,
}

/// Keeps the last transform of every visual and counts frames.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    next_id: u64,
    pub visuals: BTreeMap<VisualHandle, RecordedVisual>,
    pub frames: u64,
    pub last_scene: Option<SceneHandle>,
    pub last_camera: Option<CameraPose>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transform(&self, visual: VisualHandle) -> Option<(Point<Real>, UnitQuaternion<Real>)> {
        self.visuals.get(&visual).and_then(|v| v.transform)
    }
}

impl RenderBackend for RecordingBackend {
    fn create_visual_object(&mut self, shape: &ShapeDesc, material: &MaterialDesc) -> VisualHandle {
        let handle = VisualHandle(self.next_id);
        self.next_id += 1;
        self.visuals.insert(
            handle,
            RecordedVisual { shape: shape.clone(), material: material.clone(), transform: None, writes: 0 },
        );
        handle
    }

    fn set_transform(&mut self, visual: VisualHandle, position: Point<Real>, orientation: UnitQuaternion<Real>) {
        if let Some(v) = self.visuals.get_mut(&visual) {
            v.transform = Some((position, orientation));
            v.writes += 1;
        }
    }

    fn render_frame(&mut self, scene: SceneHandle, camera: &CameraPose) {
        self.frames += 1;
        self.last_scene = Some(scene);
        self.last_camera = Some(*camera);
    }
}
