//! Renderer-side smoothing of viseme weights.
//!
//! The timeline answers with hard 0/1 targets; applying them directly makes
//! the mouth pop at every phoneme boundary. Each mesh instead eases its
//! current weights toward the targets with
//! `current += (target - current) * rate * dt`.

use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use super::viseme::{Viseme, VisemeWeight};

/// Smoothed blend weights for one mesh
#[derive(Debug, Clone)]
pub struct BlendShapeSmoother {
    mesh: String,
    /// Targets this mesh actually has; others are ignored
    available: HashSet<Viseme>,
    rate: f32,
    weights: BTreeMap<Viseme, f32>,
}

impl BlendShapeSmoother {
    pub fn new(mesh: impl Into<String>, available: impl IntoIterator<Item = Viseme>, rate: f32) -> Self {
        let available: HashSet<Viseme> = available.into_iter().collect();
        let weights = available.iter().map(|v| (*v, 0.0)).collect();

        Self {
            mesh: mesh.into(),
            available,
            rate,
            weights,
        }
    }

    /// Mesh carrying the full viseme set
    pub fn with_all_targets(mesh: impl Into<String>, rate: f32) -> Self {
        Self::new(mesh, Viseme::ALL, rate)
    }

    pub fn mesh(&self) -> &str {
        &self.mesh
    }

    /// Advance one rendered frame toward `targets`
    ///
    /// Targets not listed ease back to zero.
    pub fn step(&mut self, targets: &[VisemeWeight], dt: Duration) {
        let factor = (self.rate * dt.as_secs_f32()).clamp(0.0, 1.0);

        for (viseme, current) in self.weights.iter_mut() {
            let target = targets
                .iter()
                .filter(|t| t.viseme == *viseme)
                .map(|t| t.weight)
                .fold(0.0f32, f32::max);

            *current += (target - *current) * factor;
            *current = current.clamp(0.0, 1.0);
        }
    }

    pub fn weight(&self, viseme: Viseme) -> f32 {
        self.weights.get(&viseme).copied().unwrap_or(0.0)
    }

    pub fn has_target(&self, viseme: Viseme) -> bool {
        self.available.contains(&viseme)
    }

    /// Current weights keyed by blend target name
    pub fn weights(&self) -> impl Iterator<Item = (&'static str, f32)> + '_ {
        self.weights.iter().map(|(v, w)| (v.target_name(), *w))
    }
}

/// Drives every mesh of the avatar at a fixed frame rate
#[derive(Debug, Clone)]
pub struct AvatarAnimator {
    meshes: Vec<BlendShapeSmoother>,
    frame_interval: Duration,
}

impl AvatarAnimator {
    pub fn new(meshes: Vec<BlendShapeSmoother>, frames_per_second: u32) -> Self {
        Self {
            meshes,
            frame_interval: Duration::from_secs_f64(1.0 / frames_per_second.max(1) as f64),
        }
    }

    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    /// Render one frame against the latest timeline answer
    pub fn tick(&mut self, targets: &[VisemeWeight]) {
        let dt = self.frame_interval;
        for mesh in &mut self.meshes {
            mesh.step(targets, dt);
        }
    }

    pub fn meshes(&self) -> &[BlendShapeSmoother] {
        &self.meshes
    }
}
