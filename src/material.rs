use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use crate::model::{ColorBias, QualityTier};

/// Which procedural material family a descriptor belongs to.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum MaterialKind {
    Fire,
    Smoke,
    Debris,
}

impl MaterialKind {
    /// Stable lowercase name, used in material ids.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fire => "fire",
            Self::Smoke => "smoke",
            Self::Debris => "debris",
        }
    }
}

/// Cache key for shared materials.
///
/// The tier is part of the key on purpose: two specs at different tiers never
/// share a descriptor, so there is no hidden quality mixing.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct MaterialKey {
    pub kind: MaterialKind,
    pub color_bias: ColorBias,
    pub tier: QualityTier,
}

impl MaterialKey {
    /// Stable string id (`kind/bias/tier`) used at the engine boundary.
    pub fn id(&self) -> String {
        format!(
            "{}/{}/{}",
            self.kind.as_str(),
            self.color_bias.as_str(),
            self.tier.as_str()
        )
    }
}

/// One stop of a procedural color gradient, `t` in [0, 1].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GradientStop {
    pub t: f64,
    pub rgba: [u8; 4],
}

/// Opaque procedural material record shared across effect instances.
///
/// Any renderer binding can translate a descriptor into its native shading
/// representation; the pipeline itself never interprets these fields beyond
/// building them.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MaterialDescriptor {
    pub id: String,
    pub key: MaterialKey,
    /// Color ramp over particle age; stop count is tier-driven.
    pub gradient: Vec<GradientStop>,
    /// `(age, alpha)` pairs over particle age.
    pub opacity_ramp: Vec<[f64; 2]>,
    pub emission_strength: f64,
    pub density: f64,
}

/// Memoized material factory.
///
/// First request for a key synthesizes a descriptor; later requests return
/// the cached value. The cache is never invalidated within a run, bounding
/// distinct materials to `O(kinds x biases x tiers)` regardless of instance
/// count. Read-mostly after warm-up; writes go through the lock.
#[derive(Debug, Default)]
pub struct MaterialBank {
    cache: RwLock<BTreeMap<MaterialKey, Arc<MaterialDescriptor>>>,
}

impl MaterialBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the shared descriptor for a key, synthesizing it on first use.
    pub fn get_or_create(
        &self,
        kind: MaterialKind,
        color_bias: ColorBias,
        tier: QualityTier,
    ) -> Arc<MaterialDescriptor> {
        let key = MaterialKey {
            kind,
            color_bias,
            tier,
        };
        if let Some(found) = self.cache.read().expect("material cache poisoned").get(&key) {
            return found.clone();
        }

        let mut cache = self.cache.write().expect("material cache poisoned");
        // A racing writer may have inserted between the read and write lock.
        cache
            .entry(key)
            .or_insert_with(|| Arc::new(synthesize(key)))
            .clone()
    }

    /// Look up an already-synthesized descriptor.
    pub fn get(&self, key: MaterialKey) -> Option<Arc<MaterialDescriptor>> {
        self.cache
            .read()
            .expect("material cache poisoned")
            .get(&key)
            .cloned()
    }

    /// Number of distinct descriptors synthesized so far.
    pub fn len(&self) -> usize {
        self.cache.read().expect("material cache poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All synthesized descriptors in stable key order.
    pub fn descriptors(&self) -> Vec<Arc<MaterialDescriptor>> {
        self.cache
            .read()
            .expect("material cache poisoned")
            .values()
            .cloned()
            .collect()
    }
}

fn synthesize(key: MaterialKey) -> MaterialDescriptor {
    let stops = gradient_stop_count(key.tier);
    let (core, body, tail) = palette(key.kind, key.color_bias);

    let mut gradient = Vec::with_capacity(stops);
    for i in 0..stops {
        let t = i as f64 / (stops - 1) as f64;
        // Two-segment ramp: hot core into body color, then body into tail.
        let rgba = if t < 0.5 {
            lerp_rgba(core, body, t * 2.0)
        } else {
            lerp_rgba(body, tail, (t - 0.5) * 2.0)
        };
        gradient.push(GradientStop { t, rgba });
    }

    let (opacity_ramp, emission_strength, density) = match key.kind {
        MaterialKind::Fire => (
            vec![[0.0, 0.0], [0.1, 1.0], [0.8, 0.9], [1.0, 0.0]],
            8.0,
            0.2,
        ),
        MaterialKind::Smoke => (
            vec![[0.0, 0.0], [0.2, 0.7], [0.7, 0.5], [1.0, 0.0]],
            0.0,
            0.8,
        ),
        MaterialKind::Debris => (vec![[0.0, 1.0], [0.9, 1.0], [1.0, 0.0]], 0.5, 1.0),
    };

    MaterialDescriptor {
        id: key.id(),
        key,
        gradient,
        opacity_ramp,
        emission_strength,
        density,
    }
}

fn gradient_stop_count(tier: QualityTier) -> usize {
    match tier {
        QualityTier::Quick => 3,
        QualityTier::Medium => 5,
        QualityTier::High => 7,
    }
}

/// `(core, body, tail)` colors for a kind/bias combination.
fn palette(kind: MaterialKind, bias: ColorBias) -> ([u8; 4], [u8; 4], [u8; 4]) {
    let body = match bias {
        ColorBias::Orange => [255, 128, 16, 255],
        ColorBias::Red => [224, 48, 16, 255],
        ColorBias::Yellow => [255, 208, 32, 255],
        ColorBias::Blue => [64, 128, 255, 255],
        ColorBias::Green => [64, 224, 96, 255],
    };
    match kind {
        MaterialKind::Fire => ([255, 250, 235, 255], body, [32, 16, 8, 255]),
        // Smoke and debris keep only a faint tint of the bias color.
        MaterialKind::Smoke => (
            [200, 200, 200, 255],
            lerp_rgba([120, 120, 120, 255], body, 0.12),
            [30, 30, 30, 255],
        ),
        MaterialKind::Debris => (
            [140, 110, 90, 255],
            lerp_rgba([90, 70, 55, 255], body, 0.10),
            [40, 32, 26, 255],
        ),
    }
}

fn lerp_rgba(a: [u8; 4], b: [u8; 4], t: f64) -> [u8; 4] {
    let t = t.clamp(0.0, 1.0);
    let mut out = [0u8; 4];
    for (i, v) in out.iter_mut().enumerate() {
        let x = f64::from(a[i]) + (f64::from(b[i]) - f64::from(a[i])) * t;
        *v = x.round().clamp(0.0, 255.0) as u8;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_keys_reuse_one_descriptor() {
        let bank = MaterialBank::new();
        let a = bank.get_or_create(MaterialKind::Fire, ColorBias::Orange, QualityTier::High);
        let b = bank.get_or_create(MaterialKind::Fire, ColorBias::Orange, QualityTier::High);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(bank.len(), 1);
    }

    #[test]
    fn cache_is_bounded_by_distinct_keys() {
        let bank = MaterialBank::new();
        // 24 requests over 4 distinct keys.
        for _ in 0..6 {
            bank.get_or_create(MaterialKind::Fire, ColorBias::Orange, QualityTier::Quick);
            bank.get_or_create(MaterialKind::Smoke, ColorBias::Orange, QualityTier::Quick);
            bank.get_or_create(MaterialKind::Debris, ColorBias::Orange, QualityTier::Quick);
            bank.get_or_create(MaterialKind::Fire, ColorBias::Blue, QualityTier::Quick);
        }
        assert_eq!(bank.len(), 4);
    }

    #[test]
    fn tier_drives_gradient_complexity() {
        let bank = MaterialBank::new();
        let quick = bank.get_or_create(MaterialKind::Fire, ColorBias::Red, QualityTier::Quick);
        let medium = bank.get_or_create(MaterialKind::Fire, ColorBias::Red, QualityTier::Medium);
        let high = bank.get_or_create(MaterialKind::Fire, ColorBias::Red, QualityTier::High);
        assert!(quick.gradient.len() < medium.gradient.len());
        assert!(medium.gradient.len() < high.gradient.len());
    }

    #[test]
    fn synthesis_is_deterministic_across_banks() {
        let a = MaterialBank::new().get_or_create(
            MaterialKind::Smoke,
            ColorBias::Green,
            QualityTier::Medium,
        );
        let b = MaterialBank::new().get_or_create(
            MaterialKind::Smoke,
            ColorBias::Green,
            QualityTier::Medium,
        );
        assert_eq!(*a, *b);
    }

    #[test]
    fn ids_encode_the_key() {
        let bank = MaterialBank::new();
        let d = bank.get_or_create(MaterialKind::Debris, ColorBias::Yellow, QualityTier::Quick);
        assert_eq!(d.id, "debris/yellow/quick");
    }

    #[test]
    fn smoke_does_not_emit() {
        let bank = MaterialBank::new();
        let smoke = bank.get_or_create(MaterialKind::Smoke, ColorBias::Orange, QualityTier::High);
        let fire = bank.get_or_create(MaterialKind::Fire, ColorBias::Orange, QualityTier::High);
        assert_eq!(smoke.emission_strength, 0.0);
        assert!(fire.emission_strength > 0.0);
    }
}
