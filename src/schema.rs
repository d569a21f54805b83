//! Boundary schema validation for batch documents.
//!
//! Collects every violation in one pass so authors see the full picture
//! before anything is compiled.

use std::collections::HashSet;
use std::fmt;

use crate::model::{DEBRIS_HINT_RANGE, EffectBatch, EffectSpec, FIRE_HINT_RANGE, INTENSITY_MAX};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SchemaPathElem {
    Field(&'static str),
    Index(usize),
}

#[derive(Debug, Clone)]
pub(crate) struct SchemaError {
    pub(crate) path: Vec<SchemaPathElem>,
    pub(crate) message: String,
}

impl SchemaError {
    fn at(path: &[SchemaPathElem], message: impl Into<String>) -> Self {
        Self {
            path: path.to_vec(),
            message: message.into(),
        }
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            return write!(f, "{}", self.message);
        }
        write!(f, "{}: {}", format_path(&self.path), self.message)
    }
}

fn format_path(path: &[SchemaPathElem]) -> String {
    let mut s = String::from("$");
    for p in path {
        match *p {
            SchemaPathElem::Field(name) => {
                s.push('.');
                s.push_str(name);
            }
            SchemaPathElem::Index(i) => {
                s.push('[');
                s.push_str(&i.to_string());
                s.push(']');
            }
        }
    }
    s
}

#[derive(Debug, Clone)]
pub(crate) struct SchemaErrors {
    pub(crate) errors: Vec<SchemaError>,
}

impl fmt::Display for SchemaErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}

impl std::error::Error for SchemaErrors {}

pub(crate) fn validate_batch(batch: &EffectBatch) -> Result<(), SchemaErrors> {
    let mut errors = Vec::new();

    validate_settings(batch, &mut errors);

    let mut ids = HashSet::<&str>::new();
    for (i, spec) in batch.specs.iter().enumerate() {
        let path = [SchemaPathElem::Field("specs"), SchemaPathElem::Index(i)];
        if spec.id.trim().is_empty() {
            errors.push(SchemaError::at(
                &[path.as_slice(), &[SchemaPathElem::Field("id")]].concat(),
                "spec id must be non-empty",
            ));
        } else if !ids.insert(spec.id.as_str()) {
            errors.push(SchemaError::at(
                &[path.as_slice(), &[SchemaPathElem::Field("id")]].concat(),
                format!("duplicate spec id \"{}\"", spec.id),
            ));
        }
        validate_spec_fields(spec, batch.settings.duration_frames, &path, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(SchemaErrors { errors })
    }
}

fn validate_settings(batch: &EffectBatch, errors: &mut Vec<SchemaError>) {
    let settings = [SchemaPathElem::Field("settings")];
    if batch.settings.duration_frames == 0 {
        errors.push(SchemaError::at(
            &[
                settings.as_slice(),
                &[SchemaPathElem::Field("duration_frames")],
            ]
            .concat(),
            "scene duration must be > 0 frames",
        ));
    }
    if batch.settings.resolution.width == 0 || batch.settings.resolution.height == 0 {
        errors.push(SchemaError::at(
            &[settings.as_slice(), &[SchemaPathElem::Field("resolution")]].concat(),
            "resolution width/height must be > 0",
        ));
    }
    if batch.settings.fps.num == 0 || batch.settings.fps.den == 0 {
        errors.push(SchemaError::at(
            &[settings.as_slice(), &[SchemaPathElem::Field("fps")]].concat(),
            "fps must have num > 0 and den > 0",
        ));
    }
    if batch.settings.engine.trim().is_empty() {
        errors.push(SchemaError::at(
            &[settings.as_slice(), &[SchemaPathElem::Field("engine")]].concat(),
            "engine name must be non-empty",
        ));
    }
}

fn validate_spec_fields(
    spec: &EffectSpec,
    scene_frames: u64,
    path: &[SchemaPathElem],
    errors: &mut Vec<SchemaError>,
) {
    if spec.duration_frames == 0 {
        errors.push(SchemaError::at(
            &[path, &[SchemaPathElem::Field("duration_frames")]].concat(),
            "duration_frames must be > 0",
        ));
    }
    match spec.start_frame.checked_add(spec.duration_frames) {
        Some(end) if end <= scene_frames => {}
        Some(end) => errors.push(SchemaError::at(
            &[path, &[SchemaPathElem::Field("start_frame")]].concat(),
            format!(
                "start_frame + duration_frames ({end}) exceeds scene frame range ({scene_frames})"
            ),
        )),
        None => errors.push(SchemaError::at(
            &[path, &[SchemaPathElem::Field("start_frame")]].concat(),
            "start_frame + duration_frames overflows",
        )),
    }
    if !spec.intensity.is_finite() || spec.intensity < 0.0 || spec.intensity > INTENSITY_MAX {
        errors.push(SchemaError::at(
            &[path, &[SchemaPathElem::Field("intensity")]].concat(),
            format!("intensity must be within [0, {INTENSITY_MAX}]"),
        ));
    }
    if spec.fire_particle_hint < FIRE_HINT_RANGE.0 || spec.fire_particle_hint > FIRE_HINT_RANGE.1 {
        errors.push(SchemaError::at(
            &[path, &[SchemaPathElem::Field("fire_particle_hint")]].concat(),
            format!(
                "fire_particle_hint must be within [{}, {}]",
                FIRE_HINT_RANGE.0, FIRE_HINT_RANGE.1
            ),
        ));
    }
    if spec.debris_particle_hint < DEBRIS_HINT_RANGE.0
        || spec.debris_particle_hint > DEBRIS_HINT_RANGE.1
    {
        errors.push(SchemaError::at(
            &[path, &[SchemaPathElem::Field("debris_particle_hint")]].concat(),
            format!(
                "debris_particle_hint must be within [{}, {}]",
                DEBRIS_HINT_RANGE.0, DEBRIS_HINT_RANGE.1
            ),
        ));
    }
}
