//! Collision audio arbitration.
//!
//! Each collision start is offered to every cube taking part in it. The receiving cube then
//! decides, on its own, whether it plays a cue:
//!
//! 1. A returning (kinematic) receiver stays silent.
//! 2. Touching the pointer proxy is silent.
//! 3. Against another cube, only the receiver with the larger id plays `BounceTogether`, so a
//!    pair yields exactly one cue.
//! 4. Against anything else, `BounceOther` plays if the relative speed is above the noise
//!    threshold.
//!
//! Rapier reports a pair once, so [`resolve`] offers the event to both sides itself. Engines
//! that report each participant separately can call [`arbitrate`] per delivery instead.

use crate::audio::{AudioCue, Clip};
use crate::body_tag::{BodyKind, decode_tag};
use crate::cube::Cube;
use crate::field::Field;
use crate::grid::CubeId;
use crate::physics::{CollisionBegin, Contact};
use crate::types::Vec3;

/// What the receiving cube hit.
#[derive(Clone, Copy, Debug)]
pub enum Other<'a> {
    Cube(&'a Cube),
    Pointer,
    /// A static surface or any other non-cube body.
    Surface,
    /// A cube that is no longer part of the live field.
    Missing,
}

/// Decide the cue (if any) `receiver` plays for a collision with `other`.
pub fn arbitrate(
    receiver: &Cube,
    other: Other<'_>,
    relative_velocity: &Vec3,
    velocity_threshold: f32,
) -> Option<AudioCue> {
    if receiver.is_returning() {
        return None;
    }

    match other {
        Other::Pointer | Other::Missing => None,
        Other::Cube(other) => (other.id() < receiver.id())
            .then(|| AudioCue::from_cube(receiver.id(), Clip::BounceTogether)),
        Other::Surface => (relative_velocity.norm() > velocity_threshold)
            .then(|| AudioCue::from_cube(receiver.id(), Clip::BounceOther)),
    }
}

/// Map a collision participant onto the live field.
///
/// A cube tag whose body no longer matches the field (destroyed, or a rebuilt grid reusing
/// the id) is reported as missing.
fn classify<'a>(field: &'a Field, contact: &Contact) -> Other<'a> {
    match contact.tag.and_then(decode_tag) {
        Some((BodyKind::Cube, id)) => live_cube(field, contact, id)
            .map(Other::Cube)
            .unwrap_or(Other::Missing),
        Some((BodyKind::Pointer, _)) => Other::Pointer,
        Some((BodyKind::Surface, _)) | None => Other::Surface,
    }
}

fn live_cube<'a>(field: &'a Field, contact: &Contact, id: u64) -> Option<&'a Cube> {
    let id = CubeId::try_from(id).ok()?;
    field
        .get(id)
        .filter(|cube| contact.body.is_none_or(|body| body == cube.body()))
}

/// Cues produced by one collision start, evaluated from both participants' side.
pub fn resolve(field: &Field, event: &CollisionBegin, velocity_threshold: f32) -> Vec<AudioCue> {
    let a = classify(field, &event.a);
    let b = classify(field, &event.b);

    let mut cues = Vec::new();
    if let Other::Cube(receiver) = a {
        cues.extend(arbitrate(receiver, b, &event.relative_velocity, velocity_threshold));
    }
    if let Other::Cube(receiver) = b {
        let relative_velocity = -event.relative_velocity;
        cues.extend(arbitrate(receiver, a, &relative_velocity, velocity_threshold));
    }
    cues
}
