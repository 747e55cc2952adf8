//! Body identities stored in Rapier's `user_data`.
//!
//! Rapier hands collision events over as collider handles only. Every body the field spawns
//! carries a tag in its `user_data` (and its collider's) saying what it is and which one, so
//! the collision arbiter can find the cube behind a contact without keeping a handle map.
//!
//! A tag holds the per-kind id in its low 64 bits and the [`BodyKind`] in the next byte. The
//! remaining high bits stay zero. Kind values start at 1, which keeps every tag distinct from
//! the `0` Rapier gives untagged bodies.

/// Packed `(kind, id)` identity, as written to `user_data`.
pub type BodyTag = u128;

/// Id within a kind. Cubes use their grid [`CubeId`](crate::grid::CubeId), surfaces their
/// world-static id.
pub type BodyId = u64;

const KIND_SHIFT: u32 = BodyId::BITS;
const ID_MASK: u128 = BodyId::MAX as u128;
const KIND_MASK: u128 = u8::MAX as u128;
const USED_BITS: u32 = KIND_SHIFT + u8::BITS;

/// What a tagged body is. The discriminants are stored in tags and must stay stable.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BodyKind {
    Cube = 1,
    Surface = 2,
    Pointer = 3,
}

impl BodyKind {
    fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            1 => Some(Self::Cube),
            2 => Some(Self::Surface),
            3 => Some(Self::Pointer),
            _ => None,
        }
    }
}

pub fn pack_tag(id: BodyId, kind: BodyKind) -> BodyTag {
    u128::from(id) | (u128::from(kind as u8) << KIND_SHIFT)
}

/// Id half of a tag, whatever its kind.
pub fn unpack_id(tag: BodyTag) -> BodyId {
    (tag & ID_MASK) as BodyId
}

/// Reads a tag back into `(kind, id)`.
///
/// Untagged bodies, unknown kinds and tags with stray high bits all come back as `None`.
pub fn decode_tag(tag: BodyTag) -> Option<(BodyKind, BodyId)> {
    if tag >> USED_BITS != 0 {
        return None;
    }
    let kind = BodyKind::from_bits(((tag >> KIND_SHIFT) & KIND_MASK) as u8)?;
    Some((kind, unpack_id(tag)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_and_id_survives_packing() {
        let ids: [BodyId; 5] = [0, 1, 47, u32::MAX as u64, u64::MAX];
        let kinds = [BodyKind::Cube, BodyKind::Surface, BodyKind::Pointer];

        for &id in &ids {
            for &kind in &kinds {
                let tag = pack_tag(id, kind);

                assert_eq!(unpack_id(tag), id);
                assert_eq!(decode_tag(tag), Some((kind, id)));
            }
        }
    }

    #[test]
    fn untagged_body_decodes_to_nothing() {
        assert_eq!(decode_tag(0), None);
        assert_eq!(decode_tag(47), None);
    }

    #[test]
    fn first_cube_is_not_mistaken_for_untagged() {
        let tag = pack_tag(0, BodyKind::Cube);
        assert_ne!(tag, 0);
        assert_eq!(decode_tag(tag), Some((BodyKind::Cube, 0)));
    }

    #[test]
    fn unknown_kind_or_high_bits_are_rejected() {
        assert_eq!(decode_tag(4u128 << KIND_SHIFT), None);
        assert_eq!(decode_tag(pack_tag(3, BodyKind::Surface) | (1u128 << 90)), None);
    }
}
