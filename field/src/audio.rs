use crate::grid::CubeId;

/// Sound clips the field can request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Clip {
    /// A new grid has been spawned.
    Ready,
    /// Two cubes hit each other.
    BounceTogether,
    /// A cube hit something that is not a cube.
    BounceOther,
    /// A single cube starts returning to its origin.
    ComeBack,
    /// The whole field starts returning.
    ReturnAll,
}

/// Where a cue is emitted from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CueSource {
    Field,
    Cube(CubeId),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AudioCue {
    pub clip: Clip,
    pub source: CueSource,
}

impl AudioCue {
    #[inline]
    pub fn from_field(clip: Clip) -> Self {
        Self {
            clip,
            source: CueSource::Field,
        }
    }

    #[inline]
    pub fn from_cube(id: CubeId, clip: Clip) -> Self {
        Self {
            clip,
            source: CueSource::Cube(id),
        }
    }
}

/// One-shot playback. Fire-and-forget: nothing waits for a cue to finish.
pub trait AudioSink {
    fn play_once(&mut self, cue: AudioCue);
}

/// Records cues in order.
impl AudioSink for Vec<AudioCue> {
    fn play_once(&mut self, cue: AudioCue) {
        self.push(cue);
    }
}

impl<S: AudioSink + ?Sized> AudioSink for &mut S {
    fn play_once(&mut self, cue: AudioCue) {
        (**self).play_once(cue);
    }
}
