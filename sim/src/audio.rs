use std::collections::HashMap;

use cube_field::{AudioCue, AudioSink, Clip, CueSource};

/// Audio sink that logs each cue and keeps a tally per clip.
#[derive(Debug, Default)]
pub struct LogAudio {
    played: HashMap<Clip, usize>,
}

impl LogAudio {
    pub fn count(&self, clip: Clip) -> usize {
        self.played.get(&clip).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.played.values().sum()
    }
}

impl AudioSink for LogAudio {
    fn play_once(&mut self, cue: AudioCue) {
        *self.played.entry(cue.clip).or_default() += 1;
        match cue.source {
            CueSource::Field => log::info!("audio: {:?}", cue.clip),
            // Bounces are frequent; keep them out of the default output.
            CueSource::Cube(id) => log::debug!("audio: {:?} from cube {id}", cue.clip),
        }
    }
}
