//! Polyphonic voice allocation with voice stealing.

/// Highest MIDI note number.
pub const MAX_NOTE: u8 = 127;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    Idle,
    Active,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    pub state: VoiceState,
    /// Value of the allocator's event counter when this voice last started
    /// or stopped.
    pub last_transition: u64,
    /// Last note played on this voice. Kept after release until the voice is
    /// reused.
    pub note: Option<u8>,
}

impl Voice {
    fn new() -> Self {
        Self {
            state: VoiceState::Idle,
            last_transition: 0,
            note: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state == VoiceState::Active
    }
}

/// Assigns notes to a fixed pool of voices.
///
/// A note already mapped to a voice goes back to that voice. Otherwise idle
/// voices win over active ones, and among equals the voice touched least
/// recently is taken.
#[derive(Debug, Clone)]
pub struct VoiceAllocator {
    voices: Vec<Voice>,
    note_map: [Option<usize>; MAX_NOTE as usize + 1],
    clock: u64,
}

impl VoiceAllocator {
    pub fn new(count: usize) -> Self {
        Self {
            voices: (0..count).map(|_| Voice::new()).collect(),
            note_map: [None; MAX_NOTE as usize + 1],
            clock: 0,
        }
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn any_active(&self) -> bool {
        self.voices.iter().any(Voice::is_active)
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Start `note` and return the voice it plays on.
    pub fn assign(&mut self, note: u8) -> usize {
        let key = usize::from(note.min(MAX_NOTE));
        let index = match self.note_map[key] {
            Some(index) => index,
            None => {
                let index = self
                    .voices
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, v)| (v.is_active(), v.last_transition))
                    .map(|(i, _)| i)
                    .unwrap_or(0);
                if let Some(previous) = self.voices[index].note {
                    self.note_map[usize::from(previous)] = None;
                }
                self.note_map[key] = Some(index);
                index
            }
        };
        let now = self.tick();
        let voice = &mut self.voices[index];
        voice.state = VoiceState::Active;
        voice.last_transition = now;
        voice.note = Some(note.min(MAX_NOTE));
        index
    }

    /// Stop `note`. Returns the voice that was playing it, if any.
    pub fn release(&mut self, note: u8) -> Option<usize> {
        let index = self.note_map[usize::from(note.min(MAX_NOTE))]?;
        if !self.voices[index].is_active() {
            return None;
        }
        let now = self.tick();
        let voice = &mut self.voices[index];
        voice.state = VoiceState::Idle;
        voice.last_transition = now;
        Some(index)
    }

    /// Stop every voice and forget all note assignments.
    pub fn release_all(&mut self) {
        let now = self.tick();
        for voice in &mut self.voices {
            voice.state = VoiceState::Idle;
            voice.last_transition = now;
            voice.note = None;
        }
        self.note_map = [None; MAX_NOTE as usize + 1];
    }
}
