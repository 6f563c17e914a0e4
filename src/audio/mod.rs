//! Audio source resolution and single-active playback.

pub mod element;
pub mod memo;
pub mod playback;
pub mod resolver;
pub mod source;

pub use element::{HttpProbeElement, LoadSignal, PlayError, PlaybackElement, SharedElement};
pub use memo::{AudioAvailabilityMemo, AudioKey};
pub use playback::{PlayOutcome, PlaybackManager, PlaybackPhase, PlaybackToken, VersePlayer};
pub use resolver::{AudioResolver, Resolution};
pub use source::{AudioCandidateSet, AudioSource};
