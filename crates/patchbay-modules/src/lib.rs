//! Built-in processing modules for patchbay.
//!
//! Every module here is a thin parameter wrapper around the external
//! signal engine: it creates its engine nodes, exposes them as named
//! ports, maps option changes onto engine calls, and frees everything in
//! `dispose`. The interesting machinery — wiring, message transport,
//! resource reference counting — lives in `patchbay-core`.
//!
//! # Modules
//!
//! | category | ports | role |
//! |---|---|---|
//! | [`oscillator`](OscillatorModule) | signal out + frequency param in | free-running source |
//! | [`gain`](GainModule) | signal in/out + gain param in | amplifier |
//! | [`speaker-output`](SpeakerOutputModule) | signal in | terminal destination |
//! | [`clock`](ClockModule) | message out | bpm tick source |
//! | [`logger`](LoggerModule) | message in | message sink for debugging |
//! | [`msg-to-signal`](MessageToSignalModule) | message in, signal out | discrete → stepped signal |
//! | [`player`](PlayerModule) | 2 message in, signal out | sample playback |

mod clock;
mod gain;
mod logger;
mod message_to_signal;
mod oscillator;
mod player;
mod speaker_output;

pub use clock::{ClockModule, ClockOptions};
pub use gain::{GainModule, GainOptions};
pub use logger::{LoggerModule, LoggerOptions};
pub use message_to_signal::{MessageToSignalModule, MessageToSignalOptions};
pub use oscillator::{OscillatorModule, OscillatorOptions};
pub use player::{PlayerModule, PlayerOptions};
pub use speaker_output::{SpeakerOutputModule, SpeakerOutputOptions};
