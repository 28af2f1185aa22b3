//! Audio Codec Adapters

mod wav_codec;

pub use wav_codec::WavCodec;
