//! WAV Codec - PCM WAV 解析与封装
//!
//! - decode: 手动解析 RIFF/WAVE，取出 fmt 与 data chunk
//! - encode: 写出标准 44 字节头的 PCM WAV
//! - probe:  交给 symphonia 做独立校验

use std::io::Cursor;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::application::ports::{AudioCodecPort, AudioInfo, CodecError, DecodedClip};
use crate::domain::PcmFormat;

/// PCM 整数
const FORMAT_TAG_PCM: u16 = 0x0001;
/// WAVE_FORMAT_EXTENSIBLE
const FORMAT_TAG_EXTENSIBLE: u16 = 0xFFFE;

const RIFF_HEADER_LEN: usize = 12;
const CHUNK_HEADER_LEN: usize = 8;

/// fmt chunk 中用到的字段
#[derive(Debug, Clone, Copy)]
struct FmtChunk {
    audio_format: u16,
    num_channels: u16,
    sample_rate: u32,
    bits_per_sample: u16,
}

/// WAV 文件头
#[derive(Debug)]
struct WavHeader {
    fmt: FmtChunk,
    data_start: usize,
    data_size: usize,
}

fn read_u16(data: &[u8], pos: usize) -> u16 {
    u16::from_le_bytes([data[pos], data[pos + 1]])
}

fn read_u32(data: &[u8], pos: usize) -> u32 {
    u32::from_le_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]])
}

/// WAV 编解码器
#[derive(Debug, Clone, Copy, Default)]
pub struct WavCodec;

impl WavCodec {
    pub fn new() -> Self {
        Self
    }

    /// 解析 WAV 文件头
    fn parse_wav_header(&self, data: &[u8]) -> Result<WavHeader, CodecError> {
        if data.len() < RIFF_HEADER_LEN {
            return Err(CodecError::InvalidInput("WAV data too short".to_string()));
        }

        if &data[0..4] != b"RIFF" {
            return Err(CodecError::InvalidInput(
                "Invalid WAV: missing RIFF header".to_string(),
            ));
        }

        if &data[8..12] != b"WAVE" {
            return Err(CodecError::InvalidInput(
                "Invalid WAV: missing WAVE identifier".to_string(),
            ));
        }

        let mut pos = RIFF_HEADER_LEN;
        let mut fmt_chunk: Option<FmtChunk> = None;
        let mut data_chunk: Option<(usize, usize)> = None;

        while pos + CHUNK_HEADER_LEN <= data.len() {
            let chunk_id = &data[pos..pos + 4];
            let chunk_size = read_u32(data, pos + 4) as usize;
            let body_start = pos + CHUNK_HEADER_LEN;

            match chunk_id {
                b"fmt " => {
                    if chunk_size < 16 || body_start + 16 > data.len() {
                        return Err(CodecError::InvalidInput(
                            "Invalid fmt chunk size".to_string(),
                        ));
                    }
                    fmt_chunk = Some(FmtChunk {
                        audio_format: read_u16(data, body_start),
                        num_channels: read_u16(data, body_start + 2),
                        sample_rate: read_u32(data, body_start + 4),
                        bits_per_sample: read_u16(data, body_start + 14),
                    });
                }
                b"data" => {
                    // 声明长度超过实际字节时按实际长度截断
                    let available = data.len() - body_start;
                    data_chunk = Some((body_start, chunk_size.min(available)));
                    break;
                }
                _ => {}
            }

            pos = body_start.saturating_add(chunk_size);
            // 对齐到偶数字节
            if chunk_size % 2 != 0 {
                pos = pos.saturating_add(1);
            }
        }

        let fmt = fmt_chunk.ok_or_else(|| {
            CodecError::InvalidInput("Invalid WAV: missing fmt chunk".to_string())
        })?;

        let (data_start, data_size) = data_chunk.ok_or_else(|| {
            CodecError::InvalidInput("Invalid WAV: missing data chunk".to_string())
        })?;

        Ok(WavHeader {
            fmt,
            data_start,
            data_size,
        })
    }

    /// 写出 PCM WAV
    fn encode_wav(&self, format: &PcmFormat, frames: &[u8]) -> Result<Vec<u8>, CodecError> {
        if !format.is_valid() {
            return Err(CodecError::EncodingError(format!(
                "Invalid PCM format: {}",
                format
            )));
        }

        let data_size = u32::try_from(frames.len()).map_err(|_| {
            CodecError::EncodingError(format!(
                "Audio data too large for WAV: {} bytes",
                frames.len()
            ))
        })?;
        let file_size = data_size.checked_add(36).ok_or_else(|| {
            CodecError::EncodingError("Audio data too large for WAV".to_string())
        })?;

        let mut wav = Vec::with_capacity(44 + frames.len());

        // RIFF header
        wav.extend_from_slice(b"RIFF");
        wav.extend_from_slice(&file_size.to_le_bytes());
        wav.extend_from_slice(b"WAVE");

        // fmt chunk
        wav.extend_from_slice(b"fmt ");
        wav.extend_from_slice(&16u32.to_le_bytes());
        wav.extend_from_slice(&FORMAT_TAG_PCM.to_le_bytes());
        wav.extend_from_slice(&format.channels.to_le_bytes());
        wav.extend_from_slice(&format.sample_rate.to_le_bytes());
        wav.extend_from_slice(&format.byte_rate().to_le_bytes());
        wav.extend_from_slice(&format.block_align().to_le_bytes());
        wav.extend_from_slice(&format.bits_per_sample.to_le_bytes());

        // data chunk
        wav.extend_from_slice(b"data");
        wav.extend_from_slice(&data_size.to_le_bytes());
        wav.extend_from_slice(frames);

        Ok(wav)
    }
}

impl AudioCodecPort for WavCodec {
    fn decode(&self, data: &[u8]) -> Result<DecodedClip, CodecError> {
        let header = self.parse_wav_header(data)?;

        match header.fmt.audio_format {
            FORMAT_TAG_PCM | FORMAT_TAG_EXTENSIBLE => {}
            other => return Err(CodecError::UnsupportedEncoding(other)),
        }

        let format = PcmFormat::new(
            header.fmt.sample_rate,
            header.fmt.num_channels,
            header.fmt.bits_per_sample,
        );
        if !format.is_valid() {
            return Err(CodecError::InvalidInput(format!(
                "Invalid WAV format: {}",
                format
            )));
        }

        // 只保留完整帧，残缺的尾帧会让后续分片错位
        let block_align = format.block_align() as usize;
        let whole_size = header.data_size - header.data_size % block_align;
        let frames = data[header.data_start..header.data_start + whole_size].to_vec();

        Ok(DecodedClip { format, frames })
    }

    fn encode(&self, format: &PcmFormat, frames: &[u8]) -> Result<Vec<u8>, CodecError> {
        self.encode_wav(format, frames)
    }

    fn probe(&self, data: &[u8]) -> Result<AudioInfo, CodecError> {
        let cursor = Cursor::new(data.to_vec());
        let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

        let mut hint = Hint::new();
        hint.with_extension("wav");

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| CodecError::DecodingError(format!("Probe failed: {}", e)))?;

        let mut reader = probed.format;

        let track = reader
            .default_track()
            .ok_or_else(|| CodecError::DecodingError("No audio track found".to_string()))?;

        let track_id = track.id;
        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| CodecError::DecodingError("Unknown sample rate".to_string()))?;
        let channels = track
            .codec_params
            .channels
            .map(|c| c.count() as u16)
            .ok_or_else(|| CodecError::DecodingError("Unknown channel count".to_string()))?;
        let declared_frames = track.codec_params.n_frames;

        let frames = match declared_frames {
            Some(n) => n,
            None => {
                // 头部未声明帧数时逐包累加
                let mut total = 0u64;
                loop {
                    match reader.next_packet() {
                        Ok(packet) if packet.track_id() == track_id => total += packet.dur(),
                        Ok(_) => {}
                        Err(symphonia::core::errors::Error::IoError(e))
                            if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                        {
                            break;
                        }
                        Err(e) => {
                            return Err(CodecError::DecodingError(format!(
                                "Packet read error: {}",
                                e
                            )));
                        }
                    }
                }
                total
            }
        };

        let duration_secs = if sample_rate > 0 {
            frames as f64 / sample_rate as f64
        } else {
            0.0
        };

        Ok(AudioInfo {
            sample_rate,
            channels,
            frames,
            duration_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(format: &PcmFormat, frames: usize) -> Vec<u8> {
        (0..frames * format.block_align() as usize)
            .map(|i| (i % 251) as u8)
            .collect()
    }

    #[test]
    fn test_encode_then_decode_preserves_format_and_frames() {
        let codec = WavCodec::new();
        let format = PcmFormat::new(24000, 1, 16);
        let frames = tone(&format, 480);

        let wav = codec.encode(&format, &frames).unwrap();
        assert_eq!(wav.len(), 44 + frames.len());
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(read_u32(&wav, 4) as usize, wav.len() - 8);

        let clip = codec.decode(&wav).unwrap();
        assert_eq!(clip.format, format);
        assert_eq!(clip.frames, frames);
    }

    #[test]
    fn test_decode_skips_unknown_chunks() {
        let codec = WavCodec::new();
        let format = PcmFormat::new(16000, 2, 16);
        let frames = tone(&format, 10);
        let plain = codec.encode(&format, &frames).unwrap();

        // 在 fmt 与 data 之间插入一个奇数长度的 LIST chunk
        let mut wav = plain[..36].to_vec();
        wav.extend_from_slice(b"LIST");
        wav.extend_from_slice(&3u32.to_le_bytes());
        wav.extend_from_slice(b"abc\0");
        wav.extend_from_slice(&plain[36..]);

        let clip = codec.decode(&wav).unwrap();
        assert_eq!(clip.format, format);
        assert_eq!(clip.frames, frames);
    }

    #[test]
    fn test_decode_clamps_oversized_data_chunk() {
        let codec = WavCodec::new();
        let format = PcmFormat::new(8000, 1, 16);
        let mut wav = codec.encode(&format, &[1, 2, 3, 4]).unwrap();
        wav[40..44].copy_from_slice(&u32::MAX.to_le_bytes());

        let clip = codec.decode(&wav).unwrap();
        assert_eq!(clip.frames, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_decode_drops_trailing_partial_frame() {
        let codec = WavCodec::new();
        let format = PcmFormat::new(44100, 1, 16);
        let wav = codec.encode(&format, &[1, 0, 2, 0, 9]).unwrap();

        let clip = codec.decode(&wav).unwrap();
        assert_eq!(clip.frames, vec![1, 0, 2, 0]);
    }

    #[test]
    fn test_decode_rejects_overflowing_channel_count() {
        let codec = WavCodec::new();
        let mut wav = codec
            .encode(&PcmFormat::new(44100, 1, 16), &[0; 8])
            .unwrap();
        wav[22..24].copy_from_slice(&40000u16.to_le_bytes());

        let err = codec.decode(&wav).unwrap_err();
        assert!(matches!(err, CodecError::InvalidInput(ref m) if m.contains("40000ch")));
    }

    #[test]
    fn test_decode_rejects_zero_channels() {
        let codec = WavCodec::new();
        let mut wav = codec
            .encode(&PcmFormat::new(44100, 1, 16), &[0; 8])
            .unwrap();
        wav[22..24].copy_from_slice(&0u16.to_le_bytes());

        assert!(matches!(
            codec.decode(&wav),
            Err(CodecError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_encode_rejects_invalid_format() {
        let codec = WavCodec::new();
        assert!(matches!(
            codec.encode(&PcmFormat::new(44100, 40000, 16), &[]),
            Err(CodecError::EncodingError(_))
        ));
    }

    #[test]
    fn test_decode_rejects_non_pcm() {
        let codec = WavCodec::new();
        let mut wav = codec
            .encode(&PcmFormat::new(8000, 1, 32), &[0; 8])
            .unwrap();
        // IEEE float
        wav[20..22].copy_from_slice(&3u16.to_le_bytes());

        let err = codec.decode(&wav).unwrap_err();
        assert!(matches!(err, CodecError::UnsupportedEncoding(3)));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let codec = WavCodec::new();
        assert!(matches!(
            codec.decode(b"not a wav"),
            Err(CodecError::InvalidInput(_))
        ));
        assert!(matches!(
            codec.decode(b"RIFF\0\0\0\0AVI LIST"),
            Err(CodecError::InvalidInput(_))
        ));

        // 只有 fmt，没有 data
        let wav = codec.encode(&PcmFormat::new(8000, 1, 16), &[]).unwrap();
        let truncated = &wav[..36];
        assert!(matches!(
            codec.decode(truncated),
            Err(CodecError::InvalidInput(ref m)) if m.contains("data")
        ));
    }

    #[test]
    fn test_probe_reports_frames_and_duration() {
        let codec = WavCodec::new();
        let format = PcmFormat::new(22050, 1, 16);
        let wav = codec.encode(&format, &tone(&format, 22050 * 2)).unwrap();

        let info = codec.probe(&wav).unwrap();
        assert_eq!(info.sample_rate, 22050);
        assert_eq!(info.channels, 1);
        assert_eq!(info.frames, 22050 * 2);
        assert!((info.duration_secs - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_probe_rejects_garbage() {
        let codec = WavCodec::new();
        assert!(matches!(
            codec.probe(b"definitely not audio"),
            Err(CodecError::DecodingError(_))
        ));
    }
}
