//! PCM → delivery format transcoding capability.

use crate::error::Result;

/// Encodes a completed PCM16 segment into the participant's playback format.
///
/// Input is little-endian 16-bit mono PCM. Implementations report failures;
/// callers never retry.
pub trait Transcoder: Send + Sync {
    /// Short format name for logs, e.g. `wav`.
    fn format_name(&self) -> &'static str;

    fn encode(&self, pcm: &[u8]) -> Result<Vec<u8>>;
}

/// Hands PCM through unchanged, for players that consume raw samples.
#[derive(Debug, Clone, Copy, Default)]
pub struct PcmPassthrough;

impl Transcoder for PcmPassthrough {
    fn format_name(&self) -> &'static str {
        "pcm16"
    }

    fn encode(&self, pcm: &[u8]) -> Result<Vec<u8>> {
        Ok(pcm.to_vec())
    }
}

/// Wraps PCM16 mono samples in a WAV container.
#[cfg(feature = "wav")]
#[derive(Debug, Clone, Copy)]
pub struct WavTranscoder {
    sample_rate: u32,
}

#[cfg(feature = "wav")]
impl WavTranscoder {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }
}

#[cfg(feature = "wav")]
impl Transcoder for WavTranscoder {
    fn format_name(&self) -> &'static str {
        "wav"
    }

    fn encode(&self, pcm: &[u8]) -> Result<Vec<u8>> {
        use crate::audio::buffer::SAMPLE_WIDTH;
        use crate::error::RelayError;

        if pcm.len() % SAMPLE_WIDTH != 0 {
            return Err(RelayError::Transcode(format!(
                "PCM16 segment of {} bytes ends mid-sample",
                pcm.len()
            )));
        }

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = std::io::Cursor::new(Vec::with_capacity(pcm.len() + 44));
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec)
                .map_err(|error| RelayError::Transcode(format!("WAV header failed: {error}")))?;
            for sample in pcm.chunks_exact(SAMPLE_WIDTH) {
                writer
                    .write_sample(i16::from_le_bytes([sample[0], sample[1]]))
                    .map_err(|error| RelayError::Transcode(format!("WAV write failed: {error}")))?;
            }
            writer
                .finalize()
                .map_err(|error| RelayError::Transcode(format!("WAV finalize failed: {error}")))?;
        }
        Ok(cursor.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_returns_input() {
        assert_eq!(PcmPassthrough.encode(&[1, 2, 3, 4]).unwrap(), vec![1, 2, 3, 4]);
    }

    #[cfg(feature = "wav")]
    #[test]
    fn wav_output_has_header_and_samples() {
        let pcm: Vec<u8> = [100i16, -100, 32767, -32768]
            .iter()
            .flat_map(|sample| sample.to_le_bytes())
            .collect();
        let wav = WavTranscoder::new(24_000).encode(&pcm).unwrap();
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert!(wav.len() > pcm.len());

        let reader = hound::WavReader::new(std::io::Cursor::new(wav)).unwrap();
        assert_eq!(reader.spec().sample_rate, 24_000);
        let samples: Vec<i16> = reader.into_samples().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![100, -100, 32767, -32768]);
    }

    #[cfg(feature = "wav")]
    #[test]
    fn wav_rejects_mid_sample_input() {
        let error = WavTranscoder::new(24_000).encode(&[1, 2, 3]).unwrap_err();
        assert!(matches!(error, crate::error::RelayError::Transcode(_)));
    }
}
