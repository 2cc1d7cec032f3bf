//! WAV processor
//!
//! Decodes a 44100 Hz mono or stereo WAV file, conditions the samples
//! (peak-normalize, trim silence at both ends, collapse dual mono), then
//! encodes one payload per requested audio format. The compressed formats
//! shell out to ffmpeg; the pipeline does not link codec libraries.

use std::collections::BTreeMap;
use std::io::Cursor;

use pp_core::{AudioFormat, BuildError, ContentItem, GeneratedItems};
use tokio::process::Command;
use tracing::debug;

use crate::ProcessContext;

const SAMPLE_RATE: u32 = 44100;
const SILENCE_THRESHOLD: f32 = 0.02;

pub(crate) async fn process(ctx: &ProcessContext<'_>) -> Result<GeneratedItems, BuildError> {
    let bytes = tokio::fs::read(ctx.source_path)
        .await
        .map_err(|error| BuildError::io(ctx.logical_path, error))?;

    let mut channels =
        decode(&bytes).map_err(|reason| BuildError::processor(ctx.logical_path, reason))?;
    condition(&mut channels).map_err(|reason| BuildError::processor(ctx.logical_path, reason))?;

    let mut payload_by_format = BTreeMap::new();
    for format in ctx.audio_formats {
        debug!(path = ctx.logical_path, format = %format, "encoding");
        payload_by_format.insert(*format, encode(&channels, *format, ctx.logical_path).await?);
    }

    let mut items = GeneratedItems::new();
    items.insert(
        ctx.stem.to_owned(),
        ContentItem::Audio {
            code: "engineAudio".to_owned(),
            payload_by_format,
        },
    );
    Ok(items)
}

/// Decodes WAV bytes into per-channel f32 samples in `[-1, 1]`.
fn decode(bytes: &[u8]) -> Result<Vec<Vec<f32>>, String> {
    let mut reader =
        hound::WavReader::new(Cursor::new(bytes)).map_err(|error| error.to_string())?;
    let spec = reader.spec();

    if spec.sample_rate != SAMPLE_RATE {
        return Err(format!(
            "uses a sample rate of {}; {SAMPLE_RATE} was expected",
            spec.sample_rate
        ));
    }
    if spec.channels < 1 {
        return Err("contains no audio channels".to_owned());
    }
    if spec.channels > 2 {
        return Err("contains more than two audio channels".to_owned());
    }

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(|error| error.to_string())?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|sample| sample.map(|sample| sample as f32 / scale))
                .collect::<Result<_, _>>()
                .map_err(|error| error.to_string())?
        }
    };

    let channel_count = spec.channels as usize;
    let mut channels = vec![Vec::with_capacity(interleaved.len() / channel_count); channel_count];
    for frame in interleaved.chunks_exact(channel_count) {
        for (channel, sample) in channels.iter_mut().zip(frame) {
            channel.push(*sample);
        }
    }
    Ok(channels)
}

/// Normalizes peak gain to 1.0, trims leading and trailing samples quieter
/// than the silence threshold, and collapses dual mono to mono.
fn condition(channels: &mut Vec<Vec<f32>>) -> Result<(), String> {
    let peak = channels
        .iter()
        .flatten()
        .fold(0.0f32, |peak, sample| peak.max(sample.abs()));
    if peak == 0.0 {
        return Err("this file is silent".to_owned());
    }
    if peak < 1.0 {
        debug!(peak, "boosting gain");
        for channel in channels.iter_mut() {
            for sample in channel.iter_mut() {
                *sample /= peak;
            }
        }
    }

    let loud = |sample: &f32| sample.abs() >= SILENCE_THRESHOLD;
    let leading = channels
        .iter()
        .map(|channel| channel.iter().position(loud).unwrap_or(channel.len()))
        .min()
        .unwrap_or(0);
    let trailing = channels
        .iter()
        .map(|channel| match channel.iter().rposition(loud) {
            Some(last) => channel.len() - 1 - last,
            None => channel.len(),
        })
        .min()
        .unwrap_or(0);
    for channel in channels.iter_mut() {
        channel.truncate(channel.len() - trailing);
        channel.drain(..leading);
    }

    if let [left, right] = channels.as_slice() {
        let difference = left
            .iter()
            .zip(right)
            .fold(0.0f32, |diff, (l, r)| diff.max((l - r).abs()));
        if difference < SILENCE_THRESHOLD {
            debug!(difference, "dual mono detected, dropping to mono");
            channels.pop();
        }
    }
    Ok(())
}

fn write_wav(channels: &[Vec<f32>], bits_per_sample: u16) -> Result<Vec<u8>, String> {
    let spec = hound::WavSpec {
        channels: channels.len() as u16,
        sample_rate: SAMPLE_RATE,
        bits_per_sample,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|error| error.to_string())?;
        let frames = channels.first().map_or(0, Vec::len);
        for frame in 0..frames {
            for channel in channels {
                match bits_per_sample {
                    8 => {
                        let sample = (channel[frame] * 127.0).clamp(-127.0, 127.0) as i8;
                        writer.write_sample(sample).map_err(|error| error.to_string())?;
                    }
                    _ => {
                        let sample =
                            (channel[frame] * 32767.0).clamp(-32767.0, 32767.0) as i16;
                        writer.write_sample(sample).map_err(|error| error.to_string())?;
                    }
                }
            }
        }
        writer.finalize().map_err(|error| error.to_string())?;
    }
    Ok(cursor.into_inner())
}

/// Encodes the conditioned samples for one target format.
async fn encode(
    channels: &[Vec<f32>],
    format: AudioFormat,
    logical_path: &str,
) -> Result<Vec<u8>, BuildError> {
    match format {
        AudioFormat::None => Ok(Vec::new()),
        AudioFormat::Wav => write_wav(channels, 8)
            .map_err(|reason| BuildError::processor(logical_path, reason)),
        AudioFormat::Mp3 | AudioFormat::Ogg => {
            encode_with_ffmpeg(channels, format, logical_path).await
        }
    }
}

async fn encode_with_ffmpeg(
    channels: &[Vec<f32>],
    format: AudioFormat,
    logical_path: &str,
) -> Result<Vec<u8>, BuildError> {
    let (output_name, codec_args): (&str, &[&str]) = match format {
        AudioFormat::Mp3 => ("output.mp3", &["-codec:a", "libmp3lame", "-b:a", "192k"]),
        _ => ("output.ogg", &["-codec:a", "libvorbis", "-q:a", "5"]),
    };

    let dir = tempfile::tempdir().map_err(|error| BuildError::io(logical_path, error))?;
    let input = dir.path().join("input.wav");
    let output = dir.path().join(output_name);

    let wav = write_wav(channels, 16)
        .map_err(|reason| BuildError::processor(logical_path, reason))?;
    tokio::fs::write(&input, wav)
        .await
        .map_err(|error| BuildError::io(input.display().to_string(), error))?;

    let result = Command::new("ffmpeg")
        .args(["-hide_banner", "-loglevel", "error", "-y", "-i"])
        .arg(&input)
        .args(codec_args)
        .arg(&output)
        .output()
        .await
        .map_err(|error| {
            BuildError::processor(logical_path, format!("could not run ffmpeg: {error}"))
        })?;
    if !result.status.success() {
        return Err(BuildError::processor(
            logical_path,
            format!(
                "ffmpeg exited with {}: {}",
                result.status,
                String::from_utf8_lossy(&result.stderr).trim()
            ),
        ));
    }

    tokio::fs::read(&output)
        .await
        .map_err(|error| BuildError::io(output.display().to_string(), error))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_bytes(channels: &[Vec<f32>], sample_rate: u32) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: channels.len() as u16,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            let frames = channels.first().map_or(0, Vec::len);
            for frame in 0..frames {
                for channel in channels {
                    writer
                        .write_sample((channel[frame] * 32767.0) as i16)
                        .unwrap();
                }
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn decode_rejects_wrong_sample_rate() {
        let bytes = wav_bytes(&[vec![0.5; 100]], 48000);
        let error = decode(&bytes).unwrap_err();
        assert!(error.contains("48000"));
    }

    #[test]
    fn decode_deinterleaves_stereo() {
        let bytes = wav_bytes(&[vec![0.5, 0.5], vec![-0.5, -0.5]], SAMPLE_RATE);
        let channels = decode(&bytes).unwrap();
        assert_eq!(channels.len(), 2);
        assert!(channels[0].iter().all(|sample| *sample > 0.0));
        assert!(channels[1].iter().all(|sample| *sample < 0.0));
    }

    #[test]
    fn condition_boosts_quiet_audio_to_full_scale() {
        let mut channels = vec![vec![0.0, 0.25, -0.5, 0.0]];
        condition(&mut channels).unwrap();
        let peak = channels[0]
            .iter()
            .fold(0.0f32, |peak, sample| peak.max(sample.abs()));
        assert!((peak - 1.0).abs() < 1e-6);
    }

    #[test]
    fn condition_rejects_silence() {
        let mut channels = vec![vec![0.0; 64]];
        assert!(condition(&mut channels).is_err());
    }

    #[test]
    fn condition_trims_leading_and_trailing_silence() {
        let mut channels = vec![vec![0.0, 0.001, 1.0, 0.5, 0.001, 0.0, 0.0]];
        condition(&mut channels).unwrap();
        assert_eq!(channels[0], vec![1.0, 0.5]);
    }

    #[test]
    fn condition_trims_using_the_louder_channel() {
        // The right channel is quiet for one extra sample; the left channel
        // limits the trim.
        let mut channels = vec![vec![0.0, 1.0, 1.0, 0.0], vec![0.0, 0.0, 1.0, 0.0]];
        condition(&mut channels).unwrap();
        assert_eq!(channels[0].len(), 2);
    }

    #[test]
    fn condition_collapses_dual_mono() {
        let mut channels = vec![vec![1.0, -0.5, 0.25], vec![1.0, -0.5, 0.25]];
        condition(&mut channels).unwrap();
        assert_eq!(channels.len(), 1);
    }

    #[test]
    fn condition_keeps_true_stereo() {
        let mut channels = vec![vec![1.0, -0.5, 0.25], vec![-1.0, 0.5, 0.25]];
        condition(&mut channels).unwrap();
        assert_eq!(channels.len(), 2);
    }

    #[test]
    fn wav_encoding_is_eight_bit() {
        let bytes = write_wav(&[vec![1.0, -1.0, 0.0]], 8).unwrap();
        let reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.spec().bits_per_sample, 8);
        assert_eq!(reader.spec().sample_rate, SAMPLE_RATE);
    }

    #[tokio::test]
    async fn process_produces_one_audio_item() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jump.wav");
        std::fs::write(&path, wav_bytes(&[vec![0.9, -0.9, 0.9, -0.9]], SAMPLE_RATE)).unwrap();

        let ctx = ProcessContext {
            source_path: &path,
            logical_path: "src/games/pond/packages/sounds/jump.wav",
            stem: "jump",
            audio_formats: &[AudioFormat::None, AudioFormat::Wav],
        };
        let items = process(&ctx).await.unwrap();
        assert_eq!(items.len(), 1);
        let ContentItem::Audio {
            code,
            payload_by_format,
        } = &items["jump"]
        else {
            panic!("expected an audio item");
        };
        assert_eq!(code, "engineAudio");
        assert!(payload_by_format[&AudioFormat::None].is_empty());
        assert!(!payload_by_format[&AudioFormat::Wav].is_empty());
    }

    #[tokio::test]
    async fn process_rejects_silent_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quiet.wav");
        std::fs::write(&path, wav_bytes(&[vec![0.0; 100]], SAMPLE_RATE)).unwrap();

        let ctx = ProcessContext {
            source_path: &path,
            logical_path: "src/games/pond/packages/sounds/quiet.wav",
            stem: "quiet",
            audio_formats: &[AudioFormat::Wav],
        };
        assert!(matches!(
            process(&ctx).await,
            Err(BuildError::Processor { .. })
        ));
    }
}
