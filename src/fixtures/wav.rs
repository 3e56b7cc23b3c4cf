// WAV ingestion - one Channel per WAV channel
//
// Interleaved frames are split per channel. Integer PCM is scaled to [-1, 1]
// by the largest positive code for its bit depth; float PCM is used as is.

use std::path::Path;

use anyhow::{anyhow, Context, Result};

use crate::channels::{Channel, ChannelSet};

/// Read every channel of a WAV file
///
/// # Arguments
/// * `path` - WAV file
/// * `labels` - Labels per WAV channel; missing ones default to `CH{n}`
pub fn read_wav_channels(path: &Path, labels: &[String]) -> Result<ChannelSet> {
    let mut reader =
        hound::WavReader::open(path).with_context(|| format!("opening {}", path.display()))?;
    let spec = reader.spec();
    let channel_count = spec.channels as usize;
    if channel_count == 0 {
        return Err(anyhow!("{} declares no channels", path.display()));
    }
    if labels.len() > channel_count {
        return Err(anyhow!(
            "{} labels given for {} channels in {}",
            labels.len(),
            channel_count,
            path.display()
        ));
    }

    let interleaved: Vec<f64> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .map(|sample| sample.map(f64::from).map_err(|err| anyhow!(err)))
            .collect::<Result<_>>()?,
        hound::SampleFormat::Int => {
            if !(2..=32).contains(&spec.bits_per_sample) {
                return Err(anyhow!(
                    "Unsupported bits per sample {} in {}",
                    spec.bits_per_sample,
                    path.display()
                ));
            }
            let max = ((1i64 << (spec.bits_per_sample - 1)) - 1) as f64;
            reader
                .samples::<i32>()
                .map(|sample| sample.map(|v| v as f64 / max).map_err(|err| anyhow!(err)))
                .collect::<Result<_>>()?
        }
    };

    let rate = f64::from(spec.sample_rate);
    let mut per_channel = vec![Vec::with_capacity(interleaved.len() / channel_count); channel_count];
    for frame in interleaved.chunks_exact(channel_count) {
        for (buffer, &sample) in per_channel.iter_mut().zip(frame) {
            buffer.push(sample);
        }
    }

    per_channel
        .into_iter()
        .enumerate()
        .map(|(idx, samples)| {
            let label = labels
                .get(idx)
                .cloned()
                .unwrap_or_else(|| format!("CH{}", idx + 1));
            Channel::new(label, rate, samples).map_err(|err| anyhow!(err))
        })
        .collect()
}
