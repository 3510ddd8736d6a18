use std::{fs::File, io::BufWriter, path::Path};

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::{error::Error, signal::Signal, utils::buffer::planar_to_interleaved};

// -------------------------------------------------------------------------------------------------

/// Sample format of written wav files.
#[derive(
    Default, Clone, Copy, Debug, PartialEq, Eq, strum::EnumString, strum::Display, strum::EnumIter,
)]
pub enum WavBitDepth {
    #[strum(serialize = "16")]
    Int16,
    #[strum(serialize = "24")]
    Int24,
    #[default]
    #[strum(serialize = "32")]
    Float32,
}

impl WavBitDepth {
    fn spec(&self, channel_count: usize, sample_rate: u32) -> WavSpec {
        let (bits_per_sample, sample_format) = match self {
            WavBitDepth::Int16 => (16, SampleFormat::Int),
            WavBitDepth::Int24 => (24, SampleFormat::Int),
            WavBitDepth::Float32 => (32, SampleFormat::Float),
        };
        WavSpec {
            channels: channel_count as u16,
            sample_rate,
            bits_per_sample,
            sample_format,
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Write a rendered signal into a wav file with the given sample rate and bit depth.
///
/// Samples are clamped to [-1, 1] before they get converted. Non-finite samples are written
/// as silence.
pub fn write_wav<P: AsRef<Path>>(
    file_path: P,
    signal: &Signal,
    sample_rate: u32,
    bit_depth: WavBitDepth,
) -> Result<(), Error> {
    let channel_count = signal.channel_count();
    if channel_count == 0 || channel_count > u16::MAX as usize {
        return Err(Error::ShapeError(format!(
            "Can't write a wav file with {channel_count} channels"
        )));
    }
    if sample_rate == 0 {
        return Err(Error::ParameterError(
            "Wav sample rate must be > 0".to_string(),
        ));
    }

    let interleaved = match signal {
        Signal::Mono(samples) => samples.clone(),
        Signal::Planar(channels) => planar_to_interleaved(channels),
    };

    let spec = bit_depth.spec(channel_count, sample_rate);
    let mut writer = WavWriter::create(file_path.as_ref(), spec)
        .map_err(|err| Error::OutputError(Box::new(err)))?;
    write_samples(&mut writer, &interleaved, bit_depth)
        .map_err(|err| Error::OutputError(Box::new(err)))?;
    writer
        .finalize()
        .map_err(|err| Error::OutputError(Box::new(err)))?;

    log::info!(
        "Wrote {} frames with {channel_count} channels into '{}'",
        signal.frame_count(),
        file_path.as_ref().display()
    );
    Ok(())
}

fn write_samples(
    writer: &mut WavWriter<BufWriter<File>>,
    interleaved: &[f32],
    bit_depth: WavBitDepth,
) -> Result<(), hound::Error> {
    let clamped = interleaved.iter().map(|sample| {
        if sample.is_finite() {
            sample.clamp(-1.0, 1.0)
        } else {
            0.0
        }
    });
    match bit_depth {
        WavBitDepth::Int16 => {
            for sample in clamped {
                writer.write_sample((sample * i16::MAX as f32).round() as i16)?;
            }
        }
        WavBitDepth::Int24 => {
            const MAX_24: f32 = ((1 << 23) - 1) as f32;
            for sample in clamped {
                writer.write_sample((sample * MAX_24).round() as i32)?;
            }
        }
        WavBitDepth::Float32 => {
            for sample in clamped {
                writer.write_sample(sample)?;
            }
        }
    }
    Ok(())
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_formats() {
        let dir = tempfile::tempdir().unwrap();
        let signal =
            Signal::from_channels(vec![vec![0.5, 2.0, f32::NAN], vec![-0.5, -2.0, 0.0]]).unwrap();

        let path = dir.path().join("float.wav");
        write_wav(&path, &signal, 48000, WavBitDepth::Float32).unwrap();
        let mut reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().channels, 2);
        assert_eq!(reader.spec().sample_rate, 48000);
        let samples = reader
            .samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(samples, vec![0.5, -0.5, 1.0, -1.0, 0.0, 0.0]);

        let path = dir.path().join("int16.wav");
        write_wav(&path, &signal, 44100, WavBitDepth::Int16).unwrap();
        let mut reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().bits_per_sample, 16);
        let samples = reader
            .samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(samples[2], i16::MAX);
        assert_eq!(samples[3], -i16::MAX);

        let path = dir.path().join("int24.wav");
        write_wav(&path, &Signal::Mono(vec![1.0; 10]), 44100, WavBitDepth::Int24).unwrap();
        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().bits_per_sample, 24);
        assert_eq!(reader.spec().channels, 1);
        assert_eq!(reader.duration(), 10);
    }

    #[test]
    fn invalid_signals() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.wav");
        assert!(write_wav(&path, &Signal::Planar(vec![]), 44100, WavBitDepth::Int16).is_err());
        assert!(write_wav(&path, &Signal::Mono(vec![0.0]), 0, WavBitDepth::Int16).is_err());
        assert_eq!("24".parse::<WavBitDepth>().unwrap(), WavBitDepth::Int24);
    }
}
