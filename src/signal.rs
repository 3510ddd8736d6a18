//! Rendered sample buffers and whole-signal level operations.

use std::slice;

use crate::{
    utils::{db_to_linear, peak},
    window::{fade_in_curve, fade_out_curve, WindowFunction},
    Error,
};

// -------------------------------------------------------------------------------------------------

/// A rendered, non-interleaved sample buffer.
///
/// `Mono` is a single channel without an explicit channel dimension. `Planar` holds one buffer
/// per channel; all channels have the same length. Operations which need a channel dimension
/// (such as [EqualEnergyNormalizer](crate::EqualEnergyNormalizer)) reject `Mono` signals with a
/// [Error::ShapeError]: use [Signal::into_planar] to add the dimension explicitly.
#[derive(Clone, Debug, PartialEq)]
pub enum Signal {
    Mono(Vec<f32>),
    Planar(Vec<Vec<f32>>),
}

impl Signal {
    /// Create a silent planar signal.
    pub fn silence(channel_count: usize, frame_count: usize) -> Self {
        Signal::Planar(vec![vec![0.0; frame_count]; channel_count])
    }

    /// Create a planar signal from the given channels, which must have equal lengths.
    pub fn from_channels(channels: Vec<Vec<f32>>) -> Result<Self, Error> {
        if let Some(first) = channels.first() {
            if channels.iter().any(|channel| channel.len() != first.len()) {
                return Err(Error::ShapeError(
                    "All channels of a planar signal must have the same length".to_string(),
                ));
            }
        }
        Ok(Signal::Planar(channels))
    }

    pub fn channel_count(&self) -> usize {
        match self {
            Signal::Mono(_) => 1,
            Signal::Planar(channels) => channels.len(),
        }
    }

    pub fn frame_count(&self) -> usize {
        self.channels().map(Vec::len).max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.frame_count() == 0
    }

    /// Iterate over all channel buffers.
    pub fn channels(&self) -> slice::Iter<'_, Vec<f32>> {
        match self {
            Signal::Mono(samples) => slice::from_ref(samples).iter(),
            Signal::Planar(channels) => channels.iter(),
        }
    }

    /// Iterate mutably over all channel buffers.
    pub fn channels_mut(&mut self) -> slice::IterMut<'_, Vec<f32>> {
        match self {
            Signal::Mono(samples) => slice::from_mut(samples).iter_mut(),
            Signal::Planar(channels) => channels.iter_mut(),
        }
    }

    /// Convert into a planar signal, adding an explicit channel dimension to mono signals.
    pub fn into_planar(self) -> Self {
        match self {
            Signal::Mono(samples) => Signal::Planar(vec![samples]),
            planar => planar,
        }
    }

    /// Planar channel buffers. Fails with a [Error::ShapeError] for mono signals.
    pub fn planar(&self) -> Result<&[Vec<f32>], Error> {
        match self {
            Signal::Mono(_) => Err(Error::ShapeError(
                "Expected a planar buffer with an explicit channel dimension, got a mono buffer"
                    .to_string(),
            )),
            Signal::Planar(channels) => Ok(channels),
        }
    }

    /// Absolute peak value over all channels.
    pub fn peak(&self) -> f32 {
        self.channels()
            .map(|channel| peak(channel))
            .fold(0.0, f32::max)
    }

    /// Scale all samples by the given factor.
    pub fn scale(&mut self, factor: f32) {
        for channel in self.channels_mut() {
            for sample in channel.iter_mut() {
                *sample *= factor;
            }
        }
    }

    /// Normalize the signal's peak to the given level in dB. Silent signals stay untouched.
    pub fn adjust_level(&mut self, level_db: f32) {
        let peak = self.peak();
        if peak > 0.0 {
            self.scale(db_to_linear(level_db) / peak);
        } else {
            log::warn!("Can't adjust the level of a silent signal");
        }
    }

    /// Fade in the first `frames` frames with the rising half of the given window.
    pub fn fade_in(&mut self, window: &dyn WindowFunction, frames: usize) {
        let frames = frames.min(self.frame_count());
        let envelope = window.generate(2 * frames);
        for channel in self.channels_mut() {
            for (sample, gain) in channel.iter_mut().zip(envelope.iter().take(frames)) {
                *sample *= gain;
            }
        }
    }

    /// Fade out the last `frames` frames with the falling half of the given window.
    pub fn fade_out(&mut self, window: &dyn WindowFunction, frames: usize) {
        let frames = frames.min(self.frame_count());
        let envelope = window.generate(2 * frames);
        for channel in self.channels_mut() {
            let offset = channel.len().saturating_sub(frames);
            let skip = frames - (channel.len() - offset);
            for (sample, gain) in channel[offset..]
                .iter_mut()
                .zip(envelope.iter().skip(frames + skip))
            {
                *sample *= gain;
            }
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Concatenate signals with an overlapping crossfade of `frames` frames between each neighbour.
///
/// The outgoing signal fades out while the incoming one fades in with complementary raised cosine
/// curves, which sum to 1 at every frame of the overlap. Overlaps are shortened to the length of
/// the shorter neighbour, and to half the length of signals which overlap on both sides, so no
/// more than two signals are ever faded into each other. All signals must have the same layout (mono or planar with equal
/// channel counts).
pub fn crossfade_concat(signals: &[Signal], frames: usize) -> Result<Signal, Error> {
    let first = signals
        .first()
        .ok_or_else(|| Error::EmptyInput("No signals to crossfade".to_string()))?;
    let is_mono = matches!(first, Signal::Mono(_));
    let channel_count = first.channel_count();
    if signals
        .iter()
        .any(|s| matches!(s, Signal::Mono(_)) != is_mono || s.channel_count() != channel_count)
    {
        return Err(Error::ShapeError(
            "Crossfaded signals must all have the same channel layout".to_string(),
        ));
    }

    // signals with two neighbours may spend at most half of their frames on each overlap
    let last = signals.len() - 1;
    let max_overlap = |index: usize| {
        let frame_count = signals[index].frame_count();
        if index == 0 || index == last {
            frame_count
        } else {
            frame_count / 2
        }
    };
    // overlap length between signal i and i + 1
    let overlaps = (0..last)
        .map(|index| frames.min(max_overlap(index)).min(max_overlap(index + 1)))
        .collect::<Vec<_>>();
    let total_frames =
        signals.iter().map(Signal::frame_count).sum::<usize>() - overlaps.iter().sum::<usize>();

    let mut output = vec![vec![0.0f32; total_frames]; channel_count];
    let mut offset = 0;
    for (index, signal) in signals.iter().enumerate() {
        let fade_in = index
            .checked_sub(1)
            .map(|prev| fade_in_curve(overlaps[prev]))
            .unwrap_or_default();
        let fade_out = overlaps
            .get(index)
            .map(|len| fade_out_curve(*len))
            .unwrap_or_default();
        let frame_count = signal.frame_count();
        for (target, source) in output.iter_mut().zip(signal.channels()) {
            for (frame, sample) in source.iter().enumerate() {
                let mut gain = 1.0;
                if frame < fade_in.len() {
                    gain *= fade_in[frame];
                }
                let tail = frame_count - frame;
                if tail <= fade_out.len() {
                    gain *= fade_out[fade_out.len() - tail];
                }
                target[offset + frame] += sample * gain;
            }
        }
        offset += frame_count - overlaps.get(index).copied().unwrap_or(0);
    }

    Ok(if is_mono {
        Signal::Mono(output.pop().unwrap_or_default())
    } else {
        Signal::Planar(output)
    })
}

// -------------------------------------------------------------------------------------------------
