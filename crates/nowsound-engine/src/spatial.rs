//! The spatial processor (§4.7): pan + volume + mute, clipped to the
//! device-safe range, feeding an owned effect chain.

use nowsound_core::StereoSample;
use nowsound_dsp::ConstantPowerPanner;

use crate::constants::OUTPUT_CLIP_LIMIT;
use crate::plugin::EffectChain;

/// Unused placeholder threaded through `process_block` to mirror the
/// original engine's `processBlock(AudioBuffer&, MidiBuffer&)` shape. MIDI
/// is an explicit non-goal; nothing ever populates or reads this.
#[derive(Debug, Default)]
pub struct MidiBuffer;

pub struct SpatialProcessor {
    panner: ConstantPowerPanner,
    volume: f64,
    muted: bool,
    chain: EffectChain,
}

impl SpatialProcessor {
    pub fn new() -> Self {
        Self {
            panner: ConstantPowerPanner::new(),
            volume: 1.0,
            muted: false,
            chain: EffectChain::new(),
        }
    }

    pub fn pan(&self) -> f64 {
        self.panner.pan()
    }

    pub fn set_pan(&mut self, pan: f64) {
        self.panner.set_pan(pan);
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn set_volume(&mut self, volume: f64) {
        assert!(volume >= 0.0, "volume must be non-negative, got {volume}");
        self.volume = volume;
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn set_mute(&mut self, muted: bool) {
        self.muted = muted;
    }

    pub fn chain_mut(&mut self) -> &mut EffectChain {
        &mut self.chain
    }

    pub fn chain(&self) -> &EffectChain {
        &self.chain
    }

    /// Reads the mono signal from `audio_buffer[i].left`, pans and scales
    /// it to stereo in place, runs the effect chain, then clips.
    pub fn process_block(&mut self, audio_buffer: &mut [StereoSample], _midi_buffer: &mut MidiBuffer) {
        if self.muted {
            audio_buffer.fill(StereoSample::default());
            return;
        }

        for sample in audio_buffer.iter_mut() {
            let (l, r) = self.panner.pan_mono(sample.left);
            *sample = StereoSample::new(l, r) * self.volume;
        }

        self.chain.process_block(audio_buffer);

        for sample in audio_buffer.iter_mut() {
            *sample = sample.clip(OUTPUT_CLIP_LIMIT);
        }
    }
}

impl Default for SpatialProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn center_pan_splits_power_evenly() {
        let mut spatial = SpatialProcessor::new();
        spatial.set_pan(0.5);
        let mut buf = vec![StereoSample::mono(1.0); 1];
        spatial.process_block(&mut buf, &mut MidiBuffer);
        assert_relative_eq!(buf[0].left, buf[0].right, epsilon = 1e-9);
        assert_relative_eq!(
            buf[0].left * buf[0].left + buf[0].right * buf[0].right,
            1.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn mute_zeroes_output() {
        let mut spatial = SpatialProcessor::new();
        spatial.set_mute(true);
        let mut buf = vec![StereoSample::mono(1.0); 4];
        spatial.process_block(&mut buf, &mut MidiBuffer);
        assert!(buf.iter().all(|s| *s == StereoSample::default()));
    }

    #[test]
    fn clips_above_device_safe_limit() {
        let mut spatial = SpatialProcessor::new();
        spatial.set_pan(0.0);
        spatial.set_volume(2.0);
        let mut buf = vec![StereoSample::mono(1.0); 1];
        spatial.process_block(&mut buf, &mut MidiBuffer);
        assert!(buf[0].left <= OUTPUT_CLIP_LIMIT + 1e-12);
        assert!(buf[0].left >= -OUTPUT_CLIP_LIMIT - 1e-12);
    }

    #[test]
    fn volume_scales_pan_law_by_volume_squared() {
        let mut spatial = SpatialProcessor::new();
        spatial.set_pan(0.3);
        spatial.set_volume(0.5);
        let mut buf = vec![StereoSample::mono(1.0); 1];
        spatial.process_block(&mut buf, &mut MidiBuffer);
        let power = buf[0].left * buf[0].left + buf[0].right * buf[0].right;
        assert_relative_eq!(power, 0.25, epsilon = 1e-9);
    }
}
