//! Background WAV writer thread backing a measurement probe's recording
//! sink (§4.7 Measurement). The audio thread only ever pushes frames into
//! a lock-free FIFO; all file I/O happens on the writer thread.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use rtrb::{Producer, RingBuffer};

use crate::constants::{WAV_SINK_BITS_PER_SAMPLE, WAV_SINK_FIFO_FRAMES, WAV_SINK_FLUSH_INTERVAL_SECONDS};
use crate::error::{EngineError, EngineResult};

/// Handle kept by the audio thread: a non-blocking producer for stereo
/// frames. Dropping it signals the writer thread to flush and exit.
pub struct WavSink {
    producer: Producer<f32>,
    stop: Arc<AtomicBool>,
    join_handle: Option<JoinHandle<()>>,
}

impl WavSink {
    /// Spins up the writer thread. `sample_rate_hz` is the graph's sample
    /// rate; the file is always 2-channel, 32-bit float (`hound`'s
    /// `SampleFormat::Float`), matching `WAV_SINK_BITS_PER_SAMPLE`.
    pub fn start(path: PathBuf, sample_rate_hz: u32) -> EngineResult<Self> {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: sample_rate_hz,
            bits_per_sample: WAV_SINK_BITS_PER_SAMPLE,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(&path, spec)
            .map_err(|e| EngineError::WriterError(e.to_string()))?;

        let (producer, mut consumer) = RingBuffer::<f32>::new(WAV_SINK_FIFO_FRAMES * 2);
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);

        let join_handle = std::thread::spawn(move || {
            let flush_interval = Duration::from_secs_f64(WAV_SINK_FLUSH_INTERVAL_SECONDS);
            loop {
                let mut drained = false;
                while let Ok(sample) = consumer.pop() {
                    if writer.write_sample(sample).is_err() {
                        return;
                    }
                    drained = true;
                }
                if drained && writer.flush().is_err() {
                    return;
                }
                if thread_stop.load(Ordering::Acquire) && consumer.is_empty() {
                    let _ = writer.finalize();
                    return;
                }
                std::thread::sleep(flush_interval);
            }
        });

        Ok(Self {
            producer,
            stop,
            join_handle: Some(join_handle),
        })
    }

    /// Pushes interleaved stereo frames. Never blocks; drops samples if
    /// the FIFO is full rather than stalling the audio thread.
    pub fn push_interleaved(&mut self, frames: &[f32]) {
        for &sample in frames {
            let _ = self.producer.push(sample);
        }
    }

    /// Signals the writer thread to flush and finalize, then joins it.
    pub fn stop(mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.join_handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_a_valid_wav_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");

        let mut sink = WavSink::start(path.clone(), 48_000).unwrap();
        let frames: Vec<f32> = (0..256).map(|i| (i as f32 / 256.0) - 0.5).collect();
        sink.push_interleaved(&frames);
        sink.stop();

        let reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, 48_000);
        assert_eq!(spec.bits_per_sample, 32);
    }
}
