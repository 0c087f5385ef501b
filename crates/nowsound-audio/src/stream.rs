//! Audio stream construction: wires a `cpal` output (and optional input)
//! stream to a caller-supplied callback operating on interleaved `f32`
//! stereo blocks. Sample-format conversion to the engine's internal
//! `f64` representation happens on the other side of [`AudioCallback`],
//! not in this crate.

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{
    BufferSize as CpalBufferSize, Device, SampleFormat, Stream, StreamConfig,
    SupportedStreamConfig,
};
use parking_lot::Mutex;
use rtrb::{Consumer, Producer, RingBuffer};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::{AudioConfig, AudioError, AudioResult};

/// `(input_block, output_block)`, both interleaved stereo `f32`.
pub type AudioCallback = Box<dyn FnMut(&[f32], &mut [f32]) + Send + 'static>;

struct StreamState {
    callback: Mutex<AudioCallback>,
    running: AtomicBool,
}

/// An active (or paused) output stream, with an optional paired input
/// stream feeding the same callback's input slice via a ring buffer.
pub struct AudioStream {
    output_stream: Stream,
    input_stream: Option<Stream>,
    input_consumer: Option<Consumer<f32>>,
    state: Arc<StreamState>,
    config: AudioConfig,
}

impl AudioStream {
    pub fn new(
        output_device: &Device,
        input_device: Option<&Device>,
        config: AudioConfig,
        callback: AudioCallback,
    ) -> AudioResult<Self> {
        let state = Arc::new(StreamState {
            callback: Mutex::new(callback),
            running: AtomicBool::new(false),
        });

        let output_config = get_stream_config(output_device, &config, false)?;
        let output_stream = build_output_stream(
            output_device,
            &output_config,
            config.buffer_size_frames,
            Arc::clone(&state),
        )?;

        let (input_stream, input_consumer) = if let Some(input_dev) = input_device {
            let input_config = get_stream_config(input_dev, &config, true)?;
            let (stream, consumer) =
                build_input_stream(input_dev, &input_config, config.buffer_size_frames)?;
            (Some(stream), Some(consumer))
        } else {
            (None, None)
        };

        Ok(Self {
            output_stream,
            input_stream,
            input_consumer,
            state,
            config,
        })
    }

    pub fn start(&self) -> AudioResult<()> {
        self.output_stream
            .play()
            .map_err(|e| AudioError::StreamError(e.to_string()))?;
        if let Some(ref stream) = self.input_stream {
            stream
                .play()
                .map_err(|e| AudioError::StreamError(e.to_string()))?;
        }
        self.state.running.store(true, Ordering::Release);
        Ok(())
    }

    pub fn stop(&self) -> AudioResult<()> {
        self.output_stream
            .pause()
            .map_err(|e| AudioError::StreamError(e.to_string()))?;
        if let Some(ref stream) = self.input_stream {
            stream
                .pause()
                .map_err(|e| AudioError::StreamError(e.to_string()))?;
        }
        self.state.running.store(false, Ordering::Release);
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.state.running.load(Ordering::Acquire)
    }

    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    /// Drains whatever the paired input stream has produced since the
    /// last call. Returns 0 if this stream has no input device.
    pub fn pop_input(&mut self, dst: &mut [f32]) -> usize {
        let Some(consumer) = self.input_consumer.as_mut() else {
            return 0;
        };
        let mut n = 0;
        while n < dst.len() {
            match consumer.pop() {
                Ok(sample) => {
                    dst[n] = sample;
                    n += 1;
                }
                Err(_) => break,
            }
        }
        n
    }
}

fn get_output_stream_config(
    device: &Device,
    config: &AudioConfig,
) -> AudioResult<SupportedStreamConfig> {
    let sample_rate = cpal::SampleRate(config.sample_rate_hz);
    let channels = config.output_channels;

    let configs = device
        .supported_output_configs()
        .map_err(|e| AudioError::ConfigError(e.to_string()))?;

    for supported in configs {
        if supported.channels() >= channels
            && supported.min_sample_rate() <= sample_rate
            && supported.max_sample_rate() >= sample_rate
            && supported.sample_format() == SampleFormat::F32
        {
            return Ok(supported.with_sample_rate(sample_rate));
        }
    }

    Err(AudioError::ConfigError(format!(
        "no matching output config for {channels} channels @ {}Hz",
        config.sample_rate_hz
    )))
}

fn get_input_stream_config(
    device: &Device,
    config: &AudioConfig,
) -> AudioResult<SupportedStreamConfig> {
    let sample_rate = cpal::SampleRate(config.sample_rate_hz);
    let channels = config.input_channels;

    let configs = device
        .supported_input_configs()
        .map_err(|e| AudioError::ConfigError(e.to_string()))?;

    for supported in configs {
        if supported.channels() >= channels
            && supported.min_sample_rate() <= sample_rate
            && supported.max_sample_rate() >= sample_rate
            && supported.sample_format() == SampleFormat::F32
        {
            return Ok(supported.with_sample_rate(sample_rate));
        }
    }

    Err(AudioError::ConfigError(format!(
        "no matching input config for {channels} channels @ {}Hz",
        config.sample_rate_hz
    )))
}

fn get_stream_config(
    device: &Device,
    config: &AudioConfig,
    is_input: bool,
) -> AudioResult<SupportedStreamConfig> {
    if is_input {
        get_input_stream_config(device, config)
    } else {
        get_output_stream_config(device, config)
    }
}

fn build_output_stream(
    device: &Device,
    supported_config: &SupportedStreamConfig,
    buffer_frames: usize,
    state: Arc<StreamState>,
) -> AudioResult<Stream> {
    let channels = supported_config.channels() as usize;
    let sample_rate = supported_config.sample_rate();

    let config = StreamConfig {
        channels: supported_config.channels(),
        sample_rate,
        buffer_size: CpalBufferSize::Fixed(buffer_frames as u32),
    };

    let mut input_block = vec![0.0f32; buffer_frames * 2];
    let mut output_block = vec![0.0f32; buffer_frames * 2];

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let frames = data.len() / channels;
                output_block[..frames * 2].fill(0.0);

                {
                    let mut callback = state.callback.lock();
                    callback(&input_block[..frames * 2], &mut output_block[..frames * 2]);
                }

                match channels {
                    1 => {
                        for (i, sample) in data.iter_mut().enumerate() {
                            *sample = (output_block[i * 2] + output_block[i * 2 + 1]) * 0.5;
                        }
                    }
                    2 => {
                        data.copy_from_slice(&output_block[..data.len()]);
                    }
                    _ => {
                        for (i, chunk) in data.chunks_mut(channels).enumerate() {
                            chunk[0] = output_block[i * 2];
                            chunk[1] = output_block[i * 2 + 1];
                            for sample in chunk.iter_mut().skip(2) {
                                *sample = 0.0;
                            }
                        }
                    }
                }
            },
            move |err| {
                log::error!("audio output stream error: {err}");
            },
            None,
        )
        .map_err(|e| AudioError::StreamBuildError(e.to_string()))?;

    // input_block stays silent for output-only streams; a paired input
    // stream writes through `pop_input` into the graph's own input
    // accumulation, not into this closure's captured buffer.
    let _ = &input_block;

    Ok(stream)
}

fn build_input_stream(
    device: &Device,
    supported_config: &SupportedStreamConfig,
    buffer_frames: usize,
) -> AudioResult<(Stream, Consumer<f32>)> {
    let channels = supported_config.channels() as usize;
    let sample_rate = supported_config.sample_rate();

    let config = StreamConfig {
        channels: supported_config.channels(),
        sample_rate,
        buffer_size: CpalBufferSize::Fixed(buffer_frames as u32),
    };

    let (mut producer, consumer): (Producer<f32>, Consumer<f32>) =
        RingBuffer::new(buffer_frames * channels * 4);

    let stream = device
        .build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                for &sample in data {
                    let _ = producer.push(sample);
                }
            },
            move |err| {
                log::error!("audio input stream error: {err}");
            },
            None,
        )
        .map_err(|e| AudioError::StreamBuildError(e.to_string()))?;

    Ok((stream, consumer))
}
