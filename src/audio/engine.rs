// Audio engine - CPAL output stream behind the render-sink boundary
//
// The stream object is not Send on every platform (CoreAudio), so it stays
// with the CpalSink owner; the shareable CpalHandle is what crosses into the
// scheduling thread. The callback owns all mutable render state: it drains
// the command ring, activates due tones as voices, mixes them, and advances
// the sample clock that backs `now()`.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use ringbuf::traits::{Consumer, Producer};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::audio::parameters::AtomicF64;
use crate::audio::sink::{RenderError, RenderSink, SinkCommand, ToneCommand};
use crate::audio::timing::AudioClock;
use crate::audio::voice::ToneVoice;
use crate::messaging::channels::{CommandConsumer, CommandProducer, create_command_channel};

/// Command ring capacity. One scheduling pass commits at most a look-ahead
/// window of events (a handful); 1024 leaves room for many sessions' worth
/// of backlog before `QueueFull`.
const COMMAND_CHANNEL_CAPACITY: usize = 1024;

/// Simultaneous voice cap; the oldest voice is dropped beyond it
const MAX_VOICES: usize = 32;

/// Shareable side of the sink: clock reads and tone scheduling.
pub struct CpalHandle {
    clock: AudioClock,
    commands: Mutex<CommandProducer>,
    closed: AtomicBool,
    gain: AtomicF64,
}

impl CpalHandle {
    /// Master gain, clamped to 0..=1
    pub fn set_gain(&self, gain: f64) {
        self.gain.set(gain.clamp(0.0, 1.0));
    }

    pub fn gain(&self) -> f64 {
        self.gain.get()
    }

    pub fn sample_rate(&self) -> f64 {
        self.clock.sample_rate()
    }
}

impl RenderSink for CpalHandle {
    fn now(&self) -> f64 {
        self.clock.seconds()
    }

    fn schedule_tone(&self, tone: ToneCommand) -> Result<(), RenderError> {
        if self.closed.load(Ordering::Relaxed) {
            return Err(RenderError::DeviceClosed);
        }
        let mut commands = self
            .commands
            .lock()
            .map_err(|_| RenderError::DeviceUnavailable("command queue poisoned".to_string()))?;
        commands
            .try_push(SinkCommand::Tone(tone))
            .map_err(|_| RenderError::QueueFull)
    }

    fn flush(&self) {
        if let Ok(mut commands) = self.commands.lock() {
            let _ = commands.try_push(SinkCommand::Flush);
        }
    }
}

/// CPAL-backed render sink owning the output device and stream.
pub struct CpalSink {
    _device: Device,
    _stream: Stream,
    handle: Arc<CpalHandle>,
}

impl CpalSink {
    /// Opens the default output device and starts the stream.
    pub fn open() -> Result<Self, RenderError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| RenderError::DeviceUnavailable("no output device".to_string()))?;

        let supported_config = device
            .default_output_config()
            .map_err(|e| RenderError::DeviceUnavailable(e.to_string()))?;
        let sample_format = supported_config.sample_format();
        let sample_rate = supported_config.sample_rate().0 as f64;
        let channels = supported_config.channels() as usize;
        let config: StreamConfig = supported_config.into();

        let (command_tx, command_rx) = create_command_channel(COMMAND_CHANNEL_CAPACITY);
        let clock = AudioClock::new(sample_rate);
        let handle = Arc::new(CpalHandle {
            clock: clock.clone(),
            commands: Mutex::new(command_tx),
            closed: AtomicBool::new(false),
            gain: AtomicF64::new(1.0),
        });

        let stream = match sample_format {
            SampleFormat::F32 => {
                build_stream::<f32>(&device, &config, channels, clock, command_rx, handle.gain.clone())
            }
            SampleFormat::I16 => {
                build_stream::<i16>(&device, &config, channels, clock, command_rx, handle.gain.clone())
            }
            SampleFormat::U16 => {
                build_stream::<u16>(&device, &config, channels, clock, command_rx, handle.gain.clone())
            }
            other => Err(RenderError::DeviceUnavailable(format!(
                "unsupported sample format: {other:?}"
            ))),
        }?;

        stream
            .play()
            .map_err(|e| RenderError::DeviceUnavailable(e.to_string()))?;

        log::info!(
            "audio output: {} at {} Hz, {} channel(s)",
            device.name().unwrap_or_else(|_| "unknown".to_string()),
            sample_rate,
            channels
        );

        Ok(Self {
            _device: device,
            _stream: stream,
            handle,
        })
    }

    /// Shareable handle implementing [`RenderSink`]
    pub fn handle(&self) -> Arc<CpalHandle> {
        Arc::clone(&self.handle)
    }

    /// Releases the device. Idempotent; later `schedule_tone` calls get
    /// `DeviceClosed`.
    pub fn close(&self) {
        if !self.handle.closed.swap(true, Ordering::Relaxed) {
            self.handle.flush();
        }
    }
}

impl Drop for CpalSink {
    fn drop(&mut self) {
        self.close();
    }
}

fn build_stream<T>(
    device: &Device,
    config: &StreamConfig,
    channels: usize,
    clock: AudioClock,
    mut command_rx: CommandConsumer,
    gain: AtomicF64,
) -> Result<Stream, RenderError>
where
    T: SizedSample + FromSample<f32> + Send + 'static,
{
    let sample_rate = clock.sample_rate();
    let mut pending: Vec<ToneCommand> = Vec::with_capacity(COMMAND_CHANNEL_CAPACITY);
    let mut voices: Vec<ToneVoice> = Vec::with_capacity(MAX_VOICES + 1);

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                // No allocations, no I/O, no blocking locks in here

                // Drain commands; an in-band Flush drops exactly the tones
                // committed before it
                while let Some(command) = command_rx.try_pop() {
                    match command {
                        SinkCommand::Tone(tone) => {
                            if pending.len() < pending.capacity() {
                                pending.push(tone);
                            }
                        }
                        SinkCommand::Flush => {
                            pending.clear();
                            voices.clear();
                        }
                    }
                }

                let frames = data.len() / channels;
                let block_start = clock.current_sample();
                let block_end = block_start + frames as u64;

                // Activate tones whose start falls before the end of this block
                pending.retain(|tone| {
                    let start_sample = clock.seconds_to_sample(tone.start);
                    if start_sample >= block_end {
                        return true;
                    }
                    if voices.len() > MAX_VOICES {
                        voices.remove(0);
                    }
                    voices.push(ToneVoice::new(
                        tone.frequency,
                        (tone.duration * sample_rate) as usize,
                        tone.gain,
                        start_sample.saturating_sub(block_start),
                        sample_rate as f32,
                    ));
                    false
                });

                let master = gain.get() as f32;
                for frame in data.chunks_mut(channels) {
                    let mut mixed = 0.0f32;
                    for voice in voices.iter_mut() {
                        mixed += voice.next_sample();
                    }
                    let mixed = (mixed * master).clamp(-1.0, 1.0);
                    for out in frame.iter_mut() {
                        *out = Sample::from_sample::<f32>(mixed);
                    }
                }

                voices.retain(|voice| !voice.finished());
                clock.advance(frames);
            },
            move |err| {
                log::error!("audio stream error: {err}");
            },
            None,
        )
        .map_err(|e| RenderError::DeviceUnavailable(e.to_string()))
}
