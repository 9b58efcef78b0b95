//! Output device discovery and playback.
//!
//! [`CpalDevice`] finds an output device; [`CpalDevice::play`] moves an
//! [`Engine`](crate::Engine) onto the device's callback and returns a
//! [`Playback`] guard. Playback only starts once the stream reports it is
//! running, see [`Handshake`].
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(feature = "cpal_sink")] {
//! use patchwire::{patch, Config, CpalDevice};
//!
//! let device = CpalDevice::default_output().unwrap();
//! let config = Config::default().with_sample_rate(device.sample_rate());
//! let (engine, mut editor) = patch::demo(config.clone()).unwrap();
//!
//! let _playback = device.play(engine, config.ready_timeout).unwrap();
//! editor.toggle_pause().unwrap();
//! # }
//! ```

use std::sync::{Condvar, Mutex, PoisonError};
use std::time::Duration;

use crate::error::DeviceError;

#[cfg(feature = "cpal_sink")]
use cpal::traits::{DeviceTrait, HostTrait};

/// Where a device connection stands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Readiness {
    Pending,
    Ready,
    Failed(String),
}

/// One-shot readiness signal between the thread that owns a stream and the
/// thread that asked for it.
#[derive(Debug)]
pub struct Handshake {
    state: Mutex<Readiness>,
    changed: Condvar,
}

impl Default for Handshake {
    fn default() -> Self {
        Self::new()
    }
}

impl Handshake {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(Readiness::Pending),
            changed: Condvar::new(),
        }
    }

    /// Record the outcome and wake the waiter.
    pub fn signal(&self, readiness: Readiness) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = readiness;
        self.changed.notify_all();
    }

    pub fn readiness(&self) -> Readiness {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Block until the device is ready, has failed, or `timeout` passes.
    pub fn wait(&self, timeout: Duration) -> Result<(), DeviceError> {
        let guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = self
            .changed
            .wait_timeout_while(guard, timeout, |state| *state == Readiness::Pending)
            .unwrap_or_else(PoisonError::into_inner);

        match &*guard {
            Readiness::Ready => Ok(()),
            Readiness::Failed(reason) => Err(DeviceError::Failed(reason.clone())),
            Readiness::Pending => Err(DeviceError::Unavailable { timeout }),
        }
    }
}

/// A discovered audio output device.
///
/// Use [`CpalDevice::default_output`] to get the system default, or
/// [`CpalDevice::list_outputs`] to enumerate all available devices.
pub struct CpalDevice {
    #[cfg(feature = "cpal_sink")]
    device: cpal::Device,
    #[cfg(feature = "cpal_sink")]
    config: cpal::SupportedStreamConfig,

    name: String,
    sample_rate: u32,
    channels: u16,
}

impl CpalDevice {
    /// The system's default output device, if there is one.
    #[cfg(feature = "cpal_sink")]
    pub fn default_output() -> Option<Self> {
        let host = cpal::default_host();
        Self::describe(host.default_output_device()?)
    }

    #[cfg(not(feature = "cpal_sink"))]
    pub fn default_output() -> Option<Self> {
        None
    }

    /// Every output device that reports a usable default configuration.
    #[cfg(feature = "cpal_sink")]
    pub fn list_outputs() -> Vec<Self> {
        let host = cpal::default_host();
        host.output_devices()
            .map(|devices| devices.filter_map(Self::describe).collect())
            .unwrap_or_default()
    }

    #[cfg(not(feature = "cpal_sink"))]
    pub fn list_outputs() -> Vec<Self> {
        Vec::new()
    }

    #[cfg(feature = "cpal_sink")]
    fn describe(device: cpal::Device) -> Option<Self> {
        let config = device.default_output_config().ok()?;
        let name = device.name().unwrap_or_else(|_| "Unknown".into());
        Some(Self {
            sample_rate: config.sample_rate().0,
            channels: config.channels(),
            name,
            device,
            config,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The device's default sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }
}

#[cfg(feature = "cpal_sink")]
pub use output::Playback;

#[cfg(feature = "cpal_sink")]
mod output {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread::JoinHandle;
    use std::time::Duration;

    use cpal::traits::{DeviceTrait, StreamTrait};
    use cpal::{FromSample, Sample, SampleFormat, SizedSample, StreamError};
    use tracing::{error, info, warn};

    use super::{CpalDevice, Handshake, Readiness};
    use crate::engine::{Block, DeviceEvent, DeviceStatus, Engine};
    use crate::error::DeviceError;

    /// A running output stream. Dropping it stops playback.
    pub struct Playback {
        stop: Arc<AtomicBool>,
        thread: Option<JoinHandle<()>>,
        status: DeviceStatus,
        sample_rate: u32,
        channels: u16,
    }

    impl Playback {
        pub fn sample_rate(&self) -> u32 {
            self.sample_rate
        }

        pub fn channels(&self) -> u16 {
            self.channels
        }

        /// Whether the device went away. Nothing is rendered after that.
        pub fn failed(&self) -> bool {
            self.status.failed()
        }

        pub fn underflows(&self) -> u64 {
            self.status.underflows()
        }
    }

    /// How a stream error is reported to the engine.
    pub(super) fn stream_event(err: StreamError) -> DeviceEvent {
        match err {
            StreamError::DeviceNotAvailable => DeviceEvent::Failed(err.to_string()),
            other => {
                warn!(%other, "stream error");
                DeviceEvent::Underflow
            }
        }
    }

    impl Drop for Playback {
        fn drop(&mut self) {
            self.stop.store(true, Ordering::Release);
            if let Some(thread) = self.thread.take() {
                thread.thread().unpark();
                let _ = thread.join();
            }
        }
    }

    impl CpalDevice {
        /// Hand `engine` to this device and start the stream.
        ///
        /// The device must run at the engine's sample rate. Fails if no such
        /// configuration exists or the stream is not running within `timeout`.
        pub fn play(&self, engine: Engine, timeout: Duration) -> Result<Playback, DeviceError> {
            let sample_rate = engine.config().sample_rate;
            let status = engine.device_status();
            let supported = self.config_for(sample_rate)?;
            let format = supported.sample_format();
            let stream_config = supported.config();
            let channels = stream_config.channels;

            let handshake = Arc::new(Handshake::new());
            let stop = Arc::new(AtomicBool::new(false));

            let device = self.device.clone();
            let ready = handshake.clone();
            let stopped = stop.clone();
            let name = self.name.clone();

            // cpal streams are not Send, so the stream lives and dies on this thread
            let thread = std::thread::Builder::new()
                .name("patchwire-output".into())
                .spawn(move || {
                    let stream = match build_stream(&device, format, &stream_config, engine) {
                        Ok(stream) => stream,
                        Err(err) => return ready.signal(Readiness::Failed(err.to_string())),
                    };
                    if let Err(err) = stream.play() {
                        return ready.signal(Readiness::Failed(err.to_string()));
                    }
                    ready.signal(Readiness::Ready);
                    info!(device = %name, sample_rate, channels, ?format, "output running");

                    while !stopped.load(Ordering::Acquire) {
                        std::thread::park();
                    }
                    drop(stream);
                    info!(device = %name, "output stopped");
                })
                .map_err(|err| DeviceError::Failed(err.to_string()))?;

            if let Err(err) = handshake.wait(timeout) {
                error!(%err, device = %self.name, "output did not start");
                stop.store(true, Ordering::Release);
                thread.thread().unpark();
                return Err(err);
            }

            Ok(Playback {
                stop,
                thread: Some(thread),
                status,
                sample_rate,
                channels,
            })
        }

        /// A supported configuration running at `sample_rate`.
        fn config_for(&self, sample_rate: u32) -> Result<cpal::SupportedStreamConfig, DeviceError> {
            if self.config.sample_rate().0 == sample_rate {
                return Ok(self.config.clone());
            }

            let rate = cpal::SampleRate(sample_rate);
            self.device
                .supported_output_configs()
                .map_err(|err| DeviceError::Failed(err.to_string()))?
                .find(|range| range.min_sample_rate() <= rate && rate <= range.max_sample_rate())
                .map(|range| range.with_sample_rate(rate))
                .ok_or_else(|| DeviceError::UnsupportedFormat(format!("no output configuration at {sample_rate} Hz")))
        }
    }

    fn build_stream(
        device: &cpal::Device,
        format: SampleFormat,
        config: &cpal::StreamConfig,
        engine: Engine,
    ) -> Result<cpal::Stream, DeviceError> {
        match format {
            SampleFormat::F32 => build::<f32>(device, config, engine),
            SampleFormat::I16 => build::<i16>(device, config, engine),
            SampleFormat::U16 => build::<u16>(device, config, engine),
            SampleFormat::I32 => build::<i32>(device, config, engine),
            other => Err(DeviceError::UnsupportedFormat(format!("{other:?}"))),
        }
    }

    fn build<T>(device: &cpal::Device, config: &cpal::StreamConfig, mut engine: Engine) -> Result<cpal::Stream, DeviceError>
    where
        T: SizedSample + FromSample<f32>,
    {
        let channels = (config.channels as usize).max(1);
        // the error callback may keep running after the data callback has stopped
        let status = engine.device_status();

        device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    // mono engine, duplicated across every channel
                    let frames = data.len() / channels;
                    let block = engine.render(frames, |i, sample| {
                        let value = T::from_sample(sample.clamp(-1.0, 1.0));
                        data[i * channels..(i + 1) * channels].fill(value);
                    });
                    match block {
                        Block::Rendered(n) => data[n * channels..].fill(T::EQUILIBRIUM),
                        Block::Paused | Block::Halted => data.fill(T::EQUILIBRIUM),
                    }
                },
                move |err| status.report(stream_event(err)),
                None,
            )
            .map_err(|err| DeviceError::Failed(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn ready_before_wait() {
        let hs = Handshake::new();
        hs.signal(Readiness::Ready);
        assert!(hs.wait(Duration::from_millis(1)).is_ok());
    }

    #[test]
    fn failure_is_reported() {
        let hs = Handshake::new();
        hs.signal(Readiness::Failed("refused".into()));
        match hs.wait(Duration::from_millis(1)) {
            Err(DeviceError::Failed(reason)) => assert_eq!(reason, "refused"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn times_out_while_pending() {
        let hs = Handshake::new();
        let timeout = Duration::from_millis(20);
        assert!(matches!(hs.wait(timeout), Err(DeviceError::Unavailable { .. })));
        assert_eq!(hs.readiness(), Readiness::Pending);
    }

    #[test]
    fn wakes_on_signal_from_other_thread() {
        let hs = Arc::new(Handshake::new());
        let signaller = hs.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            signaller.signal(Readiness::Ready);
        });

        assert!(hs.wait(Duration::from_secs(5)).is_ok());
        handle.join().unwrap();
    }

    #[cfg(feature = "cpal_sink")]
    #[test]
    fn lost_device_halts_engine_without_data_callback() {
        use crate::config::Config;
        use crate::engine::{DeviceEvent, Engine};

        let (engine, editor) = Engine::new(Config::default().running());
        let status = engine.device_status();

        status.report(output::stream_event(cpal::StreamError::DeviceNotAvailable));
        assert!(status.failed());
        assert!(editor.device_failed());

        let backend = cpal::StreamError::BackendSpecific {
            err: cpal::BackendSpecificError {
                description: "xrun".into(),
            },
        };
        assert!(matches!(output::stream_event(backend), DeviceEvent::Underflow));
    }

    #[cfg(not(feature = "cpal_sink"))]
    #[test]
    fn no_devices_without_backend() {
        assert!(CpalDevice::default_output().is_none());
        assert!(CpalDevice::list_outputs().is_empty());
    }
}
