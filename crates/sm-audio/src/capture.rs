use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rtrb::{Consumer, RingBuffer};

use crate::error::AudioError;
use crate::state::SampleSource;

/// Audio capture via cpal.
///
/// Writes mono f32 samples into a lock-free ring buffer. The stream stays on
/// the thread that opened it; the [`CaptureReader`] end can be moved to the
/// monitor thread.
///
/// # Example
/// ```no_run
/// use sm_audio::capture::AudioCapture;
/// let (capture, reader) = AudioCapture::start_default(16_000).unwrap();
/// ```
pub struct AudioCapture {
    stream: cpal::Stream,
    sample_rate: u32,
}

/// Consumer end of the capture ring buffer.
pub struct CaptureReader {
    consumer: Consumer<f32>,
}

impl AudioCapture {
    /// Reference to the underlying cpal stream (kept alive for capture).
    #[must_use]
    pub fn stream(&self) -> &cpal::Stream {
        &self.stream
    }

    /// Start capturing from the default input device.
    ///
    /// Prefers an f32 config at `preferred_rate`; falls back to the device
    /// default config with a warning.
    ///
    /// # Errors
    /// Returns `AudioError::CaptureUnavailable` if the device cannot be opened.
    pub fn start_default(preferred_rate: u32) -> Result<(Self, CaptureReader), AudioError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| AudioError::CaptureUnavailable("Pas de périphérique audio trouvé".into()))?;

        let config = pick_config(&device, preferred_rate)?;
        let sample_rate = config.sample_rate().0;
        let channels = usize::from(config.channels()).max(1);
        if sample_rate != preferred_rate {
            log::warn!(
                "Le périphérique ne propose pas {preferred_rate} Hz, capture à {sample_rate} Hz"
            );
        }

        // Ring buffer: 2 seconds of audio @ sample_rate
        let buf_size = sample_rate as usize * 2;
        let (mut producer, consumer) = RingBuffer::new(buf_size);

        let stream = device
            .build_input_stream(
                &config.into(),
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    // Downmix to mono and push into ring buffer
                    for chunk in data.chunks(channels) {
                        let mono: f32 = chunk.iter().sum::<f32>() / channels as f32;
                        let _ = producer.push(mono);
                    }
                },
                |err| {
                    log::error!("{}", AudioError::StreamError(err.to_string()));
                },
                None,
            )
            .map_err(|e| AudioError::CaptureUnavailable(e.to_string()))?;

        stream
            .play()
            .map_err(|e| AudioError::CaptureUnavailable(e.to_string()))?;
        log::info!("Capture micro démarrée @ {sample_rate}Hz, {channels} canal(aux)");

        Ok((
            Self {
                stream,
                sample_rate,
            },
            CaptureReader { consumer },
        ))
    }

    /// The sample rate of the capture stream.
    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// f32 config at `rate` if the device has one, default input config otherwise.
fn pick_config(
    device: &cpal::Device,
    rate: u32,
) -> Result<cpal::SupportedStreamConfig, AudioError> {
    let wanted = cpal::SampleRate(rate);
    if let Ok(ranges) = device.supported_input_configs() {
        let found = ranges
            .filter(|r| r.sample_format() == cpal::SampleFormat::F32)
            .find(|r| r.min_sample_rate() <= wanted && wanted <= r.max_sample_rate());
        if let Some(range) = found {
            return Ok(range.with_sample_rate(wanted));
        }
    }
    device
        .default_input_config()
        .map_err(|e| AudioError::CaptureUnavailable(e.to_string()))
}

impl SampleSource for CaptureReader {
    fn read_samples(&mut self, out: &mut Vec<f32>) -> usize {
        let available = self.consumer.slots();
        out.clear();
        out.reserve(available);
        let mut count = 0;
        while let Ok(sample) = self.consumer.pop() {
            out.push(sample);
            count += 1;
        }
        count
    }
}
