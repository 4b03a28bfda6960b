use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::config::{Config, DeviceConfig, PayloadKind};
use crate::models::{DeviceReading, Message, Payload};

/// Produces synthetic payloads: random text picks or jittered sensor readings.
pub struct SampleGenerator<R = StdRng> {
    rng: R,
    kind: PayloadKind,
    device: DeviceConfig,
    text_messages: Vec<String>,
}

impl SampleGenerator<StdRng> {
    pub fn from_config(config: &Config) -> Self {
        let rng = match config.publisher.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(
            rng,
            config.publisher.payload,
            config.device.clone(),
            config.publisher.text_messages.clone(),
        )
    }
}

impl<R: Rng> SampleGenerator<R> {
    pub fn with_rng(
        rng: R,
        kind: PayloadKind,
        device: DeviceConfig,
        text_messages: Vec<String>,
    ) -> Self {
        Self {
            rng,
            kind,
            device,
            text_messages,
        }
    }

    pub fn next_payload(&mut self) -> Payload {
        match self.kind {
            PayloadKind::Text => Payload::Text(self.text()),
            PayloadKind::Json => Payload::Reading(self.reading()),
        }
    }

    pub fn text(&mut self) -> String {
        self.text_messages
            .choose(&mut self.rng)
            .cloned()
            .unwrap_or_default()
    }

    pub fn reading(&mut self) -> Message {
        let temperature = self.jitter(self.device.temperature_base, self.device.temperature_offset);
        let humidity = self.jitter(self.device.humidity_base, self.device.humidity_offset);

        Message::new(DeviceReading::temp_rh(
            self.device.id.clone(),
            self.device.name.clone(),
            temperature,
            humidity,
        ))
    }

    /// Returns a value in `[base, base + offset)` as seen in f32.
    fn jitter(&mut self, base: f64, offset: f64) -> f32 {
        if offset <= 0.0 {
            return base as f32;
        }

        let lower = base as f32;
        let upper = (base + offset) as f32;
        let value = (base + self.rng.gen_range(0.0..offset)) as f32;
        // Narrowing to f32 can round up onto the excluded upper bound.
        if value < upper {
            value
        } else {
            next_below(upper).max(lower)
        }
    }
}

/// The largest f32 strictly less than `value`.
fn next_below(value: f32) -> f32 {
    if value.is_nan() || value == f32::NEG_INFINITY {
        return value;
    }
    if value == 0.0 {
        return -f32::from_bits(1);
    }

    let bits = value.to_bits();
    if value > 0.0 {
        f32::from_bits(bits - 1)
    } else {
        f32::from_bits(bits + 1)
    }
}
