// Tone voice - short enveloped sine burst rendered in the audio callback
// One voice per committed tone; clicks and notes share the same shape

use std::f32::consts::TAU;

/// Attack length in milliseconds (short ramp to avoid a start click)
const ATTACK_MS: f32 = 10.0;

/// Decay target relative to peak at the end of the tone
const SILENCE_FLOOR: f32 = 1e-3;

/// A single scheduled tone being rendered.
///
/// Starts after `delay` samples (the offset from the current clock position
/// to the commanded start time), ramps up over a short attack, then decays
/// exponentially to the silence floor at the end of its duration.
#[derive(Debug, Clone)]
pub struct ToneVoice {
    phase: f32,
    phase_increment: f32,
    delay: u64,
    position: usize,
    total: usize,
    attack: usize,
    decay_coeff: f32,
    level: f32,
    gain: f32,
}

impl ToneVoice {
    pub fn new(frequency: f32, duration_samples: usize, gain: f32, delay: u64, sample_rate: f32) -> Self {
        let total = duration_samples.max(1);
        let attack = (((ATTACK_MS / 1000.0) * sample_rate) as usize).min(total / 4).max(1);
        let decay_samples = (total - attack).max(1);
        let decay_coeff = SILENCE_FLOOR.powf(1.0 / decay_samples as f32);

        Self {
            phase: 0.0,
            phase_increment: TAU * frequency / sample_rate,
            delay,
            position: 0,
            total,
            attack,
            decay_coeff,
            level: 1.0,
            gain,
        }
    }

    /// Render one sample (0.0 while still delayed or after the tone ends)
    pub fn next_sample(&mut self) -> f32 {
        if self.delay > 0 {
            self.delay -= 1;
            return 0.0;
        }
        if self.position >= self.total {
            return 0.0;
        }

        let envelope = if self.position < self.attack {
            self.position as f32 / self.attack as f32
        } else {
            self.level *= self.decay_coeff;
            self.level
        };

        let sample = self.phase.sin() * envelope * self.gain;

        self.phase += self.phase_increment;
        if self.phase >= TAU {
            self.phase -= TAU;
        }
        self.position += 1;

        sample
    }

    pub fn finished(&self) -> bool {
        self.position >= self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voice_renders_and_finishes() {
        // 100ms click at 48kHz
        let mut voice = ToneVoice::new(1200.0, 4800, 0.6, 0, 48000.0);

        let mut peak = 0.0f32;
        for _ in 0..4800 {
            peak = peak.max(voice.next_sample().abs());
        }

        assert!(voice.finished());
        assert!(peak > 0.2, "peak too quiet: {}", peak);
        assert!(peak <= 0.6 + 1e-3, "peak above gain: {}", peak);
        assert_eq!(voice.next_sample(), 0.0);
    }

    #[test]
    fn test_voice_decays_to_floor() {
        let mut voice = ToneVoice::new(440.0, 48000, 0.2, 0, 48000.0);

        for _ in 0..47_900 {
            voice.next_sample();
        }

        // Near the end the envelope has decayed close to the floor
        let mut tail_peak = 0.0f32;
        for _ in 0..100 {
            tail_peak = tail_peak.max(voice.next_sample().abs());
        }
        assert!(tail_peak < 0.2 * 0.01, "tail still loud: {}", tail_peak);
    }

    #[test]
    fn test_voice_delay_offset() {
        let mut voice = ToneVoice::new(440.0, 4800, 0.5, 100, 48000.0);

        for _ in 0..100 {
            assert_eq!(voice.next_sample(), 0.0);
        }
        assert!(!voice.finished());

        let mut non_zero = 0;
        for _ in 0..4800 {
            if voice.next_sample().abs() > 1e-4 {
                non_zero += 1;
            }
        }
        assert!(non_zero > 1000, "voice mostly silent after delay: {}", non_zero);
        assert!(voice.finished());
    }

    #[test]
    fn test_accent_louder_than_regular() {
        let mut accent = ToneVoice::new(1200.0, 4800, 0.6, 0, 48000.0);
        let mut regular = ToneVoice::new(800.0, 4800, 0.4, 0, 48000.0);

        let mut accent_peak = 0.0f32;
        let mut regular_peak = 0.0f32;
        for _ in 0..4800 {
            accent_peak = accent_peak.max(accent.next_sample().abs());
            regular_peak = regular_peak.max(regular.next_sample().abs());
        }

        assert!(accent_peak > regular_peak);
    }
}
