//! Energy-based silence trimming
//!
//! Takes are recorded for a fixed duration, so most of them start and end
//! with dead air. Trimming it keeps recognizers from hallucinating words
//! into silence, and an all-silent take is skipped without a request.

/// Minimum RMS energy for a frame to count as speech
const ENERGY_THRESHOLD: f32 = 0.02;

/// Analysis frame (30 ms at 16kHz)
const FRAME_SAMPLES: usize = 480;

/// Frames of context kept on each side of the detected speech
const PADDING_FRAMES: usize = 5;

/// Minimum voiced frames for a take to count as speech (90 ms)
const MIN_SPEECH_FRAMES: usize = 3;

/// Calculate RMS energy of audio samples
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn calculate_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Whether the take holds no speech at all
#[must_use]
pub fn is_silent(samples: &[f32]) -> bool {
    voiced_frames(samples).count() < MIN_SPEECH_FRAMES
}

/// Cut leading and trailing silence, keeping a little padding
///
/// Returns an empty slice when the take is silent.
#[must_use]
pub fn trim_silence(samples: &[f32]) -> &[f32] {
    let voiced: Vec<usize> = voiced_frames(samples).collect();
    if voiced.len() < MIN_SPEECH_FRAMES {
        tracing::debug!(samples = samples.len(), "take is silent");
        return &[];
    }
    let [first, .., last] = voiced[..] else {
        return &[];
    };

    let start = first.saturating_sub(PADDING_FRAMES) * FRAME_SAMPLES;
    let end = ((last + 1 + PADDING_FRAMES) * FRAME_SAMPLES).min(samples.len());

    tracing::trace!(start, end, total = samples.len(), "trimmed silence");
    &samples[start..end]
}

/// Indexes of frames whose energy is above the speech threshold
fn voiced_frames(samples: &[f32]) -> impl Iterator<Item = usize> + '_ {
    samples
        .chunks(FRAME_SAMPLES)
        .enumerate()
        .filter(|(_, frame)| calculate_energy(frame) > ENERGY_THRESHOLD)
        .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(frames: usize) -> Vec<f32> {
        #[allow(clippy::cast_precision_loss)]
        (0..frames * FRAME_SAMPLES)
            .map(|i| 0.3 * (i as f32 * 0.2).sin())
            .collect()
    }

    #[test]
    fn test_energy_calculation() {
        let silence = vec![0.0f32; 100];
        assert!(calculate_energy(&silence) < 0.001);

        let loud = vec![0.5f32; 100];
        assert!(calculate_energy(&loud) > 0.4);
    }

    #[test]
    fn silence_trims_to_nothing() {
        let silence = vec![0.0f32; FRAME_SAMPLES * 50];
        assert!(is_silent(&silence));
        assert!(trim_silence(&silence).is_empty());
        assert!(trim_silence(&[]).is_empty());
    }

    #[test]
    fn short_click_is_silent() {
        let mut take = vec![0.0f32; FRAME_SAMPLES * 20];
        take.extend(tone(1));
        take.extend(vec![0.0f32; FRAME_SAMPLES * 20]);
        assert!(is_silent(&take));
    }

    #[test]
    fn speech_is_kept_with_padding() {
        let mut take = vec![0.0f32; FRAME_SAMPLES * 20];
        take.extend(tone(10));
        take.extend(vec![0.0f32; FRAME_SAMPLES * 30]);

        let trimmed = trim_silence(&take);
        assert_eq!(trimmed.len(), (10 + 2 * PADDING_FRAMES) * FRAME_SAMPLES);
    }

    #[test]
    fn speech_at_the_edges_is_not_overrun() {
        let take = tone(8);
        assert_eq!(trim_silence(&take).len(), take.len());
    }
}
