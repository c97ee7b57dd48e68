pub const DEFAULT_TEMPO_BPM: f64 = 120.0;
pub const MIN_ESTIMATED_BPM: f64 = 60.0;
pub const MAX_ESTIMATED_BPM: f64 = 200.0;

/// Estimate tempo from onset times.
///
/// Inter-onset intervals strictly between 0.1s and 2.0s are averaged and converted to
/// BPM, then clamped to 60..=200. Too few events or no usable interval gives 120.
pub fn estimate_tempo(times: &[f64]) -> f64 {
    if times.len() < 2 {
        return DEFAULT_TEMPO_BPM;
    }
    let mut sorted = times.to_vec();
    sorted.sort_by(f64::total_cmp);

    let intervals: Vec<f64> = sorted
        .windows(2)
        .map(|w| w[1] - w[0])
        .filter(|d| *d > 0.1 && *d < 2.0)
        .collect();
    if intervals.is_empty() {
        return DEFAULT_TEMPO_BPM;
    }

    let mean = intervals.iter().sum::<f64>() / intervals.len() as f64;
    (60.0 / mean).clamp(MIN_ESTIMATED_BPM, MAX_ESTIMATED_BPM)
}

/// Grid size in beats for a quantization level. Unrecognized levels use sixteenths.
pub fn quantization_grid(level: &str) -> f64 {
    match level {
        "whole" => 4.0,
        "half" => 2.0,
        "quarter" => 1.0,
        "eighth" => 0.5,
        "sixteenth" => 0.25,
        "thirty_second" => 0.125,
        _ => 0.25,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steady_half_second_pulse_is_120() {
        let times = [0.0, 0.5, 1.0, 1.5, 2.0];
        assert!((estimate_tempo(&times) - 120.0).abs() < 1e-9);
    }

    #[test]
    fn unsorted_input_is_sorted_first() {
        let times = [1.0, 0.0, 0.75, 0.25, 0.5];
        assert!((estimate_tempo(&times) - 200.0).abs() < 1e-9);
    }

    #[test]
    fn fast_pulse_is_clamped() {
        // 0.15s apart is 400 BPM
        let times = [0.0, 0.15, 0.3, 0.45];
        assert_eq!(estimate_tempo(&times), MAX_ESTIMATED_BPM);
    }

    #[test]
    fn slow_pulse_is_clamped() {
        let times = [0.0, 1.9, 3.8];
        assert_eq!(estimate_tempo(&times), MIN_ESTIMATED_BPM);
    }

    #[test]
    fn defaults() {
        assert_eq!(estimate_tempo(&[]), DEFAULT_TEMPO_BPM);
        assert_eq!(estimate_tempo(&[1.0]), DEFAULT_TEMPO_BPM);
        // simultaneous hits and long gaps produce no usable interval
        assert_eq!(estimate_tempo(&[0.0, 0.0, 5.0]), DEFAULT_TEMPO_BPM);
    }

    #[test]
    fn grids() {
        assert_eq!(quantization_grid("quarter"), 1.0);
        assert_eq!(quantization_grid("thirty_second"), 0.125);
        assert_eq!(quantization_grid("unknown"), 0.25);
    }
}
