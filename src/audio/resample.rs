//! Streaming linear-interpolation resampler.
//!
//! Device callbacks arrive in arbitrary block sizes, so the read position and
//! the last input sample are carried across calls. Output length over any
//! sequence of calls tracks `total_input * target / source` to within two
//! samples.

/// Linear resampler for mono audio
#[derive(Debug, Clone)]
pub struct LinearResampler {
    source_rate: u32,
    target_rate: u32,
    /// Input samples advanced per output sample
    step: f64,
    /// Read position relative to the start of the next input block; -1.0 is
    /// the last sample of the previous block
    position: f64,
    last_sample: f32,
}

impl LinearResampler {
    pub fn new(source_rate: u32, target_rate: u32) -> Self {
        let step = if source_rate == 0 || target_rate == 0 {
            1.0
        } else {
            source_rate as f64 / target_rate as f64
        };

        Self {
            source_rate,
            target_rate,
            step,
            position: 0.0,
            last_sample: 0.0,
        }
    }

    pub fn source_rate(&self) -> u32 {
        self.source_rate
    }

    pub fn target_rate(&self) -> u32 {
        self.target_rate
    }

    pub fn is_passthrough(&self) -> bool {
        self.source_rate == self.target_rate || self.source_rate == 0 || self.target_rate == 0
    }

    /// Resample one block of input
    pub fn process(&mut self, input: &[f32]) -> Vec<f32> {
        if input.is_empty() {
            return Vec::new();
        }
        if self.is_passthrough() {
            return input.to_vec();
        }

        let last_index = (input.len() - 1) as f64;
        let expected = ((input.len() as f64) / self.step).ceil() as usize + 1;
        let mut output = Vec::with_capacity(expected);

        let mut pos = self.position;
        while pos <= last_index {
            let base = pos.floor();
            let frac = (pos - base) as f32;
            let i = base as isize;

            let a = self.sample_at(input, i);
            let b = if frac == 0.0 { a } else { self.sample_at(input, i + 1) };
            output.push(a + (b - a) * frac);

            pos += self.step;
        }

        self.position = pos - input.len() as f64;
        self.last_sample = input[input.len() - 1];

        output
    }

    /// Forget carried state (new capture cycle)
    pub fn reset(&mut self) {
        self.position = 0.0;
        self.last_sample = 0.0;
    }

    fn sample_at(&self, input: &[f32], index: isize) -> f32 {
        if index < 0 {
            self.last_sample
        } else {
            input[index as usize]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passthrough_when_rates_match() {
        let mut rs = LinearResampler::new(24000, 24000);
        let input = vec![0.1, 0.2, 0.3];
        assert_eq!(rs.process(&input), input);
    }

    #[test]
    fn test_halving_rate_takes_every_other_sample() {
        let mut rs = LinearResampler::new(48000, 24000);
        let input: Vec<f32> = (0..8).map(|i| i as f32).collect();
        assert_eq!(rs.process(&input), vec![0.0, 2.0, 4.0, 6.0]);
    }

    #[test]
    fn test_upsampling_interpolates_between_samples() {
        let mut rs = LinearResampler::new(12000, 24000);
        let out = rs.process(&[0.0, 1.0]);
        assert_eq!(out, vec![0.0, 0.5, 1.0]);
        // The midpoint between blocks uses the carried last sample
        let out = rs.process(&[0.0]);
        assert_eq!(out, vec![0.5, 0.0]);
    }

    #[test]
    fn test_output_length_tracks_ratio_across_irregular_blocks() {
        let cases = [(48000u32, 24000u32), (44100, 24000), (16000, 24000), (22050, 24000)];
        let block_sizes = [128usize, 441, 480, 1024, 37, 2048];

        for (source, target) in cases {
            let mut rs = LinearResampler::new(source, target);
            let mut total_in = 0usize;
            let mut total_out = 0usize;

            for round in 0..50 {
                let n = block_sizes[round % block_sizes.len()];
                total_in += n;
                total_out += rs.process(&vec![0.0; n]).len();
            }

            let expected = total_in as f64 * target as f64 / source as f64;
            assert!(
                (total_out as f64 - expected).abs() <= 2.0,
                "{}->{}: got {} expected {:.2}",
                source,
                target,
                total_out,
                expected
            );
        }
    }
}
