//! Magnitude spectrum of one IQ window
//!
//! Complex FFT of the window (no zero padding), magnitude, then an FFT shift
//! so bin 0 is the most negative frequency and DC sits at `len / 2`.

use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner, Length};

/// FFT plan and scratch buffer reused across windows of one size
pub struct SpectrumAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl SpectrumAnalyzer {
    /// Plan a forward FFT of `window_samples` points
    pub fn new(window_samples: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(window_samples);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];
        Self {
            fft,
            buffer: Vec::with_capacity(window_samples),
            scratch,
        }
    }

    /// Number of FFT points
    pub fn len(&self) -> usize {
        self.fft.len()
    }

    /// True for a zero-point plan
    pub fn is_empty(&self) -> bool {
        self.fft.len() == 0
    }

    /// FFT-shifted magnitude spectrum of `window`
    ///
    /// `window` must hold exactly [`len`](Self::len) samples; shorter input is
    /// zero-padded and longer input truncated.
    pub fn magnitude(&mut self, window: &[Complex<f32>]) -> Vec<f32> {
        let n = self.fft.len();
        self.buffer.clear();
        self.buffer.extend(window.iter().take(n).copied());
        self.buffer.resize(n, Complex::new(0.0, 0.0));

        self.fft
            .process_with_scratch(&mut self.buffer, &mut self.scratch);

        let mut magnitudes: Vec<f32> = self.buffer.iter().map(|c| c.norm()).collect();
        fft_shift(&mut magnitudes);
        magnitudes
    }
}

/// Rotate a spectrum so the zero-frequency bin moves to the centre
pub fn fft_shift<T>(spectrum: &mut [T]) {
    let n = spectrum.len();
    if n > 1 {
        spectrum.rotate_left((n + 1) / 2);
    }
}
