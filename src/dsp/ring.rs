//! Fixed-size circular histories
//!
//! [`RingBuffer`] holds non-negative data only: squared samples for the RMS
//! tracker and dB peak estimates for the lookahead limiter. Its running sum is
//! updated incrementally on every push (subtract the evicted value, add the
//! new one) and clamped at zero so floating-point drift can never drive it
//! negative ahead of a square root. Once the window holds nothing but zeros
//! the sum is re-anchored to exactly zero.
//!
//! [`SampleHistory`] is a plain delay for signed samples.

/// Circular buffer of `N` non-negative values plus the running sum of its contents
#[derive(Debug, Clone)]
pub struct RingBuffer<const N: usize> {
    values: [f32; N],
    index: usize,
    sum: f32,
    /// Count of non-zero values currently retained
    nonzero: usize,
}

impl<const N: usize> RingBuffer<N> {
    /// Create a zeroed ring
    pub fn new() -> Self {
        Self {
            values: [0.0; N],
            index: 0,
            sum: 0.0,
            nonzero: 0,
        }
    }

    /// Number of retained values
    pub const fn len(&self) -> usize {
        N
    }

    /// True only for a zero-length ring
    pub const fn is_empty(&self) -> bool {
        N == 0
    }

    /// The value that the next push will evict
    #[inline]
    pub fn oldest(&self) -> f32 {
        self.values[self.index]
    }

    /// Insert `value`, returning the evicted value
    #[inline]
    pub fn push(&mut self, value: f32) -> f32 {
        let evicted = self.values[self.index];
        self.sum -= evicted;
        self.values[self.index] = value;
        self.sum += value;
        if evicted != 0.0 {
            self.nonzero -= 1;
        }
        if value != 0.0 {
            self.nonzero += 1;
        }
        if self.nonzero == 0 || self.sum < 0.0 {
            self.sum = 0.0;
        }
        self.index += 1;
        if self.index >= N {
            self.index = 0;
        }
        evicted
    }

    /// Running sum of all retained values
    #[inline]
    pub fn sum(&self) -> f32 {
        self.sum
    }

    /// Running mean over the full window
    #[inline]
    pub fn mean(&self) -> f32 {
        self.sum / N as f32
    }

    /// Current write position
    pub fn index(&self) -> usize {
        self.index
    }

    /// Sum recomputed from scratch (for drift checks)
    pub fn exact_sum(&self) -> f32 {
        self.values.iter().sum()
    }

    /// Zero every value and the running sum
    pub fn reset(&mut self) {
        self.values = [0.0; N];
        self.index = 0;
        self.sum = 0.0;
        self.nonzero = 0;
    }
}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Circular buffer of `N` signed samples with no summary bookkeeping
#[derive(Debug, Clone)]
pub struct SampleHistory<const N: usize> {
    values: [f32; N],
    index: usize,
}

impl<const N: usize> SampleHistory<N> {
    /// Create a zeroed history
    pub fn new() -> Self {
        Self {
            values: [0.0; N],
            index: 0,
        }
    }

    /// Insert `value`, returning the sample stored `N` pushes ago
    #[inline]
    pub fn push(&mut self, value: f32) -> f32 {
        let evicted = std::mem::replace(&mut self.values[self.index], value);
        self.index += 1;
        if self.index >= N {
            self.index = 0;
        }
        evicted
    }

    /// Zero every sample
    pub fn reset(&mut self) {
        self.values = [0.0; N];
        self.index = 0;
    }
}

impl<const N: usize> Default for SampleHistory<N> {
    fn default() -> Self {
        Self::new()
    }
}
