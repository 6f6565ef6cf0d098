use core::{fmt::Display, time::Duration};

/// Device timestamps of a kernel launch, in nanoseconds.
#[derive(new, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileDuration {
    /// When the device started executing the command.
    pub start_ns: u64,
    /// When the device completed the command.
    pub end_ns: u64,
}

impl ProfileDuration {
    /// Elapsed device time. A timestamp pair going backwards counts as zero.
    pub fn elapsed_ns(&self) -> u64 {
        self.end_ns.saturating_sub(self.start_ns)
    }

    /// Elapsed device time as a [Duration].
    pub fn as_duration(&self) -> Duration {
        Duration::from_nanos(self.elapsed_ns())
    }
}

/// Operations per second achieved over a device interval.
#[derive(new, Debug, Clone, Copy, PartialEq)]
pub struct Throughput {
    /// Number of floating point operations performed.
    pub operations: f64,
    /// Device time spent.
    pub duration: Duration,
}

impl Throughput {
    /// Floating point operations per second, zero for an empty interval.
    pub fn flops(&self) -> f64 {
        let secs = self.duration.as_secs_f64();

        if secs == 0.0 {
            return 0.0;
        }

        self.operations / secs
    }

    /// Billions of operations per second.
    pub fn gflops(&self) -> f64 {
        self.flops() / 1e9
    }

    /// Trillions of operations per second.
    pub fn tflops(&self) -> f64 {
        self.flops() / 1e12
    }

    /// Elapsed milliseconds.
    pub fn millis(&self) -> f64 {
        self.duration.as_secs_f64() * 1e3
    }
}

impl Display for Throughput {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{:.4} ms elapsed and achieved {:.4} TFlops",
            self.millis(),
            self.tflops()
        )
    }
}

/// Operation count of a GEMM: one multiply and one add per inner product term.
pub fn gemm_operations(n: usize, m: usize, k: usize) -> f64 {
    2.0 * n as f64 * m as f64 * k as f64
}

/// Operation count of a work-efficient scan of `n` elements.
pub fn scan_operations(n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }

    let n = n as f64;
    n * n.log2() * 2.0
}
