//! Host buffers for the bundled workloads.

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::workload::{GemmProblem, ScanProblem};

fn random_vec(rng: &mut StdRng, len: usize) -> Vec<f32> {
    (0..len).map(|_| rng.random::<f32>()).collect()
}

/// Operands of a GEMM, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct GemmInput {
    /// The problem the operands are sized for.
    pub problem: GemmProblem,
    /// `A`, n×m.
    pub lhs: Vec<f32>,
    /// `B`, m×k.
    pub rhs: Vec<f32>,
}

impl GemmInput {
    /// Operands drawn uniformly from `[0, 1)`.
    pub fn random(problem: GemmProblem, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let lhs = random_vec(&mut rng, problem.n * problem.m);
        let rhs = random_vec(&mut rng, problem.m * problem.k);

        Self { problem, lhs, rhs }
    }

    /// `A[i, j] = (i·m + j) / (n·m)` and `B[j, l] = (j·k + l) / (m·k)`.
    pub fn deterministic(problem: GemmProblem) -> Self {
        let GemmProblem { n, m, k } = problem;
        let lhs = (0..n * m).map(|i| i as f32 / (n * m) as f32).collect();
        let rhs = (0..m * k).map(|i| i as f32 / (m * k) as f32).collect();

        Self { problem, lhs, rhs }
    }

    /// The operands in kernel argument order.
    pub fn as_slices(&self) -> [&[f32]; 2] {
        [&self.lhs, &self.rhs]
    }

    /// A zeroed output buffer, n×k.
    pub fn output(&self) -> Vec<f32> {
        vec![0.0; self.problem.n * self.problem.k]
    }
}

/// Input of a scan.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanInput {
    /// The problem the input is sized for.
    pub problem: ScanProblem,
    /// The values to sum.
    pub values: Vec<f32>,
}

impl ScanInput {
    /// Values drawn uniformly from `[0, 1)`.
    pub fn random(problem: ScanProblem, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let values = random_vec(&mut rng, problem.n);

        Self { problem, values }
    }

    /// All ones, whose inclusive scan is `1..=n`.
    pub fn ones(problem: ScanProblem) -> Self {
        Self {
            problem,
            values: vec![1.0; problem.n],
        }
    }

    /// The input in kernel argument order.
    pub fn as_slices(&self) -> [&[f32]; 1] {
        [&self.values]
    }

    /// A zeroed output buffer.
    pub fn output(&self) -> Vec<f32> {
        vec![0.0; self.problem.n]
    }
}
