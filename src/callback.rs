use faer::MatRef;

use crate::{E, I};

/// Hook invoked once per solver iteration for logging, monitoring, or
/// collecting diagnostics. The core itself never performs I/O.
pub trait Callback {
    /// Called at the end of each iteration with the current iterates.
    fn call(&mut self, report: &IterationReport<'_>);
}

/// Snapshot handed to a [`Callback`] at the end of an iteration.
pub struct IterationReport<'a> {
    pub iteration: I,
    /// Current low-rank iterate (the working iterate `X` for the noisy
    /// solvers, `M` for PCP).
    pub low_rank: MatRef<'a, E>,
    /// Current anomaly iterate.
    pub anomalies: MatRef<'a, E>,
    /// Weighted cost decomposition at this iterate.
    pub cost: CostTerms,
    /// Convergence witness at this iteration.
    pub increment: E,
}

/// Weighted terms of the objective at one iterate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostTerms {
    /// Data-fit term `0.5 * ||D - X - A||_F^2`.
    pub noise: E,
    /// Weighted nuclear term (`tau * ||X||_*`, or `||M||_*` for PCP).
    pub nuclear: E,
    /// Weighted anomaly term `lam * ||A||_1`.
    pub anomalies: E,
}

impl CostTerms {
    pub fn total(&self) -> E {
        self.noise + self.nuclear + self.anomalies
    }
}

/// Prints the convergence witness and cost terms to stdout each iteration.
pub struct ConvergenceOutput {}

impl ConvergenceOutput {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for ConvergenceOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl Callback for ConvergenceOutput {
    fn call(&mut self, report: &IterationReport<'_>) {
        let txt = format!(
            "| {:4}: | {:<8.2e} | {:<8.2e} | {:<8.2e} | {:<8.2e} | {:<8.2e} |",
            report.iteration,
            report.increment,
            report.cost.noise,
            report.cost.nuclear,
            report.cost.anomalies,
            report.cost.total(),
        );
        println!("{}", txt);
    }
}
