//! Final run summary rendering

use crate::orchestrator::Outcome;

/// One line per device, in the order given (completion order)
pub fn render(outcomes: &[Outcome]) -> String {
    outcomes
        .iter()
        .map(|outcome| match outcome {
            Outcome::Success { device, artifact } => {
                format!("[SUCCESS] {} -> {}", device, artifact.display())
            }
            Outcome::Failure { device, error } => {
                format!("[FAILED] {} -> {}", device, error)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Number of devices that failed this run
pub fn failure_count(outcomes: &[Outcome]) -> usize {
    outcomes.iter().filter(|o| !o.is_success()).count()
}
