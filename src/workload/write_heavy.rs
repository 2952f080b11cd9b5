use crate::generator::KeyDistribution;
use crate::workload::WorkloadConfig;

/// Mostly overwrites concentrated on a few hot keys.
#[derive(Default)]
pub struct WriteHeavy;

impl WorkloadConfig for WriteHeavy {
    fn get_name(&self) -> String {
        "WriteHeavy".to_owned()
    }

    fn get_key_count(&self) -> u64 {
        10_000
    }

    fn get_operation_count(&self) -> u64 {
        100_000
    }

    fn get_put_ratio(&self) -> f64 {
        0.8
    }

    fn get_key_distribution(&self) -> KeyDistribution {
        KeyDistribution::Zipfian
    }
}
