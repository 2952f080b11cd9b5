use crate::workload::WorkloadConfig;

#[derive(Default)]
pub struct ReadHeavy;

impl WorkloadConfig for ReadHeavy {
    fn get_name(&self) -> String {
        "ReadHeavy".to_string()
    }

    fn get_key_count(&self) -> u64 {
        10_000
    }

    fn get_operation_count(&self) -> u64 {
        100_000
    }

    fn get_put_ratio(&self) -> f64 {
        0.05
    }
}
