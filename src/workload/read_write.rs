use crate::workload::WorkloadConfig;

#[derive(Default)]
pub struct ReadWrite;

impl WorkloadConfig for ReadWrite {
    fn get_name(&self) -> String {
        "ReadWrite".to_owned()
    }

    fn get_key_count(&self) -> u64 {
        10_000
    }

    fn get_operation_count(&self) -> u64 {
        100_000
    }

    fn get_put_ratio(&self) -> f64 {
        0.5
    }
}
