use crate::workload::WorkloadConfig;

/// 20% writes over a 10k key space, 100k mixed requests.
#[derive(Default)]
pub struct Mixed;

impl WorkloadConfig for Mixed {
    fn get_name(&self) -> String {
        "Mixed".to_owned()
    }

    fn get_key_count(&self) -> u64 {
        10_000
    }

    fn get_operation_count(&self) -> u64 {
        100_000
    }

    fn get_put_ratio(&self) -> f64 {
        0.2
    }
}
