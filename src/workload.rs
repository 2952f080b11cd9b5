pub mod mixed;
pub mod read_heavy;
pub mod read_write;
pub mod write_heavy;

use crate::generator::{KeyDistribution, KeyGen};
use crate::request::{Method, Request};
use anyhow::{Result, ensure};
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thousands::Separable;
use tracing::{debug, info};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:3000";
pub const DEFAULT_PAYLOAD: &str = "./test_value.json";
pub const DEFAULT_CONTENT_TYPE: &str = "text/plain";

const RATIO_TOLERANCE: f64 = 1e-9;

/// Upper bound on init plus mixed requests, all of which are held in memory.
pub const MAX_TOTAL_REQUESTS: u64 = 100_000_000;

pub trait WorkloadConfig {
    fn get_name(&self) -> String;
    /// How many keys the init phase populates
    fn get_key_count(&self) -> u64;
    /// How many requests the mixed phase issues
    fn get_operation_count(&self) -> u64;
    /// Of all the mixed phase requests, what share are writes
    fn get_put_ratio(&self) -> f64;

    fn get_key_distribution(&self) -> KeyDistribution {
        KeyDistribution::Uniform
    }
}

/// Everything one generation run needs. Presets provide the defaults, the
/// properties file and command line override individual fields.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkloadParams {
    pub name: String,
    pub base_url: String,
    pub key_count: u64,
    pub operation_count: u64,
    pub put_ratio: f64,
    /// Only checked for consistency, `put_ratio` decides the mix.
    pub get_ratio: Option<f64>,
    pub distribution: KeyDistribution,
    pub zipf_exponent: f64,
    /// Drawn from OS entropy when unset.
    pub seed: Option<u64>,
    pub payload: PathBuf,
    pub content_type: String,
}

impl WorkloadParams {
    pub fn from_preset(preset: &dyn WorkloadConfig) -> Self {
        WorkloadParams {
            name: preset.get_name(),
            base_url: DEFAULT_BASE_URL.to_owned(),
            key_count: preset.get_key_count(),
            operation_count: preset.get_operation_count(),
            put_ratio: preset.get_put_ratio(),
            get_ratio: None,
            distribution: preset.get_key_distribution(),
            zipf_exponent: 1.0,
            seed: None,
            payload: PathBuf::from(DEFAULT_PAYLOAD),
            content_type: DEFAULT_CONTENT_TYPE.to_owned(),
        }
    }

    fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkloadStats {
    pub key_count: u64,
    pub mixed_ops: u64,
    pub put_ops: u64,
    pub get_ops: u64,
    pub put_ratio: f64,
    pub get_ratio: f64,
    pub distribution: KeyDistribution,
    pub seed: u64,
}

impl Display for WorkloadStats {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== INIT ===")?;
        writeln!(
            f,
            "keys: {} | writes: {}",
            self.key_count.separate_with_underscores(),
            self.key_count.separate_with_underscores()
        )?;
        writeln!(f, "=== MIXED ===")?;
        write!(
            f,
            "requests: {} | writes: {} ({:.1}%) | reads: {} ({:.1}%) | keys: {:?} | seed: {}",
            self.mixed_ops.separate_with_underscores(),
            self.put_ops.separate_with_underscores(),
            self.put_ratio * 100.0,
            self.get_ops.separate_with_underscores(),
            self.get_ratio * 100.0,
            self.distribution,
            self.seed
        )
    }
}

/// A generated workload: the init phase followed by the shuffled mixed phase.
#[derive(Debug)]
pub struct Workload {
    pub name: String,
    pub init: Vec<Request>,
    pub mixed: Vec<Request>,
    pub stats: WorkloadStats,
}

impl Workload {
    pub fn requests(&self) -> impl Iterator<Item = &Request> {
        self.init.iter().chain(self.mixed.iter())
    }

    pub fn len(&self) -> usize {
        self.init.len() + self.mixed.len()
    }
}

/// Number of writes in a mixed phase of `total` requests, rounded down.
pub fn put_count(put_ratio: f64, total: u64) -> u64 {
    (put_ratio * total as f64).floor() as u64
}

/// One write per key, `key1` through `key{key_count}` in order.
pub fn init_phase(
    base_url: &str,
    key_count: u64,
    content_type: &str,
    payload: &Arc<Path>,
) -> Vec<Request> {
    (1..=key_count)
        .map(|key| Request::store(base_url, key, content_type, payload))
        .collect()
}

/// `put_count` writes and the remaining reads on randomly chosen keys, shuffled together.
pub fn mixed_phase(
    base_url: &str,
    operation_count: u64,
    put_ratio: f64,
    content_type: &str,
    payload: &Arc<Path>,
    key_gen: &mut KeyGen,
) -> Vec<Request> {
    let num_put = put_count(put_ratio, operation_count);
    let num_get = operation_count - num_put;

    let mut requests = Vec::with_capacity(operation_count as usize);
    for _ in 0..num_put {
        requests.push(Request::store(base_url, key_gen.next_key(), content_type, payload));
    }
    for _ in 0..num_get {
        requests.push(Request::get(base_url, key_gen.next_key()));
    }
    key_gen.shuffle(&mut requests);
    requests
}

pub fn generate(params: &WorkloadParams) -> Result<Workload> {
    validate_config(params)?;

    let seed = params.seed.unwrap_or_else(rand::random);
    info!(workload = %params.name, seed, "generating workload");

    let base_url = params.base_url();
    let payload: Arc<Path> = Arc::from(params.payload.as_path());

    let init = init_phase(base_url, params.key_count, &params.content_type, &payload);
    debug!(requests = init.len(), "built init phase");

    let mixed = if params.operation_count == 0 {
        Vec::new()
    } else {
        let mut key_gen = KeyGen::new(
            params.distribution,
            params.key_count,
            params.zipf_exponent,
            seed,
        )?;
        mixed_phase(
            base_url,
            params.operation_count,
            params.put_ratio,
            &params.content_type,
            &payload,
            &mut key_gen,
        )
    };

    let put_ops = mixed.iter().filter(|r| r.method == Method::Post).count() as u64;
    debug!(requests = mixed.len(), put_ops, "built mixed phase");

    let stats = WorkloadStats {
        key_count: params.key_count,
        mixed_ops: mixed.len() as u64,
        put_ops,
        get_ops: mixed.len() as u64 - put_ops,
        put_ratio: params.put_ratio,
        get_ratio: params.get_ratio.unwrap_or(1.0 - params.put_ratio),
        distribution: params.distribution,
        seed,
    };

    Ok(Workload { name: params.name.clone(), init, mixed, stats })
}

pub fn validate_config(params: &WorkloadParams) -> Result<()> {
    ensure!(
        params.put_ratio.is_finite(),
        "Put ratio must be a finite number"
    );
    ensure!(
        params.put_ratio >= 0.0,
        "Put ratio must be larger than or equal to 0"
    );
    ensure!(
        params.put_ratio <= 1.0,
        "Put ratio must be less than or equal to 1"
    );

    if let Some(get_ratio) = params.get_ratio {
        ensure!(
            (params.put_ratio + get_ratio - 1.0).abs() <= RATIO_TOLERANCE,
            "Get ratio {} does not match put ratio {}: reads are always the remainder of the writes",
            get_ratio,
            params.put_ratio
        );
    }

    ensure!(
        params.key_count > 0 || params.operation_count == 0,
        "Mixed workload needs at least one key to pick from"
    );

    let total = params.key_count.checked_add(params.operation_count);
    ensure!(
        total.is_some_and(|t| t <= MAX_TOTAL_REQUESTS),
        "Keys plus mixed requests must not exceed {}, got {} + {}",
        MAX_TOTAL_REQUESTS.separate_with_underscores(),
        params.key_count,
        params.operation_count
    );

    let base_url = params.base_url();
    ensure!(!base_url.is_empty(), "Server url must not be empty");
    ensure!(
        base_url.starts_with("http://") || base_url.starts_with("https://"),
        "Server url must start with http:// or https://, got {}",
        base_url
    );
    // the descriptor is line based and splits the request line on whitespace
    ensure!(
        !base_url.contains(char::is_whitespace),
        "Server url must not contain whitespace, got {:?}",
        base_url
    );
    ensure!(
        !params.content_type.contains(char::is_control),
        "Content type must not contain control characters, got {:?}",
        params.content_type
    );
    ensure!(
        !params.payload.to_string_lossy().contains(char::is_control),
        "Payload path must not contain control characters, got {:?}",
        params.payload
    );

    if params.distribution == KeyDistribution::Zipfian {
        ensure!(
            params.zipf_exponent.is_finite() && params.zipf_exponent > 0.0,
            "Zipf exponent must be a positive number"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn params(key_count: u64, operation_count: u64, put_ratio: f64) -> WorkloadParams {
        WorkloadParams {
            key_count,
            operation_count,
            put_ratio,
            seed: Some(1234),
            base_url: "http://kv:3000".to_owned(),
            ..WorkloadParams::from_preset(&mixed::Mixed)
        }
    }

    fn methods(reqs: &[Request]) -> (usize, usize) {
        let puts = reqs.iter().filter(|r| r.method == Method::Post).count();
        (puts, reqs.len() - puts)
    }

    #[test]
    fn init_phase_writes_every_key_in_order() {
        let payload: Arc<Path> = Arc::from(Path::new("v.json"));
        let reqs = init_phase("http://kv", 25, "text/plain", &payload);
        assert_eq!(reqs.len(), 25);
        for (i, r) in reqs.iter().enumerate() {
            assert_eq!(r.method, Method::Post);
            assert_eq!(r.url, format!("http://kv/store/key{}", i + 1));
        }
        assert!(init_phase("http://kv", 0, "text/plain", &payload).is_empty());
    }

    #[test]
    fn put_count_rounds_down() {
        assert_eq!(put_count(0.2, 5), 1);
        assert_eq!(put_count(0.2, 100_000), 20_000);
        assert_eq!(put_count(0.1, 9), 0);
        assert_eq!(put_count(0.0, 10), 0);
        assert_eq!(put_count(1.0, 10), 10);
        assert_eq!(put_count(0.5, 0), 0);
    }

    #[test]
    fn mixed_phase_counts_follow_put_ratio() {
        for (total, ratio) in [(0, 0.3), (1, 0.5), (7, 0.3), (1000, 0.2), (999, 0.95)] {
            let w = generate(&params(10, total, ratio)).unwrap();
            let (puts, gets) = methods(&w.mixed);
            let expected = put_count(ratio, total) as usize;
            assert_eq!(w.mixed.len(), total as usize);
            assert_eq!(puts, expected);
            assert_eq!(gets, total as usize - expected);
        }
    }

    #[test]
    fn scenario_three_keys_five_requests() {
        let w = generate(&params(3, 5, 0.2)).unwrap();
        let init: Vec<&str> = w.init.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(
            init,
            [
                "http://kv:3000/store/key1",
                "http://kv:3000/store/key2",
                "http://kv:3000/store/key3"
            ]
        );
        assert_eq!(methods(&w.mixed), (1, 4));
        assert_eq!(w.len(), 8);
        assert_eq!(w.stats.put_ops, 1);
        assert_eq!(w.stats.get_ops, 4);
    }

    #[test]
    fn extreme_ratios() {
        let reads = generate(&params(10, 50, 0.0)).unwrap();
        assert!(reads.mixed.iter().all(|r| r.method == Method::Get));
        assert!(reads.mixed.iter().all(|r| r.url.contains("/get/key")));

        let writes = generate(&params(10, 50, 1.0)).unwrap();
        assert!(writes.mixed.iter().all(|r| r.method == Method::Post));
        assert!(writes.mixed.iter().all(|r| r.url.contains("/store/key")));
    }

    #[test]
    fn mixed_keys_stay_in_key_space() {
        let w = generate(&params(4, 500, 0.5)).unwrap();
        for r in &w.mixed {
            let idx: u64 = r.key().trim_start_matches("key").parse().unwrap();
            assert!((1..=4).contains(&idx));
        }
    }

    #[test]
    fn shuffle_keeps_the_multiset() {
        let p = params(20, 200, 0.4);
        let seed = p.seed.unwrap();
        let shuffled = generate(&p).unwrap().mixed;

        // rebuild the unshuffled sequence from the same rng stream
        let payload: Arc<Path> = Arc::from(p.payload.as_path());
        let mut key_gen = KeyGen::new(p.distribution, 20, 1.0, seed).unwrap();
        let mut unshuffled = Vec::new();
        for _ in 0..put_count(0.4, 200) {
            unshuffled.push(Request::store("http://kv:3000", key_gen.next_key(), "text/plain", &payload));
        }
        for _ in 0..(200 - put_count(0.4, 200)) {
            unshuffled.push(Request::get("http://kv:3000", key_gen.next_key()));
        }

        let count = |reqs: &[Request]| {
            let mut m: HashMap<(Method, String), usize> = HashMap::new();
            for r in reqs {
                *m.entry((r.method, r.url.clone())).or_default() += 1;
            }
            m
        };
        assert_eq!(count(&shuffled), count(&unshuffled));
        assert_ne!(shuffled, unshuffled);
    }

    #[test]
    fn seeds_control_the_order() {
        let a = generate(&params(100, 50, 0.5)).unwrap().mixed;
        let b = generate(&params(100, 50, 0.5)).unwrap().mixed;
        assert_eq!(a, b);

        let c = generate(&WorkloadParams { seed: Some(4321), ..params(100, 50, 0.5) })
            .unwrap()
            .mixed;
        assert_ne!(a, c);
    }

    #[test]
    fn writes_share_one_payload_path() {
        let w = generate(&params(5, 20, 1.0)).unwrap();
        let first = w.init[0].body.clone().unwrap();
        for r in w.requests() {
            assert!(Arc::ptr_eq(r.body.as_ref().unwrap(), &first));
        }
    }

    #[test]
    fn trailing_slash_is_trimmed_from_base_url() {
        let p = WorkloadParams { base_url: "http://kv:3000/".to_owned(), ..params(1, 0, 0.5) };
        let w = generate(&p).unwrap();
        assert_eq!(w.init[0].url, "http://kv:3000/store/key1");
    }

    #[test]
    fn empty_workload() {
        let w = generate(&params(0, 0, 0.5)).unwrap();
        assert_eq!(w.len(), 0);
    }

    #[test]
    fn invalid_configs_are_rejected() {
        assert!(generate(&params(10, 10, -0.1)).is_err());
        assert!(generate(&params(10, 10, 1.5)).is_err());
        assert!(generate(&params(10, 10, f64::NAN)).is_err());
        assert!(generate(&params(0, 10, 0.5)).is_err());
        assert!(generate(&WorkloadParams { base_url: "".to_owned(), ..params(1, 1, 0.5) }).is_err());
        assert!(
            generate(&WorkloadParams { base_url: "kv:3000".to_owned(), ..params(1, 1, 0.5) })
                .is_err()
        );
        assert!(
            generate(&WorkloadParams {
                distribution: KeyDistribution::Zipfian,
                zipf_exponent: 0.0,
                ..params(10, 10, 0.5)
            })
            .is_err()
        );
    }

    #[test]
    fn whitespace_in_url_is_rejected() {
        let p = WorkloadParams { base_url: "http://kv host:3000".to_owned(), ..params(2, 3, 0.5) };
        let err = generate(&p).unwrap_err();
        assert!(err.to_string().contains("whitespace"), "{err}");

        let p = WorkloadParams { base_url: "http://kv:3000\n".to_owned(), ..params(2, 3, 0.5) };
        assert!(generate(&p).is_err());
    }

    #[test]
    fn line_breaks_in_content_type_are_rejected() {
        let p = WorkloadParams {
            content_type: "text/plain\n\nGET http://evil/get/x".to_owned(),
            ..params(2, 3, 0.5)
        };
        let err = generate(&p).unwrap_err();
        assert!(err.to_string().contains("Content type"), "{err}");

        let p = WorkloadParams { content_type: "text/plain\r".to_owned(), ..params(2, 3, 0.5) };
        assert!(generate(&p).is_err());
    }

    #[test]
    fn line_breaks_in_payload_are_rejected() {
        let p = WorkloadParams {
            payload: PathBuf::from("./a.json\nGET http://evil/get/x"),
            ..params(2, 3, 0.5)
        };
        let err = generate(&p).unwrap_err();
        assert!(err.to_string().contains("Payload path"), "{err}");
    }

    #[test]
    fn oversized_workloads_are_rejected_before_allocating() {
        let huge_mixed = WorkloadParams { operation_count: u64::MAX, ..params(1, 0, 0.5) };
        let err = generate(&huge_mixed).unwrap_err();
        assert!(err.to_string().contains("must not exceed"), "{err}");

        assert!(generate(&WorkloadParams { key_count: u64::MAX, ..params(0, 1, 0.5) }).is_err());
        assert!(generate(&params(MAX_TOTAL_REQUESTS, 1, 0.5)).is_err());
        assert!(validate_config(&params(MAX_TOTAL_REQUESTS - 10, 10, 0.5)).is_ok());
    }

    #[test]
    fn get_ratio_must_complement_put_ratio() {
        let ok = WorkloadParams { get_ratio: Some(0.8), ..params(10, 10, 0.2) };
        assert!(generate(&ok).is_ok());

        let bad = WorkloadParams { get_ratio: Some(0.5), ..params(10, 10, 0.2) };
        let err = generate(&bad).unwrap_err();
        assert!(err.to_string().contains("does not match"), "{err}");
    }

    #[test]
    fn stats_display() {
        let w = generate(&params(10_000, 100_000, 0.2)).unwrap();
        let s = w.stats.to_string();
        assert!(s.contains("keys: 10_000"), "{s}");
        assert!(s.contains("writes: 20_000 (20.0%)"), "{s}");
        assert!(s.contains("reads: 80_000 (80.0%)"), "{s}");
        assert!(s.contains("seed: 1234"), "{s}");
    }
}
