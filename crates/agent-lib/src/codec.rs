//! Sample line codec
//!
//! A sample is stored as a single human-readable line of `name=value`
//! pairs joined by `, `:
//!
//! ```text
//! cpu_cores=0.012345, cpu_time_sec=12.50, mem_usage_kb=2048.00, mem_working_kb=1024.00, rss_kb=512.00, logs_bytes=4096, rootfs_bytes=8192
//! ```
//!
//! Field order and per-field precision are part of the stored format.
//! Decoding looks each field up independently, so reordered, missing or
//! unknown fields are tolerated.

use crate::models::{ContainerSample, DecodedSample};
use regex::Regex;
use std::sync::OnceLock;

/// Wire field names and their fixed decimal precision, in wire order
pub const FIELDS: [(&str, usize); 7] = [
    ("cpu_cores", 6),
    ("cpu_time_sec", 2),
    ("mem_usage_kb", 2),
    ("mem_working_kb", 2),
    ("rss_kb", 2),
    ("logs_bytes", 0),
    ("rootfs_bytes", 0),
];

const SEPARATOR: &str = ", ";

/// `name=number`, number being an optionally signed decimal with an
/// optional fractional part and exponent
static PAIR_PATTERN: OnceLock<Regex> = OnceLock::new();

fn pair_pattern() -> &'static Regex {
    PAIR_PATTERN.get_or_init(|| {
        Regex::new(r"([A-Za-z_][A-Za-z0-9_]*)=([-+]?[0-9]*\.?[0-9]+(?:[eE][-+]?[0-9]+)?)")
            .expect("sample pair pattern is valid")
    })
}

/// Encode a sample into its store member line
pub fn encode(sample: &ContainerSample) -> String {
    FIELDS
        .iter()
        .zip(sample.values())
        .map(|((name, precision), value)| format!("{}={:.*}", name, *precision, value))
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}

/// Decode a member line. The first well-formed occurrence of each known
/// field wins; anything else is ignored.
pub fn decode(line: &str) -> DecodedSample {
    let mut values: [Option<f64>; 7] = [None; 7];

    for captures in pair_pattern().captures_iter(line) {
        let (Some(name), Some(raw)) = (captures.get(1), captures.get(2)) else {
            continue;
        };
        let Some(slot) = FIELDS.iter().position(|(field, _)| *field == name.as_str()) else {
            continue;
        };
        if values[slot].is_none() {
            values[slot] = raw.as_str().parse::<f64>().ok();
        }
    }

    DecodedSample::from_values(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Round a value the same way `encode` renders it for a field
    fn round_to_precision(value: f64, precision: usize) -> f64 {
        format!("{:.*}", precision, value).parse().unwrap()
    }

    fn decoded_values(decoded: &DecodedSample) -> [Option<f64>; 7] {
        [
            decoded.cpu_cores,
            decoded.cpu_time_sec,
            decoded.mem_usage_kb,
            decoded.mem_working_kb,
            decoded.rss_kb,
            decoded.logs_bytes,
            decoded.rootfs_bytes,
        ]
    }

    /// Finite values: anything f64 can hold, plus points exactly half a
    /// unit away from a rounding step at each stored precision
    fn field_value() -> impl Strategy<Value = f64> {
        prop_oneof![
            any::<f64>().prop_filter("finite", |v| v.is_finite()),
            -1.0e15..1.0e15f64,
            (-1_000_000_000i64..1_000_000_000, 0i32..=6)
                .prop_map(|(n, places)| (n as f64 + 0.5) / 10f64.powi(places)),
        ]
    }

    fn any_sample() -> impl Strategy<Value = ContainerSample> {
        proptest::array::uniform7(field_value()).prop_map(|v| ContainerSample {
            cpu_cores: v[0],
            cpu_time_sec: v[1],
            mem_usage_kb: v[2],
            mem_working_kb: v[3],
            rss_kb: v[4],
            logs_bytes: v[5],
            rootfs_bytes: v[6],
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 512, failure_persistence: None, .. ProptestConfig::default() })]
        #[test]
        fn prop_decode_returns_encoded_values_rounded(sample in any_sample()) {
            let decoded = decode(&encode(&sample));

            for (((name, precision), value), actual) in FIELDS
                .iter()
                .zip(sample.values())
                .zip(decoded_values(&decoded))
            {
                prop_assert_eq!(
                    actual,
                    Some(round_to_precision(value, *precision)),
                    "field {} from {}", name, value
                );
            }
        }
    }

    fn sample() -> ContainerSample {
        ContainerSample {
            cpu_cores: 0.123456789,
            cpu_time_sec: 1234.5678,
            mem_usage_kb: 2048.004,
            mem_working_kb: 1024.5,
            rss_kb: 512.127,
            logs_bytes: 4096.7,
            rootfs_bytes: 8192.0,
        }
    }

    #[test]
    fn test_encode_format() {
        let line = encode(&sample());
        assert_eq!(
            line,
            "cpu_cores=0.123457, cpu_time_sec=1234.57, mem_usage_kb=2048.00, \
             mem_working_kb=1024.50, rss_kb=512.13, logs_bytes=4097, rootfs_bytes=8192"
        );
    }

    #[test]
    fn test_encode_zero_sample() {
        let line = encode(&ContainerSample {
            cpu_cores: 2.0,
            ..Default::default()
        });
        assert_eq!(
            line,
            "cpu_cores=2.000000, cpu_time_sec=0.00, mem_usage_kb=0.00, \
             mem_working_kb=0.00, rss_kb=0.00, logs_bytes=0, rootfs_bytes=0"
        );
    }

    #[test]
    fn test_decode_matches_rounded_input() {
        let original = sample();
        let decoded = decode(&encode(&original));
        let expected: Vec<Option<f64>> = FIELDS
            .iter()
            .zip(original.values())
            .map(|((_, precision), value)| Some(round_to_precision(value, *precision)))
            .collect();

        assert_eq!(decoded_values(&decoded).to_vec(), expected);
        assert_eq!(decoded.cpu_cores, Some(0.123457));
        assert_eq!(decoded.logs_bytes, Some(4097.0));
    }

    #[test]
    fn test_decode_missing_fields_are_absent() {
        let decoded = decode("cpu_cores=0.5, rss_kb=12.25");

        assert_eq!(decoded.cpu_cores, Some(0.5));
        assert_eq!(decoded.rss_kb, Some(12.25));
        assert_eq!(decoded.cpu_time_sec, None);
        assert_eq!(decoded.mem_usage_kb, None);
        assert_eq!(decoded.mem_working_kb, None);
        assert_eq!(decoded.logs_bytes, None);
        assert_eq!(decoded.rootfs_bytes, None);
    }

    #[test]
    fn test_decode_reordered_and_unknown_fields() {
        let decoded = decode("gpu_util=99, rootfs_bytes=10, cpu_cores=1.5e-3, new_field=abc");

        assert_eq!(decoded.rootfs_bytes, Some(10.0));
        assert_eq!(decoded.cpu_cores, Some(0.0015));
        assert_eq!(decoded.cpu_time_sec, None);
    }

    #[test]
    fn test_decode_signed_and_bare_fraction() {
        let decoded = decode("cpu_time_sec=-2.5, mem_usage_kb=+.75, logs_bytes=1E3");

        assert_eq!(decoded.cpu_time_sec, Some(-2.5));
        assert_eq!(decoded.mem_usage_kb, Some(0.75));
        assert_eq!(decoded.logs_bytes, Some(1000.0));
    }

    #[test]
    fn test_decode_malformed_value_is_absent() {
        let decoded = decode("cpu_cores=NaN, rss_kb=, logs_bytes=12");

        assert_eq!(decoded.cpu_cores, None);
        assert_eq!(decoded.rss_kb, None);
        assert_eq!(decoded.logs_bytes, Some(12.0));
    }

    #[test]
    fn test_decode_garbage_never_panics() {
        for line in ["", "=", "cpu_cores=", "====,,,", "cpu_cores==1", "\u{1F600}=1"] {
            let decoded = decode(line);
            assert!(decoded.cpu_cores.is_none(), "unexpected value for {:?}", line);
        }
    }

    #[test]
    fn test_decode_first_occurrence_wins() {
        let decoded = decode("cpu_cores=1.0, cpu_cores=2.0");
        assert_eq!(decoded.cpu_cores, Some(1.0));
    }

    #[test]
    fn test_identical_samples_encode_identically() {
        let a = ContainerSample {
            mem_usage_kb: 100.001,
            ..Default::default()
        };
        let b = ContainerSample {
            mem_usage_kb: 100.004,
            ..Default::default()
        };
        assert_eq!(encode(&a), encode(&b));
    }
}
