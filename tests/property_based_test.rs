//! Property-based tests using proptest
//!
//! Tests that verify properties hold for arbitrary inputs.

use proptest::prelude::*;
use spectrum_exporter::collectors::units;
use spectrum_exporter::config::ExtraLabel;
use spectrum_exporter::metrics::{MetricDesc, MetricSink};

const POOL_CAPACITY: MetricDesc = MetricDesc::gauge(
    "mdiskgrp_capacity",
    "Pool capacity",
    &["resource", "pool_name"],
);

proptest! {
    #[test]
    fn test_whole_units_convert_exactly(n in 0u64..10_000, unit_idx in 0usize..5) {
        // Given: A whole number of some unit, in each accepted spelling
        let (suffixes, factor) = [
            (["K", "KB", "KiB"], 1u64 << 10),
            (["M", "MB", "MiB"], 1u64 << 20),
            (["G", "GB", "GiB"], 1u64 << 30),
            (["T", "TB", "TiB"], 1u64 << 40),
            (["P", "PB", "PiB"], 1u64 << 50),
        ][unit_idx];

        for suffix in suffixes {
            // When: Parsing "<n>.00<suffix>"
            let parsed = units::to_bytes(&format!("{}.00{}", n, suffix));

            // Then: The result is n times the unit
            prop_assert_eq!(parsed.unwrap(), n * factor);
        }
    }

    #[test]
    fn test_to_bytes_never_panics(raw in "\\PC*") {
        let _ = units::to_bytes(&raw);
    }

    #[test]
    fn test_unit_less_numbers_are_rejected(n in 0u64..u64::MAX) {
        prop_assert!(units::to_bytes(&n.to_string()).is_err());
    }

    #[test]
    fn test_any_pool_name_renders_without_panic(pool_name in "\\PC*") {
        // Given: A sink and an arbitrary pool name
        let sink = MetricSink::default();

        // When: Emitting a gauge with that label value
        sink.gauge(&POOL_CAPACITY, &["SARA", pool_name.as_str()], 1.0);

        // Then: Rendering succeeds and the value can be read back
        prop_assert!(sink.render().is_ok());
        prop_assert_eq!(sink.value(&POOL_CAPACITY, &["SARA", pool_name.as_str()]), Some(1.0));
    }

    #[test]
    fn test_extra_label_value_is_on_every_series(value in "[a-z0-9]{1,12}") {
        let sink = MetricSink::new(&[ExtraLabel {
            name: "datacenter".to_string(),
            value: value.clone(),
        }]);
        sink.gauge(&POOL_CAPACITY, &["SARA", "Pool0"], 5.0);
        sink.gauge(&POOL_CAPACITY, &["SARA", "Pool1"], 6.0);

        let rendered = sink.render().unwrap();
        let series: Vec<&str> = rendered
            .lines()
            .filter(|l| l.starts_with("spectrum_mdiskgrp_capacity{"))
            .collect();
        prop_assert_eq!(series.len(), 2);
        let expected = format!("datacenter=\"{}\"", value);
        for line in series {
            prop_assert!(line.contains(&expected));
        }
    }

    #[test]
    fn test_node_status_is_total_over_known_values(idx in 0usize..7) {
        let names = ["online", "offline", "service", "flushing", "pending", "adding", "deleting"];
        prop_assert_eq!(units::node_status(names[idx]), Some(idx as f64));
    }
}
