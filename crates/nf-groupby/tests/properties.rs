#![forbid(unsafe_code)]

//! Property-based tests for group-by partitioning and aggregation.

use nf_columnar::Column;
use nf_frame::DataFrame;
use nf_groupby::{GroupByExt, GroupByOptions};
use nf_types::Value;
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn arb_keys(len: usize) -> impl Strategy<Value = Vec<Option<String>>> {
    prop::collection::vec(
        prop::option::weighted(
            0.85,
            prop::sample::select(vec!["a", "b", "c", "d"]).prop_map(str::to_owned),
        ),
        len,
    )
}

fn arb_frame() -> impl Strategy<Value = DataFrame> {
    (0_usize..40).prop_flat_map(|len| {
        (
            arb_keys(len),
            prop::collection::vec(prop::option::weighted(0.8, -500_i64..500), len),
        )
            .prop_map(|(keys, vals)| {
                DataFrame::from_columns([("k", Column::from(keys)), ("v", Column::from(vals))])
                    .expect("frame")
            })
    })
}

// ---------------------------------------------------------------------------
// Partitioning
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn prop_every_row_lands_in_exactly_one_group(df in arb_frame()) {
        let grouped = df.groupby(&["k"]).expect("groupby");
        let mut rows: Vec<usize> = grouped.indices().values().flatten().copied().collect();
        rows.sort_unstable();
        prop_assert_eq!(rows, (0..df.num_rows()).collect::<Vec<_>>());
    }

    #[test]
    fn prop_group_sizes_sum_to_row_count(df in arb_frame()) {
        let sizes = df.groupby(&["k"]).expect("groupby").size().expect("size");
        let total = if sizes.num_columns() == 0 {
            0
        } else {
            sizes
                .column("size")
                .expect("size")
                .values()
                .iter()
                .filter_map(Value::as_i64)
                .sum::<i64>()
        };
        prop_assert_eq!(total, df.num_rows() as i64);
    }

    #[test]
    fn prop_dropna_groups_exclude_only_na_keys(df in arb_frame()) {
        let na_keys = df.column("k").expect("k").na_count();
        let grouped = df
            .groupby_with_options(&["k"], GroupByOptions { dropna: true })
            .expect("groupby");
        let kept: usize = grouped.indices().values().map(Vec::len).sum();
        prop_assert_eq!(kept, df.num_rows() - na_keys);
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn prop_group_sums_add_up_to_total(df in arb_frame()) {
        let grouped = df.groupby(&["k"]).expect("groupby");
        let sums = grouped.sum().expect("sum");
        let group_total: i64 = if sums.num_rows() == 0 {
            0
        } else {
            sums.column("v")
                .expect("v")
                .values()
                .iter()
                .filter_map(Value::as_i64)
                .sum()
        };
        let total = df.sum("v").expect("sum").as_i64().unwrap_or(0);
        prop_assert_eq!(group_total, total);
    }

    #[test]
    fn prop_filter_keeps_rows_in_original_order(df in arb_frame()) {
        let grouped = df.groupby(&["k"]).expect("groupby");
        let kept = grouped.filter(|group| group.num_rows() >= 2).expect("filter");
        let positions: Vec<usize> = kept
            .index()
            .labels()
            .iter()
            .map(|label| df.index().position(label).expect("label"))
            .collect();
        prop_assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
    }
}
