// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn sequential_visits_every_node_once_per_round() {
    let loads = [1.0, 1.0, 1.0];
    let mut last = 0;
    let mut seen = Vec::new();
    for _ in 0..3 {
        last = select_node(BalanceMode::Sequential, last, &loads);
        seen.push(last);
    }
    assert_eq!(seen, vec![1, 2, 0]);
}

#[test]
fn load_balance_picks_the_minimum_with_lowest_index_ties() {
    assert_eq!(select_node(BalanceMode::LoadBalance, 0, &[0.9, 0.2, 0.4]), 1);
    assert_eq!(select_node(BalanceMode::LoadBalance, 0, &[0.2, 0.2, 0.4]), 0);
    assert_eq!(select_node(BalanceMode::LoadBalance, 0, &[3.0, 2.0, 1.0]), 2);
}

#[test]
fn random_stays_in_range_and_spreads() {
    let loads = [1.0; 4];
    let mut hits = [0usize; 4];
    for _ in 0..4000 {
        let n = select_node(BalanceMode::Random, 0, &loads);
        hits[n] += 1;
    }
    assert!(hits.iter().all(|h| *h > 0), "every node gets picked: {hits:?}");
}

#[parameterized(
    fresh_product = { true, Some(1), None, "", Some("02.00") },
    fresh_without_counter = { true, Some(0), None, "", Some("01.00") },
    duplicate_signature = { false, None, Some("01.00"), "01.00", Some("01.01") },
    different_version_archived = { false, None, Some("01.00"), "02.00", None },
    nothing_archived = { false, None, None, "01.00", None },
)]
fn version_decisions(
    needs_version: bool,
    counter: Option<i32>,
    existing: Option<&str>,
    current: &str,
    expect: Option<&str>,
) {
    let got = decide_version(needs_version, counter, existing, current).map(|v| v.to_string());
    assert_eq!(got.as_deref(), expect);
}

#[test]
fn minor_rollover_bumps_major() {
    let got = decide_version(false, None, Some("01.99"), "01.99").map(|v| v.to_string());
    assert_eq!(got.as_deref(), Some("02.00"));
}
