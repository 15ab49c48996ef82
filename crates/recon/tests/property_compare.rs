// Property tests for the field comparator.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use chrono::{Duration, NaiveDate, NaiveDateTime};
use proptest::prelude::*;

use contract_audit_recon::compare::{compare_field, values_match, Outcome, ResolvedRule};
use contract_audit_recon::config::{AuditConfig, FieldRule};
use contract_audit_recon::normalize::{normalize, same_date, Normalized};
use contract_audit_recon::{RawValue, ReferenceCategory, ReferenceTable, Table};

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn compare_numbers(rule: &FieldRule, main: f64, reference: f64) -> Outcome {
    let config = AuditConfig::default();
    let primary = Table::with_rows(
        "二次",
        &["合同编号", rule.primary.as_str()],
        1,
        vec![vec![RawValue::Text("C1".into()), RawValue::Number(main)]],
    );
    let table = Table::with_rows(
        "ref",
        &["合同编号", rule.reference.as_str()],
        0,
        vec![vec![RawValue::Text("C1".into()), RawValue::Number(reference)]],
    );
    let reference = ReferenceTable::new(ReferenceCategory::FundingDetail, table, "合同");
    let resolved = ResolvedRule::resolve(rule, &primary, &reference, &config);
    compare_field(&primary.rows[0], "C1", &reference, &resolved, &config.compare)
}

fn principal() -> FieldRule {
    FieldRule::new("租赁本金", "本金")
}

fn margin() -> FieldRule {
    FieldRule { tolerance: Some(0.005), ..FieldRule::new("保证金比例", "保证金比例_2") }
}

fn arb_datetime() -> impl Strategy<Value = NaiveDateTime> {
    (0i64..30_000, 0i64..86_400).prop_map(|(days, secs)| {
        NaiveDate::from_ymd_opt(1990, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap()
            + Duration::days(days)
            + Duration::seconds(secs)
    })
}

// ---------------------------------------------------------------------------
// Tolerance
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn within_default_tolerance_matches(base in -1e3..1e3f64, delta in -5e-7..5e-7f64) {
        prop_assert_eq!(compare_numbers(&principal(), base, base + delta), Outcome::NoMismatch);
    }

    #[test]
    fn beyond_default_tolerance_mismatches(base in -1e3..1e3f64, delta in 2e-6..1e3f64, sign in any::<bool>()) {
        let delta = if sign { delta } else { -delta };
        let out = compare_numbers(&principal(), base, base + delta);
        prop_assert!(matches!(out, Outcome::Mismatch { .. }), "got {:?}", out);
    }

    #[test]
    fn margin_tolerance_boundary(base in 0.0..1.0f64, delta in -0.0025..0.0025f64, far in 0.01..1.0f64) {
        prop_assert_eq!(compare_numbers(&margin(), base, base + delta), Outcome::NoMismatch);
        let out = compare_numbers(&margin(), base, base + far);
        prop_assert!(matches!(out, Outcome::Mismatch { .. }), "got {:?}", out);
    }

    #[test]
    fn values_match_is_symmetric(a in -1e6..1e6f64, b in -1e6..1e6f64, tol in 0.0..10.0f64) {
        let (x, y) = (Normalized::Number(a), Normalized::Number(b));
        prop_assert_eq!(values_match(&x, &y, tol), values_match(&y, &x, tol));
    }

    #[test]
    fn thousands_separators_do_not_matter(n in 0u64..10_000_000_000) {
        let plain = n.to_string();
        let mut grouped = String::new();
        for (i, c) in plain.chars().enumerate() {
            if i > 0 && (plain.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(c);
        }
        prop_assert_eq!(
            normalize(&RawValue::Text(grouped)),
            normalize(&RawValue::Number(n as f64))
        );
    }
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn same_date_is_commutative(a in arb_datetime(), b in arb_datetime()) {
        let (x, y) = (RawValue::DateTime(a), RawValue::DateTime(b));
        prop_assert_eq!(same_date(&x, &y), same_date(&y, &x));
        prop_assert_eq!(same_date(&x, &y), a.date() == b.date());
    }

    #[test]
    fn same_date_ignores_time_of_day(a in arb_datetime(), secs in 0u32..86_400) {
        let other = a.date().and_hms_opt(secs / 3600, (secs / 60) % 60, secs % 60).unwrap();
        prop_assert!(same_date(&RawValue::DateTime(a), &RawValue::DateTime(other)));
    }

    #[test]
    fn date_text_matches_cell(a in arb_datetime()) {
        let text = RawValue::Text(a.format("%Y-%m-%d %H:%M:%S").to_string());
        prop_assert!(same_date(&RawValue::DateTime(a), &text));
        prop_assert!(same_date(&text, &RawValue::DateTime(a)));
    }
}
