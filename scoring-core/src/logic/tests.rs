//! End-to-end pipeline tests

use std::sync::Arc;

use ndarray::{Array1, Array2, ArrayView2};

use super::config::ScoringConfig;
use super::features::FeatureTransformer;
use super::input::{RequiredSchema, Table, ValidatedBatch, Value};
use super::model::{ModelBundle, NoveltyModel, SerializedModel};
use super::pipeline::{PageQuery, ScoringContext};
use crate::constants::TRANSACTION_COLUMNS;
use crate::error::{PipelineError, Result};

const DEMO_BUNDLE: &str = include_str!("../../../model/demo_bundle.json");

// ============================================================================
// FIXTURES
// ============================================================================

/// Single feature: DMBTR as coerced by validation
struct AmountFeature;

impl FeatureTransformer for AmountFeature {
    fn transform(&self, batch: &ValidatedBatch) -> Result<Array2<f64>> {
        let idx = batch
            .column_index("DMBTR")
            .ok_or_else(|| PipelineError::Transform("DMBTR missing".to_string()))?;
        let values: Vec<f64> = batch
            .rows()
            .iter()
            .map(|r| r[idx].as_number().unwrap_or(0.0))
            .collect();
        Array2::from_shape_vec((values.len(), 1), values).map_err(|e| PipelineError::Transform(e.to_string()))
    }

    fn n_features(&self) -> usize {
        1
    }
}

/// Native score is the negated feature, so anomaly score == DMBTR
struct EchoModel;

impl NoveltyModel for EchoModel {
    fn score_samples(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        Ok(x.column(0).mapv(|v| -v))
    }

    fn n_features(&self) -> usize {
        1
    }
}

fn echo_context(config: ScoringConfig) -> ScoringContext {
    ScoringContext::new(Arc::new(AmountFeature), Arc::new(EchoModel), config).unwrap()
}

fn transaction_row(belnr: &str, waers: &str, bschl: &str, ktosl: &str, bukrs: &str, amount: f64) -> Vec<Value> {
    vec![
        Value::Text(belnr.to_string()),
        "P100".into(),
        Value::Text(bschl.to_string()),
        "400000".into(),
        Value::Text(waers.to_string()),
        Value::Text(bukrs.to_string()),
        Value::Text(ktosl.to_string()),
        Value::Number(amount),
        Value::Number(amount),
    ]
}

fn transaction_columns() -> Vec<String> {
    std::iter::once("BELNR")
        .chain(TRANSACTION_COLUMNS.iter().copied())
        .map(str::to_string)
        .collect()
}

/// Transaction table whose DMBTR column carries the given values
fn amounts_table(amounts: &[f64]) -> Table {
    let rows = amounts
        .iter()
        .enumerate()
        .map(|(i, a)| transaction_row(&format!("{:010}", i), "EUR", "40", "BSX", "1000", *a))
        .collect();
    Table::new(transaction_columns(), rows).unwrap()
}

fn demo_context(batch_size: usize) -> ScoringContext {
    let bundle = ModelBundle::from_slice(DEMO_BUNDLE.as_bytes()).unwrap();
    let config = ScoringConfig { batch_size, ..Default::default() };
    ScoringContext::new(Arc::new(bundle.feature_pipe), Arc::new(bundle.lof), config).unwrap()
}

fn demo_table() -> Table {
    let currencies = ["EUR", "USD", "GBP", "EUR"];
    let keys = ["40", "50", "31", "21"];
    let ktosl = ["BSX", "WRX", "GBB"];
    let mut rows: Vec<Vec<Value>> = (0..40)
        .map(|i| {
            let amount = 400.0 + (i * 97 % 1300) as f64;
            transaction_row(
                &format!("51{:08}", i),
                currencies[i % 4],
                keys[i % 4],
                ktosl[i % 3],
                if i % 2 == 0 { "1000" } else { "2000" },
                amount,
            )
        })
        .collect();
    // Unknown categories and an amount far outside the training range
    rows.insert(17, transaction_row("5199999999", "JPY", "99", "ZZZ", "9000", 5.0e7));
    Table::new(transaction_columns(), rows).unwrap()
}

// ============================================================================
// RANKING + PAGINATION
// ============================================================================

#[test]
fn test_ranked_pages_follow_score_order() {
    let ctx = echo_context(ScoringConfig::default());
    let table = amounts_table(&[0.1, 0.9, 0.5, 0.9, 0.2, 0.7, 0.3]);

    let first = ctx
        .score_ranked_page(&table, &PageQuery { page: Some(1), page_size: Some(5), percentile: None })
        .unwrap();
    assert_eq!(first.meta.page.total_pages, 2);
    assert_eq!(first.meta.page.total_rows, 7);
    let rows: Vec<usize> = first.records.iter().map(|r| r.row).collect();
    assert_eq!(rows, vec![1, 3, 5, 2, 6]);
    assert_eq!(first.records[0].record.id, Value::Text("0000000001".into()));

    let second = ctx
        .score_ranked_page(&table, &PageQuery { page: Some(2), page_size: Some(5), percentile: None })
        .unwrap();
    let rows: Vec<usize> = second.records.iter().map(|r| r.row).collect();
    assert_eq!(rows, vec![4, 0]);
    assert_eq!(second.records[0].rank, 5);

    // Threshold and totals do not depend on the page
    assert_eq!(first.threshold, second.threshold);
    assert_eq!(first.meta.total_anomalies, second.meta.total_anomalies);
}

#[test]
fn test_percentile_threshold_flags() {
    let ctx = echo_context(ScoringConfig::default());
    let page = ctx
        .score_ranked_page(
            &amounts_table(&[1.0, 2.0, 3.0, 4.0, 5.0]),
            &PageQuery { percentile: Some(90.0), ..Default::default() },
        )
        .unwrap();

    assert!((page.threshold.value - 4.6).abs() < 1e-12);
    assert_eq!(page.meta.total_anomalies, 1);
    let flagged: Vec<usize> = page.records.iter().filter(|r| r.is_anomaly).map(|r| r.row).collect();
    assert_eq!(flagged, vec![4]);
}

#[test]
fn test_point_scoring_top_k() {
    let ctx = echo_context(ScoringConfig::default());
    let result = ctx
        .score_points(&amounts_table(&[3.0, 7.0, 1.0, 9.0, 5.0]), Some(3))
        .unwrap();

    assert_eq!(result.n, 5);
    assert_eq!(result.top_k, 3);
    assert_eq!(result.top_index, vec![3, 1, 4]);
    assert!(result.top_scores.windows(2).all(|w| w[0] > w[1]));
}

#[test]
fn test_pages_partition_ranking() {
    let ctx = echo_context(ScoringConfig::default());
    let amounts: Vec<f64> = (0..53).map(|i| ((i * 31) % 17) as f64).collect();
    let table = amounts_table(&amounts);

    let mut rows = Vec::new();
    let mut page = 1;
    loop {
        let query = PageQuery { page: Some(page), page_size: Some(10), percentile: None };
        match ctx.score_ranked_page(&table, &query) {
            Ok(result) => rows.extend(result.records.iter().map(|r| r.row)),
            Err(PipelineError::PageOutOfRange { page: p, total_pages }) => {
                assert_eq!(p, 7);
                assert_eq!(total_pages, 6);
                break;
            }
            Err(e) => panic!("unexpected error: {}", e),
        }
        page += 1;
    }

    let mut sorted = rows.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, (0..53).collect::<Vec<_>>());
}

// ============================================================================
// VALIDATION
// ============================================================================

#[test]
fn test_missing_columns_reported_sorted() {
    let ctx = echo_context(ScoringConfig::default());
    let table = Table::new(
        vec!["PRCTR".into(), "BSCHL".into(), "HKONT".into(), "BUKRS".into(), "DMBTR".into(), "WRBTR".into()],
        vec![vec!["P1".into(), "40".into(), "400000".into(), "1000".into(), 1.0.into(), 1.0.into()]],
    )
    .unwrap();

    assert_eq!(
        ctx.score_table(&table).unwrap_err(),
        PipelineError::MissingColumns { columns: vec!["KTOSL".into(), "WAERS".into()] }
    );
}

#[test]
fn test_unparsable_amount_scores_as_zero() {
    let ctx = echo_context(ScoringConfig::default());
    let mut rows = vec![transaction_row("1", "EUR", "40", "BSX", "1000", 12.0)];
    let mut bad = transaction_row("2", "EUR", "40", "BSX", "1000", 0.0);
    bad[7] = Value::Text("n/a".into());
    rows.push(bad);

    let scores = ctx.score_table(&Table::new(transaction_columns(), rows).unwrap()).unwrap();
    assert_eq!(scores, vec![12.0, 0.0]);
}

#[test]
fn test_csv_upload_end_to_end() {
    let ctx = echo_context(ScoringConfig::default());
    let csv = "BELNR,PRCTR,BSCHL,HKONT,WAERS,BUKRS,KTOSL,DMBTR,WRBTR\n\
               100,P1,40,400000,EUR,1000,BSX,5.5,5.5\n\
               101,P1,50,400000,USD,1000,WRX,,1.0\n\
               102,P2,40,400000,EUR,2000,BSX,8.25,8.25\n";
    let table = Table::from_csv(csv.as_bytes()).unwrap();

    let page = ctx.score_ranked_page(&table, &PageQuery::default()).unwrap();
    let rows: Vec<usize> = page.records.iter().map(|r| r.row).collect();
    assert_eq!(rows, vec![2, 0, 1]);
    assert_eq!(page.records[2].score, 0.0);
}

#[test]
fn test_empty_upload_rejected() {
    let ctx = echo_context(ScoringConfig::default());
    let table = Table::new(transaction_columns(), Vec::new()).unwrap();
    assert_eq!(ctx.score_table(&table).unwrap_err(), PipelineError::EmptyInput);
}

// ============================================================================
// DEMO BUNDLE
// ============================================================================

#[test]
fn test_demo_bundle_loads() {
    let bundle = ModelBundle::from_slice(DEMO_BUNDLE.as_bytes()).unwrap();
    assert_eq!(bundle.feature_pipe.encoded_width(), 14);
    assert_eq!(bundle.feature_pipe.n_features(), 4);
    assert_eq!(bundle.lof.reference_size(), 120);
    assert_eq!(bundle.metadata.layout_hash, Some(bundle.feature_pipe.layout_hash()));
}

#[test]
fn test_demo_bundle_ranks_outlier_first() {
    let ctx = demo_context(5000);
    let table = demo_table();

    let page = ctx.score_ranked_page(&table, &PageQuery::default()).unwrap();
    assert_eq!(page.records[0].row, 17);
    assert!(page.records[0].is_anomaly);
    assert_eq!(page.records[0].record.id, Value::Text("5199999999".into()));
    assert!(page.records.iter().all(|r| r.score.is_finite()));
}

#[test]
fn test_batch_size_does_not_change_scores() {
    let table = demo_table();
    let reference = demo_context(table.len()).score_table(&table).unwrap();

    for batch_size in [1, 2, 7, 40, 5000] {
        let scores = demo_context(batch_size).score_table(&table).unwrap();
        assert_eq!(scores, reference, "batch_size = {}", batch_size);
    }
}

#[test]
fn test_serialized_model_matches_shared_model() {
    let bundle = ModelBundle::from_slice(DEMO_BUNDLE.as_bytes()).unwrap();
    let shared = ScoringContext::new(
        Arc::new(bundle.feature_pipe.clone()),
        Arc::new(bundle.lof.clone()),
        ScoringConfig::default(),
    )
    .unwrap();
    let serialized = ScoringContext::new(
        Arc::new(bundle.feature_pipe),
        Arc::new(SerializedModel::new(bundle.lof)),
        ScoringConfig::default(),
    )
    .unwrap();

    let table = demo_table();
    assert_eq!(shared.score_table(&table).unwrap(), serialized.score_table(&table).unwrap());
}

#[test]
fn test_negative_amount_is_transform_error() {
    let ctx = demo_context(5000);
    let table = Table::new(
        transaction_columns(),
        vec![transaction_row("1", "EUR", "40", "BSX", "1000", -50.0)],
    )
    .unwrap();

    let err = ctx.score_table(&table).unwrap_err();
    assert!(matches!(err, PipelineError::Transform(_)));
    assert!(!err.is_client_error());
}

#[test]
fn test_custom_schema() {
    let ctx = echo_context(ScoringConfig::default())
        .with_schema(RequiredSchema::new(&["DMBTR"], &["DMBTR"]))
        .with_id_column(None);
    let table = Table::new(vec!["DMBTR".into()], vec![vec![2.0.into()], vec![3.0.into()]]).unwrap();

    let page = ctx.score_ranked_page(&table, &PageQuery::default()).unwrap();
    assert!(page.records.iter().all(|r| r.record.id.is_null()));
    assert_eq!(page.records[0].row, 1);
}
