//! End-to-end pipeline: raw event → decision → audit row.

use chrono::{NaiveDate, NaiveDateTime};
use fraudscore_core::{
    audit::{AuditSink, CsvAuditLog},
    config::{ScoringConfig, METADATA_FILE, MODEL_FILE, POLICY_FILE},
    engine::ScoringEngine,
    error::{ScoreError, ScoreResult},
    features::FeatureRecord,
    input::RawTransaction,
    model::{ModelSlot, ProbabilityModel},
    rng::{FixedDraw, SeededFlagSource},
    types::{DecisionReason, RiskLabel, TransactionEvent},
};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Returns a fixed probability and remembers what it was asked.
struct ConstantModel {
    p: f64,
    seen: Mutex<Vec<FeatureRecord>>,
}

impl ConstantModel {
    fn new(p: f64) -> Arc<Self> {
        Arc::new(Self { p, seen: Mutex::new(Vec::new()) })
    }
}

impl ProbabilityModel for ConstantModel {
    fn name(&self) -> &str {
        "constant"
    }

    fn predict(&self, features: &FeatureRecord) -> ScoreResult<f64> {
        self.seen.lock().unwrap().push(features.clone());
        Ok(self.p)
    }
}

struct RejectingModel;

impl ProbabilityModel for RejectingModel {
    fn name(&self) -> &str {
        "rejecting"
    }

    fn predict(&self, features: &FeatureRecord) -> ScoreResult<f64> {
        Err(ScoreError::PredictionFailed(format!("unseen type {}", features.txn_type)))
    }
}

fn temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("fraudscore-{tag}-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn at(h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2017, 1, 1).unwrap().and_hms_opt(h, m, 0).unwrap()
}

fn event() -> TransactionEvent {
    TransactionEvent {
        occurred_at: at(2, 30),
        txn_type: "PAYMENT".into(),
        amount: 1000.0,
        old_balance_origin: 5000.0,
        new_balance_origin: 4000.0,
        old_balance_dest: 200.0,
        new_balance_dest: 1200.0,
        origin_account: "C100".into(),
        destination_account: "M200".into(),
    }
}

fn engine_with(model: ModelSlot, audit: Box<dyn AuditSink>) -> ScoringEngine {
    ScoringEngine::new(ScoringConfig::default_test(), model, audit)
}

#[test]
fn successful_decision_is_returned_and_audited() {
    let dir = temp_dir("ok");
    let audit_path = dir.join("audit.csv");
    let model = ConstantModel::new(0.26);
    let engine = engine_with(
        ModelSlot::loaded(model.clone()),
        Box::new(CsvAuditLog::new(&audit_path)),
    );

    let decision = engine.score(&event(), &mut FixedDraw(1.0)).unwrap();
    let r = &decision.result;

    assert!(decision.audited());
    assert_eq!(r.step, 3);
    assert_eq!(r.is_flagged, 0);
    assert_eq!(r.label, RiskLabel::Medium);
    assert_eq!(r.label_reason, DecisionReason::CalibratedMidpoint);
    assert!((r.percent - 26.0).abs() < 1e-9);
    assert_eq!(r.threshold_used, 0.5);

    assert_eq!(CsvAuditLog::new(&audit_path).row_count().unwrap(), 1);

    let seen = model.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].step, 3);
    assert_eq!(seen[0].txn_type, "PAYMENT");
}

#[test]
fn missing_model_is_unavailable_and_not_audited() {
    let dir = temp_dir("unavailable");
    let audit_path = dir.join("audit.csv");
    let engine = engine_with(ModelSlot::empty(), Box::new(CsvAuditLog::new(&audit_path)));

    for _ in 0..3 {
        let err = engine.score(&event(), &mut FixedDraw(1.0)).unwrap_err();
        assert!(matches!(err, ScoreError::Unavailable), "got {err:?}");
    }
    assert!(!audit_path.exists(), "no audit file may be created");
}

#[test]
fn empty_artifact_dir_means_unavailable() {
    let dir = temp_dir("no-artifacts");
    let engine = ScoringEngine::build(&dir, Box::new(CsvAuditLog::new(dir.join("audit.csv"))));
    assert!(!engine.model_loaded());
    let err = engine.score(&event(), &mut FixedDraw(1.0)).unwrap_err();
    assert!(matches!(err, ScoreError::Unavailable));
    assert!(!dir.join("audit.csv").exists());
}

#[test]
fn prediction_failure_is_not_audited() {
    let dir = temp_dir("rejected");
    let audit_path = dir.join("audit.csv");
    let engine = engine_with(
        ModelSlot::loaded(Arc::new(RejectingModel)),
        Box::new(CsvAuditLog::new(&audit_path)),
    );

    let err = engine.score(&event(), &mut FixedDraw(1.0)).unwrap_err();
    assert!(matches!(err, ScoreError::PredictionFailed(_)));
    assert!(!audit_path.exists());
}

#[test]
fn out_of_range_probability_is_prediction_failure() {
    let engine = ScoringEngine::build_test(ModelSlot::loaded(ConstantModel::new(1.5)));
    let err = engine.score(&event(), &mut FixedDraw(1.0)).unwrap_err();
    assert!(matches!(err, ScoreError::PredictionFailed(_)), "got {err:?}");
}

#[test]
fn before_epoch_is_rejected_without_model_call() {
    let model = ConstantModel::new(0.9);
    let engine = ScoringEngine::build_test(ModelSlot::loaded(model.clone()));

    let mut early = event();
    early.occurred_at = NaiveDate::from_ymd_opt(2016, 12, 31)
        .unwrap()
        .and_hms_opt(23, 0, 0)
        .unwrap();

    let err = engine.score(&early, &mut FixedDraw(1.0)).unwrap_err();
    assert!(matches!(err, ScoreError::BeforeEpoch { .. }));
    assert!(model.seen.lock().unwrap().is_empty());
}

#[test]
fn non_finite_amount_is_invalid_input() {
    let model = ConstantModel::new(0.1);
    let engine = ScoringEngine::build_test(ModelSlot::loaded(model.clone()));

    let mut bad = event();
    bad.new_balance_dest = f64::NAN;
    let err = engine.score(&bad, &mut FixedDraw(1.0)).unwrap_err();
    assert!(matches!(err, ScoreError::InvalidInput(_)));
    assert!(model.seen.lock().unwrap().is_empty());
}

#[test]
fn audit_failure_still_returns_result() {
    let missing_dir = std::env::temp_dir()
        .join(format!("fraudscore-gone-{}", uuid::Uuid::new_v4()))
        .join("audit.csv");
    let engine = engine_with(
        ModelSlot::loaded(ConstantModel::new(0.9)),
        Box::new(CsvAuditLog::new(&missing_dir)),
    );

    let decision = engine.score(&event(), &mut FixedDraw(1.0)).unwrap();
    assert_eq!(decision.result.label, RiskLabel::High);
    assert!(matches!(decision.audit_error, Some(ScoreError::LogWriteFailed(_))));
    assert!(!decision.audited());

    // Config and model are untouched; the next request behaves the same.
    let again = engine.score(&event(), &mut FixedDraw(1.0)).unwrap();
    assert_eq!(again.result, decision.result);
}

#[test]
fn flagged_transaction_goes_high_in_demo_mode() {
    let mut config = ScoringConfig::default_test();
    config.policy.demo_mode = true;
    let engine = ScoringEngine::new(
        config,
        ModelSlot::loaded(ConstantModel::new(0.01)),
        Box::new(fraudscore_core::audit::NullAuditSink),
    );

    let mut drained = event();
    drained.new_balance_origin = 0.0;
    let decision = engine.score(&drained, &mut FixedDraw(1.0)).unwrap();
    assert_eq!(decision.result.is_flagged, 1);
    assert_eq!(decision.result.label, RiskLabel::High);
    assert_eq!(decision.result.label_reason, DecisionReason::FlagOverride);
}

#[test]
fn n_decisions_make_n_rows() {
    let dir = temp_dir("n-rows");
    let audit_path = dir.join("audit.csv");
    let engine = engine_with(
        ModelSlot::loaded(ConstantModel::new(0.4)),
        Box::new(CsvAuditLog::new(&audit_path)),
    );

    let mut flags = SeededFlagSource::new(42);
    let mut ok = 0;
    for i in 0..30 {
        let mut e = event();
        // Every fifth request is before the epoch and must leave no row.
        if i % 5 == 0 {
            e.occurred_at = NaiveDate::from_ymd_opt(2016, 6, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        }
        if engine.score(&e, &mut flags).is_ok() {
            ok += 1;
        }
    }
    assert_eq!(ok, 24);
    assert_eq!(CsvAuditLog::new(&audit_path).row_count().unwrap(), 24);
}

#[test]
fn concurrent_decisions_share_one_engine() {
    let dir = temp_dir("threads");
    let audit_path = dir.join("audit.csv");
    let engine = engine_with(
        ModelSlot::loaded(ConstantModel::new(0.6)),
        Box::new(CsvAuditLog::new(&audit_path)),
    );

    std::thread::scope(|s| {
        for t in 0..4u64 {
            let engine = &engine;
            s.spawn(move || {
                let mut flags = SeededFlagSource::new(t);
                for _ in 0..20 {
                    engine.score(&event(), &mut flags).unwrap();
                }
            });
        }
    });

    assert_eq!(CsvAuditLog::new(&audit_path).row_count().unwrap(), 80);
}

#[test]
fn raw_form_input_is_coerced() {
    let engine = ScoringEngine::build_test(ModelSlot::loaded(ConstantModel::new(0.1)));
    let raw = RawTransaction {
        date: "2017-01-02".into(),
        time: "00:15".into(),
        txn_type: "CASH_OUT".into(),
        amount: " 250.75 ".into(),
        old_balance_origin: "1000".into(),
        new_balance_origin: "749.25".into(),
        old_balance_dest: "10".into(),
        new_balance_dest: "260.75".into(),
        origin_account: "C1".into(),
        destination_account: "C2".into(),
    };
    let decision = engine.score_raw(&raw, &mut FixedDraw(1.0)).unwrap();
    assert_eq!(decision.result.step, 25);
    assert_eq!(decision.result.label, RiskLabel::Low);
}

#[test]
fn raw_form_rejects_bad_fields() {
    let engine = ScoringEngine::build_test(ModelSlot::loaded(ConstantModel::new(0.1)));
    let good = RawTransaction {
        date: "2017-01-02".into(),
        time: "10:00".into(),
        txn_type: "PAYMENT".into(),
        amount: "100".into(),
        old_balance_origin: "1000".into(),
        new_balance_origin: "900".into(),
        old_balance_dest: "0".into(),
        new_balance_dest: "100".into(),
        origin_account: String::new(),
        destination_account: String::new(),
    };

    let mut bad_amount = good.clone();
    bad_amount.amount = "12abc".into();
    let err = engine.score_raw(&bad_amount, &mut FixedDraw(1.0)).unwrap_err();
    assert!(matches!(err, ScoreError::InvalidInput(_)));
    assert!(err.to_string().contains("amount"));

    let mut inf_amount = good.clone();
    inf_amount.amount = "inf".into();
    assert!(matches!(
        engine.score_raw(&inf_amount, &mut FixedDraw(1.0)),
        Err(ScoreError::InvalidInput(_))
    ));

    let mut bad_date = good.clone();
    bad_date.date = "02/01/2017".into();
    assert!(matches!(
        engine.score_raw(&bad_date, &mut FixedDraw(1.0)),
        Err(ScoreError::InvalidInput(_))
    ));

    let mut with_seconds = good;
    with_seconds.time = "10:00:30".into();
    assert!(engine.score_raw(&with_seconds, &mut FixedDraw(1.0)).is_ok());
}

#[test]
fn logistic_artifact_round_trip_through_engine() {
    let dir = temp_dir("logistic");
    std::fs::write(
        dir.join(MODEL_FILE),
        r#"{
            "name": "paysim-logit",
            "schema_version": 1,
            "intercept": -3.0,
            "coefficients": {"amount": 2.0, "isFlaggedFraud": 1.5},
            "standardization": {"amount": {"mean": 50000.0, "std": 50000.0}},
            "type_weights": {"PAYMENT": -1.0, "TRANSFER": 1.0, "CASH_OUT": 0.8}
        }"#,
    )
    .unwrap();
    std::fs::write(dir.join(METADATA_FILE), r#"{"best_threshold": 50}"#).unwrap();
    std::fs::write(dir.join(POLICY_FILE), r#"{"demo_mode": false, "flag_baseline_rate": 0}"#).unwrap();

    let audit_path = dir.join("audit.csv");
    let engine = ScoringEngine::build(&dir, Box::new(CsvAuditLog::new(&audit_path)));
    assert!(engine.model_loaded());

    // z = -3 + 1 + 2*((200000-50000)/50000) + 1.5*1 = 5.5
    let mut big = event();
    big.txn_type = "TRANSFER".into();
    big.amount = 200_000.0;
    let decision = engine.score(&big, &mut FixedDraw(1.0)).unwrap();
    let expected = 1.0 / (1.0 + (-5.5f64).exp());
    assert!((decision.result.probability - expected).abs() < 1e-12);
    assert_eq!(decision.result.is_flagged, 1);
    assert_eq!(decision.result.label, RiskLabel::High);

    let mut unknown = event();
    unknown.txn_type = "BARTER".into();
    let err = engine.score(&unknown, &mut FixedDraw(1.0)).unwrap_err();
    assert!(matches!(err, ScoreError::PredictionFailed(_)));

    assert_eq!(CsvAuditLog::new(&audit_path).row_count().unwrap(), 1);
}
