use std::sync::Arc;

use crossclaim::{
    CaseId, Claim, ContradictionEngine, ContradictionStore, ContradictionType, Embedder, EmbeddingError, EngineConfig,
    HashingEmbedder, InMemoryClaimSource, InMemoryContradictionStore, Modality, Polarity, Severity,
    SimilarityKind,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn engine(embedder: Option<Arc<dyn Embedder>>) -> (ContradictionEngine, Arc<InMemoryContradictionStore>) {
    let store = Arc::new(InMemoryContradictionStore::new());
    let engine = ContradictionEngine::new(
        EngineConfig::default(),
        embedder,
        Arc::new(InMemoryClaimSource::new()),
        store.clone(),
    )
    .unwrap();
    (engine, store)
}

fn visit_scenario(case_id: CaseId) -> Vec<Claim> {
    vec![
        Claim::builder()
            .case_id(case_id)
            .text("Officer Smith: the father attended the visit")
            .asserted_by("Officer Smith")
            .subject("father")
            .polarity(Polarity::Affirm)
            .build()
            .unwrap(),
        Claim::builder()
            .case_id(case_id)
            .text("Officer Smith: the father did not attend the visit")
            .asserted_by("Officer Smith")
            .subject("father")
            .polarity(Polarity::Negate)
            .build()
            .unwrap(),
        Claim::builder()
            .case_id(case_id)
            .text("Guardian: the mother attended")
            .subject("mother")
            .build()
            .unwrap(),
    ]
}

/// Embeds texts as presence vectors over a small fixed vocabulary.
struct KeywordEncoder;

const VOCABULARY: [&str; 4] = ["father", "mother", "visit", "school"];

impl Embedder for KeywordEncoder {
    fn name(&self) -> &str {
        "keyword"
    }

    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts
            .iter()
            .map(|t| {
                let lower = t.to_lowercase();
                VOCABULARY
                    .iter()
                    .map(|w| if lower.contains(w) { 1.0 } else { 0.0 })
                    .collect()
            })
            .collect())
    }
}

struct OfflineEncoder;

impl Embedder for OfflineEncoder {
    fn name(&self) -> &str {
        "offline"
    }

    fn embed(&self, _texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Err(EmbeddingError::Unavailable("model not loaded".to_string()))
    }
}

#[test]
fn three_claim_case_yields_one_critical_self_contradiction() {
    init_tracing();
    let case_id = CaseId::new();
    let claims = visit_scenario(case_id);
    let (engine, store) = engine(None);

    let candidates = engine.detect_contradictions(&claims, case_id);
    assert_eq!(engine.save_contradictions(&candidates, case_id).unwrap(), 1);

    let records = engine.case_summary(case_id).unwrap().most_severe;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].contradiction_type, ContradictionType::SelfContradiction);
    assert_eq!(records[0].severity, Severity::Critical);
    assert!(records[0].same_author);
    assert!(records[0].description.contains("Officer Smith"));

    assert!(store.find_by_claim(claims[2].id).unwrap().is_empty());
}

#[test]
fn fake_encoder_drives_the_matrix_path() {
    let case_id = CaseId::new();
    let claims = visit_scenario(case_id);
    let (engine, _) = engine(Some(Arc::new(KeywordEncoder)));
    assert!(engine.similarity_backend().is_semantic());

    let detection = engine.detect_with_stats(&claims, case_id);
    assert_eq!(detection.similarity, Some(SimilarityKind::Semantic));
    assert_eq!(detection.pairs_examined, 3);
    assert_eq!(detection.pairs_gated, 1);
    assert_eq!(detection.candidates.len(), 1);

    let c = &detection.candidates[0];
    assert_eq!(c.contradiction_type, ContradictionType::SelfContradiction);
    assert!((c.confidence - 0.90).abs() < f32::EPSILON);
    assert!((c.similarity - 1.0).abs() < 1e-5);
}

#[test]
fn hashing_encoder_keeps_unrelated_claim_out() {
    let case_id = CaseId::new();
    let claims = visit_scenario(case_id);
    let (engine, _) = engine(Some(Arc::new(HashingEmbedder::default())));

    let candidates = engine.detect_contradictions(&claims, case_id);
    assert!(candidates.iter().all(|c| c.claim_a != claims[2].id && c.claim_b != claims[2].id));
}

#[test]
fn unavailable_encoder_falls_back_to_lexical() {
    init_tracing();
    let case_id = CaseId::new();
    let claims = visit_scenario(case_id);
    let (engine, _) = engine(Some(Arc::new(OfflineEncoder)));

    let detection = engine.detect_with_stats(&claims, case_id);
    assert_eq!(detection.similarity, Some(SimilarityKind::Lexical));
    assert_eq!(detection.candidates.len(), 1);
}

#[test]
fn second_detection_and_save_creates_nothing() {
    let case_id = CaseId::new();
    let claims = visit_scenario(case_id);
    let (engine, store) = engine(None);

    let first = engine.detect_contradictions(&claims, case_id);
    assert_eq!(engine.save_contradictions(&first, case_id).unwrap(), 1);

    let second = engine.detect_contradictions(&claims, case_id);
    assert_eq!(second.len(), 1);
    assert_eq!(engine.save_contradictions(&second, case_id).unwrap(), 0);
    assert_eq!(store.len().unwrap(), 1);
}

#[test]
fn reversed_pair_is_recognized_as_stored() {
    let case_id = CaseId::new();
    let claims = visit_scenario(case_id);
    let (engine, _) = engine(None);

    let candidates = engine.detect_contradictions(&claims, case_id);
    engine.save_contradictions(&candidates, case_id).unwrap();

    let mut reversed = candidates.clone();
    for c in &mut reversed {
        std::mem::swap(&mut c.claim_a, &mut c.claim_b);
    }
    let report = engine.save_with_report(&reversed, case_id).unwrap();
    assert_eq!(report.created, 0);
    assert_eq!(report.duplicates, 1);
}

#[test]
fn empty_and_single_claim_inputs_return_nothing() {
    let case_id = CaseId::new();
    let (engine, _) = engine(None);
    assert!(engine.detect_contradictions(&[], case_id).is_empty());

    let claims = visit_scenario(case_id);
    assert!(engine.detect_contradictions(&claims[..1], case_id).is_empty());
}

#[test]
fn different_subjects_never_conflict_directly() {
    let case_id = CaseId::new();
    let claims = vec![
        Claim::builder()
            .case_id(case_id)
            .text("The father picked the children up from school")
            .asserted_by("Officer Smith")
            .subject("father")
            .polarity(Polarity::Affirm)
            .build()
            .unwrap(),
        Claim::builder()
            .case_id(case_id)
            .text("The grandmother did not pick the children up from school")
            .asserted_by("Officer Smith")
            .subject("grandmother")
            .polarity(Polarity::Negate)
            .build()
            .unwrap(),
    ];
    let (engine, _) = engine(None);

    let candidates = engine.detect_contradictions(&claims, case_id);
    assert!(candidates.iter().all(|c| !matches!(
        c.contradiction_type,
        ContradictionType::Direct | ContradictionType::SelfContradiction
    )));
}

#[test]
fn allegation_against_established_fact_is_modality_confusion() {
    let case_id = CaseId::new();
    let claims = vec![
        Claim::builder()
            .case_id(case_id)
            .text("The mother left the children alone overnight")
            .asserted_by("Neighbor")
            .subject("mother")
            .modality(Modality::Asserted)
            .certainty(0.9)
            .build()
            .unwrap(),
        Claim::builder()
            .case_id(case_id)
            .text("Allegedly the mother left the children alone overnight")
            .asserted_by("Caseworker")
            .subject("mother")
            .modality("alleged")
            .build()
            .unwrap(),
    ];
    let (engine, _) = engine(None);

    let candidates = engine.detect_contradictions(&claims, case_id);
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].contradiction_type, ContradictionType::Modality);
    assert!((candidates[0].confidence - 0.80).abs() < f32::EPSILON);
    assert_eq!(candidates[0].severity(), Severity::High);
}

fn dated(case_id: CaseId, text: &str, author: &str, time_start: &str) -> Claim {
    Claim::builder()
        .case_id(case_id)
        .text(text)
        .asserted_by(author)
        .subject("incident")
        .time_start(time_start)
        .build()
        .unwrap()
}

#[test]
fn differing_dates_are_a_temporal_conflict() {
    let case_id = CaseId::new();
    let claims = vec![
        dated(case_id, "The incident happened at the school gate", "Teacher", "2023-03-29"),
        dated(case_id, "The incident happened at the school gate", "Father", "2023-04-02"),
    ];
    let (engine, _) = engine(None);

    let candidates = engine.detect_contradictions(&claims, case_id);
    assert_eq!(candidates.len(), 1);
    let c = &candidates[0];
    assert_eq!(c.contradiction_type, ContradictionType::Temporal);
    assert!((c.confidence - 0.75).abs() < f32::EPSILON);
    assert!(c.temporal_conflict);
    assert_eq!(c.severity(), Severity::Medium);
}

#[test]
fn unparseable_date_skips_the_pair() {
    let case_id = CaseId::new();
    let claims = vec![
        dated(case_id, "The incident happened at the school gate", "Teacher", "sometime in spring"),
        dated(case_id, "The incident happened at the school gate", "Father", "2023-04-02"),
    ];
    let (engine, _) = engine(None);

    let detection = engine.detect_with_stats(&claims, case_id);
    assert!(detection.candidates.is_empty());
    assert_eq!(detection.skipped_pairs, 1);
}

#[test]
fn differing_object_values_are_a_value_mismatch() {
    let case_id = CaseId::new();
    let claim = |author: &str, value: &str| {
        Claim::builder()
            .case_id(case_id)
            .text(format!("The child's school is {value}"))
            .asserted_by(author)
            .subject("child")
            .predicate("attends school")
            .object_value(value)
            .build()
            .unwrap()
    };
    let claims = vec![claim("Mother", "Lincoln Elementary"), claim("Father", "Roosevelt Elementary")];
    let (engine, _) = engine(None);

    let candidates = engine.detect_contradictions(&claims, case_id);
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].contradiction_type, ContradictionType::Value);
    assert!((candidates[0].confidence - 0.70).abs() < f32::EPSILON);
}
