//! Claim types: the read-only input population of a detection run.
//!
//! Claims are owned by the extraction pipeline. The engine only reads them,
//! so this module is mostly about giving loosely-shaped upstream records an
//! explicit type: every optional field is an `Option`, and epistemic enums
//! coerce unrecognized strings to an `Unknown` variant at the boundary
//! instead of failing deep inside the classifier.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random ID.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wraps an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Derives a stable ID from an upstream identifier (UUID v5).
            ///
            /// The same external key always maps to the same ID.
            #[must_use]
            pub fn from_external(key: &str) -> Self {
                Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes()))
            }

            /// Returns the underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// Stable identifier of a claim.
    ClaimId
);

define_id!(
    /// Identifier of the document a claim was extracted from.
    DocumentId
);

define_id!(
    /// Identifier of the case a claim belongs to.
    CaseId
);

/// Normalizes a free-text key for blocking and matching.
///
/// Returns `None` when nothing is left after trimming.
#[must_use]
pub fn normalize_key(s: &str) -> Option<String> {
    let key = s.trim().to_lowercase();
    if key.is_empty() {
        None
    } else {
        Some(key)
    }
}

fn normalize_opt(s: Option<&String>) -> Option<String> {
    s.and_then(|v| normalize_key(v))
}

/// How a claim is epistemically framed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum Modality {
    /// Stated as fact.
    Asserted,
    /// Relayed second-hand.
    Reported,
    /// Alleged but unproven.
    Alleged,
    /// Explicitly denied.
    Denied,
    /// Conditional or speculative.
    Hypothetical,
    /// Upstream value was not recognized.
    Unknown,
}

impl Modality {
    /// Coerces an upstream string; unrecognized values become `Unknown`.
    #[must_use]
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "asserted" | "assertion" | "fact" => Self::Asserted,
            "reported" | "hearsay" => Self::Reported,
            "alleged" | "allegation" => Self::Alleged,
            "denied" | "denial" => Self::Denied,
            "hypothetical" | "conditional" => Self::Hypothetical,
            _ => Self::Unknown,
        }
    }
}

/// Absent modality is treated as a plain assertion.
impl Default for Modality {
    fn default() -> Self {
        Self::Asserted
    }
}

impl From<String> for Modality {
    fn from(s: String) -> Self {
        Self::parse_lenient(&s)
    }
}

impl From<&str> for Modality {
    fn from(s: &str) -> Self {
        Self::parse_lenient(s)
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asserted => write!(f, "asserted"),
            Self::Reported => write!(f, "reported"),
            Self::Alleged => write!(f, "alleged"),
            Self::Denied => write!(f, "denied"),
            Self::Hypothetical => write!(f, "hypothetical"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Whether a claim affirms or negates its content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum Polarity {
    /// The claim affirms its content.
    Affirm,
    /// The claim negates its content.
    Negate,
    /// Upstream value was not recognized.
    Unknown,
}

impl Polarity {
    /// Coerces an upstream string; unrecognized values become `Unknown`.
    #[must_use]
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "affirm" | "affirmative" | "positive" => Self::Affirm,
            "negate" | "negative" | "negated" => Self::Negate,
            _ => Self::Unknown,
        }
    }

    /// Returns true if `self` and `other` are affirm/negate opposites.
    ///
    /// `Unknown` is never opposite to anything.
    #[must_use]
    pub const fn is_opposite(self, other: Self) -> bool {
        matches!(
            (self, other),
            (Self::Affirm, Self::Negate) | (Self::Negate, Self::Affirm)
        )
    }
}

/// Absent polarity is treated as affirmative.
impl Default for Polarity {
    fn default() -> Self {
        Self::Affirm
    }
}

impl From<String> for Polarity {
    fn from(s: String) -> Self {
        Self::parse_lenient(&s)
    }
}

impl From<&str> for Polarity {
    fn from(s: &str) -> Self {
        Self::parse_lenient(s)
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Affirm => write!(f, "affirm"),
            Self::Negate => write!(f, "negate"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

fn clamp_certainty(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

fn deserialize_certainty<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<f32>::deserialize(deserializer)?;
    Ok(raw.map_or(1.0, clamp_certainty))
}

fn deserialize_modality<'de, D>(deserializer: D) -> Result<Modality, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.map_or_else(Modality::default, |s| Modality::parse_lenient(&s)))
}

fn deserialize_polarity<'de, D>(deserializer: D) -> Result<Polarity, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.map_or_else(Polarity::default, |s| Polarity::parse_lenient(&s)))
}

const fn default_certainty() -> f32 {
    1.0
}

/// A short factual assertion extracted from a case document.
///
/// # Examples
///
/// ```
/// use crossclaim::{CaseId, Claim, Polarity};
///
/// let claim = Claim::builder()
///     .case_id(CaseId::new())
///     .text("The father did not attend the visit")
///     .subject("Father")
///     .asserted_by("Officer Smith")
///     .polarity(Polarity::Negate)
///     .build()
///     .unwrap();
///
/// assert_eq!(claim.subject_key().as_deref(), Some("father"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claim {
    /// Unique claim ID.
    pub id: ClaimId,
    /// Document the claim was extracted from.
    pub document_id: DocumentId,
    /// Case the claim belongs to.
    pub case_id: CaseId,
    /// The claim as extracted, in natural language.
    pub claim_text: String,

    /// Who or what the claim is about.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Relation asserted of the subject.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicate: Option<String>,
    /// Value the predicate relates the subject to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_value: Option<String>,

    /// Epistemic framing. Null, missing and unrecognized values are coerced.
    #[serde(default, deserialize_with = "deserialize_modality")]
    pub modality: Modality,
    /// Affirm or negate. Null, missing and unrecognized values are coerced.
    #[serde(default, deserialize_with = "deserialize_polarity")]
    pub polarity: Polarity,

    /// Always within [0.0, 1.0].
    #[serde(default = "default_certainty", deserialize_with = "deserialize_certainty")]
    certainty: f32,

    /// Author or speaker the claim is attributed to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asserted_by: Option<String>,

    /// Normalized temporal anchors as supplied upstream (RFC 3339 or `YYYY-MM-DD`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_start: Option<String>,
    /// End of the period the claim covers, same formats as `time_start`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_end: Option<String>,
}

impl Claim {
    /// Creates a builder for constructing a claim.
    #[must_use]
    pub fn builder() -> ClaimBuilder {
        ClaimBuilder::new()
    }

    /// Returns the certainty, always within [0.0, 1.0].
    #[must_use]
    pub const fn certainty(&self) -> f32 {
        self.certainty
    }

    /// Sets the certainty, clamping into [0.0, 1.0] (NaN becomes 0.0).
    pub fn set_certainty(&mut self, certainty: f32) {
        self.certainty = clamp_certainty(certainty);
    }

    /// Normalized subject key, if any.
    #[must_use]
    pub fn subject_key(&self) -> Option<String> {
        normalize_opt(self.subject.as_ref())
    }

    /// Normalized author key, if any.
    #[must_use]
    pub fn author_key(&self) -> Option<String> {
        normalize_opt(self.asserted_by.as_ref())
    }

    /// Normalized predicate key, if any.
    #[must_use]
    pub fn predicate_key(&self) -> Option<String> {
        normalize_opt(self.predicate.as_ref())
    }

    /// Normalized object value, if any.
    #[must_use]
    pub fn object_key(&self) -> Option<String> {
        normalize_opt(self.object_value.as_ref())
    }

    /// Returns true if both claims carry the same non-empty normalized subject.
    #[must_use]
    pub fn shares_subject(&self, other: &Self) -> bool {
        match (self.subject_key(), other.subject_key()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialEq for Claim {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Claim {}

impl std::hash::Hash for Claim {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Builder for creating Claim instances.
#[derive(Debug, Default)]
pub struct ClaimBuilder {
    id: Option<ClaimId>,
    document_id: Option<DocumentId>,
    case_id: Option<CaseId>,
    text: Option<String>,
    subject: Option<String>,
    predicate: Option<String>,
    object_value: Option<String>,
    modality: Option<Modality>,
    polarity: Option<Polarity>,
    certainty: Option<f32>,
    asserted_by: Option<String>,
    time_start: Option<String>,
    time_end: Option<String>,
}

impl ClaimBuilder {
    /// Creates a new claim builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the claim ID (optional, will be generated if not set).
    #[must_use]
    pub fn id(mut self, id: ClaimId) -> Self {
        self.id = Some(id);
        self
    }

    /// Sets the parent document (optional, will be generated if not set).
    #[must_use]
    pub fn document_id(mut self, document_id: DocumentId) -> Self {
        self.document_id = Some(document_id);
        self
    }

    /// Sets the case (required).
    #[must_use]
    pub fn case_id(mut self, case_id: CaseId) -> Self {
        self.case_id = Some(case_id);
        self
    }

    /// Sets the claim text (required, non-empty).
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Sets the subject.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Sets the predicate.
    #[must_use]
    pub fn predicate(mut self, predicate: impl Into<String>) -> Self {
        self.predicate = Some(predicate.into());
        self
    }

    /// Sets the object value.
    #[must_use]
    pub fn object_value(mut self, object_value: impl Into<String>) -> Self {
        self.object_value = Some(object_value.into());
        self
    }

    /// Sets the modality; strings are coerced leniently.
    #[must_use]
    pub fn modality(mut self, modality: impl Into<Modality>) -> Self {
        self.modality = Some(modality.into());
        self
    }

    /// Sets the polarity; strings are coerced leniently.
    #[must_use]
    pub fn polarity(mut self, polarity: impl Into<Polarity>) -> Self {
        self.polarity = Some(polarity.into());
        self
    }

    /// Sets the certainty; out-of-range values are clamped on build.
    #[must_use]
    pub fn certainty(mut self, certainty: f32) -> Self {
        self.certainty = Some(certainty);
        self
    }

    /// Sets the author the claim is attributed to.
    #[must_use]
    pub fn asserted_by(mut self, author: impl Into<String>) -> Self {
        self.asserted_by = Some(author.into());
        self
    }

    /// Sets the start anchor.
    #[must_use]
    pub fn time_start(mut self, time_start: impl Into<String>) -> Self {
        self.time_start = Some(time_start.into());
        self
    }

    /// Sets the end anchor.
    #[must_use]
    pub fn time_end(mut self, time_end: impl Into<String>) -> Self {
        self.time_end = Some(time_end.into());
        self
    }

    /// Builds the Claim.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the case or text is missing.
    pub fn build(self) -> Result<Claim, ValidationError> {
        let case_id = self.case_id.ok_or(ValidationError::MissingField {
            field: "case_id".to_string(),
        })?;

        let claim_text = self.text.ok_or(ValidationError::MissingField {
            field: "claim_text".to_string(),
        })?;

        if claim_text.trim().is_empty() {
            return Err(ValidationError::EmptyClaimText);
        }

        Ok(Claim {
            id: self.id.unwrap_or_else(ClaimId::new),
            document_id: self.document_id.unwrap_or_else(DocumentId::new),
            case_id,
            claim_text,
            subject: self.subject,
            predicate: self.predicate,
            object_value: self.object_value,
            modality: self.modality.unwrap_or_default(),
            polarity: self.polarity.unwrap_or_default(),
            certainty: self.certainty.map_or(1.0, clamp_certainty),
            asserted_by: self.asserted_by,
            time_start: self.time_start,
            time_end: self.time_end,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> ClaimBuilder {
        Claim::builder().case_id(CaseId::new()).text("the father attended")
    }

    #[test]
    fn test_builder_defaults() {
        let claim = base().build().unwrap();
        assert_eq!(claim.modality, Modality::Asserted);
        assert_eq!(claim.polarity, Polarity::Affirm);
        assert!((claim.certainty() - 1.0).abs() < f32::EPSILON);
        assert!(claim.subject_key().is_none());
    }

    #[test]
    fn test_builder_requires_case_and_text() {
        let err = Claim::builder().text("x").build().unwrap_err();
        assert!(matches!(err, ValidationError::MissingField { .. }));

        let err = Claim::builder().case_id(CaseId::new()).text("   ").build().unwrap_err();
        assert!(matches!(err, ValidationError::EmptyClaimText));
    }

    #[test]
    fn test_certainty_is_clamped() {
        let claim = base().certainty(1.7).build().unwrap();
        assert!((claim.certainty() - 1.0).abs() < f32::EPSILON);

        let mut claim = base().certainty(-0.2).build().unwrap();
        assert!(claim.certainty().abs() < f32::EPSILON);

        claim.set_certainty(f32::NAN);
        assert!(claim.certainty().abs() < f32::EPSILON);
    }

    #[test]
    fn test_unknown_enum_strings_coerce() {
        assert_eq!(Modality::parse_lenient("ALLEGED "), Modality::Alleged);
        assert_eq!(Modality::parse_lenient("rumoured"), Modality::Unknown);
        assert_eq!(Polarity::parse_lenient("negative"), Polarity::Negate);
        assert_eq!(Polarity::parse_lenient("maybe"), Polarity::Unknown);
    }

    #[test]
    fn test_polarity_opposites() {
        assert!(Polarity::Affirm.is_opposite(Polarity::Negate));
        assert!(Polarity::Negate.is_opposite(Polarity::Affirm));
        assert!(!Polarity::Affirm.is_opposite(Polarity::Affirm));
        assert!(!Polarity::Unknown.is_opposite(Polarity::Negate));
    }

    #[test]
    fn test_normalized_keys() {
        let claim = base()
            .subject("  Father ")
            .asserted_by("Officer SMITH")
            .predicate("")
            .build()
            .unwrap();
        assert_eq!(claim.subject_key().as_deref(), Some("father"));
        assert_eq!(claim.author_key().as_deref(), Some("officer smith"));
        assert!(claim.predicate_key().is_none());
    }

    #[test]
    fn test_deserialize_coerces_and_clamps() {
        let case_id = CaseId::new();
        let json = serde_json::json!({
            "id": ClaimId::new(),
            "document_id": DocumentId::new(),
            "case_id": case_id,
            "claim_text": "the mother attended",
            "modality": "speculated",
            "polarity": "negate",
            "certainty": 4.0
        });
        let claim: Claim = serde_json::from_value(json).unwrap();
        assert_eq!(claim.case_id, case_id);
        assert_eq!(claim.modality, Modality::Unknown);
        assert_eq!(claim.polarity, Polarity::Negate);
        assert!((claim.certainty() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_deserialize_missing_optionals() {
        let json = serde_json::json!({
            "id": ClaimId::new(),
            "document_id": DocumentId::new(),
            "case_id": CaseId::new(),
            "claim_text": "x"
        });
        let claim: Claim = serde_json::from_value(json).unwrap();
        assert_eq!(claim.modality, Modality::Asserted);
        assert!((claim.certainty() - 1.0).abs() < f32::EPSILON);
        assert!(claim.time_start.is_none());
    }

    fn claim_json(extra: serde_json::Value) -> serde_json::Value {
        let mut json = serde_json::json!({
            "id": ClaimId::new(),
            "document_id": DocumentId::new(),
            "case_id": CaseId::new(),
            "claim_text": "the father attended"
        });
        if let (Some(obj), Some(extra)) = (json.as_object_mut(), extra.as_object()) {
            obj.extend(extra.clone());
        }
        json
    }

    #[test]
    fn test_deserialize_null_enums_use_defaults() {
        let claim: Claim = serde_json::from_value(claim_json(serde_json::json!({
            "modality": null,
            "polarity": null,
            "certainty": null
        })))
        .unwrap();
        assert_eq!(claim.modality, Modality::Asserted);
        assert_eq!(claim.polarity, Polarity::Affirm);
        assert!((claim.certainty() - 1.0).abs() < f32::EPSILON);

        let claim: Claim = serde_json::from_value(claim_json(serde_json::json!({}))).unwrap();
        assert_eq!(claim.modality, Modality::Asserted);
        assert_eq!(claim.polarity, Polarity::Affirm);

        let claim: Claim = serde_json::from_value(claim_json(serde_json::json!({
            "modality": "ALLEGED",
            "polarity": "weird"
        })))
        .unwrap();
        assert_eq!(claim.modality, Modality::Alleged);
        assert_eq!(claim.polarity, Polarity::Unknown);
    }

    #[test]
    fn test_serialized_claim_reads_back() {
        let claim = base().modality(Modality::Denied).polarity(Polarity::Negate).build().unwrap();
        let back: Claim = serde_json::from_str(&serde_json::to_string(&claim).unwrap()).unwrap();
        assert_eq!(back.modality, Modality::Denied);
        assert_eq!(back.polarity, Polarity::Negate);
    }

    #[test]
    fn test_external_ids_are_stable() {
        assert_eq!(ClaimId::from_external("claim-17"), ClaimId::from_external("claim-17"));
        assert_ne!(ClaimId::from_external("claim-17"), ClaimId::from_external("claim-18"));
    }
}
