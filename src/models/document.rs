use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{DiabetesRecord, FieldViolation, StructuredRecord};
use crate::pipeline::identity::RecordIdentity;
use crate::pipeline::reconcile::policy::{FieldRule, DIABETES_REPORT_RULES, MEDICAL_REPORT_RULES};
use crate::pipeline::schema::{SchemaDomain, SchemaId};

/// Longest report identity accepted by the store.
pub const MAX_REPORT_IDENTITY_LEN: usize = 255;

/// A record type the extraction pipeline can produce and the reconciler can merge.
pub trait ProfileRecord:
    Serialize + DeserializeOwned + Default + Clone + PartialEq + Send + Sync + 'static
{
    /// Schema domain the extractor is constrained with.
    const DOMAIN: SchemaDomain;
    /// Store collection the reconciled documents live in.
    const COLLECTION: &'static str;

    /// Per-field merge policy consulted on every reconciliation.
    fn merge_rules() -> &'static [FieldRule];
}

impl ProfileRecord for StructuredRecord {
    const DOMAIN: SchemaDomain = SchemaDomain::MedicalReport;
    const COLLECTION: &'static str = "medical_reports";

    fn merge_rules() -> &'static [FieldRule] {
        MEDICAL_REPORT_RULES
    }
}

impl ProfileRecord for DiabetesRecord {
    const DOMAIN: SchemaDomain = SchemaDomain::Diabetes;
    const COLLECTION: &'static str = "diabetes_reports";

    fn merge_rules() -> &'static [FieldRule] {
        DIABETES_REPORT_RULES
    }
}

/// The persisted, reconciled view of one uploaded report for one owner.
///
/// At most one exists per `(owner_id, report_identity)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDocument<R> {
    pub owner_id: String,
    pub report_identity: String,
    pub schema: SchemaId,
    pub last_updated: DateTime<Utc>,
    #[serde(flatten)]
    pub record: R,
}

pub type MedicalProfileDocument = ReportDocument<StructuredRecord>;
pub type DiabetesProfileDocument = ReportDocument<DiabetesRecord>;

impl<R: ProfileRecord> ReportDocument<R> {
    pub fn identity(&self) -> RecordIdentity {
        RecordIdentity {
            owner_id: self.owner_id.clone(),
            report_identity: self.report_identity.clone(),
        }
    }

    /// Write-time checks the store enforces before accepting a document.
    pub fn validate(&self) -> Result<(), Vec<FieldViolation>> {
        let mut violations = Vec::new();

        if self.owner_id.trim().is_empty() {
            violations.push(FieldViolation::new("ownerId", "must not be empty"));
        }
        if self.report_identity.trim().is_empty() {
            violations.push(FieldViolation::new("reportIdentity", "must not be empty"));
        } else if self.report_identity.len() > MAX_REPORT_IDENTITY_LEN {
            violations.push(FieldViolation::new(
                "reportIdentity",
                format!("must be at most {MAX_REPORT_IDENTITY_LEN} bytes"),
            ));
        }
        if self.schema.domain != R::DOMAIN {
            violations.push(FieldViolation::new(
                "schema",
                format!("expected a {} schema, got {}", R::DOMAIN, self.schema),
            ));
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}
