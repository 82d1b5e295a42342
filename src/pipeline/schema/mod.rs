pub mod node;

pub use node::{SchemaNode, SchemaViolation};

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Unknown schema domain: {0}")]
    UnknownDomain(String),

    #[error("Malformed schema id '{0}', expected '<domain>@<version>'")]
    InvalidId(String),

    #[error("Schema {0} is not registered")]
    NotRegistered(String),

    #[error("Schema {0} registered twice")]
    Duplicate(SchemaId),

    #[error("Invalid descriptor for {id}: {reason}")]
    InvalidDescriptor { id: SchemaId, reason: String },
}

/// Family of records an extraction schema describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SchemaDomain {
    MedicalReport,
    Diabetes,
}

impl SchemaDomain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MedicalReport => "medical_report",
            Self::Diabetes => "diabetes",
        }
    }
}

impl fmt::Display for SchemaDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemaDomain {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "medical_report" => Ok(Self::MedicalReport),
            "diabetes" => Ok(Self::Diabetes),
            other => Err(SchemaError::UnknownDomain(other.to_string())),
        }
    }
}

/// Versioned schema identifier, rendered `domain@version`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SchemaId {
    pub domain: SchemaDomain,
    pub version: u32,
}

impl SchemaId {
    pub const fn new(domain: SchemaDomain, version: u32) -> Self {
        Self { domain, version }
    }
}

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.domain, self.version)
    }
}

impl FromStr for SchemaId {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (domain, version) = s
            .split_once('@')
            .ok_or_else(|| SchemaError::InvalidId(s.to_string()))?;
        let version = version
            .parse::<u32>()
            .map_err(|_| SchemaError::InvalidId(s.to_string()))?;
        Ok(Self::new(domain.parse()?, version))
    }
}

impl TryFrom<String> for SchemaId {
    type Error = SchemaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SchemaId> for String {
    fn from(id: SchemaId) -> Self {
        id.to_string()
    }
}

/// One registered extraction contract.
///
/// `descriptor` is handed to the extractor verbatim; `root` is the typed tree
/// parsed from it and used to check what comes back.
#[derive(Debug, Clone)]
pub struct OutputSchema {
    pub id: SchemaId,
    pub response_mime_type: String,
    pub descriptor: Value,
    pub root: SchemaNode,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireDescriptor {
    response_mime_type: String,
    response_schema: Value,
}

impl OutputSchema {
    pub fn from_descriptor(id: SchemaId, raw: &str) -> Result<Self, SchemaError> {
        let invalid = |reason: String| SchemaError::InvalidDescriptor { id, reason };

        let descriptor: Value = serde_json::from_str(raw).map_err(|e| invalid(e.to_string()))?;
        let wire: WireDescriptor =
            serde_json::from_value(descriptor.clone()).map_err(|e| invalid(e.to_string()))?;
        let root: SchemaNode =
            serde_json::from_value(wire.response_schema).map_err(|e| invalid(e.to_string()))?;
        if !matches!(root, SchemaNode::Object { .. }) {
            return Err(invalid(format!("root must be OBJECT, got {}", root.type_name())));
        }

        Ok(Self {
            id,
            response_mime_type: wire.response_mime_type,
            descriptor,
            root,
        })
    }

    /// Check an extractor payload against this schema.
    pub fn normalize(&self, payload: &Value) -> Result<Value, Vec<SchemaViolation>> {
        self.root.normalize(payload)
    }
}

const MEDICAL_REPORT_V1: &str = include_str!("../../../resources/schemas/medical_report.v1.json");
const DIABETES_V1: &str = include_str!("../../../resources/schemas/diabetes.v1.json");

/// Read-only set of known output schemas. Built once at startup.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: BTreeMap<SchemaId, OutputSchema>,
}

impl SchemaRegistry {
    /// Registry holding the schemas compiled into the binary.
    pub fn builtin() -> Result<Self, SchemaError> {
        let mut registry = Self::default();
        registry.register(OutputSchema::from_descriptor(
            SchemaId::new(SchemaDomain::MedicalReport, 1),
            MEDICAL_REPORT_V1,
        )?)?;
        registry.register(OutputSchema::from_descriptor(
            SchemaId::new(SchemaDomain::Diabetes, 1),
            DIABETES_V1,
        )?)?;
        Ok(registry)
    }

    pub fn register(&mut self, schema: OutputSchema) -> Result<(), SchemaError> {
        if self.schemas.contains_key(&schema.id) {
            return Err(SchemaError::Duplicate(schema.id));
        }
        tracing::debug!(schema = %schema.id, "Registered output schema");
        self.schemas.insert(schema.id, schema);
        Ok(())
    }

    pub fn get(&self, id: &SchemaId) -> Option<&OutputSchema> {
        self.schemas.get(id)
    }

    /// Highest registered version for a domain.
    pub fn latest(&self, domain: SchemaDomain) -> Result<&OutputSchema, SchemaError> {
        self.schemas
            .values()
            .filter(|s| s.id.domain == domain)
            .max_by_key(|s| s.id.version)
            .ok_or_else(|| SchemaError::NotRegistered(domain.to_string()))
    }

    pub fn ids(&self) -> impl Iterator<Item = &SchemaId> {
        self.schemas.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::{DiabetesType, LabFlag, MedicationStatus, PatientGender, ReportGender};

    fn enum_values(schema: &OutputSchema, path: &str) -> Vec<String> {
        match schema.root.find(path) {
            Some(SchemaNode::Text { allowed: Some(values), .. }) => values.clone(),
            other => panic!("no enum at {path}: {other:?}"),
        }
    }

    #[test]
    fn builtin_registers_both_domains() {
        let registry = SchemaRegistry::builtin().unwrap();
        let ids: Vec<String> = registry.ids().map(|id| id.to_string()).collect();
        assert_eq!(ids, vec!["medical_report@1", "diabetes@1"]);
        assert_eq!(
            registry.latest(SchemaDomain::Diabetes).unwrap().response_mime_type,
            "application/json"
        );
    }

    #[test]
    fn descriptor_is_kept_verbatim() {
        let registry = SchemaRegistry::builtin().unwrap();
        let schema = registry.latest(SchemaDomain::MedicalReport).unwrap();
        let original: Value = serde_json::from_str(MEDICAL_REPORT_V1).unwrap();
        assert_eq!(schema.descriptor, original);
        assert_eq!(schema.descriptor["responseSchema"]["type"], "OBJECT");
    }

    #[test]
    fn enum_sets_match_record_enums() {
        let registry = SchemaRegistry::builtin().unwrap();
        let medical = registry.latest(SchemaDomain::MedicalReport).unwrap();
        assert_eq!(enum_values(medical, "gender"), ReportGender::values());
        assert_eq!(
            enum_values(medical, "medicalProfile.labResults.flag"),
            LabFlag::values()
        );

        let diabetes = registry.latest(SchemaDomain::Diabetes).unwrap();
        assert_eq!(enum_values(diabetes, "patientInfo.gender"), PatientGender::values());
        assert_eq!(
            enum_values(diabetes, "clinicalSummary.diabetesType"),
            DiabetesType::values()
        );
        assert_eq!(enum_values(diabetes, "medications.status"), MedicationStatus::values());
    }

    #[test]
    fn schema_id_parses_and_renders() {
        let id: SchemaId = "diabetes@1".parse().unwrap();
        assert_eq!(id, SchemaId::new(SchemaDomain::Diabetes, 1));
        assert_eq!(serde_json::to_value(id).unwrap(), "diabetes@1");
        assert!("diabetes".parse::<SchemaId>().is_err());
        assert!("cardio@1".parse::<SchemaId>().is_err());
    }

    #[test]
    fn duplicate_registration_rejected() {
        let mut registry = SchemaRegistry::builtin().unwrap();
        let again = OutputSchema::from_descriptor(
            SchemaId::new(SchemaDomain::Diabetes, 1),
            DIABETES_V1,
        )
        .unwrap();
        assert!(matches!(registry.register(again), Err(SchemaError::Duplicate(_))));
    }

    #[test]
    fn latest_picks_highest_version() {
        let mut registry = SchemaRegistry::builtin().unwrap();
        registry
            .register(
                OutputSchema::from_descriptor(SchemaId::new(SchemaDomain::Diabetes, 2), DIABETES_V1)
                    .unwrap(),
            )
            .unwrap();
        assert_eq!(registry.latest(SchemaDomain::Diabetes).unwrap().id.version, 2);
    }

    #[test]
    fn non_object_root_rejected() {
        let raw = r#"{"responseMimeType":"application/json","responseSchema":{"type":"STRING"}}"#;
        let result = OutputSchema::from_descriptor(SchemaId::new(SchemaDomain::Diabetes, 9), raw);
        assert!(matches!(result, Err(SchemaError::InvalidDescriptor { .. })));
    }
}
