use serde::{Deserialize, Serialize};

use super::enums::{LabFlag, ReportGender};

const NOT_AVAILABLE: &str = "NA";

fn not_available() -> String {
    NOT_AVAILABLE.to_string()
}

/// Output of the general medical-report extraction.
///
/// Every field is optional on the wire; absent fields take the declared
/// default (empty string, empty list, "NA") instead of failing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StructuredRecord {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    pub gender: ReportGender,
    pub patient_id: String,
    pub report_date: String,
    pub physician_name: String,
    pub clinic_name: String,
    pub medical_profile: ReportMedicalProfile,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReportMedicalProfile {
    pub allergies: Vec<AllergyEntry>,
    pub chronic_conditions: Vec<ConditionEntry>,
    pub medications: Vec<MedicationEntry>,
    pub family_history: Vec<FamilyHistoryEntry>,
    pub lab_results: Vec<LabResultEntry>,
    pub clinical_summary: ClinicalSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AllergyEntry {
    pub name: String,
    pub severity: String,
    pub reaction: String,
}

impl Default for AllergyEntry {
    fn default() -> Self {
        Self {
            name: not_available(),
            severity: not_available(),
            reaction: not_available(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConditionEntry {
    pub name: String,
    pub diagnosed_date: String,
    pub status: String,
}

impl Default for ConditionEntry {
    fn default() -> Self {
        Self {
            name: not_available(),
            diagnosed_date: not_available(),
            status: not_available(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MedicationEntry {
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub purpose: String,
}

impl Default for MedicationEntry {
    fn default() -> Self {
        Self {
            name: not_available(),
            dosage: not_available(),
            frequency: not_available(),
            purpose: not_available(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FamilyHistoryEntry {
    pub condition: String,
    pub relation: String,
}

impl Default for FamilyHistoryEntry {
    fn default() -> Self {
        Self {
            condition: not_available(),
            relation: not_available(),
        }
    }
}

/// Lab results carry no declared defaults in the schema; missing text fields
/// are stored as "NA" like the other report sub-records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LabResultEntry {
    pub test_name: String,
    pub value: String,
    pub unit: String,
    pub reference_range: String,
    pub flag: LabFlag,
}

impl Default for LabResultEntry {
    fn default() -> Self {
        Self {
            test_name: not_available(),
            value: not_available(),
            unit: not_available(),
            reference_range: not_available(),
            flag: LabFlag::NotAvailable,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClinicalSummary {
    pub diagnosis: Vec<String>,
    pub clinical_history: String,
    pub examination_findings: String,
    pub prognosis: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_payload_takes_declared_defaults() {
        let record: StructuredRecord = serde_json::from_str("{}").unwrap();
        assert_eq!(record.first_name, "");
        assert_eq!(record.gender, ReportGender::NotAvailable);
        assert!(record.medical_profile.allergies.is_empty());
        assert_eq!(record.medical_profile.clinical_summary.prognosis, "");
    }

    #[test]
    fn partial_entries_fill_na() {
        let record: StructuredRecord = serde_json::from_value(serde_json::json!({
            "medicalProfile": {
                "allergies": [{"name": "Penicillin"}],
                "labResults": [{"testName": "Glucose", "value": "95"}]
            }
        }))
        .unwrap();
        let allergy = &record.medical_profile.allergies[0];
        assert_eq!(allergy.name, "Penicillin");
        assert_eq!(allergy.severity, "NA");
        assert_eq!(allergy.reaction, "NA");
        let lab = &record.medical_profile.lab_results[0];
        assert_eq!(lab.unit, "NA");
        assert_eq!(lab.flag, LabFlag::NotAvailable);
    }

    #[test]
    fn serializes_with_wire_field_names() {
        let json = serde_json::to_value(StructuredRecord::default()).unwrap();
        assert!(json.get("physicianName").is_some());
        assert!(json["medicalProfile"].get("chronicConditions").is_some());
        assert!(json["medicalProfile"]["clinicalSummary"]
            .get("examinationFindings")
            .is_some());
        assert_eq!(json["gender"], "NA");
    }
}
