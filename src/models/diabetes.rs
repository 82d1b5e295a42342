use serde::{Deserialize, Serialize};

use super::enums::{DiabetesType, MedicationStatus, PatientGender};

/// Output of the diabetes-specific extraction.
///
/// The diabetes schema declares no defaults: text fields fall back to an
/// empty string and measurements stay unset when the report does not
/// mention them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DiabetesRecord {
    pub patient_info: PatientInfo,
    pub clinical_summary: DiabetesClinicalSummary,
    pub health_metrics: HealthMetrics,
    pub medications: Vec<DiabetesMedication>,
    pub lifestyle: Lifestyle,
    pub achievements: Vec<Achievement>,
    pub medical_documents: Vec<MedicalDocumentSummary>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PatientInfo {
    pub patient_id: String,
    pub full_name: String,
    pub date_of_birth: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<PatientGender>,
    pub contact: Contact,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Contact {
    pub phone: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DiabetesClinicalSummary {
    pub diabetes_type: DiabetesType,
    pub diagnosis_date: String,
    pub comorbidities: Vec<String>,
    pub family_history: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HealthMetrics {
    pub blood_glucose: Vec<GlucoseReading>,
    pub hba1c: Vec<DatedValue>,
    pub blood_pressure: Vec<BloodPressureReading>,
    pub lipid_profile: Vec<LipidPanel>,
    pub bmi: Vec<DatedValue>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GlucoseReading {
    pub timestamp: String,
    /// mg/dL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    pub context: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatedValue {
    pub date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BloodPressureReading {
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub systolic: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diastolic: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LipidPanel {
    pub date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_cholesterol: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub triglycerides: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hdl: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ldl: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DiabetesMedication {
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<MedicationStatus>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Lifestyle {
    pub exercise: Vec<ExerciseEntry>,
    pub daily_nutrition: Vec<NutritionEntry>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExerciseEntry {
    pub date: String,
    pub activity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NutritionEntry {
    pub date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carbohydrates_grams: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calories: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fiber_grams: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Achievement {
    pub achievement_id: String,
    pub title: String,
    pub description: String,
    pub date_achieved: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MedicalDocumentSummary {
    pub document_id: String,
    pub title: String,
    pub date: String,
    pub summary: String,
}
