use serde_json::Value;

use super::ExtractionError;
use crate::models::ProfileRecord;
use crate::pipeline::schema::OutputSchema;

/// Strip a surrounding Markdown code fence (```json ... ```), if any.
pub fn strip_code_fence(response: &str) -> &str {
    let trimmed = response.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip the info string (e.g. "json") up to the first newline.
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest.trim_start_matches("json"),
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Parse extractor text into a typed record.
///
/// The text must be JSON that conforms to `schema`; nulls and empty enum
/// values are pruned first so the record's declared defaults apply.
pub fn parse_record<R: ProfileRecord>(
    response: &str,
    schema: &OutputSchema,
) -> Result<R, ExtractionError> {
    let body = strip_code_fence(response);
    if body.is_empty() {
        return Err(ExtractionError::EmptyResponse);
    }

    let value: Value = serde_json::from_str(body)
        .map_err(|e| ExtractionError::Malformed(format!("not valid JSON: {e}")))?;

    let normalized = schema
        .normalize(&value)
        .map_err(|violations| ExtractionError::SchemaViolations {
            schema: schema.id,
            violations,
        })?;

    serde_json::from_value(normalized).map_err(|e| ExtractionError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::{DiabetesType, LabFlag, ReportGender};
    use crate::models::{DiabetesRecord, StructuredRecord};
    use crate::pipeline::schema::{SchemaDomain, SchemaRegistry};

    fn schema(domain: SchemaDomain) -> OutputSchema {
        SchemaRegistry::builtin().unwrap().latest(domain).unwrap().clone()
    }

    #[test]
    fn strips_json_fence() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("  {\"a\":1} "), "{\"a\":1}");
        assert_eq!(strip_code_fence("```json{\"a\":1}```"), "{\"a\":1}");
    }

    #[test]
    fn lab_results_scenario_parses() {
        let record: StructuredRecord = parse_record(
            r#"{"medicalProfile":{"labResults":[{"testName":"Glucose","value":"95","unit":"mg/dL","flag":"Normal"}]}}"#,
            &schema(SchemaDomain::MedicalReport),
        )
        .unwrap();
        let lab = &record.medical_profile.lab_results[0];
        assert_eq!(lab.test_name, "Glucose");
        assert_eq!(lab.flag, LabFlag::Normal);
        assert_eq!(lab.reference_range, "NA");
    }

    #[test]
    fn nulls_and_empty_enums_take_defaults() {
        let record: StructuredRecord = parse_record(
            r#"```json
            {"firstName": null, "gender": "", "medicalProfile": {"allergies": null}}
            ```"#,
            &schema(SchemaDomain::MedicalReport),
        )
        .unwrap();
        assert_eq!(record.first_name, "");
        assert_eq!(record.gender, ReportGender::NotAvailable);
        assert!(record.medical_profile.allergies.is_empty());
    }

    #[test]
    fn out_of_set_enum_is_malformed() {
        let err = parse_record::<StructuredRecord>(
            r#"{"gender": "Male"}"#,
            &schema(SchemaDomain::MedicalReport),
        )
        .unwrap_err();
        assert!(err.is_malformed());
        let ExtractionError::SchemaViolations { violations, .. } = err else {
            panic!("expected schema violations");
        };
        assert_eq!(violations[0].path, "gender");
    }

    #[test]
    fn non_json_is_malformed() {
        let err = parse_record::<StructuredRecord>(
            "I could not read this document.",
            &schema(SchemaDomain::MedicalReport),
        )
        .unwrap_err();
        assert!(matches!(err, ExtractionError::Malformed(_)));
        assert!(matches!(
            parse_record::<StructuredRecord>("  ", &schema(SchemaDomain::MedicalReport)),
            Err(ExtractionError::EmptyResponse)
        ));
    }

    #[test]
    fn diabetes_record_parses() {
        let record: DiabetesRecord = parse_record(
            r#"{"clinicalSummary":{"diabetesType":"Type 2"},"healthMetrics":{"hba1c":[{"date":"2024-01-02","value":7.1}]}}"#,
            &schema(SchemaDomain::Diabetes),
        )
        .unwrap();
        assert_eq!(record.clinical_summary.diabetes_type, DiabetesType::Type2);
        assert_eq!(record.health_metrics.hba1c[0].value, Some(7.1));
    }
}
