//! Per-field merge policy tables.
//!
//! Both the report reconciler and the profile patch flattener consult these
//! tables; a path is governed by the most specific rule whose path equals it
//! or contains it.

use crate::pipeline::field_path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// Arrays and groups: the incoming value replaces the stored one wholesale.
    Replace,
    /// Scalars: the incoming value overwrites, absence clears.
    ScalarOverwrite,
    /// Arrays: incoming entries not already present are appended.
    Append,
    /// Set once at creation, never written again.
    Immutable,
    /// Stamped by the server on every write, never taken from input.
    ServerAssigned,
}

impl MergePolicy {
    /// Whether the value for this field is taken from the incoming record.
    pub fn is_mergeable(&self) -> bool {
        matches!(self, Self::Replace | Self::ScalarOverwrite | Self::Append)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRule {
    pub path: &'static str,
    pub policy: MergePolicy,
}

const fn rule(path: &'static str, policy: MergePolicy) -> FieldRule {
    FieldRule { path, policy }
}

use MergePolicy::{Immutable, Replace, ScalarOverwrite, ServerAssigned};

pub const MEDICAL_REPORT_RULES: &[FieldRule] = &[
    rule("ownerId", Immutable),
    rule("reportIdentity", Immutable),
    rule("schema", ServerAssigned),
    rule("lastUpdated", ServerAssigned),
    rule("firstName", ScalarOverwrite),
    rule("lastName", ScalarOverwrite),
    rule("dateOfBirth", ScalarOverwrite),
    rule("gender", ScalarOverwrite),
    rule("patientId", ScalarOverwrite),
    rule("reportDate", ScalarOverwrite),
    rule("physicianName", ScalarOverwrite),
    rule("clinicName", ScalarOverwrite),
    rule("medicalProfile.allergies", Replace),
    rule("medicalProfile.chronicConditions", Replace),
    rule("medicalProfile.medications", Replace),
    rule("medicalProfile.familyHistory", Replace),
    rule("medicalProfile.labResults", Replace),
    rule("medicalProfile.clinicalSummary.diagnosis", Replace),
    rule("medicalProfile.clinicalSummary.clinicalHistory", ScalarOverwrite),
    rule("medicalProfile.clinicalSummary.examinationFindings", ScalarOverwrite),
    rule("medicalProfile.clinicalSummary.prognosis", ScalarOverwrite),
];

pub const DIABETES_REPORT_RULES: &[FieldRule] = &[
    rule("ownerId", Immutable),
    rule("reportIdentity", Immutable),
    rule("schema", ServerAssigned),
    rule("lastUpdated", ServerAssigned),
    rule("patientInfo.patientId", ScalarOverwrite),
    rule("patientInfo.fullName", ScalarOverwrite),
    rule("patientInfo.dateOfBirth", ScalarOverwrite),
    rule("patientInfo.age", ScalarOverwrite),
    rule("patientInfo.gender", ScalarOverwrite),
    rule("patientInfo.contact.phone", ScalarOverwrite),
    rule("patientInfo.contact.email", ScalarOverwrite),
    rule("clinicalSummary.diabetesType", ScalarOverwrite),
    rule("clinicalSummary.diagnosisDate", ScalarOverwrite),
    rule("clinicalSummary.comorbidities", Replace),
    rule("clinicalSummary.familyHistory", ScalarOverwrite),
    rule("healthMetrics.bloodGlucose", Replace),
    rule("healthMetrics.hba1c", Replace),
    rule("healthMetrics.bloodPressure", Replace),
    rule("healthMetrics.lipidProfile", Replace),
    rule("healthMetrics.bmi", Replace),
    rule("medications", Replace),
    rule("lifestyle.exercise", Replace),
    rule("lifestyle.dailyNutrition", Replace),
    rule("achievements", Replace),
    rule("medicalDocuments", Replace),
];

/// Rules for the account document written by the profile-update path.
pub const USER_PROFILE_RULES: &[FieldRule] = &[
    rule("id", Immutable),
    rule("emailId", Immutable),
    rule("password", Immutable),
    rule("role", Immutable),
    rule("securitySettings", Immutable),
    rule("certificatePath", Immutable),
    rule("termsAccepted", Immutable),
    rule("firstName", ScalarOverwrite),
    rule("lastName", ScalarOverwrite),
    rule("phone", ScalarOverwrite),
    rule("dateOfBirth", ScalarOverwrite),
    rule("gender", ScalarOverwrite),
    rule("bloodType", ScalarOverwrite),
    rule("avatar", ScalarOverwrite),
    rule("biography", ScalarOverwrite),
    rule("specialization", ScalarOverwrite),
    rule("address", ScalarOverwrite),
    rule("emergencyContact", ScalarOverwrite),
    rule("medicalProfile.allergies", Replace),
    rule("medicalProfile.chronicConditions", Replace),
    rule("medicalProfile.medications", Replace),
    rule("medicalProfile.familyHistory", Replace),
    rule("accountSettings.language", ScalarOverwrite),
    rule("accountSettings.timeZone", ScalarOverwrite),
    rule("accountSettings.notifications", ScalarOverwrite),
    rule("accountSettings.privacy", ScalarOverwrite),
    rule("accountSettings.accessibility", ScalarOverwrite),
    rule("accountSettings.connectedDevices", Immutable),
];

/// Most specific rule governing `path`.
pub fn rule_for<'a>(rules: &'a [FieldRule], path: &str) -> Option<&'a FieldRule> {
    rules
        .iter()
        .filter(|r| field_path::is_within(path, r.path))
        .max_by_key(|r| r.path.len())
}

/// Paths that no generic write may touch.
pub fn protected_fields(rules: &[FieldRule]) -> Vec<&'static str> {
    rules
        .iter()
        .filter(|r| r.policy == Immutable)
        .map(|r| r.path)
        .collect()
}

/// Whether `path` is, or lies under, any of `protected`.
pub fn is_protected(protected: &[&str], path: &str) -> bool {
    protected
        .iter()
        .any(|p| field_path::is_within(path, p) || field_path::is_within(p, path))
}
