//! The closed set of payload roots the profile-update path understands.

use crate::models::enums::{Specialization, UserGender};

#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    Text,
    /// Non-blank text.
    RequiredText,
    Bool,
    OneOf(fn() -> &'static [&'static str]),
    /// Nested settings group, emitted one path per field.
    Group(&'static [FieldSpec]),
    /// Array of records, assigned wholesale. Missing item fields become "NA".
    Records(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub key: &'static str,
    pub kind: FieldKind,
}

const fn field(key: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec { key, kind }
}

#[derive(Debug, Clone, Copy)]
pub struct RootSpec {
    pub name: &'static str,
    /// Document prefix the root writes under; `None` writes top-level fields.
    pub target: Option<&'static str>,
    pub fields: &'static [FieldSpec],
}

use FieldKind::{Bool, Records, RequiredText, Text};

const ADDRESS: &[FieldSpec] = &[
    field("street", Text),
    field("city", Text),
    field("state", Text),
    field("zipCode", Text),
    field("country", Text),
];

const EMERGENCY_CONTACT: &[FieldSpec] = &[
    field("name", Text),
    field("relationship", Text),
    field("phone", Text),
];

const NOTIFICATIONS: &[FieldSpec] = &[
    field("email", Bool),
    field("sms", Bool),
    field("app", Bool),
    field("appointmentReminders", Bool),
    field("medicationReminders", Bool),
    field("systemUpdates", Bool),
];

const PRIVACY: &[FieldSpec] = &[
    field("profileVisibility", Text),
    field("dataSharing", Text),
    field("researchParticipation", Bool),
];

const ACCESSIBILITY: &[FieldSpec] = &[
    field("highContrast", Bool),
    field("largeText", Bool),
    field("screenReader", Bool),
];

pub const PERSONAL_INFO: RootSpec = RootSpec {
    name: "personalInfo",
    target: None,
    fields: &[
        field("firstName", RequiredText),
        field("lastName", RequiredText),
        field("phone", Text),
        field("dateOfBirth", Text),
        field("gender", FieldKind::OneOf(UserGender::values)),
        field("bloodType", Text),
        field("avatar", Text),
        field("biography", Text),
        field("specialization", FieldKind::OneOf(Specialization::values)),
        field("address", FieldKind::Group(ADDRESS)),
        field("emergencyContact", FieldKind::Group(EMERGENCY_CONTACT)),
    ],
};

pub const MEDICAL_PROFILE: RootSpec = RootSpec {
    name: "medicalProfile",
    target: Some("medicalProfile"),
    fields: &[
        field("allergies", Records(&["name", "severity", "reaction"])),
        field("chronicConditions", Records(&["name", "diagnosedDate", "status"])),
        field("medications", Records(&["name", "dosage", "frequency", "purpose"])),
        field("familyHistory", Records(&["condition", "relation"])),
    ],
};

pub const ACCOUNT_SETTINGS: RootSpec = RootSpec {
    name: "accountSettings",
    target: Some("accountSettings"),
    fields: &[
        field("language", Text),
        field("timeZone", Text),
        field("notifications", FieldKind::Group(NOTIFICATIONS)),
        field("privacy", FieldKind::Group(PRIVACY)),
        field("accessibility", FieldKind::Group(ACCESSIBILITY)),
    ],
};

pub const PROFILE_ROOTS: &[RootSpec] = &[PERSONAL_INFO, MEDICAL_PROFILE, ACCOUNT_SETTINGS];

/// Names of every recognised root.
pub fn root_names() -> Vec<&'static str> {
    PROFILE_ROOTS.iter().map(|r| r.name).collect()
}
