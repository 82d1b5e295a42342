use serde::{Deserialize, Serialize};

use crate::db::DatabaseError;

/// Macro to generate enum with as_str + std::str::FromStr pattern.
///
/// The string form is also the serde form, so the persisted documents and the
/// extraction schema enums use exactly the same spelling.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }

            /// Every accepted spelling, in declaration order.
            pub fn values() -> &'static [&'static str] {
                &[$($s),+]
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

// ── Medical report schema ───────────────────────────────

str_enum!(ReportGender {
    Male => "male",
    Female => "female",
    Other => "other",
    NotAvailable => "NA",
});

impl Default for ReportGender {
    fn default() -> Self {
        Self::NotAvailable
    }
}

str_enum!(LabFlag {
    High => "High",
    Low => "Low",
    Normal => "Normal",
    NotAvailable => "NA",
});

impl Default for LabFlag {
    fn default() -> Self {
        Self::NotAvailable
    }
}

// ── Diabetes schema ─────────────────────────────────────

str_enum!(PatientGender {
    Male => "Male",
    Female => "Female",
    Other => "Other",
});

str_enum!(DiabetesType {
    Type1 => "Type 1",
    Type2 => "Type 2",
    Gestational => "Gestational",
    Undefined => "Undefined",
});

impl Default for DiabetesType {
    fn default() -> Self {
        Self::Undefined
    }
}

str_enum!(MedicationStatus {
    Active => "Active",
    Inactive => "Inactive",
});

// ── User ────────────────────────────────────────────────

str_enum!(UserRole {
    Patient => "patient",
    Doctor => "doctor",
});

str_enum!(UserGender {
    Female => "female",
    Male => "male",
    NonBinary => "Non-binary",
    Other => "other",
    Unspecified => "",
});

str_enum!(Specialization {
    Cardiology => "Cardiology",
    Dermatology => "Dermatology",
    Neurology => "Neurology",
    Orthopedics => "Orthopedics",
    Pediatrics => "Pediatrics",
    Oncology => "Oncology",
    Radiology => "Radiology",
    GeneralSurgery => "General Surgery",
    Other => "Other",
    Unspecified => "",
});
