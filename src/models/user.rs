use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{Specialization, UserGender, UserRole};

/// Fields never returned to clients.
pub const CREDENTIAL_FIELDS: &[&str] = &["password"];

fn not_available() -> String {
    "NA".to_string()
}

/// A long-lived account holder. Independent of the per-report documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default = "certificate_placeholder")]
    pub certificate_path: String,
    #[serde(default)]
    pub terms_accepted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialization: Option<Specialization>,
    pub email_id: String,
    #[serde(default = "not_available")]
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<UserGender>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blood_type: Option<String>,
    #[serde(default)]
    pub address: Address,
    #[serde(default)]
    pub emergency_contact: EmergencyContact,
    #[serde(default = "not_available")]
    pub biography: String,
    #[serde(default)]
    pub medical_profile: UserMedicalProfile,
    #[serde(default)]
    pub account_settings: AccountSettings,
    #[serde(default)]
    pub security_settings: SecuritySettings,
    /// PBKDF2 hash, see `credentials::hash_password`.
    pub password: String,
}

fn certificate_placeholder() -> String {
    "N/A".to_string()
}

impl User {
    /// A fresh account with every optional section at its default.
    pub fn new(first_name: String, last_name: String, email_id: String, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            first_name,
            last_name,
            role: None,
            avatar: None,
            certificate_path: certificate_placeholder(),
            terms_accepted: false,
            specialization: None,
            email_id,
            phone: not_available(),
            date_of_birth: None,
            gender: None,
            blood_type: None,
            address: Address::default(),
            emergency_contact: EmergencyContact::default(),
            biography: not_available(),
            medical_profile: UserMedicalProfile::default(),
            account_settings: AccountSettings::default(),
            security_settings: SecuritySettings::default(),
            password: password_hash,
        }
    }

    /// JSON view of the user with credential fields removed.
    pub fn public_view(&self) -> Result<serde_json::Value, serde_json::Error> {
        let mut value = serde_json::to_value(self)?;
        if let Some(map) = value.as_object_mut() {
            for field in CREDENTIAL_FIELDS {
                map.remove(*field);
            }
        }
        Ok(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
}

impl Default for Address {
    fn default() -> Self {
        Self {
            street: not_available(),
            city: not_available(),
            state: not_available(),
            zip_code: not_available(),
            country: "India".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmergencyContact {
    pub name: String,
    pub relationship: String,
    pub phone: String,
}

impl Default for EmergencyContact {
    fn default() -> Self {
        Self {
            name: not_available(),
            relationship: not_available(),
            phone: not_available(),
        }
    }
}

/// Patient-maintained medical summary on the account (not the extracted reports).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserMedicalProfile {
    pub allergies: Vec<super::AllergyEntry>,
    pub chronic_conditions: Vec<super::ConditionEntry>,
    pub medications: Vec<super::MedicationEntry>,
    pub family_history: Vec<super::FamilyHistoryEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AccountSettings {
    pub language: String,
    pub time_zone: String,
    pub notifications: NotificationSettings,
    pub privacy: PrivacySettings,
    pub accessibility: AccessibilitySettings,
    pub connected_devices: Vec<ConnectedDevice>,
}

impl Default for AccountSettings {
    fn default() -> Self {
        Self {
            language: "English".to_string(),
            time_zone: "Asia/Kolkata".to_string(),
            notifications: NotificationSettings::default(),
            privacy: PrivacySettings::default(),
            accessibility: AccessibilitySettings::default(),
            connected_devices: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NotificationSettings {
    pub email: bool,
    pub sms: bool,
    pub app: bool,
    pub appointment_reminders: bool,
    pub medication_reminders: bool,
    pub system_updates: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PrivacySettings {
    pub profile_visibility: String,
    pub data_sharing: String,
    pub research_participation: bool,
}

impl Default for PrivacySettings {
    fn default() -> Self {
        Self {
            profile_visibility: "Colleagues only".to_string(),
            data_sharing: "Limited".to_string(),
            research_participation: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AccessibilitySettings {
    pub high_contrast: bool,
    pub large_text: bool,
    pub screen_reader: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConnectedDevice {
    pub name: Option<String>,
    pub last_active: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub device_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SecuritySettings {
    pub last_password_change: Option<DateTime<Utc>>,
    pub two_factor_enabled: bool,
    pub recovery_email: Option<String>,
    pub login_history: Vec<LoginRecord>,
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            last_password_change: None,
            two_factor_enabled: true,
            recovery_email: None,
            login_history: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginRecord {
    pub date: Option<DateTime<Utc>>,
    pub device: Option<String>,
    pub location: Option<String>,
    pub ip: Option<String>,
}
