//! # Domain Models
//!
//! These structs represent the core entities of PawRescue.
//! User identities use UUID v7 so ids sort by creation time.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};

/// A persisted account. The email is always trimmed and lower-cased.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: Uuid,
    /// Display name as typed at sign-up (trimmed)
    pub name: String,
    /// Normalized email, unique across records
    pub email: String,
    /// Output of the active `PasswordHasher`
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn new(name: &str, email: &str, password_hash: String) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: name.to_string(),
            email: email.to_lowercase(),
            password_hash,
            created_at: Utc::now(),
        }
    }

    /// Projects the record into the identity carried by a logged-in session.
    pub fn to_app_user(&self) -> AppUser {
        AppUser {
            id: self.id,
            username: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

/// Identity of the signed-in user. Never carries the password digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

/// Minimal persisted state used to restore the session on relaunch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionMarker {
    pub saved_email: Option<String>,
    pub is_guest: bool,
}

/// The report board a sighting is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportCategory {
    #[serde(rename = "Found Animal")]
    Found,
    #[serde(rename = "Lost Animal")]
    Lost,
    #[serde(rename = "Injured Animal")]
    Injured,
    #[serde(rename = "Wild Animal")]
    Wild,
}

impl ReportCategory {
    pub const ALL: [ReportCategory; 4] = [Self::Found, Self::Lost, Self::Injured, Self::Wild];

    /// The value stored in the remote `category` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Found => "Found Animal",
            Self::Lost => "Lost Animal",
            Self::Injured => "Injured Animal",
            Self::Wild => "Wild Animal",
        }
    }
}

impl fmt::Display for ReportCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportCategory {
    type Err = AppError;

    /// Accepts the wire value ("Lost Animal") or the short form ("lost").
    fn from_str(s: &str) -> Result<Self> {
        let needle = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| {
                let wire = c.as_str().to_lowercase();
                wire == needle || wire.split(' ').next() == Some(needle.as_str())
            })
            .ok_or_else(|| AppError::ValidationError(format!("unknown report category '{s}'")))
    }
}

/// Condition of the animal at the time of the report.
///
/// Unknown strings coming back from the server decode to `Unknown` rather
/// than failing the whole list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AnimalStatus {
    #[default]
    Unknown,
    Safe,
    Injured,
    Aggressive,
    Deceased,
    Other,
}

impl AnimalStatus {
    pub const ALL: [AnimalStatus; 6] = [
        Self::Unknown,
        Self::Safe,
        Self::Injured,
        Self::Aggressive,
        Self::Deceased,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Safe => "Safe/Contained",
            Self::Injured => "Injured",
            Self::Aggressive => "Aggressive",
            Self::Deceased => "Deceased",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for AnimalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for AnimalStatus {
    fn from(s: String) -> Self {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .unwrap_or_default()
    }
}

impl From<AnimalStatus> for String {
    fn from(status: AnimalStatus) -> Self {
        status.as_str().to_string()
    }
}

impl FromStr for AnimalStatus {
    type Err = AppError;

    /// Strict parse for user input; "safe" is accepted for "Safe/Contained".
    fn from_str(s: &str) -> Result<Self> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|status| {
                status.as_str().eq_ignore_ascii_case(needle)
                    || (*status == Self::Safe && needle.eq_ignore_ascii_case("safe"))
            })
            .ok_or_else(|| AppError::ValidationError(format!("unknown animal status '{s}'")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

const EARTH_RADIUS_METERS: f64 = 6_371_008.8;
const METERS_PER_MILE: f64 = 1609.344;

impl Coordinate {
    /// Great-circle distance in statute miles (haversine, mean Earth radius).
    pub fn miles_to(&self, other: &Coordinate) -> f64 {
        let (lat_a, lat_b) = (self.latitude.to_radians(), other.latitude.to_radians());
        let d_lat = lat_b - lat_a;
        let d_lon = (other.longitude - self.longitude).to_radians();

        let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
        let central_angle = 2.0 * h.sqrt().min(1.0).asin();
        central_angle * EARTH_RADIUS_METERS / METERS_PER_MILE
    }
}

pub const DEFAULT_ALERT_RADIUS_MILES: f64 = 10.0;
pub const MAX_ALERT_RADIUS_MILES: f64 = 50.0;

/// Per-account settings for "new report nearby" alerts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationPrefs {
    pub enabled: bool,
    /// Always within `0..=MAX_ALERT_RADIUS_MILES` when set through `set_radius`
    pub radius_miles: f64,
    pub center_lat: Option<f64>,
    pub center_lon: Option<f64>,
}

impl Default for NotificationPrefs {
    fn default() -> Self {
        Self {
            enabled: false,
            radius_miles: DEFAULT_ALERT_RADIUS_MILES,
            center_lat: None,
            center_lon: None,
        }
    }
}

impl NotificationPrefs {
    pub fn set_radius(&mut self, miles: f64) {
        self.radius_miles = if miles.is_nan() {
            0.0
        } else {
            miles.clamp(0.0, MAX_ALERT_RADIUS_MILES)
        };
    }

    pub fn set_center(&mut self, center: Option<Coordinate>) {
        self.center_lat = center.map(|c| c.latitude);
        self.center_lon = center.map(|c| c.longitude);
    }

    pub fn center(&self) -> Option<Coordinate> {
        Some(Coordinate {
            latitude: self.center_lat?,
            longitude: self.center_lon?,
        })
    }

    /// Distance to `report` when it should raise an alert: alerts enabled,
    /// a center set, the report pinned, and within the radius (inclusive).
    pub fn alert_distance(&self, report: &Report) -> Option<f64> {
        if !self.enabled {
            return None;
        }
        let center = self.center()?;
        let miles = center.miles_to(&report.coordinate()?);
        (miles <= self.radius_miles).then_some(miles)
    }
}

/// A photo or video picked for a report. Kept on-device, never uploaded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttachedMedia {
    pub id: Uuid,
    pub filename: String,
    pub is_video: bool,
}

/// A sighting as stored in the remote `public_reports` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: Uuid,
    /// Assigned by the server when absent
    #[serde(rename = "created_at", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// `None` when absent or not one of the four known boards
    #[serde(default, deserialize_with = "lenient_category")]
    pub category: Option<ReportCategory>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub animal_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub color: String,
    #[serde(default)]
    pub incident_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: AnimalStatus,
    #[serde(default, deserialize_with = "null_as_default")]
    pub nearest_landmark: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(skip)]
    pub media: Vec<AttachedMedia>,
}

impl Report {
    /// A blank report for `category`, timestamped now.
    pub fn draft(category: ReportCategory) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            created_at: Some(now),
            category: Some(category),
            animal_type: String::new(),
            color: String::new(),
            incident_date: Some(now),
            status: AnimalStatus::Unknown,
            nearest_landmark: String::new(),
            description: String::new(),
            latitude: None,
            longitude: None,
            media: Vec::new(),
        }
    }

    pub fn set_coordinate(&mut self, coordinate: Option<Coordinate>) {
        self.latitude = coordinate.map(|c| c.latitude);
        self.longitude = coordinate.map(|c| c.longitude);
    }

    /// Both halves must be present for the report to be pinned on a map.
    pub fn coordinate(&self) -> Option<Coordinate> {
        Some(Coordinate {
            latitude: self.latitude?,
            longitude: self.longitude?,
        })
    }

    /// Unpinned reports are never within any radius.
    pub fn is_within(&self, center: &Coordinate, radius_miles: f64) -> bool {
        self.coordinate()
            .is_some_and(|c| c.miles_to(center) <= radius_miles)
    }

    /// One-line alert text, e.g. "Dog reported near Elm St bridge, 1.2 mi away".
    pub fn nearby_summary(&self, miles: f64) -> String {
        let animal = match self.animal_type.trim() {
            "" => "Animal",
            other => other,
        };
        match self.nearest_landmark.trim() {
            "" => format!("{animal} reported, {miles:.1} mi away"),
            landmark => format!("{animal} reported near {landmark}, {miles:.1} mi away"),
        }
    }

    pub fn can_submit(&self) -> bool {
        !self.animal_type.trim().is_empty() && self.status != AnimalStatus::Unknown
    }

    pub fn validate(&self) -> Result<()> {
        if self.animal_type.trim().is_empty() {
            return Err(AppError::ValidationError("animal type is required".into()));
        }
        if self.status == AnimalStatus::Unknown {
            return Err(AppError::ValidationError("pick a status other than Unknown".into()));
        }
        Ok(())
    }
}

fn lenient_category<'de, D>(deserializer: D) -> std::result::Result<Option<ReportCategory>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|s| {
        ReportCategory::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
    }))
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_record_normalizes_email() {
        let user = UserRecord::new("Jane", "Jane@Example.com", "ab".into());
        assert_eq!(user.email, "jane@example.com");
        assert_eq!(user.to_app_user().username, "Jane");
    }

    #[test]
    fn test_report_decodes_server_row_with_nulls() {
        let row = serde_json::json!({
            "id": "7f1c3a52-8d1e-4b7a-9a44-0c2f1b6d9e11",
            "created_at": "2025-03-01T12:30:00+00:00",
            "animalType": "Dog",
            "color": null,
            "incidentDate": "2025-03-01T11:00:00Z",
            "status": "Safe/Contained",
            "nearestLandmark": null,
            "description": "Friendly, no collar",
            "category": "Lost Animal",
            "latitude": 40.7,
            "longitude": null
        });
        let report: Report = serde_json::from_value(row).unwrap();
        assert_eq!(report.category, Some(ReportCategory::Lost));
        assert_eq!(report.status, AnimalStatus::Safe);
        assert_eq!(report.color, "");
        assert!(report.coordinate().is_none());
    }

    #[test]
    fn test_unrecognized_status_decodes_as_unknown() {
        let status: AnimalStatus = serde_json::from_str("\"Sleeping\"").unwrap();
        assert_eq!(status, AnimalStatus::Unknown);
        assert!("Sleeping".parse::<AnimalStatus>().is_err());
        assert_eq!("safe".parse::<AnimalStatus>().unwrap(), AnimalStatus::Safe);
    }

    #[test]
    fn test_report_serializes_wire_names() {
        let mut report = Report::draft(ReportCategory::Injured);
        report.animal_type = "Cat".into();
        report.status = AnimalStatus::Injured;
        report.set_coordinate(Some(Coordinate { latitude: 1.5, longitude: -2.0 }));

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["animalType"], "Cat");
        assert_eq!(value["category"], "Injured Animal");
        assert_eq!(value["status"], "Injured");
        assert!(value.get("created_at").is_some());
        assert!(value.get("media").is_none());
    }

    #[test]
    fn test_submission_rule() {
        let mut report = Report::draft(ReportCategory::Found);
        assert!(!report.can_submit());
        report.animal_type = "  ".into();
        report.status = AnimalStatus::Other;
        assert!(report.validate().is_err());
        report.animal_type = "Rabbit".into();
        assert!(report.can_submit());
        assert!(report.validate().is_ok());
    }

    #[test]
    fn test_unrecognized_category_decodes_as_none() {
        let rows = serde_json::json!([
            { "id": "7f1c3a52-8d1e-4b7a-9a44-0c2f1b6d9e11", "category": "Stray Animal", "animalType": "Dog" },
            { "id": "0b3f4a2e-5c6d-4e7f-8a9b-0c1d2e3f4a5b", "category": null, "animalType": "Cat" },
            { "id": "1a2b3c4d-5e6f-4a7b-8c9d-0e1f2a3b4c5d", "category": "wild animal", "animalType": "Owl" }
        ]);
        let reports: Vec<Report> = serde_json::from_value(rows).unwrap();
        assert_eq!(reports[0].category, None);
        assert_eq!(reports[1].category, None);
        assert_eq!(reports[2].category, Some(ReportCategory::Wild));
    }

    #[test]
    fn test_miles_between_known_points() {
        let nyc = Coordinate { latitude: 40.7128, longitude: -74.0060 };
        let la = Coordinate { latitude: 34.0522, longitude: -118.2437 };
        let miles = nyc.miles_to(&la);
        assert!((miles - 2445.0).abs() < 10.0, "got {miles}");
        assert!((la.miles_to(&nyc) - miles).abs() < 1e-9);
        assert_eq!(nyc.miles_to(&nyc), 0.0);

        // one degree of latitude is about 69 miles
        let north = Coordinate { latitude: 41.7128, longitude: -74.0060 };
        assert!((nyc.miles_to(&north) - 69.1).abs() < 0.5);
    }

    #[test]
    fn test_radius_is_clamped() {
        let mut prefs = NotificationPrefs::default();
        assert_eq!(prefs.radius_miles, DEFAULT_ALERT_RADIUS_MILES);
        prefs.set_radius(120.0);
        assert_eq!(prefs.radius_miles, MAX_ALERT_RADIUS_MILES);
        prefs.set_radius(-3.0);
        assert_eq!(prefs.radius_miles, 0.0);
        prefs.set_radius(f64::NAN);
        assert_eq!(prefs.radius_miles, 0.0);
        prefs.set_radius(25.5);
        assert_eq!(prefs.radius_miles, 25.5);
    }

    #[test]
    fn test_alert_distance_needs_enabled_center_and_pin() {
        let center = Coordinate { latitude: 40.0, longitude: -75.0 };
        let mut report = Report::draft(ReportCategory::Lost);
        report.set_coordinate(Some(Coordinate { latitude: 40.1, longitude: -75.0 }));

        let mut prefs = NotificationPrefs::default();
        prefs.set_center(Some(center));
        assert_eq!(prefs.alert_distance(&report), None);

        prefs.enabled = true;
        let miles = prefs.alert_distance(&report).unwrap();
        assert!((miles - 6.9).abs() < 0.1);
        assert!(report.is_within(&center, 7.0));
        assert!(!report.is_within(&center, 6.0));

        prefs.set_radius(5.0);
        assert_eq!(prefs.alert_distance(&report), None);

        prefs.set_radius(10.0);
        prefs.set_center(None);
        assert_eq!(prefs.alert_distance(&report), None);

        prefs.set_center(Some(center));
        report.set_coordinate(None);
        assert_eq!(prefs.alert_distance(&report), None);
        assert!(!report.is_within(&center, MAX_ALERT_RADIUS_MILES));
    }

    #[test]
    fn test_nearby_summary() {
        let mut report = Report::draft(ReportCategory::Found);
        assert_eq!(report.nearby_summary(2.0), "Animal reported, 2.0 mi away");
        report.animal_type = "Dog".into();
        report.nearest_landmark = "Elm St bridge".into();
        assert_eq!(report.nearby_summary(1.24), "Dog reported near Elm St bridge, 1.2 mi away");
    }

    #[test]
    fn test_prefs_decode_with_missing_fields() {
        let prefs: NotificationPrefs = serde_json::from_str(r#"{"enabled":true}"#).unwrap();
        assert!(prefs.enabled);
        assert_eq!(prefs.radius_miles, DEFAULT_ALERT_RADIUS_MILES);
        assert_eq!(prefs.center(), None);
    }

    #[test]
    fn test_category_parse_accepts_short_form() {
        assert_eq!("wild".parse::<ReportCategory>().unwrap(), ReportCategory::Wild);
        assert_eq!("Found Animal".parse::<ReportCategory>().unwrap(), ReportCategory::Found);
        assert!("pets".parse::<ReportCategory>().is_err());
    }
}
