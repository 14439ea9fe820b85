use chrono::{NaiveDate, NaiveDateTime};
use db::models::attendance_note::NoteContent;
use db::models::attendance_record::Stamp;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use util::config::AppConfig;
use util::geo::GeoPoint;
use util::validation::format_validation_errors;
use validator::Validate;

use crate::error::AttendanceError;

/// Limits and defaults applied to every submission.
#[derive(Debug, Clone)]
pub struct ProtocolSettings {
    pub default_radius_m: u32,
    pub max_agenda_links: usize,
    pub max_recipients: usize,
    pub max_notes: usize,
}

impl Default for ProtocolSettings {
    fn default() -> Self {
        Self {
            default_radius_m: 100,
            max_agenda_links: 50,
            max_recipients: 20,
            max_notes: 10,
        }
    }
}

impl From<&AppConfig> for ProtocolSettings {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            default_radius_m: cfg.default_geofence_radius,
            max_agenda_links: cfg.max_agenda_link_per_request,
            max_recipients: cfg.max_recipients_per_request,
            max_notes: cfg.max_notes_per_request,
        }
    }
}

/// A check-in or check-out request as it arrives, before any cleaning.
#[derive(Debug, Clone, Default, Validate)]
pub struct AttendanceSubmission {
    #[validate(required(message = "user_id is required"))]
    pub user_id: Option<i64>,

    pub location_id: Option<i64>,

    #[validate(
        required(message = "lat is required"),
        range(min = -90.0, max = 90.0, message = "lat must be between -90 and 90")
    )]
    pub lat: Option<f64>,

    #[validate(
        required(message = "lng is required"),
        range(min = -180.0, max = 180.0, message = "lng must be between -180 and 180")
    )]
    pub lng: Option<f64>,

    pub image: Option<Vec<u8>>,

    /// Raw `agenda_kerja_id` values.
    pub agenda_ids: Vec<String>,

    /// Raw `recipient` values.
    pub recipient_ids: Vec<String>,

    /// `deskripsi_catatan` values, paired by index with `note_attachments`.
    pub note_descriptions: Vec<String>,

    /// `lampiran_url` values.
    pub note_attachments: Vec<String>,
}

/// A submission that passed field validation, with lists cleaned and capped.
#[derive(Debug, Clone)]
pub struct CleanSubmission {
    pub user_id: i64,
    pub location_id: Option<i64>,
    pub point: GeoPoint,
    pub image: Vec<u8>,
    pub agenda_ids: Vec<i64>,
    pub recipient_ids: Vec<i64>,
    pub notes: Vec<NoteContent>,
}

impl AttendanceSubmission {
    pub fn into_clean(self, settings: &ProtocolSettings) -> Result<CleanSubmission, AttendanceError> {
        if let Err(errors) = self.validate() {
            return Err(AttendanceError::InvalidInput(format_validation_errors(&errors)));
        }

        let image = match self.image {
            Some(bytes) if !bytes.is_empty() => bytes,
            _ => return Err(AttendanceError::InvalidInput("image is required".into())),
        };

        let (Some(user_id), Some(lat), Some(lng)) = (self.user_id, self.lat, self.lng) else {
            return Err(AttendanceError::InvalidInput("user_id, lat and lng are required".into()));
        };

        let point = GeoPoint::new(lat, lng);
        if !point.is_valid() {
            return Err(AttendanceError::InvalidInput("lat/lng are not valid coordinates".into()));
        }

        Ok(CleanSubmission {
            user_id,
            location_id: self.location_id,
            point,
            image,
            agenda_ids: clean_ids(&self.agenda_ids, settings.max_agenda_links, "agenda_kerja_id")?,
            recipient_ids: clean_ids(&self.recipient_ids, settings.max_recipients, "recipient")?,
            notes: clean_notes(&self.note_descriptions, &self.note_attachments, settings.max_notes),
        })
    }
}

/// Trims, drops blanks, de-duplicates keeping the first occurrence, then caps.
fn clean_ids(raw: &[String], cap: usize, field: &str) -> Result<Vec<i64>, AttendanceError> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for value in raw.iter().map(|v| v.trim()).filter(|v| !v.is_empty()) {
        let id: i64 = value
            .parse()
            .map_err(|_| AttendanceError::InvalidInput(format!("{field} must be numeric, got '{value}'")))?;
        if seen.insert(id) {
            out.push(id);
        }
    }
    out.truncate(cap);
    Ok(out)
}

/// Pairs descriptions with attachments by index; blank descriptions are dropped.
fn clean_notes(descriptions: &[String], attachments: &[String], cap: usize) -> Vec<NoteContent> {
    descriptions
        .iter()
        .enumerate()
        .filter_map(|(idx, raw)| {
            let description = raw.trim();
            if description.is_empty() {
                return None;
            }
            let attachment_url = attachments
                .get(idx)
                .map(|u| u.trim())
                .filter(|u| !u.is_empty())
                .map(str::to_owned);
            Some(NoteContent {
                description: description.to_owned(),
                attachment_url,
            })
        })
        .take(cap)
        .collect()
}

/// Where the user stood when the request passed the geofence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub location_id: Option<i64>,
    pub lat: f64,
    pub lng: f64,
    pub distance_m: Option<f64>,
    pub radius_m: Option<f64>,
}

impl LocationFix {
    pub fn stamp(&self, at: NaiveDateTime) -> Stamp {
        Stamp {
            at,
            location_id: self.location_id,
            lat: self.lat,
            lng: self.lng,
            distance_m: self.distance_m,
            face_verified: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckinPayload {
    pub user_id: i64,
    pub date: NaiveDate,
    pub at: NaiveDateTime,
    pub fix: LocationFix,
    pub face_score: f64,
    pub agenda_ids: Vec<i64>,
    pub recipient_ids: Vec<i64>,
    pub notes: Vec<NoteContent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutPayload {
    pub attendance_id: i64,
    pub user_id: i64,
    pub date: NaiveDate,
    pub at: NaiveDateTime,
    pub fix: LocationFix,
    pub face_score: f64,
    pub agenda_ids: Vec<i64>,
    pub recipient_ids: Vec<i64>,
    pub notes: Vec<NoteContent>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| (*s).to_owned()).collect()
    }

    fn valid() -> AttendanceSubmission {
        AttendanceSubmission {
            user_id: Some(1),
            lat: Some(-8.65),
            lng: Some(115.22),
            image: Some(b"face:ayu".to_vec()),
            ..Default::default()
        }
    }

    #[test]
    fn missing_fields_are_reported_together() {
        let err = AttendanceSubmission::default()
            .into_clean(&ProtocolSettings::default())
            .unwrap_err();
        let AttendanceError::InvalidInput(msg) = err else {
            panic!("expected InvalidInput");
        };
        assert!(msg.contains("user_id is required"));
        assert!(msg.contains("lat is required"));
        assert!(msg.contains("lng is required"));
    }

    #[test]
    fn image_is_required() {
        let mut s = valid();
        s.image = None;
        assert!(matches!(
            s.into_clean(&ProtocolSettings::default()),
            Err(AttendanceError::InvalidInput(m)) if m == "image is required"
        ));
    }

    #[test]
    fn out_of_range_latitude_is_rejected() {
        let mut s = valid();
        s.lat = Some(123.0);
        assert!(matches!(
            s.into_clean(&ProtocolSettings::default()),
            Err(AttendanceError::InvalidInput(_))
        ));
    }

    #[test]
    fn ids_are_trimmed_deduplicated_and_capped() {
        let mut s = valid();
        s.agenda_ids = strings(&[" 3 ", "", "1", "3", "2"]);
        s.recipient_ids = strings(&["9", "9", "8"]);
        let settings = ProtocolSettings {
            max_agenda_links: 2,
            ..ProtocolSettings::default()
        };
        let clean = s.into_clean(&settings).unwrap();
        assert_eq!(clean.agenda_ids, vec![3, 1]);
        assert_eq!(clean.recipient_ids, vec![9, 8]);
    }

    #[test]
    fn non_numeric_ids_are_invalid_input() {
        let mut s = valid();
        s.recipient_ids = strings(&["abc"]);
        assert!(matches!(
            s.into_clean(&ProtocolSettings::default()),
            Err(AttendanceError::InvalidInput(_))
        ));
    }

    #[test]
    fn notes_pair_attachments_by_position_and_drop_blanks() {
        let mut s = valid();
        s.note_descriptions = strings(&["Visited client", "  ", "Wrote report"]);
        s.note_attachments = strings(&["https://x/a.jpg", "https://x/b.jpg", " "]);
        let clean = s.into_clean(&ProtocolSettings::default()).unwrap();
        assert_eq!(
            clean.notes,
            vec![
                NoteContent {
                    description: "Visited client".into(),
                    attachment_url: Some("https://x/a.jpg".into()),
                },
                NoteContent {
                    description: "Wrote report".into(),
                    attachment_url: None,
                },
            ]
        );
    }
}
