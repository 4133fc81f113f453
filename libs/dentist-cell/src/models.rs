use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DentistError;

/// Wall-clock times on the wire: written as `HH:MM`, read as `HH:MM` or `HH:MM:SS`.
pub mod clock_time {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn parse(raw: &str) -> Option<NaiveTime> {
        let raw = raw.trim();
        NaiveTime::parse_from_str(raw, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
            .ok()
    }

    pub fn serialize<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid time of day `{}`", raw)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
        DayOfWeek::Sunday,
    ];

    pub fn of(date: NaiveDate) -> Self {
        match date.weekday() {
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
            Weekday::Sun => DayOfWeek::Sunday,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DayOfWeek::Monday => "Monday",
            DayOfWeek::Tuesday => "Tuesday",
            DayOfWeek::Wednesday => "Wednesday",
            DayOfWeek::Thursday => "Thursday",
            DayOfWeek::Friday => "Friday",
            DayOfWeek::Saturday => "Saturday",
            DayOfWeek::Sunday => "Sunday",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayHours {
    #[serde(with = "clock_time")]
    pub start: NaiveTime,
    #[serde(with = "clock_time")]
    pub end: NaiveTime,
    pub is_working: bool,
}

impl DayHours {
    pub fn working(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end, is_working: true }
    }

    pub fn off(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end, is_working: false }
    }
}

/// A dentist's weekly template. A weekday with no entry is "not configured",
/// which is different from an entry with `is_working = false`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkingHours {
    days: BTreeMap<DayOfWeek, DayHours>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkingDaySummary {
    pub day: DayOfWeek,
    pub hours: String,
}

impl WorkingHours {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_day(mut self, day: DayOfWeek, hours: DayHours) -> Self {
        self.days.insert(day, hours);
        self
    }

    pub fn set(&mut self, day: DayOfWeek, hours: DayHours) {
        self.days.insert(day, hours);
    }

    pub fn get(&self, day: DayOfWeek) -> Option<&DayHours> {
        self.days.get(&day)
    }

    pub fn for_date(&self, date: NaiveDate) -> Option<&DayHours> {
        self.get(DayOfWeek::of(date))
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (DayOfWeek, &DayHours)> {
        self.days.iter().map(|(day, hours)| (*day, hours))
    }

    /// Monday to Friday 09:00-17:00; Saturday 09:00-13:00 and Sunday kept as days off.
    pub fn default_schedule() -> Self {
        let at = |h: u32| NaiveTime::from_hms_opt(h, 0, 0).unwrap_or(NaiveTime::MIN);

        let mut hours = Self::new();
        for day in &DayOfWeek::ALL[..5] {
            hours.set(*day, DayHours::working(at(9), at(17)));
        }
        hours.set(DayOfWeek::Saturday, DayHours::off(at(9), at(13)));
        hours.set(DayOfWeek::Sunday, DayHours::off(NaiveTime::MIN, NaiveTime::MIN));
        hours
    }

    pub fn validate(&self) -> Result<(), DentistError> {
        for (day, hours) in self.iter() {
            if hours.is_working && hours.start >= hours.end {
                return Err(DentistError::InvalidWorkingHours(format!(
                    "{} starts at {} but ends at {}",
                    day.label(),
                    hours.start.format("%H:%M"),
                    hours.end.format("%H:%M"),
                )));
            }
        }
        Ok(())
    }

    /// Replicates one weekday's entry onto the other six.
    pub fn copy_day_to_all(&mut self, source: DayOfWeek) -> Result<(), DentistError> {
        let template = *self.get(source).ok_or_else(|| {
            DentistError::InvalidWorkingHours(format!("{} has no hours to copy", source.label()))
        })?;

        for day in DayOfWeek::ALL {
            if day != source {
                self.days.insert(day, template);
            }
        }
        Ok(())
    }

    pub fn working_summary(&self) -> Vec<WorkingDaySummary> {
        self.iter()
            .filter(|(_, hours)| hours.is_working)
            .map(|(day, hours)| WorkingDaySummary {
                day,
                hours: format!("{} - {}", hours.start.format("%H:%M"), hours.end.format("%H:%M")),
            })
            .collect()
    }

    pub fn from_rows(rows: Vec<WorkingHoursRow>) -> Self {
        let mut hours = Self::new();
        for row in rows {
            hours.set(row.day_of_week, DayHours {
                start: row.start_time,
                end: row.end_time,
                is_working: row.is_working,
            });
        }
        hours
    }

    pub fn to_rows(&self, dentist_id: Uuid) -> Vec<WorkingHoursRow> {
        self.iter()
            .map(|(day, hours)| WorkingHoursRow {
                dentist_id,
                day_of_week: day,
                start_time: hours.start,
                end_time: hours.end,
                is_working: hours.is_working,
            })
            .collect()
    }
}

/// One row of `dentist_working_hours`; unique on `(dentist_id, day_of_week)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkingHoursRow {
    pub dentist_id: Uuid,
    pub day_of_week: DayOfWeek,
    #[serde(with = "clock_time")]
    pub start_time: NaiveTime,
    #[serde(with = "clock_time")]
    pub end_time: NaiveTime,
    pub is_working: bool,
}

/// The part of an appointment that occupies a slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookedSlot {
    pub dentist_id: Uuid,
    pub date: NaiveDate,
    #[serde(with = "clock_time")]
    pub time: NaiveTime,
    pub status: String,
}

impl BookedSlot {
    pub fn is_active(&self) -> bool {
        self.status != "cancelled"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub time24: String,
    pub time12: String,
    pub is_available: bool,
    pub is_booked: bool,
}

impl TimeSlot {
    pub fn new(time: NaiveTime, is_booked: bool) -> Self {
        Self {
            time24: time.format("%H:%M").to_string(),
            time12: time.format("%-I:%M %p").to_string(),
            is_available: !is_booked,
            is_booked,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DayStatus {
    Available,
    Limited,
    FullyBooked,
    Unavailable,
    NotConfigured,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayAvailability {
    pub date: NaiveDate,
    pub status: DayStatus,
    pub available_slots: usize,
    pub total_slots: usize,
    pub time_slots: Vec<TimeSlot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: Uuid,
    pub name: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub default_duration: i32,
    pub default_price: f64,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DentistService {
    pub dentist_id: Uuid,
    pub service_id: Uuid,
    pub custom_price: Option<f64>,
    pub custom_duration: Option<i32>,
    #[serde(default = "offered_by_default")]
    pub is_offered: bool,
    pub notes: Option<String>,
    #[serde(default)]
    pub service: Option<Service>,
}

fn offered_by_default() -> bool {
    true
}

impl DentistService {
    pub fn is_bookable(&self) -> bool {
        self.is_offered && self.service.as_ref().is_some_and(|s| s.is_active)
    }

    pub fn effective_duration(&self) -> Option<i32> {
        self.custom_duration
            .or_else(|| self.service.as_ref().map(|s| s.default_duration))
    }

    pub fn effective_price(&self) -> Option<f64> {
        self.custom_price
            .or_else(|| self.service.as_ref().map(|s| s.default_price))
    }
}

/// A service as a patient books it with a particular dentist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookableService {
    pub service_id: Uuid,
    pub name: String,
    pub category: Option<String>,
    pub duration_minutes: i32,
    pub price: f64,
}

impl BookableService {
    pub fn from_assignment(assignment: &DentistService) -> Option<Self> {
        let service = assignment.service.as_ref()?;
        Some(Self {
            service_id: assignment.service_id,
            name: service.name.clone(),
            category: service.category.clone(),
            duration_minutes: assignment.effective_duration()?,
            price: assignment.effective_price()?,
        })
    }
}

/// Offers a catalog service with a dentist, optionally at a custom price or length.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignServiceRequest {
    pub service_id: Uuid,
    #[serde(default)]
    pub custom_price: Option<f64>,
    #[serde(default)]
    pub custom_duration: Option<i32>,
    #[serde(default = "offered_by_default")]
    pub is_offered: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

impl AssignServiceRequest {
    pub fn validate(&self) -> Result<(), DentistError> {
        if let Some(price) = self.custom_price {
            if !price.is_finite() || price < 0.0 {
                return Err(DentistError::InvalidAssignment(
                    "custom_price must be zero or more".to_string(),
                ));
            }
        }
        if let Some(minutes) = self.custom_duration {
            if !(1..=MAX_SERVICE_MINUTES).contains(&minutes) {
                return Err(DentistError::InvalidAssignment(format!(
                    "custom_duration must be between 1 and {} minutes",
                    MAX_SERVICE_MINUTES
                )));
            }
        }
        Ok(())
    }
}

const MAX_SERVICE_MINUTES: i32 = 480;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceListQuery {
    /// `all` or empty means no category filter.
    pub category: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
}

impl ServiceListQuery {
    pub fn category_filter(&self) -> Option<&str> {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("all"))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AvailabilityQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn working_hours_wire_format() {
        let hours: WorkingHours = serde_json::from_value(json!({
            "monday": { "start": "09:00", "end": "17:00:00", "is_working": true },
            "sunday": { "start": "00:00", "end": "00:00", "is_working": false }
        }))
        .unwrap();

        assert_eq!(hours.get(DayOfWeek::Monday), Some(&DayHours::working(t(9, 0), t(17, 0))));
        assert!(hours.get(DayOfWeek::Tuesday).is_none());

        let back = serde_json::to_value(&hours).unwrap();
        assert_eq!(back["monday"]["end"], "17:00");
    }

    #[test]
    fn default_schedule_matches_clinic_template() {
        let hours = WorkingHours::default_schedule();
        assert!(hours.validate().is_ok());
        assert_eq!(hours.working_summary().len(), 5);
        assert_eq!(hours.get(DayOfWeek::Saturday).map(|d| d.is_working), Some(false));
        assert_eq!(hours.get(DayOfWeek::Sunday).map(|d| d.is_working), Some(false));
    }

    #[test]
    fn validate_rejects_inverted_working_day() {
        let hours = WorkingHours::new()
            .with_day(DayOfWeek::Friday, DayHours::working(t(17, 0), t(9, 0)))
            .with_day(DayOfWeek::Sunday, DayHours::off(t(17, 0), t(9, 0)));
        let err = hours.validate().unwrap_err();
        assert!(err.to_string().contains("Friday"));
    }

    #[test]
    fn copy_day_to_all_overwrites_other_days() {
        let mut hours = WorkingHours::default_schedule();
        hours.set(DayOfWeek::Wednesday, DayHours::working(t(8, 0), t(12, 0)));
        hours.copy_day_to_all(DayOfWeek::Wednesday).unwrap();

        for day in DayOfWeek::ALL {
            assert_eq!(hours.get(day), Some(&DayHours::working(t(8, 0), t(12, 0))));
        }
        assert!(WorkingHours::new().copy_day_to_all(DayOfWeek::Monday).is_err());
    }

    #[test]
    fn summary_lists_working_days_monday_first() {
        let summary = WorkingHours::default_schedule().working_summary();
        assert_eq!(summary[0], WorkingDaySummary {
            day: DayOfWeek::Monday,
            hours: "09:00 - 17:00".to_string(),
        });
    }

    #[test]
    fn time_slot_labels_share_one_source() {
        let slot = TimeSlot::new(t(13, 30), false);
        assert_eq!(slot.time24, "13:30");
        assert_eq!(slot.time12, "1:30 PM");

        let midnight = TimeSlot::new(t(0, 0), true);
        assert_eq!(midnight.time12, "12:00 AM");
        assert!(!midnight.is_available);
    }

    #[test]
    fn day_status_is_kebab_case() {
        assert_eq!(serde_json::to_value(DayStatus::FullyBooked).unwrap(), "fully-booked");
        assert_eq!(serde_json::to_value(DayStatus::NotConfigured).unwrap(), "not-configured");
    }

    #[test]
    fn assignment_duration_prefers_custom_value() {
        let assignment: DentistService = serde_json::from_value(json!({
            "dentist_id": Uuid::new_v4(),
            "service_id": Uuid::nil(),
            "custom_price": null,
            "custom_duration": 45,
            "notes": null,
            "service": {
                "id": Uuid::nil(),
                "name": "Filling",
                "category": "Restorative",
                "description": null,
                "default_duration": 30,
                "default_price": 120.0,
                "is_active": true
            }
        }))
        .unwrap();

        assert!(assignment.is_bookable());
        assert_eq!(assignment.effective_duration(), Some(45));
        assert_eq!(assignment.effective_price(), Some(120.0));
    }

    #[test]
    fn assignment_overrides_are_bounded() {
        let request: AssignServiceRequest = serde_json::from_value(json!({
            "service_id": Uuid::new_v4(),
            "custom_duration": 60
        }))
        .unwrap();
        assert!(request.is_offered);
        assert!(request.validate().is_ok());

        let free = AssignServiceRequest { custom_price: Some(0.0), ..request.clone() };
        assert!(free.validate().is_ok());

        let negative = AssignServiceRequest { custom_price: Some(-5.0), ..request.clone() };
        assert!(matches!(negative.validate(), Err(DentistError::InvalidAssignment(_))));

        let zero_length = AssignServiceRequest { custom_duration: Some(0), ..request };
        assert!(matches!(zero_length.validate(), Err(DentistError::InvalidAssignment(_))));
    }

    #[test]
    fn all_category_means_unfiltered() {
        let all = ServiceListQuery { category: Some("All".to_string()), include_inactive: false };
        assert_eq!(all.category_filter(), None);

        let whitening = ServiceListQuery { category: Some(" Whitening ".to_string()), include_inactive: false };
        assert_eq!(whitening.category_filter(), Some("Whitening"));
    }
}
