use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::utils::{is_valid_time, parse_date};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TripType {
    Solo,
    Group,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TripStatus {
    Upcoming,
    Ongoing,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpenseCategory {
    Transport,
    Accommodation,
    Food,
    Activities,
    Miscellaneous,
}

impl ExpenseCategory {
    pub const ALL: [ExpenseCategory; 5] = [
        ExpenseCategory::Transport,
        ExpenseCategory::Accommodation,
        ExpenseCategory::Food,
        ExpenseCategory::Activities,
        ExpenseCategory::Miscellaneous,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseCategory::Transport => "Transport",
            ExpenseCategory::Accommodation => "Accommodation",
            ExpenseCategory::Food => "Food",
            ExpenseCategory::Activities => "Activities",
            ExpenseCategory::Miscellaneous => "Miscellaneous",
        }
    }
}

impl TripType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TripType::Solo => "Solo",
            TripType::Group => "Group",
        }
    }
}

impl TripStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TripStatus::Upcoming => "Upcoming",
            TripStatus::Ongoing => "Ongoing",
            TripStatus::Completed => "Completed",
        }
    }
}

impl fmt::Display for ExpenseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for TripType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for TripStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Case-insensitive parsing so CLI arguments like `group` or `food` are accepted
impl FromStr for ExpenseCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExpenseCategory::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown expense category: {}", s))
    }
}

impl FromStr for TripType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "solo" => Ok(TripType::Solo),
            "group" => Ok(TripType::Group),
            _ => Err(format!("Unknown trip type: {}", s)),
        }
    }
}

impl FromStr for TripStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "upcoming" => Ok(TripStatus::Upcoming),
            "ongoing" => Ok(TripStatus::Ongoing),
            "completed" => Ok(TripStatus::Completed),
            _ => Err(format!("Unknown trip status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: String,
    pub destination: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    pub start_date: String, // YYYY-MM-DD
    pub end_date: String,   // YYYY-MM-DD
    pub total_budget: f64,
    pub trip_type: TripType,
    pub num_travelers: u32,
    pub status: TripStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: String, // RFC 3339, millisecond precision
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryItem {
    pub id: String,
    pub trip_id: String,
    pub day_number: u32,
    pub activity_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>, // HH:MM
    pub duration_minutes: u32,
    pub estimated_cost: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: String,
    pub trip_id: String,
    pub category: ExpenseCategory,
    pub amount: f64,
    pub date: String, // YYYY-MM-DD
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetCategory {
    pub id: String,
    pub trip_id: String,
    pub category: ExpenseCategory,
    pub allocated_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripMember {
    pub id: String,
    pub trip_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Fields supplied when creating a trip; `id` and `created_at` are assigned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTrip {
    pub destination: String,
    pub origin: Option<String>,
    pub start_date: String,
    pub end_date: String,
    pub total_budget: f64,
    pub trip_type: TripType,
    pub num_travelers: u32,
    pub status: TripStatus,
    pub description: Option<String>,
}

impl NewTrip {
    pub fn new(destination: String, start_date: String, end_date: String, total_budget: f64) -> Self {
        Self {
            destination,
            origin: None,
            start_date,
            end_date,
            total_budget,
            trip_type: TripType::Solo,
            num_travelers: 1,
            status: TripStatus::Upcoming,
            description: None,
        }
    }

    pub fn into_trip(self, id: String, created_at: String) -> Trip {
        Trip {
            id,
            destination: self.destination,
            origin: self.origin,
            start_date: self.start_date,
            end_date: self.end_date,
            total_budget: self.total_budget,
            trip_type: self.trip_type,
            num_travelers: self.num_travelers,
            status: self.status,
            description: self.description,
            created_at,
        }
    }

    /// Check the fields the create-trip form requires
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.destination.trim().is_empty() {
            return Err(ValidationError::MissingField("destination"));
        }
        check_date(&self.start_date)?;
        check_date(&self.end_date)?;
        if !(self.total_budget.is_finite() && self.total_budget > 0.0) {
            return Err(ValidationError::InvalidAmount(self.total_budget));
        }
        if self.num_travelers < 1 {
            return Err(ValidationError::InvalidTravelers(self.num_travelers));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewItineraryItem {
    pub trip_id: String,
    pub day_number: u32,
    pub activity_name: String,
    pub start_time: Option<String>,
    pub duration_minutes: u32,
    pub estimated_cost: f64,
    pub location: Option<String>,
    pub notes: Option<String>,
}

impl NewItineraryItem {
    pub fn new(trip_id: String, day_number: u32, activity_name: String) -> Self {
        Self {
            trip_id,
            day_number,
            activity_name,
            start_time: None,
            duration_minutes: 60,
            estimated_cost: 0.0,
            location: None,
            notes: None,
        }
    }

    pub fn into_item(self, id: String) -> ItineraryItem {
        ItineraryItem {
            id,
            trip_id: self.trip_id,
            day_number: self.day_number,
            activity_name: self.activity_name,
            start_time: self.start_time,
            duration_minutes: self.duration_minutes,
            estimated_cost: self.estimated_cost,
            location: self.location,
            notes: self.notes,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.activity_name.trim().is_empty() {
            return Err(ValidationError::MissingField("activity name"));
        }
        if self.day_number < 1 {
            return Err(ValidationError::InvalidDay(self.day_number));
        }
        if let Some(ref time) = self.start_time {
            if !is_valid_time(time) {
                return Err(ValidationError::InvalidTime(time.clone()));
            }
        }
        if !(self.estimated_cost.is_finite() && self.estimated_cost >= 0.0) {
            return Err(ValidationError::InvalidAmount(self.estimated_cost));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    pub trip_id: String,
    pub category: ExpenseCategory,
    pub amount: f64,
    pub date: String,
    pub description: String,
    pub paid_by: Option<String>,
}

impl NewExpense {
    pub fn into_expense(self, id: String) -> Expense {
        Expense {
            id,
            trip_id: self.trip_id,
            category: self.category,
            amount: self.amount,
            date: self.date,
            description: self.description,
            paid_by: self.paid_by,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.description.trim().is_empty() {
            return Err(ValidationError::MissingField("description"));
        }
        if !(self.amount.is_finite() && self.amount >= 0.0) {
            return Err(ValidationError::InvalidAmount(self.amount));
        }
        check_date(&self.date)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewBudgetCategory {
    pub category: ExpenseCategory,
    pub allocated_amount: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTripMember {
    pub trip_id: String,
    pub name: String,
    pub email: Option<String>,
}

impl NewTripMember {
    pub fn into_member(self, id: String) -> TripMember {
        TripMember {
            id,
            trip_id: self.trip_id,
            name: self.name,
            email: self.email,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingField("name"));
        }
        Ok(())
    }
}

/// Partial update for a trip. `None` leaves a field untouched; for optional
/// fields `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TripPatch {
    pub destination: Option<String>,
    pub origin: Option<Option<String>>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub total_budget: Option<f64>,
    pub trip_type: Option<TripType>,
    pub num_travelers: Option<u32>,
    pub status: Option<TripStatus>,
    pub description: Option<Option<String>>,
}

impl TripPatch {
    pub fn apply(self, trip: &mut Trip) {
        if let Some(v) = self.destination {
            trip.destination = v;
        }
        if let Some(v) = self.origin {
            trip.origin = v;
        }
        if let Some(v) = self.start_date {
            trip.start_date = v;
        }
        if let Some(v) = self.end_date {
            trip.end_date = v;
        }
        if let Some(v) = self.total_budget {
            trip.total_budget = v;
        }
        if let Some(v) = self.trip_type {
            trip.trip_type = v;
        }
        if let Some(v) = self.num_travelers {
            trip.num_travelers = v;
        }
        if let Some(v) = self.status {
            trip.status = v;
        }
        if let Some(v) = self.description {
            trip.description = v;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItineraryPatch {
    pub day_number: Option<u32>,
    pub activity_name: Option<String>,
    pub start_time: Option<Option<String>>,
    pub duration_minutes: Option<u32>,
    pub estimated_cost: Option<f64>,
    pub location: Option<Option<String>>,
    pub notes: Option<Option<String>>,
}

impl ItineraryPatch {
    pub fn apply(self, item: &mut ItineraryItem) {
        if let Some(v) = self.day_number {
            item.day_number = v;
        }
        if let Some(v) = self.activity_name {
            item.activity_name = v;
        }
        if let Some(v) = self.start_time {
            item.start_time = v;
        }
        if let Some(v) = self.duration_minutes {
            item.duration_minutes = v;
        }
        if let Some(v) = self.estimated_cost {
            item.estimated_cost = v;
        }
        if let Some(v) = self.location {
            item.location = v;
        }
        if let Some(v) = self.notes {
            item.notes = v;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpensePatch {
    pub category: Option<ExpenseCategory>,
    pub amount: Option<f64>,
    pub date: Option<String>,
    pub description: Option<String>,
    pub paid_by: Option<Option<String>>,
}

impl ExpensePatch {
    pub fn apply(self, expense: &mut Expense) {
        if let Some(v) = self.category {
            expense.category = v;
        }
        if let Some(v) = self.amount {
            expense.amount = v;
        }
        if let Some(v) = self.date {
            expense.date = v;
        }
        if let Some(v) = self.description {
            expense.description = v;
        }
        if let Some(v) = self.paid_by {
            expense.paid_by = v;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemberPatch {
    pub name: Option<String>,
    pub email: Option<Option<String>>,
}

impl MemberPatch {
    pub fn apply(self, member: &mut TripMember) {
        if let Some(v) = self.name {
            member.name = v;
        }
        if let Some(v) = self.email {
            member.email = v;
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error("Invalid date '{0}' (expected YYYY-MM-DD)")]
    InvalidDate(String),
    #[error("Invalid time '{0}' (expected HH:MM)")]
    InvalidTime(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(f64),
    #[error("Day number must be at least 1, got {0}")]
    InvalidDay(u32),
    #[error("Number of travelers must be at least 1, got {0}")]
    InvalidTravelers(u32),
}

fn check_date(date: &str) -> Result<(), ValidationError> {
    parse_date(date)
        .map(|_| ())
        .map_err(|_| ValidationError::InvalidDate(date.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_trip() -> Trip {
        NewTrip::new(
            "Goa".to_string(),
            "2025-12-01".to_string(),
            "2025-12-05".to_string(),
            10000.0,
        )
        .into_trip("1".to_string(), "2025-01-01T00:00:00.000Z".to_string())
    }

    #[test]
    fn trip_serializes_with_camel_case_keys() {
        let json = serde_json::to_value(sample_trip()).unwrap();
        assert_eq!(json["startDate"], "2025-12-01");
        assert_eq!(json["totalBudget"], 10000.0);
        assert_eq!(json["tripType"], "Solo");
        assert_eq!(json["numTravelers"], 1);
        assert_eq!(json["createdAt"], "2025-01-01T00:00:00.000Z");
        assert!(json.get("origin").is_none());
        assert!(json.get("description").is_none());
    }

    #[test]
    fn itinerary_item_accepts_missing_optionals() {
        let raw = r#"{"id":"5","tripId":"1","dayNumber":2,"activityName":"Beach",
                      "durationMinutes":90,"estimatedCost":0}"#;
        let item: ItineraryItem = serde_json::from_str(raw).unwrap();
        assert_eq!(item.day_number, 2);
        assert_eq!(item.start_time, None);
        assert_eq!(item.location, None);
    }

    #[test]
    fn enums_parse_case_insensitively() {
        assert_eq!("group".parse::<TripType>(), Ok(TripType::Group));
        assert_eq!("FOOD".parse::<ExpenseCategory>(), Ok(ExpenseCategory::Food));
        assert_eq!(" ongoing ".parse::<TripStatus>(), Ok(TripStatus::Ongoing));
        assert!("cruise".parse::<TripType>().is_err());
    }

    #[test]
    fn trip_patch_leaves_unset_fields_alone() {
        let mut trip = sample_trip();
        trip.description = Some("beach week".to_string());
        TripPatch {
            status: Some(TripStatus::Ongoing),
            ..Default::default()
        }
        .apply(&mut trip);
        assert_eq!(trip.status, TripStatus::Ongoing);
        assert_eq!(trip.description.as_deref(), Some("beach week"));
        assert_eq!(trip.created_at, "2025-01-01T00:00:00.000Z");

        TripPatch {
            description: Some(None),
            ..Default::default()
        }
        .apply(&mut trip);
        assert_eq!(trip.description, None);
    }

    #[test]
    fn new_trip_validation() {
        let mut trip = NewTrip::new(
            "Manali".to_string(),
            "2025-06-01".to_string(),
            "2025-06-07".to_string(),
            5000.0,
        );
        assert_eq!(trip.validate(), Ok(()));

        trip.start_date = "06/01/2025".to_string();
        assert_eq!(
            trip.validate(),
            Err(ValidationError::InvalidDate("06/01/2025".to_string()))
        );

        trip.start_date = "2025-06-01".to_string();
        trip.total_budget = 0.0;
        assert_eq!(trip.validate(), Err(ValidationError::InvalidAmount(0.0)));

        trip.total_budget = 5000.0;
        trip.num_travelers = 0;
        assert_eq!(trip.validate(), Err(ValidationError::InvalidTravelers(0)));
    }

    #[test]
    fn itinerary_validation_checks_start_time() {
        let mut item = NewItineraryItem::new("1".to_string(), 1, "Fort walk".to_string());
        item.start_time = Some("9am".to_string());
        assert_eq!(
            item.validate(),
            Err(ValidationError::InvalidTime("9am".to_string()))
        );
        item.start_time = Some("09:00".to_string());
        assert_eq!(item.validate(), Ok(()));
    }
}
