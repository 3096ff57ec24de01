//! Quick student-budget quote from trip length and party size.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::{NewTrip, Trip, TripStatus, TripType, ValidationError};
use crate::store::TripStore;

pub const PER_DAY_ACCOMMODATION: f64 = 600.0;
pub const PER_DAY_FOOD: f64 = 400.0;
pub const PER_DAY_LOCAL_TRANSPORT: f64 = 200.0;
pub const PER_DAY_ACTIVITIES: f64 = 300.0;

/// Party size from which accommodation is discounted
pub const GROUP_DISCOUNT_MIN_PEOPLE: u32 = 4;
/// Fraction taken off accommodation for groups
pub const GROUP_ACCOMMODATION_DISCOUNT: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BudgetInput {
    pub days: u32,
    pub people: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetBreakdown {
    pub accommodation: f64,
    pub food: f64,
    pub local_transport: f64,
    pub activities: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetEstimate {
    pub per_person: f64,
    pub total: f64,
    pub breakdown: BudgetBreakdown,
}

pub fn base_per_day() -> f64 {
    PER_DAY_ACCOMMODATION + PER_DAY_FOOD + PER_DAY_LOCAL_TRANSPORT + PER_DAY_ACTIVITIES
}

pub fn estimate_student_budget(input: BudgetInput) -> BudgetEstimate {
    let days = f64::from(input.days);
    let group_discount = input.people >= GROUP_DISCOUNT_MIN_PEOPLE;

    let mut per_person = base_per_day() * days;
    if group_discount {
        let accommodation_share = PER_DAY_ACCOMMODATION * days;
        per_person -= accommodation_share * GROUP_ACCOMMODATION_DISCOUNT;
    }

    let accommodation_factor = if group_discount {
        1.0 - GROUP_ACCOMMODATION_DISCOUNT
    } else {
        1.0
    };

    BudgetEstimate {
        per_person,
        total: per_person * f64::from(input.people),
        breakdown: BudgetBreakdown {
            accommodation: PER_DAY_ACCOMMODATION * days * accommodation_factor,
            food: PER_DAY_FOOD * days,
            local_transport: PER_DAY_LOCAL_TRANSPORT * days,
            activities: PER_DAY_ACTIVITIES * days,
        },
    }
}

/// A destination picked from search, to be turned into an upcoming trip
/// priced with the student estimate
#[derive(Debug, Clone, PartialEq)]
pub struct TripPlan {
    pub name: String,
    pub country: Option<String>,
    pub days: u32,
    pub people: u32,
}

impl TripPlan {
    pub fn new(name: impl Into<String>, country: Option<String>, days: u32, people: u32) -> Self {
        Self {
            name: name.into(),
            country,
            days: days.max(1),
            people: people.max(1),
        }
    }

    /// `"{name}, {country}"`, or just the name when the country is unknown
    pub fn destination_label(&self) -> String {
        match self.country.as_deref().map(str::trim) {
            Some(country) if !country.is_empty() => format!("{}, {}", self.name, country),
            _ => self.name.clone(),
        }
    }

    /// Trip starting `today` and lasting `days` days, budgeted at the rounded estimate total
    pub fn to_new_trip(&self, today: NaiveDate) -> NewTrip {
        let days = self.days.max(1);
        let people = self.people.max(1);
        let estimate = estimate_student_budget(BudgetInput { days, people });
        let end = today
            .checked_add_days(Days::new(u64::from(days - 1)))
            .unwrap_or(NaiveDate::MAX);

        let mut trip = NewTrip::new(
            self.destination_label(),
            today.format("%Y-%m-%d").to_string(),
            end.format("%Y-%m-%d").to_string(),
            estimate.total.round(),
        );
        trip.trip_type = if people > 1 { TripType::Group } else { TripType::Solo };
        trip.num_travelers = people;
        trip.status = TripStatus::Upcoming;
        trip.description = Some(format!("Auto-created from destination search ({}).", self.name));
        trip
    }
}

/// Create an upcoming trip in `store` from a searched destination
pub fn plan_trip(store: &mut TripStore, plan: &TripPlan, today: NaiveDate) -> Result<Trip, ValidationError> {
    let trip = plan.to_new_trip(today);
    trip.validate()?;
    Ok(store.add_trip(trip))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use crate::store::STORAGE_KEY;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn base_rate_is_fifteen_hundred() {
        assert_eq!(base_per_day(), 1500.0);
    }

    #[test]
    fn small_party_pays_full_rate() {
        let est = estimate_student_budget(BudgetInput { days: 3, people: 2 });
        assert_eq!(est.per_person, 4500.0);
        assert_eq!(est.total, 9000.0);
        assert_eq!(est.breakdown.accommodation, 1800.0);
        assert_eq!(est.breakdown.food, 1200.0);
        assert_eq!(est.breakdown.local_transport, 600.0);
        assert_eq!(est.breakdown.activities, 900.0);
    }

    #[test]
    fn party_of_four_gets_accommodation_discount() {
        let est = estimate_student_budget(BudgetInput { days: 3, people: 4 });
        assert!(close(est.breakdown.accommodation, 1620.0));
        assert!(close(est.per_person, 4320.0));
        assert!(close(est.total, 17280.0));
    }

    #[test]
    fn breakdown_sums_to_per_person() {
        for people in [1, 3, 4, 7] {
            let est = estimate_student_budget(BudgetInput { days: 5, people });
            let b = est.breakdown;
            let sum = b.accommodation + b.food + b.local_transport + b.activities;
            assert!(close(sum, est.per_person), "people={people}");
        }
    }

    #[test]
    fn zero_days_costs_nothing() {
        let est = estimate_student_budget(BudgetInput { days: 0, people: 5 });
        assert_eq!(est.total, 0.0);
    }

    #[test]
    fn estimate_serializes_camel_case() {
        let est = estimate_student_budget(BudgetInput { days: 1, people: 1 });
        let json = serde_json::to_value(est).unwrap();
        assert_eq!(json["perPerson"], 1500.0);
        assert_eq!(json["breakdown"]["localTransport"], 200.0);
    }

    #[test]
    fn planned_trip_uses_estimate_and_dates() {
        let mut store = TripStore::open(Box::new(MemoryStorage::new()), STORAGE_KEY);
        let plan = TripPlan::new("Panaji", Some("India".to_string()), 3, 4);
        let trip = plan_trip(&mut store, &plan, date("2025-12-30")).unwrap();

        assert_eq!(trip.destination, "Panaji, India");
        assert_eq!(trip.start_date, "2025-12-30");
        assert_eq!(trip.end_date, "2026-01-01");
        assert_eq!(trip.total_budget, 17280.0);
        assert_eq!(trip.trip_type, TripType::Group);
        assert_eq!(trip.num_travelers, 4);
        assert_eq!(trip.status, TripStatus::Upcoming);
        assert_eq!(
            trip.description.as_deref(),
            Some("Auto-created from destination search (Panaji).")
        );
        assert_eq!(store.trips(), &[trip]);
    }

    #[test]
    fn single_day_solo_plan_clamps_inputs() {
        let plan = TripPlan::new("Hampi", None, 0, 0);
        assert_eq!((plan.days, plan.people), (1, 1));

        let trip = plan.to_new_trip(date("2025-06-10"));
        assert_eq!(trip.destination, "Hampi");
        assert_eq!(trip.start_date, trip.end_date);
        assert_eq!(trip.total_budget, 1500.0);
        assert_eq!(trip.trip_type, TripType::Solo);
        assert_eq!(trip.num_travelers, 1);
    }

    #[test]
    fn plan_budget_is_rounded() {
        let plan = TripPlan::new("Leh", Some(" ".to_string()), 5, 7);
        let trip = plan.to_new_trip(date("2025-06-10"));
        let estimate = estimate_student_budget(BudgetInput { days: 5, people: 7 });
        assert_eq!(trip.total_budget, estimate.total.round());
        assert_eq!(trip.total_budget.fract(), 0.0);
        assert_eq!(trip.destination, "Leh");
        assert_eq!(trip.end_date, "2025-06-14");
    }

    #[test]
    fn blank_destination_is_not_planned() {
        let mut store = TripStore::open(Box::new(MemoryStorage::new()), STORAGE_KEY);
        let plan = TripPlan::new("  ", None, 2, 2);
        assert!(matches!(
            plan_trip(&mut store, &plan, date("2025-06-10")),
            Err(ValidationError::MissingField("destination"))
        ));
        assert!(store.trips().is_empty());
    }
}
