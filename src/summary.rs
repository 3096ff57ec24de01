//! Budget and spend figures derived from store queries. Nothing here is
//! cached; every value is recomputed from the records passed in.

use chrono::NaiveDate;

use crate::models::{Expense, ExpenseCategory, ItineraryItem, Trip, TripStatus, TripType};
use crate::store::TripStore;
use crate::utils::days_until;

pub fn total_spent(expenses: &[&Expense]) -> f64 {
    expenses.iter().map(|e| e.amount).sum()
}

/// Budget left after `spent`. Goes negative when the trip is over budget.
pub fn remaining_budget(trip: &Trip, spent: f64) -> f64 {
    trip.total_budget - spent
}

/// Share of the budget used, in percent. `None` when the trip has no positive budget.
pub fn percent_used(trip: &Trip, spent: f64) -> Option<f64> {
    if trip.total_budget > 0.0 {
        Some(100.0 * spent / trip.total_budget)
    } else {
        None
    }
}

/// Group trips split the spend across travelers; solo trips carry it whole
pub fn per_person_cost(trip: &Trip, spent: f64) -> f64 {
    match trip.trip_type {
        TripType::Group => spent / f64::from(trip.num_travelers.max(1)),
        TripType::Solo => spent,
    }
}

/// Per-category sums, in the order each category first appears
pub fn category_breakdown(expenses: &[&Expense]) -> Vec<(ExpenseCategory, f64)> {
    let mut breakdown: Vec<(ExpenseCategory, f64)> = Vec::new();
    for expense in expenses {
        match breakdown.iter_mut().find(|(c, _)| *c == expense.category) {
            Some((_, sum)) => *sum += expense.amount,
            None => breakdown.push((expense.category, expense.amount)),
        }
    }
    breakdown
}

#[derive(Debug, Clone, PartialEq)]
pub struct BudgetSummary {
    pub total_budget: f64,
    pub total_spent: f64,
    pub remaining: f64,
    pub percent_used: Option<f64>,
    pub per_person: f64,
    pub by_category: Vec<(ExpenseCategory, f64)>,
}

impl BudgetSummary {
    pub fn for_trip(store: &TripStore, trip: &Trip) -> Self {
        let expenses = store.get_trip_expenses(&trip.id);
        let spent = total_spent(&expenses);
        Self {
            total_budget: trip.total_budget,
            total_spent: spent,
            remaining: remaining_budget(trip, spent),
            percent_used: percent_used(trip, spent),
            per_person: per_person_cost(trip, spent),
            by_category: category_breakdown(&expenses),
        }
    }

    pub fn is_over_budget(&self) -> bool {
        self.remaining < 0.0
    }
}

/// Allocated versus spent for one budget category of a trip
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryAllocation {
    pub category: ExpenseCategory,
    pub allocated: f64,
    pub spent: f64,
}

impl CategoryAllocation {
    pub fn remaining(&self) -> f64 {
        self.allocated - self.spent
    }
}

pub fn category_allocation_report(store: &TripStore, trip_id: &str) -> Vec<CategoryAllocation> {
    let spent = category_breakdown(&store.get_trip_expenses(trip_id));
    store
        .get_trip_budget_categories(trip_id)
        .into_iter()
        .map(|b| CategoryAllocation {
            category: b.category,
            allocated: b.allocated_amount,
            spent: spent
                .iter()
                .find(|(c, _)| *c == b.category)
                .map(|(_, s)| *s)
                .unwrap_or(0.0),
        })
        .collect()
}

pub fn trips_with_status(trips: &[Trip], status: TripStatus) -> Vec<&Trip> {
    trips.iter().filter(|t| t.status == status).collect()
}

pub fn upcoming_trips(trips: &[Trip]) -> Vec<&Trip> {
    trips_with_status(trips, TripStatus::Upcoming)
}

pub fn ongoing_trips(trips: &[Trip]) -> Vec<&Trip> {
    trips_with_status(trips, TripStatus::Ongoing)
}

/// Trips that still count against a budget: anything not completed
pub fn active_trips(trips: &[Trip]) -> Vec<&Trip> {
    trips
        .iter()
        .filter(|t| t.status != TripStatus::Completed)
        .collect()
}

/// Days until the trip starts, relative to `today`
pub fn trip_days_until(trip: &Trip, today: NaiveDate) -> Option<i64> {
    days_until(&trip.start_date, today)
}

/// Consecutive runs of an already-sorted itinerary, keyed by day number
pub fn group_itinerary_by_day<'a>(items: &[&'a ItineraryItem]) -> Vec<(u32, Vec<&'a ItineraryItem>)> {
    let mut groups: Vec<(u32, Vec<&'a ItineraryItem>)> = Vec::new();
    for &item in items {
        if let Some((day, group)) = groups.last_mut() {
            if *day == item.day_number {
                group.push(item);
                continue;
            }
        }
        groups.push((item.day_number, vec![item]));
    }
    groups
}

/// Totals shown on the traveler profile
#[derive(Debug, Clone, PartialEq)]
pub struct TravelerStats {
    pub total_trips: usize,
    pub completed_trips: usize,
    pub total_spent: f64,
    pub average_spent: f64,
}

impl TravelerStats {
    pub fn compute(store: &TripStore) -> Self {
        let total_trips = store.trips().len();
        let completed_trips = trips_with_status(store.trips(), TripStatus::Completed).len();
        let total_spent: f64 = store.expenses().iter().map(|e| e.amount).sum();
        let average_spent = if total_trips > 0 {
            total_spent / total_trips as f64
        } else {
            0.0
        };
        Self {
            total_trips,
            completed_trips,
            total_spent,
            average_spent,
        }
    }
}
