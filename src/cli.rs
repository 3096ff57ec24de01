use chrono::Utc;
use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::config::LookupConfig;
use crate::destination::{DestinationLookup, LookupError};
use crate::estimator::{BudgetInput, TripPlan, estimate_student_budget, plan_trip};
use crate::models::{
    ExpenseCategory, NewBudgetCategory, NewExpense, NewItineraryItem, NewTrip, NewTripMember,
    Trip, TripPatch, TripStatus, TripType, ValidationError,
};
use crate::storage::StorageError;
use crate::store::TripStore;
use crate::summary::{
    BudgetSummary, TravelerStats, active_trips, category_allocation_report,
    group_itinerary_by_day, trip_days_until, trips_with_status,
};
use crate::utils::{format_money, get_current_date_string};

#[derive(Parser)]
#[command(name = "tripsquad")]
#[command(about = "Plan budget trips: itineraries, expenses and spend tracking")]
#[command(version)]
pub struct Cli {
    /// Custom config file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Use development mode (uses separate dev config/data)
    #[arg(long)]
    pub dev: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new trip
    AddTrip {
        /// Where you are going
        destination: String,
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: String,
        /// End date (YYYY-MM-DD)
        #[arg(long)]
        end: String,
        /// Total budget for the trip
        #[arg(long)]
        budget: f64,
        /// solo or group
        #[arg(long = "type", default_value = "solo")]
        trip_type: TripType,
        /// Number of travelers
        #[arg(long, default_value_t = 1)]
        travelers: u32,
        /// Where the trip starts from
        #[arg(long)]
        origin: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// List trips (default if no subcommand)
    ListTrips {
        /// Only trips with this status (upcoming, ongoing, completed)
        #[arg(long)]
        status: Option<TripStatus>,
    },
    /// Show a trip with its itinerary, expenses, members and budget
    ShowTrip { id: String },
    /// Change a trip's status
    SetStatus { id: String, status: TripStatus },
    /// Delete a trip and everything attached to it
    DeleteTrip { id: String },
    /// Delete every trip, itinerary item, expense, budget and member
    ClearAll {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
    /// Add an activity to a trip's itinerary
    AddActivity {
        trip_id: String,
        /// Activity name
        name: String,
        /// Day of the trip, starting at 1
        #[arg(long, default_value_t = 1)]
        day: u32,
        /// Start time (HH:MM)
        #[arg(long)]
        start: Option<String>,
        /// Duration in minutes
        #[arg(long, default_value_t = 60)]
        duration: u32,
        /// Estimated cost
        #[arg(long, default_value_t = 0.0)]
        cost: f64,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Remove an itinerary item
    DeleteActivity { id: String },
    /// Log an expense against a trip
    AddExpense {
        trip_id: String,
        amount: f64,
        description: String,
        /// transport, accommodation, food, activities or miscellaneous
        #[arg(long, default_value = "food")]
        category: ExpenseCategory,
        /// Date of the expense (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        paid_by: Option<String>,
    },
    /// Remove an expense
    DeleteExpense { id: String },
    /// Add a traveler to a trip
    AddMember {
        trip_id: String,
        name: String,
        #[arg(long)]
        email: Option<String>,
    },
    /// Remove a traveler from a trip
    RemoveMember { id: String },
    /// Replace a trip's budget allocations, e.g. `Food=3000 Transport=1500`
    SetBudget {
        trip_id: String,
        allocations: Vec<String>,
    },
    /// Budget overview of all trips that are not completed
    Budget,
    /// Totals across all trips
    Stats,
    /// Estimate a student budget
    Estimate {
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        days: u32,
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        people: u32,
    },
    /// Create an upcoming trip to a destination, budgeted with the student estimate
    Plan {
        /// Destination name, e.g. from `search`
        name: String,
        #[arg(long)]
        country: Option<String>,
        #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u32).range(1..))]
        days: u32,
        #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u32).range(1..))]
        people: u32,
    },
    /// Search destinations by name
    Search {
        query: String,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Summary of a place from Wikipedia
    Place { name: String },
    /// Points of interest near a coordinate
    Sights {
        #[arg(allow_negative_numbers = true)]
        lat: f64,
        #[arg(allow_negative_numbers = true)]
        lon: f64,
        /// Search radius in meters
        #[arg(long)]
        radius: Option<u32>,
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),
    #[error("Lookup error: {0}")]
    LookupError(#[from] LookupError),
    #[error("{0}")]
    ValidationError(#[from] ValidationError),
    #[error("Trip not found: {0}")]
    TripNotFound(String),
    #[error("{0} not found: {1}")]
    NotFound(&'static str, String),
    #[error("Invalid allocation '{0}' (expected Category=amount)")]
    InvalidAllocation(String),
    #[error("Refusing to clear all data without --yes")]
    ConfirmationRequired,
}

fn require_trip<'a>(store: &'a TripStore, trip_id: &str) -> Result<&'a Trip, CliError> {
    store
        .get_trip(trip_id)
        .ok_or_else(|| CliError::TripNotFound(trip_id.to_string()))
}

fn format_percent(percent: Option<f64>) -> String {
    match percent {
        Some(p) => format!("{:.0}%", p),
        None => "n/a".to_string(),
    }
}

/// Parse a `Category=amount` budget allocation
pub fn parse_allocation(raw: &str) -> Result<NewBudgetCategory, CliError> {
    let invalid = || CliError::InvalidAllocation(raw.to_string());
    let (category, amount) = raw.split_once('=').ok_or_else(invalid)?;
    let category = category.parse::<ExpenseCategory>().map_err(|_| invalid())?;
    let allocated_amount = amount.trim().parse::<f64>().map_err(|_| invalid())?;
    if !(allocated_amount.is_finite() && allocated_amount >= 0.0) {
        return Err(invalid());
    }
    Ok(NewBudgetCategory {
        category,
        allocated_amount,
    })
}

/// Handle the add-trip command
#[allow(clippy::too_many_arguments)]
pub fn handle_add_trip(
    destination: String,
    start: String,
    end: String,
    budget: f64,
    trip_type: TripType,
    travelers: u32,
    origin: Option<String>,
    description: Option<String>,
    store: &mut TripStore,
) -> Result<Trip, CliError> {
    let mut new_trip = NewTrip::new(destination, start, end, budget);
    new_trip.trip_type = trip_type;
    new_trip.num_travelers = travelers;
    new_trip.origin = origin;
    new_trip.description = description;
    new_trip.validate()?;

    let trip = store.add_trip(new_trip);
    println!("Trip created successfully (ID: {})", trip.id);
    Ok(trip)
}

/// Handle the list-trips command
pub fn handle_list_trips(status: Option<TripStatus>, store: &TripStore) -> Result<(), CliError> {
    let trips: Vec<&Trip> = match status {
        Some(status) => trips_with_status(store.trips(), status),
        None => store.trips().iter().collect(),
    };
    if trips.is_empty() {
        println!("No trips yet. Create one with `tripsquad add-trip`.");
        return Ok(());
    }

    let today = Utc::now().date_naive();
    for trip in trips {
        let countdown = match (trip.status, trip_days_until(trip, today)) {
            (TripStatus::Upcoming, Some(days)) if days > 0 => format!(" (in {} days)", days),
            _ => String::new(),
        };
        println!(
            "[{}] {} - {} trip, {} to {}, {}{}",
            trip.id,
            trip.destination,
            trip.trip_type,
            trip.start_date,
            trip.end_date,
            trip.status,
            countdown
        );
    }
    Ok(())
}

/// Handle the show-trip command
pub fn handle_show_trip(id: &str, store: &TripStore, currency: &str) -> Result<(), CliError> {
    let trip = require_trip(store, id)?;

    println!("{} ({} trip, {})", trip.destination, trip.trip_type, trip.status);
    println!("  id:         {}", trip.id);
    println!("  dates:      {} to {}", trip.start_date, trip.end_date);
    println!("  travelers:  {}", trip.num_travelers);
    if let Some(ref origin) = trip.origin {
        println!("  from:       {}", origin);
    }
    if let Some(ref description) = trip.description {
        println!("  notes:      {}", description);
    }

    let summary = BudgetSummary::for_trip(store, trip);
    println!("\nBudget");
    println!("  total:      {}", format_money(currency, summary.total_budget));
    println!("  spent:      {}", format_money(currency, summary.total_spent));
    println!("  remaining:  {}", format_money(currency, summary.remaining));
    println!("  used:       {}", format_percent(summary.percent_used));
    if trip.trip_type == TripType::Group {
        println!("  per person: {}", format_money(currency, summary.per_person));
    }
    for (category, amount) in &summary.by_category {
        println!("    {:<14} {}", category, format_money(currency, *amount));
    }
    for allocation in category_allocation_report(store, &trip.id) {
        println!(
            "    {:<14} {} of {} allocated",
            allocation.category,
            format_money(currency, allocation.spent),
            format_money(currency, allocation.allocated)
        );
    }

    println!("\nItinerary");
    let items = store.get_trip_itineraries(&trip.id);
    if items.is_empty() {
        println!("  (no activities)");
    }
    for (day, activities) in group_itinerary_by_day(&items) {
        println!("  Day {}", day);
        for item in activities {
            let time = item.start_time.as_deref().unwrap_or("--:--");
            let location = item
                .location
                .as_deref()
                .map(|l| format!(" @ {}", l))
                .unwrap_or_default();
            println!(
                "    {} [{}] {} ({} min, {}){}",
                time,
                item.id,
                item.activity_name,
                item.duration_minutes,
                format_money(currency, item.estimated_cost),
                location
            );
        }
    }

    println!("\nExpenses");
    let expenses = store.get_trip_expenses(&trip.id);
    if expenses.is_empty() {
        println!("  (no expenses)");
    }
    for expense in expenses {
        let paid_by = expense
            .paid_by
            .as_deref()
            .map(|p| format!(" (paid by {})", p))
            .unwrap_or_default();
        println!(
            "  [{}] {} {:<14} {} {}{}",
            expense.id,
            expense.date,
            expense.category,
            format_money(currency, expense.amount),
            expense.description,
            paid_by
        );
    }

    let members = store.get_trip_members(&trip.id);
    if !members.is_empty() {
        println!("\nMembers");
        for member in members {
            match member.email {
                Some(ref email) => println!("  [{}] {} <{}>", member.id, member.name, email),
                None => println!("  [{}] {}", member.id, member.name),
            }
        }
    }
    Ok(())
}

/// Handle the set-status command
pub fn handle_set_status(id: &str, status: TripStatus, store: &mut TripStore) -> Result<(), CliError> {
    require_trip(store, id)?;
    store.update_trip(
        id,
        TripPatch {
            status: Some(status),
            ..Default::default()
        },
    );
    println!("Trip {} is now {}", id, status);
    Ok(())
}

/// Handle the delete-trip command
pub fn handle_delete_trip(id: &str, store: &mut TripStore) -> Result<(), CliError> {
    if !store.delete_trip(id) {
        return Err(CliError::TripNotFound(id.to_string()));
    }
    println!("Trip {} deleted", id);
    Ok(())
}

/// Handle the clear-all command
pub fn handle_clear_all(yes: bool, store: &mut TripStore) -> Result<(), CliError> {
    if !yes {
        return Err(CliError::ConfirmationRequired);
    }
    store.clear_all();
    println!("All data has been cleared");
    Ok(())
}

/// Handle the add-activity command
#[allow(clippy::too_many_arguments)]
pub fn handle_add_activity(
    trip_id: String,
    name: String,
    day: u32,
    start: Option<String>,
    duration: u32,
    cost: f64,
    location: Option<String>,
    notes: Option<String>,
    store: &mut TripStore,
) -> Result<(), CliError> {
    require_trip(store, &trip_id)?;

    let mut item = NewItineraryItem::new(trip_id, day, name);
    item.start_time = start;
    item.duration_minutes = duration;
    item.estimated_cost = cost;
    item.location = location;
    item.notes = notes;
    item.validate()?;

    let item = store.add_itinerary(item);
    println!("Activity added to day {} (ID: {})", item.day_number, item.id);
    Ok(())
}

/// Handle the delete-activity command
pub fn handle_delete_activity(id: &str, store: &mut TripStore) -> Result<(), CliError> {
    if !store.delete_itinerary(id) {
        return Err(CliError::NotFound("Activity", id.to_string()));
    }
    println!("Activity {} deleted", id);
    Ok(())
}

/// Handle the add-expense command
pub fn handle_add_expense(
    trip_id: String,
    amount: f64,
    description: String,
    category: ExpenseCategory,
    date: Option<String>,
    paid_by: Option<String>,
    store: &mut TripStore,
) -> Result<(), CliError> {
    require_trip(store, &trip_id)?;

    let expense = NewExpense {
        trip_id,
        category,
        amount,
        date: date.unwrap_or_else(get_current_date_string),
        description,
        paid_by,
    };
    expense.validate()?;

    let expense = store.add_expense(expense);
    println!("Expense logged (ID: {})", expense.id);
    Ok(())
}

/// Handle the delete-expense command
pub fn handle_delete_expense(id: &str, store: &mut TripStore) -> Result<(), CliError> {
    if !store.delete_expense(id) {
        return Err(CliError::NotFound("Expense", id.to_string()));
    }
    println!("Expense {} deleted", id);
    Ok(())
}

/// Handle the add-member command
pub fn handle_add_member(
    trip_id: String,
    name: String,
    email: Option<String>,
    store: &mut TripStore,
) -> Result<(), CliError> {
    require_trip(store, &trip_id)?;

    let member = NewTripMember {
        trip_id,
        name,
        email,
    };
    member.validate()?;

    let member = store.add_trip_member(member);
    println!("{} joined the trip (ID: {})", member.name, member.id);
    Ok(())
}

/// Handle the remove-member command
pub fn handle_remove_member(id: &str, store: &mut TripStore) -> Result<(), CliError> {
    if !store.remove_trip_member(id) {
        return Err(CliError::NotFound("Member", id.to_string()));
    }
    println!("Member {} removed", id);
    Ok(())
}

/// Handle the set-budget command
pub fn handle_set_budget(
    trip_id: &str,
    allocations: &[String],
    store: &mut TripStore,
) -> Result<(), CliError> {
    require_trip(store, trip_id)?;
    let categories = allocations
        .iter()
        .map(|raw| parse_allocation(raw))
        .collect::<Result<Vec<_>, _>>()?;

    store.set_budget_categories(trip_id, categories);
    println!(
        "Budget set with {} categories",
        store.get_trip_budget_categories(trip_id).len()
    );
    Ok(())
}

/// Handle the budget command
pub fn handle_budget(store: &TripStore, currency: &str) -> Result<(), CliError> {
    let trips = active_trips(store.trips());
    if trips.is_empty() {
        println!("No active trips");
        return Ok(());
    }

    for trip in trips {
        let summary = BudgetSummary::for_trip(store, trip);
        let left = if summary.is_over_budget() { "over" } else { "left" };
        println!(
            "{}: budget {}, spent {}, {} {}, {} used",
            trip.destination,
            format_money(currency, summary.total_budget),
            format_money(currency, summary.total_spent),
            format_money(currency, summary.remaining.abs()),
            left,
            format_percent(summary.percent_used)
        );
        if trip.trip_type == TripType::Group {
            println!("  per person: {}", format_money(currency, summary.per_person));
        }
        for (category, amount) in &summary.by_category {
            println!("  {:<14} {}", category, format_money(currency, *amount));
        }
    }
    Ok(())
}

/// Handle the stats command
pub fn handle_stats(store: &TripStore, currency: &str) -> Result<(), CliError> {
    let stats = TravelerStats::compute(store);
    println!("Trips:          {}", stats.total_trips);
    println!("Completed:      {}", stats.completed_trips);
    println!("Total spent:    {}", format_money(currency, stats.total_spent));
    println!("Avg per trip:   {}", format_money(currency, stats.average_spent));
    Ok(())
}

/// Handle the estimate command
pub fn handle_estimate(days: u32, people: u32, currency: &str) -> Result<(), CliError> {
    let estimate = estimate_student_budget(BudgetInput { days, people });
    let b = estimate.breakdown;
    println!("Per person:       {}", format_money(currency, estimate.per_person));
    println!("Total ({} people): {}", people, format_money(currency, estimate.total));
    println!("  accommodation   {}", format_money(currency, b.accommodation));
    println!("  food            {}", format_money(currency, b.food));
    println!("  local transport {}", format_money(currency, b.local_transport));
    println!("  activities      {}", format_money(currency, b.activities));
    Ok(())
}

/// Handle the search command
pub fn handle_plan(
    name: String,
    country: Option<String>,
    days: u32,
    people: u32,
    store: &mut TripStore,
    currency: &str,
) -> Result<Trip, CliError> {
    let plan = TripPlan::new(name, country, days, people);
    let trip = plan_trip(store, &plan, Utc::now().date_naive())?;
    println!(
        "Trip to {} created (ID: {}), {} to {}, budget {}",
        trip.destination,
        trip.id,
        trip.start_date,
        trip.end_date,
        format_money(currency, trip.total_budget)
    );
    Ok(trip)
}

pub fn handle_search(
    query: &str,
    limit: Option<usize>,
    lookup: &dyn DestinationLookup,
    config: &LookupConfig,
) -> Result<(), CliError> {
    let results = lookup.search_destinations(query, limit.unwrap_or(config.search_limit));
    if results.is_empty() {
        println!("No destinations found for '{}'", query);
        return Ok(());
    }
    for d in results {
        let country = d.country.as_deref().unwrap_or("?");
        println!(
            "{} ({}, {:?}) at {:.4}, {:.4}",
            d.name, country, d.kind, d.latitude, d.longitude
        );
        if let Some(url) = d.image_url {
            println!("  {}", url);
        }
    }
    Ok(())
}

/// Handle the place command
pub fn handle_place(name: &str, lookup: &dyn DestinationLookup) -> Result<(), CliError> {
    match lookup.get_place_summary(name) {
        Some(place) => {
            println!("{}", place.title);
            if let Some(summary) = place.summary {
                println!("\n{}", summary);
            }
            if let Some(url) = place.image_url {
                println!("\n{}", url);
            }
        }
        None => println!("No information found for '{}'", name),
    }
    Ok(())
}

/// Handle the sights command
pub fn handle_sights(
    lat: f64,
    lon: f64,
    radius: Option<u32>,
    limit: Option<usize>,
    lookup: &dyn DestinationLookup,
    config: &LookupConfig,
) -> Result<(), CliError> {
    let sights = lookup.get_nearby_sights(
        lat,
        lon,
        radius.unwrap_or(config.nearby_radius_meters),
        limit.unwrap_or(config.nearby_limit),
    );
    if sights.is_empty() {
        println!("No sights found nearby");
    }
    for sight in sights {
        println!("{} ({:.0} m)", sight.title, sight.distance);
    }
    Ok(())
}
