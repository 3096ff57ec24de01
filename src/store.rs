use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, error, info};

use crate::models::{
    BudgetCategory, Expense, ExpensePatch, ItineraryItem, ItineraryPatch, MemberPatch,
    NewBudgetCategory, NewExpense, NewItineraryItem, NewTrip, NewTripMember, Trip, TripMember,
    TripPatch,
};
use crate::storage::{KeyValueStorage, StorageError};

/// Key the whole data set is stored under
pub const STORAGE_KEY: &str = "@tripsquad_data";

/// The persisted payload: all five collections, written and read as one blob
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripData {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub trips: Vec<Trip>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub itineraries: Vec<ItineraryItem>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub expenses: Vec<Expense>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub budget_categories: Vec<BudgetCategory>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub trip_members: Vec<TripMember>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

fn system_clock() -> i64 {
    Utc::now().timestamp_millis()
}

/// Creation-time ids in epoch milliseconds. If the clock has not moved past
/// the last id handed out, the next id is the last one plus one.
#[derive(Debug)]
struct IdGenerator {
    last: i64,
    clock: fn() -> i64,
}

impl IdGenerator {
    fn new(clock: fn() -> i64) -> Self {
        Self { last: 0, clock }
    }

    fn next_millis(&mut self) -> i64 {
        let now = (self.clock)();
        self.last = if now > self.last { now } else { self.last.saturating_add(1) };
        self.last
    }

    /// Never hand out an id at or below a numeric id already in the data set
    fn observe(&mut self, id: &str) {
        if let Ok(n) = id.parse::<i64>() {
            self.last = self.last.max(n);
        }
    }
}

fn timestamp_from_millis(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .unwrap_or_else(Utc::now)
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// In-memory source of truth for trips and their child records, mirrored to
/// storage after every mutation.
pub struct TripStore {
    storage: Box<dyn KeyValueStorage>,
    key: String,
    data: TripData,
    loaded: bool,
    dirty: bool,
    ids: IdGenerator,
}

impl TripStore {
    /// Create an empty store over `storage`. Call [`TripStore::load_data`] before reading.
    pub fn new(storage: Box<dyn KeyValueStorage>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
            data: TripData::default(),
            loaded: false,
            dirty: false,
            ids: IdGenerator::new(system_clock),
        }
    }

    /// Create the store and load whatever is persisted under `key`
    pub fn open(storage: Box<dyn KeyValueStorage>, key: impl Into<String>) -> Self {
        let mut store = Self::new(storage, key);
        store.load_data();
        store
    }

    /// Replace the millisecond clock used for ids and `created_at`
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.ids.clock = clock;
        self
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// True when the most recent save failed and memory holds unsaved changes
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn data(&self) -> &TripData {
        &self.data
    }

    pub fn trips(&self) -> &[Trip] {
        &self.data.trips
    }

    pub fn itineraries(&self) -> &[ItineraryItem] {
        &self.data.itineraries
    }

    pub fn expenses(&self) -> &[Expense] {
        &self.data.expenses
    }

    pub fn budget_categories(&self) -> &[BudgetCategory] {
        &self.data.budget_categories
    }

    pub fn trip_members(&self) -> &[TripMember] {
        &self.data.trip_members
    }

    fn read_data(&self) -> Result<Option<TripData>, StorageError> {
        let Some(raw) = self.storage.get_item(&self.key)? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    /// Load the persisted blob. Failures are logged and leave the store empty;
    /// the store is marked loaded either way.
    pub fn load_data(&mut self) {
        match self.read_data() {
            Ok(Some(data)) => {
                let ids = data
                    .trips
                    .iter()
                    .map(|t| t.id.as_str())
                    .chain(data.itineraries.iter().map(|i| i.id.as_str()))
                    .chain(data.expenses.iter().map(|e| e.id.as_str()))
                    .chain(data.trip_members.iter().map(|m| m.id.as_str()));
                for id in ids {
                    self.ids.observe(id);
                }
                info!(
                    trips = data.trips.len(),
                    itineraries = data.itineraries.len(),
                    expenses = data.expenses.len(),
                    "loaded trip data"
                );
                self.data = data;
            }
            Ok(None) => info!(key = %self.key, "no saved trip data, starting empty"),
            Err(e) => error!(key = %self.key, error = %e, "failed to load trip data, starting empty"),
        }
        self.loaded = true;
    }

    /// Serialize all five collections and write them under the storage key
    pub fn save_data(&mut self) -> Result<(), StorageError> {
        let result = serde_json::to_string(&self.data)
            .map_err(StorageError::from)
            .and_then(|payload| self.storage.set_item(&self.key, &payload));
        self.dirty = result.is_err();
        result
    }

    /// Retry the save if the last one failed
    pub fn flush(&mut self) -> Result<(), StorageError> {
        if self.dirty {
            self.save_data()
        } else {
            Ok(())
        }
    }

    fn persist(&mut self) {
        if let Err(e) = self.save_data() {
            error!(key = %self.key, error = %e, "failed to save trip data, changes are in memory only");
        }
    }

    fn next_id(&mut self) -> String {
        self.ids.next_millis().to_string()
    }

    pub fn add_trip(&mut self, trip: NewTrip) -> Trip {
        let millis = self.ids.next_millis();
        let trip = trip.into_trip(millis.to_string(), timestamp_from_millis(millis));
        debug!(trip_id = %trip.id, destination = %trip.destination, "adding trip");
        self.data.trips.push(trip.clone());
        self.persist();
        trip
    }

    /// Shallow-merge `patch` into the trip with `id`. Returns whether it existed.
    pub fn update_trip(&mut self, id: &str, patch: TripPatch) -> bool {
        let found = match self.data.trips.iter_mut().find(|t| t.id == id) {
            Some(trip) => {
                patch.apply(trip);
                true
            }
            None => false,
        };
        debug!(trip_id = %id, found, "updating trip");
        self.persist();
        found
    }

    /// Delete a trip and every itinerary item, expense, budget category and
    /// member that references it, then persist once.
    pub fn delete_trip(&mut self, id: &str) -> bool {
        let before = self.data.trips.len();
        self.data.trips.retain(|t| t.id != id);
        let found = self.data.trips.len() != before;

        self.data.itineraries.retain(|i| i.trip_id != id);
        self.data.expenses.retain(|e| e.trip_id != id);
        self.data.budget_categories.retain(|b| b.trip_id != id);
        self.data.trip_members.retain(|m| m.trip_id != id);

        debug!(trip_id = %id, found, "deleted trip");
        self.persist();
        found
    }

    pub fn get_trip(&self, id: &str) -> Option<&Trip> {
        self.data.trips.iter().find(|t| t.id == id)
    }

    pub fn add_itinerary(&mut self, item: NewItineraryItem) -> ItineraryItem {
        let item = item.into_item(self.next_id());
        debug!(item_id = %item.id, trip_id = %item.trip_id, "adding itinerary item");
        self.data.itineraries.push(item.clone());
        self.persist();
        item
    }

    pub fn update_itinerary(&mut self, id: &str, patch: ItineraryPatch) -> bool {
        let found = match self.data.itineraries.iter_mut().find(|i| i.id == id) {
            Some(item) => {
                patch.apply(item);
                true
            }
            None => false,
        };
        debug!(item_id = %id, found, "updating itinerary item");
        self.persist();
        found
    }

    pub fn delete_itinerary(&mut self, id: &str) -> bool {
        let before = self.data.itineraries.len();
        self.data.itineraries.retain(|i| i.id != id);
        let found = self.data.itineraries.len() != before;
        debug!(item_id = %id, found, "deleted itinerary item");
        self.persist();
        found
    }

    /// Itinerary items of a trip ordered by day, then by start time within a
    /// day. Only items that both have a start time are reordered relative to
    /// each other; untimed items keep their insertion position within the day.
    pub fn get_trip_itineraries(&self, trip_id: &str) -> Vec<&ItineraryItem> {
        let mut items: Vec<&ItineraryItem> = self
            .data
            .itineraries
            .iter()
            .filter(|i| i.trip_id == trip_id)
            .collect();
        items.sort_by_key(|i| i.day_number);

        let mut start = 0;
        while start < items.len() {
            let day = items[start].day_number;
            let end = start
                + items[start..]
                    .iter()
                    .take_while(|i| i.day_number == day)
                    .count();

            let slots: Vec<usize> = (start..end)
                .filter(|&idx| items[idx].start_time.is_some())
                .collect();
            let mut timed: Vec<&ItineraryItem> = slots.iter().map(|&idx| items[idx]).collect();
            timed.sort_by(|a, b| a.start_time.cmp(&b.start_time));
            for (slot, item) in slots.into_iter().zip(timed) {
                items[slot] = item;
            }

            start = end;
        }
        items
    }

    pub fn add_expense(&mut self, expense: NewExpense) -> Expense {
        let expense = expense.into_expense(self.next_id());
        debug!(expense_id = %expense.id, trip_id = %expense.trip_id, amount = expense.amount, "adding expense");
        self.data.expenses.push(expense.clone());
        self.persist();
        expense
    }

    pub fn update_expense(&mut self, id: &str, patch: ExpensePatch) -> bool {
        let found = match self.data.expenses.iter_mut().find(|e| e.id == id) {
            Some(expense) => {
                patch.apply(expense);
                true
            }
            None => false,
        };
        debug!(expense_id = %id, found, "updating expense");
        self.persist();
        found
    }

    pub fn delete_expense(&mut self, id: &str) -> bool {
        let before = self.data.expenses.len();
        self.data.expenses.retain(|e| e.id != id);
        let found = self.data.expenses.len() != before;
        debug!(expense_id = %id, found, "deleted expense");
        self.persist();
        found
    }

    pub fn get_trip_expenses(&self, trip_id: &str) -> Vec<&Expense> {
        self.data
            .expenses
            .iter()
            .filter(|e| e.trip_id == trip_id)
            .collect()
    }

    /// Replace every budget category of `trip_id` with `categories`. Ids are
    /// `{trip_id}-{category}`; a category listed twice keeps its last amount.
    pub fn set_budget_categories(&mut self, trip_id: &str, categories: Vec<NewBudgetCategory>) {
        let mut replacement: Vec<BudgetCategory> = Vec::with_capacity(categories.len());
        for cat in categories {
            let id = format!("{}-{}", trip_id, cat.category);
            match replacement.iter_mut().find(|b| b.id == id) {
                Some(existing) => existing.allocated_amount = cat.allocated_amount,
                None => replacement.push(BudgetCategory {
                    id,
                    trip_id: trip_id.to_string(),
                    category: cat.category,
                    allocated_amount: cat.allocated_amount,
                }),
            }
        }

        debug!(trip_id = %trip_id, count = replacement.len(), "replacing budget categories");
        self.data.budget_categories.retain(|b| b.trip_id != trip_id);
        self.data.budget_categories.extend(replacement);
        self.persist();
    }

    pub fn get_trip_budget_categories(&self, trip_id: &str) -> Vec<&BudgetCategory> {
        self.data
            .budget_categories
            .iter()
            .filter(|b| b.trip_id == trip_id)
            .collect()
    }

    pub fn add_trip_member(&mut self, member: NewTripMember) -> TripMember {
        let member = member.into_member(self.next_id());
        debug!(member_id = %member.id, trip_id = %member.trip_id, "adding trip member");
        self.data.trip_members.push(member.clone());
        self.persist();
        member
    }

    pub fn update_trip_member(&mut self, id: &str, patch: MemberPatch) -> bool {
        let found = match self.data.trip_members.iter_mut().find(|m| m.id == id) {
            Some(member) => {
                patch.apply(member);
                true
            }
            None => false,
        };
        debug!(member_id = %id, found, "updating trip member");
        self.persist();
        found
    }

    pub fn remove_trip_member(&mut self, id: &str) -> bool {
        let before = self.data.trip_members.len();
        self.data.trip_members.retain(|m| m.id != id);
        let found = self.data.trip_members.len() != before;
        debug!(member_id = %id, found, "removed trip member");
        self.persist();
        found
    }

    pub fn get_trip_members(&self, trip_id: &str) -> Vec<&TripMember> {
        self.data
            .trip_members
            .iter()
            .filter(|m| m.trip_id == trip_id)
            .collect()
    }

    /// Drop every record in all five collections and persist once
    pub fn clear_all(&mut self) {
        info!(trips = self.data.trips.len(), "clearing all trip data");
        self.data = TripData::default();
        self.persist();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExpenseCategory, TripStatus, TripType};
    use crate::storage::MemoryStorage;

    fn fixed_clock() -> i64 {
        1_700_000_000_000
    }

    fn store() -> (TripStore, MemoryStorage) {
        let storage = MemoryStorage::new();
        let store = TripStore::open(Box::new(storage.clone()), STORAGE_KEY).with_clock(fixed_clock);
        (store, storage)
    }

    fn new_trip(destination: &str, budget: f64) -> NewTrip {
        NewTrip::new(
            destination.to_string(),
            "2025-12-01".to_string(),
            "2025-12-05".to_string(),
            budget,
        )
    }

    fn activity(trip_id: &str, day: u32, name: &str, start: Option<&str>) -> NewItineraryItem {
        let mut item = NewItineraryItem::new(trip_id.to_string(), day, name.to_string());
        item.start_time = start.map(str::to_string);
        item
    }

    fn expense(trip_id: &str, category: ExpenseCategory, amount: f64) -> NewExpense {
        NewExpense {
            trip_id: trip_id.to_string(),
            category,
            amount,
            date: "2025-12-02".to_string(),
            description: "spend".to_string(),
            paid_by: None,
        }
    }

    #[test]
    fn ids_are_unique_when_clock_stands_still() {
        let (mut store, _) = store();
        let a = store.add_trip(new_trip("Goa", 100.0));
        let b = store.add_trip(new_trip("Goa", 100.0));
        assert_eq!(a.id, "1700000000000");
        assert_eq!(b.id, "1700000000001");
        assert_eq!(a.created_at, "2023-11-14T22:13:20.000Z");
    }

    #[test]
    fn load_seeds_ids_past_existing_records() {
        let storage = MemoryStorage::new();
        storage
            .set_item(
                STORAGE_KEY,
                r#"{"tripMembers":[{"id":"1800000000000","tripId":"x","name":"Asha"}]}"#,
            )
            .unwrap();
        let mut store = TripStore::open(Box::new(storage), STORAGE_KEY).with_clock(fixed_clock);
        let trip = store.add_trip(new_trip("Goa", 100.0));
        assert_eq!(trip.id, "1800000000001");
    }

    #[test]
    fn largest_possible_loaded_id_does_not_overflow() {
        let storage = MemoryStorage::new();
        storage
            .set_item(
                STORAGE_KEY,
                r#"{"tripMembers":[{"id":"9223372036854775807","tripId":"x","name":"Asha"}]}"#,
            )
            .unwrap();
        let mut store = TripStore::open(Box::new(storage), STORAGE_KEY).with_clock(fixed_clock);
        let trip = store.add_trip(new_trip("Goa", 100.0));
        assert_eq!(trip.id, i64::MAX.to_string());
    }

    #[test]
    fn every_mutation_is_persisted() {
        let (mut store, storage) = store();
        let trip = store.add_trip(new_trip("Goa", 100.0));
        let saved = storage.get_item(STORAGE_KEY).unwrap().unwrap();
        let data: TripData = serde_json::from_str(&saved).unwrap();
        assert_eq!(data.trips, vec![trip.clone()]);

        store.update_trip(
            &trip.id,
            TripPatch {
                status: Some(TripStatus::Ongoing),
                ..Default::default()
            },
        );
        let saved = storage.get_item(STORAGE_KEY).unwrap().unwrap();
        let data: TripData = serde_json::from_str(&saved).unwrap();
        assert_eq!(data.trips[0].status, TripStatus::Ongoing);
    }

    #[test]
    fn update_merges_and_keeps_other_records() {
        let (mut store, _) = store();
        let a = store.add_trip(new_trip("Goa", 100.0));
        let b = store.add_trip(new_trip("Kerala", 200.0));

        let patch = TripPatch {
            trip_type: Some(TripType::Group),
            num_travelers: Some(4),
            ..Default::default()
        };
        assert!(store.update_trip(&a.id, patch));
        assert!(!store.update_trip("missing", TripPatch::default()));

        let updated = store.get_trip(&a.id).unwrap();
        assert_eq!(updated.trip_type, TripType::Group);
        assert_eq!(updated.num_travelers, 4);
        assert_eq!(updated.destination, "Goa");
        assert_eq!(updated.created_at, a.created_at);
        assert_eq!(store.get_trip(&b.id), Some(&b));
    }

    #[test]
    fn get_trip_missing_is_none() {
        let (store, _) = store();
        assert!(store.get_trip("nope").is_none());
    }

    #[test]
    fn delete_trip_cascades_only_to_its_children() {
        let (mut store, _) = store();
        let a = store.add_trip(new_trip("Goa", 100.0));
        let b = store.add_trip(new_trip("Kerala", 200.0));

        for trip in [&a, &b] {
            store.add_itinerary(activity(&trip.id, 1, "Walk", None));
            store.add_expense(expense(&trip.id, ExpenseCategory::Food, 10.0));
            store.add_trip_member(NewTripMember {
                trip_id: trip.id.clone(),
                name: "Ravi".to_string(),
                email: None,
            });
            store.set_budget_categories(
                &trip.id,
                vec![NewBudgetCategory {
                    category: ExpenseCategory::Food,
                    allocated_amount: 50.0,
                }],
            );
        }
        let b_snapshot = (
            store.get_trip_itineraries(&b.id).into_iter().cloned().collect::<Vec<_>>(),
            store.get_trip_expenses(&b.id).into_iter().cloned().collect::<Vec<_>>(),
            store.get_trip_members(&b.id).into_iter().cloned().collect::<Vec<_>>(),
            store.get_trip_budget_categories(&b.id).into_iter().cloned().collect::<Vec<_>>(),
        );

        assert!(store.delete_trip(&a.id));

        assert!(store.get_trip(&a.id).is_none());
        assert!(store.get_trip_itineraries(&a.id).is_empty());
        assert!(store.get_trip_expenses(&a.id).is_empty());
        assert!(store.get_trip_members(&a.id).is_empty());
        assert!(store.get_trip_budget_categories(&a.id).is_empty());

        assert_eq!(store.trips(), &[b.clone()]);
        assert_eq!(store.itineraries(), b_snapshot.0.as_slice());
        assert_eq!(store.expenses(), b_snapshot.1.as_slice());
        assert_eq!(store.trip_members(), b_snapshot.2.as_slice());
        assert_eq!(store.budget_categories(), b_snapshot.3.as_slice());
    }

    #[test]
    fn budget_categories_are_replaced_not_merged() {
        let (mut store, _) = store();
        let trip = store.add_trip(new_trip("Goa", 100.0));
        let other = store.add_trip(new_trip("Kerala", 100.0));
        store.set_budget_categories(
            &other.id,
            vec![NewBudgetCategory {
                category: ExpenseCategory::Transport,
                allocated_amount: 5.0,
            }],
        );

        store.set_budget_categories(
            &trip.id,
            vec![
                NewBudgetCategory {
                    category: ExpenseCategory::Food,
                    allocated_amount: 30.0,
                },
                NewBudgetCategory {
                    category: ExpenseCategory::Transport,
                    allocated_amount: 20.0,
                },
            ],
        );
        store.set_budget_categories(
            &trip.id,
            vec![NewBudgetCategory {
                category: ExpenseCategory::Food,
                allocated_amount: 45.0,
            }],
        );

        let cats = store.get_trip_budget_categories(&trip.id);
        assert_eq!(cats.len(), 1);
        assert_eq!(cats[0].id, format!("{}-Food", trip.id));
        assert_eq!(cats[0].allocated_amount, 45.0);
        assert_eq!(store.get_trip_budget_categories(&other.id).len(), 1);
    }

    #[test]
    fn duplicate_category_in_one_call_keeps_last_amount() {
        let (mut store, _) = store();
        store.set_budget_categories(
            "t1",
            vec![
                NewBudgetCategory {
                    category: ExpenseCategory::Food,
                    allocated_amount: 10.0,
                },
                NewBudgetCategory {
                    category: ExpenseCategory::Food,
                    allocated_amount: 15.0,
                },
            ],
        );
        let cats = store.get_trip_budget_categories("t1");
        assert_eq!(cats.len(), 1);
        assert_eq!(cats[0].allocated_amount, 15.0);
    }

    #[test]
    fn itinerary_sorted_by_day_then_start_time() {
        let (mut store, _) = store();
        store.add_itinerary(activity("t", 2, "Market", Some("10:00")));
        store.add_itinerary(activity("t", 1, "Lunch", Some("13:00")));
        store.add_itinerary(activity("t", 1, "Breakfast", Some("08:30")));
        store.add_itinerary(activity("other", 1, "Elsewhere", Some("07:00")));
        store.add_itinerary(activity("t", 2, "Temple", Some("07:45")));

        let names: Vec<&str> = store
            .get_trip_itineraries("t")
            .iter()
            .map(|i| i.activity_name.as_str())
            .collect();
        assert_eq!(names, vec!["Breakfast", "Lunch", "Temple", "Market"]);
    }

    #[test]
    fn untimed_items_keep_insertion_order_within_day() {
        let (mut store, _) = store();
        store.add_itinerary(activity("t", 1, "Check in", None));
        store.add_itinerary(activity("t", 1, "Dinner", Some("20:00")));
        store.add_itinerary(activity("t", 1, "Unpack", None));
        store.add_itinerary(activity("t", 1, "Snack", Some("16:00")));
        store.add_itinerary(activity("t", 0, "Travel", None));

        let names: Vec<&str> = store
            .get_trip_itineraries("t")
            .iter()
            .map(|i| i.activity_name.as_str())
            .collect();
        assert_eq!(names, vec!["Travel", "Check in", "Snack", "Unpack", "Dinner"]);
    }

    #[test]
    fn update_and_delete_child_records() {
        let (mut store, _) = store();
        let item = store.add_itinerary(activity("t", 1, "Walk", None));
        let exp = store.add_expense(expense("t", ExpenseCategory::Food, 10.0));
        let member = store.add_trip_member(NewTripMember {
            trip_id: "t".to_string(),
            name: "Ravi".to_string(),
            email: None,
        });

        assert!(store.update_itinerary(
            &item.id,
            ItineraryPatch {
                start_time: Some(Some("09:00".to_string())),
                ..Default::default()
            }
        ));
        assert!(store.update_expense(
            &exp.id,
            ExpensePatch {
                amount: Some(25.0),
                ..Default::default()
            }
        ));
        assert!(store.update_trip_member(
            &member.id,
            MemberPatch {
                email: Some(Some("ravi@example.com".to_string())),
                ..Default::default()
            }
        ));

        assert_eq!(store.itineraries()[0].start_time.as_deref(), Some("09:00"));
        assert_eq!(store.expenses()[0].amount, 25.0);
        assert_eq!(
            store.trip_members()[0].email.as_deref(),
            Some("ravi@example.com")
        );

        assert!(store.delete_itinerary(&item.id));
        assert!(store.delete_expense(&exp.id));
        assert!(store.remove_trip_member(&member.id));
        assert!(!store.delete_expense(&exp.id));
        assert!(store.itineraries().is_empty());
        assert!(store.expenses().is_empty());
        assert!(store.trip_members().is_empty());
    }

    #[test]
    fn load_tolerates_missing_and_null_fields() {
        let storage = MemoryStorage::new();
        storage
            .set_item(
                STORAGE_KEY,
                r#"{"trips":[{"id":"1","destination":"Goa","startDate":"2025-12-01",
                    "endDate":"2025-12-05","totalBudget":5000,"tripType":"Solo",
                    "numTravelers":1,"status":"Upcoming","createdAt":"2025-01-01T00:00:00.000Z"}],
                    "expenses":null}"#,
            )
            .unwrap();
        let store = TripStore::open(Box::new(storage), STORAGE_KEY);
        assert!(store.is_loaded());
        assert_eq!(store.trips().len(), 1);
        assert!(store.expenses().is_empty());
        assert!(store.itineraries().is_empty());
    }

    #[test]
    fn load_failure_still_marks_loaded() {
        let storage = MemoryStorage::new();
        storage.set_item(STORAGE_KEY, "not json").unwrap();
        let store = TripStore::open(Box::new(storage.clone()), STORAGE_KEY);
        assert!(store.is_loaded());
        assert!(store.trips().is_empty());

        storage.set_fail_reads(true);
        let store = TripStore::open(Box::new(storage), STORAGE_KEY);
        assert!(store.is_loaded());
        assert!(store.trips().is_empty());
    }

    #[test]
    fn failed_save_keeps_memory_and_flush_retries() {
        let (mut store, storage) = store();
        storage.set_fail_writes(true);

        let trip = store.add_trip(new_trip("Goa", 100.0));
        assert!(store.is_dirty());
        assert_eq!(store.get_trip(&trip.id), Some(&trip));
        assert!(storage.get_item(STORAGE_KEY).unwrap().is_none());
        assert!(store.flush().is_err());

        storage.set_fail_writes(false);
        store.flush().unwrap();
        assert!(!store.is_dirty());
        assert!(storage.get_item(STORAGE_KEY).unwrap().is_some());
    }

    #[test]
    fn clear_all_empties_everything_in_one_write() {
        let (mut store, storage) = store();
        let trip = store.add_trip(new_trip("Goa", 100.0));
        store.add_expense(expense(&trip.id, ExpenseCategory::Food, 10.0));
        store.add_expense(expense("orphan", ExpenseCategory::Food, 5.0));

        store.clear_all();
        assert_eq!(store.data(), &TripData::default());

        let reloaded = TripStore::open(Box::new(storage), STORAGE_KEY);
        assert_eq!(reloaded.data(), &TripData::default());
    }
}
