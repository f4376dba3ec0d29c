use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use fleetops_core::{Aggregate, AggregateRoot, DomainError};
use fleetops_events::Event;

use crate::error::CargoError;
use crate::item::LineItem;

/// Float residue tolerated when a removal releases slightly more weight than
/// is committed (relative to the magnitudes involved).
const RESIDUE_TOLERANCE: f64 = 1e-9;

/// Ledger identifier: an opaque, non-blank string.
///
/// Generated ids are UUIDv7 strings; callers may also bring their own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CargoId(String);

impl CargoId {
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for CargoId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CargoId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(DomainError::invalid_id("CargoId: must not be blank"));
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl TryFrom<String> for CargoId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CargoId> for String {
    fn from(value: CargoId) -> Self {
        value.0
    }
}

/// Aggregate root: CargoLedger.
///
/// Holds a weight capacity and an insertion-ordered list of line items that
/// are unique by case-insensitive name. `used_capacity` is the running total
/// of `amount * unit_weight` over every load minus every unload.
#[derive(Debug, Clone, PartialEq)]
pub struct CargoLedger {
    id: CargoId,
    owner_label: String,
    capacity: f64,
    used_capacity: f64,
    items: Vec<LineItem>,
    version: u64,
    opened: bool,
}

/// Persisted form of a ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub id: CargoId,
    pub owner_label: String,
    pub capacity: f64,
    pub used_capacity: f64,
    pub items: Vec<LineItem>,
    pub version: u64,
}

impl CargoLedger {
    /// Create an empty, not-yet-opened aggregate instance for rehydration.
    pub fn empty(id: CargoId) -> Self {
        Self {
            id,
            owner_label: String::new(),
            capacity: 0.0,
            used_capacity: 0.0,
            items: Vec::new(),
            version: 0,
            opened: false,
        }
    }

    /// Open a fresh ledger with nothing loaded.
    pub fn open(
        id: CargoId,
        owner_label: impl Into<String>,
        capacity: f64,
    ) -> Result<(Self, Vec<CargoEvent>), CargoError> {
        let mut ledger = Self::empty(id);
        let events = ledger.execute(&CargoCommand::OpenLedger(OpenLedger {
            owner_label: owner_label.into(),
            capacity,
            occurred_at: Utc::now(),
        }))?;
        Ok((ledger, events))
    }

    /// Rebuild a ledger from persisted state, rejecting snapshots that break
    /// the ledger invariants.
    pub fn restore(snapshot: LedgerSnapshot) -> Result<Self, CargoError> {
        ensure_capacity(snapshot.capacity)?;
        if !snapshot.used_capacity.is_finite()
            || snapshot.used_capacity < 0.0
            || snapshot.used_capacity > snapshot.capacity
        {
            return Err(CargoError::invalid(format!(
                "used capacity {} is outside [0, {}]",
                snapshot.used_capacity, snapshot.capacity
            )));
        }
        if snapshot.version == 0 {
            return Err(CargoError::invalid("snapshot of a ledger that was never opened"));
        }

        let mut items: Vec<LineItem> = Vec::with_capacity(snapshot.items.len());
        for item in snapshot.items {
            let name = normalize_name(&item.name)?;
            ensure_amount(item.amount)?;
            if items.iter().any(|held| held.matches(name)) {
                return Err(CargoError::invalid(format!("duplicate item '{name}'")));
            }
            items.push(LineItem::new(name, item.amount));
        }

        Ok(Self {
            id: snapshot.id,
            owner_label: snapshot.owner_label,
            capacity: snapshot.capacity,
            used_capacity: snapshot.used_capacity,
            items,
            version: snapshot.version,
            opened: true,
        })
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            id: self.id.clone(),
            owner_label: self.owner_label.clone(),
            capacity: self.capacity,
            used_capacity: self.used_capacity,
            items: self.items.clone(),
            version: self.version,
        }
    }

    pub fn owner_label(&self) -> &str {
        &self.owner_label
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    pub fn used_capacity(&self) -> f64 {
        self.used_capacity
    }

    pub fn available_capacity(&self) -> f64 {
        self.capacity - self.used_capacity
    }

    /// Snapshot of the line items in insertion order.
    pub fn items(&self) -> Vec<LineItem> {
        self.items.clone()
    }

    pub fn item(&self, name: &str) -> Option<LineItem> {
        self.position(name.trim()).map(|idx| self.items[idx].clone())
    }

    /// Total units held across all line items.
    pub fn total_units(&self) -> i64 {
        self.items
            .iter()
            .map(|item| item.amount)
            .fold(0i64, i64::saturating_add)
    }

    pub fn add_item(
        &mut self,
        name: impl Into<String>,
        amount: i64,
        unit_weight: f64,
    ) -> Result<Vec<CargoEvent>, CargoError> {
        self.execute(&CargoCommand::AddItem(AddItem {
            name: name.into(),
            amount,
            unit_weight,
            occurred_at: Utc::now(),
        }))
    }

    pub fn remove_item(
        &mut self,
        name: impl Into<String>,
        amount: i64,
        unit_weight: f64,
    ) -> Result<Vec<CargoEvent>, CargoError> {
        self.execute(&CargoCommand::RemoveItem(RemoveItem {
            name: name.into(),
            amount,
            unit_weight,
            occurred_at: Utc::now(),
        }))
    }

    pub fn relabel_owner(
        &mut self,
        owner_label: impl Into<String>,
    ) -> Result<Vec<CargoEvent>, CargoError> {
        self.execute(&CargoCommand::RelabelOwner(RelabelOwner {
            owner_label: owner_label.into(),
            occurred_at: Utc::now(),
        }))
    }

    pub fn resize_capacity(&mut self, capacity: f64) -> Result<Vec<CargoEvent>, CargoError> {
        self.execute(&CargoCommand::ResizeCapacity(ResizeCapacity {
            capacity,
            occurred_at: Utc::now(),
        }))
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.items.iter().position(|item| item.matches(name))
    }
}

impl AggregateRoot for CargoLedger {
    type Id = CargoId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: OpenLedger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenLedger {
    pub owner_label: String,
    pub capacity: f64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddItem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddItem {
    pub name: String,
    pub amount: i64,
    pub unit_weight: f64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RemoveItem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoveItem {
    pub name: String,
    pub amount: i64,
    pub unit_weight: f64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RelabelOwner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelabelOwner {
    pub owner_label: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ResizeCapacity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResizeCapacity {
    pub capacity: f64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CargoCommand {
    OpenLedger(OpenLedger),
    AddItem(AddItem),
    RemoveItem(RemoveItem),
    RelabelOwner(RelabelOwner),
    ResizeCapacity(ResizeCapacity),
}

/// Event: LedgerOpened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerOpened {
    pub ledger_id: CargoId,
    pub owner_label: String,
    pub capacity: f64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ItemLoaded. `name` carries the ledger's canonical casing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemLoaded {
    pub ledger_id: CargoId,
    pub name: String,
    pub amount: i64,
    pub unit_weight: f64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ItemUnloaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemUnloaded {
    pub ledger_id: CargoId,
    pub name: String,
    pub amount: i64,
    pub unit_weight: f64,
    /// The line item reached zero and was dropped.
    pub pruned: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OwnerRelabeled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnerRelabeled {
    pub ledger_id: CargoId,
    pub owner_label: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: CapacityResized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityResized {
    pub ledger_id: CargoId,
    pub capacity: f64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CargoEvent {
    LedgerOpened(LedgerOpened),
    ItemLoaded(ItemLoaded),
    ItemUnloaded(ItemUnloaded),
    OwnerRelabeled(OwnerRelabeled),
    CapacityResized(CapacityResized),
}

impl Event for CargoEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CargoEvent::LedgerOpened(_) => "cargo.ledger.opened",
            CargoEvent::ItemLoaded(_) => "cargo.item.loaded",
            CargoEvent::ItemUnloaded(_) => "cargo.item.unloaded",
            CargoEvent::OwnerRelabeled(_) => "cargo.ledger.owner_relabeled",
            CargoEvent::CapacityResized(_) => "cargo.ledger.capacity_resized",
        }
    }

    fn stream_id(&self) -> &str {
        match self {
            CargoEvent::LedgerOpened(e) => e.ledger_id.as_str(),
            CargoEvent::ItemLoaded(e) => e.ledger_id.as_str(),
            CargoEvent::ItemUnloaded(e) => e.ledger_id.as_str(),
            CargoEvent::OwnerRelabeled(e) => e.ledger_id.as_str(),
            CargoEvent::CapacityResized(e) => e.ledger_id.as_str(),
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            CargoEvent::LedgerOpened(e) => e.occurred_at,
            CargoEvent::ItemLoaded(e) => e.occurred_at,
            CargoEvent::ItemUnloaded(e) => e.occurred_at,
            CargoEvent::OwnerRelabeled(e) => e.occurred_at,
            CargoEvent::CapacityResized(e) => e.occurred_at,
        }
    }
}

impl Aggregate for CargoLedger {
    type Command = CargoCommand;
    type Event = CargoEvent;
    type Error = CargoError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            CargoEvent::LedgerOpened(e) => {
                self.id = e.ledger_id.clone();
                self.owner_label = e.owner_label.clone();
                self.capacity = e.capacity;
                self.used_capacity = 0.0;
                self.items.clear();
                self.opened = true;
            }
            CargoEvent::ItemLoaded(e) => {
                match self.position(&e.name) {
                    Some(idx) => self.items[idx].amount += e.amount,
                    None => self.items.push(LineItem::new(e.name.clone(), e.amount)),
                }
                self.used_capacity += e.amount as f64 * e.unit_weight;
            }
            CargoEvent::ItemUnloaded(e) => {
                if let Some(idx) = self.position(&e.name) {
                    self.items[idx].amount -= e.amount;
                    if self.items[idx].amount <= 0 {
                        self.items.remove(idx);
                    }
                }
                // handle() already rejected real underflow; this only drops float residue.
                self.used_capacity = (self.used_capacity - e.amount as f64 * e.unit_weight).max(0.0);
            }
            CargoEvent::OwnerRelabeled(e) => {
                self.owner_label = e.owner_label.clone();
            }
            CargoEvent::CapacityResized(e) => {
                self.capacity = e.capacity;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            CargoCommand::OpenLedger(cmd) => self.handle_open(cmd),
            CargoCommand::AddItem(cmd) => self.handle_add(cmd),
            CargoCommand::RemoveItem(cmd) => self.handle_remove(cmd),
            CargoCommand::RelabelOwner(cmd) => self.handle_relabel(cmd),
            CargoCommand::ResizeCapacity(cmd) => self.handle_resize(cmd),
        }
    }
}

impl CargoLedger {
    fn ensure_opened(&self) -> Result<(), CargoError> {
        if !self.opened {
            return Err(CargoError::invalid("ledger has not been opened"));
        }
        Ok(())
    }

    fn handle_open(&self, cmd: &OpenLedger) -> Result<Vec<CargoEvent>, CargoError> {
        if self.opened {
            return Err(CargoError::invalid("ledger is already open"));
        }
        ensure_capacity(cmd.capacity)?;

        Ok(vec![CargoEvent::LedgerOpened(LedgerOpened {
            ledger_id: self.id.clone(),
            owner_label: cmd.owner_label.clone(),
            capacity: cmd.capacity,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add(&self, cmd: &AddItem) -> Result<Vec<CargoEvent>, CargoError> {
        self.ensure_opened()?;
        let name = normalize_name(&cmd.name)?;
        ensure_amount(cmd.amount)?;
        ensure_unit_weight(cmd.unit_weight)?;

        let existing = self.position(name);
        if let Some(idx) = existing {
            if self.items[idx].amount.checked_add(cmd.amount).is_none() {
                return Err(CargoError::invalid(format!(
                    "amount {} would overflow the quantity held for '{}'",
                    cmd.amount, self.items[idx].name
                )));
            }
        }

        let weight = cmd.amount as f64 * cmd.unit_weight;
        if self.used_capacity + weight > self.capacity {
            return Err(CargoError::CapacityExceeded {
                requested: weight,
                available: self.available_capacity(),
            });
        }

        // First-seen casing stays the line item's name.
        let name = match existing {
            Some(idx) => self.items[idx].name.clone(),
            None => name.to_string(),
        };

        Ok(vec![CargoEvent::ItemLoaded(ItemLoaded {
            ledger_id: self.id.clone(),
            name,
            amount: cmd.amount,
            unit_weight: cmd.unit_weight,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_remove(&self, cmd: &RemoveItem) -> Result<Vec<CargoEvent>, CargoError> {
        self.ensure_opened()?;
        let name = normalize_name(&cmd.name)?;
        ensure_amount(cmd.amount)?;
        ensure_unit_weight(cmd.unit_weight)?;

        let item = self
            .position(name)
            .map(|idx| &self.items[idx])
            .ok_or_else(|| CargoError::ItemNotFound(name.to_string()))?;

        if item.amount < cmd.amount {
            return Err(CargoError::InsufficientQuantity {
                name: item.name.clone(),
                held: item.amount,
                requested: cmd.amount,
            });
        }

        let weight = cmd.amount as f64 * cmd.unit_weight;
        let tolerance = RESIDUE_TOLERANCE * self.used_capacity.max(weight).max(1.0);
        if self.used_capacity - weight < -tolerance {
            return Err(CargoError::invalid(format!(
                "unloading {} x {} releases {weight}, but only {} is committed",
                cmd.amount, cmd.unit_weight, self.used_capacity
            )));
        }

        Ok(vec![CargoEvent::ItemUnloaded(ItemUnloaded {
            ledger_id: self.id.clone(),
            name: item.name.clone(),
            amount: cmd.amount,
            unit_weight: cmd.unit_weight,
            pruned: item.amount == cmd.amount,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_relabel(&self, cmd: &RelabelOwner) -> Result<Vec<CargoEvent>, CargoError> {
        self.ensure_opened()?;

        Ok(vec![CargoEvent::OwnerRelabeled(OwnerRelabeled {
            ledger_id: self.id.clone(),
            owner_label: cmd.owner_label.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_resize(&self, cmd: &ResizeCapacity) -> Result<Vec<CargoEvent>, CargoError> {
        self.ensure_opened()?;
        ensure_capacity(cmd.capacity)?;

        if self.used_capacity > cmd.capacity {
            return Err(CargoError::CapacityExceeded {
                requested: self.used_capacity,
                available: cmd.capacity,
            });
        }

        Ok(vec![CargoEvent::CapacityResized(CapacityResized {
            ledger_id: self.id.clone(),
            capacity: cmd.capacity,
            occurred_at: cmd.occurred_at,
        })])
    }
}

fn normalize_name(name: &str) -> Result<&str, CargoError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CargoError::invalid("name cannot be empty"));
    }
    Ok(trimmed)
}

fn ensure_amount(amount: i64) -> Result<(), CargoError> {
    if amount <= 0 {
        return Err(CargoError::invalid(format!("amount must be positive (got {amount})")));
    }
    Ok(())
}

fn ensure_unit_weight(unit_weight: f64) -> Result<(), CargoError> {
    if !unit_weight.is_finite() || unit_weight < 0.0 {
        return Err(CargoError::invalid(format!(
            "unit weight must be a non-negative number (got {unit_weight})"
        )));
    }
    Ok(())
}

fn ensure_capacity(capacity: f64) -> Result<(), CargoError> {
    if !capacity.is_finite() || capacity < 0.0 {
        return Err(CargoError::invalid(format!(
            "capacity must be a non-negative number (got {capacity})"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_ledger(capacity: f64) -> CargoLedger {
        let (ledger, _) = CargoLedger::open(CargoId::generate(), "Northwind Shipping", capacity).unwrap();
        ledger
    }

    fn names(ledger: &CargoLedger) -> Vec<String> {
        ledger.items().into_iter().map(|i| i.name).collect()
    }

    #[test]
    fn open_starts_empty() {
        let ledger = test_ledger(500.0);
        assert_eq!(ledger.owner_label(), "Northwind Shipping");
        assert_eq!(ledger.capacity(), 500.0);
        assert_eq!(ledger.used_capacity(), 0.0);
        assert_eq!(ledger.available_capacity(), 500.0);
        assert!(ledger.items().is_empty());
        assert_eq!(ledger.version(), 1);
    }

    #[test]
    fn events_name_their_ledger_and_kind() {
        let id: CargoId = "hold-7".parse().unwrap();
        let (mut ledger, opened) = CargoLedger::open(id, "Harbor Co", 10.0).unwrap();
        let loaded = ledger.add_item("Rice", 2, 1.0).unwrap();
        let unloaded = ledger.remove_item("rice", 2, 1.0).unwrap();

        let kinds: Vec<&str> = opened
            .iter()
            .chain(&loaded)
            .chain(&unloaded)
            .map(|e| e.event_type())
            .collect();
        assert_eq!(kinds, vec!["cargo.ledger.opened", "cargo.item.loaded", "cargo.item.unloaded"]);
        assert!(opened.iter().chain(&loaded).all(|e| e.stream_id() == "hold-7"));
        assert!(matches!(&unloaded[0], CargoEvent::ItemUnloaded(e) if e.pruned));
    }

    #[test]
    fn open_rejects_negative_or_nan_capacity() {
        for capacity in [-1.0, f64::NAN, f64::INFINITY] {
            let err = CargoLedger::open(CargoId::generate(), "x", capacity).unwrap_err();
            assert_eq!(err.code(), "invalid_argument");
        }
    }

    #[test]
    fn add_same_name_aggregates_under_first_casing() {
        let mut ledger = test_ledger(100.0);
        ledger.add_item("Steel", 5, 2.0).unwrap();
        ledger.add_item("steel", 3, 2.0).unwrap();

        assert_eq!(ledger.items(), vec![LineItem::new("Steel", 8)]);
        assert_eq!(ledger.used_capacity(), 16.0);
    }

    #[test]
    fn items_keep_insertion_order() {
        let mut ledger = test_ledger(1000.0);
        ledger.add_item("Wheat", 1, 1.0).unwrap();
        ledger.add_item("Coal", 1, 1.0).unwrap();
        ledger.add_item("Ore", 1, 1.0).unwrap();
        ledger.add_item("wheat", 1, 1.0).unwrap();

        assert_eq!(names(&ledger), vec!["Wheat", "Coal", "Ore"]);
    }

    #[test]
    fn removing_everything_prunes_the_item() {
        let mut ledger = test_ledger(100.0);
        let before = ledger.used_capacity();
        ledger.add_item("Fuel", 10, 1.0).unwrap();

        let events = ledger.remove_item("Fuel", 10, 1.0).unwrap();

        assert!(ledger.item("Fuel").is_none());
        assert_eq!(ledger.used_capacity(), before);
        match &events[0] {
            CargoEvent::ItemUnloaded(e) => assert!(e.pruned),
            other => panic!("Expected ItemUnloaded event, got {other:?}"),
        }
    }

    #[test]
    fn capacity_rejection_leaves_state_untouched() {
        let mut ledger = test_ledger(100.0);
        ledger.add_item("Ballast", 90, 1.0).unwrap();
        let before = ledger.clone();

        let err = ledger.add_item("X", 100, 1.0).unwrap_err();

        assert!(matches!(err, CargoError::CapacityExceeded { requested, available }
            if requested == 100.0 && available == 10.0));
        assert_eq!(ledger.used_capacity(), 90.0);
        assert_eq!(ledger, before);
    }

    #[test]
    fn filling_to_exact_capacity_is_allowed() {
        let mut ledger = test_ledger(50.0);
        ledger.add_item("Sand", 25, 2.0).unwrap();
        assert_eq!(ledger.available_capacity(), 0.0);
    }

    #[test]
    fn removal_matches_case_insensitively_and_keeps_casing() {
        let mut ledger = test_ledger(100.0);
        ledger.add_item("Grain", 10, 1.0).unwrap();

        ledger.remove_item("grain", 4, 1.0).unwrap();

        assert_eq!(ledger.items(), vec![LineItem::new("Grain", 6)]);
    }

    #[test]
    fn removing_unknown_item_is_not_found() {
        let mut ledger = test_ledger(100.0);
        let err = ledger.remove_item("Nonexistent", 1, 1.0).unwrap_err();
        assert_eq!(err, CargoError::ItemNotFound("Nonexistent".to_string()));
    }

    #[test]
    fn removing_more_than_held_is_insufficient() {
        let mut ledger = test_ledger(100.0);
        ledger.add_item("Ore", 5, 1.0).unwrap();
        let before = ledger.clone();

        let err = ledger.remove_item("Ore", 6, 1.0).unwrap_err();

        assert_eq!(
            err,
            CargoError::InsufficientQuantity {
                name: "Ore".to_string(),
                held: 5,
                requested: 6,
            }
        );
        assert_eq!(ledger.item("ore").map(|i| i.amount), Some(5));
        assert_eq!(ledger, before);
    }

    #[test]
    fn malformed_arguments_are_rejected() {
        let mut ledger = test_ledger(100.0);
        ledger.add_item("Ore", 5, 1.0).unwrap();
        let before = ledger.clone();

        let attempts = [
            ledger.clone().add_item("   ", 1, 1.0),
            ledger.clone().add_item("Ore", 0, 1.0),
            ledger.clone().add_item("Ore", -3, 1.0),
            ledger.clone().add_item("Ore", 1, -0.5),
            ledger.clone().add_item("Ore", 1, f64::NAN),
            ledger.clone().remove_item("", 1, 1.0),
            ledger.clone().remove_item("Ore", 0, 1.0),
            ledger.clone().remove_item("Ore", 1, -1.0),
        ];

        for result in attempts {
            assert_eq!(result.unwrap_err().code(), "invalid_argument");
        }
        assert_eq!(ledger, before);
    }

    #[test]
    fn invalid_arguments_win_over_missing_item() {
        let mut ledger = test_ledger(100.0);
        let err = ledger.remove_item("Ghost", -1, 1.0).unwrap_err();
        assert!(matches!(err, CargoError::InvalidArgument(_)));
    }

    #[test]
    fn removal_cannot_release_more_weight_than_committed() {
        let mut ledger = test_ledger(100.0);
        ledger.add_item("Fuel", 10, 1.0).unwrap();

        let err = ledger.remove_item("Fuel", 10, 5.0).unwrap_err();

        assert!(matches!(err, CargoError::InvalidArgument(_)));
        assert_eq!(ledger.used_capacity(), 10.0);
    }

    #[test]
    fn float_residue_settles_at_zero() {
        let mut ledger = test_ledger(10.0);
        ledger.add_item("Tea", 1, 0.3).unwrap();
        ledger.add_item("Tea", 2, 0.0).unwrap();

        // 3.0 * 0.1 is a hair above 0.3 in binary floating point.
        ledger.remove_item("Tea", 3, 0.1).unwrap();

        assert_eq!(ledger.used_capacity(), 0.0);
        assert!(ledger.items().is_empty());
    }

    #[test]
    fn amount_overflow_is_rejected() {
        let mut ledger = test_ledger(1.0);
        ledger.add_item("Dust", i64::MAX, 0.0).unwrap();
        let err = ledger.add_item("dust", 1, 0.0).unwrap_err();
        assert!(matches!(err, CargoError::InvalidArgument(_)));
    }

    #[test]
    fn items_snapshot_is_detached() {
        let mut ledger = test_ledger(100.0);
        ledger.add_item("Copper", 4, 1.0).unwrap();

        let mut snapshot = ledger.items();
        snapshot[0].amount = 999;
        snapshot.push(LineItem::new("Ghost", 1));

        assert_eq!(ledger.items(), vec![LineItem::new("Copper", 4)]);
        assert_eq!(ledger.items(), ledger.items());
    }

    #[test]
    fn total_units_sums_amounts() {
        let mut ledger = test_ledger(1000.0);
        ledger.add_item("Wheat", 10, 1.0).unwrap();
        ledger.add_item("Coal", 7, 1.0).unwrap();
        assert_eq!(ledger.total_units(), 17);
    }

    #[test]
    fn wheat_end_to_end() {
        let mut ledger = test_ledger(1000.0);

        ledger.add_item("Wheat", 10, 5.0).unwrap();
        assert_eq!(ledger.used_capacity(), 50.0);

        ledger.add_item("Wheat", 5, 5.0).unwrap();
        assert_eq!(ledger.used_capacity(), 75.0);
        assert_eq!(ledger.items(), vec![LineItem::new("Wheat", 15)]);

        ledger.remove_item("Wheat", 15, 5.0).unwrap();
        assert_eq!(ledger.used_capacity(), 0.0);
        assert!(ledger.items().is_empty());
        assert_eq!(ledger.version(), 4);
    }

    #[test]
    fn relabel_replaces_owner() {
        let mut ledger = test_ledger(10.0);
        ledger.relabel_owner("Blue Star Line").unwrap();
        assert_eq!(ledger.owner_label(), "Blue Star Line");
    }

    #[test]
    fn resize_below_used_capacity_is_rejected() {
        let mut ledger = test_ledger(100.0);
        ledger.add_item("Crates", 40, 1.0).unwrap();

        let err = ledger.resize_capacity(30.0).unwrap_err();
        assert_eq!(err.code(), "capacity_exceeded");
        assert_eq!(ledger.capacity(), 100.0);

        ledger.resize_capacity(40.0).unwrap();
        assert_eq!(ledger.available_capacity(), 0.0);
    }

    #[test]
    fn commands_on_unopened_ledger_are_rejected() {
        let ledger = CargoLedger::empty(CargoId::generate());
        let err = ledger
            .handle(&CargoCommand::AddItem(AddItem {
                name: "Ore".to_string(),
                amount: 1,
                unit_weight: 1.0,
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert!(matches!(err, CargoError::InvalidArgument(_)));
    }

    #[test]
    fn reopening_is_rejected() {
        let ledger = test_ledger(10.0);
        let err = ledger
            .handle(&CargoCommand::OpenLedger(OpenLedger {
                owner_label: "again".to_string(),
                capacity: 5.0,
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert!(matches!(err, CargoError::InvalidArgument(_)));
    }

    #[test]
    fn restore_round_trips_snapshot() {
        let mut ledger = test_ledger(100.0);
        ledger.add_item("Steel", 3, 2.5).unwrap();
        ledger.add_item("Wool", 2, 1.0).unwrap();

        let restored = CargoLedger::restore(ledger.snapshot()).unwrap();
        assert_eq!(restored, ledger);
    }

    #[test]
    fn restore_rejects_broken_snapshots() {
        let id = CargoId::generate();
        let base = LedgerSnapshot {
            id: id.clone(),
            owner_label: "x".to_string(),
            capacity: 10.0,
            used_capacity: 5.0,
            items: vec![LineItem::new("Ore", 5)],
            version: 2,
        };

        let over = LedgerSnapshot { used_capacity: 11.0, ..base.clone() };
        let zero_amount = LedgerSnapshot { items: vec![LineItem::new("Ore", 0)], ..base.clone() };
        let duplicate = LedgerSnapshot {
            items: vec![LineItem::new("Ore", 1), LineItem::new("ORE", 1)],
            ..base.clone()
        };
        let unopened = LedgerSnapshot { version: 0, ..base.clone() };

        for snapshot in [over, zero_amount, duplicate, unopened] {
            assert!(matches!(CargoLedger::restore(snapshot), Err(CargoError::InvalidArgument(_))));
        }
        assert!(CargoLedger::restore(base).is_ok());
    }

    #[test]
    fn cargo_id_rejects_blank_and_trims() {
        assert!("  ".parse::<CargoId>().is_err());
        assert_eq!(" hold-7 ".parse::<CargoId>().unwrap().as_str(), "hold-7");
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add(usize, i64, f64),
        Remove(usize, i64, f64),
    }

    const NAMES: [&str; 4] = ["Steel", "steel", "Grain", "Ore"];

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0..NAMES.len(), 1i64..40, 0.0f64..10.0).prop_map(|(n, a, w)| Op::Add(n, a, w)),
            (0..NAMES.len(), 1i64..40, 0.0f64..10.0).prop_map(|(n, a, w)| Op::Remove(n, a, w)),
        ]
    }

    fn run(ledger: &mut CargoLedger, op: &Op) -> Result<Vec<CargoEvent>, CargoError> {
        match *op {
            Op::Add(n, amount, weight) => ledger.add_item(NAMES[n], amount, weight),
            Op::Remove(n, amount, weight) => ledger.remove_item(NAMES[n], amount, weight),
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: after any operation, 0 <= used <= capacity, item names are
        /// unique and amounts positive; rejected operations change nothing.
        #[test]
        fn invariants_hold_for_any_operation_sequence(
            capacity in 0.0f64..2_000.0,
            ops in prop::collection::vec(op_strategy(), 1..60)
        ) {
            let mut ledger = test_ledger(capacity);

            for op in &ops {
                let before = ledger.clone();
                if run(&mut ledger, op).is_err() {
                    prop_assert_eq!(&ledger, &before);
                }

                prop_assert!(ledger.used_capacity() >= 0.0);
                prop_assert!(ledger.used_capacity() <= ledger.capacity());

                let items = ledger.items();
                for (i, a) in items.iter().enumerate() {
                    prop_assert!(a.amount > 0);
                    for b in &items[i + 1..] {
                        prop_assert!(!a.matches(&b.name));
                    }
                }
            }
        }

        /// Property: replaying the emitted events from an empty ledger
        /// reproduces the live ledger exactly.
        #[test]
        fn replaying_events_rebuilds_state(
            ops in prop::collection::vec(op_strategy(), 1..60)
        ) {
            let id = CargoId::generate();
            let (mut ledger, mut history) = CargoLedger::open(id.clone(), "Replay", 1_500.0).unwrap();

            for op in &ops {
                if let Ok(events) = run(&mut ledger, op) {
                    history.extend(events);
                }
            }

            let mut replayed = CargoLedger::empty(id);
            for event in &history {
                replayed.apply(event);
            }
            prop_assert_eq!(replayed, ledger);
        }
    }
}
