use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use labstock_core::{Aggregate, AggregateRoot, DomainError, Event, UserId, aggregate_id};
use labstock_inventory::InventoryItemId;

aggregate_id!(
    /// Kit identifier.
    KitId
);

/// One BOM line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KitComponent {
    pub item_id: InventoryItemId,
    pub quantity_per_kit: u64,
}

/// Aggregate root: Kit.
///
/// # Invariants
/// - `in_circulation == issued_total - returned_total`, never negative.
/// - BOM lines are fixed at definition; the only later change is removal of
///   a line whose item was deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kit {
    id: KitId,
    kit_ref: String,
    name: String,
    description: String,
    creator: UserId,
    created_at: DateTime<Utc>,
    components: Vec<KitComponent>,
    in_circulation: u64,
    issued_total: u64,
    returned_total: u64,
    version: u64,
    created: bool,
}

impl Kit {
    pub fn empty(id: KitId) -> Self {
        Self {
            id,
            kit_ref: String::new(),
            name: String::new(),
            description: String::new(),
            creator: UserId::default(),
            created_at: DateTime::<Utc>::default(),
            components: Vec::new(),
            in_circulation: 0,
            issued_total: 0,
            returned_total: 0,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> KitId {
        self.id
    }

    pub fn kit_ref(&self) -> &str {
        &self.kit_ref
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn creator(&self) -> UserId {
        self.creator
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn components(&self) -> &[KitComponent] {
        &self.components
    }

    pub fn in_circulation(&self) -> u64 {
        self.in_circulation
    }

    pub fn issued_total(&self) -> u64 {
        self.issued_total
    }

    pub fn returned_total(&self) -> u64 {
        self.returned_total
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    pub fn references(&self, item_id: InventoryItemId) -> bool {
        self.components.iter().any(|c| c.item_id == item_id)
    }
}

impl AggregateRoot for Kit {
    type Id = KitId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Issue note attached to every component draw.
pub fn issue_note(count: u64, kit_ref: &str, note: &str) -> String {
    format!("Kit Issue: {count}x {kit_ref} - {note}")
}

pub fn return_note(count: u64, kit_ref: &str, note: &str) -> String {
    format!("Kit Return: {count}x {kit_ref} - {note}")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefineKit {
    pub kit_id: KitId,
    pub kit_ref: String,
    pub name: String,
    pub description: String,
    pub creator: UserId,
    pub components: Vec<KitComponent>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueKits {
    pub kit_id: KitId,
    pub count: u64,
    pub actor: UserId,
    pub note: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnKits {
    pub kit_id: KitId,
    pub count: u64,
    pub actor: UserId,
    pub note: String,
    pub occurred_at: DateTime<Utc>,
}

/// Remove every BOM line for a deleted item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropComponent {
    pub kit_id: KitId,
    pub item_id: InventoryItemId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum KitCommand {
    DefineKit(DefineKit),
    IssueKits(IssueKits),
    ReturnKits(ReturnKits),
    DropComponent(DropComponent),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KitDefined {
    pub kit_id: KitId,
    pub kit_ref: String,
    pub name: String,
    pub description: String,
    pub creator: UserId,
    pub components: Vec<KitComponent>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KitsIssued {
    pub kit_id: KitId,
    pub count: u64,
    pub actor: UserId,
    pub note: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KitsReturned {
    pub kit_id: KitId,
    pub count: u64,
    pub actor: UserId,
    pub note: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentDropped {
    pub kit_id: KitId,
    pub item_id: InventoryItemId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum KitEvent {
    KitDefined(KitDefined),
    KitsIssued(KitsIssued),
    KitsReturned(KitsReturned),
    ComponentDropped(ComponentDropped),
}

impl Event for KitEvent {
    fn event_type(&self) -> &'static str {
        match self {
            KitEvent::KitDefined(_) => "kits.kit.defined",
            KitEvent::KitsIssued(_) => "kits.kit.issued",
            KitEvent::KitsReturned(_) => "kits.kit.returned",
            KitEvent::ComponentDropped(_) => "kits.kit.component_dropped",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            KitEvent::KitDefined(e) => e.occurred_at,
            KitEvent::KitsIssued(e) => e.occurred_at,
            KitEvent::KitsReturned(e) => e.occurred_at,
            KitEvent::ComponentDropped(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Kit {
    type Command = KitCommand;
    type Event = KitEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            KitEvent::KitDefined(e) => {
                self.id = e.kit_id;
                self.kit_ref = e.kit_ref.clone();
                self.name = e.name.clone();
                self.description = e.description.clone();
                self.creator = e.creator;
                self.created_at = e.occurred_at;
                self.components = e.components.clone();
                self.in_circulation = 0;
                self.created = true;
            }
            KitEvent::KitsIssued(e) => {
                self.in_circulation += e.count;
                self.issued_total += e.count;
            }
            KitEvent::KitsReturned(e) => {
                self.in_circulation -= e.count;
                self.returned_total += e.count;
            }
            KitEvent::ComponentDropped(e) => {
                self.components.retain(|c| c.item_id != e.item_id);
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            KitCommand::DefineKit(cmd) => self.handle_define(cmd),
            KitCommand::IssueKits(cmd) => self.handle_issue(cmd),
            KitCommand::ReturnKits(cmd) => self.handle_return(cmd),
            KitCommand::DropComponent(cmd) => self.handle_drop(cmd),
        }
    }
}

impl Kit {
    fn ensure_created(&self) -> Result<(), DomainError> {
        if !self.is_created() {
            return Err(DomainError::not_found("kit", self.id));
        }
        Ok(())
    }

    fn ensure_kit_id(&self, kit_id: KitId) -> Result<(), DomainError> {
        if self.id != kit_id {
            return Err(DomainError::invariant("kit_id mismatch"));
        }
        Ok(())
    }

    fn handle_define(&self, cmd: &DefineKit) -> Result<Vec<KitEvent>, DomainError> {
        if self.is_created() {
            return Err(DomainError::conflict("kit already exists"));
        }
        self.ensure_kit_id(cmd.kit_id)?;

        let name = cmd.name.trim();
        if name.is_empty() {
            return Err(DomainError::invalid("kit name cannot be empty"));
        }
        if cmd.kit_ref.trim().is_empty() {
            return Err(DomainError::invariant("kit_ref must be allocated before definition"));
        }
        if cmd.components.is_empty() {
            return Err(DomainError::invalid("a kit needs at least one component"));
        }
        if let Some(line) = cmd.components.iter().find(|c| c.quantity_per_kit == 0) {
            return Err(DomainError::invalid(format!(
                "quantity per kit must be positive (item {})",
                line.item_id
            )));
        }

        Ok(vec![KitEvent::KitDefined(KitDefined {
            kit_id: cmd.kit_id,
            kit_ref: cmd.kit_ref.trim().to_string(),
            name: name.to_string(),
            description: cmd.description.trim().to_string(),
            creator: cmd.creator,
            components: cmd.components.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_issue(&self, cmd: &IssueKits) -> Result<Vec<KitEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_kit_id(cmd.kit_id)?;

        if cmd.count == 0 {
            return Err(DomainError::invalid("kit count must be positive"));
        }
        if self.components.is_empty() {
            return Err(DomainError::invalid(format!(
                "kit {} has no remaining components",
                self.kit_ref
            )));
        }
        if self.issued_total.checked_add(cmd.count).is_none() {
            return Err(DomainError::invalid("kit count overflow"));
        }

        Ok(vec![KitEvent::KitsIssued(KitsIssued {
            kit_id: cmd.kit_id,
            count: cmd.count,
            actor: cmd.actor,
            note: cmd.note.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_return(&self, cmd: &ReturnKits) -> Result<Vec<KitEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_kit_id(cmd.kit_id)?;

        if cmd.count == 0 {
            return Err(DomainError::invalid("kit count must be positive"));
        }
        if cmd.count > self.in_circulation {
            return Err(DomainError::invalid(format!(
                "cannot return {} of kit {}: only {} in circulation",
                cmd.count, self.kit_ref, self.in_circulation
            )));
        }

        Ok(vec![KitEvent::KitsReturned(KitsReturned {
            kit_id: cmd.kit_id,
            count: cmd.count,
            actor: cmd.actor,
            note: cmd.note.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_drop(&self, cmd: &DropComponent) -> Result<Vec<KitEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_kit_id(cmd.kit_id)?;

        if self.in_circulation > 0 {
            return Err(DomainError::invalid(format!(
                "kit {} has {} in circulation",
                self.kit_ref, self.in_circulation
            )));
        }
        if !self.references(cmd.item_id) {
            return Ok(vec![]);
        }

        Ok(vec![KitEvent::ComponentDropped(ComponentDropped {
            kit_id: cmd.kit_id,
            item_id: cmd.item_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}
