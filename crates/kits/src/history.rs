//! Append-only kit circulation history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use labstock_core::{AggregateId, UserId};

use crate::kit::{KitEvent, KitId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KitAction {
    Issue,
    Return,
}

/// One issue or return, counted in kits (not components).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KitEventRecord {
    pub id: AggregateId,
    pub kit_id: KitId,
    pub kit_ref: String,
    pub action: KitAction,
    pub actor: UserId,
    pub qty_changed: u64,
    pub occurred_at: DateTime<Utc>,
    pub note: String,
}

impl KitEventRecord {
    pub fn from_event(event: &KitEvent, kit_ref: &str) -> Option<KitEventRecord> {
        let (kit_id, action, actor, count, occurred_at, note) = match event {
            KitEvent::KitsIssued(e) => {
                (e.kit_id, KitAction::Issue, e.actor, e.count, e.occurred_at, &e.note)
            }
            KitEvent::KitsReturned(e) => {
                (e.kit_id, KitAction::Return, e.actor, e.count, e.occurred_at, &e.note)
            }
            KitEvent::KitDefined(_) | KitEvent::ComponentDropped(_) => return None,
        };

        Some(KitEventRecord {
            id: AggregateId::new(),
            kit_id,
            kit_ref: kit_ref.to_string(),
            action,
            actor,
            qty_changed: count,
            occurred_at,
            note: note.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kit::KitsReturned;

    #[test]
    fn returns_are_recorded_in_kits() {
        let event = KitEvent::KitsReturned(KitsReturned {
            kit_id: KitId::new(),
            count: 2,
            actor: UserId::new(),
            note: "end of term".to_string(),
            occurred_at: Utc::now(),
        });
        let record = KitEventRecord::from_event(&event, "KIT-1").unwrap();
        assert_eq!(record.action, KitAction::Return);
        assert_eq!(record.qty_changed, 2);
        assert_eq!(record.kit_ref, "KIT-1");
    }
}
