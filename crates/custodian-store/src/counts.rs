use serde::{Deserialize, Serialize};

use custodian_types::{ActionType, LedgerEntry};

/// Number of entries per action category.
///
/// Field names are plural so the JSON form reads
/// `{"modules": 0, "nodes": 1, ..., "total": 1}`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCounts {
    pub modules: u64,
    pub domains: u64,
    pub nodes: u64,
    pub hubs: u64,
    pub equipment: u64,
    pub systems: u64,
    pub users: u64,
    pub total: u64,
}

impl CategoryCounts {
    /// Count a scan of entries.
    pub fn from_entries<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = &'a LedgerEntry>,
    {
        let mut counts = Self::default();
        for entry in entries {
            counts.record(entry.action_type);
        }
        counts
    }

    /// Count one more entry of the given category.
    pub fn record(&mut self, action_type: ActionType) {
        *self.slot_mut(action_type) += 1;
        self.total += 1;
    }

    pub fn get(&self, action_type: ActionType) -> u64 {
        match action_type {
            ActionType::Module => self.modules,
            ActionType::Domain => self.domains,
            ActionType::Node => self.nodes,
            ActionType::Hub => self.hubs,
            ActionType::Equipment => self.equipment,
            ActionType::System => self.systems,
            ActionType::User => self.users,
        }
    }

    /// Per-category counts in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (ActionType, u64)> + '_ {
        ActionType::ALL.iter().map(move |t| (*t, self.get(*t)))
    }

    fn slot_mut(&mut self, action_type: ActionType) -> &mut u64 {
        match action_type {
            ActionType::Module => &mut self.modules,
            ActionType::Domain => &mut self.domains,
            ActionType::Node => &mut self.nodes,
            ActionType::Hub => &mut self.hubs,
            ActionType::Equipment => &mut self.equipment,
            ActionType::System => &mut self.systems,
            ActionType::User => &mut self.users,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_bumps_category_and_total() {
        let mut counts = CategoryCounts::default();
        counts.record(ActionType::Node);
        counts.record(ActionType::Node);
        counts.record(ActionType::Equipment);
        assert_eq!(counts.nodes, 2);
        assert_eq!(counts.equipment, 1);
        assert_eq!(counts.total, 3);
        assert_eq!(counts.iter().map(|(_, n)| n).sum::<u64>(), counts.total);
    }

    #[test]
    fn json_uses_plural_names() {
        let mut counts = CategoryCounts::default();
        counts.record(ActionType::Node);
        let json = serde_json::to_value(counts).unwrap();
        assert_eq!(json["nodes"], 1);
        assert_eq!(json["modules"], 0);
        assert_eq!(json["total"], 1);
    }
}
