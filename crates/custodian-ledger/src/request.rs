use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use custodian_types::{ActionType, EntryCandidate, Metadata, MetadataValue};

use crate::config::LedgerConfig;
use crate::error::{LedgerError, LedgerResult};

/// One state-changing action to be recorded.
///
/// The per-category constructors fill in `action_type` and the conventional
/// `tab_source` for that part of the dashboard.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub action_type: ActionType,
    pub action: String,
    pub target: String,
    pub details: String,
    pub user_id: String,
    #[serde(default)]
    pub smart_id: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
    pub tab_source: String,
}

impl ActionRequest {
    pub fn new(
        action_type: ActionType,
        action: impl Into<String>,
        target: impl Into<String>,
        details: impl Into<String>,
        user_id: impl Into<String>,
        tab_source: impl Into<String>,
    ) -> Self {
        Self {
            action_type,
            action: action.into(),
            target: target.into(),
            details: details.into(),
            user_id: user_id.into(),
            smart_id: None,
            metadata: Metadata::new(),
            tab_source: tab_source.into(),
        }
    }

    /// Request filed under the conventional tab for `action_type`.
    pub fn categorized(
        action_type: ActionType,
        action: impl Into<String>,
        target: impl Into<String>,
        details: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self::new(
            action_type,
            action,
            target,
            details,
            user_id,
            conventional_tab(action_type),
        )
    }

    pub fn module(
        action: impl Into<String>,
        module_name: impl Into<String>,
        details: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self::categorized(ActionType::Module, action, module_name, details, user_id)
    }

    pub fn node(
        action: impl Into<String>,
        node_name: impl Into<String>,
        details: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self::categorized(ActionType::Node, action, node_name, details, user_id)
    }

    pub fn domain(
        action: impl Into<String>,
        domain_name: impl Into<String>,
        details: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self::categorized(ActionType::Domain, action, domain_name, details, user_id)
    }

    pub fn equipment(
        action: impl Into<String>,
        equipment_name: impl Into<String>,
        details: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self::categorized(ActionType::Equipment, action, equipment_name, details, user_id)
    }

    pub fn hub(
        action: impl Into<String>,
        hub_name: impl Into<String>,
        details: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self::categorized(ActionType::Hub, action, hub_name, details, user_id)
    }

    /// User management action; `target_user` is the account acted upon.
    pub fn user(
        action: impl Into<String>,
        target_user: impl Into<String>,
        details: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self::categorized(ActionType::User, action, target_user, details, user_id)
    }

    /// System-level action, attributed to the `system` user.
    pub fn system(
        action: impl Into<String>,
        component: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self::categorized(ActionType::System, action, component, details, "system")
    }

    pub fn with_smart_id(mut self, smart_id: impl Into<String>) -> Self {
        self.smart_id = Some(smart_id.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    pub fn with_tab_source(mut self, tab_source: impl Into<String>) -> Self {
        self.tab_source = tab_source.into();
        self
    }

    /// Check required fields and limits. Performs no I/O.
    pub fn validate(&self, config: &LedgerConfig) -> LedgerResult<()> {
        let limit = config.max_field_len;
        required("action", &self.action, limit)?;
        required("target", &self.target, limit)?;
        required("user_id", &self.user_id, limit)?;
        required("tab_source", &self.tab_source, limit)?;
        bounded("details", &self.details, limit)?;
        if let Some(smart_id) = &self.smart_id {
            bounded("smart_id", smart_id, limit)?;
        }

        if self.metadata.len() > config.max_metadata_entries {
            return Err(LedgerError::validation(
                "metadata",
                format!(
                    "{} entries exceeds limit of {}",
                    self.metadata.len(),
                    config.max_metadata_entries
                ),
            ));
        }
        for (key, value) in &self.metadata {
            if key.trim().is_empty() {
                return Err(LedgerError::validation("metadata", "keys must not be empty"));
            }
            bounded("metadata", key, limit)?;
            if let MetadataValue::Text(text) = value {
                bounded("metadata", text, limit)?;
            }
        }
        Ok(())
    }

    pub(crate) fn into_candidate(self, timestamp: DateTime<Utc>) -> EntryCandidate {
        EntryCandidate {
            timestamp,
            action_type: self.action_type,
            action: self.action,
            target: self.target,
            details: self.details,
            user_id: self.user_id,
            smart_id: self.smart_id,
            metadata: self.metadata,
            tab_source: self.tab_source,
        }
    }
}

/// Tab of the dashboard where actions of a category originate.
pub fn conventional_tab(action_type: ActionType) -> &'static str {
    match action_type {
        ActionType::Module => "modules",
        ActionType::Domain => "domains",
        ActionType::Node => "nodes",
        ActionType::Hub => "hubs",
        ActionType::Equipment => "equipment",
        ActionType::System => "system",
        ActionType::User => "users",
    }
}

fn required(field: &'static str, value: &str, limit: usize) -> LedgerResult<()> {
    if value.trim().is_empty() {
        return Err(LedgerError::validation(field, "must not be empty"));
    }
    bounded(field, value, limit)
}

fn bounded(field: &'static str, value: &str, limit: usize) -> LedgerResult<()> {
    if value.len() > limit {
        return Err(LedgerError::validation(
            field,
            format!("{} bytes exceeds limit of {limit}", value.len()),
        ));
    }
    Ok(())
}
