use rolegate_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};

use crate::{HistoryEntry, ItemId, Lifecycle, Provenance};

/// Name prefix of wildcard items granting every path for one HTTP method.
pub const ADMIN_ITEM_PREFIX: &str = "admin:";

/// HTTP methods an item may protect.
pub const HTTP_METHODS: [&str; 7] = ["GET", "POST", "PUT", "DELETE", "PATCH", "OPTIONS", "HEAD"];

/// Returns the wildcard item name for an HTTP method, for example `admin:GET`.
#[must_use]
pub fn admin_item_name(method: &str) -> String {
    format!("{ADMIN_ITEM_PREFIX}{}", method.trim().to_ascii_uppercase())
}

/// Input payload for item create and update operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemInput {
    /// Unique human key.
    pub name: String,
    /// HTTP method of the protected operation.
    pub method: String,
    /// Path pattern of the protected operation; `*` matches one segment.
    pub path: String,
    /// Optional resource tag.
    pub resource: Option<String>,
    /// Optional menu label for UI affordances.
    pub menu: Option<String>,
    /// Optional button label for UI affordances.
    pub button: Option<String>,
}

struct ValidItem {
    name: NonEmptyString,
    method: String,
    path: String,
    resource: Option<String>,
    menu: Option<String>,
    button: Option<String>,
}

impl ItemInput {
    fn validate(self) -> AppResult<ValidItem> {
        let name = NonEmptyString::new(self.name)
            .map_err(|_| AppError::Validation("item name is required".to_owned()))?;
        let method = self.method.trim().to_ascii_uppercase();
        let path = self.path.trim().to_owned();
        let menu = non_blank(self.menu);
        let button = non_blank(self.button);

        if !method.is_empty() && !HTTP_METHODS.contains(&method.as_str()) {
            return Err(AppError::Validation(format!(
                "unsupported item method '{method}'"
            )));
        }

        if !path.is_empty() && !path.starts_with('/') && path != "*" {
            return Err(AppError::Validation(format!(
                "item path '{path}' must start with '/'"
            )));
        }

        let is_api_item = !method.is_empty() && !path.is_empty();
        let is_ui_item = menu.is_some() || button.is_some();
        if !is_api_item && !is_ui_item {
            return Err(AppError::Validation(
                "item requires a method and path, or a menu or button label".to_owned(),
            ));
        }

        Ok(ValidItem {
            name,
            method,
            path,
            resource: non_blank(self.resource),
            menu,
            button,
        })
    }
}

/// Atomic permission unit: one protected operation or UI affordance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    id: ItemId,
    name: String,
    #[serde(default)]
    method: String,
    #[serde(default)]
    path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    resource: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    menu: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    button: Option<String>,
    #[serde(flatten)]
    lifecycle: Lifecycle,
}

impl Item {
    /// Creates a validated item whose history starts with `created`.
    pub fn new(
        id: ItemId,
        input: ItemInput,
        provenance: Provenance,
        created: HistoryEntry,
    ) -> AppResult<Self> {
        let valid = input.validate()?;

        Ok(Self {
            id,
            name: valid.name.into(),
            method: valid.method,
            path: valid.path,
            resource: valid.resource,
            menu: valid.menu,
            button: valid.button,
            lifecycle: Lifecycle::new(provenance, created),
        })
    }

    /// Returns the item id.
    #[must_use]
    pub fn id(&self) -> &ItemId {
        &self.id
    }

    /// Returns the unique item name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the HTTP method, empty for UI-only items.
    #[must_use]
    pub fn method(&self) -> &str {
        self.method.as_str()
    }

    /// Returns the path pattern, empty for UI-only items.
    #[must_use]
    pub fn path(&self) -> &str {
        self.path.as_str()
    }

    /// Returns the resource tag.
    #[must_use]
    pub fn resource(&self) -> Option<&str> {
        self.resource.as_deref()
    }

    /// Returns the menu label.
    #[must_use]
    pub fn menu(&self) -> Option<&str> {
        self.menu.as_deref()
    }

    /// Returns the button label.
    #[must_use]
    pub fn button(&self) -> Option<&str> {
        self.button.as_deref()
    }

    /// Returns lifecycle state.
    #[must_use]
    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// Returns mutable lifecycle state.
    pub fn lifecycle_mut(&mut self) -> &mut Lifecycle {
        &mut self.lifecycle
    }

    /// Replaces the descriptive fields and records one history entry.
    pub fn apply_update(&mut self, input: ItemInput, entry: HistoryEntry) -> AppResult<()> {
        self.lifecycle.ensure_active("item")?;
        let valid = input.validate()?;

        self.name = valid.name.into();
        self.method = valid.method;
        self.path = valid.path;
        self.resource = valid.resource;
        self.menu = valid.menu;
        self.button = valid.button;
        self.lifecycle.record(entry);
        Ok(())
    }

    /// Returns the method this item grants on every path, if it is a wildcard item.
    ///
    /// Deleted items and items whose `admin:` suffix disagrees with their own
    /// method are not wildcards.
    #[must_use]
    pub fn wildcard_method(&self) -> Option<&str> {
        if self.lifecycle.is_deleted() || self.method.is_empty() {
            return None;
        }

        self.name
            .strip_prefix(ADMIN_ITEM_PREFIX)
            .filter(|suffix| suffix.eq_ignore_ascii_case(self.method.as_str()))
            .map(|_| self.method.as_str())
    }

    /// Returns whether this item authorizes a request for `method` on `path`.
    ///
    /// Deleted items never match. `admin:<METHOD>` items match every path for
    /// their method; other items compare paths segment by segment, where `*`
    /// matches exactly one segment.
    #[must_use]
    pub fn grants(&self, method: &str, path: &str) -> bool {
        self.grants_segments(method, path.trim().trim_end_matches('/').split('/'))
    }

    /// Same as [`Item::grants`] for a request already split into segments.
    ///
    /// A segment may itself contain `/`; it is still compared as one segment.
    #[must_use]
    pub fn grants_segments<'a>(
        &self,
        method: &str,
        segments: impl IntoIterator<Item = &'a str>,
    ) -> bool {
        if self.lifecycle.is_deleted() || self.method.is_empty() {
            return false;
        }

        if !self.method.eq_ignore_ascii_case(method.trim()) {
            return false;
        }

        if let Some(wildcard_method) = self.name.strip_prefix(ADMIN_ITEM_PREFIX) {
            return wildcard_method.eq_ignore_ascii_case(method.trim());
        }

        segments_match(self.path.as_str(), segments)
    }
}

fn segments_match<'a>(pattern: &str, segments: impl IntoIterator<Item = &'a str>) -> bool {
    let mut pattern_segments = pattern.trim_end_matches('/').split('/');
    let mut path_segments = segments.into_iter();

    loop {
        match (pattern_segments.next(), path_segments.next()) {
            (None, None) => return true,
            (Some("*"), Some(actual)) if !actual.is_empty() => {}
            (Some(expected), Some(actual)) if expected != "*" && expected == actual => {}
            _ => return false,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}
