//! Module settings: raw JSON records gated by an `enabled` flag.
//!
//! Each module owns an opaque record in the settings tree; the store itself
//! only ever reads the boolean `enabled` field. Modules get typed access
//! through a lenient loader that falls back to `T::default()` when the
//! record is missing, so a module can exist without a settings section.

use std::collections::HashMap;

use figment::Figment;
use figment::providers::Serialized;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Errors from settings layering and typed access.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// A record exists but cannot be deserialized as the requested type.
    #[error("invalid settings for module '{module}'")]
    Invalid {
        module: String,
        #[source]
        source: serde_json::Error,
    },

    /// The defaults/user layers could not be merged into a settings tree.
    #[error("failed to merge settings layers")]
    Merge {
        #[source]
        source: Box<figment::Error>,
    },
}

/// Per-module settings records, keyed by module name.
pub(crate) struct SettingsStore {
    records: RwLock<HashMap<String, Value>>,
}

impl SettingsStore {
    pub(crate) fn new(records: HashMap<String, Value>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    /// Replace the record for `module` wholesale (no merge).
    pub(crate) fn configure(&self, module: &str, record: Value) {
        self.records.write().insert(module.to_owned(), record);
    }

    /// Clone of the raw record, if one was configured.
    pub(crate) fn record(&self, module: &str) -> Option<Value> {
        self.records.read().get(module).cloned()
    }

    /// The sole gating rule: a record exists and its `enabled` field is
    /// boolean `true`. Absent records, absent flags and non-boolean flags
    /// all gate the module off.
    pub(crate) fn is_enabled(&self, module: &str) -> bool {
        self.records
            .read()
            .get(module)
            .and_then(|record| record.get("enabled"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Lenient typed access: missing record or non-object record yields
    /// `T::default()`; a present record that does not deserialize is an
    /// error.
    pub(crate) fn typed_or_default<T>(&self, module: &str) -> Result<T, SettingsError>
    where
        T: DeserializeOwned + Default,
    {
        let Some(record) = self.record(module) else {
            return Ok(T::default());
        };
        if !record.is_object() {
            return Ok(T::default());
        }
        serde_json::from_value(record).map_err(|e| SettingsError::Invalid {
            module: module.to_owned(),
            source: e,
        })
    }
}

/// Deep-merge `overrides` on top of `defaults` into a settings tree.
///
/// Dictionaries merge recursively, scalar conflicts resolve in favor of the
/// override layer, sibling keys survive untouched.
pub(crate) fn merge_layers(
    defaults: Value,
    overrides: Value,
) -> Result<HashMap<String, Value>, SettingsError> {
    Figment::new()
        .merge(Serialized::defaults(defaults))
        .merge(Serialized::defaults(overrides))
        .extract()
        .map_err(|e| SettingsError::Merge {
            source: Box::new(e),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    fn store(tree: Value) -> SettingsStore {
        let records = merge_layers(tree, json!({})).unwrap();
        SettingsStore::new(records)
    }

    #[derive(Debug, PartialEq, Deserialize, Default)]
    struct ChatControlsSettings {
        #[serde(default)]
        enabled: bool,
        #[serde(default)]
        afk_button: bool,
        #[serde(default)]
        clear_chat_button: bool,
    }

    #[test]
    fn unconfigured_module_is_not_enabled() {
        let store = store(json!({}));
        assert!(!store.is_enabled("smiles"));
    }

    #[test]
    fn enabled_flag_gates_the_module() {
        let store = store(json!({
            "smiles": {"enabled": true},
            "favouritePictures": {"enabled": false},
            "motd": {}
        }));

        assert!(store.is_enabled("smiles"));
        assert!(!store.is_enabled("favouritePictures"));
        assert!(!store.is_enabled("motd"));
    }

    #[test]
    fn non_boolean_enabled_gates_off() {
        let store = store(json!({"smiles": {"enabled": "yes"}}));
        assert!(!store.is_enabled("smiles"));
    }

    #[test]
    fn configure_replaces_the_record_wholesale() {
        let store = store(json!({"smiles": {"enabled": true, "columns": 4}}));

        store.configure("smiles", json!({"enabled": false}));

        assert!(!store.is_enabled("smiles"));
        // The previous record's sibling key is gone, not merged.
        assert_eq!(store.record("smiles"), Some(json!({"enabled": false})));
    }

    #[test]
    fn typed_access_parses_the_record() {
        let store = store(json!({
            "chatControls": {
                "enabled": true,
                "afk_button": true,
                "clear_chat_button": false
            }
        }));

        let settings: ChatControlsSettings = store.typed_or_default("chatControls").unwrap();
        assert!(settings.enabled);
        assert!(settings.afk_button);
        assert!(!settings.clear_chat_button);
    }

    #[test]
    fn typed_access_defaults_for_missing_record() {
        let store = store(json!({}));

        let settings: ChatControlsSettings = store.typed_or_default("chatControls").unwrap();
        assert_eq!(settings, ChatControlsSettings::default());
    }

    #[test]
    fn typed_access_rejects_malformed_record() {
        let store = store(json!({"chatControls": {"afk_button": "sometimes"}}));

        let result: Result<ChatControlsSettings, _> = store.typed_or_default("chatControls");
        assert!(matches!(result, Err(SettingsError::Invalid { .. })));
    }

    #[test]
    fn merge_overrides_win_and_siblings_survive() {
        let merged = merge_layers(
            json!({
                "videoControls": {
                    "enabled": true,
                    "selectQualityOption": true,
                    "expandPlaylistOption": true
                },
                "smiles": {"enabled": true}
            }),
            json!({
                "videoControls": {"enabled": false}
            }),
        )
        .unwrap();

        assert_eq!(merged["videoControls"]["enabled"], json!(false));
        assert_eq!(merged["videoControls"]["selectQualityOption"], json!(true));
        assert_eq!(merged["videoControls"]["expandPlaylistOption"], json!(true));
        assert_eq!(merged["smiles"]["enabled"], json!(true));
    }

    #[test]
    fn merge_keeps_array_values_intact() {
        let merged = merge_layers(
            json!({"additionalChatCommands": {"enabled": true}}),
            json!({"additionalChatCommands": {"additionalPermittedCommands": ["*"]}}),
        )
        .unwrap();

        assert_eq!(
            merged["additionalChatCommands"]["additionalPermittedCommands"],
            json!(["*"])
        );
        assert_eq!(merged["additionalChatCommands"]["enabled"], json!(true));
    }
}
