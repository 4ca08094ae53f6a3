use serde::{Deserialize, Serialize};

/// Tunables of the editing session.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct EditorConfig {
    /// Tag written next to the autosaved draft. A draft carrying another tag is discarded.
    pub schema_version: String,
    pub history_limit: usize,
    pub snapshot_limit: usize,
    /// Characters of stripped text kept as snapshot preview.
    pub preview_chars: usize,
    /// Characters kept when a snapshot name falls back to body text.
    pub name_fallback_chars: usize,
    /// Upper bound (bytes) of the content kept in a slim snapshot record.
    pub slim_content_limit: usize,
    /// Images above this encoded size are downscaled before insertion.
    pub image_max_bytes: usize,
    pub image_max_dimension: u32,
    pub image_quality: u8,
    pub min_image_dimension: u32,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            schema_version: "3".to_string(),
            history_limit: 50,
            snapshot_limit: 200,
            preview_chars: 150,
            name_fallback_chars: 80,
            slim_content_limit: 50_000,
            image_max_bytes: 1_500_000,
            image_max_dimension: 1600,
            image_quality: 85,
            min_image_dimension: 20,
        }
    }
}

impl EditorConfig {
    /// Defaults, overridden by `window.ENV` when the page defines it.
    ///
    /// Both `SCHEMA_VERSION` and `schema_version` spellings are accepted, same for
    /// `HISTORY_LIMIT` and `SNAPSHOT_LIMIT`.
    #[cfg(target_arch = "wasm32")]
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        let Some(env) = web_sys::window().and_then(|w| w.get("ENV")) else {
            return cfg;
        };
        if env.is_undefined() || !env.is_object() {
            return cfg;
        }

        let read = |upper: &str| -> Option<wasm_bindgen::JsValue> {
            [upper.to_string(), upper.to_lowercase()]
                .iter()
                .filter_map(|k| js_sys::Reflect::get(&env, &k.as_str().into()).ok())
                .find(|v| !v.is_undefined() && !v.is_null())
        };

        if let Some(v) = read("SCHEMA_VERSION") {
            if let Some(s) = v.as_string() {
                cfg.schema_version = s;
            } else if let Some(n) = v.as_f64() {
                cfg.schema_version = n.to_string();
            }
        }
        if let Some(n) = read("HISTORY_LIMIT").and_then(|v| v.as_f64()) {
            cfg.history_limit = (n as usize).max(1);
        }
        if let Some(n) = read("SNAPSHOT_LIMIT").and_then(|v| v.as_f64()) {
            cfg.snapshot_limit = (n as usize).max(1);
        }

        log::debug!("editor config: {cfg:?}");
        cfg
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_env() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_limits() {
        let c = EditorConfig::default();
        assert_eq!(c.history_limit, 50);
        assert_eq!(c.snapshot_limit, 200);
        assert_eq!(c.preview_chars, 150);
        assert_eq!(c.name_fallback_chars, 80);
        assert_eq!(c.min_image_dimension, 20);
    }

    #[test]
    fn test_from_env_outside_browser_is_default() {
        assert_eq!(EditorConfig::from_env(), EditorConfig::default());
    }
}
