// Hookmap Policy Module
// Named toggles that decide which devices are hooked and how indicators behave

use std::path::{Path, PathBuf};

use strum::{EnumCount, IntoEnumIterator};
use strum_macros::{AsRefStr, Display, EnumCount as EnumCountMacro, EnumIter, EnumString};

/// A named policy toggle.
///
/// Toggles are read at evaluation time; changing the policy re-evaluates every
/// hooked device.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumString, EnumIter, EnumCountMacro,
)]
#[strum(serialize_all = "snake_case")]
pub enum PolicyToggle {
    /// Master switch for hooking keyboards at all
    AutomaticallyEnableKeyboardDevice,
    /// Leave keyboards with third-party drivers alone
    DontRemapThirdvendorKeyboard,
    /// Leave the built-in keyboard alone
    DontRemapInternal,
    /// Leave every external keyboard alone
    DontRemapExternal,
    DontRemapAppleKeyboard,
    DontRemapNonAppleKeyboard,
    /// Hook devices reporting vendor 0 / product 0
    AllowDevicesVendorIdProductIdAreZero,
    /// Never touch the caps lock LED
    PassthroughCapslockLedStatus,
    /// Suspend every rule not marked `ignore_pass_through`
    RemapPassThrough,
}

impl PolicyToggle {
    /// Value used when a policy is created or a file does not mention the toggle
    pub fn default_value(self) -> bool {
        matches!(self, PolicyToggle::AutomaticallyEnableKeyboardDevice)
    }
}

/// Errors that can occur when loading a policy
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("Unknown policy toggle: {0}")]
    UnknownToggle(String),

    #[error("Invalid toggle value: {0}")]
    InvalidValue(String),
}

/// Policy toggles plus whether a configuration has been loaded at all.
///
/// An uninitialized policy hooks nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    toggles: [bool; PolicyToggle::COUNT],
    initialized: bool,

    /// Path to the policy file (for reload)
    source_path: Option<PathBuf>,
}

/// TOML representation for deserializing a policy
#[cfg(feature = "config-file")]
#[derive(Debug, Clone, serde::Deserialize, Default)]
struct PolicyToml {
    #[serde(default)]
    toggles: Option<std::collections::HashMap<String, toml::Value>>,
}

impl Policy {
    /// Create a policy that has not been loaded yet
    pub fn new() -> Self {
        let mut toggles = [false; PolicyToggle::COUNT];
        for toggle in PolicyToggle::iter() {
            toggles[toggle as usize] = toggle.default_value();
        }
        Self {
            toggles,
            initialized: false,
            source_path: None,
        }
    }

    /// Default toggles, marked as loaded
    pub fn loaded_defaults() -> Self {
        let mut policy = Self::new();
        policy.initialized = true;
        policy
    }

    /// Load a policy from a TOML file
    #[cfg(feature = "config-file")]
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, PolicyError> {
        let content = std::fs::read_to_string(&path)?;
        let mut policy = Self::from_toml(&content)?;
        policy.source_path = Some(path.as_ref().to_path_buf());
        Ok(policy)
    }

    /// Load a policy from a TOML string
    #[cfg(feature = "config-file")]
    pub fn from_toml(content: &str) -> Result<Self, PolicyError> {
        let parsed: PolicyToml =
            toml::from_str(content).map_err(|e| PolicyError::TomlParse(e.to_string()))?;

        let mut policy = Self::loaded_defaults();
        if let Some(toggles) = parsed.toggles {
            for (name, value) in toggles {
                let toggle: PolicyToggle = name
                    .parse()
                    .map_err(|_| PolicyError::UnknownToggle(name.clone()))?;
                policy.set(toggle, parse_bool_value(&value)?);
            }
        }
        Ok(policy)
    }

    /// Get the default policy path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("hookmap").join("policy.toml"))
    }

    /// Load from default location, falling back to loaded defaults
    #[cfg(feature = "config-file")]
    pub fn load_default() -> Result<Self, PolicyError> {
        if let Some(path) = Self::default_path() {
            if path.exists() {
                return Self::from_file(path);
            }
        }
        Ok(Self::loaded_defaults())
    }

    /// Reload the policy from the file it was loaded from
    #[cfg(feature = "config-file")]
    pub fn reload(&mut self) -> Result<(), PolicyError> {
        match self.source_path.clone() {
            Some(path) => {
                *self = Self::from_file(path)?;
                Ok(())
            }
            None => Err(PolicyError::InvalidValue("No source path set".to_string())),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn set_initialized(&mut self, initialized: bool) {
        self.initialized = initialized;
    }

    pub fn get(&self, toggle: PolicyToggle) -> bool {
        self.toggles[toggle as usize]
    }

    pub fn set(&mut self, toggle: PolicyToggle, value: bool) {
        self.toggles[toggle as usize] = value;
    }

    /// Builder-style setter
    pub fn with(mut self, toggle: PolicyToggle, value: bool) -> Self {
        self.set(toggle, value);
        self
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    /// Iterate over every toggle and its value
    pub fn toggles(&self) -> impl Iterator<Item = (PolicyToggle, bool)> + '_ {
        PolicyToggle::iter().map(move |toggle| (toggle, self.get(toggle)))
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a TOML value as a boolean
#[cfg(feature = "config-file")]
fn parse_bool_value(value: &toml::Value) -> Result<bool, PolicyError> {
    match value {
        toml::Value::Boolean(b) => Ok(*b),
        toml::Value::Integer(1) => Ok(true),
        toml::Value::Integer(0) => Ok(false),
        toml::Value::String(s) => match s.to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(true),
            "false" | "no" | "off" | "0" => Ok(false),
            _ => Err(PolicyError::InvalidValue(format!(
                "Cannot convert '{}' to boolean",
                s
            ))),
        },
        _ => Err(PolicyError::InvalidValue(format!(
            "Cannot convert {:?} to boolean",
            value
        ))),
    }
}

/// Policy file content for a new installation
pub fn default_policy_content() -> &'static str {
    r#"# Hookmap Policy
# Place this file at: ~/.config/hookmap/policy.toml

[toggles]
automatically_enable_keyboard_device = true

# Device classes left untouched
dont_remap_thirdvendor_keyboard = false
dont_remap_internal = false
dont_remap_external = false
dont_remap_apple_keyboard = false
dont_remap_non_apple_keyboard = false

# Hook devices that report vendor 0 / product 0
allow_devices_vendor_id_product_id_are_zero = false

# Leave the caps lock LED to the hardware
passthrough_capslock_led_status = false

# Suspend remapping, except rules with the ignore_pass_through option
remap_pass_through = false
"#
}
