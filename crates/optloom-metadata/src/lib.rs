//! Serializable descriptions of options and commands.
//!
//! These records are what option manifests (plugin namespaces) and command
//! manifests (`optloom.json`) are made of. They carry no behaviour; the
//! `optloom-plugins` crate turns them into parser options.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Format version written into option and command manifests.
pub const OPTION_MANIFEST_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct OptionMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest: Option<String>,
    /// `?`, `*` or an exact count. Omitted means the action's default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nargs: Option<String>,
    /// `store`, `store-true`, `store-false` or `append`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    /// Coercion name: `string`, `int`, `float` or `bool`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(rename = "const", default, skip_serializing_if = "Option::is_none")]
    pub constant: Option<Value>,
    #[serde(default)]
    pub short_circuit: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub help: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct CommandMeta {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub summary: String,
    /// Registry namespaces to load extra options from. `None` keeps the
    /// built-in defaults; an empty list loads nothing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespaces: Option<Vec<String>>,
    /// Keep unclaimed tokens instead of failing.
    #[serde(default)]
    pub lenient: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionMeta>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subcommands: Vec<CommandMeta>,
}

/// Contents of one `*.json` file in a plugin namespace directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct OptionManifest {
    pub format_version: u32,
    #[serde(default)]
    pub options: Vec<OptionMeta>,
}

impl OptionManifest {
    pub fn new(options: Vec<OptionMeta>) -> Self {
        Self {
            format_version: OPTION_MANIFEST_FORMAT_VERSION,
            options,
        }
    }

    pub fn to_json_bytes(&self) -> Vec<u8> {
        serde_json::to_vec_pretty(self).unwrap_or_default()
    }
}

/// Contents of a command manifest (`optloom.json`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct CommandManifest {
    pub format_version: u32,
    pub command: CommandMeta,
}

impl CommandManifest {
    pub fn new(command: CommandMeta) -> Self {
        Self {
            format_version: OPTION_MANIFEST_FORMAT_VERSION,
            command,
        }
    }

    pub fn to_json_bytes(&self) -> Vec<u8> {
        serde_json::to_vec_pretty(self).unwrap_or_default()
    }
}
