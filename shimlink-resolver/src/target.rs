// Build targets a bundle can be produced for

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigurationError;

/// Platform a bundle is produced for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildTarget {
    Ios,     // native-ios
    Android, // native-android
    Web,
    Native, // other-native
}

impl BuildTarget {
    /// Platform name as bundlers spell it, also used for file selection
    /// Example: BuildTarget::Ios -> "ios" (map.ios.js)
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildTarget::Ios => "ios",
            BuildTarget::Android => "android",
            BuildTarget::Web => "web",
            BuildTarget::Native => "native",
        }
    }

    /// Descriptive name, used in `list` output
    pub fn long_name(&self) -> &'static str {
        match self {
            BuildTarget::Ios => "native-ios",
            BuildTarget::Android => "native-android",
            BuildTarget::Web => "web",
            BuildTarget::Native => "other-native",
        }
    }

    /// All supported targets, in platform list order
    pub fn all() -> &'static [BuildTarget] {
        &[
            BuildTarget::Ios,
            BuildTarget::Android,
            BuildTarget::Native,
            BuildTarget::Web,
        ]
    }

    /// Everything but web runs on a native host and may use `.native.*` files
    pub fn is_native(&self) -> bool {
        !matches!(self, BuildTarget::Web)
    }
}

impl fmt::Display for BuildTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BuildTarget {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ios" | "native-ios" => Ok(BuildTarget::Ios),
            "android" | "native-android" => Ok(BuildTarget::Android),
            "web" => Ok(BuildTarget::Web),
            "native" | "other-native" => Ok(BuildTarget::Native),
            _ => Err(ConfigurationError::UnknownTarget(s.to_string())),
        }
    }
}
