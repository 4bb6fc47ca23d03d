//! Pipeline configuration

use std::collections::HashMap;

/// Options recognized by the pipeline, parsed from the front end's flat
/// string-keyed map.
///
/// `register_allocation` is a register budget; `-1` is the sentinel for
/// "do not allocate or report".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub optimize: bool,
    pub register_allocation: i32,
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            optimize: false,
            register_allocation: -1,
            debug: false,
        }
    }
}

impl Config {
    /// Recognized keys: `optimize`, `registerAllocation`, `debug`. Unknown
    /// keys are ignored and malformed values keep the default.
    pub fn from_map(map: &HashMap<String, String>) -> Self {
        let mut config = Config::default();
        if let Some(value) = map.get("optimize") {
            if let Ok(flag) = value.parse() {
                config.optimize = flag;
            }
        }
        if let Some(value) = map.get("registerAllocation") {
            if let Ok(budget) = value.parse() {
                config.register_allocation = budget;
            }
        }
        if let Some(value) = map.get("debug") {
            if let Ok(flag) = value.parse() {
                config.debug = flag;
            }
        }
        config
    }

    pub fn allocates_registers(&self) -> bool {
        self.register_allocation != -1
    }
}
