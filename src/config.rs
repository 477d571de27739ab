//! Walker and mount configuration.

use serde::{Deserialize, Serialize};

use crate::error::{BindError, BindResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Leading character of a property binding key, as in `:label="Title"`.
    pub prop_sigil: char,
    /// Leading character of an event binding key, as in `@click="HandleClick"`.
    pub event_sigil: char,
    /// Maximum component nesting depth before a walk gives up on a subtree.
    pub max_depth: usize,
    /// Walk a component's own template in a scope holding only that component,
    /// so its template cannot reach names of whoever uses it.
    pub isolate_templates: bool,
    /// Re-run `notify` on the whole tree after a dispatched event is handled.
    pub refresh_after_dispatch: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            prop_sigil: ':',
            event_sigil: '@',
            max_depth: 64,
            isolate_templates: true,
            refresh_after_dispatch: true,
        }
    }
}

impl Config {
    pub fn from_json(json: &str) -> BindResult<Self> {
        let config: Config =
            serde_json::from_str(json).map_err(|e| BindError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> BindResult<()> {
        if self.prop_sigil == self.event_sigil {
            return Err(BindError::Config(format!(
                "prop and event sigils must differ, both are '{}'",
                self.prop_sigil
            )));
        }
        for sigil in [self.prop_sigil, self.event_sigil] {
            if sigil.is_alphanumeric() || sigil.is_whitespace() {
                return Err(BindError::Config(format!(
                    "'{}' cannot be used as a binding sigil",
                    sigil
                )));
            }
        }
        if self.max_depth == 0 {
            return Err(BindError::Config("maxDepth must be at least 1".to_string()));
        }
        Ok(())
    }
}
