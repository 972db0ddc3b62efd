//! Parsing of `--action` arguments.
//!
//! An action argument is either a bare action name or
//! `NAME:key=value,key=value`. Names may contain spaces but not `:`.

use std::collections::HashMap;

use anyhow::{bail, Result};

/// One chain position as given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionArg {
    pub name: String,
    pub parameters: HashMap<String, String>,
}

impl ActionArg {
    pub fn parse(raw: &str) -> Result<Self> {
        let (name, params) = match raw.split_once(':') {
            Some((name, params)) => (name.trim(), Some(params)),
            None => (raw.trim(), None),
        };
        if name.is_empty() {
            bail!("action argument {raw:?} has no action name");
        }

        let mut parameters = HashMap::new();
        for pair in params.into_iter().flat_map(|p| p.split(',')) {
            if pair.trim().is_empty() {
                continue;
            }
            let Some((key, value)) = pair.split_once('=') else {
                bail!("parameter {pair:?} of action {name:?} is not key=value");
            };
            let key = key.trim();
            if key.is_empty() {
                bail!("parameter {pair:?} of action {name:?} has no key");
            }
            parameters.insert(key.to_string(), value.to_string());
        }

        Ok(Self {
            name: name.to_string(),
            parameters,
        })
    }
}

/// Parse every `--action` argument, keeping their order.
pub fn parse_all(raw: &[String]) -> Result<Vec<ActionArg>> {
    raw.iter().map(|r| ActionArg::parse(r)).collect()
}
