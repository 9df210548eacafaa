// Copyright 2024 Simo Sorce
// See LICENSE.txt file for terms

use std::env;
use std::fs;
use std::path::Path;

use crate::backend::SOFTWARE_BACKEND;
use crate::ec::EcCurve;
use crate::error::Result;
use crate::pkcs11::*;

use serde::{Deserialize, Serialize};
use toml;

#[cfg(not(test))]
const DEFAULT_CONF_DIR: &str = {
    match option_env!("CONFDIR") {
        Some(p) => p,
        None => "/usr/local/etc",
    }
};
#[cfg(test)]
const DEFAULT_CONF_DIR: &str = "test";

pub const DEFAULT_CONF_NAME: &str = "token.conf";

fn default_backend_name() -> String {
    SOFTWARE_BACKEND.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Name of the backend implementation, see [crate::backend::from_config]
    #[serde(default = "default_backend_name")]
    pub name: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig {
            name: default_backend_name(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EcConfig {
    /// Hash every composite ECDSA mechanism with SHA-1 regardless of
    /// the digest the mechanism names
    #[serde(default)]
    pub legacy_sha1_digest: bool,
    /// Curves allowed for key generation, all supported when absent
    #[serde(default)]
    pub curves: Option<Vec<String>>,
}

impl EcConfig {
    /// Checks whether key generation on the curve is allowed
    pub fn allows_curve(&self, curve: EcCurve) -> bool {
        match &self.curves {
            Some(list) => list.iter().any(|c| c == curve.name()),
            None => true,
        }
    }

    fn validate(&self) -> Result<()> {
        if let Some(list) = &self.curves {
            for c in list {
                EcCurve::from_name(c).map_err(|_| CKR_ARGUMENTS_BAD)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub ec: EcConfig,
}

impl Config {
    pub fn new() -> Config {
        Config::default()
    }

    pub fn find_conf() -> Result<String> {
        /* First check for our own env var,
         * this has the highest precedence */
        if let Ok(var) = env::var("ECMECH_CONF") {
            return Ok(var);
        }
        /* Freedesktop specification for config dirs first
         * then fallback to use $HOME/.config, if that is also not
         * available see if we have access to a system config */
        let datafile = match env::var("XDG_CONFIG_HOME") {
            Ok(xdg) => format!("{}/ecmech/{}", xdg, DEFAULT_CONF_NAME),
            Err(_) => match env::var("HOME") {
                Ok(home) => {
                    format!("{}/.config/ecmech/{}", home, DEFAULT_CONF_NAME)
                }
                Err(_) => {
                    format!("{}/ecmech/{}", DEFAULT_CONF_DIR, DEFAULT_CONF_NAME)
                }
            },
        };
        if Path::new(&datafile).is_file() {
            Ok(datafile)
        } else {
            Err(CKR_ARGUMENTS_BAD)?
        }
    }

    pub fn parse(config_str: &str) -> Result<Config> {
        let conf: Config = toml::from_str(config_str)?;
        conf.ec.validate()?;
        Ok(conf)
    }

    pub fn from_file(filename: &str) -> Result<Config> {
        let config_str = fs::read_to_string(filename)?;
        Self::parse(&config_str)
    }

    /// Loads the configuration file if one can be found, otherwise
    /// returns the defaults
    pub fn load() -> Result<Config> {
        match Self::find_conf() {
            Ok(filename) => Self::from_file(&filename),
            Err(_) => Ok(Config::default()),
        }
    }
}
