use crate::s3::{Credentials, Region};
use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use std::{collections::BTreeMap, fs::File, path::Path};

#[derive(Debug, Deserialize)]
pub struct Config {
    pub hosts: BTreeMap<String, Host>,
}

#[derive(Debug, Deserialize)]
pub struct Host {
    pub endpoint: Option<String>,
    pub region: Option<String>,
    #[serde(default)]
    pub access_key: String,
    #[serde(default, deserialize_with = "deserialize_secret")]
    pub secret_key: Option<SecretString>,
}

fn deserialize_secret<'de, D>(deserializer: D) -> std::result::Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.map(SecretString::from))
}

impl Config {
    /// # Errors
    ///
    /// Will return `Err` if the file can not be read or parsed
    pub fn new(config_path: &Path) -> Result<Self> {
        let file = File::open(config_path)
            .with_context(|| format!("unable to open: {}", config_path.display()))?;

        let config: Self =
            serde_yaml_ng::from_reader(file).context("unable to parse config file")?;

        Ok(config)
    }

    /// Get the host from the config.yml
    ///
    /// # Errors
    ///
    /// Will return `Err` if there is no host with that name
    pub fn get_host(&self, name: &str) -> Result<&Host> {
        self.hosts
            .get(name)
            .with_context(|| format!("could not find host {name}"))
    }
}

impl Host {
    /// Get the region for the host, an endpoint makes it a custom region
    ///
    /// # Errors
    ///
    /// Will return `Err` if the region is not a valid AWS region and there is
    /// no endpoint
    pub fn get_region(&self) -> Result<Region> {
        Ok(match (&self.region, &self.endpoint) {
            (region, Some(endpoint)) => Region::Custom {
                name: region.clone().unwrap_or_default(),
                endpoint: endpoint.to_string(),
            },
            (Some(r), None) => r.parse::<Region>()?,
            (None, None) => Region::from_env(),
        })
    }

    /// Keys of the host, the environment fills the ones left empty
    #[must_use]
    pub fn credentials(&self) -> Credentials {
        let secret = self
            .secret_key
            .as_ref()
            .map(|s| s.expose_secret().to_string())
            .unwrap_or_default();

        Credentials::from_env_or(&self.access_key, &secret)
    }
}
