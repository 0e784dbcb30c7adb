// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    configure::{AccountTiming, ConfigureOptions},
    error::{Error, Result},
    packages::{sdc_major, DEFAULT_SDC_REPO},
    post_config::{LicenseSource, PostConfigOptions},
    security::SecurityMode,
    topology::{ClusterTopology, DiskMap, TopologyPlanner, MCS_SERVER_PORT},
    version::{Version, EARLIEST_MAPR_VERSION_WITH_LICENSE_AND_CENTOS_7},
    wait::Checkpoint,
};

pub const DEFAULT_NAMESPACE: &str = "clusterdock";

/// BringupConfig is everything a bring-up needs to know, deserialized from the config file and
/// then overridden by command line flags.
///
/// Every field has a default so that a config file only needs to name what differs.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct BringupConfig {
    pub primary_node: Vec<String>,
    pub secondary_nodes: Vec<String>,
    pub node_disks: DiskMap,

    pub network: String,
    /// CIDR for the network, used only when it has to be created.
    pub subnet: Option<String>,
    pub registry: String,
    pub namespace: String,
    pub always_pull: bool,
    pub only_pull: bool,
    pub predictable: bool,

    pub mapr_version: String,
    pub mep_version: Option<String>,

    pub secure: bool,
    /// Host directory the security bundle is shared through. A leading `~` is expanded.
    pub secure_config_directory: String,

    pub license_url: Option<String>,
    pub license_credentials: Option<String>,
    pub dont_register_gateway: bool,

    pub sdc_version: Option<String>,
    pub sdc_repo: String,
    pub dont_install_additional: bool,

    pub default_db: Option<String>,
    pub run_as: Option<String>,
    pub service_user: String,
    pub create_service_user_home: bool,
    pub service_account: AccountTiming,
    pub stop_services_before_configure: bool,

    pub readiness: ReadinessConfig,
}

impl Default for BringupConfig {
    fn default() -> Self {
        BringupConfig {
            primary_node: Vec::new(),
            secondary_nodes: Vec::new(),
            node_disks: DiskMap::new(),
            network: crate::default_network(),
            subnet: None,
            registry: crate::default_registry(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            always_pull: false,
            only_pull: false,
            predictable: false,
            mapr_version: "6.0.1".to_string(),
            mep_version: Some("4.1.0".to_string()),
            secure: false,
            secure_config_directory: "~/.clusterdock/secure".to_string(),
            license_url: None,
            license_credentials: None,
            dont_register_gateway: false,
            sdc_version: None,
            sdc_repo: DEFAULT_SDC_REPO.to_string(),
            dont_install_additional: false,
            default_db: None,
            run_as: None,
            service_user: "sdc".to_string(),
            create_service_user_home: true,
            service_account: AccountTiming::Skip,
            stop_services_before_configure: false,
            readiness: ReadinessConfig::default(),
        }
    }
}

/// Overrides for the places a bring-up polls.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ReadinessConfig {
    /// The port the control system listens on in the primary. It is published, polled, and
    /// reported as one value.
    pub control_system_port: u16,
    pub control_system_interval_secs: u64,
    pub control_system_timeout_secs: u64,
    pub service_status_interval_secs: u64,
    pub service_status_timeout_secs: u64,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        ReadinessConfig {
            control_system_port: MCS_SERVER_PORT,
            control_system_interval_secs: Checkpoint::CONTROL_SYSTEM.interval.as_secs(),
            control_system_timeout_secs: Checkpoint::CONTROL_SYSTEM.timeout.as_secs(),
            service_status_interval_secs: Checkpoint::SERVICE_STATUS.interval.as_secs(),
            service_status_timeout_secs: Checkpoint::SERVICE_STATUS.timeout.as_secs(),
        }
    }
}

impl ReadinessConfig {
    pub fn control_system(&self) -> Checkpoint {
        Checkpoint {
            interval: Duration::from_secs(self.control_system_interval_secs),
            timeout: Duration::from_secs(self.control_system_timeout_secs),
        }
    }

    pub fn service_status(&self) -> Checkpoint {
        Checkpoint {
            interval: Duration::from_secs(self.service_status_interval_secs),
            timeout: Duration::from_secs(self.service_status_timeout_secs),
        }
    }
}

fn invariant(message: impl Into<String>) -> Error {
    Error::ConfigurationInvariant(message.into())
}

impl BringupConfig {
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| invariant(format!("invalid config: {e}")))
    }

    pub fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| invariant(format!("could not read config file '{path}': {e}")))?;
        Self::from_toml(&contents)
    }

    /// Check everything that can be checked before a single image is pulled.
    pub fn validate(&self) -> Result<()> {
        if self.secondary_nodes.is_empty() {
            return Err(invariant("at least one secondary node is required"));
        }

        match (&self.license_url, &self.license_credentials) {
            (Some(_), None) => {
                return Err(invariant(
                    "license credentials are required if a license URL is provided",
                ))
            }
            (None, Some(_)) => {
                return Err(invariant("license credentials were given without a license URL"))
            }
            _ => {}
        }

        if let Some(subnet) = &self.subnet {
            subnet
                .parse::<cidr::IpCidr>()
                .map_err(|e| invariant(format!("invalid subnet '{subnet}': {e}")))?;
        }

        let mapr = self.mapr_version()?;
        let mep = self.mep_version()?;
        if mapr.major() == 6 && mep.is_none() {
            return Err(invariant(format!("MapR {mapr} needs a MEP version")));
        }

        if let Some(sdc) = &self.sdc_version {
            sdc_major(sdc)?;
            if !self.sdc_repo.ends_with('/') {
                return Err(invariant(format!(
                    "the SDC repository '{}' must end with '/'",
                    self.sdc_repo
                )));
            }
        }

        let readiness = &self.readiness;
        if readiness.control_system_interval_secs == 0 || readiness.service_status_interval_secs == 0
        {
            return Err(invariant("readiness intervals must be at least one second"));
        }

        Ok(())
    }

    /// Validate, then plan every node without touching any container.
    pub fn topology(&self) -> Result<ClusterTopology> {
        self.validate()?;
        self.planner()?
            .build(&self.primary_node, &self.secondary_nodes, &self.node_disks)
    }

    pub fn mapr_version(&self) -> Result<Version> {
        Version::parse(&self.mapr_version)
    }

    pub fn mep_version(&self) -> Result<Option<Version>> {
        self.mep_version.as_deref().map(Version::parse).transpose()
    }

    pub fn security_mode(&self) -> SecurityMode {
        SecurityMode::from_flag(self.secure)
    }

    /// `<registry>/<namespace>/clusterdock:mapr<mapr>[_mep<mep>]`
    fn image_prefix(&self) -> String {
        let mut prefix = format!(
            "{}/{}/clusterdock:mapr{}",
            self.registry, self.namespace, self.mapr_version
        );
        if let Some(mep) = &self.mep_version {
            prefix.push_str(&format!("_mep{mep}"));
        }
        prefix
    }

    pub fn primary_image(&self) -> String {
        format!("{}_primary-node", self.image_prefix())
    }

    pub fn secondary_image(&self) -> String {
        format!("{}_secondary-node", self.image_prefix())
    }

    pub fn secure_config_host_dir(&self) -> PathBuf {
        expand_home(&self.secure_config_directory)
    }

    pub fn planner(&self) -> Result<TopologyPlanner> {
        Ok(TopologyPlanner {
            network: self.network.clone(),
            primary_image: self.primary_image(),
            secondary_image: self.secondary_image(),
            secure_config_host_dir: self.secure.then(|| self.secure_config_host_dir()),
            centos7: self
                .mapr_version()?
                .at_least(EARLIEST_MAPR_VERSION_WITH_LICENSE_AND_CENTOS_7),
            control_system_port: self.readiness.control_system_port,
            predictable_ports: self.predictable,
        })
    }

    pub fn configure_options(&self) -> ConfigureOptions {
        ConfigureOptions {
            default_db: self.default_db.clone(),
            stop_services: self.stop_services_before_configure,
            service_status: self.readiness.service_status(),
            service_user: self.service_user.clone(),
            account_timing: self.service_account,
        }
    }

    pub fn license(&self) -> Option<LicenseSource> {
        match (&self.license_url, &self.license_credentials) {
            (Some(url), Some(credentials)) => Some(LicenseSource {
                url: url.clone(),
                credentials: credentials.clone(),
            }),
            _ => None,
        }
    }

    pub fn post_config_options(&self) -> PostConfigOptions {
        PostConfigOptions {
            service_user: self.service_user.clone(),
            create_service_user_home: self.create_service_user_home,
            license: self.license(),
            register_gateway: !self.dont_register_gateway,
            run_as: self.run_as.clone(),
            ..Default::default()
        }
    }

    /// The SDC version to install, unless installs are turned off.
    pub fn install_version(&self) -> Option<&str> {
        if self.dont_install_additional {
            None
        } else {
            self.sdc_version.as_deref()
        }
    }
}

/// Expand a leading `~` to `$HOME`.
pub fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix('~'), std::env::var("HOME")) {
        (Some(rest), Ok(home)) if rest.is_empty() || rest.starts_with('/') => {
            PathBuf::from(format!("{home}{rest}"))
        }
        _ => PathBuf::from(path),
    }
}
