// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

//! Which StreamSets Data Collector RPMs a cluster needs, and where to download them from.

use crate::{
    error::{Error, Result},
    remote::shell::quote,
    version::Version,
};

pub const DEFAULT_SDC_REPO: &str =
    "https://s3-us-west-2.amazonaws.com/archives.streamsets.com/datacollector/";

/// One RPM to download.
#[derive(Debug, Clone, PartialEq)]
pub struct Package {
    pub url: String,
    pub filename: String,
}

impl Package {
    pub fn download_command(&self) -> String {
        format!("wget -q {}", quote(&self.url))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PackageSet {
    /// In install order: every stage library comes after the core package.
    pub packages: Vec<Package>,
    pub base_url: String,
    /// Whether the base URL selects the CentOS 7 (`el7/`) builds.
    pub el7: bool,
}

impl PackageSet {
    pub fn filenames(&self) -> Vec<&str> {
        self.packages.iter().map(|p| p.filename.as_str()).collect()
    }

    pub fn download_commands(&self) -> Vec<String> {
        self.packages.iter().map(Package::download_command).collect()
    }
}

/// The canonical SDC version used in file names: everything before a `-RC` suffix.
pub fn canonical_sdc_version(sdc: &str) -> &str {
    match sdc.find("-RC") {
        Some(i) => &sdc[..i],
        None => sdc,
    }
}

/// The major release of an SDC version, the number before its first `.`. Whatever follows,
/// such as a `-SNAPSHOT` suffix, is not interpreted.
pub fn sdc_major(sdc: &str) -> Result<u64> {
    let canonical = canonical_sdc_version(sdc);
    canonical
        .split('.')
        .next()
        .and_then(|major| major.parse().ok())
        .ok_or_else(|| Error::VersionFormat {
            input: sdc.to_string(),
            reason: "does not start with a numeric major version".to_string(),
        })
}

/// Resolve the packages for SDC `sdc` on MapR `mapr` with MEP `mep`, from the public archive.
pub fn resolve(sdc: &str, mapr: &str, mep: Option<&str>) -> Result<PackageSet> {
    resolve_from(DEFAULT_SDC_REPO, sdc, mapr, mep)
}

/// Like `resolve`, but download from `repo`, which must end with a `/`.
pub fn resolve_from(repo: &str, sdc: &str, mapr: &str, mep: Option<&str>) -> Result<PackageSet> {
    let sdc_version = canonical_sdc_version(sdc);
    let sdc_major = sdc_major(sdc)?;
    let mapr_version = Version::parse(mapr)?;
    let mep_version = mep.map(Version::parse).transpose()?;
    let mapr_6 = mapr_version.major() == 6;

    let mut filenames = vec![
        format!("streamsets-datacollector-{sdc_version}-1.noarch.rpm"),
        format!(
            "streamsets-datacollector-mapr_{}-lib-{sdc_version}-1.noarch.rpm",
            mapr_version.underscored(2)
        ),
    ];

    if mapr_6 {
        let mep_version = mep_version.as_ref().ok_or_else(|| {
            Error::ConfigurationInvariant(format!(
                "MapR {mapr_version} needs a MEP version to pick its stage libraries"
            ))
        })?;
        filenames.push(format!(
            "streamsets-datacollector-mapr_{}-mep{}-lib-{sdc_version}-1.noarch.rpm",
            mapr_version.underscored(2),
            mep_version.leading_digit()
        ));
    }

    if let Some(mep_version) = &mep_version {
        if mapr_version.components() == [5, 2, 2] && mep_version.major() == 3 {
            filenames.push(format!(
                "streamsets-datacollector-mapr_spark_2_1_mep_{}-lib-{sdc_version}-1.noarch.rpm",
                mep_version.underscored(2)
            ));
        }
    }

    let el7 = sdc_major == 3 && mapr_6;
    let el_segment = match (sdc_major, mapr_6) {
        (3, true) => "el7/",
        (3, false) => "el6/",
        _ => "",
    };
    let base_url = format!("{repo}{sdc}/rpm/{el_segment}");

    Ok(PackageSet {
        packages: filenames
            .into_iter()
            .map(|filename| Package {
                url: format!("{base_url}{filename}"),
                filename,
            })
            .collect(),
        base_url,
        el7,
    })
}
