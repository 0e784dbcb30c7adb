// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

use crate::{
    error::Result,
    packages::PackageSet,
    remote::{shell::quote, RemoteExecutor, ShellChain},
    version::{
        Version, EARLIEST_MAPR_VERSION_WITH_LICENSE_AND_CENTOS_7,
        EARLIEST_MEP_VERSION_FOR_SETUP_MAPR_SCRIPT,
    },
    Context,
};

const INSTALL_DIR: &str = "/opt";
const SDC_HOME: &str = "/opt/streamsets-datacollector";

/// Builds the setup-mapr invocation for a cluster's MapR and MEP versions.
#[derive(Debug, Clone, PartialEq)]
pub struct SetupScript {
    mapr_version: String,
    mep_digit: Option<char>,
}

impl SetupScript {
    pub fn new(mapr: &Version, mep: Option<&Version>) -> Self {
        SetupScript {
            mapr_version: mapr.truncated(3),
            // Older setup scripts misbehave if MAPR_MEP_VERSION is set at all.
            mep_digit: mep
                .filter(|mep| mep.at_least(EARLIEST_MEP_VERSION_FOR_SETUP_MAPR_SCRIPT))
                .map(Version::leading_digit),
        }
    }

    pub fn render(&self) -> String {
        let mut env = format!(
            "SDC_HOME={SDC_HOME} SDC_CONF=/etc/sdc MAPR_HOME=/opt/mapr MAPR_VERSION={}",
            self.mapr_version
        );
        if let Some(mep) = self.mep_digit {
            env.push_str(&format!(" MAPR_MEP_VERSION={mep}"));
        }
        format!("{env} {SDC_HOME}/bin/streamsets setup-mapr >& /tmp/setup-mapr.out")
    }
}

/// The service start idiom: systemd on CentOS 7 images, SysV init before that.
pub fn start_service_chain(mapr: &Version) -> ShellChain {
    if mapr.at_least(EARLIEST_MAPR_VERSION_WITH_LICENSE_AND_CENTOS_7) {
        ShellChain::atomic()
            .then("systemctl start sdc")
            .then("systemctl enable sdc")
    } else {
        ShellChain::atomic()
            .then("service sdc start")
            .then("chkconfig --add sdc")
    }
}

/// Installs a resolved `PackageSet` on one node and starts the service.
pub struct Installer<'a> {
    ctx: &'a Context,
    executor: &'a dyn RemoteExecutor,
    hostname: &'a str,
}

impl<'a> Installer<'a> {
    pub fn new(ctx: &'a Context, executor: &'a dyn RemoteExecutor, hostname: &'a str) -> Self {
        Installer {
            ctx,
            executor,
            hostname,
        }
    }

    pub fn install(
        &self,
        packages: &PackageSet,
        mapr: &Version,
        mep: Option<&Version>,
    ) -> Result<()> {
        let files: Vec<String> = packages
            .filenames()
            .iter()
            .map(|file| quote(file).into_owned())
            .collect();
        let files = files.join(" ");

        let mut download = ShellChain::atomic().then(format!("cd {INSTALL_DIR}"));
        for command in packages.download_commands() {
            download = download.then(command);
        }
        let install = ShellChain::atomic()
            .then(format!("cd {INSTALL_DIR}"))
            .then(format!("yum -y -q localinstall {files}"));
        let setup = ShellChain::single(SetupScript::new(mapr, mep).render());

        self.ctx
            .info(&format!("Downloading packages from {} ...", packages.base_url));
        let outcome = self
            .step(&download)
            .and_then(|_| {
                self.ctx.info("Installing packages ...");
                self.step(&install)
            })
            .and_then(|_| {
                self.ctx.info("Running setup-mapr ...");
                self.step(&setup)
            });

        // The downloads are removed whichever way the steps above went.
        self.ctx.detail("Removing downloaded packages ...");
        let downloaded: Vec<String> = packages
            .filenames()
            .iter()
            .map(|file| quote(&format!("{INSTALL_DIR}/{file}")).into_owned())
            .collect();
        let cleanup = self.step(&ShellChain::single(format!("rm -f {}", downloaded.join(" "))));
        outcome?;
        cleanup?;

        self.ctx.info("Starting StreamSets Data Collector ...");
        self.step(&start_service_chain(mapr))
    }

    fn step(&self, chain: &ShellChain) -> Result<()> {
        self.ctx.detail(&format!("[{}] {chain}", self.hostname));
        self.executor.run_chain(self.hostname, chain)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{packages::resolve, test_env::RecordingExecutor, Buffer};

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn mep_variable_threshold() {
        let with = SetupScript::new(&v("6.1.0"), Some(&v("4.0"))).render();
        assert_eq!(
            with,
            "SDC_HOME=/opt/streamsets-datacollector SDC_CONF=/etc/sdc MAPR_HOME=/opt/mapr \
             MAPR_VERSION=6.1.0 MAPR_MEP_VERSION=4 /opt/streamsets-datacollector/bin/streamsets \
             setup-mapr >& /tmp/setup-mapr.out"
        );

        assert!(SetupScript::new(&v("6.1.0"), Some(&v("10.0")))
            .render()
            .contains(" MAPR_MEP_VERSION=1 "));

        let without = SetupScript::new(&v("5.2.2"), Some(&v("3.0"))).render();
        assert!(!without.contains("MAPR_MEP_VERSION"));
        assert!(without.contains("MAPR_VERSION=5.2.2 "));

        assert!(!SetupScript::new(&v("5.2.0"), None)
            .render()
            .contains("MAPR_MEP_VERSION"));
    }

    #[test]
    fn service_idiom() {
        assert_eq!(
            start_service_chain(&v("6.0.0")).render(),
            "systemctl start sdc && systemctl enable sdc"
        );
        assert_eq!(
            start_service_chain(&v("5.2.2")).render(),
            "service sdc start && chkconfig --add sdc"
        );
    }

    #[test]
    fn install_sequence() {
        let ctx = Context::buffered(Buffer::new());
        let executor = RecordingExecutor::new();
        let packages = resolve("3.5.0", "6.1.0", Some("4.0.0")).unwrap();

        Installer::new(&ctx, &executor, "n1")
            .install(&packages, &v("6.1.0"), Some(&v("4.0.0")))
            .unwrap();

        let commands = executor.commands_on("n1");
        assert_eq!(commands.len(), 5);
        assert!(commands[0].starts_with("cd /opt && wget -q "));
        assert_eq!(commands[0].matches("wget -q").count(), 3);
        assert!(commands[1].ends_with(&format!(
            "yum -y -q localinstall {}",
            packages.filenames().join(" ")
        )));
        assert!(commands[2].contains("MAPR_MEP_VERSION=4"));
        assert!(commands[3].starts_with("rm -f /opt/streamsets-datacollector-3.5.0-1.noarch.rpm"));
        assert_eq!(commands[4], "systemctl start sdc && systemctl enable sdc");
    }

    #[test]
    fn cleanup_after_setup_failure() {
        let ctx = Context::buffered(Buffer::new());
        let executor = RecordingExecutor::new();
        executor.fail_on("n1", "setup-mapr", 1);
        let packages = resolve("2.7.0", "5.2.2", Some("3.0.0")).unwrap();

        let result =
            Installer::new(&ctx, &executor, "n1").install(&packages, &v("5.2.2"), Some(&v("3.0.0")));

        match result {
            Err(crate::Error::RemoteCommand { command, .. }) => {
                assert!(command.contains("setup-mapr"))
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(executor.count("rm -f"), 1);
        assert_eq!(executor.count("service sdc start"), 0);
    }

    #[test]
    fn cleanup_after_download_failure() {
        let ctx = Context::buffered(Buffer::new());
        let executor = RecordingExecutor::new();
        executor.fail_on("n1", "wget", 8);
        let packages = resolve("3.5.0", "6.1.0", Some("4.0.0")).unwrap();

        assert!(Installer::new(&ctx, &executor, "n1")
            .install(&packages, &v("6.1.0"), Some(&v("4.0.0")))
            .is_err());
        assert_eq!(executor.count("localinstall"), 0);
        assert_eq!(executor.count("rm -f"), 1);
    }
}
