// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

use crate::{
    error::{Error, Result},
    remote::{
        shell::{as_user, quote},
        RemoteExecutor, ShellChain,
    },
    version::{Version, EARLIEST_MAPR_VERSION_WITH_LICENSE_AND_CENTOS_7},
    Context,
};

pub const CLUSTERS_CONF: &str = "/opt/mapr/conf/mapr-clusters.conf";

const LICENSE_TMP_FILE: &str = "/tmp/lic";

/// Where a license file is fetched from, and who to fetch it as.
#[derive(Debug, Clone, PartialEq)]
pub struct LicenseSource {
    pub url: String,
    /// `user:password`, passed to `curl --user`.
    pub credentials: String,
}

/// One action run against the primary once the control system is up.
#[derive(Debug, Clone, PartialEq)]
pub enum PostConfigTask {
    /// A world-writable directory in MapR-FS.
    AppDirectory(String),
    SampleStream(String),
    /// `/user/<name>` in MapR-FS, owned by that user.
    ServiceUserHome(String),
    License(LicenseSource),
    /// Register the primary as the gateway for the cluster named in `mapr-clusters.conf`.
    GatewayRegistration,
}

#[derive(Debug, Clone)]
pub struct PostConfigOptions {
    pub app_dir: String,
    pub sample_stream: String,
    pub service_user: String,
    pub create_service_user_home: bool,
    pub license: Option<LicenseSource>,
    pub register_gateway: bool,
    /// Run the filesystem and stream commands through `sudo -u <user>`.
    pub run_as: Option<String>,
}

impl Default for PostConfigOptions {
    fn default() -> Self {
        PostConfigOptions {
            app_dir: "/apps/spark".to_string(),
            sample_stream: "/sample-stream".to_string(),
            service_user: "sdc".to_string(),
            create_service_user_home: true,
            license: None,
            register_gateway: true,
            run_as: None,
        }
    }
}

impl PostConfigOptions {
    /// The tasks to run against a cluster running `mapr_version`, in order.
    pub fn plan(&self, mapr_version: &Version) -> Vec<PostConfigTask> {
        let mut tasks = vec![
            PostConfigTask::AppDirectory(self.app_dir.clone()),
            PostConfigTask::SampleStream(self.sample_stream.clone()),
        ];

        if self.create_service_user_home {
            tasks.push(PostConfigTask::ServiceUserHome(self.service_user.clone()));
        }

        if let Some(license) = &self.license {
            if mapr_version.at_least(EARLIEST_MAPR_VERSION_WITH_LICENSE_AND_CENTOS_7) {
                tasks.push(PostConfigTask::License(license.clone()));
            }
        }

        if self.register_gateway {
            tasks.push(PostConfigTask::GatewayRegistration);
        }

        tasks
    }
}

/// The node post-config tasks run on.
#[derive(Debug, Clone, Copy)]
pub struct Target<'a> {
    pub hostname: &'a str,
    pub fqdn: &'a str,
}

impl PostConfigTask {
    pub fn description(&self) -> String {
        match self {
            PostConfigTask::AppDirectory(path) => format!("Creating {path} directory ..."),
            PostConfigTask::SampleStream(path) => {
                format!("Creating MapR sample Stream named {path} ...")
            }
            PostConfigTask::ServiceUserHome(user) => {
                format!("Creating {user} user directory in MapR-FS ...")
            }
            PostConfigTask::License(_) => "Applying license ...".to_string(),
            PostConfigTask::GatewayRegistration => {
                "Registering gateway with the cluster ...".to_string()
            }
        }
    }

    /// The chain this task runs. Gateway registration needs the cluster name first, so it has
    /// no fixed chain; see `gateway_chain`.
    pub fn chain(&self, run_as: Option<&str>) -> Option<ShellChain> {
        match self {
            PostConfigTask::AppDirectory(path) => {
                let path = quote(path);
                Some(
                    ShellChain::atomic()
                        .then(as_user(run_as, &format!("hadoop fs -mkdir -p {path}")))
                        .then(as_user(run_as, &format!("hadoop fs -chmod 777 {path}"))),
                )
            }
            PostConfigTask::SampleStream(path) => Some(ShellChain::single(as_user(
                run_as,
                &format!(
                    "maprcli stream create -path {} -produceperm p -consumeperm p -topicperm p",
                    quote(path)
                ),
            ))),
            PostConfigTask::ServiceUserHome(user) => {
                let home = quote(&format!("/user/{user}")).into_owned();
                let owner = quote(&format!("{user}:{user}")).into_owned();
                Some(
                    ShellChain::atomic()
                        .then(as_user(Some("mapr"), &format!("hadoop fs -mkdir -p {home}")))
                        .then(as_user(
                            Some("mapr"),
                            &format!("hadoop fs -chown {owner} {home}"),
                        )),
                )
            }
            PostConfigTask::License(source) => Some(license_chain(source)),
            PostConfigTask::GatewayRegistration => None,
        }
    }

    pub fn run(
        &self,
        ctx: &Context,
        executor: &dyn RemoteExecutor,
        target: Target,
        run_as: Option<&str>,
    ) -> Result<()> {
        ctx.info(&self.description());

        let chain = match self.chain(run_as) {
            Some(chain) => chain,
            None => {
                let conf = executor.run(target.hostname, &format!("cat {CLUSTERS_CONF}"))?;
                let name = cluster_name(&conf.stdout)?;
                ctx.detail(&format!("Cluster name is {name}."));
                gateway_chain(name, target.fqdn)
            }
        };

        ctx.detail(&format!("[{}] {chain}", target.hostname));
        executor.run_chain(target.hostname, &chain)?;
        Ok(())
    }
}

/// Fetch, register, and delete a license file as one chain, so a partially downloaded file is
/// never registered. The credentials are masked whenever the chain is displayed.
pub fn license_chain(source: &LicenseSource) -> ShellChain {
    ShellChain::atomic()
        .then(format!(
            "curl --fail --silent --show-error --user {} {} > {LICENSE_TMP_FILE}",
            quote(&source.credentials),
            quote(&source.url)
        ))
        .then(format!(
            "maprcli license add -license {LICENSE_TMP_FILE} -is_file true"
        ))
        .then(format!("rm -rf {LICENSE_TMP_FILE}"))
        .secret(&source.credentials)
}

pub fn gateway_chain(cluster_name: &str, gateway: &str) -> ShellChain {
    ShellChain::single(format!(
        "maprcli cluster gateway set -dstcluster {} -gateways {}",
        quote(cluster_name),
        quote(gateway)
    ))
}

/// The cluster name is the first field of the first line of `mapr-clusters.conf`.
pub fn cluster_name(clusters_conf: &str) -> Result<&str> {
    clusters_conf
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().next())
        .ok_or_else(|| {
            Error::ConfigurationInvariant(format!("no cluster name found in {CLUSTERS_CONF}"))
        })
}

/// Run `tasks` in order against `target`. The first failure aborts the rest.
pub fn run_all(
    ctx: &Context,
    executor: &dyn RemoteExecutor,
    target: Target,
    tasks: &[PostConfigTask],
    run_as: Option<&str>,
) -> Result<()> {
    for task in tasks.iter() {
        task.run(ctx, executor, target, run_as)?;
    }
    Ok(())
}
