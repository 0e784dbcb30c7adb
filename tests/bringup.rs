// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

#[cfg(test)]
mod tests {
    use maprdock_lib::{
        bringup::{Bringup, BringupOutcome, BringupReport},
        config::BringupConfig,
        error::TopologyError,
        remote::CommandOutput,
        test_env::*,
        topology::DiskMap,
        Buffer, Context, Error,
    };

    const CLUSTERS_CONF: &str = "demo.mapr.com secure=false n1.cluster:7222\n";

    /// Fakes for everything outside the process, with a control system that is already up.
    struct Harness {
        _env: TestEnvironment,
        buffer: Buffer,
        ctx: Context,
        config: BringupConfig,
        orchestrator: FakeOrchestrator,
        executor: RecordingExecutor,
        resolver: FakeResolver,
    }

    impl Harness {
        fn new(test_id: &str) -> Self {
            let mut env = TestEnvironment::new(test_id);
            let port = env.start_control_system();

            let mut node_disks = DiskMap::new();
            node_disks.insert("n1", &["/d1"]);
            node_disks.insert("n2", &["/d2"]);
            node_disks.insert("n3", &["/d3"]);

            let mut config = BringupConfig {
                primary_node: vec!["n1".to_string()],
                secondary_nodes: vec!["n2".to_string(), "n3".to_string()],
                node_disks,
                network: "cluster".to_string(),
                registry: "docker.io".to_string(),
                mapr_version: "6.0.1".to_string(),
                mep_version: Some("4.1.0".to_string()),
                ..Default::default()
            };
            config.readiness.control_system_port = port;
            config.readiness.control_system_interval_secs = 1;
            config.readiness.control_system_timeout_secs = 2;

            let executor = RecordingExecutor::new();
            executor.respond(
                "cat /opt/mapr/conf/mapr-clusters.conf",
                CommandOutput {
                    stdout: CLUSTERS_CONF.to_string(),
                    ..Default::default()
                },
            );

            let buffer = Buffer::new();
            Harness {
                _env: env,
                ctx: Context::buffered(buffer.clone()),
                buffer,
                config,
                orchestrator: FakeOrchestrator::new(),
                executor,
                resolver: FakeResolver::new(32768),
            }
        }

        fn run(&self) -> Result<BringupOutcome, Error> {
            Bringup::new(
                &self.ctx,
                &self.config,
                &self.orchestrator,
                &self.executor,
                &self.resolver,
            )
            .run()
        }

        fn report(&self) -> BringupReport {
            match self.run() {
                Ok(BringupOutcome::Running(report)) => report,
                other => panic!("unexpected outcome: {other:?}"),
            }
        }
    }

    #[test]
    fn insecure_three_nodes() {
        let harness = Harness::new("insecure_three_nodes");

        let report = harness.report();

        assert_eq!(report.primary_fqdn, "n1.cluster");
        assert_eq!(report.control_system_host_port, 32768);
        assert_eq!(
            *harness.resolver.looked_up.borrow(),
            vec![harness.config.readiness.control_system_port]
        );
        assert!(!report.installed);
        assert_eq!(*harness.orchestrator.created.borrow(), vec!["n1", "n2", "n3"]);
        assert_eq!(
            *harness.orchestrator.pulled.borrow(),
            vec![
                "docker.io/clusterdock/clusterdock:mapr6.0.1_mep4.1.0_primary-node",
                "docker.io/clusterdock/clusterdock:mapr6.0.1_mep4.1.0_secondary-node",
            ]
        );

        for (host, disk) in [("n1", "/d1"), ("n2", "/d2"), ("n3", "/d3")] {
            let configure: Vec<String> = harness
                .executor
                .commands_on(host)
                .into_iter()
                .filter(|c| c.contains("configure.sh"))
                .collect();
            assert_eq!(
                configure,
                vec![format!(
                    "/opt/mapr/server/configure.sh -C n1.cluster -Z n1.cluster -RM n1.cluster \
                     -HS n1.cluster -u mapr -g mapr -D {disk}"
                )]
            );
        }
        assert_eq!(harness.executor.count("-secure"), 0);
        assert_eq!(harness.executor.count("mruuidgen"), 3);

        let primary = harness.executor.commands_on("n1");
        assert_eq!(
            &primary[2..],
            &[
                "hadoop fs -mkdir -p /apps/spark && hadoop fs -chmod 777 /apps/spark".to_string(),
                "maprcli stream create -path /sample-stream -produceperm p -consumeperm p \
                 -topicperm p"
                    .to_string(),
                "sudo -u mapr hadoop fs -mkdir -p /user/sdc && sudo -u mapr hadoop fs -chown \
                 sdc:sdc /user/sdc"
                    .to_string(),
                "cat /opt/mapr/conf/mapr-clusters.conf".to_string(),
                "maprcli cluster gateway set -dstcluster demo.mapr.com -gateways n1.cluster"
                    .to_string(),
            ]
        );
        assert!(harness.executor.commands_on("n2").len() == 2);

        assert!(harness
            .buffer
            .contains("Detected MapR Control System server after"));
    }

    #[test]
    fn secure_cluster() {
        let mut harness = Harness::new("secure_cluster");
        harness.config.secure = true;
        harness.config.secure_config_directory = "/tmp/maprdock-secure".to_string();

        harness.report();

        let genkeys: Vec<(String, String)> = harness
            .executor
            .commands()
            .into_iter()
            .filter(|(_, c)| c.contains("-genkeys"))
            .collect();
        assert_eq!(genkeys.len(), 1);
        assert_eq!(genkeys[0].0, "n1");
        assert!(genkeys[0].1.contains("cp -f /opt/mapr/conf/maprserverticket"));

        for host in ["n2", "n3"] {
            let configure = harness
                .executor
                .commands_on(host)
                .into_iter()
                .find(|c| c.contains("configure.sh"))
                .unwrap();
            assert!(configure.starts_with("cp -f /etc/clusterdock/secure/maprserverticket"));
            assert!(configure.contains("configure.sh -secure -C n1.cluster"));
        }

        // The primary's configure runs before any secondary reads the bundle.
        let commands = harness.executor.commands();
        let primary = commands.iter().position(|(_, c)| c.contains("-genkeys"));
        let first_copy = commands
            .iter()
            .position(|(_, c)| c.starts_with("cp -f /etc/clusterdock/secure"));
        assert!(primary < first_copy);
    }

    #[test]
    fn node_failure_aborts() {
        let harness = Harness::new("node_failure_aborts");
        harness.executor.fail_on("n2", "configure.sh", 1);

        match harness.run() {
            Err(Error::RemoteCommand {
                hostname,
                exit_code,
                ..
            }) => {
                assert_eq!(hostname, "n2");
                assert_eq!(exit_code, 1);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(harness.executor.count("hadoop fs"), 0);
        assert_eq!(harness.executor.commands_on("n3").len(), 1);
    }

    #[test]
    fn disk_mismatch_fails_before_containers() {
        let mut harness = Harness::new("disk_mismatch_fails_before_containers");
        harness.config.secondary_nodes.push("n4".to_string());

        match harness.run() {
            Err(Error::Topology(TopologyError::DiskMismatch { missing, extra })) => {
                assert_eq!(missing, vec!["n4"]);
                assert!(extra.is_empty());
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(harness.orchestrator.pulled.borrow().is_empty());
        assert!(harness.orchestrator.created.borrow().is_empty());
        assert!(harness.executor.commands().is_empty());
    }

    #[test]
    fn only_pull() {
        let mut harness = Harness::new("only_pull");
        harness.config.only_pull = true;

        assert!(matches!(harness.run(), Ok(BringupOutcome::Pulled)));
        assert_eq!(harness.orchestrator.pulled.borrow().len(), 2);
        assert!(harness.orchestrator.created.borrow().is_empty());
        assert!(harness.executor.commands().is_empty());
    }

    #[test]
    fn container_failure_stops_bringup() {
        let mut harness = Harness::new("container_failure_stops_bringup");
        harness.orchestrator.fail_create = true;

        assert!(matches!(harness.run(), Err(Error::Container { .. })));
        assert!(harness.executor.commands().is_empty());
    }

    #[test]
    fn control_system_never_comes_up() {
        let mut harness = Harness::new("control_system_never_comes_up");
        harness.config.readiness.control_system_port = TestEnvironment::closed_port();

        match harness.run() {
            Err(Error::ReadinessTimeout {
                what,
                elapsed,
                timeout,
            }) => {
                assert_eq!(what, "MapR Control System server to come online");
                assert!(elapsed >= timeout);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(harness.executor.count("hadoop fs"), 0);
    }

    #[test]
    fn license_and_install() {
        let mut harness = Harness::new("license_and_install");
        harness.config.mapr_version = "6.1.0".to_string();
        harness.config.mep_version = Some("6.0.0".to_string());
        harness.config.license_url = Some("https://example.com/lic".to_string());
        harness.config.license_credentials = Some("me:secret".to_string());
        harness.config.sdc_version = Some("3.5.0-RC1".to_string());

        let report = harness.report();
        assert!(report.installed);

        let primary = harness.executor.commands_on("n1");
        let license = primary.iter().position(|c| c.contains("maprcli license add"));
        let gateway = primary.iter().position(|c| c.contains("gateway set"));
        let download = primary.iter().position(|c| c.contains("wget -q"));
        assert!(license.is_some());
        assert!(license < gateway);
        assert!(gateway < download);

        let download = &primary[download.unwrap()];
        assert!(download.contains("/3.5.0-RC1/rpm/el7/streamsets-datacollector-3.5.0-1.noarch.rpm"));
        assert!(download.contains("streamsets-datacollector-mapr_6_1-mep6-lib-3.5.0-1.noarch.rpm"));
        assert_eq!(
            primary.last().unwrap(),
            "systemctl start sdc && systemctl enable sdc"
        );
        assert_eq!(harness.executor.count("MAPR_MEP_VERSION=6"), 1);
    }

    #[test]
    fn no_license_before_mapr_6() {
        let mut harness = Harness::new("no_license_before_mapr_6");
        harness.config.mapr_version = "5.2.2".to_string();
        harness.config.mep_version = Some("3.0.1".to_string());
        harness.config.license_url = Some("https://example.com/lic".to_string());
        harness.config.license_credentials = Some("me:secret".to_string());
        harness.config.sdc_version = Some("2.7.0".to_string());
        harness.config.dont_register_gateway = true;

        let report = harness.report();
        assert!(report.installed);

        assert_eq!(harness.executor.count("license add"), 0);
        assert_eq!(harness.executor.count("gateway set"), 0);
        assert_eq!(
            harness.executor.count("mapr_spark_2_1_mep_3_0-lib-2.7.0-1.noarch.rpm"),
            3
        );
        assert_eq!(harness.executor.count("MAPR_MEP_VERSION"), 0);
        assert_eq!(
            harness.executor.commands_on("n1").last().unwrap(),
            "service sdc start && chkconfig --add sdc"
        );
    }

    #[test]
    fn install_disabled() {
        let mut harness = Harness::new("install_disabled");
        harness.config.sdc_version = Some("3.5.0".to_string());
        harness.config.dont_install_additional = true;

        assert!(!harness.report().installed);
        assert_eq!(harness.executor.count("wget"), 0);
    }

    #[test]
    fn variant_toggles() {
        let mut harness = Harness::new("variant_toggles");
        harness.config.default_db = Some("maprdb".to_string());
        harness.config.run_as = Some("mapr".to_string());
        harness.config.stop_services_before_configure = true;
        harness.executor.respond(
            "service mapr-warden status",
            CommandOutput {
                exit_code: 3,
                ..Default::default()
            },
        );

        harness.report();

        assert_eq!(harness.executor.count("-defaultdb maprdb"), 3);
        assert_eq!(harness.executor.count("service mapr-warden stop"), 3);
        assert_eq!(
            harness.executor.count("sudo -u mapr maprcli stream create"),
            1
        );
        let n2 = harness.executor.commands_on("n2");
        assert!(n2[0].starts_with("service mapr-warden stop"));
        assert!(n2.last().unwrap().ends_with("-defaultdb maprdb"));
    }

    #[test]
    fn stop_removes_every_container() {
        let harness = Harness::new("stop_removes_every_container");

        Bringup::new(
            &harness.ctx,
            &harness.config,
            &harness.orchestrator,
            &harness.executor,
            &harness.resolver,
        )
        .stop()
        .unwrap();

        assert_eq!(*harness.orchestrator.stopped.borrow(), vec!["n1", "n2", "n3"]);
        assert!(harness.executor.commands().is_empty());
    }
}
