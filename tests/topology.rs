//! Integration tests for building cluster descriptors from create options

use std::time::Duration;

use k3dforge::cluster::{
    build_cluster, ApiPort, AttachmentError, BuildContext, BuildError, FilterError, Role,
    TopologyError, DEFAULT_API_PORT,
};
use k3dforge::config::{RawCreateOptions, ValidationError};

fn build(raw: RawCreateOptions) -> Result<k3dforge::Cluster, BuildError> {
    build_cluster(raw, &BuildContext::default())
}

fn topology(masters: i64, workers: i64) -> RawCreateOptions {
    RawCreateOptions {
        masters: Some(masters),
        workers: Some(workers),
        ..Default::default()
    }
}

#[test]
fn test_node_counts_match_options() {
    for (masters, workers) in [(1, 0), (1, 3), (3, 0), (3, 2), (0, 1)] {
        let cluster = build(topology(masters, workers)).unwrap();

        assert_eq!(cluster.nodes().len() as i64, masters + workers);
        assert_eq!(cluster.nodes_with_role(Role::Master).count() as i64, masters);
        assert_eq!(cluster.nodes_with_role(Role::Worker).count() as i64, workers);
        assert_eq!(cluster.nodes_with_role(Role::LoadBalancer).count(), 0);
    }
}

#[test]
fn test_init_node_iff_multiple_masters() {
    for masters in 0..4 {
        let cluster = build(topology(masters, 1)).unwrap();
        match cluster.init_node() {
            Some(init) => {
                assert!(masters > 1);
                assert_eq!(init, &cluster.nodes()[0]);
                assert!(init.is_init());
            }
            None => assert!(masters <= 1),
        }
    }
}

#[test]
fn test_example_multi_master_with_worker_port() {
    let raw = RawCreateOptions {
        ports: vec!["8080:80@worker[0]".to_string()],
        ..topology(3, 2)
    };
    let cluster = build(raw).unwrap();

    let masters: Vec<_> = cluster.nodes_with_role(Role::Master).collect();
    let workers: Vec<_> = cluster.nodes_with_role(Role::Worker).collect();
    assert_eq!(masters.len(), 3);
    assert_eq!(workers.len(), 2);
    assert!(masters[0].is_init());
    assert!(!masters[1].is_init());
    assert!(!masters[2].is_init());

    let lb = cluster.master_load_balancer().unwrap();
    assert_eq!(lb.role(), Role::LoadBalancer);

    assert_eq!(workers[0].ports(), ["8080:80".to_string()]);
    assert!(workers[1].ports().is_empty());
    assert!(masters.iter().all(|m| m.ports().is_empty()));
    assert!(lb.ports().is_empty());
}

#[test]
fn test_example_host_network_single_master() {
    let raw = RawCreateOptions {
        network: Some("host".to_string()),
        api_port: Some("0.0.0.0:6550".to_string()),
        ..topology(1, 0)
    };
    let cluster = build(raw).unwrap();

    assert_eq!(cluster.nodes().len(), 1);
    assert_eq!(cluster.nodes()[0].role(), Role::Master);
    assert_eq!(cluster.expose_api.port, ApiPort::Fixed(DEFAULT_API_PORT));
}

#[test]
fn test_host_network_rejects_multiple_nodes() {
    for (masters, workers) in [(2, 0), (1, 1), (0, 2)] {
        let raw = RawCreateOptions {
            network: Some("host".to_string()),
            ..topology(masters, workers)
        };
        assert!(matches!(
            build(raw),
            Err(BuildError::Validation(ValidationError::HostNetworkMultipleNodes(_)))
        ));
    }
}

#[test]
fn test_example_zero_timeout_fails() {
    let raw = RawCreateOptions {
        timeout: Some("0s".to_string()),
        ..topology(1, 0)
    };
    assert!(matches!(
        build(raw),
        Err(BuildError::Validation(ValidationError::NonPositiveTimeout(_)))
    ));
}

#[test]
fn test_timeout_is_carried() {
    let raw = RawCreateOptions {
        timeout: Some("2m".to_string()),
        ..topology(1, 0)
    };
    let cluster = build(raw).unwrap();
    assert_eq!(cluster.create_opts.timeout, Some(Duration::from_secs(120)));
}

#[test]
fn test_unfiltered_port_is_ambiguous_with_multiple_addressable_nodes() {
    // load balancer counts as addressable
    for (masters, workers, no_lb) in [(1, 0, false), (1, 1, true), (2, 0, true), (3, 2, false)] {
        let raw = RawCreateOptions {
            ports: vec!["8080:80".to_string()],
            no_lb: Some(no_lb),
            ..topology(masters, workers)
        };
        assert_eq!(
            build(raw),
            Err(BuildError::Topology(TopologyError::AmbiguousPort(
                "8080:80".to_string()
            )))
        );
    }
}

#[test]
fn test_unfiltered_port_with_single_node() {
    let raw = RawCreateOptions {
        ports: vec!["8080:80".to_string()],
        no_lb: Some(true),
        ..topology(1, 0)
    };
    let cluster = build(raw).unwrap();
    assert_eq!(cluster.nodes()[0].ports(), ["8080:80".to_string()]);
}

#[test]
fn test_duplicate_port_specs_fail_regardless_of_filters() {
    let raw = RawCreateOptions {
        ports: vec![
            "8080:80@worker[0]".to_string(),
            "8080:80@master[0]".to_string(),
        ],
        ..topology(1, 1)
    };
    assert!(matches!(
        build(raw),
        Err(BuildError::Validation(ValidationError::Attachment(
            AttachmentError::DuplicatePort(_)
        )))
    ));
}

#[test]
fn test_equivalent_port_specs_are_duplicates() {
    for second in ["8080:80/tcp@worker[1]", "08080:080@worker[1]", "8080:80/TCP@worker[1]"] {
        let raw = RawCreateOptions {
            ports: vec!["8080:80@worker[0]".to_string(), second.to_string()],
            ..topology(1, 2)
        };
        assert_eq!(
            build(raw),
            Err(BuildError::Validation(ValidationError::Attachment(
                AttachmentError::DuplicatePort("8080:80".to_string())
            )))
        );
    }
}

#[test]
fn test_udp_port_is_distinct_from_tcp() {
    let raw = RawCreateOptions {
        ports: vec!["53:53/tcp@worker[0]".to_string(), "53:53/udp@worker[1]".to_string()],
        ..topology(1, 2)
    };
    let cluster = build(raw).unwrap();
    let workers: Vec<_> = cluster.nodes_with_role(Role::Worker).collect();
    assert_eq!(workers[0].ports(), ["53:53".to_string()]);
    assert_eq!(workers[1].ports(), ["53:53/udp".to_string()]);
}

#[test]
fn test_repeated_volume_unions_filters() {
    let raw = RawCreateOptions {
        volumes: vec!["/a:/a".to_string(), "/a:/a@master[0]".to_string()],
        ..topology(1, 2)
    };
    let cluster = build(raw).unwrap();

    let volumes: Vec<_> = cluster.nodes().iter().map(|n| n.volumes().to_vec()).collect();
    assert_eq!(volumes, vec![vec!["/a:/a".to_string()], vec![], vec![]]);
}

#[test]
fn test_huge_node_count_on_host_network_fails_cleanly() {
    let raw = RawCreateOptions {
        network: Some("host".to_string()),
        ..topology(i64::MAX, i64::MAX)
    };
    assert!(matches!(
        build(raw),
        Err(BuildError::Validation(ValidationError::HostNetworkMultipleNodes(_)))
    ));
}

#[test]
fn test_unfiltered_volume_attaches_to_every_node() {
    let raw = RawCreateOptions {
        volumes: vec!["/data:/data".to_string()],
        ..topology(1, 2)
    };
    let cluster = build(raw).unwrap();

    assert_eq!(cluster.nodes().len(), 3);
    for node in cluster.nodes() {
        assert_eq!(node.volumes(), ["/data:/data".to_string()]);
    }
    assert!(cluster.master_load_balancer().unwrap().volumes().is_empty());
}

#[test]
fn test_filtered_volumes() {
    let raw = RawCreateOptions {
        volumes: vec![
            "/my/path@worker[0,1]".to_string(),
            "/tmp/test:/tmp/other@master[0]".to_string(),
            "/my/path@master".to_string(),
        ],
        ..topology(1, 2)
    };
    let cluster = build(raw).unwrap();

    let master = &cluster.nodes()[0];
    assert_eq!(
        master.volumes(),
        ["/my/path:/my/path".to_string(), "/tmp/test:/tmp/other".to_string()]
    );
    for worker in cluster.nodes_with_role(Role::Worker) {
        assert_eq!(worker.volumes(), ["/my/path:/my/path".to_string()]);
    }
}

#[test]
fn test_filter_errors_propagate() {
    let raw = RawCreateOptions {
        ports: vec!["8080:80@worker[5]".to_string()],
        ..topology(1, 2)
    };
    assert!(matches!(
        build(raw),
        Err(BuildError::Topology(TopologyError::Filter {
            source: FilterError::IndexOutOfRange { index: 5, .. },
            ..
        }))
    ));

    let raw = RawCreateOptions {
        volumes: vec!["/data@worker".to_string()],
        ..topology(1, 0)
    };
    assert!(matches!(
        build(raw),
        Err(BuildError::Topology(TopologyError::Filter {
            source: FilterError::NoMatch(_),
            ..
        }))
    ));

    let raw = RawCreateOptions {
        volumes: vec!["/data@agent[0]".to_string()],
        ..topology(1, 0)
    };
    assert!(matches!(
        build(raw),
        Err(BuildError::Topology(TopologyError::Filter {
            source: FilterError::Syntax(_),
            ..
        }))
    ));
}

#[test]
fn test_port_on_load_balancer_and_range() {
    let raw = RawCreateOptions {
        ports: vec![
            "6550:6443@loadbalancer".to_string(),
            "30080:80@worker[0:1]".to_string(),
        ],
        ..topology(1, 3)
    };
    let cluster = build(raw).unwrap();

    assert_eq!(
        cluster.master_load_balancer().unwrap().ports(),
        ["6550:6443".to_string()]
    );
    let workers: Vec<_> = cluster.nodes_with_role(Role::Worker).collect();
    assert_eq!(workers[0].ports(), ["30080:80".to_string()]);
    assert_eq!(workers[1].ports(), ["30080:80".to_string()]);
    assert!(workers[2].ports().is_empty());
}

#[test]
fn test_server_and_agent_args_are_role_specific() {
    let raw = RawCreateOptions {
        k3s_server_args: vec!["--tls-san=dev.local".to_string()],
        k3s_agent_args: vec!["--node-label=tier=edge".to_string()],
        ..topology(2, 1)
    };
    let cluster = build(raw).unwrap();

    for master in cluster.nodes_with_role(Role::Master) {
        assert_eq!(master.args(), ["--tls-san=dev.local".to_string()]);
    }
    for worker in cluster.nodes_with_role(Role::Worker) {
        assert_eq!(worker.args(), ["--node-label=tier=edge".to_string()]);
    }
}

#[test]
fn test_descriptor_serializes() {
    let raw = RawCreateOptions {
        name: Some("dev".to_string()),
        ports: vec!["8080:80@worker[0]".to_string()],
        ..topology(3, 1)
    };
    let cluster = build(raw).unwrap();
    let json = serde_json::to_value(&cluster).unwrap();

    assert_eq!(json["name"], "dev");
    assert_eq!(json["nodes"].as_array().unwrap().len(), 4);
    assert_eq!(json["nodes"][0]["role"], "master");
    assert_eq!(json["nodes"][0]["masterOpts"]["isInit"], true);
    assert_eq!(json["nodes"][3]["ports"][0], "8080:80");
    assert_eq!(json["initNode"], 0);
    assert_eq!(json["masterLoadBalancer"]["role"], "loadbalancer");
    assert_eq!(json["exposeAPI"]["port"], "random");
}
