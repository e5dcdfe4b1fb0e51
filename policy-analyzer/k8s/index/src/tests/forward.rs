use super::*;
use crate::{graph::PolicyGraph, Error, ResolvedIdentity};
use linkerd_policy_analyzer_core::TargetPort;

#[tokio::test]
async fn frontend_reaches_backend_server() {
    let test = TestConfig::frontend_backend();

    let targets = test
        .resolver()
        .allowed_targets("prod", "frontend")
        .await
        .expect("frontend must resolve");

    assert_eq!(targets.source.service_account, "frontend-sa");
    assert_eq!(targets.total_targets, 1);
    let target = &targets.allowed_targets[0];
    assert_eq!(target.namespace, "prod");
    assert_eq!(target.server, "backend-server");
    assert_eq!(target.port, TargetPort::Number(8080));
    assert_eq!(target.authorization_policy, "backend-policy");
    assert_eq!(
        target.labels,
        btreemap! { "app".to_string() => "backend".to_string() }
    );
}

#[tokio::test]
async fn unauthorized_workload_has_no_targets() {
    let test = TestConfig::frontend_backend();

    let targets = test
        .resolver()
        .allowed_targets("prod", "backend")
        .await
        .expect("backend must resolve");
    assert_eq!(targets.total_targets, 0);
    assert!(targets.allowed_targets.is_empty());
}

#[tokio::test]
async fn missing_workload_is_not_found() {
    let test = TestConfig::frontend_backend();

    let error = test
        .resolver()
        .allowed_targets("prod", "nonexistent")
        .await
        .expect_err("nonexistent must not resolve");
    assert!(matches!(error, Error::NoPods { .. }));
    assert_eq!(
        error.to_string(),
        "no pods found for service nonexistent in namespace prod"
    );
}

#[tokio::test]
async fn empty_arguments_are_rejected() {
    let test = TestConfig::default();
    let error = test
        .resolver()
        .allowed_targets("", "frontend")
        .await
        .expect_err("namespace is required");
    assert!(matches!(error, Error::MissingArgument("namespace")));
}

#[tokio::test]
async fn service_account_namespace_defaults_to_server() {
    let mut test = TestConfig::frontend_backend();
    test.source.meshtls_authentications = vec![mk_meshtls(
        "prod",
        "frontend-authn",
        vec![],
        vec![ServiceAccountRef::new("frontend-sa", None)],
    )];

    let targets = test
        .resolver()
        .allowed_targets("prod", "frontend")
        .await
        .unwrap();
    assert_eq!(targets.total_targets, 1);

    // The same service account name in another namespace is a different client.
    test.source
        .pods
        .push(mk_pod("staging", "frontend-1", "frontend", "frontend-sa"));
    let targets = test
        .resolver()
        .allowed_targets("staging", "frontend")
        .await
        .unwrap();
    assert_eq!(targets.total_targets, 0);
}

#[tokio::test]
async fn wildcard_identity_authorizes_every_client() {
    let mut test = TestConfig::frontend_backend();
    test.source.meshtls_authentications = vec![mk_meshtls(
        "prod",
        "frontend-authn",
        vec!["*"],
        vec![],
    )];

    for workload in ["frontend", "backend"] {
        let targets = test
            .resolver()
            .allowed_targets("prod", workload)
            .await
            .unwrap();
        assert_eq!(targets.total_targets, 1, "{workload}");
    }
}

#[tokio::test]
async fn network_authentication_never_authorizes_identity() {
    let mut test = TestConfig::frontend_backend();
    test.source.network_authentications =
        vec![mk_network("prod", "everywhere", vec![("0.0.0.0/0", vec![])])];
    test.source.authorization_policies = vec![mk_policy(
        "prod",
        "backend-policy",
        "backend-server",
        vec![NamespacedTargetRef::new("NetworkAuthentication", "everywhere")],
    )];

    let targets = test
        .resolver()
        .allowed_targets("prod", "frontend")
        .await
        .unwrap();
    assert_eq!(targets.total_targets, 0);
}

#[tokio::test]
async fn cross_namespace_authentication_ref() {
    let mut test = TestConfig::frontend_backend();
    test.source.meshtls_authentications = vec![mk_meshtls(
        "linkerd",
        "mesh-clients",
        vec!["frontend-sa.prod.serviceaccount.identity.linkerd.cluster.local"],
        vec![],
    )];
    test.source.authorization_policies = vec![mk_policy(
        "prod",
        "backend-policy",
        "backend-server",
        vec![NamespacedTargetRef::new("MeshTLSAuthentication", "mesh-clients").in_namespace("linkerd")],
    )];

    let targets = test
        .resolver()
        .allowed_targets("prod", "frontend")
        .await
        .unwrap();
    assert_eq!(targets.total_targets, 1);
}

#[tokio::test]
async fn server_without_port_is_omitted() {
    let mut test = TestConfig::frontend_backend();
    test.source.servers[0].spec.port = None;

    let targets = test
        .resolver()
        .allowed_targets("prod", "frontend")
        .await
        .unwrap();
    assert_eq!(targets.total_targets, 0);
}

#[tokio::test]
async fn targets_are_ordered() {
    let mut test = TestConfig::frontend_backend();
    test.source.meshtls_authentications = vec![
        mk_meshtls("prod", "frontend-authn", vec!["*"], vec![]),
        mk_meshtls("emojivoto", "all", vec!["*"], vec![]),
    ];
    test.source
        .servers
        .push(mk_server("emojivoto", "web-http", "web", 8080));
    test.source
        .servers
        .push(mk_server("prod", "admin-server", "backend", 9990));
    test.source.authorization_policies.extend([
        mk_policy(
            "emojivoto",
            "web-policy",
            "web-http",
            vec![NamespacedTargetRef::new("MeshTLSAuthentication", "all")],
        ),
        mk_policy(
            "prod",
            "admin-policy",
            "admin-server",
            vec![NamespacedTargetRef::new(
                "MeshTLSAuthentication",
                "frontend-authn",
            )],
        ),
    ]);

    let targets = test
        .resolver()
        .allowed_targets("prod", "frontend")
        .await
        .unwrap();
    let names = targets
        .allowed_targets
        .iter()
        .map(|t| (t.namespace.as_str(), t.server.as_str()))
        .collect::<Vec<_>>();
    assert_eq!(
        names,
        vec![
            ("emojivoto", "web-http"),
            ("prod", "admin-server"),
            ("prod", "backend-server"),
        ]
    );
}

#[tokio::test]
async fn failing_policy_namespace_is_skipped() {
    let mut test = TestConfig::frontend_backend();
    test.source.meshtls_authentications.push(mk_meshtls(
        "staging",
        "frontend-authn",
        vec!["frontend-sa.prod.serviceaccount.identity.linkerd.cluster.local"],
        vec![],
    ));
    test.source
        .servers
        .push(mk_server("staging", "backend-server", "backend", 8080));
    test.source.authorization_policies.push(mk_policy(
        "staging",
        "backend-policy",
        "backend-server",
        vec![NamespacedTargetRef::new(
            "MeshTLSAuthentication",
            "frontend-authn",
        )],
    ));

    let healthy = Resolver::new(
        FailingSource {
            inner: test.source.clone(),
            ..Default::default()
        },
        ClusterInfo::default(),
    );
    let targets = healthy.allowed_targets("prod", "frontend").await.unwrap();
    assert_eq!(targets.total_targets, 2);

    let failing = Resolver::new(
        FailingSource {
            inner: test.source.clone(),
            policies_in: Some("staging".to_string()),
            ..Default::default()
        },
        ClusterInfo::default(),
    );
    let targets = failing.allowed_targets("prod", "frontend").await.unwrap();
    assert_eq!(targets.total_targets, 1);
    assert_eq!(targets.allowed_targets[0].namespace, "prod");
}

#[tokio::test]
async fn server_listing_failure_is_terminal() {
    let test = TestConfig::frontend_backend();
    let resolver = Resolver::new(
        FailingSource {
            inner: test.source.clone(),
            servers: true,
            ..Default::default()
        },
        ClusterInfo::default(),
    );

    let error = resolver
        .allowed_targets("prod", "frontend")
        .await
        .expect_err("servers must be listed");
    assert!(matches!(error, Error::ListServers(_)));
    assert!(error
        .to_string()
        .ends_with("(ensure Linkerd policy CRDs are installed)"));
}

#[test]
fn policies_without_authentications_authorize_no_one() {
    let _test = TestConfig::default();
    let mut graph = PolicyGraph::default();
    graph.index_server(mk_server("prod", "backend-server", "backend", 8080));
    graph.index_meshtls(mk_meshtls("prod", "all", vec!["*"], vec![]));
    graph.index_policy(mk_policy("prod", "open", "backend-server", vec![]));
    graph.index_policy(mk_policy(
        "prod",
        "unsupported",
        "backend-server",
        vec![NamespacedTargetRef::new("ServiceAccount", "frontend-sa")],
    ));

    let client = ResolvedIdentity {
        namespace: "prod".to_string(),
        workload: "frontend".to_string(),
        service_account: "frontend-sa".to_string(),
        identity: ClusterInfo::default().service_account_identity("prod", "frontend-sa"),
    };
    let policies = graph.policies_targeting("prod", "backend-server");
    assert_eq!(policies.len(), 2);
    for policy in &policies {
        assert!(policy.authentications().is_empty(), "{}", policy.name);
        assert!(!graph.is_source_authorized(policy, &client), "{}", policy.name);
    }
}
