//! ConvertImageRef behaviour across reference shapes and registries

mod common;

use common::*;
use scangate_aqua::StaticRegistryTable;
use scangate_core::Error;
use tokio_util::sync::CancellationToken;

struct Case {
    name: &'static str,
    image_ref: &'static str,
    table: &'static [(&'static str, &'static str)],
    registry: &'static str,
    image: &'static str,
    tag: &'static str,
}

const CASES: &[Case] = &[
    Case {
        name: "docker hub image with namespace and tag",
        image_ref: "docker.io/library/python:3.12.12",
        table: &[("docker.io", "Docker Hub")],
        registry: "Docker Hub",
        image: "library/python",
        tag: "3.12.12",
    },
    Case {
        name: "docker hub image without explicit registry",
        image_ref: "library/nginx:latest",
        table: &[("docker.io", "Docker Hub")],
        registry: "Docker Hub",
        image: "library/nginx",
        tag: "latest",
    },
    Case {
        name: "docker hub single name image",
        image_ref: "nginx",
        table: &[("docker.io", "Docker Hub")],
        registry: "Docker Hub",
        image: "nginx",
        tag: "latest",
    },
    Case {
        name: "docker hub image with tag",
        image_ref: "nginx:1.21.0",
        table: &[("docker.io", "Docker Hub")],
        registry: "Docker Hub",
        image: "nginx",
        tag: "1.21.0",
    },
    Case {
        name: "gcr image with tag",
        image_ref: "gcr.io/project/image:v1.0.0",
        table: &[("gcr.io", "GCR")],
        registry: "GCR",
        image: "project/image",
        tag: "v1.0.0",
    },
    Case {
        name: "custom registry with port",
        image_ref: "registry.io:5000/team/project/image:tag",
        table: &[("registry.io:5000", "Custom Registry")],
        registry: "Custom Registry",
        image: "team/project/image",
        tag: "tag",
    },
    Case {
        name: "custom registry with port and no tag",
        image_ref: "registry.io:5000/image",
        table: &[("registry.io:5000", "Custom Registry")],
        registry: "Custom Registry",
        image: "image",
        tag: "latest",
    },
    Case {
        name: "image with digest",
        image_ref: "docker.io/library/alpine@sha256:abcd1234",
        table: &[("docker.io", "Docker Hub")],
        registry: "Docker Hub",
        image: "library/alpine",
        tag: "latest",
    },
    Case {
        name: "image with tag and digest",
        image_ref: "gcr.io/project/image:v1.0@sha256:abcd1234",
        table: &[("gcr.io", "GCR")],
        registry: "GCR",
        image: "project/image",
        tag: "v1.0",
    },
    Case {
        name: "multi-level namespace",
        image_ref: "registry.io/team/project/subproject/image:tag",
        table: &[("registry.io", "Custom Registry")],
        registry: "Custom Registry",
        image: "team/project/subproject/image",
        tag: "tag",
    },
    Case {
        name: "complex tag",
        image_ref: "docker.io/library/app:v1.2.3-alpha.1",
        table: &[("docker.io", "Docker Hub")],
        registry: "Docker Hub",
        image: "library/app",
        tag: "v1.2.3-alpha.1",
    },
    Case {
        name: "ecr-style registry",
        image_ref: "123456789012.dkr.ecr.us-east-1.amazonaws.com/myapp:latest",
        table: &[("123456789012.dkr.ecr.us-east-1.amazonaws.com", "AWS ECR")],
        registry: "AWS ECR",
        image: "myapp",
        tag: "latest",
    },
    Case {
        name: "azure container registry",
        image_ref: "myregistry.azurecr.io/samples/nginx:latest",
        table: &[("myregistry.azurecr.io", "Azure ACR")],
        registry: "Azure ACR",
        image: "samples/nginx",
        tag: "latest",
    },
    Case {
        name: "no tag defaults to latest",
        image_ref: "gcr.io/project/image",
        table: &[("gcr.io", "GCR")],
        registry: "GCR",
        image: "project/image",
        tag: "latest",
    },
    Case {
        name: "quay image",
        image_ref: "quay.io/prometheus/prometheus:v2.30.0",
        table: &[("quay.io", "Quay")],
        registry: "Quay",
        image: "prometheus/prometheus",
        tag: "v2.30.0",
    },
    Case {
        name: "underscores and hyphens",
        image_ref: "docker.io/my_org/my-app_v2:1.0.0-rc1",
        table: &[("docker.io", "Docker Hub")],
        registry: "Docker Hub",
        image: "my_org/my-app_v2",
        tag: "1.0.0-rc1",
    },
    Case {
        name: "registry with subdomain",
        image_ref: "eu.gcr.io/project-id/image:tag",
        table: &[("eu.gcr.io", "GCR EU")],
        registry: "GCR EU",
        image: "project-id/image",
        tag: "tag",
    },
    Case {
        name: "sha-like tag",
        image_ref: "docker.io/library/app:sha-abcd1234",
        table: &[("docker.io", "Docker Hub")],
        registry: "Docker Hub",
        image: "library/app",
        tag: "sha-abcd1234",
    },
    Case {
        name: "registry with hyphen",
        image_ref: "my-registry.io/app:v1",
        table: &[("my-registry.io", "My Registry")],
        registry: "My Registry",
        image: "app",
        tag: "v1",
    },
    Case {
        name: "many path segments",
        image_ref: "gcr.io/a/b/c/d/e/image:tag",
        table: &[("gcr.io", "GCR")],
        registry: "GCR",
        image: "a/b/c/d/e/image",
        tag: "tag",
    },
    Case {
        name: "numeric tag",
        image_ref: "docker.io/app:12345",
        table: &[("docker.io", "Docker Hub")],
        registry: "Docker Hub",
        image: "app",
        tag: "12345",
    },
    Case {
        name: "tag with special characters",
        image_ref: "docker.io/app:v1.0_beta-rc.1+build.123",
        table: &[("docker.io", "Docker Hub")],
        registry: "Docker Hub",
        image: "app",
        tag: "v1.0_beta-rc.1+build.123",
    },
    Case {
        name: "table keyed with scheme",
        image_ref: "gcr.io/project/image:v1",
        table: &[("https://gcr.io", "GCR")],
        registry: "GCR",
        image: "project/image",
        tag: "v1",
    },
];

#[tokio::test]
async fn test_convert_image_ref_table() {
    for case in CASES {
        let client = client_with_table(case.table.iter().copied().collect());

        let target = client
            .convert_image_ref(case.image_ref)
            .await
            .unwrap_or_else(|e| panic!("{}: unexpected error {e}", case.name));

        assert_eq!(target.registry_name, case.registry, "{}", case.name);
        assert_eq!(target.repository, case.image, "{}", case.name);
        assert_eq!(target.tag, case.tag, "{}", case.name);
    }
}

#[tokio::test]
async fn test_convert_records_digest_separately() {
    let client = client_with_table(StaticRegistryTable::new().with("gcr.io", "GCR"));

    let target = client
        .convert_image_ref("gcr.io/project/image:v1.0@sha256:abcd1234")
        .await
        .unwrap();

    assert_eq!(target.tag, "v1.0");
    assert_eq!(target.digest.as_deref(), Some("sha256:abcd1234"));
}

#[tokio::test]
async fn test_convert_empty_table_is_not_found() {
    let client = client_with_table(StaticRegistryTable::new());

    let err = client.convert_image_ref("nginx:latest").await.unwrap_err();
    match err {
        Error::NotFound { hostname } => assert_eq!(hostname, "docker.io"),
        other => panic!("expected not found, got {other:?}"),
    }
}

#[tokio::test]
async fn test_convert_unknown_registry_is_not_found() {
    let client = client_with_table(StaticRegistryTable::new().with("docker.io", "Docker Hub"));

    let err = client
        .convert_image_ref("ghcr.io/org/app:v1")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_resolve_image_info_reports_reference_fields() {
    let client = client_with_table(StaticRegistryTable::new());

    let info = client
        .resolve_image_info("docker.io/library/python:3.12.12", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(info.registry, "docker.io");
    assert_eq!(info.repository, "library/python");
    assert_eq!(info.tag, "3.12.12");
    assert_eq!(info.manifest_digest, MANIFEST_DIGEST);
    assert_eq!(info.config_digest, CONFIG_DIGEST);
}
