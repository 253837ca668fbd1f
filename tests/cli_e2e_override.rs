//! End-to-end tests for the `override` command.
//!
//! These tests invoke the actual CLI binary and check the generated override
//! files from a user's perspective.

mod common;
use common::prelude::*;

#[test]
fn test_override_structured_image_to_stdout() {
    let fixture = TestFixture::new().with_values(values::NGINX);

    fixture
        .command()
        .arg("override")
        .arg("-f")
        .arg(fixture.values_path())
        .arg("--target-registry")
        .arg("harbor.local")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "repository: harbor.local/docker-io/library/nginx",
        ))
        .stdout(predicate::str::contains("tag: '1.25'"))
        .stdout(predicate::str::contains("pullPolicy").not())
        .stderr(predicate::str::contains("[OK] Rewrote 1/1 images (100%)"));
}

#[test]
fn test_override_writes_output_file() {
    let fixture = TestFixture::new().with_values(values::NGINX);

    fixture
        .command()
        .arg("override")
        .arg("-f")
        .arg(fixture.values_path())
        .arg("-t")
        .arg("harbor.local")
        .arg("--output-file")
        .arg("override.yaml")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    fixture
        .child("override.yaml")
        .assert(predicate::str::contains(
            "repository: harbor.local/docker-io/library/nginx",
        ));
}

#[test]
fn test_override_target_from_environment() {
    let fixture = TestFixture::new().with_values(values::NGINX);

    fixture
        .command()
        .env("IRR_TARGET_REGISTRY", "mirror.example.com")
        .arg("override")
        .arg("-f")
        .arg(fixture.values_path())
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "repository: mirror.example.com/docker-io/library/nginx",
        ));
}

#[test]
fn test_override_json_format() {
    let fixture = TestFixture::new().with_values(values::NGINX);

    fixture
        .command()
        .arg("override")
        .arg("-f")
        .arg(fixture.values_path())
        .arg("-t")
        .arg("harbor.local")
        .arg("--format")
        .arg("json")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            r#""repository": "harbor.local/docker-io/library/nginx""#,
        ));
}

#[test]
fn test_override_helm_set_format() {
    let fixture = TestFixture::new().with_values(values::NGINX);

    fixture
        .command()
        .arg("override")
        .arg("-f")
        .arg(fixture.values_path())
        .arg("-t")
        .arg("harbor.local")
        .arg("--format")
        .arg("helm-set")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "--set image.repository=harbor.local/docker-io/library/nginx\n",
        ))
        .stdout(predicate::str::contains("--set image.tag=1.25\n"));
}

#[test]
fn test_override_with_registry_file() {
    let fixture = TestFixture::new()
        .with_values(values::MIXED)
        .with_file("mappings.yaml", values::MAPPING_FILE);

    fixture
        .command()
        .arg("override")
        .arg("-f")
        .arg(fixture.values_path())
        .arg("--registry-file")
        .arg("mappings.yaml")
        .assert()
        .success()
        .stdout(predicate::str::contains("registry: harbor.local"))
        .stdout(predicate::str::contains("repository: mirror/docker-io/bitnami/nginx"))
        .stdout(predicate::str::contains(
            "image: harbor.local/quay/org/proxy:v2",
        ))
        .stdout(predicate::str::contains(
            "repository: harbor.local/mirror/gcr-io/google/cadvisor",
        ));
}

#[test]
fn test_override_merges_values_files_in_order() {
    let fixture = TestFixture::new()
        .with_values(values::NGINX)
        .with_file("prod.yaml", "image:\n  tag: \"1.27\"\n");

    fixture
        .command()
        .arg("override")
        .arg("-f")
        .arg("values.yaml")
        .arg("-f")
        .arg("prod.yaml")
        .arg("-t")
        .arg("harbor.local")
        .assert()
        .success()
        .stdout(predicate::str::contains("tag: '1.27'"))
        .stdout(predicate::str::contains("1.25").not());
}

#[test]
fn test_override_source_and_exclude_registries() {
    let fixture = TestFixture::new().with_values(values::MIXED);

    fixture
        .command()
        .arg("override")
        .arg("-f")
        .arg(fixture.values_path())
        .arg("-t")
        .arg("harbor.local")
        .arg("--source-registries")
        .arg("quay.io,gcr.io")
        .arg("--exclude-registries")
        .arg("gcr.io")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "image: harbor.local/quay-io/org/proxy:v2",
        ))
        .stdout(predicate::str::contains("bitnami").not())
        .stdout(predicate::str::contains("cadvisor").not());
}

#[test]
fn test_override_flat_strategy() {
    let fixture = TestFixture::new().with_values(values::MIXED);

    fixture
        .command()
        .arg("override")
        .arg("-f")
        .arg(fixture.values_path())
        .arg("-t")
        .arg("harbor.local")
        .arg("--strategy")
        .arg("flat")
        .assert()
        .success()
        .stdout(predicate::str::contains("repository: docker-io-bitnami-nginx"))
        .stdout(predicate::str::contains(
            "image: harbor.local/quay-io-org-proxy:v2",
        ));
}

#[test]
fn test_override_reports_skipped_images() {
    let fixture = TestFixture::new().with_values(values::BROKEN_IMAGE);

    fixture
        .command()
        .arg("override")
        .arg("-f")
        .arg(fixture.values_path())
        .arg("-t")
        .arg("harbor.local")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "repository: harbor.local/docker-io/library/nginx",
        ))
        .stderr(predicate::str::contains("Rewrote 1/2 images (50%)"))
        .stderr(predicate::str::contains("helper.image (Org/App:v1)"));
}

#[test]
fn test_override_strict_mode_fails_but_reports() {
    let fixture = TestFixture::new().with_values(values::BROKEN_IMAGE);

    fixture
        .command()
        .arg("override")
        .arg("-f")
        .arg(fixture.values_path())
        .arg("-t")
        .arg("harbor.local")
        .arg("--strict")
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Strict mode violation at 'helper.image'"))
        .stderr(predicate::str::contains("images left unchanged"));
}

#[test]
fn test_override_strict_mode_from_registry_file() {
    let fixture = TestFixture::new()
        .with_values(values::BROKEN_IMAGE)
        .with_file(
            "mappings.yaml",
            "registries:\n  defaultTarget: harbor.local\n  strictMode: true\n",
        );

    fixture
        .command()
        .arg("override")
        .arg("-f")
        .arg(fixture.values_path())
        .arg("--registry-file")
        .arg("mappings.yaml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Strict mode violation"));
}
