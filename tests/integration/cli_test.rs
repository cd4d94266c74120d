//! End-to-end tests of the `connector` binary.

use std::path::Path;
use std::process::{Command, Output};

use serde_json::{Value, json};

fn connector(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_connector"))
        .arg("--config-dir")
        .arg(Path::new(env!("CARGO_MANIFEST_DIR")).join("config"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("run connector")
}

fn stdout_json(output: &Output) -> Value {
    assert!(
        output.status.success(),
        "connector failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

fn write_fixture(dir: &Path) -> std::path::PathBuf {
    let fixture = json!({
        "objects": [
            {
                "id": "wall",
                "type": "Brep",
                "layer": "Level 1::Walls",
                "properties": { "area": 12.5 },
                "material": {
                    "applicationId": "brick",
                    "name": "Brick",
                    "diffuse": 4289331200u32,
                    "opacity": 1.0
                }
            },
            {
                "id": "broken",
                "type": "Curve",
                "layer": "Level 1",
                "error": "self-intersecting"
            },
            {
                "id": "chair",
                "type": "BlockReference",
                "layer": "Level 2",
                "instance": { "name": "Chair", "vertices": [0.0, 0.0, 0.0, 1.0, 1.0, 1.0] }
            }
        ]
    });
    let path = dir.join("fixture.json");
    std::fs::write(&path, serde_json::to_vec(&fixture).expect("fixture json")).expect("write fixture");
    path
}

#[test]
fn test_send_then_receive() {
    let dir = tempfile::tempdir().expect("tempdir");
    let fixture = write_fixture(dir.path());
    let root = dir.path().join("root.json");

    let sent = stdout_json(&connector(&[
        "--format",
        "json",
        "send",
        "--fixture",
        fixture.to_str().expect("utf-8 path"),
        "--project",
        "p1",
        "--setting",
        "sendNormals=true",
        "--out",
        root.to_str().expect("utf-8 path"),
    ]));

    let statuses: Vec<_> = sent
        .as_array()
        .expect("result rows")
        .iter()
        .map(|row| row["status"].as_str().expect("status"))
        .collect();
    assert_eq!(statuses, ["success", "error", "success"]);

    let received = stdout_json(&connector(&[
        "--format",
        "json",
        "receive",
        "--root",
        root.to_str().expect("utf-8 path"),
    ]));
    let rows = received.as_array().expect("object rows");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["layer"], "Level 1::Walls");
    assert_eq!(rows[0]["node_type"], "object");
    assert_eq!(rows[1]["node_type"], "instance");
}

#[test]
fn test_repeated_pass_is_served_from_cache() {
    let dir = tempfile::tempdir().expect("tempdir");
    let fixture = write_fixture(dir.path());

    let sent = stdout_json(&connector(&[
        "--format",
        "json",
        "send",
        "--fixture",
        fixture.to_str().expect("utf-8 path"),
        "--project",
        "p1",
        "--passes",
        "2",
    ]));

    let wall = &sent.as_array().expect("result rows")[0];
    assert_eq!(wall["status"], "cached");
    assert_eq!(wall["result_type"], "ObjectReference");
}

#[test]
fn test_all_failures_exit_nonzero() {
    let dir = tempfile::tempdir().expect("tempdir");
    let fixture = dir.path().join("fixture.json");
    std::fs::write(
        &fixture,
        r#"{ "objects": [ { "id": "a", "type": "Curve", "error": "degenerate" } ] }"#,
    )
    .expect("write fixture");

    let output = connector(&[
        "send",
        "--fixture",
        fixture.to_str().expect("utf-8 path"),
        "--project",
        "p1",
    ]);
    assert!(!output.status.success());
}

#[test]
fn test_hash_matches_library() {
    let output = connector(&["hash", "--vertices", "0,0,0,1,-1,0.5"]);
    assert!(output.status.success());

    let printed = String::from_utf8(output.stdout).expect("utf-8");
    let expected = connector_pipeline::InstanceDeduplicator::compute_content_hash(&[
        0.0, 0.0, 0.0, 1.0, -1.0, 0.5,
    ]);
    assert_eq!(printed.trim(), expected.as_str());
}
