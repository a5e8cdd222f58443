// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Exit codes and output layout of the `batchplan` binary.

use batchplan_model::{ElementMesh, ElementRecord, MeshRecord, ModelDocument, Point3, StoreyRecord};
use std::fs;
use std::path::Path;
use std::process::Command;

fn write_house(path: &Path) {
    let mesh = ElementMesh::cuboid(Point3::new(0.0, 0.0, 0.0), Point3::new(4.0, 0.2, 3.0));
    let document = ModelDocument {
        name: Some("House".into()),
        unit_scale: 1.0,
        storeys: vec![StoreyRecord {
            id: "GF".into(),
            name: Some("Ground Floor".into()),
            elevation: 0.0,
            members: None,
        }],
        elements: vec![ElementRecord {
            id: "W1".into(),
            type_name: "IfcWall".into(),
            name: None,
            mesh: Some(MeshRecord {
                coordinates: mesh.vertices.iter().flat_map(|p| [p.x, p.y, p.z]).collect(),
                indices: mesh.triangles.iter().flatten().copied().collect(),
            }),
            transform: None,
        }],
    };
    fs::write(path, serde_json::to_string(&document).unwrap()).unwrap();
}

fn batchplan() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_batchplan"));
    cmd.env_remove("BATCHPLAN_WORKERS")
        .env_remove("BATCHPLAN_SLICE_OFFSET")
        .env("RUST_LOG", "off");
    cmd
}

#[test]
fn produces_outputs_and_report() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("house.json");
    write_house(&input);
    let out = dir.path().join("plans");

    let status = batchplan()
        .arg(&input)
        .arg("--output")
        .arg(&out)
        .args(["--formatter", "image,wkt", "--width", "128", "--height", "96"])
        .status()
        .unwrap();

    assert_eq!(status.code(), Some(0));
    assert!(out.join("House").join("Ground Floor_floor_plan.csv").is_file());
    assert!(out.join("House").join("Ground Floor_floor_plan.png").is_file());

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("report.json")).unwrap()).unwrap();
    assert_eq!(report["counters"]["artifacts_written"], 2);
}

#[test]
fn nothing_generated_exits_one() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("broken.json");
    fs::write(&input, "not json").unwrap();

    let status = batchplan()
        .arg(&input)
        .arg("--output")
        .arg(dir.path().join("plans"))
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(1));
}

#[test]
fn invalid_arguments_exit_two() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("house.json");
    write_house(&input);

    let tolerances = batchplan()
        .arg(&input)
        .args(["--merge-tolerance", "0.05", "--gap-tolerance", "0.01"])
        .status()
        .unwrap();
    assert_eq!(tolerances.code(), Some(2));

    let formatter = batchplan()
        .arg(&input)
        .args(["--formatter", "svg"])
        .status()
        .unwrap();
    assert_eq!(formatter.code(), Some(2));
}
