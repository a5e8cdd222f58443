// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Loading models from disk through the `ModelLoader` trait.

use batchplan_model::{
    Category, ElementRecord, JsonModelLoader, MeshRecord, ModelDocument, ModelLoader,
    StoreyRecord,
};
use std::fs;

fn document() -> ModelDocument {
    ModelDocument {
        name: None,
        unit_scale: 1.0,
        storeys: vec![StoreyRecord {
            id: "L0".into(),
            name: Some("Level 0".into()),
            elevation: 0.0,
            members: Some(vec!["D1".into()]),
        }],
        elements: vec![ElementRecord {
            id: "D1".into(),
            type_name: "IfcDoor".into(),
            name: Some("Front door".into()),
            mesh: Some(MeshRecord {
                coordinates: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 2.0],
                indices: vec![0, 1, 2],
            }),
            transform: None,
        }],
    }
}

#[test]
fn loads_written_document() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("office.json");
    fs::write(&path, serde_json::to_string_pretty(&document()).unwrap()).unwrap();

    let loaded = JsonModelLoader::new().load(&path).unwrap();
    assert!(loaded.issues.is_empty());
    assert_eq!(loaded.model.name, "office");
    assert_eq!(loaded.model.storeys[0].members.as_deref().unwrap(), ["D1".to_string()]);

    let door = loaded.model.element("D1").unwrap();
    assert_eq!(door.category, Category::Door);
    assert_eq!(door.name.as_deref(), Some("Front door"));
    let (lo, hi) = door.z_extent().unwrap();
    approx::assert_relative_eq!(lo, 0.0);
    approx::assert_relative_eq!(hi, 2.0);
}

#[test]
fn rejects_truncated_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    fs::write(&path, "{\"storeys\": [").unwrap();

    let err = JsonModelLoader::new().load(&path).unwrap_err();
    assert!(err.to_string().contains("malformed building model"));
}
