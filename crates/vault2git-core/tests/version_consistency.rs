//! Every workspace member inherits the workspace version, and the internal
//! path dependency pins that same version.

use std::path::{Path, PathBuf};

fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .unwrap()
        .to_path_buf()
}

fn read_toml(path: &Path) -> toml::Value {
    let text = std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()));
    text.parse()
        .unwrap_or_else(|e| panic!("invalid TOML in {}: {e}", path.display()))
}

fn root_manifest() -> toml::Value {
    read_toml(&workspace_root().join("Cargo.toml"))
}

fn workspace_version() -> String {
    root_manifest()["workspace"]["package"]["version"]
        .as_str()
        .unwrap()
        .to_string()
}

#[test]
fn members_inherit_workspace_version() {
    let root = root_manifest();
    let members = root["workspace"]["members"].as_array().unwrap();
    assert!(!members.is_empty());

    for member in members {
        let member = member.as_str().unwrap();
        let manifest = read_toml(&workspace_root().join(member).join("Cargo.toml"));
        let inherited = manifest["package"]["version"]
            .get("workspace")
            .and_then(toml::Value::as_bool);
        assert_eq!(
            inherited,
            Some(true),
            "{member} should use version.workspace = true"
        );
    }
}

#[test]
fn internal_dependency_pins_workspace_version() {
    let root = root_manifest();
    let core = &root["workspace"]["dependencies"]["vault2git-core"];
    assert_eq!(core["version"].as_str(), Some(workspace_version().as_str()));
    assert_eq!(core["path"].as_str(), Some("crates/vault2git-core"));
}

#[test]
fn library_version_matches_manifest() {
    assert_eq!(vault2git_core::VERSION, workspace_version());
    assert_eq!(env!("CARGO_PKG_VERSION"), workspace_version());
}
