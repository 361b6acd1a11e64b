use std::path::Path;
use std::str::FromStr;

use toml::Table;

use crate::error::{Error, Result};
use crate::pbxproj::{Anchors, Region};

fn config_key(region: Region) -> &'static str {
    match region {
        Region::BuildFileSection => "build_file_section",
        Region::FileReferenceSection => "file_reference_section",
        Region::ResourcesBuildPhase => "resources_build_phase",
        Region::GroupChildren => "group_children",
    }
}

/// Reads the `[anchors]` table of a TOML file on top of the default anchors.
pub fn load_anchors(path: &Path) -> Result<Anchors> {
    let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::Config {
            path: path.to_path_buf(),
            reason: "file does not exist".to_string(),
        },
        _ => Error::io(path, e),
    })?;
    parse_anchors(&content).map_err(|reason| Error::Config {
        path: path.to_path_buf(),
        reason,
    })
}

pub fn parse_anchors(content: &str) -> std::result::Result<Anchors, String> {
    let table = Table::from_str(content).map_err(|e| e.message().to_string())?;

    let mut anchors = Anchors::default();
    let Some(section) = table.get("anchors") else {
        return Ok(anchors);
    };
    let section = section
        .as_table()
        .ok_or_else(|| "`anchors` must be a table".to_string())?;

    for region in Region::all() {
        let key = config_key(region);
        if let Some(value) = section.get(key) {
            let anchor = value
                .as_str()
                .ok_or_else(|| format!("anchors.{} must be a string", key))?;
            if anchor.is_empty() {
                return Err(format!("anchors.{} must not be empty", key));
            }
            anchors.set(region, anchor.to_string());
        }
    }

    if let Some(unknown) = section
        .keys()
        .find(|k| !Region::all().iter().any(|r| config_key(*r) == k.as_str()))
    {
        return Err(format!("unknown key anchors.{}", unknown));
    }

    Ok(anchors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_table_keeps_defaults() {
        assert_eq!(parse_anchors("").unwrap(), Anchors::default());
    }

    #[test]
    fn overrides_only_given_keys() {
        let anchors = parse_anchors(
            r#"
            [anchors]
            group_children = "AAAAAAAAAAAAAAAAAAAAAAAA /* Info.plist */,"
            "#,
        )
        .unwrap();
        assert_eq!(
            anchors.group_children,
            "AAAAAAAAAAAAAAAAAAAAAAAA /* Info.plist */,"
        );
        assert_eq!(
            anchors.resources_build_phase,
            Anchors::default().resources_build_phase
        );
    }

    #[test]
    fn rejects_bad_values() {
        assert!(parse_anchors("[anchors]\ngroup_children = 3").is_err());
        assert!(parse_anchors("[anchors]\ngroup_children = \"\"").is_err());
        assert!(parse_anchors("[anchors]\ngroup_child = \"x\"").is_err());
        assert!(parse_anchors("anchors = 1").is_err());
        assert!(parse_anchors("[anchors").is_err());
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_anchors(&dir.path().join("anchors.toml")).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }
}
