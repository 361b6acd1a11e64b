//! Registers a resource file in the text of a `project.pbxproj` manifest.
//!
//! The manifest is never parsed. Each of the four places that need a new entry
//! is found through an anchor, a verbatim line fragment that must end a line,
//! and the new entry is inserted on the line right after it.

use std::fmt::Display;
use std::path::Path;

use rinja::Template;
use thiserror::Error as ThisError;

use crate::identifier::{is_valid_identifier, IdentifierGenerator};

pub const DEFAULT_RESOURCE: &str = "GoogleService-Info.plist";

const MAX_IDENTIFIER_ATTEMPTS: usize = 32;

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord)]
pub enum Region {
    BuildFileSection,
    FileReferenceSection,
    ResourcesBuildPhase,
    GroupChildren,
}

impl Region {
    pub fn all() -> [Self; 4] {
        [
            Self::BuildFileSection,
            Self::FileReferenceSection,
            Self::ResourcesBuildPhase,
            Self::GroupChildren,
        ]
    }
}

impl Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Region::BuildFileSection => "PBXBuildFile section",
            Region::FileReferenceSection => "PBXFileReference section",
            Region::ResourcesBuildPhase => "resources build phase",
            Region::GroupChildren => "group children",
        };
        write!(f, "{}", name)
    }
}

/// Anchor text for each region. The defaults match the iOS project generated
/// by Capacitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchors {
    pub build_file_section: String,
    pub file_reference_section: String,
    pub resources_build_phase: String,
    pub group_children: String,
}

impl Default for Anchors {
    fn default() -> Self {
        Self {
            build_file_section: "/* Begin PBXBuildFile section */".to_string(),
            file_reference_section: "/* Begin PBXFileReference section */".to_string(),
            resources_build_phase: "2FAD9763203C412B000D30F8 /* config.xml in Resources */,"
                .to_string(),
            group_children: "504EC3131FED79650016851F /* Info.plist */,".to_string(),
        }
    }
}

impl Anchors {
    pub fn get(&self, region: Region) -> &str {
        match region {
            Region::BuildFileSection => &self.build_file_section,
            Region::FileReferenceSection => &self.file_reference_section,
            Region::ResourcesBuildPhase => &self.resources_build_phase,
            Region::GroupChildren => &self.group_children,
        }
    }

    pub fn set(&mut self, region: Region, anchor: String) {
        let slot = match region {
            Region::BuildFileSection => &mut self.build_file_section,
            Region::FileReferenceSection => &mut self.file_reference_section,
            Region::ResourcesBuildPhase => &mut self.resources_build_phase,
            Region::GroupChildren => &mut self.group_children,
        };
        *slot = anchor;
    }

    /// Byte offset just past the line ending that closes the first line
    /// carrying `region`'s anchor, together with that line ending.
    pub fn locate(&self, manifest: &str, region: Region) -> Option<(usize, &'static str)> {
        let anchor = self.get(region);
        if anchor.is_empty() {
            return None;
        }
        manifest.match_indices(anchor).find_map(|(start, _)| {
            let end = start + anchor.len();
            ["\n", "\r\n"]
                .into_iter()
                .find(|eol| manifest[end..].starts_with(*eol))
                .map(|eol| (end + eol.len(), eol))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceEntry {
    pub name: String,
    pub path: String,
    pub file_type: String,
}

impl ResourceEntry {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            path: name.clone(),
            file_type: last_known_file_type(&name).to_string(),
            name,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_file_type(mut self, file_type: impl Into<String>) -> Self {
        self.file_type = file_type.into();
        self
    }

    /// Comment markers Xcode writes next to references to this file: the
    /// file reference itself and its build files.
    pub fn markers(&self) -> [String; 2] {
        [
            format!("/* {} */", self.name),
            format!("/* {} in Resources */", self.name),
        ]
    }
}

/// Maps a file extension to the `lastKnownFileType` Xcode assigns to it.
pub fn last_known_file_type(name: &str) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("plist") => "text.plist.xml",
        Some("json") => "text.json",
        Some("xml") => "text.xml",
        Some("strings") => "text.plist.strings",
        Some("png") => "image.png",
        Some("js") => "sourcecode.javascript",
        _ => "file",
    }
}

#[derive(ThisError, Debug, PartialEq, Eq)]
pub enum PatchError {
    #[error("Anchor for {region} not found: {anchor:?}")]
    AnchorMissing { region: Region, anchor: String },

    #[error("{resource} is already registered")]
    AlreadyRegistered { resource: String },

    #[error("Resource name {0:?} can't be written into a manifest")]
    InvalidResourceName(String),

    #[error("File type {0:?} is not a valid lastKnownFileType")]
    InvalidFileType(String),

    #[error("Could not generate a fresh identifier after {0} attempts")]
    NoFreshIdentifier(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub manifest: String,
    pub file_ref_id: String,
    pub build_file_id: String,
}

#[derive(Template)]
#[template(path = "pbxproj/build_file.txt", escape = "none")]
struct BuildFileTemplate<'a> {
    build_file_id: &'a str,
    file_ref_id: &'a str,
    name: &'a str,
}

#[derive(Template)]
#[template(path = "pbxproj/file_reference.txt", escape = "none")]
struct FileReferenceTemplate<'a> {
    file_ref_id: &'a str,
    name: &'a str,
    file_type: &'a str,
    path: &'a str,
}

// A member line inside a `files = (...)` or `children = (...)` list.
#[derive(Template)]
#[template(path = "pbxproj/list_member.txt", escape = "none")]
struct ListMemberTemplate<'a> {
    id: &'a str,
    name: &'a str,
    suffix: &'a str,
}

#[derive(Debug, Clone, Default)]
pub struct Patcher {
    anchors: Anchors,
    allow_duplicate: bool,
}

impl Patcher {
    pub fn new(anchors: Anchors) -> Self {
        Self {
            anchors,
            allow_duplicate: false,
        }
    }

    /// Skip the already-registered check and add another set of entries.
    pub fn allow_duplicate(mut self, allow: bool) -> Self {
        self.allow_duplicate = allow;
        self
    }

    pub fn anchors(&self) -> &Anchors {
        &self.anchors
    }

    /// Inserts the four entries for `resource` into `manifest`.
    ///
    /// All anchors are located in the original text before anything is
    /// inserted, so a missing anchor never yields a partially patched
    /// manifest.
    pub fn register<G>(
        &self,
        manifest: &str,
        resource: &ResourceEntry,
        ids: &mut G,
    ) -> Result<Registration, PatchError>
    where
        G: IdentifierGenerator + ?Sized,
    {
        validate_resource(resource)?;

        if !self.allow_duplicate && resource.markers().iter().any(|m| manifest.contains(m)) {
            return Err(PatchError::AlreadyRegistered {
                resource: resource.name.clone(),
            });
        }

        let mut offsets = Vec::with_capacity(4);
        for region in Region::all() {
            let (offset, eol) = self.anchors.locate(manifest, region).ok_or_else(|| {
                PatchError::AnchorMissing {
                    region,
                    anchor: self.anchors.get(region).to_string(),
                }
            })?;
            tracing::debug!("{} anchor ends at byte {}", region, offset);
            offsets.push((offset, region, eol));
        }

        let file_ref_id = fresh_identifier(manifest, &[], ids)?;
        let build_file_id = fresh_identifier(manifest, &[&file_ref_id], ids)?;

        let lines = EntryLines::new(resource, &file_ref_id, &build_file_id);

        // Offsets refer to the original text; splice front to back.
        offsets.sort();
        let mut patched = String::with_capacity(manifest.len() + lines.len() + 4);
        let mut cursor = 0;
        for (offset, region, eol) in offsets {
            patched.push_str(&manifest[cursor..offset]);
            patched.push_str(lines.get(region));
            patched.push_str(eol);
            cursor = offset;
        }
        patched.push_str(&manifest[cursor..]);

        Ok(Registration {
            manifest: patched,
            file_ref_id,
            build_file_id,
        })
    }
}

/// Registers `resource_name` using the default anchors and the duplicate check.
pub fn register<G>(
    manifest: &str,
    resource_name: &str,
    ids: &mut G,
) -> Result<Registration, PatchError>
where
    G: IdentifierGenerator + ?Sized,
{
    Patcher::default().register(manifest, &ResourceEntry::new(resource_name), ids)
}

/// Number of lines in `manifest` that mention `name`.
pub fn count_references(manifest: &str, name: &str) -> usize {
    manifest.lines().filter(|line| line.contains(name)).count()
}

fn validate_resource(resource: &ResourceEntry) -> Result<(), PatchError> {
    let breaks_comment = |s: &str| s.contains("*/") || s.contains('\n') || s.contains('\r');
    if resource.name.trim().is_empty()
        || breaks_comment(&resource.name)
        || breaks_comment(&resource.path)
    {
        return Err(PatchError::InvalidResourceName(resource.name.clone()));
    }
    // Written unquoted, so only plist bare-word characters are allowed.
    let bare_word = |c: char| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-');
    if resource.file_type.is_empty() || !resource.file_type.chars().all(bare_word) {
        return Err(PatchError::InvalidFileType(resource.file_type.clone()));
    }
    Ok(())
}

fn fresh_identifier<G>(manifest: &str, taken: &[&str], ids: &mut G) -> Result<String, PatchError>
where
    G: IdentifierGenerator + ?Sized,
{
    for _ in 0..MAX_IDENTIFIER_ATTEMPTS {
        let id = ids.next_identifier();
        if is_valid_identifier(&id) && !manifest.contains(&id) && !taken.contains(&id.as_str()) {
            return Ok(id);
        }
        tracing::debug!("Rejected identifier {}", id);
    }
    Err(PatchError::NoFreshIdentifier(MAX_IDENTIFIER_ATTEMPTS))
}

fn quoted(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

struct EntryLines {
    build_file: String,
    file_reference: String,
    build_phase_member: String,
    group_child: String,
}

impl EntryLines {
    fn new(resource: &ResourceEntry, file_ref_id: &str, build_file_id: &str) -> Self {
        let path = quoted(&resource.path);
        Self {
            build_file: BuildFileTemplate {
                build_file_id,
                file_ref_id,
                name: &resource.name,
            }
            .to_string(),
            file_reference: FileReferenceTemplate {
                file_ref_id,
                name: &resource.name,
                file_type: &resource.file_type,
                path: &path,
            }
            .to_string(),
            build_phase_member: ListMemberTemplate {
                id: build_file_id,
                name: &resource.name,
                suffix: " in Resources",
            }
            .to_string(),
            group_child: ListMemberTemplate {
                id: file_ref_id,
                name: &resource.name,
                suffix: "",
            }
            .to_string(),
        }
    }

    fn get(&self, region: Region) -> &str {
        match region {
            Region::BuildFileSection => &self.build_file,
            Region::FileReferenceSection => &self.file_reference,
            Region::ResourcesBuildPhase => &self.build_phase_member,
            Region::GroupChildren => &self.group_child,
        }
    }

    fn len(&self) -> usize {
        Region::all().iter().map(|r| self.get(*r).len() + 1).sum()
    }
}
