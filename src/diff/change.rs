//! Change records produced by the tree differ.
//!
//! A [`Change`] describes one structural difference between a live and a
//! desired [`ConfigTree`](crate::config::ConfigTree). Every change carries
//! the typed path to the node it applies to and an owned copy of the record
//! that owns that node, so planners can recover full field values even when
//! only one sub-field differs.

use serde::{Serialize, Serializer};

use crate::config::{ApplicationConfig, ManifestConfig, ServiceConfig};

/// Top-level entity kinds of a config tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityKind {
    /// Applications, keyed by name.
    Applications,
    /// Service instances, keyed by name.
    Services,
    /// The space developer authorization list.
    SpaceDevelopers,
}

/// One segment of a change path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// The top-level section of the tree.
    Kind(EntityKind),
    /// An entity name within a keyed section.
    Entity(String),
    /// A field of a record.
    Field(&'static str),
}

/// Path from the tree root to the node a change applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangePath {
    segments: Vec<PathSegment>,
}

/// The record that owns the changed node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum AffectedObject {
    /// A whole application.
    Application(ApplicationConfig),
    /// A whole service instance.
    Service(ServiceConfig),
    /// The manifest record of an application.
    Manifest(ManifestConfig),
    /// The space developer list.
    SpaceDevelopers(Vec<String>),
}

/// Kind of a single map entry change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EntryChangeKind {
    /// Key only exists in the desired map.
    Added,
    /// Key only exists in the live map.
    Removed,
    /// Key exists in both with different values.
    Changed,
}

/// Change of one key in a map-typed field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MapEntryChange {
    /// The key.
    pub key: String,
    /// What happened to the key.
    pub kind: EntryChangeKind,
    /// Live value, if any.
    pub before: Option<String>,
    /// Desired value, if any.
    pub after: Option<String>,
}

/// What kind of difference a change describes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "change", rename_all = "camelCase")]
pub enum ChangeKind {
    /// A whole record exists in desired but not live.
    ObjectAdded,
    /// A whole record exists in live but not desired.
    ObjectRemoved,
    /// A scalar field differs.
    ValueChanged {
        /// Live value.
        before: Option<String>,
        /// Desired value.
        after: Option<String>,
    },
    /// A list or set field differs.
    CollectionChanged {
        /// Elements only present in desired.
        added: Vec<String>,
        /// Elements only present in live.
        removed: Vec<String>,
    },
    /// A map field differs.
    MapChanged {
        /// Differing entries, ordered by key.
        entries: Vec<MapEntryChange>,
    },
}

/// One typed, path-addressed difference between two config trees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Change {
    /// Where the change applies.
    pub path: ChangePath,
    /// Owned copy of the record owning the changed node.
    pub affected: AffectedObject,
    /// The difference itself.
    #[serde(flatten)]
    pub kind: ChangeKind,
}

impl EntityKind {
    /// Returns the tree field name of this section.
    #[must_use]
    pub const fn field_name(self) -> &'static str {
        match self {
            Self::Applications => "applications",
            Self::Services => "services",
            Self::SpaceDevelopers => "spaceDevelopers",
        }
    }

    /// Returns a human-readable singular name.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Applications => "application",
            Self::Services => "service",
            Self::SpaceDevelopers => "space developers",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

impl std::fmt::Display for PathSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Kind(kind) => f.write_str(kind.field_name()),
            Self::Entity(name) => f.write_str(name),
            Self::Field(field) => f.write_str(field),
        }
    }
}

impl ChangePath {
    /// Path of a whole section.
    #[must_use]
    pub fn root(kind: EntityKind) -> Self {
        Self {
            segments: vec![PathSegment::Kind(kind)],
        }
    }

    /// Path of a named entity within a section.
    #[must_use]
    pub fn entity(kind: EntityKind, name: &str) -> Self {
        Self {
            segments: vec![PathSegment::Kind(kind), PathSegment::Entity(name.to_string())],
        }
    }

    /// Builds a path from raw segments.
    #[must_use]
    pub const fn from_segments(segments: Vec<PathSegment>) -> Self {
        Self { segments }
    }

    /// Returns the path of a field below this node.
    #[must_use]
    pub fn child(&self, field: &'static str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(PathSegment::Field(field));
        Self { segments }
    }

    /// Returns the segments.
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Returns the section this path starts in.
    #[must_use]
    pub fn kind(&self) -> Option<EntityKind> {
        match self.segments.first() {
            Some(PathSegment::Kind(kind)) => Some(*kind),
            _ => None,
        }
    }

    /// Returns the entity name, if the path addresses a keyed entity.
    #[must_use]
    pub fn entity_name(&self) -> Option<&str> {
        match self.segments.get(1) {
            Some(PathSegment::Entity(name)) => Some(name),
            _ => None,
        }
    }

    /// Returns true if the path addresses a whole keyed entity.
    #[must_use]
    pub fn is_entity_root(&self) -> bool {
        self.segments.len() == 2 && self.kind().is_some() && self.entity_name().is_some()
    }

    /// Returns the innermost field name, if the path ends in a field.
    #[must_use]
    pub fn property(&self) -> Option<&'static str> {
        match self.segments.last() {
            Some(PathSegment::Field(field)) => Some(field),
            _ => None,
        }
    }
}

impl std::fmt::Display for ChangePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl Serialize for ChangePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.segments.iter().map(ToString::to_string))
    }
}

impl AffectedObject {
    /// Returns the name of the record type.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Application(_) => "application",
            Self::Service(_) => "service",
            Self::Manifest(_) => "manifest",
            Self::SpaceDevelopers(_) => "space developers",
        }
    }
}

impl MapEntryChange {
    /// An entry only present in the desired map.
    #[must_use]
    pub fn added(key: &str, value: &str) -> Self {
        Self {
            key: key.to_string(),
            kind: EntryChangeKind::Added,
            before: None,
            after: Some(value.to_string()),
        }
    }

    /// An entry only present in the live map.
    #[must_use]
    pub fn removed(key: &str, value: &str) -> Self {
        Self {
            key: key.to_string(),
            kind: EntryChangeKind::Removed,
            before: Some(value.to_string()),
            after: None,
        }
    }

    /// An entry whose value differs.
    #[must_use]
    pub fn changed(key: &str, before: &str, after: &str) -> Self {
        Self {
            key: key.to_string(),
            kind: EntryChangeKind::Changed,
            before: Some(before.to_string()),
            after: Some(after.to_string()),
        }
    }
}

impl Change {
    /// A record present only in the desired tree.
    #[must_use]
    pub const fn object_added(path: ChangePath, affected: AffectedObject) -> Self {
        Self {
            path,
            affected,
            kind: ChangeKind::ObjectAdded,
        }
    }

    /// A record present only in the live tree.
    #[must_use]
    pub const fn object_removed(path: ChangePath, affected: AffectedObject) -> Self {
        Self {
            path,
            affected,
            kind: ChangeKind::ObjectRemoved,
        }
    }

    /// A scalar field that differs.
    #[must_use]
    pub const fn value_changed(
        path: ChangePath,
        affected: AffectedObject,
        before: Option<String>,
        after: Option<String>,
    ) -> Self {
        Self {
            path,
            affected,
            kind: ChangeKind::ValueChanged { before, after },
        }
    }

    /// A list or set field that differs.
    #[must_use]
    pub const fn collection_changed(
        path: ChangePath,
        affected: AffectedObject,
        added: Vec<String>,
        removed: Vec<String>,
    ) -> Self {
        Self {
            path,
            affected,
            kind: ChangeKind::CollectionChanged { added, removed },
        }
    }

    /// A map field that differs.
    #[must_use]
    pub const fn map_changed(
        path: ChangePath,
        affected: AffectedObject,
        entries: Vec<MapEntryChange>,
    ) -> Self {
        Self {
            path,
            affected,
            kind: ChangeKind::MapChanged { entries },
        }
    }

    /// Returns true for an added whole record.
    #[must_use]
    pub const fn is_object_added(&self) -> bool {
        matches!(self.kind, ChangeKind::ObjectAdded)
    }

    /// Returns true for a removed whole record.
    #[must_use]
    pub const fn is_object_removed(&self) -> bool {
        matches!(self.kind, ChangeKind::ObjectRemoved)
    }

    /// Returns the name of the changed field, if any.
    #[must_use]
    pub fn property(&self) -> Option<&'static str> {
        self.path.property()
    }

    /// Returns the short name of the change variant.
    #[must_use]
    pub const fn variant_name(&self) -> &'static str {
        match self.kind {
            ChangeKind::ObjectAdded => "object added",
            ChangeKind::ObjectRemoved => "object removed",
            ChangeKind::ValueChanged { .. } => "value changed",
            ChangeKind::CollectionChanged { .. } => "collection changed",
            ChangeKind::MapChanged { .. } => "map changed",
        }
    }
}

fn or_none(value: Option<&String>) -> &str {
    value.map_or("<none>", String::as_str)
}

impl std::fmt::Display for Change {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            ChangeKind::ObjectAdded => write!(f, "+ {}", self.path),
            ChangeKind::ObjectRemoved => write!(f, "- {}", self.path),
            ChangeKind::ValueChanged { before, after } => write!(
                f,
                "~ {}: {} -> {}",
                self.path,
                or_none(before.as_ref()),
                or_none(after.as_ref())
            ),
            ChangeKind::CollectionChanged { added, removed } => {
                write!(f, "~ {}:", self.path)?;
                for value in added {
                    write!(f, " +{value}")?;
                }
                for value in removed {
                    write!(f, " -{value}")?;
                }
                Ok(())
            }
            ChangeKind::MapChanged { entries } => {
                write!(f, "~ {}:", self.path)?;
                for entry in entries {
                    let sign = match entry.kind {
                        EntryChangeKind::Added => '+',
                        EntryChangeKind::Removed => '-',
                        EntryChangeKind::Changed => '~',
                    };
                    write!(f, " {sign}{}", entry.key)?;
                }
                Ok(())
            }
        }
    }
}
