//! Core data structures shared by every layer of the provenance graph

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Opaque 128-bit identifier of a node, edge, bundle or session.
/// The all-zero value is the `NONE` sentinel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProvId(u128);

impl ProvId {
    /// Denotes "no object" / "no relation"
    pub const NONE: ProvId = ProvId(0);

    /// Allocate a fresh identifier. UUIDv4 values carry version bits, so this is never `NONE`.
    pub fn generate() -> Self {
        ProvId(Uuid::new_v4().as_u128())
    }

    pub const fn from_u128(value: u128) -> Self {
        ProvId(value)
    }

    pub const fn as_u128(self) -> u128 {
        self.0
    }

    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    /// High 64 bits
    pub const fn hi(self) -> u64 {
        (self.0 >> 64) as u64
    }

    /// Low 64 bits
    pub const fn lo(self) -> u64 {
        self.0 as u64
    }
}

impl fmt::Display for ProvId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

impl FromStr for ProvId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        u128::from_str_radix(s.trim(), 16)
            .map(ProvId)
            .map_err(|e| Error::InvalidArgument(format!("invalid identifier `{}`: {}", s, e)))
    }
}

/// Object version number. Starts at 0, grows by one per `new_version`.
pub type Version = u32;

/// Milliseconds since the UNIX epoch
pub fn now_millis() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or_default()
}

/// Kind of a provenance node. Immutable after creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    Entity,
    Activity,
    Agent,
    Bundle,
}

impl ObjectType {
    pub const ALL: [ObjectType; 4] =
        [ObjectType::Entity, ObjectType::Activity, ObjectType::Agent, ObjectType::Bundle];

    /// Name used by PROV-JSON groups and by the storage layer
    pub fn as_str(self) -> &'static str {
        match self {
            ObjectType::Entity => "entity",
            ObjectType::Activity => "activity",
            ObjectType::Agent => "agent",
            ObjectType::Bundle => "bundle",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "entity" => Ok(ObjectType::Entity),
            "activity" => Ok(ObjectType::Activity),
            "agent" => Ok(ObjectType::Agent),
            "bundle" => Ok(ObjectType::Bundle),
            other => Err(Error::InvalidArgument(format!("unknown object type `{}`", other))),
        }
    }
}

/// Stored metadata of a provenance object
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectInfo {
    pub id: ProvId,
    /// Originator / namespace prefix
    pub prefix: String,
    pub name: String,
    pub object_type: ObjectType,
    /// Owning bundle, `None` for top-level objects
    pub bundle: Option<ProvId>,
    pub creation_session: ProvId,
    pub creation_time: u64,
    /// Current (latest) version
    pub version: Version,
}

impl ObjectInfo {
    /// The `(object, current version)` pair
    pub fn current(&self) -> ObjectVersion {
        ObjectVersion::new(self.id, self.version)
    }
}

/// Who produced one particular version of an object, and when
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub id: ProvId,
    pub version: Version,
    pub session: ProvId,
    pub creation_time: u64,
}

/// A logical `(object, version)` view; not separately allocated
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectVersion {
    pub id: ProvId,
    pub version: Version,
}

impl ObjectVersion {
    pub const fn new(id: ProvId, version: Version) -> Self {
        Self { id, version }
    }
}

impl fmt::Display for ObjectVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.version)
    }
}

/// Relation endpoint: either an object (bound to its current version) or a specific version
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endpoint {
    Current(ProvId),
    Exact(ObjectVersion),
}

impl Endpoint {
    pub fn id(self) -> ProvId {
        match self {
            Endpoint::Current(id) => id,
            Endpoint::Exact(ov) => ov.id,
        }
    }
}

impl From<ProvId> for Endpoint {
    fn from(id: ProvId) -> Self {
        Endpoint::Current(id)
    }
}

impl From<ObjectVersion> for Endpoint {
    fn from(ov: ObjectVersion) -> Self {
        Endpoint::Exact(ov)
    }
}

impl From<&ObjectInfo> for Endpoint {
    fn from(info: &ObjectInfo) -> Self {
        Endpoint::Current(info.id)
    }
}

/// Which versions of the queried node a traversal covers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VersionSelector {
    /// Union over every version
    All,
    Exact(Version),
}

impl VersionSelector {
    pub fn matches(self, version: Version) -> bool {
        match self {
            VersionSelector::All => true,
            VersionSelector::Exact(v) => v == version,
        }
    }
}

/// Traversal direction relative to the fixed relation polarity
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Follow edges where the queried node is the descendant endpoint
    Ancestors,
    /// Follow edges where the queried node is the ancestor endpoint
    Descendants,
}

/// Subtractive traversal filters, combined with `|`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TraversalFlags(u32);

impl TraversalFlags {
    pub const NONE: TraversalFlags = TraversalFlags(0);
    pub const NO_DATA_DEPENDENCIES: TraversalFlags = TraversalFlags(1 << 1);
    pub const NO_CONTROL_DEPENDENCIES: TraversalFlags = TraversalFlags(1 << 2);

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: TraversalFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether relations of `category` are filtered out
    pub fn excludes(self, category: relation::RelationCategory) -> bool {
        match category {
            relation::RelationCategory::Data => self.contains(Self::NO_DATA_DEPENDENCIES),
            relation::RelationCategory::Control => self.contains(Self::NO_CONTROL_DEPENDENCIES),
        }
    }
}

impl BitOr for TraversalFlags {
    type Output = TraversalFlags;

    fn bitor(self, rhs: Self) -> Self::Output {
        TraversalFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for TraversalFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Outcome of a successful creating call
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Status {
    Ok,
    /// `lookup_or_create` took the create branch
    ObjectCreated,
    /// An identical relation already existed; nothing was written
    DuplicateIgnored,
}

/// A value returned together with the success variant that produced it
#[derive(Clone, Debug, PartialEq)]
pub struct Outcome<T> {
    pub value: T,
    pub status: Status,
}

impl<T> Outcome<T> {
    pub fn new(value: T, status: Status) -> Self {
        Self { value, status }
    }

    pub fn is_created(&self) -> bool {
        self.status == Status::ObjectCreated
    }

    pub fn is_duplicate(&self) -> bool {
        self.status == Status::DuplicateIgnored
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

pub mod encoding;
pub mod property;
pub mod relation;
pub mod session;

pub use encoding::*;
pub use property::{Property, PropertyValue};
pub use relation::{AncestryEntry, RelationCategory, RelationInfo, RelationType};
pub use session::Session;
