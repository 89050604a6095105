//! Groups: named containers of arrays and nested groups.
//!
//! Membership is recorded in the group's own node as `name → kind` and only
//! ever grows. A [`Group`] handle caches a handle per member so that
//! [`Sliceable::set_query`] can push restrictions down the tree: each member
//! array receives the part of the request naming its own dimensions, nested
//! groups recurse.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use cellstore_core::{CellstoreError, DimRanges, MetadataBearing, Result, Sliceable};

use crate::array::QueryableArray;
use crate::object::StorageObject;
use crate::store::{Context, Mode};

const KIND_KEY: &str = "kind";
const MEMBERS_KEY: &str = "members";

/// Kind tag recorded for each group member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberKind {
    Array,
    Group,
}

/// A member handle, tagged by kind.
#[derive(Debug, Clone)]
pub enum Member {
    Array(QueryableArray),
    Group(Group),
}

impl Member {
    pub fn kind(&self) -> MemberKind {
        match self {
            Member::Array(_) => MemberKind::Array,
            Member::Group(_) => MemberKind::Group,
        }
    }

    pub fn uri(&self) -> &str {
        match self {
            Member::Array(a) => a.uri(),
            Member::Group(g) => g.uri(),
        }
    }

    fn exists(&self) -> bool {
        match self {
            Member::Array(a) => a.exists(),
            Member::Group(g) => g.exists(),
        }
    }
}

/// Handle on a stored group and its cached member handles.
#[derive(Debug, Clone)]
pub struct Group {
    object: StorageObject,
    members: BTreeMap<String, Member>,
}

impl Group {
    /// A handle with no members loaded. Nothing is touched in storage.
    pub fn new(uri: &str, ctx: &Context) -> Self {
        Self {
            object: StorageObject::new(uri, ctx),
            members: BTreeMap::new(),
        }
    }

    /// Open an existing group, loading handles for its members recursively.
    pub fn open(uri: &str, ctx: &Context) -> Result<Self> {
        let mut group = Self::new(uri, ctx);
        for (name, kind) in group.list_members()? {
            let child = group.object.child_uri(&name);
            let member = match kind {
                MemberKind::Array => Member::Array(QueryableArray::new(&child, ctx)),
                MemberKind::Group => Member::Group(Group::open(&child, ctx)?),
            };
            group.members.insert(name, member);
        }
        log::debug!("opened group '{}' with {} members", group.uri(), group.members.len());
        Ok(group)
    }

    /// Open the group if it exists, otherwise return an empty handle.
    pub fn open_or_new(uri: &str, ctx: &Context) -> Result<Self> {
        let group = Self::new(uri, ctx);
        if group.exists() {
            Self::open(uri, ctx)
        } else {
            Ok(group)
        }
    }

    pub fn object(&self) -> &StorageObject {
        &self.object
    }

    pub fn uri(&self) -> &str {
        self.object.uri()
    }

    pub fn exists(&self) -> bool {
        self.object.exists()
    }

    /// Create the group with no members.
    ///
    /// # Errors
    ///
    /// [`CellstoreError::Schema`] if something already exists at this URI.
    pub fn create(&self, object_type: &str) -> Result<()> {
        if self.exists() {
            return Err(CellstoreError::Schema(format!(
                "'{}' already exists",
                self.uri()
            )));
        }
        let mut bookkeeping = Map::new();
        bookkeeping.insert(KIND_KEY.into(), Value::String("group".into()));
        bookkeeping.insert(MEMBERS_KEY.into(), Value::Object(Map::new()));
        drop(self.object.create_node(object_type, bookkeeping)?);
        Ok(())
    }

    /// Create the group unless it already exists.
    pub fn ensure(&self, object_type: &str) -> Result<()> {
        if self.exists() {
            Ok(())
        } else {
            self.create(object_type)
        }
    }

    /// An array handle at the child path for `name`. Nothing is created.
    pub fn child_array(&self, name: &str) -> QueryableArray {
        QueryableArray::new(&self.object.child_uri(name), self.object.ctx())
    }

    /// Members recorded in storage, by name.
    pub fn list_members(&self) -> Result<BTreeMap<String, MemberKind>> {
        let session = self.object.session(Mode::Read)?;
        match session.bookkeeping(MEMBERS_KEY) {
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|e| CellstoreError::Storage(format!("bad member list: {e}"))),
            None => Err(CellstoreError::Storage(format!(
                "'{}' is not a group",
                self.uri()
            ))),
        }
    }

    /// Register `member` under `name`.
    ///
    /// The member must already exist and live at this group's child path
    /// for `name`. Re-adding a name with the same kind refreshes the cached
    /// handle; a different kind is rejected.
    pub fn add_member(&mut self, name: &str, member: Member) -> Result<()> {
        let expected = self.object.child_uri(name);
        if member.uri() != expected {
            return Err(CellstoreError::Argument(format!(
                "member '{name}' must live at '{expected}', got '{}'",
                member.uri()
            )));
        }
        if !member.exists() {
            return Err(CellstoreError::Argument(format!(
                "member '{}' has not been created",
                member.uri()
            )));
        }
        let mut recorded = self.list_members()?;
        match recorded.get(name) {
            Some(&kind) if kind != member.kind() => {
                return Err(CellstoreError::Schema(format!(
                    "'{name}' is already a {kind:?} member of '{}'",
                    self.uri()
                )));
            }
            Some(_) => {}
            None => {
                recorded.insert(name.to_string(), member.kind());
                let value = serde_json::to_value(&recorded)
                    .map_err(|e| CellstoreError::Storage(e.to_string()))?;
                self.object.session(Mode::Write)?.set_bookkeeping(MEMBERS_KEY, value)?;
                log::debug!("'{}': added {:?} member '{name}'", self.uri(), member.kind());
            }
        }
        self.members.insert(name.to_string(), member);
        Ok(())
    }

    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.get(name)
    }

    pub fn member_mut(&mut self, name: &str) -> Option<&mut Member> {
        self.members.get_mut(name)
    }

    /// An array member by name.
    pub fn array(&self, name: &str) -> Option<&QueryableArray> {
        match self.members.get(name) {
            Some(Member::Array(a)) => Some(a),
            _ => None,
        }
    }

    pub fn array_mut(&mut self, name: &str) -> Option<&mut QueryableArray> {
        match self.members.get_mut(name) {
            Some(Member::Array(a)) => Some(a),
            _ => None,
        }
    }

    /// A nested group member by name.
    pub fn group(&self, name: &str) -> Option<&Group> {
        match self.members.get(name) {
            Some(Member::Group(g)) => Some(g),
            _ => None,
        }
    }

    pub fn group_mut(&mut self, name: &str) -> Option<&mut Group> {
        match self.members.get_mut(name) {
            Some(Member::Group(g)) => Some(g),
            _ => None,
        }
    }

    /// Cached member handles, by name.
    pub fn members(&self) -> impl Iterator<Item = (&str, &Member)> {
        self.members.iter().map(|(n, m)| (n.as_str(), m))
    }

    /// Names of the cached members.
    pub fn member_names(&self) -> Vec<String> {
        self.members.keys().cloned().collect()
    }
}

impl Sliceable for Group {
    /// Push `ranges` down to every member.
    ///
    /// An array only receives the keys it declares as dimensions; a key no
    /// member declares is ignored rather than rejected.
    fn set_query(&mut self, ranges: &DimRanges) -> Result<()> {
        for (name, member) in self.members.iter_mut() {
            match member {
                Member::Array(array) => {
                    let dims = array.dimnames()?;
                    let applicable: DimRanges = ranges
                        .iter()
                        .filter(|(k, _)| dims.contains(*k))
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect();
                    if !applicable.is_empty() {
                        log::trace!("'{}': slicing member '{name}'", self.object.uri());
                        array.set_query(&applicable)?;
                    }
                }
                Member::Group(group) => group.set_query(ranges)?,
            }
        }
        Ok(())
    }

    fn clear_query(&mut self) {
        for member in self.members.values_mut() {
            match member {
                Member::Array(a) => a.clear_query(),
                Member::Group(g) => g.clear_query(),
            }
        }
    }
}

impl MetadataBearing for Group {
    fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        self.object.get_metadata(key)
    }

    fn add_metadata(&self, entries: &[(&str, &str)]) -> Result<()> {
        self.object.add_metadata(entries)
    }

    fn list_metadata(&self, prefix: Option<&str>) -> Result<BTreeMap<String, String>> {
        self.object.list_metadata(prefix)
    }
}
