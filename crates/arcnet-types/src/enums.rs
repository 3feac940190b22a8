//! Application enums as network types.
//!
//! A [`NetEnum`] is a named, ordered set of members. String enums are sent
//! as the hash of the member *name*, so renaming a member's value doesn't
//! change the wire format but renaming the member does. Integer enums are
//! sent as the member value.

use std::sync::OnceLock;

use crate::TypeError;
use crate::hash::name_hash;
use crate::network_type::{NetworkType, StringMember};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumKind {
    Strings,
    Ints,
    /// Integer members that combine bitwise; any integer is accepted.
    Flags,
}

#[derive(Debug, Clone)]
enum Members {
    Strings(Vec<(String, String)>),
    Ints(Vec<(String, i64)>),
}

/// An enum declared for use in remote signatures.
///
/// ```rust
/// use arcnet_protocol::Value;
/// use arcnet_types::{NetEnum, NetworkType};
///
/// let team = NetEnum::strings("Team", [("Red", "red"), ("Blue", "blue")]).unwrap();
/// let ty = NetworkType::string_enum(&team).unwrap();
/// assert!(ty.validate(&Value::from("red")));
/// assert!(!ty.validate(&Value::from("Red")));
/// ```
#[derive(Debug)]
pub struct NetEnum {
    name: String,
    members: Members,
    flags: bool,
    network_type: OnceLock<NetworkType>,
}

impl NetEnum {
    /// A string enum from `(member name, value)` pairs.
    pub fn strings<N, V>(
        name: impl Into<String>,
        members: impl IntoIterator<Item = (N, V)>,
    ) -> Result<Self, TypeError>
    where
        N: Into<String>,
        V: Into<String>,
    {
        let members: Vec<(String, String)> = members
            .into_iter()
            .map(|(n, v)| (n.into(), v.into()))
            .collect();
        let name = name.into();
        check_members(&name, members.iter().map(|(n, _)| n.as_str()))?;
        for (i, (_, value)) in members.iter().enumerate() {
            if members[..i].iter().any(|(_, v)| v == value) {
                return Err(TypeError::InvalidDefinition(format!(
                    "{name}: duplicate value {value:?}"
                )));
            }
        }
        Ok(Self::new(name, Members::Strings(members), false))
    }

    /// An integer enum from `(member name, value)` pairs.
    pub fn ints<N: Into<String>>(
        name: impl Into<String>,
        members: impl IntoIterator<Item = (N, i64)>,
    ) -> Result<Self, TypeError> {
        let members: Vec<(String, i64)> =
            members.into_iter().map(|(n, v)| (n.into(), v)).collect();
        let name = name.into();
        check_members(&name, members.iter().map(|(n, _)| n.as_str()))?;
        Ok(Self::new(name, Members::Ints(members), false))
    }

    /// An integer enum whose members are bit flags.
    pub fn flags<N: Into<String>>(
        name: impl Into<String>,
        members: impl IntoIterator<Item = (N, i64)>,
    ) -> Result<Self, TypeError> {
        let mut this = Self::ints(name, members)?;
        this.flags = true;
        Ok(this)
    }

    fn new(name: String, members: Members, flags: bool) -> Self {
        Self {
            name,
            members,
            flags,
            network_type: OnceLock::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> EnumKind {
        match (&self.members, self.flags) {
            (Members::Strings(_), _) => EnumKind::Strings,
            (Members::Ints(_), false) => EnumKind::Ints,
            (Members::Ints(_), true) => EnumKind::Flags,
        }
    }

    /// Member names in declaration order.
    pub fn member_names(&self) -> Vec<&str> {
        match &self.members {
            Members::Strings(m) => m.iter().map(|(n, _)| n.as_str()).collect(),
            Members::Ints(m) => m.iter().map(|(n, _)| n.as_str()).collect(),
        }
    }

    /// The descriptor for this enum, built on first use.
    pub fn network_type(&self) -> NetworkType {
        self.network_type
            .get_or_init(|| match &self.members {
                Members::Strings(members) => NetworkType::from_string_members(
                    self.name.clone(),
                    members
                        .iter()
                        .map(|(name, value)| StringMember {
                            value: value.clone(),
                            hash: name_hash(name),
                        })
                        .collect(),
                ),
                Members::Ints(members) => NetworkType::from_int_values(
                    self.name.clone(),
                    members.iter().map(|(_, v)| *v).collect(),
                    self.flags,
                ),
            })
            .clone()
    }
}

fn check_members<'a>(
    enum_name: &str,
    names: impl Iterator<Item = &'a str>,
) -> Result<(), TypeError> {
    let names: Vec<&str> = names.collect();
    if names.is_empty() {
        return Err(TypeError::InvalidDefinition(format!(
            "{enum_name} has no members"
        )));
    }
    for (i, name) in names.iter().enumerate() {
        if let Some(other) = names[..i].iter().find(|o| name_hash(o) == name_hash(name)) {
            return Err(TypeError::InvalidDefinition(format!(
                "{enum_name}: members {other} and {name} share a name hash"
            )));
        }
    }
    Ok(())
}
