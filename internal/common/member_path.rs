// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

/*!
Dotted member paths such as `Person.Address.Street` or `Items[0].Name`.

A path is split into segments. Indexer segments keep their brackets, so the path
`Items[0].Name` has the three segments `Items`, `[0]` and `Name`. Member names never
contain a `.`; an indexer segment may, inside a quoted key like `["a.b"]`.
*/

use once_cell::sync::Lazy;
use smol_str::SmolStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MemberPathError {
    #[error("Empty segment at offset {0} in member path")]
    EmptySegment(usize),
    #[error("Unterminated indexer at offset {0} in member path")]
    UnterminatedIndexer(usize),
    #[error("Unexpected character '{1}' at offset {0} in member path")]
    UnexpectedCharacter(usize, char),
    #[error("Invalid indexer argument '{0}'")]
    InvalidIndexArgument(SmolStr),
}

/// An argument of an indexer segment
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndexArgument {
    Integer(i64),
    String(SmolStr),
}

impl std::fmt::Display for IndexArgument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexArgument::Integer(i) => write!(f, "{i}"),
            IndexArgument::String(s) => write!(f, "\"{s}\""),
        }
    }
}

/// An ordered list of member names, plus the textual path it was built from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct MemberPath {
    path: SmolStr,
    members: Vec<SmolStr>,
}

static EMPTY: Lazy<MemberPath> = Lazy::new(MemberPath::default);

impl MemberPath {
    /// The path that doesn't navigate anywhere: it designates the root itself.
    pub fn empty() -> &'static MemberPath {
        &EMPTY
    }

    /// Parse a path like `A.B[0].C`
    pub fn parse(path: &str) -> Result<Self, MemberPathError> {
        let path = path.trim();
        let mut members = Vec::new();
        let bytes = path.as_bytes();
        let mut pos = 0;
        let mut expect_member = true;
        while pos < bytes.len() {
            match bytes[pos] {
                b'[' => {
                    let end = find_closing_bracket(path, pos)
                        .ok_or(MemberPathError::UnterminatedIndexer(pos))?;
                    let segment = &path[pos..=end];
                    parse_index_arguments(segment)?;
                    members.push(SmolStr::from(segment));
                    pos = end + 1;
                    expect_member = false;
                }
                b'.' => {
                    if expect_member {
                        return Err(MemberPathError::EmptySegment(pos));
                    }
                    pos += 1;
                    expect_member = true;
                    if pos == bytes.len() {
                        return Err(MemberPathError::EmptySegment(pos));
                    }
                }
                _ => {
                    if !expect_member {
                        let c = path[pos..].chars().next().unwrap_or_default();
                        return Err(MemberPathError::UnexpectedCharacter(pos, c));
                    }
                    let len = path[pos..]
                        .find(|c: char| c == '.' || c == '[')
                        .unwrap_or(path.len() - pos);
                    let name = path[pos..pos + len].trim();
                    if let Some(c) = name.chars().find(|c| !c.is_alphanumeric() && *c != '_') {
                        return Err(MemberPathError::UnexpectedCharacter(pos, c));
                    }
                    if name.is_empty() {
                        return Err(MemberPathError::EmptySegment(pos));
                    }
                    members.push(SmolStr::from(name));
                    pos += len;
                    expect_member = false;
                }
            }
        }
        Ok(Self { path: path.into(), members })
    }

    /// Build a path from already split segments.
    ///
    /// Member names must not contain a `.`, only the quoted keys of indexer segments may.
    pub fn from_members(members: impl IntoIterator<Item = SmolStr>) -> Self {
        let members: Vec<SmolStr> = members.into_iter().collect();
        debug_assert!(members.iter().all(|m| Self::is_index_segment(m) || !m.contains('.')));
        let mut path = String::new();
        for m in &members {
            if !path.is_empty() && !m.starts_with('[') {
                path.push('.');
            }
            path.push_str(m);
        }
        Self { path: path.into(), members }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn members(&self) -> &[SmolStr] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Concatenate two paths
    pub fn join(&self, other: &MemberPath) -> MemberPath {
        Self::from_members(self.members.iter().chain(other.members.iter()).cloned())
    }

    /// True if the segment is an indexer segment like `[0]`
    pub fn is_index_segment(segment: &str) -> bool {
        segment.starts_with('[') && segment.ends_with(']')
    }

    /// Returns the arguments of an indexer segment, or None if this is a member name
    pub fn index_arguments(segment: &str) -> Option<Vec<IndexArgument>> {
        if !Self::is_index_segment(segment) {
            return None;
        }
        parse_index_arguments(segment).ok()
    }
}

impl std::fmt::Display for MemberPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path)
    }
}

impl std::str::FromStr for MemberPath {
    type Err = MemberPathError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn find_closing_bracket(path: &str, open: usize) -> Option<usize> {
    let mut quote = None;
    for (i, c) in path[open + 1..].char_indices() {
        match (c, quote) {
            ('"' | '\'', None) => quote = Some(c),
            (c, Some(q)) if c == q => quote = None,
            (']', None) => return Some(open + 1 + i),
            _ => {}
        }
    }
    None
}

fn parse_index_arguments(segment: &str) -> Result<Vec<IndexArgument>, MemberPathError> {
    let inner = &segment[1..segment.len() - 1];
    let invalid = || MemberPathError::InvalidIndexArgument(segment.into());
    let mut result = Vec::new();
    let mut rest = inner.trim();
    while !rest.is_empty() {
        let (arg, tail) = if let Some(q) = rest.chars().next().filter(|c| *c == '"' || *c == '\'') {
            let end = rest[1..].find(q).ok_or_else(invalid)? + 1;
            (IndexArgument::String(rest[1..end].into()), &rest[end + 1..])
        } else {
            let end = rest.find(',').unwrap_or(rest.len());
            let value = rest[..end].trim().parse::<i64>().map_err(|_| invalid())?;
            (IndexArgument::Integer(value), &rest[end..])
        };
        result.push(arg);
        let tail = tail.trim_start();
        rest = match tail.strip_prefix(',') {
            Some(t) if !t.trim().is_empty() => t.trim_start(),
            Some(_) => return Err(invalid()),
            None if tail.is_empty() => tail,
            None => return Err(invalid()),
        };
    }
    if result.is_empty() {
        return Err(invalid());
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_paths() {
        let p = MemberPath::parse("A.B.C").unwrap();
        assert_eq!(p.members(), ["A", "B", "C"]);
        assert_eq!(p.path(), "A.B.C");

        let p = MemberPath::parse("Items[0].Name").unwrap();
        assert_eq!(p.members(), ["Items", "[0]", "Name"]);

        let p = MemberPath::parse("[\"a.b\"][1, 2]").unwrap();
        assert_eq!(p.members(), ["[\"a.b\"]", "[1, 2]"]);
        assert_eq!(
            MemberPath::index_arguments("[1, 'x']"),
            Some(vec![IndexArgument::Integer(1), IndexArgument::String("x".into())])
        );

        assert!(MemberPath::parse("").unwrap().is_empty());
        assert_eq!(MemberPath::parse("A..B"), Err(MemberPathError::EmptySegment(2)));
        assert_eq!(MemberPath::parse("A."), Err(MemberPathError::EmptySegment(2)));
        assert_eq!(MemberPath::parse("A[0"), Err(MemberPathError::UnterminatedIndexer(1)));
        assert!(MemberPath::parse("A[x]").is_err());
        assert!(MemberPath::parse("A[0]B").is_err());
    }

    #[test]
    fn from_members_rebuilds_the_path() {
        let p = MemberPath::from_members(["Items".into(), "[0]".into(), "Name".into()]);
        assert_eq!(p.path(), "Items[0].Name");
        assert_eq!(p, MemberPath::parse("Items[0].Name").unwrap());
        assert!(MemberPath::empty().is_empty());

        let p = MemberPath::from_members(["Items".into(), "[\"a.b\"]".into(), "Name".into()]);
        assert_eq!(p.path(), "Items[\"a.b\"].Name");
        assert_eq!(p, MemberPath::parse("Items[\"a.b\"].Name").unwrap());
        assert_eq!(p.join(MemberPath::empty()), p);
    }
}
