// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

use i_weave_common::{MemberKind, MemberPathError};
use smol_str::SmolStr;

/// Errors of member resolution, path observation and evaluation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum BindingError {
    #[error("No {what} '{name}' found on type '{ty}'", what = kind_name(.kind))]
    MemberNotFound { ty: SmolStr, name: SmolStr, kind: MemberKind },
    #[error(
        "Ambiguous match for '{name}' on type '{ty}': {candidates} candidates are equally good"
    )]
    AmbiguousMatch { ty: SmolStr, name: SmolStr, candidates: usize },
    #[error("The target of '{0}' is not available")]
    TargetUnavailable(SmolStr),
    #[error("'{0}' can't be read")]
    NotReadable(SmolStr),
    #[error("'{0}' can't be written")]
    NotWritable(SmolStr),
    #[error("Cannot convert a value of type '{found}' to '{expected}'")]
    TypeMismatch { expected: SmolStr, found: SmolStr },
    #[error("Invalid arguments for '{member}': {message}")]
    InvalidArguments { member: SmolStr, message: String },
    #[error(transparent)]
    InvalidPath(#[from] MemberPathError),
    #[error("{0}")]
    Evaluation(String),
}

fn kind_name(kind: &MemberKind) -> &'static str {
    if *kind == MemberKind::METHOD {
        "method"
    } else if *kind == MemberKind::EVENT {
        "event"
    } else if *kind == MemberKind::ACCESSOR {
        "property"
    } else {
        "member"
    }
}

/// How failures to resolve a member are reported.
///
/// Observers attached to live object graphs use [`Self::Lenient`]: a path that
/// can't be resolved yet is a valid state that may change later. One-shot
/// evaluation uses [`Self::Strict`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolutionPolicy {
    #[default]
    Strict,
    Lenient,
}

impl ResolutionPolicy {
    pub fn is_strict(self) -> bool {
        self == Self::Strict
    }
}

#[test]
fn error_messages() {
    let e = BindingError::MemberNotFound {
        ty: "Person".into(),
        name: "Age".into(),
        kind: MemberKind::ACCESSOR,
    };
    assert_eq!(e.to_string(), "No property 'Age' found on type 'Person'");
    let e = BindingError::MemberNotFound {
        ty: "Person".into(),
        name: "Run".into(),
        kind: MemberKind::METHOD,
    };
    assert_eq!(e.to_string(), "No method 'Run' found on type 'Person'");
}
