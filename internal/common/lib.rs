// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

//! Data structures shared between `i-weave-compiler` and `i-weave-core`.
//!
//! **NOTE**: This crate is an internal crate of the Weave project.
//! It should not be used directly by applications.

#![deny(unsafe_code)]

pub mod enums;
pub mod literal;
pub mod member_path;

pub use enums::{MemberFlags, MemberKind};
pub use literal::{ArithmeticOp, Literal, LiteralType};
pub use member_path::{IndexArgument, MemberPath, MemberPathError};
