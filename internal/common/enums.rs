// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

//! Member kinds and lookup flags used by the member resolution pipeline.

bitflags::bitflags! {
    /// The kind of a member. Lookups take a set of kinds.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MemberKind: u8 {
        /// A property, a field or an indexer
        const ACCESSOR = 1;
        const METHOD = 1 << 1;
        const EVENT = 1 << 2;
        const ALL = Self::ACCESSOR.bits() | Self::METHOD.bits() | Self::EVENT.bits();
    }
}

bitflags::bitflags! {
    /// Flags describing a member, also used as a filter when looking members up.
    ///
    /// A member matches a filter when it shares at least one bit of each of the
    /// `STATIC | INSTANCE` and `PUBLIC | NON_PUBLIC` groups with the filter.
    /// The remaining bits describe where the member comes from.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MemberFlags: u16 {
        const STATIC = 1;
        const INSTANCE = 1 << 1;
        const PUBLIC = 1 << 2;
        const NON_PUBLIC = 1 << 3;
        /// Static method registered as an instance method of its first parameter type
        const EXTENSION = 1 << 4;
        /// Synthetic member registered by the host for a type it doesn't own
        const ATTACHED = 1 << 5;
        /// Resolved by the object at runtime, without static metadata
        const DYNAMIC = 1 << 6;
        /// Opt-out of change observation, the member is read as a snapshot
        const NON_OBSERVABLE = 1 << 7;

        const INSTANCE_PUBLIC = Self::INSTANCE.bits() | Self::PUBLIC.bits();
        const STATIC_PUBLIC = Self::STATIC.bits() | Self::PUBLIC.bits();
        const ALL_ACCESS = Self::STATIC.bits()
            | Self::INSTANCE.bits()
            | Self::PUBLIC.bits()
            | Self::NON_PUBLIC.bits();
    }
}

impl MemberFlags {
    const SCOPE: Self = Self::STATIC.union(Self::INSTANCE);
    const VISIBILITY: Self = Self::PUBLIC.union(Self::NON_PUBLIC);

    /// True if a member declared with `self` flags is selected by the `filter`.
    pub fn matches(self, filter: MemberFlags) -> bool {
        self.intersects(filter & Self::SCOPE) && self.intersects(filter & Self::VISIBILITY)
    }

    pub fn is_static(self) -> bool {
        self.contains(Self::STATIC)
    }
}

#[test]
fn member_flags_matching() {
    let member = MemberFlags::INSTANCE_PUBLIC;
    assert!(member.matches(MemberFlags::INSTANCE_PUBLIC));
    assert!(member.matches(MemberFlags::ALL_ACCESS));
    assert!(!member.matches(MemberFlags::STATIC_PUBLIC));
    assert!(!member.matches(MemberFlags::INSTANCE | MemberFlags::NON_PUBLIC));
    let attached = MemberFlags::INSTANCE_PUBLIC | MemberFlags::ATTACHED;
    assert!(attached.matches(MemberFlags::INSTANCE_PUBLIC));
}
