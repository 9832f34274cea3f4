// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

//! Selection of the best overload of a method or indexer for a list of arguments

use crate::rtti::{EXACT_MATCH, MemberRc, Type};
use crate::value::Value;
use i_weave_common::MemberFlags;
use itertools::Itertools;
use smol_str::SmolStr;

/// A member looked up with the types of the arguments it is called with
#[derive(Debug, Clone, PartialEq)]
pub struct MemberRequest {
    pub name: SmolStr,
    pub arguments: Vec<Type>,
}

impl MemberRequest {
    pub fn new(name: impl Into<SmolStr>, arguments: Vec<Type>) -> Self {
        Self { name: name.into(), arguments }
    }

    /// A request for the runtime types of `values`
    pub fn for_values(name: impl Into<SmolStr>, values: &[Value]) -> Self {
        Self::new(name, values.iter().map(Value::runtime_type).collect())
    }
}

/// The parameters matched by the arguments of a call.
/// The target of an extension method is its first parameter, it isn't passed as argument.
pub fn call_parameters(member: &MemberRc) -> &[Type] {
    let parameters = member.parameters();
    if member.flags().contains(MemberFlags::EXTENSION) {
        parameters.get(1..).unwrap_or_default()
    } else {
        parameters
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Score {
    cost: u32,
    conversions: usize,
}

fn score(member: &MemberRc, arguments: &[Type]) -> Option<Score> {
    let parameters = call_parameters(member);
    if parameters.len() != arguments.len() {
        return None;
    }
    let costs: Vec<u32> =
        parameters.iter().zip(arguments).map(|(p, a)| p.conversion_cost(a)).collect::<Option<_>>()?;
    Some(Score {
        cost: costs.iter().sum(),
        conversions: costs.iter().filter(|c| **c != EXACT_MATCH).count(),
    })
}

/// The outcome of [`select_overload`]
#[derive(Debug, Clone)]
pub enum Overload {
    Found(MemberRc),
    NotFound,
    /// Several candidates are equally good
    Ambiguous(Vec<MemberRc>),
}

/// Select the candidate whose parameters best match `arguments`.
///
/// Candidates with a different arity, or with a parameter that can't be converted
/// from its argument, are discarded. The best candidate has the lowest total
/// conversion cost, then the fewest non exact conversions.
pub fn select_overload(candidates: &[MemberRc], arguments: &[Type]) -> Overload {
    let mut best = candidates
        .iter()
        .filter_map(|m| score(m, arguments).map(|s| (m, s)))
        .min_set_by_key(|(_, s)| *s)
        .into_iter()
        .map(|(m, _)| m.clone());
    match (best.next(), best.next()) {
        (None, _) => Overload::NotFound,
        (Some(m), None) => Overload::Found(m),
        (Some(a), Some(b)) => Overload::Ambiguous([a, b].into_iter().chain(best).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rtti::{MemberDeclaration, TypeDescriptor};
    use i_weave_common::LiteralType;

    fn p(t: LiteralType) -> Type {
        Type::Primitive(t)
    }

    #[test]
    fn best_overload() {
        let ty = TypeDescriptor::builder("Calc")
            .member(MemberDeclaration::method("F", vec![p(LiteralType::Int64)], Type::Void))
            .member(MemberDeclaration::method("F", vec![p(LiteralType::Int32)], Type::Void))
            .member(MemberDeclaration::method("F", vec![Type::Any], Type::Void))
            .member(MemberDeclaration::method("F", vec![Type::Any, Type::Any], Type::Void))
            .build();
        let members = ty.declared_members();
        let found = |args: &[Type]| match select_overload(members, args) {
            Overload::Found(m) => m,
            _ => panic!("no overload for {args:?}"),
        };
        assert!(std::sync::Arc::ptr_eq(&found(&[p(LiteralType::Int32)]), &members[1]));
        assert!(std::sync::Arc::ptr_eq(&found(&[p(LiteralType::String)]), &members[2]));
        assert!(std::sync::Arc::ptr_eq(&found(&[Type::Null, Type::Null]), &members[3]));
        assert!(matches!(select_overload(members, &[]), Overload::NotFound));
    }

    #[test]
    fn equally_good_candidates_are_ambiguous() {
        let ty = TypeDescriptor::builder("Calc")
            .member(MemberDeclaration::method(
                "G",
                vec![p(LiteralType::Int64), p(LiteralType::Int32)],
                Type::Void,
            ))
            .member(MemberDeclaration::method(
                "G",
                vec![p(LiteralType::Int32), p(LiteralType::Int64)],
                Type::Void,
            ))
            .build();
        let args = [p(LiteralType::Int32), p(LiteralType::Int32)];
        let Overload::Ambiguous(candidates) = select_overload(ty.declared_members(), &args) else {
            panic!("expected an ambiguity")
        };
        assert_eq!(candidates.len(), 2);
    }

    #[test]
    fn extension_target_is_not_an_argument() {
        let person = TypeDescriptor::builder("Person").build();
        let parameters = vec![Type::Object(person.clone()), Type::Any];
        let ext = MemberDeclaration::method("Greet", parameters, Type::Any)
            .with_flags(MemberFlags::STATIC_PUBLIC | MemberFlags::EXTENSION)
            .build(std::sync::Arc::downgrade(&person), "Helpers".into());
        assert_eq!(call_parameters(&ext), &[Type::Any]);
        assert!(matches!(select_overload(&[ext], &[p(LiteralType::Int32)]), Overload::Found(_)));
    }
}
