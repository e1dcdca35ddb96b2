//! Overload resolution for calls and constructors.
//!
//! Candidates are searched on the calling type, then its base classes, then
//! its interfaces, then `object`, and finally (for unqualified calls) the
//! global functions.
//!
//! ## Algorithm
//!
//! 1. An exact match on parameter types, in search order, wins outright
//! 2. Otherwise every method with the name is a candidate if the arguments
//!    cover its required parameters and each argument converts implicitly
//! 3. The candidate with the lowest total conversion cost wins; ties go to
//!    the one found first in search order

use nyalang_core::{MethodId, TypeId};

use crate::conversion::{self, Conversion};
use crate::image::{ProgramImage, host};

/// Result of successful overload resolution.
#[derive(Debug, Clone)]
pub struct OverloadMatch {
    pub method: MethodId,
    /// Conversion for each supplied argument.
    pub arg_conversions: Vec<Conversion>,
    /// Trailing optional parameters left for their defaults.
    pub defaulted: usize,
    /// Total conversion cost (lower is better).
    pub cost: u32,
}

impl OverloadMatch {
    fn exact(method: MethodId, args: usize) -> Self {
        Self {
            method,
            arg_conversions: vec![Conversion::identity(); args],
            defaulted: 0,
            cost: 0,
        }
    }

    pub fn needs_conversion(&self) -> bool {
        self.arg_conversions.iter().any(|c| !c.is_identity())
    }
}

/// The owners searched for members of `ty`, nearest first.
pub fn search_order(image: &ProgramImage, ty: TypeId) -> Vec<Option<TypeId>> {
    let mut order: Vec<Option<TypeId>> = image.base_chain(ty).map(Some).collect();
    order.extend(image.all_interfaces(ty).into_iter().map(Some));
    if !order.contains(&Some(host::OBJECT)) {
        order.push(Some(host::OBJECT));
    }
    order
}

/// Pick the method `name` best matching `args` among `owners`.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn resolve(image: &ProgramImage, owners: &[Option<TypeId>], name: &str, args: &[Option<TypeId>]) -> Option<OverloadMatch> {
    let exact: Option<Vec<TypeId>> = args.iter().copied().collect();
    if let Some(types) = exact
        && let Some(method) = owners
            .iter()
            .find_map(|&owner| image.find_method(owner, name, &types))
    {
        return Some(OverloadMatch::exact(method, args.len()));
    }

    let viable: Vec<OverloadMatch> = owners
        .iter()
        .flat_map(|&owner| image.methods_named(owner, name))
        .filter_map(|method| match_candidate(image, method, args))
        .collect();
    find_best_match(viable)
}

/// Check one candidate against the supplied arguments.
fn match_candidate(image: &ProgramImage, method: MethodId, args: &[Option<TypeId>]) -> Option<OverloadMatch> {
    let entry = image.method(method);
    if args.len() > entry.params.len() || args.len() < entry.required_params() {
        return None;
    }

    let arg_conversions = args
        .iter()
        .zip(&entry.params)
        .map(|(&arg, param)| conversion::plan(image, arg, Some(param.ty)))
        .collect::<Option<Vec<_>>>()?;
    let cost = arg_conversions.iter().map(|c| c.cost).sum();
    Some(OverloadMatch {
        method,
        arg_conversions,
        defaulted: entry.params.len() - args.len(),
        cost,
    })
}

/// The cheapest candidate, first found on ties.
pub fn find_best_match(viable: Vec<OverloadMatch>) -> Option<OverloadMatch> {
    viable.into_iter().min_by_key(|m| (m.cost, m.defaulted))
}
