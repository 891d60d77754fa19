//! Access evaluator: pure checks of an actor against a target user.
//!
//! - No IO
//! - No panics
//! - Department and hierarchy checks are independent; callers decide order.

use std::collections::BTreeSet;

use hrdesk_core::UserId;

use crate::principal::{ActorSnapshot, Subject};

/// Membership test against the actor's permission set.
pub fn has_permission(actor: &ActorSnapshot, permission: &str) -> bool {
    actor.permissions.iter().any(|p| p.as_str() == permission)
}

/// True iff any of the actor's roles sits at hierarchy level 0.
pub fn is_unrestricted(actor: &ActorSnapshot) -> bool {
    actor.is_unrestricted()
}

/// Department gate.
///
/// A target without a department cannot be department-matched, so only a
/// cross-department actor may reach it.
pub fn same_or_cross_department(actor: &ActorSnapshot, target: &Subject) -> bool {
    if actor.can_cross_departments {
        return true;
    }
    match (&target.department, &actor.department) {
        (Some(target_dept), Some(actor_dept)) => target_dept == actor_dept,
        _ => false,
    }
}

/// Hierarchy gate: same-or-senior actors pass (peers may act on peers).
pub fn hierarchy_allows(actor: &ActorSnapshot, target: &Subject) -> bool {
    actor.hierarchy_level <= target.min_hierarchy_level()
}

/// Users the actor is allowed to see.
///
/// Unrestricted actors see everyone (inactive included). Others always see
/// themselves, plus active users that pass both the department and the
/// hierarchy gate.
pub fn accessible_users<'a, I>(actor: &ActorSnapshot, candidates: I) -> BTreeSet<UserId>
where
    I: IntoIterator<Item = &'a Subject>,
{
    let unrestricted = is_unrestricted(actor);
    candidates
        .into_iter()
        .filter(|target| {
            unrestricted
                || target.user_id == actor.user_id
                || (target.is_active
                    && same_or_cross_department(actor, target)
                    && hierarchy_allows(actor, target))
        })
        .map(|target| target.user_id)
        .collect()
}
