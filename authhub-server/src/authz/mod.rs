pub mod catalog;
pub mod resolver;

use std::collections::BTreeSet;

/// Test whether a held permission grant satisfies a required permission.
///
/// Permission keys are `resource:action` pairs. Either segment of the held
/// key may be the wildcard `*`, so `user:*` satisfies `user:read` and
/// `*:read` satisfies `order:read`. Wildcards on the required side carry
/// no special meaning; only grants are patterns.
pub fn grant_satisfies(held: &str, required: &str) -> bool {
    if held == required {
        return true;
    }
    let (Some((held_resource, held_action)), Some((req_resource, req_action))) =
        (held.split_once(':'), required.split_once(':'))
    else {
        return false;
    };
    (held_resource == "*" || held_resource == req_resource)
        && (held_action == "*" || held_action == req_action)
}

/// True when any permission in `held` satisfies `required`.
pub fn has_permission(held: &BTreeSet<String>, required: &str) -> bool {
    held.iter().any(|grant| grant_satisfies(grant, required))
}
