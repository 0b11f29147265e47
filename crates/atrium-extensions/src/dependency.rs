//! Dependency and extension-pack closures
//!
//! All traversals share one visited set keyed by lower-cased identity across
//! both relations, so mixed pack/dependency cycles terminate.

use crate::extension::Extension;
use std::collections::HashSet;
use std::sync::Arc;

fn contains(list: &[Arc<Extension>], candidate: &Extension) -> bool {
    let identifier = candidate.identifier();
    list.iter().any(|e| e.identifier().matches(&identifier))
}

/// Installed, non-builtin pack members of `root`, recursively
pub fn pack_closure(root: &Arc<Extension>, installed: &[Arc<Extension>]) -> Vec<Arc<Extension>> {
    let mut visited: HashSet<String> = HashSet::new();
    visited.insert(root.key());

    let mut result = Vec::new();
    let mut queue = vec![root.clone()];
    while let Some(current) = queue.pop() {
        let pack = current.extension_pack();
        if pack.is_empty() {
            continue;
        }
        for member in installed {
            if !member.has_local() || member.is_builtin() {
                continue;
            }
            if !pack.iter().any(|id| member.identifier().matches_id(id)) {
                continue;
            }
            if visited.insert(member.key()) {
                result.push(member.clone());
                queue.push(member.clone());
            }
        }
    }
    result
}

/// Extensions reached through dependencies and/or pack edges whose
/// enablement differs from the target state
///
/// Enabling includes builtin extensions; disabling skips them.
pub fn enablement_closure(
    targets: &[Arc<Extension>],
    installed: &[Arc<Extension>],
    enable: bool,
    include_dependencies: bool,
) -> Vec<Arc<Extension>> {
    let mut visited: HashSet<String> = targets.iter().map(|t| t.key()).collect();
    let mut result = Vec::new();
    let mut frontier: Vec<Arc<Extension>> = targets.to_vec();

    while !frontier.is_empty() {
        let mut next = Vec::new();
        for candidate in installed {
            if visited.contains(&candidate.key()) || !candidate.has_local() {
                continue;
            }
            if candidate.is_enabled() == enable {
                continue;
            }
            if !enable && candidate.is_builtin() {
                continue;
            }
            let id = candidate.id();
            let reached = frontier.iter().any(|source| {
                (include_dependencies && source.depends_on(&id)) || source.packs(&id)
            });
            if reached {
                visited.insert(candidate.key());
                next.push(candidate.clone());
            }
        }
        result.extend(next.iter().cloned());
        frontier = next;
    }
    result
}

/// Enabled extensions that would be left depending on something in `to_disable`
pub fn dependents_after_disablement(
    to_disable: &[Arc<Extension>],
    installed: &[Arc<Extension>],
) -> Vec<Arc<Extension>> {
    installed
        .iter()
        .filter(|candidate| {
            let dependencies = candidate.dependencies();
            !dependencies.is_empty()
                && candidate.is_enabled()
                && !contains(to_disable, candidate)
                && dependencies.iter().any(|dep| {
                    to_disable
                        .iter()
                        .any(|d| d.identifier().matches_id(dep))
                })
        })
        .cloned()
        .collect()
}

/// Grow `collected` with every installed extension that hard-depends on a
/// collected one; returns the dependents that were added
///
/// The scan walks `collected` by index while it grows, so dependents of
/// dependents are found too. Pack members of a collected extension, or of an
/// already-found dependent, are not counted as dependents.
pub fn collect_uninstall_dependents(
    collected: &mut Vec<Arc<Extension>>,
    installed: &[Arc<Extension>],
) -> Vec<Arc<Extension>> {
    let mut dependents: Vec<Arc<Extension>> = Vec::new();
    let mut index = 0;
    while index < collected.len() {
        let current = collected[index].clone();
        let current_id = current.identifier();
        for candidate in installed {
            if !candidate.has_local() {
                continue;
            }
            let candidate_id = candidate.identifier();
            if candidate_id.matches(&current_id) {
                continue;
            }
            if candidate.dependencies().is_empty() {
                continue;
            }
            if current.packs(&candidate_id.id) {
                continue;
            }
            if dependents.iter().any(|d| d.packs(&candidate_id.id)) {
                continue;
            }
            if contains(collected, candidate) {
                continue;
            }
            if candidate.depends_on(&current_id.id) {
                dependents.push(candidate.clone());
                collected.push(candidate.clone());
            }
        }
        index += 1;
    }
    dependents
}

/// Confirmation text for removing or disabling an extension that others depend on
pub fn dependents_message(verb: &str, extension: &Extension, dependents: &[Arc<Extension>]) -> String {
    let name = extension.display_name();
    match dependents {
        [] => String::new(),
        [one] => format!(
            "Cannot {verb} '{name}' extension alone. '{}' extension depends on this. Do you want to {verb} all these extensions?",
            one.display_name()
        ),
        [first, second] => format!(
            "Cannot {verb} '{name}' extension alone. '{}' and '{}' extensions depend on this. Do you want to {verb} all these extensions?",
            first.display_name(),
            second.display_name()
        ),
        [first, second, ..] => format!(
            "Cannot {verb} '{name}' extension alone. '{}', '{}' and other extensions depend on this. Do you want to {verb} all these extensions?",
            first.display_name(),
            second.display_name()
        ),
    }
}
