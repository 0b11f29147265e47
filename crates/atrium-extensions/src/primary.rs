//! Extension-kind environment preference
//!
//! The same identity may be installed in several environments. The copy
//! treated as canonical is chosen from an ordered list of
//! `(kind, environment)` placements derived from the manifest's kinds.

use crate::extension::Extension;
use atrium_core::types::{ExtensionEnvironment, ExtensionKind};
use std::sync::Arc;

/// One acceptable placement of an extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub kind: ExtensionKind,
    pub environment: ExtensionEnvironment,
}

/// Ordered placements for the given kinds and available environments
///
/// First every kind in its natural home (ui locally, workspace remotely,
/// web in the web sandbox), then workspace/web copies hosted locally, then
/// web copies hosted remotely.
pub fn placements(
    kinds: &[ExtensionKind],
    environments: &[ExtensionEnvironment],
) -> Vec<Placement> {
    let mut result = Vec::new();
    let mut push = |kind, environment| {
        let placement = Placement { kind, environment };
        if environments.contains(&environment) && !result.contains(&placement) {
            result.push(placement);
        }
    };

    for &kind in kinds {
        match kind {
            ExtensionKind::Ui => push(kind, ExtensionEnvironment::Local),
            ExtensionKind::Workspace => push(kind, ExtensionEnvironment::Remote),
            ExtensionKind::Web => push(kind, ExtensionEnvironment::Web),
        }
    }
    for &kind in kinds {
        if matches!(kind, ExtensionKind::Workspace | ExtensionKind::Web) {
            push(kind, ExtensionEnvironment::Local);
        }
    }
    for &kind in kinds {
        if kind == ExtensionKind::Web {
            push(kind, ExtensionEnvironment::Remote);
        }
    }
    result
}

/// Rank of an environment in the placement list (lower is better)
pub fn environment_rank(placements: &[Placement], environment: ExtensionEnvironment) -> usize {
    placements
        .iter()
        .position(|p| p.environment == environment)
        .unwrap_or(usize::MAX)
}

/// Most preferred environment among `candidates`
pub fn preferred_environment(
    kinds: &[ExtensionKind],
    available: &[ExtensionEnvironment],
    candidates: &[ExtensionEnvironment],
) -> Option<ExtensionEnvironment> {
    let placements = placements(kinds, available);
    candidates
        .iter()
        .copied()
        .filter(|env| environment_rank(&placements, *env) != usize::MAX)
        .min_by_key(|env| environment_rank(&placements, *env))
}

/// Whether the first declared kind asks for the local (ui) side
pub fn prefers_ui(kinds: &[ExtensionKind]) -> bool {
    kinds.first() == Some(&ExtensionKind::Ui)
}

/// Whether the first declared kind asks for the workspace side
pub fn prefers_workspace(kinds: &[ExtensionKind]) -> bool {
    kinds.first() == Some(&ExtensionKind::Workspace)
}

/// Choose the canonical copy among copies of one identity
pub fn select_primary(
    copies: &[Arc<Extension>],
    environments: &[ExtensionEnvironment],
) -> Option<Arc<Extension>> {
    let first = copies.first()?;
    if copies.len() == 1 {
        return Some(first.clone());
    }

    let enabled: Vec<&Arc<Extension>> = copies
        .iter()
        .filter(|e| e.has_local() && e.is_enabled())
        .collect();
    if enabled.len() == 1 {
        return Some(enabled[0].clone());
    }

    let choices: Vec<&Arc<Extension>> = if enabled.is_empty() {
        copies.iter().collect()
    } else {
        enabled
    };

    let Some(manifest) = choices.iter().find_map(|e| e.local().map(|l| l.manifest)) else {
        return Some(choices[0].clone());
    };
    let placements = placements(&manifest.extension_kinds(), environments);

    let best = choices
        .iter()
        .filter_map(|e| {
            let rank = environment_rank(&placements, e.environment()?);
            (rank != usize::MAX).then_some((rank, *e))
        })
        .min_by_key(|(rank, _)| *rank)
        .map(|(_, e)| e.clone());

    Some(best.unwrap_or_else(|| first.clone()))
}
