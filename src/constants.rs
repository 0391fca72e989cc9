//! Small data tables the spec calls out as configuration, not code (§9 Open
//! Question (a)): which PageId is excluded, which zone signatures count as
//! sub-zones, and which level paths are hubs. Keeping these as plain data
//! here (rather than scattering match arms through the segmenter) is what
//! lets them be tuned without touching segmenter logic.

use crate::database::TypeId;

/// The "gear" page: excluded from tracking except for the narrow allowlist
/// below.
pub const GEAR_PAGE_ID: i64 = 900;

/// TypeIds on the gear page that represent tradable sub-types and are
/// therefore still tracked despite living on an otherwise-excluded page.
pub const GEAR_PAGE_ALLOWLIST: &[TypeId] = &[];

pub fn is_excluded_slot(page_id: i64, type_id: TypeId) -> bool {
    page_id == GEAR_PAGE_ID && !GEAR_PAGE_ALLOWLIST.contains(&type_id)
}

/// Level paths recognized as sub-zones: entering one from `InMap` pauses
/// (does not close) the outer run; entering one from `Idle` opens a
/// standalone run. Matched against the raw `levelPath`, before the
/// mod-100 suffix `zone_signature()` appends — a sub-zone's suffixed
/// signature would never equal one of these bare entries.
pub const SUBZONE_SIGNATURES: &[&str] = &["nightmare", "arcana", "trial_a", "trial_b", "trial_c"];

pub fn is_subzone_signature(level_path: &str) -> bool {
    SUBZONE_SIGNATURES.contains(&level_path)
}

/// Level path prefixes recognized as hub zones: entering one closes any
/// active run(s) and the segmenter returns to `Idle`.
pub const HUB_PATH_PATTERNS: &[&str] = &["town", "hub", "sanctuary", "camp"];

pub fn is_hub_path(level_path: &str) -> bool {
    HUB_PATH_PATTERNS
        .iter()
        .any(|pattern| level_path.starts_with(pattern))
}

/// Derive a zone signature from a level path and id. A suffix-based rule
/// (`levelId mod 100`) disambiguates zones sharing a path across regions;
/// special zones that don't follow the pattern get an explicit override.
pub fn zone_signature(level_path: &str, level_id: i64) -> String {
    if let Some(&special) = SPECIAL_ZONE_OVERRIDES
        .iter()
        .find(|(path, _)| *path == level_path)
        .map(|(_, sig)| sig)
    {
        return special.to_string();
    }
    format!("{}_{}", level_path, level_id % 100)
}

const SPECIAL_ZONE_OVERRIDES: &[(&str, &str)] = &[("world_boss_arena", "world_boss")];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gear_page_excluded_without_allowlist() {
        assert!(is_excluded_slot(GEAR_PAGE_ID, 1));
        assert!(!is_excluded_slot(101, 1));
    }

    #[test]
    fn zone_signature_uses_mod_100_suffix() {
        assert_eq!(zone_signature("forest", 212), "forest_12");
    }

    #[test]
    fn special_override_ignores_mod_rule() {
        assert_eq!(zone_signature("world_boss_arena", 999), "world_boss");
    }

    #[test]
    fn hub_detection_matches_prefix() {
        assert!(is_hub_path("town_main"));
        assert!(!is_hub_path("forest_12"));
    }
}
