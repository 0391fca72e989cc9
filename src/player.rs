//! Player Context (G): watches `PlayerField` events and derives the
//! PlayerScope that partitions all persisted state (§4.6). Detecting a
//! scope change is pure; carrying out the atomic flush/reload sequence
//! that a change triggers is the Collector's job, since it needs the
//! Store, Segmenter, and Cloud Sync Worker handles.

#[derive(Debug, Clone, PartialEq)]
pub struct ScopeChange {
    pub previous: Option<String>,
    pub new_scope: String,
}

#[derive(Default)]
pub struct PlayerContext {
    player_id: Option<String>,
    name: Option<String>,
    season_id: Option<String>,
    scope: Option<String>,
}

impl PlayerContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    pub fn season_id(&self) -> Option<&str> {
        self.season_id.as_deref()
    }

    /// Feed one `PlayerField(key, value)` observation. Returns `Some` iff
    /// the derived PlayerScope actually changed.
    pub fn observe_field(&mut self, key: &str, value: &str) -> Option<ScopeChange> {
        match key {
            "PlayerId" => self.player_id = Some(value.to_string()),
            "Name" => self.name = Some(value.to_string()),
            "SeasonId" => self.season_id = Some(value.to_string()),
            _ => return None,
        }

        let candidate = self.derive_scope()?;
        if self.scope.as_deref() == Some(candidate.as_str()) {
            return None;
        }

        let previous = self.scope.take();
        self.scope = Some(candidate.clone());
        Some(ScopeChange {
            previous,
            new_scope: candidate,
        })
    }

    /// A stable PlayerId takes precedence; otherwise scope requires both
    /// SeasonId and Name to be known.
    fn derive_scope(&self) -> Option<String> {
        if let Some(player_id) = &self.player_id {
            return Some(player_id.clone());
        }
        match (&self.season_id, &self.name) {
            (Some(season), Some(name)) => Some(format!("{season}_{name}")),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_scope_until_season_and_name_known() {
        let mut ctx = PlayerContext::new();
        assert!(ctx.observe_field("SeasonId", "5").is_none());
        assert!(ctx.current_scope().is_none());

        let change = ctx.observe_field("Name", "Foo").unwrap();
        assert_eq!(change.previous, None);
        assert_eq!(change.new_scope, "5_Foo");
    }

    #[test]
    fn player_id_overrides_season_name_composite() {
        let mut ctx = PlayerContext::new();
        ctx.observe_field("SeasonId", "5");
        ctx.observe_field("Name", "Foo");
        let change = ctx.observe_field("PlayerId", "stable-123").unwrap();
        assert_eq!(change.new_scope, "stable-123");
    }

    #[test]
    fn changing_name_mid_session_emits_new_scope_change() {
        let mut ctx = PlayerContext::new();
        ctx.observe_field("SeasonId", "5");
        ctx.observe_field("Name", "Foo");
        let change = ctx.observe_field("Name", "Bar").unwrap();
        assert_eq!(change.previous.as_deref(), Some("5_Foo"));
        assert_eq!(change.new_scope, "5_Bar");
    }

    #[test]
    fn unrelated_field_key_is_ignored() {
        let mut ctx = PlayerContext::new();
        assert!(ctx.observe_field("Unrelated", "whatever").is_none());
    }

    #[test]
    fn identical_observation_does_not_re_emit() {
        let mut ctx = PlayerContext::new();
        ctx.observe_field("SeasonId", "5");
        ctx.observe_field("Name", "Foo");
        assert!(ctx.observe_field("Name", "Foo").is_none());
    }
}
