//! Total, pure line-to-event mapping (§4.2). Deliberately has no notion of
//! "current state" — it only recognizes the fixed grammar and hands the
//! result to the delta engine / segmenter, which hold all state.

use crate::database::{ContextTag, TypeId};
use once_cell::sync::Lazy;
use regex::Regex;

#[derive(Debug, Clone, PartialEq)]
pub enum ExchangeFragment {
    Search { type_id: TypeId },
    /// `page_id` is the inventory page the listing's quote is sourced
    /// from — carried so the exchange parser can drop gear-page listings
    /// the same way the delta engine drops gear-page bag events (§4.3
    /// Exclusions).
    Listing { unit_price: f64, page_id: i64 },
    End,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LineEvent {
    BagModify {
        page_id: i64,
        slot_id: i64,
        type_id: TypeId,
        quantity: i64,
    },
    BagInit {
        page_id: i64,
        slot_id: i64,
        type_id: TypeId,
        quantity: i64,
    },
    BagRemove {
        page_id: i64,
        slot_id: i64,
    },
    ContextBegin(ContextTag),
    ContextEnd(ContextTag),
    LevelEnter {
        level_uid: String,
        level_type: String,
        level_id: i64,
        level_path: String,
    },
    LevelOpen,
    PlayerField {
        key: String,
        value: String,
    },
    ExchangeFragment(ExchangeFragment),
}

static RE_BAG_MODIFY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\[BAG\] MODIFY page=(-?\d+) slot=(-?\d+) type=(-?\d+) num=(-?\d+)$").unwrap()
});
static RE_BAG_INIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\[BAG\] INIT page=(-?\d+) slot=(-?\d+) type=(-?\d+) num=(-?\d+)$").unwrap()
});
static RE_BAG_REMOVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[BAG\] REMOVE page=(-?\d+) slot=(-?\d+)$").unwrap());
static RE_CTX_BEGIN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[CTX\] BEGIN (\w+)$").unwrap());
static RE_CTX_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[CTX\] END (\w+)$").unwrap());
static RE_LEVEL_ENTER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\[LEVEL\] ENTER uid=(\S+) type=(\S+) id=(-?\d+) path=(\S+)$").unwrap()
});
static RE_LEVEL_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[LEVEL\] OPEN$").unwrap());
static RE_PLAYER_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[PLAYER\] (\w+)=(.+)$").unwrap());
static RE_EXCHANGE_SEARCH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[EXCHANGE\] SEARCH type=(-?\d+)$").unwrap());
static RE_EXCHANGE_LISTING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[EXCHANGE\] LISTING price=([0-9.]+) page=(-?\d+)$").unwrap());
static RE_EXCHANGE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[EXCHANGE\] END$").unwrap());

/// Parse a single, already-decoded and newline-stripped log line. Total:
/// never panics, returns `None` for anything it doesn't recognize.
pub fn parse_line(line: &str) -> Option<LineEvent> {
    let line = line.trim_end_matches(['\r', '\n']);

    if let Some(caps) = RE_BAG_MODIFY.captures(line) {
        return Some(LineEvent::BagModify {
            page_id: caps[1].parse().ok()?,
            slot_id: caps[2].parse().ok()?,
            type_id: caps[3].parse().ok()?,
            quantity: caps[4].parse().ok()?,
        });
    }
    if let Some(caps) = RE_BAG_INIT.captures(line) {
        return Some(LineEvent::BagInit {
            page_id: caps[1].parse().ok()?,
            slot_id: caps[2].parse().ok()?,
            type_id: caps[3].parse().ok()?,
            quantity: caps[4].parse().ok()?,
        });
    }
    if let Some(caps) = RE_BAG_REMOVE.captures(line) {
        return Some(LineEvent::BagRemove {
            page_id: caps[1].parse().ok()?,
            slot_id: caps[2].parse().ok()?,
        });
    }
    if let Some(caps) = RE_CTX_BEGIN.captures(line) {
        return Some(LineEvent::ContextBegin(ContextTag::parse(&caps[1])));
    }
    if let Some(caps) = RE_CTX_END.captures(line) {
        return Some(LineEvent::ContextEnd(ContextTag::parse(&caps[1])));
    }
    if let Some(caps) = RE_LEVEL_ENTER.captures(line) {
        return Some(LineEvent::LevelEnter {
            level_uid: caps[1].to_string(),
            level_type: caps[2].to_string(),
            level_id: caps[3].parse().ok()?,
            level_path: caps[4].to_string(),
        });
    }
    if RE_LEVEL_OPEN.is_match(line) {
        return Some(LineEvent::LevelOpen);
    }
    if let Some(caps) = RE_EXCHANGE_SEARCH.captures(line) {
        return Some(LineEvent::ExchangeFragment(ExchangeFragment::Search {
            type_id: caps[1].parse().ok()?,
        }));
    }
    if let Some(caps) = RE_EXCHANGE_LISTING.captures(line) {
        return Some(LineEvent::ExchangeFragment(ExchangeFragment::Listing {
            unit_price: caps[1].parse().ok()?,
            page_id: caps[2].parse().ok()?,
        }));
    }
    if RE_EXCHANGE_END.is_match(line) {
        return Some(LineEvent::ExchangeFragment(ExchangeFragment::End));
    }
    // PlayerField is the most permissive pattern; check it last so it
    // never shadows a more specific bracketed grammar line.
    if let Some(caps) = RE_PLAYER_FIELD.captures(line) {
        return Some(LineEvent::PlayerField {
            key: caps[1].to_string(),
            value: caps[2].to_string(),
        });
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bag_modify() {
        let event = parse_line("[BAG] MODIFY page=102 slot=0 type=100300 num=671").unwrap();
        assert_eq!(
            event,
            LineEvent::BagModify {
                page_id: 102,
                slot_id: 0,
                type_id: 100300,
                quantity: 671,
            }
        );
    }

    #[test]
    fn parses_bag_remove_without_type() {
        let event = parse_line("[BAG] REMOVE page=103 slot=39").unwrap();
        assert_eq!(
            event,
            LineEvent::BagRemove {
                page_id: 103,
                slot_id: 39,
            }
        );
    }

    #[test]
    fn parses_context_tags() {
        assert_eq!(
            parse_line("[CTX] BEGIN PickItems").unwrap(),
            LineEvent::ContextBegin(ContextTag::PickItems)
        );
        assert_eq!(
            parse_line("[CTX] END PickItems").unwrap(),
            LineEvent::ContextEnd(ContextTag::PickItems)
        );
    }

    #[test]
    fn parses_level_enter() {
        let event =
            parse_line("[LEVEL] ENTER uid=abc123 type=map id=212 path=forest").unwrap();
        assert_eq!(
            event,
            LineEvent::LevelEnter {
                level_uid: "abc123".to_string(),
                level_type: "map".to_string(),
                level_id: 212,
                level_path: "forest".to_string(),
            }
        );
    }

    #[test]
    fn parses_exchange_fragments() {
        assert_eq!(
            parse_line("[EXCHANGE] SEARCH type=100300").unwrap(),
            LineEvent::ExchangeFragment(ExchangeFragment::Search { type_id: 100300 })
        );
        assert_eq!(
            parse_line("[EXCHANGE] LISTING price=0.12 page=101").unwrap(),
            LineEvent::ExchangeFragment(ExchangeFragment::Listing {
                unit_price: 0.12,
                page_id: 101,
            })
        );
        assert_eq!(
            parse_line("[EXCHANGE] END").unwrap(),
            LineEvent::ExchangeFragment(ExchangeFragment::End)
        );
    }

    #[test]
    fn parses_player_field() {
        let event = parse_line("[PLAYER] Name=Foo").unwrap();
        assert_eq!(
            event,
            LineEvent::PlayerField {
                key: "Name".to_string(),
                value: "Foo".to_string(),
            }
        );
    }

    #[test]
    fn unrecognized_line_is_none() {
        assert_eq!(parse_line("this is not a game log line"), None);
    }

    #[test]
    fn parsing_is_deterministic() {
        let line = "[BAG] MODIFY page=102 slot=0 type=100300 num=671";
        assert_eq!(parse_line(line), parse_line(line));
    }
}
