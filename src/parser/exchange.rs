//! Multi-line exchange-price protocol (§4.3): correlates a search-request
//! fragment with the listing fragments that follow it, closing the window
//! on an explicit end marker, a search for a different TypeId, or a
//! T_req timeout.

use super::line::ExchangeFragment;
use crate::database::TypeId;
use chrono::{DateTime, Duration, Utc};

/// Default window timeout; a search not conclusively closed within this
/// long is abandoned with whatever listings were seen so far.
pub const DEFAULT_T_REQ_SECONDS: i64 = 10;

const MIN_LISTINGS: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct PriceLearned {
    pub type_id: TypeId,
    pub reference_price: f64,
}

struct Window {
    type_id: TypeId,
    listings: Vec<f64>,
    opened_at: DateTime<Utc>,
}

pub struct ExchangeParser {
    window: Option<Window>,
    t_req: Duration,
    base_currency_type_id: Option<TypeId>,
}

impl ExchangeParser {
    pub fn new(base_currency_type_id: Option<TypeId>) -> Self {
        Self {
            window: None,
            t_req: Duration::seconds(DEFAULT_T_REQ_SECONDS),
            base_currency_type_id,
        }
    }

    /// Feed one fragment at time `now`. Returns a learned price whenever a
    /// window closes with enough listings to be conclusive.
    pub fn observe(&mut self, fragment: ExchangeFragment, now: DateTime<Utc>) -> Option<PriceLearned> {
        match fragment {
            ExchangeFragment::Search { type_id } => {
                // A search for a (possibly different) TypeId closes any
                // open window first.
                let closed = self.close_window();
                self.window = Some(Window {
                    type_id,
                    listings: Vec::new(),
                    opened_at: now,
                });
                closed
            }
            ExchangeFragment::Listing { unit_price, page_id } => {
                // Gear-page listings are ignored outright (§4.3
                // Exclusions); the window stays open for further
                // non-gear listings.
                if page_id != crate::constants::GEAR_PAGE_ID {
                    if let Some(window) = self.window.as_mut() {
                        window.listings.push(unit_price);
                    }
                }
                None
            }
            ExchangeFragment::End => self.close_window(),
        }
    }

    /// Call periodically (e.g. once per tailer tick) so an abandoned
    /// window without an explicit End fragment still closes.
    pub fn check_timeout(&mut self, now: DateTime<Utc>) -> Option<PriceLearned> {
        let expired = self
            .window
            .as_ref()
            .map(|w| now.signed_duration_since(w.opened_at) >= self.t_req)
            .unwrap_or(false);
        if expired {
            self.close_window()
        } else {
            None
        }
    }

    fn close_window(&mut self) -> Option<PriceLearned> {
        let window = self.window.take()?;
        if Some(window.type_id) == self.base_currency_type_id {
            return None;
        }
        if window.listings.len() < MIN_LISTINGS {
            return None;
        }
        let reference_price = percentile_10_interpolated(&window.listings);
        Some(PriceLearned {
            type_id: window.type_id,
            reference_price,
        })
    }
}

/// 10th percentile with linear interpolation between the two bracketing
/// order statistics, per §4.3 and the worked example in §8 scenario 4.
fn percentile_10_interpolated(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let rank = 0.10 * (n - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let frac = rank - lower as f64;
        sorted[lower] + frac * (sorted[upper] - sorted[lower])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_4_price_learning() {
        let mut parser = ExchangeParser::new(Some(1));
        let t0 = Utc::now();
        parser.observe(ExchangeFragment::Search { type_id: 42 }, t0);
        for price in [0.10, 0.12, 0.15, 0.20, 1.50] {
            parser.observe(
                ExchangeFragment::Listing {
                    unit_price: price,
                    page_id: 101,
                },
                t0,
            );
        }
        let learned = parser
            .observe(ExchangeFragment::End, t0 + Duration::seconds(1))
            .unwrap();
        assert_eq!(learned.type_id, 42);
        assert!((learned.reference_price - 0.108).abs() < 1e-9);
    }

    #[test]
    fn fewer_than_three_listings_emits_nothing() {
        let mut parser = ExchangeParser::new(None);
        let t0 = Utc::now();
        parser.observe(ExchangeFragment::Search { type_id: 42 }, t0);
        parser.observe(
            ExchangeFragment::Listing {
                unit_price: 0.5,
                page_id: 101,
            },
            t0,
        );
        parser.observe(
            ExchangeFragment::Listing {
                unit_price: 0.6,
                page_id: 101,
            },
            t0,
        );
        assert!(parser.observe(ExchangeFragment::End, t0).is_none());
    }

    #[test]
    fn base_currency_is_never_learned() {
        let mut parser = ExchangeParser::new(Some(42));
        let t0 = Utc::now();
        parser.observe(ExchangeFragment::Search { type_id: 42 }, t0);
        for price in [0.1, 0.2, 0.3] {
            parser.observe(
                ExchangeFragment::Listing {
                    unit_price: price,
                    page_id: 101,
                },
                t0,
            );
        }
        assert!(parser.observe(ExchangeFragment::End, t0).is_none());
    }

    #[test]
    fn new_search_closes_previous_window() {
        let mut parser = ExchangeParser::new(None);
        let t0 = Utc::now();
        parser.observe(ExchangeFragment::Search { type_id: 1 }, t0);
        for price in [1.0, 2.0, 3.0] {
            parser.observe(
                ExchangeFragment::Listing {
                    unit_price: price,
                    page_id: 101,
                },
                t0,
            );
        }
        let learned = parser
            .observe(ExchangeFragment::Search { type_id: 2 }, t0)
            .unwrap();
        assert_eq!(learned.type_id, 1);
    }

    #[test]
    fn timeout_closes_stale_window() {
        let mut parser = ExchangeParser::new(None);
        let t0 = Utc::now();
        parser.observe(ExchangeFragment::Search { type_id: 1 }, t0);
        for price in [1.0, 2.0, 3.0] {
            parser.observe(
                ExchangeFragment::Listing {
                    unit_price: price,
                    page_id: 101,
                },
                t0,
            );
        }
        assert!(parser.check_timeout(t0 + Duration::seconds(5)).is_none());
        let learned = parser.check_timeout(t0 + Duration::seconds(11)).unwrap();
        assert_eq!(learned.type_id, 1);
    }

    #[test]
    fn gear_page_listings_are_ignored() {
        let mut parser = ExchangeParser::new(None);
        let t0 = Utc::now();
        parser.observe(ExchangeFragment::Search { type_id: 1 }, t0);
        for price in [1.0, 2.0, 3.0] {
            parser.observe(
                ExchangeFragment::Listing {
                    unit_price: price,
                    page_id: crate::constants::GEAR_PAGE_ID,
                },
                t0,
            );
        }
        // All three listings were on the gear page, so the window closes
        // with none of them counted — below MIN_LISTINGS.
        assert!(parser.observe(ExchangeFragment::End, t0).is_none());
    }

    #[test]
    fn gear_page_listings_are_excluded_from_an_otherwise_valid_window() {
        let mut parser = ExchangeParser::new(None);
        let t0 = Utc::now();
        parser.observe(ExchangeFragment::Search { type_id: 1 }, t0);
        parser.observe(
            ExchangeFragment::Listing {
                unit_price: 999.0,
                page_id: crate::constants::GEAR_PAGE_ID,
            },
            t0,
        );
        for price in [0.10, 0.12, 0.15, 0.20, 1.50] {
            parser.observe(
                ExchangeFragment::Listing {
                    unit_price: price,
                    page_id: 101,
                },
                t0,
            );
        }
        let learned = parser.observe(ExchangeFragment::End, t0).unwrap();
        // Same reference price as scenario_4 — the gear-page 999.0 outlier
        // never entered the window.
        assert!((learned.reference_price - 0.108).abs() < 1e-9);
    }
}
