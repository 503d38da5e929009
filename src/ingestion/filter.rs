use rust_decimal::Decimal;

use crate::models::{parse_decimal, EventFilter, TradeEvent};

/// Save-filter predicate. Checks run cheapest-first and stop at the first
/// failure: notional, event type, side, price band, market name.
///
/// `default_min_notional` applies when the filter's own `min_size` is not
/// positive. Query-only fields (`fresh_wallets_only`, risk and bet-count
/// bounds) are ignored.
pub fn should_admit(event: &TradeEvent, filter: &EventFilter, default_min_notional: Decimal) -> bool {
    let min_notional = if filter.min_size > Decimal::ZERO {
        filter.min_size
    } else {
        default_min_notional
    };
    if event.notional() < min_notional {
        return false;
    }

    if !filter.event_types.is_empty() && !filter.event_types.contains(&event.event_type) {
        return false;
    }

    if let Some(side) = filter.side {
        if event.side != Some(side) {
            return false;
        }
    }

    if !event.price.is_empty() {
        let price = parse_decimal(&event.price);
        if filter.min_price > Decimal::ZERO && price < filter.min_price {
            return false;
        }
        if filter.max_price > Decimal::ZERO && price > filter.max_price {
            return false;
        }
    }

    if !filter.market_name.is_empty() {
        let needle = filter.market_name.to_lowercase();
        if !event.market_name.to_lowercase().contains(&needle)
            && !event.event_title.to_lowercase().contains(&needle)
        {
            return false;
        }
    }

    true
}
