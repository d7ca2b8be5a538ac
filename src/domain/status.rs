//! Overall order status derived from sub-order statuses.

use std::collections::HashSet;

use crate::domain::aggregates::{OrderStatus, SubOrderStatus};

/// Reduces the set of sub-order statuses to one customer-facing status.
///
/// Rules are checked in order, first match wins:
/// 1. all identical: that status
/// 2. any cancelled: `cancelled`
/// 3. all delivered/returned/refunded: `returned`
/// 4. any shipped: `partially_shipped`
/// 5. any confirmed: `partially_confirmed`
/// 6. otherwise `processing`
///
/// Only set membership matters, so the result does not depend on order.
pub fn reduce_overall_status<I>(statuses: I) -> OrderStatus
where
    I: IntoIterator<Item = SubOrderStatus>,
{
    let set: HashSet<SubOrderStatus> = statuses.into_iter().collect();

    if set.len() == 1 {
        if let Some(only) = set.iter().next() {
            return OrderStatus::from(*only);
        }
    }
    if set.is_empty() {
        return OrderStatus::Pending;
    }
    if set.contains(&SubOrderStatus::Cancelled) {
        return OrderStatus::Cancelled;
    }
    let post_delivery = set.iter().all(|s| {
        matches!(
            s,
            SubOrderStatus::Delivered | SubOrderStatus::Returned | SubOrderStatus::Refunded
        )
    });
    if post_delivery {
        // A pure delivered set was caught by rule 1.
        return OrderStatus::Returned;
    }
    if set.contains(&SubOrderStatus::Shipped) {
        return OrderStatus::PartiallyShipped;
    }
    if set.contains(&SubOrderStatus::Confirmed) {
        return OrderStatus::PartiallyConfirmed;
    }
    OrderStatus::Processing
}

#[cfg(test)]
mod tests {
    use super::*;
    use SubOrderStatus::*;

    #[test]
    fn test_identical_statuses() {
        assert_eq!(reduce_overall_status([Delivered, Delivered]), OrderStatus::Delivered);
        assert_eq!(reduce_overall_status([Pending]), OrderStatus::Pending);
        assert_eq!(reduce_overall_status([ReadyToShip, ReadyToShip]), OrderStatus::ReadyToShip);
        assert_eq!(reduce_overall_status([Refunded, Refunded]), OrderStatus::Refunded);
    }

    #[test]
    fn test_cancelled_beats_shipped() {
        assert_eq!(reduce_overall_status([Cancelled, Shipped]), OrderStatus::Cancelled);
        assert_eq!(reduce_overall_status([Shipped, Cancelled]), OrderStatus::Cancelled);
    }

    #[test]
    fn test_delivered_and_returned() {
        assert_eq!(reduce_overall_status([Delivered, Returned]), OrderStatus::Returned);
        assert_eq!(reduce_overall_status([Delivered, Refunded]), OrderStatus::Returned);
    }

    #[test]
    fn test_partial_states() {
        assert_eq!(reduce_overall_status([Shipped, Processing]), OrderStatus::PartiallyShipped);
        assert_eq!(reduce_overall_status([Delivered, Shipped]), OrderStatus::PartiallyShipped);
        assert_eq!(reduce_overall_status([Confirmed, Pending]), OrderStatus::PartiallyConfirmed);
        assert_eq!(reduce_overall_status([Pending, Processing]), OrderStatus::Processing);
        assert_eq!(reduce_overall_status([ReadyToShip, Delivered]), OrderStatus::Processing);
    }

    #[test]
    fn test_order_independent_and_idempotent() {
        let all = [Pending, Confirmed, Processing, ReadyToShip, Shipped, Delivered, Cancelled, Returned, Refunded];
        for a in all {
            for b in all {
                for c in all {
                    let forward = reduce_overall_status([a, b, c]);
                    assert_eq!(forward, reduce_overall_status([c, b, a]));
                    assert_eq!(forward, reduce_overall_status([b, c, a]));
                    assert_eq!(forward, reduce_overall_status([a, b, c]));
                }
            }
        }
    }
}
