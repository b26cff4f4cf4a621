//! Property tests for interval overlap and keyset traversal.

use auditorium_core::model::interval::Interval;
use auditorium_core::pagination::{Keyed, OrderingKey};
use auditorium_core::{page, OrderBy, PageRequest, PageResult, SortDirection};
use proptest::prelude::*;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Row {
    primary: i64,
    id: Uuid,
}

impl Keyed for Row {
    fn supports(order_by: OrderBy) -> bool {
        order_by == OrderBy::StartsAt
    }

    fn ordering_key(&self, _order_by: OrderBy) -> OrderingKey {
        OrderingKey::new(self.primary, self.id)
    }
}

// Few distinct primaries so tie-breaks are exercised constantly.
fn arb_rows() -> impl Strategy<Value = Vec<Row>> {
    proptest::collection::vec((0i64..6, any::<u128>()), 0..40).prop_map(|pairs| {
        let mut rows: Vec<Row> = pairs
            .into_iter()
            .map(|(primary, raw)| Row {
                primary,
                id: Uuid::from_u128(raw),
            })
            .collect();
        rows.sort_by_key(|row| row.id);
        rows.dedup_by_key(|row| row.id);
        rows
    })
}

fn arb_direction() -> impl Strategy<Value = SortDirection> {
    prop_oneof![Just(SortDirection::Asc), Just(SortDirection::Desc)]
}

fn arb_interval() -> impl Strategy<Value = Interval> {
    (-1_000i64..1_000, 1i64..500)
        .prop_map(|(start, len)| Interval::new(start, start + len).unwrap())
}

fn display_order(rows: &[Row], direction: SortDirection) -> Vec<Row> {
    let mut sorted = rows.to_vec();
    sorted.sort_by_key(|row| (row.primary, row.id));
    if direction == SortDirection::Desc {
        sorted.reverse();
    }
    sorted
}

fn fetch(rows: &Vec<Row>, request: &PageRequest) -> PageResult<Row> {
    page::<Row, _>(rows, &(), request).unwrap()
}

proptest! {
    #[test]
    fn overlap_is_symmetric(a in arb_interval(), b in arb_interval()) {
        prop_assert_eq!(a.overlaps(&b), b.overlaps(&a));
    }

    #[test]
    fn touching_intervals_never_overlap(
        start in -1_000i64..1_000,
        first in 1i64..100,
        second in 1i64..100,
    ) {
        let a = Interval::new(start, start + first).unwrap();
        let b = Interval::new(start + first, start + first + second).unwrap();
        prop_assert!(!a.overlaps(&b));
        prop_assert!(!b.overlaps(&a));
    }

    #[test]
    fn shared_sub_range_always_overlaps(a in arb_interval(), offset in 0i64..500) {
        let inside = a.start() + offset % (a.end() - a.start());
        let b = Interval::new(inside, inside + 1).unwrap();
        prop_assert!(a.overlaps(&b));
    }

    #[test]
    fn forward_walk_visits_every_row_once_in_order(
        rows in arb_rows(),
        limit in 1u32..7,
        direction in arb_direction(),
    ) {
        let expected = display_order(&rows, direction);
        let base = PageRequest::first(OrderBy::StartsAt, direction, limit);

        let mut seen = Vec::new();
        let mut request = base.clone();
        loop {
            let result = fetch(&rows, &request);
            let remaining = expected.len() - seen.len();
            prop_assert_eq!(result.has_more, remaining > limit as usize);
            seen.extend(result.items.iter().cloned());
            match (result.has_more, result.last_cursor) {
                (true, Some(cursor)) => request = base.clone().after(cursor),
                _ => break,
            }
        }
        prop_assert_eq!(seen, expected);
    }

    #[test]
    fn backward_from_next_page_reproduces_previous_page(
        rows in arb_rows(),
        limit in 1u32..7,
        direction in arb_direction(),
    ) {
        let base = PageRequest::first(OrderBy::StartsAt, direction, limit);
        let first = fetch(&rows, &base);
        prop_assume!(first.has_more);

        let second = fetch(&rows, &base.clone().after(first.last_cursor.clone().unwrap()));
        prop_assert!(!second.items.is_empty());

        let back = fetch(&rows, &base.clone().before(second.first_cursor.clone().unwrap()));
        prop_assert_eq!(back.items, first.items);
        prop_assert!(!back.has_more);
    }
}
