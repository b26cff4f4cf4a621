mod common;

use auditorium_core::{
    ConferenceListQuery, ConferenceServiceError, ConferenceStatus, Cursor, ErrorClass, OrderBy,
    PageError, PageQuery, SortDirection,
};
use auditorium_core::open_db_in_memory;
use common::{approved_conference, at, conference_service, draft, future_day, user, HOUR};

fn titles(items: &[auditorium_core::Conference]) -> Vec<String> {
    items.iter().map(|conference| conference.title.clone()).collect()
}

fn query_with_page(page: PageQuery) -> ConferenceListQuery {
    ConferenceListQuery {
        page,
        ..ConferenceListQuery::default()
    }
}

fn seed_five(conn: &rusqlite::Connection) {
    let host = user(conn, "Host");
    let day = future_day();
    for n in 1..=5 {
        approved_conference(
            conn,
            &host,
            &format!("talk {n}"),
            at(day, 8 + n, 0),
            at(day, 8 + n, 45),
            20,
        );
    }
}

#[test]
fn page_size_two_walks_five_conferences_forward() {
    let conn = open_db_in_memory().unwrap();
    seed_five(&conn);
    let service = conference_service(&conn);

    let first = service
        .list_conferences(&query_with_page(PageQuery {
            limit: Some(2),
            ..PageQuery::default()
        }))
        .unwrap();
    assert_eq!(titles(&first.items), vec!["talk 1", "talk 2"]);
    assert!(first.has_more);

    let second = service
        .list_conferences(&query_with_page(PageQuery {
            after: first.last_cursor.clone(),
            limit: Some(2),
            ..PageQuery::default()
        }))
        .unwrap();
    assert_eq!(titles(&second.items), vec!["talk 3", "talk 4"]);
    assert!(second.has_more);

    let third = service
        .list_conferences(&query_with_page(PageQuery {
            after: second.last_cursor.clone(),
            limit: Some(2),
            ..PageQuery::default()
        }))
        .unwrap();
    assert_eq!(titles(&third.items), vec!["talk 5"]);
    assert!(!third.has_more);

    // Walking back from the third page reproduces the second.
    let back = service
        .list_conferences(&query_with_page(PageQuery {
            before: third.first_cursor.clone(),
            limit: Some(2),
            ..PageQuery::default()
        }))
        .unwrap();
    assert_eq!(back.items, second.items);
    assert!(back.has_more);
}

#[test]
fn descending_and_created_at_orderings() {
    let conn = open_db_in_memory().unwrap();
    seed_five(&conn);
    let service = conference_service(&conn);

    let desc = service
        .list_conferences(&ConferenceListQuery {
            direction: SortDirection::Desc,
            page: PageQuery {
                limit: Some(3),
                ..PageQuery::default()
            },
            ..ConferenceListQuery::default()
        })
        .unwrap();
    assert_eq!(titles(&desc.items), vec!["talk 5", "talk 4", "talk 3"]);

    let next = service
        .list_conferences(&ConferenceListQuery {
            direction: SortDirection::Desc,
            page: PageQuery {
                after: desc.last_cursor.clone(),
                limit: Some(3),
                ..PageQuery::default()
            },
            ..ConferenceListQuery::default()
        })
        .unwrap();
    assert_eq!(titles(&next.items), vec!["talk 2", "talk 1"]);
    assert!(!next.has_more);

    let by_creation = service
        .list_conferences(&ConferenceListQuery {
            order_by: OrderBy::CreatedAt,
            ..ConferenceListQuery::default()
        })
        .unwrap();
    assert_eq!(by_creation.items.len(), 5);
    let keys: Vec<(i64, uuid::Uuid)> = by_creation
        .items
        .iter()
        .map(|conference| (conference.created_at, conference.id))
        .collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
}

#[test]
fn cursor_from_another_ordering_is_malformed() {
    let conn = open_db_in_memory().unwrap();
    seed_five(&conn);
    let service = conference_service(&conn);

    let first = service
        .list_conferences(&query_with_page(PageQuery {
            limit: Some(2),
            ..PageQuery::default()
        }))
        .unwrap();

    let err = service
        .list_conferences(&ConferenceListQuery {
            order_by: OrderBy::CreatedAt,
            page: PageQuery {
                after: first.last_cursor.clone(),
                ..PageQuery::default()
            },
            ..ConferenceListQuery::default()
        })
        .unwrap_err();
    assert!(matches!(
        err,
        ConferenceServiceError::Page(PageError::MalformedCursor(_))
    ));
    assert_eq!(err.error_class(), ErrorClass::Client);

    // An `after` token offered in the `before` slot is rejected too.
    let err = service
        .list_conferences(&query_with_page(PageQuery {
            before: first.last_cursor.clone(),
            ..PageQuery::default()
        }))
        .unwrap_err();
    assert!(matches!(
        err,
        ConferenceServiceError::Page(PageError::MalformedCursor(_))
    ));
}

#[test]
fn invalid_page_arguments_are_client_errors() {
    let conn = open_db_in_memory().unwrap();
    let service = conference_service(&conn);

    let zero = service
        .list_conferences(&query_with_page(PageQuery {
            limit: Some(0),
            ..PageQuery::default()
        }))
        .unwrap_err();
    assert!(matches!(
        zero,
        ConferenceServiceError::Page(PageError::InvalidPageSize)
    ));

    let both = service
        .list_conferences(&query_with_page(PageQuery {
            after: Some("a".to_string()),
            before: Some("b".to_string()),
            limit: None,
        }))
        .unwrap_err();
    assert!(matches!(
        both,
        ConferenceServiceError::Page(PageError::ConflictingCursorArguments)
    ));
    assert_eq!(both.error_class(), ErrorClass::Client);
}

#[test]
fn empty_listing_has_no_cursors_even_with_oversized_limit() {
    let conn = open_db_in_memory().unwrap();
    let service = conference_service(&conn);

    let empty = service
        .list_conferences(&query_with_page(PageQuery {
            limit: Some(500),
            ..PageQuery::default()
        }))
        .unwrap();
    assert!(empty.items.is_empty());
    assert!(!empty.has_more);
    assert!(empty.first_cursor.is_none());
    assert!(empty.last_cursor.is_none());
}

#[test]
fn cursor_of_deleted_conference_still_positions_the_page() {
    let conn = open_db_in_memory().unwrap();
    seed_five(&conn);
    let service = conference_service(&conn);

    let first = service
        .list_conferences(&query_with_page(PageQuery {
            limit: Some(2),
            ..PageQuery::default()
        }))
        .unwrap();
    service.delete_conference(first.items[1].id).unwrap();

    let next = service
        .list_conferences(&query_with_page(PageQuery {
            after: first.last_cursor.clone(),
            limit: Some(2),
            ..PageQuery::default()
        }))
        .unwrap();
    assert_eq!(titles(&next.items), vec!["talk 3", "talk 4"]);

    let cursor = Cursor::decode(first.last_cursor.as_deref().unwrap()).unwrap();
    assert_eq!(cursor.key.tie_break, first.items[1].id);
}

#[test]
fn filters_narrow_the_listing() {
    let conn = open_db_in_memory().unwrap();
    let host = user(&conn, "Host");
    let other = user(&conn, "Other");
    let day = future_day();
    let service = conference_service(&conn);

    approved_conference(&conn, &host, "Rust 100% Async", at(day, 9, 0), at(day, 10, 0), 10);
    approved_conference(&conn, &other, "Rust_Embedded", at(day, 11, 0), at(day, 12, 0), 10);
    approved_conference(&conn, &host, "Gardening", at(day, 13, 0), at(day, 14, 0), 10);
    let pending = service
        .create_conference(host.id, draft("Rust pending", at(day, 15, 0), at(day, 16, 0), 10))
        .unwrap();
    // Ended long ago.
    approved_conference(&conn, &host, "Rust history", 1_000 * HOUR, 1_001 * HOUR, 10);

    let rust = service
        .list_conferences(&ConferenceListQuery {
            title: Some("rust".to_string()),
            ..ConferenceListQuery::default()
        })
        .unwrap();
    assert_eq!(titles(&rust.items), vec!["Rust 100% Async", "Rust_Embedded"]);

    // Wildcards in the search text are literal.
    let percent = service
        .list_conferences(&ConferenceListQuery {
            title: Some("100%".to_string()),
            ..ConferenceListQuery::default()
        })
        .unwrap();
    assert_eq!(titles(&percent.items), vec!["Rust 100% Async"]);
    let underscore = service
        .list_conferences(&ConferenceListQuery {
            title: Some("t_e".to_string()),
            ..ConferenceListQuery::default()
        })
        .unwrap();
    assert_eq!(titles(&underscore.items), vec!["Rust_Embedded"]);

    let by_host = service
        .list_conferences(&ConferenceListQuery {
            host_id: Some(host.id),
            ..ConferenceListQuery::default()
        })
        .unwrap();
    assert_eq!(titles(&by_host.items), vec!["Rust 100% Async", "Gardening"]);

    let window = service
        .list_conferences(&ConferenceListQuery {
            starts_after: Some(at(day, 10, 0)),
            starts_before: Some(at(day, 13, 0)),
            ..ConferenceListQuery::default()
        })
        .unwrap();
    assert_eq!(titles(&window.items), vec!["Rust_Embedded"]);

    // `starts_after` is strict: a conference starting on the bound is left out.
    let on_bound = service
        .list_conferences(&ConferenceListQuery {
            starts_after: Some(at(day, 11, 0)),
            ..ConferenceListQuery::default()
        })
        .unwrap();
    assert_eq!(titles(&on_bound.items), vec!["Gardening"]);

    let pending_only = service
        .list_conferences(&ConferenceListQuery {
            status: Some(ConferenceStatus::Pending),
            ..ConferenceListQuery::default()
        })
        .unwrap();
    assert_eq!(pending_only.items.len(), 1);
    assert_eq!(pending_only.items[0].id, pending.id);

    let with_past = service
        .list_conferences(&ConferenceListQuery {
            title: Some("rust".to_string()),
            include_past: true,
            ..ConferenceListQuery::default()
        })
        .unwrap();
    assert_eq!(
        titles(&with_past.items),
        vec!["Rust history", "Rust 100% Async", "Rust_Embedded"]
    );
}

#[test]
fn listing_reports_host_name_and_registration_count() {
    let conn = open_db_in_memory().unwrap();
    let host = user(&conn, "Ada");
    let day = future_day();
    let created = approved_conference(&conn, &host, "Compilers", at(day, 9, 0), at(day, 10, 0), 3);

    let page = conference_service(&conn)
        .list_conferences(&ConferenceListQuery::default())
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].id, created.id);
    assert_eq!(page.items[0].host_name, "Ada");
    assert_eq!(page.items[0].registration_count, 0);
}

#[test]
fn hostile_filter_text_is_bound_not_executed() {
    let conn = open_db_in_memory().unwrap();
    seed_five(&conn);
    let service = conference_service(&conn);

    let hostile = service
        .list_conferences(&ConferenceListQuery {
            title: Some("x' OR 1=1); DROP TABLE conferences; --".to_string()),
            ..ConferenceListQuery::default()
        })
        .unwrap();
    assert!(hostile.items.is_empty());

    let all = service
        .list_conferences(&ConferenceListQuery::default())
        .unwrap();
    assert_eq!(all.items.len(), 5);
}
