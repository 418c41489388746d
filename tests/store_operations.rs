use mefm::entity::Key;
use mefm::schema::{ALL_KINDS, Practitioner, QuestionChoice, User, UserStatus};
use mefm::{Database, Direction, Filter, MefmError, PersistenceMode, Query};

fn setup() -> Database {
    Database::new(PersistenceMode::InMemory, ALL_KINDS).expect("db")
}

fn practitioner(first: &str, last: &str, city: &str, created: i64) -> Practitioner {
    Practitioner {
        first_name: first.into(),
        last_name: last.into(),
        city: Some(city.into()),
        postal_code: "V8W 1A1".into(),
        creation_date: Some(created),
        ..Practitioner::default()
    }
}

#[test]
fn put_then_get_round_trips_every_field() {
    let db = setup();
    let mut p = practitioner("Ada", "Lovelace", "Victoria", 1_700_000_000_000);
    p.specialty = Some("Family medicine".into());
    p.created_by = Some(Key::new(4));
    let id = db.put(&mut p).unwrap();
    assert_eq!(p.id, Some(id));
    let stored: Practitioner = db.get(id).unwrap();
    assert_eq!(stored, p);
}

#[test]
fn put_with_identifier_overwrites_instead_of_duplicating() {
    let db = setup();
    let mut p = practitioner("Ada", "Lovelace", "Victoria", 1);
    let id = db.put(&mut p).unwrap();
    p.city = Some("Nanaimo".into());
    assert_eq!(db.put(&mut p).unwrap(), id);
    let all: Vec<Practitioner> = db.all().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].city.as_deref(), Some("Nanaimo"));
}

#[test]
fn missing_entity_is_not_found() {
    let db = setup();
    let err = db.get::<Practitioner>(42).unwrap_err();
    assert!(matches!(err, MefmError::NotFound { kind: "Practitioner", id: 42 }));
    assert!(err.is_not_found());
}

#[test]
fn delete_is_idempotent() {
    let db = setup();
    let mut p = practitioner("Ada", "Lovelace", "Victoria", 1);
    let id = db.put(&mut p).unwrap();
    db.delete::<Practitioner>(id).unwrap();
    db.delete::<Practitioner>(id).unwrap();
    db.delete::<Practitioner>(999).unwrap();
    assert!(db.get::<Practitioner>(id).unwrap_err().is_not_found());
}

#[test]
fn identifiers_are_per_kind_and_never_reused() {
    let db = setup();
    let mut a = practitioner("A", "A", "X", 1);
    let mut b = practitioner("B", "B", "X", 1);
    let first = db.put(&mut a).unwrap();
    db.delete::<Practitioner>(first).unwrap();
    let second = db.put(&mut b).unwrap();
    assert!(second > first);

    // another kind has its own sequence
    let mut choice = QuestionChoice {
        id: None,
        text: "Yes".into(),
        sort_order: 0,
    };
    assert_eq!(db.put(&mut choice).unwrap(), first);
}

#[test]
fn explicit_identifier_moves_the_sequence_forward() {
    let db = setup();
    let mut p = practitioner("A", "A", "X", 1);
    p.id = Some(100);
    db.put(&mut p).unwrap();
    let mut q = practitioner("B", "B", "X", 1);
    assert_eq!(db.put(&mut q).unwrap(), 101);
}

#[test]
fn unregistered_kind_is_a_configuration_error() {
    let db = Database::new(PersistenceMode::InMemory, &["Comment"]).unwrap();
    assert!(db.is_registered("Comment"));
    assert!(!db.is_registered("Practitioner"));
    let mut p = practitioner("A", "A", "X", 1);
    assert!(matches!(db.put(&mut p), Err(MefmError::Config(_))));
    assert!(matches!(db.get::<Practitioner>(1), Err(MefmError::Config(_))));
    assert!(matches!(db.all::<Practitioner>(), Err(MefmError::Config(_))));
    assert!(matches!(db.delete::<Practitioner>(1), Err(MefmError::Config(_))));
}

#[test]
fn empty_kind_name_is_rejected() {
    assert!(matches!(
        Database::new(PersistenceMode::InMemory, &["Comment", " "]),
        Err(MefmError::Config(_))
    ));
}

#[test]
fn filters_combine_conjunctively() {
    let db = setup();
    let mut ps = vec![
        practitioner("Ada", "Lovelace", "Victoria", 10),
        practitioner("Alan", "Turing", "Victoria", 20),
        practitioner("Grace", "Hopper", "Vancouver", 30),
    ];
    db.put_batch(&mut ps).unwrap();

    let in_victoria: Vec<Practitioner> = db
        .query_by_filters(&[Filter::parse("city", "Victoria").unwrap()])
        .unwrap();
    assert_eq!(in_victoria.len(), 2);

    let later: Vec<Practitioner> = db
        .query_by_filters(&[
            Filter::parse("city", "Victoria").unwrap(),
            Filter::parse("creationDate >", 15).unwrap(),
        ])
        .unwrap();
    assert_eq!(later.len(), 1);
    assert_eq!(later[0].last_name, "Turing");

    let not_victoria: Vec<Practitioner> = db
        .query_by_filters(&[Filter::parse("city !=", "Victoria").unwrap()])
        .unwrap();
    assert_eq!(not_victoria.len(), 1);

    let none: Vec<Practitioner> = db
        .query_by_filters(&[Filter::parse("city", "Calgary").unwrap()])
        .unwrap();
    assert!(none.is_empty());
}

#[test]
fn identifier_filter_uses_the_identity_column() {
    let db = setup();
    let mut ps = vec![
        practitioner("A", "A", "X", 1),
        practitioner("B", "B", "X", 1),
        practitioner("C", "C", "X", 1),
    ];
    let ids = db.put_batch(&mut ps).unwrap();
    let tail: Vec<Practitioner> = db
        .query_by_filters(&[Filter::parse("id >=", ids[1]).unwrap()])
        .unwrap();
    assert_eq!(tail.len(), 2);
}

#[test]
fn ordering_and_limit() {
    let db = setup();
    let mut ps = vec![
        practitioner("B", "Second", "X", 20),
        practitioner("C", "Third", "X", 30),
        practitioner("A", "First", "X", 10),
    ];
    db.put_batch(&mut ps).unwrap();

    let newest: Vec<Practitioner> = db
        .query(
            &Query::new()
                .order_by("creationDate", Direction::Descending)
                .limit(2),
        )
        .unwrap();
    let names: Vec<&str> = newest.iter().map(|p| p.last_name.as_str()).collect();
    assert_eq!(names, ["Third", "Second"]);

    let by_name: Vec<Practitioner> = db
        .query(
            &Query::from_filters([Filter::parse("creationDate <=", 20).unwrap()])
                .order_by("lastName", Direction::Ascending),
        )
        .unwrap();
    let names: Vec<&str> = by_name.iter().map(|p| p.last_name.as_str()).collect();
    assert_eq!(names, ["First", "Second"]);
}

#[test]
fn enum_and_boolean_like_attributes_filter_by_their_wire_form() {
    let db = setup();
    let mut users = vec![
        User {
            id: None,
            username: "ann".into(),
            password: Some("pw".into()),
            email: "ann@example.org".into(),
            role_id: Some(1),
            created: None,
            status: UserStatus::Enabled,
        },
        User {
            id: None,
            username: "bob".into(),
            password: None,
            email: "bob@example.org".into(),
            role_id: None,
            created: None,
            status: UserStatus::Suspended,
        },
    ];
    db.put_batch(&mut users).unwrap();
    let suspended: Vec<User> = db
        .query_by_filters(&[Filter::parse("status", "SUSPENDED").unwrap()])
        .unwrap();
    assert_eq!(suspended.len(), 1);
    assert_eq!(suspended[0].username, "bob");

    let without_role: Vec<User> = db
        .query_by_filters(&[Filter::parse("roleId", serde_json::Value::Null).unwrap()])
        .unwrap();
    assert_eq!(without_role.len(), 1);
    // stored passwords survive a round trip
    let ann: User = db.get(users[0].id.unwrap()).unwrap();
    assert_eq!(ann.password.as_deref(), Some("pw"));
}

#[test]
fn malformed_filters_never_reach_the_store() {
    assert!(matches!(Filter::parse("city ~", "x"), Err(MefmError::Parse { .. })));
    assert!(matches!(
        Filter::parse("city <", serde_json::Value::Null),
        Err(MefmError::Parse { .. })
    ));
    assert!(matches!(
        Filter::parse("city", serde_json::json!(["a", "b"])),
        Err(MefmError::Parse { .. })
    ));
}

#[test]
fn unrepresentable_identifier_is_rejected_without_harming_later_puts() {
    let db = setup();
    let mut first = practitioner("A", "A", "X", 1);
    let first_id = db.put(&mut first).unwrap();

    let mut too_large = practitioner("B", "B", "X", 1);
    too_large.id = Some(1 << 63);
    assert!(matches!(db.put(&mut too_large), Err(MefmError::Parse { .. })));
    too_large.id = Some(u64::MAX);
    assert!(matches!(db.put(&mut too_large), Err(MefmError::Parse { .. })));

    // generation carries on from the last valid identifier, for every kind
    let mut next = practitioner("C", "C", "X", 1);
    assert_eq!(db.put(&mut next).unwrap(), first_id + 1);
    let mut choice = QuestionChoice {
        id: None,
        text: "No".into(),
        sort_order: 0,
    };
    assert_eq!(db.put(&mut choice).unwrap(), 1);
    assert_eq!(db.all::<Practitioner>().unwrap().len(), 2);
}

#[test]
fn exhausted_identifiers_fail_the_put_without_poisoning_the_store() {
    let db = setup();
    let mut last = practitioner("A", "A", "X", 1);
    last.id = Some(i64::MAX as u64);
    db.put(&mut last).unwrap();
    let mut fresh = practitioner("B", "B", "X", 1);
    assert!(matches!(db.put(&mut fresh), Err(MefmError::StoreUnavailable(_))));
    // the lock is intact, other kinds keep working
    let mut choice = QuestionChoice {
        id: None,
        text: "Yes".into(),
        sort_order: 0,
    };
    assert_eq!(db.put(&mut choice).unwrap(), 1);
    assert_eq!(db.get::<Practitioner>(i64::MAX as u64).unwrap().first_name, "A");
}

#[test]
fn repeated_property_narrows_to_a_range() {
    let db = setup();
    let mut choices: Vec<QuestionChoice> = [1, 5, 9]
        .into_iter()
        .map(|sort_order| QuestionChoice {
            id: None,
            text: format!("choice {sort_order}"),
            sort_order,
        })
        .collect();
    db.put_batch(&mut choices).unwrap();
    let middle: Vec<QuestionChoice> = db
        .query_by_filters(&[
            Filter::parse("sortOrder >", 2).unwrap(),
            Filter::parse("sortOrder <", 8).unwrap(),
        ])
        .unwrap();
    assert_eq!(middle.len(), 1);
    assert_eq!(middle[0].sort_order, 5);
}
