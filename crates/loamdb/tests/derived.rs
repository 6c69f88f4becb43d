//! Derived-signature behavior end to end: predicates, limits, named-query
//! precedence, projections, paging, bulk updates.

mod common;

use common::{Player, test_db};
use loamdb::{core::db::query::QueryDescriptor, db::Repository};
use loamdb_core::db::{
    FieldOp,
    query::{OrderDirection, OrderSpec, Operand, PageRequest, Predicate},
};
use loamdb_core::value::Value;

#[test]
fn find_by_username_and_age_greater_than() {
    let db = test_db();
    let mut session = db.session();
    let repo = Repository::<Player>::new();

    repo.save(&mut session, Player::new("memberA", 10)).unwrap();
    repo.save(&mut session, Player::new("memberB", 20)).unwrap();

    let a = repo
        .invoke(
            &mut session,
            "findByUsernameAndAgeGreaterThan",
            &[Value::Text("memberA".into()), Value::Int(8)],
        )
        .unwrap();
    assert_eq!(a.len(), 1);
    assert_eq!(a[0].with(|p| p.username.clone()), "memberA");

    // conjunction: matching name but age below the bound is excluded
    let none = repo
        .invoke(
            &mut session,
            "findByUsernameAndAgeGreaterThan",
            &[Value::Text("memberA".into()), Value::Int(10)],
        )
        .unwrap();
    assert!(none.is_empty());
}

#[test]
fn derivation_round_trip_is_pk_ordered() {
    let db = test_db();
    let mut session = db.session();
    let repo = Repository::<Player>::new();

    // mixed fixture, deliberately inserted out of name order
    for (name, age) in [("c", 30), ("a", 30), ("b", 30), ("d", 5)] {
        repo.save(&mut session, Player::new(name, age)).unwrap();
    }

    let rows = repo
        .invoke(&mut session, "findByAge", &[Value::Int(30)])
        .unwrap();

    let ids: Vec<u64> = rows.iter().map(|p| p.with(|x| x.id).unwrap()).collect();
    let mut sorted = ids.clone();
    sorted.sort_unstable();
    assert_eq!(ids, sorted, "no explicit order means stable pk order");
    assert_eq!(rows.len(), 3);
}

#[test]
fn top_limit_with_noise_subject() {
    let db = test_db();
    let mut session = db.session();
    let repo = Repository::<Player>::new();

    for i in 0..5 {
        repo.save(&mut session, Player::new(&format!("m{i}"), i)).unwrap();
    }

    let rows = repo.invoke(&mut session, "findTop3HelloBy", &[]).unwrap();
    assert_eq!(rows.len(), 3);
}

#[test]
fn find_by_names_in_list() {
    let db = test_db();
    let mut session = db.session();
    let repo = Repository::<Player>::new();

    repo.save(&mut session, Player::new("AAA", 10)).unwrap();
    repo.save(&mut session, Player::new("BBB", 20)).unwrap();
    repo.save(&mut session, Player::new("CCC", 30)).unwrap();

    let rows = repo
        .invoke(
            &mut session,
            "findByUsernameIn",
            &[Value::List(vec![
                Value::Text("AAA".into()),
                Value::Text("BBB".into()),
            ])],
        )
        .unwrap();
    assert_eq!(rows.len(), 2);
}

#[test]
fn named_query_takes_precedence_over_derivation() {
    let db = test_db();

    // registered body ignores the username parameter shape derivation
    // would produce and filters on age instead
    db.register_named_query(
        "player",
        QueryDescriptor::custom(
            "findSeniorByUsername",
            Predicate::gte("age", Operand::param(0)),
            OrderSpec::none(),
            None,
        ),
        None,
    );

    let mut session = db.session();
    let repo = Repository::<Player>::new();
    repo.save(&mut session, Player::new("AAA", 10)).unwrap();
    repo.save(&mut session, Player::new("BBB", 64)).unwrap();

    let rows = repo
        .invoke(&mut session, "findSeniorByUsername", &[Value::Int(60)])
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].with(|p| p.username.clone()), "BBB");
}

#[test]
fn custom_query_with_two_parameters() {
    let db = test_db();

    db.register_named_query(
        "player",
        QueryDescriptor::custom(
            "findUser",
            Predicate::eq("username", Operand::param(0))
                & Predicate::eq("age", Operand::param(1)),
            OrderSpec::none(),
            None,
        ),
        None,
    );

    let mut session = db.session();
    let repo = Repository::<Player>::new();
    repo.save(&mut session, Player::new("AAA", 10)).unwrap();
    repo.save(&mut session, Player::new("BBB", 20)).unwrap();

    let rows = repo
        .invoke(
            &mut session,
            "findUser",
            &[Value::Text("AAA".into()), Value::Int(10)],
        )
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].with(|p| p.age), 10);
}

#[test]
fn projection_returns_column_values() {
    let db = test_db();

    db.register_named_query(
        "player",
        QueryDescriptor::custom(
            "findUsernameList",
            Predicate::True,
            OrderSpec::none(),
            None,
        ),
        Some("username".to_string()),
    );

    let mut session = db.session();
    let repo = Repository::<Player>::new();
    repo.save(&mut session, Player::new("AAA", 10)).unwrap();
    repo.save(&mut session, Player::new("BBB", 20)).unwrap();

    let names = repo.invoke_values(&mut session, "findUsernameList", &[]).unwrap();
    assert_eq!(
        names,
        vec![Value::Text("AAA".into()), Value::Text("BBB".into())]
    );
}

#[test]
fn count_signature_counts_matches() {
    let db = test_db();
    let mut session = db.session();
    let repo = Repository::<Player>::new();

    repo.save(&mut session, Player::new("a", 10)).unwrap();
    repo.save(&mut session, Player::new("b", 20)).unwrap();
    repo.save(&mut session, Player::new("c", 30)).unwrap();

    let n = repo
        .invoke_count(&mut session, "countByAgeGreaterThan", &[Value::Int(15)])
        .unwrap();
    assert_eq!(n, 2);
}

#[test]
fn delete_signature_removes_and_detaches() {
    let db = test_db();
    let mut session = db.session();
    let repo = Repository::<Player>::new();

    let doomed = repo.save(&mut session, Player::new("doomed", 10)).unwrap();
    repo.save(&mut session, Player::new("spared", 20)).unwrap();

    let removed = repo
        .invoke_delete(&mut session, "deleteByUsername", &[Value::Text("doomed".into())])
        .unwrap();
    assert_eq!(removed, 1);
    assert!(!session.is_managed(&doomed));
    assert_eq!(repo.count(&mut session).unwrap(), 1);
}

#[test]
fn paging_returns_content_and_separate_total() {
    let db = test_db();
    let mut session = db.session();
    let repo = Repository::<Player>::new();

    for i in 1..=5 {
        repo.save(&mut session, Player::new(&format!("member{i}"), 10))
            .unwrap();
    }

    let request = PageRequest::sorted(0, 3, OrderSpec::by("username", OrderDirection::Desc));
    let page = repo
        .page(&mut session, "findByAge", &[Value::Int(10)], &request)
        .unwrap();

    assert_eq!(page.items.len(), 3);
    assert_eq!(page.total_elements, 5);
    assert_eq!(page.page_index, 0);
    assert_eq!(page.total_pages(), 2);
    assert!(page.is_first());
    assert!(page.has_next());

    let names: Vec<String> = page
        .items
        .iter()
        .map(|p| p.with(|x| x.username.clone()))
        .collect();
    assert_eq!(names, vec!["member5", "member4", "member3"]);

    // page envelopes map without disturbing the paging arithmetic
    let mapped = page.map(|p| p.with(|x| x.username.clone()));
    assert_eq!(mapped.total_elements, 5);
    assert_eq!(mapped.items[0], "member5");
}

#[test]
fn page_where_uses_an_explicit_predicate() {
    let db = test_db();
    let mut session = db.session();
    let repo = Repository::<Player>::new();

    for i in 1..=4 {
        repo.save(&mut session, Player::new(&format!("m{i}"), i)).unwrap();
    }

    let request = PageRequest::of(1, 2);
    let page = repo
        .page_where(&mut session, Predicate::gt("age", Value::Int(0)), &request)
        .unwrap();

    assert_eq!(page.items.len(), 2);
    assert_eq!(page.total_elements, 4);
    assert!(!page.is_first());
    assert!(page.is_last());
}

#[test]
fn bulk_age_plus_affects_exactly_the_matching_rows() {
    let db = test_db();
    let mut session = db.session();
    let repo = Repository::<Player>::new();

    for (name, age) in [
        ("member1", 10),
        ("member2", 19),
        ("member3", 20),
        ("member4", 21),
        ("member5", 40),
    ] {
        repo.save(&mut session, Player::new(name, age)).unwrap();
    }

    let affected = repo
        .bulk_update(
            &mut session,
            Predicate::gte("age", Value::Int(20)),
            vec![FieldOp::Add("age".to_string(), 1)],
        )
        .unwrap();
    assert_eq!(affected, 3);

    // after the mandated invalidation, reads see storage, not snapshots
    let member5 = repo
        .invoke_one(&mut session, "findByUsername", &[Value::Text("member5".into())])
        .unwrap()
        .unwrap();
    assert_eq!(member5.with(|p| p.age), 41);

    let member2 = repo
        .invoke_one(&mut session, "findByUsername", &[Value::Text("member2".into())])
        .unwrap()
        .unwrap();
    assert_eq!(member2.with(|p| p.age), 19);
}
