//! Auditing stamps, lazy relations, execution hints and locks.

mod common;

use common::{Guild, Player, test_db};
use loamdb::db::Repository;
use loamdb_core::db::{ManualClock, MemoryStore, QueryHints};
use loamdb_core::registry::SchemaRegistry;
use loamdb_core::value::Value;

#[test]
fn audit_fields_populate_on_insert_and_change_on_flush() {
    let db = test_db();
    let mut session = db.session().with_actor("admin");
    let repo = Repository::<Player>::new();

    let member = repo.save(&mut session, Player::new("member1", 10)).unwrap();
    let created_at = member.with(|p| p.created_at).unwrap();
    assert_eq!(member.with(|p| p.updated_at), Some(created_at));
    assert_eq!(member.with(|p| p.created_by.clone()).as_deref(), Some("admin"));
    assert_eq!(member.with(|p| p.updated_by.clone()).as_deref(), Some("admin"));

    member.update(|p| p.username = "member2".to_string());
    session.flush().unwrap();
    session.clear();

    let id = member.with(|p| p.id).unwrap();
    let found = repo.find_by_id(&mut session, Value::Uint(id)).unwrap().unwrap();
    assert_eq!(found.with(|p| p.username.clone()), "member2");
    assert_eq!(found.with(|p| p.created_at), Some(created_at));
    assert_eq!(found.with(|p| p.created_by.clone()).as_deref(), Some("admin"));
}

#[test]
fn updated_at_advances_with_the_clock() {
    let mut registry = SchemaRegistry::new();
    registry.register(&common::PLAYER_MODEL).unwrap();
    registry.register(&common::GUILD_MODEL).unwrap();

    let clock = ManualClock::starting_at(1_000_000);
    let db = loamdb_core::db::Db::new(registry, MemoryStore::new())
        .unwrap()
        .with_clock(clock.clone());

    let mut session = db.session().with_actor("admin");
    let repo = Repository::<Player>::new();

    let member = repo.save(&mut session, Player::new("member1", 10)).unwrap();
    let created_at = member.with(|p| p.created_at).unwrap();

    clock.advance_secs(100);
    member.update(|p| p.age = 11);
    session.flush().unwrap();

    let updated_at = member.with(|p| p.updated_at).unwrap();
    assert_eq!(member.with(|p| p.created_at), Some(created_at));
    assert!(updated_at > created_at);
}

#[test]
fn missing_actor_leaves_audit_actors_null() {
    let db = test_db();
    let mut session = db.session();
    let repo = Repository::<Player>::new();

    let member = repo.save(&mut session, Player::new("member1", 10)).unwrap();
    assert_eq!(member.with(|p| p.created_by.clone()), None);
    assert!(member.with(|p| p.created_at).is_some());
}

#[test]
fn lazy_relation_loads_through_the_session() {
    let db = test_db();
    let mut session = db.session();
    let players = Repository::<Player>::new();
    let guilds = Repository::<Guild>::new();

    let guild_a = guilds.save(&mut session, Guild::named("teamA")).unwrap();
    let guild_b = guilds.save(&mut session, Guild::named("teamB")).unwrap();
    let a_id = guild_a.with(|g| g.id).unwrap();
    let b_id = guild_b.with(|g| g.id).unwrap();

    players
        .save(&mut session, Player::in_guild("member1", 10, a_id))
        .unwrap();
    players
        .save(&mut session, Player::in_guild("member2", 10, b_id))
        .unwrap();

    session.clear();

    let members = players.find_all(&mut session).unwrap();
    assert_eq!(members.len(), 2);

    let mut names = Vec::new();
    for member in &members {
        let guild = players
            .load_relation::<MemoryStore, Guild>(&mut session, member, "guild")
            .unwrap()
            .unwrap();
        names.push(guild.with(|g| g.name.clone()));
    }
    assert_eq!(names, vec!["teamA", "teamB"]);

    // the second resolution of the same guild reuses the managed instance
    let first = players
        .load_relation::<MemoryStore, Guild>(&mut session, &members[0], "guild")
        .unwrap()
        .unwrap();
    let again = players
        .load_relation::<MemoryStore, Guild>(&mut session, &members[0], "guild")
        .unwrap()
        .unwrap();
    assert!(first.ptr_eq(&again));
}

#[test]
fn detached_handles_fail_relation_loads() {
    let db = test_db();
    let mut session = db.session();
    let players = Repository::<Player>::new();
    let guilds = Repository::<Guild>::new();

    let guild = guilds.save(&mut session, Guild::named("teamA")).unwrap();
    let member = players
        .save(
            &mut session,
            Player::in_guild("member1", 10, guild.with(|g| g.id).unwrap()),
        )
        .unwrap();

    session.clear();

    let err = players
        .load_relation::<MemoryStore, Guild>(&mut session, &member, "guild")
        .unwrap_err();
    assert!(err.is_detached());
}

#[test]
fn read_only_hint_suppresses_dirty_tracking() {
    let db = test_db();
    let mut session = db.session();
    let repo = Repository::<Player>::new();

    repo.save(&mut session, Player::new("member1", 10)).unwrap();
    session.clear();

    let read_only = repo
        .invoke_with(
            &mut session,
            "findByUsername",
            &[Value::Text("member1".into())],
            QueryHints::read_only(),
        )
        .unwrap()
        .pop()
        .unwrap();

    read_only.update(|p| p.username = "member2".to_string());
    assert_eq!(session.flush().unwrap(), 0);

    session.clear();
    let reloaded = repo
        .invoke(&mut session, "findByUsername", &[Value::Text("member1".into())])
        .unwrap();
    assert_eq!(reloaded.len(), 1, "the rename was never written");
}

#[test]
fn pessimistic_lock_holds_for_the_unit_of_work() {
    let db = test_db();
    let repo = Repository::<Player>::new();

    let id = {
        let mut session = db.session();
        let member = repo.save(&mut session, Player::new("member1", 10)).unwrap();
        let id = member.with(|p| p.id).unwrap();
        session.commit().unwrap();
        id
    };

    let mut locker = db.session();
    let locked = repo
        .invoke_with(
            &mut locker,
            "findByUsername",
            &[Value::Text("member1".into())],
            QueryHints::pessimistic_read(),
        )
        .unwrap();
    assert_eq!(locked.len(), 1);

    // another unit of work cannot write the locked row
    {
        let mut other = db.session();
        let handle = repo.find_by_id(&mut other, Value::Uint(id)).unwrap().unwrap();
        handle.update(|p| p.age = 11);
        let err = other.flush().unwrap_err();
        assert!(err.is_conflict());
    }

    // the lock owner can still write through its own unit of work
    locked[0].update(|p| p.age = 12);
    locker.commit().unwrap();

    let mut after = db.session();
    let member = repo.find_by_id(&mut after, Value::Uint(id)).unwrap().unwrap();
    assert_eq!(member.with(|p| p.age), 12);
}
