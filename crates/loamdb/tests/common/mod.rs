#![allow(dead_code)]

//! Shared fixtures for the integration suite: `Player` belongs to at most
//! one `Guild`; players audit their writers and carry an optimistic
//! version.

use loamdb::core::{
    db::{Db, ManualClock, MemoryStore},
    model::{EntityModel, FieldKind, FieldModel, FieldRole, KeyPolicy, RelationModel},
    registry::SchemaRegistry,
    traits::{EntityKind, FieldValues},
    types::{Timestamp, Ulid},
    value::Value,
};

///
/// Player
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Player {
    pub id: Option<u64>,
    pub username: String,
    pub age: i64,
    pub active: bool,
    pub guild_id: Option<Ulid>,
    pub created_at: Option<Timestamp>,
    pub updated_at: Option<Timestamp>,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
    pub rev: u64,
}

impl Player {
    pub fn new(username: &str, age: i64) -> Self {
        Self {
            username: username.to_string(),
            age,
            active: true,
            ..Self::default()
        }
    }

    pub fn in_guild(username: &str, age: i64, guild: Ulid) -> Self {
        Self {
            guild_id: Some(guild),
            ..Self::new(username, age)
        }
    }
}

const PLAYER_FIELDS: &[FieldModel] = &[
    FieldModel::new("id", "player_id", FieldKind::Uint).nullable(),
    FieldModel::new("username", "username", FieldKind::Text),
    FieldModel::new("age", "age", FieldKind::Int),
    FieldModel::new("active", "active", FieldKind::Bool),
    FieldModel::new("created_at", "created_at", FieldKind::Timestamp)
        .nullable()
        .role(FieldRole::CreatedAt),
    FieldModel::new("updated_at", "updated_at", FieldKind::Timestamp)
        .nullable()
        .role(FieldRole::UpdatedAt),
    FieldModel::new("created_by", "created_by", FieldKind::Text)
        .nullable()
        .role(FieldRole::CreatedBy),
    FieldModel::new("updated_by", "updated_by", FieldKind::Text)
        .nullable()
        .role(FieldRole::UpdatedBy),
    FieldModel::new("rev", "rev", FieldKind::Uint).role(FieldRole::Version),
];

const PLAYER_RELATIONS: &[RelationModel] =
    &[RelationModel::many_to_one("guild", "guild_id", "guild")];

pub static PLAYER_MODEL: EntityModel = EntityModel {
    path: "integration::Player",
    entity_name: "player",
    table: "player",
    primary_key: "id",
    key_policy: KeyPolicy::SequenceUint,
    fields: PLAYER_FIELDS,
    relations: PLAYER_RELATIONS,
};

impl FieldValues for Player {
    fn get_value(&self, field: &str) -> Option<Value> {
        let value = match field {
            "id" => self.id.into(),
            "username" => Value::Text(self.username.clone()),
            "age" => Value::Int(self.age),
            "active" => Value::Bool(self.active),
            "guild" => self.guild_id.into(),
            "created_at" => self.created_at.into(),
            "updated_at" => self.updated_at.into(),
            "created_by" => self.created_by.clone().into(),
            "updated_by" => self.updated_by.clone().into(),
            "rev" => Value::Uint(self.rev),
            _ => return None,
        };

        Some(value)
    }

    fn set_value(&mut self, field: &str, value: Value) -> bool {
        match field {
            "id" => match value {
                Value::Null => {
                    self.id = None;
                    true
                }
                other => other.as_uint().is_some_and(|n| {
                    self.id = Some(n);
                    true
                }),
            },
            "username" => match value {
                Value::Text(s) => {
                    self.username = s;
                    true
                }
                _ => false,
            },
            "age" => value.as_int().is_some_and(|n| {
                self.age = n;
                true
            }),
            "active" => match value {
                Value::Bool(b) => {
                    self.active = b;
                    true
                }
                _ => false,
            },
            "guild" => match value {
                Value::Null => {
                    self.guild_id = None;
                    true
                }
                Value::Ulid(u) => {
                    self.guild_id = Some(u);
                    true
                }
                _ => false,
            },
            "created_at" => set_opt_timestamp(&mut self.created_at, value),
            "updated_at" => set_opt_timestamp(&mut self.updated_at, value),
            "created_by" => set_opt_text(&mut self.created_by, value),
            "updated_by" => set_opt_text(&mut self.updated_by, value),
            "rev" => value.as_uint().is_some_and(|n| {
                self.rev = n;
                true
            }),
            _ => false,
        }
    }
}

impl EntityKind for Player {
    const MODEL: &'static EntityModel = &PLAYER_MODEL;
}

///
/// Guild
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Guild {
    pub id: Option<Ulid>,
    pub name: String,
}

impl Guild {
    pub fn named(name: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
        }
    }
}

const GUILD_FIELDS: &[FieldModel] = &[
    FieldModel::new("id", "guild_id", FieldKind::Ulid).nullable(),
    FieldModel::new("name", "name", FieldKind::Text),
];

pub static GUILD_MODEL: EntityModel = EntityModel {
    path: "integration::Guild",
    entity_name: "guild",
    table: "guild",
    primary_key: "id",
    key_policy: KeyPolicy::GeneratedUlid,
    fields: GUILD_FIELDS,
    relations: &[],
};

impl FieldValues for Guild {
    fn get_value(&self, field: &str) -> Option<Value> {
        let value = match field {
            "id" => self.id.into(),
            "name" => Value::Text(self.name.clone()),
            _ => return None,
        };

        Some(value)
    }

    fn set_value(&mut self, field: &str, value: Value) -> bool {
        match field {
            "id" => match value {
                Value::Null => {
                    self.id = None;
                    true
                }
                Value::Ulid(u) => {
                    self.id = Some(u);
                    true
                }
                _ => false,
            },
            "name" => match value {
                Value::Text(s) => {
                    self.name = s;
                    true
                }
                _ => false,
            },
            _ => false,
        }
    }
}

impl EntityKind for Guild {
    const MODEL: &'static EntityModel = &GUILD_MODEL;
}

///
/// Helpers
///

fn set_opt_text(slot: &mut Option<String>, value: Value) -> bool {
    match value {
        Value::Null => {
            *slot = None;
            true
        }
        Value::Text(s) => {
            *slot = Some(s);
            true
        }
        _ => false,
    }
}

fn set_opt_timestamp(slot: &mut Option<Timestamp>, value: Value) -> bool {
    match value {
        Value::Null => {
            *slot = None;
            true
        }
        Value::Timestamp(t) => {
            *slot = Some(t);
            true
        }
        _ => false,
    }
}

/// Database over a fresh in-memory store with a pinned clock.
pub fn test_db() -> Db<MemoryStore> {
    let mut registry = SchemaRegistry::new();
    registry.register(&PLAYER_MODEL).unwrap();
    registry.register(&GUILD_MODEL).unwrap();

    Db::new(registry, MemoryStore::new())
        .unwrap()
        .with_clock(ManualClock::starting_at(1_700_000_000_000))
}
