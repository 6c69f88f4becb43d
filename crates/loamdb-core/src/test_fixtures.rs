//! Shared fixture entities for unit tests: a `Player` belongs to at most
//! one `Guild` (lazy many-to-one). Impls are hand-written the way a derive
//! would emit them.

use crate::{
    db::statement::Record,
    model::{EntityModel, FieldKind, FieldModel, FieldRole, KeyPolicy, RelationModel},
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
    #[must_use]
    pub fn new(username: &str, age: i64) -> Self {
        Self {
            username: username.to_string(),
            age,
            active: true,
            ..Self::default()
        }
    }

    #[must_use]
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
    path: "loamdb_core::test_fixtures::Player",
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
            "id" => set_opt_uint(&mut self.id, value),
            "username" => set_text(&mut self.username, value),
            "age" => match value.as_int() {
                Some(n) => {
                    self.age = n;
                    true
                }
                None => false,
            },
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
            "rev" => match value.as_uint() {
                Some(n) => {
                    self.rev = n;
                    true
                }
                None => false,
            },
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
    #[must_use]
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
    path: "loamdb_core::test_fixtures::Guild",
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
            "name" => set_text(&mut self.name, value),
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

fn set_text(slot: &mut String, value: Value) -> bool {
    match value {
        Value::Text(s) => {
            *slot = s;
            true
        }
        _ => false,
    }
}

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

fn set_opt_uint(slot: &mut Option<u64>, value: Value) -> bool {
    match value {
        Value::Null => {
            *slot = None;
            true
        }
        other => match other.as_uint() {
            Some(n) => {
                *slot = Some(n);
                true
            }
            None => false,
        },
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

/// Row record shaped the way the store returns `player` rows.
#[must_use]
pub fn player_record(id: u64, username: &str, age: i64) -> Record {
    let mut player = Player::new(username, age);
    player.id = Some(id);

    player.to_record()
}
