use crate::{
    error::InternalError,
    model::{EntityModel, FieldKind, FieldRole},
};
use std::collections::BTreeMap;
use thiserror::Error as ThisError;

///
/// MappingError
///

#[derive(Debug, ThisError)]
pub enum MappingError {
    #[error("entity '{0}' already registered")]
    DuplicateEntity(String),

    #[error("entity '{entity}' declares duplicate field or relation '{name}'")]
    DuplicateField { entity: String, name: String },

    #[error("entity '{entity}' declares duplicate column '{column}'")]
    DuplicateColumn { entity: String, column: String },

    #[error("entity '{entity}' primary key '{field}' is not a declared field")]
    MissingPrimaryKey { entity: String, field: String },

    #[error("entity '{entity}' relation '{relation}' targets unregistered entity '{target}'")]
    UnknownRelationTarget {
        entity: String,
        relation: String,
        target: String,
    },

    #[error("entity '{entity}' field '{field}' has role {role:?} but kind {kind:?}")]
    RoleKindMismatch {
        entity: String,
        field: String,
        role: FieldRole,
        kind: FieldKind,
    },

    #[error("entity '{0}' not registered")]
    EntityNotFound(String),
}

impl From<MappingError> for InternalError {
    fn from(err: MappingError) -> Self {
        Self::mapping(err.to_string())
    }
}

///
/// SchemaRegistry
///
/// Static entity metadata, registered once at startup. Relation targets are
/// resolved by name in `validate`, never eagerly, so self-referential and
/// mutually-referential models register without recursion.
///

#[derive(Default)]
pub struct SchemaRegistry {
    entities: BTreeMap<&'static str, &'static EntityModel>,
}

impl SchemaRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one entity model; checks everything that does not require
    /// other entities to be present yet.
    pub fn register(&mut self, model: &'static EntityModel) -> Result<(), MappingError> {
        if self.entities.contains_key(model.entity_name) {
            return Err(MappingError::DuplicateEntity(model.entity_name.to_string()));
        }

        if model.pk_field().is_none() {
            return Err(MappingError::MissingPrimaryKey {
                entity: model.entity_name.to_string(),
                field: model.primary_key.to_string(),
            });
        }

        let mut names = Vec::new();
        let mut columns = Vec::new();
        for name in model.persistent_columns() {
            if names.contains(&name) {
                return Err(MappingError::DuplicateField {
                    entity: model.entity_name.to_string(),
                    name: name.to_string(),
                });
            }
            names.push(name);

            // unwrap is safe: the name came from the model itself
            let column = model.column_for(name).unwrap_or(name);
            if columns.contains(&column) {
                return Err(MappingError::DuplicateColumn {
                    entity: model.entity_name.to_string(),
                    column: column.to_string(),
                });
            }
            columns.push(column);
        }

        for field in model.fields {
            let expected = match field.role {
                FieldRole::Plain => None,
                FieldRole::CreatedAt | FieldRole::UpdatedAt => Some(FieldKind::Timestamp),
                FieldRole::CreatedBy | FieldRole::UpdatedBy => Some(FieldKind::Text),
                FieldRole::Version => Some(FieldKind::Uint),
            };
            if let Some(expected) = expected
                && field.kind != expected
            {
                return Err(MappingError::RoleKindMismatch {
                    entity: model.entity_name.to_string(),
                    field: field.name.to_string(),
                    role: field.role,
                    kind: field.kind,
                });
            }
        }

        self.entities.insert(model.entity_name, model);
        Ok(())
    }

    /// Cross-entity validation pass; run once after all registrations.
    pub fn validate(&self) -> Result<(), MappingError> {
        for model in self.entities.values() {
            for relation in model.relations {
                if !self.entities.contains_key(relation.target) {
                    return Err(MappingError::UnknownRelationTarget {
                        entity: model.entity_name.to_string(),
                        relation: relation.field.to_string(),
                        target: relation.target.to_string(),
                    });
                }
            }
        }

        Ok(())
    }

    #[must_use]
    pub fn get(&self, entity_name: &str) -> Option<&'static EntityModel> {
        self.entities.get(entity_name).copied()
    }

    pub fn try_get(&self, entity_name: &str) -> Result<&'static EntityModel, InternalError> {
        self.entities
            .get(entity_name)
            .copied()
            .ok_or_else(|| MappingError::EntityNotFound(entity_name.to_string()).into())
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static EntityModel> + '_ {
        self.entities.values().copied()
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::{ErrorClass, ErrorOrigin},
        model::{FieldModel, KeyPolicy, RelationModel},
    };

    const PLAYER_FIELDS: &[FieldModel] = &[
        FieldModel::new("id", "player_id", FieldKind::Uint),
        FieldModel::new("username", "username", FieldKind::Text),
    ];

    const PLAYER_RELATIONS: &[RelationModel] =
        &[RelationModel::many_to_one("guild", "guild_id", "guild")];

    static PLAYER: EntityModel = EntityModel {
        path: "registry::tests::Player",
        entity_name: "player",
        table: "player",
        primary_key: "id",
        key_policy: KeyPolicy::SequenceUint,
        fields: PLAYER_FIELDS,
        relations: PLAYER_RELATIONS,
    };

    const GUILD_FIELDS: &[FieldModel] = &[
        FieldModel::new("id", "guild_id", FieldKind::Ulid),
        FieldModel::new("name", "name", FieldKind::Text),
    ];

    // guild -> player captain closes the Member↔Team-style cycle
    const GUILD_RELATIONS: &[RelationModel] =
        &[RelationModel::many_to_one("captain", "captain_id", "player")];

    static GUILD: EntityModel = EntityModel {
        path: "registry::tests::Guild",
        entity_name: "guild",
        table: "guild",
        primary_key: "id",
        key_policy: KeyPolicy::GeneratedUlid,
        fields: GUILD_FIELDS,
        relations: GUILD_RELATIONS,
    };

    #[test]
    fn mutually_referential_models_register_and_validate() {
        let mut registry = SchemaRegistry::new();
        registry.register(&PLAYER).unwrap();
        registry.register(&GUILD).unwrap();

        registry.validate().unwrap();
        assert_eq!(registry.get("player").unwrap().table, "player");
    }

    #[test]
    fn validate_rejects_unknown_relation_target() {
        let mut registry = SchemaRegistry::new();
        registry.register(&PLAYER).unwrap();

        let err = registry.validate().unwrap_err();
        assert!(matches!(err, MappingError::UnknownRelationTarget { .. }));
    }

    #[test]
    fn duplicate_entity_is_rejected() {
        let mut registry = SchemaRegistry::new();
        registry.register(&PLAYER).unwrap();

        let err = registry.register(&PLAYER).unwrap_err();
        assert!(matches!(err, MappingError::DuplicateEntity(_)));
    }

    #[test]
    fn missing_primary_key_is_rejected() {
        static BROKEN: EntityModel = EntityModel {
            path: "registry::tests::Broken",
            entity_name: "broken",
            table: "broken",
            primary_key: "nope",
            key_policy: KeyPolicy::Assigned,
            fields: PLAYER_FIELDS,
            relations: &[],
        };

        let mut registry = SchemaRegistry::new();
        let err = registry.register(&BROKEN).unwrap_err();
        assert!(matches!(err, MappingError::MissingPrimaryKey { .. }));
    }

    #[test]
    fn role_kind_mismatch_is_rejected() {
        const FIELDS: &[FieldModel] = &[
            FieldModel::new("id", "id", FieldKind::Uint),
            FieldModel::new("created_at", "created_at", FieldKind::Text)
                .role(FieldRole::CreatedAt),
        ];
        static BROKEN: EntityModel = EntityModel {
            path: "registry::tests::BadAudit",
            entity_name: "bad_audit",
            table: "bad_audit",
            primary_key: "id",
            key_policy: KeyPolicy::Assigned,
            fields: FIELDS,
            relations: &[],
        };

        let mut registry = SchemaRegistry::new();
        let err = registry.register(&BROKEN).unwrap_err();
        assert!(matches!(err, MappingError::RoleKindMismatch { .. }));
    }

    #[test]
    fn missing_entity_lookup_is_classified() {
        let registry = SchemaRegistry::new();
        let err = registry.try_get("missing").unwrap_err();
        assert_eq!(err.class, ErrorClass::Mapping);
        assert_eq!(err.origin, ErrorOrigin::Mapping);
    }
}
