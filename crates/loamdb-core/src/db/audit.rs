use crate::{traits::EntityDyn, types::Timestamp, value::Value};
use std::{
    cell::Cell,
    rc::Rc,
    time::{SystemTime, UNIX_EPOCH},
};

///
/// Clock
///
/// Explicit time source for audit stamps and key generation. Sessions read
/// time only through this seam, so tests can pin it.
///

pub trait Clock {
    fn now(&self) -> Timestamp;

    fn now_millis(&self) -> u64;
}

///
/// SystemClock
///

#[derive(Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_millis(self.now_millis())
    }

    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or_default()
    }
}

///
/// ManualClock
/// Deterministic clock for tests; advances only when told to. Clones share
/// the same instant, so a test can keep one and advance the session's.
///

#[derive(Clone)]
pub struct ManualClock {
    millis: Rc<Cell<u64>>,
}

impl ManualClock {
    #[must_use]
    pub fn starting_at(millis: u64) -> Self {
        Self {
            millis: Rc::new(Cell::new(millis)),
        }
    }

    pub fn advance_secs(&self, secs: u64) {
        self.millis.set(self.millis.get() + secs * 1_000);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_millis(self.millis.get())
    }

    fn now_millis(&self) -> u64 {
        self.millis.get()
    }
}

///
/// Audit stamping
///
/// The pre-insert hook fills every audit role; the pre-update hook touches
/// only the `Updated*` roles. The session guarantees each hook fires once
/// per insert and at most once per flush per update.
///

pub fn apply_insert_stamps(entity: &mut dyn EntityDyn, now: Timestamp, actor: Option<&str>) {
    apply_stamps(entity, now, actor, false);
}

pub fn apply_update_stamps(entity: &mut dyn EntityDyn, now: Timestamp, actor: Option<&str>) {
    apply_stamps(entity, now, actor, true);
}

fn apply_stamps(entity: &mut dyn EntityDyn, now: Timestamp, actor: Option<&str>, update: bool) {
    use crate::model::FieldRole;

    let actor_value = actor.map_or(Value::Null, |a| Value::Text(a.to_string()));
    let model = entity.model();

    for field in model.fields {
        let fires = if update {
            field.role.stamped_on_update()
        } else {
            field.role.stamped_on_insert()
        };
        if !fires {
            continue;
        }

        let value = match field.role {
            FieldRole::CreatedAt | FieldRole::UpdatedAt => Value::Timestamp(now),
            FieldRole::CreatedBy | FieldRole::UpdatedBy => actor_value.clone(),
            FieldRole::Plain | FieldRole::Version => continue,
        };

        entity.set_field(field.name, value);
    }
}

///
/// TESTS
///
