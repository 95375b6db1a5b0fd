//! Combat resolution - damage and elimination

use super::player::{ConnectionId, PlayerRecord};
use super::store::PlayerStore;

/// Result of resolving one shoot event
#[derive(Debug, Clone, PartialEq)]
pub enum ShotOutcome {
    /// Shooter or target is gone, they are in different rooms, or a player
    /// shot themselves. Nothing changed.
    Ignored,
    /// Target took damage and survived
    Hit(HitResult),
    /// Target dropped to zero health or below and was removed from the store
    Eliminated {
        hit: HitResult,
        record: PlayerRecord,
    },
}

/// Damage applied by a resolved shot
#[derive(Debug, Clone, PartialEq)]
pub struct HitResult {
    pub shooter_id: ConnectionId,
    pub target_id: ConnectionId,
    pub room: String,
    pub damage: i32,
    pub target_health: i32,
}

/// Combat rules. Hit detection happens on the client; the server only applies
/// the damage of shots it is told about.
pub struct CombatSystem;

impl CombatSystem {
    /// Apply damage to health, returns (new_health, is_eliminated)
    pub fn apply_damage(current_health: i32, damage: i32) -> (i32, bool) {
        let new_health = current_health.saturating_sub(damage);
        (new_health, new_health <= 0)
    }

    /// Apply `shooter`'s damage to `target`, removing the target when eliminated.
    ///
    /// Runs exactly once per shoot event and never retries.
    pub fn resolve_shot(
        store: &mut PlayerStore,
        shooter_id: ConnectionId,
        target_id: ConnectionId,
    ) -> ShotOutcome {
        if shooter_id == target_id {
            return ShotOutcome::Ignored;
        }

        let Ok(shooter) = store.get(shooter_id) else {
            return ShotOutcome::Ignored;
        };
        let damage = shooter.damage;
        let room = shooter.room.clone();

        let Some(target) = store.get_mut(target_id) else {
            return ShotOutcome::Ignored;
        };
        if target.room != room {
            return ShotOutcome::Ignored;
        }

        let (new_health, eliminated) = Self::apply_damage(target.health, damage);
        target.health = new_health;

        let hit = HitResult {
            shooter_id,
            target_id,
            room,
            damage,
            target_health: new_health,
        };

        if !eliminated {
            return ShotOutcome::Hit(hit);
        }

        match store.remove(target_id) {
            Some(record) => ShotOutcome::Eliminated { hit, record },
            None => ShotOutcome::Ignored,
        }
    }
}
