//! Hostility classifier.

use crate::world::Entity;

/// Entity type names treated as threats.
pub const HOSTILE_MOBS: [&str; 26] = [
    "zombie",
    "skeleton",
    "creeper",
    "spider",
    "enderman",
    "witch",
    "slime",
    "phantom",
    "drowned",
    "husk",
    "stray",
    "blaze",
    "ghast",
    "magma_cube",
    "hoglin",
    "piglin_brute",
    "warden",
    "vindicator",
    "evoker",
    "ravager",
    "vex",
    "pillager",
    "guardian",
    "elder_guardian",
    "wither_skeleton",
    "cave_spider",
];

/// Case-insensitive membership test against [`HOSTILE_MOBS`].
pub fn is_hostile(name: Option<&str>) -> bool {
    let Some(name) = name else {
        return false;
    };
    let lower = name.to_lowercase();
    HOSTILE_MOBS.contains(&lower.as_str())
}

/// Classify an entity by its type name. Usernames are never consulted.
pub fn is_hostile_entity(entity: &Entity) -> bool {
    is_hostile(entity.name.as_deref())
}
