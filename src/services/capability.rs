use serde::Deserialize;

/// Answers whether the current license covers a number of entities.
pub trait CapabilityGate: Send + Sync {
    fn has_capacity_for(&self, entity_count: usize) -> bool;
}

pub const FREE_TIER_MAX_ENTITIES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LicenseTier {
    #[default]
    Free,
    Premium,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LicenseSettings {
    pub tier: LicenseTier,
    pub max_entities: usize,
}

impl Default for LicenseSettings {
    fn default() -> Self {
        Self {
            tier: LicenseTier::Free,
            max_entities: FREE_TIER_MAX_ENTITIES,
        }
    }
}

impl CapabilityGate for LicenseSettings {
    fn has_capacity_for(&self, entity_count: usize) -> bool {
        match self.tier {
            LicenseTier::Premium => true,
            LicenseTier::Free => entity_count <= self.max_entities,
        }
    }
}
