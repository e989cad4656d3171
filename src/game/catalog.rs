use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// 牌面标识（每种图案唯一）。
pub type IdentityId = u32;

const MIN_IDENTITIES: usize = 2;

/// 内置示例牌面，方便前端调试或初始化。
static SAMPLE_IDENTITIES: Lazy<Vec<CardIdentity>> = Lazy::new(|| {
    vec![
        CardIdentity::new(1, "assets/cards/crane.png"),
        CardIdentity::new(2, "assets/cards/koi.png"),
        CardIdentity::new(3, "assets/cards/lotus.png"),
        CardIdentity::new(4, "assets/cards/lantern.png"),
        CardIdentity::new(5, "assets/cards/bamboo.png"),
        CardIdentity::new(6, "assets/cards/cloud.png"),
        CardIdentity::new(7, "assets/cards/moon.png"),
        CardIdentity::new(8, "assets/cards/plum.png"),
    ]
});

/// 一种牌面：唯一标识加图片引用。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CardIdentity {
    pub id: IdentityId,
    pub image: String,
}

impl CardIdentity {
    pub fn new(id: IdentityId, image: impl Into<String>) -> Self {
        Self {
            id,
            image: image.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum CatalogError {
    NotEnoughIdentities { count: usize },
    DuplicateIdentity { identity_id: IdentityId },
    EmptyImage { identity_id: IdentityId },
}

/// 牌面目录：发牌时每种牌面生成两张实例。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CardCatalog {
    #[serde(default)]
    pub identities: Vec<CardIdentity>,
}

impl CardCatalog {
    pub fn new(identities: Vec<CardIdentity>) -> Self {
        Self { identities }
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.identities.len() < MIN_IDENTITIES {
            return Err(CatalogError::NotEnoughIdentities {
                count: self.identities.len(),
            });
        }

        let mut seen = HashSet::new();
        for identity in &self.identities {
            if !seen.insert(identity.id) {
                return Err(CatalogError::DuplicateIdentity {
                    identity_id: identity.id,
                });
            }
            if identity.image.trim().is_empty() {
                return Err(CatalogError::EmptyImage {
                    identity_id: identity.id,
                });
            }
        }

        Ok(())
    }

    pub fn sample() -> Self {
        Self {
            identities: SAMPLE_IDENTITIES.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_catalog_is_valid() {
        let catalog = CardCatalog::sample();
        assert!(catalog.len() >= MIN_IDENTITIES);
        catalog.validate().expect("sample catalog should validate");
    }

    #[test]
    fn rejects_catalog_with_one_identity() {
        let catalog = CardCatalog::new(vec![CardIdentity::new(1, "solo.png")]);
        assert_eq!(
            catalog.validate(),
            Err(CatalogError::NotEnoughIdentities { count: 1 })
        );
    }

    #[test]
    fn rejects_duplicate_identity_ids() {
        let catalog = CardCatalog::new(vec![
            CardIdentity::new(1, "a.png"),
            CardIdentity::new(2, "b.png"),
            CardIdentity::new(1, "c.png"),
        ]);
        assert_eq!(
            catalog.validate(),
            Err(CatalogError::DuplicateIdentity { identity_id: 1 })
        );
    }

    #[test]
    fn rejects_blank_image_reference() {
        let catalog = CardCatalog::new(vec![
            CardIdentity::new(1, "a.png"),
            CardIdentity::new(2, "  "),
        ]);
        assert_eq!(
            catalog.validate(),
            Err(CatalogError::EmptyImage { identity_id: 2 })
        );
    }
}
