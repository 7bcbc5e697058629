use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use thiserror::Error;

use crate::domain::project::Project;
use crate::domain::team::Team;
use crate::domain::update::EntityId;

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Anything a repository can hold.
pub trait Entity: Clone + Send + Sync + 'static {
    fn id(&self) -> EntityId;
    fn name(&self) -> &str;
}

impl Entity for Team {
    fn id(&self) -> EntityId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Entity for Project {
    fn id(&self) -> EntityId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Edit applied by [`Repository::update`]. Returning `false` rejects the edit.
pub type EntityChange<T> = Box<dyn FnOnce(&mut T) -> bool + Send>;

#[async_trait]
pub trait Repository<T: Entity>: Send + Sync {
    async fn get_all(&self) -> Result<Vec<T>, RepositoryError>;
    async fn get_by_id(&self, id: EntityId) -> Result<Option<T>, RepositoryError>;
    /// Stores `entity`, replacing any entity with the same id.
    async fn save(&self, entity: T) -> Result<(), RepositoryError>;
    /// Applies `change` to the stored entity atomically with respect to other
    /// writers. `None` if the id is unknown, otherwise whether the change was
    /// accepted; a rejected change leaves the entity untouched.
    async fn update(&self, id: EntityId, change: EntityChange<T>) -> Result<Option<bool>, RepositoryError>;
}

/// Process-local repository ordered by id.
pub struct InMemoryRepository<T> {
    entities: Arc<RwLock<BTreeMap<EntityId, T>>>,
}

impl<T: Entity> InMemoryRepository<T> {
    pub fn new() -> Self {
        Self {
            entities: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    pub fn with_entities(entities: impl IntoIterator<Item = T>) -> Self {
        let repository = Self::new();
        repository
            .entities
            .write()
            .extend(entities.into_iter().map(|entity| (entity.id(), entity)));
        repository
    }

    pub fn len(&self) -> usize {
        self.entities.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Entity> Default for InMemoryRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Entity> Repository<T> for InMemoryRepository<T> {
    async fn get_all(&self) -> Result<Vec<T>, RepositoryError> {
        Ok(self.entities.read().values().cloned().collect())
    }

    async fn get_by_id(&self, id: EntityId) -> Result<Option<T>, RepositoryError> {
        Ok(self.entities.read().get(&id).cloned())
    }

    async fn save(&self, entity: T) -> Result<(), RepositoryError> {
        self.entities.write().insert(entity.id(), entity);
        Ok(())
    }

    async fn update(&self, id: EntityId, change: EntityChange<T>) -> Result<Option<bool>, RepositoryError> {
        let mut entities = self.entities.write();
        let Some(stored) = entities.get_mut(&id) else {
            return Ok(None);
        };
        let mut edited = stored.clone();
        let accepted = change(&mut edited);
        if accepted {
            *stored = edited;
        }
        Ok(Some(accepted))
    }
}
