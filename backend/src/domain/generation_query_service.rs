//! Read-side service for generations: owner view, history and community feed.

use std::sync::Arc;

use async_trait::async_trait;
use pagination::{PageRequest, Paginated};

use crate::domain::ports::{
    GenerationQuery, GenerationRepository, GenerationRepositoryError, GenerationView,
};
use crate::domain::{Error, Generation, GenerationId, UserId};

fn map_repository_error(error: GenerationRepositoryError) -> Error {
    match error {
        GenerationRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("generation store unavailable: {message}"))
        }
        other => Error::internal(format!("generation store error: {other}")),
    }
}

/// Generation query service implementing [`GenerationQuery`].
#[derive(Clone)]
pub struct GenerationQueryService {
    generations: Arc<dyn GenerationRepository>,
    max_entries: u32,
}

impl GenerationQueryService {
    /// Create a query service; `max_entries` feeds the derived phase.
    pub fn new(generations: Arc<dyn GenerationRepository>, max_entries: u32) -> Self {
        Self {
            generations,
            max_entries,
        }
    }

    fn view(&self, generation: Generation) -> GenerationView {
        let phase = generation.phase(self.max_entries);
        GenerationView { generation, phase }
    }
}

/// Hide override prompts from viewers other than the owner.
fn redact_prompts(mut generation: Generation) -> Generation {
    for entry in &mut generation.entries {
        entry.prompt = None;
    }
    generation
}

#[async_trait]
impl GenerationQuery for GenerationQueryService {
    async fn get_generation(
        &self,
        user_id: &UserId,
        generation_id: &str,
    ) -> Result<GenerationView, Error> {
        let id = GenerationId::new(generation_id)
            .map_err(|err| Error::invalid_request(format!("invalid generation id: {err}")))?;
        let generation = self
            .generations
            .find_by_id(&id)
            .await
            .map_err(map_repository_error)?
            .filter(|generation| generation.is_owned_by(user_id))
            .ok_or_else(|| Error::not_found(format!("generation {id} not found")))?;
        Ok(self.view(generation))
    }

    async fn list_history(
        &self,
        user_id: &UserId,
        page: PageRequest,
    ) -> Result<Paginated<GenerationView>, Error> {
        let total = self
            .generations
            .count_by_user(user_id)
            .await
            .map_err(map_repository_error)?;
        let rows = self
            .generations
            .list_by_user(user_id, page.page_size(), page.offset())
            .await
            .map_err(map_repository_error)?;
        Ok(Paginated::new(rows, page, total).map(|generation| self.view(generation)))
    }

    async fn list_community(&self, page: PageRequest) -> Result<Paginated<GenerationView>, Error> {
        let total = self
            .generations
            .count_public()
            .await
            .map_err(map_repository_error)?;
        let rows = self
            .generations
            .list_public(page.page_size(), page.offset())
            .await
            .map_err(map_repository_error)?;
        Ok(Paginated::new(rows, page, total)
            .map(|generation| self.view(redact_prompts(generation))))
    }
}
