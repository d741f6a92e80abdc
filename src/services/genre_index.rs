use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::{catalog::CatalogClient, error::AppResult};

/// Memoizing genre name -> catalog id lookup
///
/// The catalog's genre list is fetched once and served from memory for the
/// rest of the process lifetime. A failed first fetch caches nothing, so the
/// next caller retries.
pub struct GenreIndex {
    catalog: Arc<dyn CatalogClient>,
    map: OnceCell<HashMap<String, u64>>,
}

impl GenreIndex {
    pub fn new(catalog: Arc<dyn CatalogClient>) -> Self {
        Self {
            catalog,
            map: OnceCell::new(),
        }
    }

    pub async fn resolve(&self) -> AppResult<&HashMap<String, u64>> {
        self.map
            .get_or_try_init(|| async {
                let genres = self.catalog.genre_list().await?;
                tracing::info!(count = genres.len(), "Loaded catalog genre list");
                Ok(genres.into_iter().map(|g| (g.name, g.id)).collect())
            })
            .await
    }
}
