//! Saved locations, keyed by display name

use std::sync::Arc;

use tracing::{debug, info};

use crate::Result;
use crate::models::Location;
use crate::storage::Store;

const FAVORITES_KEY: &str = "meteo-pwa-favorites";

/// Ordered set of favorite locations
#[derive(Clone)]
pub struct Favorites {
    store: Arc<Store>,
}

impl Favorites {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// All favorites in insertion order
    pub async fn list(&self) -> Result<Vec<Location>> {
        Ok(self
            .store
            .get::<Vec<Location>>(FAVORITES_KEY)
            .await?
            .unwrap_or_default())
    }

    /// Favorite with exactly this display name
    pub async fn get(&self, name: &str) -> Result<Option<Location>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .find(|favorite| favorite.display_name == name))
    }

    /// Append a location. Returns `false` if one with the same display name
    /// is already saved.
    pub async fn add(&self, location: &Location) -> Result<bool> {
        let mut favorites = self.list().await?;
        if favorites
            .iter()
            .any(|favorite| favorite.display_name == location.display_name)
        {
            debug!("{} is already a favorite", location.display_name);
            return Ok(false);
        }

        favorites.push(location.clone());
        self.store.put(FAVORITES_KEY, &favorites).await?;
        info!("Added {} to favorites", location.display_name);
        Ok(true)
    }

    /// Remove by exact display name. Returns `false` if nothing matched.
    pub async fn remove(&self, name: &str) -> Result<bool> {
        let mut favorites = self.list().await?;
        let before = favorites.len();
        favorites.retain(|favorite| favorite.display_name != name);
        if favorites.len() == before {
            return Ok(false);
        }

        self.store.put(FAVORITES_KEY, &favorites).await?;
        info!("Removed {} from favorites", name);
        Ok(true)
    }
}
