//! Memoized catalog lookups scoped to a single run.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::catalog::{RemoteCatalog, RemoteChannel, Result, fetch_channel_details};

/// Channel details fetched during one run.
///
/// Channels the catalog did not return are remembered as absent, so each id
/// costs at most one catalog request per run. Created fresh for every run and
/// dropped with it.
#[derive(Debug, Default)]
pub struct RunCache {
    channels: Mutex<HashMap<String, Option<RemoteChannel>>>,
}

impl RunCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch every id not seen yet this run in one batched lookup.
    pub async fn prefetch(&self, catalog: &dyn RemoteCatalog, ids: &[String]) -> Result<()> {
        let missing: Vec<String> = {
            let cached = self.lock();
            ids.iter()
                .filter(|id| !cached.contains_key(id.as_str()))
                .cloned()
                .collect()
        };
        if missing.is_empty() {
            return Ok(());
        }

        let fetched = fetch_channel_details(catalog, &missing).await?;
        let mut cached = self.lock();
        for id in missing {
            cached.entry(id).or_insert(None);
        }
        for channel in fetched {
            cached.insert(channel.external_id.clone(), Some(channel));
        }
        Ok(())
    }

    /// Details for one channel, or `None` when the catalog does not know it.
    pub async fn channel(
        &self,
        catalog: &dyn RemoteCatalog,
        id: &str,
    ) -> Result<Option<RemoteChannel>> {
        if let Some(known) = self.lock().get(id) {
            return Ok(known.clone());
        }
        self.prefetch(catalog, &[id.to_string()]).await?;
        Ok(self.lock().get(id).cloned().flatten())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Option<RemoteChannel>>> {
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
