use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::error;

use crate::loader::base::{DataLoader, LoadedData};
use crate::types::Item;

/// Returns the loaders of `loaders` without repetitions, keeping the first occurrence.
///
/// Two loaders are the same when they are the same allocation, equal but distinct loader
/// values are both kept.
pub fn dedup_loaders<'a, I>(loaders: I) -> Vec<Arc<dyn DataLoader>>
where
    I: IntoIterator<Item = &'a Arc<dyn DataLoader>>,
{
    let mut unique: Vec<Arc<dyn DataLoader>> = Vec::new();

    for loader in loaders {
        let seen = unique
            .iter()
            .any(|known| std::ptr::addr_eq(Arc::as_ptr(known), Arc::as_ptr(loader)));
        if !seen {
            unique.push(loader.clone());
        }
    }

    unique
}

/// Runs every loader against `item` concurrently, one task per loader, then writes their
/// suggestions into the item.
///
/// Suggestions are applied in the order of `loaders` once all of them completed, so when two
/// loaders suggest the same key the one coming later in `loaders` wins whatever the completion
/// order. Suggestions with an empty key are skipped. A loader that panics contributes nothing.
pub async fn load_data(item: &mut Arc<Item>, loaders: &[Arc<dyn DataLoader>]) {
    if loaders.is_empty() {
        return;
    }

    let mut join_set = JoinSet::new();
    for (position, loader) in loaders.iter().enumerate() {
        let loader = loader.clone();
        let item = item.clone();

        join_set.spawn(async move { (position, loader.load_data(&item).await) });
    }

    let mut suggestions: Vec<Option<LoadedData>> = vec![None; loaders.len()];
    while let Some(result) = join_set.join_next().await {
        match result {
            Ok((position, loaded)) => suggestions[position] = Some(loaded),
            Err(join_err) => {
                error!(
                    error = %join_err,
                    at = %item.at,
                    "data loader task failed, skipping its data"
                );
            }
        }
    }

    // Loader tasks have released their handle on the item, so this does not clone it unless the
    // caller shares it.
    let data = &mut Arc::make_mut(item).data;
    for loaded in suggestions.into_iter().flatten() {
        if !loaded.is_none() {
            data.insert(loaded.key, loaded.value);
        }
    }
}
