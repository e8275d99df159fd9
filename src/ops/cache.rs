//! Cache maintenance.

use std::path::Path;

use anyhow::{Context, Result};
use url::Url;

use crate::sources::{Concern, DescriptorCache, Navigator};
use crate::util::fs::{dir_size, remove_dir_all_if_exists};

/// What `clean` removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanSummary {
    pub files: usize,
    pub bytes: u64,
}

/// Delete the whole cache directory.
pub fn clean(root: &Path) -> Result<CleanSummary> {
    let (bytes, files) = dir_size(root);
    remove_dir_all_if_exists(root)?;
    tracing::info!("removed {} ({} files)", root.display(), files);
    Ok(CleanSummary { files, bytes })
}

/// Clear the discovery memo of `url` for the given concerns.
///
/// The next navigation of `url` tries the candidate filenames again.
pub fn forget(cache: &DescriptorCache, url: &Url, concerns: &[Concern]) -> Result<()> {
    for &concern in concerns {
        Navigator::new(cache, concern)
            .forget(url)
            .with_context(|| format!("failed to forget {} memo of {}", concern, url))?;
        tracing::debug!("forgot {} memo of {}", concern, url);
    }
    Ok(())
}
