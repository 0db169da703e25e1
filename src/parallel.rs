//! Batch identification spread over worker threads.
//!
//! A handle is never shared between threads, so every worker opens its own
//! from the same [`MagicConfig`].  With the `parallel` feature enabled the
//! work runs on Rayon's global pool; without it the batch runs sequentially
//! on one handle and produces the same results.

use std::path::{Path, PathBuf};

use crate::config::MagicConfig;
use crate::error::Result;
use crate::magic::Magic;
use crate::render::IdentifyResults;

/// Identify `paths` concurrently, recording each outcome.
///
/// The configuration is validated once up front: if it cannot produce a
/// valid handle that error is returned and nothing is identified.
pub fn identify_files_parallel<P: AsRef<Path> + Sync>(
    paths:  &[P],
    config: &MagicConfig,
) -> Result<IdentifyResults> {
    let magic = Magic::from_config(config)?;

    #[cfg(feature = "parallel")]
    {
        use crate::error::MagicError;
        use rayon::prelude::*;

        drop(magic);
        let results = paths
            .par_iter()
            .map_init(
                || Magic::from_config(config).ok(),
                |magic, path| {
                    let path = path.as_ref();
                    let result = match magic {
                        Some(magic) => magic.identify_file(path),
                        None        => Err(MagicError::HandleNotOpen),
                    };
                    (path.to_path_buf(), result)
                },
            )
            .collect::<Vec<(PathBuf, _)>>();
        Ok(results.into_iter().collect())
    }

    #[cfg(not(feature = "parallel"))]
    {
        Ok(paths
            .iter()
            .map(|path| {
                let path = path.as_ref();
                (PathBuf::from(path), magic.identify_file(path))
            })
            .collect())
    }
}
