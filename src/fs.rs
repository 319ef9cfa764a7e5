use std::path::Path;

use anyhow::Result;
use simple_error::simple_error;

/// Creates `path` and any missing parents, fine if it already exists.
pub async fn assert_dir(path: impl AsRef<Path>) -> Result<()> {
    match tokio::fs::metadata(path.as_ref()).await {
        Ok(meta) => {
            if meta.is_dir() {
                Ok(())
            } else {
                Err(simple_error!("`{}` exists but is not a directory", path.as_ref().display()).into())
            }
        }
        Err(_) => Ok(tokio::fs::create_dir_all(path.as_ref()).await?),
    }
}

pub async fn assert_dirs<P>(paths: &[P]) -> Result<()>
where
    P: AsRef<Path>,
{
    for path in paths {
        assert_dir(path).await?;
    }
    Ok(())
}

/// Errors while probing count as "absent", the step will run and report them.
pub async fn exists(path: impl AsRef<Path>) -> bool {
    tokio::fs::try_exists(path.as_ref()).await.unwrap_or(false)
}

/// Removes whatever a failed step left at `path`.
pub async fn remove_partial(path: impl AsRef<Path>) -> Result<bool> {
    match tokio::fs::remove_file(path.as_ref()).await {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err.into()),
    }
}
