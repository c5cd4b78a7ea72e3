//! Git operations: clone with a content-addressed repository cache
//!
//! Clones land in `$HOME/.hide/repositories/{sha256(url)}`; a cache hit skips
//! the network entirely and the cached tree is copied into the project
//! directory. Commit checkout happens in the destination only, never in the
//! cache.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use git2::build::CheckoutBuilder;
use sha2::{Digest, Sha256};

use crate::error::{AppError, AppResult};
use crate::models::Repository;

/// Repository acquisition for project creation
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GitService: Send + Sync {
    /// Clone `repository` into `destination`. Partial destinations are the
    /// caller's responsibility to clean up.
    async fn clone_repository(&self, repository: &Repository, destination: &Path) -> AppResult<()>;
}

/// Git service backed by libgit2 with an on-disk clone cache
pub struct CachingGitService {
    cache_root: PathBuf,
}

impl CachingGitService {
    pub fn new(cache_root: impl Into<PathBuf>) -> Self {
        Self {
            cache_root: cache_root.into(),
        }
    }

    fn cache_path(&self, url: &str) -> PathBuf {
        let digest = Sha256::digest(url.as_bytes());
        self.cache_root.join(hex::encode(digest))
    }
}

#[async_trait]
impl GitService for CachingGitService {
    async fn clone_repository(&self, repository: &Repository, destination: &Path) -> AppResult<()> {
        let url = repository.url.clone();
        let commit = repository.commit.clone();
        let cache_path = self.cache_path(&url);
        let cache_root = self.cache_root.clone();
        let destination = destination.to_path_buf();

        tokio::task::spawn_blocking(move || -> AppResult<()> {
            std::fs::create_dir_all(&cache_root)?;

            if cache_path.exists() {
                tracing::debug!(%url, cache = %cache_path.display(), "Repository cache hit");
            } else {
                tracing::debug!(%url, cache = %cache_path.display(), "Cloning repository");

                if let Err(e) = git2::Repository::clone(&url, &cache_path) {
                    // Drop the partial clone so the next attempt starts clean.
                    let _ = std::fs::remove_dir_all(&cache_path);
                    return Err(AppError::Git(format!("failed to clone {url}: {e}")));
                }
            }

            copy_tree(&cache_path, &destination)?;

            if let Some(commit) = commit {
                checkout_commit(&destination, &commit)?;
            }

            Ok(())
        })
        .await?
    }
}

/// Hard-reset the working tree to the given commit
fn checkout_commit(repo_path: &Path, commit: &str) -> AppResult<()> {
    tracing::debug!(commit, "Checking out commit");

    let repo = git2::Repository::open(repo_path)?;
    let object = repo
        .revparse_single(commit)
        .map_err(|e| AppError::Git(format!("unknown commit {commit}: {e}")))?;

    let mut checkout = CheckoutBuilder::new();
    checkout.force();

    repo.reset(&object, git2::ResetType::Hard, Some(&mut checkout))?;

    Ok(())
}

/// Recursive copy preserving symlinks (the `.git` directory comes along so
/// checkout still works in the destination)
fn copy_tree(from: &Path, to: &Path) -> AppResult<()> {
    std::fs::create_dir_all(to)?;

    for entry in std::fs::read_dir(from)? {
        let entry = entry?;
        let source = entry.path();
        let target = to.join(entry.file_name());
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            copy_tree(&source, &target)?;
        } else if file_type.is_symlink() {
            #[cfg(unix)]
            {
                let link = std::fs::read_link(&source)?;
                std::os::unix::fs::symlink(link, &target)?;
            }
            #[cfg(not(unix))]
            {
                std::fs::copy(&source, &target)?;
            }
        } else {
            std::fs::copy(&source, &target)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_path_is_stable_and_url_keyed() {
        let service = CachingGitService::new("/tmp/cache");
        let a = service.cache_path("https://github.com/x/y.git");
        let b = service.cache_path("https://github.com/x/y.git");
        let c = service.cache_path("https://github.com/x/z.git");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("/tmp/cache"));
    }

    #[test]
    fn test_copy_tree_copies_nested_files() {
        let from = tempfile::tempdir().unwrap();
        let to = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(from.path().join("src")).unwrap();
        std::fs::write(from.path().join("src/main.rs"), "fn main() {}").unwrap();
        std::fs::write(from.path().join("README.md"), "# hi").unwrap();

        let dest = to.path().join("project");
        copy_tree(from.path(), &dest).unwrap();

        assert!(dest.join("src/main.rs").exists());
        assert!(dest.join("README.md").exists());
    }

    #[tokio::test]
    async fn test_clone_local_repository_and_cache_hit() {
        // Build a real repository to clone from, file:// style via path.
        let origin = tempfile::tempdir().unwrap();
        let repo = git2::Repository::init(origin.path()).unwrap();
        std::fs::write(origin.path().join("hello.txt"), "hello\n").unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new("hello.txt")).unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let sig = git2::Signature::now("dev", "dev@example.com").unwrap();
        repo.commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[])
            .unwrap();

        let cache = tempfile::tempdir().unwrap();
        let service = CachingGitService::new(cache.path());
        let repository = Repository {
            url: origin.path().to_string_lossy().into_owned(),
            commit: None,
        };

        let dest = tempfile::tempdir().unwrap();
        let first = dest.path().join("p1");
        service.clone_repository(&repository, &first).await.unwrap();
        assert!(first.join("hello.txt").exists());

        // Second clone is served from the cache.
        let second = dest.path().join("p2");
        service
            .clone_repository(&repository, &second)
            .await
            .unwrap();
        assert!(second.join("hello.txt").exists());
    }
}
