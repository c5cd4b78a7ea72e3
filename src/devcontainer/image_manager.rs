//! Docker image provisioning: pulls and Dockerfile builds

use std::collections::HashMap;
use std::path::Path;

use bollard::Docker;
use bollard::auth::DockerCredentials;
use bollard::query_parameters::{
    BuildImageOptionsBuilder, CreateImageOptionsBuilder, ListImagesOptionsBuilder,
};
use futures::StreamExt;
use rand::{Rng, distr::Alphanumeric};

use crate::constants::IMAGE_TAG_SUFFIX_LENGTH;
use crate::error::{AppError, AppResult};
use crate::models::DevContainerConfig;

/// Registry credentials from `DOCKER_USER` / `DOCKER_TOKEN`
#[derive(Debug, Clone, Default)]
pub struct RegistryCredentials {
    user: Option<String>,
    token: Option<String>,
}

impl RegistryCredentials {
    pub fn new(user: Option<String>, token: Option<String>) -> Self {
        Self { user, token }
    }

    /// Credentials for the registry auth header; bollard encodes them into
    /// the base64 JSON payload on the wire.
    fn to_docker(&self) -> Option<DockerCredentials> {
        if self.user.is_none() && self.token.is_none() {
            return None;
        }

        Some(DockerCredentials {
            username: self.user.clone(),
            password: self.token.clone(),
            ..Default::default()
        })
    }
}

/// Pulls named images and builds Dockerfile-based configs
pub struct ImageManager {
    docker: Docker,
    credentials: RegistryCredentials,
}

impl ImageManager {
    pub fn new(docker: Docker, credentials: RegistryCredentials) -> Self {
        Self {
            docker,
            credentials,
        }
    }

    /// Pull an image unless a matching one is already local. Stream errors
    /// after the first received frame are logged, not fatal.
    pub async fn pull_image(&self, name: &str) -> AppResult<()> {
        tracing::debug!(image = name, "Pulling image");

        if self.local_image_exists(name).await? {
            tracing::debug!(image = name, "Local image exists");
            return Ok(());
        }

        let options = CreateImageOptionsBuilder::default().from_image(name).build();

        let mut stream = self
            .docker
            .create_image(Some(options), None, self.credentials.to_docker());

        let mut received = false;
        while let Some(progress) = stream.next().await {
            match progress {
                Ok(info) => {
                    received = true;
                    if let Some(status) = info.status {
                        tracing::debug!(image = name, %status, "Pull progress");
                    }
                }
                Err(e) if received => {
                    tracing::error!(image = name, error = %e, "Pull stream error");
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::debug!(image = name, "Pulled image");
        Ok(())
    }

    /// Build an image from the config's Dockerfile and context, both resolved
    /// under `working_dir / config.path`. Returns the generated tag.
    pub async fn build_image(
        &self,
        working_dir: &Path,
        config: &DevContainerConfig,
    ) -> AppResult<String> {
        let build = config.build.as_ref();

        let dockerfile = build
            .and_then(|b| b.dockerfile.as_deref())
            .or(config.dockerfile.as_deref())
            .ok_or_else(|| AppError::Unsupported("Dockerfile not found".to_string()))?;

        let context = build
            .and_then(|b| b.context.as_deref())
            .or(config.context.as_deref())
            .unwrap_or(".");

        let config_dir = working_dir.join(&config.path);
        let dockerfile_path = config_dir.join(dockerfile);
        let context_path = config_dir.join(context);

        let dockerfile_relative = dockerfile_path
            .strip_prefix(&context_path)
            .map_err(|_| {
                AppError::Unsupported(format!(
                    "Dockerfile {dockerfile} must live inside the build context {context}"
                ))
            })?
            .to_string_lossy()
            .replace('\\', "/");

        tracing::debug!(context = %context_path.display(), "Building image");

        let build_context = {
            let context_path = context_path.clone();
            tokio::task::spawn_blocking(move || -> AppResult<Vec<u8>> {
                let mut archive = tar::Builder::new(Vec::new());
                archive.append_dir_all(".", &context_path)?;
                Ok(archive.into_inner()?)
            })
            .await??
        };

        let tag = image_tag(config.name.as_deref());

        let mut options = BuildImageOptionsBuilder::default()
            .t(&tag)
            .dockerfile(&dockerfile_relative);

        let buildargs;
        let cachefrom;
        if let Some(build) = build {
            if !build.args.is_empty() {
                buildargs = build.args.clone();
                options = options.buildargs(&buildargs);
            }
            if !build.cache_from.is_empty() {
                cachefrom = build.cache_from.clone();
                options = options.cachefrom(&cachefrom);
            }
            if let Some(target) = &build.target {
                options = options.target(target);
            }
        }

        let credentials = self
            .credentials
            .to_docker()
            .map(|c| HashMap::from([("docker.io".to_string(), c)]));

        let mut stream = self.docker.build_image(
            options.build(),
            credentials,
            Some(bollard::body_full(build_context.into())),
        );

        while let Some(progress) = stream.next().await {
            let info = progress?;

            if let Some(error) = info.error {
                return Err(AppError::Docker(format!("image build failed: {error}")));
            }

            if let Some(output) = info.stream {
                let output = output.trim_end();
                if !output.is_empty() {
                    tracing::debug!(%tag, output, "Build progress");
                }
            }
        }

        tracing::debug!(%tag, "Built image");
        Ok(tag)
    }

    /// Check local presence via a `reference=name` filter
    pub async fn local_image_exists(&self, name: &str) -> AppResult<bool> {
        let filters = HashMap::from([("reference".to_string(), vec![name.to_string()])]);
        let options = ListImagesOptionsBuilder::default().filters(&filters).build();

        let images = self.docker.list_images(Some(options)).await?;

        Ok(!images.is_empty())
    }
}

/// `{sanitized-name}-{random6}:latest`, lowercased; `{random6}:latest` when
/// the config carries no name. Sanitizing replaces spaces with hyphens.
fn image_tag(name: Option<&str>) -> String {
    let suffix = random_string(IMAGE_TAG_SUFFIX_LENGTH);

    let tag = match name {
        Some(name) if !name.is_empty() => {
            format!("{}-{}:latest", name.replace(' ', "-"), suffix)
        }
        _ => format!("{suffix}:latest"),
    };

    tag.to_lowercase()
}

pub(crate) fn random_string(length: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}
