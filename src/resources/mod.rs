//! Asset loading.
//!
//! Everything that turns a source id such as `/models/Heart.glb` into a decoded
//! [`Asset`] lives here. The [`AssetSource`] trait is the decoding boundary: the
//! default [`FileAssetSource`] reads files from the asset directory on native targets
//! and fetches them relative to the page origin on the web. The
//! [`scheduler`] drives many loads concurrently and turns their completions into
//! scene updates.

use std::{
    fmt::Display,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{data_structures::texture::TextureAsset, resources::font::TypefaceFont};

pub mod font;
pub mod mesh;
pub mod scheduler;
pub mod texture;

pub use mesh::MeshAsset;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Mesh,
    Texture,
    Font,
}

impl Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetKind::Mesh => f.write_str("mesh"),
            AssetKind::Texture => f.write_str("texture"),
            AssetKind::Font => f.write_str("font"),
        }
    }
}

/// A decoded asset. Handles are shared, decoding happens once per request.
#[derive(Clone, Debug)]
pub enum Asset {
    Mesh(Arc<MeshAsset>),
    Texture(Arc<TextureAsset>),
    Font(Arc<TypefaceFont>),
}

impl Asset {
    pub fn kind(&self) -> AssetKind {
        match self {
            Asset::Mesh(_) => AssetKind::Mesh,
            Asset::Texture(_) => AssetKind::Texture,
            Asset::Font(_) => AssetKind::Font,
        }
    }

    pub fn into_mesh(self, source: &str) -> Result<Arc<MeshAsset>, LoadError> {
        match self {
            Asset::Mesh(mesh) => Ok(mesh),
            other => Err(LoadError::wrong_kind(source, AssetKind::Mesh, other.kind())),
        }
    }

    pub fn into_texture(self, source: &str) -> Result<Arc<TextureAsset>, LoadError> {
        match self {
            Asset::Texture(texture) => Ok(texture),
            other => Err(LoadError::wrong_kind(source, AssetKind::Texture, other.kind())),
        }
    }

    pub fn into_font(self, source: &str) -> Result<Arc<TypefaceFont>, LoadError> {
        match self {
            Asset::Font(font) => Ok(font),
            other => Err(LoadError::wrong_kind(source, AssetKind::Font, other.kind())),
        }
    }
}

/// Why a single load request failed. Failures are terminal for that request only.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("could not read {path}")]
    Io {
        path: String,
        #[source]
        error: std::io::Error,
    },
    #[error("could not fetch {url}: {message}")]
    Fetch { url: String, message: String },
    #[error("{path} is not a valid glTF file")]
    Gltf {
        path: String,
        #[source]
        error: gltf::Error,
    },
    #[error("{path} is not a supported image: {message}")]
    Image { path: String, message: String },
    #[error("{path} is not a valid typeface font")]
    Font {
        path: String,
        #[source]
        error: serde_json::Error,
    },
    #[error("{path} decoded to a {found}, expected a {expected}")]
    WrongKind {
        path: String,
        expected: AssetKind,
        found: AssetKind,
    },
    #[error("{path} does not exist")]
    NotFound { path: String },
    #[error("loading {path} was cancelled")]
    Cancelled { path: String },
}

impl LoadError {
    pub fn wrong_kind(path: &str, expected: AssetKind, found: AssetKind) -> Self {
        LoadError::WrongKind {
            path: path.to_string(),
            expected,
            found,
        }
    }

    /// The source id of the failed request.
    pub fn path(&self) -> &str {
        match self {
            LoadError::Io { path, .. }
            | LoadError::Gltf { path, .. }
            | LoadError::Image { path, .. }
            | LoadError::Font { path, .. }
            | LoadError::WrongKind { path, .. }
            | LoadError::NotFound { path }
            | LoadError::Cancelled { path } => path,
            LoadError::Fetch { url, .. } => url,
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub type LoadFuture = futures::future::BoxFuture<'static, Result<Asset, LoadError>>;
#[cfg(target_arch = "wasm32")]
pub type LoadFuture = futures::future::LocalBoxFuture<'static, Result<Asset, LoadError>>;

/// Resolves a source id to a decoded asset.
pub trait AssetSource: Send + Sync + 'static {
    fn load(&self, kind: AssetKind, source: &str) -> LoadFuture;
}

/// Loads assets from the asset directory (native) or the page origin (web).
#[derive(Clone, Debug)]
pub struct FileAssetSource {
    root: PathBuf,
}

impl FileAssetSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Default for FileAssetSource {
    /// The directory the build script copied `assets/` to, or `./assets`.
    fn default() -> Self {
        let root = option_env!("HEART_FLOW_ASSET_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| Path::new("./").join("assets"));
        Self::new(root)
    }
}

impl AssetSource for FileAssetSource {
    fn load(&self, kind: AssetKind, source: &str) -> LoadFuture {
        let root = self.root.clone();
        let source = source.to_string();
        Box::pin(async move {
            let bytes = load_binary(&root, &source).await?;
            match kind {
                AssetKind::Mesh => {
                    let mesh = mesh::load_gltf(&root, &source, &bytes).await?;
                    Ok(Asset::Mesh(Arc::new(mesh)))
                }
                AssetKind::Texture => {
                    let texture = texture::decode(&source, &bytes)?;
                    Ok(Asset::Texture(Arc::new(texture)))
                }
                AssetKind::Font => {
                    let font = TypefaceFont::from_json(&bytes)
                        .map_err(|error| LoadError::Font { path: source.clone(), error })?;
                    Ok(Asset::Font(Arc::new(font)))
                }
            }
        })
    }
}

#[cfg(target_arch = "wasm32")]
fn format_url(file_name: &str) -> Result<reqwest::Url, LoadError> {
    let fetch_error = |message: String| LoadError::Fetch {
        url: file_name.to_string(),
        message,
    };
    let origin = web_sys::window()
        .ok_or_else(|| fetch_error("no browser window".to_string()))?
        .location()
        .origin()
        .map_err(|e| fetch_error(format!("{:?}", e)))?;
    let base = reqwest::Url::parse(&format!("{}/", origin)).map_err(|e| fetch_error(e.to_string()))?;
    base.join(file_name.trim_start_matches('/'))
        .map_err(|e| fetch_error(e.to_string()))
}

/// Reads the raw bytes behind a source id. Leading slashes are relative to `root`.
#[allow(unused_variables)]
pub async fn load_binary(root: &Path, file_name: &str) -> Result<Vec<u8>, LoadError> {
    #[cfg(target_arch = "wasm32")]
    let data = {
        let url = format_url(file_name)?;
        let fetch_error = |e: reqwest::Error| LoadError::Fetch {
            url: url.to_string(),
            message: e.to_string(),
        };
        let response = reqwest::get(url.clone()).await.map_err(fetch_error)?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(LoadError::NotFound {
                path: file_name.to_string(),
            });
        }
        response
            .error_for_status()
            .map_err(fetch_error)?
            .bytes()
            .await
            .map_err(fetch_error)?
            .to_vec()
    };
    #[cfg(not(target_arch = "wasm32"))]
    let data = {
        let path = root.join(file_name.trim_start_matches('/'));
        match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Err(LoadError::NotFound {
                    path: file_name.to_string(),
                });
            }
            Err(error) => {
                return Err(LoadError::Io {
                    path: file_name.to_string(),
                    error,
                });
            }
        }
    };

    Ok(data)
}

/// Resolves `uri` relative to the directory of `source`, e.g. a glTF buffer file.
pub fn sibling(source: &str, uri: &str) -> String {
    match source.rfind('/') {
        Some(idx) => format!("{}{}", &source[..=idx], uri),
        None => uri.to_string(),
    }
}
