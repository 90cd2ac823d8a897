//! Map data references.
//!
//! Map items refer to their data through short URIs:
//!
//! - `asset://<path>`: a resource bundled with the application
//! - `base64://<data>`: inline content
//! - anything else: a file path (an optional `file://` prefix is stripped)
//!
//! `asset:///icons/x.png` and `asset://icons/x.png` name the same resource;
//! both parse to the same [`MapDataRef`] and display in the two-slash form.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::MosaicError;

const ASSET_SCHEME: &str = "asset://";
const BASE64_SCHEME: &str = "base64://";
const FILE_SCHEME: &str = "file://";

/// A parsed reference to map data.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MapDataRef {
    /// Bundled asset, path relative to the asset root.
    Asset(String),
    /// Inline base64 payload (not decoded).
    Base64(String),
    /// Local file.
    File(PathBuf),
}

impl MapDataRef {
    /// Parse a reference string. Never fails; unknown forms are file paths.
    ///
    /// # Examples
    ///
    /// ```
    /// use mosaic::uri::MapDataRef;
    ///
    /// let a = MapDataRef::parse("asset:///icons/x.png");
    /// let b = MapDataRef::parse("asset://icons/x.png");
    /// assert_eq!(a, b);
    /// assert_eq!(a.to_string(), "asset://icons/x.png");
    /// ```
    pub fn parse(uri: &str) -> Self {
        if let Some(rest) = strip_scheme(uri, ASSET_SCHEME) {
            MapDataRef::Asset(rest.to_string())
        } else if let Some(rest) = strip_scheme(uri, BASE64_SCHEME) {
            MapDataRef::Base64(rest.to_string())
        } else if let Some(rest) = uri.strip_prefix(FILE_SCHEME) {
            // file:///abs/path keeps its leading slash
            MapDataRef::File(PathBuf::from(rest))
        } else {
            MapDataRef::File(PathBuf::from(uri))
        }
    }

    /// The scheme name, `"file"` for plain paths.
    pub fn scheme(&self) -> &'static str {
        match self {
            MapDataRef::Asset(_) => "asset",
            MapDataRef::Base64(_) => "base64",
            MapDataRef::File(_) => "file",
        }
    }
}

/// Strip `scheme` and the optional third slash of the `scheme:///` form.
fn strip_scheme<'a>(uri: &'a str, scheme: &str) -> Option<&'a str> {
    let rest = uri.strip_prefix(scheme)?;
    Some(rest.strip_prefix('/').unwrap_or(rest))
}

impl fmt::Display for MapDataRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapDataRef::Asset(path) => write!(f, "{}{}", ASSET_SCHEME, path),
            MapDataRef::Base64(data) => write!(f, "{}{}", BASE64_SCHEME, data),
            MapDataRef::File(path) => write!(f, "{}", path.display()),
        }
    }
}

impl FromStr for MapDataRef {
    type Err = MosaicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(MapDataRef::parse(s))
    }
}
