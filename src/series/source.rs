use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Where a slice's bytes come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SliceLocation {
    Bytes(Arc<[u8]>),
    Path(PathBuf),
    Url(String),
}

impl SliceLocation {
    /// `http://` and `https://` arguments are URLs, anything else is a path.
    #[must_use]
    pub fn parse(arg: &str) -> Self {
        if is_url(arg) {
            Self::Url(arg.to_string())
        } else {
            Self::Path(PathBuf::from(arg))
        }
    }
}

impl fmt::Display for SliceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(bytes) => write!(f, "<{} bytes in memory>", bytes.len()),
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Url(url) => write!(f, "{url}"),
        }
    }
}

/// One slice to load, with the name used in progress and error reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceSource {
    pub name: String,
    pub location: SliceLocation,
}

impl SliceSource {
    #[must_use]
    pub fn new(name: impl Into<String>, location: SliceLocation) -> Self {
        Self {
            name: name.into(),
            location,
        }
    }

    #[must_use]
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self::new(name, SliceLocation::Bytes(bytes.into()))
    }

    /// Named after the file name component of `path`.
    #[must_use]
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        Self::new(name, SliceLocation::Path(path.to_path_buf()))
    }

    /// Named after the last path segment of `url`.
    #[must_use]
    pub fn from_url(url: impl Into<String>) -> Self {
        let url = url.into();
        let name = url_file_name(&url).to_string();
        Self::new(name, SliceLocation::Url(url))
    }

    /// Build a source from a command-line argument.
    #[must_use]
    pub fn parse(arg: &str) -> Self {
        if is_url(arg) {
            Self::from_url(arg)
        } else {
            Self::from_path(arg)
        }
    }
}

fn is_url(arg: &str) -> bool {
    let lower = arg.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn url_file_name(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty() && !segment.contains(':'))
        .unwrap_or(url)
}

/// An ordered series submission
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeriesRequest {
    pub slices: Vec<SliceSource>,
    /// Free-form modality such as "CT" or "MRI"; unparseable hints are ignored
    pub modality_hint: Option<String>,
    pub description: Option<String>,
}

impl SeriesRequest {
    #[must_use]
    pub fn new(slices: impl IntoIterator<Item = SliceSource>) -> Self {
        Self {
            slices: slices.into_iter().collect(),
            modality_hint: None,
            description: None,
        }
    }

    #[must_use]
    pub fn with_modality_hint(mut self, hint: impl Into<String>) -> Self {
        self.modality_hint = Some(hint.into());
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }
}
