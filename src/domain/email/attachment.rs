use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::{
    borrow::Cow,
    fs,
    path::{Path, PathBuf},
};

use super::{Error, Result};

/// Represents the file attached to every email of a campaign.
#[derive(Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Attachment {
    /// Represents content already loaded in memory.
    Inline { filename: String, content: Vec<u8> },
    /// Represents a file read again for every email.
    Path(PathBuf),
}

impl std::fmt::Debug for Attachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inline { filename, content } => f
                .debug_struct("Inline")
                .field("filename", filename)
                .field("size", &content.len())
                .finish(),
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
        }
    }
}

fn expand(path: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(path)
        .map_err(|err| Error::ExpandAttachmentPathError(err, path.to_owned()))?;
    Ok(PathBuf::from(expanded.to_string()))
}

fn filename(path: &Path) -> Result<String> {
    Ok(path
        .file_name()
        .ok_or_else(|| Error::GetAttachmentFilenameError(path.to_owned()))?
        .to_string_lossy()
        .into())
}

impl Attachment {
    pub fn new<F: Into<String>>(filename: F, content: Vec<u8>) -> Self {
        Self::Inline {
            filename: filename.into(),
            content,
        }
    }

    /// Loads the file at the given shell-expanded path into memory.
    pub fn from_path(path: &str) -> Result<Self> {
        trace!(">> load attachment {:?}", path);

        let path = expand(path)?;
        let filename = filename(&path)?;
        let content =
            fs::read(&path).map_err(|err| Error::ReadAttachmentError(err, path.to_owned()))?;
        debug!("attachment {:?} loaded ({} bytes)", filename, content.len());

        trace!("<< load attachment");
        Ok(Self::Inline { filename, content })
    }

    /// References the file at the given shell-expanded path without
    /// loading it. The file must exist now, but it is read again for
    /// every email.
    pub fn from_path_lazy(path: &str) -> Result<Self> {
        let path = expand(path)?;
        filename(&path)?;
        if !path.is_file() {
            return Err(Error::FindAttachmentError(path));
        }
        Ok(Self::Path(path))
    }

    pub fn filename(&self) -> Result<String> {
        match self {
            Self::Inline { filename, .. } => Ok(filename.to_owned()),
            Self::Path(path) => filename(path),
        }
    }

    /// Returns the attachment file name and content.
    pub fn read(&self) -> Result<(String, Cow<[u8]>)> {
        match self {
            Self::Inline { filename, content } => {
                Ok((filename.to_owned(), Cow::Borrowed(content.as_slice())))
            }
            Self::Path(path) => {
                let content = fs::read(path)
                    .map_err(|err| Error::ReadAttachmentError(err, path.to_owned()))?;
                Ok((filename(path)?, Cow::Owned(content)))
            }
        }
    }
}
