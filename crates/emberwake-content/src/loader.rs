//! Reading content documents from disk.
//!
//! Every `.yaml`, `.yml` and `.json` file directly inside the content
//! directory is read, in file-name order, and merged into one document.
//! That order is the declaration order of dialogue nodes, so authors control
//! node priority by naming files.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, info};

use emberwake_dialogue::domain::catalog::DialogueCatalog;
use emberwake_quests::domain::definition::QuestCatalog;

use crate::convert;
use crate::document::ContentDocument;
use crate::error::ContentError;

/// Loaded and validated content.
#[derive(Debug, Clone)]
pub struct Content {
    /// Npcs and dialogue nodes.
    pub dialogue: DialogueCatalog,
    /// Quests.
    pub quests: QuestCatalog,
    /// SHA-256 over every document's name and bytes, lowercase hex.
    pub fingerprint: String,
    /// File names read, in merge order.
    pub documents: Vec<String>,
}

enum Format {
    Yaml,
    Json,
}

fn format_of(name: &str) -> Option<Format> {
    let extension = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "yaml" | "yml" => Some(Format::Yaml),
        "json" => Some(Format::Json),
        _ => None,
    }
}

fn parse(name: &str, source: &str) -> Result<ContentDocument, ContentError> {
    let parse_error = |message: String| ContentError::Parse {
        name: name.to_owned(),
        message,
    };
    match format_of(name) {
        Some(Format::Json) => serde_json::from_str(source).map_err(|e| parse_error(e.to_string())),
        Some(Format::Yaml) => serde_yaml::from_str(source).map_err(|e| parse_error(e.to_string())),
        None => Err(parse_error("unsupported file extension".to_owned())),
    }
}

fn io_error(path: PathBuf) -> impl FnOnce(std::io::Error) -> ContentError {
    move |source| ContentError::Io { path, source }
}

fn merge(into: &mut ContentDocument, document: ContentDocument) {
    into.npcs.extend(document.npcs);
    into.dialogues.extend(document.dialogues);
    into.quests.extend(document.quests);
}

fn assemble(sources: &[(String, String)]) -> Result<Content, ContentError> {
    let mut merged = ContentDocument::default();
    let mut hasher = Sha256::new();
    for (name, source) in sources {
        hasher.update(name.as_bytes());
        hasher.update([0]);
        hasher.update(source.as_bytes());
        merge(&mut merged, parse(name, source)?);
    }

    let (dialogue, quests) = convert::build(&merged)?;
    let content = Content {
        dialogue,
        quests,
        fingerprint: format!("{:x}", hasher.finalize()),
        documents: sources.iter().map(|(name, _)| name.clone()).collect(),
    };
    info!(
        documents = content.documents.len(),
        npcs = content.dialogue.npc_count(),
        dialogues = content.dialogue.node_count(),
        quests = content.quests.len(),
        fingerprint = %content.fingerprint,
        "content loaded"
    );
    Ok(content)
}

/// Loads a single document. `name` decides the format by its extension.
///
/// # Errors
///
/// Returns `ContentError::Parse` for malformed documents and
/// `ContentError::Invalid` for inconsistent content.
pub fn load_str(name: &str, source: &str) -> Result<Content, ContentError> {
    assemble(&[(name.to_owned(), source.to_owned())])
}

/// Loads every content document in `dir`.
///
/// # Errors
///
/// Returns `ContentError::Io` if the directory or a file cannot be read,
/// `ContentError::Empty` if it holds no documents, and the errors of
/// [`load_str`] otherwise.
pub fn load_dir(dir: &Path) -> Result<Content, ContentError> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(io_error(dir.to_path_buf()))?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| format_of(name).is_some())
        })
        .collect();
    paths.sort();

    if paths.is_empty() {
        return Err(ContentError::Empty(dir.to_path_buf()));
    }

    let mut sources = Vec::with_capacity(paths.len());
    for path in paths {
        let source = std::fs::read_to_string(&path).map_err(io_error(path.clone()))?;
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
            .to_owned();
        debug!(document = %name, bytes = source.len(), "content document read");
        sources.push((name, source));
    }
    assemble(&sources)
}
