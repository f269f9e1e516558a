//! # DOCX import
//!
//! Seeds the editor from a Word file. Reading the file is asynchronous;
//! conversion goes through a [`DocxConverter`] so the HTML conversion can be
//! swapped out. Results are applied through an [`ImportTracker`] which hands
//! out a ticket per import: only the newest ticket may replace the document,
//! so an import that finishes late never overwrites a newer one.
//!
//! Conversion warnings are logged and never fail an import. Any failure
//! leaves the document untouched and is returned for the host to report.

pub mod docx;

pub use docx::BasicDocxConverter;

use std::path::{Path, PathBuf};

use log::{error, info, warn};

use crate::surface::{EditorSurface, ToolbarButton};

/// Name of the toolbar button that opens the import picker
pub const IMPORT_ACTION: &str = "importdocx";

/// File extension offered by the import picker
pub const IMPORT_EXTENSION: &str = "docx";

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("Not a DOCX archive: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("DOCX archive has no word/document.xml")]
    MissingDocument,
    #[error("Failed to read document part: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to convert document: {0}")]
    Convert(#[from] ConvertError),
}

/// Non-fatal note produced while converting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionWarning {
    pub kind: WarningKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    UnrecognisedStyle,
    UnsupportedContent,
}

/// HTML produced from a DOCX file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversion {
    pub html: String,
    pub warnings: Vec<ConversionWarning>,
}

/// DOCX bytes to HTML
pub trait DocxConverter {
    fn convert(&self, bytes: &[u8]) -> Result<Conversion, ConvertError>;
}

/// Read a file and convert it
pub async fn read_and_convert<C>(path: &Path, converter: &C) -> Result<Conversion, ImportError>
where
    C: DocxConverter + ?Sized,
{
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| ImportError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(converter.convert(&bytes)?)
}

/// Identifies one import request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportTicket(u64);

/// How a finished import was handled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    /// Document replaced; carries the conversion warnings
    Applied { warnings: Vec<ConversionWarning> },
    /// A newer import was started; this result was dropped
    Superseded,
    /// No editor was attached; nothing changed
    NoEditor,
}

/// Orders overlapping imports so the latest request wins
#[derive(Debug, Default)]
pub struct ImportTracker {
    issued: u64,
    outstanding: Option<ImportTicket>,
}

impl ImportTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start an import, superseding any import still in flight
    pub fn begin(&mut self) -> ImportTicket {
        self.issued += 1;
        let ticket = ImportTicket(self.issued);
        if self.outstanding.replace(ticket).is_some() {
            info!("Import {} supersedes an import still in flight", self.issued);
        }
        ticket
    }

    pub fn in_flight(&self) -> bool {
        self.outstanding.is_some()
    }

    /// Apply a finished import to the editor.
    ///
    /// Results for superseded tickets are dropped, failures included. The
    /// current ticket's failure is logged and returned; the document is left
    /// as it was.
    pub fn finish<S>(
        &mut self,
        ticket: ImportTicket,
        result: Result<Conversion, ImportError>,
        editor: Option<&mut S>,
    ) -> Result<ImportOutcome, ImportError>
    where
        S: EditorSurface + ?Sized,
    {
        if self.outstanding != Some(ticket) {
            warn!("Discarding result of superseded import {}", ticket.0);
            return Ok(ImportOutcome::Superseded);
        }
        self.outstanding = None;

        let conversion = result.inspect_err(|e| error!("Error importing DOCX: {e}"))?;

        let Some(editor) = editor else {
            return Ok(ImportOutcome::NoEditor);
        };
        editor.set_content(&conversion.html);

        for warning in &conversion.warnings {
            info!("Conversion message: {}", warning.message);
        }

        Ok(ImportOutcome::Applied {
            warnings: conversion.warnings,
        })
    }

    /// Read, convert, and apply one file in sequence
    pub async fn import_file<C, S>(
        &mut self,
        path: &Path,
        converter: &C,
        editor: Option<&mut S>,
    ) -> Result<ImportOutcome, ImportError>
    where
        C: DocxConverter + ?Sized,
        S: EditorSurface + ?Sized,
    {
        let ticket = self.begin();
        let result = read_and_convert(path, converter).await;
        self.finish(ticket, result, editor)
    }
}

/// Register the "Import DOCX" toolbar button.
///
/// Clicks arrive as [`crate::EditorEvent::Action`] carrying [`IMPORT_ACTION`].
pub fn register_import_button<S: EditorSurface + ?Sized>(editor: &mut S) {
    editor.add_button(ToolbarButton {
        name: IMPORT_ACTION.to_string(),
        text: "Import DOCX (beta)".to_string(),
        icon: "new-document".to_string(),
        tooltip: "Import Content From Word Document".to_string(),
    });
}
