pub mod fields;
pub mod import;
pub mod panel;
pub mod surface;
pub mod tokens;

// Re-export key types for easier usage
pub use fields::*;
pub use import::{
    BasicDocxConverter, Conversion, ConversionWarning, ConvertError, DocxConverter, IMPORT_ACTION,
    ImportError, ImportOutcome, ImportTicket, ImportTracker, WarningKind,
};
pub use panel::{CategoryView, FieldRow, FieldsPanel, PanelSettings, PanelView};
pub use surface::{
    DEFAULT_INITIAL_CONTENT, EditorEvent, EditorSurface, EventSet, MemorySurface, SYNC_EVENTS,
    ToolbarButton,
};
