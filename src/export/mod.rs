//! Turning a lesson into a PDF or EPUB document.
//!
//! [`LessonExporter`] drives one export: it checks access, loads pages in
//! their stored order, rewrites links and media, and feeds the result to the
//! [`DocumentAssembler`] for the requested format.

mod assembler;
mod epub;
mod exporter;
mod links;
mod pdf;
mod reorder;
pub mod template;

pub use assembler::{
    Assembler, AssemblyState, AssemblyStep, CoverSheet, DocumentAssembler, MediaSource,
    ScopedMedia,
};
pub use exporter::{
    ALL_GROUPS_CAPABILITY, Actor, Artifact, Delivery, ExportRequest, LessonExporter,
    artifact_filename,
};
pub use links::{MANAGE_CAPABILITY, SORT_LABEL, export_label, export_links};
pub use reorder::{ReorderAction, ReorderReply, ReorderResponse, reorder};
