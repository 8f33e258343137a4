//! VpdPack Organize Core
//!
//! The resource/timeline linking engine and the copy-and-rewrite pipeline:
//! - **Catalog:** Extract media resources and indirection links from a document
//! - **Timeline:** Walk tracks for media reference blocks
//! - **Linker:** Resolve references, derive usage and sequence order
//! - **Relocate:** Plan target paths and execute bulk copies
//! - **Rewrite:** Point the document at the new locations
//! - **Pipeline:** Orchestrate load → extract → link → sequence → relocate →
//!   rewrite → persist, with dry-run and backup semantics
//! - **Repair:** Patch broken media paths via a filesystem search
//!
//! The analysis stages (catalog, timeline, linker) are pure: all inputs are
//! data, all outputs are data. Filesystem work is confined to relocate,
//! pipeline persistence, and repair.

pub mod catalog;
pub mod linker;
pub mod pipeline;
pub mod relocate;
pub mod repair;
pub mod rewrite;
pub mod timeline;

pub use catalog::{build_catalog, Catalog};
pub use linker::{assign_sequence, link_references, LinkReport, SequenceTable};
pub use pipeline::{OrganizeOptions, Phase, PipelineFailure, RunSummary};
pub use relocate::{
    execute_plan, plan_relocation, CopyOutcome, PlannedCopy, RelocationPlan, TargetLayout,
};
pub use repair::{RepairOptions, RepairSummary};
pub use timeline::walk_timeline;
