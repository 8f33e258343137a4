//! VpdPack Project Model
//!
//! Defines the core data contracts for VideoProc Vlogger projects:
//! - **Document:** Lossless JSON codec for the `.vpd` project file
//! - **Identifiers:** Normalization of the tool's two UUID spellings
//! - **Resources:** Media catalog entries and timeline references
//!
//! The decoded document is held as a raw JSON tree so that the many fields
//! this pipeline never interprets survive a load/save round trip unchanged.

pub mod document;
pub mod ident;
pub mod resource;

pub use document::*;
pub use ident::*;
pub use resource::*;
