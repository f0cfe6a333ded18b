//! # sd-meta
//!
//! Read AI generation metadata (prompt, negative prompt, sampler, seed, model,
//! LoRAs, ...) embedded in images by Stable Diffusion front-ends and NovelAI,
//! alongside standard EXIF fields.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sd_meta::ai::AiField;
//! use sd_meta::read_metadata;
//! use std::path::Path;
//!
//! match read_metadata(Path::new("render.png")) {
//!     Some(metadata) => {
//!         println!("Camera: {:?}", metadata.camera);
//!         if let Some(ai) = &metadata.ai {
//!             println!("Prompt: {:?}", ai.get_str(AiField::Prompt));
//!             println!("Seed: {:?}", ai.get(AiField::Seed));
//!         }
//!     }
//!     None => eprintln!("Not a readable image"),
//! }
//! ```
//!
//! ## Lower-Level Usage
//!
//! The interpreters work on plain text and tag sets, so they can be used
//! without a file:
//!
//! ```rust
//! use sd_meta::ai::{AiField, AiFields, parse_text_metadata};
//! use sd_meta::metadata::parse_metadata;
//! use sd_meta::tags::{RawTags, TagGroup};
//!
//! // A bare SD WebUI parameters block
//! let mut fields = AiFields::new();
//! parse_text_metadata("a cat\nNegative prompt: blurry\nSteps: 20, Seed: 1", &mut fields);
//! assert_eq!(fields.get_str(AiField::NegativePrompt), Some("blurry"));
//!
//! // A tag set, as the container reader would produce it
//! let tags = RawTags::new()
//!     .with_text(TagGroup::Png, "Comment", r#"{"prompt":"a cat","seed":42}"#)
//!     .with_text(TagGroup::Png, "Software", "NovelAI");
//! let metadata = parse_metadata(&tags);
//! let ai = metadata.ai.unwrap();
//! assert_eq!(ai.get_str(AiField::Prompt), Some("a cat"));
//! assert_eq!(ai.get_str(AiField::Software), Some("NovelAI"));
//! ```
//!
//! ## Supported Formats
//!
//! | Format | Sources read |
//! |--------|--------------|
//! | PNG (`.png`) | `tEXt` / `zTXt` / `iTXt` chunks, `eXIf`, XMP in `iTXt` |
//! | JPEG (`.jpg`, `.jpeg`) | EXIF (APP1), XMP (APP1), IPTC (APP13) |
//! | WebP (`.webp`) | `EXIF` and `XMP ` chunks |
//! | TIFF (`.tif`, `.tiff`) | EXIF |
//!
//! ## Modules
//!
//! - [`ai`] — AI field model and the text/JSON interpreters
//! - [`config`] — CLI configuration types and loading/saving
//! - [`container`] — format detection and raw tag extraction
//! - [`metadata`] — source prioritization into [`ParsedMetadata`](metadata::ParsedMetadata)
//! - [`pipeline`] — entry points, format detection, and folder scanning
//! - [`tags`] — raw tag groups and the [`TagSource`](tags::TagSource) lookup trait

pub mod ai;
pub mod config;
pub mod container;
pub mod metadata;
pub mod pipeline;
pub mod tags;

pub use metadata::ParsedMetadata;
pub use pipeline::read_metadata;
