//! Generates OpenAPI 3.0 documents from annotated Rust endpoint declarations.
//!
//! Handlers and the types they exchange are read statically from source with
//! `syn`. Attribute metadata (`#[get("/x")]`, `#[operation(..)]`,
//! `#[parameter(..)]`, `#[api_response(..)]`, `#[schema(..)]`, ...) is mapped
//! onto document nodes, and whatever is not declared is inferred from the Rust
//! types: schemas from struct and enum definitions, parameters from bindings,
//! request bodies and responses from signatures.
//!
//! # Architecture
//!
//! 1. [`source`] - finds and parses the `.rs` files of a project
//! 2. [`reader`] - turns syntax trees into the [`model`] (types and endpoints)
//!    and the metadata of [`annotations`]
//! 3. [`schema_generator`] - infers component schemas, cycles included
//! 4. [`mapper`] - maps declared metadata onto [`document`] nodes
//! 5. [`openapi_builder`] - compiles endpoints into operations on top of an
//!    optional base document ([`loader`]) using [`config`] and [`naming`]
//! 6. [`filter`] - optional post-build pass that prunes or rewrites nodes
//! 7. [`serializer`] - writes the document as YAML or JSON
//!
//! # Example Usage
//!
//! ```no_run
//! use openapi_from_annotations::{
//!     openapi_builder::OpenApiBuilder, serializer::serialize_yaml, source::SourceSet,
//! };
//! use std::path::Path;
//!
//! let sources = SourceSet::from_dir(Path::new("./my-service")).unwrap();
//! let read = sources.read().unwrap();
//! let document = OpenApiBuilder::new().build(None, &read).unwrap();
//! println!("{}", serialize_yaml(&document).unwrap());
//! ```
//!
//! # Command-Line Interface
//!
//! See the [`cli`] module for the command-line application.

pub mod annotations;
pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod filter;
pub mod loader;
pub mod mapper;
pub mod model;
pub mod naming;
pub mod openapi_builder;
pub mod reader;
pub mod schema_generator;
pub mod serializer;
pub mod source;
