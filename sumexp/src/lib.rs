//! Aligned assay containers for omics data.
//!
//! This crate provides a SummarizedExperiment-style container and the
//! pieces it is built from:
//!
//! - **Long tables**: [`LongTable`] of named, typed columns, and [`MetaTable`]
//!   for label-indexed metadata
//! - **Assays**: dense labelled [`AssayMatrix`] (features x samples)
//! - **Transcoding**: [`decompose`] a long table into assays and metadata by
//!   inferring column roles, and [`compose`] it back
//! - **Containers**: [`SummarizedExperiment`] with label/position/mask/range
//!   [`Selector`]s, borrowing [`ExperimentView`]s and row/column binding
//!
//! # Quick start
//!
//! ```
//! use sumexp::{Axis, Dimnames, LongTable, Scalar, SummarizedExperiment};
//!
//! let long = LongTable::from_columns([
//!     ("gene", vec!["g1".into(), "g1".into(), "g2".into(), "g2".into()]),
//!     ("sample", vec!["s1".into(), "s2".into(), "s1".into(), "s2".into()]),
//!     ("batch", vec!["b1".into(), "b1".into(), "b1".into(), "b1".into()]),
//!     ("tpm", vec![1.5.into(), 2.5.into(), 0.0.into(), 4.0.into()]),
//! ]).unwrap();
//!
//! let a = SummarizedExperiment::from_long(&long, "gene", "sample").unwrap();
//! assert_eq!(a.shape(), (2, 2));
//! assert_eq!(a.metadata_value("batch"), Some(&Scalar::from("b1")));
//! assert_eq!(a.assay("tpm").unwrap().get(1, 1), Some(4.0));
//!
//! let b = a.with_row_names(vec!["g3".into(), "g4".into()]).unwrap();
//! let (both, outcome) = a.bind(&b, Axis::Rows).unwrap();
//! assert!(outcome.is_bound());
//! assert_eq!(both.row_names(), &["g1", "g2", "g3", "g4"]);
//! ```

pub mod bind;
pub mod experiment;
pub mod matrix;
pub mod selector;
pub mod table;
pub mod transcode;

pub use sumexp_core::{Dimnames, ErrorKind, Result, SumExpError};

pub use bind::{check_bind, Axis, BindOutcome, Compatibility, Conflict};
pub use experiment::{ExperimentView, SummarizedExperiment};
pub use matrix::AssayMatrix;
pub use selector::{Item, Selector};
pub use table::{LongTable, MetaTable, Scalar};
pub use transcode::{compose, decompose, ColumnRole, Decomposition, DEFAULT_COL_KEY, DEFAULT_ROW_KEY};
