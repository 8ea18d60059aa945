//! On-disk format of DBF tables.
//!
//! ```text
//! layout   fixed-width struct descriptions (header, descriptors, memo blocks)
//! header   table header + field descriptor array
//! fields   per-type field value decoders
//! ```

pub mod fields;
pub mod header;
pub mod layout;
