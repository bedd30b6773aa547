//! Compact building blocks for the index tables.
//!
//! - [`BitVector`] - rank/select bit vector with an interleaved rank directory
//! - [`IntVector`] - fixed-width bit-packed unsigned integers
//!
//! Both keep their words in a [`Table`](crate::storage::Table), so the same
//! code answers queries over owned memory and over a memory-mapped file.

pub mod bitvec;
pub mod int_vector;

pub use bitvec::BitVector;
pub use int_vector::IntVector;
