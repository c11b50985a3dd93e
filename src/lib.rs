#![forbid(unsafe_code)]
//! A persistent ordered map backed by an AVL tree. See the map module
//! for details.

pub(crate) mod avl;
pub(crate) mod iter;
pub mod map;

#[cfg(test)]
mod tests;
