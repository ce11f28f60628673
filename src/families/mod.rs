//! Blockchain Families
//!
//! One module per family. Each provides an [`AccountBridge`](crate::bridge::AccountBridge)
//! implementation, an [`AccountShapeSource`](crate::sync::AccountShapeSource)
//! adapter and, where the chain needs it, a preload source.

pub mod polkadot;
