//! Core abstractions for chanstore: the storage provider contract and record types.
//! Concrete backends live in sibling crates; callers depend only on this one.

pub mod storage;
