#![allow(dead_code)]

pub mod fixtures;
pub mod mock_ledger;
pub mod mock_signer;

pub use fixtures::*;
pub use mock_ledger::*;
pub use mock_signer::*;
