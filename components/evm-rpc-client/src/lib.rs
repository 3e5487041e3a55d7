extern crate serde;

#[macro_use]
extern crate serde_derive;

#[macro_use]
extern crate serde_json;

pub mod rlp;
pub mod rpc_client;
pub mod wallet;

#[cfg(feature = "mock")]
pub mod mock_evm_rpc;

pub use rpc_client::EvmRpc;
pub use wallet::EvmWalletProvider;
