use libsecp256k1::{Message, PublicKey, SecretKey};
use praline_utils::get_bip32_keys_from_mnemonic;
use sha3::{Digest, Keccak256};

use crate::rlp;
use crate::rpc_client::{EvmRpc, PostTransactionResult, RpcError};

#[derive(Clone, Debug)]
pub struct Wallet {
    pub mnemonic: String,
    pub derivation: String,
    pub chain_id: u64,
}

pub struct Keypair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl Wallet {
    pub fn compute_eth_address(&self) -> Result<String, String> {
        let keypair = compute_keypair(self)?;
        Ok(compute_eth_address(&keypair.public_key))
    }
}

pub fn compute_keypair(wallet: &Wallet) -> Result<Keypair, String> {
    let (secret_bytes, public_key) =
        get_bip32_keys_from_mnemonic(&wallet.mnemonic, "", &wallet.derivation)?;
    let secret_key = SecretKey::parse_slice(&secret_bytes).map_err(|e| e.to_string())?;
    Ok(Keypair {
        secret_key,
        public_key,
    })
}

// Last 20 bytes of the keccak-256 digest of the uncompressed public key,
// tag byte excluded.
pub fn compute_eth_address(public_key: &PublicKey) -> String {
    let uncompressed = public_key.serialize();
    let digest = Keccak256::digest(&uncompressed[1..]);
    format!("0x{}", hex::encode(&digest[12..]))
}

#[derive(Debug, Clone)]
pub struct TransactionRequest {
    pub nonce: u64,
    pub gas_price: u64,
    pub gas_limit: u64,
    // None deploys a contract
    pub to: Option<[u8; 20]>,
    pub value: u128,
    pub data: Vec<u8>,
}

pub fn sign_transaction(wallet: &Wallet, tx: &TransactionRequest) -> Result<Vec<u8>, String> {
    let keypair = compute_keypair(wallet)?;
    sign_transaction_with_key(&keypair.secret_key, wallet.chain_id, tx)
}

pub fn sign_transaction_with_key(
    secret_key: &SecretKey,
    chain_id: u64,
    tx: &TransactionRequest,
) -> Result<Vec<u8>, String> {
    let sighash = Keccak256::digest(&encode_unsigned(tx, chain_id));
    let message = Message::parse_slice(&sighash).map_err(|e| e.to_string())?;
    let (signature, recovery_id) = libsecp256k1::sign(&message, secret_key);
    let signature_bytes = signature.serialize();

    let v = chain_id * 2 + 35 + recovery_id.serialize() as u64;
    let mut fields = transaction_fields(tx);
    fields.push(rlp::encode_quantity_u64(v));
    fields.push(rlp::encode_quantity_bytes(&signature_bytes[..32]));
    fields.push(rlp::encode_quantity_bytes(&signature_bytes[32..]));
    Ok(rlp::encode_list(&fields))
}

// EIP-155 signing payload: the transaction fields followed by
// (chain_id, 0, 0).
fn encode_unsigned(tx: &TransactionRequest, chain_id: u64) -> Vec<u8> {
    let mut fields = transaction_fields(tx);
    fields.push(rlp::encode_quantity_u64(chain_id));
    fields.push(rlp::encode_bytes(&[]));
    fields.push(rlp::encode_bytes(&[]));
    rlp::encode_list(&fields)
}

fn transaction_fields(tx: &TransactionRequest) -> Vec<Vec<u8>> {
    vec![
        rlp::encode_quantity_u64(tx.nonce),
        rlp::encode_quantity_u64(tx.gas_price),
        rlp::encode_quantity_u64(tx.gas_limit),
        match tx.to {
            Some(address) => rlp::encode_bytes(&address),
            None => rlp::encode_bytes(&[]),
        },
        rlp::encode_quantity_u128(tx.value),
        rlp::encode_bytes(&tx.data),
    ]
}

pub fn parse_address(address: &str) -> Result<[u8; 20], String> {
    let raw = address.strip_prefix("0x").unwrap_or(address);
    let bytes = hex::decode(raw).map_err(|e| format!("invalid address {}: {}", address, e))?;
    if bytes.len() != 20 {
        return Err(format!("invalid address {}: expected 20 bytes", address));
    }
    let mut buf = [0u8; 20];
    buf.copy_from_slice(&bytes);
    Ok(buf)
}

#[derive(Debug)]
pub struct EvmWalletProvider {
    pub wallet: Wallet,
    pub rpc: EvmRpc,
}

impl EvmWalletProvider {
    pub fn new(wallet: Wallet, rpc_url: &str) -> Self {
        Self {
            wallet,
            rpc: EvmRpc::new(rpc_url),
        }
    }

    pub fn address(&self) -> Result<String, String> {
        self.wallet.compute_eth_address()
    }

    pub fn next_nonce(&self) -> Result<u64, RpcError> {
        let address = self.address().map_err(RpcError::Message)?;
        self.rpc.get_nonce(&address)
    }

    pub fn sign_transfer(
        &self,
        recipient: &str,
        amount: u128,
        nonce: u64,
        gas_price: u64,
    ) -> Result<Vec<u8>, String> {
        let to = parse_address(recipient)?;
        sign_transaction(
            &self.wallet,
            &TransactionRequest {
                nonce,
                gas_price,
                gas_limit: 21_000,
                to: Some(to),
                value: amount,
                data: vec![],
            },
        )
    }

    pub fn send_transaction(
        &self,
        tx: &TransactionRequest,
    ) -> Result<PostTransactionResult, RpcError> {
        let raw = sign_transaction(&self.wallet, tx).map_err(RpcError::Message)?;
        self.rpc.send_raw_transaction(&raw)
    }
}
