use mockito::{Matcher, Mock, ServerGuard};

pub struct MockEvmRpc {
    pub url: String,
    server: ServerGuard,
}

impl Default for MockEvmRpc {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEvmRpc {
    pub fn new() -> Self {
        let server = mockito::Server::new();
        let url = server.url().to_string();
        Self { server, url }
    }

    fn rpc_mock(&mut self, method: &str, result: serde_json::Value) -> Mock {
        self.server
            .mock("POST", "/")
            .match_body(Matcher::PartialJsonString(format!(
                r#"{{"method":"{}"}}"#,
                method
            )))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({ "jsonrpc": "2.0", "id": 1, "result": result }).to_string())
            .create()
    }

    pub fn get_chain_id_mock(&mut self, chain_id: u64) -> Mock {
        self.rpc_mock("eth_chainId", json!(format!("0x{:x}", chain_id)))
    }

    pub fn get_gas_price_mock(&mut self, gas_price: u64) -> Mock {
        self.rpc_mock("eth_gasPrice", json!(format!("0x{:x}", gas_price)))
    }

    pub fn get_block_number_mock(&mut self, block_number: u64) -> Mock {
        self.rpc_mock("eth_blockNumber", json!(format!("0x{:x}", block_number)))
    }

    pub fn get_nonce_mock(&mut self, nonce: u64) -> Mock {
        self.rpc_mock("eth_getTransactionCount", json!(format!("0x{:x}", nonce)))
    }

    pub fn get_balance_mock(&mut self, balance: u128) -> Mock {
        self.rpc_mock("eth_getBalance", json!(format!("0x{:x}", balance)))
    }

    pub fn send_raw_transaction_mock(&mut self, txid: &str) -> Mock {
        self.rpc_mock("eth_sendRawTransaction", json!(txid))
    }

    pub fn get_transaction_receipt_mock(&mut self, txid: &str, block_number: u64) -> Mock {
        self.rpc_mock(
            "eth_getTransactionReceipt",
            json!({
                "transactionHash": txid,
                "blockNumber": format!("0x{:x}", block_number),
                "status": "0x1",
            }),
        )
    }
}
