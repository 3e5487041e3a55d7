use reqwest::blocking::Client;

#[derive(Debug)]
pub enum RpcError {
    Generic,
    StatusCode(u16),
    Message(String),
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self {
            RpcError::Message(e) => write!(f, "{}", e),
            RpcError::StatusCode(e) => write!(f, "error status code {}", e),
            RpcError::Generic => write!(f, "unknown error"),
        }
    }
}

#[derive(Debug)]
pub struct EvmRpc {
    pub url: String,
    pub client: Client,
}

#[derive(Debug)]
pub struct PostTransactionResult {
    pub txid: String,
}

#[derive(Deserialize, Debug)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

#[derive(Deserialize, Debug)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct TransactionReceipt {
    #[serde(rename = "transactionHash")]
    pub transaction_hash: String,
    #[serde(rename = "blockNumber")]
    pub block_number: Option<String>,
    pub status: Option<String>,
}

impl TransactionReceipt {
    pub fn is_success(&self) -> bool {
        matches!(self.status.as_deref(), Some("0x1"))
    }
}

impl EvmRpc {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.into(),
            client: Client::new(),
        }
    }

    fn call<T>(&self, method: &str, params: serde_json::Value) -> Result<T, RpcError>
    where
        T: serde::de::DeserializeOwned,
    {
        self.call_opt(method, params)?.ok_or(RpcError::Generic)
    }

    fn call_opt<T>(&self, method: &str, params: serde_json::Value) -> Result<Option<T>, RpcError>
    where
        T: serde::de::DeserializeOwned,
    {
        let payload = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        let res = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .map_err(|e| RpcError::Message(e.to_string()))?;

        if !res.status().is_success() {
            return Err(RpcError::StatusCode(res.status().as_u16()));
        }

        let response: JsonRpcResponse<T> =
            res.json().map_err(|e| RpcError::Message(e.to_string()))?;
        if let Some(error) = response.error {
            return Err(RpcError::Message(format!(
                "{} (code {})",
                error.message, error.code
            )));
        }
        Ok(response.result)
    }

    pub fn get_chain_id(&self) -> Result<u64, RpcError> {
        let quantity: String = self.call("eth_chainId", json!([]))?;
        parse_quantity_u64(&quantity)
    }

    pub fn get_gas_price(&self) -> Result<u64, RpcError> {
        let quantity: String = self.call("eth_gasPrice", json!([]))?;
        parse_quantity_u64(&quantity)
    }

    pub fn get_block_number(&self) -> Result<u64, RpcError> {
        let quantity: String = self.call("eth_blockNumber", json!([]))?;
        parse_quantity_u64(&quantity)
    }

    pub fn get_nonce(&self, address: &str) -> Result<u64, RpcError> {
        let quantity: String =
            self.call("eth_getTransactionCount", json!([address, "pending"]))?;
        parse_quantity_u64(&quantity)
    }

    pub fn get_balance(&self, address: &str) -> Result<u128, RpcError> {
        let quantity: String = self.call("eth_getBalance", json!([address, "latest"]))?;
        parse_quantity_u128(&quantity)
    }

    pub fn send_raw_transaction(&self, transaction: &[u8]) -> Result<PostTransactionResult, RpcError> {
        let raw = format!("0x{}", hex::encode(transaction));
        let txid: String = self.call("eth_sendRawTransaction", json!([raw]))?;
        Ok(PostTransactionResult { txid })
    }

    // A null result means the transaction is not yet mined.
    pub fn get_transaction_receipt(
        &self,
        txid: &str,
    ) -> Result<Option<TransactionReceipt>, RpcError> {
        self.call_opt("eth_getTransactionReceipt", json!([txid]))
    }
}

pub fn parse_quantity_u64(quantity: &str) -> Result<u64, RpcError> {
    let raw = quantity.strip_prefix("0x").unwrap_or(quantity);
    u64::from_str_radix(raw, 16)
        .map_err(|e| RpcError::Message(format!("invalid hex quantity {}: {}", quantity, e)))
}

pub fn parse_quantity_u128(quantity: &str) -> Result<u128, RpcError> {
    let raw = quantity.strip_prefix("0x").unwrap_or(quantity);
    u128::from_str_radix(raw, 16)
        .map_err(|e| RpcError::Message(format!("invalid hex quantity {}: {}", quantity, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[test]
    fn parses_hex_quantities() {
        assert_eq!(parse_quantity_u64("0x0").unwrap(), 0);
        assert_eq!(parse_quantity_u64("0x42").unwrap(), 66);
        assert_eq!(parse_quantity_u64("0x3b9aca00").unwrap(), 1_000_000_000);
        assert_eq!(
            parse_quantity_u128("0xde0b6b3a7640000").unwrap(),
            1_000_000_000_000_000_000
        );
        assert!(parse_quantity_u64("0xzz").is_err());
    }

    fn rpc_mock(server: &mut mockito::ServerGuard, method: &str, body: &str) -> mockito::Mock {
        server
            .mock("POST", "/")
            .match_body(Matcher::PartialJsonString(format!(
                r#"{{"method":"{}"}}"#,
                method
            )))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create()
    }

    #[test]
    fn gets_gas_price() {
        let mut server = mockito::Server::new();
        let _m = rpc_mock(
            &mut server,
            "eth_gasPrice",
            r#"{"jsonrpc":"2.0","id":1,"result":"0x3b9aca00"}"#,
        );

        let rpc = EvmRpc::new(&server.url());
        assert_eq!(rpc.get_gas_price().unwrap(), 1_000_000_000);
    }

    #[test]
    fn gets_nonce() {
        let mut server = mockito::Server::new();
        let _m = rpc_mock(
            &mut server,
            "eth_getTransactionCount",
            r#"{"jsonrpc":"2.0","id":1,"result":"0x9"}"#,
        );

        let rpc = EvmRpc::new(&server.url());
        assert_eq!(
            rpc.get_nonce("0x9d8a62f656a8d1615c1294fd71e9cfb3e4855a4f")
                .unwrap(),
            9
        );
    }

    #[test]
    fn gets_balance_and_block_number() {
        let mut server = mockito::Server::new();
        let _balance = rpc_mock(
            &mut server,
            "eth_getBalance",
            r#"{"jsonrpc":"2.0","id":1,"result":"0xde0b6b3a7640000"}"#,
        );
        let _block = rpc_mock(
            &mut server,
            "eth_blockNumber",
            r#"{"jsonrpc":"2.0","id":1,"result":"0x1b4"}"#,
        );

        let rpc = EvmRpc::new(&server.url());
        assert_eq!(
            rpc.get_balance("0x9d8a62f656a8d1615c1294fd71e9cfb3e4855a4f")
                .unwrap(),
            1_000_000_000_000_000_000
        );
        assert_eq!(rpc.get_block_number().unwrap(), 436);
    }

    #[test]
    fn sends_raw_transaction() {
        let mut server = mockito::Server::new();
        let _m = rpc_mock(
            &mut server,
            "eth_sendRawTransaction",
            r#"{"jsonrpc":"2.0","id":1,"result":"0xdeadbeef"}"#,
        );

        let rpc = EvmRpc::new(&server.url());
        let res = rpc.send_raw_transaction(&[0xf8, 0x6c]).unwrap();
        assert_eq!(res.txid, "0xdeadbeef");
    }

    #[test]
    fn surfaces_json_rpc_errors() {
        let mut server = mockito::Server::new();
        let _m = rpc_mock(
            &mut server,
            "eth_sendRawTransaction",
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32000,"message":"nonce too low"}}"#,
        );

        let rpc = EvmRpc::new(&server.url());
        let err = rpc.send_raw_transaction(&[0x00]).unwrap_err();
        assert!(err.to_string().contains("nonce too low"));
    }

    #[test]
    fn surfaces_http_errors() {
        let mut server = mockito::Server::new();
        let _m = server
            .mock("POST", "/")
            .with_status(503)
            .create();

        let rpc = EvmRpc::new(&server.url());
        match rpc.get_gas_price().unwrap_err() {
            RpcError::StatusCode(503) => {}
            other => panic!("unexpected error {}", other),
        }
    }

    #[test]
    fn missing_receipt_is_none() {
        let mut server = mockito::Server::new();
        let _m = rpc_mock(
            &mut server,
            "eth_getTransactionReceipt",
            r#"{"jsonrpc":"2.0","id":1,"result":null}"#,
        );

        let rpc = EvmRpc::new(&server.url());
        assert!(rpc.get_transaction_receipt("0xdeadbeef").unwrap().is_none());
    }

    #[test]
    fn parses_transaction_receipt() {
        let mut server = mockito::Server::new();
        let _m = rpc_mock(
            &mut server,
            "eth_getTransactionReceipt",
            r#"{"jsonrpc":"2.0","id":1,"result":{"transactionHash":"0xdeadbeef","blockNumber":"0x10","status":"0x1"}}"#,
        );

        let rpc = EvmRpc::new(&server.url());
        let receipt = rpc
            .get_transaction_receipt("0xdeadbeef")
            .unwrap()
            .expect("receipt");
        assert_eq!(receipt.transaction_hash, "0xdeadbeef");
        assert!(receipt.is_success());
    }
}
