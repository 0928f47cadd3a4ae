//! Contract-backed ledger over EVM JSON-RPC

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::abi::{AbiError, ContractAbi, Function, ParamType, Token};
use super::address::Address;
use super::rpc::{decode_data, encode_data, parse_quantity, RpcClient, RpcError};
use super::{FileRecord, Ledger, LedgerError, TxReceipt};
use crate::config::LedgerConfig;

const COUNT_FN: &str = "getFileCount";
const GET_FN: &str = "getFile";
const APPEND_FN: &str = "addFile";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    transaction_hash: String,
    #[serde(default)]
    block_number: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

/// The registry contract bound to a node, an address and a signing account
#[derive(Debug)]
pub struct EvmLedger {
    rpc: RpcClient,
    contract: Address,
    signer: Address,
    count_fn: Function,
    get_fn: Function,
    append_fn: Function,
    confirmation_timeout: Duration,
    poll_interval: Duration,
}

impl EvmLedger {
    /// Connect to the node, pick the signing account and bind the contract.
    ///
    /// Every failure here is fatal for the caller: nothing else works without
    /// a reachable node, a signer and a usable ABI.
    pub async fn connect(config: &LedgerConfig) -> Result<Self, LedgerError> {
        let rpc = RpcClient::new(&config.rpc_url, config.request_timeout())?;

        let client_version: String = rpc
            .request("web3_clientVersion", json!([]))
            .await
            .map_err(|source| LedgerError::Unreachable {
                url: config.rpc_url.clone(),
                source,
            })?;
        tracing::info!(url = %config.rpc_url, node = %client_version, "Connected to ledger node");

        let accounts: Vec<String> = rpc.request("eth_accounts", json!([])).await?;
        let signer: Address = accounts.first().ok_or(LedgerError::NoAccounts)?.parse()?;
        tracing::info!(account = %signer, available = accounts.len(), "Using default signing account");

        let abi = load_abi(&config.abi_path).await?;
        let contract: Address = config.contract_address.parse()?;

        let ledger = Self::bind(
            rpc,
            contract,
            signer,
            &abi,
            config.confirmation_timeout(),
            config.poll_interval(),
        )?;
        ledger.warn_if_no_code().await;
        Ok(ledger)
    }

    /// Bind an already connected client to the contract described by `abi`
    pub fn bind(
        rpc: RpcClient,
        contract: Address,
        signer: Address,
        abi: &ContractAbi,
        confirmation_timeout: Duration,
        poll_interval: Duration,
    ) -> Result<Self, LedgerError> {
        let count_fn = abi.function(COUNT_FN, &[])?.clone();
        let get_fn = abi.function(GET_FN, &[ParamType::Uint(256)])?.clone();
        let append_fn = abi
            .function(APPEND_FN, &[ParamType::String, ParamType::String])?
            .clone();

        tracing::debug!(
            contract = %contract,
            count = %hex::encode(count_fn.selector()),
            get = %hex::encode(get_fn.selector()),
            append = %hex::encode(append_fn.selector()),
            "Contract bound"
        );

        Ok(Self {
            rpc,
            contract,
            signer,
            count_fn,
            get_fn,
            append_fn,
            confirmation_timeout,
            poll_interval,
        })
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    async fn warn_if_no_code(&self) {
        let code: Result<String, _> = self
            .rpc
            .request("eth_getCode", json!([self.contract.to_checksum(), "latest"]))
            .await;
        match code {
            Ok(code) if code == "0x" || code.is_empty() => {
                tracing::warn!(contract = %self.contract, "No contract code deployed at address")
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(contract = %self.contract, error = %e, "Could not check contract code"),
        }
    }

    fn tx_object(&self, data: &[u8]) -> Value {
        json!({
            "from": self.signer.to_checksum(),
            "to": self.contract.to_checksum(),
            "data": encode_data(data),
        })
    }

    async fn call(&self, function: &Function, args: &[Token]) -> Result<Vec<Token>, LedgerError> {
        let data = function.encode_call(args)?;
        let raw: String = self
            .rpc
            .request("eth_call", json!([self.tx_object(&data), "latest"]))
            .await?;
        let bytes = decode_data(&raw).map_err(AbiError::from)?;
        Ok(function.decode_output(&bytes)?)
    }

    async fn wait_for_receipt(&self, tx_hash: &str) -> Result<TxReceipt, LedgerError> {
        tokio::time::timeout(self.confirmation_timeout, self.poll_receipt(tx_hash))
            .await
            .map_err(|_| LedgerError::ConfirmationTimeout {
                tx_hash: tx_hash.to_string(),
                waited: self.confirmation_timeout,
            })?
    }

    /// Poll until the transaction is mined
    async fn poll_receipt(&self, tx_hash: &str) -> Result<TxReceipt, LedgerError> {
        loop {
            let receipt: Option<RpcReceipt> = self
                .rpc
                .request("eth_getTransactionReceipt", json!([tx_hash]))
                .await
                .map_err(|source| LedgerError::ReceiptUnavailable {
                    tx_hash: tx_hash.to_string(),
                    source,
                })?;

            if let Some(receipt) = receipt {
                if let Some(block) = receipt.block_number.as_deref() {
                    if receipt.status.as_deref() == Some("0x0") {
                        return Err(LedgerError::Reverted {
                            tx_hash: receipt.transaction_hash,
                        });
                    }
                    return Ok(TxReceipt {
                        block_number: parse_quantity(block),
                        tx_hash: receipt.transaction_hash,
                    });
                }
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

async fn load_abi(path: &Path) -> Result<ContractAbi, LedgerError> {
    let json = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| LedgerError::SchemaIo {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(ContractAbi::from_json(&json)?)
}

fn single_uint(tokens: Vec<Token>) -> Result<u64, LedgerError> {
    let value = tokens
        .into_iter()
        .next()
        .and_then(Token::into_uint)
        .ok_or_else(|| LedgerError::UnexpectedOutput("expected a single uint".to_string()))?;
    u64::try_from(value).map_err(|_| LedgerError::UnexpectedOutput(format!("count {} too large", value)))
}

/// Build a record from `getFile` output, flat or wrapped in one struct
fn record_from_tokens(tokens: Vec<Token>) -> Result<FileRecord, LedgerError> {
    let mut fields = tokens;
    if matches!(fields.as_slice(), [Token::Tuple(_)]) {
        if let Some(Token::Tuple(inner)) = fields.pop() {
            fields = inner;
        }
    }

    match fields.as_slice() {
        [Token::Uint(index), Token::String(filename), Token::String(file_hash), Token::Uint(timestamp), Token::Address(uploader)] => {
            let to_u64 = |v: u128, what: &str| {
                u64::try_from(v)
                    .map_err(|_| LedgerError::UnexpectedOutput(format!("{} {} too large", what, v)))
            };
            Ok(FileRecord {
                index: to_u64(*index, "index")?,
                filename: filename.clone(),
                file_hash: file_hash.clone(),
                timestamp: to_u64(*timestamp, "timestamp")?,
                uploader: uploader.to_checksum(),
            })
        }
        other => Err(LedgerError::UnexpectedOutput(format!(
            "getFile returned {} value(s) of unexpected types",
            other.len()
        ))),
    }
}

#[async_trait]
impl Ledger for EvmLedger {
    fn backend(&self) -> &'static str {
        "evm"
    }

    fn signer(&self) -> String {
        self.signer.to_checksum()
    }

    async fn count(&self) -> Result<u64, LedgerError> {
        let tokens = self.call(&self.count_fn, &[]).await?;
        single_uint(tokens)
    }

    async fn get(&self, index: u64) -> Result<FileRecord, LedgerError> {
        match self.call(&self.get_fn, &[Token::Uint(index as u128)]).await {
            Ok(tokens) => record_from_tokens(tokens),
            // getFile reverts past the end; tell that apart from other node errors
            Err(e @ LedgerError::Rpc(RpcError::Node { .. })) => match self.count().await {
                Ok(count) if index >= count => Err(LedgerError::NoSuchRecord(index)),
                _ => Err(e),
            },
            Err(e) => Err(e),
        }
    }

    async fn append(&self, filename: &str, file_hash: &str) -> Result<TxReceipt, LedgerError> {
        let data = self.append_fn.encode_call(&[
            Token::String(filename.to_string()),
            Token::String(file_hash.to_string()),
        ])?;

        let mut tx = self.tx_object(&data);
        let gas: String = self.rpc.request("eth_estimateGas", json!([tx.clone()])).await?;
        tx["gas"] = Value::String(gas);

        let tx_hash: String = self.rpc.request("eth_sendTransaction", json!([tx])).await?;
        tracing::info!(tx_hash = %tx_hash, filename = %filename, "Append submitted, waiting for confirmation");

        let receipt = self.wait_for_receipt(&tx_hash).await?;
        tracing::info!(
            tx_hash = %receipt.tx_hash,
            block = ?receipt.block_number,
            "Append confirmed"
        );
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_from_flat_and_tuple() {
        let uploader = Address([0xab; 20]);
        let flat = vec![
            Token::Uint(0),
            Token::String("report.pdf".into()),
            Token::String("h1".into()),
            Token::Uint(1_700_000_000),
            Token::Address(uploader),
        ];

        let record = record_from_tokens(flat.clone()).unwrap();
        assert_eq!(record.index, 0);
        assert_eq!(record.filename, "report.pdf");
        assert_eq!(record.uploader, uploader.to_checksum());

        let wrapped = record_from_tokens(vec![Token::Tuple(flat)]).unwrap();
        assert_eq!(wrapped, record);
    }

    #[test]
    fn test_record_shape_mismatch() {
        let err = record_from_tokens(vec![Token::Uint(1)]).unwrap_err();
        assert!(matches!(err, LedgerError::UnexpectedOutput(_)));
    }

    #[test]
    fn test_single_uint() {
        assert_eq!(single_uint(vec![Token::Uint(7)]).unwrap(), 7);
        assert!(single_uint(vec![]).is_err());
        assert!(single_uint(vec![Token::Uint(u128::MAX)]).is_err());
    }
}
