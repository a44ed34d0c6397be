use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use ethers::prelude::*;
use rust_decimal::Decimal;
use tokio::sync::Mutex;

use crate::client::{ChainClient, SettleParams, SettleReceipt};
use crate::error::ChainClientError;
use crate::escrow::EscrowBalance;
use crate::registry::TokenRegistry;

abigen!(
    Erc20,
    r#"[
        function decimals() view returns (uint8)
        function balanceOf(address) view returns (uint256)
        function approve(address spender, uint256 amount) returns (bool)
    ]"#
);

abigen!(
    SettlementContract,
    r#"[
        function owner() view returns (address)
        function lockedBalanceOf(address account, address token) view returns (uint256)
        function nonces(address account) view returns (uint256)
        function lockEscrowForOrder(address user, address token, uint256 amount, bytes32 orderId)
        function settleTrade(uint256 orderId, address party1, address party2, address token, uint256 amount, uint256 nonce, bool isSourceChain) returns (bool)
        function mint(address token, address account, uint256 amount)
    ]"#
);

const RPC_TIMEOUT: Duration = Duration::from_secs(10);

/// Production `ChainClient` backed by `ethers`. One JSON-RPC provider is
/// created per network on first use and cached; the signer wallet is shared
/// across networks since settlement addresses are chain-specific but the
/// operator key is not.
pub struct EthersChainClient {
    registry: Arc<TokenRegistry>,
    signer_key: LocalWallet,
    providers: Mutex<HashMap<String, Arc<Provider<Http>>>>,
}

impl EthersChainClient {
    pub fn new(registry: Arc<TokenRegistry>, signer_key: LocalWallet) -> Self {
        Self {
            registry,
            signer_key,
            providers: Mutex::new(HashMap::new()),
        }
    }

    async fn provider_for(&self, network: &str) -> Result<Arc<Provider<Http>>, ChainClientError> {
        let mut providers = self.providers.lock().await;
        if let Some(provider) = providers.get(network) {
            return Ok(provider.clone());
        }

        let config = self.registry.network(network)?;
        let provider = Provider::<Http>::try_from(config.rpc_url.as_str())
            .map_err(|err| ChainClientError::RpcUnreachable {
                network: network.to_string(),
                source: err.into(),
            })?
            .interval(Duration::from_millis(500));
        let provider = Arc::new(provider);
        providers.insert(network.to_string(), provider.clone());
        Ok(provider)
    }

    async fn signer_client(
        &self,
        network: &str,
    ) -> Result<Arc<SignerMiddleware<Provider<Http>, LocalWallet>>, ChainClientError> {
        let provider = self.provider_for(network).await?;
        let config = self.registry.network(network)?;
        let wallet = self.signer_key.clone().with_chain_id(config.chain_id);
        Ok(Arc::new(SignerMiddleware::new((*provider).clone(), wallet)))
    }

    fn settlement_contract(
        &self,
        network: &str,
        client: Arc<SignerMiddleware<Provider<Http>, LocalWallet>>,
    ) -> Result<SettlementContract<SignerMiddleware<Provider<Http>, LocalWallet>>, ChainClientError> {
        let config = self.registry.network(network)?;
        let address = Address::from_str(&config.contract_address).map_err(|err| ChainClientError::Decode {
            network: network.to_string(),
            source: err.into(),
        })?;
        Ok(SettlementContract::new(address, client))
    }

    fn token_address(&self, network: &str, symbol: &str) -> Result<Address, ChainClientError> {
        let raw = self.registry.token_address(network, symbol)?;
        Address::from_str(raw).map_err(|err| ChainClientError::Decode {
            network: network.to_string(),
            source: err.into(),
        })
    }
}

fn decimal_from_u256(value: U256, decimals: u32) -> Decimal {
    Decimal::from_str(&value.to_string())
        .unwrap_or(Decimal::ZERO)
        .checked_div(Decimal::from(10u64.pow(decimals)))
        .unwrap_or(Decimal::ZERO)
}

#[async_trait::async_trait]
impl ChainClient for EthersChainClient {
    async fn get_token_decimals(&self, network: &str, symbol: &str) -> Result<u32, ChainClientError> {
        let provider = self.provider_for(network).await?;
        let address = self.token_address(network, symbol)?;
        let erc20 = Erc20::new(address, Arc::new(provider.as_ref().clone()));

        match tokio::time::timeout(RPC_TIMEOUT, erc20.decimals().call()).await {
            Ok(Ok(decimals)) => Ok(decimals as u32),
            Ok(Err(err)) => {
                tracing::warn!(network, symbol, error = %err, "decimals() call failed, using fallback");
                Ok(TokenRegistry::decimals_fallback(symbol))
            }
            Err(_) => Err(ChainClientError::Timeout {
                network: network.to_string(),
            }),
        }
    }

    async fn check_escrow_balance(
        &self,
        network: &str,
        account: &str,
        token: &str,
    ) -> Result<EscrowBalance, ChainClientError> {
        let provider = self.provider_for(network).await?;
        let account_addr = Address::from_str(account).map_err(|err| ChainClientError::Decode {
            network: network.to_string(),
            source: err.into(),
        })?;
        let token_addr = self.token_address(network, token)?;
        let erc20 = Erc20::new(token_addr, Arc::new(provider.as_ref().clone()));
        let settlement_addr = Address::from_str(&self.registry.network(network)?.contract_address)
            .map_err(|err| ChainClientError::Decode {
                network: network.to_string(),
                source: err.into(),
            })?;
        let settlement = SettlementContract::new(settlement_addr, Arc::new(provider.as_ref().clone()));

        let total = tokio::time::timeout(RPC_TIMEOUT, erc20.balance_of(account_addr).call())
            .await
            .map_err(|_| ChainClientError::Timeout {
                network: network.to_string(),
            })?
            .map_err(|err| ChainClientError::RpcUnreachable {
                network: network.to_string(),
                source: err.into(),
            })?;
        let locked = tokio::time::timeout(
            RPC_TIMEOUT,
            settlement.locked_balance_of(account_addr, token_addr).call(),
        )
        .await
        .map_err(|_| ChainClientError::Timeout {
            network: network.to_string(),
        })?
        .map_err(|err| ChainClientError::RpcUnreachable {
            network: network.to_string(),
            source: err.into(),
        })?;

        let decimals = self.get_token_decimals(network, token).await?;
        Ok(EscrowBalance::new(
            decimal_from_u256(total, decimals),
            decimal_from_u256(locked, decimals),
        ))
    }

    async fn lock_escrow_for_order(
        &self,
        network: &str,
        account: &str,
        token: &str,
        amount: Decimal,
        order_id: u64,
    ) -> Result<(), ChainClientError> {
        let client = self.signer_client(network).await?;
        let settlement = self.settlement_contract(network, client)?;
        let token_addr = self.token_address(network, token)?;
        let account_addr = Address::from_str(account).map_err(|err| ChainClientError::Decode {
            network: network.to_string(),
            source: err.into(),
        })?;
        let decimals = self.get_token_decimals(network, token).await?;
        let raw = amount * Decimal::from(10u64.pow(decimals));
        let raw = U256::from_dec_str(&raw.trunc().to_string()).map_err(|err| ChainClientError::Decode {
            network: network.to_string(),
            source: err.into(),
        })?;
        let order_id_bytes = H256::from_low_u64_be(order_id).into();

        let pending = settlement
            .lock_escrow_for_order(account_addr, token_addr, raw, order_id_bytes)
            .send()
            .await
            .map_err(|err| ChainClientError::Revert {
                network: network.to_string(),
                reason: err.to_string(),
            })?;
        pending.await.map_err(|err| ChainClientError::RpcUnreachable {
            network: network.to_string(),
            source: err.into(),
        })?;
        Ok(())
    }

    async fn settle_cross_chain_trade(
        &self,
        network: &str,
        params: SettleParams,
    ) -> Result<SettleReceipt, ChainClientError> {
        let client = self.signer_client(network).await?;
        let settlement = self.settlement_contract(network, client)?;
        let token_addr = self.token_address(network, &params.token)?;
        let decimals = self.get_token_decimals(network, &params.token).await?;
        let raw = params.amount * Decimal::from(10u64.pow(decimals));
        let raw = U256::from_dec_str(&raw.trunc().to_string()).map_err(|err| ChainClientError::Decode {
            network: network.to_string(),
            source: err.into(),
        })?;
        let party1 = Address::from_str(&params.party1).map_err(|err| ChainClientError::Decode {
            network: network.to_string(),
            source: err.into(),
        })?;
        let party2 = Address::from_str(&params.party2).map_err(|err| ChainClientError::Decode {
            network: network.to_string(),
            source: err.into(),
        })?;

        let call = settlement.settle_trade(
            params.order_id.into(),
            party1,
            party2,
            token_addr,
            raw,
            params.nonce.into(),
            params.is_source_chain,
        );
        let pending = call.send().await.map_err(|err| ChainClientError::Revert {
            network: network.to_string(),
            reason: err.to_string(),
        })?;
        let receipt = pending.await.map_err(|err| ChainClientError::RpcUnreachable {
            network: network.to_string(),
            source: err.into(),
        })?;

        match receipt {
            Some(receipt) => Ok(SettleReceipt {
                tx_hash: format!("{:?}", receipt.transaction_hash),
                success: receipt.status == Some(1.into()),
            }),
            None => Err(ChainClientError::Timeout {
                network: network.to_string(),
            }),
        }
    }

    async fn get_user_nonce(&self, network: &str, account: &str) -> Result<u64, ChainClientError> {
        let provider = self.provider_for(network).await?;
        let account_addr = Address::from_str(account).map_err(|err| ChainClientError::Decode {
            network: network.to_string(),
            source: err.into(),
        })?;
        let settlement_addr = Address::from_str(&self.registry.network(network)?.contract_address)
            .map_err(|err| ChainClientError::Decode {
                network: network.to_string(),
                source: err.into(),
            })?;
        let settlement = SettlementContract::new(settlement_addr, Arc::new(provider.as_ref().clone()));
        let nonce = tokio::time::timeout(RPC_TIMEOUT, settlement.nonces(account_addr).call())
            .await
            .map_err(|_| ChainClientError::Timeout {
                network: network.to_string(),
            })?
            .map_err(|err| ChainClientError::RpcUnreachable {
                network: network.to_string(),
                source: err.into(),
            })?;
        Ok(nonce.as_u64())
    }

    async fn get_contract_owner(&self, network: &str) -> Result<String, ChainClientError> {
        let provider = self.provider_for(network).await?;
        let settlement_addr = Address::from_str(&self.registry.network(network)?.contract_address)
            .map_err(|err| ChainClientError::Decode {
                network: network.to_string(),
                source: err.into(),
            })?;
        let settlement = SettlementContract::new(settlement_addr, Arc::new(provider.as_ref().clone()));
        let owner = tokio::time::timeout(RPC_TIMEOUT, settlement.owner().call())
            .await
            .map_err(|_| ChainClientError::Timeout {
                network: network.to_string(),
            })?
            .map_err(|err| ChainClientError::RpcUnreachable {
                network: network.to_string(),
                source: err.into(),
            })?;
        Ok(format!("{owner:?}"))
    }

    async fn get_signer_address(&self, network: &str) -> Result<String, ChainClientError> {
        let config = self.registry.network(network)?;
        let wallet = self.signer_key.clone().with_chain_id(config.chain_id);
        Ok(format!("{:?}", wallet.address()))
    }

    async fn mint_token(
        &self,
        network: &str,
        account: &str,
        token: &str,
        amount: Decimal,
    ) -> Result<(), ChainClientError> {
        let client = self.signer_client(network).await?;
        let settlement = self.settlement_contract(network, client)?;
        let token_addr = self.token_address(network, token)?;
        let account_addr = Address::from_str(account).map_err(|err| ChainClientError::Decode {
            network: network.to_string(),
            source: err.into(),
        })?;
        let decimals = self.get_token_decimals(network, token).await?;
        let raw = amount * Decimal::from(10u64.pow(decimals));
        let raw = U256::from_dec_str(&raw.trunc().to_string()).map_err(|err| ChainClientError::Decode {
            network: network.to_string(),
            source: err.into(),
        })?;

        let pending = settlement
            .mint(token_addr, account_addr, raw)
            .send()
            .await
            .map_err(|err| ChainClientError::Revert {
                network: network.to_string(),
                reason: err.to_string(),
            })?;
        pending.await.map_err(|err| ChainClientError::RpcUnreachable {
            network: network.to_string(),
            source: err.into(),
        })?;
        Ok(())
    }
}
