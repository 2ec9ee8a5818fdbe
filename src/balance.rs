use ethers::providers::Middleware;
use ethers::types::{Address, U256};
use ethers::utils::format_ether;
use tracing::{info, warn};

pub struct BalanceCheck {
    pub valid: bool,
    pub available: U256,
    pub value: U256,
    pub gas_cost: U256,
}

impl BalanceCheck {
    pub fn new(available: U256, value: U256, gas_cost: U256) -> Self {
        Self {
            valid: available >= value.saturating_add(gas_cost),
            available,
            value,
            gas_cost,
        }
    }

    pub fn required(&self) -> U256 {
        self.value.saturating_add(self.gas_cost)
    }
}

pub async fn get_native_balance<M: Middleware>(client: &M, address: Address) -> Result<U256, M::Error> {
    client.get_balance(address, None).await
}

/// Checks `available` covers the swap value plus `gas_cost` (gas limit times gas price).
pub fn validate_buy_balance(available: U256, value: U256, gas_cost: U256) -> BalanceCheck {
    let check = BalanceCheck::new(available, value, gas_cost);
    if check.valid {
        info!(
            "ETH balance: {} (spending {} + up to {} gas)",
            format_ether(available),
            format_ether(value),
            format_ether(gas_cost)
        );
    } else {
        warn!(
            "Insufficient balance: required={} (value {} + gas {}) available={}",
            format_ether(check.required()),
            format_ether(value),
            format_ether(gas_cost),
            format_ether(available)
        );
    }
    check
}
