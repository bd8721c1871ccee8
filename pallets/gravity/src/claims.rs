//! Ethereum events reported by orchestrators and the votes collected on them.

use crate::types::{BridgeValidator, BridgeValidators, EthAddress, ZERO_ADDRESS};
use codec::{Decode, Encode};
use scale_info::TypeInfo;
use sp_core::H256;
use sp_runtime::RuntimeDebug;
use sp_std::prelude::*;

#[derive(Clone, Copy, Encode, Decode, Eq, PartialEq, RuntimeDebug, TypeInfo)]
pub enum ClaimType {
	SendToCosmos,
	BatchSendToEth,
	Erc20Deployed,
	LogicCallExecuted,
	ValsetUpdated,
}

/// Tokens locked in the Ethereum contract for a host-chain receiver.
#[derive(Clone, Encode, Decode, Eq, PartialEq, RuntimeDebug, TypeInfo)]
pub struct SendToCosmosClaim<AccountId> {
	pub event_nonce: u64,
	pub eth_block_height: u64,
	pub token_contract: EthAddress,
	pub amount: u128,
	pub ethereum_sender: EthAddress,
	pub cosmos_receiver: AccountId,
}

/// An outgoing batch was executed on Ethereum.
#[derive(Clone, Encode, Decode, Eq, PartialEq, RuntimeDebug, TypeInfo)]
pub struct BatchSendToEthClaim {
	pub event_nonce: u64,
	pub eth_block_height: u64,
	pub batch_nonce: u64,
	pub token_contract: EthAddress,
}

/// An ERC20 representing a host-chain denom was deployed through the bridge contract.
#[derive(Clone, Encode, Decode, Eq, PartialEq, RuntimeDebug, TypeInfo)]
pub struct Erc20DeployedClaim {
	pub event_nonce: u64,
	pub eth_block_height: u64,
	pub cosmos_denom: Vec<u8>,
	pub token_contract: EthAddress,
	pub name: Vec<u8>,
	pub symbol: Vec<u8>,
	pub decimals: u64,
}

#[derive(Clone, Encode, Decode, Eq, PartialEq, RuntimeDebug, TypeInfo)]
pub struct LogicCallExecutedClaim {
	pub event_nonce: u64,
	pub eth_block_height: u64,
	pub invalidation_id: Vec<u8>,
	pub invalidation_nonce: u64,
}

/// The Ethereum contract switched to a new validator set.
#[derive(Clone, Encode, Decode, Eq, PartialEq, RuntimeDebug, TypeInfo)]
pub struct ValsetUpdatedClaim {
	pub event_nonce: u64,
	pub valset_nonce: u64,
	pub eth_block_height: u64,
	pub members: Vec<BridgeValidator>,
	pub reward_amount: u128,
	pub reward_token: EthAddress,
}

#[derive(Clone, Encode, Decode, Eq, PartialEq, RuntimeDebug, TypeInfo)]
pub enum EthereumClaim<AccountId> {
	SendToCosmos(SendToCosmosClaim<AccountId>),
	BatchSendToEth(BatchSendToEthClaim),
	Erc20Deployed(Erc20DeployedClaim),
	LogicCallExecuted(LogicCallExecutedClaim),
	ValsetUpdated(ValsetUpdatedClaim),
}

impl<AccountId: Encode> EthereumClaim<AccountId> {
	pub fn event_nonce(&self) -> u64 {
		match self {
			Self::SendToCosmos(c) => c.event_nonce,
			Self::BatchSendToEth(c) => c.event_nonce,
			Self::Erc20Deployed(c) => c.event_nonce,
			Self::LogicCallExecuted(c) => c.event_nonce,
			Self::ValsetUpdated(c) => c.event_nonce,
		}
	}

	pub fn eth_block_height(&self) -> u64 {
		match self {
			Self::SendToCosmos(c) => c.eth_block_height,
			Self::BatchSendToEth(c) => c.eth_block_height,
			Self::Erc20Deployed(c) => c.eth_block_height,
			Self::LogicCallExecuted(c) => c.eth_block_height,
			Self::ValsetUpdated(c) => c.eth_block_height,
		}
	}

	pub fn claim_type(&self) -> ClaimType {
		match self {
			Self::SendToCosmos(_) => ClaimType::SendToCosmos,
			Self::BatchSendToEth(_) => ClaimType::BatchSendToEth,
			Self::Erc20Deployed(_) => ClaimType::Erc20Deployed,
			Self::LogicCallExecuted(_) => ClaimType::LogicCallExecuted,
			Self::ValsetUpdated(_) => ClaimType::ValsetUpdated,
		}
	}

	/// Identifies the claim by content so identical reports from different validators
	/// vote on the same attestation.
	pub fn claim_hash(&self) -> H256 {
		H256(sp_io::hashing::blake2_256(&self.encode()))
	}

	pub fn validate_basic(&self) -> Result<(), &'static str> {
		if self.event_nonce() == 0 {
			return Err("event nonce must be positive");
		}
		match self {
			Self::SendToCosmos(c) => {
				if c.token_contract == ZERO_ADDRESS {
					return Err("zero token contract");
				}
				if c.amount == 0 {
					return Err("zero deposit amount");
				}
			},
			Self::BatchSendToEth(c) => {
				if c.token_contract == ZERO_ADDRESS {
					return Err("zero token contract");
				}
				if c.batch_nonce == 0 {
					return Err("batch nonce must be positive");
				}
			},
			Self::Erc20Deployed(c) => {
				if c.cosmos_denom.is_empty() {
					return Err("empty denom");
				}
				if c.token_contract == ZERO_ADDRESS {
					return Err("zero token contract");
				}
			},
			Self::LogicCallExecuted(c) => {
				if c.invalidation_id.len() > 32 {
					return Err("invalidation id longer than 32 bytes");
				}
			},
			Self::ValsetUpdated(c) => {
				BridgeValidators(c.members.clone())
					.validate_basic()
					.map_err(|_| "malformed valset members")?;
			},
		}
		Ok(())
	}
}

/// Votes of validators that reported the same claim at the same event nonce.
#[derive(Clone, Encode, Decode, Eq, PartialEq, RuntimeDebug, TypeInfo)]
pub struct Attestation<AccountId> {
	/// Set once the votes reach the threshold; the claim has been applied.
	pub observed: bool,
	/// Validators (not orchestrators) in submission order.
	pub votes: Vec<AccountId>,
	/// Host block of the first vote.
	pub height: u64,
	pub claim: EthereumClaim<AccountId>,
}
