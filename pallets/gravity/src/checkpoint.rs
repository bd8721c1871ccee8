//! Ethereum-verifiable checkpoints and signature recovery.
//!
//! A checkpoint is the Keccak-256 of the contract-ABI encoding of the arguments the bridge
//! contract hashes on its side, without the function selector. Every layout below is a
//! separate contract with the Solidity code and must not be changed independently of it.

use crate::types::{EthAddress, EthereumSigned, OutgoingLogicCall, OutgoingTxBatch, Valset};
use ethabi::Token;
use sp_core::{H160, H256};
use sp_io::hashing::keccak_256;
use sp_runtime::RuntimeDebug;
use sp_std::prelude::*;

const VALSET_METHOD: &[u8] = b"checkpoint";
const BATCH_METHOD: &[u8] = b"transactionBatch";
const LOGIC_CALL_METHOD: &[u8] = b"logicCall";

const ETH_SIGNED_MESSAGE_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n32";

#[derive(Clone, Copy, Eq, PartialEq, RuntimeDebug)]
pub enum CheckpointError {
	/// The gravity id does not fit in a `bytes32`.
	GravityIdTooLong,
	/// The invalidation id does not fit in a `bytes32`.
	InvalidationIdTooLong,
}

#[derive(Clone, Copy, Eq, PartialEq, RuntimeDebug)]
pub enum SignatureError {
	/// Signatures are exactly 65 bytes: r, s and the recovery id.
	InvalidLength,
	InvalidRecoveryId,
	RecoveryFailed,
	/// Recovered a signer other than the expected address.
	AddressMismatch,
}

fn bytes32(data: &[u8]) -> Option<Token> {
	if data.len() > 32 {
		return None;
	}
	let mut word = [0u8; 32];
	word[..data.len()].copy_from_slice(data);
	Some(Token::FixedBytes(word.to_vec()))
}

fn gravity_id_token(gravity_id: &[u8]) -> Result<Token, CheckpointError> {
	bytes32(gravity_id).ok_or(CheckpointError::GravityIdTooLong)
}

fn address(addr: &EthAddress) -> Token {
	Token::Address(ethabi::Address::from_slice(addr.as_bytes()))
}

fn uint(value: u128) -> Token {
	Token::Uint(ethabi::Uint::from(value))
}

fn uint64(value: u64) -> Token {
	Token::Uint(ethabi::Uint::from(value))
}

fn keccak(encoded: &[u8]) -> H256 {
	H256(keccak_256(encoded))
}

/// ABI encoding hashed by `valset_checkpoint`.
pub fn encode_valset(valset: &Valset, gravity_id: &[u8]) -> Result<Vec<u8>, CheckpointError> {
	let (validators, powers): (Vec<Token>, Vec<Token>) = valset
		.members
		.iter()
		.map(|m| (address(&m.ethereum_address), uint64(m.power)))
		.unzip();

	Ok(ethabi::encode(&[
		gravity_id_token(gravity_id)?,
		bytes32(VALSET_METHOD).ok_or(CheckpointError::GravityIdTooLong)?,
		uint64(valset.nonce),
		Token::Array(validators),
		Token::Array(powers),
		uint(valset.reward_amount),
		address(&valset.reward_token),
	]))
}

pub fn valset_checkpoint(valset: &Valset, gravity_id: &[u8]) -> Result<H256, CheckpointError> {
	encode_valset(valset, gravity_id).map(|encoded| keccak(&encoded))
}

/// ABI encoding hashed by `batch_checkpoint`.
pub fn encode_batch<AccountId>(
	batch: &OutgoingTxBatch<AccountId>,
	gravity_id: &[u8],
) -> Result<Vec<u8>, CheckpointError> {
	let mut amounts = Vec::with_capacity(batch.transactions.len());
	let mut destinations = Vec::with_capacity(batch.transactions.len());
	let mut fees = Vec::with_capacity(batch.transactions.len());
	for tx in &batch.transactions {
		amounts.push(uint(tx.erc20_token.amount));
		destinations.push(address(&tx.dest_address));
		fees.push(uint(tx.erc20_fee.amount));
	}

	Ok(ethabi::encode(&[
		gravity_id_token(gravity_id)?,
		bytes32(BATCH_METHOD).ok_or(CheckpointError::GravityIdTooLong)?,
		Token::Array(amounts),
		Token::Array(destinations),
		Token::Array(fees),
		uint64(batch.batch_nonce),
		address(&batch.token_contract),
		uint64(batch.batch_timeout),
	]))
}

pub fn batch_checkpoint<AccountId>(
	batch: &OutgoingTxBatch<AccountId>,
	gravity_id: &[u8],
) -> Result<H256, CheckpointError> {
	encode_batch(batch, gravity_id).map(|encoded| keccak(&encoded))
}

/// ABI encoding hashed by `logic_call_checkpoint`.
pub fn encode_logic_call(
	call: &OutgoingLogicCall,
	gravity_id: &[u8],
) -> Result<Vec<u8>, CheckpointError> {
	let (transfer_amounts, transfer_tokens): (Vec<Token>, Vec<Token>) =
		call.transfers.iter().map(|t| (uint(t.amount), address(&t.contract))).unzip();
	let (fee_amounts, fee_tokens): (Vec<Token>, Vec<Token>) =
		call.fees.iter().map(|t| (uint(t.amount), address(&t.contract))).unzip();
	let invalidation_id =
		bytes32(&call.invalidation_id).ok_or(CheckpointError::InvalidationIdTooLong)?;

	Ok(ethabi::encode(&[
		gravity_id_token(gravity_id)?,
		bytes32(LOGIC_CALL_METHOD).ok_or(CheckpointError::GravityIdTooLong)?,
		Token::Array(transfer_amounts),
		Token::Array(transfer_tokens),
		Token::Array(fee_amounts),
		Token::Array(fee_tokens),
		address(&call.logic_contract_address),
		Token::Bytes(call.payload.clone()),
		uint64(call.timeout),
		invalidation_id,
		uint64(call.invalidation_nonce),
	]))
}

pub fn logic_call_checkpoint(
	call: &OutgoingLogicCall,
	gravity_id: &[u8],
) -> Result<H256, CheckpointError> {
	encode_logic_call(call, gravity_id).map(|encoded| keccak(&encoded))
}

impl<AccountId> EthereumSigned<AccountId> {
	pub fn checkpoint(&self, gravity_id: &[u8]) -> Result<H256, CheckpointError> {
		match self {
			Self::Valset(valset) => valset_checkpoint(valset, gravity_id),
			Self::Batch(batch) => batch_checkpoint(batch, gravity_id),
			Self::LogicCall(call) => logic_call_checkpoint(call, gravity_id),
		}
	}
}

/// Digest the bridge contract verifies: the checkpoint under the Ethereum signed-message
/// prefix.
pub fn eth_signed_message_hash(checkpoint: &H256) -> [u8; 32] {
	let mut message = Vec::with_capacity(ETH_SIGNED_MESSAGE_PREFIX.len() + 32);
	message.extend_from_slice(ETH_SIGNED_MESSAGE_PREFIX);
	message.extend_from_slice(checkpoint.as_bytes());
	keccak_256(&message)
}

/// Recovers the Ethereum address that produced `signature` over `checkpoint`.
///
/// The recovery id may be given raw (0, 1) or Ethereum-style (27, 28).
pub fn eth_address_from_signature(
	checkpoint: &H256,
	signature: &[u8],
) -> Result<EthAddress, SignatureError> {
	let mut sig: [u8; 65] = signature.try_into().map_err(|_| SignatureError::InvalidLength)?;
	if sig[64] >= 27 {
		sig[64] -= 27;
	}
	if sig[64] > 1 {
		return Err(SignatureError::InvalidRecoveryId);
	}

	let digest = eth_signed_message_hash(checkpoint);
	let public = sp_io::crypto::secp256k1_ecdsa_recover(&sig, &digest)
		.map_err(|_| SignatureError::RecoveryFailed)?;
	Ok(H160::from_slice(&keccak_256(&public)[12..]))
}

pub fn verify_signature(
	checkpoint: &H256,
	signature: &[u8],
	expected: &EthAddress,
) -> Result<(), SignatureError> {
	let signer = eth_address_from_signature(checkpoint, signature)?;
	if &signer != expected {
		return Err(SignatureError::AddressMismatch);
	}
	Ok(())
}
