//! Read-only accessors used by orchestrators and relayers.

use crate::claims::Attestation;
use crate::pallet::*;
use crate::types::{
	BatchConfirm, EthAddress, LogicCallConfirm, OutgoingLogicCall, OutgoingTxBatch, Valset,
	ValsetConfirm,
};
use sp_std::prelude::*;

impl<T: Config> Pallet<T> {
	pub fn valset_request(nonce: u64) -> Option<Valset> {
		Valsets::<T>::get(nonce)
	}

	/// Up to `count` stored valsets, newest first.
	pub fn last_valset_requests(count: usize) -> Vec<Valset> {
		let mut valsets: Vec<Valset> = Valsets::<T>::iter_values().collect();
		valsets.sort_by(|a, b| b.nonce.cmp(&a.nonce));
		valsets.truncate(count);
		valsets
	}

	pub fn valset_confirms(nonce: u64) -> Vec<ValsetConfirm<T::AccountId>> {
		ValsetConfirms::<T>::iter_prefix_values(nonce).collect()
	}

	/// Stored valsets the orchestrator's validator has not signed yet, oldest first.
	pub fn pending_valset_requests(orchestrator: &T::AccountId) -> Vec<Valset> {
		let Some(validator) = ValidatorByOrchestrator::<T>::get(orchestrator) else {
			return Vec::new();
		};
		let mut pending: Vec<Valset> = Valsets::<T>::iter_values()
			.filter(|valset| !ValsetConfirms::<T>::contains_key(valset.nonce, &validator))
			.collect();
		pending.sort_by_key(|valset| valset.nonce);
		pending
	}

	pub fn pending_batches(orchestrator: &T::AccountId) -> Vec<OutgoingTxBatch<T::AccountId>> {
		let Some(validator) = ValidatorByOrchestrator::<T>::get(orchestrator) else {
			return Vec::new();
		};
		let mut pending: Vec<OutgoingTxBatch<T::AccountId>> = OutgoingTxBatches::<T>::iter_values()
			.filter(|batch| {
				!BatchConfirms::<T>::contains_key(
					(batch.token_contract, batch.batch_nonce),
					&validator,
				)
			})
			.collect();
		pending.sort_by_key(|batch| batch.batch_nonce);
		pending
	}

	pub fn pending_logic_calls(orchestrator: &T::AccountId) -> Vec<OutgoingLogicCall> {
		let Some(validator) = ValidatorByOrchestrator::<T>::get(orchestrator) else {
			return Vec::new();
		};
		let mut pending: Vec<OutgoingLogicCall> = OutgoingLogicCalls::<T>::iter_values()
			.filter(|call| {
				!LogicCallConfirms::<T>::contains_key(
					(call.invalidation_id.clone(), call.invalidation_nonce),
					&validator,
				)
			})
			.collect();
		pending.sort_by(|a, b| {
			(a.block, &a.invalidation_id, a.invalidation_nonce)
				.cmp(&(b.block, &b.invalidation_id, b.invalidation_nonce))
		});
		pending
	}

	pub fn batch(token_contract: EthAddress, nonce: u64) -> Option<OutgoingTxBatch<T::AccountId>> {
		OutgoingTxBatches::<T>::get(token_contract, nonce)
	}

	/// Up to `count` outstanding batches across all tokens, newest first.
	pub fn last_batches(count: usize) -> Vec<OutgoingTxBatch<T::AccountId>> {
		let mut batches: Vec<OutgoingTxBatch<T::AccountId>> =
			OutgoingTxBatches::<T>::iter_values().collect();
		batches.sort_by(|a, b| b.batch_nonce.cmp(&a.batch_nonce));
		batches.truncate(count);
		batches
	}

	pub fn batch_confirms(
		token_contract: EthAddress,
		nonce: u64,
	) -> Vec<BatchConfirm<T::AccountId>> {
		BatchConfirms::<T>::iter_prefix_values((token_contract, nonce)).collect()
	}

	pub fn logic_call_confirms(
		invalidation_id: Vec<u8>,
		invalidation_nonce: u64,
	) -> Vec<LogicCallConfirm<T::AccountId>> {
		LogicCallConfirms::<T>::iter_prefix_values((invalidation_id, invalidation_nonce)).collect()
	}

	pub fn denom_to_erc20(denom: &[u8]) -> Option<(bool, EthAddress)> {
		Self::denom_to_erc20_lookup(denom).ok()
	}

	pub fn erc20_to_denom(token_contract: &EthAddress) -> (bool, Vec<u8>) {
		Self::erc20_to_denom_lookup(token_contract)
	}

	pub fn attestations_at(event_nonce: u64) -> Vec<Attestation<T::AccountId>> {
		Attestations::<T>::iter_prefix_values(event_nonce).collect()
	}
}
