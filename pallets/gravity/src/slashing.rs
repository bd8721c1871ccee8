//! Punishment of validators that withhold or forge Ethereum signatures.

use crate::checkpoint;
use crate::pallet::*;
use crate::traits::{SlashingKeeper, StakingKeeper, ValidatorInfo};
use crate::types::{EthereumSigned, OutgoingLogicCall, OutgoingTxBatch, Params, SlashReason, Valset};
use crate::LOG_TARGET;
use codec::Encode;
use frame_support::{ensure, pallet_prelude::DispatchResult, traits::UnixTime};
use sp_core::H256;
use sp_runtime::Perbill;
use sp_std::prelude::*;

impl<T: Config> Pallet<T> {
	pub(crate) fn slashing() {
		let params = GravityParams::<T>::get();
		Self::valset_slashing(&params);
		Self::batch_slashing(&params);
		Self::logic_call_slashing(&params);
	}

	/// Host height below which artifacts have been signable for a full window, if any.
	fn slashing_cutoff(window: u64) -> Option<u64> {
		let now = Self::block_height();
		(now > window).then(|| now - window)
	}

	fn valset_slashing(params: &Params) {
		let Some(max_height) = Self::slashing_cutoff(params.signed_valsets_window) else { return };
		let last_slashed = LastSlashedValsetNonce::<T>::get();
		let mut unslashed: Vec<Valset> = Valsets::<T>::iter_values()
			.filter(|valset| valset.nonce > last_slashed && valset.height < max_height)
			.collect();
		if unslashed.is_empty() {
			return;
		}
		unslashed.sort_by_key(|valset| valset.nonce);

		let bonded = T::StakingKeeper::bonded_validators_by_power();
		let now_ms = T::UnixTime::now().as_millis() as u64;
		let unbonding_until = now_ms.saturating_add(T::StakingKeeper::unbonding_time());
		let unbonding = T::StakingKeeper::validator_queue(unbonding_until, Self::block_height());

		for valset in unslashed {
			for validator in &bonded {
				if Self::valset_signer_started_before(&validator.operator, &valset) &&
					!ValsetConfirms::<T>::contains_key(valset.nonce, &validator.operator)
				{
					Self::slash_and_jail(
						validator,
						params.slash_fraction_valset,
						SlashReason::MissingValsetConfirm,
					);
				}
			}

			// validators that left recently still owe signatures on sets they were part of
			for operator in &unbonding {
				let Some(validator) = T::StakingKeeper::validator(operator) else { continue };
				let window_end = validator
					.unbonding_height
					.saturating_add(params.unbond_slashing_valsets_window);
				let within_window = valset.height < window_end;
				if within_window &&
					Self::valset_signer_started_before(operator, &valset) &&
					!ValsetConfirms::<T>::contains_key(valset.nonce, operator)
				{
					Self::slash_and_jail(
						&validator,
						params.slash_fraction_valset,
						SlashReason::MissingValsetConfirm,
					);
				}
			}

			LastSlashedValsetNonce::<T>::put(valset.nonce);
		}
	}

	fn valset_signer_started_before(operator: &T::AccountId, valset: &Valset) -> bool {
		T::SlashingKeeper::validator_signing_info(operator)
			.map_or(false, |info| info.start_height < valset.height)
	}

	/// Validators with no signing info, or that started signing after `block`, are never
	/// expected to have signed an artifact created at `block`.
	fn expected_to_sign(operator: &T::AccountId, block: u64) -> bool {
		T::SlashingKeeper::validator_signing_info(operator)
			.map_or(false, |info| info.start_height <= block)
	}

	fn batch_slashing(params: &Params) {
		let Some(max_height) = Self::slashing_cutoff(params.signed_batches_window) else { return };
		let last_slashed = LastSlashedBatchBlock::<T>::get();
		let mut unslashed: Vec<OutgoingTxBatch<T::AccountId>> =
			OutgoingTxBatches::<T>::iter_values()
				.filter(|batch| batch.block > last_slashed && batch.block < max_height)
				.collect();
		if unslashed.is_empty() {
			return;
		}
		unslashed.sort_by_key(|batch| (batch.block, batch.batch_nonce));

		let bonded = T::StakingKeeper::bonded_validators_by_power();
		for batch in unslashed {
			let key = (batch.token_contract, batch.batch_nonce);
			for validator in &bonded {
				if Self::expected_to_sign(&validator.operator, batch.block) &&
					!BatchConfirms::<T>::contains_key(key, &validator.operator)
				{
					Self::slash_and_jail(
						validator,
						params.slash_fraction_batch,
						SlashReason::MissingBatchConfirm,
					);
				}
			}
			LastSlashedBatchBlock::<T>::put(batch.block);
		}
	}

	fn logic_call_slashing(params: &Params) {
		let Some(max_height) = Self::slashing_cutoff(params.signed_logic_calls_window) else {
			return
		};
		let last_slashed = LastSlashedLogicCallBlock::<T>::get();
		let mut unslashed: Vec<OutgoingLogicCall> = OutgoingLogicCalls::<T>::iter_values()
			.filter(|call| call.block > last_slashed && call.block < max_height)
			.collect();
		if unslashed.is_empty() {
			return;
		}
		unslashed.sort_by(|a, b| {
			(a.block, &a.invalidation_id, a.invalidation_nonce)
				.cmp(&(b.block, &b.invalidation_id, b.invalidation_nonce))
		});

		let bonded = T::StakingKeeper::bonded_validators_by_power();
		for call in unslashed {
			let key = (call.invalidation_id.clone(), call.invalidation_nonce);
			for validator in &bonded {
				if Self::expected_to_sign(&validator.operator, call.block) &&
					!LogicCallConfirms::<T>::contains_key(&key, &validator.operator)
				{
					Self::slash_and_jail(
						validator,
						params.slash_fraction_logic_call,
						SlashReason::MissingLogicCallConfirm,
					);
				}
			}
			LastSlashedLogicCallBlock::<T>::put(call.block);
		}
	}

	fn slash_and_jail(
		validator: &ValidatorInfo<T::AccountId>,
		fraction: Perbill,
		reason: SlashReason,
	) {
		let operator = &validator.operator;
		T::StakingKeeper::slash(operator, Self::block_height(), validator.power, fraction);
		// the cached info may predate a jail earlier in this block
		let jailed = T::StakingKeeper::validator(operator).map_or(validator.jailed, |v| v.jailed);
		if !jailed {
			T::StakingKeeper::jail(operator);
		}

		log::info!(target: LOG_TARGET, "slashed validator {:?}: {:?}", operator, reason);
		Self::deposit_event(Event::ValidatorSlashed {
			validator: operator.clone(),
			reason,
			fraction,
		});
	}

	/// Slashes the validator whose Ethereum key signed `subject` when this chain never
	/// produced it.
	pub(crate) fn check_bad_signature_evidence(
		subject: EthereumSigned<T::AccountId>,
		signature: Vec<u8>,
	) -> DispatchResult {
		let params = GravityParams::<T>::get();
		let checkpoint = subject.checkpoint(&params.gravity_id).map_err(Error::<T>::from)?;
		ensure!(
			!PastEthSignatureCheckpoints::<T>::get(checkpoint),
			Error::<T>::CheckpointExists
		);

		let evidence_hash = H256(sp_io::hashing::blake2_256(&(checkpoint, &signature).encode()));
		ensure!(!PastEvidence::<T>::get(evidence_hash), Error::<T>::DuplicateEvidence);

		let signer = checkpoint::eth_address_from_signature(&checkpoint, &signature)
			.map_err(|_| Error::<T>::InvalidSignature)?;
		let operator = ValidatorByEthAddress::<T>::get(signer).ok_or_else(|| {
			log::warn!(target: LOG_TARGET, "evidence signer {:?} is not a validator", signer);
			Error::<T>::UnknownValidator
		})?;
		let validator =
			T::StakingKeeper::validator(&operator).ok_or(Error::<T>::UnknownValidator)?;

		PastEvidence::<T>::insert(evidence_hash, true);
		Self::slash_and_jail(
			&validator,
			params.slash_fraction_bad_eth_signature,
			SlashReason::BadEthSignature,
		);
		Ok(())
	}
}
