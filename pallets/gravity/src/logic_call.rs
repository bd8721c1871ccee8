//! Arbitrary contract calls executed through the bridge contract.
//!
//! Calls are produced by other runtime modules; a call is identified by its invalidation
//! id and nonce, and executing one on Ethereum invalidates every lower nonce of that id.

use crate::checkpoint;
use crate::pallet::*;
use crate::types::{LogicCallConfirm, OutgoingLogicCall};
use crate::LOG_TARGET;
use frame_support::{ensure, pallet_prelude::DispatchResult};
use sp_std::prelude::*;

impl<T: Config> Pallet<T> {
	/// Stores a call for validators to sign. The call's block is set to the current one.
	pub fn set_outgoing_logic_call(mut call: OutgoingLogicCall) -> DispatchResult {
		ensure!(
			!OutgoingLogicCalls::<T>::contains_key(&call.invalidation_id, call.invalidation_nonce),
			Error::<T>::DuplicateLogicCall
		);
		call.block = Self::block_height();
		let gravity_id = GravityParams::<T>::get().gravity_id;
		let checkpoint =
			checkpoint::logic_call_checkpoint(&call, &gravity_id).map_err(Error::<T>::from)?;
		Self::archive_checkpoint(checkpoint);

		OutgoingLogicCalls::<T>::insert(&call.invalidation_id, call.invalidation_nonce, &call);
		Self::deposit_event(Event::OutgoingLogicCallCreated {
			invalidation_id: call.invalidation_id,
			invalidation_nonce: call.invalidation_nonce,
		});
		Ok(())
	}

	pub fn cancel_outgoing_logic_call(
		invalidation_id: &[u8],
		invalidation_nonce: u64,
	) -> DispatchResult {
		ensure!(
			OutgoingLogicCalls::<T>::contains_key(invalidation_id, invalidation_nonce),
			Error::<T>::UnknownLogicCall
		);
		Self::delete_logic_call(invalidation_id, invalidation_nonce);
		Self::deposit_event(Event::OutgoingLogicCallCancelled {
			invalidation_id: invalidation_id.to_vec(),
			invalidation_nonce,
		});
		Ok(())
	}

	fn delete_logic_call(invalidation_id: &[u8], invalidation_nonce: u64) {
		OutgoingLogicCalls::<T>::remove(invalidation_id, invalidation_nonce);
		let _ = LogicCallConfirms::<T>::clear_prefix(
			(invalidation_id.to_vec(), invalidation_nonce),
			u32::MAX,
			None,
		);
	}

	pub(crate) fn outgoing_logic_call_executed(
		invalidation_id: &[u8],
		invalidation_nonce: u64,
	) -> DispatchResult {
		if !OutgoingLogicCalls::<T>::contains_key(invalidation_id, invalidation_nonce) {
			panic!(
				"executed logic call {:?}/{} is unknown",
				invalidation_id, invalidation_nonce
			);
		}

		let superseded: Vec<u64> = OutgoingLogicCalls::<T>::iter_key_prefix(invalidation_id)
			.filter(|nonce| *nonce < invalidation_nonce)
			.collect();
		for nonce in superseded {
			Self::delete_logic_call(invalidation_id, nonce);
		}
		Self::delete_logic_call(invalidation_id, invalidation_nonce);

		Self::deposit_event(Event::OutgoingLogicCallExecuted {
			invalidation_id: invalidation_id.to_vec(),
			invalidation_nonce,
		});
		Ok(())
	}

	/// Cancels calls whose timeout is below the last observed Ethereum height.
	pub(crate) fn cleanup_timed_out_logic_calls() {
		let observed = LastObservedEthereumHeight::<T>::get().ethereum_block_height;
		let mut expired: Vec<(Vec<u8>, u64)> = OutgoingLogicCalls::<T>::iter()
			.filter(|(_, _, call)| call.timeout < observed)
			.map(|(invalidation_id, nonce, _)| (invalidation_id, nonce))
			.collect();
		expired.sort();

		for (invalidation_id, nonce) in expired {
			if let Err(error) = Self::cancel_outgoing_logic_call(&invalidation_id, nonce) {
				log::error!(target: LOG_TARGET, "failed to cancel logic call: {:?}", error);
			}
		}
	}

	pub(crate) fn add_logic_call_confirm(
		orchestrator: T::AccountId,
		invalidation_id: Vec<u8>,
		invalidation_nonce: u64,
		signature: Vec<u8>,
	) -> DispatchResult {
		let call = OutgoingLogicCalls::<T>::get(&invalidation_id, invalidation_nonce)
			.ok_or(Error::<T>::UnknownLogicCall)?;
		let (validator, eth_signer) = Self::signing_validator(&orchestrator)?;
		let key = (invalidation_id.clone(), invalidation_nonce);
		ensure!(
			!LogicCallConfirms::<T>::contains_key(&key, &validator),
			Error::<T>::DuplicateConfirmation
		);

		let gravity_id = GravityParams::<T>::get().gravity_id;
		let checkpoint =
			checkpoint::logic_call_checkpoint(&call, &gravity_id).map_err(Error::<T>::from)?;
		checkpoint::verify_signature(&checkpoint, &signature, &eth_signer)
			.map_err(|_| Error::<T>::InvalidSignature)?;

		LogicCallConfirms::<T>::insert(
			&key,
			&validator,
			LogicCallConfirm {
				invalidation_id: invalidation_id.clone(),
				invalidation_nonce,
				orchestrator,
				eth_signer,
				signature,
			},
		);
		Self::deposit_event(Event::LogicCallConfirmed {
			invalidation_id,
			invalidation_nonce,
			validator,
		});
		Ok(())
	}
}
