//! Withdrawal pool and the batches built from it.

use crate::checkpoint;
use crate::pallet::*;
use crate::traits::BankKeeper;
use crate::types::{
	BatchConfirm, Coin, Erc20Token, EthAddress, OutgoingTransferTx, OutgoingTxBatch, ZERO_ADDRESS,
};
use crate::LOG_TARGET;
use frame_support::{
	ensure,
	pallet_prelude::{DispatchError, DispatchResult},
	storage::{with_transaction, TransactionOutcome},
};
use sp_std::prelude::*;

impl<T: Config> Pallet<T> {
	/// Escrows `amount + fee` from the sender and queues the withdrawal. Vouchers of
	/// Ethereum-originated tokens are burned, host denoms stay locked in the module account.
	pub(crate) fn add_to_outgoing_pool(
		sender: T::AccountId,
		dest_address: EthAddress,
		amount: Coin,
		fee: Coin,
	) -> Result<u64, DispatchError> {
		ensure!(dest_address != ZERO_ADDRESS, Error::<T>::InvalidEthAddress);
		ensure!(amount.denom == fee.denom, Error::<T>::MismatchedDenoms);
		ensure!(amount.amount > 0, Error::<T>::InvalidAmount);
		let (cosmos_originated, token_contract) = Self::denom_to_erc20_lookup(&amount.denom)?;
		let total = amount.amount.checked_add(fee.amount).ok_or(Error::<T>::InvalidAmount)?;

		let module = Self::account_id();
		let escrow = Coin::new(amount.denom, total);
		T::BankKeeper::send_from_account_to_module(&sender, &module, &escrow)?;
		if !cosmos_originated {
			T::BankKeeper::burn_coins(&module, &escrow)?;
		}

		let id = LastTxPoolId::<T>::mutate(|id| {
			*id = id.saturating_add(1);
			*id
		});
		let tx = OutgoingTransferTx {
			id,
			sender: sender.clone(),
			dest_address,
			erc20_token: Erc20Token { contract: token_contract, amount: amount.amount },
			erc20_fee: Erc20Token { contract: token_contract, amount: fee.amount },
		};
		UnbatchedTransactions::<T>::insert(token_contract, id, tx);
		UnbatchedTransactionToken::<T>::insert(id, token_contract);

		Self::deposit_event(Event::SendToEthQueued {
			id,
			sender,
			dest_address,
			token_contract,
			amount: amount.amount,
			fee: fee.amount,
		});
		Ok(id)
	}

	pub(crate) fn remove_from_outgoing_pool_and_refund(
		sender: T::AccountId,
		id: u64,
	) -> DispatchResult {
		let token_contract =
			UnbatchedTransactionToken::<T>::get(id).ok_or(Error::<T>::UnknownTransaction)?;
		let tx = UnbatchedTransactions::<T>::get(token_contract, id)
			.ok_or(Error::<T>::UnknownTransaction)?;
		ensure!(tx.sender == sender, Error::<T>::NotSender);

		UnbatchedTransactions::<T>::remove(token_contract, id);
		UnbatchedTransactionToken::<T>::remove(id);
		Self::refund_transfer(&tx)?;

		Self::deposit_event(Event::SendToEthCancelled { id, sender });
		Ok(())
	}

	/// Returns `amount + fee` of a withdrawal that will never execute to its sender.
	fn refund_transfer(tx: &OutgoingTransferTx<T::AccountId>) -> DispatchResult {
		let module = Self::account_id();
		let (cosmos_originated, denom) = Self::erc20_to_denom_lookup(&tx.erc20_token.contract);
		let coin = Coin::new(denom, tx.total());
		if !cosmos_originated {
			T::BankKeeper::mint_coins(&module, &coin)?;
		}
		T::BankKeeper::send_from_module_to_account(&module, &tx.sender, &coin)
	}

	/// Ethereum height after which a batch created now can no longer execute, or 0 while
	/// no Ethereum height has been observed.
	fn batch_timeout_height() -> u64 {
		let observed = LastObservedEthereumHeight::<T>::get().ethereum_block_height;
		if observed == 0 {
			return 0;
		}
		let params = GravityParams::<T>::get();
		if params.average_ethereum_block_time == 0 {
			return observed;
		}
		let blocks = params
			.target_batch_timeout
			.saturating_add(params.average_ethereum_block_time - 1) /
			params.average_ethereum_block_time;
		observed.saturating_add(blocks)
	}

	/// Moves up to `max_size` of the best paying withdrawals of a token into a new batch.
	pub fn build_outgoing_tx_batch(
		token_contract: EthAddress,
		max_size: u32,
	) -> Result<OutgoingTxBatch<T::AccountId>, DispatchError> {
		ensure!(max_size > 0, Error::<T>::InvalidBatchSize);

		let mut selected: Vec<OutgoingTransferTx<T::AccountId>> =
			UnbatchedTransactions::<T>::iter_prefix_values(token_contract).collect();
		selected.sort_by(|a, b| {
			b.erc20_fee.amount.cmp(&a.erc20_fee.amount).then_with(|| a.id.cmp(&b.id))
		});
		selected.truncate(max_size as usize);
		ensure!(!selected.is_empty(), Error::<T>::NoBatchCandidates);

		let candidate_fee =
			selected.iter().fold(0u128, |acc, tx| acc.saturating_add(tx.erc20_fee.amount));
		let best_existing_fee = OutgoingTxBatches::<T>::iter_prefix_values(token_contract)
			.map(|batch| batch.total_fee())
			.max();
		if let Some(existing_fee) = best_existing_fee {
			ensure!(existing_fee <= candidate_fee, Error::<T>::BatchNotProfitable);
		}

		let batch_nonce = LastOutgoingBatchNonce::<T>::mutate(|nonce| {
			*nonce = nonce.saturating_add(1);
			*nonce
		});
		let batch = OutgoingTxBatch {
			batch_nonce,
			batch_timeout: Self::batch_timeout_height(),
			transactions: selected,
			token_contract,
			block: Self::block_height(),
		};

		let gravity_id = GravityParams::<T>::get().gravity_id;
		let checkpoint =
			checkpoint::batch_checkpoint(&batch, &gravity_id).map_err(Error::<T>::from)?;
		Self::archive_checkpoint(checkpoint);

		for tx in &batch.transactions {
			UnbatchedTransactions::<T>::remove(token_contract, tx.id);
			UnbatchedTransactionToken::<T>::remove(tx.id);
		}
		OutgoingTxBatches::<T>::insert(token_contract, batch_nonce, &batch);

		log::info!(
			target: LOG_TARGET,
			"batch {} for {:?} created with {} transactions",
			batch_nonce,
			token_contract,
			batch.transactions.len()
		);
		Self::deposit_event(Event::OutgoingBatchCreated {
			token_contract,
			batch_nonce,
			transactions: batch.transactions.len() as u32,
		});
		Ok(batch)
	}

	/// Deletes a batch and refunds every withdrawal in it.
	pub fn cancel_outgoing_tx_batch(
		token_contract: EthAddress,
		batch_nonce: u64,
	) -> DispatchResult {
		let batch = OutgoingTxBatches::<T>::take(token_contract, batch_nonce)
			.ok_or(Error::<T>::UnknownBatch)?;
		for tx in &batch.transactions {
			Self::refund_transfer(tx)?;
		}
		let _ = BatchConfirms::<T>::clear_prefix((token_contract, batch_nonce), u32::MAX, None);

		Self::deposit_event(Event::OutgoingBatchCancelled { token_contract, batch_nonce });
		Ok(())
	}

	/// Applies an observed execution. Earlier batches of the same token can no longer
	/// execute on Ethereum and are cancelled.
	pub(crate) fn outgoing_tx_batch_executed(
		token_contract: EthAddress,
		batch_nonce: u64,
		eth_block_height: u64,
	) -> DispatchResult {
		let Some(batch) = OutgoingTxBatches::<T>::get(token_contract, batch_nonce) else {
			panic!("executed batch {} for {:?} is unknown", batch_nonce, token_contract);
		};
		if batch.batch_timeout <= eth_block_height {
			panic!(
				"batch {} executed at Ethereum height {} past its timeout {}",
				batch_nonce, eth_block_height, batch.batch_timeout
			);
		}

		let mut superseded: Vec<u64> = OutgoingTxBatches::<T>::iter_key_prefix(token_contract)
			.filter(|nonce| *nonce < batch_nonce)
			.collect();
		superseded.sort();
		for nonce in superseded {
			Self::cancel_outgoing_tx_batch(token_contract, nonce)?;
		}

		OutgoingTxBatches::<T>::remove(token_contract, batch_nonce);
		let _ = BatchConfirms::<T>::clear_prefix((token_contract, batch_nonce), u32::MAX, None);
		Self::deposit_event(Event::OutgoingBatchExecuted { token_contract, batch_nonce });
		Ok(())
	}

	/// Cancels batches whose timeout is below the last observed Ethereum height.
	pub(crate) fn cleanup_timed_out_batches() {
		let observed = LastObservedEthereumHeight::<T>::get().ethereum_block_height;
		let mut expired: Vec<(EthAddress, u64)> = OutgoingTxBatches::<T>::iter()
			.filter(|(_, _, batch)| batch.batch_timeout < observed)
			.map(|(token_contract, nonce, _)| (token_contract, nonce))
			.collect();
		expired.sort();

		for (token_contract, nonce) in expired {
			let cancelled =
				with_transaction(|| match Self::cancel_outgoing_tx_batch(token_contract, nonce) {
					Ok(()) => TransactionOutcome::Commit(Ok(())),
					Err(error) => TransactionOutcome::Rollback(Err(error)),
				});
			if let Err(error) = cancelled {
				log::error!(
					target: LOG_TARGET,
					"failed to cancel timed out batch {} for {:?}: {:?}",
					nonce,
					token_contract,
					error
				);
			}
		}
	}

	pub(crate) fn add_batch_confirm(
		orchestrator: T::AccountId,
		token_contract: EthAddress,
		batch_nonce: u64,
		signature: Vec<u8>,
	) -> DispatchResult {
		let batch = OutgoingTxBatches::<T>::get(token_contract, batch_nonce)
			.ok_or(Error::<T>::UnknownBatch)?;
		let (validator, eth_signer) = Self::signing_validator(&orchestrator)?;
		ensure!(
			!BatchConfirms::<T>::contains_key((token_contract, batch_nonce), &validator),
			Error::<T>::DuplicateConfirmation
		);

		let gravity_id = GravityParams::<T>::get().gravity_id;
		let checkpoint =
			checkpoint::batch_checkpoint(&batch, &gravity_id).map_err(Error::<T>::from)?;
		checkpoint::verify_signature(&checkpoint, &signature, &eth_signer)
			.map_err(|_| Error::<T>::InvalidSignature)?;

		BatchConfirms::<T>::insert(
			(token_contract, batch_nonce),
			&validator,
			BatchConfirm {
				nonce: batch_nonce,
				token_contract,
				orchestrator,
				eth_signer,
				signature,
			},
		);
		Self::deposit_event(Event::BatchConfirmed { token_contract, batch_nonce, validator });
		Ok(())
	}
}
