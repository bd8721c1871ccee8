#![cfg_attr(rustfmt, rustfmt_skip)]
#![allow(unused_parens)]
#![allow(unused_imports)]

use frame_support::{traits::Get, weights::{Weight, constants::RocksDbWeight}};
use sp_std::marker::PhantomData;

/// Weight functions needed for pallet_gravity.
pub trait WeightInfo {
    fn set_orchestrator_address() -> Weight;
    fn confirm_valset() -> Weight;
    fn confirm_batch() -> Weight;
    fn confirm_logic_call() -> Weight;
    fn submit_claim() -> Weight;
    fn send_to_eth() -> Weight;
    fn cancel_send_to_eth() -> Weight;
    fn request_batch() -> Weight;
    fn submit_bad_signature_evidence() -> Weight;
    fn set_params() -> Weight;
    fn end_block() -> Weight;
}

/// Default weights for pallet_gravity
pub struct SubstrateWeight<T>(PhantomData<T>);
impl<T: frame_system::Config> WeightInfo for SubstrateWeight<T> {
    fn set_orchestrator_address() -> Weight {
        Weight::from_parts(15_000, 0)
            .saturating_add(T::DbWeight::get().reads(4))
            .saturating_add(T::DbWeight::get().writes(4))
    }

    fn confirm_valset() -> Weight {
        Weight::from_parts(60_000, 0)
            .saturating_add(T::DbWeight::get().reads(5))
            .saturating_add(T::DbWeight::get().writes(1))
    }

    fn confirm_batch() -> Weight {
        Weight::from_parts(60_000, 0)
            .saturating_add(T::DbWeight::get().reads(5))
            .saturating_add(T::DbWeight::get().writes(1))
    }

    fn confirm_logic_call() -> Weight {
        Weight::from_parts(60_000, 0)
            .saturating_add(T::DbWeight::get().reads(5))
            .saturating_add(T::DbWeight::get().writes(1))
    }

    fn submit_claim() -> Weight {
        Weight::from_parts(25_000, 0)
            .saturating_add(T::DbWeight::get().reads(5))
            .saturating_add(T::DbWeight::get().writes(2))
    }

    fn send_to_eth() -> Weight {
        Weight::from_parts(30_000, 0)
            .saturating_add(T::DbWeight::get().reads(3))
            .saturating_add(T::DbWeight::get().writes(4))
    }

    fn cancel_send_to_eth() -> Weight {
        Weight::from_parts(25_000, 0)
            .saturating_add(T::DbWeight::get().reads(3))
            .saturating_add(T::DbWeight::get().writes(3))
    }

    fn request_batch() -> Weight {
        Weight::from_parts(80_000, 0)
            .saturating_add(T::DbWeight::get().reads(10))
            .saturating_add(T::DbWeight::get().writes(6))
    }

    fn submit_bad_signature_evidence() -> Weight {
        Weight::from_parts(60_000, 0)
            .saturating_add(T::DbWeight::get().reads(4))
            .saturating_add(T::DbWeight::get().writes(1))
    }

    fn set_params() -> Weight {
        Weight::from_parts(10_000, 0).saturating_add(T::DbWeight::get().writes(1))
    }

    fn end_block() -> Weight {
        Weight::from_parts(200_000, 0)
            .saturating_add(T::DbWeight::get().reads(40))
            .saturating_add(T::DbWeight::get().writes(20))
    }
}

impl WeightInfo for () {
    fn set_orchestrator_address() -> Weight {
        Weight::from_parts(15_000, 0)
    }

    fn confirm_valset() -> Weight {
        Weight::from_parts(60_000, 0)
    }

    fn confirm_batch() -> Weight {
        Weight::from_parts(60_000, 0)
    }

    fn confirm_logic_call() -> Weight {
        Weight::from_parts(60_000, 0)
    }

    fn submit_claim() -> Weight {
        Weight::from_parts(25_000, 0)
    }

    fn send_to_eth() -> Weight {
        Weight::from_parts(30_000, 0)
    }

    fn cancel_send_to_eth() -> Weight {
        Weight::from_parts(25_000, 0)
    }

    fn request_batch() -> Weight {
        Weight::from_parts(80_000, 0)
    }

    fn submit_bad_signature_evidence() -> Weight {
        Weight::from_parts(60_000, 0)
    }

    fn set_params() -> Weight {
        Weight::from_parts(10_000, 0)
    }

    fn end_block() -> Weight {
        Weight::from_parts(200_000, 0)
    }
}
