use gibbler_core::derive_substream_seed;

/// Seed of one chain under a master seed.
pub fn chain_seed(master_seed: u64, chain: u64) -> u64 {
    derive_substream_seed(master_seed ^ 0x9E37_79B9_7F4A_7C15, chain)
}

/// Seed of the operator registered at `operator_index` within a chain.
pub fn operator_seed(master_seed: u64, chain: u64, operator_index: usize) -> u64 {
    derive_substream_seed(chain_seed(master_seed, chain), operator_index as u64)
}
